//! Observation events and their dispatch to content listeners.

use std::sync::Arc;

use bitflags::bitflags;
use tracing::trace;

bitflags! {
	/// Kinds of repository change.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
	pub struct EventMask: u32 {
		const NODE_ADDED = 1;
		const NODE_REMOVED = 1 << 1;
		const PROPERTY_ADDED = 1 << 2;
		const PROPERTY_REMOVED = 1 << 3;
		const PROPERTY_CHANGED = 1 << 4;
		const NODE_MOVED = 1 << 5;
	}
}

impl EventMask {
	/// Every kind a provider subscribes to on its observed workspaces.
	pub const CONTENT_CHANGES: Self = Self::all();
}

/// One change, delivered after the session that made it saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
	pub kind: EventMask,
	pub path: String,
	/// User of the session that made the change.
	pub user_id: String,
}

impl Event {
	pub fn new(kind: EventMask, path: impl Into<String>, user_id: impl Into<String>) -> Self {
		Self {
			kind,
			path: path.into(),
			user_id: user_id.into(),
		}
	}
}

/// Receives batches of events from an observed workspace.
pub trait EventListener: Send + Sync {
	/// Kinds this listener wants to see.
	fn event_types(&self) -> EventMask;

	fn on_events(&self, workspace: &str, events: &[Event]);
}

/// Fans a workspace's events out to the content listeners of a provider.
///
/// Each listener only sees the events matching its own
/// [`EventListener::event_types`]; empty batches are not delivered.
pub struct ObservationDispatcher {
	workspace: String,
	listeners: Vec<Arc<dyn EventListener>>,
}

impl ObservationDispatcher {
	pub fn new(workspace: impl Into<String>, listeners: Vec<Arc<dyn EventListener>>) -> Self {
		Self {
			workspace: workspace.into(),
			listeners,
		}
	}

	pub fn workspace(&self) -> &str {
		&self.workspace
	}
}

impl EventListener for ObservationDispatcher {
	fn event_types(&self) -> EventMask {
		EventMask::CONTENT_CHANGES
	}

	fn on_events(&self, workspace: &str, events: &[Event]) {
		for listener in &self.listeners {
			let wanted = listener.event_types();
			let batch: Vec<Event> = events.iter().filter(|e| wanted.intersects(e.kind)).cloned().collect();
			if batch.is_empty() {
				continue;
			}
			trace!(workspace, events = batch.len(), "dispatching events");
			listener.on_events(workspace, &batch);
		}
	}
}

#[cfg(test)]
mod tests {
	use parking_lot::Mutex;
	use pretty_assertions::assert_eq;

	use super::*;

	struct Recorder {
		mask: EventMask,
		seen: Mutex<Vec<String>>,
	}

	impl EventListener for Recorder {
		fn event_types(&self) -> EventMask {
			self.mask
		}

		fn on_events(&self, _workspace: &str, events: &[Event]) {
			self.seen.lock().extend(events.iter().map(|e| e.path.clone()));
		}
	}

	#[test]
	fn test_dispatcher_filters_by_listener_mask() {
		let nodes = Arc::new(Recorder {
			mask: EventMask::NODE_ADDED,
			seen: Mutex::new(Vec::new()),
		});
		let props = Arc::new(Recorder {
			mask: EventMask::PROPERTY_ADDED | EventMask::PROPERTY_CHANGED,
			seen: Mutex::new(Vec::new()),
		});
		let dispatcher = ObservationDispatcher::new("default", vec![nodes.clone(), props.clone()]);
		dispatcher.on_events(
			"default",
			&[
				Event::new(EventMask::NODE_ADDED, "/a", "root"),
				Event::new(EventMask::PROPERTY_CHANGED, "/a/jcr:title", "root"),
				Event::new(EventMask::NODE_REMOVED, "/b", "root"),
			],
		);
		assert_eq!(*nodes.seen.lock(), vec!["/a".to_string()]);
		assert_eq!(*props.seen.lock(), vec!["/a/jcr:title".to_string()]);
	}
}
