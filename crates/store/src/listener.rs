//! Filling in dynamic defaults and autocreated children of new content.

use std::sync::Arc;

use cairn_names::QualifiedName;
use cairn_nodetypes::model::{DefaultValueContext, LabelSource};
use cairn_nodetypes::{NodeType, NodeTypeRegistry};
use tracing::{debug, error, trace};

use crate::error::Result;
use crate::events::{Event, EventListener, EventMask};
use crate::repository::{Credentials, Node, PropertyValue, Repository, Session, Value};

const MIXIN_TYPES_SUFFIX: &str = "/jcr:mixinTypes";

/// Completes nodes after they are added, or after mixins are added to them.
///
/// For the primary type, every mixin and their supertypes:
/// * properties with dynamic defaults (`now()`, `currentUser()`, ...) that
///   are not yet set are evaluated for the user who made the change;
/// * named autocreated children that are missing are added with their
///   default primary type.
///
/// Changes are saved through a system session of the event's workspace.
pub struct DefaultValueListener {
	registry: Arc<NodeTypeRegistry>,
	repository: Arc<dyn Repository>,
	labels: Option<(Arc<dyn LabelSource>, String)>,
}

impl DefaultValueListener {
	pub fn new(registry: Arc<NodeTypeRegistry>, repository: Arc<dyn Repository>) -> Self {
		Self {
			registry,
			repository,
			labels: None,
		}
	}

	/// Resolves `resourceBundle(...)` defaults from `source` in `locale`.
	pub fn with_labels(mut self, source: Arc<dyn LabelSource>, locale: impl Into<String>) -> Self {
		self.labels = Some((source, locale.into()));
		self
	}

	fn process(&self, workspace: &str, events: &[Event]) -> Result<()> {
		let session = self.repository.login(&Credentials::system(), Some(workspace))?;
		let result = self.complete_all(session.as_ref(), events);
		session.logout();
		result
	}

	fn complete_all(&self, session: &dyn Session, events: &[Event]) -> Result<()> {
		let mut changed = false;
		for event in events {
			let path = if event.kind == EventMask::NODE_ADDED {
				event.path.as_str()
			} else if let Some(owner) = event.path.strip_suffix(MIXIN_TYPES_SUFFIX) {
				if owner.is_empty() { "/" } else { owner }
			} else {
				continue;
			};
			// The node may be gone by the time the batch is delivered.
			let Ok(node) = session.node(path) else {
				trace!(path, "skipping vanished node");
				continue;
			};
			let context = CreationContext {
				user: &event.user_id,
				labels: self.labels.as_ref().map(|(source, locale)| (source.as_ref(), locale.as_str())),
			};
			changed |= self.complete(&node, &context)?;
		}
		if changed {
			session.save()?;
		}
		Ok(())
	}

	fn complete(&self, node: &Arc<dyn Node>, context: &CreationContext<'_>) -> Result<bool> {
		let mut changed = false;
		for node_type in self.effective_types(node) {
			for definition in node_type.property_definitions() {
				if definition.item.is_unstructured() || !definition.has_dynamic_default() {
					continue;
				}
				let name = self.registry.display_name(definition.name());
				if node.has_property(&name) {
					continue;
				}
				let mut values: Vec<Value> = definition
					.default_values
					.iter()
					.filter_map(|d| d.evaluate(context))
					.map(Value::String)
					.collect();
				if values.is_empty() {
					continue;
				}
				let value = if definition.multiple {
					PropertyValue::Multiple(values)
				} else {
					PropertyValue::Single(values.swap_remove(0))
				};
				debug!(path = %node.path(), property = %name, "setting default value");
				node.set_property(&name, value)?;
				changed = true;
			}
			for definition in node_type.child_node_definitions() {
				if !definition.item.auto_created || definition.item.is_unstructured() {
					continue;
				}
				let name = self.registry.display_name(definition.name());
				if node.has_child(&name) {
					continue;
				}
				let Some(primary_type) = &definition.default_primary_type else {
					continue;
				};
				debug!(path = %node.path(), child = %name, "adding autocreated child");
				node.add_child(&name, &self.registry.display_name(primary_type))?;
				changed = true;
			}
		}
		Ok(changed)
	}

	fn effective_types(&self, node: &Arc<dyn Node>) -> Vec<Arc<NodeType>> {
		let mut names: Vec<QualifiedName> = Vec::new();
		let declared = std::iter::once(node.primary_type()).chain(node.mixin_types());
		for name in declared.filter_map(|n| self.registry.parse_name(&n).ok()) {
			let closure = self.registry.supertype_closure(&name);
			for candidate in std::iter::once(name).chain(closure) {
				if !names.contains(&candidate) {
					names.push(candidate);
				}
			}
		}
		names.iter().filter_map(|n| self.registry.node_type(n)).collect()
	}
}

impl EventListener for DefaultValueListener {
	fn event_types(&self) -> EventMask {
		EventMask::NODE_ADDED | EventMask::PROPERTY_ADDED | EventMask::PROPERTY_CHANGED
	}

	fn on_events(&self, workspace: &str, events: &[Event]) {
		if let Err(e) = self.process(workspace, events) {
			error!(workspace, error = %e, "cannot complete new content");
		}
	}
}

struct CreationContext<'a> {
	user: &'a str,
	labels: Option<(&'a dyn LabelSource, &'a str)>,
}

impl DefaultValueContext for CreationContext<'_> {
	fn current_user(&self) -> Option<&str> {
		Some(self.user)
	}

	fn resource_bundle(&self, key: &str) -> Option<String> {
		let (source, locale) = self.labels?;
		source.lookup(key, locale)
	}
}
