//! Wrapping stored nodes and properties for content sessions.

use std::sync::Arc;

use tracing::debug;

use super::StoreProvider;
use crate::error::{Result, StoreError};
use crate::repository::{Credentials, Node, Property};
use crate::session::{ContentSession, SessionFactory};
use crate::wrapper::{DEREF_SEPARATOR, FROZEN_NODE_TYPE, NodeWrapper, PropertyWrapper, TRANSLATION_TYPE, WrapperKind};

impl StoreProvider {
	/// Wrapper for `node` in `session`, at the node's own path.
	pub fn node_wrapper(&self, node: Arc<dyn Node>, session: &ContentSession) -> Result<Arc<NodeWrapper>> {
		self.node_wrapper_at(node, None, session)
	}

	/// Wrapper for `node` in `session`, presented at `path`.
	///
	/// Under an aliased user the node must also be visible to that user.
	/// Nodes hidden in the session locale are reported as missing unless they
	/// are new. Wrappers are decorated, then cached by identifier unless the
	/// path goes through a reference.
	pub fn node_wrapper_at(&self, node: Arc<dyn Node>, path: Option<&str>, session: &ContentSession) -> Result<Arc<NodeWrapper>> {
		self.check_aliased_access(&node, session)?;

		let cacheable = path.is_none_or(|p| !p.contains(DEREF_SEPARATOR));
		if cacheable && let Some(cached) = session.cached_node(self.key(), &node.identifier()) {
			// Content may have been withdrawn from the locale since it was cached.
			check_available(&cached, session)?;
			return Ok(cached);
		}

		let wrapper = self.create_wrapper(node, path, session);
		check_available(&wrapper, session)?;
		let wrapper = Arc::new(self.decorators.decorate(wrapper));
		if cacheable {
			session.cache_node(Arc::clone(&wrapper));
		}
		Ok(wrapper)
	}

	/// Wrapper for `property` in `session`.
	///
	/// Properties stored on a translation child belong to the translated
	/// node: their definition is resolved there, and with a session locale
	/// they are presented on it.
	pub fn property_wrapper(&self, property: Arc<dyn Property>, session: &ContentSession) -> Result<PropertyWrapper> {
		let parent = property.parent()?;
		let multiple = property.value().is_ok_and(|v| v.is_multiple());
		if self.is_type(&parent, TRANSLATION_TYPE) {
			let owner = self.node_wrapper(parent.parent()?, session)?;
			let definition = owner.property_definition_for(&property.name(), multiple);
			let presented = match session.locale() {
				Some(_) => owner,
				None => self.node_wrapper(parent, session)?,
			};
			return Ok(PropertyWrapper::new(presented, property, definition));
		}
		let node = self.node_wrapper(parent, session)?;
		let definition = node.property_definition_for(&property.name(), multiple);
		Ok(PropertyWrapper::new(node, property, definition))
	}

	fn create_wrapper(&self, node: Arc<dyn Node>, path: Option<&str>, session: &ContentSession) -> NodeWrapper {
		let kind = if session.is_versioned() && self.is_type(&node, FROZEN_NODE_TYPE) {
			WrapperKind::Frozen {
				version_date: session.version_date(),
				version_label: session.version_label().map(str::to_string),
			}
		} else {
			WrapperKind::Regular
		};
		NodeWrapper::new(node, path, self.key(), Arc::clone(&self.registry), session.locale(), kind)
	}

	fn check_aliased_access(&self, node: &Arc<dyn Node>, session: &ContentSession) -> Result<()> {
		let Some(aliased) = SessionFactory::current_aliased_user() else {
			return Ok(());
		};
		if aliased == session.user() {
			return Ok(());
		}
		debug!(provider = self.key(), aliased, path = %node.path(), "checking node access for aliased user");
		let aliased_session = self.get_session(&Credentials::trusted(aliased.as_str()), Some(session.workspace()))?;
		let visible = aliased_session.node_by_identifier(&node.identifier());
		aliased_session.logout();
		visible.map(|_| ()).map_err(|_| StoreError::PathNotFound(node.path()))
	}
}

fn check_available(wrapper: &NodeWrapper, session: &ContentSession) -> Result<()> {
	if !wrapper.is_new() && !wrapper.check_validity() {
		return Err(StoreError::PathNotFound(format!(
			"{} is not available in locale {}",
			wrapper.path(),
			session.locale().unwrap_or_default()
		)));
	}
	Ok(())
}
