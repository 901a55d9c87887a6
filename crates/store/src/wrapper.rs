//! Session-aware views of stored nodes and properties.

use std::fmt;
use std::sync::Arc;

use cairn_names::QualifiedName;
use cairn_nodetypes::{NodeTypeRegistry, PropertyDefinition};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::error::Result;
use crate::repository::{Node, Property, PropertyValue};

/// Name prefix of the per-locale translation children.
pub const TRANSLATION_NODE_PREFIX: &str = "j:translation_";
/// Type of translation children.
pub const TRANSLATION_TYPE: &str = "jnt:translation";
/// Multi-valued property listing the locales a node is hidden in.
pub const INVALID_LANGUAGES: &str = "j:invalidLanguages";
/// Type of nodes captured in a version.
pub const FROZEN_NODE_TYPE: &str = "nt:frozenNode";
/// Marks a path reached through a reference; such paths bypass the node cache.
pub const DEREF_SEPARATOR: &str = "@/";

/// How a wrapper relates to the version history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WrapperKind {
	Regular,
	/// A node captured in a version, viewed at a date or label.
	Frozen {
		version_date: Option<DateTime<Utc>>,
		version_label: Option<String>,
	},
}

/// A stored node as seen through one session: its path, locale and provider.
#[derive(Clone)]
pub struct NodeWrapper {
	node: Arc<dyn Node>,
	path: String,
	provider_key: String,
	registry: Arc<NodeTypeRegistry>,
	locale: Option<String>,
	kind: WrapperKind,
	decorator: Option<String>,
}

impl fmt::Debug for NodeWrapper {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NodeWrapper")
			.field("path", &self.path)
			.field("provider", &self.provider_key)
			.field("locale", &self.locale)
			.field("kind", &self.kind)
			.field("decorator", &self.decorator)
			.finish()
	}
}

impl NodeWrapper {
	pub(crate) fn new(
		node: Arc<dyn Node>,
		path: Option<&str>,
		provider_key: &str,
		registry: Arc<NodeTypeRegistry>,
		locale: Option<&str>,
		kind: WrapperKind,
	) -> Self {
		let path = path.map(str::to_string).unwrap_or_else(|| node.path());
		Self {
			node,
			path,
			provider_key: provider_key.to_string(),
			registry,
			locale: locale.map(str::to_string),
			kind,
			decorator: None,
		}
	}

	pub fn real_node(&self) -> &Arc<dyn Node> {
		&self.node
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	pub fn name(&self) -> String {
		self.node.name()
	}

	pub fn identifier(&self) -> String {
		self.node.identifier()
	}

	pub fn provider_key(&self) -> &str {
		&self.provider_key
	}

	pub fn locale(&self) -> Option<&str> {
		self.locale.as_deref()
	}

	pub fn kind(&self) -> &WrapperKind {
		&self.kind
	}

	pub fn is_frozen(&self) -> bool {
		matches!(self.kind, WrapperKind::Frozen { .. })
	}

	/// Type name of the decorator applied to this wrapper, if any.
	pub fn decorator(&self) -> Option<&str> {
		self.decorator.as_deref()
	}

	pub fn is_new(&self) -> bool {
		self.node.is_new()
	}

	/// True when the primary type or a mixin is `type_name` or inherits from it.
	pub fn is_node_type(&self, type_name: &str) -> bool {
		let Ok(candidate) = self.registry.parse_name(type_name) else {
			return false;
		};
		let (primary, mixins) = self.type_names();
		primary.into_iter().chain(mixins).any(|t| self.registry.is_node_type(&t, &candidate))
	}

	/// False when the session locale is listed in `j:invalidLanguages`.
	pub fn check_validity(&self) -> bool {
		let Some(locale) = &self.locale else {
			return true;
		};
		match self.node.property(INVALID_LANGUAGES).and_then(|p| p.value()) {
			Ok(value) => !value.contains_str(locale),
			Err(_) => true,
		}
	}

	/// The translation child for `locale`, `None` when there is none.
	pub fn translation_node(&self, locale: &str) -> Option<Arc<dyn Node>> {
		self.node.child(&format!("{TRANSLATION_NODE_PREFIX}{locale}")).ok()
	}

	/// Definition governing property `name` on this node.
	pub fn property_definition(&self, name: &str) -> Option<Arc<PropertyDefinition>> {
		let property = self.registry.parse_name(name).ok()?;
		let (primary, mixins) = self.type_names();
		self.registry.applicable_property_definition(&primary?, &mixins, &property)
	}

	/// Definition governing a value of property `name`; residual
	/// definitions with the value's multiplicity are preferred.
	pub fn property_definition_for(&self, name: &str, multiple: bool) -> Option<Arc<PropertyDefinition>> {
		let property = self.registry.parse_name(name).ok()?;
		let (primary, mixins) = self.type_names();
		self.registry.applicable_property_definition_for(&primary?, &mixins, &property, multiple)
	}

	/// True when `name` is set on the node, or on its translation in the
	/// session locale when the definition is internationalized.
	pub fn has_property(&self, name: &str) -> bool {
		self.node.has_property(name) || self.translated_property(name).is_some()
	}

	/// Value of `name`, read from the translation for internationalized definitions.
	pub fn property_value(&self, name: &str) -> Option<PropertyValue> {
		if let Ok(property) = self.node.property(name) {
			return property.value().ok();
		}
		self.translated_property(name).and_then(|p| p.value().ok())
	}

	fn translated_property(&self, name: &str) -> Option<Arc<dyn Property>> {
		let translation = self.translation_node(self.locale.as_deref()?)?;
		let property = translation.property(name).ok()?;
		self.property_definition(name).filter(|d| d.internationalized).map(|_| property)
	}

	pub(crate) fn registry(&self) -> &Arc<NodeTypeRegistry> {
		&self.registry
	}

	fn type_names(&self) -> (Option<QualifiedName>, Vec<QualifiedName>) {
		let primary = self.registry.parse_name(&self.node.primary_type()).ok();
		let mixins = self.node.mixin_types().iter().filter_map(|m| self.registry.parse_name(m).ok()).collect();
		(primary, mixins)
	}
}

/// A stored property with the definition that governs it.
#[derive(Clone)]
pub struct PropertyWrapper {
	node: Arc<NodeWrapper>,
	property: Arc<dyn Property>,
	definition: Option<Arc<PropertyDefinition>>,
}

impl fmt::Debug for PropertyWrapper {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PropertyWrapper")
			.field("name", &self.property.name())
			.field("node", &self.node.path())
			.finish()
	}
}

impl PropertyWrapper {
	pub(crate) fn new(node: Arc<NodeWrapper>, property: Arc<dyn Property>, definition: Option<Arc<PropertyDefinition>>) -> Self {
		Self {
			node,
			property,
			definition,
		}
	}

	pub fn name(&self) -> String {
		self.property.name()
	}

	pub fn path(&self) -> String {
		self.property.path()
	}

	pub fn value(&self) -> Result<PropertyValue> {
		self.property.value()
	}

	pub fn definition(&self) -> Option<&Arc<PropertyDefinition>> {
		self.definition.as_ref()
	}

	pub fn is_internationalized(&self) -> bool {
		self.definition.as_ref().is_some_and(|d| d.internationalized)
	}

	/// The node the property is presented on. For translated properties this
	/// is the translated node, not the translation child.
	pub fn node(&self) -> &Arc<NodeWrapper> {
		&self.node
	}

	pub fn real_property(&self) -> &Arc<dyn Property> {
		&self.property
	}
}

/// Turns a plain wrapper into a specialised one.
pub type Decorator = fn(NodeWrapper) -> NodeWrapper;

/// Decorators keyed by the type they apply to, tried in registration order.
#[derive(Default)]
pub struct DecoratorRegistry {
	decorators: IndexMap<String, Decorator>,
}

impl DecoratorRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(mut self, type_name: impl Into<String>, decorator: Decorator) -> Self {
		self.decorators.insert(type_name.into(), decorator);
		self
	}

	pub fn len(&self) -> usize {
		self.decorators.len()
	}

	pub fn is_empty(&self) -> bool {
		self.decorators.is_empty()
	}

	/// Applies the first decorator whose type the node is; otherwise returns
	/// the wrapper unchanged.
	pub fn decorate(&self, wrapper: NodeWrapper) -> NodeWrapper {
		let found = self.decorators.iter().find(|(type_name, _)| wrapper.is_node_type(type_name));
		match found {
			Some((type_name, decorator)) => {
				let mut decorated = decorator(wrapper);
				decorated.decorator = Some(type_name.clone());
				decorated
			}
			None => wrapper,
		}
	}
}
