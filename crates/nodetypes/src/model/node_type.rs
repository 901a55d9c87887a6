use std::sync::Arc;

use cairn_names::{NamespaceTable, QualifiedName};
use indexmap::IndexMap;

use super::item::{ItemRef, NodeDefinition, PropertyDefinition};
use super::label::{LabelCache, LabelSource, label_key};

/// One content type.
///
/// Supertypes and mixin-extension targets are stored by name; inheritance is
/// resolved by the registry rather than by object links, so a definition is
/// self-contained once built.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeType {
	name: QualifiedName,
	system_id: String,
	mixin: bool,
	is_abstract: bool,
	orderable: bool,
	queryable: bool,
	primary_item: Option<QualifiedName>,
	supertypes: Vec<QualifiedName>,
	properties: Vec<Arc<PropertyDefinition>>,
	unstructured_properties: IndexMap<String, Arc<PropertyDefinition>>,
	child_nodes: Vec<Arc<NodeDefinition>>,
	unstructured_child_nodes: IndexMap<String, Arc<NodeDefinition>>,
	mixin_extends: Vec<QualifiedName>,
	item_type: Option<String>,
	labels: LabelCache,
}

impl NodeType {
	pub fn builder(name: QualifiedName, system_id: impl Into<String>) -> NodeTypeBuilder {
		NodeTypeBuilder {
			inner: NodeType {
				name,
				system_id: system_id.into(),
				mixin: false,
				is_abstract: false,
				orderable: false,
				queryable: true,
				primary_item: None,
				supertypes: Vec::new(),
				properties: Vec::new(),
				unstructured_properties: IndexMap::new(),
				child_nodes: Vec::new(),
				unstructured_child_nodes: IndexMap::new(),
				mixin_extends: Vec::new(),
				item_type: None,
				labels: LabelCache::default(),
			},
		}
	}

	pub fn name(&self) -> &QualifiedName {
		&self.name
	}

	/// Module or package that contributed this type.
	pub fn system_id(&self) -> &str {
		&self.system_id
	}

	pub fn is_mixin(&self) -> bool {
		self.mixin
	}

	pub fn is_abstract(&self) -> bool {
		self.is_abstract
	}

	pub fn has_orderable_child_nodes(&self) -> bool {
		self.orderable
	}

	pub fn is_queryable(&self) -> bool {
		self.queryable
	}

	pub fn primary_item(&self) -> Option<&QualifiedName> {
		self.primary_item.as_ref()
	}

	/// Declared supertypes, in declaration order.
	pub fn supertypes(&self) -> &[QualifiedName] {
		&self.supertypes
	}

	/// Named property definitions declared by this type.
	pub fn property_definitions(&self) -> &[Arc<PropertyDefinition>] {
		&self.properties
	}

	/// Residual (`*`) property definitions keyed by type signature.
	pub fn unstructured_property_definitions(&self) -> &IndexMap<String, Arc<PropertyDefinition>> {
		&self.unstructured_properties
	}

	/// Named child-node definitions declared by this type.
	pub fn child_node_definitions(&self) -> &[Arc<NodeDefinition>] {
		&self.child_nodes
	}

	/// Residual (`*`) child-node definitions keyed by required types.
	pub fn unstructured_child_node_definitions(&self) -> &IndexMap<String, Arc<NodeDefinition>> {
		&self.unstructured_child_nodes
	}

	/// Base types this mixin extends (`extends = ...`).
	pub fn mixin_extends(&self) -> &[QualifiedName] {
		&self.mixin_extends
	}

	pub fn item_type(&self) -> Option<&str> {
		self.item_type.as_deref()
	}

	/// Every declared item, named ones first.
	pub fn items(&self) -> impl Iterator<Item = ItemRef> + '_ {
		let props = self.properties.iter().chain(self.unstructured_properties.values()).cloned().map(ItemRef::Property);
		let nodes = self.child_nodes.iter().chain(self.unstructured_child_nodes.values()).cloned().map(ItemRef::Node);
		props.chain(nodes)
	}

	/// Declared property named `name`, residuals excluded.
	pub fn declared_property(&self, name: &QualifiedName) -> Option<&Arc<PropertyDefinition>> {
		self.properties.iter().find(|p| p.name() == name)
	}

	/// Declared child-node definition named `name`, residuals excluded.
	pub fn declared_child_node(&self, name: &QualifiedName) -> Option<&Arc<NodeDefinition>> {
		self.child_nodes.iter().find(|n| n.name() == name)
	}

	/// True when any child-node definition, named or residual, requires `type_name`.
	pub fn requires_child_type(&self, type_name: &QualifiedName) -> bool {
		self.child_nodes.iter().chain(self.unstructured_child_nodes.values()).any(|n| n.requires(type_name))
	}

	/// Display label, cached per locale.
	pub fn label(&self, locale: &str, namespaces: &NamespaceTable, source: &dyn LabelSource) -> String {
		self.labels.get_or_resolve(locale, || {
			let prefixed = namespaces.display(&self.name);
			source.lookup(&label_key(&prefixed), locale).unwrap_or_else(|| self.name.local_name().to_string())
		})
	}

	/// Drops cached labels of the type and of every declared item.
	pub fn clear_labels(&self) {
		self.labels.clear();
		for item in self.items() {
			item.item().labels.clear();
		}
	}

	pub(crate) fn cached_label_count(&self) -> usize {
		self.labels.len()
	}
}

/// Incremental construction of a [`NodeType`]; the type is only shared once built.
#[derive(Debug)]
pub struct NodeTypeBuilder {
	inner: NodeType,
}

impl NodeTypeBuilder {
	pub fn name(&self) -> &QualifiedName {
		&self.inner.name
	}

	pub fn is_mixin(&self) -> bool {
		self.inner.mixin
	}

	pub fn supertypes(&self) -> &[QualifiedName] {
		&self.inner.supertypes
	}

	pub fn mixin(mut self, mixin: bool) -> Self {
		self.inner.mixin = mixin;
		self
	}

	pub fn set_mixin(&mut self, mixin: bool) {
		self.inner.mixin = mixin;
	}

	pub fn set_abstract(&mut self, value: bool) {
		self.inner.is_abstract = value;
	}

	pub fn set_orderable(&mut self, value: bool) {
		self.inner.orderable = value;
	}

	pub fn set_queryable(&mut self, value: bool) {
		self.inner.queryable = value;
	}

	pub fn set_primary_item(&mut self, name: QualifiedName) {
		self.inner.primary_item = Some(name);
	}

	pub fn set_item_type(&mut self, item_type: impl Into<String>) {
		self.inner.item_type = Some(item_type.into());
	}

	pub fn supertype(mut self, name: QualifiedName) -> Self {
		self.add_supertype(name);
		self
	}

	/// Adds a supertype unless already declared.
	pub fn add_supertype(&mut self, name: QualifiedName) {
		if !self.inner.supertypes.contains(&name) {
			self.inner.supertypes.push(name);
		}
	}

	pub fn add_mixin_extends(&mut self, name: QualifiedName) {
		if !self.inner.mixin_extends.contains(&name) {
			self.inner.mixin_extends.push(name);
		}
	}

	pub fn property(mut self, def: PropertyDefinition) -> Self {
		self.add_property(def);
		self
	}

	/// Adds a property definition; residuals land in the bucket for their signature.
	pub fn add_property(&mut self, mut def: PropertyDefinition) {
		def.item.declaring_type = self.inner.name.clone();
		if def.item.is_unstructured() {
			self.inner.unstructured_properties.insert(def.unstructured_key(), Arc::new(def));
		} else if let Some(slot) = self.inner.properties.iter_mut().find(|p| p.name() == def.name()) {
			*slot = Arc::new(def);
		} else {
			self.inner.properties.push(Arc::new(def));
		}
	}

	pub fn child_node(mut self, def: NodeDefinition) -> Self {
		self.add_child_node(def);
		self
	}

	/// Adds a child-node definition; residuals land in the bucket for their required types.
	pub fn add_child_node(&mut self, mut def: NodeDefinition) {
		def.item.declaring_type = self.inner.name.clone();
		if def.item.is_unstructured() {
			self.inner.unstructured_child_nodes.insert(def.unstructured_key(), Arc::new(def));
		} else if let Some(slot) = self.inner.child_nodes.iter_mut().find(|n| n.name() == def.name()) {
			*slot = Arc::new(def);
		} else {
			self.inner.child_nodes.push(Arc::new(def));
		}
	}

	pub fn build(self) -> NodeType {
		self.inner
	}
}
