//! Property and child-node definitions.

use cairn_names::{NamespaceTable, QualifiedName};
use indexmap::IndexMap;

use super::label::{LabelCache, LabelSource, label_key};
use super::types::{IndexMode, OnParentVersion, PropertyType, SelectorType};
use super::DefaultValue;

/// Item type assigned when neither the item nor its declaring type names one.
pub const DEFAULT_ITEM_TYPE: &str = "content";

/// Attributes shared by property and child-node definitions.
///
/// `declaring_type` is a back-reference by name; the definition is owned by
/// exactly one [`super::NodeType`].
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDefinition {
	pub name: QualifiedName,
	pub declaring_type: QualifiedName,
	pub auto_created: bool,
	pub mandatory: bool,
	pub protected: bool,
	pub hidden: bool,
	pub on_parent_version: OnParentVersion,
	/// Free-form tag used by the typed item index (`content`, `layout`, ...).
	pub item_type: String,
	pub labels: LabelCache,
}

impl ItemDefinition {
	pub fn new(name: QualifiedName, declaring_type: QualifiedName) -> Self {
		Self {
			name,
			declaring_type,
			auto_created: false,
			mandatory: false,
			protected: false,
			hidden: false,
			on_parent_version: OnParentVersion::default(),
			item_type: DEFAULT_ITEM_TYPE.to_string(),
			labels: LabelCache::default(),
		}
	}

	/// True for `*` definitions.
	pub fn is_unstructured(&self) -> bool {
		self.name.is_residual()
	}

	/// Display label, cached per locale. Falls back to the local name.
	pub fn label(&self, locale: &str, namespaces: &NamespaceTable, source: &dyn LabelSource) -> String {
		self.labels.get_or_resolve(locale, || {
			let key = format!(
				"{}.{}",
				label_key(&namespaces.display(&self.declaring_type)),
				label_key(&namespaces.display(&self.name))
			);
			source.lookup(&key, locale).unwrap_or_else(|| self.name.local_name().to_string())
		})
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDefinition {
	pub item: ItemDefinition,
	pub required_type: PropertyType,
	pub selector: SelectorType,
	pub selector_options: IndexMap<String, String>,
	pub multiple: bool,
	pub internationalized: bool,
	pub facetable: bool,
	pub hierarchical: bool,
	pub full_text_searchable: bool,
	pub query_orderable: bool,
	pub queryable: bool,
	pub index: IndexMode,
	pub score_boost: f64,
	pub analyzer: Option<String>,
	pub on_conflict: Option<String>,
	pub query_operators: Option<String>,
	pub value_constraints: Vec<String>,
	pub default_values: Vec<DefaultValue>,
}

impl PropertyDefinition {
	pub fn new(name: QualifiedName, declaring_type: QualifiedName, required_type: PropertyType) -> Self {
		Self {
			item: ItemDefinition::new(name, declaring_type),
			required_type,
			selector: SelectorType::default_for(required_type),
			selector_options: IndexMap::new(),
			multiple: false,
			internationalized: false,
			facetable: false,
			hierarchical: false,
			full_text_searchable: true,
			query_orderable: true,
			queryable: true,
			index: IndexMode::default(),
			score_boost: 1.0,
			analyzer: None,
			on_conflict: None,
			query_operators: None,
			value_constraints: Vec::new(),
			default_values: Vec::new(),
		}
	}

	pub fn name(&self) -> &QualifiedName {
		&self.item.name
	}

	pub fn declaring_type(&self) -> &QualifiedName {
		&self.item.declaring_type
	}

	/// Bucket key used for residual definitions: the type, plus `[]` when multiple.
	pub fn unstructured_key(&self) -> String {
		if self.multiple {
			format!("{}[]", self.required_type.as_cnd())
		} else {
			self.required_type.as_cnd().to_string()
		}
	}

	pub fn has_dynamic_default(&self) -> bool {
		self.default_values.iter().any(DefaultValue::is_dynamic)
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeDefinition {
	pub item: ItemDefinition,
	pub required_primary_types: Vec<QualifiedName>,
	pub default_primary_type: Option<QualifiedName>,
	pub same_name_siblings: bool,
}

impl NodeDefinition {
	pub fn new(name: QualifiedName, declaring_type: QualifiedName) -> Self {
		Self {
			item: ItemDefinition::new(name, declaring_type),
			required_primary_types: Vec::new(),
			default_primary_type: None,
			same_name_siblings: false,
		}
	}

	pub fn name(&self) -> &QualifiedName {
		&self.item.name
	}

	pub fn declaring_type(&self) -> &QualifiedName {
		&self.item.declaring_type
	}

	pub fn requires(&self, type_name: &QualifiedName) -> bool {
		self.required_primary_types.contains(type_name)
	}

	/// Bucket key used for residual definitions: the required types in declaration order.
	pub fn unstructured_key(&self) -> String {
		self.required_primary_types.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
	}
}

/// A property or child-node definition, as stored in the typed item index.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemRef {
	Property(std::sync::Arc<PropertyDefinition>),
	Node(std::sync::Arc<NodeDefinition>),
}

impl ItemRef {
	pub fn item(&self) -> &ItemDefinition {
		match self {
			Self::Property(p) => &p.item,
			Self::Node(n) => &n.item,
		}
	}

	/// Identity within the catalog: kind, declaring type, name and, for
	/// residual definitions, the bucket key.
	pub(crate) fn same_item(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Property(a), Self::Property(b)) => {
				a.item.declaring_type == b.item.declaring_type && a.item.name == b.item.name && a.unstructured_key() == b.unstructured_key()
			}
			(Self::Node(a), Self::Node(b)) => {
				a.item.declaring_type == b.item.declaring_type && a.item.name == b.item.name && a.unstructured_key() == b.unstructured_key()
			}
			_ => false,
		}
	}
}
