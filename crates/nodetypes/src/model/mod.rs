//! In-memory definition model: node types and the items they declare.

mod default_value;
mod item;
mod label;
mod node_type;
mod types;

pub use default_value::{DefaultValue, DefaultValueContext};
pub use item::{DEFAULT_ITEM_TYPE, ItemDefinition, ItemRef, NodeDefinition, PropertyDefinition};
pub use label::{LabelCache, LabelSource};
pub use node_type::{NodeType, NodeTypeBuilder};
pub use types::{IndexMode, OnParentVersion, PropertyType, SelectorType};
