//! Node arena of a memory workspace, and the node and property handles over it.

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use super::MemoryWorkspace;
use crate::error::{Result, StoreError};
use crate::events::{Event, EventMask};
use crate::repository::{Node, Property, PropertyValue, Value};

pub(super) const PRIMARY_TYPE: &str = "jcr:primaryType";
pub(super) const MIXIN_TYPES: &str = "jcr:mixinTypes";
const ROOT_TYPE: &str = "rep:root";

pub(super) struct NodeData {
	identifier: String,
	name: String,
	parent: Option<usize>,
	primary_type: String,
	mixins: Vec<String>,
	properties: IndexMap<String, PropertyValue>,
	children: Vec<usize>,
	new: bool,
}

impl NodeData {
	fn new(index: usize, name: &str, parent: Option<usize>, primary_type: &str) -> Self {
		let mut properties = IndexMap::new();
		properties.insert(PRIMARY_TYPE.to_string(), PropertyValue::Single(Value::from(primary_type)));
		Self {
			identifier: format!("node-{index:06}"),
			name: name.to_string(),
			parent,
			primary_type: primary_type.to_string(),
			mixins: Vec::new(),
			properties,
			children: Vec::new(),
			new: parent.is_some(),
		}
	}
}

pub(super) struct Tree {
	nodes: Vec<NodeData>,
	by_identifier: FxHashMap<String, usize>,
}

impl Tree {
	pub(super) fn new() -> Self {
		let root = NodeData::new(0, "", None, ROOT_TYPE);
		let mut by_identifier = FxHashMap::default();
		by_identifier.insert(root.identifier.clone(), 0);
		Self {
			nodes: vec![root],
			by_identifier,
		}
	}

	pub(super) fn resolve(&self, path: &str) -> Option<usize> {
		if !path.starts_with('/') {
			return None;
		}
		path.split('/').filter(|s| !s.is_empty()).try_fold(0, |index, segment| self.child_of(index, segment))
	}

	pub(super) fn by_identifier(&self, identifier: &str) -> Option<usize> {
		self.by_identifier.get(identifier).copied()
	}

	fn child_of(&self, index: usize, name: &str) -> Option<usize> {
		self.nodes[index].children.iter().copied().find(|c| self.nodes[*c].name == name)
	}

	pub(super) fn path(&self, index: usize) -> String {
		let mut segments = Vec::new();
		let mut current = Some(index);
		while let Some(i) = current {
			let node = &self.nodes[i];
			if node.parent.is_some() {
				segments.push(node.name.as_str());
			}
			current = node.parent;
		}
		if segments.is_empty() {
			return "/".to_string();
		}
		segments.reverse();
		format!("/{}", segments.join("/"))
	}

	fn add_child(&mut self, parent: usize, name: &str, primary_type: &str) -> Result<usize> {
		if name.is_empty() || name.contains('/') {
			return Err(StoreError::ConstraintViolation(format!("invalid node name '{name}'")));
		}
		if self.child_of(parent, name).is_some() {
			return Err(StoreError::ConstraintViolation(format!("{} already exists", child_path(&self.path(parent), name))));
		}
		let index = self.nodes.len();
		let node = NodeData::new(index, name, Some(parent), primary_type);
		self.by_identifier.insert(node.identifier.clone(), index);
		self.nodes.push(node);
		self.nodes[parent].children.push(index);
		Ok(index)
	}

	pub(super) fn mark_saved(&mut self) {
		for node in &mut self.nodes {
			node.new = false;
		}
	}
}

fn child_path(parent: &str, name: &str) -> String {
	if parent == "/" { format!("/{name}") } else { format!("{parent}/{name}") }
}

/// Handle on a node of a [`MemoryWorkspace`]. Reads always see the current tree.
pub struct MemoryNode {
	pub(super) workspace: Arc<MemoryWorkspace>,
	pub(super) index: usize,
	pub(super) user: String,
}

impl MemoryNode {
	fn handle(&self, index: usize) -> Arc<dyn Node> {
		Arc::new(MemoryNode {
			workspace: Arc::clone(&self.workspace),
			index,
			user: self.user.clone(),
		})
	}

	fn with<R>(&self, f: impl FnOnce(&NodeData) -> R) -> R {
		f(&self.workspace.tree.lock().nodes[self.index])
	}

	fn record(&self, kind: EventMask, path: String) {
		self.workspace.pending.lock().push(Event::new(kind, path, self.user.clone()));
	}
}

impl Node for MemoryNode {
	fn identifier(&self) -> String {
		self.with(|n| n.identifier.clone())
	}

	fn path(&self) -> String {
		self.workspace.tree.lock().path(self.index)
	}

	fn name(&self) -> String {
		self.with(|n| n.name.clone())
	}

	fn primary_type(&self) -> String {
		self.with(|n| n.primary_type.clone())
	}

	fn mixin_types(&self) -> Vec<String> {
		self.with(|n| n.mixins.clone())
	}

	fn is_new(&self) -> bool {
		self.with(|n| n.new)
	}

	fn parent(&self) -> Result<Arc<dyn Node>> {
		match self.with(|n| n.parent) {
			Some(parent) => Ok(self.handle(parent)),
			None => Err(StoreError::ItemNotFound("the root node has no parent".to_string())),
		}
	}

	fn properties(&self) -> Result<Vec<Arc<dyn Property>>> {
		let names: Vec<String> = self.with(|n| n.properties.keys().cloned().collect());
		Ok(names
			.into_iter()
			.map(|name| {
				Arc::new(MemoryProperty {
					node: MemoryNode {
						workspace: Arc::clone(&self.workspace),
						index: self.index,
						user: self.user.clone(),
					},
					name,
				}) as Arc<dyn Property>
			})
			.collect())
	}

	fn property(&self, name: &str) -> Result<Arc<dyn Property>> {
		if !self.has_property(name) {
			return Err(StoreError::PathNotFound(child_path(&self.path(), name)));
		}
		Ok(Arc::new(MemoryProperty {
			node: MemoryNode {
				workspace: Arc::clone(&self.workspace),
				index: self.index,
				user: self.user.clone(),
			},
			name: name.to_string(),
		}))
	}

	fn has_property(&self, name: &str) -> bool {
		self.with(|n| n.properties.contains_key(name))
	}

	fn set_property(&self, name: &str, value: PropertyValue) -> Result<()> {
		if name == PRIMARY_TYPE || name == MIXIN_TYPES {
			return Err(StoreError::ConstraintViolation(format!("{name} is protected")));
		}
		let (existed, path) = {
			let mut tree = self.workspace.tree.lock();
			let existed = tree.nodes[self.index].properties.insert(name.to_string(), value).is_some();
			(existed, child_path(&tree.path(self.index), name))
		};
		let kind = if existed { EventMask::PROPERTY_CHANGED } else { EventMask::PROPERTY_ADDED };
		self.record(kind, path);
		Ok(())
	}

	fn child(&self, name: &str) -> Result<Arc<dyn Node>> {
		let found = {
			let tree = self.workspace.tree.lock();
			tree.child_of(self.index, name).ok_or_else(|| StoreError::PathNotFound(child_path(&tree.path(self.index), name)))
		};
		found.map(|index| self.handle(index))
	}

	fn has_child(&self, name: &str) -> bool {
		self.workspace.tree.lock().child_of(self.index, name).is_some()
	}

	fn children(&self) -> Result<Vec<Arc<dyn Node>>> {
		let children = self.with(|n| n.children.clone());
		Ok(children.into_iter().map(|index| self.handle(index)).collect())
	}

	fn add_child(&self, name: &str, primary_type: &str) -> Result<Arc<dyn Node>> {
		let (index, path) = {
			let mut tree = self.workspace.tree.lock();
			let index = tree.add_child(self.index, name, primary_type)?;
			(index, tree.path(index))
		};
		self.record(EventMask::NODE_ADDED, path);
		Ok(self.handle(index))
	}

	fn add_mixin(&self, mixin: &str) -> Result<()> {
		let (kind, path) = {
			let mut tree = self.workspace.tree.lock();
			let path = child_path(&tree.path(self.index), MIXIN_TYPES);
			let node = &mut tree.nodes[self.index];
			if node.mixins.iter().any(|m| m == mixin) {
				return Ok(());
			}
			node.mixins.push(mixin.to_string());
			let values = node.mixins.iter().map(|m| Value::from(m.as_str())).collect();
			let existed = node.properties.insert(MIXIN_TYPES.to_string(), PropertyValue::Multiple(values)).is_some();
			(if existed { EventMask::PROPERTY_CHANGED } else { EventMask::PROPERTY_ADDED }, path)
		};
		self.record(kind, path);
		Ok(())
	}
}

/// Handle on a property of a [`MemoryNode`].
pub struct MemoryProperty {
	node: MemoryNode,
	name: String,
}

impl Property for MemoryProperty {
	fn name(&self) -> String {
		self.name.clone()
	}

	fn path(&self) -> String {
		child_path(&self.node.path(), &self.name)
	}

	fn parent(&self) -> Result<Arc<dyn Node>> {
		Ok(self.node.handle(self.node.index))
	}

	fn value(&self) -> Result<PropertyValue> {
		self.node
			.with(|n| n.properties.get(&self.name).cloned())
			.ok_or_else(|| StoreError::PathNotFound(self.path()))
	}
}
