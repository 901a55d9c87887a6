//! Node type registry.
//!
//! # Role
//!
//! Holds every registered node type together with the namespace table, the
//! mixin extension graph, the typed item index and the definitions files read
//! per module. Two independent instances exist at runtime: the main registry
//! and the provider registry built by [`bootstrap_provider_registry`].
//!
//! # Invariants
//!
//! - One lock guards the whole catalog. Readers share it; mutations take it
//!   exclusively and never upgrade a held read guard.
//! - Node types are fully built before publication; a reader observes either
//!   the previous `Arc<NodeType>` or the new one.
//! - A name is owned by one system id. Re-registering under the same system id
//!   replaces the definition; under another one it is rejected.

mod files;
mod provider;

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use cairn_names::{NamespaceTable, QualifiedName};
use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use tracing::{debug, error, info, warn};

pub use files::{DefinitionsFile, DefinitionsKind};
pub use provider::{bootstrap_provider_registry, deploy_to_provider_registry, system_id_for_definitions};

use crate::cnd::{self, CndReader, ParsedDefinitions};
use crate::error::{RegistryError, Result};
use crate::ledger::DeploymentLedger;
use crate::model::{ItemRef, NodeDefinition, NodeType, PropertyDefinition};
use crate::snapshot::SchemaSnapshotStore;
use crate::version::ModuleVersion;

#[cfg(test)]
mod tests;

/// Outcome of removing every type of one module.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnregisterReport {
	pub removed: Vec<QualifiedName>,
	/// Types kept because another registered type still depends on them.
	pub retained: Vec<(QualifiedName, String)>,
}

impl UnregisterReport {
	pub fn is_complete(&self) -> bool {
		self.retained.is_empty()
	}
}

#[derive(Debug, Default)]
struct Catalog {
	namespaces: NamespaceTable,
	node_types: IndexMap<QualifiedName, Arc<NodeType>>,
	/// Base type → mixins extending it.
	mixin_extensions: IndexMap<QualifiedName, Vec<QualifiedName>>,
	typed_items: IndexMap<String, Vec<ItemRef>>,
	files: IndexMap<String, Vec<DefinitionsFile>>,
}

impl Catalog {
	/// First registered type, other than `name` itself and those `skip`
	/// accepts, that declares `name` as a supertype or requires it for a
	/// child node.
	fn first_dependent(&self, name: &QualifiedName, skip: impl Fn(&QualifiedName) -> bool) -> Option<String> {
		let display = self.namespaces.display(name);
		for node_type in self.node_types.values() {
			if node_type.name() == name || skip(node_type.name()) {
				continue;
			}
			let dependent = self.namespaces.display(node_type.name());
			if node_type.supertypes().contains(name) {
				return Some(format!("cannot unregister {display}: {dependent} declares it as a supertype"));
			}
			if node_type.requires_child_type(name) {
				return Some(format!("cannot unregister {display}: {dependent} requires it for a child node"));
			}
		}
		None
	}

	fn remove(&mut self, name: &QualifiedName) -> Option<Arc<NodeType>> {
		let removed = self.node_types.shift_remove(name)?;
		removed.clear_labels();
		self.evict_items(name);
		self.mixin_extensions.shift_remove(name);
		self.evict_extensions_of(name);
		Some(removed)
	}

	fn evict_items(&mut self, declaring: &QualifiedName) {
		for items in self.typed_items.values_mut() {
			items.retain(|item| item.item().declaring_type != *declaring);
		}
		self.typed_items.retain(|_, items| !items.is_empty());
	}

	fn evict_extensions_of(&mut self, mixin: &QualifiedName) {
		for mixins in self.mixin_extensions.values_mut() {
			mixins.retain(|m| m != mixin);
		}
		self.mixin_extensions.retain(|_, mixins| !mixins.is_empty());
	}

	fn index_items(&mut self, node_type: &NodeType) {
		for item in node_type.items() {
			let bucket = self.typed_items.entry(item.item().item_type.clone()).or_default();
			if !bucket.iter().any(|existing| existing.same_item(&item)) {
				bucket.push(item);
			}
		}
	}

	/// Transitive supertypes of `name` in breadth-first order, without `name`.
	fn supertype_closure(&self, name: &QualifiedName) -> Vec<QualifiedName> {
		let mut seen = FxHashSet::default();
		seen.insert(name.clone());
		let mut out = Vec::new();
		let mut queue = std::collections::VecDeque::new();
		queue.push_back(name.clone());
		while let Some(current) = queue.pop_front() {
			let Some(node_type) = self.node_types.get(&current) else {
				continue;
			};
			for supertype in node_type.supertypes() {
				if seen.insert(supertype.clone()) {
					out.push(supertype.clone());
					queue.push_back(supertype.clone());
				}
			}
		}
		out
	}

	fn is_node_type(&self, name: &QualifiedName, candidate: &QualifiedName) -> bool {
		name == candidate || self.supertype_closure(name).contains(candidate)
	}

	/// Registered types contributing items to a node: the primary type, its
	/// mixins, then all of their supertypes.
	fn effective_types(&self, primary: &QualifiedName, mixins: &[QualifiedName]) -> Vec<Arc<NodeType>> {
		let mut names = Vec::new();
		for root in std::iter::once(primary).chain(mixins) {
			if !names.contains(root) {
				names.push(root.clone());
			}
			for supertype in self.supertype_closure(root) {
				if !names.contains(&supertype) {
					names.push(supertype);
				}
			}
		}
		names.iter().filter_map(|n| self.node_types.get(n).cloned()).collect()
	}

	fn select(&self, system_ids: Option<&[&str]>, keep: impl Fn(&NodeType) -> bool) -> Vec<Arc<NodeType>> {
		self.node_types
			.values()
			.filter(|t| system_ids.is_none_or(|ids| ids.contains(&t.system_id())))
			.filter(|t| keep(t))
			.cloned()
			.collect()
	}
}

/// Registry of node types, see the module documentation.
pub struct NodeTypeRegistry {
	name: String,
	catalog: RwLock<Catalog>,
	ledger: DeploymentLedger,
	snapshots: Option<Arc<dyn SchemaSnapshotStore>>,
}

impl fmt::Debug for NodeTypeRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NodeTypeRegistry")
			.field("name", &self.name)
			.field("node_types", &self.len())
			.field("snapshots", &self.snapshots.is_some())
			.finish_non_exhaustive()
	}
}

impl Default for NodeTypeRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl NodeTypeRegistry {
	pub fn new() -> Self {
		Self {
			name: "main".to_string(),
			catalog: RwLock::new(Catalog::default()),
			ledger: DeploymentLedger::new(),
			snapshots: None,
		}
	}

	/// Name used in log events.
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();
		self
	}

	/// Backs the deployment ledger and module snapshots with `store`.
	pub fn with_snapshot_store(mut self, store: Arc<dyn SchemaSnapshotStore>) -> Self {
		self.snapshots = Some(store);
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn snapshot_store(&self) -> Option<&Arc<dyn SchemaSnapshotStore>> {
		self.snapshots.as_ref()
	}

	pub fn ledger(&self) -> &DeploymentLedger {
		&self.ledger
	}

	pub fn len(&self) -> usize {
		self.catalog.read().node_types.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Snapshot of the namespace table.
	pub fn namespaces(&self) -> NamespaceTable {
		self.catalog.read().namespaces.clone()
	}

	pub fn register_namespace(&self, prefix: &str, uri: &str) -> Result<()> {
		self.catalog.write().namespaces.register(prefix, uri)?;
		Ok(())
	}

	/// Parses a prefixed or expanded name against the current namespaces.
	pub fn parse_name(&self, name: &str) -> Result<QualifiedName> {
		Ok(self.catalog.read().namespaces.parse(name)?)
	}

	/// Renders `name` prefixed when its namespace is known.
	pub fn display_name(&self, name: &QualifiedName) -> String {
		self.catalog.read().namespaces.display(name)
	}

	/// Looks up a type by prefixed or expanded name.
	///
	/// Empty, unparsable and unknown names all fail with
	/// [`RegistryError::NoSuchNodeType`].
	pub fn get_node_type(&self, name: &str) -> Result<Arc<NodeType>> {
		let missing = || RegistryError::NoSuchNodeType(name.to_string());
		if name.is_empty() {
			return Err(missing());
		}
		let catalog = self.catalog.read();
		let qualified = catalog.namespaces.parse(name).map_err(|_| missing())?;
		catalog.node_types.get(&qualified).cloned().ok_or_else(missing)
	}

	pub fn has_node_type(&self, name: &str) -> bool {
		self.get_node_type(name).is_ok()
	}

	pub fn node_type(&self, name: &QualifiedName) -> Option<Arc<NodeType>> {
		self.catalog.read().node_types.get(name).cloned()
	}

	pub fn contains(&self, name: &QualifiedName) -> bool {
		self.catalog.read().node_types.contains_key(name)
	}

	/// Publishes `node_type` under its own name.
	///
	/// The ownership check and the insertion happen under the same write
	/// guard. A replaced definition loses its typed items and the mixin
	/// extension edges it contributed.
	pub fn add_node_type(&self, node_type: NodeType) -> Result<Arc<NodeType>> {
		let node_type = Arc::new(node_type);
		let name = node_type.name().clone();
		let mut catalog = self.catalog.write();
		if let Some(existing) = catalog.node_types.get(&name)
			&& existing.system_id() != node_type.system_id()
		{
			return Err(RegistryError::NodeTypeExists {
				name: catalog.namespaces.display(&name),
				existing: existing.system_id().to_string(),
				provided: node_type.system_id().to_string(),
			});
		}
		let replaced = catalog.node_types.insert(name.clone(), Arc::clone(&node_type)).is_some();
		if replaced {
			catalog.evict_items(&name);
			catalog.evict_extensions_of(&name);
		}
		catalog.index_items(&node_type);
		debug!(
			registry = %self.name,
			node_type = %catalog.namespaces.display(&name),
			system_id = node_type.system_id(),
			replaced,
			"registered node type"
		);
		Ok(node_type)
	}

	/// Records that `mixin` extends `base`. Adding the same edge twice keeps one.
	pub fn add_mixin_extension(&self, mixin: &QualifiedName, base: &QualifiedName) {
		let mut catalog = self.catalog.write();
		let mixins = catalog.mixin_extensions.entry(base.clone()).or_default();
		mixins.retain(|m| m != mixin);
		mixins.push(mixin.clone());
	}

	/// Base type → mixins extending it.
	pub fn mixin_extensions(&self) -> IndexMap<QualifiedName, Vec<QualifiedName>> {
		self.catalog.read().mixin_extensions.clone()
	}

	/// Mixins extending `base`, in registration order.
	pub fn mixin_extensions_of(&self, base: &QualifiedName) -> Vec<Arc<NodeType>> {
		let catalog = self.catalog.read();
		catalog
			.mixin_extensions
			.get(base)
			.into_iter()
			.flatten()
			.filter_map(|m| catalog.node_types.get(m).cloned())
			.collect()
	}

	/// Item definitions tagged with `item_type`.
	pub fn typed_items(&self, item_type: &str) -> Vec<ItemRef> {
		self.catalog.read().typed_items.get(item_type).cloned().unwrap_or_default()
	}

	pub fn item_types(&self) -> Vec<String> {
		self.catalog.read().typed_items.keys().cloned().collect()
	}

	/// Removes one type after scanning the whole catalog for dependents.
	pub fn unregister_node_type(&self, name: &QualifiedName) -> Result<()> {
		let mut catalog = self.catalog.write();
		if !catalog.node_types.contains_key(name) {
			return Err(RegistryError::NoSuchNodeType(catalog.namespaces.display(name)));
		}
		if let Some(violation) = catalog.first_dependent(name, |_| false) {
			return Err(RegistryError::ConstraintViolation(violation));
		}
		catalog.remove(name);
		debug!(registry = %self.name, node_type = %catalog.namespaces.display(name), "unregistered node type");
		Ok(())
	}

	/// Removes all of `names`, or none of them.
	///
	/// Dependencies inside the batch do not block; the first dependent outside
	/// it aborts the whole call.
	pub fn unregister_node_types_by_names(&self, names: &[QualifiedName]) -> Result<()> {
		let mut catalog = self.catalog.write();
		if let Some(missing) = names.iter().find(|n| !catalog.node_types.contains_key(*n)) {
			return Err(RegistryError::NoSuchNodeType(catalog.namespaces.display(missing)));
		}
		let batch: FxHashSet<&QualifiedName> = names.iter().collect();
		for name in names {
			if let Some(violation) = catalog.first_dependent(name, |d| batch.contains(d)) {
				return Err(RegistryError::ConstraintViolation(violation));
			}
		}
		for name in names {
			catalog.remove(name);
		}
		Ok(())
	}

	/// Removes every type contributed by `system_id`, best effort.
	///
	/// Dependencies between the module's own types do not block removal.
	/// Types still required from outside the module stay registered, with
	/// everything they need from it, and are listed in the report. The module version is dropped
	/// from the ledger.
	pub fn unregister_node_types(&self, system_id: &str) -> UnregisterReport {
		let report = {
			let mut catalog = self.catalog.write();
			let module: Vec<QualifiedName> = catalog
				.node_types
				.values()
				.filter(|t| t.system_id() == system_id)
				.map(|t| t.name().clone())
				.collect();
			// Shrink to the types nothing outside the set depends on.
			let mut removable: FxHashSet<QualifiedName> = module.iter().cloned().collect();
			loop {
				let blocked: Vec<QualifiedName> = removable
					.iter()
					.filter(|name| catalog.first_dependent(name, |d| removable.contains(d)).is_some())
					.cloned()
					.collect();
				if blocked.is_empty() {
					break;
				}
				for name in &blocked {
					removable.remove(name);
				}
			}
			let retained = module
				.iter()
				.filter(|name| !removable.contains(*name))
				.map(|name| {
					let reason = catalog.first_dependent(name, |d| removable.contains(d)).unwrap_or_default();
					(name.clone(), reason)
				})
				.collect();
			let mut removed = Vec::with_capacity(removable.len());
			for name in module {
				if removable.contains(&name) {
					catalog.remove(&name);
					removed.push(name);
				}
			}
			UnregisterReport { removed, retained }
		};

		for (_, reason) in &report.retained {
			warn!(registry = %self.name, system_id, "{reason}");
		}
		info!(
			registry = %self.name,
			system_id,
			removed = report.removed.len(),
			retained = report.retained.len(),
			"unregistered module node types"
		);

		self.ledger.remove_version(system_id);
		if let Err(e) = self.save_properties() {
			error!(registry = %self.name, error = %e, "cannot save definitions properties");
		}
		report
	}

	/// Drops every cached label, under the write guard.
	pub fn flush_labels(&self) {
		let catalog = self.catalog.write();
		for node_type in catalog.node_types.values() {
			node_type.clear_labels();
		}
	}

	/// Every type, or those of the given system ids.
	pub fn all_node_types(&self, system_ids: Option<&[&str]>) -> Vec<Arc<NodeType>> {
		self.catalog.read().select(system_ids, |_| true)
	}

	pub fn node_types(&self, system_id: &str) -> Vec<Arc<NodeType>> {
		self.catalog.read().select(Some(std::slice::from_ref(&system_id)), |_| true)
	}

	pub fn primary_node_types(&self, system_ids: Option<&[&str]>) -> Vec<Arc<NodeType>> {
		self.catalog.read().select(system_ids, |t| !t.is_mixin())
	}

	pub fn mixin_node_types(&self, system_ids: Option<&[&str]>) -> Vec<Arc<NodeType>> {
		self.catalog.read().select(system_ids, NodeType::is_mixin)
	}

	/// Modules that contributed definitions files, in first-seen order.
	pub fn system_ids(&self) -> Vec<String> {
		self.catalog.read().files.keys().cloned().collect()
	}

	pub fn files(&self, system_id: &str) -> Vec<DefinitionsFile> {
		self.catalog.read().files.get(system_id).cloned().unwrap_or_default()
	}

	/// Transitive supertypes of `name`, nearest first.
	pub fn supertype_closure(&self, name: &QualifiedName) -> Vec<QualifiedName> {
		self.catalog.read().supertype_closure(name)
	}

	/// True when `name` is `candidate` or inherits from it.
	pub fn is_node_type(&self, name: &QualifiedName, candidate: &QualifiedName) -> bool {
		self.catalog.read().is_node_type(name, candidate)
	}

	/// Definition governing property `property` on a node of `primary` with
	/// `mixins`: named definitions first, then residual ones.
	pub fn applicable_property_definition(
		&self,
		primary: &QualifiedName,
		mixins: &[QualifiedName],
		property: &QualifiedName,
	) -> Option<Arc<PropertyDefinition>> {
		self.property_definition_matching(primary, mixins, property, None)
	}

	/// Like [`Self::applicable_property_definition`], for a value whose
	/// multiplicity is known: a residual definition with the same
	/// multiplicity wins over the first residual.
	pub fn applicable_property_definition_for(
		&self,
		primary: &QualifiedName,
		mixins: &[QualifiedName],
		property: &QualifiedName,
		multiple: bool,
	) -> Option<Arc<PropertyDefinition>> {
		self.property_definition_matching(primary, mixins, property, Some(multiple))
	}

	fn property_definition_matching(
		&self,
		primary: &QualifiedName,
		mixins: &[QualifiedName],
		property: &QualifiedName,
		multiple: Option<bool>,
	) -> Option<Arc<PropertyDefinition>> {
		let types = self.catalog.read().effective_types(primary, mixins);
		if let Some(named) = types.iter().find_map(|t| t.declared_property(property).cloned()) {
			return Some(named);
		}
		let mut residuals = types.iter().flat_map(|t| t.unstructured_property_definitions().values());
		let first = residuals.next()?;
		let Some(multiple) = multiple else {
			return Some(Arc::clone(first));
		};
		let preferred = std::iter::once(first).chain(residuals).find(|d| d.multiple == multiple);
		Some(Arc::clone(preferred.unwrap_or(first)))
	}

	/// Definition governing child `child` of type `child_type` on a node of
	/// `primary` with `mixins`: named definitions first, then residual ones.
	pub fn applicable_child_node_definition(
		&self,
		primary: &QualifiedName,
		mixins: &[QualifiedName],
		child: &QualifiedName,
		child_type: Option<&QualifiedName>,
	) -> Option<Arc<NodeDefinition>> {
		let catalog = self.catalog.read();
		let accepts = |def: &NodeDefinition| {
			child_type.is_none_or(|ty| def.required_primary_types.iter().all(|r| catalog.is_node_type(ty, r)))
		};
		let types = catalog.effective_types(primary, mixins);
		types
			.iter()
			.find_map(|t| t.declared_child_node(child).filter(|d| accepts(d)).cloned())
			.or_else(|| {
				types
					.iter()
					.find_map(|t| t.unstructured_child_node_definitions().values().find(|d| accepts(d)).cloned())
			})
	}

	/// True unless the ledger records a newer version of `system_id` than `version`.
	///
	/// Equal versions count as latest, so redeploying the same version re-reads.
	pub fn is_latest_definitions(&self, system_id: &str, version: Option<&ModuleVersion>) -> bool {
		let Some(version) = version else {
			return true;
		};
		self.ledger.version(system_id).is_none_or(|last| last <= *version)
	}

	/// Reads a definitions file into the registry and records it for `system_id`.
	///
	/// Returns `false` when an older `version` was skipped.
	pub fn add_definitions_file(&self, file: &DefinitionsFile, system_id: &str, version: Option<&ModuleVersion>) -> Result<bool> {
		if let Some(version) = version {
			if !self.is_latest_definitions(system_id, Some(version)) {
				debug!(registry = %self.name, system_id, %version, "newer definitions already deployed");
				return Ok(false);
			}
			self.ledger.set_version(system_id, version);
			if let Err(e) = self.save_properties() {
				error!(registry = %self.name, error = %e, "cannot save definitions properties");
			}
		}

		match file.kind() {
			DefinitionsKind::Cnd => {
				let text = file.read()?;
				CndReader::new(self, file.path().display().to_string(), system_id).parse(&text)?;
			}
			DefinitionsKind::Grouping | DefinitionsKind::Other => {
				debug!(registry = %self.name, file = %file.path().display(), "not a CND file, skipped");
			}
		}

		let mut catalog = self.catalog.write();
		let files = catalog.files.entry(system_id.to_string()).or_default();
		if !files.contains(file) {
			files.push(file.clone());
		}
		Ok(true)
	}

	/// Reads a definitions file without touching the registry.
	pub fn definitions_from_file(&self, file: &DefinitionsFile, system_id: &str) -> Result<Vec<Arc<NodeType>>> {
		if file.kind() != DefinitionsKind::Cnd {
			return Ok(Vec::new());
		}
		let text = file.read()?;
		let parsed = CndReader::new(self, file.path().display().to_string(), system_id).register(false).parse(&text)?;
		Ok(parsed.node_types)
	}

	/// Checks a definitions document without touching the registry.
	///
	/// Fails with [`RegistryError::InvalidDefinitions`] when reading reports
	/// issues and with [`RegistryError::TypeAlreadyExists`] when a type is
	/// owned by another module.
	pub fn validate_definitions(&self, text: &str, filename: &str, system_id: &str) -> Result<ParsedDefinitions> {
		let parsed = CndReader::new(self, filename, system_id).register(false).parse(text)?;
		if parsed.has_issues() {
			return Err(RegistryError::InvalidDefinitions(parsed.issues));
		}
		let catalog = self.catalog.read();
		for node_type in &parsed.node_types {
			if let Some(existing) = catalog.node_types.get(node_type.name())
				&& existing.system_id() != system_id
			{
				return Err(RegistryError::TypeAlreadyExists(catalog.namespaces.display(node_type.name())));
			}
		}
		drop(catalog);
		Ok(parsed)
	}

	/// Reads the system definitions under `dir`, in file name order.
	///
	/// `02-jahia-nodetypes.cnd` is registered as `system-jahia`. A file that
	/// fails to parse is logged and the remaining files are still read.
	/// Returns the number of files read.
	pub fn init_system_definitions(&self, dir: &Path) -> Result<usize> {
		let entries = match fs::read_dir(dir) {
			Ok(entries) => entries,
			Err(e) if e.kind() == ErrorKind::NotFound => {
				warn!(registry = %self.name, dir = %dir.display(), "no system definitions directory");
				return Ok(0);
			}
			Err(error) => {
				return Err(RegistryError::Io {
					path: dir.to_path_buf(),
					error,
				});
			}
		};
		let mut paths: Vec<_> = entries
			.filter_map(|e| e.ok().map(|e| e.path()))
			.filter(|p| p.is_file())
			.collect();
		paths.sort();

		let mut read = 0;
		for path in paths {
			let file = DefinitionsFile::new(path);
			if file.kind() != DefinitionsKind::Cnd {
				continue;
			}
			let system_id = system_id_for_system_file(&file.file_name());
			match self.add_definitions_file(&file, &system_id, None) {
				Ok(_) => read += 1,
				Err(e) => error!(registry = %self.name, file = %file.path().display(), error = %e, "cannot read system definitions"),
			}
		}
		Ok(read)
	}

	/// Loads the ledger from the snapshot store. Saves are enabled afterwards
	/// even when loading failed.
	pub fn init_properties_file(&self) {
		if let Some(store) = &self.snapshots {
			match store.read_definition_properties() {
				Ok(Some(text)) => self.ledger.load(&text),
				Ok(None) => {}
				Err(e) => error!(registry = %self.name, error = %e, "cannot read definitions properties"),
			}
		}
		self.ledger.mark_loaded();
	}

	/// Writes the ledger to the snapshot store once it was loaded.
	pub fn save_properties(&self) -> Result<()> {
		if !self.ledger.is_loaded() {
			return Ok(());
		}
		if let Some(store) = &self.snapshots {
			store.save_definition_properties(&self.ledger.to_properties())?;
		}
		Ok(())
	}

	/// See [`cnd::has_encountered_issues_with_definitions`].
	pub fn has_encountered_issues(&self) -> bool {
		cnd::has_encountered_issues_with_definitions()
	}
}

/// `system-<segment>` where segment is the second dash-separated part of the
/// file stem, or the whole stem when there is none.
pub fn system_id_for_system_file(file_name: &str) -> String {
	let stem = file_name.rsplit_once('.').map_or(file_name, |(stem, _)| stem);
	let segment = stem.split('-').nth(1).unwrap_or(stem);
	format!("system-{segment}")
}
