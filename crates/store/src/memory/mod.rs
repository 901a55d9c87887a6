//! In-memory repository.
//!
//! Implements the [`crate::repository`] contracts over a node arena per
//! workspace. Changes are recorded per workspace and delivered to listeners
//! when any session of that workspace saves, after every lock is released, so
//! listeners may write and save in turn.

mod tree;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

pub use self::tree::{MemoryNode, MemoryProperty};
use self::tree::Tree;
use crate::error::{Result, StoreError};
use crate::events::{Event, EventListener, EventMask};
use crate::repository::{
	Credentials, GUEST_SENTINEL, Node, Repository, SYSTEM_SENTINEL, SchemaManager, Session, UserDirectory, Value, Workspace,
};

/// Workspace used when a login names none.
pub const DEFAULT_WORKSPACE: &str = "default";

/// A repository held entirely in memory.
pub struct MemoryRepository {
	accounts: RwLock<FxHashMap<String, Option<String>>>,
	descriptors: RwLock<FxHashMap<String, Vec<Value>>>,
	workspaces: Mutex<IndexMap<String, Arc<MemoryWorkspace>>>,
	schema: Option<Arc<MemorySchemaManager>>,
	logins: Mutex<Vec<String>>,
	open_sessions: Arc<AtomicUsize>,
}

impl Default for MemoryRepository {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryRepository {
	/// Repository accepting custom type registration. Only the system and
	/// guest sentinels can log in until accounts are added.
	pub fn new() -> Self {
		Self {
			accounts: RwLock::new(FxHashMap::default()),
			descriptors: RwLock::new(FxHashMap::default()),
			workspaces: Mutex::new(IndexMap::new()),
			schema: Some(Arc::new(MemorySchemaManager::default())),
			logins: Mutex::new(Vec::new()),
			open_sessions: Arc::new(AtomicUsize::new(0)),
		}
	}

	/// Drops the schema manager: workspaces report no custom type support.
	pub fn without_schema(mut self) -> Self {
		self.schema = None;
		self
	}

	/// Account `user`; `None` accepts only trusted logins.
	pub fn with_account(self, user: &str, password: Option<&str>) -> Self {
		self.accounts.write().insert(user.to_string(), password.map(str::to_string));
		self
	}

	pub fn with_descriptor(self, key: &str, values: Vec<Value>) -> Self {
		self.descriptors.write().insert(key.to_string(), values);
		self
	}

	pub fn schema_manager(&self) -> Option<&Arc<MemorySchemaManager>> {
		self.schema.as_ref()
	}

	/// User ids of every successful login, oldest first.
	pub fn logins(&self) -> Vec<String> {
		self.logins.lock().clone()
	}

	/// Sessions logged in and not yet logged out.
	pub fn open_sessions(&self) -> usize {
		self.open_sessions.load(Ordering::Acquire)
	}

	/// The workspace `name`, created on first use.
	pub fn workspace(&self, name: &str) -> Arc<MemoryWorkspace> {
		let mut workspaces = self.workspaces.lock();
		Arc::clone(workspaces.entry(name.to_string()).or_insert_with(|| {
			debug!(workspace = name, "creating memory workspace");
			Arc::new(MemoryWorkspace::new(name, self.schema.clone()))
		}))
	}

	fn authenticate(&self, credentials: &Credentials) -> Result<()> {
		let user = credentials.user();
		if user.starts_with(SYSTEM_SENTINEL) || user.starts_with(GUEST_SENTINEL) {
			return Ok(());
		}
		let accounts = self.accounts.read();
		let Some(stored) = accounts.get(user) else {
			return Err(StoreError::RepositoryAccess(format!("unknown user '{user}'")));
		};
		match (credentials.password(), stored) {
			(None, _) => Ok(()),
			(Some(given), Some(expected)) if given == expected => Ok(()),
			_ => Err(StoreError::RepositoryAccess(format!("invalid password for '{user}'"))),
		}
	}
}

impl Repository for MemoryRepository {
	fn login(&self, credentials: &Credentials, workspace: Option<&str>) -> Result<Arc<dyn Session>> {
		self.authenticate(credentials)?;
		let workspace = self.workspace(workspace.unwrap_or(DEFAULT_WORKSPACE));
		self.logins.lock().push(credentials.user().to_string());
		trace!(user = credentials.user(), workspace = %workspace.name, "login");
		self.open_sessions.fetch_add(1, Ordering::AcqRel);
		Ok(Arc::new(MemorySession {
			workspace,
			user: credentials.user().to_string(),
			open_sessions: Arc::clone(&self.open_sessions),
			logged_out: AtomicBool::new(false),
		}))
	}

	fn descriptor(&self, key: &str) -> Option<Value> {
		self.descriptors.read().get(key).and_then(|v| v.first().cloned())
	}

	fn descriptor_values(&self, key: &str) -> Option<Vec<Value>> {
		self.descriptors.read().get(key).cloned()
	}
}

struct Registration {
	listener: Arc<dyn EventListener>,
	mask: EventMask,
	path: String,
	deep: bool,
}

impl Registration {
	fn accepts(&self, event: &Event) -> bool {
		if !self.mask.intersects(event.kind) {
			return false;
		}
		let parent = event.path.rsplit_once('/').map(|(p, _)| if p.is_empty() { "/" } else { p }).unwrap_or("/");
		if self.deep {
			self.path == "/" || event.path == self.path || event.path.starts_with(&format!("{}/", self.path))
		} else {
			parent == self.path
		}
	}
}

/// One workspace of a [`MemoryRepository`].
pub struct MemoryWorkspace {
	name: String,
	tree: Mutex<Tree>,
	pending: Mutex<Vec<Event>>,
	listeners: Mutex<Vec<Registration>>,
	schema: Option<Arc<MemorySchemaManager>>,
}

impl MemoryWorkspace {
	fn new(name: &str, schema: Option<Arc<MemorySchemaManager>>) -> Self {
		Self {
			name: name.to_string(),
			tree: Mutex::new(Tree::new()),
			pending: Mutex::new(Vec::new()),
			listeners: Mutex::new(Vec::new()),
			schema,
		}
	}

	pub fn listener_count(&self) -> usize {
		self.listeners.lock().len()
	}

	fn node_handle(self: &Arc<Self>, index: usize, user: &str) -> Arc<dyn Node> {
		Arc::new(MemoryNode {
			workspace: Arc::clone(self),
			index,
			user: user.to_string(),
		})
	}

	fn commit(&self) {
		self.tree.lock().mark_saved();
		let events = std::mem::take(&mut *self.pending.lock());
		if events.is_empty() {
			return;
		}
		let targets: Vec<(Arc<dyn EventListener>, Vec<Event>)> = self
			.listeners
			.lock()
			.iter()
			.map(|r| (Arc::clone(&r.listener), events.iter().filter(|e| r.accepts(e)).cloned().collect::<Vec<_>>()))
			.filter(|(_, batch)| !batch.is_empty())
			.collect();
		for (listener, batch) in targets {
			listener.on_events(&self.name, &batch);
		}
	}
}

impl Workspace for MemoryWorkspace {
	fn name(&self) -> String {
		self.name.clone()
	}

	fn add_event_listener(&self, listener: Arc<dyn EventListener>, mask: EventMask, path: &str, deep: bool) -> Result<()> {
		self.listeners.lock().push(Registration {
			listener,
			mask,
			path: path.to_string(),
			deep,
		});
		Ok(())
	}

	fn remove_event_listener(&self, listener: &Arc<dyn EventListener>) -> Result<()> {
		self.listeners
			.lock()
			.retain(|r| !std::ptr::addr_eq(Arc::as_ptr(&r.listener), Arc::as_ptr(listener)));
		Ok(())
	}

	fn schema(&self) -> Option<Arc<dyn SchemaManager>> {
		self.schema.clone().map(|s| s as Arc<dyn SchemaManager>)
	}
}

/// Session over a [`MemoryWorkspace`]. Saving commits the whole workspace.
pub struct MemorySession {
	workspace: Arc<MemoryWorkspace>,
	user: String,
	open_sessions: Arc<AtomicUsize>,
	logged_out: AtomicBool,
}

impl Session for MemorySession {
	fn user_id(&self) -> String {
		self.user.clone()
	}

	fn workspace(&self) -> Arc<dyn Workspace> {
		Arc::clone(&self.workspace) as Arc<dyn Workspace>
	}

	fn root(&self) -> Result<Arc<dyn Node>> {
		Ok(self.workspace.node_handle(0, &self.user))
	}

	fn node(&self, path: &str) -> Result<Arc<dyn Node>> {
		let index = self.workspace.tree.lock().resolve(path);
		index
			.map(|i| self.workspace.node_handle(i, &self.user))
			.ok_or_else(|| StoreError::PathNotFound(path.to_string()))
	}

	fn node_by_identifier(&self, identifier: &str) -> Result<Arc<dyn Node>> {
		let index = self.workspace.tree.lock().by_identifier(identifier);
		index
			.map(|i| self.workspace.node_handle(i, &self.user))
			.ok_or_else(|| StoreError::ItemNotFound(identifier.to_string()))
	}

	fn save(&self) -> Result<()> {
		self.workspace.commit();
		Ok(())
	}

	fn logout(&self) {
		if !self.logged_out.swap(true, Ordering::AcqRel) {
			self.open_sessions.fetch_sub(1, Ordering::AcqRel);
			trace!(user = %self.user, workspace = %self.workspace.name, "logout");
		}
	}
}

/// Records definitions registered with a [`MemoryRepository`].
#[derive(Default)]
pub struct MemorySchemaManager {
	definitions: Mutex<IndexMap<String, String>>,
	rejecting: AtomicBool,
}

impl MemorySchemaManager {
	/// CND text registered for `system_id`.
	pub fn registered(&self, system_id: &str) -> Option<String> {
		self.definitions.lock().get(system_id).cloned()
	}

	pub fn system_ids(&self) -> Vec<String> {
		self.definitions.lock().keys().cloned().collect()
	}

	/// Makes every later registration fail.
	pub fn reject_registrations(&self, reject: bool) {
		self.rejecting.store(reject, Ordering::SeqCst);
	}
}

impl SchemaManager for MemorySchemaManager {
	fn register_definitions(&self, system_id: &str, cnd: &str) -> Result<()> {
		if self.rejecting.load(Ordering::SeqCst) {
			return Err(StoreError::RepositoryAccess(format!("registration of '{system_id}' rejected")));
		}
		self.definitions.lock().insert(system_id.to_string(), cnd.to_string());
		Ok(())
	}

	fn unregister_definitions(&self, system_id: &str) -> Result<()> {
		self.definitions.lock().shift_remove(system_id);
		Ok(())
	}

	fn has_definitions(&self, system_id: &str) -> bool {
		self.definitions.lock().contains_key(system_id)
	}
}

/// User directory held in memory.
#[derive(Default)]
pub struct MemoryUserDirectory {
	properties: RwLock<FxHashMap<(String, String), String>>,
}

impl MemoryUserDirectory {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set(&self, user: &str, key: &str, value: &str) {
		self.properties.write().insert((user.to_string(), key.to_string()), value.to_string());
	}
}

impl UserDirectory for MemoryUserDirectory {
	fn user_property(&self, user: &str, key: &str) -> Option<String> {
		self.properties.read().get(&(user.to_string(), key.to_string())).cloned()
	}
}

#[cfg(test)]
mod tests;
