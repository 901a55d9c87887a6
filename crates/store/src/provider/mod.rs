//! Store providers: one repository mounted into the content tree.
//!
//! A [`StoreProvider`] owns the lazily created repository handle, maps
//! application users onto repository accounts, wraps nodes for content
//! sessions and keeps the repository's schema in step with the node type
//! registry.

mod deploy;
mod wrap;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use cairn_config::{AuthenticationMode, ProviderSettings, RepositoryLocator, SkeletonEntry};
use cairn_nodetypes::NodeTypeRegistry;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

pub use self::deploy::{NoopSchemaDeployer, SchemaDeployer, WorkspaceSchemaDeployer};
use crate::error::{Result, StoreError};
use crate::events::{EventListener, EventMask, ObservationDispatcher};
use crate::naming::{NamingContext, RepositoryFactories};
use crate::repository::{Credentials, Node, Repository, Session, UserDirectory, descriptors};
use crate::session::SessionFactory;
use crate::wrapper::DecoratorRegistry;

/// Type of nodes declaring a dynamic mount point.
pub const MOUNT_POINT_TYPE: &str = "jnt:mountPoint";
const SITES_FOLDER: &str = "sites";
const REFERENCEABLE: &str = "mix:referenceable";
const INTERMEDIATE_TYPE: &str = "nt:unstructured";

/// Memoized repository capabilities.
#[derive(Default)]
struct Capabilities {
	versioning: OnceLock<bool>,
	locking: OnceLock<bool>,
	search: OnceLock<bool>,
	update_mixin: OnceLock<bool>,
	slow_connection: OnceLock<bool>,
}

pub struct StoreProvider {
	settings: ProviderSettings,
	registry: Arc<NodeTypeRegistry>,
	provider_registry: Option<Arc<NodeTypeRegistry>>,
	naming: Option<Arc<dyn NamingContext>>,
	factories: Arc<RepositoryFactories>,
	users: Option<Arc<dyn UserDirectory>>,
	decorators: Arc<DecoratorRegistry>,
	deployer: Arc<dyn SchemaDeployer>,
	listeners: Mutex<Vec<Arc<dyn EventListener>>>,
	skeleton: Vec<SkeletonEntry>,
	processing_server: bool,
	repository: OnceLock<Arc<dyn Repository>>,
	repository_init: Mutex<()>,
	starting: AtomicBool,
	running: AtomicBool,
	observers: Mutex<Vec<(Arc<dyn Session>, Arc<dyn EventListener>)>>,
	mount_points: Mutex<Vec<String>>,
	capabilities: Capabilities,
}

impl StoreProvider {
	pub fn new(settings: ProviderSettings, registry: Arc<NodeTypeRegistry>) -> Self {
		Self {
			settings,
			registry,
			provider_registry: None,
			naming: None,
			factories: Arc::new(RepositoryFactories::new()),
			users: None,
			decorators: Arc::new(DecoratorRegistry::new()),
			deployer: Arc::new(NoopSchemaDeployer),
			listeners: Mutex::new(Vec::new()),
			skeleton: Vec::new(),
			processing_server: true,
			repository: OnceLock::new(),
			repository_init: Mutex::new(()),
			starting: AtomicBool::new(false),
			running: AtomicBool::new(false),
			observers: Mutex::new(Vec::new()),
			mount_points: Mutex::new(Vec::new()),
			capabilities: Capabilities::default(),
		}
	}

	/// Registry kept in step with the stored CND snapshots.
	pub fn with_provider_registry(mut self, registry: Arc<NodeTypeRegistry>) -> Self {
		self.provider_registry = Some(registry);
		self
	}

	pub fn with_naming(mut self, naming: Arc<dyn NamingContext>) -> Self {
		self.naming = Some(naming);
		self
	}

	pub fn with_factories(mut self, factories: Arc<RepositoryFactories>) -> Self {
		self.factories = factories;
		self
	}

	pub fn with_users(mut self, users: Arc<dyn UserDirectory>) -> Self {
		self.users = Some(users);
		self
	}

	pub fn with_decorators(mut self, decorators: Arc<DecoratorRegistry>) -> Self {
		self.decorators = decorators;
		self
	}

	pub fn with_deployer(mut self, deployer: Arc<dyn SchemaDeployer>) -> Self {
		self.deployer = deployer;
		self
	}

	/// Nodes created in an empty repository by the root provider.
	pub fn with_skeleton(mut self, skeleton: Vec<SkeletonEntry>) -> Self {
		self.skeleton = skeleton;
		self
	}

	/// Only processing servers deploy node types on start.
	pub fn with_processing_server(mut self, processing_server: bool) -> Self {
		self.processing_server = processing_server;
		self
	}

	pub fn key(&self) -> &str {
		&self.settings.key
	}

	pub fn mount_point(&self) -> &str {
		&self.settings.mount_point
	}

	pub fn settings(&self) -> &ProviderSettings {
		&self.settings
	}

	pub fn registry(&self) -> &Arc<NodeTypeRegistry> {
		&self.registry
	}

	pub fn is_default(&self) -> bool {
		self.settings.is_default()
	}

	pub fn is_running(&self) -> bool {
		self.running.load(Ordering::Acquire)
	}

	/// Adds a content listener. Listeners are attached to the observed
	/// workspaces when the provider starts.
	pub fn add_listener(&self, listener: Arc<dyn EventListener>) {
		self.listeners.lock().push(listener);
	}

	/// Mount point nodes found when the provider started.
	pub fn dynamic_mount_points(&self) -> Vec<String> {
		self.mount_points.lock().clone()
	}

	/// Mode used for logins; always shared while the provider is starting.
	pub fn authentication_mode(&self) -> Option<AuthenticationMode> {
		if self.starting.load(Ordering::Acquire) {
			return Some(AuthenticationMode::Shared);
		}
		self.settings.authentication_mode()
	}

	/// The repository handle, created on first use.
	///
	/// Creation happens at most once, under a lock; later calls read the
	/// published handle without locking. A failed creation is logged and
	/// retried on the next call.
	pub fn repository(&self) -> Option<Arc<dyn Repository>> {
		if let Some(repository) = self.repository.get() {
			return Some(Arc::clone(repository));
		}
		let _init = self.repository_init.lock();
		if let Some(repository) = self.repository.get() {
			return Some(Arc::clone(repository));
		}
		let repository = self.create_repository()?;
		let _ = self.repository.set(Arc::clone(&repository));
		self.rmi_bind(&repository);
		Some(repository)
	}

	/// Installs `repository` as the handle. Fails when one is already published.
	pub fn set_repository(&self, repository: Arc<dyn Repository>) -> bool {
		let _init = self.repository_init.lock();
		let installed = self.repository.set(repository).is_ok();
		if !installed {
			warn!(provider = self.key(), "repository handle already set");
		}
		installed
	}

	fn create_repository(&self) -> Option<Arc<dyn Repository>> {
		let created = match self.settings.locator() {
			Some(RepositoryLocator::Named(name)) => match &self.naming {
				Some(naming) => naming.lookup(&name),
				None => Err(StoreError::RepositoryAccess(format!("no naming context to look up '{name}'"))),
			},
			Some(RepositoryLocator::Remote { factory, url }) => self.factories.create(&factory, &url),
			None => {
				debug!(provider = self.key(), "no repository locator");
				return None;
			}
		};
		match created {
			Ok(repository) => {
				info!(provider = self.key(), "repository acquired");
				Some(repository)
			}
			Err(e) => {
				error!(provider = self.key(), error = %e, "cannot acquire repository");
				None
			}
		}
	}

	fn rmi_bind(&self, repository: &Arc<dyn Repository>) {
		let (Some(name), Some(naming)) = (&self.settings.rmi_bind, &self.naming) else {
			return;
		};
		match naming.rebind(name, Arc::clone(repository)) {
			Ok(()) => info!(provider = self.key(), name, "repository exported"),
			Err(e) => warn!(provider = self.key(), name, error = %e, "cannot export repository"),
		}
	}

	fn rmi_unbind(&self) {
		let (Some(name), Some(naming)) = (&self.settings.rmi_bind, &self.naming) else {
			return;
		};
		if let Err(e) = naming.unbind(name) {
			warn!(provider = self.key(), name, error = %e, "cannot unexport repository");
		}
	}

	/// Opens a repository session for `credentials` in `workspace`.
	///
	/// The credentials are first mapped onto repository accounts:
	/// * in shared mode every login becomes the system account, or the
	///   guest account when a guest user is configured and the login is
	///   not the system sentinel;
	/// * the system and guest sentinels become the configured system and
	///   guest users, with their passwords when set;
	/// * in stored-passwords mode the user's stored account for this
	///   provider is used, falling back to the guest account.
	pub fn get_session(&self, credentials: &Credentials, workspace: Option<&str>) -> Result<Arc<dyn Session>> {
		let repository = self.repository().ok_or_else(|| StoreError::NoRepository(self.key().to_string()))?;
		let mapped = self.map_credentials(credentials);
		debug!(provider = self.key(), user = credentials.user(), login = mapped.user(), workspace, "opening session");
		repository.login(&mapped, workspace)
	}

	pub(crate) fn map_credentials(&self, credentials: &Credentials) -> Credentials {
		let settings = &self.settings;
		let mode = self.authentication_mode();
		let credentials = if mode == Some(AuthenticationMode::Shared) {
			if settings.guest_user.is_none() || credentials.is_system() {
				Credentials::system()
			} else {
				Credentials::guest()
			}
		} else {
			credentials.clone()
		};

		if credentials.is_system()
			&& let Some(system_user) = &settings.system_user
		{
			return account(system_user, settings.system_password.as_deref());
		}
		if credentials.is_guest()
			&& let Some(guest_user) = &settings.guest_user
		{
			return account(guest_user, settings.guest_password.as_deref());
		}
		if mode == Some(AuthenticationMode::StoredPasswords) {
			let stored = self.users.as_ref().and_then(|users| {
				let user = credentials.user();
				let password = users.user_property(user, &format!("storedPassword_{}", self.key()))?;
				let login = users
					.user_property(user, &format!("storedUsername_{}", self.key()))
					.unwrap_or_else(|| user.to_string());
				Some(Credentials::new(login, password))
			});
			return stored.unwrap_or_else(|| match &settings.guest_user {
				Some(guest_user) => account(guest_user, settings.guest_password.as_deref()),
				None => Credentials::guest(),
			});
		}
		credentials
	}

	/// True when the repository supports full versioning.
	pub fn is_versioning_available(&self) -> bool {
		self.capability(&self.capabilities.versioning, |repository| {
			flag(repository, descriptors::VERSIONING_SUPPORTED) && flag(repository, descriptors::SIMPLE_VERSIONING_SUPPORTED)
		})
	}

	pub fn is_locking_available(&self) -> bool {
		self.capability(&self.capabilities.locking, |repository| flag(repository, descriptors::LOCKING_SUPPORTED))
	}

	/// True when the repository declares at least one query language.
	pub fn is_search_available(&self) -> bool {
		self.capability(&self.capabilities.search, |repository| {
			repository.descriptor_values(descriptors::QUERY_LANGUAGES).is_some_and(|v| !v.is_empty())
		})
	}

	pub fn is_update_mixin_available(&self) -> bool {
		self.capability(&self.capabilities.update_mixin, |repository| {
			flag(repository, descriptors::UPDATE_MIXIN_NODE_TYPES_SUPPORTED)
		})
	}

	pub fn is_slow_connection(&self) -> bool {
		self.capability(&self.capabilities.slow_connection, |repository| flag(repository, descriptors::SLOW_CONNECTION))
	}

	/// Overrides the slow connection flag. Ignored once the flag was read.
	pub fn set_slow_connection(&self, slow: bool) {
		let _ = self.capabilities.slow_connection.set(slow);
	}

	fn capability(&self, cell: &OnceLock<bool>, resolve: impl FnOnce(&dyn Repository) -> bool) -> bool {
		if let Some(value) = cell.get() {
			return *value;
		}
		let Some(repository) = self.repository() else {
			return false;
		};
		*cell.get_or_init(|| resolve(repository.as_ref()))
	}

	/// Starts the provider and registers it with `factory`.
	///
	/// Logins use shared authentication for the duration of the start, so the
	/// provider can deploy definitions and create content as the system
	/// account whatever its configured mode.
	pub fn start(self: &Arc<Self>, factory: &SessionFactory) -> Result<()> {
		info!(provider = self.key(), mount_point = self.mount_point(), "starting provider");
		self.starting.store(true, Ordering::Release);
		factory.add_provider(Arc::clone(self));
		let result = self.start_inner();
		self.starting.store(false, Ordering::Release);
		match result {
			Ok(()) => {
				self.running.store(true, Ordering::Release);
				info!(provider = self.key(), "provider started");
				Ok(())
			}
			Err(e) => {
				error!(provider = self.key(), error = %e, "provider failed to start");
				Err(StoreError::Initialization {
					key: self.key().to_string(),
					message: e.to_string(),
				})
			}
		}
	}

	fn start_inner(&self) -> Result<()> {
		if self.processing_server {
			self.init_node_types();
		}
		self.init_observers()?;
		self.init_content()?;
		if self.settings.dynamic_mount_points {
			self.init_dynamic_mount_points()?;
		}
		Ok(())
	}

	/// Removes the provider from `factory` and releases what it exported.
	pub fn stop(&self, factory: &SessionFactory) {
		info!(provider = self.key(), "stopping provider");
		factory.remove_provider(self.key());
		for (session, dispatcher) in self.observers.lock().drain(..) {
			if let Err(e) = session.workspace().remove_event_listener(&dispatcher) {
				warn!(provider = self.key(), error = %e, "could not remove observation listener");
			}
			session.logout();
		}
		self.rmi_unbind();
		self.running.store(false, Ordering::Release);
	}

	fn init_observers(&self) -> Result<()> {
		let listeners = self.listeners.lock().clone();
		for workspace in &self.settings.observed_workspaces {
			let session = self.get_session(&Credentials::system(), Some(workspace))?;
			let dispatcher: Arc<dyn EventListener> =
				Arc::new(ObservationDispatcher::new(workspace.clone(), listeners.clone()));
			session
				.workspace()
				.add_event_listener(Arc::clone(&dispatcher), EventMask::CONTENT_CHANGES, "/", true)?;
			debug!(provider = self.key(), workspace, listeners = listeners.len(), "observing workspace");
			self.observers.lock().push((session, dispatcher));
		}
		Ok(())
	}

	/// Creates the skeleton in an empty repository. Only the root provider
	/// owns content structure.
	fn init_content(&self) -> Result<()> {
		if !self.is_default() {
			return Ok(());
		}
		let session = self.get_session(&Credentials::system(), None)?;
		let root = session.root()?;
		if root.has_child(SITES_FOLDER) {
			session.logout();
			return Ok(());
		}
		info!(provider = self.key(), entries = self.skeleton.len(), "creating initial content");
		root.add_mixin(REFERENCEABLE)?;
		for entry in self.skeleton.iter().filter(|e| e.path.starts_with('/')) {
			create_path(&root, entry)?;
		}
		session.save()?;
		session.logout();
		Ok(())
	}

	fn init_dynamic_mount_points(&self) -> Result<()> {
		let session = self.get_session(&Credentials::system(), None)?;
		let mut found = Vec::new();
		let mut pending = vec![session.root()?];
		while let Some(node) = pending.pop() {
			if self.is_type(&node, MOUNT_POINT_TYPE) {
				info!(provider = self.key(), path = %node.path(), "found mount point");
				found.push(node.path());
				continue;
			}
			let mut children = node.children()?;
			children.reverse();
			pending.extend(children);
		}
		session.logout();
		*self.mount_points.lock() = found;
		Ok(())
	}

	pub(crate) fn is_type(&self, node: &Arc<dyn Node>, type_name: &str) -> bool {
		let (Ok(name), Ok(candidate)) = (self.registry.parse_name(&node.primary_type()), self.registry.parse_name(type_name))
		else {
			return false;
		};
		self.registry.is_node_type(&name, &candidate)
	}
}

fn account(user: &str, password: Option<&str>) -> Credentials {
	match password {
		Some(password) => Credentials::new(user, password),
		None => Credentials::trusted(user),
	}
}

fn flag(repository: &dyn Repository, key: &str) -> bool {
	match repository.descriptor(key) {
		Some(value) => value.as_bool().unwrap_or_else(|| {
			warn!(key, %value, "descriptor is not a boolean");
			false
		}),
		None => false,
	}
}

fn create_path(root: &Arc<dyn Node>, entry: &SkeletonEntry) -> Result<()> {
	let segments: Vec<&str> = entry.path.split('/').filter(|s| !s.is_empty()).collect();
	let mut current = Arc::clone(root);
	for (i, segment) in segments.iter().enumerate() {
		let last = i + 1 == segments.len();
		if current.has_child(segment) {
			current = current.child(segment)?;
			continue;
		}
		let primary_type = if last { entry.primary_type.as_str() } else { INTERMEDIATE_TYPE };
		current = current.add_child(segment, primary_type)?;
		if last {
			for mixin in &entry.mixins {
				current.add_mixin(mixin)?;
			}
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests;
