//! Content sessions and the factory routing them to providers.

use std::cell::RefCell;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::provider::StoreProvider;
use crate::repository::{Credentials, Session};
use crate::wrapper::NodeWrapper;

thread_local! {
	static ALIASED_USER: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Restores the previous aliased user of the thread when dropped.
#[must_use = "the alias is removed when the guard is dropped"]
pub struct AliasedUserGuard {
	previous: Option<String>,
}

impl Drop for AliasedUserGuard {
	fn drop(&mut self) {
		let previous = self.previous.take();
		ALIASED_USER.with(|cell| *cell.borrow_mut() = previous);
	}
}

/// Registry of started providers, by key and by mount point.
#[derive(Default)]
pub struct SessionFactory {
	providers: RwLock<IndexMap<String, Arc<StoreProvider>>>,
}

impl SessionFactory {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_provider(&self, provider: Arc<StoreProvider>) {
		debug!(provider = provider.key(), mount_point = provider.mount_point(), "adding provider");
		self.providers.write().insert(provider.key().to_string(), provider);
	}

	pub fn remove_provider(&self, key: &str) -> Option<Arc<StoreProvider>> {
		debug!(provider = key, "removing provider");
		self.providers.write().shift_remove(key)
	}

	pub fn provider(&self, key: &str) -> Option<Arc<StoreProvider>> {
		self.providers.read().get(key).cloned()
	}

	/// Providers ordered by mount point.
	pub fn providers(&self) -> Vec<Arc<StoreProvider>> {
		let mut providers: Vec<_> = self.providers.read().values().cloned().collect();
		providers.sort_by(|a, b| a.mount_point().cmp(b.mount_point()));
		providers
	}

	/// Provider with the longest mount point containing `path`.
	pub fn provider_for_path(&self, path: &str) -> Option<Arc<StoreProvider>> {
		self.providers
			.read()
			.values()
			.filter(|p| mounted_under(path, p.mount_point()))
			.max_by_key(|p| p.mount_point().len())
			.cloned()
	}

	/// User impersonated on this thread, `None` outside an alias scope.
	pub fn current_aliased_user() -> Option<String> {
		ALIASED_USER.with(|cell| cell.borrow().clone())
	}

	/// Makes `user` the aliased user of this thread until the guard drops.
	pub fn alias_user(user: &str) -> AliasedUserGuard {
		let previous = ALIASED_USER.with(|cell| cell.borrow_mut().replace(user.to_string()));
		AliasedUserGuard { previous }
	}

	/// Session for an application user. Providers map the user onto their
	/// own accounts at login.
	pub fn login(&self, credentials: Credentials, workspace: Option<&str>, locale: Option<&str>) -> ContentSession {
		ContentSession::new(credentials, workspace, locale)
	}

	pub fn system_session(&self, workspace: Option<&str>, locale: Option<&str>) -> ContentSession {
		ContentSession::new(Credentials::system(), workspace, locale)
	}

	/// Wrapper for the node at `path`, served by the provider mounted there.
	pub fn node(&self, session: &ContentSession, path: &str) -> Result<Arc<NodeWrapper>> {
		let provider = self.provider_for_path(path).ok_or_else(|| StoreError::PathNotFound(path.to_string()))?;
		let local = local_path(path, provider.mount_point());
		let node = session.provider_session(&provider)?.node(&local)?;
		provider.node_wrapper_at(node, Some(path), session)
	}
}

fn mounted_under(path: &str, mount_point: &str) -> bool {
	mount_point == "/" || path == mount_point || path.strip_prefix(mount_point).is_some_and(|rest| rest.starts_with('/'))
}

fn local_path(path: &str, mount_point: &str) -> String {
	if mount_point == "/" {
		return path.to_string();
	}
	match path.strip_prefix(mount_point) {
		Some("") | None => "/".to_string(),
		Some(rest) => rest.to_string(),
	}
}

/// An application session spanning every provider it touches.
///
/// Provider sessions are opened on first use and kept until [`logout`].
/// Wrappers are cached by provider and node identifier.
///
/// [`logout`]: ContentSession::logout
pub struct ContentSession {
	credentials: Credentials,
	workspace: String,
	locale: Option<String>,
	version_date: Option<DateTime<Utc>>,
	version_label: Option<String>,
	provider_sessions: Mutex<FxHashMap<String, Arc<dyn Session>>>,
	node_cache: Mutex<FxHashMap<(String, String), Arc<NodeWrapper>>>,
}

impl ContentSession {
	pub fn new(credentials: Credentials, workspace: Option<&str>, locale: Option<&str>) -> Self {
		Self {
			credentials,
			workspace: workspace.unwrap_or(crate::memory::DEFAULT_WORKSPACE).to_string(),
			locale: locale.map(str::to_string),
			version_date: None,
			version_label: None,
			provider_sessions: Mutex::new(FxHashMap::default()),
			node_cache: Mutex::new(FxHashMap::default()),
		}
	}

	/// Views content as it was at `date`.
	pub fn with_version_date(mut self, date: DateTime<Utc>) -> Self {
		self.version_date = Some(date);
		self
	}

	/// Views content as captured under `label`.
	pub fn with_version_label(mut self, label: impl Into<String>) -> Self {
		self.version_label = Some(label.into());
		self
	}

	pub fn credentials(&self) -> &Credentials {
		&self.credentials
	}

	pub fn user(&self) -> &str {
		self.credentials.user()
	}

	pub fn workspace(&self) -> &str {
		&self.workspace
	}

	pub fn locale(&self) -> Option<&str> {
		self.locale.as_deref()
	}

	pub fn version_date(&self) -> Option<DateTime<Utc>> {
		self.version_date
	}

	pub fn version_label(&self) -> Option<&str> {
		self.version_label.as_deref()
	}

	/// True when the session views a version rather than live content.
	pub fn is_versioned(&self) -> bool {
		self.version_date.is_some() || self.version_label.is_some()
	}

	/// Session on `provider`'s repository, logged in on first use.
	pub fn provider_session(&self, provider: &StoreProvider) -> Result<Arc<dyn Session>> {
		if let Some(session) = self.provider_sessions.lock().get(provider.key()) {
			return Ok(Arc::clone(session));
		}
		let session = provider.get_session(&self.credentials, Some(&self.workspace))?;
		self.provider_sessions
			.lock()
			.insert(provider.key().to_string(), Arc::clone(&session));
		Ok(session)
	}

	/// Wrapper cached for node `identifier` of provider `provider_key`.
	pub fn cached_node(&self, provider_key: &str, identifier: &str) -> Option<Arc<NodeWrapper>> {
		self.node_cache
			.lock()
			.get(&(provider_key.to_string(), identifier.to_string()))
			.cloned()
	}

	pub(crate) fn cache_node(&self, wrapper: Arc<NodeWrapper>) {
		let key = (wrapper.provider_key().to_string(), wrapper.identifier());
		self.node_cache.lock().insert(key, wrapper);
	}

	pub fn flush_caches(&self) {
		self.node_cache.lock().clear();
	}

	/// Saves every open provider session.
	pub fn save(&self) -> Result<()> {
		let sessions: Vec<_> = self.provider_sessions.lock().values().cloned().collect();
		for session in sessions {
			session.save()?;
		}
		Ok(())
	}

	pub fn logout(&self) {
		for (key, session) in self.provider_sessions.lock().drain() {
			debug!(provider = %key, "logging out");
			session.logout();
		}
		self.flush_caches();
	}
}

impl Drop for ContentSession {
	fn drop(&mut self) {
		let open = self.provider_sessions.get_mut().len();
		if open > 0 {
			warn!(user = %self.credentials.user(), open, "content session dropped without logout");
			self.logout();
		}
	}
}
