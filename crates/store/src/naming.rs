//! Where repository handles come from: a naming context and remote factories.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::{Result, StoreError};
use crate::repository::Repository;

/// Directory of repository handles by name.
pub trait NamingContext: Send + Sync {
	fn lookup(&self, name: &str) -> Result<Arc<dyn Repository>>;

	/// Binds `repository` under `name`, replacing any previous binding.
	fn rebind(&self, name: &str, repository: Arc<dyn Repository>) -> Result<()>;

	fn unbind(&self, name: &str) -> Result<()>;
}

/// Naming context held in memory.
#[derive(Default)]
pub struct MemoryNamingContext {
	bindings: RwLock<FxHashMap<String, Arc<dyn Repository>>>,
}

impl MemoryNamingContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_bound(&self, name: &str) -> bool {
		self.bindings.read().contains_key(name)
	}
}

impl NamingContext for MemoryNamingContext {
	fn lookup(&self, name: &str) -> Result<Arc<dyn Repository>> {
		self.bindings
			.read()
			.get(name)
			.cloned()
			.ok_or_else(|| StoreError::RepositoryAccess(format!("nothing bound under '{name}'")))
	}

	fn rebind(&self, name: &str, repository: Arc<dyn Repository>) -> Result<()> {
		self.bindings.write().insert(name.to_string(), repository);
		Ok(())
	}

	fn unbind(&self, name: &str) -> Result<()> {
		match self.bindings.write().remove(name) {
			Some(_) => Ok(()),
			None => Err(StoreError::RepositoryAccess(format!("nothing bound under '{name}'"))),
		}
	}
}

/// Builds a repository handle from a URL.
pub type RepositoryConstructor = Box<dyn Fn(&str) -> Result<Arc<dyn Repository>> + Send + Sync>;

/// Remote repository factories, by the tag a provider names in `factory`.
#[derive(Default)]
pub struct RepositoryFactories {
	constructors: IndexMap<String, RepositoryConstructor>,
}

impl RepositoryFactories {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(mut self, tag: impl Into<String>, constructor: RepositoryConstructor) -> Self {
		self.constructors.insert(tag.into(), constructor);
		self
	}

	pub fn tags(&self) -> impl Iterator<Item = &str> {
		self.constructors.keys().map(String::as_str)
	}

	pub fn create(&self, tag: &str, url: &str) -> Result<Arc<dyn Repository>> {
		let constructor = self
			.constructors
			.get(tag)
			.ok_or_else(|| StoreError::RepositoryAccess(format!("no repository factory '{tag}'")))?;
		constructor(url)
	}
}
