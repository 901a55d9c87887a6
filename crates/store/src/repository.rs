//! Contracts of the content repository a provider sits on.
//!
//! The repository engine itself is an external collaborator. These traits are
//! the only surface the provider layer consumes; [`crate::memory`] implements
//! them for tests and the command line.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::events::{EventListener, EventMask};

/// User id prefix marking a login as the system principal.
pub const SYSTEM_SENTINEL: &str = " system ";
/// User id prefix marking a login as the guest principal.
pub const GUEST_SENTINEL: &str = " guest ";

/// Repository descriptor keys read by the capability checks.
pub mod descriptors {
	pub const VERSIONING_SUPPORTED: &str = "option.versioning.supported";
	pub const SIMPLE_VERSIONING_SUPPORTED: &str = "option.simple.versioning.supported";
	pub const LOCKING_SUPPORTED: &str = "option.locking.supported";
	pub const QUERY_LANGUAGES: &str = "query.languages";
	pub const UPDATE_MIXIN_NODE_TYPES_SUPPORTED: &str = "option.update.mixin.node.types.supported";
	pub const SLOW_CONNECTION: &str = "jahia.provider.slowConnection";
}

/// Login credentials. A missing password marks a trusted, pre-authenticated login.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
	user: String,
	password: Option<String>,
}

impl Credentials {
	pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
		Self {
			user: user.into(),
			password: Some(password.into()),
		}
	}

	/// Trusted credentials for `user`, without a password.
	pub fn trusted(user: impl Into<String>) -> Self {
		Self {
			user: user.into(),
			password: None,
		}
	}

	pub fn system() -> Self {
		Self::trusted(SYSTEM_SENTINEL)
	}

	pub fn guest() -> Self {
		Self::trusted(GUEST_SENTINEL)
	}

	pub fn user(&self) -> &str {
		&self.user
	}

	pub fn password(&self) -> Option<&str> {
		self.password.as_deref()
	}

	pub fn is_system(&self) -> bool {
		self.user.starts_with(SYSTEM_SENTINEL)
	}

	pub fn is_guest(&self) -> bool {
		self.user.starts_with(GUEST_SENTINEL)
	}
}

impl fmt::Debug for Credentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Credentials")
			.field("user", &self.user)
			.field("password", &self.password.as_ref().map(|_| "***"))
			.finish()
	}
}

/// A single stored value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	String(String),
	Long(i64),
	Double(f64),
	Boolean(bool),
}

impl Value {
	/// Boolean view; strings convert when they spell `true` or `false`.
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Boolean(b) => Some(*b),
			Self::String(s) => s.parse().ok(),
			_ => None,
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::String(s) => f.write_str(s),
			Self::Long(v) => write!(f, "{v}"),
			Self::Double(v) => write!(f, "{v}"),
			Self::Boolean(v) => write!(f, "{v}"),
		}
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Self::String(s.to_string())
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Self::String(s)
	}
}

/// Value of a property: one value, or an array for multi-valued properties.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
	Single(Value),
	Multiple(Vec<Value>),
}

impl PropertyValue {
	pub fn is_multiple(&self) -> bool {
		matches!(self, Self::Multiple(_))
	}

	pub fn values(&self) -> &[Value] {
		match self {
			Self::Single(v) => std::slice::from_ref(v),
			Self::Multiple(vs) => vs,
		}
	}

	/// True when any value renders as `needle`.
	pub fn contains_str(&self, needle: &str) -> bool {
		self.values().iter().any(|v| v.to_string() == needle)
	}
}

impl From<&str> for PropertyValue {
	fn from(s: &str) -> Self {
		Self::Single(s.into())
	}
}

/// A content repository.
pub trait Repository: Send + Sync {
	fn login(&self, credentials: &Credentials, workspace: Option<&str>) -> Result<Arc<dyn Session>>;

	/// Single-valued descriptor, `None` when not provided.
	fn descriptor(&self, key: &str) -> Option<Value>;

	/// Multi-valued descriptor, `None` when not provided.
	fn descriptor_values(&self, key: &str) -> Option<Vec<Value>>;
}

/// A logged-in repository session.
pub trait Session: Send + Sync {
	fn user_id(&self) -> String;

	fn workspace(&self) -> Arc<dyn Workspace>;

	fn root(&self) -> Result<Arc<dyn Node>>;

	/// Node at an absolute path, [`crate::StoreError::PathNotFound`] when absent.
	fn node(&self, path: &str) -> Result<Arc<dyn Node>>;

	/// Node by identifier, [`crate::StoreError::ItemNotFound`] when absent.
	fn node_by_identifier(&self, identifier: &str) -> Result<Arc<dyn Node>>;

	fn save(&self) -> Result<()>;

	fn logout(&self);
}

/// A workspace: observation and the schema of the repository.
pub trait Workspace: Send + Sync {
	fn name(&self) -> String;

	/// Registers `listener` for events matching `mask` at or below `path`.
	fn add_event_listener(&self, listener: Arc<dyn EventListener>, mask: EventMask, path: &str, deep: bool) -> Result<()>;

	/// Drops every registration of `listener`. Unknown listeners are ignored.
	fn remove_event_listener(&self, listener: &Arc<dyn EventListener>) -> Result<()>;

	/// Schema manager of the repository, `None` when it does not accept custom types.
	fn schema(&self) -> Option<Arc<dyn SchemaManager>>;
}

/// Registration of definitions with the repository's own type system.
pub trait SchemaManager: Send + Sync {
	fn register_definitions(&self, system_id: &str, cnd: &str) -> Result<()>;

	fn unregister_definitions(&self, system_id: &str) -> Result<()>;

	/// True when definitions are registered for `system_id`.
	fn has_definitions(&self, system_id: &str) -> bool;
}

/// A stored node. Names are in prefixed form (`jnt:text`).
pub trait Node: Send + Sync {
	fn identifier(&self) -> String;
	fn path(&self) -> String;
	fn name(&self) -> String;
	fn primary_type(&self) -> String;
	fn mixin_types(&self) -> Vec<String>;

	/// True until the node is first saved.
	fn is_new(&self) -> bool;

	fn parent(&self) -> Result<Arc<dyn Node>>;

	/// Properties in insertion order.
	fn properties(&self) -> Result<Vec<Arc<dyn Property>>>;

	fn property(&self, name: &str) -> Result<Arc<dyn Property>>;

	fn has_property(&self, name: &str) -> bool;

	fn set_property(&self, name: &str, value: PropertyValue) -> Result<()>;

	fn child(&self, name: &str) -> Result<Arc<dyn Node>>;

	fn has_child(&self, name: &str) -> bool;

	fn children(&self) -> Result<Vec<Arc<dyn Node>>>;

	fn add_child(&self, name: &str, primary_type: &str) -> Result<Arc<dyn Node>>;

	fn add_mixin(&self, mixin: &str) -> Result<()>;
}

/// A stored property.
pub trait Property: Send + Sync {
	fn name(&self) -> String;
	fn path(&self) -> String;
	fn parent(&self) -> Result<Arc<dyn Node>>;
	fn value(&self) -> Result<PropertyValue>;
}

/// Directory of application users, consulted for stored per-provider credentials.
pub trait UserDirectory: Send + Sync {
	/// Property `key` of `user`, `None` when the user or the property is unknown.
	fn user_property(&self, user: &str, key: &str) -> Option<String>;
}
