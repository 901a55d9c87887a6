//! Error types for store providers and sessions.

use cairn_nodetypes::{RegistryError, SnapshotError};
use thiserror::Error;

/// Errors raised by providers, sessions and the repository collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
	/// The repository rejected an operation: lookup, login, schema update.
	#[error("repository access failed: {0}")]
	RepositoryAccess(String),

	/// No repository handle could be obtained for the provider.
	#[error("no repository available for provider '{0}'")]
	NoRepository(String),

	#[error("path not found: {0}")]
	PathNotFound(String),

	#[error("item not found: {0}")]
	ItemNotFound(String),

	#[error("unknown type: {0}")]
	NoSuchNodeType(String),

	#[error("constraint violation: {0}")]
	ConstraintViolation(String),

	/// Starting a provider failed.
	#[error("provider '{key}' failed to start: {message}")]
	Initialization { key: String, message: String },

	/// A property name pattern could not be compiled.
	#[error("invalid name pattern '{pattern}': {error}")]
	Pattern { pattern: String, error: globset::Error },

	#[error(transparent)]
	Registry(#[from] RegistryError),

	#[error(transparent)]
	Snapshot(#[from] SnapshotError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
