//! Error types for definitions parsing and the node type registry.

use std::path::PathBuf;

use cairn_names::NameError;
use thiserror::Error;

/// Errors raised while reading a CND document.
#[derive(Debug, Error)]
pub enum CndError {
	/// The document is malformed.
	#[error("cannot parse {file}: {}", .messages.join("; "))]
	Parse {
		/// Name of the document.
		file: String,
		/// Human-readable messages, one per problem.
		messages: Vec<String>,
	},

	/// The document could not be read.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path of the document.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},
}

/// Errors raised by the schema snapshot store.
#[derive(Debug, Error)]
pub enum SnapshotError {
	#[error("snapshot I/O error at {path}: {error}")]
	Io { path: PathBuf, error: std::io::Error },

	#[error("no stored definitions named '{0}'")]
	Missing(String),
}

/// Errors raised by the node type registry.
#[derive(Debug, Error)]
pub enum RegistryError {
	/// Lookup of an unregistered (or empty) name.
	#[error("unknown type: {0}")]
	NoSuchNodeType(String),

	/// Registration under a system id different from the existing one.
	#[error("node type '{name}' already defined with a different systemId (existing: '{existing}', provided: '{provided}')")]
	NodeTypeExists {
		name: String,
		existing: String,
		provided: String,
	},

	/// Unregistration blocked by a dependent type.
	#[error("{0}")]
	ConstraintViolation(String),

	/// A definitions file being validated redefines a type owned by another module.
	#[error("node type already defined: {0}")]
	TypeAlreadyExists(String),

	/// A definitions file being validated has parsing issues.
	#[error("invalid definitions: {}", .0.join("\n"))]
	InvalidDefinitions(Vec<String>),

	/// Listing a definitions directory failed.
	#[error("I/O error at {path}: {error}")]
	Io { path: PathBuf, error: std::io::Error },

	#[error(transparent)]
	Cnd(#[from] CndError),

	#[error(transparent)]
	Snapshot(#[from] SnapshotError),

	#[error(transparent)]
	Name(#[from] NameError),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
