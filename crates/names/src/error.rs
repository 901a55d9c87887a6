//! Error types for name resolution.

use thiserror::Error;

/// Errors raised while parsing, formatting or registering names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
	/// A prefixed name used a prefix with no namespace bound to it.
	#[error("unknown prefix '{prefix}' in name '{name}'")]
	UnknownPrefix {
		/// The unbound prefix.
		prefix: String,
		/// The full name that was being parsed.
		name: String,
	},

	/// A qualified name referenced a namespace URI with no prefix bound to it.
	#[error("unknown namespace '{0}'")]
	UnknownNamespace(String),

	/// The name is syntactically invalid.
	#[error("invalid name '{name}': {reason}")]
	InvalidName {
		/// The rejected input.
		name: String,
		/// Why it was rejected.
		reason: &'static str,
	},

	/// A prefix or URI is already bound to a different counterpart.
	#[error("cannot bind prefix '{prefix}' to '{uri}': already bound to '{existing}'")]
	PrefixConflict {
		/// The prefix being registered.
		prefix: String,
		/// The URI being registered.
		uri: String,
		/// The conflicting existing binding.
		existing: String,
	},
}

/// Result type for name operations.
pub type Result<T> = std::result::Result<T, NameError>;
