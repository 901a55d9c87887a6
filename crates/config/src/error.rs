//! Error types for settings loading.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error parsing TOML syntax or mapping it onto the settings schema.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// Error reading a settings file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// The settings parse but cannot be used.
	#[error("invalid settings: {0}")]
	Invalid(String),
}

/// Non-fatal problem found while loading settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
	/// Provider the warning is about, if any.
	pub provider: Option<String>,
	pub message: String,
}

impl fmt::Display for ConfigWarning {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.provider {
			Some(key) => write!(f, "provider '{key}': {}", self.message),
			None => f.write_str(&self.message),
		}
	}
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
