//! Settings for cairn.
//!
//! Settings are written in TOML:
//!
//! ```toml
//! etc_dir = "/srv/cairn/etc"
//! snapshot_dir = "/srv/cairn/snapshots"
//! processing_server = true
//!
//! [[providers]]
//! key = "default"
//! mount_point = "/"
//! repository_name = "java:/repository"
//! system_user = "root"
//!
//! [[providers]]
//! key = "archive"
//! mount_point = "/mounts/archive"
//! factory = "rmi"
//! url = "rmi://archive:1099/repository"
//! authentication = "stored-passwords"
//!
//! [[skeleton]]
//! path = "/sites"
//! primary_type = "jnt:virtualsitesFolder"
//! ```
//!
//! System definitions are read from `<etc_dir>/repository/nodetypes`.
//! Problems that do not prevent startup are collected in
//! [`Settings::warnings`].

pub mod error;
pub mod provider;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

pub use error::{ConfigError, ConfigWarning, Result};
pub use provider::{AuthenticationMode, ProviderSettings, RepositoryLocator};

#[cfg(test)]
mod tests;

/// One node created by the root provider when the repository is empty.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkeletonEntry {
	pub path: String,
	pub primary_type: String,
	#[serde(default)]
	pub mixins: Vec<String>,
}

/// Parsed settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
	#[serde(default = "default_etc_dir")]
	pub etc_dir: PathBuf,
	#[serde(default = "default_snapshot_dir")]
	pub snapshot_dir: PathBuf,
	/// Only processing servers deploy node types when a provider starts.
	#[serde(default = "default_true")]
	pub processing_server: bool,
	#[serde(default)]
	pub providers: Vec<ProviderSettings>,
	#[serde(default)]
	pub skeleton: Vec<SkeletonEntry>,
	#[serde(skip)]
	pub warnings: Vec<ConfigWarning>,
}

fn default_etc_dir() -> PathBuf {
	PathBuf::from("etc")
}

fn default_snapshot_dir() -> PathBuf {
	PathBuf::from("snapshots")
}

fn default_true() -> bool {
	true
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			etc_dir: default_etc_dir(),
			snapshot_dir: default_snapshot_dir(),
			processing_server: true,
			providers: Vec::new(),
			skeleton: Vec::new(),
			warnings: Vec::new(),
		}
	}
}

impl Settings {
	/// Parse a TOML string into [`Settings`].
	///
	/// Structural problems (duplicate provider keys or mount points, relative
	/// mount points) fail with [`ConfigError::Invalid`]. Problems a provider
	/// can live with are collected in `Settings::warnings`.
	pub fn parse(input: &str) -> Result<Self> {
		let mut settings: Settings = toml::from_str(input)?;
		settings.validate()?;
		Ok(settings)
	}

	/// Load settings from a file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
			path: path.to_path_buf(),
			error: e,
		})?;
		let settings = Self::parse(&content)?;
		debug!(path = %path.display(), providers = settings.providers.len(), "loaded settings");
		Ok(settings)
	}

	/// Directory holding the system CND files.
	pub fn nodetypes_dir(&self) -> PathBuf {
		self.etc_dir.join("repository").join("nodetypes")
	}

	pub fn provider(&self, key: &str) -> Option<&ProviderSettings> {
		self.providers.iter().find(|p| p.key == key)
	}

	fn validate(&mut self) -> Result<()> {
		let mut keys = HashSet::new();
		let mut mount_points = HashSet::new();
		for provider in &self.providers {
			if !keys.insert(provider.key.as_str()) {
				return Err(ConfigError::Invalid(format!("duplicate provider key '{}'", provider.key)));
			}
			if !provider.mount_point.starts_with('/') {
				return Err(ConfigError::Invalid(format!(
					"mount point '{}' of provider '{}' must be absolute",
					provider.mount_point, provider.key
				)));
			}
			if !mount_points.insert(provider.mount_point.as_str()) {
				return Err(ConfigError::Invalid(format!("mount point '{}' is used twice", provider.mount_point)));
			}
		}

		for provider in &self.providers {
			let mut warn = |message: String| {
				self.warnings.push(ConfigWarning {
					provider: Some(provider.key.clone()),
					message,
				})
			};
			if provider.locator().is_none() {
				if provider.factory.is_some() != provider.url.is_some() {
					warn("both 'factory' and 'url' are needed for a remote repository".to_string());
				} else {
					warn("no repository locator, the repository handle must be set explicitly".to_string());
				}
			}
			if provider.authentication_mode() == Some(AuthenticationMode::StoredPasswords) && provider.guest_user.is_none() {
				warn("stored-passwords authentication without a guest user to fall back to".to_string());
			}
		}
		for entry in &self.skeleton {
			if !entry.path.starts_with('/') {
				self.warnings.push(ConfigWarning {
					provider: None,
					message: format!("skeleton path '{}' is relative and will be ignored", entry.path),
				});
			}
		}
		Ok(())
	}
}
