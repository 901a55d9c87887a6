//! Definitions files contributed by modules.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::error::CndError;

/// Kind of a definitions file, from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionsKind {
	/// Node type definitions (`.cnd`).
	Cnd,
	/// Legacy grouping file (`.grp`); recorded but not read.
	Grouping,
	Other,
}

/// A definitions file on disk, identified by its `file:` URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DefinitionsFile {
	path: PathBuf,
}

impl DefinitionsFile {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Key used in the deployment ledger.
	pub fn url(&self) -> String {
		format!("file:{}", self.path.display())
	}

	pub fn file_name(&self) -> String {
		self.path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
	}

	pub fn kind(&self) -> DefinitionsKind {
		match self.path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
			Some("cnd") => DefinitionsKind::Cnd,
			Some("grp") => DefinitionsKind::Grouping,
			_ => DefinitionsKind::Other,
		}
	}

	/// Modification time in milliseconds since the epoch, `0` when unknown.
	pub fn last_modified(&self) -> i64 {
		fs::metadata(&self.path)
			.and_then(|m| m.modified())
			.ok()
			.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
			.map_or(0, |d| d.as_millis() as i64)
	}

	pub fn read(&self) -> Result<String, CndError> {
		fs::read_to_string(&self.path).map_err(|error| CndError::Io {
			path: self.path.clone(),
			error,
		})
	}
}
