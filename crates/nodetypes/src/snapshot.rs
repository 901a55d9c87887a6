//! Durable schema snapshots: the deployment ledger text and one canonical CND
//! document per deployed module.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::SnapshotError;

/// File name of the ledger inside a snapshot directory.
pub const DEFINITIONS_PROPERTIES: &str = "definitions.properties";

type Result<T> = std::result::Result<T, SnapshotError>;

/// Storage for deployed schema state.
pub trait SchemaSnapshotStore: Send + Sync {
	/// Returns the stored ledger text, `None` when nothing was saved yet.
	fn read_definition_properties(&self) -> Result<Option<String>>;

	fn save_definition_properties(&self, text: &str) -> Result<()>;

	/// Names of stored CND snapshots, sorted.
	fn files_list(&self) -> Result<Vec<String>>;

	fn read_cnd_file(&self, name: &str) -> Result<String>;

	/// Stores `text` under `name`; `None` deletes the snapshot.
	fn save_cnd_file(&self, name: &str, text: Option<&str>) -> Result<()>;
}

/// Snapshot store backed by a directory.
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
	root: PathBuf,
}

impl FsSnapshotStore {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	fn io(path: &Path, error: std::io::Error) -> SnapshotError {
		SnapshotError::Io {
			path: path.to_path_buf(),
			error,
		}
	}

	fn ensure_root(&self) -> Result<()> {
		fs::create_dir_all(&self.root).map_err(|e| Self::io(&self.root, e))
	}
}

impl SchemaSnapshotStore for FsSnapshotStore {
	fn read_definition_properties(&self) -> Result<Option<String>> {
		let path = self.root.join(DEFINITIONS_PROPERTIES);
		match fs::read_to_string(&path) {
			Ok(text) => Ok(Some(text)),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
			Err(e) => Err(Self::io(&path, e)),
		}
	}

	fn save_definition_properties(&self, text: &str) -> Result<()> {
		self.ensure_root()?;
		let path = self.root.join(DEFINITIONS_PROPERTIES);
		fs::write(&path, text).map_err(|e| Self::io(&path, e))
	}

	fn files_list(&self) -> Result<Vec<String>> {
		let entries = match fs::read_dir(&self.root) {
			Ok(entries) => entries,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(Self::io(&self.root, e)),
		};
		let mut names = Vec::new();
		for entry in entries {
			let entry = entry.map_err(|e| Self::io(&self.root, e))?;
			let name = entry.file_name().to_string_lossy().into_owned();
			if name.ends_with(".cnd") && entry.path().is_file() {
				names.push(name);
			}
		}
		names.sort();
		Ok(names)
	}

	fn read_cnd_file(&self, name: &str) -> Result<String> {
		let path = self.root.join(name);
		match fs::read_to_string(&path) {
			Ok(text) => Ok(text),
			Err(e) if e.kind() == ErrorKind::NotFound => Err(SnapshotError::Missing(name.to_string())),
			Err(e) => Err(Self::io(&path, e)),
		}
	}

	fn save_cnd_file(&self, name: &str, text: Option<&str>) -> Result<()> {
		let path = self.root.join(name);
		match text {
			Some(text) => {
				self.ensure_root()?;
				debug!(path = %path.display(), "storing schema snapshot");
				fs::write(&path, text).map_err(|e| Self::io(&path, e))
			}
			None => match fs::remove_file(&path) {
				Ok(()) => Ok(()),
				Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
				Err(e) => Err(Self::io(&path, e)),
			},
		}
	}
}

/// In-memory snapshot store.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
	properties: Mutex<Option<String>>,
	files: Mutex<BTreeMap<String, String>>,
}

impl MemorySnapshotStore {
	pub fn new() -> Self {
		Self::default()
	}
}

impl SchemaSnapshotStore for MemorySnapshotStore {
	fn read_definition_properties(&self) -> Result<Option<String>> {
		Ok(self.properties.lock().clone())
	}

	fn save_definition_properties(&self, text: &str) -> Result<()> {
		*self.properties.lock() = Some(text.to_string());
		Ok(())
	}

	fn files_list(&self) -> Result<Vec<String>> {
		Ok(self.files.lock().keys().cloned().collect())
	}

	fn read_cnd_file(&self, name: &str) -> Result<String> {
		self.files.lock().get(name).cloned().ok_or_else(|| SnapshotError::Missing(name.to_string()))
	}

	fn save_cnd_file(&self, name: &str, text: Option<&str>) -> Result<()> {
		let mut files = self.files.lock();
		match text {
			Some(text) => {
				files.insert(name.to_string(), text.to_string());
			}
			None => {
				files.remove(name);
			}
		}
		Ok(())
	}
}
