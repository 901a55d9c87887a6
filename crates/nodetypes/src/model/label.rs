use std::fmt;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// Source of localized display labels, typically a module's resource bundles.
pub trait LabelSource: Send + Sync {
	/// Looks up `key` for `locale`.
	fn lookup(&self, key: &str, locale: &str) -> Option<String>;
}

/// Per-definition cache of resolved labels keyed by locale.
///
/// The cache is not part of a definition's identity: clones start empty and
/// equality always holds.
#[derive(Default)]
pub struct LabelCache {
	by_locale: Mutex<FxHashMap<String, String>>,
}

impl LabelCache {
	/// Returns the cached label for `locale`, resolving it with `resolve` on a miss.
	pub fn get_or_resolve(&self, locale: &str, resolve: impl FnOnce() -> String) -> String {
		if let Some(label) = self.by_locale.lock().get(locale) {
			return label.clone();
		}
		let label = resolve();
		self.by_locale.lock().insert(locale.to_string(), label.clone());
		label
	}

	pub fn clear(&self) {
		self.by_locale.lock().clear();
	}

	pub fn len(&self) -> usize {
		self.by_locale.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl Clone for LabelCache {
	fn clone(&self) -> Self {
		Self::default()
	}
}

impl PartialEq for LabelCache {
	fn eq(&self, _: &Self) -> bool {
		true
	}
}

impl fmt::Debug for LabelCache {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LabelCache").field("cached", &self.len()).finish()
	}
}

/// Resource key of a prefixed name: `jnt:text` → `jnt_text`.
pub(crate) fn label_key(prefixed: &str) -> String {
	prefixed.replace(':', "_")
}
