use rustc_hash::FxHashMap;

use crate::{NameError, QualifiedName, RESIDUAL, Result};

/// Well-known namespace prefixes and URIs seeded into every table.
pub mod ns {
	pub const JCR_PREFIX: &str = "jcr";
	pub const JCR_URI: &str = "http://www.jcp.org/jcr/1.0";
	pub const NT_PREFIX: &str = "nt";
	pub const NT_URI: &str = "http://www.jcp.org/jcr/nt/1.0";
	pub const MIX_PREFIX: &str = "mix";
	pub const MIX_URI: &str = "http://www.jcp.org/jcr/mix/1.0";
	pub const XML_PREFIX: &str = "xml";
	pub const XML_URI: &str = "http://www.w3.org/XML/1998/namespace";
}

/// Bidirectional prefix ↔ URI map.
///
/// Both sides are unique: a prefix maps to exactly one URI and a URI to exactly
/// one prefix. Bindings are only ever added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceTable {
	by_prefix: FxHashMap<String, String>,
	by_uri: FxHashMap<String, String>,
}

impl Default for NamespaceTable {
	fn default() -> Self {
		let mut table = Self::empty();
		for (prefix, uri) in [
			("", ""),
			(ns::JCR_PREFIX, ns::JCR_URI),
			(ns::NT_PREFIX, ns::NT_URI),
			(ns::MIX_PREFIX, ns::MIX_URI),
			(ns::XML_PREFIX, ns::XML_URI),
		] {
			table.by_prefix.insert(prefix.to_string(), uri.to_string());
			table.by_uri.insert(uri.to_string(), prefix.to_string());
		}
		table
	}
}

impl NamespaceTable {
	/// A table with no bindings at all, not even the default namespace.
	pub fn empty() -> Self {
		Self {
			by_prefix: FxHashMap::default(),
			by_uri: FxHashMap::default(),
		}
	}

	/// Binds `prefix` to `uri`.
	///
	/// Re-registering an identical pair is a no-op. Binding either side to a
	/// different counterpart fails with [`NameError::PrefixConflict`].
	pub fn register(&mut self, prefix: &str, uri: &str) -> Result<()> {
		if prefix.contains(':') || prefix.chars().any(char::is_whitespace) {
			return Err(NameError::InvalidName {
				name: prefix.to_string(),
				reason: "illegal character in prefix",
			});
		}
		match (self.by_prefix.get(prefix), self.by_uri.get(uri)) {
			(Some(existing), _) if existing == uri => Ok(()),
			(Some(existing), _) => Err(NameError::PrefixConflict {
				prefix: prefix.to_string(),
				uri: uri.to_string(),
				existing: existing.clone(),
			}),
			(None, Some(existing)) => Err(NameError::PrefixConflict {
				prefix: prefix.to_string(),
				uri: uri.to_string(),
				existing: existing.clone(),
			}),
			(None, None) => {
				self.by_prefix.insert(prefix.to_string(), uri.to_string());
				self.by_uri.insert(uri.to_string(), prefix.to_string());
				Ok(())
			}
		}
	}

	/// Returns the URI bound to `prefix`.
	pub fn resolve_uri(&self, prefix: &str) -> Result<&str> {
		self.by_prefix.get(prefix).map(String::as_str).ok_or_else(|| NameError::UnknownPrefix {
			prefix: prefix.to_string(),
			name: prefix.to_string(),
		})
	}

	/// Returns the prefix bound to `uri`.
	pub fn resolve_prefix(&self, uri: &str) -> Result<&str> {
		self.by_uri
			.get(uri)
			.map(String::as_str)
			.ok_or_else(|| NameError::UnknownNamespace(uri.to_string()))
	}

	pub fn has_prefix(&self, prefix: &str) -> bool {
		self.by_prefix.contains_key(prefix)
	}

	/// Parses `prefix:local`, a bare local name (default namespace) or the
	/// expanded `{uri}local` form.
	pub fn parse(&self, name: &str) -> Result<QualifiedName> {
		if name.starts_with('{') {
			return QualifiedName::from_expanded(name);
		}
		if name == RESIDUAL {
			return Ok(QualifiedName::residual());
		}
		match name.split_once(':') {
			Some((prefix, local)) => {
				let uri = self.by_prefix.get(prefix).ok_or_else(|| NameError::UnknownPrefix {
					prefix: prefix.to_string(),
					name: name.to_string(),
				})?;
				QualifiedName::new(uri.clone(), local)
			}
			None => {
				let uri = self.by_prefix.get("").cloned().unwrap_or_default();
				QualifiedName::new(uri, name)
			}
		}
	}

	/// Renders `name` in its prefixed form.
	pub fn format(&self, name: &QualifiedName) -> Result<String> {
		let prefix = self.resolve_prefix(name.namespace())?;
		if prefix.is_empty() {
			Ok(name.local_name().to_string())
		} else {
			Ok(format!("{prefix}:{}", name.local_name()))
		}
	}

	/// Renders `name` prefixed when possible, expanded otherwise.
	pub fn display(&self, name: &QualifiedName) -> String {
		self.format(name).unwrap_or_else(|_| name.to_string())
	}

	/// Iterates `(prefix, uri)` pairs in prefix order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		let mut pairs: Vec<_> = self.by_prefix.iter().map(|(p, u)| (p.as_str(), u.as_str())).collect();
		pairs.sort_unstable();
		pairs.into_iter()
	}

	pub fn len(&self) -> usize {
		self.by_prefix.len()
	}

	pub fn is_empty(&self) -> bool {
		self.by_prefix.is_empty()
	}
}
