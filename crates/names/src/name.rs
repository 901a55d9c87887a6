use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{NameError, Result};

/// Local name of residual (wildcard) item definitions.
pub const RESIDUAL: &str = "*";

/// A `(namespace URI, local name)` pair.
///
/// Equality and hashing are structural; the prefix a namespace is currently
/// bound to plays no part. `Display` renders the expanded `{uri}local` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedName {
	namespace: String,
	local: String,
}

impl QualifiedName {
	/// Builds a name after checking the local part.
	pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Result<Self> {
		let local = local.into();
		validate_local(&local)?;
		Ok(Self {
			namespace: namespace.into(),
			local,
		})
	}

	/// Residual name (`*`) in the default namespace.
	pub fn residual() -> Self {
		Self {
			namespace: String::new(),
			local: RESIDUAL.to_string(),
		}
	}

	/// Parses the expanded `{uri}local` form.
	pub fn from_expanded(s: &str) -> Result<Self> {
		let rest = s.strip_prefix('{').ok_or_else(|| NameError::InvalidName {
			name: s.to_string(),
			reason: "expanded form must start with '{'",
		})?;
		let (uri, local) = rest.split_once('}').ok_or_else(|| NameError::InvalidName {
			name: s.to_string(),
			reason: "unterminated namespace URI",
		})?;
		Self::new(uri, local)
	}

	pub fn namespace(&self) -> &str {
		&self.namespace
	}

	pub fn local_name(&self) -> &str {
		&self.local
	}

	/// True for the `*` residual name, whatever the namespace.
	pub fn is_residual(&self) -> bool {
		self.local == RESIDUAL
	}
}

impl fmt::Display for QualifiedName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.namespace.is_empty() {
			f.write_str(&self.local)
		} else {
			write!(f, "{{{}}}{}", self.namespace, self.local)
		}
	}
}

fn validate_local(local: &str) -> Result<()> {
	let invalid = |reason| {
		Err(NameError::InvalidName {
			name: local.to_string(),
			reason,
		})
	};
	if local.is_empty() {
		return invalid("empty local name");
	}
	if local == RESIDUAL {
		return Ok(());
	}
	if local == "." || local == ".." {
		return invalid("reserved path segment");
	}
	if local.chars().any(|c| matches!(c, '/' | ':' | '[' | ']' | '|' | '*' | '{' | '}') || c.is_control()) {
		return invalid("illegal character");
	}
	if local.starts_with(char::is_whitespace) || local.ends_with(char::is_whitespace) {
		return invalid("leading or trailing whitespace");
	}
	Ok(())
}
