//! Module versions used to gate redeployment of definitions files.

use std::cmp::Ordering;
use std::fmt;

/// A dotted module version with an optional qualifier: `1.2.3`, `2.0-SNAPSHOT`.
///
/// Numeric components compare numerically with missing components counting as
/// zero. At equal numbers a release outranks any qualified version; qualifiers
/// compare case-insensitively.
#[derive(Debug, Clone, Eq)]
pub struct ModuleVersion {
	raw: String,
	numbers: Vec<u64>,
	qualifier: Option<String>,
}

impl ModuleVersion {
	pub fn parse(raw: &str) -> Self {
		let raw = raw.trim();
		let mut numbers = Vec::new();
		let mut rest = raw;
		loop {
			let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
			if digits == 0 {
				break;
			}
			numbers.push(rest[..digits].parse().unwrap_or(u64::MAX));
			rest = &rest[digits..];
			match rest.strip_prefix('.') {
				Some(next) if next.starts_with(|c: char| c.is_ascii_digit()) => rest = next,
				_ => break,
			}
		}
		let qualifier = rest.trim_start_matches(['.', '-', '_']);
		Self {
			raw: raw.to_string(),
			numbers,
			qualifier: (!qualifier.is_empty()).then(|| qualifier.to_ascii_lowercase()),
		}
	}

	pub fn is_snapshot(&self) -> bool {
		self.qualifier.as_deref().is_some_and(|q| q.contains("snapshot"))
	}

	pub fn as_str(&self) -> &str {
		&self.raw
	}
}

impl Ord for ModuleVersion {
	fn cmp(&self, other: &Self) -> Ordering {
		let len = self.numbers.len().max(other.numbers.len());
		for i in 0..len {
			let a = self.numbers.get(i).copied().unwrap_or(0);
			let b = other.numbers.get(i).copied().unwrap_or(0);
			match a.cmp(&b) {
				Ordering::Equal => {}
				ord => return ord,
			}
		}
		match (&self.qualifier, &other.qualifier) {
			(None, None) => Ordering::Equal,
			(None, Some(_)) => Ordering::Greater,
			(Some(_), None) => Ordering::Less,
			(Some(a), Some(b)) => a.cmp(b),
		}
	}
}

impl PartialOrd for ModuleVersion {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl PartialEq for ModuleVersion {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl fmt::Display for ModuleVersion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.raw)
	}
}
