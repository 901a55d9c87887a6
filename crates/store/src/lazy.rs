//! Property iteration across a node and its translation.

use std::sync::Arc;
use std::vec;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::{Result, StoreError};
use crate::repository::{Property, PropertyValue};
use crate::wrapper::{NodeWrapper, PropertyWrapper};

/// A property name pattern: alternatives separated by `|`, each matching a
/// whole name with `*` as the only wildcard.
#[derive(Debug, Clone)]
pub struct NamePattern {
	source: String,
	set: GlobSet,
}

impl NamePattern {
	pub fn new(pattern: &str) -> Result<Self> {
		let mut builder = GlobSetBuilder::new();
		for alternative in pattern.split('|').map(str::trim) {
			let glob = Glob::new(&escape_glob(alternative)).map_err(|error| StoreError::Pattern {
				pattern: pattern.to_string(),
				error,
			})?;
			builder.add(glob);
		}
		let set = builder.build().map_err(|error| StoreError::Pattern {
			pattern: pattern.to_string(),
			error,
		})?;
		Ok(Self {
			source: pattern.to_string(),
			set,
		})
	}

	pub fn as_str(&self) -> &str {
		&self.source
	}

	pub fn matches(&self, name: &str) -> bool {
		self.set.is_match(name)
	}
}

/// Escapes every glob metacharacter except `*`.
fn escape_glob(alternative: &str) -> String {
	let mut escaped = String::with_capacity(alternative.len());
	for c in alternative.chars() {
		match c {
			'?' | '[' | ']' | '{' | '}' => {
				escaped.push('[');
				escaped.push(c);
				escaped.push(']');
			}
			'\\' => escaped.push_str("\\\\"),
			_ => escaped.push(c),
		}
	}
	escaped
}

/// Iterates the properties of a node in a locale.
///
/// Yields the node's own properties first, then the internationalized
/// properties of its translation child for the locale. Neither list is read
/// before it is needed. Without a locale, or without a translation child,
/// only the node's own properties are yielded.
pub struct LazyPropertyIterator {
	node: Arc<NodeWrapper>,
	locale: Option<String>,
	pattern: Option<NamePattern>,
	direct: Option<vec::IntoIter<Arc<dyn Property>>>,
	translated: Option<vec::IntoIter<Arc<dyn Property>>>,
	failed: bool,
}

impl LazyPropertyIterator {
	/// Iterator over `node` in `locale`, restricted to names matching `pattern`.
	pub fn new(node: Arc<NodeWrapper>, locale: Option<&str>, pattern: Option<&str>) -> Result<Self> {
		Ok(Self {
			node,
			locale: locale.map(str::to_string),
			pattern: pattern.map(NamePattern::new).transpose()?,
			direct: None,
			translated: None,
			failed: false,
		})
	}

	/// Number of properties left to yield. Loads both lists.
	pub fn size(&mut self) -> Result<usize> {
		Ok(self.direct()?.len() + self.translated()?.len())
	}

	/// True when nothing is left to yield. Loads both lists.
	pub fn is_empty(&mut self) -> Result<bool> {
		Ok(self.size()? == 0)
	}

	/// True when `name` is a property of the node in the iterator's locale.
	pub fn contains_key(&self, name: &str) -> bool {
		self.node.real_node().has_property(name) || self.translated_property(name).is_some()
	}

	/// Value of `name`: an array for multi-valued properties, a single value
	/// otherwise. `None` when the node has no such property.
	pub fn get(&self, name: &str) -> Option<PropertyValue> {
		if let Ok(property) = self.node.real_node().property(name) {
			return property.value().ok();
		}
		self.translated_property(name).and_then(|p| p.value().ok())
	}

	fn translated_property(&self, name: &str) -> Option<Arc<dyn Property>> {
		let translation = self.node.translation_node(self.locale.as_deref()?)?;
		let property = translation.property(name).ok()?;
		self.node
			.property_definition(name)
			.filter(|d| d.internationalized)
			.map(|_| property)
	}

	fn direct(&mut self) -> Result<&mut vec::IntoIter<Arc<dyn Property>>> {
		if self.direct.is_none() {
			let properties = self.matching(self.node.real_node().properties()?);
			self.direct = Some(properties.into_iter());
		}
		Ok(self.direct.get_or_insert_with(|| Vec::new().into_iter()))
	}

	fn translated(&mut self) -> Result<&mut vec::IntoIter<Arc<dyn Property>>> {
		if self.translated.is_none() {
			let translation = self.locale.as_deref().and_then(|locale| self.node.translation_node(locale));
			let properties = match translation {
				Some(translation) => self
					.matching(translation.properties()?)
					.into_iter()
					.filter(|p| self.node.property_definition(&p.name()).is_some_and(|d| d.internationalized))
					.collect(),
				None => Vec::new(),
			};
			self.translated = Some(properties.into_iter());
		}
		Ok(self.translated.get_or_insert_with(|| Vec::new().into_iter()))
	}

	fn matching(&self, properties: Vec<Arc<dyn Property>>) -> Vec<Arc<dyn Property>> {
		match &self.pattern {
			Some(pattern) => properties.into_iter().filter(|p| pattern.matches(&p.name())).collect(),
			None => properties,
		}
	}

	fn next_property(&mut self) -> Result<Option<Arc<dyn Property>>> {
		if let Some(property) = self.direct()?.next() {
			return Ok(Some(property));
		}
		Ok(self.translated()?.next())
	}
}

impl Iterator for LazyPropertyIterator {
	type Item = Result<PropertyWrapper>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.failed {
			return None;
		}
		match self.next_property() {
			Ok(property) => {
				let property = property?;
				let multiple = property.value().is_ok_and(|v| v.is_multiple());
				let definition = self.node.property_definition_for(&property.name(), multiple);
				Some(Ok(PropertyWrapper::new(Arc::clone(&self.node), property, definition)))
			}
			Err(e) => {
				self.failed = true;
				Some(Err(e))
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case("jcr:title", "jcr:title", true)]
	#[case("jcr:title", "jcr:titles", false)]
	#[case("jcr:*", "jcr:created", true)]
	#[case("jcr:* | j:*", "j:nodename", true)]
	#[case("jcr:*|j:*", "text", false)]
	#[case("a?b", "a?b", true)]
	#[case("a?b", "axb", false)]
	#[case("a{b}", "a{b}", true)]
	fn test_name_patterns(#[case] pattern: &str, #[case] name: &str, #[case] expected: bool) {
		assert_eq!(NamePattern::new(pattern).unwrap().matches(name), expected);
	}
}
