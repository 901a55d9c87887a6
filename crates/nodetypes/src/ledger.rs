//! Deployment properties ledger.
//!
//! A flat key/value store persisted as Java `.properties` text. It records,
//! per definitions file and store provider, the file modification time last
//! deployed (`<fileURL>.lastRegistered.<providerKey>`) and, per module, the
//! version last deployed (`<systemId>.version`).

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::version::ModuleVersion;

#[derive(Debug, Default)]
pub struct DeploymentLedger {
	entries: Mutex<BTreeMap<String, String>>,
	loaded: AtomicBool,
}

impl DeploymentLedger {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn last_registered_key(file_url: &str, provider_key: &str) -> String {
		format!("{file_url}.lastRegistered.{provider_key}")
	}

	pub fn version_key(system_id: &str) -> String {
		format!("{system_id}.version")
	}

	/// Merges `text` into the ledger and marks it loaded.
	pub fn load(&self, text: &str) {
		let parsed = parse_properties(text);
		self.entries.lock().extend(parsed);
		self.loaded.store(true, Ordering::Release);
	}

	/// Marks the ledger loaded without content, enabling saves.
	pub fn mark_loaded(&self) {
		self.loaded.store(true, Ordering::Release);
	}

	/// Saves are skipped until the ledger was loaded from its backing store.
	pub fn is_loaded(&self) -> bool {
		self.loaded.load(Ordering::Acquire)
	}

	pub fn get(&self, key: &str) -> Option<String> {
		self.entries.lock().get(key).cloned()
	}

	pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
		self.entries.lock().insert(key.into(), value.into());
	}

	pub fn remove(&self, key: &str) -> Option<String> {
		self.entries.lock().remove(key)
	}

	pub fn contains(&self, key: &str) -> bool {
		self.entries.lock().contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn last_registered(&self, file_url: &str, provider_key: &str) -> Option<i64> {
		self.get(&Self::last_registered_key(file_url, provider_key)).and_then(|v| v.trim().parse().ok())
	}

	pub fn set_last_registered(&self, file_url: &str, provider_key: &str, modified_millis: i64) {
		self.set(Self::last_registered_key(file_url, provider_key), modified_millis.to_string());
	}

	pub fn remove_last_registered(&self, file_url: &str, provider_key: &str) {
		self.remove(&Self::last_registered_key(file_url, provider_key));
	}

	pub fn version(&self, system_id: &str) -> Option<ModuleVersion> {
		self.get(&Self::version_key(system_id)).map(|v| ModuleVersion::parse(&v))
	}

	pub fn set_version(&self, system_id: &str, version: &ModuleVersion) {
		self.set(Self::version_key(system_id), version.as_str());
	}

	pub fn remove_version(&self, system_id: &str) {
		self.remove(&Self::version_key(system_id));
	}

	/// Serializes the ledger with keys in sorted order.
	pub fn to_properties(&self) -> String {
		let entries = self.entries.lock();
		let mut out = String::new();
		for (key, value) in entries.iter() {
			escape_into(&mut out, key, true);
			out.push('=');
			escape_into(&mut out, value, false);
			out.push('\n');
		}
		out
	}
}

/// Parses `.properties` text: comments, continuation lines and escapes.
pub fn parse_properties(text: &str) -> BTreeMap<String, String> {
	let mut out = BTreeMap::new();
	let mut logical = String::new();
	for line in text.lines() {
		let trimmed = line.trim_start();
		if logical.is_empty() && (trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!')) {
			continue;
		}
		let trailing = trimmed.len() - trimmed.trim_end_matches('\\').len();
		if trailing % 2 == 1 {
			logical.push_str(&trimmed[..trimmed.len() - 1]);
			continue;
		}
		logical.push_str(trimmed);
		let (key, value) = split_entry(&logical);
		out.insert(key, value);
		logical.clear();
	}
	if !logical.is_empty() {
		let (key, value) = split_entry(&logical);
		out.insert(key, value);
	}
	out
}

fn split_entry(line: &str) -> (String, String) {
	let mut key = String::new();
	let mut chars = line.chars().peekable();
	while let Some(c) = chars.next() {
		match c {
			'\\' => {
				if let Some(escaped) = chars.next() {
					push_unescaped(&mut key, escaped, &mut chars);
				}
			}
			'=' | ':' => break,
			c if c.is_whitespace() => {
				while chars.peek().is_some_and(|c| c.is_whitespace()) {
					chars.next();
				}
				if chars.peek().is_some_and(|c| *c == '=' || *c == ':') {
					chars.next();
				}
				break;
			}
			c => key.push(c),
		}
	}
	while chars.peek().is_some_and(|c| c.is_whitespace()) {
		chars.next();
	}
	let mut value = String::new();
	while let Some(c) = chars.next() {
		if c == '\\' {
			if let Some(escaped) = chars.next() {
				push_unescaped(&mut value, escaped, &mut chars);
			}
		} else {
			value.push(c);
		}
	}
	(key, value)
}

fn push_unescaped(out: &mut String, escaped: char, rest: &mut std::iter::Peekable<std::str::Chars<'_>>) {
	match escaped {
		't' => out.push('\t'),
		'n' => out.push('\n'),
		'r' => out.push('\r'),
		'f' => out.push('\u{c}'),
		'u' => {
			let hex: String = rest.by_ref().take(4).collect();
			match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
				Some(c) => out.push(c),
				None => out.push_str(&hex),
			}
		}
		other => out.push(other),
	}
}

fn escape_into(out: &mut String, s: &str, is_key: bool) {
	for (i, c) in s.chars().enumerate() {
		match c {
			' ' if is_key || i == 0 => out.push_str("\\ "),
			'\\' => out.push_str("\\\\"),
			'\t' => out.push_str("\\t"),
			'\n' => out.push_str("\\n"),
			'\r' => out.push_str("\\r"),
			'\u{c}' => out.push_str("\\f"),
			'=' | ':' | '#' | '!' => {
				out.push('\\');
				out.push(c);
			}
			c if (c as u32) < 0x20 || (c as u32) > 0x7e => {
				let mut buf = [0u16; 2];
				for unit in c.encode_utf16(&mut buf) {
					out.push_str(&format!("\\u{unit:04X}"));
				}
			}
			c => out.push(c),
		}
	}
}
