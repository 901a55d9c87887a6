//! Compact Node Definition (CND) reading and writing.
//!
//! ## Supported syntax
//!
//! ```text
//! document   = (namespace | nodetype)*
//! namespace  = "<" prefix "=" string ">"
//! nodetype   = "[" name "]" (">" name ("," name)*)? option* (property | child)*
//! option     = "orderable" | "mixin" | "abstract" | "noquery" | "query"
//!            | ("primaryitem" | "!") name | "extends" "=" name ("," name)*
//!            | "itemtype" "=" word
//! property   = "-" name ("(" type ("," selector options?)? ")")?
//!              ("=" default ("," default)*)? attribute* constraints?
//! default    = string | word | word "(" (string ("," string)*)? ")"
//! child      = "+" name ("(" name ("," name)* ")")? ("=" name)? attribute*
//! ```
//!
//! Keywords are case-insensitive and accept the usual short forms (`o`, `m`,
//! `mul`, ...). `//` and `/* */` comments are skipped.

mod lexer;
mod reader;
mod writer;

use std::sync::atomic::{AtomicBool, Ordering};

pub use reader::{CndReader, ParsedDefinitions};
pub use writer::CndWriter;

#[cfg(test)]
mod tests;

static ENCOUNTERED_ISSUES: AtomicBool = AtomicBool::new(false);

/// True once any document parsed in this process reported an issue.
///
/// The flag is never reset; it reflects the whole process lifetime.
pub fn has_encountered_issues_with_definitions() -> bool {
	ENCOUNTERED_ISSUES.load(Ordering::Relaxed)
}

pub(crate) fn mark_issues_encountered() {
	ENCOUNTERED_ISSUES.store(true, Ordering::Relaxed);
}
