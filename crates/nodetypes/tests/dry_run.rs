//! Dry runs and the process-wide issue flag.
//!
//! Kept in its own test binary: the flag is never reset, so any registering
//! read elsewhere in the same process would mask the result.

use cairn_nodetypes::cnd::has_encountered_issues_with_definitions;
use cairn_nodetypes::{CndReader, NodeTypeRegistry, RegistryError};

const FLAWED: &str = "[nt:odd] sparkly\n - a (string, hologram)\n";

#[test]
fn test_validation_and_dry_runs_leave_issue_flag_unset() {
	let registry = NodeTypeRegistry::new();

	let err = registry.validate_definitions(FLAWED, "odd.cnd", "mod-odd").expect_err("flawed definitions");
	assert!(matches!(err, RegistryError::InvalidDefinitions(ref issues) if issues.len() == 2), "{err:?}");

	let parsed = CndReader::new(&registry, "odd.cnd", "mod-odd").register(false).parse(FLAWED).unwrap();
	assert!(parsed.has_issues());

	assert!(!has_encountered_issues_with_definitions());
	assert!(!registry.has_encountered_issues());
	assert!(registry.is_empty());
}
