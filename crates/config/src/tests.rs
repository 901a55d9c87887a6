use std::path::PathBuf;

use pretty_assertions::assert_eq;
use rstest::rstest;

use super::*;

const FULL: &str = r#"
etc_dir = "/srv/cairn/etc"
snapshot_dir = "/srv/cairn/snapshots"
processing_server = false

[[providers]]
key = "default"
repository_name = "java:/repository"
system_user = "root"
guest_user = "guest"
rmi_bind = "//localhost/repository"

[[providers]]
key = "archive"
mount_point = "/mounts/archive"
factory = "rmi"
url = "rmi://archive:1099/repository"
authentication = "stored-passwords"
guest_user = "guest"
guest_password = "guest"
dynamic_mount_points = true
observed_workspaces = ["default", "live"]

[[skeleton]]
path = "/sites"
primary_type = "jnt:virtualsitesFolder"
mixins = ["mix:referenceable"]
"#;

#[test]
fn test_full_settings() {
	let settings = Settings::parse(FULL).expect("valid settings");
	assert!(settings.warnings.is_empty(), "{:?}", settings.warnings);
	assert!(!settings.processing_server);
	assert_eq!(settings.nodetypes_dir(), PathBuf::from("/srv/cairn/etc/repository/nodetypes"));

	let root = settings.provider("default").expect("default provider");
	assert!(root.is_default());
	assert_eq!(root.depth(), 0);
	assert_eq!(root.authentication_mode(), Some(AuthenticationMode::Shared));
	assert_eq!(root.locator(), Some(RepositoryLocator::Named("java:/repository".to_string())));
	assert_eq!(root.observed_workspaces, vec!["default".to_string()]);

	let archive = settings.provider("archive").expect("archive provider");
	assert_eq!(archive.depth(), 2);
	assert_eq!(archive.authentication_mode(), Some(AuthenticationMode::StoredPasswords));
	assert_eq!(
		archive.locator(),
		Some(RepositoryLocator::Remote {
			factory: "rmi".to_string(),
			url: "rmi://archive:1099/repository".to_string()
		})
	);
	assert_eq!(settings.skeleton[0].mixins, vec!["mix:referenceable".to_string()]);
}

#[test]
fn test_empty_document_uses_defaults() {
	let settings = Settings::parse("").unwrap();
	assert_eq!(settings, Settings::default());
	assert_eq!(settings.nodetypes_dir(), PathBuf::from("etc/repository/nodetypes"));
}

#[rstest]
#[case("[[providers]]\nkey = \"a\"\n[[providers]]\nkey = \"a\"\nmount_point = \"/b\"\n", "duplicate provider key")]
#[case("[[providers]]\nkey = \"a\"\nmount_point = \"relative\"\n", "must be absolute")]
#[case("[[providers]]\nkey = \"a\"\n[[providers]]\nkey = \"b\"\n", "used twice")]
fn test_structural_problems_are_invalid(#[case] input: &str, #[case] expected: &str) {
	let err = Settings::parse(input).expect_err("invalid settings");
	assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains(expected)), "{err}");
}

#[test]
fn test_unknown_fields_are_rejected() {
	let err = Settings::parse("[[providers]]\nkey = \"a\"\ncolour = \"blue\"\n").expect_err("unknown field");
	assert!(matches!(err, ConfigError::Toml(_)));
}

#[test]
fn test_usable_problems_become_warnings() {
	let settings = Settings::parse(
		"[[providers]]\nkey = \"half\"\nfactory = \"rmi\"\n[[providers]]\nkey = \"stored\"\nmount_point = \"/s\"\nrepository_name = \"r\"\nauthentication = \"stored-passwords\"\n[[skeleton]]\npath = \"sites\"\nprimary_type = \"nt:unstructured\"\n",
	)
	.expect("warnings only");
	let rendered: Vec<_> = settings.warnings.iter().map(ToString::to_string).collect();
	assert_eq!(
		rendered,
		vec![
			"provider 'half': both 'factory' and 'url' are needed for a remote repository".to_string(),
			"provider 'stored': stored-passwords authentication without a guest user to fall back to".to_string(),
			"skeleton path 'sites' is relative and will be ignored".to_string(),
		]
	);
}

#[test]
fn test_load_reports_the_missing_path() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("cairn.toml");
	let err = Settings::load(&path).expect_err("missing file");
	assert!(matches!(err, ConfigError::Io { path: ref p, .. } if p == &path));

	std::fs::write(&path, FULL).unwrap();
	assert_eq!(Settings::load(&path).unwrap().providers.len(), 2);
}
