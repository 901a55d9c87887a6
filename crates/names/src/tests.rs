use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

use super::*;

const JNT: &str = "http://www.jahia.org/jahia/nt/1.0";

fn table() -> NamespaceTable {
	let mut table = NamespaceTable::default();
	table.register("jnt", JNT).unwrap();
	table
}

#[test]
fn parse_and_format_round_trip_prefixed_form() {
	let table = table();
	let name = table.parse("jnt:text").unwrap();
	assert_eq!(name.namespace(), JNT);
	assert_eq!(name.local_name(), "text");
	assert_eq!(table.format(&name).unwrap(), "jnt:text");
}

#[test]
fn bare_names_live_in_the_default_namespace() {
	let name = table().parse("title").unwrap();
	assert_eq!(name.namespace(), "");
	assert_eq!(name.to_string(), "title");
}

#[test]
fn expanded_form_is_accepted() {
	let name = table().parse(&format!("{{{JNT}}}text")).unwrap();
	assert_eq!(name, table().parse("jnt:text").unwrap());
}

#[test]
fn equality_ignores_the_bound_prefix() {
	let mut a = NamespaceTable::default();
	a.register("jnt", JNT).unwrap();
	let mut b = NamespaceTable::default();
	b.register("other", JNT).unwrap();
	assert_eq!(a.parse("jnt:page").unwrap(), b.parse("other:page").unwrap());
}

#[test]
fn unknown_prefix_is_reported() {
	let err = table().parse("zzz:thing").unwrap_err();
	assert!(matches!(err, NameError::UnknownPrefix { ref prefix, .. } if prefix == "zzz"));
}

#[test]
fn unknown_namespace_is_reported_on_format() {
	let name = QualifiedName::new("urn:nowhere", "x").unwrap();
	assert_eq!(table().format(&name), Err(NameError::UnknownNamespace("urn:nowhere".into())));
	assert_eq!(table().display(&name), "{urn:nowhere}x");
}

#[test]
fn identical_rebinding_is_a_noop() {
	let mut table = table();
	table.register("jnt", JNT).unwrap();
	assert_eq!(table.resolve_prefix(JNT).unwrap(), "jnt");
}

#[rstest]
#[case::prefix_taken("jnt", "urn:other")]
#[case::uri_taken("jnt2", JNT)]
fn conflicting_bindings_are_rejected(#[case] prefix: &str, #[case] uri: &str) {
	let mut table = table();
	let err = table.register(prefix, uri).unwrap_err();
	assert!(matches!(err, NameError::PrefixConflict { .. }));
	assert_eq!(table.resolve_uri("jnt").unwrap(), JNT);
}

#[rstest]
#[case("")]
#[case("a/b")]
#[case("a[1]")]
#[case(" padded")]
#[case("..")]
fn invalid_local_names(#[case] local: &str) {
	assert!(matches!(QualifiedName::new("", local), Err(NameError::InvalidName { .. })));
}

#[test]
fn residual_name_is_accepted() {
	let name = table().parse("*").unwrap();
	assert!(name.is_residual());
}

proptest! {
	#[test]
	fn registered_prefixes_round_trip(prefix in "[a-z]{1,6}", local in "[a-zA-Z_][a-zA-Z0-9_.-]{0,12}") {
		let mut table = NamespaceTable::empty();
		let uri = format!("urn:test:{prefix}");
		table.register(&prefix, &uri).unwrap();
		let parsed = table.parse(&format!("{prefix}:{local}")).unwrap();
		prop_assert_eq!(parsed.namespace(), uri.as_str());
		prop_assert_eq!(table.format(&parsed).unwrap(), format!("{prefix}:{local}"));
	}
}
