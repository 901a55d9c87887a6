use std::fs;
use std::sync::Arc;

use cairn_names::QualifiedName;
use pretty_assertions::assert_eq;
use rstest::rstest;

use super::*;
use crate::error::CndError;
use crate::model::{LabelSource, NodeDefinition, NodeType};
use crate::snapshot::MemorySnapshotStore;

const JNT: &str = "http://www.jahia.org/jahia/nt/1.0";

const PAGE_DEFINITIONS: &str = r#"
<jnt = 'http://www.jahia.org/jahia/nt/1.0'>
<jmix = 'http://www.jahia.org/jahia/mix/1.0'>
[nt:base] abstract
[jmix:tagged] mixin
 - tags (string) multiple itemtype = metadata
[jnt:content] abstract
 - jcr:title (string) i18n
 - * (string)
[jnt:page] > jnt:content orderable
 - template (string) itemtype = layout
 + * (jnt:content)
 + sub (jnt:page)
[jnt:text] > jnt:content
"#;

fn jnt(local: &str) -> QualifiedName {
	QualifiedName::new(JNT, local).unwrap()
}

fn plain(local: &str) -> QualifiedName {
	QualifiedName::new("", local).unwrap()
}

fn loaded_registry() -> NodeTypeRegistry {
	let registry = NodeTypeRegistry::new();
	CndReader::new(&registry, "pages.cnd", "mod-pages")
		.parse(PAGE_DEFINITIONS)
		.expect("page definitions parse");
	registry
}

struct Bundle;

impl LabelSource for Bundle {
	fn lookup(&self, key: &str, locale: &str) -> Option<String> {
		match (key, locale) {
			("jnt_page", "fr") => Some("Page".to_string()),
			("jnt_page.template", "fr") => Some("Gabarit".to_string()),
			_ => None,
		}
	}
}

#[rstest]
#[case("")]
#[case("jnt:page")]
#[case("unknown:page")]
#[case("nt:")]
fn test_lookup_failures_are_no_such_node_type(#[case] name: &str) {
	let registry = NodeTypeRegistry::new();
	assert!(matches!(registry.get_node_type(name), Err(RegistryError::NoSuchNodeType(n)) if n == name));
	assert!(!registry.has_node_type(name));
}

#[test]
fn test_expanded_and_prefixed_lookups_agree() {
	let registry = loaded_registry();
	let by_prefix = registry.get_node_type("jnt:page").unwrap();
	let by_uri = registry.get_node_type(&format!("{{{JNT}}}page")).unwrap();
	assert!(Arc::ptr_eq(&by_prefix, &by_uri));
}

#[test]
fn test_flush_labels_clears_types_and_items() {
	let registry = loaded_registry();
	let namespaces = registry.namespaces();
	let page = registry.get_node_type("jnt:page").unwrap();
	assert_eq!(page.label("fr", &namespaces, &Bundle), "Page");
	assert_eq!(page.label("de", &namespaces, &Bundle), "page");
	let template = page.declared_property(&plain("template")).unwrap();
	assert_eq!(template.item.label("fr", &namespaces, &Bundle), "Gabarit");
	assert_eq!(page.cached_label_count(), 2);

	registry.flush_labels();
	assert_eq!(page.cached_label_count(), 0);
	assert!(template.item.labels.is_empty());
}

#[test]
fn test_typed_items_follow_registration() {
	let registry = loaded_registry();
	let layout = registry.typed_items("layout");
	assert_eq!(layout.len(), 1);
	assert_eq!(layout[0].item().name, plain("template"));
	assert_eq!(registry.typed_items("metadata").len(), 1);
	assert!(registry.item_types().contains(&"content".to_string()));

	registry.unregister_node_type(&jnt("text")).unwrap();
	registry
		.unregister_node_types_by_names(&[jnt("page")])
		.expect("page only depends on itself");
	assert!(registry.typed_items("layout").is_empty());
}

#[test]
fn test_replacing_a_type_reindexes_its_items() {
	let registry = loaded_registry();
	let page = registry.get_node_type("jnt:page").unwrap();
	let replacement = NodeType::builder(page.name().clone(), "mod-pages")
		.supertype(jnt("content"))
		.build();
	registry.add_node_type(replacement).unwrap();
	assert!(registry.typed_items("layout").is_empty());
	assert!(Arc::ptr_eq(&registry.get_node_type("jnt:page").unwrap(), &registry.node_type(&jnt("page")).unwrap()));
}

#[test]
fn test_supertype_closure_and_is_node_type() {
	let registry = loaded_registry();
	let nt_base = registry.parse_name("nt:base").unwrap();
	assert_eq!(registry.supertype_closure(&jnt("page")), vec![jnt("content"), nt_base.clone()]);
	assert!(registry.is_node_type(&jnt("page"), &nt_base));
	assert!(registry.is_node_type(&jnt("page"), &jnt("page")));
	assert!(!registry.is_node_type(&jnt("content"), &jnt("page")));
}

#[test]
fn test_applicable_definitions_prefer_named_items() {
	let registry = loaded_registry();
	let title = registry.parse_name("jcr:title").unwrap();
	let tagged = registry.parse_name("jmix:tagged").unwrap();

	let def = registry.applicable_property_definition(&jnt("page"), &[], &title).expect("inherited");
	assert!(def.internationalized);
	assert_eq!(def.declaring_type(), &jnt("content"));

	let tags = registry.applicable_property_definition(&jnt("page"), &[tagged], &plain("tags"));
	assert!(tags.is_some_and(|d| d.multiple));

	let residual = registry.applicable_property_definition(&jnt("page"), &[], &plain("free")).expect("residual");
	assert!(residual.item.is_unstructured());
	assert!(registry.applicable_property_definition(&jnt("text"), &[], &plain("free")).is_some());

	let sub = registry
		.applicable_child_node_definition(&jnt("page"), &[], &plain("sub"), Some(&jnt("page")))
		.expect("named child");
	assert_eq!(sub.name(), &plain("sub"));

	let fallback = registry
		.applicable_child_node_definition(&jnt("page"), &[], &plain("sub"), Some(&jnt("text")))
		.expect("residual child accepts any content");
	assert!(fallback.item.is_unstructured());

	let base = registry.parse_name("nt:base").unwrap();
	assert!(registry.applicable_child_node_definition(&jnt("page"), &[], &plain("x"), Some(&base)).is_none());
}

#[rstest]
#[case::single(false)]
#[case::multiple(true)]
fn test_residual_definition_follows_value_multiplicity(#[case] multiple: bool) {
	let registry = NodeTypeRegistry::new();
	CndReader::new(&registry, "bag.cnd", "mod-bag")
		.parse("<jnt = 'http://www.jahia.org/jahia/nt/1.0'>\n[jnt:bag]\n - * (string)\n - * (string) multiple\n - label (string)\n")
		.expect("bag definitions parse");

	let def = registry
		.applicable_property_definition_for(&jnt("bag"), &[], &plain("extra"), multiple)
		.expect("residual");
	assert!(def.item.is_unstructured());
	assert_eq!(def.multiple, multiple);

	// Named definitions win regardless of multiplicity.
	let label = registry.applicable_property_definition_for(&jnt("bag"), &[], &plain("label"), true).unwrap();
	assert_eq!(label.name(), &plain("label"));
	// Without a hint the first residual is used.
	let first = registry.applicable_property_definition(&jnt("bag"), &[], &plain("extra")).unwrap();
	assert!(!first.multiple);
}

#[test]
fn test_listing_by_kind_and_system_id() {
	let registry = loaded_registry();
	let other = NodeType::builder(jnt("other"), "mod-other").mixin(true).build();
	registry.add_node_type(other).unwrap();

	assert_eq!(registry.all_node_types(None).len(), 6);
	assert_eq!(registry.node_types("mod-pages").len(), 5);
	assert_eq!(registry.mixin_node_types(None).len(), 2);
	assert_eq!(registry.mixin_node_types(Some(&["mod-other"])).len(), 1);
	assert_eq!(registry.primary_node_types(Some(&["mod-pages"])).len(), 4);
	assert!(registry.primary_node_types(Some(&["mod-other"])).is_empty());
}

#[test]
fn test_strict_batch_unregistration_is_all_or_nothing() {
	let registry = loaded_registry();
	let err = registry
		.unregister_node_types_by_names(&[jnt("text"), jnt("content")])
		.expect_err("jnt:page still extends jnt:content");
	assert!(matches!(err, RegistryError::ConstraintViolation(ref m) if m.contains("jnt:page")));
	assert!(registry.contains(&jnt("text")));

	registry
		.unregister_node_types_by_names(&[jnt("text"), jnt("page"), jnt("content")])
		.expect("dependencies inside the batch");
	assert!(!registry.contains(&jnt("content")));
}

#[test]
fn test_dependents_outside_the_type_block_unregistration() {
	let registry = loaded_registry();
	let mut first = NodeDefinition::new(plain("first"), jnt("list"));
	first.required_primary_types = vec![jnt("text")];
	registry
		.add_node_type(NodeType::builder(jnt("list"), "mod-lists").child_node(first).build())
		.unwrap();

	let err = registry.unregister_node_type(&jnt("text")).expect_err("jnt:list requires text children");
	assert!(matches!(err, RegistryError::ConstraintViolation(ref m) if m.contains("requires it for a child node")));
	let err = registry.unregister_node_type(&jnt("content")).expect_err("jnt:page extends content");
	assert!(matches!(err, RegistryError::ConstraintViolation(ref m) if m.contains("declares it as a supertype")));
	assert!(matches!(
		registry.unregister_node_type(&jnt("missing")),
		Err(RegistryError::NoSuchNodeType(_))
	));

	// jnt:page requires jnt:page children of its own; that does not block.
	registry.unregister_node_type(&jnt("page")).expect("self references are ignored");
}

#[test]
fn test_module_unregistration_unwinds_and_reports_leftovers() {
	let store = Arc::new(MemorySnapshotStore::new());
	let registry = NodeTypeRegistry::new().with_snapshot_store(store);
	registry.init_properties_file();
	CndReader::new(&registry, "pages.cnd", "mod-pages").parse(PAGE_DEFINITIONS).unwrap();
	registry.ledger().set_version("mod-pages", &ModuleVersion::parse("2.0"));
	let news = NodeType::builder(jnt("news"), "mod-news").supertype(jnt("page")).build();
	registry.add_node_type(news).unwrap();

	let report = registry.unregister_node_types("mod-pages");
	assert!(!report.is_complete());
	let retained: Vec<_> = report.retained.iter().map(|(n, _)| n.clone()).collect();
	let nt_base = registry.parse_name("nt:base").unwrap();
	assert_eq!(retained, vec![nt_base, jnt("content"), jnt("page")]);
	assert!(report.retained[2].1.contains("jnt:news"));
	assert_eq!(report.removed, vec![registry.parse_name("jmix:tagged").unwrap(), jnt("text")]);
	assert!(registry.contains(&jnt("page")));
	assert!(!registry.contains(&jnt("text")));
	assert_eq!(registry.ledger().version("mod-pages"), None);
}

#[test]
fn test_validate_definitions_never_mutates() {
	let registry = loaded_registry();
	let before = registry.len();

	let err = registry
		.validate_definitions(
			"<jnt = 'http://www.jahia.org/jahia/nt/1.0'>\n[jnt:page]\n",
			"steal.cnd",
			"mod-thief",
		)
		.expect_err("jnt:page belongs to mod-pages");
	assert!(matches!(err, RegistryError::TypeAlreadyExists(ref n) if n == "jnt:page"));

	let err = registry
		.validate_definitions("[jnt:fresh] bogus\n", "bogus.cnd", "mod-new")
		.expect_err("issues are reported");
	assert!(matches!(err, RegistryError::InvalidDefinitions(ref issues) if issues.len() == 1));

	let parsed = registry
		.validate_definitions("[jnt:fresh] > jnt:content\n", "fresh.cnd", "mod-new")
		.expect("valid document");
	assert_eq!(parsed.node_types.len(), 1);
	assert_eq!(registry.len(), before);
	assert!(!registry.has_node_type("jnt:fresh"));
}

#[test]
fn test_definitions_files_are_recorded_once_per_module() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("pages.cnd");
	fs::write(&path, PAGE_DEFINITIONS).unwrap();
	let grouping = dir.path().join("legacy.grp");
	fs::write(&grouping, "ignored").unwrap();

	let registry = NodeTypeRegistry::new();
	let file = DefinitionsFile::new(&path);
	assert!(registry.add_definitions_file(&file, "mod-pages", None).unwrap());
	assert!(registry.add_definitions_file(&file, "mod-pages", None).unwrap());
	assert!(registry.add_definitions_file(&DefinitionsFile::new(&grouping), "mod-pages", None).unwrap());

	assert_eq!(registry.system_ids(), vec!["mod-pages".to_string()]);
	assert_eq!(registry.files("mod-pages").len(), 2);
	assert!(registry.has_node_type("jnt:page"));

	let dry = registry.definitions_from_file(&file, "mod-pages").unwrap();
	assert_eq!(dry.len(), 5);
	assert!(!Arc::ptr_eq(&dry[0], &registry.all_node_types(None)[0]));
}

#[test]
fn test_missing_file_is_an_io_error() {
	let registry = NodeTypeRegistry::new();
	let file = DefinitionsFile::new("/nonexistent/definitions.cnd");
	let err = registry.add_definitions_file(&file, "mod", None).expect_err("cannot read");
	assert!(matches!(err, RegistryError::Cnd(CndError::Io { .. })));
	assert!(registry.system_ids().is_empty());
}

#[test]
fn test_version_is_saved_through_the_snapshot_store() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("pages.cnd");
	fs::write(&path, PAGE_DEFINITIONS).unwrap();

	let store = Arc::new(MemorySnapshotStore::new());
	let registry = NodeTypeRegistry::new().with_snapshot_store(store.clone());
	registry.init_properties_file();

	let version = ModuleVersion::parse("1.4.0");
	registry
		.add_definitions_file(&DefinitionsFile::new(&path), "mod-pages", Some(&version))
		.unwrap();
	let saved = store.read_definition_properties().unwrap().expect("ledger saved");
	assert!(saved.contains("mod-pages.version=1.4.0"), "{saved}");

	let reloaded = NodeTypeRegistry::new().with_snapshot_store(store);
	reloaded.init_properties_file();
	assert_eq!(reloaded.ledger().version("mod-pages"), Some(version));
}

#[test]
fn test_ledger_is_not_saved_before_loading() {
	let store = Arc::new(MemorySnapshotStore::new());
	let registry = NodeTypeRegistry::new().with_snapshot_store(store.clone());
	registry.ledger().set("k", "v");
	registry.save_properties().unwrap();
	assert_eq!(store.read_definition_properties().unwrap(), None);
}

#[test]
fn test_system_definitions_are_read_in_name_order() {
	let dir = tempfile::tempdir().unwrap();
	fs::write(dir.path().join("01-jcr-nodetypes.cnd"), "[nt:base] abstract\n").unwrap();
	fs::write(
		dir.path().join("02-jahia-nodetypes.cnd"),
		"<jnt = 'http://www.jahia.org/jahia/nt/1.0'>\n[jnt:content] abstract\n",
	)
	.unwrap();
	fs::write(dir.path().join("README"), "not definitions").unwrap();

	let registry = NodeTypeRegistry::new();
	assert_eq!(registry.init_system_definitions(dir.path()).unwrap(), 2);
	assert_eq!(registry.system_ids(), vec!["system-jcr".to_string(), "system-jahia".to_string()]);
	let content = registry.get_node_type("jnt:content").unwrap();
	assert_eq!(content.system_id(), "system-jahia");
	assert_eq!(content.supertypes(), &[registry.parse_name("nt:base").unwrap()]);

	assert_eq!(registry.init_system_definitions(&dir.path().join("missing")).unwrap(), 0);
}

#[rstest]
#[case("02-jahia-nodetypes.cnd", "system-jahia")]
#[case("01-base.cnd", "system-base")]
#[case("plain.cnd", "system-plain")]
fn test_system_file_ids(#[case] file: &str, #[case] expected: &str) {
	assert_eq!(system_id_for_system_file(file), expected);
}

#[rstest]
#[case("my-module.cnd", "my-module")]
#[case("my-module", "my-module")]
fn test_definitions_ids(#[case] name: &str, #[case] expected: &str) {
	assert_eq!(system_id_for_definitions(name), expected);
}
