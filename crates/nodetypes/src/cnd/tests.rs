use cairn_names::QualifiedName;
use pretty_assertions::assert_eq;

use super::*;
use crate::error::CndError;
use crate::model::{DefaultValue, IndexMode, OnParentVersion, PropertyType, SelectorType};
use crate::registry::NodeTypeRegistry;

const JNT: &str = "http://www.jahia.org/jahia/nt/1.0";
const JMIX: &str = "http://www.jahia.org/jahia/mix/1.0";

const TEXT_DEFINITIONS: &str = r#"
<jnt = 'http://www.jahia.org/jahia/nt/1.0'>
<jmix = 'http://www.jahia.org/jahia/mix/1.0'>

// base types
[nt:base] abstract
 - jcr:primaryType (name) mandatory autocreated protected COMPUTE
 - jcr:mixinTypes (name) protected multiple COMPUTE

[jmix:droppableContent] mixin

[jnt:content] > nt:base, jmix:droppableContent abstract

/* rich text
   with a few attributes */
[jnt:text] > jnt:content orderable itemtype = 'content'
 - text (string, richtext[ckeditor.customConfig='x']) i18n mandatory < '.{1,200}'
 - created (date) = now() autocreated
 - author (string) = useCurrentUser()
 - status (string, choicelist[resourceBundle]) = 'draft' indexed=untokenized facetable
 - * (undefined) multiple
 + * (jnt:content) = jnt:text sns
 + image (jnt:content) itemtype = layout
"#;

fn jnt(local: &str) -> QualifiedName {
	QualifiedName::new(JNT, local).unwrap()
}

fn plain(local: &str) -> QualifiedName {
	QualifiedName::new("", local).unwrap()
}

#[test]
fn test_reads_types_and_items() {
	let registry = NodeTypeRegistry::new();
	let parsed = CndReader::new(&registry, "text.cnd", "mod-text")
		.parse(TEXT_DEFINITIONS)
		.expect("document should parse");

	assert!(parsed.issues.is_empty(), "unexpected issues: {:?}", parsed.issues);
	assert_eq!(parsed.node_types.len(), 4);
	assert_eq!(
		parsed.namespaces,
		vec![("jnt".to_string(), JNT.to_string()), ("jmix".to_string(), JMIX.to_string())]
	);

	let text = registry.get_node_type("jnt:text").expect("jnt:text registered");
	assert_eq!(text.system_id(), "mod-text");
	assert!(text.has_orderable_child_nodes());
	assert_eq!(text.supertypes(), &[jnt("content")]);
	assert_eq!(text.item_type(), Some("content"));

	let body = text.declared_property(&plain("text")).expect("text property");
	assert_eq!(body.required_type, PropertyType::String);
	assert_eq!(body.selector, SelectorType::RichText);
	assert_eq!(body.selector_options.get("ckeditor.customConfig").map(String::as_str), Some("x"));
	assert!(body.internationalized);
	assert!(body.item.mandatory);
	assert_eq!(body.value_constraints, vec![".{1,200}".to_string()]);
	assert_eq!(body.declaring_type(), &jnt("text"));

	let created = text.declared_property(&plain("created")).expect("created property");
	assert_eq!(created.selector, SelectorType::DateTimePicker);
	assert_eq!(
		created.default_values,
		vec![DefaultValue::Dynamic {
			function: "now".to_string(),
			params: vec![]
		}]
	);
	assert!(created.has_dynamic_default());

	let status = text.declared_property(&plain("status")).expect("status property");
	assert_eq!(status.default_values, vec![DefaultValue::Literal("draft".to_string())]);
	assert_eq!(status.index, IndexMode::Untokenized);
	assert!(status.facetable);
	assert_eq!(status.selector_options.get("resourceBundle").map(String::as_str), Some(""));

	assert!(text.unstructured_property_definitions().contains_key("undefined[]"));
	assert_eq!(text.unstructured_child_node_definitions().len(), 1);
	let any_child = text.unstructured_child_node_definitions().values().next().expect("residual child");
	assert!(any_child.same_name_siblings);
	assert_eq!(any_child.default_primary_type, Some(jnt("text")));

	let image = text.declared_child_node(&plain("image")).expect("image child");
	assert_eq!(image.item.item_type, "layout");

	let base = registry.get_node_type("nt:base").expect("nt:base registered");
	let primary_type = base.property_definitions().first().expect("jcr:primaryType");
	assert_eq!(primary_type.item.on_parent_version, OnParentVersion::Compute);
	assert!(primary_type.item.protected && primary_type.item.auto_created);
}

#[test]
fn test_primary_types_inherit_nt_base() {
	let registry = NodeTypeRegistry::new();
	CndReader::new(&registry, "base.cnd", "system-base")
		.parse("[nt:base] abstract\n[nt:hierarchyNode]\n[mix:created] mixin\n")
		.expect("base document");

	let hierarchy = registry.get_node_type("nt:hierarchyNode").expect("registered");
	assert_eq!(hierarchy.supertypes(), &[QualifiedName::new(cairn_names::ns::NT_URI, "base").unwrap()]);
	let mixin = registry.get_node_type("mix:created").expect("registered");
	assert!(mixin.supertypes().is_empty());
	let base = registry.get_node_type("nt:base").expect("registered");
	assert!(base.supertypes().is_empty());
}

#[test]
fn test_missing_supertype_is_fatal() {
	let registry = NodeTypeRegistry::new();
	let err = CndReader::new(&registry, "orphan.cnd", "mod-orphan")
		.parse("<jnt = 'http://www.jahia.org/jahia/nt/1.0'>\n[jnt:orphan] > jnt:missing\n")
		.expect_err("supertype cannot resolve");

	let CndError::Parse { file, messages } = err else {
		panic!("expected a parse error");
	};
	assert_eq!(file, "orphan.cnd");
	assert!(messages.iter().any(|m| m.contains("cannot find supertype jnt:missing")), "{messages:?}");
	assert!(registry.is_empty());
	assert!(!registry.namespaces().has_prefix("jnt"));
}

#[test]
fn test_syntax_errors_carry_lines_and_keep_going() {
	let registry = NodeTypeRegistry::new();
	let err = CndReader::new(&registry, "broken.cnd", "mod-broken")
		.parse("[nt:first\n - x (string)\n[nt:second] > ) \n")
		.expect_err("malformed document");

	let CndError::Parse { messages, .. } = err else {
		panic!("expected a parse error");
	};
	assert_eq!(messages.len(), 2, "{messages:?}");
	assert!(messages[0].starts_with("line 2:"), "{messages:?}");
	assert!(messages[1].starts_with("line 3:"), "{messages:?}");
}

#[test]
fn test_unterminated_string_is_a_parse_error() {
	let registry = NodeTypeRegistry::new();
	let err = CndReader::new(&registry, "quote.cnd", "mod").parse("<a = 'http://a").expect_err("unterminated");
	assert!(matches!(err, CndError::Parse { .. }));
}

#[test]
fn test_non_fatal_issues_accumulate_and_registering_sets_sticky_flag() {
	let registry = NodeTypeRegistry::new();
	let parsed = CndReader::new(&registry, "odd.cnd", "mod-odd")
		.register(false)
		.parse(
			"[nt:odd] sparkly\n - a (string, hologram)\n - b (complex)\n + c (nt:nowhere)\n[mix:m] mixin extends = nt:absent\n",
		)
		.expect("issues are not fatal");

	assert_eq!(parsed.issues.len(), 5, "{:?}", parsed.issues);
	assert!(parsed.issues[0].contains("unknown attribute 'sparkly'"));
	assert!(parsed.issues.iter().any(|i| i.contains("unknown selector 'hologram'")));
	assert!(parsed.issues.iter().any(|i| i.contains("unknown property type 'complex'")));
	assert!(parsed.issues.iter().any(|i| i.contains("unknown required type nt:nowhere")));
	assert!(parsed.issues.iter().any(|i| i.contains("cannot find type nt:absent")));

	// Only a registering read raises the process flag.
	let registered = CndReader::new(&registry, "sticky.cnd", "mod-odd").parse("[nt:sticky] sparkly\n").unwrap();
	assert_eq!(registered.issues.len(), 1);
	assert!(has_encountered_issues_with_definitions());
	assert!(registry.has_encountered_issues());

	let odd = &parsed.node_types[0];
	let b = odd.declared_property(&QualifiedName::new(cairn_names::ns::NT_URI, "b").unwrap());
	assert!(b.is_none(), "bare names live in the default namespace");
	let b = odd.declared_property(&plain("b")).expect("b still declared");
	assert_eq!(b.required_type, PropertyType::Undefined);
}

#[test]
fn test_dry_run_leaves_registry_untouched() {
	let registry = NodeTypeRegistry::new();
	let parsed = CndReader::new(&registry, "text.cnd", "mod-text")
		.register(false)
		.parse(TEXT_DEFINITIONS)
		.expect("document should parse");

	assert_eq!(parsed.node_types.len(), 4);
	assert!(registry.is_empty());
	assert!(!registry.namespaces().has_prefix("jnt"));
	assert!(registry.mixin_extensions().is_empty());
}

#[test]
fn test_written_definitions_read_back_equal() {
	let registry = NodeTypeRegistry::new();
	let parsed = CndReader::new(&registry, "text.cnd", "mod-text")
		.register(false)
		.parse(TEXT_DEFINITIONS)
		.expect("document should parse");

	let mut namespaces = registry.namespaces();
	for (prefix, uri) in &parsed.namespaces {
		namespaces.register(prefix, uri).unwrap();
	}
	let written = CndWriter::new(&namespaces).write(&parsed.node_types);
	assert!(written.starts_with("<jcr = 'http://www.jcp.org/jcr/1.0'>\n<jmix = "), "{written}");

	let reread = CndReader::new(&registry, "text-snapshot.cnd", "mod-text")
		.register(false)
		.parse(&written)
		.expect("written text should parse");
	assert!(reread.issues.is_empty(), "{:?}", reread.issues);
	assert_eq!(reread.node_types, parsed.node_types);
}

#[test]
fn test_names_with_spaces_and_quotes_are_written_quoted() {
	let registry = NodeTypeRegistry::new();
	let parsed = CndReader::new(&registry, "card.cnd", "mod-card")
		.register(false)
		.parse("[nt:card]\n - 'my title' (string)\n - 'it\\'s' (long)\n + 'side panel' (nt:card)\n")
		.expect("quoted names parse");
	let card = &parsed.node_types[0];
	assert!(card.declared_property(&plain("my title")).is_some());

	let written = CndWriter::new(&registry.namespaces()).write(&parsed.node_types);
	assert!(written.contains("'my title'"), "{written}");
	assert!(written.contains("'it\\'s'"), "{written}");
	assert!(written.contains("'side panel'"), "{written}");

	let reread = CndReader::new(&registry, "card-snapshot.cnd", "mod-card")
		.register(false)
		.parse(&written)
		.expect("written text should parse");
	assert!(reread.issues.is_empty(), "{:?}", reread.issues);
	assert_eq!(reread.node_types, parsed.node_types);
}

#[test]
fn test_mixin_extension_is_registered_once() {
	let registry = NodeTypeRegistry::new();
	let doc = "<base = 'urn:base'>\n[base:page]\n[mix:facet] mixin extends = base:page\n";
	CndReader::new(&registry, "facet.cnd", "mod-facet").parse(doc).expect("parses");
	CndReader::new(&registry, "facet.cnd", "mod-facet").parse(doc).expect("parses again");

	let page = registry.parse_name("base:page").unwrap();
	let facet = registry.parse_name("mix:facet").unwrap();
	assert_eq!(registry.mixin_extensions().get(&page), Some(&vec![facet]));
}
