use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;

use cairn_names::{NamespaceTable, QualifiedName};

use super::lexer::needs_quoting;
use crate::model::{DEFAULT_ITEM_TYPE, DefaultValue, IndexMode, ItemRef, NodeDefinition, NodeType, OnParentVersion, PropertyDefinition, SelectorType};

/// Renders node types back to canonical CND text.
///
/// Output declares every namespace the types use, then the types in the given
/// order. Reading the output back yields equal definitions.
pub struct CndWriter<'a> {
	namespaces: &'a NamespaceTable,
}

impl<'a> CndWriter<'a> {
	pub fn new(namespaces: &'a NamespaceTable) -> Self {
		Self { namespaces }
	}

	pub fn write(&self, node_types: &[Arc<NodeType>]) -> String {
		let mut out = String::new();
		let mut uris = BTreeSet::new();
		for node_type in node_types {
			collect_namespaces(node_type, &mut uris);
		}
		let mut declared: Vec<(&str, &str)> = uris
			.iter()
			.filter(|uri| !uri.is_empty())
			.filter_map(|uri| self.namespaces.resolve_prefix(uri).ok().map(|p| (p, uri.as_str())))
			.collect();
		declared.sort();
		for (prefix, uri) in &declared {
			let _ = writeln!(out, "<{prefix} = {}>", quote(uri));
		}
		for node_type in node_types {
			out.push('\n');
			self.write_type(&mut out, node_type);
		}
		out
	}

	fn name(&self, name: &QualifiedName) -> String {
		let display = self.namespaces.display(name);
		if !name.is_residual() && needs_quoting(&display) {
			return quote(&display);
		}
		display
	}

	fn names(&self, names: &[QualifiedName]) -> String {
		names.iter().map(|n| self.name(n)).collect::<Vec<_>>().join(", ")
	}

	fn write_type(&self, out: &mut String, node_type: &NodeType) {
		let _ = write!(out, "[{}]", self.name(node_type.name()));
		if !node_type.supertypes().is_empty() {
			let _ = write!(out, " > {}", self.names(node_type.supertypes()));
		}
		if node_type.has_orderable_child_nodes() {
			out.push_str(" orderable");
		}
		if node_type.is_mixin() {
			out.push_str(" mixin");
		}
		if node_type.is_abstract() {
			out.push_str(" abstract");
		}
		if !node_type.is_queryable() {
			out.push_str(" noquery");
		}
		if let Some(item_type) = node_type.item_type() {
			let _ = write!(out, " itemtype = {}", quote(item_type));
		}
		if !node_type.mixin_extends().is_empty() {
			let _ = write!(out, "\n extends = {}", self.names(node_type.mixin_extends()));
		}
		if let Some(primary) = node_type.primary_item() {
			let _ = write!(out, "\n primaryitem {}", self.name(primary));
		}
		out.push('\n');

		let item_type = node_type.item_type().unwrap_or(DEFAULT_ITEM_TYPE);
		let properties = node_type
			.property_definitions()
			.iter()
			.chain(node_type.unstructured_property_definitions().values());
		for property in properties {
			self.write_property(out, property, item_type);
		}
		let children = node_type
			.child_node_definitions()
			.iter()
			.chain(node_type.unstructured_child_node_definitions().values());
		for child in children {
			self.write_child(out, child, item_type);
		}
	}

	fn write_property(&self, out: &mut String, def: &PropertyDefinition, type_item_type: &str) {
		let _ = write!(out, " - {} ({}", self.name(def.name()), def.required_type.as_cnd());
		if def.selector != SelectorType::default_for(def.required_type) || !def.selector_options.is_empty() {
			let _ = write!(out, ", {}", def.selector.as_cnd());
			if !def.selector_options.is_empty() {
				let options: Vec<String> = def
					.selector_options
					.iter()
					.map(|(k, v)| if v.is_empty() { k.clone() } else { format!("{k}={}", quote(v)) })
					.collect();
				let _ = write!(out, "[{}]", options.join(","));
			}
		}
		out.push(')');

		if !def.default_values.is_empty() {
			let values: Vec<String> = def.default_values.iter().map(default_value).collect();
			let _ = write!(out, " = {}", values.join(", "));
		}

		let item = &def.item;
		for (set, keyword) in [
			(item.mandatory, "mandatory"),
			(item.auto_created, "autocreated"),
			(item.protected, "protected"),
			(item.hidden, "hidden"),
			(def.multiple, "multiple"),
			(def.internationalized, "i18n"),
			(def.facetable, "facetable"),
			(def.hierarchical, "hierarchical"),
			(!def.full_text_searchable, "nofulltext"),
			(!def.queryable, "noquery"),
			(!def.query_orderable, "noqueryorder"),
		] {
			if set {
				out.push(' ');
				out.push_str(keyword);
			}
		}
		if def.index != IndexMode::default() {
			let _ = write!(out, " indexed={}", def.index.as_cnd());
		}
		if def.score_boost != 1.0 {
			let _ = write!(out, " scoreboost={}", def.score_boost);
		}
		if let Some(analyzer) = &def.analyzer {
			let _ = write!(out, " analyzer={}", quote(analyzer));
		}
		if let Some(policy) = &def.on_conflict {
			let _ = write!(out, " onconflict={}", quote(policy));
		}
		if let Some(ops) = &def.query_operators {
			let _ = write!(out, " queryops={}", quote(ops));
		}
		write_item_tail(out, &item.item_type, type_item_type, item.on_parent_version);
		if !def.value_constraints.is_empty() {
			let constraints: Vec<String> = def.value_constraints.iter().map(|c| quote(c)).collect();
			let _ = write!(out, " < {}", constraints.join(", "));
		}
		out.push('\n');
	}

	fn write_child(&self, out: &mut String, def: &NodeDefinition, type_item_type: &str) {
		let _ = write!(out, " + {}", self.name(def.name()));
		if !def.required_primary_types.is_empty() {
			let _ = write!(out, " ({})", self.names(&def.required_primary_types));
		}
		if let Some(default) = &def.default_primary_type {
			let _ = write!(out, " = {}", self.name(default));
		}
		let item = &def.item;
		for (set, keyword) in [
			(item.mandatory, "mandatory"),
			(item.auto_created, "autocreated"),
			(item.protected, "protected"),
			(item.hidden, "hidden"),
			(def.same_name_siblings, "sns"),
		] {
			if set {
				out.push(' ');
				out.push_str(keyword);
			}
		}
		write_item_tail(out, &item.item_type, type_item_type, item.on_parent_version);
		out.push('\n');
	}
}

fn write_item_tail(out: &mut String, item_type: &str, type_item_type: &str, opv: OnParentVersion) {
	if item_type != type_item_type {
		let _ = write!(out, " itemtype={}", quote(item_type));
	}
	if opv != OnParentVersion::default() {
		out.push(' ');
		out.push_str(opv.as_cnd());
	}
}

fn default_value(value: &DefaultValue) -> String {
	match value {
		DefaultValue::Literal(v) => quote(v),
		DefaultValue::Dynamic { function, params } => {
			let params: Vec<String> = params.iter().map(|p| quote(p)).collect();
			format!("{function}({})", params.join(", "))
		}
	}
}

fn quote(s: &str) -> String {
	let mut out = String::with_capacity(s.len() + 2);
	out.push('\'');
	for c in s.chars() {
		if c == '\'' || c == '\\' {
			out.push('\\');
		}
		out.push(c);
	}
	out.push('\'');
	out
}

fn collect_namespaces(node_type: &NodeType, uris: &mut BTreeSet<String>) {
	let mut add = |name: &QualifiedName| {
		uris.insert(name.namespace().to_string());
	};
	add(node_type.name());
	node_type.supertypes().iter().for_each(&mut add);
	node_type.mixin_extends().iter().for_each(&mut add);
	if let Some(primary) = node_type.primary_item() {
		add(primary);
	}
	for item in node_type.items() {
		add(&item.item().name);
		if let ItemRef::Node(child) = item {
			child.required_primary_types.iter().for_each(&mut add);
			if let Some(default) = &child.default_primary_type {
				add(default);
			}
		}
	}
}
