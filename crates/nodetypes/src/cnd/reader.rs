use std::sync::Arc;

use cairn_names::{NamespaceTable, QualifiedName, ns};
use indexmap::IndexMap;
use tracing::{debug, warn};

use super::lexer::{Token, TokenKind, tokenize};
use super::mark_issues_encountered;
use crate::error::CndError;
use crate::model::{
	DEFAULT_ITEM_TYPE, DefaultValue, IndexMode, NodeDefinition, NodeType, NodeTypeBuilder, OnParentVersion,
	PropertyDefinition, PropertyType, SelectorType,
};
use crate::registry::NodeTypeRegistry;

/// Outcome of reading one document.
#[derive(Debug, Default)]
pub struct ParsedDefinitions {
	/// Node types in document order. In register mode, the published instances.
	pub node_types: Vec<Arc<NodeType>>,
	/// `(prefix, uri)` pairs declared by the document.
	pub namespaces: Vec<(String, String)>,
	/// Non-fatal problems, one message each.
	pub issues: Vec<String>,
}

impl ParsedDefinitions {
	pub fn has_issues(&self) -> bool {
		!self.issues.is_empty()
	}
}

/// Reads CND text into node type definitions.
///
/// Names resolve against the registry's namespaces plus those declared in the
/// document. Supertypes must resolve, either in the registry or in the same
/// document; any other unresolved reference is reported as an issue.
pub struct CndReader<'r> {
	registry: &'r NodeTypeRegistry,
	filename: String,
	system_id: String,
	register: bool,
}

impl<'r> CndReader<'r> {
	pub fn new(registry: &'r NodeTypeRegistry, filename: impl Into<String>, system_id: impl Into<String>) -> Self {
		Self {
			registry,
			filename: filename.into(),
			system_id: system_id.into(),
			register: true,
		}
	}

	/// With `false`, parsing leaves the registry untouched.
	pub fn register(mut self, register: bool) -> Self {
		self.register = register;
		self
	}

	pub fn parse(self, text: &str) -> Result<ParsedDefinitions, CndError> {
		let tokens = tokenize(text).map_err(|e| self.parse_error(vec![format!("line {}: {}", e.line, e.message)]))?;
		let mut parser = Parser {
			tokens,
			pos: 0,
			namespaces: self.registry.namespaces(),
			system_id: self.system_id.clone(),
			declared: Vec::new(),
			issues: Vec::new(),
			errors: Vec::new(),
		};
		let drafts = parser.document();
		if !parser.errors.is_empty() {
			return Err(self.parse_error(parser.errors));
		}

		let types = self.resolve(drafts, &mut parser)?;
		let mut issues = parser.issues;
		let namespaces = parser.declared;

		let node_types = if self.register {
			for (prefix, uri) in &namespaces {
				if let Err(e) = self.registry.register_namespace(prefix, uri) {
					issues.push(e.to_string());
				}
			}
			let mut published = Vec::with_capacity(types.len());
			for node_type in types {
				match self.registry.add_node_type(node_type) {
					Ok(stored) => published.push(stored),
					Err(e) => issues.push(e.to_string()),
				}
			}
			for mixin in &published {
				for base in mixin.mixin_extends() {
					self.registry.add_mixin_extension(mixin.name(), base);
				}
			}
			published
		} else {
			types.into_iter().map(Arc::new).collect()
		};

		if !issues.is_empty() {
			// Dry runs leave the process flag alone.
			if self.register {
				mark_issues_encountered();
			}
			for issue in &issues {
				warn!(file = %self.filename, system_id = %self.system_id, "{issue}");
			}
		}
		debug!(
			file = %self.filename,
			system_id = %self.system_id,
			count = node_types.len(),
			register = self.register,
			"read definitions"
		);

		Ok(ParsedDefinitions {
			node_types,
			namespaces,
			issues,
		})
	}

	fn parse_error(&self, messages: Vec<String>) -> CndError {
		CndError::Parse {
			file: self.filename.clone(),
			messages,
		}
	}

	/// Resolves supertypes, implicit `nt:base`, mixin extensions and required
	/// child types against the document and the registry.
	fn resolve(&self, drafts: Vec<Draft>, parser: &mut Parser) -> Result<Vec<NodeType>, CndError> {
		let local: IndexMap<QualifiedName, bool> = drafts
			.iter()
			.map(|d| (d.builder.name().clone(), d.builder.is_mixin()))
			.collect();
		let mixin_flag = |name: &QualifiedName| -> Option<bool> {
			local
				.get(name)
				.copied()
				.or_else(|| self.registry.node_type(name).map(|t| t.is_mixin()))
		};
		let nt_base = QualifiedName::new(ns::NT_URI, "base").ok();
		let nt_base = nt_base.filter(|base| mixin_flag(base).is_some());

		let mut errors = Vec::new();
		let mut types = Vec::with_capacity(drafts.len());
		for mut draft in drafts {
			let display = parser.namespaces.display(draft.builder.name());
			for supertype in draft.builder.supertypes() {
				if mixin_flag(supertype).is_none() {
					errors.push(format!(
						"line {}: cannot find supertype {} of {display}",
						draft.line,
						parser.namespaces.display(supertype)
					));
				}
			}

			if let Some(base) = &nt_base
				&& !draft.builder.is_mixin()
				&& draft.builder.name() != base
				&& !draft.builder.supertypes().iter().any(|s| mixin_flag(s) == Some(false))
			{
				draft.builder.add_supertype(base.clone());
			}

			for target in &draft.extends {
				if mixin_flag(target).is_some() {
					draft.builder.add_mixin_extends(target.clone());
				} else {
					parser.issues.push(format!(
						"line {}: cannot find type {} extended by {display}",
						draft.line,
						parser.namespaces.display(target)
					));
				}
			}

			let node_type = draft.builder.build();
			let children = node_type
				.child_node_definitions()
				.iter()
				.chain(node_type.unstructured_child_node_definitions().values());
			for child in children {
				for required in child.required_primary_types.iter().chain(child.default_primary_type.as_ref()) {
					if mixin_flag(required).is_none() {
						parser.issues.push(format!(
							"line {}: unknown required type {} for child {} of {display}",
							draft.line,
							parser.namespaces.display(required),
							parser.namespaces.display(child.name())
						));
					}
				}
			}
			types.push(node_type);
		}

		if errors.is_empty() { Ok(types) } else { Err(self.parse_error(errors)) }
	}
}

/// A node type being read, plus what can only be resolved once the whole
/// document is known.
struct Draft {
	builder: NodeTypeBuilder,
	line: usize,
	item_type: Option<String>,
	extends: Vec<QualifiedName>,
}

impl Draft {
	fn default_item_type(&self) -> String {
		self.item_type.clone().unwrap_or_else(|| DEFAULT_ITEM_TYPE.to_string())
	}
}

struct SyntaxError {
	message: String,
	line: usize,
}

type Step<T> = Result<T, SyntaxError>;

static EOF: TokenKind = TokenKind::Eof;

struct Parser {
	tokens: Vec<Token>,
	pos: usize,
	namespaces: NamespaceTable,
	system_id: String,
	declared: Vec<(String, String)>,
	issues: Vec<String>,
	errors: Vec<String>,
}

impl Parser {
	fn peek(&self) -> &TokenKind {
		self.peek_at(0)
	}

	fn peek_at(&self, n: usize) -> &TokenKind {
		self.tokens.get(self.pos + n).map_or(&EOF, |t| &t.kind)
	}

	fn line(&self) -> usize {
		self.tokens.get(self.pos).or(self.tokens.last()).map_or(0, |t| t.line)
	}

	fn advance(&mut self) -> TokenKind {
		let kind = self.peek().clone();
		if self.pos < self.tokens.len() {
			self.pos += 1;
		}
		kind
	}

	fn eat(&mut self, kind: &TokenKind) -> bool {
		if self.peek() == kind {
			self.advance();
			true
		} else {
			false
		}
	}

	fn expect(&mut self, kind: TokenKind) -> Step<()> {
		let line = self.line();
		match self.advance() {
			found if found == kind => Ok(()),
			found => Err(SyntaxError {
				message: format!("expected {kind}, found {found}"),
				line,
			}),
		}
	}

	fn issue(&mut self, line: usize, message: impl std::fmt::Display) {
		self.issues.push(format!("line {line}: {message}"));
	}

	/// True at `<prefix = ...`, the start of a namespace declaration.
	fn at_namespace(&self) -> bool {
		matches!(self.peek(), TokenKind::LAngle)
			&& matches!(self.peek_at(1), TokenKind::Word(_))
			&& matches!(self.peek_at(2), TokenKind::Eq)
	}

	fn document(&mut self) -> Vec<Draft> {
		let mut drafts = Vec::new();
		loop {
			let result = match self.peek().clone() {
				TokenKind::Eof => break,
				TokenKind::LAngle => self.namespace(),
				TokenKind::LBracket => self.node_type().map(|d| drafts.push(d)),
				other => Err(SyntaxError {
					message: format!("unexpected {other}, expected a namespace or a node type"),
					line: self.line(),
				}),
			};
			if let Err(e) = result {
				self.errors.push(format!("line {}: {}", e.line, e.message));
				self.recover();
			}
		}
		drafts
	}

	/// Skips to the next node type declaration.
	fn recover(&mut self) {
		self.advance();
		while !matches!(self.peek(), TokenKind::LBracket | TokenKind::Eof) {
			self.advance();
		}
	}

	fn namespace(&mut self) -> Step<()> {
		let line = self.line();
		self.expect(TokenKind::LAngle)?;
		let prefix = self.value("namespace prefix")?;
		self.expect(TokenKind::Eq)?;
		let uri = self.value("namespace URI")?;
		self.expect(TokenKind::RAngle)?;
		match self.namespaces.register(&prefix, &uri) {
			Ok(()) => {
				if !self.declared.iter().any(|(p, _)| *p == prefix) {
					self.declared.push((prefix, uri));
				}
			}
			Err(e) => self.issue(line, e),
		}
		Ok(())
	}

	/// A bare word or a quoted string.
	fn value(&mut self, what: &str) -> Step<String> {
		let line = self.line();
		match self.advance() {
			TokenKind::Word(w) | TokenKind::String(w) => Ok(w),
			other => Err(SyntaxError {
				message: format!("expected {what}, found {other}"),
				line,
			}),
		}
	}

	fn name(&mut self, what: &str) -> Step<QualifiedName> {
		let line = self.line();
		match self.advance() {
			TokenKind::Star => Ok(QualifiedName::residual()),
			TokenKind::Word(w) | TokenKind::String(w) => self.namespaces.parse(&w).map_err(|e| SyntaxError {
				message: e.to_string(),
				line,
			}),
			other => Err(SyntaxError {
				message: format!("expected {what}, found {other}"),
				line,
			}),
		}
	}

	fn name_list(&mut self, what: &str) -> Step<Vec<QualifiedName>> {
		let mut names = vec![self.name(what)?];
		while self.eat(&TokenKind::Comma) {
			names.push(self.name(what)?);
		}
		Ok(names)
	}

	fn node_type(&mut self) -> Step<Draft> {
		let line = self.line();
		self.expect(TokenKind::LBracket)?;
		let name = self.name("node type name")?;
		self.expect(TokenKind::RBracket)?;

		let mut draft = Draft {
			builder: NodeType::builder(name, self.system_id.clone()),
			line,
			item_type: None,
			extends: Vec::new(),
		};
		if self.eat(&TokenKind::RAngle) {
			for supertype in self.name_list("supertype")? {
				draft.builder.add_supertype(supertype);
			}
		}
		self.type_options(&mut draft)?;

		loop {
			match self.peek().clone() {
				TokenKind::Minus => self.property(&mut draft)?,
				TokenKind::Plus => self.child_node(&mut draft)?,
				_ => break,
			}
		}
		Ok(draft)
	}

	fn type_options(&mut self, draft: &mut Draft) -> Step<()> {
		loop {
			let line = self.line();
			match self.peek().clone() {
				TokenKind::Bang => {
					self.advance();
					let item = self.name("primary item")?;
					draft.builder.set_primary_item(item);
				}
				TokenKind::Word(word) => {
					self.advance();
					match word.to_ascii_lowercase().as_str() {
						"orderable" | "ord" | "o" => draft.builder.set_orderable(true),
						"mixin" | "mix" | "m" => draft.builder.set_mixin(true),
						"abstract" | "abs" | "a" => draft.builder.set_abstract(true),
						"noquery" | "nq" => draft.builder.set_queryable(false),
						"query" | "q" => draft.builder.set_queryable(true),
						"primaryitem" => {
							let item = self.name("primary item")?;
							draft.builder.set_primary_item(item);
						}
						"extends" => {
							self.expect(TokenKind::Eq)?;
							let targets = self.name_list("extended type")?;
							draft.extends.extend(targets);
						}
						"itemtype" => {
							self.expect(TokenKind::Eq)?;
							let item_type = self.value("item type")?;
							draft.builder.set_item_type(item_type.clone());
							draft.item_type = Some(item_type);
						}
						_ => self.unknown_attribute(line, &word),
					}
				}
				_ => return Ok(()),
			}
		}
	}

	fn unknown_attribute(&mut self, line: usize, word: &str) {
		if self.eat(&TokenKind::Eq) && matches!(self.peek(), TokenKind::Word(_) | TokenKind::String(_)) {
			self.advance();
		}
		self.issue(line, format_args!("unknown attribute '{word}'"));
	}

	fn property(&mut self, draft: &mut Draft) -> Step<()> {
		self.expect(TokenKind::Minus)?;
		let name = self.name("property name")?;
		let mut def = PropertyDefinition::new(name, draft.builder.name().clone(), PropertyType::String);
		def.item.item_type = draft.default_item_type();

		let mut selector = None;
		if self.eat(&TokenKind::LParen) {
			let line = self.line();
			def.required_type = match self.advance() {
				TokenKind::Star => PropertyType::Undefined,
				TokenKind::Word(w) => PropertyType::from_cnd(&w).unwrap_or_else(|| {
					self.issue(line, format_args!("unknown property type '{w}'"));
					PropertyType::Undefined
				}),
				other => {
					return Err(SyntaxError {
						message: format!("expected property type, found {other}"),
						line,
					});
				}
			};
			if self.eat(&TokenKind::Comma) {
				let line = self.line();
				let name = self.value("selector")?;
				match SelectorType::from_cnd(&name) {
					Some(s) => selector = Some(s),
					None => self.issue(line, format_args!("unknown selector '{name}'")),
				}
				if self.eat(&TokenKind::LBracket) {
					self.selector_options(&mut def)?;
				}
			}
			self.expect(TokenKind::RParen)?;
		}
		def.selector = selector.unwrap_or(SelectorType::default_for(def.required_type));

		if self.eat(&TokenKind::Eq) {
			def.default_values.push(self.default_value()?);
			while self.eat(&TokenKind::Comma) {
				def.default_values.push(self.default_value()?);
			}
		}

		loop {
			let line = self.line();
			match self.peek().clone() {
				TokenKind::Star => {
					self.advance();
					def.multiple = true;
				}
				TokenKind::Bang => {
					self.advance();
					draft.builder.set_primary_item(def.name().clone());
				}
				TokenKind::LAngle if !self.at_namespace() => {
					self.advance();
					def.value_constraints.push(self.value("value constraint")?);
					while self.eat(&TokenKind::Comma) {
						def.value_constraints.push(self.value("value constraint")?);
					}
				}
				TokenKind::Word(word) => {
					self.advance();
					self.property_attribute(line, &word, &mut def, draft)?;
				}
				_ => break,
			}
		}

		draft.builder.add_property(def);
		Ok(())
	}

	fn selector_options(&mut self, def: &mut PropertyDefinition) -> Step<()> {
		if self.eat(&TokenKind::RBracket) {
			return Ok(());
		}
		loop {
			let key = self.value("selector option")?;
			let value = if self.eat(&TokenKind::Eq) {
				self.value("selector option value")?
			} else {
				String::new()
			};
			def.selector_options.insert(key, value);
			if !self.eat(&TokenKind::Comma) {
				return self.expect(TokenKind::RBracket);
			}
		}
	}

	fn default_value(&mut self) -> Step<DefaultValue> {
		let line = self.line();
		match self.advance() {
			TokenKind::String(s) => Ok(DefaultValue::Literal(s)),
			TokenKind::Word(w) if self.eat(&TokenKind::LParen) => {
				let mut params = Vec::new();
				if !self.eat(&TokenKind::RParen) {
					params.push(self.value("function argument")?);
					while self.eat(&TokenKind::Comma) {
						params.push(self.value("function argument")?);
					}
					self.expect(TokenKind::RParen)?;
				}
				Ok(DefaultValue::Dynamic { function: w, params })
			}
			TokenKind::Word(w) => Ok(DefaultValue::Literal(w)),
			other => Err(SyntaxError {
				message: format!("expected default value, found {other}"),
				line,
			}),
		}
	}

	fn property_attribute(&mut self, line: usize, word: &str, def: &mut PropertyDefinition, draft: &mut Draft) -> Step<()> {
		match word.to_ascii_lowercase().as_str() {
			"mandatory" | "man" | "m" => def.item.mandatory = true,
			"autocreated" | "aut" | "a" => def.item.auto_created = true,
			"protected" | "pro" | "p" => def.item.protected = true,
			"multiple" | "mul" => def.multiple = true,
			"primary" | "pri" => draft.builder.set_primary_item(def.name().clone()),
			"i18n" | "internationalized" => def.internationalized = true,
			"hidden" => def.item.hidden = true,
			"facetable" => def.facetable = true,
			"hierarchical" => def.hierarchical = true,
			"nofulltext" | "nof" => def.full_text_searchable = false,
			"noquery" | "nq" => def.queryable = false,
			"noqueryorder" | "nqord" => def.query_orderable = false,
			"sortable" => def.query_orderable = true,
			"indexed" => {
				self.expect(TokenKind::Eq)?;
				let mode = self.value("index mode")?;
				match IndexMode::from_cnd(&mode) {
					Some(mode) => def.index = mode,
					None => self.issue(line, format_args!("unknown index mode '{mode}'")),
				}
			}
			"scoreboost" => {
				self.expect(TokenKind::Eq)?;
				let boost = self.value("score boost")?;
				match boost.parse() {
					Ok(boost) => def.score_boost = boost,
					Err(_) => self.issue(line, format_args!("invalid score boost '{boost}'")),
				}
			}
			"analyzer" => {
				self.expect(TokenKind::Eq)?;
				def.analyzer = Some(self.value("analyzer")?);
			}
			"onconflict" => {
				self.expect(TokenKind::Eq)?;
				def.on_conflict = Some(self.value("conflict policy")?);
			}
			"queryops" => {
				self.expect(TokenKind::Eq)?;
				def.query_operators = Some(self.value("query operators")?);
			}
			"itemtype" => {
				self.expect(TokenKind::Eq)?;
				def.item.item_type = self.value("item type")?;
			}
			_ => match OnParentVersion::from_cnd(word) {
				Some(opv) => def.item.on_parent_version = opv,
				None => self.unknown_attribute(line, word),
			},
		}
		Ok(())
	}

	fn child_node(&mut self, draft: &mut Draft) -> Step<()> {
		self.expect(TokenKind::Plus)?;
		let name = self.name("child node name")?;
		let mut def = NodeDefinition::new(name, draft.builder.name().clone());
		def.item.item_type = draft.default_item_type();

		if self.eat(&TokenKind::LParen) {
			def.required_primary_types = self.name_list("required type")?;
			self.expect(TokenKind::RParen)?;
		}
		if self.eat(&TokenKind::Eq) {
			def.default_primary_type = Some(self.name("default primary type")?);
		}

		loop {
			let line = self.line();
			match self.peek().clone() {
				TokenKind::Star => {
					self.advance();
					def.same_name_siblings = true;
				}
				TokenKind::Bang => {
					self.advance();
					draft.builder.set_primary_item(def.name().clone());
				}
				TokenKind::Word(word) => {
					self.advance();
					match word.to_ascii_lowercase().as_str() {
						"mandatory" | "man" | "m" => def.item.mandatory = true,
						"autocreated" | "aut" | "a" => def.item.auto_created = true,
						"protected" | "pro" | "p" => def.item.protected = true,
						"multiple" | "mul" | "sns" => def.same_name_siblings = true,
						"primary" | "pri" => draft.builder.set_primary_item(def.name().clone()),
						"hidden" => def.item.hidden = true,
						"itemtype" => {
							self.expect(TokenKind::Eq)?;
							def.item.item_type = self.value("item type")?;
						}
						_ => match OnParentVersion::from_cnd(&word) {
							Some(opv) => def.item.on_parent_version = opv,
							None => self.unknown_attribute(line, &word),
						},
					}
				}
				_ => break,
			}
		}

		draft.builder.add_child_node(def);
		Ok(())
	}
}
