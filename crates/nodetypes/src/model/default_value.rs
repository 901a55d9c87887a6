use chrono::{DateTime, SecondsFormat, Utc};

/// Default value of a property definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
	/// A literal value, stored as text and converted by the property type.
	Literal(String),
	/// A value computed when content is created, e.g. `now()`.
	Dynamic {
		/// Function name as written in the definition.
		function: String,
		/// Quoted arguments.
		params: Vec<String>,
	},
}

/// Inputs available when evaluating dynamic defaults.
pub trait DefaultValueContext {
	/// User creating the content.
	fn current_user(&self) -> Option<&str>;

	/// Resolves a resource bundle key in the creation locale.
	fn resource_bundle(&self, key: &str) -> Option<String>;

	fn now(&self) -> DateTime<Utc> {
		Utc::now()
	}
}

impl DefaultValue {
	pub fn is_dynamic(&self) -> bool {
		matches!(self, Self::Dynamic { .. })
	}

	/// Produces the concrete value for new content.
	///
	/// Unknown functions and missing inputs yield `None`.
	pub fn evaluate(&self, ctx: &dyn DefaultValueContext) -> Option<String> {
		match self {
			Self::Literal(value) => Some(value.clone()),
			Self::Dynamic { function, params } => match function.as_str() {
				"now" => Some(ctx.now().to_rfc3339_opts(SecondsFormat::Millis, true)),
				"useCurrentUser" | "currentUser" => ctx.current_user().map(str::to_string),
				"resourceBundle" => {
					let key = params.first()?;
					Some(ctx.resource_bundle(key).unwrap_or_else(|| key.clone()))
				}
				_ => None,
			},
		}
	}
}
