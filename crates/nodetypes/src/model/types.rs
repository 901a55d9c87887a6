//! Value types, selectors and the small enums attached to item definitions.

use std::fmt;

/// Required value type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PropertyType {
	#[default]
	String,
	Binary,
	Long,
	Double,
	Decimal,
	Date,
	Boolean,
	Name,
	Path,
	Reference,
	WeakReference,
	Uri,
	Undefined,
}

impl PropertyType {
	/// Parses a CND type keyword, case-insensitively.
	pub fn from_cnd(s: &str) -> Option<Self> {
		Some(match s.to_ascii_lowercase().as_str() {
			"string" => Self::String,
			"binary" => Self::Binary,
			"long" => Self::Long,
			"double" => Self::Double,
			"decimal" => Self::Decimal,
			"date" => Self::Date,
			"boolean" => Self::Boolean,
			"name" => Self::Name,
			"path" => Self::Path,
			"reference" => Self::Reference,
			"weakreference" => Self::WeakReference,
			"uri" => Self::Uri,
			"undefined" | "*" => Self::Undefined,
			_ => return None,
		})
	}

	pub const fn as_cnd(self) -> &'static str {
		match self {
			Self::String => "string",
			Self::Binary => "binary",
			Self::Long => "long",
			Self::Double => "double",
			Self::Decimal => "decimal",
			Self::Date => "date",
			Self::Boolean => "boolean",
			Self::Name => "name",
			Self::Path => "path",
			Self::Reference => "reference",
			Self::WeakReference => "weakreference",
			Self::Uri => "uri",
			Self::Undefined => "undefined",
		}
	}
}

impl fmt::Display for PropertyType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_cnd())
	}
}

/// Editing widget hint attached to a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectorType {
	SmallText,
	RichText,
	DateTimePicker,
	DatePicker,
	Checkbox,
	Color,
	Category,
	Picker,
	Choicelist,
	Cron,
	Tag,
	TextArea,
	FileUpload,
}

impl SelectorType {
	const ALL: [(Self, &'static str); 13] = [
		(Self::SmallText, "smalltext"),
		(Self::RichText, "richtext"),
		(Self::DateTimePicker, "datetimepicker"),
		(Self::DatePicker, "datepicker"),
		(Self::Checkbox, "checkbox"),
		(Self::Color, "color"),
		(Self::Category, "category"),
		(Self::Picker, "picker"),
		(Self::Choicelist, "choicelist"),
		(Self::Cron, "cron"),
		(Self::Tag, "tag"),
		(Self::TextArea, "textarea"),
		(Self::FileUpload, "fileupload"),
	];

	pub fn from_cnd(s: &str) -> Option<Self> {
		let lower = s.to_ascii_lowercase();
		Self::ALL.iter().find(|(_, name)| *name == lower).map(|(sel, _)| *sel)
	}

	pub fn as_cnd(self) -> &'static str {
		Self::ALL.iter().find(|(sel, _)| *sel == self).map(|(_, name)| *name).unwrap_or("smalltext")
	}

	/// Selector used when a declaration names none.
	pub const fn default_for(ty: PropertyType) -> Self {
		match ty {
			PropertyType::Date => Self::DateTimePicker,
			PropertyType::Boolean => Self::Checkbox,
			PropertyType::Reference | PropertyType::WeakReference => Self::Picker,
			PropertyType::Binary => Self::FileUpload,
			_ => Self::SmallText,
		}
	}
}

/// Behaviour of an item when its parent is checked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OnParentVersion {
	#[default]
	Copy,
	Version,
	Initialize,
	Compute,
	Ignore,
	Abort,
}

impl OnParentVersion {
	pub fn from_cnd(s: &str) -> Option<Self> {
		Some(match s.to_ascii_uppercase().as_str() {
			"COPY" => Self::Copy,
			"VERSION" => Self::Version,
			"INITIALIZE" => Self::Initialize,
			"COMPUTE" => Self::Compute,
			"IGNORE" => Self::Ignore,
			"ABORT" => Self::Abort,
			_ => return None,
		})
	}

	pub const fn as_cnd(self) -> &'static str {
		match self {
			Self::Copy => "COPY",
			Self::Version => "VERSION",
			Self::Initialize => "INITIALIZE",
			Self::Compute => "COMPUTE",
			Self::Ignore => "IGNORE",
			Self::Abort => "ABORT",
		}
	}
}

/// How a property is indexed for search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexMode {
	No,
	#[default]
	Tokenized,
	Untokenized,
}

impl IndexMode {
	pub fn from_cnd(s: &str) -> Option<Self> {
		Some(match s.to_ascii_lowercase().as_str() {
			"no" => Self::No,
			"tokenized" => Self::Tokenized,
			"untokenized" => Self::Untokenized,
			_ => return None,
		})
	}

	pub const fn as_cnd(self) -> &'static str {
		match self {
			Self::No => "no",
			Self::Tokenized => "tokenized",
			Self::Untokenized => "untokenized",
		}
	}
}
