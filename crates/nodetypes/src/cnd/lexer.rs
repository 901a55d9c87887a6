//! Tokenizer for CND documents.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
	LAngle,
	RAngle,
	LBracket,
	RBracket,
	LParen,
	RParen,
	Comma,
	Eq,
	Minus,
	Plus,
	Bang,
	Star,
	/// Quoted literal with quotes removed and escapes resolved.
	String(String),
	/// Bare word: names, keywords, numbers.
	Word(String),
	Eof,
}

impl fmt::Display for TokenKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::LAngle => f.write_str("'<'"),
			Self::RAngle => f.write_str("'>'"),
			Self::LBracket => f.write_str("'['"),
			Self::RBracket => f.write_str("']'"),
			Self::LParen => f.write_str("'('"),
			Self::RParen => f.write_str("')'"),
			Self::Comma => f.write_str("','"),
			Self::Eq => f.write_str("'='"),
			Self::Minus => f.write_str("'-'"),
			Self::Plus => f.write_str("'+'"),
			Self::Bang => f.write_str("'!'"),
			Self::Star => f.write_str("'*'"),
			Self::String(s) => write!(f, "'{s}'"),
			Self::Word(w) => write!(f, "{w}"),
			Self::Eof => f.write_str("end of input"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
	pub kind: TokenKind,
	/// 1-based line of the first character.
	pub line: usize,
}

/// A lexical error with its line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LexError {
	pub message: String,
	pub line: usize,
}

fn is_punct(c: char) -> bool {
	matches!(c, '<' | '>' | '[' | ']' | '(' | ')' | ',' | '=' | '+' | '!' | '\'' | '"')
}

/// True when `word` would not read back as a single bare word.
pub(crate) fn needs_quoting(word: &str) -> bool {
	word.is_empty()
		|| word.starts_with('-')
		|| word.chars().any(|c| c.is_whitespace() || is_punct(c) || c == '*' || c == '/' || c == '\\')
}

/// Splits `input` into tokens, always ending with [`TokenKind::Eof`].
pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
	let mut tokens = Vec::new();
	let mut chars = input.chars().peekable();
	let mut line = 1;

	while let Some(&c) = chars.peek() {
		if c == '\n' {
			line += 1;
			chars.next();
			continue;
		}
		if c.is_whitespace() {
			chars.next();
			continue;
		}

		let start_line = line;
		let single = match c {
			'<' => Some(TokenKind::LAngle),
			'>' => Some(TokenKind::RAngle),
			'[' => Some(TokenKind::LBracket),
			']' => Some(TokenKind::RBracket),
			'(' => Some(TokenKind::LParen),
			')' => Some(TokenKind::RParen),
			',' => Some(TokenKind::Comma),
			'=' => Some(TokenKind::Eq),
			'-' => Some(TokenKind::Minus),
			'+' => Some(TokenKind::Plus),
			'!' => Some(TokenKind::Bang),
			'*' => Some(TokenKind::Star),
			_ => None,
		};
		if let Some(kind) = single {
			chars.next();
			tokens.push(Token { kind, line: start_line });
			continue;
		}

		if c == '/' {
			chars.next();
			match chars.peek() {
				Some('/') => {
					for c in chars.by_ref() {
						if c == '\n' {
							line += 1;
							break;
						}
					}
					continue;
				}
				Some('*') => {
					chars.next();
					let mut prev = '\0';
					let mut closed = false;
					for c in chars.by_ref() {
						if c == '\n' {
							line += 1;
						}
						if prev == '*' && c == '/' {
							closed = true;
							break;
						}
						prev = c;
					}
					if !closed {
						return Err(LexError {
							message: "unterminated comment".to_string(),
							line: start_line,
						});
					}
					continue;
				}
				_ => {
					return Err(LexError {
						message: "unexpected '/'".to_string(),
						line: start_line,
					});
				}
			}
		}

		if c == '\'' || c == '"' {
			let quote = c;
			chars.next();
			let mut value = String::new();
			let mut closed = false;
			while let Some(c) = chars.next() {
				match c {
					'\\' => {
						if let Some(escaped) = chars.next() {
							value.push(match escaped {
								'n' => '\n',
								't' => '\t',
								other => other,
							});
						}
					}
					c if c == quote => {
						closed = true;
						break;
					}
					'\n' => {
						line += 1;
						value.push('\n');
					}
					c => value.push(c),
				}
			}
			if !closed {
				return Err(LexError {
					message: "unterminated string".to_string(),
					line: start_line,
				});
			}
			tokens.push(Token {
				kind: TokenKind::String(value),
				line: start_line,
			});
			continue;
		}

		let mut word = String::new();
		let mut in_braces = false;
		while let Some(&c) = chars.peek() {
			if c == '{' {
				in_braces = true;
			} else if c == '}' {
				in_braces = false;
			} else if !in_braces && (c.is_whitespace() || is_punct(c) || c == '*' || c == '/') {
				break;
			}
			word.push(c);
			chars.next();
		}
		tokens.push(Token {
			kind: TokenKind::Word(word),
			line: start_line,
		});
	}

	tokens.push(Token { kind: TokenKind::Eof, line });
	Ok(tokens)
}
