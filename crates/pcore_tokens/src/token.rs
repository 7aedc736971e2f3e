//! A lexical token from a source file, along with streams for said token

use crate::position::Position;
use itertools::Itertools;
use std::fmt::{Debug, Display, Formatter};
use strum::AsRefStr;

/// A lexical token from a source file
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    text: String,
    position: Position,
}

impl Token {
    /// Creates a new token
    pub fn new(kind: TokenKind, text: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }

    /// Gets the kind for this token
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// The text of this token. String and char literals do not include their quotes.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Where the first character of this token was found
    pub fn position(&self) -> Position {
        self.position
    }

    /// Checks if this token is of the given kind and, if given, has the given text
    pub fn is(&self, kind: TokenKind, text: Option<&str>) -> bool {
        self.kind == kind && text.map_or(true, |text| self.text == text)
    }

    /// Checks if this token is the given symbol
    #[inline]
    pub fn is_symbol(&self, symbol: &str) -> bool {
        self.kind == TokenKind::Symbol && self.text == symbol
    }

    /// Converts this token back into the source text it was lexed from
    pub fn to_source(&self) -> String {
        match self.kind {
            TokenKind::String => format!("\"{}\"", self.text),
            TokenKind::Char => format!("'{}'", self.text),
            _ => self.text.clone(),
        }
    }
}

impl Debug for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({:?})@{}:{}", self.kind, self.text, self.position.line, self.position.column)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// The kind for a token
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, AsRefStr)]
pub enum TokenKind {
    Identifier,
    Integer,
    Float,
    String,
    Char,
    Keyword,
    Symbol,
}

impl TokenKind {
    /// Checks if this is the kind of a literal
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::Integer | TokenKind::Float | TokenKind::String | TokenKind::Char
        )
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// A stream of tokens
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream(Vec<Token>);

impl TokenStream {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Token> for TokenStream {
    fn from_iter<T: IntoIterator<Item = Token>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Serializes the stream as whitespace separated source text
impl Display for TokenStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.iter().map(Token::to_source).join(" "))
    }
}
