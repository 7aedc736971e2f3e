//! Tokens produced by lexing pcore source text, along with the positions they were found at.

pub mod position;
pub mod token;

pub use position::Position;
pub use token::{Token, TokenKind, TokenStream};

/// Words that are always lexed as [TokenKind::Keyword]
pub const KEYWORDS: &[&str] = &[
    "if", "else", "while", "return", "break", "continue", "import", "program", "func",
];

/// Two character operators, checked before [SYMBOLS]
pub const LONG_SYMBOLS: &[&str] = &["==", "!=", "<=", ">=", "&&", "||", "->"];

/// Single character symbols
pub const SYMBOLS: &[char] = &[
    '+', '-', '*', '/', '%', '=', '!', '<', '>', '(', ')', '{', '}', '[', ']', ';', ',', '.', ':',
    '&', '|', '^', '~',
];

/// Checks if the given identifier-shaped text is a keyword
pub fn is_keyword(text: &str) -> bool {
    KEYWORDS.contains(&text)
}
