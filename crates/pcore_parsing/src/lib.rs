//! Turns pcore source text into a [Program]

use pcore_ast::Program;
use pcore_tokens::Token;

pub mod lexer;
pub mod parser;

pub use lexer::{LexError, LexErrorKind, Lexer};
pub use parser::{ParseError, Parser};

/// Lexes the entire source text
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).collect()
}

/// Parses a complete token sequence into a program
pub fn parse(tokens: Vec<Token>) -> Result<Program, ParseError> {
    Parser::new(tokens).parse_program()
}
