//! Recursive descent parser producing a [Program] from a token sequence

use pcore_ast::Program;
use pcore_tokens::{Token, TokenKind};
use tracing::trace;

mod error;
mod expr;
mod items;
mod statement;

pub use error::{ParseError, ParseResult};

/// Parses a token sequence with a single cursor and bounded lookahead.
///
/// # Examples
/// ```
/// # use pcore_parsing::{tokenize, Parser};
/// let tokens = tokenize("program P; func main { return; }").unwrap();
/// let program = Parser::new(tokens).parse_program().unwrap();
/// assert_eq!(program.name, "P");
/// ```
#[derive(Debug)]
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    /// Creates a new parser over the given tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    /// Parses `program <identifier> ; <declaration>*`
    pub fn parse_program(&mut self) -> ParseResult<Program> {
        self.consume(TokenKind::Keyword, "program", "`program`")?;
        let name = self.consume_kind(TokenKind::Identifier, "a program name")?;
        self.consume(TokenKind::Symbol, ";", "`;`")?;

        let mut declarations = vec![];
        while !self.is_at_end() {
            declarations.push(self.parse_declaration()?);
        }
        trace!("parsed program {} with {} declarations", name.text(), declarations.len());
        Ok(Program::new(name.text(), declarations))
    }

    /// Gets if every token has been consumed
    pub fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    /// The current token
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    /// The token after the current token
    pub fn peek_next(&self) -> Option<&Token> {
        self.tokens.get(self.current + 1)
    }

    /// The most recently consumed token
    pub fn peek_previous(&self) -> Option<&Token> {
        self.current
            .checked_sub(1)
            .and_then(|index| self.tokens.get(index))
    }

    /// The tokens from the cursor up to, but not including, the next `;`, `{` or `}`
    pub fn peek_until_eol(&self) -> &[Token] {
        let rest = &self.tokens[self.current.min(self.tokens.len())..];
        let end = rest
            .iter()
            .position(|t| t.is_symbol(";") || t.is_symbol("{") || t.is_symbol("}"))
            .unwrap_or(rest.len());
        &rest[..end]
    }

    /// Consumes the current token, failing at the end of input
    pub fn advance(&mut self) -> ParseResult<Token> {
        match self.tokens.get(self.current) {
            Some(token) => {
                let token = token.clone();
                trace!("consumed {token:?}");
                self.current += 1;
                Ok(token)
            }
            None => Err(self.error("unexpected end of input")),
        }
    }

    /// Checks the current token without consuming it
    pub fn check(&self, kind: TokenKind, text: Option<&str>) -> bool {
        self.peek().is_some_and(|t| t.is(kind, text))
    }

    fn check_symbol(&self, symbol: &str) -> bool {
        self.check(TokenKind::Symbol, Some(symbol))
    }

    fn check_next(&self, kind: TokenKind, text: Option<&str>) -> bool {
        self.peek_next().is_some_and(|t| t.is(kind, text))
    }

    /// Consumes the current token if it matches
    pub fn match_token(&mut self, kind: TokenKind, text: Option<&str>) -> bool {
        if self.check(kind, text) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn match_symbol(&mut self, symbol: &str) -> bool {
        self.match_token(TokenKind::Symbol, Some(symbol))
    }

    /// Consumes the current token, which must have the given kind and text
    pub fn consume(
        &mut self,
        kind: TokenKind,
        text: &str,
        expected: &str,
    ) -> ParseResult<Token> {
        if self.check(kind, Some(text)) {
            self.advance()
        } else {
            Err(self.error(format!("expected {expected}")))
        }
    }

    /// Consumes the current token, which must have the given kind
    pub fn consume_kind(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token> {
        if self.check(kind, None) {
            self.advance()
        } else {
            Err(self.error(format!("expected {expected}")))
        }
    }

    /// Creates an error at the current token, or at the last token when all input was consumed
    fn error(&self, message: impl Into<String>) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::at(message, token),
            None => ParseError::at_eof(message, self.tokens.last()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenize;
    use pcore_ast::{Declaration, Statement};
    use test_log::test;

    fn parser(source: &str) -> Parser {
        Parser::new(tokenize(source).expect("could not lex"))
    }

    #[test]
    fn cursor_operations() {
        let mut parser = parser("a b c");
        assert!(parser.peek_previous().is_none());
        assert_eq!(parser.peek().map(Token::text), Some("a"));
        assert_eq!(parser.peek_next().map(Token::text), Some("b"));
        parser.advance().expect("a");
        assert_eq!(parser.peek_previous().map(Token::text), Some("a"));
        parser.advance().expect("b");
        parser.advance().expect("c");
        assert!(parser.is_at_end());
        assert!(parser.peek_next().is_none());
        let err = parser.advance().unwrap_err();
        assert_eq!(err.offending_token, "EOF");
    }

    #[test]
    fn peek_until_eol_stops_at_terminators() {
        let parser = parser("int * p = 3; x");
        let texts: Vec<_> = parser.peek_until_eol().iter().map(Token::text).collect();
        assert_eq!(texts, ["int", "*", "p", "=", "3"]);
    }

    #[test]
    fn program_header_is_required() {
        let err = parser("func main {}").parse_program().unwrap_err();
        assert_eq!(err.message, "expected `program`");
        assert_eq!(err.offending_token, "func");
    }

    #[test]
    fn declarations_in_order() {
        let program = parser("program P; int g = 2; func main { g = 3; } (int a) -> int twice { return a * 2; }")
            .parse_program()
            .expect("could not parse");
        assert_eq!(program.declarations.len(), 3);
        assert!(matches!(&program.declarations[0], Declaration::Variable(v) if v.name == "g"));
        let Declaration::Function(main) = &program.declarations[1] else {
            panic!("expected main to be a function");
        };
        assert_eq!(main.return_type, None);
        assert!(matches!(&main.body.statements[0], Statement::Assignment(a) if a.target == "g"));
        let Declaration::Function(twice) = &program.declarations[2] else {
            panic!("expected twice to be a function");
        };
        assert_eq!(twice.parameters.len(), 1);
        assert_eq!(twice.return_type.as_deref(), Some("int"));
    }
}
