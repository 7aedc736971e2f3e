//! Responsible with converting source text into a token stream

use pcore_tokens::{is_keyword, Position, Token, TokenKind, LONG_SYMBOLS, SYMBOLS};
use thiserror::Error;
use tracing::trace;

/// Converts source text into [Token]s, one token per call to [Iterator::next].
///
/// Once an error has been returned the lexer is exhausted.
#[derive(Debug)]
pub struct Lexer {
    chars: Vec<char>,
    offset: usize,
    position: Position,
    failed: bool,
}

impl Lexer {
    /// Creates a new lexer
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            offset: 0,
            position: Position::default(),
            failed: false,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.offset).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.offset + ahead).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += 1;
        if c == '\n' {
            self.position.line += 1;
            self.position.column = 1;
        } else {
            self.position.column += 1;
        }
        Some(c)
    }

    fn bump_while(&mut self, mut predicate: impl FnMut(char) -> bool) -> String {
        let mut buffer = String::new();
        while let Some(c) = self.peek().filter(|&c| predicate(c)) {
            buffer.push(c);
            self.bump();
        }
        buffer
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if is_whitespace(c) => {
                    self.bump();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    self.bump_while(|c| c != '\n');
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> LexResult<Option<Token>> {
        self.skip_trivia();
        let start = self.position;
        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let token = if c.is_alphabetic() || c == '_' {
            let text = self.bump_while(|c| c.is_alphanumeric() || c == '_');
            let kind = if is_keyword(&text) {
                TokenKind::Keyword
            } else {
                TokenKind::Identifier
            };
            Token::new(kind, text, start)
        } else if c.is_ascii_digit() {
            self.number(start)?
        } else if c == '"' || c == '\'' {
            self.quoted(c, start)?
        } else {
            self.symbol(c, start)?
        };
        trace!("lexed {token:?}");
        Ok(Some(token))
    }

    fn number(&mut self, start: Position) -> LexResult<Token> {
        let mut text = self.bump_while(|c| c.is_ascii_digit());
        let mut kind = TokenKind::Integer;
        while self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            if kind == TokenKind::Float {
                return Err(LexError::new(LexErrorKind::MultipleDecimalPoints, start, text));
            }
            kind = TokenKind::Float;
            self.bump();
            text.push('.');
            text.push_str(&self.bump_while(|c| c.is_ascii_digit()));
        }
        Ok(Token::new(kind, text, start))
    }

    fn quoted(&mut self, quote: char, start: Position) -> LexResult<Token> {
        self.bump();
        let body = self.bump_while(|c| c != quote);
        if self.bump().is_none() {
            let kind = if quote == '"' {
                LexErrorKind::UnterminatedString
            } else {
                LexErrorKind::UnterminatedChar
            };
            return Err(LexError::new(kind, start, format!("{quote}{body}")));
        }
        if quote == '"' {
            return Ok(Token::new(TokenKind::String, body, start));
        }
        if body.chars().count() != 1 {
            return Err(LexError::new(
                LexErrorKind::InvalidChar,
                start,
                format!("'{body}'"),
            ));
        }
        Ok(Token::new(TokenKind::Char, body, start))
    }

    fn symbol(&mut self, c: char, start: Position) -> LexResult<Token> {
        if let Some(next) = self.peek_at(1) {
            let pair: String = [c, next].into_iter().collect();
            if LONG_SYMBOLS.contains(&pair.as_str()) {
                self.bump();
                self.bump();
                return Ok(Token::new(TokenKind::Symbol, pair, start));
            }
        }
        if SYMBOLS.contains(&c) {
            self.bump();
            return Ok(Token::new(TokenKind::Symbol, c.to_string(), start));
        }
        Err(LexError::new(
            LexErrorKind::InvalidCharacter(c),
            start,
            c.to_string(),
        ))
    }
}

impl Iterator for Lexer {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_token() {
            Ok(option) => option.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\0')
}

type LexResult<T> = Result<T, LexError>;

/// A malformed character stream
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("lexer error: {reason} at {position} (token: {token})")]
pub struct LexError {
    pub reason: LexErrorKind,
    /// Where the offending token starts
    pub position: Position,
    pub token: String,
}

impl LexError {
    pub fn new(reason: LexErrorKind, position: Position, token: impl Into<String>) -> Self {
        Self {
            reason,
            position,
            token: token.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    #[error("invalid character {0:?}")]
    InvalidCharacter(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated char literal")]
    UnterminatedChar,
    #[error("char literal must contain exactly one character")]
    InvalidChar,
    #[error("more than one decimal point in number")]
    MultipleDecimalPoints,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenize;
    use test_log::test;

    fn kinds_and_text(source: &str) -> Vec<(TokenKind, String)> {
        tokenize(source)
            .unwrap_or_else(|e| panic!("{e}"))
            .into_iter()
            .map(|t| (t.kind(), t.text().to_string()))
            .collect()
    }

    #[test]
    fn longest_symbol_wins() {
        let tokens = kinds_and_text("a<=b->c = = ==");
        let symbols: Vec<_> = tokens
            .iter()
            .filter(|(kind, _)| *kind == TokenKind::Symbol)
            .map(|(_, text)| text.as_str())
            .collect();
        assert_eq!(symbols, ["<=", "->", "=", "=", "=="]);
    }

    #[test]
    fn keywords_and_identifiers() {
        let tokens = kinds_and_text("while whilst _tmp1 func");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Keyword, "while".to_string()),
                (TokenKind::Identifier, "whilst".to_string()),
                (TokenKind::Identifier, "_tmp1".to_string()),
                (TokenKind::Keyword, "func".to_string()),
            ]
        );
    }

    #[test]
    fn numbers() {
        let tokens = kinds_and_text("12 3.25 4.x");
        assert_eq!(tokens[0], (TokenKind::Integer, "12".to_string()));
        assert_eq!(tokens[1], (TokenKind::Float, "3.25".to_string()));
        assert_eq!(tokens[2], (TokenKind::Integer, "4".to_string()));
        assert_eq!(tokens[3], (TokenKind::Symbol, ".".to_string()));
        assert_eq!(tokens[4], (TokenKind::Identifier, "x".to_string()));
    }

    #[test]
    fn multiple_decimal_points() {
        let err = tokenize("x = 1.2.3;").unwrap_err();
        assert_eq!(err.reason, LexErrorKind::MultipleDecimalPoints);
        assert_eq!(err.position, Position::new(1, 5));
    }

    #[test]
    fn comments_and_positions() {
        let tokens = tokenize("// header\n  x // trailing\ny").expect("could not lex");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].position(), Position::new(2, 3));
        assert_eq!(tokens[1].position(), Position::new(3, 1));
    }

    #[test]
    fn string_and_char_literals() {
        let tokens = tokenize("\"hello world\" 'c'").expect("could not lex");
        assert_eq!(tokens[0].kind(), TokenKind::String);
        assert_eq!(tokens[0].text(), "hello world");
        assert_eq!(tokens[1].kind(), TokenKind::Char);
        assert_eq!(tokens[1].text(), "c");
        assert_eq!(tokens[1].position(), Position::new(1, 15));
    }

    #[test]
    fn unterminated_string_reports_opening_quote() {
        let err = tokenize("x = \"abc").unwrap_err();
        assert_eq!(err.reason, LexErrorKind::UnterminatedString);
        assert_eq!(err.position, Position::new(1, 5));
        assert_eq!(
            err.to_string(),
            "lexer error: unterminated string literal at line 1 column 5 (token: \"abc)"
        );
    }

    #[test]
    fn bad_char_literals() {
        assert_eq!(tokenize("'ab'").unwrap_err().reason, LexErrorKind::InvalidChar);
        assert_eq!(tokenize("''").unwrap_err().reason, LexErrorKind::InvalidChar);
        assert_eq!(tokenize("'a").unwrap_err().reason, LexErrorKind::UnterminatedChar);
    }

    #[test]
    fn invalid_character() {
        let err = tokenize("int x;\n  @").unwrap_err();
        assert_eq!(err.reason, LexErrorKind::InvalidCharacter('@'));
        assert_eq!(err.position, Position::new(2, 3));
    }

    #[test]
    fn lexer_stops_after_error() {
        let mut lexer = Lexer::new("$ a");
        assert!(matches!(lexer.next(), Some(Err(_))));
        assert!(lexer.next().is_none());
    }
}
