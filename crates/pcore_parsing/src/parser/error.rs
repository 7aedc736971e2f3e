use pcore_tokens::{Position, Token};
use thiserror::Error;

/// The token stream does not match the grammar
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parser error: {message} at {position} (token: {offending_token})")]
pub struct ParseError {
    pub message: String,
    pub position: Position,
    pub offending_token: String,
}

impl ParseError {
    /// Creates an error located at the given token
    pub fn at(message: impl Into<String>, token: &Token) -> Self {
        Self {
            message: message.into(),
            position: token.position(),
            offending_token: token.to_source(),
        }
    }

    /// Creates an error for running out of tokens, located at the last token if there was one
    pub fn at_eof(message: impl Into<String>, last: Option<&Token>) -> Self {
        Self {
            message: message.into(),
            position: last.map(Token::position).unwrap_or_default(),
            offending_token: "EOF".to_string(),
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
