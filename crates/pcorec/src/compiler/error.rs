//! A pcore compilation error

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use pcore_codegen::jit::JitError;
use pcore_codegen::LoweringErrors;
use pcore_parsing::{LexError, ParseError};

/// An error occurred while compiling a pcore program
#[derive(Debug, Error)]
pub enum PCoreCError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Lowering(#[from] LoweringErrors),
    #[error(transparent)]
    Jit(#[from] JitError),
    #[error("{path:?}: {error}")]
    Io { path: PathBuf, error: io::Error },
}

impl PCoreCError {
    pub(crate) fn io(path: impl Into<PathBuf>, error: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            error,
        }
    }

    /// The process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PCoreCError::Lex(_) => 1,
            PCoreCError::Parse(_) => 2,
            PCoreCError::Lowering(_) => 3,
            PCoreCError::Jit(_) | PCoreCError::Io { .. } => 4,
        }
    }
}

/// A type alias for general results in pcorec
pub type PCoreCResult<T> = Result<T, PCoreCError>;
