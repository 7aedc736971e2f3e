//! Responsible with compiling pcore source files into a serialized module

use std::io;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use strum::{AsRefStr, EnumString};
use thiserror::Error;
use tracing::{debug, info, info_span};

use pcore_codegen::ir::IrModuleBuilder;
use pcore_codegen::jit::Jit;
use pcore_codegen::stack::StackBackend;
use pcore_codegen::{lower, Constant};

pub mod error;
pub use error::{PCoreCError, PCoreCResult};

/// The backend a program is lowered into
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum BackendKind {
    /// Typed SSA-style blocks, which can also be run
    #[default]
    Ssa,
    /// Flat stack machine text
    Stack,
}

/// What is written to the output
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Emit {
    /// The token stream, one token per line. Compilation stops after lexing.
    Tokens,
    /// The syntax tree. Compilation stops after parsing.
    Ast,
    /// The lowered module
    #[default]
    Module,
}

/// The result of a successful compilation
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    /// The serialized output
    pub output: String,
    /// The value returned by `main`, if the program was run
    pub result: Option<Constant>,
}

/// Responsible with compiling pcore source into a serialized module.
///
/// Must be configured using an [PCoreCBuilder].
#[derive(Debug)]
pub struct PCoreC {
    backend: BackendKind,
    output_path: PathBuf,
    emit: Emit,
    run: bool,
}

impl PCoreC {
    /// Creates the default PCoreCBuilder
    #[inline]
    pub fn builder() -> PCoreCBuilder {
        PCoreCBuilder::new()
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Compiles source text without writing any output
    pub fn compile_source(&self, source: &str) -> PCoreCResult<Compiled> {
        let tokens = info_span!("lex").in_scope(|| pcore_parsing::tokenize(source))?;
        debug!("lexed {} tokens", tokens.len());
        if self.emit == Emit::Tokens {
            return Ok(Compiled {
                output: tokens.iter().map(|t| format!("{t:?}\n")).join(""),
                result: None,
            });
        }

        let program = info_span!("parse").in_scope(|| pcore_parsing::parse(tokens))?;
        if self.emit == Emit::Ast {
            return Ok(Compiled {
                output: program.to_string(),
                result: None,
            });
        }

        let _span = info_span!("lower", backend = self.backend.as_ref()).entered();
        match self.backend {
            BackendKind::Ssa => {
                let module = lower(program, IrModuleBuilder::new())?;
                let result = if self.run {
                    let mut jit = Jit::new()?;
                    jit.compile(&module)?;
                    let result = jit.run_function("main")?;
                    info!("main returned {result:?}");
                    result
                } else {
                    None
                };
                Ok(Compiled {
                    output: module.to_string(),
                    result,
                })
            }
            BackendKind::Stack => {
                let program = lower(program, StackBackend::new())?;
                Ok(Compiled {
                    output: program.to_string(),
                    result: None,
                })
            }
        }
    }

    /// Compiles a file at a given path, writing the output to the configured output path
    pub fn compile_file(&self, path: &Path) -> PCoreCResult<Compiled> {
        info!("compiling {path:?}");
        let source = std::fs::read_to_string(path).map_err(|e| PCoreCError::io(path, e))?;
        let compiled = self.compile_source(&source)?;
        std::fs::write(&self.output_path, &compiled.output)
            .map_err(|e| PCoreCError::io(&self.output_path, e))?;
        debug!("wrote {:?}", self.output_path);
        Ok(compiled)
    }
}

/// Builder for creating a [PCoreC] instance.
#[derive(Debug)]
pub struct PCoreCBuilder {
    pub backend: BackendKind,
    pub output_path: PathBuf,
    pub emit: Emit,
    /// Run `main` with the JIT after compiling
    pub run: bool,
}

impl PCoreCBuilder {
    /// Creates an PCoreCBuilder with default settings
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Sets the file the output is written to
    pub fn output_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_path = path.as_ref().to_path_buf();
        self
    }

    pub fn emit(mut self, emit: Emit) -> Self {
        self.emit = emit;
        self
    }

    pub fn run(mut self, run: bool) -> Self {
        self.run = run;
        self
    }

    /// Builds an [PCoreC] instance from this builder
    pub fn build(self) -> Result<PCoreC, BuildPCoreCError> {
        if self.run && self.backend != BackendKind::Ssa {
            return Err(BuildPCoreCError::RunRequiresSsa(self.backend));
        }

        let output_dir = match self.output_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let output_dir_meta = std::fs::metadata(&output_dir)
            .map_err(|e| BuildPCoreCError::OutputDirectoryDoesNotExist(output_dir.clone(), e))?;
        if !output_dir_meta.is_dir() {
            return Err(BuildPCoreCError::OutputDirectoryIsNotADirectory(output_dir));
        }
        Ok(PCoreC {
            backend: self.backend,
            output_path: self.output_path,
            emit: self.emit,
            run: self.run,
        })
    }
}

impl Default for PCoreCBuilder {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            output_path: PathBuf::from("output.ir"),
            emit: Emit::default(),
            run: false,
        }
    }
}

/// An error occurred while building an [PCoreC] instance
#[derive(Debug, Error)]
pub enum BuildPCoreCError {
    #[error("{0:?} does not exist: {1}")]
    OutputDirectoryDoesNotExist(PathBuf, io::Error),
    #[error("{0:?} is not a directory")]
    OutputDirectoryIsNotADirectory(PathBuf),
    #[error("only the ssa backend can be run, not {}", .0.as_ref())]
    RunRequiresSsa(BackendKind),
}
