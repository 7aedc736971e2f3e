//! The pcore compiler driver.
//!
//! Runs source text through the lexer, parser and lowering stage, producing the serialized
//! module of the selected backend.
//!
//! ```no_run
//! # use std::path::Path;
//! # use pcorec::{BackendKind, PCoreC};
//! let pcorec = PCoreC::builder()
//!     .backend(BackendKind::Stack)
//!     .output_path("program.stack")
//!     .build()
//!     .expect("invalid configuration");
//! pcorec.compile_file(Path::new("program.pc")).expect("could not compile");
//! ```

mod compiler;
pub use compiler::*;
