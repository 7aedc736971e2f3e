//! Lowers a [Program](pcore_ast::Program) into instructions for a [Backend].
//!
//! Two backends are provided: [IrModuleBuilder](ir::IrModuleBuilder), producing typed SSA-style
//! blocks that can be compiled to machine code by the `jit` module, and
//! [StackBackend](stack::StackBackend), producing flat stack machine text.

pub mod backend;
pub mod error;
pub mod ir;
#[cfg(feature = "jit")]
pub mod jit;
pub mod lower;
pub mod stack;
pub mod types;

pub use backend::{BinaryInst, Backend, Cmp, Conversion, UnaryInst};
pub use error::{LoweringError, LoweringErrors, LoweringResult};
pub use lower::lower;
pub use types::{Constant, FunctionSignature, ValueType};
