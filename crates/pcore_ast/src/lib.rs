//! The abstract syntax tree of a pcore program.
//!
//! Every node owns its children. Stages that walk the tree match exhaustively on [Declaration],
//! [Statement] and [Expr], so adding a variant is a compile error everywhere it is not yet handled.

mod display;
pub mod expr;
pub mod items;
pub mod statement;

pub use expr::*;
pub use items::*;
pub use statement::*;
