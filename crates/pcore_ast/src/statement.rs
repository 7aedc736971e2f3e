//! Statements and blocks

use crate::expr::{Expr, FunctionCall};
use crate::items::VariableDeclaration;

/// A brace delimited list of statements
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub statements: Vec<Statement>,
}

impl Block {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }
}

/// A statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Variable(VariableDeclaration),
    Assignment(Assignment),
    If(IfStatement),
    While(WhileLoop),
    Return(ReturnStatement),
    Expression(ExpressionStatement),
    PointerAssignment(PointerAssignment),
    Deallocation(MemoryDeallocation),
}

/// `name = value;`, or `*name = value;` when `dereference` is set
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: String,
    pub value: Expr,
    pub dereference: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub condition: Expr,
    pub then_branch: Block,
    pub else_branch: Option<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileLoop {
    pub condition: Expr,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    pub expression: Option<Expr>,
}

/// An expression evaluated for its side effects
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStatement {
    pub expression: Expr,
}

impl From<FunctionCall> for ExpressionStatement {
    fn from(value: FunctionCall) -> Self {
        Self {
            expression: Expr::Call(value),
        }
    }
}

/// Stores a value through a pointer
#[derive(Debug, Clone, PartialEq)]
pub struct PointerAssignment {
    pub pointer: Expr,
    pub value: Expr,
}

/// Frees the memory behind a pointer
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryDeallocation {
    pub pointer: Expr,
}
