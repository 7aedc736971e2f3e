//! Top level items

use crate::expr::Expr;
use crate::statement::Block;

/// The root of a parsed source file
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub name: String,
    pub declarations: Vec<Declaration>,
}

impl Program {
    pub fn new(name: impl Into<String>, declarations: Vec<Declaration>) -> Self {
        Self {
            name: name.into(),
            declarations,
        }
    }
}

/// A top level declaration
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Function(FunctionDeclaration),
    Variable(VariableDeclaration),
}

/// A single `type name` parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub ty: String,
    pub name: String,
}

impl Parameter {
    pub fn new(ty: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            name: name.into(),
        }
    }
}

/// A function declaration
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub body: Block,
    /// `None` when no explicit signature was given, in which case the return type is inferred
    pub return_type: Option<String>,
}

impl FunctionDeclaration {
    pub fn new(
        name: impl Into<String>,
        parameters: Vec<Parameter>,
        body: Block,
        return_type: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            parameters,
            body,
            return_type,
        }
    }
}

/// A variable declaration, either global or within a function body
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaration {
    pub ty: String,
    pub name: String,
    pub is_pointer: bool,
    pub is_reference: bool,
    pub initializer: Option<Expr>,
}

impl VariableDeclaration {
    pub fn new(ty: impl Into<String>, name: impl Into<String>, initializer: impl Into<Option<Expr>>) -> Self {
        Self {
            ty: ty.into(),
            name: name.into(),
            is_pointer: false,
            is_reference: false,
            initializer: initializer.into(),
        }
    }
}
