//! Expressions

/// An expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Reference(Reference),
    Binary(BinaryOperation),
    Unary(UnaryOperation),
    Call(FunctionCall),
    Allocation(MemoryAllocation),
    PointerAccess(PointerAccess),
}

impl Expr {
    /// Creates a literal expression
    pub fn literal(value: impl Into<String>, ty: impl Into<String>) -> Self {
        Self::Literal(Literal {
            value: value.into(),
            ty: ty.into(),
        })
    }

    /// Creates a reference to a named variable
    pub fn reference(name: impl Into<String>) -> Self {
        Self::Reference(Reference {
            name: name.into(),
            is_reference: false,
        })
    }

    pub fn binary(left: Expr, op: impl Into<String>, right: Expr) -> Self {
        Self::Binary(BinaryOperation {
            left: Box::new(left),
            op: op.into(),
            right: Box::new(right),
        })
    }

    pub fn unary(op: impl Into<String>, operand: Expr) -> Self {
        Self::Unary(UnaryOperation {
            operand: Box::new(operand),
            op: op.into(),
        })
    }

    pub fn call(name: impl Into<String>, arguments: Vec<Expr>) -> Self {
        Self::Call(FunctionCall {
            name: name.into(),
            arguments,
        })
    }
}

/// A literal, tagged with the lexical kind it was written as (`Integer`, `Float`, `Char`, `String`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    pub value: String,
    pub ty: String,
}

/// A use of a named variable. `&name` sets `is_reference`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub is_reference: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOperation {
    pub left: Box<Expr>,
    pub op: String,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryOperation {
    pub operand: Box<Expr>,
    pub op: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: Vec<Expr>,
}

/// Allocates `size` elements of `ty`
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryAllocation {
    pub ty: String,
    pub size: Box<Expr>,
}

/// Reads the value behind a pointer
#[derive(Debug, Clone, PartialEq)]
pub struct PointerAccess {
    pub pointer: Box<Expr>,
}
