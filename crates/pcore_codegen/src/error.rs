//! Errors produced while lowering a program

use crate::types::ValueType;
use itertools::Itertools;

/// A semantic failure found while lowering
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoweringError {
    #[error("unknown type `{0}`")]
    UnknownType(String),
    #[error("unknown variable `{0}`")]
    UnknownVariable(String),
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("function `{0}` is already defined")]
    DuplicateFunction(String),
    #[error("global `{0}` is already defined")]
    DuplicateGlobal(String),
    #[error("unknown operator `{0}`")]
    UnknownOperator(String),
    #[error("operator `{op}` can not be applied to {ty}")]
    InvalidOperand { op: String, ty: ValueType },
    #[error("operator `{op}` can not be applied to {left} and {right}")]
    MismatchedOperands {
        op: String,
        left: ValueType,
        right: ValueType,
    },
    #[error("can not convert {from} to {to}")]
    UnsupportedConversion { from: ValueType, to: ValueType },
    #[error("function `{name}` expects {expected} arguments but {found} were given")]
    ArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("argument {index} of `{name}` must be {expected}, found {found}")]
    ArgumentType {
        name: String,
        index: usize,
        expected: ValueType,
        found: ValueType,
    },
    #[error("`{name}` can not take {ty} as a variadic argument")]
    VariadicArgument { name: String, ty: ValueType },
    #[error("expression has no value")]
    VoidValue,
    #[error("variable `{0}` can not have type void")]
    VoidVariable(String),
    #[error("condition must be an integer or boolean, found {0}")]
    InvalidCondition(ValueType),
    #[error("void function can not return a value")]
    UnexpectedReturnValue,
    #[error("function must return a value of type {0}")]
    MissingReturnValue(ValueType),
    #[error("invalid {ty} literal `{value}`")]
    InvalidLiteral { value: String, ty: String },
    #[error("initializer of global `{0}` is not a constant expression")]
    NonConstantInitializer(String),
    #[error("division by zero in constant expression")]
    DivisionByZero,
    #[error("{0} is not supported")]
    Unsupported(&'static str),
}

pub type LoweringResult<T = ()> = Result<T, LoweringError>;

/// Every error collected while lowering a program
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{}", .0.iter().join("\n"))]
pub struct LoweringErrors(pub Vec<LoweringError>);

impl LoweringErrors {
    pub fn errors(&self) -> &[LoweringError] {
        &self.0
    }
}

impl From<LoweringError> for LoweringErrors {
    fn from(value: LoweringError) -> Self {
        Self(vec![value])
    }
}
