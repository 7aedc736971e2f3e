//! The value types known to the lowering stage

use itertools::Itertools;
use std::fmt::{Display, Formatter};

/// The type of a value
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ValueType {
    /// 8-bit integer, `char` and `byte`
    Int8,
    /// 32-bit integer, `int` and `integer`
    Int32,
    Float32,
    Float64,
    /// 1-bit integer, `bit`, `bool` and `boolean`
    Bool,
    /// The address of module data. Has no name in source; string literals have this type.
    Ptr,
    /// No value
    Void,
}

impl ValueType {
    /// Resolves a type name, ignoring case
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "char" | "byte" => Some(Self::Int8),
            "int" | "integer" => Some(Self::Int32),
            "float" => Some(Self::Float32),
            "double" => Some(Self::Float64),
            "bit" | "bool" | "boolean" => Some(Self::Bool),
            "void" => Some(Self::Void),
            _ => None,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int32 | Self::Bool)
    }

    /// Whether arithmetic and comparison operators apply to this type
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Size in bytes when stored in memory
    pub fn size(&self) -> u32 {
        match self {
            Self::Int8 | Self::Bool => 1,
            Self::Int32 | Self::Float32 => 4,
            Self::Float64 | Self::Ptr => 8,
            Self::Void => 0,
        }
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Int8 => "i8",
            Self::Int32 => "i32",
            Self::Float32 => "f32",
            Self::Float64 => "f64",
            Self::Bool => "i1",
            Self::Ptr => "ptr",
            Self::Void => "void",
        };
        write!(f, "{name}")
    }
}

/// An immediate value
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Constant {
    Int8(i8),
    Int32(i32),
    Float32(f32),
    Float64(f64),
    Bool(bool),
}

impl Constant {
    pub fn ty(&self) -> ValueType {
        match self {
            Constant::Int8(_) => ValueType::Int8,
            Constant::Int32(_) => ValueType::Int32,
            Constant::Float32(_) => ValueType::Float32,
            Constant::Float64(_) => ValueType::Float64,
            Constant::Bool(_) => ValueType::Bool,
        }
    }

    /// The zero value of a type, `None` for void
    pub fn zero(ty: ValueType) -> Option<Self> {
        match ty {
            ValueType::Int8 => Some(Constant::Int8(0)),
            ValueType::Int32 => Some(Constant::Int32(0)),
            ValueType::Float32 => Some(Constant::Float32(0.0)),
            ValueType::Float64 => Some(Constant::Float64(0.0)),
            ValueType::Bool => Some(Constant::Bool(false)),
            ValueType::Ptr | ValueType::Void => None,
        }
    }

    /// The in-memory representation of this constant
    pub fn to_ne_bytes(&self) -> Vec<u8> {
        match self {
            Constant::Int8(i) => i.to_ne_bytes().to_vec(),
            Constant::Int32(i) => i.to_ne_bytes().to_vec(),
            Constant::Float32(f) => f.to_ne_bytes().to_vec(),
            Constant::Float64(f) => f.to_ne_bytes().to_vec(),
            Constant::Bool(b) => vec![*b as u8],
        }
    }
}

impl Display for Constant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Constant::Int8(i) => write!(f, "{i}"),
            Constant::Int32(i) => write!(f, "{i}"),
            Constant::Float32(v) => write!(f, "{v:?}"),
            Constant::Float64(v) => write!(f, "{v:?}"),
            Constant::Bool(b) => write!(f, "{}", *b as u8),
        }
    }
}

/// The name, parameter types and return type of a callable function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub name: String,
    pub params: Vec<ValueType>,
    pub ret: ValueType,
    /// Accepts any number of arguments after `params`
    pub variadic: bool,
}

impl FunctionSignature {
    pub fn new(name: impl Into<String>, params: Vec<ValueType>, ret: ValueType) -> Self {
        Self {
            name: name.into(),
            params,
            ret,
            variadic: false,
        }
    }

    pub fn returns_value(&self) -> bool {
        self.ret != ValueType::Void
    }
}

impl Display for FunctionSignature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}({}", self.name, self.params.iter().join(", "))?;
        if self.variadic {
            if !self.params.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "...")?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_table() {
        assert_eq!(ValueType::from_name("char"), Some(ValueType::Int8));
        assert_eq!(ValueType::from_name("byte"), Some(ValueType::Int8));
        assert_eq!(ValueType::from_name("Integer"), Some(ValueType::Int32));
        assert_eq!(ValueType::from_name("float"), Some(ValueType::Float32));
        assert_eq!(ValueType::from_name("double"), Some(ValueType::Float64));
        assert_eq!(ValueType::from_name("boolean"), Some(ValueType::Bool));
        assert_eq!(ValueType::from_name("VOID"), Some(ValueType::Void));
        assert_eq!(ValueType::from_name("string"), None);
        assert_eq!(ValueType::from_name("ptr"), None);
    }

    #[test]
    fn signature_display() {
        let mut printf = FunctionSignature::new("printf", vec![], ValueType::Int32);
        printf.variadic = true;
        assert_eq!(printf.to_string(), "@printf(...) -> i32");
        let add = FunctionSignature::new("add", vec![ValueType::Int32, ValueType::Float32], ValueType::Void);
        assert_eq!(add.to_string(), "@add(i32, f32) -> void");
    }
}
