//! The capabilities a backend must expose for a program to be lowered into it

use crate::error::{LoweringError, LoweringResult};
use crate::types::{Constant, FunctionSignature, ValueType};
use std::fmt::{Debug, Display, Formatter};
use strum::AsRefStr;

/// An instruction emission backend.
///
/// The lowering stage owns the backend for the duration of a compilation and drives it through
/// an explicit insertion cursor: instructions are always appended to the block most recently
/// passed to [switch_to_block](Backend::switch_to_block).
pub trait Backend {
    /// A computed value
    type Value: Clone + Debug;
    /// A basic block, or a label in backends without a block graph
    type Block: Copy + Eq + Debug;
    /// An addressable storage location
    type Slot: Clone + Debug;
    /// The finished output of this backend
    type Module;

    /// Starts the module all later declarations are added to
    fn create_module(&mut self, name: &str);

    /// Declares module level storage initialized with a constant. A second declaration of the
    /// same name keeps the first value.
    fn declare_global(&mut self, name: &str, value: Constant) -> Self::Slot;

    /// Declares a function defined outside of the module
    fn declare_extern(&mut self, signature: &FunctionSignature);

    /// Starts a function, returning its entry block. The cursor is placed at the entry block.
    fn begin_function(&mut self, signature: &FunctionSignature) -> Self::Block;

    /// Completes the function started by [begin_function](Backend::begin_function)
    fn finish_function(&mut self);

    /// Drops the function started by [begin_function](Backend::begin_function) without adding it
    /// to the module
    fn discard_function(&mut self);

    /// The incoming argument at the given index of the current function
    fn param(&mut self, index: usize) -> Self::Value;

    fn create_block(&mut self, label: &str) -> Self::Block;

    /// Moves the insertion cursor to the end of the given block
    fn switch_to_block(&mut self, block: Self::Block);

    /// Whether the block at the cursor already ends in a branch, return or trap
    fn is_terminated(&self) -> bool;

    fn constant(&mut self, constant: Constant) -> Self::Value;

    /// Adds a NUL terminated copy of `text` to the module's data, producing its address as a
    /// [ValueType::Ptr]
    fn string(&mut self, text: &str) -> Self::Value;

    /// Both operands must have the same type
    fn binary(&mut self, inst: BinaryInst, left: Self::Value, right: Self::Value) -> Self::Value;

    fn unary(&mut self, inst: UnaryInst, operand: Self::Value) -> Self::Value;

    fn convert(&mut self, conversion: Conversion, value: Self::Value) -> Self::Value;

    /// Allocates function scoped storage. The storage lives for the whole function no matter
    /// which block the cursor is at.
    fn alloca(&mut self, name: &str, ty: ValueType) -> Self::Slot;

    fn load(&mut self, slot: &Self::Slot, ty: ValueType) -> Self::Value;

    fn store(&mut self, value: Self::Value, slot: &Self::Slot);

    /// Calls a function, producing a value if the callee returns one
    fn call(&mut self, callee: &FunctionSignature, args: Vec<Self::Value>) -> Option<Self::Value>;

    fn branch_if(&mut self, cond: Self::Value, then_block: Self::Block, else_block: Self::Block);

    fn jump(&mut self, block: Self::Block);

    fn ret(&mut self, value: Option<Self::Value>);

    /// Terminates the current block with a trap
    fn unreachable(&mut self);

    /// Completes the module
    fn finish(self) -> Self::Module;
}

/// A comparison
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Cmp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A two operand instruction
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BinaryInst {
    IAdd,
    ISub,
    IMul,
    SDiv,
    SRem,
    FAdd,
    FSub,
    FMul,
    FDiv,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    ICmp(Cmp),
    FCmp(Cmp),
}

impl BinaryInst {
    /// Selects the instruction for an operator symbol, given whether the operands are floating
    /// point
    pub fn for_operator(op: &str, float: bool) -> LoweringResult<Self> {
        use BinaryInst::*;
        let cmp = |cmp: Cmp| if float { FCmp(cmp) } else { ICmp(cmp) };
        let inst = match op {
            "+" => if float { FAdd } else { IAdd },
            "-" => if float { FSub } else { ISub },
            "*" => if float { FMul } else { IMul },
            "/" => if float { FDiv } else { SDiv },
            "%" => SRem,
            "==" => cmp(Cmp::Eq),
            "!=" => cmp(Cmp::Ne),
            "<" => cmp(Cmp::Lt),
            "<=" => cmp(Cmp::Le),
            ">" => cmp(Cmp::Gt),
            ">=" => cmp(Cmp::Ge),
            "&&" | "&" => And,
            "||" | "|" => Or,
            "^" => Xor,
            "<<" => Shl,
            ">>" => Shr,
            _ => return Err(LoweringError::UnknownOperator(op.to_string())),
        };
        if float && inst.integer_only() {
            return Err(LoweringError::InvalidOperand {
                op: op.to_string(),
                ty: ValueType::Float32,
            });
        }
        Ok(inst)
    }

    /// Comparisons produce [ValueType::Bool]
    pub fn is_comparison(&self) -> bool {
        matches!(self, BinaryInst::ICmp(_) | BinaryInst::FCmp(_))
    }

    fn integer_only(&self) -> bool {
        use BinaryInst::*;
        matches!(self, SRem | And | Or | Xor | Shl | Shr)
    }
}

impl Display for BinaryInst {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use BinaryInst::*;
        let name = match self {
            IAdd => "iadd",
            ISub => "isub",
            IMul => "imul",
            SDiv => "sdiv",
            SRem => "srem",
            FAdd => "fadd",
            FSub => "fsub",
            FMul => "fmul",
            FDiv => "fdiv",
            And => "band",
            Or => "bor",
            Xor => "bxor",
            Shl => "ishl",
            Shr => "sshr",
            ICmp(cmp) => return write!(f, "icmp {}", cmp.as_ref()),
            FCmp(cmp) => return write!(f, "fcmp {}", cmp.as_ref()),
        };
        write!(f, "{name}")
    }
}

/// A one operand instruction
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum UnaryInst {
    INeg,
    FNeg,
    /// Logical not, producing [ValueType::Bool]
    Not,
}

impl UnaryInst {
    pub fn for_operator(op: &str, operand: ValueType) -> LoweringResult<Self> {
        match op {
            "-" | "!" if !operand.is_numeric() => Err(LoweringError::InvalidOperand {
                op: op.to_string(),
                ty: operand,
            }),
            "-" if operand.is_float() => Ok(UnaryInst::FNeg),
            "-" => Ok(UnaryInst::INeg),
            "!" if operand.is_float() => Err(LoweringError::InvalidOperand {
                op: op.to_string(),
                ty: operand,
            }),
            "!" => Ok(UnaryInst::Not),
            _ => Err(LoweringError::UnknownOperator(op.to_string())),
        }
    }
}

impl Display for UnaryInst {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// The implicit numeric conversions
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, AsRefStr)]
pub enum Conversion {
    /// 32-bit integer to 32-bit float
    #[strum(serialize = "fcvt_from_sint")]
    IntToFloat,
    /// 32-bit float to 32-bit integer, saturating
    #[strum(serialize = "fcvt_to_sint_sat")]
    FloatToInt,
}

impl Conversion {
    /// Finds the conversion between two types, if one is allowed
    pub fn between(from: ValueType, to: ValueType) -> Option<Self> {
        match (from, to) {
            (ValueType::Int32, ValueType::Float32) => Some(Conversion::IntToFloat),
            (ValueType::Float32, ValueType::Int32) => Some(Conversion::FloatToInt),
            _ => None,
        }
    }

    pub fn target(&self) -> ValueType {
        match self {
            Conversion::IntToFloat => ValueType::Float32,
            Conversion::FloatToInt => ValueType::Int32,
        }
    }
}

impl Display for Conversion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}
