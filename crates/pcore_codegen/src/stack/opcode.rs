use std::fmt::{Display, Formatter};
use strum::AsRefStr;

use crate::backend::{BinaryInst, Cmp, Conversion, UnaryInst};

impl Display for OpCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// A stack machine opcode
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Hash, Clone, Copy, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum OpCode {
    Load,
    Store,
    Push,
    Pop,
    /// Loads the address of module data
    Lea,

    Add,
    Sub,
    Mul,
    Div,
    Mod,
    FAdd,
    FSub,
    FMul,
    FDiv,

    And,
    Or,
    Xor,
    Shl,
    Shr,

    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    Neg,
    FNeg,
    Not,
    IToF,
    FToI,

    /// Unconditional jump
    Jmp,
    /// Jump if zero
    Jz,
    Call,
    Ret,
    /// Reserves the stack frame of a function
    Enter,
    /// Stops the machine
    Hlt,
}

impl From<BinaryInst> for OpCode {
    fn from(value: BinaryInst) -> Self {
        match value {
            BinaryInst::IAdd => OpCode::Add,
            BinaryInst::ISub => OpCode::Sub,
            BinaryInst::IMul => OpCode::Mul,
            BinaryInst::SDiv => OpCode::Div,
            BinaryInst::SRem => OpCode::Mod,
            BinaryInst::FAdd => OpCode::FAdd,
            BinaryInst::FSub => OpCode::FSub,
            BinaryInst::FMul => OpCode::FMul,
            BinaryInst::FDiv => OpCode::FDiv,
            BinaryInst::And => OpCode::And,
            BinaryInst::Or => OpCode::Or,
            BinaryInst::Xor => OpCode::Xor,
            BinaryInst::Shl => OpCode::Shl,
            BinaryInst::Shr => OpCode::Shr,
            BinaryInst::ICmp(cmp) | BinaryInst::FCmp(cmp) => match cmp {
                Cmp::Eq => OpCode::Eq,
                Cmp::Ne => OpCode::Ne,
                Cmp::Lt => OpCode::Lt,
                Cmp::Le => OpCode::Le,
                Cmp::Gt => OpCode::Gt,
                Cmp::Ge => OpCode::Ge,
            },
        }
    }
}

impl From<UnaryInst> for OpCode {
    fn from(value: UnaryInst) -> Self {
        match value {
            UnaryInst::INeg => OpCode::Neg,
            UnaryInst::FNeg => OpCode::FNeg,
            UnaryInst::Not => OpCode::Not,
        }
    }
}

impl From<Conversion> for OpCode {
    fn from(value: Conversion) -> Self {
        match value {
            Conversion::IntToFloat => OpCode::IToF,
            Conversion::FloatToInt => OpCode::FToI,
        }
    }
}

impl OpCode {
    /// Whether this opcode ends a block
    pub fn is_terminator(&self) -> bool {
        matches!(self, OpCode::Jmp | OpCode::Ret | OpCode::Hlt)
    }
}
