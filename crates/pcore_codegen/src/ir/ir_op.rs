use std::fmt::{Debug, Display, Formatter};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use derive_more::From;
use itertools::Itertools;

use crate::backend::{BinaryInst, Conversion, UnaryInst};
use crate::ir::ir_builder::Block;
use crate::types::{Constant, ValueType};

/// An intermediate value
#[derive(Copy, Clone, Hash, Eq, PartialEq, From)]
pub struct IrValue(ValueType, usize);

impl IrValue {
    pub fn get_type(&self) -> ValueType {
        self.0
    }

    pub fn id(&self) -> usize {
        self.1
    }
}

impl Debug for IrValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}: {}", self.1, self.0)
    }
}

impl Display for IrValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.1)
    }
}

/// A storage location, either a stack slot of the current function or a module global
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub enum IrSlot {
    Local(usize),
    Global(usize),
}

impl Display for IrSlot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            IrSlot::Local(i) => write!(f, "ss{i}"),
            IrSlot::Global(i) => write!(f, "gv{i}"),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct IrValueFactory(IdFactory<usize>);

impl IrValueFactory {
    pub fn next(&mut self, ty: ValueType) -> IrValue {
        IrValue(ty, self.0.next())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IrOp {
    /// The function argument at an index
    Param(usize),
    Constant(Constant),
    /// The address of a module string
    StringAddress(usize),
    Binary(BinaryInst, IrValue, IrValue),
    Unary(UnaryInst, IrValue),
    Convert(Conversion, IrValue),
    Load(IrSlot),
    Store(IrSlot, IrValue),
    /// Calls a function by name
    Call(String, Vec<IrValue>),
    BranchIf {
        cond: IrValue,
        then_block: Block,
        else_block: Block,
    },
    Jump(Block),
    Return(Option<IrValue>),
    Unreachable,
}

impl IrOp {
    /// Whether this op ends a block
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            IrOp::BranchIf { .. } | IrOp::Jump(_) | IrOp::Return(_) | IrOp::Unreachable
        )
    }
}

impl Display for IrOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            IrOp::Param(i) => write!(f, "param {i}"),
            IrOp::Constant(c) => {
                let prefix = match c.ty() {
                    ValueType::Float32 | ValueType::Float64 => "fconst",
                    ValueType::Bool => "bconst",
                    _ => "iconst",
                };
                write!(f, "{prefix} {c}")
            }
            IrOp::StringAddress(i) => write!(f, "addr str{i}"),
            IrOp::Binary(inst, a, b) => write!(f, "{inst} {a}, {b}"),
            IrOp::Unary(inst, v) => write!(f, "{inst} {v}"),
            IrOp::Convert(conversion, v) => write!(f, "{conversion} {v}"),
            IrOp::Load(slot) => write!(f, "load {slot}"),
            IrOp::Store(slot, v) => write!(f, "store {v}, {slot}"),
            IrOp::Call(callee, args) => write!(f, "call @{callee}({})", args.iter().join(", ")),
            IrOp::BranchIf {
                cond,
                then_block,
                else_block,
            } => write!(f, "brif {cond}, {then_block}, {else_block}"),
            IrOp::Jump(block) => write!(f, "jmp {block}"),
            IrOp::Return(None) => write!(f, "ret"),
            IrOp::Return(Some(v)) => write!(f, "ret {v}"),
            IrOp::Unreachable => write!(f, "trap unreachable"),
        }
    }
}

/// Creates ids. Clones share the same counter.
#[derive(Debug, Clone)]
pub struct IdFactory<T>(Arc<AtomicUsize>, PhantomData<T>);

impl<T: From<usize>> IdFactory<T> {
    pub fn new() -> Self {
        Self(Default::default(), PhantomData)
    }

    pub fn next(&mut self) -> T {
        let v = self.0.fetch_add(1, Ordering::SeqCst);
        T::from(v)
    }
}

impl<T: From<usize>> Default for IdFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}
