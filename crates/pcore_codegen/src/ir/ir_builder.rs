use std::fmt::{Debug, Display, Formatter};

use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use tracing::{trace, warn};

use crate::backend::{BinaryInst, Conversion, UnaryInst};
use crate::ir::ir_op::{IrOp, IrSlot, IrValue, IrValueFactory};
use crate::types::{Constant, FunctionSignature, ValueType};

/// A block has exactly one entry point and ends in exactly one terminator
pub struct IrBlock {
    id: Block,
    label: String,
    ops: IndexMap<IrValue, IrOp>,
    value_factory: IrValueFactory,
    terminated: bool,
}

impl IrBlock {
    /// Creates a new block from an existing value factory
    fn new(block: Block, label: &str, value_factory: &IrValueFactory) -> Self {
        Self {
            id: block,
            label: label.to_string(),
            ops: IndexMap::new(),
            value_factory: value_factory.clone(),
            terminated: false,
        }
    }

    /// Gets the blocks followed by this block.
    pub fn followed_by(&self) -> Vec<Block> {
        match self.ops.last().map(|v| v.1) {
            Some(IrOp::BranchIf {
                then_block,
                else_block,
                ..
            }) => vec![*then_block, *else_block],
            Some(IrOp::Jump(block)) => vec![*block],
            _ => vec![],
        }
    }

    pub fn ops(&self) -> &IndexMap<IrValue, IrOp> {
        &self.ops
    }

    pub fn id(&self) -> Block {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}

impl Debug for IrBlock {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} ({}):", self.id, self.label)?;
        for (val, op) in &self.ops {
            if val.get_type() == ValueType::Void {
                writeln!(f, "    {}", op)?;
            } else {
                writeln!(f, "    {:?} = {}", val, op)?;
            }
        }
        Ok(())
    }
}

#[derive(Ord, PartialOrd, Eq, PartialEq, Hash, Copy, Clone)]
pub struct Block(usize);

impl Block {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl Debug for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "block {}", self.0)
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "block{}", self.0)
    }
}

/// An ir function containing blocks
#[derive(Debug)]
pub struct IrFunction {
    signature: FunctionSignature,
    slots: Vec<(String, ValueType)>,
    entry: Block,
    blocks: IndexMap<Block, IrBlock>,
}

impl IrFunction {
    pub fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    pub fn name(&self) -> &str {
        &self.signature.name
    }

    /// The stack slots of this function, indexed by [IrSlot::Local]
    pub fn slots(&self) -> &[(String, ValueType)] {
        &self.slots
    }

    pub fn entry(&self) -> Block {
        self.entry
    }

    pub fn blocks(&self) -> &IndexMap<Block, IrBlock> {
        &self.blocks
    }
}

impl Display for IrFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "function {} {{", self.signature)?;
        for (i, (name, ty)) in self.slots.iter().enumerate() {
            writeln!(f, "    {}: {ty} ; {name}", IrSlot::Local(i))?;
        }
        for block in self.blocks.values() {
            write!(f, "{block:?}")?;
        }
        writeln!(f, "}}")
    }
}

/// Builds the blocks of a single function
#[derive(Debug)]
pub struct IrBuilder {
    signature: FunctionSignature,
    next_block_id: usize,
    current_block: Option<Block>,
    value_factory: IrValueFactory,
    slots: Vec<(String, ValueType)>,
    blocks: IndexMap<Block, IrBlock>,
    entry: Block,
}

impl IrBuilder {
    /// Creates a new builder with its cursor at the entry block
    pub fn new(signature: FunctionSignature) -> Self {
        let mut builder = Self {
            signature,
            next_block_id: 0,
            current_block: None,
            value_factory: IrValueFactory::default(),
            slots: vec![],
            blocks: Default::default(),
            entry: Block(0),
        };
        let entry = builder.create_block("entry");
        builder.entry = entry;
        builder.switch_to_block(entry);
        builder
    }

    pub fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    pub fn entry(&self) -> Block {
        self.entry
    }

    /// Creates a new block
    pub fn create_block(&mut self, label: &str) -> Block {
        let id = self.next_block_id;
        self.next_block_id += 1;
        let block = Block(id);
        self.blocks
            .insert(block, IrBlock::new(block, label, &self.value_factory));
        block
    }

    /// Change the block currently being implemented
    pub fn switch_to_block(&mut self, block: Block) {
        trace!("switching to {block}");
        self.current_block = Some(block);
    }

    pub fn current(&self) -> Option<Block> {
        self.current_block
    }

    pub fn is_terminated(&self, block: Block) -> bool {
        self.blocks
            .get(&block)
            .map(|b| b.terminated)
            .unwrap_or(false)
    }

    /// Reserves a stack slot for the whole function
    pub fn declare_slot(&mut self, name: &str, ty: ValueType) -> IrSlot {
        self.slots.push((name.to_string(), ty));
        IrSlot::Local(self.slots.len() - 1)
    }

    /// Gets the ops builder for adding operators to the current block
    pub fn ops(&mut self) -> IrOpBuilder<'_> {
        let block = self.current_block.expect("no current block");
        let block = self
            .blocks
            .get_mut(&block)
            .expect("no block with given label");
        IrOpBuilder { block }
    }

    /// Finishes the current function, creating an ir function. Blocks that were never terminated
    /// end in a trap.
    pub fn finish(mut self) -> IrFunction {
        for block in self.blocks.values_mut() {
            if !block.terminated {
                warn!(
                    "{} in function {:?} was never terminated",
                    block.id, self.signature.name
                );
                IrOpBuilder { block }.unreachable();
            }
        }
        trace!("created function from blocks: {:#?}", self.blocks);
        IrFunction {
            signature: self.signature,
            slots: self.slots,
            entry: self.entry,
            blocks: self.blocks,
        }
    }
}

/// Responsible for adding instructions to the current block
pub struct IrOpBuilder<'a> {
    block: &'a mut IrBlock,
}

impl<'a> IrOpBuilder<'a> {
    fn value(&mut self, ty: ValueType, op: IrOp) -> IrValue {
        self.assert_not_terminated();
        let value = self.block.value_factory.next(ty);
        self.block.ops.insert(value, op);
        value
    }

    fn terminate(&mut self, op: IrOp) {
        self.value(ValueType::Void, op);
        self.block.terminated = true;
    }

    pub fn param(&mut self, index: usize, ty: ValueType) -> IrValue {
        self.value(ty, IrOp::Param(index))
    }

    pub fn constant(&mut self, c: Constant) -> IrValue {
        self.value(c.ty(), IrOp::Constant(c))
    }

    /// The address of the module string at an index
    pub fn string_address(&mut self, index: usize) -> IrValue {
        self.value(ValueType::Ptr, IrOp::StringAddress(index))
    }

    pub fn binary(&mut self, inst: BinaryInst, a: IrValue, b: IrValue) -> IrValue {
        let ty = if inst.is_comparison() {
            ValueType::Bool
        } else {
            a.get_type()
        };
        self.value(ty, IrOp::Binary(inst, a, b))
    }

    pub fn unary(&mut self, inst: UnaryInst, a: IrValue) -> IrValue {
        let ty = match inst {
            UnaryInst::Not => ValueType::Bool,
            _ => a.get_type(),
        };
        self.value(ty, IrOp::Unary(inst, a))
    }

    pub fn convert(&mut self, conversion: Conversion, a: IrValue) -> IrValue {
        self.value(conversion.target(), IrOp::Convert(conversion, a))
    }

    pub fn load(&mut self, slot: IrSlot, ty: ValueType) -> IrValue {
        self.value(ty, IrOp::Load(slot))
    }

    pub fn store(&mut self, slot: IrSlot, value: IrValue) {
        self.value(ValueType::Void, IrOp::Store(slot, value));
    }

    pub fn call(&mut self, callee: &FunctionSignature, args: &[IrValue]) -> Option<IrValue> {
        let value = self.value(callee.ret, IrOp::Call(callee.name.clone(), Vec::from(args)));
        callee.returns_value().then_some(value)
    }

    pub fn branch_if(&mut self, cond: IrValue, then_block: Block, else_block: Block) {
        self.terminate(IrOp::BranchIf {
            cond,
            then_block,
            else_block,
        });
    }

    pub fn jump(&mut self, next: Block) {
        self.terminate(IrOp::Jump(next));
    }

    pub fn ret(&mut self, value: Option<IrValue>) {
        self.terminate(IrOp::Return(value));
    }

    pub fn unreachable(&mut self) {
        self.terminate(IrOp::Unreachable);
    }

    #[inline]
    fn assert_not_terminated(&self) {
        assert!(
            !self.block.terminated,
            "Can not add to block that has been terminated"
        );
    }
}

/// A complete module of functions
#[derive(Debug, Default)]
pub struct IrModule {
    name: String,
    globals: IndexMap<String, Constant>,
    strings: IndexSet<String>,
    externs: Vec<FunctionSignature>,
    functions: Vec<IrFunction>,
}

impl IrModule {
    pub(crate) fn new(
        name: String,
        globals: IndexMap<String, Constant>,
        strings: IndexSet<String>,
        externs: Vec<FunctionSignature>,
        functions: Vec<IrFunction>,
    ) -> Self {
        Self {
            name,
            globals,
            strings,
            externs,
            functions,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Module globals and their initial values, indexed by [IrSlot::Global]
    pub fn globals(&self) -> &IndexMap<String, Constant> {
        &self.globals
    }

    /// String data, indexed by [IrOp::StringAddress]. Stored without the NUL terminator.
    pub fn strings(&self) -> &IndexSet<String> {
        &self.strings
    }

    pub fn externs(&self) -> &[FunctionSignature] {
        &self.externs
    }

    pub fn functions(&self) -> &[IrFunction] {
        &self.functions
    }

    pub fn function(&self, name: &str) -> Option<&IrFunction> {
        self.functions.iter().find(|f| f.name() == name)
    }
}

impl Display for IrModule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "module {}", self.name)?;
        for (i, (name, value)) in self.globals.iter().enumerate() {
            writeln!(
                f,
                "global {}: {} = {} ; {}",
                IrSlot::Global(i),
                value.ty(),
                value,
                name
            )?;
        }
        for (i, text) in self.strings.iter().enumerate() {
            writeln!(f, "string str{i} = {text:?}")?;
        }
        for signature in &self.externs {
            writeln!(f, "extern {signature}")?;
        }
        let functions = self.functions.iter().map(|func| func.to_string()).join("\n");
        if !functions.is_empty() {
            writeln!(f)?;
        }
        write!(f, "{functions}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Cmp;

    fn signature() -> FunctionSignature {
        FunctionSignature::new("max", vec![ValueType::Int32, ValueType::Int32], ValueType::Int32)
    }

    #[test]
    fn builder_starts_at_entry() {
        let builder = IrBuilder::new(signature());
        assert_eq!(builder.current(), Some(builder.entry()));
        assert!(!builder.is_terminated(builder.entry()));
    }

    #[test]
    fn build_function() {
        let mut builder = IrBuilder::new(signature());
        let then_block = builder.create_block("then");
        let else_block = builder.create_block("else");
        let a = builder.ops().param(0, ValueType::Int32);
        let b = builder.ops().param(1, ValueType::Int32);
        let cond = builder.ops().binary(BinaryInst::ICmp(Cmp::Gt), a, b);
        assert_eq!(cond.get_type(), ValueType::Bool);
        builder.ops().branch_if(cond, then_block, else_block);
        builder.switch_to_block(then_block);
        builder.ops().ret(Some(a));
        builder.switch_to_block(else_block);
        builder.ops().ret(Some(b));

        let function = builder.finish();
        assert_eq!(function.blocks().len(), 3);
        assert_eq!(
            function.blocks()[&function.entry()].followed_by(),
            vec![then_block, else_block]
        );
        let text = function.to_string();
        assert!(text.contains("brif v2, block1, block2"), "{text}");
        assert!(text.contains("v0: i32 = param 0"), "{text}");
    }

    #[test]
    fn unterminated_blocks_trap() {
        let mut builder = IrBuilder::new(signature());
        builder.create_block("orphan");
        let function = builder.finish();
        for block in function.blocks().values() {
            assert!(block.is_terminated());
            assert_eq!(block.ops().last().map(|(_, op)| op), Some(&IrOp::Unreachable));
        }
    }

    #[test]
    #[should_panic]
    fn can_not_add_after_terminator() {
        let mut builder = IrBuilder::new(signature());
        builder.ops().ret(None);
        builder.ops().constant(Constant::Int32(1));
    }
}
