//! Typed SSA-style blocks, the primary lowering target

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

pub use ir_builder::{Block, IrBlock, IrBuilder, IrFunction, IrModule, IrOpBuilder};
pub use ir_op::{IdFactory, IrOp, IrSlot, IrValue, IrValueFactory};

use crate::backend::{Backend, BinaryInst, Conversion, UnaryInst};
use crate::types::{Constant, FunctionSignature, ValueType};

mod ir_builder;
mod ir_op;

/// Builds an [IrModule] one function at a time
#[derive(Debug, Default)]
pub struct IrModuleBuilder {
    name: String,
    globals: IndexMap<String, Constant>,
    strings: IndexSet<String>,
    externs: Vec<FunctionSignature>,
    functions: Vec<IrFunction>,
    function: Option<IrBuilder>,
}

impl IrModuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn function(&mut self) -> &mut IrBuilder {
        self.function.as_mut().expect("no function is being built")
    }
}

impl Backend for IrModuleBuilder {
    type Value = IrValue;
    type Block = Block;
    type Slot = IrSlot;
    type Module = IrModule;

    fn create_module(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn declare_global(&mut self, name: &str, value: Constant) -> IrSlot {
        let index = match self.globals.get_index_of(name) {
            Some(index) => {
                warn!("global {name:?} is already declared, keeping the first value");
                index
            }
            None => self.globals.insert_full(name.to_string(), value).0,
        };
        IrSlot::Global(index)
    }

    fn declare_extern(&mut self, signature: &FunctionSignature) {
        if !self.externs.contains(signature) {
            self.externs.push(signature.clone());
        }
    }

    fn begin_function(&mut self, signature: &FunctionSignature) -> Block {
        if let Some(old) = self.function.take() {
            warn!("function {:?} was never finished", old.signature().name);
        }
        let builder = IrBuilder::new(signature.clone());
        let entry = builder.entry();
        self.function = Some(builder);
        entry
    }

    fn finish_function(&mut self) {
        match self.function.take() {
            Some(builder) => self.functions.push(builder.finish()),
            None => warn!("no function to finish"),
        }
    }

    fn discard_function(&mut self) {
        if let Some(builder) = self.function.take() {
            debug!("discarding function {:?}", builder.signature().name);
        }
    }

    fn param(&mut self, index: usize) -> IrValue {
        let function = self.function();
        let ty = function.signature().params[index];
        function.ops().param(index, ty)
    }

    fn create_block(&mut self, label: &str) -> Block {
        self.function().create_block(label)
    }

    fn switch_to_block(&mut self, block: Block) {
        self.function().switch_to_block(block)
    }

    fn is_terminated(&self) -> bool {
        self.function
            .as_ref()
            .and_then(|f| f.current().map(|b| f.is_terminated(b)))
            .unwrap_or(false)
    }

    fn constant(&mut self, constant: Constant) -> IrValue {
        self.function().ops().constant(constant)
    }

    fn string(&mut self, text: &str) -> IrValue {
        let (index, _) = self.strings.insert_full(text.to_string());
        self.function().ops().string_address(index)
    }

    fn binary(&mut self, inst: BinaryInst, left: IrValue, right: IrValue) -> IrValue {
        self.function().ops().binary(inst, left, right)
    }

    fn unary(&mut self, inst: UnaryInst, operand: IrValue) -> IrValue {
        self.function().ops().unary(inst, operand)
    }

    fn convert(&mut self, conversion: Conversion, value: IrValue) -> IrValue {
        self.function().ops().convert(conversion, value)
    }

    fn alloca(&mut self, name: &str, ty: ValueType) -> IrSlot {
        self.function().declare_slot(name, ty)
    }

    fn load(&mut self, slot: &IrSlot, ty: ValueType) -> IrValue {
        self.function().ops().load(*slot, ty)
    }

    fn store(&mut self, value: IrValue, slot: &IrSlot) {
        self.function().ops().store(*slot, value)
    }

    fn call(&mut self, callee: &FunctionSignature, args: Vec<IrValue>) -> Option<IrValue> {
        self.function().ops().call(callee, &args)
    }

    fn branch_if(&mut self, cond: IrValue, then_block: Block, else_block: Block) {
        self.function().ops().branch_if(cond, then_block, else_block)
    }

    fn jump(&mut self, block: Block) {
        self.function().ops().jump(block)
    }

    fn ret(&mut self, value: Option<IrValue>) {
        self.function().ops().ret(value)
    }

    fn unreachable(&mut self) {
        self.function().ops().unreachable()
    }

    fn finish(mut self) -> IrModule {
        if let Some(builder) = self.function.take() {
            warn!("function {:?} was never finished", builder.signature().name);
        }
        IrModule::new(
            self.name,
            self.globals,
            self.strings,
            self.externs,
            self.functions,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discarded_functions_are_dropped() {
        let mut backend = IrModuleBuilder::new();
        backend.create_module("m");
        backend.begin_function(&FunctionSignature::new("bad", vec![], ValueType::Void));
        backend.discard_function();
        backend.begin_function(&FunctionSignature::new("good", vec![], ValueType::Void));
        backend.ret(None);
        backend.finish_function();
        let module = backend.finish();
        assert_eq!(module.functions().len(), 1);
        assert!(module.function("good").is_some());
        assert!(module.function("bad").is_none());
    }

    #[test]
    fn globals_and_externs() {
        let mut backend = IrModuleBuilder::new();
        backend.create_module("m");
        assert_eq!(backend.declare_global("x", Constant::Int32(3)), IrSlot::Global(0));
        assert_eq!(backend.declare_global("y", Constant::Bool(true)), IrSlot::Global(1));
        assert_eq!(backend.declare_global("x", Constant::Int32(9)), IrSlot::Global(0));
        let mut printf = FunctionSignature::new("printf", vec![ValueType::Ptr], ValueType::Int32);
        printf.variadic = true;
        backend.declare_extern(&printf);
        backend.declare_extern(&printf);
        let module = backend.finish();
        assert_eq!(module.externs().len(), 1);
        assert_eq!(
            module.to_string(),
            "module m\nglobal gv0: i32 = 3 ; x\nglobal gv1: i1 = 1 ; y\nextern @printf(ptr, ...) -> i32\n"
        );
    }

    #[test]
    fn identical_strings_share_data() {
        let mut backend = IrModuleBuilder::new();
        backend.create_module("m");
        backend.begin_function(&FunctionSignature::new("f", vec![], ValueType::Void));
        let hello = backend.string("hello\n");
        let again = backend.string("hello\n");
        let other = backend.string("bye");
        assert_eq!(hello.get_type(), ValueType::Ptr);
        backend.ret(None);
        backend.finish_function();
        let module = backend.finish();
        assert_eq!(module.strings().len(), 2);
        let text = module.to_string();
        assert!(text.contains("string str0 = \"hello\\n\"\nstring str1 = \"bye\"\n"), "{text}");
        assert!(text.contains(&format!("{hello:?} = addr str0")), "{text}");
        assert!(text.contains(&format!("{again:?} = addr str0")), "{text}");
        assert!(text.contains(&format!("{other:?} = addr str1")), "{text}");
    }
}
