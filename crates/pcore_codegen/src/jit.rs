//! Compiles an [IrModule] into machine code with cranelift

use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Formatter};
use std::mem;

use cranelift::prelude::types::{F32, F64, I32, I8};
use cranelift::prelude::*;
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{DataDescription, DataId, FuncId, Linkage, Module, ModuleError};
use tracing::{debug, trace};

use crate::backend::{BinaryInst, Cmp, Conversion, UnaryInst};
use crate::ir::{Block as IrBlockId, IrFunction, IrModule, IrOp, IrSlot, IrValue};
use crate::types::{Constant, FunctionSignature, ValueType};

/// JIT compiler, converting an [IrModule] into callable machine code
pub struct Jit {
    /// The function builder context, which is reused across multiple [FunctionBuilder] instances
    builder_context: FunctionBuilderContext,
    /// The main [cranelift] context, which holds the state of the codegen. This is seperate from [Module]
    /// to allow for parallel compilation.
    ctx: codegen::Context,
    /// The data description, which is to data objects what `ctx` is to functions.
    data_description: DataDescription,

    /// The module, with the jit backend, which manages the JIT'd
    /// functions.
    module: JITModule,
    func_ids: HashMap<String, FuncId>,
    signatures: HashMap<String, FunctionSignature>,
    externs: HashSet<String>,
    data_ids: Vec<DataId>,
    string_ids: Vec<DataId>,
}

impl Debug for Jit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Jit")
            .field("functions", &self.func_ids.keys())
            .finish_non_exhaustive()
    }
}

impl Jit {
    /// Creates a new JIT targeting the host machine
    pub fn new() -> JitResult<Self> {
        let mut flag_builder = settings::builder();
        flag_builder.set("use_colocated_libcalls", "false")?;
        flag_builder.set("is_pic", "false")?;
        let isa_builder = cranelift_native::builder()
            .map_err(|msg| JitError::UnsupportedHost(msg.to_string()))?;
        let isa = isa_builder.finish(settings::Flags::new(flag_builder))?;
        let builder = JITBuilder::with_isa(isa, cranelift_module::default_libcall_names());
        let module = JITModule::new(builder);
        Ok(Self {
            builder_context: FunctionBuilderContext::new(),
            ctx: module.make_context(),
            data_description: DataDescription::new(),
            module,
            func_ids: Default::default(),
            signatures: Default::default(),
            externs: Default::default(),
            data_ids: vec![],
            string_ids: vec![],
        })
    }

    /// Compiles every global and function of the module into machine code
    pub fn compile(&mut self, ir: &IrModule) -> JitResult<()> {
        debug!("compiling module {:?}", ir.name());
        for (name, value) in ir.globals() {
            let id = self
                .module
                .declare_data(&format!("__global_{name}"), Linkage::Local, true, false)?;
            self.data_description
                .define(value.to_ne_bytes().into_boxed_slice());
            self.data_description
                .set_align(value.ty().size().max(1) as u64);
            self.module.define_data(id, &self.data_description)?;
            self.data_description.clear();
            self.data_ids.push(id);
        }

        for (index, text) in ir.strings().iter().enumerate() {
            let id = self
                .module
                .declare_data(&format!("__string_{index}"), Linkage::Local, false, false)?;
            let mut bytes = text.as_bytes().to_vec();
            bytes.push(0);
            self.data_description.define(bytes.into_boxed_slice());
            self.module.define_data(id, &self.data_description)?;
            self.data_description.clear();
            self.string_ids.push(id);
        }

        for signature in ir.externs() {
            let sig = self.as_signature(signature)?;
            let id = self
                .module
                .declare_function(&signature.name, Linkage::Import, &sig)?;
            trace!("declared extern {signature} with id {id}");
            self.func_ids.insert(signature.name.clone(), id);
            self.signatures
                .insert(signature.name.clone(), signature.clone());
            self.externs.insert(signature.name.clone());
        }

        for function in ir.functions() {
            let sig = self.as_signature(function.signature())?;
            let id = self
                .module
                .declare_function(function.name(), Linkage::Export, &sig)?;
            trace!("declared function {} with id {id}", function.signature());
            self.func_ids.insert(function.name().to_string(), id);
            self.signatures
                .insert(function.name().to_string(), function.signature().clone());
        }

        for function in ir.functions() {
            let id = self.translate(function)?;
            self.module.define_function(id, &mut self.ctx)?;
            self.module.clear_context(&mut self.ctx);
        }

        self.module.finalize_definitions()?;
        Ok(())
    }

    fn translate(&mut self, function: &IrFunction) -> JitResult<FuncId> {
        trace!("translating {:?} to JIT code via cranelift-codegen", function.name());
        let id = *self
            .func_ids
            .get(function.name())
            .ok_or_else(|| JitError::UndefinedFunction(function.name().to_string()))?;
        self.ctx.func.signature = self.as_signature(function.signature())?;
        let pointer_type = self.module.target_config().pointer_type();

        let builder = FunctionBuilder::new(&mut self.ctx.func, &mut self.builder_context);
        let mut trans = IrTranslator {
            builder,
            module: &mut self.module,
            func_ids: &self.func_ids,
            signatures: &self.signatures,
            externs: &self.externs,
            data_ids: &self.data_ids,
            string_ids: &self.string_ids,
            pointer_type,
            entry: None,
            variables: Default::default(),
            ir_value_to_cranelift_value: Default::default(),
            ir_block_to_cranelift_block: Default::default(),
        };
        trans.translate_func(function)?;

        trace!("{}", trans.builder.func);
        trans.builder.finalize();
        Ok(id)
    }

    fn as_signature(&self, sig: &FunctionSignature) -> JitResult<Signature> {
        let pointer_type = self.module.target_config().pointer_type();
        let mut building = self.module.make_signature();
        for param in &sig.params {
            building
                .params
                .push(AbiParam::new(get_abi_type(*param, pointer_type)?));
        }
        if sig.returns_value() {
            building
                .returns
                .push(AbiParam::new(get_abi_type(sig.ret, pointer_type)?));
        }
        Ok(building)
    }

    /// Gets a pointer to a compiled function
    pub fn get_function(&self, name: &str) -> JitResult<*const u8> {
        if self.externs.contains(name) {
            return Err(JitError::UndefinedFunction(name.to_string()));
        }
        let id = self
            .func_ids
            .get(name)
            .ok_or_else(|| JitError::UndefinedFunction(name.to_string()))?;
        Ok(self.module.get_finalized_function(*id))
    }

    /// Calls a compiled function that takes no arguments, returning its result
    pub fn run_function(&self, name: &str) -> JitResult<Option<Constant>> {
        let signature = self
            .signatures
            .get(name)
            .ok_or_else(|| JitError::UndefinedFunction(name.to_string()))?;
        if !signature.params.is_empty() {
            return Err(JitError::UnsupportedSignature(signature.to_string()));
        }
        let ptr = self.get_function(name)?;
        debug!("running {signature}");
        // SAFETY: the function was compiled from `signature` with the host calling convention
        let result = unsafe {
            match signature.ret {
                ValueType::Int8 => Some(Constant::Int8(run_code(ptr))),
                ValueType::Int32 => Some(Constant::Int32(run_code(ptr))),
                ValueType::Float32 => Some(Constant::Float32(run_code(ptr))),
                ValueType::Float64 => Some(Constant::Float64(run_code(ptr))),
                ValueType::Bool => Some(Constant::Bool(run_code::<u8>(ptr) != 0)),
                ValueType::Void => {
                    run_code::<()>(ptr);
                    None
                }
                ValueType::Ptr => return Err(JitError::UnsupportedSignature(signature.to_string())),
            }
        };
        Ok(result)
    }
}

unsafe fn run_code<O>(ptr: *const u8) -> O {
    let code_fn = mem::transmute::<*const u8, extern "C" fn() -> O>(ptr);
    code_fn()
}

fn get_abi_type(ty: ValueType, pointer_type: Type) -> JitResult<Type> {
    match ty {
        ValueType::Int8 | ValueType::Bool => Ok(I8),
        ValueType::Int32 => Ok(I32),
        ValueType::Float32 => Ok(F32),
        ValueType::Float64 => Ok(F64),
        ValueType::Ptr => Ok(pointer_type),
        ValueType::Void => Err(JitError::UnsupportedType(ty)),
    }
}

fn int_cc(cmp: Cmp) -> IntCC {
    match cmp {
        Cmp::Eq => IntCC::Equal,
        Cmp::Ne => IntCC::NotEqual,
        Cmp::Lt => IntCC::SignedLessThan,
        Cmp::Le => IntCC::SignedLessThanOrEqual,
        Cmp::Gt => IntCC::SignedGreaterThan,
        Cmp::Ge => IntCC::SignedGreaterThanOrEqual,
    }
}

fn float_cc(cmp: Cmp) -> FloatCC {
    match cmp {
        Cmp::Eq => FloatCC::Equal,
        Cmp::Ne => FloatCC::NotEqual,
        Cmp::Lt => FloatCC::LessThan,
        Cmp::Le => FloatCC::LessThanOrEqual,
        Cmp::Gt => FloatCC::GreaterThan,
        Cmp::Ge => FloatCC::GreaterThanOrEqual,
    }
}

/// Translates the blocks of one ir function into cranelift instructions
struct IrTranslator<'a> {
    builder: FunctionBuilder<'a>,
    module: &'a mut JITModule,
    func_ids: &'a HashMap<String, FuncId>,
    signatures: &'a HashMap<String, FunctionSignature>,
    externs: &'a HashSet<String>,
    data_ids: &'a [DataId],
    string_ids: &'a [DataId],
    pointer_type: Type,
    entry: Option<Block>,
    variables: HashMap<usize, Variable>,
    ir_value_to_cranelift_value: HashMap<IrValue, Value>,
    ir_block_to_cranelift_block: HashMap<IrBlockId, Block>,
}

impl<'a> IrTranslator<'a> {
    fn translate_func(&mut self, ir: &IrFunction) -> JitResult<()> {
        for (index, (name, ty)) in ir.slots().iter().enumerate() {
            let var = Variable::new(index);
            self.builder
                .declare_var(var, get_abi_type(*ty, self.pointer_type)?);
            trace!("declared {var} for {name:?}");
            self.variables.insert(index, var);
        }

        for id in ir.blocks().keys() {
            let block = self.builder.create_block();
            if *id == ir.entry() {
                self.builder.append_block_params_for_function_params(block);
                self.entry = Some(block);
            }
            self.ir_block_to_cranelift_block.insert(*id, block);
        }

        for (id, ir_block) in ir.blocks() {
            let block = self.block(*id)?;
            trace!("translating {ir_block:#?}");
            self.builder.switch_to_block(block);
            for (val, op) in ir_block.ops() {
                trace!("translating {val:?} = {op}");
                self.translate_op(val, op)?;
            }
        }

        self.builder.seal_all_blocks();
        Ok(())
    }

    fn value(&self, value: &IrValue) -> JitResult<Value> {
        self.ir_value_to_cranelift_value
            .get(value)
            .copied()
            .ok_or_else(|| JitError::UndefinedValue(value.to_string()))
    }

    fn block(&self, block: IrBlockId) -> JitResult<Block> {
        self.ir_block_to_cranelift_block
            .get(&block)
            .copied()
            .ok_or_else(|| JitError::UndefinedValue(block.to_string()))
    }

    fn variable(&self, index: usize) -> JitResult<Variable> {
        self.variables
            .get(&index)
            .copied()
            .ok_or_else(|| JitError::UndefinedValue(IrSlot::Local(index).to_string()))
    }

    fn global_address(&mut self, index: usize) -> JitResult<Value> {
        let data_id = *self
            .data_ids
            .get(index)
            .ok_or_else(|| JitError::UndefinedValue(IrSlot::Global(index).to_string()))?;
        let gv = self.module.declare_data_in_func(data_id, self.builder.func);
        Ok(self.builder.ins().global_value(self.pointer_type, gv))
    }

    fn string_address(&mut self, index: usize) -> JitResult<Value> {
        let data_id = *self
            .string_ids
            .get(index)
            .ok_or_else(|| JitError::UndefinedValue(format!("str{index}")))?;
        let gv = self.module.declare_data_in_func(data_id, self.builder.func);
        Ok(self.builder.ins().global_value(self.pointer_type, gv))
    }

    fn translate_op(&mut self, val: &IrValue, op: &IrOp) -> JitResult<()> {
        let result = match op {
            IrOp::Param(index) => {
                let entry = self
                    .entry
                    .ok_or_else(|| JitError::UndefinedValue("entry block".to_string()))?;
                let param = self.builder.block_params(entry).get(*index).copied();
                Some(param.ok_or_else(|| JitError::UndefinedValue(format!("param {index}")))?)
            }
            IrOp::Constant(c) => Some(match c {
                Constant::Int8(i) => self.builder.ins().iconst(I8, *i as i64),
                Constant::Int32(i) => self.builder.ins().iconst(I32, *i as i64),
                Constant::Float32(f) => self.builder.ins().f32const(*f),
                Constant::Float64(d) => self.builder.ins().f64const(*d),
                Constant::Bool(b) => self.builder.ins().iconst(I8, *b as i64),
            }),
            IrOp::StringAddress(index) => Some(self.string_address(*index)?),
            IrOp::Binary(inst, a, b) => {
                let a = self.value(a)?;
                let b = self.value(b)?;
                let ins = self.builder.ins();
                Some(match inst {
                    BinaryInst::IAdd => ins.iadd(a, b),
                    BinaryInst::ISub => ins.isub(a, b),
                    BinaryInst::IMul => ins.imul(a, b),
                    BinaryInst::SDiv => ins.sdiv(a, b),
                    BinaryInst::SRem => ins.srem(a, b),
                    BinaryInst::FAdd => ins.fadd(a, b),
                    BinaryInst::FSub => ins.fsub(a, b),
                    BinaryInst::FMul => ins.fmul(a, b),
                    BinaryInst::FDiv => ins.fdiv(a, b),
                    BinaryInst::And => ins.band(a, b),
                    BinaryInst::Or => ins.bor(a, b),
                    BinaryInst::Xor => ins.bxor(a, b),
                    BinaryInst::Shl => ins.ishl(a, b),
                    BinaryInst::Shr => ins.sshr(a, b),
                    BinaryInst::ICmp(cmp) => ins.icmp(int_cc(*cmp), a, b),
                    BinaryInst::FCmp(cmp) => ins.fcmp(float_cc(*cmp), a, b),
                })
            }
            IrOp::Unary(inst, v) => {
                let v = self.value(v)?;
                let ins = self.builder.ins();
                Some(match inst {
                    UnaryInst::INeg => ins.ineg(v),
                    UnaryInst::FNeg => ins.fneg(v),
                    UnaryInst::Not => ins.icmp_imm(IntCC::Equal, v, 0),
                })
            }
            IrOp::Convert(conversion, v) => {
                let v = self.value(v)?;
                Some(match conversion {
                    Conversion::IntToFloat => self.builder.ins().fcvt_from_sint(F32, v),
                    Conversion::FloatToInt => self.builder.ins().fcvt_to_sint_sat(I32, v),
                })
            }
            IrOp::Load(IrSlot::Local(index)) => {
                let var = self.variable(*index)?;
                Some(self.builder.use_var(var))
            }
            IrOp::Load(IrSlot::Global(index)) => {
                let address = self.global_address(*index)?;
                let ty = get_abi_type(val.get_type(), self.pointer_type)?;
                Some(self.builder.ins().load(ty, MemFlags::trusted(), address, 0))
            }
            IrOp::Store(IrSlot::Local(index), v) => {
                let var = self.variable(*index)?;
                let v = self.value(v)?;
                self.builder.def_var(var, v);
                None
            }
            IrOp::Store(IrSlot::Global(index), v) => {
                let v = self.value(v)?;
                let address = self.global_address(*index)?;
                self.builder.ins().store(MemFlags::trusted(), v, address, 0);
                None
            }
            IrOp::Call(callee, args) => self.translate_call(callee, args)?,
            IrOp::BranchIf {
                cond,
                then_block,
                else_block,
            } => {
                let cond = self.value(cond)?;
                let then_block = self.block(*then_block)?;
                let else_block = self.block(*else_block)?;
                self.builder
                    .ins()
                    .brif(cond, then_block, &[], else_block, &[]);
                None
            }
            IrOp::Jump(block) => {
                let block = self.block(*block)?;
                self.builder.ins().jump(block, &[]);
                None
            }
            IrOp::Return(ret) => {
                match ret {
                    Some(v) => {
                        let v = self.value(v)?;
                        self.builder.ins().return_(&[v]);
                    }
                    None => {
                        self.builder.ins().return_(&[]);
                    }
                }
                None
            }
            IrOp::Unreachable => {
                self.builder.ins().trap(TrapCode::UnreachableCodeReached);
                None
            }
        };
        if let Some(result) = result {
            self.ir_value_to_cranelift_value.insert(*val, result);
        }
        Ok(())
    }

    fn translate_call(&mut self, callee: &str, args: &[IrValue]) -> JitResult<Option<Value>> {
        let func_id = *self
            .func_ids
            .get(callee)
            .ok_or_else(|| JitError::UndefinedFunction(callee.to_string()))?;
        let signature = self
            .signatures
            .get(callee)
            .ok_or_else(|| JitError::UndefinedFunction(callee.to_string()))?;
        let values = args
            .iter()
            .map(|v| self.value(v))
            .collect::<JitResult<Vec<_>>>()?;
        let func_ref = self.module.declare_func_in_func(func_id, self.builder.func);

        let call = if self.externs.contains(callee) {
            // external functions are called with the types of the arguments actually passed
            let mut sig = self.module.make_signature();
            for arg in args {
                let ty = get_abi_type(arg.get_type(), self.pointer_type)?;
                let param = if ty == I8 {
                    AbiParam::new(ty).sext()
                } else {
                    AbiParam::new(ty)
                };
                sig.params.push(param);
            }
            if signature.returns_value() {
                sig.returns
                    .push(AbiParam::new(get_abi_type(signature.ret, self.pointer_type)?));
            }
            let sig_ref = self.builder.import_signature(sig);
            let callee = self.builder.ins().func_addr(self.pointer_type, func_ref);
            trace!("creating call_indirect with {sig_ref}, {callee}, {values:?}");
            self.builder.ins().call_indirect(sig_ref, callee, &values)
        } else {
            self.builder.ins().call(func_ref, &values)
        };

        Ok(self.builder.inst_results(call).first().copied())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JitError {
    #[error(transparent)]
    Module(#[from] ModuleError),
    #[error(transparent)]
    Codegen(#[from] codegen::CodegenError),
    #[error(transparent)]
    Setting(#[from] settings::SetError),
    #[error("host machine is not supported: {0}")]
    UnsupportedHost(String),
    #[error("Unsupported type for JIT: {0}")]
    UnsupportedType(ValueType),
    #[error("{0} was used before it was defined")]
    UndefinedValue(String),
    #[error("Function {0:?} is not defined")]
    UndefinedFunction(String),
    #[error("function {0} can not be called from the host")]
    UnsupportedSignature(String),
}

pub type JitResult<T> = std::result::Result<T, JitError>;
