//! A flat stack machine backend.
//!
//! Values are named temporaries (`%t0`, `%t1`, ...) and control flow is expressed with labels and
//! jumps instead of a block graph. Variables live at offsets of the stack frame.

use std::fmt::{Display, Formatter};

use derive_more::Display;
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use tracing::{debug, trace, warn};

pub use opcode::OpCode;

use crate::backend::{Backend, BinaryInst, Conversion, UnaryInst};
use crate::types::{Constant, FunctionSignature, ValueType};

mod opcode;

/// A temporary register
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Display)]
#[display(fmt = "%t{}", _0)]
pub struct Temp(usize);

/// A jump target
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Label(usize);

/// An addressable location
#[derive(Debug, Clone, Eq, PartialEq, Hash, Display)]
pub enum StackSlot {
    /// An offset into the frame of the current function
    #[display(fmt = "[FP + {}]", _0)]
    Frame(u32),
    /// An argument of the current function
    #[display(fmt = "[AP + {}]", _0)]
    Arg(usize),
    #[display(fmt = "[{}]", _0)]
    Global(String),
}

/// The operand of an instruction
#[derive(Debug, Clone, PartialEq, Display)]
pub enum Operand {
    #[display(fmt = "{}", _0)]
    Temp(Temp),
    #[display(fmt = "{}", _0)]
    Slot(StackSlot),
    #[display(fmt = "#{}", _0)]
    Imm(Constant),
    #[display(fmt = "{}", _0)]
    Label(String),
    #[display(fmt = "{}", _0)]
    Symbol(String),
    #[display(fmt = "{}", _0)]
    Count(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackInst {
    pub opcode: OpCode,
    pub operands: Vec<Operand>,
}

impl Display for StackInst {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.operands.is_empty() {
            write!(f, "{}", self.opcode)
        } else {
            write!(f, "{} {}", self.opcode, self.operands.iter().join(", "))
        }
    }
}

/// A line of a function body
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Label(String),
    Inst(StackInst),
}

impl Display for Line {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Line::Label(label) => write!(f, "{label}:"),
            Line::Inst(inst) => write!(f, "    {inst}"),
        }
    }
}

#[derive(Debug)]
pub struct StackFunction {
    signature: FunctionSignature,
    frame_size: u32,
    lines: Vec<Line>,
}

impl StackFunction {
    pub fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    /// Bytes reserved for variables
    pub fn frame_size(&self) -> u32 {
        self.frame_size
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }
}

impl Display for StackFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "; {}", self.signature)?;
        writeln!(f, "{}:", self.signature.name)?;
        writeln!(f, "    {} {}", OpCode::Enter, self.frame_size)?;
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// The output of the [StackBackend]
#[derive(Debug, Default)]
pub struct StackProgram {
    name: String,
    globals: Vec<(String, Constant)>,
    strings: IndexSet<String>,
    externs: Vec<String>,
    functions: Vec<StackFunction>,
}

impl StackProgram {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn globals(&self) -> &[(String, Constant)] {
        &self.globals
    }

    /// String literals, addressed as `str{index}`
    pub fn strings(&self) -> &IndexSet<String> {
        &self.strings
    }

    pub fn externs(&self) -> &[String] {
        &self.externs
    }

    pub fn functions(&self) -> &[StackFunction] {
        &self.functions
    }

    pub fn function(&self, name: &str) -> Option<&StackFunction> {
        self.functions.iter().find(|f| f.signature.name == name)
    }
}

impl Display for StackProgram {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "; program {}", self.name)?;
        for (name, value) in &self.globals {
            writeln!(f, ".global {name}: {} = {value}", value.ty())?;
        }
        for (index, text) in self.strings.iter().enumerate() {
            writeln!(f, ".string str{index} = {text:?}")?;
        }
        for name in &self.externs {
            writeln!(f, ".extern {name}")?;
        }
        for function in &self.functions {
            writeln!(f)?;
            write!(f, "{function}")?;
        }
        Ok(())
    }
}

#[derive(Debug)]
struct StackBlock {
    name: String,
    code: Vec<StackInst>,
    terminated: bool,
}

#[derive(Debug)]
struct FunctionFrame {
    signature: FunctionSignature,
    frame_size: u32,
    blocks: IndexMap<Label, StackBlock>,
    current: Label,
}

/// Emits flat stack machine text
#[derive(Debug, Default)]
pub struct StackBackend {
    name: String,
    globals: Vec<(String, Constant)>,
    strings: IndexSet<String>,
    externs: Vec<String>,
    functions: Vec<StackFunction>,
    function: Option<FunctionFrame>,
    next_temp: usize,
    next_label: usize,
}

impl StackBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn temp(&mut self) -> Temp {
        let temp = Temp(self.next_temp);
        self.next_temp += 1;
        temp
    }

    fn frame(&mut self) -> &mut FunctionFrame {
        self.function.as_mut().expect("no function is being built")
    }

    fn emit(&mut self, opcode: OpCode, operands: Vec<Operand>) {
        let frame = self.frame();
        let current = frame.current;
        let block = frame
            .blocks
            .get_mut(&current)
            .expect("no block with given label");
        assert!(!block.terminated, "Can not add to block that has been terminated");
        trace!("{} <- {opcode}", block.name);
        block.code.push(StackInst { opcode, operands });
        if opcode.is_terminator() {
            block.terminated = true;
        }
    }

    /// Emits an instruction whose first operand is a fresh temporary holding its result
    fn emit_value(&mut self, opcode: OpCode, mut operands: Vec<Operand>) -> Temp {
        let temp = self.temp();
        operands.insert(0, Operand::Temp(temp));
        self.emit(opcode, operands);
        temp
    }

    fn label_name(&mut self, label: Label) -> Operand {
        Operand::Label(
            self.frame()
                .blocks
                .get(&label)
                .map(|b| b.name.clone())
                .unwrap_or_default(),
        )
    }
}

impl Backend for StackBackend {
    type Value = Temp;
    type Block = Label;
    type Slot = StackSlot;
    type Module = StackProgram;

    fn create_module(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn declare_global(&mut self, name: &str, value: Constant) -> StackSlot {
        if self.globals.iter().any(|(global, _)| global == name) {
            warn!("global {name:?} is already declared, keeping the first value");
        } else {
            self.globals.push((name.to_string(), value));
        }
        StackSlot::Global(name.to_string())
    }

    fn declare_extern(&mut self, signature: &FunctionSignature) {
        if !self.externs.contains(&signature.name) {
            self.externs.push(signature.name.clone());
        }
    }

    fn begin_function(&mut self, signature: &FunctionSignature) -> Label {
        if let Some(old) = self.function.take() {
            warn!("function {:?} was never finished", old.signature.name);
        }
        let entry = Label(self.next_label);
        self.function = Some(FunctionFrame {
            signature: signature.clone(),
            frame_size: 0,
            blocks: IndexMap::new(),
            current: entry,
        });
        let created = self.create_block("entry");
        debug_assert_eq!(created, entry);
        entry
    }

    fn finish_function(&mut self) {
        let Some(frame) = self.function.take() else {
            warn!("no function to finish");
            return;
        };
        let mut lines = vec![];
        for (_, mut block) in frame.blocks {
            if !block.terminated {
                warn!(
                    "{} in function {:?} was never terminated",
                    block.name, frame.signature.name
                );
                block.code.push(StackInst {
                    opcode: OpCode::Hlt,
                    operands: vec![],
                });
            }
            lines.push(Line::Label(block.name));
            lines.extend(block.code.into_iter().map(Line::Inst));
        }
        self.functions.push(StackFunction {
            signature: frame.signature,
            frame_size: frame.frame_size,
            lines,
        });
    }

    fn discard_function(&mut self) {
        if let Some(frame) = self.function.take() {
            debug!("discarding function {:?}", frame.signature.name);
        }
    }

    fn param(&mut self, index: usize) -> Temp {
        self.emit_value(OpCode::Load, vec![Operand::Slot(StackSlot::Arg(index))])
    }

    fn create_block(&mut self, label: &str) -> Label {
        let id = Label(self.next_label);
        self.next_label += 1;
        let name = format!("{}_{}", label.to_uppercase(), id.0);
        self.frame().blocks.insert(
            id,
            StackBlock {
                name,
                code: vec![],
                terminated: false,
            },
        );
        id
    }

    fn switch_to_block(&mut self, block: Label) {
        self.frame().current = block;
    }

    fn is_terminated(&self) -> bool {
        self.function
            .as_ref()
            .and_then(|f| f.blocks.get(&f.current))
            .map(|b| b.terminated)
            .unwrap_or(false)
    }

    fn constant(&mut self, constant: Constant) -> Temp {
        self.emit_value(OpCode::Load, vec![Operand::Imm(constant)])
    }

    fn string(&mut self, text: &str) -> Temp {
        let (index, _) = self.strings.insert_full(text.to_string());
        self.emit_value(OpCode::Lea, vec![Operand::Symbol(format!("str{index}"))])
    }

    fn binary(&mut self, inst: BinaryInst, left: Temp, right: Temp) -> Temp {
        self.emit_value(
            OpCode::from(inst),
            vec![Operand::Temp(left), Operand::Temp(right)],
        )
    }

    fn unary(&mut self, inst: UnaryInst, operand: Temp) -> Temp {
        self.emit_value(OpCode::from(inst), vec![Operand::Temp(operand)])
    }

    fn convert(&mut self, conversion: Conversion, value: Temp) -> Temp {
        self.emit_value(OpCode::from(conversion), vec![Operand::Temp(value)])
    }

    fn alloca(&mut self, name: &str, ty: ValueType) -> StackSlot {
        let frame = self.frame();
        let size = ty.size().max(1);
        let offset = frame.frame_size.next_multiple_of(size);
        frame.frame_size = offset + size;
        trace!("{name} at frame offset {offset}");
        StackSlot::Frame(offset)
    }

    fn load(&mut self, slot: &StackSlot, _ty: ValueType) -> Temp {
        self.emit_value(OpCode::Load, vec![Operand::Slot(slot.clone())])
    }

    fn store(&mut self, value: Temp, slot: &StackSlot) {
        self.emit(
            OpCode::Store,
            vec![Operand::Slot(slot.clone()), Operand::Temp(value)],
        )
    }

    fn call(&mut self, callee: &FunctionSignature, args: Vec<Temp>) -> Option<Temp> {
        let count = args.len() as u32;
        for arg in args {
            self.emit(OpCode::Push, vec![Operand::Temp(arg)]);
        }
        self.emit(
            OpCode::Call,
            vec![Operand::Symbol(callee.name.clone()), Operand::Count(count)],
        );
        callee
            .returns_value()
            .then(|| self.emit_value(OpCode::Pop, vec![]))
    }

    fn branch_if(&mut self, cond: Temp, then_block: Label, else_block: Label) {
        let else_label = self.label_name(else_block);
        let then_label = self.label_name(then_block);
        self.emit(OpCode::Jz, vec![Operand::Temp(cond), else_label]);
        self.emit(OpCode::Jmp, vec![then_label]);
    }

    fn jump(&mut self, block: Label) {
        let label = self.label_name(block);
        self.emit(OpCode::Jmp, vec![label]);
    }

    fn ret(&mut self, value: Option<Temp>) {
        let operands = value.map(Operand::Temp).into_iter().collect();
        self.emit(OpCode::Ret, operands);
    }

    fn unreachable(&mut self) {
        self.emit(OpCode::Hlt, vec![]);
    }

    fn finish(mut self) -> StackProgram {
        if let Some(frame) = self.function.take() {
            warn!("function {:?} was never finished", frame.signature.name);
        }
        StackProgram {
            name: self.name,
            globals: self.globals,
            strings: self.strings,
            externs: self.externs,
            functions: self.functions,
        }
    }
}
