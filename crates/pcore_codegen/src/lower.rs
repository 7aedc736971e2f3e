//! Lowers a [Program] into a [Backend].
//!
//! Lowering is a single depth first traversal. Every parameter and variable is spilled into a
//! storage slot, so reads and writes always go through a load or a store. A failure aborts the
//! function (or global) being lowered, which is then discarded from the backend, and lowering
//! resumes with the next declaration so that independent errors are all reported.

use std::collections::{HashMap, HashSet};

use pcore_ast::{Declaration, FunctionDeclaration, Program, VariableDeclaration};
use tracing::{debug, trace};

use crate::backend::{Backend, Conversion};
use crate::error::{LoweringError, LoweringErrors, LoweringResult};
use crate::types::{Constant, FunctionSignature, ValueType};

mod expr;
pub mod fold;
mod infer;
mod statement;

/// Lowers a program, producing the backend's module only if no error occurred
pub fn lower<B: Backend>(program: Program, backend: B) -> Result<B::Module, LoweringErrors> {
    let mut lowerer = Lowerer::new(backend);
    lowerer.lower_program(program);
    lowerer.finish()
}

/// The externally defined functions that can always be called
pub fn builtin(name: &str) -> Option<FunctionSignature> {
    match name {
        "printf" => {
            let mut signature =
                FunctionSignature::new("printf", vec![ValueType::Ptr], ValueType::Int32);
            signature.variadic = true;
            Some(signature)
        }
        "putchar" => Some(FunctionSignature::new(
            "putchar",
            vec![ValueType::Int32],
            ValueType::Int32,
        )),
        _ => None,
    }
}

/// Resolves a type name
pub fn resolve_type(name: &str) -> LoweringResult<ValueType> {
    ValueType::from_name(name).ok_or_else(|| LoweringError::UnknownType(name.to_string()))
}

/// The type both operands of a binary operator are brought to. Only the integer side of a mixed
/// integer and float operation is converted.
pub fn common_type(op: &str, left: ValueType, right: ValueType) -> LoweringResult<ValueType> {
    if let Some(ty) = [left, right].into_iter().find(|ty| !ty.is_numeric()) {
        return Err(LoweringError::InvalidOperand {
            op: op.to_string(),
            ty,
        });
    }
    if left == right {
        return Ok(left);
    }
    match (
        Conversion::between(left, right),
        Conversion::between(right, left),
    ) {
        (Some(Conversion::IntToFloat), _) => Ok(right),
        (_, Some(Conversion::IntToFloat)) => Ok(left),
        _ => Err(LoweringError::MismatchedOperands {
            op: op.to_string(),
            left,
            right,
        }),
    }
}

/// A named storage location
#[derive(Debug, Clone)]
struct Symbol<S> {
    slot: S,
    ty: ValueType,
}

/// A backend value with its type
#[derive(Debug, Clone)]
struct Typed<V> {
    value: V,
    ty: ValueType,
}

/// Holds the state of lowering a single program
struct Lowerer<B: Backend> {
    backend: B,
    globals: HashMap<String, Symbol<B::Slot>>,
    /// Symbols of the function being lowered
    locals: HashMap<String, Symbol<B::Slot>>,
    functions: HashMap<String, FunctionSignature>,
    externs: HashSet<String>,
    return_type: ValueType,
    errors: Vec<LoweringError>,
}

impl<B: Backend> Lowerer<B> {
    fn new(backend: B) -> Self {
        Self {
            backend,
            globals: Default::default(),
            locals: Default::default(),
            functions: Default::default(),
            externs: Default::default(),
            return_type: ValueType::Void,
            errors: vec![],
        }
    }

    fn lower_program(&mut self, program: Program) {
        debug!("lowering program {:?}", program.name);
        self.backend.create_module(&program.name);
        for declaration in program.declarations {
            match declaration {
                Declaration::Function(function) => {
                    let name = function.name.clone();
                    if let Err(e) = self.lower_function(function) {
                        debug!("discarding function {name:?}: {e}");
                        self.backend.discard_function();
                        self.errors.push(e);
                    }
                }
                Declaration::Variable(variable) => {
                    if let Err(e) = self.lower_global(variable) {
                        self.errors.push(e);
                    }
                }
            }
        }
    }

    fn finish(self) -> Result<B::Module, LoweringErrors> {
        if self.errors.is_empty() {
            Ok(self.backend.finish())
        } else {
            Err(LoweringErrors(self.errors))
        }
    }

    fn lower_function(&mut self, function: FunctionDeclaration) -> LoweringResult {
        if self.functions.contains_key(&function.name) || builtin(&function.name).is_some() {
            return Err(LoweringError::DuplicateFunction(function.name));
        }
        let ret = match &function.return_type {
            Some(name) => resolve_type(name)?,
            None => self.infer_return_type(&function.body)?,
        };
        let params = function
            .parameters
            .iter()
            .map(|param| match resolve_type(&param.ty)? {
                ValueType::Void => Err(LoweringError::VoidVariable(param.name.clone())),
                ty => Ok(ty),
            })
            .collect::<LoweringResult<Vec<_>>>()?;
        let signature = FunctionSignature::new(function.name.clone(), params, ret);
        trace!("lowering function {signature}");

        // registered before the body so the function can call itself
        self.functions
            .insert(function.name.clone(), signature.clone());
        self.locals.clear();
        self.return_type = ret;

        self.backend.begin_function(&signature);
        for (index, (param, ty)) in function
            .parameters
            .iter()
            .zip(signature.params.iter().copied())
            .enumerate()
        {
            let slot = self.backend.alloca(&param.name, ty);
            let value = self.backend.param(index);
            self.backend.store(value, &slot);
            self.locals.insert(param.name.clone(), Symbol { slot, ty });
        }

        self.lower_block(function.body)?;

        if !self.backend.is_terminated() {
            if ret == ValueType::Void {
                self.backend.ret(None);
            } else {
                self.backend.unreachable();
            }
        }
        self.backend.finish_function();
        Ok(())
    }

    fn lower_global(&mut self, variable: VariableDeclaration) -> LoweringResult {
        if self.globals.contains_key(&variable.name) {
            return Err(LoweringError::DuplicateGlobal(variable.name));
        }
        let ty = self.variable_type(&variable)?;
        let value = match &variable.initializer {
            Some(init) => fold::convert(fold::evaluate(init, &variable.name)?, ty)?,
            None => Constant::zero(ty).ok_or_else(|| LoweringError::VoidVariable(variable.name.clone()))?,
        };
        trace!("global {} = {value}", variable.name);
        let slot = self.backend.declare_global(&variable.name, value);
        self.globals.insert(variable.name, Symbol { slot, ty });
        Ok(())
    }

    /// Resolves the storage type of a declared variable
    fn variable_type(&self, variable: &VariableDeclaration) -> LoweringResult<ValueType> {
        if variable.is_pointer {
            return Err(LoweringError::Unsupported("pointer declaration"));
        }
        if variable.is_reference {
            return Err(LoweringError::Unsupported("reference declaration"));
        }
        match resolve_type(&variable.ty)? {
            ValueType::Void => Err(LoweringError::VoidVariable(variable.name.clone())),
            ty => Ok(ty),
        }
    }

    /// Finds a variable, locals shadowing globals
    fn lookup(&self, name: &str) -> LoweringResult<Symbol<B::Slot>> {
        self.locals
            .get(name)
            .or_else(|| self.globals.get(name))
            .cloned()
            .ok_or_else(|| LoweringError::UnknownVariable(name.to_string()))
    }

    /// Applies the implicit conversion policy
    fn coerce(&mut self, value: Typed<B::Value>, to: ValueType) -> LoweringResult<B::Value> {
        if value.ty == to {
            return Ok(value.value);
        }
        let conversion =
            Conversion::between(value.ty, to).ok_or(LoweringError::UnsupportedConversion {
                from: value.ty,
                to,
            })?;
        Ok(self.backend.convert(conversion, value.value))
    }
}
