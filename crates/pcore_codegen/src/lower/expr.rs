use pcore_ast::{BinaryOperation, Expr, FunctionCall, UnaryOperation};
use tracing::trace;

use crate::backend::{Backend, BinaryInst, UnaryInst};
use crate::error::{LoweringError, LoweringResult};
use crate::lower::{builtin, common_type, fold, Lowerer, Typed};
use crate::types::{FunctionSignature, ValueType};

/// The result of lowering an expression
pub(super) enum Operand<B: Backend> {
    Value(Typed<B::Value>),
    /// A variable that has not been read yet
    Slot(B::Slot, ValueType),
}

impl<B: Backend> Lowerer<B> {
    pub(super) fn lower_expr(&mut self, expr: Expr) -> LoweringResult<Operand<B>> {
        match expr {
            Expr::Literal(literal) if literal.ty == "String" => Ok(Operand::Value(Typed {
                value: self.backend.string(&fold::string(&literal)),
                ty: ValueType::Ptr,
            })),
            Expr::Literal(literal) => {
                let constant = fold::literal(&literal)?;
                Ok(Operand::Value(Typed {
                    value: self.backend.constant(constant),
                    ty: constant.ty(),
                }))
            }
            Expr::Reference(reference) => {
                if reference.is_reference {
                    return Err(LoweringError::Unsupported("reference-taking"));
                }
                let symbol = self.lookup(&reference.name)?;
                Ok(Operand::Slot(symbol.slot, symbol.ty))
            }
            Expr::Binary(binary) => self.lower_binary(binary).map(Operand::Value),
            Expr::Unary(unary) => self.lower_unary(unary).map(Operand::Value),
            Expr::Call(call) => self
                .lower_call(call)?
                .map(Operand::Value)
                .ok_or(LoweringError::VoidValue),
            Expr::Allocation(_) => Err(LoweringError::Unsupported("memory allocation")),
            Expr::PointerAccess(_) => Err(LoweringError::Unsupported("pointer access")),
        }
    }

    /// Lowers an expression, loading it if it is a storage location
    pub(super) fn lower_value(&mut self, expr: Expr) -> LoweringResult<Typed<B::Value>> {
        let operand = self.lower_expr(expr)?;
        Ok(self.dereference(operand))
    }

    fn dereference(&mut self, operand: Operand<B>) -> Typed<B::Value> {
        match operand {
            Operand::Value(value) => value,
            Operand::Slot(slot, ty) => Typed {
                value: self.backend.load(&slot, ty),
                ty,
            },
        }
    }

    fn lower_binary(&mut self, binary: BinaryOperation) -> LoweringResult<Typed<B::Value>> {
        let left = self.lower_value(*binary.left)?;
        let right = self.lower_value(*binary.right)?;
        let (left, right) = self.unify(&binary.op, left, right)?;
        let inst = BinaryInst::for_operator(&binary.op, left.ty.is_float())?;
        trace!("{inst} on {}", left.ty);
        let ty = if inst.is_comparison() {
            ValueType::Bool
        } else {
            left.ty
        };
        Ok(Typed {
            value: self.backend.binary(inst, left.value, right.value),
            ty,
        })
    }

    /// Brings both operands to the same type, converting the integer side of a mixed operation
    fn unify(
        &mut self,
        op: &str,
        left: Typed<B::Value>,
        right: Typed<B::Value>,
    ) -> LoweringResult<(Typed<B::Value>, Typed<B::Value>)> {
        let ty = common_type(op, left.ty, right.ty)?;
        let left = Typed {
            value: self.coerce(left, ty)?,
            ty,
        };
        let right = Typed {
            value: self.coerce(right, ty)?,
            ty,
        };
        Ok((left, right))
    }

    fn lower_unary(&mut self, unary: UnaryOperation) -> LoweringResult<Typed<B::Value>> {
        let operand = self.lower_value(*unary.operand)?;
        let inst = UnaryInst::for_operator(&unary.op, operand.ty)?;
        let ty = match inst {
            UnaryInst::Not => ValueType::Bool,
            _ => operand.ty,
        };
        Ok(Typed {
            value: self.backend.unary(inst, operand.value),
            ty,
        })
    }

    /// Lowers a call, producing a value only if the callee returns one
    pub(super) fn lower_call(
        &mut self,
        call: FunctionCall,
    ) -> LoweringResult<Option<Typed<B::Value>>> {
        let (signature, external) = self.resolve_callee(&call.name)?;
        let count_ok = if signature.variadic {
            call.arguments.len() >= signature.params.len()
        } else {
            call.arguments.len() == signature.params.len()
        };
        if !count_ok {
            return Err(LoweringError::ArgumentCount {
                name: call.name,
                expected: signature.params.len(),
                found: call.arguments.len(),
            });
        }

        let mut args = Vec::with_capacity(call.arguments.len());
        for (index, argument) in call.arguments.into_iter().enumerate() {
            let value = self.lower_value(argument)?;
            let value = if external {
                self.check_external_argument(&signature, index, &value)?;
                value.value
            } else {
                self.coerce(value, signature.params[index])?
            };
            args.push(value);
        }

        trace!("calling {signature}");
        Ok(self
            .backend
            .call(&signature, args)
            .map(|value| Typed {
                value,
                ty: signature.ret,
            }))
    }

    /// External functions receive their arguments as lowered. Integers narrower than a declared
    /// integer parameter are sign extended by the backend; anything else must match exactly.
    /// Variadic arguments can be integers or addresses.
    fn check_external_argument(
        &self,
        signature: &FunctionSignature,
        index: usize,
        argument: &Typed<B::Value>,
    ) -> LoweringResult {
        match signature.params.get(index) {
            Some(expected)
                if *expected == argument.ty
                    || (expected.is_integer() && argument.ty.is_integer()) =>
            {
                Ok(())
            }
            Some(expected) => Err(LoweringError::ArgumentType {
                name: signature.name.clone(),
                index,
                expected: *expected,
                found: argument.ty,
            }),
            None if argument.ty.is_integer() || argument.ty == ValueType::Ptr => Ok(()),
            None => Err(LoweringError::VariadicArgument {
                name: signature.name.clone(),
                ty: argument.ty,
            }),
        }
    }

    /// Finds the signature of a callee and whether it is defined outside of the module
    fn resolve_callee(&mut self, name: &str) -> LoweringResult<(FunctionSignature, bool)> {
        if let Some(signature) = builtin(name) {
            if self.externs.insert(name.to_string()) {
                self.backend.declare_extern(&signature);
            }
            return Ok((signature, true));
        }
        self.functions
            .get(name)
            .cloned()
            .map(|signature| (signature, false))
            .ok_or_else(|| LoweringError::UnknownFunction(name.to_string()))
    }
}
