//! Return types of functions declared without a signature

use std::collections::HashMap;

use pcore_ast::{Block, Expr, ReturnStatement, Statement};

use crate::backend::{Backend, BinaryInst, UnaryInst};
use crate::error::{LoweringError, LoweringResult};
use crate::lower::{builtin, common_type, fold, Lowerer};
use crate::types::ValueType;

impl<B: Backend> Lowerer<B> {
    /// The type of the first value returned by a body, or void if it never returns a value
    pub(super) fn infer_return_type(&self, body: &Block) -> LoweringResult<ValueType> {
        let mut scope = HashMap::new();
        Ok(self
            .first_return(&body.statements, &mut scope)?
            .unwrap_or(ValueType::Void))
    }

    fn first_return(
        &self,
        statements: &[Statement],
        scope: &mut HashMap<String, ValueType>,
    ) -> LoweringResult<Option<ValueType>> {
        for statement in statements {
            let found = match statement {
                Statement::Variable(variable) => {
                    scope.insert(variable.name.clone(), self.variable_type(variable)?);
                    None
                }
                Statement::If(statement) => {
                    match self.first_return(&statement.then_branch.statements, scope)? {
                        Some(ty) => Some(ty),
                        None => match &statement.else_branch {
                            Some(else_branch) => self.first_return(&else_branch.statements, scope)?,
                            None => None,
                        },
                    }
                }
                Statement::While(while_loop) => {
                    self.first_return(&while_loop.body.statements, scope)?
                }
                Statement::Return(ReturnStatement {
                    expression: Some(expr),
                }) => Some(self.type_of(expr, scope)?),
                _ => None,
            };
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    fn type_of(&self, expr: &Expr, scope: &HashMap<String, ValueType>) -> LoweringResult<ValueType> {
        match expr {
            Expr::Literal(literal) if literal.ty == "String" => Ok(ValueType::Ptr),
            Expr::Literal(literal) => Ok(fold::literal(literal)?.ty()),
            Expr::Reference(reference) if reference.is_reference => {
                Err(LoweringError::Unsupported("reference-taking"))
            }
            Expr::Reference(reference) => scope
                .get(&reference.name)
                .copied()
                .or_else(|| self.globals.get(&reference.name).map(|symbol| symbol.ty))
                .ok_or_else(|| LoweringError::UnknownVariable(reference.name.clone())),
            Expr::Binary(binary) => {
                let left = self.type_of(&binary.left, scope)?;
                let right = self.type_of(&binary.right, scope)?;
                let operand = common_type(&binary.op, left, right)?;
                let inst = BinaryInst::for_operator(&binary.op, operand.is_float())?;
                Ok(if inst.is_comparison() {
                    ValueType::Bool
                } else {
                    operand
                })
            }
            Expr::Unary(unary) => {
                let operand = self.type_of(&unary.operand, scope)?;
                match UnaryInst::for_operator(&unary.op, operand)? {
                    UnaryInst::Not => Ok(ValueType::Bool),
                    _ => Ok(operand),
                }
            }
            Expr::Call(call) => builtin(&call.name)
                .or_else(|| self.functions.get(&call.name).cloned())
                .map(|signature| signature.ret)
                .ok_or_else(|| LoweringError::UnknownFunction(call.name.clone())),
            Expr::Allocation(_) => Err(LoweringError::Unsupported("memory allocation")),
            Expr::PointerAccess(_) => Err(LoweringError::Unsupported("pointer access")),
        }
    }
}
