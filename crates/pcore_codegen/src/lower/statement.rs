use pcore_ast::{
    Assignment, Block, Expr, IfStatement, ReturnStatement, Statement, VariableDeclaration,
    WhileLoop,
};
use tracing::trace;

use crate::backend::Backend;
use crate::error::{LoweringError, LoweringResult};
use crate::lower::{Lowerer, Symbol};
use crate::types::ValueType;

impl<B: Backend> Lowerer<B> {
    pub(super) fn lower_block(&mut self, block: Block) -> LoweringResult {
        for statement in block.statements {
            if self.backend.is_terminated() {
                trace!("statement follows a terminator");
                let dead = self.backend.create_block("unreachable");
                self.backend.switch_to_block(dead);
            }
            self.lower_statement(statement)?;
        }
        Ok(())
    }

    fn lower_statement(&mut self, statement: Statement) -> LoweringResult {
        match statement {
            Statement::Variable(variable) => self.lower_variable(variable),
            Statement::Assignment(assignment) => self.lower_assignment(assignment),
            Statement::If(if_statement) => self.lower_if(if_statement),
            Statement::While(while_loop) => self.lower_while(while_loop),
            Statement::Return(ret) => self.lower_return(ret),
            Statement::Expression(statement) => {
                match statement.expression {
                    Expr::Call(call) => {
                        self.lower_call(call)?;
                    }
                    other => {
                        self.lower_expr(other)?;
                    }
                }
                Ok(())
            }
            Statement::PointerAssignment(_) => Err(LoweringError::Unsupported("pointer assignment")),
            Statement::Deallocation(_) => Err(LoweringError::Unsupported("memory deallocation")),
        }
    }

    fn lower_variable(&mut self, variable: VariableDeclaration) -> LoweringResult {
        let ty = self.variable_type(&variable)?;
        let slot = self.backend.alloca(&variable.name, ty);
        self.locals.insert(
            variable.name.clone(),
            Symbol {
                slot: slot.clone(),
                ty,
            },
        );
        if let Some(init) = variable.initializer {
            let value = self.lower_value(init)?;
            let value = self.coerce(value, ty)?;
            self.backend.store(value, &slot);
        }
        Ok(())
    }

    fn lower_assignment(&mut self, assignment: Assignment) -> LoweringResult {
        if assignment.dereference {
            return Err(LoweringError::Unsupported("pointer-dereferencing assignment"));
        }
        let value = self.lower_value(assignment.value)?;
        let Symbol { slot, ty } = self.lookup(&assignment.target)?;
        let value = self.coerce(value, ty)?;
        self.backend.store(value, &slot);
        Ok(())
    }

    fn lower_if(&mut self, statement: IfStatement) -> LoweringResult {
        let cond = self.lower_condition(statement.condition)?;
        let then_block = self.backend.create_block("then");
        let else_block = self.backend.create_block("else");
        let merge = self.backend.create_block("ifcont");
        self.backend.branch_if(cond, then_block, else_block);

        self.backend.switch_to_block(then_block);
        self.lower_block(statement.then_branch)?;
        if !self.backend.is_terminated() {
            self.backend.jump(merge);
        }

        self.backend.switch_to_block(else_block);
        if let Some(else_branch) = statement.else_branch {
            self.lower_block(else_branch)?;
        }
        if !self.backend.is_terminated() {
            self.backend.jump(merge);
        }

        self.backend.switch_to_block(merge);
        Ok(())
    }

    fn lower_while(&mut self, statement: WhileLoop) -> LoweringResult {
        let header = self.backend.create_block("loop");
        let body = self.backend.create_block("loopbody");
        let exit = self.backend.create_block("loopexit");
        self.backend.jump(header);

        self.backend.switch_to_block(header);
        let cond = self.lower_condition(statement.condition)?;
        self.backend.branch_if(cond, body, exit);

        self.backend.switch_to_block(body);
        self.lower_block(statement.body)?;
        if !self.backend.is_terminated() {
            self.backend.jump(header);
        }

        self.backend.switch_to_block(exit);
        Ok(())
    }

    fn lower_return(&mut self, statement: ReturnStatement) -> LoweringResult {
        match (statement.expression, self.return_type) {
            (Some(_), ValueType::Void) => Err(LoweringError::UnexpectedReturnValue),
            (Some(expr), ty) => {
                let value = self.lower_value(expr)?;
                let value = self.coerce(value, ty)?;
                self.backend.ret(Some(value));
                Ok(())
            }
            (None, ValueType::Void) => {
                self.backend.ret(None);
                Ok(())
            }
            (None, ty) => Err(LoweringError::MissingReturnValue(ty)),
        }
    }

    /// Lowers the condition of a branch, which must be integer valued
    fn lower_condition(&mut self, condition: Expr) -> LoweringResult<B::Value> {
        let cond = self.lower_value(condition)?;
        if cond.ty.is_integer() {
            Ok(cond.value)
        } else {
            Err(LoweringError::InvalidCondition(cond.ty))
        }
    }
}
