//! Debug printing of the tree

use crate::expr::Expr;
use crate::items::{Declaration, FunctionDeclaration, Program, VariableDeclaration};
use crate::statement::{Block, Statement};
use itertools::Itertools;
use std::fmt::{Display, Formatter, Result};

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Expr::Literal(literal) => match literal.ty.as_str() {
                "String" => write!(f, "{:?}", literal.value),
                "Char" => write!(f, "'{}'", literal.value),
                _ => write!(f, "{}", literal.value),
            },
            Expr::Reference(reference) => {
                if reference.is_reference {
                    write!(f, "&")?;
                }
                write!(f, "{}", reference.name)
            }
            Expr::Binary(binary) => write!(f, "({} {} {})", binary.left, binary.op, binary.right),
            Expr::Unary(unary) => write!(f, "({}{})", unary.op, unary.operand),
            Expr::Call(call) => write!(f, "{}({})", call.name, call.arguments.iter().join(", ")),
            Expr::Allocation(alloc) => write!(f, "alloc<{}>({})", alloc.ty, alloc.size),
            Expr::PointerAccess(access) => write!(f, "*{}", access.pointer),
        }
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "Program {}", self.name)?;
        for declaration in &self.declarations {
            match declaration {
                Declaration::Function(function) => write_function(f, function, 1)?,
                Declaration::Variable(variable) => {
                    indent(f, 1)?;
                    write_variable(f, variable)?
                }
            }
        }
        Ok(())
    }
}

fn indent(f: &mut Formatter<'_>, depth: usize) -> Result {
    write!(f, "{}", "  ".repeat(depth))
}

fn write_function(f: &mut Formatter<'_>, function: &FunctionDeclaration, depth: usize) -> Result {
    indent(f, depth)?;
    writeln!(
        f,
        "FunctionDeclaration {}({}){}",
        function.name,
        function
            .parameters
            .iter()
            .map(|p| format!("{} {}", p.ty, p.name))
            .join(", "),
        function
            .return_type
            .as_ref()
            .map(|ty| format!(" -> {ty}"))
            .unwrap_or_default()
    )?;
    write_block(f, &function.body, depth + 1)
}

fn write_variable(f: &mut Formatter<'_>, variable: &VariableDeclaration) -> Result {
    let marker = if variable.is_pointer {
        "*"
    } else if variable.is_reference {
        "&"
    } else {
        ""
    };
    write!(f, "VariableDeclaration {} {marker}{}", variable.ty, variable.name)?;
    if let Some(init) = &variable.initializer {
        write!(f, " = {init}")?;
    }
    writeln!(f)
}

fn write_block(f: &mut Formatter<'_>, block: &Block, depth: usize) -> Result {
    for statement in &block.statements {
        write_statement(f, statement, depth)?;
    }
    Ok(())
}

fn write_statement(f: &mut Formatter<'_>, statement: &Statement, depth: usize) -> Result {
    indent(f, depth)?;
    match statement {
        Statement::Variable(variable) => write_variable(f, variable),
        Statement::Assignment(assign) => {
            let deref = if assign.dereference { "*" } else { "" };
            writeln!(f, "Assignment {deref}{} = {}", assign.target, assign.value)
        }
        Statement::If(if_stmt) => {
            writeln!(f, "IfStatement {}", if_stmt.condition)?;
            write_block(f, &if_stmt.then_branch, depth + 1)?;
            if let Some(else_branch) = &if_stmt.else_branch {
                indent(f, depth)?;
                writeln!(f, "Else")?;
                write_block(f, else_branch, depth + 1)?;
            }
            Ok(())
        }
        Statement::While(while_loop) => {
            writeln!(f, "WhileLoop {}", while_loop.condition)?;
            write_block(f, &while_loop.body, depth + 1)
        }
        Statement::Return(ret) => match &ret.expression {
            None => writeln!(f, "ReturnStatement"),
            Some(expr) => writeln!(f, "ReturnStatement {expr}"),
        },
        Statement::Expression(expr) => writeln!(f, "ExpressionStatement {}", expr.expression),
        Statement::PointerAssignment(assign) => {
            writeln!(f, "PointerAssignment *{} = {}", assign.pointer, assign.value)
        }
        Statement::Deallocation(dealloc) => writeln!(f, "MemoryDeallocation {}", dealloc.pointer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::ReturnStatement;

    #[test]
    fn expr_display_is_fully_parenthesized() {
        let expr = Expr::binary(
            Expr::literal("1", "Integer"),
            "+",
            Expr::binary(Expr::literal("2", "Integer"), "*", Expr::reference("x")),
        );
        assert_eq!(expr.to_string(), "(1 + (2 * x))");
        assert_eq!(Expr::unary("-", Expr::literal("c", "Char")).to_string(), "(-'c')");
    }

    #[test]
    fn program_prints_as_tree() {
        let program = Program::new(
            "P",
            vec![
                Declaration::Variable(VariableDeclaration::new("int", "x", Expr::literal("3", "Integer"))),
                Declaration::Function(FunctionDeclaration::new(
                    "main",
                    vec![],
                    Block::new(vec![Statement::Return(ReturnStatement {
                        expression: Some(Expr::reference("x")),
                    })]),
                    Some("int".to_string()),
                )),
            ],
        );
        let expected = "Program P\n  VariableDeclaration int x = 3\n  FunctionDeclaration main() -> int\n    ReturnStatement x\n";
        assert_eq!(program.to_string(), expected);
    }
}
