use crate::parser::{ParseResult, Parser};
use pcore_ast::{
    Assignment, Block, Expr, ExpressionStatement, IfStatement, ReturnStatement, Statement,
    WhileLoop,
};
use pcore_tokens::{Token, TokenKind};

impl Parser {
    /// `{ <statement>* }`
    pub(crate) fn parse_block(&mut self) -> ParseResult<Block> {
        self.consume(TokenKind::Symbol, "{", "`{`")?;
        let mut statements = vec![];
        while !self.check_symbol("}") {
            if self.is_at_end() {
                return Err(self.error("expected `}`"));
            }
            statements.push(self.parse_statement()?);
        }
        self.consume(TokenKind::Symbol, "}", "`}`")?;
        Ok(Block::new(statements))
    }

    pub(crate) fn parse_statement(&mut self) -> ParseResult<Statement> {
        if self.check(TokenKind::Keyword, Some("return")) {
            return self.parse_return();
        }
        if self.check(TokenKind::Keyword, Some("if")) {
            return self.parse_if();
        }
        if self.check(TokenKind::Keyword, Some("while")) {
            return self.parse_while();
        }
        if self.check(TokenKind::Identifier, None) {
            if self.check_next(TokenKind::Symbol, Some("(")) {
                let call = self.parse_call()?;
                self.consume(TokenKind::Symbol, ";", "`;` after function call")?;
                return Ok(Statement::Expression(call.into()));
            }
            if self.check_next(TokenKind::Symbol, Some("=")) {
                return self.parse_assignment(false);
            }
        }
        if self.check_symbol("*") && self.check_next(TokenKind::Identifier, None) {
            self.advance()?;
            return self.parse_assignment(true);
        }
        if self.check(TokenKind::Identifier, None) {
            if is_declaration(self.peek_until_eol()) {
                return Ok(Statement::Variable(self.parse_variable_declaration()?));
            }
            let expression = self.parse_expression()?;
            self.consume(TokenKind::Symbol, ";", "`;` after expression")?;
            return Ok(Statement::Expression(ExpressionStatement { expression }));
        }
        Err(self.error("expected a statement"))
    }

    /// `return [<expr>] ;`
    fn parse_return(&mut self) -> ParseResult<Statement> {
        self.consume(TokenKind::Keyword, "return", "`return`")?;
        let expression = if self.check_symbol(";") {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume(TokenKind::Symbol, ";", "`;` after return")?;
        Ok(Statement::Return(ReturnStatement { expression }))
    }

    /// `if <expr> { ... } [else { ... }]`
    fn parse_if(&mut self) -> ParseResult<Statement> {
        self.consume(TokenKind::Keyword, "if", "`if`")?;
        let condition = self.parse_expression()?;
        let then_branch = self.parse_block()?;
        let else_branch = if self.match_token(TokenKind::Keyword, Some("else")) {
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(Statement::If(IfStatement {
            condition,
            then_branch,
            else_branch,
        }))
    }

    /// `while <expr> { ... }`
    fn parse_while(&mut self) -> ParseResult<Statement> {
        self.consume(TokenKind::Keyword, "while", "`while`")?;
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Statement::While(WhileLoop { condition, body }))
    }

    /// `<name> = <expr> ;`, with any leading `*` already consumed
    fn parse_assignment(&mut self, dereference: bool) -> ParseResult<Statement> {
        let target = self.consume_kind(TokenKind::Identifier, "an assignment target")?;
        self.consume(TokenKind::Symbol, "=", "`=`")?;
        let value: Expr = self.parse_expression()?;
        self.consume(TokenKind::Symbol, ";", "`;` after assignment")?;
        Ok(Statement::Assignment(Assignment {
            target: target.text().to_string(),
            value,
            dereference,
        }))
    }
}

/// Declarations look like `<type> [*|&] <name>`, optionally followed by `= ...`
fn is_declaration(line: &[Token]) -> bool {
    let rest = match line {
        [ty, marker, rest @ ..]
            if ty.kind() == TokenKind::Identifier && (marker.is_symbol("*") || marker.is_symbol("&")) =>
        {
            rest
        }
        [ty, rest @ ..] if ty.kind() == TokenKind::Identifier => rest,
        _ => return false,
    };
    match rest {
        [name] => name.kind() == TokenKind::Identifier,
        [name, assign, ..] => name.kind() == TokenKind::Identifier && assign.is_symbol("="),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use crate::{tokenize, Parser};
    use pcore_ast::{Expr, Statement};
    use test_log::test;

    fn statement(source: &str) -> Statement {
        let tokens = tokenize(source).expect("could not lex");
        Parser::new(tokens)
            .parse_statement()
            .unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn if_else_holds_one_return_per_branch() {
        let Statement::If(if_stmt) = statement("if a { return 1; } else { return 2; }") else {
            panic!("expected an if statement");
        };
        assert_eq!(if_stmt.condition, Expr::reference("a"));
        assert_eq!(if_stmt.then_branch.statements.len(), 1);
        assert!(matches!(if_stmt.then_branch.statements[0], Statement::Return(_)));
        let else_branch = if_stmt.else_branch.expect("else branch");
        assert_eq!(else_branch.statements.len(), 1);
        assert!(matches!(else_branch.statements[0], Statement::Return(_)));
    }

    #[test]
    fn else_if_is_not_allowed() {
        let tokens = tokenize("if a { } else if b { }").expect("could not lex");
        let err = Parser::new(tokens).parse_statement().unwrap_err();
        assert_eq!(err.message, "expected `{`");
        assert_eq!(err.offending_token, "if");
    }

    #[test]
    fn while_loop() {
        let Statement::While(while_loop) = statement("while i < 10 { i = i + 1; }") else {
            panic!("expected a while loop");
        };
        assert_eq!(while_loop.condition.to_string(), "(i < 10)");
        assert_eq!(while_loop.body.statements.len(), 1);
    }

    #[test]
    fn call_statement_consumes_semicolon() {
        let Statement::Expression(stmt) = statement("putchar(65);") else {
            panic!("expected an expression statement");
        };
        assert_eq!(stmt.expression, Expr::call("putchar", vec![Expr::literal("65", "Integer")]));
    }

    #[test]
    fn assignments() {
        let Statement::Assignment(plain) = statement("x = 2;") else { panic!() };
        assert!(!plain.dereference);
        let Statement::Assignment(deref) = statement("*p = 2;") else { panic!() };
        assert!(deref.dereference);
        assert_eq!(deref.target, "p");
    }

    #[test]
    fn declaration_or_expression() {
        assert!(matches!(statement("int x;"), Statement::Variable(_)));
        assert!(matches!(statement("int *x = 0;"), Statement::Variable(v) if v.is_pointer));
        let Statement::Expression(expr) = statement("x + 1;") else {
            panic!("expected an expression statement");
        };
        assert_eq!(expr.expression.to_string(), "(x + 1)");
    }

    #[test]
    fn return_without_value() {
        let Statement::Return(ret) = statement("return;") else { panic!() };
        assert!(ret.expression.is_none());
    }
}
