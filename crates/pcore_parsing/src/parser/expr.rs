use crate::parser::{ParseResult, Parser};
use pcore_ast::{Expr, FunctionCall, Reference};
use pcore_tokens::{Token, TokenKind};

/// Binding power of every binary operator, from loosest to tightest
const PRECEDENCE: &[(&str, u8)] = &[
    ("=", 1),
    ("||", 2),
    ("&&", 3),
    ("|", 4),
    ("^", 5),
    ("&", 6),
    ("==", 7),
    ("!=", 7),
    ("<", 8),
    (">", 8),
    ("<=", 8),
    (">=", 8),
    ("+", 9),
    ("-", 9),
    ("*", 10),
    ("/", 10),
    ("%", 10),
];

/// Gets the precedence of the token if it's a binary operator
pub fn binary_precedence(token: &Token) -> Option<u8> {
    if token.kind() != TokenKind::Symbol {
        return None;
    }
    PRECEDENCE
        .iter()
        .find(|(op, _)| *op == token.text())
        .map(|(_, precedence)| *precedence)
}

impl Parser {
    /// Parses a full expression
    pub fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.parse_binary(1)
    }

    /// Folds operators with a precedence of at least `min_precedence` into a left associative tree
    fn parse_binary(&mut self, min_precedence: u8) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;
        while let Some(precedence) = self.peek().and_then(binary_precedence) {
            if precedence < min_precedence {
                break;
            }
            let op = self.advance()?;
            let right = self.parse_binary(precedence + 1)?;
            left = Expr::binary(left, op.text(), right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        if self.check_symbol("-") || self.check_symbol("!") {
            let op = self.advance()?;
            let operand = self.parse_unary()?;
            return Ok(Expr::unary(op.text(), operand));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let Some(token) = self.peek() else {
            return Err(self.error("expected an expression"));
        };
        if token.kind().is_literal() {
            let token = self.advance()?;
            return Ok(Expr::literal(token.text(), token.kind().as_ref()));
        }
        if token.is_symbol("&") && self.check_next(TokenKind::Identifier, None) {
            self.advance()?;
            let name = self.advance()?;
            return Ok(Expr::Reference(Reference {
                name: name.text().to_string(),
                is_reference: true,
            }));
        }
        if token.kind() == TokenKind::Identifier {
            if self.check_next(TokenKind::Symbol, Some("(")) {
                return Ok(Expr::Call(self.parse_call()?));
            }
            let name = self.advance()?;
            return Ok(Expr::reference(name.text()));
        }
        if self.match_symbol("(") {
            let expr = self.parse_expression()?;
            self.consume(TokenKind::Symbol, ")", "`)`")?;
            return Ok(expr);
        }
        Err(self.error("unexpected token in expression"))
    }

    /// `<name> ( [<expr> {, <expr>}] )`
    pub(crate) fn parse_call(&mut self) -> ParseResult<FunctionCall> {
        let name = self.consume_kind(TokenKind::Identifier, "a function name")?;
        self.consume(TokenKind::Symbol, "(", "`(`")?;
        let mut arguments = vec![];
        if !self.check_symbol(")") {
            loop {
                arguments.push(self.parse_expression()?);
                if !self.match_symbol(",") {
                    break;
                }
            }
        }
        self.consume(TokenKind::Symbol, ")", "`)` after arguments")?;
        Ok(FunctionCall {
            name: name.text().to_string(),
            arguments,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{tokenize, Parser};
    use pcore_ast::Expr;
    use test_log::test;

    fn expr(source: &str) -> Expr {
        let tokens = tokenize(source).expect("could not lex");
        let mut parser = Parser::new(tokens);
        let expr = parser.parse_expression().unwrap_or_else(|e| panic!("{e}"));
        assert!(parser.is_at_end(), "not all of {source:?} was parsed");
        expr
    }

    fn int(value: &str) -> Expr {
        Expr::literal(value, "Integer")
    }

    #[test]
    fn multiplication_binds_tighter() {
        assert_eq!(
            expr("1 + 2 * 3"),
            Expr::binary(int("1"), "+", Expr::binary(int("2"), "*", int("3")))
        );
    }

    #[test]
    fn subtraction_is_left_associative() {
        assert_eq!(
            expr("1 - 2 - 3"),
            Expr::binary(Expr::binary(int("1"), "-", int("2")), "-", int("3"))
        );
    }

    #[test]
    fn precedence_ladder() {
        assert_eq!(
            expr("a || b && c | d ^ e & f == g < h + i * j").to_string(),
            "(a || (b && (c | (d ^ (e & (f == (g < (h + (i * j)))))))))"
        );
        assert_eq!(expr("a * b + c < d").to_string(), "(((a * b) + c) < d)");
    }

    #[test]
    fn unary_and_grouping() {
        assert_eq!(expr("-(1 + 2)").to_string(), "(-(1 + 2))");
        assert_eq!(expr("!!x").to_string(), "(!(!x))");
        assert_eq!(expr("-x * 2").to_string(), "((-x) * 2)");
    }

    #[test]
    fn literal_kinds() {
        assert_eq!(expr("1.5"), Expr::literal("1.5", "Float"));
        assert_eq!(expr("'a'"), Expr::literal("a", "Char"));
        assert_eq!(expr("\"s\""), Expr::literal("s", "String"));
    }

    #[test]
    fn calls_and_references() {
        assert_eq!(
            expr("f(1, g(), &x)").to_string(),
            "f(1, g(), &x)"
        );
        assert_eq!(expr("a & b").to_string(), "(a & b)");
    }

    #[test]
    fn missing_operand() {
        let tokens = tokenize("1 + ;").expect("could not lex");
        let err = Parser::new(tokens).parse_expression().unwrap_err();
        assert_eq!(err.message, "unexpected token in expression");
        assert_eq!(err.offending_token, ";");
        assert_eq!(err.position.column, 5);
    }
}
