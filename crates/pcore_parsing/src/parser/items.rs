use crate::parser::{ParseResult, Parser};
use pcore_ast::{Declaration, FunctionDeclaration, Parameter, VariableDeclaration};
use pcore_tokens::TokenKind;
use tracing::trace;

impl Parser {
    /// A function declaration starts with `(`, `func`, or `<identifier> {`. Any other
    /// identifier starts a variable declaration.
    pub(crate) fn parse_declaration(&mut self) -> ParseResult<Declaration> {
        if self.check_symbol("(")
            || self.check(TokenKind::Keyword, Some("func"))
            || (self.check(TokenKind::Identifier, None) && self.check_next(TokenKind::Symbol, Some("{")))
        {
            return Ok(Declaration::Function(self.parse_function_declaration()?));
        }
        if self.check(TokenKind::Identifier, None) {
            return Ok(Declaration::Variable(self.parse_variable_declaration()?));
        }
        Err(self.error("expected a function or variable declaration"))
    }

    /// `[( <type> <name>, ... ) -> <type>] [func] <name> { ... }`
    fn parse_function_declaration(&mut self) -> ParseResult<FunctionDeclaration> {
        let mut parameters = vec![];
        let mut return_type = None;

        if self.match_symbol("(") {
            while !self.check_symbol(")") {
                let ty = self.consume_kind(TokenKind::Identifier, "a parameter type")?;
                let name = self.consume_kind(TokenKind::Identifier, "a parameter name")?;
                parameters.push(Parameter::new(ty.text(), name.text()));
                if !self.check_symbol(")") {
                    self.consume(TokenKind::Symbol, ",", "`,` or `)`")?;
                }
            }
            self.consume(TokenKind::Symbol, ")", "`)`")?;
            self.consume(TokenKind::Symbol, "->", "`->`")?;
            return_type = Some(
                self.consume_kind(TokenKind::Identifier, "a return type")?
                    .text()
                    .to_string(),
            );
        }
        self.match_token(TokenKind::Keyword, Some("func"));

        let name = self.consume_kind(TokenKind::Identifier, "a function name")?;
        trace!("parsing function {}", name.text());
        let body = self.parse_block()?;
        Ok(FunctionDeclaration::new(name.text(), parameters, body, return_type))
    }

    /// `<type> [*|&] <name> [= <expr>] ;`
    pub(crate) fn parse_variable_declaration(&mut self) -> ParseResult<VariableDeclaration> {
        let ty = self.consume_kind(TokenKind::Identifier, "a type name")?;
        let is_pointer = self.match_symbol("*");
        let is_reference = !is_pointer && self.match_symbol("&");
        let name = self.consume_kind(TokenKind::Identifier, "a variable name")?;
        let initializer = if self.match_symbol("=") {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Symbol, ";", "`;` after variable declaration")?;
        Ok(VariableDeclaration {
            ty: ty.text().to_string(),
            name: name.text().to_string(),
            is_pointer,
            is_reference,
            initializer,
        })
    }
}
