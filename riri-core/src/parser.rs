//! Recursive-descent parser producing the surface AST.
//!
//! The parser keeps a single cursor into the token slice; all other state
//! lives on the call stack. It stops at the first malformed construct.

use tracing::debug;

use crate::ast::{
    ArrowBody, BinaryOp, CaseClause, CatchClause, ClassDecl, Expr, FieldDecl, FunctionDecl,
    Program, Property, Stmt,
};
use crate::error::CoreError;
use crate::lexer::{Token, TokenKind, keyword, tokenize};

/// Maximum number of nested statements and expressions before the parser
/// gives up with a syntax error instead of exhausting the stack.
/// Every accepted depth fits a 2 MiB thread stack in a debug build; one
/// level of bracketing costs a full trip down the precedence ladder.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Parse a token sequence (terminated by `Eof`) into a program.
pub fn parse(tokens: &[Token]) -> Result<Program, CoreError> {
    let Some(last) = tokens.last() else {
        return Err(CoreError::Syntax {
            message: "token stream is empty".to_string(),
            found: String::new(),
            line: 1,
            column: 1,
        });
    };
    if last.kind != TokenKind::Eof {
        return Err(CoreError::Syntax {
            message: "token stream must end with EOF".to_string(),
            found: last.text.clone(),
            line: last.line,
            column: last.column,
        });
    }

    let mut parser = Parser {
        tokens,
        position: 0,
        depth: 0,
    };
    let program = parser.parse_program()?;
    debug!(statements = program.body.len(), "parsed program");
    Ok(program)
}

/// Tokenize and parse in one step.
pub fn parse_source(source: &str) -> Result<Program, CoreError> {
    let tokens = tokenize(source)?;
    parse(&tokens)
}

struct Parser<'t> {
    tokens: &'t [Token],
    position: usize,
    depth: usize,
}

impl<'t> Parser<'t> {
    fn parse_program(&mut self) -> Result<Program, CoreError> {
        let mut body = Vec::new();
        while !self.at_eof() {
            body.push(self.parse_statement()?);
        }
        Ok(Program { body })
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    fn parse_statement(&mut self) -> Result<Stmt, CoreError> {
        self.nested(|p| match p.at().kind {
            TokenKind::Let => p.parse_variable_declaration(),
            TokenKind::Func | TokenKind::Async => p
                .parse_function_declaration()
                .map(Stmt::FunctionDeclaration),
            TokenKind::Return => p.parse_return(),
            TokenKind::If => p.parse_if(),
            TokenKind::While => p.parse_while(),
            TokenKind::For => p.parse_for(),
            TokenKind::Class => p.parse_class(),
            TokenKind::Switch => p.parse_switch(),
            TokenKind::Break => {
                p.advance();
                p.expect(TokenKind::SemiColon, "Expected ; after break")?;
                Ok(Stmt::Break)
            }
            TokenKind::Continue => {
                p.advance();
                p.expect(TokenKind::SemiColon, "Expected ; after continue")?;
                Ok(Stmt::Continue)
            }
            TokenKind::Import => p.parse_import(),
            TokenKind::Try => p.parse_try(),
            _ => {
                let expr = p.parse_expression()?;
                p.expect(TokenKind::SemiColon, "Expected ; after expression")?;
                Ok(Stmt::Expression(expr))
            }
        })
    }

    fn parse_variable_declaration(&mut self) -> Result<Stmt, CoreError> {
        self.advance(); // let
        let name = self
            .expect(TokenKind::Identifier, "Expected identifier name following let")?
            .text
            .clone();

        if self.eat(TokenKind::SemiColon) {
            return Ok(Stmt::VariableDeclaration { name, value: None });
        }

        self.expect(TokenKind::Equals, "Expected = following identifier in let declaration")?;
        let value = self.parse_expression()?;
        self.expect(TokenKind::SemiColon, "Variable declaration must end with ;")?;
        Ok(Stmt::VariableDeclaration {
            name,
            value: Some(value),
        })
    }

    fn parse_function_declaration(&mut self) -> Result<FunctionDecl, CoreError> {
        let is_async = self.eat(TokenKind::Async);
        self.expect(TokenKind::Func, "Expected func after async")?;
        let name = self
            .expect(TokenKind::Identifier, "Expected function name following func")?
            .text
            .clone();
        let params = self.parse_parameter_list()?;
        let body = self.parse_block("function body")?;
        Ok(FunctionDecl {
            name,
            params,
            body,
            is_async,
        })
    }

    fn parse_return(&mut self) -> Result<Stmt, CoreError> {
        self.advance(); // return
        if self.eat(TokenKind::SemiColon) {
            return Ok(Stmt::Return(None));
        }
        let value = self.parse_expression()?;
        self.expect(TokenKind::SemiColon, "Expected ; after return statement")?;
        Ok(Stmt::Return(Some(value)))
    }

    /// `else if` arms are collected in a loop and folded into nested `If`
    /// nodes afterwards, so chain length does not count as nesting.
    fn parse_if(&mut self) -> Result<Stmt, CoreError> {
        self.advance(); // if
        let condition = self.parse_condition("if")?;
        let then_branch = self.parse_block("if block")?;

        let mut arms = Vec::new();
        let mut else_branch = None;
        while self.eat(TokenKind::Else) {
            if self.eat(TokenKind::If) {
                let condition = self.parse_condition("if")?;
                let then_branch = self.parse_block("if block")?;
                arms.push((condition, then_branch));
            } else {
                else_branch = Some(self.parse_block("else block")?);
                break;
            }
        }

        let else_branch = arms
            .into_iter()
            .rev()
            .fold(else_branch, |else_branch, (condition, then_branch)| {
                Some(vec![Stmt::If {
                    condition,
                    then_branch,
                    else_branch,
                }])
            });

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, CoreError> {
        self.advance(); // while
        let condition = self.parse_condition("while")?;
        let body = self.parse_block("while block")?;
        Ok(Stmt::While { condition, body })
    }

    fn parse_for(&mut self) -> Result<Stmt, CoreError> {
        self.advance(); // for
        self.expect(TokenKind::OpenParen, "Expected ( after for")?;

        // The init statement consumes its own `;`.
        let init = if self.eat(TokenKind::SemiColon) {
            None
        } else {
            Some(Box::new(self.parse_statement()?))
        };

        let condition = if self.at().is(TokenKind::SemiColon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::SemiColon, "Expected ; after loop condition")?;

        let update = if self.at().is(TokenKind::CloseParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::CloseParen, "Expected ) after loop update")?;

        let body = self.parse_block("for block")?;
        Ok(Stmt::For {
            init,
            condition,
            update,
            body,
        })
    }

    fn parse_class(&mut self) -> Result<Stmt, CoreError> {
        self.advance(); // class
        let name = self
            .expect(TokenKind::Identifier, "Expected class name following class")?
            .text
            .clone();
        self.expect(TokenKind::OpenBrace, "Expected { after class name")?;

        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while !self.at_eof() && !self.at().is(TokenKind::CloseBrace) {
            self.eat(TokenKind::Let);
            self.eat(TokenKind::Func);
            let member = self
                .expect(TokenKind::Identifier, "Expected member name")?
                .text
                .clone();

            if self.at().is(TokenKind::OpenParen) {
                let params = self.parse_parameter_list()?;
                let body = self.parse_block("method body")?;
                methods.push(FunctionDecl {
                    name: member,
                    params,
                    body,
                    is_async: false,
                });
            } else {
                let value = if self.eat(TokenKind::Equals) {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                self.expect(TokenKind::SemiColon, "Expected ; after field declaration")?;
                fields.push(FieldDecl {
                    name: member,
                    value,
                });
            }
        }
        self.expect(TokenKind::CloseBrace, "Expected } after class body")?;

        Ok(Stmt::ClassDeclaration(ClassDecl {
            name,
            fields,
            methods,
        }))
    }

    fn parse_switch(&mut self) -> Result<Stmt, CoreError> {
        self.advance(); // switch
        let discriminant = self.parse_condition("switch")?;
        self.expect(TokenKind::OpenBrace, "Expected { after switch condition")?;

        let mut cases = Vec::new();
        let mut default = None;
        while !self.at_eof() && !self.at().is(TokenKind::CloseBrace) {
            if self.eat(TokenKind::Case) {
                let test = self.parse_expression()?;
                self.expect(TokenKind::Colon, "Expected : after case value")?;
                let body = self.parse_clause_body()?;
                cases.push(CaseClause { test, body });
            } else if self.eat(TokenKind::Default) {
                self.expect(TokenKind::Colon, "Expected : after default")?;
                default = Some(self.parse_clause_body()?);
            } else {
                return Err(self.error("Expected case or default inside switch"));
            }
        }
        self.expect(TokenKind::CloseBrace, "Expected } after switch body")?;

        Ok(Stmt::Switch {
            discriminant,
            cases,
            default,
        })
    }

    /// A clause runs either to the end of an explicit `{...}` or up to the
    /// next `case`, `default` or closing brace.
    fn parse_clause_body(&mut self) -> Result<Vec<Stmt>, CoreError> {
        if self.at().is(TokenKind::OpenBrace) {
            return self.parse_block("case block");
        }
        let mut body = Vec::new();
        while !self.at_eof()
            && !matches!(
                self.at().kind,
                TokenKind::Case | TokenKind::Default | TokenKind::CloseBrace
            )
        {
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    fn parse_import(&mut self) -> Result<Stmt, CoreError> {
        self.advance(); // import
        let path = self
            .expect(TokenKind::StringLiteral, "Expected module path string after import")?
            .text
            .clone();
        self.expect(TokenKind::SemiColon, "Expected ; after import")?;
        Ok(Stmt::Import { path })
    }

    fn parse_try(&mut self) -> Result<Stmt, CoreError> {
        self.advance(); // try
        let body = self.parse_block("try block")?;

        let catch = if self.eat(TokenKind::Catch) {
            let param = if self.eat(TokenKind::OpenParen) {
                let name = self
                    .expect(TokenKind::Identifier, "Expected identifier for catch error")?
                    .text
                    .clone();
                self.expect(TokenKind::CloseParen, "Expected ) after catch parameter")?;
                Some(name)
            } else {
                None
            };
            let body = self.parse_block("catch block")?;
            Some(CatchClause { param, body })
        } else {
            None
        };

        let finally_body = if self.eat(TokenKind::Finally) {
            Some(self.parse_block("finally block")?)
        } else {
            None
        };

        Ok(Stmt::Try {
            body,
            catch,
            finally_body,
        })
    }

    fn parse_condition(&mut self, construct: &str) -> Result<Expr, CoreError> {
        self.expect(TokenKind::OpenParen, &format!("Expected ( after {construct}"))?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::CloseParen, &format!("Expected ) after {construct} condition"))?;
        Ok(condition)
    }

    fn parse_block(&mut self, what: &str) -> Result<Vec<Stmt>, CoreError> {
        self.expect(TokenKind::OpenBrace, &format!("Expected {{ to open {what}"))?;
        let mut body = Vec::new();
        while !self.at_eof() && !self.at().is(TokenKind::CloseBrace) {
            body.push(self.parse_statement()?);
        }
        self.expect(TokenKind::CloseBrace, &format!("Expected }} to close {what}"))?;
        Ok(body)
    }

    fn parse_parameter_list(&mut self) -> Result<Vec<String>, CoreError> {
        self.expect(TokenKind::OpenParen, "Expected ( to open parameter list")?;
        let mut params = Vec::new();
        if !self.at().is(TokenKind::CloseParen) {
            loop {
                let name = self
                    .expect(TokenKind::Identifier, "Function parameters must be identifiers")?
                    .text
                    .clone();
                params.push(name);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::CloseParen, "Expected ) to close parameter list")?;
        Ok(params)
    }

    // -----------------------------------------------------------------
    // Expressions, lowest precedence first
    // -----------------------------------------------------------------

    fn parse_expression(&mut self) -> Result<Expr, CoreError> {
        self.nested(|p| p.parse_assignment())
    }

    fn parse_assignment(&mut self) -> Result<Expr, CoreError> {
        let target = self.parse_conditional()?;
        if !self.at().is(TokenKind::Equals) {
            return Ok(target);
        }
        if !matches!(target, Expr::Identifier(_) | Expr::Member { .. }) {
            return Err(self.error("Invalid assignment target"));
        }
        self.advance(); // =
        let value = self.nested(|p| p.parse_assignment())?;
        Ok(Expr::Assignment {
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn parse_conditional(&mut self) -> Result<Expr, CoreError> {
        let test = self.parse_or()?;
        if !self.eat(TokenKind::Question) {
            return Ok(test);
        }
        let consequent = self.nested(|p| p.parse_assignment())?;
        self.expect(TokenKind::Colon, "Expected : in conditional expression")?;
        let alternate = self.nested(|p| p.parse_conditional())?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn parse_or(&mut self) -> Result<Expr, CoreError> {
        let mut left = self.parse_and()?;
        while self.eat(TokenKind::Or) {
            let right = self.parse_and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, CoreError> {
        let mut left = self.parse_comparison()?;
        while self.eat(TokenKind::And) {
            let right = self.parse_comparison()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, CoreError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.at().kind {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                TokenKind::Less => BinaryOp::Less,
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::LessEq => BinaryOp::LessEq,
                TokenKind::GreaterEq => BinaryOp::GreaterEq,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, CoreError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.at().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, CoreError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.at().kind {
                TokenKind::Multiply => BinaryOp::Mul,
                TokenKind::Divide => BinaryOp::Div,
                TokenKind::Modulo => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, CoreError> {
        if self.eat(TokenKind::Minus) {
            let operand = self.nested(|p| p.parse_unary())?;
            return Ok(Expr::Unary {
                operand: Box::new(operand),
            });
        }
        self.parse_call_member()
    }

    fn parse_call_member(&mut self) -> Result<Expr, CoreError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(TokenKind::Dot) {
                let name = self.expect_property_name()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: Property::Named(name),
                };
            } else if self.eat(TokenKind::OpenBracket) {
                let index = self.parse_expression()?;
                self.expect(TokenKind::CloseBracket, "Expected ] after index")?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: Property::Computed(Box::new(index)),
                };
            } else if self.at().is(TokenKind::OpenParen) {
                let args = self.parse_arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, CoreError> {
        let token = self.at();
        match token.kind {
            TokenKind::Identifier => {
                let name = token.text.clone();
                self.advance();
                Ok(Expr::Identifier(name))
            }
            TokenKind::Integer => {
                let value = token
                    .text
                    .parse::<f64>()
                    .map_err(|_| self.error("Invalid numeric literal"))?;
                self.advance();
                Ok(Expr::Number(value))
            }
            TokenKind::StringLiteral => {
                let text = token.text.clone();
                self.advance();
                Ok(Expr::StringLiteral(text))
            }
            TokenKind::This => {
                self.advance();
                Ok(Expr::This)
            }
            TokenKind::New => {
                self.advance();
                let class_name = self
                    .expect(TokenKind::Identifier, "Expected class name after new")?
                    .text
                    .clone();
                let args = if self.at().is(TokenKind::OpenParen) {
                    self.parse_arguments()?
                } else {
                    Vec::new()
                };
                Ok(Expr::New { class_name, args })
            }
            TokenKind::Await => {
                self.advance();
                let inner = self.parse_expression()?;
                Ok(Expr::Await(Box::new(inner)))
            }
            TokenKind::OpenBracket => {
                self.advance();
                let elements = self.parse_list(TokenKind::CloseBracket)?;
                self.expect(TokenKind::CloseBracket, "Expected ] after array elements")?;
                Ok(Expr::Array(elements))
            }
            TokenKind::OpenParen => self.parse_paren_or_arrow(),
            _ => Err(self.error("Unexpected token found during parsing")),
        }
    }

    /// `(` starts either a parenthesized expression or an arrow function.
    /// The list is parsed eagerly and classified by whether `=>` follows.
    fn parse_paren_or_arrow(&mut self) -> Result<Expr, CoreError> {
        self.advance(); // (
        let items = self.parse_list(TokenKind::CloseParen)?;
        self.expect(TokenKind::CloseParen, "Expected ) after expression")?;

        if self.at().is(TokenKind::Arrow) {
            let mut params = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Expr::Identifier(name) => params.push(name),
                    _ => return Err(self.error("Arrow function parameters must be identifiers")),
                }
            }
            self.advance(); // =>
            let body = if self.at().is(TokenKind::OpenBrace) {
                ArrowBody::Block(self.parse_block("arrow function body")?)
            } else {
                ArrowBody::Expr(Box::new(self.parse_expression()?))
            };
            return Ok(Expr::ArrowFunction { params, body });
        }

        let mut items = items;
        match items.len() {
            1 => Ok(items.remove(0)),
            0 => Err(self.error("Empty parenthesized expression")),
            _ => Err(self.error("Tuple expressions are not supported")),
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, CoreError> {
        self.expect(TokenKind::OpenParen, "Expected ( to open argument list")?;
        let args = self.parse_list(TokenKind::CloseParen)?;
        self.expect(TokenKind::CloseParen, "Expected ) to close argument list")?;
        Ok(args)
    }

    /// Comma-separated expressions up to (not including) `close`.
    fn parse_list(&mut self, close: TokenKind) -> Result<Vec<Expr>, CoreError> {
        let mut items = Vec::new();
        if self.at().is(close) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_expression()?);
            if !self.eat(TokenKind::Comma) {
                return Ok(items);
            }
        }
    }

    fn expect_property_name(&mut self) -> Result<String, CoreError> {
        let token = self.at();
        // Keywords are fine after a dot: `res.default`, `obj.new`.
        if token.kind == TokenKind::Identifier || keyword(&token.text).is_some() {
            let name = token.text.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error("Expected property name after ."))
        }
    }

    // -----------------------------------------------------------------
    // Cursor helpers
    // -----------------------------------------------------------------

    fn at(&self) -> &'t Token {
        let index = self.position.min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn at_eof(&self) -> bool {
        self.at().is(TokenKind::Eof)
    }

    fn advance(&mut self) {
        if !self.at_eof() {
            self.position += 1;
        }
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at().is(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<&'t Token, CoreError> {
        let token = self.at();
        if token.kind == kind {
            self.advance();
            Ok(token)
        } else {
            Err(self.error(message))
        }
    }

    fn error(&self, message: &str) -> CoreError {
        let token = self.at();
        CoreError::Syntax {
            message: message.to_string(),
            found: token.text.clone(),
            line: token.line,
            column: token.column,
        }
    }

    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error("Nesting too deep"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}
