use crate::syntax::ast::{Expression, Statement};
use crate::syntax::lexer::Lexer;
use crate::syntax::token::{Token, TokenType};

/// Binding powers for the Pratt parser, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
    Index,
}

fn precedence_of(token_type: TokenType) -> Precedence {
    match token_type {
        TokenType::Eq | TokenType::NotEq => Precedence::Equals,
        TokenType::Lt | TokenType::Gt | TokenType::LtEq | TokenType::GtEq => {
            Precedence::LessGreater
        }
        TokenType::Plus | TokenType::Minus => Precedence::Sum,
        TokenType::Star | TokenType::Slash | TokenType::Percent => Precedence::Product,
        TokenType::LParen => Precedence::Call,
        TokenType::LBracket | TokenType::Dot => Precedence::Index,
        _ => Precedence::Lowest,
    }
}

/// Recursive-descent parser over the guest language.
///
/// Errors are plain strings; they end up verbatim inside the error frame
/// the host receives, so they read like runtime messages, not diagnostics.
pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    peek_token: Token,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        let mut lexer = Lexer::new(source);
        let current_token = lexer.next_token();
        let peek_token = lexer.next_token();
        Self {
            lexer,
            current_token,
            peek_token,
        }
    }

    /// Parse a whole `x` payload: statements separated by newlines or `;`.
    pub fn parse_program(source: &str) -> Result<Vec<Statement>, String> {
        let mut parser = Self::new(source);
        let mut statements = Vec::new();
        parser.skip_separators();
        while parser.current_token.token_type != TokenType::Eof {
            statements.push(parser.parse_statement()?);
            if !matches!(
                parser.current_token.token_type,
                TokenType::Newline | TokenType::Semicolon | TokenType::Eof
            ) {
                return Err(parser.unexpected("statement separator"));
            }
            parser.skip_separators();
        }
        Ok(statements)
    }

    /// Parse an `e` or `r` payload: exactly one expression.
    pub fn parse_single_expression(source: &str) -> Result<Expression, String> {
        let mut parser = Self::new(source);
        parser.skip_separators();
        let expression = parser.parse_expression(Precedence::Lowest)?;
        parser.skip_separators();
        if parser.current_token.token_type != TokenType::Eof {
            return Err(parser.unexpected("end of expression"));
        }
        Ok(expression)
    }

    fn next_token(&mut self) {
        self.current_token = std::mem::replace(&mut self.peek_token, self.lexer.next_token());
    }

    fn skip_separators(&mut self) {
        while matches!(
            self.current_token.token_type,
            TokenType::Newline | TokenType::Semicolon
        ) {
            self.next_token();
        }
    }

    fn expect(&mut self, token_type: TokenType) -> Result<(), String> {
        if self.current_token.token_type == token_type {
            self.next_token();
            Ok(())
        } else {
            Err(self.unexpected(&token_type.to_string()))
        }
    }

    fn unexpected(&self, wanted: &str) -> String {
        format!(
            "line {}: expected {}, found `{}`",
            self.current_token.line, wanted, self.current_token.literal
        )
    }

    fn parse_statement(&mut self) -> Result<Statement, String> {
        match self.current_token.token_type {
            TokenType::Del => {
                self.next_token();
                if self.current_token.token_type != TokenType::Ident {
                    return Err(self.unexpected("name after del"));
                }
                let name = self.current_token.literal.clone();
                self.next_token();
                Ok(Statement::Delete { name })
            }
            TokenType::Ident if self.peek_token.token_type == TokenType::Assign => {
                let name = self.current_token.literal.clone();
                self.next_token(); // name
                self.next_token(); // =
                let value = self.parse_expression(Precedence::Lowest)?;
                Ok(Statement::Assign { name, value })
            }
            _ => {
                let expression = self.parse_expression(Precedence::Lowest)?;
                Ok(Statement::Expression(expression))
            }
        }
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Result<Expression, String> {
        let mut left = self.parse_prefix()?;
        while precedence < precedence_of(self.current_token.token_type) {
            left = self.parse_infix(left)?;
        }
        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expression, String> {
        let token = self.current_token.clone();
        match token.token_type {
            TokenType::Int => {
                self.next_token();
                let value = token
                    .literal
                    .parse::<i64>()
                    .map_err(|_| format!("line {}: invalid integer `{}`", token.line, token.literal))?;
                Ok(Expression::Int(value))
            }
            TokenType::Float => {
                self.next_token();
                let value = token
                    .literal
                    .parse::<f64>()
                    .map_err(|_| format!("line {}: invalid float `{}`", token.line, token.literal))?;
                Ok(Expression::Float(value))
            }
            TokenType::Str => {
                self.next_token();
                Ok(Expression::Str(token.literal))
            }
            TokenType::True => {
                self.next_token();
                Ok(Expression::Bool(true))
            }
            TokenType::False => {
                self.next_token();
                Ok(Expression::Bool(false))
            }
            TokenType::NoneKw => {
                self.next_token();
                Ok(Expression::NoneLit)
            }
            TokenType::Ident => {
                self.next_token();
                Ok(Expression::Ident(token.literal))
            }
            TokenType::Minus => {
                self.next_token();
                let right = self.parse_expression(Precedence::Prefix)?;
                Ok(Expression::Prefix {
                    operator: token.literal,
                    right: Box::new(right),
                })
            }
            // `not` binds looser than comparisons: `not a == b`
            // negates the whole comparison.
            TokenType::Not => {
                self.next_token();
                let right = self.parse_expression(Precedence::Lowest)?;
                Ok(Expression::Prefix {
                    operator: token.literal,
                    right: Box::new(right),
                })
            }
            TokenType::LParen => self.parse_paren(),
            TokenType::LBracket => {
                self.next_token();
                let elements = self.parse_expression_list(TokenType::RBracket)?;
                Ok(Expression::List(elements))
            }
            TokenType::LBrace => self.parse_map(),
            _ => Err(self.unexpected("expression")),
        }
    }

    /// `(...)`: empty tuple, parenthesized expression, or tuple literal.
    fn parse_paren(&mut self) -> Result<Expression, String> {
        self.next_token(); // (
        self.skip_newlines_inside();
        if self.current_token.token_type == TokenType::RParen {
            self.next_token();
            return Ok(Expression::Tuple(Vec::new()));
        }
        let first = self.parse_expression(Precedence::Lowest)?;
        self.skip_newlines_inside();
        if self.current_token.token_type == TokenType::RParen {
            self.next_token();
            return Ok(first);
        }
        let mut elements = vec![first];
        while self.current_token.token_type == TokenType::Comma {
            self.next_token();
            self.skip_newlines_inside();
            if self.current_token.token_type == TokenType::RParen {
                break; // trailing comma: `(x,)`
            }
            elements.push(self.parse_expression(Precedence::Lowest)?);
            self.skip_newlines_inside();
        }
        self.expect(TokenType::RParen)?;
        Ok(Expression::Tuple(elements))
    }

    fn parse_map(&mut self) -> Result<Expression, String> {
        self.next_token(); // {
        let mut pairs = Vec::new();
        self.skip_newlines_inside();
        while self.current_token.token_type != TokenType::RBrace {
            let key = self.parse_expression(Precedence::Lowest)?;
            self.expect(TokenType::Colon)?;
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));
            self.skip_newlines_inside();
            if self.current_token.token_type == TokenType::Comma {
                self.next_token();
                self.skip_newlines_inside();
            } else {
                break;
            }
        }
        self.expect(TokenType::RBrace)?;
        Ok(Expression::Map(pairs))
    }

    fn parse_infix(&mut self, left: Expression) -> Result<Expression, String> {
        match self.current_token.token_type {
            TokenType::LParen => self.parse_call(left),
            TokenType::LBracket => {
                self.next_token();
                let index = self.parse_expression(Precedence::Lowest)?;
                self.expect(TokenType::RBracket)?;
                Ok(Expression::Index {
                    object: Box::new(left),
                    index: Box::new(index),
                })
            }
            TokenType::Dot => {
                self.next_token();
                if self.current_token.token_type != TokenType::Ident {
                    return Err(self.unexpected("attribute name"));
                }
                let name = self.current_token.literal.clone();
                self.next_token();
                Ok(Expression::Attribute {
                    object: Box::new(left),
                    name,
                })
            }
            _ => {
                let operator = self.current_token.literal.clone();
                let precedence = precedence_of(self.current_token.token_type);
                self.next_token();
                let right = self.parse_expression(precedence)?;
                Ok(Expression::Infix {
                    left: Box::new(left),
                    operator,
                    right: Box::new(right),
                })
            }
        }
    }

    fn parse_call(&mut self, callee: Expression) -> Result<Expression, String> {
        self.next_token(); // (
        let mut args = Vec::new();
        let mut kwargs: Vec<(String, Expression)> = Vec::new();
        self.skip_newlines_inside();
        while self.current_token.token_type != TokenType::RParen {
            if self.current_token.token_type == TokenType::Ident
                && self.peek_token.token_type == TokenType::Assign
            {
                let key = self.current_token.literal.clone();
                self.next_token(); // name
                self.next_token(); // =
                let value = self.parse_expression(Precedence::Lowest)?;
                kwargs.push((key, value));
            } else {
                if !kwargs.is_empty() {
                    return Err(format!(
                        "line {}: positional argument follows keyword argument",
                        self.current_token.line
                    ));
                }
                args.push(self.parse_expression(Precedence::Lowest)?);
            }
            self.skip_newlines_inside();
            if self.current_token.token_type == TokenType::Comma {
                self.next_token();
                self.skip_newlines_inside();
            } else {
                break;
            }
        }
        self.expect(TokenType::RParen)?;
        Ok(Expression::Call {
            callee: Box::new(callee),
            args,
            kwargs,
        })
    }

    fn parse_expression_list(&mut self, end: TokenType) -> Result<Vec<Expression>, String> {
        let mut elements = Vec::new();
        self.skip_newlines_inside();
        while self.current_token.token_type != end {
            elements.push(self.parse_expression(Precedence::Lowest)?);
            self.skip_newlines_inside();
            if self.current_token.token_type == TokenType::Comma {
                self.next_token();
                self.skip_newlines_inside();
            } else {
                break;
            }
        }
        self.expect(end)?;
        Ok(elements)
    }

    /// Newlines are insignificant inside brackets, as in the usual
    /// bracketed-continuation rule.
    fn skip_newlines_inside(&mut self) {
        while self.current_token.token_type == TokenType::Newline {
            self.next_token();
        }
    }
}
