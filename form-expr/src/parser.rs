//! Expression parser.
//!
//! Parses tokens into an Abstract Syntax Tree. The accepted language is a
//! single ES2022 expression statement; every expression form parses (so the
//! evaluator can reject it by node type), statements do not.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::lexer::Lexer;
use crate::token::{Span, Token, TokenKind};

/// Default limit on how deeply expressions may nest while parsing.
pub const DEFAULT_MAX_NESTING: usize = 32;

/// Binary-level operator, before it is split into binary and logical nodes.
#[derive(Clone, Copy)]
enum Operator {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

/// Expression parser.
pub struct Parser<'a> {
    /// Tokens.
    tokens: Vec<Token>,
    /// Current position.
    pos: usize,
    /// Source code (for property names spelled as reserved words).
    source: &'a str,
    /// Byte offset of `source` inside the outermost expression.
    origin: usize,
    /// Current nesting depth.
    depth: usize,
    /// Nesting limit.
    max_nesting: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser.
    pub fn new(source: &'a str) -> ParseResult<Self> {
        Self::with_origin(source, Span::new(0, source.len(), 1, 1))
    }

    /// Create a parser for a template substitution of a larger expression.
    fn with_origin(source: &'a str, origin: Span) -> ParseResult<Self> {
        let mut lexer = Lexer::with_origin(source, origin);
        let tokens = lexer.tokenize()?;

        Ok(Parser {
            tokens,
            pos: 0,
            source,
            origin: origin.start,
            depth: 0,
            max_nesting: DEFAULT_MAX_NESTING,
        })
    }

    /// Set the nesting limit.
    pub fn with_max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting;
        self
    }

    /// Run `parse` one nesting level deeper.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth >= self.max_nesting {
            return Err(self.error("Expression nested too deeply"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Parse the source as a single expression statement.
    pub fn parse_program(&mut self) -> ParseResult<Program> {
        let start = self.current_span();

        match &self.current().kind {
            TokenKind::Eof => return Err(self.error("Empty expression")),
            TokenKind::LeftBrace => {
                return Err(self.error("Block statements are not supported"));
            }
            TokenKind::Function | TokenKind::Class => {
                return Err(self.error("Declarations are not supported"));
            }
            TokenKind::Identifier(name) if name == "let" && self.peek_starts_binding() => {
                return Err(self.error("Declarations are not supported"));
            }
            TokenKind::Identifier(_) if self.peek_is(&TokenKind::Colon) => {
                return Err(self.error("Labeled statements are not supported"));
            }
            kind if kind.starts_statement() => {
                let text = String::from(self.token_text(self.current()));
                return Err(self.error(format!(
                    "Unexpected token '{}': statements are not supported",
                    text
                )));
            }
            _ => {}
        }

        let expression = self.parse_expression()?;
        if self.check(&TokenKind::Semicolon) {
            self.advance();
        }
        let end = self.prev_span();

        if !self.is_eof() {
            return Err(self.unexpected());
        }

        Ok(Program {
            body: ExpressionStmt {
                expression,
                span: start.merge(end),
            },
            span: start.merge(end),
        })
    }

    /// Parse expression (including the comma operator).
    pub fn parse_expression(&mut self) -> ParseResult<Expression> {
        let start = self.current_span();
        let first = self.parse_assignment_expression()?;

        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }

        let mut expressions = Vec::new();
        expressions.push(first);
        while self.check(&TokenKind::Comma) {
            self.advance();
            expressions.push(self.parse_assignment_expression()?);
        }

        Ok(Expression::Sequence(SequenceExpr {
            expressions,
            span: start.merge(self.prev_span()),
        }))
    }

    /// Parse assignment expression.
    fn parse_assignment_expression(&mut self) -> ParseResult<Expression> {
        self.nested(Self::parse_assignment_level)
    }

    fn parse_assignment_level(&mut self) -> ParseResult<Expression> {
        let start = self.current_span();

        if let Some(is_async) = self.at_arrow_function() {
            return self.parse_arrow_function(is_async);
        }

        if self.check(&TokenKind::Yield) {
            return self.parse_yield_expression();
        }

        let left = self.parse_conditional_expression()?;

        if self.current().kind.is_assignment() {
            let operator = self.parse_assignment_operator()?;
            let right = self.parse_assignment_expression()?;

            return Ok(Expression::Assignment(AssignmentExpr {
                operator,
                left: Box::new(left),
                right: Box::new(right),
                span: start.merge(self.prev_span()),
            }));
        }

        Ok(left)
    }

    /// Parse assignment operator.
    fn parse_assignment_operator(&mut self) -> ParseResult<AssignmentOp> {
        let op = match &self.current().kind {
            TokenKind::Assign => AssignmentOp::Assign,
            TokenKind::PlusAssign => AssignmentOp::AddAssign,
            TokenKind::MinusAssign => AssignmentOp::SubAssign,
            TokenKind::StarAssign => AssignmentOp::MulAssign,
            TokenKind::SlashAssign => AssignmentOp::DivAssign,
            TokenKind::PercentAssign => AssignmentOp::ModAssign,
            TokenKind::StarStarAssign => AssignmentOp::ExpAssign,
            TokenKind::LeftShiftAssign => AssignmentOp::LeftShiftAssign,
            TokenKind::RightShiftAssign => AssignmentOp::RightShiftAssign,
            TokenKind::UnsignedRightShiftAssign => AssignmentOp::UnsignedRightShiftAssign,
            TokenKind::AmpersandAssign => AssignmentOp::BitAndAssign,
            TokenKind::PipeAssign => AssignmentOp::BitOrAssign,
            TokenKind::CaretAssign => AssignmentOp::BitXorAssign,
            TokenKind::AmpersandAmpersandAssign => AssignmentOp::AndAssign,
            TokenKind::PipePipeAssign => AssignmentOp::OrAssign,
            TokenKind::QuestionQuestionAssign => AssignmentOp::NullishAssign,
            _ => return Err(self.error("Expected assignment operator")),
        };
        self.advance();
        Ok(op)
    }

    /// Parse yield expression.
    fn parse_yield_expression(&mut self) -> ParseResult<Expression> {
        let start = self.current_span();
        self.expect(&TokenKind::Yield)?;

        let delegate = if self.check(&TokenKind::Star) {
            self.advance();
            true
        } else {
            false
        };

        let argument = match &self.current().kind {
            TokenKind::RightParen
            | TokenKind::RightBracket
            | TokenKind::RightBrace
            | TokenKind::Comma
            | TokenKind::Semicolon
            | TokenKind::Colon
            | TokenKind::Eof
                if !delegate =>
            {
                None
            }
            _ => Some(Box::new(self.parse_assignment_expression()?)),
        };

        Ok(Expression::Yield(YieldExpr {
            argument,
            delegate,
            span: start.merge(self.prev_span()),
        }))
    }

    /// Detect an arrow function at the current position. Returns whether it
    /// is async.
    fn at_arrow_function(&self) -> Option<bool> {
        match &self.current().kind {
            TokenKind::Identifier(name) => {
                if self.peek_is(&TokenKind::Arrow) {
                    return Some(false);
                }
                if name == "async" {
                    let next = self.pos + 1;
                    match self.tokens.get(next).map(|t| &t.kind) {
                        Some(TokenKind::Identifier(_))
                            if self.kind_at(next + 1) == Some(&TokenKind::Arrow) =>
                        {
                            return Some(true);
                        }
                        Some(TokenKind::LeftParen) => {
                            let close = self.matching_close(next)?;
                            if self.kind_at(close + 1) == Some(&TokenKind::Arrow) {
                                return Some(true);
                            }
                        }
                        _ => {}
                    }
                }
                None
            }
            TokenKind::LeftParen => {
                let close = self.matching_close(self.pos)?;
                if self.kind_at(close + 1) == Some(&TokenKind::Arrow) {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Parse arrow function.
    fn parse_arrow_function(&mut self, is_async: bool) -> ParseResult<Expression> {
        let start = self.current_span();
        if is_async {
            self.advance(); // async
        }

        let mut params = Vec::new();
        if self.check(&TokenKind::LeftParen) {
            self.advance();
            while !self.check(&TokenKind::RightParen) && !self.is_eof() {
                params.push(self.parse_pattern()?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
            self.expect(&TokenKind::RightParen)?;
        } else {
            let id = self.parse_identifier()?;
            params.push(Pattern::Identifier(id));
        }

        self.expect(&TokenKind::Arrow)?;

        let body = if self.check(&TokenKind::LeftBrace) {
            ArrowFunctionBody::Block(self.skip_balanced()?)
        } else {
            ArrowFunctionBody::Expression(Arc::new(self.parse_assignment_expression()?))
        };

        Ok(Expression::Arrow(ArrowFunctionExpr {
            params,
            body,
            is_async,
            span: start.merge(self.prev_span()),
        }))
    }

    /// Parse an arrow parameter.
    fn parse_pattern(&mut self) -> ParseResult<Pattern> {
        let start = self.current_span();

        if self.check(&TokenKind::Ellipsis) {
            self.advance();
            let argument = self.parse_binding_target()?;
            return Ok(Pattern::Rest(RestElement {
                argument: Box::new(argument),
                span: start.merge(self.prev_span()),
            }));
        }

        let target = self.parse_binding_target()?;
        if self.check(&TokenKind::Assign) {
            self.advance();
            let right = self.parse_assignment_expression()?;
            return Ok(Pattern::Assignment(AssignmentPattern {
                left: Box::new(target),
                right: Box::new(right),
                span: start.merge(self.prev_span()),
            }));
        }

        Ok(target)
    }

    /// Parse a binding identifier or a destructuring pattern.
    fn parse_binding_target(&mut self) -> ParseResult<Pattern> {
        match &self.current().kind {
            TokenKind::LeftBracket => Ok(Pattern::Array(self.skip_balanced()?)),
            TokenKind::LeftBrace => Ok(Pattern::Object(self.skip_balanced()?)),
            _ => Ok(Pattern::Identifier(self.parse_identifier()?)),
        }
    }

    /// Parse conditional expression.
    fn parse_conditional_expression(&mut self) -> ParseResult<Expression> {
        let start = self.current_span();
        let test = self.parse_binary_expression(0)?;

        if self.check(&TokenKind::Question) {
            self.advance();
            let consequent = self.parse_assignment_expression()?;
            self.expect(&TokenKind::Colon)?;
            let alternate = self.parse_assignment_expression()?;

            return Ok(Expression::Conditional(ConditionalExpr {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
                span: start.merge(self.prev_span()),
            }));
        }

        Ok(test)
    }

    /// Parse binary expression with precedence climbing.
    fn parse_binary_expression(&mut self, min_prec: u8) -> ParseResult<Expression> {
        let start = self.current_span();
        let mut left = self.parse_unary_expression()?;

        while let Some((op, prec)) = binary_operator(&self.current().kind) {
            if prec < min_prec {
                break;
            }

            let is_exp = matches!(op, Operator::Binary(BinaryOp::Exp));
            if is_exp && matches!(left, Expression::Unary(_) | Expression::Await(_)) {
                return Err(self.error(
                    "Unary operator used immediately before exponentiation expression",
                ));
            }

            self.advance();
            // `**` is right-associative
            let next_prec = if is_exp { prec } else { prec + 1 };
            let right = self.nested(|parser| parser.parse_binary_expression(next_prec))?;

            left = match op {
                Operator::Logical(operator) => {
                    if mixes_nullish(operator, &left) || mixes_nullish(operator, &right) {
                        return Err(self.error(
                            "Cannot mix '??' with '&&' or '||' without parentheses",
                        ));
                    }
                    Expression::Logical(LogicalExpr {
                        operator,
                        left: Box::new(left),
                        right: Box::new(right),
                        span: start.merge(self.prev_span()),
                    })
                }
                Operator::Binary(operator) => Expression::Binary(BinaryExpr {
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                    span: start.merge(self.prev_span()),
                }),
            };
        }

        Ok(left)
    }

    /// Parse unary expression.
    fn parse_unary_expression(&mut self) -> ParseResult<Expression> {
        let start = self.current_span();

        let operator = match &self.current().kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Typeof => UnaryOp::Typeof,
            TokenKind::Void => UnaryOp::Void,
            TokenKind::Delete => UnaryOp::Delete,
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let operator = if self.check(&TokenKind::PlusPlus) {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                self.advance();
                let argument = self.nested(Self::parse_unary_expression)?;
                return Ok(Expression::Update(UpdateExpr {
                    operator,
                    argument: Box::new(argument),
                    prefix: true,
                    span: start.merge(self.prev_span()),
                }));
            }
            TokenKind::Await => {
                self.advance();
                let argument = self.nested(Self::parse_unary_expression)?;
                return Ok(Expression::Await(AwaitExpr {
                    argument: Box::new(argument),
                    span: start.merge(self.prev_span()),
                }));
            }
            _ => return self.parse_update_expression(),
        };

        self.advance();
        let argument = self.nested(Self::parse_unary_expression)?;
        Ok(Expression::Unary(UnaryExpr {
            operator,
            argument: Box::new(argument),
            span: start.merge(self.prev_span()),
        }))
    }

    /// Parse postfix update expression.
    fn parse_update_expression(&mut self) -> ParseResult<Expression> {
        let start = self.current_span();
        let argument = self.parse_left_hand_side_expression()?;

        let operator = match &self.current().kind {
            TokenKind::PlusPlus => UpdateOp::Increment,
            TokenKind::MinusMinus => UpdateOp::Decrement,
            _ => return Ok(argument),
        };
        self.advance();

        Ok(Expression::Update(UpdateExpr {
            operator,
            argument: Box::new(argument),
            prefix: false,
            span: start.merge(self.prev_span()),
        }))
    }

    /// Parse left-hand side expression.
    fn parse_left_hand_side_expression(&mut self) -> ParseResult<Expression> {
        let start = self.current_span();

        let expr = if self.check(&TokenKind::New) {
            self.parse_new_expression()?
        } else {
            self.parse_primary_expression()?
        };

        self.parse_call_tail(start, expr, true)
    }

    /// Parse `new callee(args)`.
    fn parse_new_expression(&mut self) -> ParseResult<Expression> {
        let start = self.current_span();
        self.expect(&TokenKind::New)?;

        let callee = if self.check(&TokenKind::New) {
            self.nested(Self::parse_new_expression)?
        } else {
            let primary = self.parse_primary_expression()?;
            self.parse_call_tail(start, primary, false)?
        };

        let arguments = if self.check(&TokenKind::LeftParen) {
            self.advance();
            let args = self.parse_arguments()?;
            self.expect(&TokenKind::RightParen)?;
            args
        } else {
            Vec::new()
        };

        Ok(Expression::New(NewExpr {
            callee: Box::new(callee),
            arguments,
            span: start.merge(self.prev_span()),
        }))
    }

    /// Parse member accesses, calls and tagged templates following `expr`.
    fn parse_call_tail(
        &mut self,
        start: Span,
        mut expr: Expression,
        allow_call: bool,
    ) -> ParseResult<Expression> {
        let mut in_optional_chain = false;

        loop {
            match &self.current().kind {
                TokenKind::Dot => {
                    self.advance();
                    let property = self.parse_member_name()?;
                    expr = Expression::Member(MemberExpr {
                        object: Box::new(expr),
                        property: Box::new(property),
                        computed: false,
                        optional: false,
                        span: start.merge(self.prev_span()),
                    });
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let property = self.parse_expression()?;
                    self.expect(&TokenKind::RightBracket)?;
                    expr = Expression::Member(MemberExpr {
                        object: Box::new(expr),
                        property: Box::new(property),
                        computed: true,
                        optional: false,
                        span: start.merge(self.prev_span()),
                    });
                }
                TokenKind::LeftParen if allow_call => {
                    self.advance();
                    let arguments = self.parse_arguments()?;
                    self.expect(&TokenKind::RightParen)?;
                    expr = Expression::Call(CallExpr {
                        callee: Box::new(expr),
                        arguments,
                        optional: false,
                        span: start.merge(self.prev_span()),
                    });
                }
                TokenKind::Template { .. } => {
                    if in_optional_chain {
                        return Err(self.error("Invalid tagged template on optional chain"));
                    }
                    let quasi = self.parse_template_literal()?;
                    expr = Expression::TaggedTemplate(TaggedTemplateExpr {
                        tag: Box::new(expr),
                        quasi,
                        span: start.merge(self.prev_span()),
                    });
                }
                TokenKind::QuestionDot if allow_call => {
                    self.advance();
                    in_optional_chain = true;
                    if self.check(&TokenKind::LeftBracket) {
                        self.advance();
                        let property = self.parse_expression()?;
                        self.expect(&TokenKind::RightBracket)?;
                        expr = Expression::Member(MemberExpr {
                            object: Box::new(expr),
                            property: Box::new(property),
                            computed: true,
                            optional: true,
                            span: start.merge(self.prev_span()),
                        });
                    } else if self.check(&TokenKind::LeftParen) {
                        self.advance();
                        let arguments = self.parse_arguments()?;
                        self.expect(&TokenKind::RightParen)?;
                        expr = Expression::Call(CallExpr {
                            callee: Box::new(expr),
                            arguments,
                            optional: true,
                            span: start.merge(self.prev_span()),
                        });
                    } else {
                        let property = self.parse_member_name()?;
                        expr = Expression::Member(MemberExpr {
                            object: Box::new(expr),
                            property: Box::new(property),
                            computed: false,
                            optional: true,
                            span: start.merge(self.prev_span()),
                        });
                    }
                }
                _ => break,
            }
        }

        if in_optional_chain {
            expr = Expression::OptionalChain(OptionalChainExpr {
                expression: Box::new(expr),
                span: start.merge(self.prev_span()),
            });
        }

        Ok(expr)
    }

    /// Parse the name after `.`; reserved words are valid property names.
    fn parse_member_name(&mut self) -> ParseResult<Expression> {
        let span = self.current_span();
        let token = self.current();

        match &token.kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(Expression::Identifier(Identifier { name, span }))
            }
            TokenKind::PrivateIdentifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(Expression::PrivateName(Identifier { name, span }))
            }
            kind if kind.is_keyword() => {
                let name = String::from(self.token_text(token));
                self.advance();
                Ok(Expression::Identifier(Identifier { name, span }))
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Parse primary expression.
    fn parse_primary_expression(&mut self) -> ParseResult<Expression> {
        let start = self.current_span();

        match &self.current().kind {
            TokenKind::This => {
                self.advance();
                Ok(Expression::This(start))
            }
            TokenKind::Super => {
                self.advance();
                Ok(Expression::Super(start))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expression::Literal(Literal::Null(start)))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(true, start)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(false, start)))
            }
            TokenKind::Number(n) => {
                let n = *n;
                self.advance();
                Ok(Expression::Literal(Literal::Number(n, start)))
            }
            TokenKind::String(s) => {
                let value = s.clone();
                self.advance();
                Ok(Expression::Literal(Literal::String(StringLiteral {
                    value,
                    span: start,
                })))
            }
            TokenKind::BigInt(digits) => {
                let digits = digits.clone();
                self.advance();
                Ok(Expression::Literal(Literal::BigInt(digits, start)))
            }
            TokenKind::Template { .. } => Ok(Expression::Template(self.parse_template_literal()?)),
            TokenKind::Identifier(name) if name == "async" && self.peek_is(&TokenKind::Function) => {
                self.advance();
                let mut func = self.parse_function_expression()?;
                func.is_async = true;
                func.span = start.merge(self.prev_span());
                Ok(Expression::Function(func))
            }
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(Expression::Identifier(Identifier { name, span: start }))
            }
            TokenKind::PrivateIdentifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(Expression::PrivateName(Identifier { name, span: start }))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expression = self.parse_expression()?;
                self.expect(&TokenKind::RightParen)?;
                Ok(Expression::Paren(ParenExpr {
                    expression: Box::new(expression),
                    span: start.merge(self.prev_span()),
                }))
            }
            TokenKind::LeftBracket => self.parse_array_expression(),
            TokenKind::LeftBrace => self.parse_object_expression(),
            TokenKind::Function => Ok(Expression::Function(self.parse_function_expression()?)),
            TokenKind::Class => self.parse_class_expression(),
            TokenKind::Import => self.parse_import_expression(),
            TokenKind::Slash | TokenKind::SlashAssign => {
                Err(self.error("Regular expression literals are not supported"))
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Parse template literal, compiling each substitution.
    fn parse_template_literal(&mut self) -> ParseResult<TemplateLiteral> {
        let span = self.current_span();
        let (quasis, substitutions) = match &self.current().kind {
            TokenKind::Template {
                quasis,
                substitutions,
            } => (quasis.clone(), substitutions.clone()),
            _ => return Err(self.unexpected()),
        };
        self.advance();

        let mut expressions = Vec::with_capacity(substitutions.len());
        for substitution in &substitutions {
            let mut parser = Parser::with_origin(&substitution.source, substitution.span)?
                .with_max_nesting(self.max_nesting);
            parser.depth = self.depth + 1;
            if parser.is_eof() {
                return Err(ParseError::new(
                    "Empty template substitution",
                    substitution.span.line,
                    substitution.span.column,
                ));
            }
            let expression = parser.parse_expression()?;
            if !parser.is_eof() {
                return Err(parser.unexpected());
            }
            expressions.push(expression);
        }

        Ok(TemplateLiteral {
            quasis,
            expressions,
            span,
        })
    }

    /// Parse array expression.
    fn parse_array_expression(&mut self) -> ParseResult<Expression> {
        let start = self.current_span();
        self.expect(&TokenKind::LeftBracket)?;

        let mut elements = Vec::new();

        while !self.check(&TokenKind::RightBracket) && !self.is_eof() {
            if self.check(&TokenKind::Comma) {
                self.advance();
                elements.push(None);
                continue;
            }

            if self.check(&TokenKind::Ellipsis) {
                let spread_start = self.current_span();
                self.advance();
                let argument = self.parse_assignment_expression()?;
                elements.push(Some(Expression::Spread(SpreadElement {
                    argument: Box::new(argument),
                    span: spread_start.merge(self.prev_span()),
                })));
            } else {
                elements.push(Some(self.parse_assignment_expression()?));
            }

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        self.expect(&TokenKind::RightBracket)?;

        Ok(Expression::Array(ArrayExpr {
            elements,
            span: start.merge(self.prev_span()),
        }))
    }

    /// Parse object expression.
    fn parse_object_expression(&mut self) -> ParseResult<Expression> {
        let start = self.current_span();
        self.expect(&TokenKind::LeftBrace)?;

        let mut properties = Vec::new();

        while !self.check(&TokenKind::RightBrace) && !self.is_eof() {
            properties.push(self.parse_object_property()?);

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        self.expect(&TokenKind::RightBrace)?;

        Ok(Expression::Object(ObjectExpr {
            properties,
            span: start.merge(self.prev_span()),
        }))
    }

    /// Parse one object literal member.
    fn parse_object_property(&mut self) -> ParseResult<ObjectProperty> {
        let start = self.current_span();

        if self.check(&TokenKind::Ellipsis) {
            self.advance();
            let argument = self.parse_assignment_expression()?;
            return Ok(ObjectProperty::Spread(SpreadElement {
                argument: Box::new(argument),
                span: start.merge(self.prev_span()),
            }));
        }

        // Accessors, async and generator methods
        let mut kind = None;
        if let TokenKind::Identifier(word) = &self.current().kind {
            let prefix = match word.as_str() {
                "get" => Some(MethodKind::Get),
                "set" => Some(MethodKind::Set),
                "async" => Some(MethodKind::Method),
                _ => None,
            };
            if prefix.is_some() && self.peek_starts_property_name() {
                self.advance();
                kind = prefix;
            }
        }
        if self.check(&TokenKind::Star) {
            self.advance();
            kind = Some(MethodKind::Method);
        }

        let computed = self.check(&TokenKind::LeftBracket);
        let key = if computed {
            self.advance();
            let expr = self.parse_assignment_expression()?;
            self.expect(&TokenKind::RightBracket)?;
            expr
        } else {
            self.parse_property_name()?
        };

        if kind.is_some() || self.check(&TokenKind::LeftParen) {
            self.skip_balanced()?; // parameters
            if !self.check(&TokenKind::LeftBrace) {
                return Err(self.unexpected());
            }
            self.skip_balanced()?; // body
            return Ok(ObjectProperty::Method {
                key,
                kind: kind.unwrap_or(MethodKind::Method),
                computed,
                span: start.merge(self.prev_span()),
            });
        }

        if self.check(&TokenKind::Colon) {
            self.advance();
            let value = self.parse_assignment_expression()?;
            return Ok(ObjectProperty::Property {
                key,
                value,
                computed,
                shorthand: false,
                span: start.merge(self.prev_span()),
            });
        }

        // Shorthand: only plain identifiers qualify
        let is_plain_identifier = !computed
            && matches!(self.tokens[self.pos - 1].kind, TokenKind::Identifier(_));
        if !is_plain_identifier {
            return Err(self.unexpected());
        }

        Ok(ObjectProperty::Property {
            key: key.clone(),
            value: key,
            computed: false,
            shorthand: true,
            span: start.merge(self.prev_span()),
        })
    }

    /// Parse property name.
    fn parse_property_name(&mut self) -> ParseResult<Expression> {
        let span = self.current_span();

        match &self.current().kind {
            TokenKind::String(s) => {
                let value = s.clone();
                self.advance();
                Ok(Expression::Literal(Literal::String(StringLiteral { value, span })))
            }
            TokenKind::Number(n) => {
                let n = *n;
                self.advance();
                Ok(Expression::Literal(Literal::Number(n, span)))
            }
            TokenKind::BigInt(digits) => {
                let digits = digits.clone();
                self.advance();
                Ok(Expression::Literal(Literal::BigInt(digits, span)))
            }
            TokenKind::PrivateIdentifier(_) => Err(self.unexpected()),
            _ => self.parse_member_name(),
        }
    }

    /// Parse function expression. Parameters and body are skipped.
    fn parse_function_expression(&mut self) -> ParseResult<FunctionExpr> {
        let start = self.current_span();
        self.expect(&TokenKind::Function)?;

        let is_generator = if self.check(&TokenKind::Star) {
            self.advance();
            true
        } else {
            false
        };

        let id = if let TokenKind::Identifier(_) = &self.current().kind {
            Some(self.parse_identifier()?)
        } else {
            None
        };

        if !self.check(&TokenKind::LeftParen) {
            return Err(self.unexpected());
        }
        self.skip_balanced()?;
        if !self.check(&TokenKind::LeftBrace) {
            return Err(self.unexpected());
        }
        self.skip_balanced()?;

        Ok(FunctionExpr {
            id,
            is_async: false,
            is_generator,
            span: start.merge(self.prev_span()),
        })
    }

    /// Parse class expression. The body is skipped.
    fn parse_class_expression(&mut self) -> ParseResult<Expression> {
        let start = self.current_span();
        self.expect(&TokenKind::Class)?;

        let id = if let TokenKind::Identifier(_) = &self.current().kind {
            Some(self.parse_identifier()?)
        } else {
            None
        };

        let super_class = if self.check(&TokenKind::Extends) {
            self.advance();
            Some(Box::new(self.nested(Self::parse_left_hand_side_expression)?))
        } else {
            None
        };

        if !self.check(&TokenKind::LeftBrace) {
            return Err(self.unexpected());
        }
        self.skip_balanced()?;

        Ok(Expression::Class(ClassExpr {
            id,
            super_class,
            span: start.merge(self.prev_span()),
        }))
    }

    /// Parse `import(source)`.
    fn parse_import_expression(&mut self) -> ParseResult<Expression> {
        let start = self.current_span();
        self.expect(&TokenKind::Import)?;
        if !self.check(&TokenKind::LeftParen) {
            return Err(self.error("Cannot use import outside a module"));
        }
        self.advance();
        let source = self.parse_assignment_expression()?;
        if self.check(&TokenKind::Comma) {
            self.advance();
        }
        self.expect(&TokenKind::RightParen)?;

        Ok(Expression::Import(ImportExpr {
            source: Box::new(source),
            span: start.merge(self.prev_span()),
        }))
    }

    /// Parse arguments.
    fn parse_arguments(&mut self) -> ParseResult<Vec<Expression>> {
        let mut args = Vec::new();

        while !self.check(&TokenKind::RightParen) && !self.is_eof() {
            if self.check(&TokenKind::Ellipsis) {
                let start = self.current_span();
                self.advance();
                let argument = self.parse_assignment_expression()?;
                args.push(Expression::Spread(SpreadElement {
                    argument: Box::new(argument),
                    span: start.merge(self.prev_span()),
                }));
            } else {
                args.push(self.parse_assignment_expression()?);
            }

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        Ok(args)
    }

    /// Parse identifier.
    fn parse_identifier(&mut self) -> ParseResult<Identifier> {
        if let TokenKind::Identifier(name) = &self.current().kind {
            let span = self.current_span();
            let name = name.clone();
            self.advance();
            Ok(Identifier { name, span })
        } else {
            Err(self.error(format!(
                "Expected identifier, got {}",
                self.describe(self.current())
            )))
        }
    }

    /// Skip a balanced `(...)`, `[...]` or `{...}` group, returning its span.
    fn skip_balanced(&mut self) -> ParseResult<Span> {
        let start = self.current_span();
        let close = self
            .matching_close(self.pos)
            .ok_or_else(|| self.error("Unbalanced brackets"))?;
        self.pos = close + 1;
        Ok(start.merge(self.prev_span()))
    }

    /// Index of the token closing the group opened at `open`.
    fn matching_close(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (index, token) in self.tokens.iter().enumerate().skip(open) {
            match token.kind {
                TokenKind::LeftParen | TokenKind::LeftBracket | TokenKind::LeftBrace => {
                    depth += 1;
                }
                TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(index);
                    }
                }
                TokenKind::Eof => return None,
                _ => {}
            }
            if depth == 0 {
                return None;
            }
        }
        None
    }

    // Helper methods

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn current_span(&self) -> Span {
        self.current().span
    }

    fn prev_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            self.current_span()
        }
    }

    fn kind_at(&self, index: usize) -> Option<&TokenKind> {
        self.tokens.get(index).map(|t| &t.kind)
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len() || self.current().is_eof()
    }

    fn advance(&mut self) {
        if !self.is_eof() {
            self.pos += 1;
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        core::mem::discriminant(&self.current().kind) == core::mem::discriminant(kind)
    }

    fn peek_is(&self, kind: &TokenKind) -> bool {
        match self.kind_at(self.pos + 1) {
            Some(next) => core::mem::discriminant(next) == core::mem::discriminant(kind),
            None => false,
        }
    }

    /// Whether the next token can begin a property name (after `get`/`set`/`async`).
    fn peek_starts_property_name(&self) -> bool {
        match self.kind_at(self.pos + 1) {
            Some(
                TokenKind::Identifier(_)
                | TokenKind::String(_)
                | TokenKind::Number(_)
                | TokenKind::BigInt(_)
                | TokenKind::LeftBracket
                | TokenKind::Star,
            ) => true,
            Some(kind) => kind.is_keyword(),
            None => false,
        }
    }

    /// Whether the token after `let` starts a binding.
    fn peek_starts_binding(&self) -> bool {
        matches!(
            self.kind_at(self.pos + 1),
            Some(TokenKind::Identifier(_) | TokenKind::LeftBracket | TokenKind::LeftBrace)
        )
    }

    fn expect(&mut self, kind: &TokenKind) -> ParseResult<()> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "Expected {}, got {}",
                kind,
                self.describe(self.current())
            )))
        }
    }

    /// Source text of a token.
    fn token_text(&self, token: &Token) -> &str {
        let start = token.span.start.saturating_sub(self.origin);
        let end = token.span.end.saturating_sub(self.origin);
        self.source.get(start..end).unwrap_or("")
    }

    fn describe(&self, token: &Token) -> String {
        if token.is_eof() {
            String::from("end of input")
        } else {
            format!("'{}'", self.token_text(token))
        }
    }

    fn unexpected(&self) -> ParseError {
        let token = self.current();
        if token.is_eof() {
            self.error("Unexpected end of input")
        } else {
            self.error(format!("Unexpected token {}", self.describe(token)))
        }
    }

    fn error<S: Into<String>>(&self, message: S) -> ParseError {
        let span = self.current_span();
        ParseError::new(message, span.line, span.column)
    }
}

/// Binary operator and precedence for a token.
fn binary_operator(kind: &TokenKind) -> Option<(Operator, u8)> {
    let entry = match kind {
        TokenKind::PipePipe => (Operator::Logical(LogicalOp::Or), 4),
        TokenKind::QuestionQuestion => (Operator::Logical(LogicalOp::Nullish), 4),
        TokenKind::AmpersandAmpersand => (Operator::Logical(LogicalOp::And), 5),
        TokenKind::Pipe => (Operator::Binary(BinaryOp::BitOr), 6),
        TokenKind::Caret => (Operator::Binary(BinaryOp::BitXor), 7),
        TokenKind::Ampersand => (Operator::Binary(BinaryOp::BitAnd), 8),
        TokenKind::Equal => (Operator::Binary(BinaryOp::Equal), 9),
        TokenKind::NotEqual => (Operator::Binary(BinaryOp::NotEqual), 9),
        TokenKind::StrictEqual => (Operator::Binary(BinaryOp::StrictEqual), 9),
        TokenKind::StrictNotEqual => (Operator::Binary(BinaryOp::StrictNotEqual), 9),
        TokenKind::LessThan => (Operator::Binary(BinaryOp::LessThan), 10),
        TokenKind::LessEqual => (Operator::Binary(BinaryOp::LessEqual), 10),
        TokenKind::GreaterThan => (Operator::Binary(BinaryOp::GreaterThan), 10),
        TokenKind::GreaterEqual => (Operator::Binary(BinaryOp::GreaterEqual), 10),
        TokenKind::In => (Operator::Binary(BinaryOp::In), 10),
        TokenKind::Instanceof => (Operator::Binary(BinaryOp::Instanceof), 10),
        TokenKind::LeftShift => (Operator::Binary(BinaryOp::LeftShift), 11),
        TokenKind::RightShift => (Operator::Binary(BinaryOp::RightShift), 11),
        TokenKind::UnsignedRightShift => (Operator::Binary(BinaryOp::UnsignedRightShift), 11),
        TokenKind::Plus => (Operator::Binary(BinaryOp::Add), 12),
        TokenKind::Minus => (Operator::Binary(BinaryOp::Sub), 12),
        TokenKind::Star => (Operator::Binary(BinaryOp::Mul), 13),
        TokenKind::Slash => (Operator::Binary(BinaryOp::Div), 13),
        TokenKind::Percent => (Operator::Binary(BinaryOp::Mod), 13),
        TokenKind::StarStar => (Operator::Binary(BinaryOp::Exp), 14),
        _ => return None,
    };
    Some(entry)
}

/// `??` may not be combined with `&&`/`||` without parentheses.
fn mixes_nullish(operator: LogicalOp, operand: &Expression) -> bool {
    match operand {
        Expression::Logical(inner) => {
            (operator == LogicalOp::Nullish) != (inner.operator == LogicalOp::Nullish)
        }
        _ => false,
    }
}

/// Parse an expression source into an AST.
pub fn parse(source: &str) -> ParseResult<Program> {
    parse_with_max_nesting(source, DEFAULT_MAX_NESTING)
}

/// Parse a source string, rejecting expressions nested deeper than
/// `max_nesting`.
pub fn parse_with_max_nesting(source: &str, max_nesting: usize) -> ParseResult<Program> {
    Parser::new(source)
        .and_then(|parser| parser.with_max_nesting(max_nesting).parse_program())
        .map_err(|err| err.with_source(source))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(source: &str) -> Expression {
        parse(source).unwrap().body.expression
    }

    #[test]
    fn test_precedence() {
        match expr("1 + 2 * 3") {
            Expression::Binary(b) => {
                assert_eq!(b.operator, BinaryOp::Add);
                assert!(matches!(*b.right, Expression::Binary(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_exponent_is_right_associative() {
        match expr("2 ** 3 ** 2") {
            Expression::Binary(b) => {
                assert_eq!(b.operator, BinaryOp::Exp);
                assert!(matches!(*b.left, Expression::Literal(_)));
                assert!(matches!(*b.right, Expression::Binary(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(parse("-2 ** 2").is_err());
        assert!(parse("(-2) ** 2").is_ok());
    }

    #[test]
    fn test_logical_nodes() {
        assert!(matches!(
            expr("a ?? b"),
            Expression::Logical(LogicalExpr { operator: LogicalOp::Nullish, .. })
        ));
        assert!(parse("a ?? b || c").is_err());
        assert!(parse("(a ?? b) || c").is_ok());
    }

    #[test]
    fn test_parenthesized_node_is_kept() {
        assert!(matches!(expr("(a)"), Expression::Paren(_)));
        assert_eq!(expr("((a))").unparenthesized().node_type(), "Identifier");
    }

    #[test]
    fn test_arrow_functions() {
        match expr("x => x * 2") {
            Expression::Arrow(arrow) => {
                assert_eq!(arrow.params.len(), 1);
                assert!(matches!(arrow.body, ArrowFunctionBody::Expression(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
        match expr("(a, { b }, ...rest) => { return a }") {
            Expression::Arrow(arrow) => {
                assert_eq!(arrow.params.len(), 3);
                assert!(matches!(arrow.params[1], Pattern::Object(_)));
                assert!(matches!(arrow.params[2], Pattern::Rest(_)));
                assert!(matches!(arrow.body, ArrowFunctionBody::Block(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            expr("async (a) => a"),
            Expression::Arrow(ArrowFunctionExpr { is_async: true, .. })
        ));
        assert!(matches!(expr("() => a"), Expression::Arrow(_)));
    }

    #[test]
    fn test_arrow_as_argument() {
        match expr("arr.map(x => x.value)") {
            Expression::Call(call) => {
                assert!(matches!(call.arguments[0], Expression::Arrow(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_member_and_keyword_properties() {
        match expr("a.default.class") {
            Expression::Member(m) => match *m.property {
                Expression::Identifier(ref id) => assert_eq!(id.name, "class"),
                ref other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_optional_chain_is_wrapped() {
        assert!(matches!(expr("a?.b.c"), Expression::OptionalChain(_)));
        assert!(matches!(expr("a?.[0]"), Expression::OptionalChain(_)));
    }

    #[test]
    fn test_template_substitutions_are_parsed() {
        match expr("`sum: ${a + b}, ${`x${c}`}`") {
            Expression::Template(t) => {
                assert_eq!(t.quasis.len(), 3);
                assert!(matches!(t.expressions[0], Expression::Binary(_)));
                assert!(matches!(t.expressions[1], Expression::Template(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(parse("`${}`").is_err());
        assert!(parse("`${a b}`").is_err());
    }

    #[test]
    fn test_object_literal() {
        match expr("({ a, 'b': 1, [c]: 2, ...d, e() {}, get f() { return 1 } })") {
            Expression::Paren(p) => match *p.expression {
                Expression::Object(ref o) => {
                    assert_eq!(o.properties.len(), 6);
                    assert!(matches!(
                        o.properties[0],
                        ObjectProperty::Property { shorthand: true, .. }
                    ));
                    assert!(matches!(
                        o.properties[2],
                        ObjectProperty::Property { computed: true, .. }
                    ));
                    assert!(matches!(o.properties[3], ObjectProperty::Spread(_)));
                    assert!(matches!(
                        o.properties[5],
                        ObjectProperty::Method { kind: MethodKind::Get, .. }
                    ));
                }
                ref other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_forms_still_parse() {
        assert_eq!(expr("this.x").node_type(), "MemberExpression");
        assert_eq!(expr("new Foo(1).bar").node_type(), "MemberExpression");
        assert_eq!(expr("x++").node_type(), "UpdateExpression");
        assert_eq!(expr("a = 1").node_type(), "AssignmentExpression");
        assert_eq!(expr("(function () { return 1 })").unparenthesized().node_type(), "FunctionExpression");
        assert_eq!(expr("(class A { m() {} })").unparenthesized().node_type(), "ClassExpression");
        assert_eq!(expr("tag`x`").node_type(), "TaggedTemplateExpression");
        assert_eq!(expr("import('m')").node_type(), "ImportExpression");
        assert_eq!(expr("await x").node_type(), "AwaitExpression");
        assert_eq!(expr("10n").node_type(), "Literal");
    }

    #[test]
    fn test_sequence_and_semicolon() {
        assert!(matches!(expr("a, b, c"), Expression::Sequence(_)));
        assert!(parse("a + 1;").is_ok());
    }

    #[test]
    fn test_statements_are_rejected() {
        assert!(parse("").is_err());
        assert!(parse("a; b").is_err());
        assert!(parse("if (a) b").is_err());
        assert!(parse("return a").is_err());
        assert!(parse("let x = 1").is_err());
        assert!(parse("class A {}").is_err());
        assert!(parse("function f() {}").is_err());
        assert!(parse("{}").is_err());
        assert!(parse("label: a").is_err());
        assert!(parse("/ab+c/").is_err());
    }

    #[test]
    fn test_contextual_words_as_identifiers() {
        assert!(matches!(expr("of + async"), Expression::Binary(_)));
        assert!(matches!(expr("let"), Expression::Identifier(_)));
    }

    #[test]
    fn test_error_carries_source_and_position() {
        let err = parse("a +\n  * b").unwrap_err();
        assert_eq!(err.source, "a +\n  * b");
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 3);
    }

    fn nested_too_deeply(source: &str) -> bool {
        matches!(parse(source), Err(err) if err.message == "Expression nested too deeply")
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let parens = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert!(nested_too_deeply(&parens));

        let nots = format!("{}1", "!".repeat(20_000));
        assert!(nested_too_deeply(&nots));

        let powers = format!("2{}", " ** 2".repeat(5_000));
        assert!(nested_too_deeply(&powers));

        let arrays = format!("{}1{}", "[".repeat(5_000), "]".repeat(5_000));
        assert!(nested_too_deeply(&arrays));

        let calls = format!("{}1{}", "a.f(".repeat(5_000), ")".repeat(5_000));
        assert!(nested_too_deeply(&calls));

        let ternaries = format!("{}0", "a ? 1 : ".repeat(5_000));
        assert!(nested_too_deeply(&ternaries));

        assert!(nested_too_deeply(&format!("{}a", "new ".repeat(5_000))));
    }

    #[test]
    fn test_nesting_within_limit_parses() {
        let parens = format!("{}1{}", "(".repeat(20), ")".repeat(20));
        assert!(parse(&parens).is_ok());
        assert!(parse(&format!("{}1", "!".repeat(20))).is_ok());

        // Flat chains do not nest
        let sum = format!("a{}", " + a".repeat(1_000));
        assert!(parse(&sum).is_ok());
    }

    #[test]
    fn test_template_substitutions_count_toward_nesting() {
        let source = "`${`${`${x}`}`}`";
        assert!(parse(source).is_ok());
        assert!(parse_with_max_nesting(source, 4).is_err());
        assert!(parse_with_max_nesting("((1))", 3).is_ok());
        assert!(parse_with_max_nesting("(((1)))", 3).is_err());
    }
}
