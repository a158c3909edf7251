//! Expression Abstract Syntax Tree definitions.
//!
//! The tree covers the whole ES2022 expression grammar so that anything a
//! form author can legally write parses into a node. Only part of it is
//! evaluated; see [`Expression::node_type`] for the names used when a node is
//! rejected.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::token::Span;

/// Program node - the root of the AST.
///
/// A program is exactly one expression statement.
#[derive(Debug, Clone)]
pub struct Program {
    /// The single top-level statement.
    pub body: ExpressionStmt,
    /// Source span.
    pub span: Span,
}

impl Program {
    /// The top-level expression.
    pub fn expression(&self) -> &Expression {
        &self.body.expression
    }
}

/// Expression statement.
#[derive(Debug, Clone)]
pub struct ExpressionStmt {
    pub expression: Expression,
    pub span: Span,
}

/// Expression node.
#[derive(Debug, Clone)]
pub enum Expression {
    /// Identifier
    Identifier(Identifier),
    /// Literal
    Literal(Literal),
    /// This expression
    This(Span),
    /// Super reference
    Super(Span),
    /// Private name (#x), only legal before `in`
    PrivateName(Identifier),
    /// Array expression
    Array(ArrayExpr),
    /// Object expression
    Object(ObjectExpr),
    /// Function expression
    Function(FunctionExpr),
    /// Arrow function
    Arrow(ArrowFunctionExpr),
    /// Class expression
    Class(ClassExpr),
    /// Template literal
    Template(TemplateLiteral),
    /// Tagged template
    TaggedTemplate(TaggedTemplateExpr),
    /// Member expression (a.b or a[b])
    Member(MemberExpr),
    /// Call expression
    Call(CallExpr),
    /// New expression
    New(NewExpr),
    /// Update expression (++x, x--)
    Update(UpdateExpr),
    /// Unary expression (!x, -x, etc.)
    Unary(UnaryExpr),
    /// Binary expression (a + b)
    Binary(BinaryExpr),
    /// Logical expression (a && b, a || b)
    Logical(LogicalExpr),
    /// Conditional expression (a ? b : c)
    Conditional(ConditionalExpr),
    /// Assignment expression
    Assignment(AssignmentExpr),
    /// Sequence expression (a, b, c)
    Sequence(SequenceExpr),
    /// Parenthesized expression
    Paren(ParenExpr),
    /// Spread element
    Spread(SpreadElement),
    /// Yield expression
    Yield(YieldExpr),
    /// Await expression
    Await(AwaitExpr),
    /// Dynamic import
    Import(ImportExpr),
    /// Optional chaining
    OptionalChain(OptionalChainExpr),
}

impl Expression {
    /// ESTree node type name, used in diagnostics.
    pub fn node_type(&self) -> &'static str {
        match self {
            Expression::Identifier(_) => "Identifier",
            Expression::Literal(_) => "Literal",
            Expression::This(_) => "ThisExpression",
            Expression::Super(_) => "Super",
            Expression::PrivateName(_) => "PrivateIdentifier",
            Expression::Array(_) => "ArrayExpression",
            Expression::Object(_) => "ObjectExpression",
            Expression::Function(_) => "FunctionExpression",
            Expression::Arrow(_) => "ArrowFunctionExpression",
            Expression::Class(_) => "ClassExpression",
            Expression::Template(_) => "TemplateLiteral",
            Expression::TaggedTemplate(_) => "TaggedTemplateExpression",
            Expression::Member(_) => "MemberExpression",
            Expression::Call(_) => "CallExpression",
            Expression::New(_) => "NewExpression",
            Expression::Update(_) => "UpdateExpression",
            Expression::Unary(_) => "UnaryExpression",
            Expression::Binary(_) => "BinaryExpression",
            Expression::Logical(_) => "LogicalExpression",
            Expression::Conditional(_) => "ConditionalExpression",
            Expression::Assignment(_) => "AssignmentExpression",
            Expression::Sequence(_) => "SequenceExpression",
            Expression::Paren(_) => "ParenthesizedExpression",
            Expression::Spread(_) => "SpreadElement",
            Expression::Yield(_) => "YieldExpression",
            Expression::Await(_) => "AwaitExpression",
            Expression::Import(_) => "ImportExpression",
            Expression::OptionalChain(_) => "ChainExpression",
        }
    }

    /// Source span of the node.
    pub fn span(&self) -> Span {
        match self {
            Expression::Identifier(id) | Expression::PrivateName(id) => id.span,
            Expression::Literal(lit) => lit.span(),
            Expression::This(span) | Expression::Super(span) => *span,
            Expression::Array(e) => e.span,
            Expression::Object(e) => e.span,
            Expression::Function(e) => e.span,
            Expression::Arrow(e) => e.span,
            Expression::Class(e) => e.span,
            Expression::Template(e) => e.span,
            Expression::TaggedTemplate(e) => e.span,
            Expression::Member(e) => e.span,
            Expression::Call(e) => e.span,
            Expression::New(e) => e.span,
            Expression::Update(e) => e.span,
            Expression::Unary(e) => e.span,
            Expression::Binary(e) => e.span,
            Expression::Logical(e) => e.span,
            Expression::Conditional(e) => e.span,
            Expression::Assignment(e) => e.span,
            Expression::Sequence(e) => e.span,
            Expression::Paren(e) => e.span,
            Expression::Spread(e) => e.span,
            Expression::Yield(e) => e.span,
            Expression::Await(e) => e.span,
            Expression::Import(e) => e.span,
            Expression::OptionalChain(e) => e.span,
        }
    }

    /// Strip any number of enclosing parentheses.
    pub fn unparenthesized(&self) -> &Expression {
        let mut expr = self;
        while let Expression::Paren(paren) = expr {
            expr = &paren.expression;
        }
        expr
    }
}

/// Identifier.
#[derive(Debug, Clone)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

/// Literal.
#[derive(Debug, Clone)]
pub enum Literal {
    Null(Span),
    Boolean(bool, Span),
    Number(f64, Span),
    String(StringLiteral),
    BigInt(String, Span),
}

impl Literal {
    /// Source span of the literal.
    pub fn span(&self) -> Span {
        match self {
            Literal::Null(span)
            | Literal::Boolean(_, span)
            | Literal::Number(_, span)
            | Literal::BigInt(_, span) => *span,
            Literal::String(s) => s.span,
        }
    }
}

/// String literal.
#[derive(Debug, Clone)]
pub struct StringLiteral {
    pub value: String,
    pub span: Span,
}

/// Array expression. `None` entries are holes (`[a, , b]`).
#[derive(Debug, Clone)]
pub struct ArrayExpr {
    pub elements: Vec<Option<Expression>>,
    pub span: Span,
}

/// Object expression.
#[derive(Debug, Clone)]
pub struct ObjectExpr {
    pub properties: Vec<ObjectProperty>,
    pub span: Span,
}

/// Object property.
#[derive(Debug, Clone)]
pub enum ObjectProperty {
    /// `key: value`, `[key]: value` or shorthand `key`
    Property {
        key: Expression,
        value: Expression,
        computed: bool,
        shorthand: bool,
        span: Span,
    },
    /// Method, getter or setter; the body is not retained
    Method {
        key: Expression,
        kind: MethodKind,
        computed: bool,
        span: Span,
    },
    /// `...source`
    Spread(SpreadElement),
}

/// Method kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    Get,
    Set,
}

/// Function expression. Parameters and body are skipped during parsing.
#[derive(Debug, Clone)]
pub struct FunctionExpr {
    pub id: Option<Identifier>,
    pub is_async: bool,
    pub is_generator: bool,
    pub span: Span,
}

/// Arrow function expression.
#[derive(Debug, Clone)]
pub struct ArrowFunctionExpr {
    pub params: Vec<Pattern>,
    pub body: ArrowFunctionBody,
    pub is_async: bool,
    pub span: Span,
}

/// Arrow function body.
#[derive(Debug, Clone)]
pub enum ArrowFunctionBody {
    /// Concise body, shared with the callables created from it.
    Expression(Arc<Expression>),
    /// Block body, skipped during parsing.
    Block(Span),
}

/// Class expression. The class body is skipped during parsing.
#[derive(Debug, Clone)]
pub struct ClassExpr {
    pub id: Option<Identifier>,
    pub super_class: Option<Box<Expression>>,
    pub span: Span,
}

/// Template literal.
#[derive(Debug, Clone)]
pub struct TemplateLiteral {
    /// Cooked text segments; always one longer than `expressions`.
    pub quasis: Vec<String>,
    pub expressions: Vec<Expression>,
    pub span: Span,
}

/// Tagged template expression.
#[derive(Debug, Clone)]
pub struct TaggedTemplateExpr {
    pub tag: Box<Expression>,
    pub quasi: TemplateLiteral,
    pub span: Span,
}

/// Member expression.
#[derive(Debug, Clone)]
pub struct MemberExpr {
    pub object: Box<Expression>,
    pub property: Box<Expression>,
    pub computed: bool,
    pub optional: bool,
    pub span: Span,
}

/// Call expression.
#[derive(Debug, Clone)]
pub struct CallExpr {
    pub callee: Box<Expression>,
    pub arguments: Vec<Expression>,
    pub optional: bool,
    pub span: Span,
}

/// New expression.
#[derive(Debug, Clone)]
pub struct NewExpr {
    pub callee: Box<Expression>,
    pub arguments: Vec<Expression>,
    pub span: Span,
}

/// Update expression.
#[derive(Debug, Clone)]
pub struct UpdateExpr {
    pub operator: UpdateOp,
    pub argument: Box<Expression>,
    pub prefix: bool,
    pub span: Span,
}

/// Update operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment, // ++
    Decrement, // --
}

/// Unary expression.
#[derive(Debug, Clone)]
pub struct UnaryExpr {
    pub operator: UnaryOp,
    pub argument: Box<Expression>,
    pub span: Span,
}

/// Unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,  // -
    Plus,   // +
    Not,    // !
    BitNot, // ~
    Typeof, // typeof
    Void,   // void
    Delete, // delete
}

impl UnaryOp {
    /// Operator source text.
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Minus => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::Typeof => "typeof",
            UnaryOp::Void => "void",
            UnaryOp::Delete => "delete",
        }
    }
}

/// Binary expression.
#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub operator: BinaryOp,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub span: Span,
}

/// Binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,                // +
    Sub,                // -
    Mul,                // *
    Div,                // /
    Mod,                // %
    Exp,                // **
    Equal,              // ==
    NotEqual,           // !=
    StrictEqual,        // ===
    StrictNotEqual,     // !==
    LessThan,           // <
    LessEqual,          // <=
    GreaterThan,        // >
    GreaterEqual,       // >=
    LeftShift,          // <<
    RightShift,         // >>
    UnsignedRightShift, // >>>
    BitAnd,             // &
    BitOr,              // |
    BitXor,             // ^
    In,                 // in
    Instanceof,         // instanceof
}

impl BinaryOp {
    /// Operator source text.
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Exp => "**",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::StrictEqual => "===",
            BinaryOp::StrictNotEqual => "!==",
            BinaryOp::LessThan => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::LeftShift => "<<",
            BinaryOp::RightShift => ">>",
            BinaryOp::UnsignedRightShift => ">>>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::In => "in",
            BinaryOp::Instanceof => "instanceof",
        }
    }
}

/// Logical expression.
#[derive(Debug, Clone)]
pub struct LogicalExpr {
    pub operator: LogicalOp,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub span: Span,
}

/// Logical operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,     // &&
    Or,      // ||
    Nullish, // ??
}

/// Conditional expression.
#[derive(Debug, Clone)]
pub struct ConditionalExpr {
    pub test: Box<Expression>,
    pub consequent: Box<Expression>,
    pub alternate: Box<Expression>,
    pub span: Span,
}

/// Assignment expression.
#[derive(Debug, Clone)]
pub struct AssignmentExpr {
    pub operator: AssignmentOp,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub span: Span,
}

/// Assignment operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOp {
    Assign,                   // =
    AddAssign,                // +=
    SubAssign,                // -=
    MulAssign,                // *=
    DivAssign,                // /=
    ModAssign,                // %=
    ExpAssign,                // **=
    LeftShiftAssign,          // <<=
    RightShiftAssign,         // >>=
    UnsignedRightShiftAssign, // >>>=
    BitAndAssign,             // &=
    BitOrAssign,              // |=
    BitXorAssign,             // ^=
    AndAssign,                // &&=
    OrAssign,                 // ||=
    NullishAssign,            // ??=
}

/// Sequence expression.
#[derive(Debug, Clone)]
pub struct SequenceExpr {
    pub expressions: Vec<Expression>,
    pub span: Span,
}

/// Parenthesized expression.
#[derive(Debug, Clone)]
pub struct ParenExpr {
    pub expression: Box<Expression>,
    pub span: Span,
}

/// Spread element.
#[derive(Debug, Clone)]
pub struct SpreadElement {
    pub argument: Box<Expression>,
    pub span: Span,
}

/// Yield expression.
#[derive(Debug, Clone)]
pub struct YieldExpr {
    pub argument: Option<Box<Expression>>,
    pub delegate: bool,
    pub span: Span,
}

/// Await expression.
#[derive(Debug, Clone)]
pub struct AwaitExpr {
    pub argument: Box<Expression>,
    pub span: Span,
}

/// Dynamic `import(source)`.
#[derive(Debug, Clone)]
pub struct ImportExpr {
    pub source: Box<Expression>,
    pub span: Span,
}

/// Optional chain expression (`a?.b.c` as a whole).
#[derive(Debug, Clone)]
pub struct OptionalChainExpr {
    pub expression: Box<Expression>,
    pub span: Span,
}

/// Arrow function parameter.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Plain identifier
    Identifier(Identifier),
    /// Array destructuring; contents are not retained
    Array(Span),
    /// Object destructuring; contents are not retained
    Object(Span),
    /// Parameter with a default value
    Assignment(AssignmentPattern),
    /// Rest element
    Rest(RestElement),
}

impl Pattern {
    /// Source span of the pattern.
    pub fn span(&self) -> Span {
        match self {
            Pattern::Identifier(id) => id.span,
            Pattern::Array(span) | Pattern::Object(span) => *span,
            Pattern::Assignment(p) => p.span,
            Pattern::Rest(r) => r.span,
        }
    }
}

/// Assignment pattern.
#[derive(Debug, Clone)]
pub struct AssignmentPattern {
    pub left: Box<Pattern>,
    pub right: Box<Expression>,
    pub span: Span,
}

/// Rest element.
#[derive(Debug, Clone)]
pub struct RestElement {
    pub argument: Box<Pattern>,
    pub span: Span,
}
