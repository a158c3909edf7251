//! Expression engine error types.
//!
//! Compilation failures are reported as [`ParseError`]; everything that goes
//! wrong while walking an AST is an [`EvalError`]. Both are raised eagerly and
//! never swallowed inside the engine.

use alloc::string::String;
use core::fmt;

/// Result type for compilation.
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type for evaluation.
pub type EvalResult<T> = Result<T, EvalError>;

/// Result type for the compile-and-evaluate path.
pub type ExprResult<T> = Result<T, ExprError>;

/// Syntax error raised while compiling an expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// The expression source that failed to parse.
    pub source: String,
    /// Parser message.
    pub message: String,
    /// Line number (1-based).
    pub line: usize,
    /// Column number (1-based).
    pub column: usize,
}

impl ParseError {
    /// Create a parse error at a position.
    pub fn new<S: Into<String>>(message: S, line: usize, column: usize) -> Self {
        ParseError {
            source: String::new(),
            message: message.into(),
            line,
            column,
        }
    }

    /// Attach the offending source text.
    pub fn with_source(mut self, source: &str) -> Self {
        self.source = String::from(source);
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SyntaxError: {} ({}:{}) in expression {:?}",
            self.message, self.line, self.column, self.source
        )
    }
}

impl core::error::Error for ParseError {}

/// Evaluation error categories.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// AST node kind outside the evaluator's allowlist.
    UnsupportedNodeType(String),
    /// Operator the evaluator refuses to apply.
    UnsupportedOperator(String),
    /// Operand of the wrong type for an operator or method.
    InvalidOperandType(String),
    /// Property or method access on `null`/`undefined`.
    NullOrUndefinedAccess(String),
    /// Property key of the wrong type, or a property that is not reachable.
    InvalidPropertyAccessor(String),
    /// Division by zero.
    DivisionByZero(String),
    /// Modulo by zero.
    ModuloByZero(String),
    /// Method missing from the safe-method table or not callable.
    MethodNotAllowed(String),
    /// Arrow function body outside the arrow allowlist.
    UnsupportedArrowBody(String),
    /// Arrow parameter that is not a plain identifier.
    UnsupportedArrowParameter(String),
    /// Spread of something that is not an array.
    SpreadOfNonArray(String),
    /// Evaluation nested deeper than the configured limit.
    DepthExceeded(usize),
    /// Error reported by a host-supplied native function.
    Host(String),
}

impl EvalError {
    /// Create an unsupported node error.
    pub fn unsupported_node<S: Into<String>>(kind: S) -> Self {
        EvalError::UnsupportedNodeType(kind.into())
    }

    /// Create an unsupported operator error.
    pub fn unsupported_operator<S: Into<String>>(op: S) -> Self {
        EvalError::UnsupportedOperator(op.into())
    }

    /// Create an operand type error.
    pub fn operand<S: Into<String>>(msg: S) -> Self {
        EvalError::InvalidOperandType(msg.into())
    }

    /// Create a null/undefined access error.
    pub fn nullish<S: Into<String>>(msg: S) -> Self {
        EvalError::NullOrUndefinedAccess(msg.into())
    }

    /// Create a property accessor error.
    pub fn accessor<S: Into<String>>(msg: S) -> Self {
        EvalError::InvalidPropertyAccessor(msg.into())
    }

    /// Create a method-not-allowed error.
    pub fn method<S: Into<String>>(msg: S) -> Self {
        EvalError::MethodNotAllowed(msg.into())
    }

    /// Create a host error.
    pub fn host<S: Into<String>>(msg: S) -> Self {
        EvalError::Host(msg.into())
    }

    /// Get error name.
    pub fn name(&self) -> &'static str {
        match self {
            EvalError::UnsupportedNodeType(_) => "UnsupportedNodeType",
            EvalError::UnsupportedOperator(_) => "UnsupportedOperator",
            EvalError::InvalidOperandType(_) => "InvalidOperandType",
            EvalError::NullOrUndefinedAccess(_) => "NullOrUndefinedAccess",
            EvalError::InvalidPropertyAccessor(_) => "InvalidPropertyAccessor",
            EvalError::DivisionByZero(_) => "DivisionByZero",
            EvalError::ModuloByZero(_) => "ModuloByZero",
            EvalError::MethodNotAllowed(_) => "MethodNotAllowed",
            EvalError::UnsupportedArrowBody(_) => "UnsupportedArrowBody",
            EvalError::UnsupportedArrowParameter(_) => "UnsupportedArrowParameter",
            EvalError::SpreadOfNonArray(_) => "SpreadOfNonArray",
            EvalError::DepthExceeded(_) => "DepthExceeded",
            EvalError::Host(_) => "HostError",
        }
    }

    /// Get error message.
    pub fn message(&self) -> &str {
        match self {
            EvalError::UnsupportedNodeType(msg)
            | EvalError::UnsupportedOperator(msg)
            | EvalError::InvalidOperandType(msg)
            | EvalError::NullOrUndefinedAccess(msg)
            | EvalError::InvalidPropertyAccessor(msg)
            | EvalError::DivisionByZero(msg)
            | EvalError::ModuloByZero(msg)
            | EvalError::MethodNotAllowed(msg)
            | EvalError::UnsupportedArrowBody(msg)
            | EvalError::UnsupportedArrowParameter(msg)
            | EvalError::SpreadOfNonArray(msg)
            | EvalError::Host(msg) => msg,
            EvalError::DepthExceeded(_) => "maximum evaluation depth exceeded",
        }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::DepthExceeded(limit) => {
                write!(f, "{}: {} (limit {})", self.name(), self.message(), limit)
            }
            _ => write!(f, "{}: {}", self.name(), self.message()),
        }
    }
}

impl core::error::Error for EvalError {}

/// Either phase of running an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprError {
    /// Compilation failed.
    Parse(ParseError),
    /// Evaluation failed.
    Eval(EvalError),
}

impl From<ParseError> for ExprError {
    fn from(err: ParseError) -> Self {
        ExprError::Parse(err)
    }
}

impl From<EvalError> for ExprError {
    fn from(err: EvalError) -> Self {
        ExprError::Eval(err)
    }
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprError::Parse(err) => err.fmt(f),
            ExprError::Eval(err) => err.fmt(f),
        }
    }
}

impl core::error::Error for ExprError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            ExprError::Parse(err) => Some(err),
            ExprError::Eval(err) => Some(err),
        }
    }
}
