//! Form expression engine
//!
//! A sandboxed evaluator for the small expression strings that drive dynamic
//! form behaviour: visibility, disabled/readonly state, computed values and
//! dynamic labels. Expressions are parsed once into an AST, cached by their
//! source text, and evaluated against a fresh context on every change.
//!
//! # Architecture
//!
//! - `lexer`, `token`: tokenization of expression source
//! - `parser`, `ast`: precedence-climbing parser over the ES2022 expression
//!   grammar
//! - `interpreter`: node-kind allowlist evaluator
//! - `builtin`: the safe-method table for strings, numbers, booleans and arrays
//! - `value`, `object`, `context`: runtime values and evaluation scopes
//! - `cache`, `engine`: the AST cache and the compile/evaluate entry points
//! - `json`: conversion between form values held as JSON and engine values
//!
//! # Usage
//!
//! ```
//! use form_expr::{compile, evaluate, Context, Value};
//!
//! let program = compile("a + b > 10 ? 'big' : 'small'").unwrap();
//! let ctx = Context::new().with("a", 4).with("b", 9);
//! assert_eq!(evaluate(&program, Some(&ctx)).unwrap(), Value::from("big"));
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod ast;
pub mod builtin;
pub mod cache;
pub mod context;
pub mod engine;
pub mod error;
pub mod interpreter;
pub mod json;
pub mod lexer;
pub mod object;
pub mod parser;
pub mod token;
pub mod value;


use alloc::sync::Arc;

pub use ast::Program;
pub use cache::CacheStats;
pub use context::Context;
pub use engine::{default_engine, Engine, EngineConfig};
pub use error::{EvalError, EvalResult, ExprError, ExprResult, ParseError, ParseResult};
pub use object::{Callable, JsObject, NativeFunction};
pub use value::Value;

/// Engine version.
pub const VERSION: &str = "0.1.0";

/// Parse an expression with the process-wide engine.
pub fn compile(source: &str) -> ParseResult<Arc<Program>> {
    default_engine().compile(source)
}

/// Evaluate a compiled expression with the process-wide engine. Without a
/// context the result is `null`.
pub fn evaluate(program: &Program, context: Option<&Context>) -> EvalResult<Value> {
    default_engine().evaluate(program, context)
}

/// Compile and evaluate in one step.
pub fn eval(source: &str, context: Option<&Context>) -> ExprResult<Value> {
    default_engine().eval(source, context)
}
