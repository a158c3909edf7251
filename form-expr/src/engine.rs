//! Expression engine: AST cache plus evaluator.

use alloc::sync::Arc;

use crate::ast::Program;
use crate::cache::{AstCache, CacheStats};
use crate::context::Context;
use crate::error::{EvalResult, ExprResult, ParseResult};
use crate::interpreter::{Interpreter, DEFAULT_MAX_DEPTH};
use crate::parser::{self, DEFAULT_MAX_NESTING};
use crate::value::Value;

/// Engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Memoize parsed programs by source text.
    pub cache_enabled: bool,
    /// Maximum evaluation depth. Every node on the path from the root
    /// counts, so a flat operator chain such as `a + a + ... + a` uses one
    /// level per operator.
    pub max_depth: usize,
    /// Maximum syntactic nesting accepted by `compile`: parentheses,
    /// brackets, unary and right-associative operators, conditionals and
    /// template substitutions each add a level. Deeper sources are syntax
    /// errors.
    pub max_nesting: usize,
    /// Maximum number of cached programs; `None` is unbounded.
    pub max_cache_entries: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            cache_enabled: true,
            max_depth: DEFAULT_MAX_DEPTH,
            max_nesting: DEFAULT_MAX_NESTING,
            max_cache_entries: None,
        }
    }
}

/// Expression engine.
pub struct Engine {
    /// Configuration.
    config: EngineConfig,
    /// Parsed programs by source text.
    cache: AstCache,
}

impl Engine {
    /// Create an engine.
    pub fn new(config: EngineConfig) -> Self {
        Engine {
            cache: AstCache::with_max_entries(config.max_cache_entries),
            config,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse an expression, reusing the cached program for source text seen
    /// before. Syntax errors are returned and never cached.
    pub fn compile(&self, source: &str) -> ParseResult<Arc<Program>> {
        if self.config.cache_enabled {
            if let Some(program) = self.cache.get(source) {
                return Ok(program);
            }
        }

        log::debug!("[form-expr] compiling {:?}", source);
        let program = parser::parse_with_max_nesting(source, self.config.max_nesting).map_err(|err| {
            log::warn!("[form-expr] {}", err);
            err
        })?;

        if self.config.cache_enabled {
            Ok(self.cache.insert(source, program))
        } else {
            Ok(Arc::new(program))
        }
    }

    /// Evaluate a program against a context.
    ///
    /// Without a context the result is `null`.
    pub fn evaluate(&self, program: &Program, context: Option<&Context>) -> EvalResult<Value> {
        let Some(context) = context else {
            return Ok(Value::Null);
        };

        Interpreter::new(context.clone())
            .with_max_depth(self.config.max_depth)
            .run(program)
            .map_err(|err| {
                log::debug!("[form-expr] evaluation failed: {}", err);
                err
            })
    }

    /// Compile and evaluate in one step.
    pub fn eval(&self, source: &str, context: Option<&Context>) -> ExprResult<Value> {
        let program = self.compile(source)?;
        Ok(self.evaluate(&program, context)?)
    }

    /// Cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop every cached program.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Process-wide engine behind the crate-level functions.
static DEFAULT_ENGINE: spin::Lazy<Engine> = spin::Lazy::new(Engine::default);

/// The process-wide engine.
pub fn default_engine() -> &'static Engine {
    &DEFAULT_ENGINE
}

#[cfg(test)]
mod tests {
    use alloc::format;

    use super::*;
    use crate::error::{EvalError, ExprError};

    #[test]
    fn test_compile_is_memoized() {
        let engine = Engine::default();
        let a = engine.compile("x + 1").unwrap();
        let b = engine.compile("x + 1").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(engine.cache_stats().entries, 1);
        assert_eq!(engine.cache_stats().hits, 1);
    }

    #[test]
    fn test_parse_errors_are_not_cached() {
        let engine = Engine::default();
        let err = engine.compile("a +").unwrap_err();
        assert_eq!(err.source, "a +");
        assert_eq!(engine.cache_stats().entries, 0);
    }

    #[test]
    fn test_cache_disabled() {
        let engine = Engine::new(EngineConfig {
            cache_enabled: false,
            ..EngineConfig::default()
        });
        let a = engine.compile("x").unwrap();
        let b = engine.compile("x").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(engine.cache_stats().entries, 0);
    }

    #[test]
    fn test_missing_context_is_null() {
        let engine = Engine::default();
        let program = engine.compile("missing.prop").unwrap();
        assert_eq!(engine.evaluate(&program, None).unwrap(), Value::Null);
    }

    #[test]
    fn test_eval_reports_both_phases() {
        let engine = Engine::default();
        let ctx = Context::new();
        assert!(matches!(engine.eval("(", Some(&ctx)), Err(ExprError::Parse(_))));
        assert!(matches!(
            engine.eval("1 / 0", Some(&ctx)),
            Err(ExprError::Eval(EvalError::DivisionByZero(_)))
        ));
    }

    #[test]
    fn test_max_depth_config() {
        let engine = Engine::new(EngineConfig {
            max_depth: 4,
            ..EngineConfig::default()
        });
        let ctx = Context::new();
        assert!(matches!(
            engine.eval("((((((1))))))", Some(&ctx)),
            Err(ExprError::Eval(EvalError::DepthExceeded(4)))
        ));
    }

    #[test]
    fn test_deep_nesting_fails_to_compile() {
        let engine = Engine::default();
        let source = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        let err = engine.compile(&source).unwrap_err();
        assert_eq!(err.message, "Expression nested too deeply");
        assert_eq!(engine.cache_stats().entries, 0);
    }

    #[test]
    fn test_max_nesting_config() {
        let engine = Engine::new(EngineConfig {
            max_nesting: 2,
            ..EngineConfig::default()
        });
        assert!(engine.compile("(1)").is_ok());
        assert!(engine.compile("((1))").is_err());
    }

    #[test]
    fn test_operator_chains_count_toward_max_depth() {
        let engine = Engine::default();
        let ctx = Context::new().with("a", 1);

        let short = format!("a{}", " + a".repeat(DEFAULT_MAX_DEPTH / 2));
        assert!(engine.eval(&short, Some(&ctx)).is_ok());

        let long = format!("a{}", " + a".repeat(DEFAULT_MAX_DEPTH + 50));
        assert!(matches!(
            engine.eval(&long, Some(&ctx)),
            Err(ExprError::Eval(EvalError::DepthExceeded(DEFAULT_MAX_DEPTH)))
        ));
    }

    #[test]
    fn test_clear_cache() {
        let engine = Engine::default();
        engine.compile("a").unwrap();
        engine.clear_cache();
        assert_eq!(engine.cache_stats().entries, 0);
    }
}
