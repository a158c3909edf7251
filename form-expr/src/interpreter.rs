//! Expression interpreter.
//!
//! Tree-walking evaluator over the expression AST. Every node kind is matched
//! explicitly: the supported subset is evaluated, everything else is rejected
//! with [`EvalError::UnsupportedNodeType`]. Method calls go through the
//! safe-method table in [`crate::builtin`].

use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::mem;

use libm::fabs;

use crate::ast::*;
use crate::builtin;
use crate::context::Context;
use crate::error::{EvalError, EvalResult};
use crate::object::{ArrowFunction, BoundMethod, Callable, JsObject, PropertyKey};
use crate::value::{number_to_string, string_to_number, to_int32, to_uint32, Value};

/// Default maximum evaluation nesting.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Expression interpreter.
pub struct Interpreter {
    /// Scope identifiers resolve against.
    scope: Context,
    /// Current nesting depth.
    depth: usize,
    /// Maximum nesting depth.
    max_depth: usize,
}

impl Interpreter {
    /// Create an interpreter over a context.
    pub fn new(scope: Context) -> Self {
        Interpreter {
            scope,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the maximum evaluation nesting.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// The current scope.
    pub fn scope(&self) -> &Context {
        &self.scope
    }

    /// Evaluate a program's single expression.
    pub fn run(&mut self, program: &Program) -> EvalResult<Value> {
        self.evaluate(program.expression())
    }

    /// Evaluate an expression.
    pub fn evaluate(&mut self, expr: &Expression) -> EvalResult<Value> {
        if self.depth >= self.max_depth {
            return Err(EvalError::DepthExceeded(self.max_depth));
        }
        self.depth += 1;
        let result = self.evaluate_node(expr);
        self.depth -= 1;
        result
    }

    fn evaluate_node(&mut self, expr: &Expression) -> EvalResult<Value> {
        match expr {
            Expression::Identifier(id) => Ok(self.scope.lookup(&id.name)),
            Expression::Literal(lit) => self.evaluate_literal(lit),
            Expression::Array(arr) => self.evaluate_array(arr),
            Expression::Object(obj) => self.evaluate_object(obj),
            Expression::Arrow(arrow) => self.evaluate_arrow(arrow),
            Expression::Template(template) => self.evaluate_template(template),
            Expression::Member(member) => self.evaluate_member(member),
            Expression::Call(call) => self.evaluate_call(call),
            Expression::Unary(unary) => self.evaluate_unary(unary),
            Expression::Binary(binary) => self.evaluate_binary(binary),
            Expression::Logical(logical) => self.evaluate_logical(logical),
            Expression::Conditional(cond) => self.evaluate_conditional(cond),
            Expression::Sequence(seq) => self.evaluate_sequence(seq),
            Expression::Paren(paren) => self.evaluate(&paren.expression),
            Expression::This(_)
            | Expression::Super(_)
            | Expression::PrivateName(_)
            | Expression::Function(_)
            | Expression::Class(_)
            | Expression::TaggedTemplate(_)
            | Expression::New(_)
            | Expression::Update(_)
            | Expression::Assignment(_)
            | Expression::Spread(_)
            | Expression::Yield(_)
            | Expression::Await(_)
            | Expression::Import(_)
            | Expression::OptionalChain(_) => Err(unsupported(expr)),
        }
    }

    /// Evaluate a literal.
    fn evaluate_literal(&mut self, lit: &Literal) -> EvalResult<Value> {
        match lit {
            Literal::Null(_) => Ok(Value::Null),
            Literal::Boolean(b, _) => Ok(Value::Boolean(*b)),
            Literal::Number(n, _) => Ok(Value::Number(*n)),
            Literal::String(s) => Ok(Value::String(s.value.clone())),
            Literal::BigInt(..) => Err(EvalError::unsupported_node(
                "BigInt literals are not supported",
            )),
        }
    }

    /// Evaluate an array literal.
    fn evaluate_array(&mut self, arr: &ArrayExpr) -> EvalResult<Value> {
        let mut items = Vec::with_capacity(arr.elements.len());

        for element in &arr.elements {
            match element {
                None => items.push(Value::Undefined),
                Some(Expression::Spread(spread)) => match self.evaluate(&spread.argument)? {
                    Value::Array(source) => items.extend(source.iter().cloned()),
                    other => return Err(spread_error(&other)),
                },
                Some(expr) => items.push(self.evaluate(expr)?),
            }
        }

        Ok(Value::from(items))
    }

    /// Evaluate an object literal.
    fn evaluate_object(&mut self, obj_expr: &ObjectExpr) -> EvalResult<Value> {
        let mut obj = JsObject::new();

        for prop in &obj_expr.properties {
            match prop {
                ObjectProperty::Property {
                    key,
                    value,
                    computed,
                    ..
                } => {
                    let key = if *computed {
                        self.evaluate(key)?.to_js_string()
                    } else {
                        static_property_name(key)?
                    };
                    let value = self.evaluate(value)?;
                    obj.set(key, value);
                }
                ObjectProperty::Method { kind, .. } => {
                    let what = match kind {
                        MethodKind::Method => "methods",
                        MethodKind::Get => "getters",
                        MethodKind::Set => "setters",
                    };
                    return Err(EvalError::unsupported_node(format!(
                        "Object {} are not supported",
                        what
                    )));
                }
                ObjectProperty::Spread(spread) => match self.evaluate(&spread.argument)? {
                    Value::Object(source) => {
                        for (key, value) in source.iter() {
                            obj.set(key, value.clone());
                        }
                    }
                    Value::Array(source) => {
                        for (index, value) in source.iter().enumerate() {
                            obj.set(index.to_string(), value.clone());
                        }
                    }
                    Value::String(s) => {
                        for (index, ch) in s.chars().enumerate() {
                            obj.set(index.to_string(), Value::String(ch.to_string()));
                        }
                    }
                    _ => {}
                },
            }
        }

        Ok(Value::object(obj))
    }

    /// Evaluate an arrow function into a callable.
    fn evaluate_arrow(&mut self, arrow: &ArrowFunctionExpr) -> EvalResult<Value> {
        if arrow.is_async {
            return Err(EvalError::unsupported_node(
                "Async arrow functions are not supported",
            ));
        }

        let body = match &arrow.body {
            ArrowFunctionBody::Expression(body) => body,
            ArrowFunctionBody::Block(_) => {
                return Err(EvalError::UnsupportedArrowBody(String::from(
                    "Arrow functions with a block body are not supported",
                )))
            }
        };

        match body.unparenthesized() {
            Expression::Member(_)
            | Expression::Call(_)
            | Expression::Binary(_)
            | Expression::Logical(_)
            | Expression::Identifier(_)
            | Expression::Template(_) => {}
            other => {
                return Err(EvalError::UnsupportedArrowBody(format!(
                    "{} is not supported as an arrow function body",
                    other.node_type()
                )))
            }
        }

        let params = arrow
            .params
            .iter()
            .map(|param| match param {
                Pattern::Identifier(id) => Ok(id.name.clone()),
                Pattern::Rest(_) => Err(parameter_error("Rest parameters")),
                Pattern::Assignment(_) => Err(parameter_error("Default parameters")),
                Pattern::Array(_) | Pattern::Object(_) => {
                    Err(parameter_error("Destructuring parameters"))
                }
            })
            .collect::<EvalResult<Vec<_>>>()?;

        Ok(Value::Function(Rc::new(Callable::Arrow(ArrowFunction {
            params,
            body: Arc::clone(body),
            scope: self.scope.clone(),
        }))))
    }

    /// Evaluate a template literal.
    fn evaluate_template(&mut self, template: &TemplateLiteral) -> EvalResult<Value> {
        let mut result = String::new();

        for (i, quasi) in template.quasis.iter().enumerate() {
            result.push_str(quasi);
            if let Some(expr) = template.expressions.get(i) {
                result.push_str(&self.evaluate(expr)?.to_js_string());
            }
        }

        Ok(Value::String(result))
    }

    /// Evaluate a member expression.
    fn evaluate_member(&mut self, member: &MemberExpr) -> EvalResult<Value> {
        let object = self.evaluate(&member.object)?;
        if object.is_nullish() {
            return Err(nullish_error(&object, member));
        }

        let key = self.member_key(member)?;
        self.get_property(&object, &key)
    }

    /// Resolve the property key of a member expression.
    fn member_key(&mut self, member: &MemberExpr) -> EvalResult<PropertyKey> {
        if member.computed {
            match self.evaluate(&member.property)? {
                Value::String(s) => Ok(PropertyKey::String(s)),
                Value::Number(n) => Ok(PropertyKey::Number(n)),
                other => Err(EvalError::accessor(format!(
                    "Property key must be a string or number, got {}",
                    other.kind_name()
                ))),
            }
        } else {
            match member.property.as_ref() {
                Expression::Identifier(id) => Ok(PropertyKey::String(id.name.clone())),
                other => Err(unsupported(other)),
            }
        }
    }

    /// Read a property from a non-nullish value.
    fn get_property(&self, object: &Value, key: &PropertyKey) -> EvalResult<Value> {
        match object {
            Value::Object(obj) => Ok(obj.get(&key.to_key_string()).cloned().unwrap_or_default()),
            Value::Array(items) => {
                if key.is("length") {
                    return Ok(Value::from(items.len()));
                }
                if let Some(index) = key.as_index() {
                    return Ok(items.get(index).cloned().unwrap_or_default());
                }
                Ok(bound_method(object, key).unwrap_or_default())
            }
            Value::String(s) => {
                if key.is("length") {
                    return Ok(Value::from(s.chars().count()));
                }
                if let Some(index) = key.as_index() {
                    return Ok(s
                        .chars()
                        .nth(index)
                        .map(|ch| Value::String(ch.to_string()))
                        .unwrap_or_default());
                }
                bound_method(object, key).ok_or_else(|| inaccessible(object, key))
            }
            _ => Err(inaccessible(object, key)),
        }
    }

    /// Evaluate a call expression. Only method calls are supported.
    fn evaluate_call(&mut self, call: &CallExpr) -> EvalResult<Value> {
        let member = match call.callee.unparenthesized() {
            Expression::Member(member) => member,
            other => {
                return Err(EvalError::unsupported_node(format!(
                    "Calling a {} is not supported; only method calls are allowed",
                    other.node_type()
                )))
            }
        };

        let receiver = self.evaluate(&member.object)?;
        if receiver.is_nullish() {
            return Err(nullish_error(&receiver, member));
        }
        let name = self.member_key(member)?.to_key_string();

        // Resolve the target before any argument is evaluated
        let target = match &receiver {
            Value::Object(obj) => match obj.get(&name) {
                Some(func @ Value::Function(_)) => MethodTarget::Function(func.clone()),
                Some(other) => {
                    return Err(EvalError::method(format!(
                        "Property '{}' is a {}, not a function",
                        name,
                        other.kind_name()
                    )))
                }
                None => {
                    return Err(EvalError::method(format!(
                        "Method '{}' does not exist on object",
                        name
                    )))
                }
            },
            other => match builtin::lookup(other, &name) {
                Some((_, method)) => MethodTarget::Builtin(method),
                None => {
                    return Err(EvalError::method(format!(
                        "Method '{}' is not supported on {}",
                        name,
                        other.kind_name()
                    )))
                }
            },
        };

        let args = self.evaluate_arguments(&call.arguments)?;

        match target {
            MethodTarget::Function(func) => self.call_function(&func, &receiver, &args),
            MethodTarget::Builtin(method) => method(self, &receiver, &args),
        }
    }

    /// Evaluate call arguments left to right, expanding spreads.
    fn evaluate_arguments(&mut self, arguments: &[Expression]) -> EvalResult<Vec<Value>> {
        let mut args = Vec::with_capacity(arguments.len());

        for arg in arguments {
            if let Expression::Spread(spread) = arg {
                match self.evaluate(&spread.argument)? {
                    Value::Array(items) => args.extend(items.iter().cloned()),
                    other => return Err(spread_error(&other)),
                }
            } else {
                args.push(self.evaluate(arg)?);
            }
        }

        Ok(args)
    }

    /// Call a function value.
    pub fn call_function(
        &mut self,
        func: &Value,
        this_value: &Value,
        args: &[Value],
    ) -> EvalResult<Value> {
        let callable = match func {
            Value::Function(callable) => Rc::clone(callable),
            other => {
                return Err(EvalError::operand(format!(
                    "{} is not a function",
                    other.kind_name()
                )))
            }
        };

        if self.depth >= self.max_depth {
            return Err(EvalError::DepthExceeded(self.max_depth));
        }
        self.depth += 1;
        let result = self.call_callable(&callable, this_value, args);
        self.depth -= 1;
        result
    }

    /// Call a callable.
    fn call_callable(
        &mut self,
        callable: &Callable,
        this_value: &Value,
        args: &[Value],
    ) -> EvalResult<Value> {
        match callable {
            Callable::Native(native) => (native.func)(this_value, args),
            Callable::Method(method) => {
                builtin::call_method(self, &method.receiver, method.name, args)
            }
            Callable::Arrow(arrow) => self.call_arrow(arrow, args),
        }
    }

    /// Call an arrow function: bind parameters into a fresh copy of the
    /// captured scope and evaluate the body there.
    fn call_arrow(&mut self, arrow: &ArrowFunction, args: &[Value]) -> EvalResult<Value> {
        let bindings = arrow
            .params
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), args.get(i).cloned().unwrap_or_default()));
        let scope = arrow.scope.extend(bindings);

        let saved = mem::replace(&mut self.scope, scope);
        let result = self.evaluate(&arrow.body);
        self.scope = saved;
        result
    }

    /// Evaluate a unary expression.
    fn evaluate_unary(&mut self, unary: &UnaryExpr) -> EvalResult<Value> {
        if unary.operator == UnaryOp::Delete {
            return Err(EvalError::unsupported_operator(
                "Operator 'delete' is not supported",
            ));
        }

        let value = self.evaluate(&unary.argument)?;

        match unary.operator {
            UnaryOp::Minus => Ok(Value::Number(-number_operand(&value, "-")?)),
            UnaryOp::Plus => match &value {
                Value::Number(n) => Ok(Value::Number(*n)),
                Value::String(s) => string_to_number(s).map(Value::Number).ok_or_else(|| {
                    EvalError::operand(format!("Cannot convert {:?} to a number", s))
                }),
                other => Err(operand_error("+", other)),
            },
            UnaryOp::Not => Ok(Value::Boolean(!value.to_boolean())),
            UnaryOp::BitNot => Ok(Value::Number(!to_int32(number_operand(&value, "~")?) as f64)),
            UnaryOp::Typeof => Ok(Value::string(value.type_of())),
            UnaryOp::Void => Ok(Value::Undefined),
            UnaryOp::Delete => Err(EvalError::unsupported_operator(
                "Operator 'delete' is not supported",
            )),
        }
    }

    /// Evaluate a binary expression.
    fn evaluate_binary(&mut self, binary: &BinaryExpr) -> EvalResult<Value> {
        let op = binary.operator;
        if op == BinaryOp::Instanceof {
            return Err(EvalError::unsupported_operator(
                "Operator 'instanceof' is not supported",
            ));
        }

        let left = self.evaluate(&binary.left)?;
        let right = self.evaluate(&binary.right)?;

        match op {
            BinaryOp::Add => match (&left, &right) {
                (Value::String(_), _) | (_, Value::String(_)) => {
                    let mut s = left.to_js_string();
                    s.push_str(&right.to_js_string());
                    Ok(Value::String(s))
                }
                (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
                _ => Err(operands_error(op, &left, &right)),
            },
            BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Mod
            | BinaryOp::Exp => {
                let (l, r) = numeric_operands(op, &left, &right)?;
                match op {
                    BinaryOp::Sub => Ok(Value::Number(l - r)),
                    BinaryOp::Mul => Ok(Value::Number(l * r)),
                    BinaryOp::Div if r == 0.0 => Err(EvalError::DivisionByZero(format!(
                        "Division by zero: {} / {}",
                        number_to_string(l),
                        number_to_string(r)
                    ))),
                    BinaryOp::Div => Ok(Value::Number(l / r)),
                    BinaryOp::Mod if r == 0.0 => Err(EvalError::ModuloByZero(format!(
                        "Modulo by zero: {} % {}",
                        number_to_string(l),
                        number_to_string(r)
                    ))),
                    BinaryOp::Mod => Ok(Value::Number(l % r)),
                    _ => Ok(Value::Number(js_pow(l, r))),
                }
            }
            BinaryOp::Equal => Ok(Value::Boolean(left.loose_equals(&right))),
            BinaryOp::NotEqual => Ok(Value::Boolean(!left.loose_equals(&right))),
            BinaryOp::StrictEqual => Ok(Value::Boolean(left.strict_equals(&right))),
            BinaryOp::StrictNotEqual => Ok(Value::Boolean(!left.strict_equals(&right))),
            BinaryOp::LessThan
            | BinaryOp::LessEqual
            | BinaryOp::GreaterThan
            | BinaryOp::GreaterEqual => {
                let ordering = match (&left, &right) {
                    (Value::Number(l), Value::Number(r)) => l.partial_cmp(r),
                    (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
                    _ => return Err(operands_error(op, &left, &right)),
                };
                // NaN compares false on every relation
                let result = ordering.is_some_and(|ordering| match op {
                    BinaryOp::LessThan => ordering.is_lt(),
                    BinaryOp::LessEqual => ordering.is_le(),
                    BinaryOp::GreaterThan => ordering.is_gt(),
                    _ => ordering.is_ge(),
                });
                Ok(Value::Boolean(result))
            }
            BinaryOp::LeftShift
            | BinaryOp::RightShift
            | BinaryOp::UnsignedRightShift
            | BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor => {
                let (l, r) = numeric_operands(op, &left, &right)?;
                let shift = to_uint32(r) & 0x1f;
                let result = match op {
                    BinaryOp::LeftShift => to_int32(l).wrapping_shl(shift) as f64,
                    BinaryOp::RightShift => (to_int32(l) >> shift) as f64,
                    BinaryOp::UnsignedRightShift => (to_uint32(l) >> shift) as f64,
                    BinaryOp::BitAnd => (to_int32(l) & to_int32(r)) as f64,
                    BinaryOp::BitOr => (to_int32(l) | to_int32(r)) as f64,
                    _ => (to_int32(l) ^ to_int32(r)) as f64,
                };
                Ok(Value::Number(result))
            }
            BinaryOp::In => {
                let key = match &left {
                    Value::String(s) => PropertyKey::String(s.clone()),
                    other => {
                        return Err(EvalError::operand(format!(
                            "Left operand of 'in' must be a string, got {}",
                            other.kind_name()
                        )))
                    }
                };
                match &right {
                    Value::Object(obj) => Ok(Value::Boolean(obj.contains_key(&key.to_key_string()))),
                    Value::Array(items) => Ok(Value::Boolean(
                        key.is("length") || key.as_index().is_some_and(|i| i < items.len()),
                    )),
                    other => Err(EvalError::operand(format!(
                        "Right operand of 'in' must be an object, got {}",
                        other.kind_name()
                    ))),
                }
            }
            BinaryOp::Instanceof => Err(EvalError::unsupported_operator(
                "Operator 'instanceof' is not supported",
            )),
        }
    }

    /// Evaluate a logical expression.
    fn evaluate_logical(&mut self, logical: &LogicalExpr) -> EvalResult<Value> {
        let left = self.evaluate(&logical.left)?;

        match logical.operator {
            LogicalOp::And => {
                if !left.to_boolean() {
                    Ok(left)
                } else {
                    self.evaluate(&logical.right)
                }
            }
            LogicalOp::Or => {
                if left.to_boolean() {
                    Ok(left)
                } else {
                    self.evaluate(&logical.right)
                }
            }
            LogicalOp::Nullish => {
                if left.is_nullish() {
                    self.evaluate(&logical.right)
                } else {
                    Ok(left)
                }
            }
        }
    }

    /// Evaluate a conditional expression. Only the taken branch runs.
    fn evaluate_conditional(&mut self, cond: &ConditionalExpr) -> EvalResult<Value> {
        if self.evaluate(&cond.test)?.to_boolean() {
            self.evaluate(&cond.consequent)
        } else {
            self.evaluate(&cond.alternate)
        }
    }

    /// Evaluate a sequence expression.
    fn evaluate_sequence(&mut self, seq: &SequenceExpr) -> EvalResult<Value> {
        let mut result = Value::Undefined;
        for expr in &seq.expressions {
            result = self.evaluate(expr)?;
        }
        Ok(result)
    }
}

/// Resolved call target.
enum MethodTarget {
    /// Function-valued own property of an object receiver.
    Function(Value),
    /// Entry of the safe-method table.
    Builtin(builtin::Builtin),
}

fn unsupported(expr: &Expression) -> EvalError {
    EvalError::unsupported_node(format!("{} is not supported", expr.node_type()))
}

fn parameter_error(what: &str) -> EvalError {
    EvalError::UnsupportedArrowParameter(format!(
        "{} are not supported in arrow functions; use plain identifiers",
        what
    ))
}

fn spread_error(value: &Value) -> EvalError {
    EvalError::SpreadOfNonArray(format!(
        "Cannot spread {}; only arrays can be spread",
        value.kind_name()
    ))
}

fn nullish_error(object: &Value, member: &MemberExpr) -> EvalError {
    match (member.computed, member.property.as_ref()) {
        (false, Expression::Identifier(id)) => EvalError::nullish(format!(
            "Cannot read properties of {} (reading '{}')",
            object.kind_name(),
            id.name
        )),
        _ => EvalError::nullish(format!(
            "Cannot read properties of {}",
            object.kind_name()
        )),
    }
}

fn inaccessible(object: &Value, key: &PropertyKey) -> EvalError {
    EvalError::accessor(format!(
        "Property '{}' is not accessible on {}",
        key,
        object.kind_name()
    ))
}

fn operand_error(op: &str, value: &Value) -> EvalError {
    EvalError::operand(format!(
        "Operator '{}' requires a number, got {}",
        op,
        value.kind_name()
    ))
}

fn operands_error(op: BinaryOp, left: &Value, right: &Value) -> EvalError {
    EvalError::operand(format!(
        "Invalid operand types for '{}': {} and {}",
        op.as_str(),
        left.kind_name(),
        right.kind_name()
    ))
}

fn number_operand(value: &Value, op: &str) -> EvalResult<f64> {
    value.as_number().ok_or_else(|| operand_error(op, value))
}

fn numeric_operands(op: BinaryOp, left: &Value, right: &Value) -> EvalResult<(f64, f64)> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => Ok((*l, *r)),
        _ => Err(operands_error(op, left, right)),
    }
}

/// Read a safe method as a bound function value.
fn bound_method(receiver: &Value, key: &PropertyKey) -> Option<Value> {
    let PropertyKey::String(name) = key else {
        return None;
    };
    let (name, _) = builtin::lookup(receiver, name)?;
    Some(Value::Function(Rc::new(Callable::Method(BoundMethod {
        receiver: receiver.clone(),
        name,
    }))))
}

/// Key of a non-computed object literal property.
fn static_property_name(key: &Expression) -> EvalResult<String> {
    match key {
        Expression::Identifier(id) => Ok(id.name.clone()),
        Expression::Literal(Literal::String(s)) => Ok(s.value.clone()),
        Expression::Literal(Literal::Number(n, _)) => Ok(number_to_string(*n)),
        Expression::Literal(Literal::BigInt(..)) => Err(EvalError::unsupported_node(
            "BigInt literals are not supported",
        )),
        other => Err(unsupported(other)),
    }
}

/// Exponentiation with ECMAScript edge cases.
fn js_pow(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() || (fabs(base) == 1.0 && exponent.is_infinite()) {
        return f64::NAN;
    }
    libm::pow(base, exponent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn eval_in(source: &str, ctx: Context) -> EvalResult<Value> {
        let program = parse(source).unwrap();
        Interpreter::new(ctx).run(&program)
    }

    fn eval(source: &str) -> EvalResult<Value> {
        eval_in(source, Context::new())
    }

    #[test]
    fn test_literals() {
        assert_eq!(eval("42").unwrap(), Value::from(42));
        assert_eq!(eval("'hi'").unwrap(), Value::from("hi"));
        assert_eq!(eval("true").unwrap(), Value::from(true));
        assert_eq!(eval("null").unwrap(), Value::Null);
        assert!(matches!(
            eval("10n").unwrap_err(),
            EvalError::UnsupportedNodeType(_)
        ));
    }

    #[test]
    fn test_identifier_lookup() {
        let ctx = Context::new().with("a", 1);
        assert_eq!(eval_in("a", ctx.clone()).unwrap(), Value::from(1));
        assert_eq!(eval_in("missing", ctx).unwrap(), Value::Undefined);
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), Value::from(7));
        assert_eq!(eval("(1 + 2) * 3").unwrap(), Value::from(9));
        assert_eq!(eval("7 % 4").unwrap(), Value::from(3));
        assert_eq!(eval("2 ** 3 ** 2").unwrap(), Value::from(512));
        assert_eq!(eval("10 / 4").unwrap(), Value::from(2.5));
        assert_eq!(eval("'a' + 1").unwrap(), Value::from("a1"));
        assert_eq!(eval("1 + 'a'").unwrap(), Value::from("1a"));
        assert_eq!(eval("'n: ' + null").unwrap(), Value::from("n: null"));
    }

    #[test]
    fn test_arithmetic_operand_types() {
        assert!(matches!(eval("'a' - 1").unwrap_err(), EvalError::InvalidOperandType(_)));
        assert!(matches!(eval("true + 1").unwrap_err(), EvalError::InvalidOperandType(_)));
        assert!(matches!(eval("null * 2").unwrap_err(), EvalError::InvalidOperandType(_)));
    }

    #[test]
    fn test_division_by_zero() {
        assert!(matches!(eval("1 / 0").unwrap_err(), EvalError::DivisionByZero(_)));
        assert!(matches!(eval("1 / -0").unwrap_err(), EvalError::DivisionByZero(_)));
        assert!(matches!(eval("1 % 0").unwrap_err(), EvalError::ModuloByZero(_)));
    }

    #[test]
    fn test_exponent_edge_cases() {
        let ctx = Context::new().with("inf", f64::INFINITY).with("nan", f64::NAN);
        assert!(eval_in("1 ** inf", ctx.clone()).unwrap().as_number().unwrap().is_nan());
        assert_eq!(eval_in("nan ** 0", ctx).unwrap(), Value::from(1));
    }

    #[test]
    fn test_relational() {
        assert_eq!(eval("1 < 2").unwrap(), Value::from(true));
        assert_eq!(eval("'b' > 'a'").unwrap(), Value::from(true));
        assert_eq!(eval("2 <= 2").unwrap(), Value::from(true));
        assert!(matches!(eval("1 < '2'").unwrap_err(), EvalError::InvalidOperandType(_)));
        let ctx = Context::new().with("nan", f64::NAN);
        assert_eq!(eval_in("nan >= 0", ctx).unwrap(), Value::from(false));
    }

    #[test]
    fn test_equality() {
        assert_eq!(eval("1 == '1'").unwrap(), Value::from(true));
        assert_eq!(eval("1 === '1'").unwrap(), Value::from(false));
        assert_eq!(eval("null == undefined").unwrap(), Value::from(true));
        assert_eq!(eval("null !== undefined").unwrap(), Value::from(true));
    }

    #[test]
    fn test_bitwise() {
        assert_eq!(eval("5 & 3").unwrap(), Value::from(1));
        assert_eq!(eval("5 | 3").unwrap(), Value::from(7));
        assert_eq!(eval("5 ^ 3").unwrap(), Value::from(6));
        assert_eq!(eval("1 << 33").unwrap(), Value::from(2));
        assert_eq!(eval("-8 >> 1").unwrap(), Value::from(-4));
        assert_eq!(eval("-1 >>> 28").unwrap(), Value::from(15));
        assert_eq!(eval("~5").unwrap(), Value::from(-6));
        assert!(matches!(eval("'1' | 0").unwrap_err(), EvalError::InvalidOperandType(_)));
    }

    #[test]
    fn test_in_operator() {
        let ctx = Context::new()
            .with("obj", Value::object([("k", Value::from(1))].into_iter().collect()))
            .with("arr", Value::array([Value::from(1)]));
        assert_eq!(eval_in("'k' in obj", ctx.clone()).unwrap(), Value::from(true));
        assert_eq!(eval_in("'z' in obj", ctx.clone()).unwrap(), Value::from(false));
        assert_eq!(eval_in("'0' in arr", ctx.clone()).unwrap(), Value::from(true));
        assert!(matches!(eval_in("1 in obj", ctx.clone()).unwrap_err(), EvalError::InvalidOperandType(_)));
        assert!(matches!(eval_in("'k' in 'str'", ctx).unwrap_err(), EvalError::InvalidOperandType(_)));
    }

    #[test]
    fn test_unary() {
        assert_eq!(eval("-(3)").unwrap(), Value::from(-3));
        assert_eq!(eval("+'42'").unwrap(), Value::from(42));
        assert!(matches!(eval("+'abc'").unwrap_err(), EvalError::InvalidOperandType(_)));
        assert!(matches!(eval("-'1'").unwrap_err(), EvalError::InvalidOperandType(_)));
        assert!(matches!(eval("+true").unwrap_err(), EvalError::InvalidOperandType(_)));
        assert_eq!(eval("!0").unwrap(), Value::from(true));
        assert_eq!(eval("typeof null").unwrap(), Value::from("object"));
        assert_eq!(eval("typeof missing").unwrap(), Value::from("undefined"));
        assert_eq!(eval("void 1").unwrap(), Value::Undefined);
        assert!(matches!(eval("delete a.b").unwrap_err(), EvalError::UnsupportedOperator(_)));
    }

    #[test]
    fn test_instanceof_unsupported() {
        assert!(matches!(eval("a instanceof b").unwrap_err(), EvalError::UnsupportedOperator(_)));
    }

    #[test]
    fn test_logical() {
        assert_eq!(eval("0 || 'x'").unwrap(), Value::from("x"));
        assert_eq!(eval("1 && 2").unwrap(), Value::from(2));
        assert_eq!(eval("'' && missing.prop").unwrap(), Value::from(""));
        assert_eq!(eval("false ?? 1").unwrap(), Value::from(false));
        assert_eq!(eval("null ?? 1").unwrap(), Value::from(1));
    }

    #[test]
    fn test_sequence_and_template() {
        assert_eq!(eval("(1, 2, 3)").unwrap(), Value::from(3));
        let ctx = Context::new().with("n", 2);
        assert_eq!(eval_in("`${n} of ${n + 1}`", ctx).unwrap(), Value::from("2 of 3"));
    }

    #[test]
    fn test_array_literal() {
        assert_eq!(
            eval("[1, , 2]").unwrap(),
            Value::array([Value::from(1), Value::Undefined, Value::from(2)])
        );
        let ctx = Context::new().with("xs", Value::array([Value::from(2), Value::from(3)]));
        assert_eq!(
            eval_in("[1, ...xs]", ctx).unwrap(),
            Value::array([1, 2, 3].map(Value::from))
        );
        assert!(matches!(eval("[...'ab']").unwrap_err(), EvalError::SpreadOfNonArray(_)));
    }

    #[test]
    fn test_object_literal() {
        let ctx = Context::new().with("k", "dyn").with("v", 5);
        let value = eval_in("({ a: 1, 'b': 2, [k]: 3, v, a: 4 })", ctx).unwrap();
        let obj = value.as_object().unwrap();
        let keys: Vec<&str> = obj.keys().collect();
        assert_eq!(keys, ["a", "b", "dyn", "v"]);
        assert_eq!(obj.get("a"), Some(&Value::from(4)));
        assert_eq!(obj.get("v"), Some(&Value::from(5)));
    }

    #[test]
    fn test_object_spread() {
        let ctx = Context::new().with(
            "base",
            Value::object([("a", Value::from(1))].into_iter().collect()),
        );
        let value = eval_in("({ ...base, b: 2, ...null })", ctx).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.get("a"), Some(&Value::from(1)));
        assert_eq!(obj.len(), 2);
    }

    #[test]
    fn test_object_methods_rejected() {
        assert!(matches!(eval("({ f() {} })").unwrap_err(), EvalError::UnsupportedNodeType(_)));
        assert!(matches!(eval("({ get x() { return 1 } })").unwrap_err(), EvalError::UnsupportedNodeType(_)));
    }

    #[test]
    fn test_member_access() {
        let ctx = Context::new()
            .with("s", "héllo")
            .with("arr", Value::array([Value::from(10), Value::from(20)]));
        assert_eq!(eval_in("s.length", ctx.clone()).unwrap(), Value::from(5));
        assert_eq!(eval_in("s[1]", ctx.clone()).unwrap(), Value::from("é"));
        assert_eq!(eval_in("arr.length", ctx.clone()).unwrap(), Value::from(2));
        assert_eq!(eval_in("arr[1]", ctx.clone()).unwrap(), Value::from(20));
        assert_eq!(eval_in("arr['1']", ctx.clone()).unwrap(), Value::from(20));
        assert_eq!(eval_in("arr[5]", ctx.clone()).unwrap(), Value::Undefined);
        assert!(eval_in("s.toUpperCase", ctx.clone()).unwrap().is_function());
        assert!(matches!(eval_in("s.constructor", ctx.clone()).unwrap_err(), EvalError::InvalidPropertyAccessor(_)));
        assert!(matches!(eval_in("arr[true]", ctx).unwrap_err(), EvalError::InvalidPropertyAccessor(_)));
    }

    #[test]
    fn test_number_and_boolean_properties() {
        let ctx = Context::new().with("n", 1.5).with("b", true);
        assert!(matches!(eval_in("n.toFixed", ctx.clone()).unwrap_err(), EvalError::InvalidPropertyAccessor(_)));
        assert!(matches!(eval_in("b.x", ctx.clone()).unwrap_err(), EvalError::InvalidPropertyAccessor(_)));
        assert_eq!(eval_in("n.toFixed(0)", ctx.clone()).unwrap(), Value::from("2"));
        assert_eq!(eval_in("b.toString()", ctx).unwrap(), Value::from("true"));
    }

    #[test]
    fn test_nullish_access() {
        let err = eval("missing.prop").unwrap_err();
        assert!(matches!(err, EvalError::NullOrUndefinedAccess(_)));
        assert!(err.message().contains("prop"));
        assert!(matches!(eval("null[0]").unwrap_err(), EvalError::NullOrUndefinedAccess(_)));
    }

    #[test]
    fn test_calls_require_member_callee() {
        let ctx = Context::new().with("f", Value::native("f", 0, |_, _| Ok(Value::from(1))));
        assert!(matches!(eval_in("f()", ctx).unwrap_err(), EvalError::UnsupportedNodeType(_)));
    }

    #[test]
    fn test_object_method_call_receives_this() {
        let obj: JsObject = [
            ("name", Value::from("form")),
            (
                "greet",
                Value::native("greet", 1, |this, args| {
                    let name = this.as_object().and_then(|o| o.get("name")).cloned().unwrap_or_default();
                    Ok(Value::from(alloc::format!("{} {}", args[0].to_js_string(), name.to_js_string())))
                }),
            ),
        ]
        .into_iter()
        .collect();
        let ctx = Context::new().with("obj", obj);
        assert_eq!(eval_in("obj.greet('hello')", ctx.clone()).unwrap(), Value::from("hello form"));
        assert_eq!(eval_in("obj['greet']('hi')", ctx.clone()).unwrap(), Value::from("hi form"));
        assert!(matches!(eval_in("obj.name()", ctx.clone()).unwrap_err(), EvalError::MethodNotAllowed(_)));
        assert!(matches!(eval_in("obj.nope()", ctx).unwrap_err(), EvalError::MethodNotAllowed(_)));
    }

    #[test]
    fn test_method_rejected_before_arguments() {
        let ctx = Context::new().with("s", "x");
        // The argument would raise NullOrUndefinedAccess if it were evaluated
        let err = eval_in("s.constructor(missing.prop)", ctx).unwrap_err();
        assert!(matches!(err, EvalError::MethodNotAllowed(_)));
    }

    #[test]
    fn test_spread_arguments() {
        let ctx = Context::new()
            .with("s", "a")
            .with("parts", Value::array([Value::from("b"), Value::from("c")]));
        assert_eq!(eval_in("s.concat(...parts)", ctx.clone()).unwrap(), Value::from("abc"));
        assert!(matches!(eval_in("s.concat(...s)", ctx).unwrap_err(), EvalError::SpreadOfNonArray(_)));
    }

    #[test]
    fn test_arrow_function_value() {
        let ctx = Context::new().with("arr", Value::array([1, 2, 3].map(Value::from)));
        assert_eq!(
            eval_in("arr.map(x => x * 2)", ctx.clone()).unwrap(),
            Value::array([2, 4, 6].map(Value::from))
        );
        assert_eq!(
            eval_in("arr.map((x, i) => x + i)", ctx).unwrap(),
            Value::array([1, 3, 5].map(Value::from))
        );
        assert!(eval("x => x").unwrap().is_function());
    }

    #[test]
    fn test_arrow_closes_over_scope() {
        let ctx = Context::new()
            .with("factor", 10)
            .with("arr", Value::array([1, 2].map(Value::from)));
        assert_eq!(
            eval_in("arr.map(x => x * factor)", ctx).unwrap(),
            Value::array([10, 20].map(Value::from))
        );
    }

    #[test]
    fn test_arrow_parameter_shadows_and_missing_is_undefined() {
        let ctx = Context::new()
            .with("x", "outer")
            .with("arr", Value::array([Value::from("inner")]));
        assert_eq!(
            eval_in("arr.map(x => x)", ctx.clone()).unwrap(),
            Value::array([Value::from("inner")])
        );
        assert_eq!(eval_in("x", ctx).unwrap(), Value::from("outer"));

        let program = parse("(a, b) => b").unwrap();
        let mut interp = Interpreter::new(Context::new());
        let func = interp.run(&program).unwrap();
        assert_eq!(
            interp.call_function(&func, &Value::Undefined, &[Value::from(1)]).unwrap(),
            Value::Undefined
        );
    }

    #[test]
    fn test_returned_arrow_keeps_its_scope_snapshot() {
        let mut ctx = Context::new().with("factor", 2);
        let program = parse("x => x * factor").unwrap();
        let scale = Interpreter::new(ctx.clone()).run(&program).unwrap();

        ctx.set("factor", 10);
        let mut interp = Interpreter::new(ctx);
        assert_eq!(
            interp.call_function(&scale, &Value::Undefined, &[Value::from(3)]).unwrap(),
            Value::from(6)
        );
    }

    #[test]
    fn test_arrow_body_allowlist() {
        assert!(matches!(eval("x => 1").unwrap_err(), EvalError::UnsupportedArrowBody(_)));
        assert!(matches!(eval("x => x ? 1 : 2").unwrap_err(), EvalError::UnsupportedArrowBody(_)));
        assert!(matches!(eval("x => { return x }").unwrap_err(), EvalError::UnsupportedArrowBody(_)));
        assert!(eval("x => (x.y)").is_ok());
        assert!(eval("x => `${x}`").is_ok());
    }

    #[test]
    fn test_arrow_parameters() {
        assert!(matches!(eval("(...xs) => xs").unwrap_err(), EvalError::UnsupportedArrowParameter(_)));
        assert!(matches!(eval("(x = 1) => x").unwrap_err(), EvalError::UnsupportedArrowParameter(_)));
        assert!(matches!(eval("({ a }) => a").unwrap_err(), EvalError::UnsupportedArrowParameter(_)));
        assert!(matches!(eval("async x => x").unwrap_err(), EvalError::UnsupportedNodeType(_)));
    }

    #[test]
    fn test_unsupported_nodes() {
        for source in [
            "this.x",
            "this",
            "(function () {})",
            "(class A {})",
            "a = 1",
            "a += 1",
            "a++",
            "--a",
            "new Date()",
            "tag`x`",
            "a?.b",
            "import('x')",
        ] {
            let program = parse(source).unwrap();
            let err = Interpreter::new(Context::new()).run(&program).unwrap_err();
            assert!(
                matches!(err, EvalError::UnsupportedNodeType(_)),
                "{} gave {:?}",
                source,
                err
            );
        }
    }

    #[test]
    fn test_depth_limit() {
        let source = alloc::format!("{}1{}", "(".repeat(40), ")".repeat(40));
        let program = parse(&source).unwrap();
        let err = Interpreter::new(Context::new())
            .with_max_depth(16)
            .run(&program)
            .unwrap_err();
        assert_eq!(err, EvalError::DepthExceeded(16));
        assert!(Interpreter::new(Context::new()).run(&program).is_ok());
    }
}
