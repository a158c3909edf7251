//! Expression value types.
//!
//! Implements the runtime values an expression can produce or read from its
//! context, and the ECMAScript conversions the evaluator relies on.

use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::error::EvalResult;
use crate::object::{Callable, JsObject, NativeFunction};

/// Largest integer an `f64` holds exactly.
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A runtime value.
#[derive(Clone, Default)]
pub enum Value {
    /// The undefined value.
    #[default]
    Undefined,
    /// The null value.
    Null,
    /// A boolean value.
    Boolean(bool),
    /// A numeric value.
    Number(f64),
    /// A string value.
    String(String),
    /// An array.
    Array(Rc<Vec<Value>>),
    /// A plain object.
    Object(Rc<JsObject>),
    /// A function.
    Function(Rc<Callable>),
}

impl Value {
    /// Create a string.
    pub fn string<S: Into<String>>(s: S) -> Self {
        Value::String(s.into())
    }

    /// Create an array.
    pub fn array<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Value::Array(Rc::new(items.into_iter().collect()))
    }

    /// Create an object.
    pub fn object(obj: JsObject) -> Self {
        Value::Object(Rc::new(obj))
    }

    /// Create a host function value.
    pub fn native<F>(name: &str, length: usize, func: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> EvalResult<Value> + 'static,
    {
        Value::Function(Rc::new(Callable::Native(NativeFunction::new(
            name, length, func,
        ))))
    }

    /// Check if value is undefined.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Check if value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if value is nullish (undefined or null).
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Check if value is a function.
    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// Get the number, if this is one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the array elements, if this is an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Get the object, if this is one.
    pub fn as_object(&self) -> Option<&JsObject> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Get the type of value as a string (`typeof`).
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) | Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    /// Short description used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    /// Convert to boolean (ToBoolean).
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) => true,
        }
    }

    /// Convert to number (ToNumber). Unparsable strings become NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s).unwrap_or(f64::NAN),
            Value::Array(_) | Value::Object(_) | Value::Function(_) => {
                Value::String(self.to_js_string()).to_number()
            }
        }
    }

    /// Convert to string (ToString).
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".into(),
            Value::Null => "null".into(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.clone(),
            Value::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|item| {
                        if item.is_nullish() {
                            String::new()
                        } else {
                            item.to_js_string()
                        }
                    })
                    .collect();
                parts.join(",")
            }
            Value::Object(_) => "[object Object]".into(),
            Value::Function(f) => format!("function {}() {{ [native code] }}", f.name()),
        }
    }

    /// Strict equality (===).
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// SameValueZero (`includes`): like `===` but NaN equals NaN.
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.strict_equals(other),
        }
    }

    /// Abstract equality (==).
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
            (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
            (Value::Number(a), Value::String(_)) => *a == other.to_number(),
            (Value::String(_), Value::Number(b)) => self.to_number() == *b,
            (Value::Boolean(_), _) => Value::Number(self.to_number()).loose_equals(other),
            (_, Value::Boolean(_)) => self.loose_equals(&Value::Number(other.to_number())),
            (
                Value::Array(_) | Value::Object(_) | Value::Function(_),
                Value::Number(_) | Value::String(_),
            ) => Value::String(self.to_js_string()).loose_equals(other),
            (
                Value::Number(_) | Value::String(_),
                Value::Array(_) | Value::Object(_) | Value::Function(_),
            ) => self.loose_equals(&Value::String(other.to_js_string())),
            _ => self.strict_equals(other),
        }
    }
}

impl PartialEq for Value {
    /// Structural equality for hosts and tests; NaN equals NaN and
    /// functions compare by identity. Expression `==`/`===` semantics live
    /// in [`Value::loose_equals`] and [`Value::strict_equals`].
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", number_to_string(*n)),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Array(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Object(obj) => write!(f, "{:?}", obj),
            Value::Function(func) => write!(f, "{:?}", func),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_js_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(items))
    }
}

impl From<JsObject> for Value {
    fn from(obj: JsObject) -> Self {
        Value::Object(Rc::new(obj))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

// Helper functions

/// Parse a string the way `Number(string)` does. Returns `None` for strings
/// that do not denote a number (where `Number` would yield NaN).
pub fn string_to_number(s: &str) -> Option<f64> {
    let s = s.trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}');

    if s.is_empty() {
        return Some(0.0);
    }

    match s {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }

    let radix = match s.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &s[2..];
        if digits.is_empty() {
            return None;
        }
        let mut result = 0f64;
        for c in digits.chars() {
            result = result * radix as f64 + c.to_digit(radix)? as f64;
        }
        return Some(result);
    }

    // core's float parser also takes "inf"/"nan" spellings, which are not
    // numeric literals here
    let valid = s
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if !valid || !s.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<f64>().ok()
}

/// Convert a number to its ECMAScript string form (`Number::toString`).
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".into();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity".into() } else { "-Infinity".into() };
    }
    if n == 0.0 {
        return "0".into();
    }
    if n < 0.0 {
        return format!("-{}", number_to_string(-n));
    }

    // Shortest round-trip digits and decimal exponent, e.g. "1.2345e3"
    let sci = format!("{:e}", n);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some(parts) => parts,
        None => return sci,
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    let point = exponent + 1;

    if k <= point && point <= 21 {
        let mut s = digits;
        for _ in 0..(point - k) {
            s.push('0');
        }
        s
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{}.{}", int, frac)
    } else if -6 < point && point <= 0 {
        let mut s = String::from("0.");
        for _ in 0..(-point) {
            s.push('0');
        }
        s.push_str(&digits);
        s
    } else {
        let sign = if point - 1 >= 0 { '+' } else { '-' };
        let exp = (point - 1).abs();
        if k == 1 {
            format!("{}e{}{}", digits, sign, exp)
        } else {
            let (first, rest) = digits.split_at(1);
            format!("{}.{}e{}{}", first, rest, sign, exp)
        }
    }
}

/// ToInt32.
pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// ToUint32.
pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    const TWO_32: f64 = 4_294_967_296.0;
    let mut m = libm::fmod(libm::trunc(n), TWO_32);
    if m < 0.0 {
        m += TWO_32;
    }
    m as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_to_string() {
        assert_eq!(number_to_string(42.0), "42");
        assert_eq!(number_to_string(-3.5), "-3.5");
        assert_eq!(number_to_string(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(123456789012345680000.0), "123456789012345680000");
        assert_eq!(number_to_string(0.000001), "0.000001");
        assert_eq!(number_to_string(1e-7), "1e-7");
        assert_eq!(number_to_string(1.5e-10), "1.5e-10");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_string_to_number() {
        assert_eq!(string_to_number(" 42 "), Some(42.0));
        assert_eq!(string_to_number(""), Some(0.0));
        assert_eq!(string_to_number("0x1F"), Some(31.0));
        assert_eq!(string_to_number("1e3"), Some(1000.0));
        assert_eq!(string_to_number("-Infinity"), Some(f64::NEG_INFINITY));
        assert_eq!(string_to_number("12px"), None);
        assert_eq!(string_to_number("inf"), None);
        assert_eq!(string_to_number("NaN"), None);
        assert_eq!(string_to_number("."), None);
    }

    #[test]
    fn test_to_string_of_collections() {
        let arr = Value::array([Value::from(1), Value::Null, Value::from("x")]);
        assert_eq!(arr.to_js_string(), "1,,x");
        assert_eq!(Value::object(JsObject::new()).to_js_string(), "[object Object]");
    }

    #[test]
    fn test_loose_equality() {
        assert!(Value::Null.loose_equals(&Value::Undefined));
        assert!(!Value::Null.loose_equals(&Value::from(0)));
        assert!(Value::from(1).loose_equals(&Value::from("1")));
        assert!(Value::from(true).loose_equals(&Value::from(1)));
        assert!(Value::array([Value::from(1), Value::from(2)]).loose_equals(&Value::from("1,2")));
        assert!(!Value::from(f64::NAN).loose_equals(&Value::from(f64::NAN)));
    }

    #[test]
    fn test_strict_equality_uses_identity_for_collections() {
        let a = Value::array([Value::from(1)]);
        let b = Value::array([Value::from(1)]);
        assert!(a.strict_equals(&a.clone()));
        assert!(!a.strict_equals(&b));
        assert_eq!(a, b);
    }

    #[test]
    fn test_typeof() {
        assert_eq!(Value::Null.type_of(), "object");
        assert_eq!(Value::array([]).type_of(), "object");
        assert_eq!(Value::native("f", 0, |_, _| Ok(Value::Undefined)).type_of(), "function");
    }

    #[test]
    fn test_int32_conversion() {
        assert_eq!(to_int32(4_294_967_297.0), 1);
        assert_eq!(to_int32(-1.0), -1);
        assert_eq!(to_int32(2_147_483_648.0), -2_147_483_648);
        assert_eq!(to_uint32(-1.0), 4_294_967_295);
        assert_eq!(to_int32(f64::NAN), 0);
    }
}
