//! Object and function values.
//!
//! Objects are plain insertion-ordered property bags: no prototypes, no
//! accessors, no descriptors. Functions are either host closures, built-in
//! methods bound to their receiver, or arrow functions closing over the
//! scope they were created in.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;

use crate::ast::Expression;
use crate::context::Context;
use crate::error::EvalResult;
use crate::value::{number_to_string, Value};

/// Property key produced by a member access (string or number).
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyKey {
    /// String key.
    String(String),
    /// Numeric key (`a[0]`).
    Number(f64),
}

impl PropertyKey {
    /// Key as the string used for object lookup.
    pub fn to_key_string(&self) -> String {
        match self {
            PropertyKey::String(s) => s.clone(),
            PropertyKey::Number(n) => number_to_string(*n),
        }
    }

    /// Key as an array/string index, if it is a canonical non-negative integer.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            PropertyKey::Number(n) => {
                if *n >= 0.0 && libm::trunc(*n) == *n && *n < usize::MAX as f64 {
                    Some(*n as usize)
                } else {
                    None
                }
            }
            PropertyKey::String(s) => {
                let canonical = !s.is_empty()
                    && s.bytes().all(|b| b.is_ascii_digit())
                    && (s == "0" || !s.starts_with('0'));
                if canonical {
                    s.parse().ok()
                } else {
                    None
                }
            }
        }
    }

    /// Check for a string key with the given name.
    pub fn is(&self, name: &str) -> bool {
        matches!(self, PropertyKey::String(s) if s == name)
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::String(s.into())
    }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        PropertyKey::String(s)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_key_string())
    }
}

/// A plain object.
///
/// Keys keep their first insertion position; writing an existing key
/// replaces its value in place.
#[derive(Clone, Default)]
pub struct JsObject {
    /// Properties in insertion order.
    properties: Vec<(String, Value)>,
    /// Key to position in `properties`.
    index: HashMap<String, usize>,
}

impl JsObject {
    /// Create an empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a property.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index.get(key).map(|&i| &self.properties[i].1)
    }

    /// Set a property, keeping the original position of an existing key.
    pub fn set<K: Into<String>>(&mut self, key: K, value: Value) {
        let key = key.into();
        match self.index.get(&key) {
            Some(&i) => self.properties[i].1 = value,
            None => {
                self.index.insert(key.clone(), self.properties.len());
                self.properties.push((key, value));
            }
        }
    }

    /// Check for an own property.
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Check if the object has no properties.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Iterate over properties in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Own keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|(k, _)| k.as_str())
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for JsObject {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut obj = JsObject::new();
        for (key, value) in iter {
            obj.set(key, value);
        }
        obj
    }
}

impl PartialEq for JsObject {
    fn eq(&self, other: &Self) -> bool {
        self.properties == other.properties
    }
}

impl fmt::Debug for JsObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Host function signature: receiver and positional arguments.
pub type NativeFn = dyn Fn(&Value, &[Value]) -> EvalResult<Value>;

/// Callable function type.
#[derive(Clone)]
pub enum Callable {
    /// Host-supplied function.
    Native(NativeFunction),
    /// Built-in safe method bound to its receiver (`"abc".toUpperCase`).
    Method(BoundMethod),
    /// Arrow function.
    Arrow(ArrowFunction),
}

impl Callable {
    /// Get function name.
    pub fn name(&self) -> &str {
        match self {
            Callable::Native(f) => &f.name,
            Callable::Method(m) => m.name,
            Callable::Arrow(_) => "",
        }
    }

    /// Get function length (parameter count).
    pub fn length(&self) -> usize {
        match self {
            Callable::Native(f) => f.length,
            Callable::Method(_) => 0,
            Callable::Arrow(a) => a.params.len(),
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Native(native) => f
                .debug_struct("NativeFunction")
                .field("name", &native.name)
                .field("length", &native.length)
                .finish(),
            Callable::Method(method) => f
                .debug_struct("BoundMethod")
                .field("name", &method.name)
                .field("receiver", &method.receiver)
                .finish(),
            Callable::Arrow(arrow) => f
                .debug_struct("ArrowFunction")
                .field("params", &arrow.params)
                .finish(),
        }
    }
}

/// Host-supplied function.
#[derive(Clone)]
pub struct NativeFunction {
    /// Function name.
    pub name: String,
    /// Function length.
    pub length: usize,
    /// Implementation.
    pub func: Rc<NativeFn>,
}

impl NativeFunction {
    /// Wrap a host closure.
    pub fn new<F>(name: impl Into<String>, length: usize, func: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> EvalResult<Value> + 'static,
    {
        NativeFunction {
            name: name.into(),
            length,
            func: Rc::new(func),
        }
    }
}

/// Built-in method bound to the primitive or array it was read from.
#[derive(Clone)]
pub struct BoundMethod {
    /// Receiver the method was read from.
    pub receiver: Value,
    /// Method name, always an entry of the safe-method table.
    pub name: &'static str,
}

/// Arrow function value.
///
/// `scope` is a snapshot of the context the arrow was evaluated in. Each
/// call makes a fresh shallow copy of it with the parameters bound, so one
/// arrow can be invoked any number of times.
///
/// The snapshot is taken when the arrow expression is evaluated. A host that
/// keeps a returned arrow and later calls `set` on its own context handle
/// will not see those changes inside the arrow body; evaluate the expression
/// again to pick them up.
#[derive(Clone)]
pub struct ArrowFunction {
    /// Parameter names.
    pub params: Vec<String>,
    /// Concise body.
    pub body: Arc<Expression>,
    /// Enclosing scope.
    pub scope: Context,
}
