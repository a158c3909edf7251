//! Evaluation context.

use alloc::rc::Rc;
use alloc::string::String;

use crate::object::JsObject;
use crate::value::Value;

/// The mapping of identifier names to values an expression is evaluated
/// against.
///
/// Cloning is cheap; the properties are shared and copied on write, so a
/// context captured by an arrow function is unaffected by later `set` calls
/// on the handle the host kept.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct Context {
    scope: Rc<JsObject>,
}

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.set(key, value);
        self
    }

    /// Insert or replace a binding.
    pub fn set<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        Rc::make_mut(&mut self.scope).set(key, value.into());
    }

    /// Look up a binding.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.scope.get(key)
    }

    /// Look up a binding; absent names are `undefined`.
    pub fn lookup(&self, key: &str) -> Value {
        self.get(key).cloned().unwrap_or(Value::Undefined)
    }

    /// Check for a binding.
    pub fn contains_key(&self, key: &str) -> bool {
        self.scope.contains_key(key)
    }

    /// Shallow copy of this context with extra bindings layered on top.
    pub fn extend<I, K>(&self, bindings: I) -> Context
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut scope = JsObject::clone(&self.scope);
        for (key, value) in bindings {
            scope.set(key, value);
        }
        Context {
            scope: Rc::new(scope),
        }
    }

    /// The underlying properties.
    pub fn as_object(&self) -> &JsObject {
        &self.scope
    }

    /// The context as an object value.
    pub fn to_value(&self) -> Value {
        Value::Object(Rc::clone(&self.scope))
    }

    /// Use an object value as a context. Returns `None` for anything but a
    /// plain object.
    pub fn from_value(value: &Value) -> Option<Context> {
        match value {
            Value::Object(obj) => Some(Context {
                scope: Rc::clone(obj),
            }),
            _ => None,
        }
    }
}

impl From<JsObject> for Context {
    fn from(obj: JsObject) -> Self {
        Context {
            scope: Rc::new(obj),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Context::from(iter.into_iter().collect::<JsObject>())
    }
}
