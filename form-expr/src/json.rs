//! JSON interop for form values.

use alloc::string::String;

use serde_json::{Map, Number, Value as Json};

use crate::context::Context;
use crate::object::JsObject;
use crate::value::{Value, MAX_SAFE_INTEGER};

impl Value {
    /// Convert a JSON value.
    pub fn from_json(json: &Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Boolean(*b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => Value::array(items.iter().map(Value::from_json)),
            Json::Object(map) => Value::object(object_from_json(map)),
        }
    }

    /// Convert to JSON.
    ///
    /// Non-finite numbers and functions become `null`; `undefined` array
    /// elements become `null` and `undefined` object members are dropped.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Undefined | Value::Null | Value::Function(_) => Json::Null,
            Value::Boolean(b) => Json::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => Json::String(s.clone()),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(obj) => {
                let mut map = Map::new();
                for (key, value) in obj.iter() {
                    if !value.is_undefined() {
                        map.insert(String::from(key), value.to_json());
                    }
                }
                Json::Object(map)
            }
        }
    }
}

impl Context {
    /// Build a context from a JSON object. Other JSON values have no
    /// identifier bindings and give `None`.
    pub fn from_json(json: &Json) -> Option<Context> {
        match json {
            Json::Object(map) => Some(Context::from(object_from_json(map))),
            _ => None,
        }
    }
}

fn object_from_json(map: &Map<String, Json>) -> JsObject {
    map.iter()
        .map(|(key, value)| (key.as_str(), Value::from_json(value)))
        .collect()
}

fn number_to_json(n: f64) -> Json {
    if n.is_finite() && libm::trunc(n) == n && libm::fabs(n) <= MAX_SAFE_INTEGER {
        return Json::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map(Json::Number).unwrap_or(Json::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json() {
        let value = Value::from_json(&json!({
            "name": "Ada",
            "age": 36,
            "tags": ["a", null],
            "active": true
        }));
        let obj = value.as_object().unwrap();
        assert_eq!(obj.get("name"), Some(&Value::from("Ada")));
        assert_eq!(obj.get("age"), Some(&Value::from(36)));
        assert_eq!(
            obj.get("tags"),
            Some(&Value::array([Value::from("a"), Value::Null]))
        );
        assert_eq!(obj.get("active"), Some(&Value::from(true)));
    }

    #[test]
    fn test_to_json() {
        let obj: JsObject = [
            ("n", Value::from(2)),
            ("f", Value::from(0.5)),
            ("inf", Value::from(f64::INFINITY)),
            ("skip", Value::Undefined),
            ("list", Value::array([Value::Undefined, Value::from("x")])),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            Value::from(obj).to_json(),
            json!({ "n": 2, "f": 0.5, "inf": null, "list": [null, "x"] })
        );
    }

    #[test]
    fn test_context_from_json() {
        let ctx = Context::from_json(&json!({ "a": { "b": 1 } })).unwrap();
        assert!(ctx.get("a").unwrap().as_object().is_some());
        assert!(Context::from_json(&json!([1, 2])).is_none());
    }
}
