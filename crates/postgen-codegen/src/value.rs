//! Structured values decoded from request bodies.
//!
//! Bodies arrive as arbitrary JSON. They are converted once into [`Value`], a
//! closed set of kinds, so everything downstream matches exhaustively instead
//! of probing a dynamic type.

use std::collections::BTreeMap;
use std::fmt;

/// A decoded JSON value.
///
/// Object keys are kept in a [`BTreeMap`], so iteration is lexical by key no
/// matter how the source document ordered them.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    List(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

/// The dynamic kind of a [`Value`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Null,
    Bool,
    Number,
    Text,
    List,
    Object,
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Number(_) => Kind::Number,
            Value::Text(_) => Kind::Text,
            Value::List(_) => Kind::List,
            Value::Object(_) => Kind::Object,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Null => "null",
            Kind::Bool => "boolean",
            Kind::Number => "number",
            Kind::Text => "text",
            Kind::List => "array",
            Kind::Object => "object",
        };
        f.write_str(name)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(value: &serde_json::Value) -> Self {
        Value::from(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_every_json_kind() {
        let value = Value::from(json!({
            "n": null,
            "b": true,
            "x": 1.5,
            "s": "hi",
            "l": [1, 2],
            "o": { "k": "v" }
        }));

        let map = value.as_object().unwrap();
        assert_eq!(map["n"].kind(), Kind::Null);
        assert_eq!(map["b"].kind(), Kind::Bool);
        assert_eq!(map["x"].kind(), Kind::Number);
        assert_eq!(map["s"].kind(), Kind::Text);
        assert_eq!(map["l"].kind(), Kind::List);
        assert_eq!(map["o"].kind(), Kind::Object);
    }

    #[test]
    fn object_keys_iterate_lexically() {
        let value = Value::from(json!({ "zeta": 1, "alpha": 2, "mid": 3 }));
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["alpha", "mid", "zeta"]);
    }
}
