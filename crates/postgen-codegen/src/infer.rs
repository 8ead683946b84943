//! Type inference over example request bodies.
//!
//! Only the top level of a body is inspected. A nested list or object is not
//! destructured further: the field simply gets the `list` or `object-map`
//! label.

use crate::value::{Kind, Value};
use serde::Serialize;
use std::fmt;

/// Canonical type label for a body field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypeLabel {
    Any,
    Boolean,
    Number,
    Text,
    List,
    ObjectMap,
}

impl TypeLabel {
    pub const ALL: [TypeLabel; 6] = [
        TypeLabel::Any,
        TypeLabel::Boolean,
        TypeLabel::Number,
        TypeLabel::Text,
        TypeLabel::List,
        TypeLabel::ObjectMap,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TypeLabel::Any => "any",
            TypeLabel::Boolean => "boolean",
            TypeLabel::Number => "number",
            TypeLabel::Text => "text",
            TypeLabel::List => "list",
            TypeLabel::ObjectMap => "object-map",
        }
    }
}

impl fmt::Display for TypeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A body key paired with its inferred label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: String,
    pub label: TypeLabel,
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("body is {kind}, expected an object with top-level fields")]
    UnsupportedKind { kind: Kind },
}

/// Label a value by its dynamic kind.
pub fn infer_type(value: &Value) -> TypeLabel {
    match value {
        Value::Null => TypeLabel::Any,
        Value::Bool(_) => TypeLabel::Boolean,
        Value::Number(_) => TypeLabel::Number,
        Value::Text(_) => TypeLabel::Text,
        Value::List(_) => TypeLabel::List,
        Value::Object(_) => TypeLabel::ObjectMap,
    }
}

/// Infer one [`FieldSpec`] per top-level key of `body`, ordered by key.
///
/// A null body has no fields. Any other non-object body is rejected.
pub fn infer_fields(body: &Value) -> Result<Vec<FieldSpec>, InferenceError> {
    match body {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => Ok(map
            .iter()
            .map(|(key, value)| FieldSpec {
                key: key.clone(),
                label: infer_type(value),
            })
            .collect()),
        other => Err(InferenceError::UnsupportedKind { kind: other.kind() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn label(v: serde_json::Value) -> TypeLabel {
        infer_type(&Value::from(v))
    }

    #[test]
    fn labels_follow_kind() {
        assert_eq!(label(json!(null)), TypeLabel::Any);
        assert_eq!(label(json!(false)), TypeLabel::Boolean);
        assert_eq!(label(json!(3)), TypeLabel::Number);
        assert_eq!(label(json!("x")), TypeLabel::Text);
        assert_eq!(label(json!([1, "a"])), TypeLabel::List);
        assert_eq!(label(json!({ "a": 1 })), TypeLabel::ObjectMap);
    }

    #[test]
    fn labels_ignore_magnitude_and_length() {
        assert_eq!(label(json!(0)), label(json!(1e300)));
        assert_eq!(label(json!(-7)), label(json!(0.25)));
        assert_eq!(label(json!("")), label(json!("a much longer string")));
        assert_eq!(label(json!([])), label(json!([1, 2, 3, 4, 5])));
        assert_eq!(label(json!({})), label(json!({ "nested": { "deep": [] } })));
    }

    #[test]
    fn label_names() {
        let names: Vec<_> = TypeLabel::ALL.iter().map(|l| l.to_string()).collect();
        assert_eq!(
            names,
            vec!["any", "boolean", "number", "text", "list", "object-map"]
        );
    }

    #[test]
    fn infers_amount_and_currency() {
        let body = Value::from(json!({ "amount": 100, "currency": "INR" }));
        let fields = infer_fields(&body).unwrap();
        assert_eq!(
            fields,
            vec![
                FieldSpec {
                    key: "amount".into(),
                    label: TypeLabel::Number
                },
                FieldSpec {
                    key: "currency".into(),
                    label: TypeLabel::Text
                },
            ]
        );
    }

    #[test]
    fn nested_values_are_not_destructured() {
        let body = Value::from(json!({
            "items": [{ "sku": "a", "qty": 1 }],
            "customer": { "id": 7, "tags": ["vip"] }
        }));
        let fields = infer_fields(&body).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].key, "customer");
        assert_eq!(fields[0].label, TypeLabel::ObjectMap);
        assert_eq!(fields[1].key, "items");
        assert_eq!(fields[1].label, TypeLabel::List);
    }

    #[test]
    fn null_body_has_no_fields() {
        assert!(infer_fields(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn scalar_body_is_rejected() {
        let err = infer_fields(&Value::Text("<xml/>".into())).unwrap_err();
        assert!(err.to_string().contains("body is text"));
    }
}
