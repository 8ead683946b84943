//! Rust emitter: serde structs and blocking `reqwest` calls.

use super::{IdentStyle, TemplateEmitter, TemplateSet, TypeMap};
use crate::template::RenderError;

pub const NAME: &str = "rust";

const MODELS: &str = include_str!("../../templates/rust/models.tmpl");
const MODEL: &str = include_str!("../../templates/rust/model.tmpl");
const REQUEST: &str = include_str!("../../templates/rust/request.tmpl");

/// Keywords that cannot be used as plain identifiers.
const RESERVED: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod",
    "move", "mut", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true",
    "try", "type", "unsafe", "use", "where", "while", "yield", "abstract", "become", "box", "do",
    "final", "macro", "override", "priv", "typeof", "unsized", "virtual",
];

pub fn emitter() -> Result<TemplateEmitter, RenderError> {
    TemplateEmitter::new(
        NAME,
        "rs",
        TypeMap {
            any: "serde_json::Value".into(),
            boolean: "bool".into(),
            number: "f64".into(),
            text: "String".into(),
            list: "Vec<serde_json::Value>".into(),
            object_map: "serde_json::Map<String, serde_json::Value>".into(),
        },
        IdentStyle::Snake,
        RESERVED,
        TemplateSet {
            models: MODELS,
            model: MODEL,
            request: REQUEST,
        },
    )
}
