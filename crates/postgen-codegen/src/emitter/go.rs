//! Go emitter: structs with `json` tags and `net/http` client functions.

use super::{IdentStyle, TemplateEmitter, TemplateSet, TypeMap};
use crate::template::RenderError;

pub const NAME: &str = "go";

const MODELS: &str = include_str!("../../templates/go/models.tmpl");
const MODEL: &str = include_str!("../../templates/go/model.tmpl");
const REQUEST: &str = include_str!("../../templates/go/request.tmpl");

/// Struct tags are raw string literals, which cannot contain a backtick.
const FORBIDDEN_KEY_CHARS: &[char] = &['`'];

pub fn emitter() -> Result<TemplateEmitter, RenderError> {
    let emitter = TemplateEmitter::new(
        NAME,
        "go",
        TypeMap {
            any: "interface{}".into(),
            boolean: "bool".into(),
            number: "float64".into(),
            text: "string".into(),
            list: "[]interface{}".into(),
            object_map: "map[string]interface{}".into(),
        },
        // Exported identifiers are capitalized, so they never hit a keyword.
        IdentStyle::Pascal,
        &[],
        TemplateSet {
            models: MODELS,
            model: MODEL,
            request: REQUEST,
        },
    )?;
    Ok(emitter.with_forbidden_key_chars(FORBIDDEN_KEY_CHARS))
}
