//! Render contexts: the data a template sees.
//!
//! Contexts are plain serializable structs. Every key is always present
//! (absent optional data serializes as `null`), so a template referencing a
//! key that does not exist here is a template defect, reported as an
//! unresolved placeholder.

use crate::collection::{Collection, KeyValue, RequestItem};
use crate::emitter::CodeEmitter;
use crate::infer::{FieldSpec, TypeLabel};
use crate::naming;
use serde::Serialize;
use std::collections::HashMap;

/// Collection-level data, rendered into the models header and shared by
/// every request context.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionContext {
    pub name: String,
    pub description: Option<String>,
    /// Sanitized collection name (the output directory name).
    pub ident: String,
    /// Package or module name for the generated code.
    pub package: String,
    pub variables: Vec<KeyValueContext>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyValueContext {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldContext {
    /// Body key as written in the example.
    pub key: String,
    pub label: TypeLabel,
    /// Identifier in the target language.
    pub ident: String,
    /// Whether `ident` differs from `key`.
    pub renamed: bool,
    /// Type in the target language.
    pub lang_type: String,
    /// `ident` and `lang_type` padded with spaces to one past the widest of
    /// the model, for gofmt-style column alignment.
    pub ident_padded: String,
    pub lang_type_padded: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthContext {
    pub kind: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestContext<'a> {
    pub collection: &'a CollectionContext,
    pub name: String,
    pub folder: Vec<String>,
    /// Sanitized request name, also the artifact stem.
    pub ident: String,
    /// PascalCase type stem, always starting with a letter.
    pub type_name: String,
    /// Function name in the target language's style.
    pub fn_name: String,
    pub method: String,
    pub url: String,
    pub host: Vec<String>,
    pub path: Vec<String>,
    pub query: Vec<KeyValueContext>,
    pub headers: Vec<KeyValueContext>,
    pub description: Option<String>,
    pub has_body: bool,
    pub fields: Vec<FieldContext>,
    pub responses: Vec<String>,
    pub auth: Option<AuthContext>,
    /// Caller-supplied code spliced into the request source verbatim.
    pub target: String,
}

/// Builds contexts for one collection and one emitter.
pub struct ContextBuilder<'a> {
    collection: &'a Collection,
    emitter: &'a dyn CodeEmitter,
    shared: CollectionContext,
    resolve_variables: bool,
    target: String,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(
        collection: &'a Collection,
        emitter: &'a dyn CodeEmitter,
        package: Option<&str>,
        resolve_variables: bool,
        target: Option<&str>,
    ) -> Self {
        let ident = naming::sanitize(&collection.name);
        let package = package
            .map(String::from)
            .unwrap_or_else(|| emitter.package_name(&ident));
        let shared = CollectionContext {
            name: collection.name.clone(),
            description: collection.description.as_deref().map(normalize_newlines),
            ident,
            package,
            variables: collection.variables.iter().map(key_value).collect(),
        };
        Self {
            collection,
            emitter,
            shared,
            resolve_variables,
            target: target.unwrap_or_default().to_string(),
        }
    }

    pub fn collection(&self) -> &CollectionContext {
        &self.shared
    }

    pub fn request(&self, item: &RequestItem, ident: &str, fields: &[FieldSpec]) -> RequestContext<'_> {
        let resolve = |text: &str| {
            if self.resolve_variables {
                self.collection.substitute(text)
            } else {
                text.to_string()
            }
        };
        let resolve_pairs = |pairs: &[KeyValue]| {
            pairs
                .iter()
                .map(|kv| KeyValueContext {
                    key: resolve(&kv.key),
                    value: resolve(&kv.value),
                })
                .collect()
        };

        RequestContext {
            collection: &self.shared,
            name: item.name.clone(),
            folder: item.folder.clone(),
            ident: ident.to_string(),
            type_name: self.emitter.type_ident(ident),
            fn_name: self.emitter.ident(ident),
            method: item.method.clone(),
            url: resolve(&item.url.raw),
            host: item.url.host.iter().map(|h| resolve(h)).collect(),
            path: item.url.path.iter().map(|p| resolve(p)).collect(),
            query: resolve_pairs(&item.url.query),
            headers: resolve_pairs(&item.headers),
            description: item.description.as_deref().map(normalize_newlines),
            has_body: item.body.is_some(),
            fields: self.fields(fields),
            responses: item.responses.iter().map(|r| single_line(&r.name)).collect(),
            auth: item.auth.as_ref().map(|auth| AuthContext {
                kind: auth.kind.clone(),
                token: auth.bearer_token.as_deref().map(resolve),
            }),
            target: self.target.clone(),
        }
    }

    /// Field contexts, with colliding identifiers numbered `2`, `3`, ...
    fn fields(&self, fields: &[FieldSpec]) -> Vec<FieldContext> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut contexts: Vec<FieldContext> = fields
            .iter()
            .map(|field| {
                let base = self.emitter.ident(&field.key);
                let count = seen.entry(base.clone()).or_insert(0);
                *count += 1;
                let ident = if *count == 1 {
                    base
                } else {
                    format!("{}{}", base, count)
                };
                FieldContext {
                    key: field.key.clone(),
                    label: field.label,
                    renamed: ident != field.key,
                    ident,
                    lang_type: self.emitter.type_for(field.label).to_string(),
                    ident_padded: String::new(),
                    lang_type_padded: String::new(),
                }
            })
            .collect();

        let ident_width = contexts.iter().map(|f| f.ident.chars().count()).max().unwrap_or(0);
        let type_width = contexts.iter().map(|f| f.lang_type.chars().count()).max().unwrap_or(0);
        for field in &mut contexts {
            field.ident_padded = pad(&field.ident, ident_width + 1);
            field.lang_type_padded = pad(&field.lang_type, type_width + 1);
        }
        contexts
    }
}

fn pad(text: &str, width: usize) -> String {
    format!("{:<width$}", text, width = width)
}

/// Names end up inside one-line comments.
fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

fn key_value(kv: &KeyValue) -> KeyValueContext {
    KeyValueContext {
        key: kv.key.clone(),
        value: kv.value.clone(),
    }
}
