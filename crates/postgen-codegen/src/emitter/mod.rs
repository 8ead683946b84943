//! Code emitters.
//!
//! A [`CodeEmitter`] decides what the generated source looks like. The
//! pipeline hands it render contexts and stores whatever text it returns; it
//! knows nothing about the target language or the service being called.
//!
//! Built-in emitters are [`TemplateEmitter`]s with a template set per
//! language. Any of their templates can be replaced from a directory (see
//! [`TemplateEmitter::with_templates_from`]).

#[cfg(feature = "emitter-go")]
pub mod go;
#[cfg(feature = "emitter-rust")]
pub mod rust;

use crate::context::{CollectionContext, RequestContext};
use crate::error::Error;
use crate::infer::TypeLabel;
use crate::naming;
use crate::template::{RenderError, Template};
use std::path::Path;

/// Produces source text from render contexts.
///
/// # Implementing Custom Emitters
///
/// ```ignore
/// struct Kotlin;
///
/// impl CodeEmitter for Kotlin {
///     fn name(&self) -> &str { "kotlin" }
///     fn extension(&self) -> &str { "kt" }
///     fn type_for(&self, label: TypeLabel) -> &str { /* ... */ }
///     fn ident(&self, name: &str) -> String { /* ... */ }
///     fn models_header(&self, c: &CollectionContext) -> Result<String, RenderError> { /* ... */ }
///     fn model_fragment(&self, r: &RequestContext<'_>) -> Result<String, RenderError> { /* ... */ }
///     fn request_source(&self, r: &RequestContext<'_>) -> Result<String, RenderError> { /* ... */ }
/// }
/// ```
pub trait CodeEmitter: Send + Sync {
    /// Unique emitter identifier (e.g. "go").
    fn name(&self) -> &str;

    /// File extension for generated artifacts, without the dot.
    fn extension(&self) -> &str;

    /// Target-language type for a canonical label.
    fn type_for(&self, label: TypeLabel) -> &str;

    /// Identifier in the target language's style for a key or name.
    fn ident(&self, name: &str) -> String;

    /// Type name stem for a request identifier. Always starts with a letter.
    fn type_ident(&self, ident: &str) -> String {
        let name = naming::pascal_case(ident);
        if name.starts_with(|c: char| c.is_alphabetic()) {
            name
        } else {
            format!("T{}", name)
        }
    }

    /// Package or module name derived from the output directory name.
    fn package_name(&self, dir_ident: &str) -> String {
        if dir_ident.starts_with(|c: char| c.is_alphabetic()) {
            dir_ident.to_string()
        } else {
            format!("pkg_{}", dir_ident)
        }
    }

    /// Whether a body key can be mapped onto a field of this language.
    fn accepts_key(&self, _key: &str) -> bool {
        true
    }

    /// Text placed at the top of the aggregate models artifact.
    fn models_header(&self, collection: &CollectionContext) -> Result<String, RenderError>;

    /// One model definition, appended to the models artifact.
    fn model_fragment(&self, request: &RequestContext<'_>) -> Result<String, RenderError>;

    /// The standalone client-call artifact for one request.
    fn request_source(&self, request: &RequestContext<'_>) -> Result<String, RenderError>;
}

/// Target-language spellings of the canonical labels.
#[derive(Debug, Clone)]
pub struct TypeMap {
    pub any: String,
    pub boolean: String,
    pub number: String,
    pub text: String,
    pub list: String,
    pub object_map: String,
}

impl TypeMap {
    pub fn get(&self, label: TypeLabel) -> &str {
        match label {
            TypeLabel::Any => &self.any,
            TypeLabel::Boolean => &self.boolean,
            TypeLabel::Number => &self.number,
            TypeLabel::Text => &self.text,
            TypeLabel::List => &self.list,
            TypeLabel::ObjectMap => &self.object_map,
        }
    }
}

/// How identifiers are spelled in the target language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentStyle {
    /// `CreateOrder`; exported names in Go.
    Pascal,
    /// `create_order`.
    Snake,
}

/// Template file names looked up by [`TemplateEmitter::with_templates_from`].
pub const MODELS_TEMPLATE: &str = "models.tmpl";
pub const MODEL_TEMPLATE: &str = "model.tmpl";
pub const REQUEST_TEMPLATE: &str = "request.tmpl";

/// An emitter driven by three templates: the models header, the per-request
/// model fragment and the per-request source file.
#[derive(Debug, Clone)]
pub struct TemplateEmitter {
    name: String,
    extension: String,
    types: TypeMap,
    style: IdentStyle,
    reserved: &'static [&'static str],
    /// Characters a body key may not contain.
    forbidden_key_chars: &'static [char],
    header: Template,
    model: Template,
    request: Template,
}

/// Template sources for a [`TemplateEmitter`].
pub struct TemplateSet<'a> {
    pub models: &'a str,
    pub model: &'a str,
    pub request: &'a str,
}

impl TemplateEmitter {
    pub fn new(
        name: impl Into<String>,
        extension: impl Into<String>,
        types: TypeMap,
        style: IdentStyle,
        reserved: &'static [&'static str],
        templates: TemplateSet<'_>,
    ) -> Result<Self, RenderError> {
        let name = name.into();
        Ok(Self {
            header: Template::parse(format!("{}/{}", name, MODELS_TEMPLATE), templates.models)?,
            model: Template::parse(format!("{}/{}", name, MODEL_TEMPLATE), templates.model)?,
            request: Template::parse(format!("{}/{}", name, REQUEST_TEMPLATE), templates.request)?,
            name,
            extension: extension.into(),
            types,
            style,
            reserved,
            forbidden_key_chars: &[],
        })
    }

    /// Reject body keys containing any of `chars`, for targets that cannot
    /// spell them (a backtick inside a Go struct tag).
    pub fn with_forbidden_key_chars(mut self, chars: &'static [char]) -> Self {
        self.forbidden_key_chars = chars;
        self
    }

    /// Replace templates with any of `models.tmpl`, `model.tmpl` and
    /// `request.tmpl` found in `dir`. Missing files keep the current template.
    pub fn with_templates_from(mut self, dir: &Path) -> Result<Self, Error> {
        for (file, slot) in [
            (MODELS_TEMPLATE, &mut self.header),
            (MODEL_TEMPLATE, &mut self.model),
            (REQUEST_TEMPLATE, &mut self.request),
        ] {
            let path = dir.join(file);
            if !path.is_file() {
                continue;
            }
            let source = std::fs::read_to_string(&path).map_err(|source| Error::Read {
                path: path.clone(),
                source,
            })?;
            *slot = Template::parse(path.display().to_string(), &source).map_err(|source| {
                Error::Render {
                    context: format!("template override {}", path.display()),
                    source,
                }
            })?;
            tracing::debug!(template = %path.display(), "using template override");
        }
        Ok(self)
    }
}

impl CodeEmitter for TemplateEmitter {
    fn name(&self) -> &str {
        &self.name
    }

    fn extension(&self) -> &str {
        &self.extension
    }

    fn type_for(&self, label: TypeLabel) -> &str {
        self.types.get(label)
    }

    fn ident(&self, name: &str) -> String {
        let mut ident = match self.style {
            IdentStyle::Pascal => naming::pascal_case(name),
            IdentStyle::Snake => naming::snake_case(name),
        };
        if !ident.starts_with(|c: char| c.is_alphabetic()) {
            ident = match self.style {
                IdentStyle::Pascal => format!("Field{}", ident),
                IdentStyle::Snake => format!("field_{}", ident),
            };
        }
        if self.reserved.contains(&ident.as_str()) {
            ident.push('_');
        }
        ident
    }

    fn accepts_key(&self, key: &str) -> bool {
        !key.contains(self.forbidden_key_chars)
    }

    fn models_header(&self, collection: &CollectionContext) -> Result<String, RenderError> {
        self.header.render(collection)
    }

    fn model_fragment(&self, request: &RequestContext<'_>) -> Result<String, RenderError> {
        self.model.render(request)
    }

    fn request_source(&self, request: &RequestContext<'_>) -> Result<String, RenderError> {
        self.request.render(request)
    }
}

/// Names of the built-in emitters.
pub fn emitter_names() -> Vec<&'static str> {
    let mut names = Vec::new();
    #[cfg(feature = "emitter-go")]
    names.push(go::NAME);
    #[cfg(feature = "emitter-rust")]
    names.push(rust::NAME);
    names
}

/// Construct a built-in emitter by name.
pub fn builtin_emitter(name: &str) -> Result<TemplateEmitter, Error> {
    let emitter = match name.to_lowercase().as_str() {
        #[cfg(feature = "emitter-go")]
        go::NAME | "golang" => go::emitter(),
        #[cfg(feature = "emitter-rust")]
        rust::NAME | "rs" => rust::emitter(),
        _ => {
            return Err(Error::UnknownEmitter {
                name: name.to_string(),
                available: emitter_names().join(", "),
            });
        }
    };
    emitter.map_err(|source| Error::Render {
        context: format!("built-in emitter `{}`", name),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_emitter_lists_available() {
        let err = builtin_emitter("cobol").unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("unknown emitter `cobol`"));
        for name in emitter_names() {
            assert!(message.contains(name));
        }
    }

    #[cfg(feature = "emitter-rust")]
    #[test]
    fn idents_avoid_reserved_words_and_digits() {
        let emitter = builtin_emitter("rust").unwrap();
        assert_eq!(emitter.ident("type"), "type_");
        assert_eq!(emitter.ident("2fa"), "field_2fa");
        assert_eq!(emitter.ident("orderId"), "order_id");
    }

    #[cfg(feature = "emitter-go")]
    #[test]
    fn pascal_idents() {
        let emitter = builtin_emitter("go").unwrap();
        assert_eq!(emitter.ident("order_id"), "OrderId");
        assert_eq!(emitter.ident("3ds"), "Field3ds");
    }

    #[cfg(feature = "emitter-go")]
    #[test]
    fn type_and_package_names_start_with_a_letter() {
        let emitter = builtin_emitter("go").unwrap();
        assert_eq!(emitter.type_ident("2fa_verify"), "T2faVerify");
        assert_eq!(emitter.type_ident("create_order"), "CreateOrder");
        assert_eq!(emitter.package_name("2024_orders"), "pkg_2024_orders");
        assert_eq!(emitter.package_name("orders"), "orders");
        assert!(!emitter.accepts_key("a`b"));
        assert!(emitter.accepts_key("a\"b"));
    }

    #[cfg(all(feature = "emitter-go", feature = "emitter-rust"))]
    #[test]
    fn digit_leading_names_render_valid_declarations() {
        use crate::collection::parse_collection;
        use crate::generate::{GenerateOptions, generate};

        let collection = parse_collection(
            br#"{ "info": { "name": "2024 Orders" }, "item": [
                { "name": "2FA Verify", "request": { "method": "POST", "url": "/v", "body": { "code": "1" } } }
            ] }"#,
        )
        .unwrap();

        let go = generate(&collection, &builtin_emitter("go").unwrap(), &GenerateOptions::default()).unwrap();
        let models = &go.artifact("models.go").unwrap().contents;
        assert!(models.contains("\npackage pkg_2024_orders\n"));
        assert!(models.contains("type T2faVerifyRequest struct {"));
        let source = &go.artifact("2fa_verify_request.go").unwrap().contents;
        assert!(source.contains("body T2faVerifyRequest)"));

        let rust = generate(&collection, &builtin_emitter("rust").unwrap(), &GenerateOptions::default()).unwrap();
        let models = &rust.artifact("models.rs").unwrap().contents;
        assert!(models.contains("pub struct T2faVerifyRequest {"));
    }

    #[cfg(feature = "emitter-go")]
    #[test]
    fn template_overrides_replace_only_present_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MODEL_TEMPLATE), "type {{type_name}} struct{}\n").unwrap();
        let emitter = builtin_emitter("go")
            .unwrap()
            .with_templates_from(dir.path())
            .unwrap();
        assert!(emitter.model.name().ends_with(MODEL_TEMPLATE));
        assert_eq!(emitter.header.name(), "go/models.tmpl");
    }

    #[cfg(feature = "emitter-go")]
    #[test]
    fn broken_override_is_a_render_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(REQUEST_TEMPLATE), "{{#each headers}}").unwrap();
        let err = builtin_emitter("go")
            .unwrap()
            .with_templates_from(dir.path())
            .unwrap_err();
        assert!(matches!(err, Error::Render { .. }));
    }
}
