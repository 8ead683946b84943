//! Emission coordinator: collection in, ordered artifact list out.
//!
//! Generation is split from persistence. [`generate`] is a pure function of
//! the collection, the emitter and the options; [`Generated::write_to`] is
//! the only step with side effects.

use crate::collection::{Collection, RequestItem};
use crate::context::ContextBuilder;
use crate::emitter::CodeEmitter;
use crate::error::{Error, Result};
use crate::infer::infer_fields;
use crate::naming;
use crate::sink::ArtifactSink;
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Stem of the aggregate models artifact.
pub const MODELS_STEM: &str = "models";
/// Suffix of per-request artifact stems.
pub const REQUEST_SUFFIX: &str = "_request";

/// What to do when two requests sanitize to the same identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Number later requests: `create_order`, `create_order_2`, ...
    #[default]
    Suffix,
    /// Keep only the last request with a given identifier. The replaced
    /// request contributes neither a file nor a model.
    Overwrite,
    /// Stop with [`Error::Collision`].
    Error,
}

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub collisions: CollisionPolicy,
    /// Substitute `{{var}}` references with collection variables.
    pub resolve_variables: bool,
    /// Code spliced verbatim into every request artifact.
    pub target_code: Option<String>,
    /// Package or module name; derived from the collection name if unset.
    pub package: Option<String>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            collisions: CollisionPolicy::default(),
            resolve_variables: true,
            target_code: None,
            package: None,
        }
    }
}

/// One generated file, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub contents: String,
}

/// Result of a generation run, not yet written anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    /// Output directory name (the sanitized collection name).
    pub dir: PathBuf,
    /// The models artifact first, then one artifact per request in
    /// collection order.
    pub artifacts: Vec<Artifact>,
}

impl Generated {
    pub fn artifact(&self, path: impl AsRef<Path>) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.path == path.as_ref())
    }

    /// Create the output directory and write every artifact in order.
    ///
    /// Returns the directory actually written, which differs from
    /// [`dir`](Self::dir) when the sink versions existing directories.
    pub fn write_to(&self, sink: &mut dyn ArtifactSink) -> Result<PathBuf> {
        let dir = sink.create_dir(&self.dir)?;
        for artifact in &self.artifacts {
            sink.write(&dir.join(&artifact.path), artifact.contents.as_bytes())?;
        }
        tracing::info!(
            dir = %dir.display(),
            artifacts = self.artifacts.len(),
            "wrote generated code"
        );
        Ok(dir)
    }
}

/// Generate models and request sources for every request in `collection`.
pub fn generate(
    collection: &Collection,
    emitter: &dyn CodeEmitter,
    options: &GenerateOptions,
) -> Result<Generated> {
    let builder = ContextBuilder::new(
        collection,
        emitter,
        options.package.as_deref(),
        options.resolve_variables,
        options.target_code.as_deref(),
    );
    let planned = assign_idents(&collection.requests, emitter, options.collisions)?;

    let rendered: Vec<Result<(String, String)>> = planned
        .par_iter()
        .map(|(item, ident)| render_item(&builder, emitter, item, ident))
        .collect();

    let header = emitter
        .models_header(builder.collection())
        .map_err(|source| Error::Render {
            context: "models header".into(),
            source,
        })?;

    let ext = emitter.extension();
    let mut models = header;
    let mut requests = Vec::with_capacity(planned.len());
    for ((_, ident), result) in planned.iter().zip(rendered) {
        let (fragment, source) = result?;
        models.push('\n');
        models.push_str(&fragment);
        requests.push(Artifact {
            path: PathBuf::from(format!("{}{}.{}", ident, REQUEST_SUFFIX, ext)),
            contents: source,
        });
    }

    let mut artifacts = Vec::with_capacity(requests.len() + 1);
    artifacts.push(Artifact {
        path: PathBuf::from(format!("{}.{}", MODELS_STEM, ext)),
        contents: models,
    });
    artifacts.extend(requests);

    tracing::info!(
        collection = %collection.name,
        emitter = emitter.name(),
        requests = planned.len(),
        "generated"
    );
    Ok(Generated {
        dir: PathBuf::from(&builder.collection().ident),
        artifacts,
    })
}

fn render_item(
    builder: &ContextBuilder<'_>,
    emitter: &dyn CodeEmitter,
    item: &RequestItem,
    ident: &str,
) -> Result<(String, String)> {
    let fields = match &item.body {
        Some(body) => infer_fields(body).map_err(|source| Error::Inference {
            request: item.name.clone(),
            source,
        })?,
        None => Vec::new(),
    };
    if let Some(field) = fields.iter().find(|f| !emitter.accepts_key(&f.key)) {
        return Err(Error::UnsupportedKey {
            request: item.name.clone(),
            key: field.key.clone(),
            emitter: emitter.name().to_string(),
        });
    }
    tracing::debug!(request = %item.name, ident, fields = fields.len(), "rendering");

    let ctx = builder.request(item, ident, &fields);
    let render_error = |source| Error::Render {
        context: format!("request `{}`", item.name),
        source,
    };
    let fragment = emitter.model_fragment(&ctx).map_err(render_error)?;
    let source = emitter.request_source(&ctx).map_err(render_error)?;
    Ok((fragment, source))
}

/// A name one request claims in the generated code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Claim {
    Stem(String),
    Type(String),
    Function(String),
}

impl Claim {
    fn name(&self) -> &str {
        match self {
            Claim::Stem(name) | Claim::Type(name) | Claim::Function(name) => name,
        }
    }
}

/// File stem, type name and function name derived from `ident`. Distinct
/// stems can still share a type name (`get_user`, `get_user_`).
fn claims(emitter: &dyn CodeEmitter, ident: &str) -> [Claim; 3] {
    [
        Claim::Stem(ident.to_string()),
        Claim::Type(emitter.type_ident(ident)),
        Claim::Function(emitter.ident(ident)),
    ]
}

/// Pair every request with its artifact identifier, applying `policy` to
/// requests that would share a file stem, type name or function name.
fn assign_idents<'r>(
    requests: &'r [RequestItem],
    emitter: &dyn CodeEmitter,
    policy: CollisionPolicy,
) -> Result<Vec<(&'r RequestItem, String)>> {
    match policy {
        CollisionPolicy::Suffix => {
            let mut taken = HashSet::new();
            let mut planned = Vec::with_capacity(requests.len());
            for item in requests {
                let base = naming::sanitize(&item.name);
                let mut ident = base.clone();
                let mut n = 2;
                while claims(emitter, &ident).iter().any(|c| taken.contains(c)) {
                    ident = format!("{}{}{}", base, naming::SEPARATOR, n);
                    n += 1;
                }
                if ident != base {
                    tracing::debug!(request = %item.name, ident = %ident, "renamed colliding request");
                }
                taken.extend(claims(emitter, &ident));
                planned.push((item, ident));
            }
            Ok(planned)
        }
        CollisionPolicy::Overwrite => {
            let mut slots: Vec<Option<(&RequestItem, String)>> = Vec::with_capacity(requests.len());
            let mut owners: HashMap<Claim, usize> = HashMap::new();
            for item in requests {
                let ident = naming::sanitize(&item.name);
                let index = slots.len();
                for claim in claims(emitter, &ident) {
                    if let Some(previous) = owners.insert(claim, index)
                        && let Some((dropped, _)) = slots[previous].take()
                    {
                        tracing::warn!(request = %dropped.name, by = %item.name, "overwritten by a later request");
                    }
                }
                slots.push(Some((item, ident)));
            }
            Ok(slots.into_iter().flatten().collect())
        }
        CollisionPolicy::Error => {
            let mut owners: HashMap<Claim, &str> = HashMap::new();
            let mut planned = Vec::with_capacity(requests.len());
            for item in requests {
                let ident = naming::sanitize(&item.name);
                let claimed = claims(emitter, &ident);
                if let Some(claim) = claimed.iter().find(|c| owners.contains_key(*c)) {
                    return Err(Error::Collision {
                        first: owners[claim].to_string(),
                        second: item.name.clone(),
                        ident: claim.name().to_string(),
                    });
                }
                owners.extend(claimed.into_iter().map(|c| (c, item.name.as_str())));
                planned.push((item, ident));
            }
            Ok(planned)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::parse_collection;
    use crate::context::{CollectionContext, RequestContext};
    use crate::infer::TypeLabel;
    use crate::sink::MemorySink;
    use crate::template::RenderError;

    /// Plain-text emitter so these tests do not depend on built-in templates.
    struct Outline;

    impl CodeEmitter for Outline {
        fn name(&self) -> &str {
            "outline"
        }

        fn extension(&self) -> &str {
            "txt"
        }

        fn type_for(&self, label: TypeLabel) -> &str {
            label.as_str()
        }

        fn ident(&self, name: &str) -> String {
            naming::snake_case(name)
        }

        fn models_header(&self, c: &CollectionContext) -> std::result::Result<String, RenderError> {
            Ok(format!("# {}\n", c.name))
        }

        fn model_fragment(&self, r: &RequestContext<'_>) -> std::result::Result<String, RenderError> {
            let mut out = format!("{}:\n", r.type_name);
            for field in &r.fields {
                out.push_str(&format!("  {}: {}\n", field.key, field.lang_type));
            }
            Ok(out)
        }

        fn request_source(&self, r: &RequestContext<'_>) -> std::result::Result<String, RenderError> {
            Ok(format!("{} {} {}\n", r.fn_name, r.method, r.url))
        }
    }

    fn collection(doc: &str) -> Collection {
        parse_collection(doc.as_bytes()).unwrap()
    }

    const SHOP: &str = r#"{
        "info": { "name": "Basic Collection" },
        "variable": [{ "key": "base", "value": "https://shop.test" }],
        "item": [
            { "name": "Create Order", "request": {
                "method": "POST", "url": "{{base}}/orders",
                "body": { "mode": "raw", "raw": "{\"currency\": \"INR\", \"amount\": 100}" } } },
            { "name": "List Orders", "request": { "method": "GET", "url": "{{base}}/orders" } }
        ]
    }"#;

    const DUPLICATES: &str = r#"{
        "info": { "name": "Dupes" },
        "item": [
            { "name": "Create Order", "request": { "method": "POST", "url": "/a" } },
            { "name": "create order", "request": { "method": "PUT", "url": "/b" } }
        ]
    }"#;

    #[test]
    fn generates_models_then_requests() {
        let generated = generate(&collection(SHOP), &Outline, &GenerateOptions::default()).unwrap();

        assert_eq!(generated.dir, PathBuf::from("basic_collection"));
        let paths: Vec<_> = generated.artifacts.iter().map(|a| a.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("models.txt"),
                PathBuf::from("create_order_request.txt"),
                PathBuf::from("list_orders_request.txt"),
            ]
        );
        assert_eq!(
            generated.artifact("models.txt").unwrap().contents,
            "# Basic Collection\n\nCreateOrder:\n  amount: number\n  currency: text\n\nListOrders:\n"
        );
        assert_eq!(
            generated.artifact("create_order_request.txt").unwrap().contents,
            "create_order POST https://shop.test/orders\n"
        );
    }

    #[test]
    fn repeated_runs_are_byte_identical() {
        let collection = collection(SHOP);
        let options = GenerateOptions::default();

        let mut first = MemorySink::new();
        let mut second = MemorySink::new();
        generate(&collection, &Outline, &options).unwrap().write_to(&mut first).unwrap();
        generate(&collection, &Outline, &options).unwrap().write_to(&mut second).unwrap();

        assert_eq!(first.files, second.files);
        assert_eq!(first.files.len(), 3);
    }

    #[test]
    fn write_to_places_files_in_the_directory() {
        let generated = generate(&collection(SHOP), &Outline, &GenerateOptions::default()).unwrap();
        let mut sink = MemorySink::new();
        let dir = generated.write_to(&mut sink).unwrap();

        assert_eq!(dir, PathBuf::from("basic_collection"));
        assert!(sink.text("basic_collection/models.txt").is_some());
        assert!(sink.text("basic_collection/list_orders_request.txt").is_some());
    }

    #[test]
    fn colliding_names_get_suffixes() {
        let generated = generate(&collection(DUPLICATES), &Outline, &GenerateOptions::default()).unwrap();
        assert!(generated.artifact("create_order_request.txt").is_some());
        assert!(generated.artifact("create_order_2_request.txt").is_some());
    }

    #[test]
    fn suffixes_skip_names_already_taken() {
        let doc = r#"{ "info": { "name": "x" }, "item": [
            { "name": "a", "request": { "url": "/" } },
            { "name": "a 2", "request": { "url": "/" } },
            { "name": "A", "request": { "url": "/" } }
        ] }"#;
        let generated = generate(&collection(doc), &Outline, &GenerateOptions::default()).unwrap();
        let paths: Vec<_> = generated.artifacts.iter().map(|a| a.path.display().to_string()).collect();
        assert_eq!(paths, vec!["models.txt", "a_request.txt", "a_2_request.txt", "a_3_request.txt"]);
    }

    #[test]
    fn suffixes_keep_type_names_distinct() {
        let doc = r#"{ "info": { "name": "x" }, "item": [
            { "name": "Get User", "request": { "url": "/1" } },
            { "name": "Get User ", "request": { "url": "/2" } }
        ] }"#;
        let generated = generate(&collection(doc), &Outline, &GenerateOptions::default()).unwrap();
        let models = &generated.artifact("models.txt").unwrap().contents;
        assert_eq!(models.matches("GetUser:").count(), 1);
        assert_eq!(models.matches("GetUser2:").count(), 1);
        assert_eq!(
            generated.artifact("get_user__2_request.txt").unwrap().contents,
            "get_user_2 GET /2\n"
        );
    }

    #[test]
    fn numbered_names_do_not_reuse_a_suffixed_type() {
        let doc = r#"{ "info": { "name": "x" }, "item": [
            { "name": "Create Order", "request": { "url": "/" } },
            { "name": "Create Order", "request": { "url": "/" } },
            { "name": "Create Order2", "request": { "url": "/" } }
        ] }"#;
        let generated = generate(&collection(doc), &Outline, &GenerateOptions::default()).unwrap();
        let models = &generated.artifact("models.txt").unwrap().contents;
        let types: Vec<_> = models.lines().filter(|l| l.ends_with(':')).collect();
        assert_eq!(types, vec!["CreateOrder:", "CreateOrder2:", "CreateOrder22:"]);
    }

    #[test]
    fn overwrite_and_error_apply_to_type_names() {
        let doc = r#"{ "info": { "name": "x" }, "item": [
            { "name": "Get User", "request": { "url": "/1" } },
            { "name": "Get User ", "request": { "url": "/2" } }
        ] }"#;
        let overwrite = GenerateOptions {
            collisions: CollisionPolicy::Overwrite,
            ..GenerateOptions::default()
        };
        let generated = generate(&collection(doc), &Outline, &overwrite).unwrap();
        let paths: Vec<_> = generated.artifacts.iter().map(|a| a.path.display().to_string()).collect();
        assert_eq!(paths, vec!["models.txt", "get_user__request.txt"]);
        assert_eq!(generated.artifacts[0].contents, "# x\n\nGetUser:\n");

        let error = GenerateOptions {
            collisions: CollisionPolicy::Error,
            ..GenerateOptions::default()
        };
        let err = generate(&collection(doc), &Outline, &error).unwrap_err();
        assert!(matches!(err, Error::Collision { ref ident, .. } if ident == "GetUser"));
    }

    #[test]
    fn overwrite_keeps_the_last_request() {
        let options = GenerateOptions {
            collisions: CollisionPolicy::Overwrite,
            ..GenerateOptions::default()
        };
        let generated = generate(&collection(DUPLICATES), &Outline, &options).unwrap();

        let requests: Vec<_> = generated
            .artifacts
            .iter()
            .filter(|a| a.path.display().to_string().starts_with("create_order"))
            .collect();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].contents, "create_order PUT /b\n");
        assert_eq!(
            generated.artifact("models.txt").unwrap().contents.matches("CreateOrder:").count(),
            1
        );
    }

    #[test]
    fn collision_error_names_both_requests() {
        let options = GenerateOptions {
            collisions: CollisionPolicy::Error,
            ..GenerateOptions::default()
        };
        let err = generate(&collection(DUPLICATES), &Outline, &options).unwrap_err();
        assert_eq!(
            err.to_string(),
            "name collision: requests `Create Order` and `create order` both map to `create_order`"
        );
    }

    #[test]
    fn first_failing_request_is_reported() {
        let doc = r#"{ "info": { "name": "x" }, "item": [
            { "name": "ok", "request": { "url": "/", "body": { "mode": "raw", "raw": "{}" } } },
            { "name": "list body", "request": { "url": "/", "body": { "mode": "raw", "raw": "[1]" } } },
            { "name": "text body", "request": { "url": "/", "body": { "mode": "raw", "raw": "\"hi\"" } } }
        ] }"#;
        let err = generate(&collection(doc), &Outline, &GenerateOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Inference { ref request, .. } if request == "list body"));
    }

    #[test]
    fn empty_collection_still_writes_models() {
        let doc = r#"{ "info": { "name": "Empty" }, "item": [] }"#;
        let generated = generate(&collection(doc), &Outline, &GenerateOptions::default()).unwrap();
        assert_eq!(generated.artifacts.len(), 1);
        assert_eq!(generated.artifacts[0].contents, "# Empty\n");
    }
}
