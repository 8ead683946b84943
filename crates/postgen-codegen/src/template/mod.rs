//! Template rendering.
//!
//! A small logic-less template language over JSON-shaped contexts:
//!
//! ```text
//! {{path.to.value}}                   placeholder
//! {{#if path}} ... {{else}} ... {{/if}}
//! {{#each list}} ... {{this}} {{@index}} ... {{/each}}
//! {{join list ", "}}                  helpers: join, lines, replace, replace_all, escape
//! {{! comment }}
//! ```
//!
//! Rendering is a pure function of the template and the context. Context data
//! is inserted verbatim and never interpreted as template source.
//!
//! # Example
//!
//! ```
//! use postgen_codegen::template::Template;
//!
//! let template = Template::parse("greeting", "Hello, {{join names \" & \"}}!").unwrap();
//! let out = template
//!     .render(&serde_json::json!({ "names": ["Ann", "Bo"] }))
//!     .unwrap();
//! assert_eq!(out, "Hello, Ann & Bo!");
//! ```

mod helpers;
mod parser;

pub use helpers::Helper;
pub use parser::SyntaxError;

use parser::{Arg, Expr, Node};
use serde::Serialize;
use serde_json::Value as Json;
use std::borrow::Cow;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template `{template}`: {source}")]
    Syntax {
        template: String,
        source: SyntaxError,
    },
    #[error("template `{template}`: unresolved placeholder `{placeholder}`")]
    Unresolved {
        template: String,
        placeholder: String,
    },
    #[error("template `{template}`: `{placeholder}` is not a text value")]
    NotScalar {
        template: String,
        placeholder: String,
    },
    #[error("template `{template}`: `{placeholder}` is not a list")]
    NotIterable {
        template: String,
        placeholder: String,
    },
    #[error("cannot build render context: {0}")]
    Context(#[from] serde_json::Error),
}

/// A parsed, named template.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    nodes: Vec<Node>,
}

struct Scope<'a> {
    value: &'a Json,
    /// Position and length of the enclosing `each`.
    index: Option<(usize, usize)>,
}

impl Template {
    pub fn parse(name: impl Into<String>, source: &str) -> Result<Self, RenderError> {
        let name = name.into();
        match parser::parse(source) {
            Ok(nodes) => Ok(Self { name, nodes }),
            Err(source) => Err(RenderError::Syntax {
                template: name,
                source,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render against any serializable context.
    pub fn render<T: Serialize + ?Sized>(&self, context: &T) -> Result<String, RenderError> {
        let value = serde_json::to_value(context)?;
        self.render_value(&value)
    }

    pub fn render_value(&self, context: &Json) -> Result<String, RenderError> {
        let mut out = String::new();
        let mut scopes = vec![Scope {
            value: context,
            index: None,
        }];
        self.render_nodes(&self.nodes, &mut scopes, &mut out)?;
        Ok(out)
    }

    fn render_nodes<'a>(
        &self,
        nodes: &[Node],
        scopes: &mut Vec<Scope<'a>>,
        out: &mut String,
    ) -> Result<(), RenderError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Expr(Expr::Path(path)) => {
                    let value = self.lookup(path, scopes)?;
                    out.push_str(&self.scalar(path, &value)?);
                }
                Node::Expr(Expr::Call { helper, args }) => {
                    out.push_str(&self.call(*helper, args, scopes)?);
                }
                Node::If {
                    cond,
                    then,
                    otherwise,
                } => {
                    let branch = if truthy(&*self.lookup(cond, scopes)?) {
                        then
                    } else {
                        otherwise
                    };
                    self.render_nodes(branch, scopes, out)?;
                }
                Node::Each { path, body } => {
                    let items = match self.lookup(path, scopes)? {
                        Cow::Borrowed(Json::Array(items)) => items,
                        Cow::Borrowed(Json::Null) => continue,
                        _ => return Err(self.not_iterable(path)),
                    };
                    let len = items.len();
                    for (i, item) in items.iter().enumerate() {
                        scopes.push(Scope {
                            value: item,
                            index: Some((i, len)),
                        });
                        let result = self.render_nodes(body, scopes, out);
                        scopes.pop();
                        result?;
                    }
                }
            }
        }
        Ok(())
    }

    fn lookup<'a>(&self, path: &str, scopes: &[Scope<'a>]) -> Result<Cow<'a, Json>, RenderError> {
        let unresolved = || RenderError::Unresolved {
            template: self.name.clone(),
            placeholder: path.to_string(),
        };
        let Some(top) = scopes.last() else {
            return Err(unresolved());
        };

        if let Some(meta) = path.strip_prefix('@') {
            let (i, len) = top.index.ok_or_else(unresolved)?;
            return match meta {
                "index" => Ok(Cow::Owned(Json::from(i))),
                "first" => Ok(Cow::Owned(Json::Bool(i == 0))),
                "last" => Ok(Cow::Owned(Json::Bool(i + 1 == len))),
                _ => Err(unresolved()),
            };
        }

        let mut segments = path.split('.');
        let first = segments.next().unwrap_or_default();
        let mut current = if first == "this" {
            top.value
        } else {
            scopes
                .iter()
                .rev()
                .find_map(|scope| scope.value.get(first))
                .ok_or_else(unresolved)?
        };
        for segment in segments {
            current = current.get(segment).ok_or_else(unresolved)?;
        }
        Ok(Cow::Borrowed(current))
    }

    fn call(&self, helper: Helper, args: &[Arg], scopes: &[Scope<'_>]) -> Result<String, RenderError> {
        let mut rest = args;
        let mut items = Vec::new();

        if helper.takes_list() {
            if let Some((Arg::Path(path), tail)) = rest.split_first() {
                match self.lookup(path, scopes)?.as_ref() {
                    Json::Array(values) => {
                        for value in values {
                            items.push(self.scalar(path, value)?);
                        }
                    }
                    Json::Null => {}
                    _ => return Err(self.not_iterable(path)),
                }
                rest = tail;
            } else if let Some((Arg::Literal(_), _)) = rest.split_first() {
                return Err(self.not_iterable(helper.name()));
            }
        }

        let mut resolved = Vec::with_capacity(rest.len());
        for arg in rest {
            resolved.push(match arg {
                Arg::Literal(text) => text.clone(),
                Arg::Path(path) => self.scalar(path, &*self.lookup(path, scopes)?)?,
            });
        }

        Ok(helper.apply(&items, &resolved))
    }

    fn scalar(&self, path: &str, value: &Json) -> Result<String, RenderError> {
        match value {
            Json::String(s) => Ok(s.clone()),
            Json::Number(n) => Ok(n.to_string()),
            Json::Bool(b) => Ok(b.to_string()),
            Json::Null => Ok(String::new()),
            Json::Array(_) | Json::Object(_) => Err(RenderError::NotScalar {
                template: self.name.clone(),
                placeholder: path.to_string(),
            }),
        }
    }

    fn not_iterable(&self, path: &str) -> RenderError {
        RenderError::NotIterable {
            template: self.name.clone(),
            placeholder: path.to_string(),
        }
    }
}

fn truthy(value: &Json) -> bool {
    match value {
        Json::Null => false,
        Json::Bool(b) => *b,
        Json::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Json::String(s) => !s.is_empty(),
        Json::Array(items) => !items.is_empty(),
        Json::Object(map) => !map.is_empty(),
    }
}
