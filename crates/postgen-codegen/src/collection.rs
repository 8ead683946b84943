//! Postman collection parser.
//!
//! The read is structural and tolerant: only `info.name`, item names and the
//! shape of `item` are required. Everything else defaults to empty.
//!
//! Folders are flattened depth-first, so [`Collection::requests`] is in
//! document order.

use crate::error::Error;
use crate::value::Value;
use serde_json::Value as Json;
use std::path::Path;

/// A parsed collection. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub name: String,
    pub description: Option<String>,
    pub requests: Vec<RequestItem>,
    pub variables: Vec<KeyValue>,
}

/// One request definition.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestItem {
    pub name: String,
    /// Enclosing folder names, outermost first.
    pub folder: Vec<String>,
    pub method: String,
    pub url: Url,
    pub headers: Vec<KeyValue>,
    pub body: Option<Value>,
    pub auth: Option<Auth>,
    pub events: Vec<Event>,
    pub description: Option<String>,
    pub responses: Vec<Response>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Url {
    pub raw: String,
    pub host: Vec<String>,
    pub path: Vec<String>,
    pub query: Vec<KeyValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

/// Request authentication. Only bearer tokens are decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Auth {
    pub kind: String,
    pub bearer_token: Option<String>,
}

/// A lifecycle script hook. Carried through but never interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub listen: String,
    pub script_type: Option<String>,
    pub exec: Vec<String>,
}

/// An example response, opaque beyond its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed JSON: {0}")]
    Syntax(#[from] serde_json::Error),
    #[error("missing required field `{0}`")]
    MissingField(String),
    #[error("`{path}` must be {expected}, found {found}")]
    WrongShape {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl Collection {
    /// Look up a collection variable.
    pub fn variable(&self, key: &str) -> Option<&str> {
        self.variables
            .iter()
            .find(|v| v.key == key)
            .map(|v| v.value.as_str())
    }

    /// Replace `{{key}}` references with collection variables.
    ///
    /// Single pass: substituted text is not rescanned, and unknown references
    /// are left as written.
    pub fn substitute(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                out.push_str(&rest[start..]);
                return out;
            };
            match self.variable(after[..end].trim()) {
                Some(value) => out.push_str(value),
                None => out.push_str(&rest[start..start + 2 + end + 2]),
            }
            rest = &after[end + 2..];
        }

        out.push_str(rest);
        out
    }
}

/// Read and parse a collection file.
pub fn load_collection(path: &Path) -> Result<Collection, Error> {
    let bytes = std::fs::read(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let collection = parse_collection(&bytes)?;
    tracing::debug!(
        path = %path.display(),
        requests = collection.requests.len(),
        "loaded collection"
    );
    Ok(collection)
}

/// Parse a collection document.
pub fn parse_collection(bytes: &[u8]) -> Result<Collection, ParseError> {
    let root: Json = serde_json::from_slice(bytes)?;
    if !root.is_object() {
        return Err(wrong_shape("$", "an object", &root));
    }

    let name = root
        .pointer("/info/name")
        .and_then(|n| n.as_str())
        .ok_or_else(|| ParseError::MissingField("info.name".into()))?
        .to_string();
    let description = root.pointer("/info/description").and_then(description);
    let variables = key_values(root.get("variable"), "variable")?;
    let collection_auth = root.get("auth").and_then(auth);

    let mut requests = Vec::new();
    if let Some(items) = root.get("item") {
        let mut walker = Walker {
            auth: collection_auth.as_ref(),
            folder: Vec::new(),
            out: &mut requests,
        };
        walker.items(items, "item")?;
    }

    Ok(Collection {
        name,
        description,
        requests,
        variables,
    })
}

struct Walker<'a> {
    auth: Option<&'a Auth>,
    folder: Vec<String>,
    out: &'a mut Vec<RequestItem>,
}

impl Walker<'_> {
    fn items(&mut self, items: &Json, path: &str) -> Result<(), ParseError> {
        let Some(entries) = items.as_array() else {
            return Err(wrong_shape(path, "an array", items));
        };

        for (i, entry) in entries.iter().enumerate() {
            let entry_path = format!("{}[{}]", path, i);
            if !entry.is_object() {
                return Err(wrong_shape(&entry_path, "an object", entry));
            }
            let name = entry
                .get("name")
                .and_then(|n| n.as_str())
                .ok_or_else(|| ParseError::MissingField(format!("{}.name", entry_path)))?;

            if let Some(children) = entry.get("item") {
                self.folder.push(name.to_string());
                self.items(children, &format!("{}.item", entry_path))?;
                self.folder.pop();
            } else {
                let item = self.request(name, entry, &entry_path)?;
                self.out.push(item);
            }
        }
        Ok(())
    }

    fn request(&self, name: &str, entry: &Json, path: &str) -> Result<RequestItem, ParseError> {
        let request = entry
            .get("request")
            .ok_or_else(|| ParseError::MissingField(format!("{}.request", path)))?;

        let mut item = RequestItem {
            name: name.to_string(),
            folder: self.folder.clone(),
            method: "GET".to_string(),
            url: Url::default(),
            headers: Vec::new(),
            body: None,
            auth: self.auth.cloned(),
            events: events(entry.get("event")),
            description: entry.get("description").and_then(description),
            responses: responses(entry.get("response")),
        };

        match request {
            // Shorthand: a bare URL is a GET.
            Json::String(raw) => item.url.raw = raw.clone(),
            Json::Object(_) => {
                if let Some(method) = request.get("method").and_then(|m| m.as_str()) {
                    item.method = method.to_uppercase();
                }
                let request_path = format!("{}.request", path);
                if let Some(url_value) = request.get("url") {
                    item.url = url(url_value, &format!("{}.url", request_path))?;
                }
                item.headers = key_values(request.get("header"), &format!("{}.header", request_path))?;
                item.body = request.get("body").and_then(body);
                if let Some(auth_value) = request.get("auth") {
                    item.auth = auth(auth_value);
                }
                if item.description.is_none() {
                    item.description = request.get("description").and_then(description);
                }
            }
            other => {
                return Err(wrong_shape(
                    &format!("{}.request", path),
                    "an object or string",
                    other,
                ));
            }
        }

        Ok(item)
    }
}

fn url(value: &Json, path: &str) -> Result<Url, ParseError> {
    match value {
        Json::Null => Ok(Url::default()),
        Json::String(raw) => Ok(Url {
            raw: raw.clone(),
            ..Url::default()
        }),
        Json::Object(_) => {
            let host = segments(value.get("host"), '.');
            let path_segments = segments(value.get("path"), '/');
            let raw = match value.get("raw").and_then(|r| r.as_str()) {
                Some(raw) => raw.to_string(),
                None if !host.is_empty() || !path_segments.is_empty() => {
                    let mut raw = host.join(".");
                    for segment in &path_segments {
                        raw.push('/');
                        raw.push_str(segment);
                    }
                    raw
                }
                None => String::new(),
            };
            Ok(Url {
                raw,
                host,
                path: path_segments,
                query: key_values(value.get("query"), &format!("{}.query", path))?,
            })
        }
        other => Err(wrong_shape(path, "an object or string", other)),
    }
}

/// Host or path segments, given either as an array or a delimited string.
fn segments(value: Option<&Json>, delimiter: char) -> Vec<String> {
    match value {
        Some(Json::Array(parts)) => parts.iter().map(text).collect(),
        Some(Json::String(s)) => s
            .split(delimiter)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

/// Key/value pairs from an array of `{key, value, disabled?}` objects.
///
/// A string is accepted as `Key: Value` lines (older exports use that form
/// for headers).
fn key_values(value: Option<&Json>, path: &str) -> Result<Vec<KeyValue>, ParseError> {
    match value {
        None | Some(Json::Null) => Ok(Vec::new()),
        Some(Json::Array(entries)) => Ok(entries
            .iter()
            .filter(|e| e.get("disabled").and_then(|d| d.as_bool()) != Some(true))
            .filter_map(|e| {
                let key = e.get("key")?;
                Some(KeyValue {
                    key: text(key),
                    value: e.get("value").map(text).unwrap_or_default(),
                })
            })
            .collect()),
        Some(Json::String(lines)) => Ok(lines
            .lines()
            .filter_map(|line| {
                let (key, value) = line.split_once(':')?;
                Some(KeyValue {
                    key: key.trim().to_string(),
                    value: value.trim().to_string(),
                })
            })
            .collect()),
        Some(other) => Err(wrong_shape(path, "an array", other)),
    }
}

/// Decode a request body into a structured value.
fn body(value: &Json) -> Option<Value> {
    let mode = match value {
        Json::Null => return None,
        Json::Object(map) => match map.get("mode").and_then(|m| m.as_str()) {
            Some(mode) => mode,
            None => return Some(Value::from(value)),
        },
        other => return Some(Value::from(other)),
    };

    match mode {
        "raw" => {
            let raw = value.get("raw").and_then(|r| r.as_str()).unwrap_or("");
            if raw.trim().is_empty() {
                return None;
            }
            match serde_json::from_str::<Json>(raw) {
                Ok(parsed) => Some(Value::from(parsed)),
                Err(_) => Some(Value::Text(raw.to_string())),
            }
        }
        "urlencoded" | "formdata" => {
            let pairs = key_values(value.get(mode), mode).unwrap_or_default();
            Some(Value::Object(
                pairs
                    .into_iter()
                    .map(|kv| (kv.key, Value::Text(kv.value)))
                    .collect(),
            ))
        }
        "graphql" => {
            let graphql = value.get("graphql")?;
            let mut fields = std::collections::BTreeMap::new();
            if let Some(query) = graphql.get("query") {
                fields.insert("query".to_string(), Value::from(query));
            }
            if let Some(variables) = graphql.get("variables") {
                // Exports store variables as JSON text.
                let variables = match variables.as_str() {
                    Some(s) if s.trim().is_empty() => Value::Null,
                    Some(s) => serde_json::from_str::<Json>(s)
                        .map(Value::from)
                        .unwrap_or_else(|_| Value::Text(s.to_string())),
                    None => Value::from(variables),
                };
                fields.insert("variables".to_string(), variables);
            }
            Some(Value::Object(fields))
        }
        other => {
            tracing::debug!(mode = other, "ignoring body without a structured example");
            None
        }
    }
}

fn auth(value: &Json) -> Option<Auth> {
    let kind = value.get("type")?.as_str()?;
    if kind == "noauth" {
        return None;
    }
    let bearer_token = match value.get("bearer") {
        // v2.1: [{ "key": "token", "value": "..." }]
        Some(Json::Array(entries)) => entries
            .iter()
            .find(|e| e.get("key").and_then(|k| k.as_str()) == Some("token"))
            .and_then(|e| e.get("value"))
            .map(text),
        // v2.0: { "token": "..." }
        Some(Json::Object(map)) => map.get("token").map(text),
        _ => None,
    };
    Some(Auth {
        kind: kind.to_string(),
        bearer_token,
    })
}

fn events(value: Option<&Json>) -> Vec<Event> {
    let Some(entries) = value.and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    entries
        .iter()
        .map(|e| {
            let script = e.get("script");
            let exec = match script.and_then(|s| s.get("exec")) {
                Some(Json::Array(lines)) => lines.iter().map(text).collect(),
                Some(Json::String(s)) => s.lines().map(String::from).collect(),
                _ => Vec::new(),
            };
            Event {
                listen: e.get("listen").map(text).unwrap_or_default(),
                script_type: script
                    .and_then(|s| s.get("type"))
                    .and_then(|t| t.as_str())
                    .map(String::from),
                exec,
            }
        })
        .collect()
}

fn responses(value: Option<&Json>) -> Vec<Response> {
    value
        .and_then(|v| v.as_array())
        .map(|entries| {
            entries
                .iter()
                .map(|r| Response {
                    name: r.get("name").map(text).unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn description(value: &Json) -> Option<String> {
    match value {
        Json::String(s) => Some(s.clone()),
        Json::Object(_) => value
            .get("content")
            .and_then(|c| c.as_str())
            .map(String::from),
        _ => None,
    }
}

/// Text form of a scalar; strings are taken verbatim.
fn text(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        Json::Null => String::new(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}

fn wrong_shape(path: &str, expected: &'static str, found: &Json) -> ParseError {
    ParseError::WrongShape {
        path: path.to_string(),
        expected,
        found: json_kind(found),
    }
}
