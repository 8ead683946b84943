//! Crate-level error type.
//!
//! Every variant is fatal: a run stops at the first one.

use crate::collection::ParseError;
use crate::infer::InferenceError;
use crate::sink::SinkError;
use crate::template::RenderError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("read error: cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("directory exists: {} is already present", path.display())]
    DirectoryExists { path: PathBuf },

    #[error("inference error in request `{request}`: {source}")]
    Inference {
        request: String,
        source: InferenceError,
    },

    #[error("render error in {context}: {source}")]
    Render {
        context: String,
        source: RenderError,
    },

    #[error("write error: cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("name collision: requests `{first}` and `{second}` both map to `{ident}`")]
    Collision {
        first: String,
        second: String,
        ident: String,
    },

    #[error("unsupported key in request `{request}`: the {emitter} emitter cannot represent {key:?}")]
    UnsupportedKey {
        request: String,
        key: String,
        emitter: String,
    },

    #[error("unknown emitter `{name}` (available: {available})")]
    UnknownEmitter { name: String, available: String },
}

impl From<SinkError> for Error {
    fn from(err: SinkError) -> Self {
        match err {
            SinkError::DirectoryExists { path } => Error::DirectoryExists { path },
            SinkError::Io { path, source } => Error::Write { path, source },
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
