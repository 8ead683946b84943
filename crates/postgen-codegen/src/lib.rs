//! Client and model code generation from Postman collections.
//!
//! `postgen-codegen` reads a Postman collection, infers a model for every
//! request's example body, and renders models plus one client-call source
//! file per request through an emitter's templates.
//!
//! # Architecture
//!
//! ```text
//! Input                 Entities              Emitters            Sink
//! ─────────────     ──────────────────     ───────────────     ──────────────
//! collection.json ─> Collection ──┬──> infer ─> context ─┬─> go     ─> FsSink
//!                    (collection)  │    (infer)  (context) └─> rust   └> MemorySink
//!                                  └── naming, collision policy (generate)
//! ```
//!
//! Generation is pure and deterministic: the same collection and options
//! always produce byte-identical artifacts. Only [`Generated::write_to`]
//! touches an [`ArtifactSink`].
//!
//! # Example
//!
//! ```
//! use postgen_codegen::{GenerateOptions, MemorySink, builtin_emitter, generate, parse_collection};
//!
//! let collection = parse_collection(br#"{
//!     "info": { "name": "Basic Collection" },
//!     "item": [{
//!         "name": "Create Order",
//!         "request": {
//!             "method": "POST",
//!             "url": "https://shop.test/orders",
//!             "body": { "mode": "raw", "raw": "{\"amount\": 100, \"currency\": \"INR\"}" }
//!         }
//!     }]
//! }"#).unwrap();
//!
//! let emitter = builtin_emitter("go").unwrap();
//! let generated = generate(&collection, &emitter, &GenerateOptions::default()).unwrap();
//!
//! let mut sink = MemorySink::new();
//! generated.write_to(&mut sink).unwrap();
//! let models = sink.text("basic_collection/models.go").unwrap();
//! assert!(models.contains("Amount   float64 `json:\"amount\"`"));
//! assert!(sink.text("basic_collection/create_order_request.go").is_some());
//! ```
//!
//! # Feature Flags
//!
//! - `emitter-go` - Go structs and `net/http` calls
//! - `emitter-rust` - serde structs and `reqwest` calls

pub mod collection;
pub mod context;
pub mod emitter;
pub mod error;
pub mod generate;
pub mod infer;
pub mod naming;
pub mod sink;
pub mod template;
pub mod value;

pub use collection::{Collection, ParseError, RequestItem, load_collection, parse_collection};
pub use emitter::{CodeEmitter, TemplateEmitter, builtin_emitter, emitter_names};
pub use error::{Error, Result};
pub use generate::{Artifact, CollisionPolicy, GenerateOptions, Generated, generate};
pub use infer::{FieldSpec, InferenceError, TypeLabel, infer_fields, infer_type};
pub use sink::{ArtifactSink, ExistingDirPolicy, FsSink, MemorySink, SinkError};
pub use template::{RenderError, Template};
pub use value::Value;
