//! Generic tree/path/arity engine underlying the configuration-schema
//! compiler.
//!
//! This crate has no notion of options, sections, or models — that's
//! `confschema-model`, layered on top. What lives here is the reusable
//! substrate every phase of the pipeline shares:
//!
//! - [`path`]: the JSONPath-like sub-language used to address subtrees.
//! - [`value`]: the arena-backed polymorphic [`value::Tree`] that both
//!   model and instance documents are represented as.
//! - [`arity`]: the cardinality lattice used to express "how many of this
//!   are allowed".
//! - [`error`]: the flat error taxonomy shared by every phase.
//! - [`diagnostics`]: the non-fatal observation log threaded through a
//!   pipeline run.
//!
//! The split mirrors `grill-core` underlying `grill-json-schema`: a small,
//! vocabulary-agnostic engine that a concrete schema language is built on.

pub mod arity;
pub mod diagnostics;
pub mod error;
pub mod path;
pub mod value;

pub use arity::Arity;
pub use error::{Error, Result};
pub use path::Path;
pub use value::{NodeId, Scalar, Tree};
