//! The error taxonomy shared by every phase of the pipeline.
//!
//! One flat `snafu` enum, grouped roughly by which phase raises each
//! variant (spec.md §7's phase/error table), with `Backtrace` captured the
//! way `grill-core::error` captures one for every public error path.

use snafu::{Backtrace, Snafu};

use crate::path::Path;

/// An error from any stage of model or instance processing.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// A path literal failed to parse.
    #[snafu(display("invalid path {text:?}: {reason}"))]
    InvalidPath {
        text: String,
        reason: String,
        backtrace: Backtrace,
    },

    /// An attribute was malformed, duplicated, or violated a mutual
    /// exclusion rule.
    #[snafu(display("invalid attribute schema at {path}: {reason}"))]
    AttributeSchema {
        path: String,
        reason: String,
        backtrace: Backtrace,
    },

    /// An instance value's occurrence count fell outside its arity.
    #[snafu(display("arity mismatch at {path}: expected {expected}, found {found}"))]
    ArityMismatch {
        path: String,
        expected: String,
        found: u64,
        backtrace: Backtrace,
    },

    /// A value violated a type, range, or enumeration constraint.
    #[snafu(display("value constraint violated at {path}: {reason}"))]
    ValueConstraint {
        path: String,
        reason: String,
        backtrace: Backtrace,
    },

    /// A `Require` dependency's target was not present in the instance.
    #[snafu(display("unresolved dependency: {path} requires {target}"))]
    DependencyUnresolved {
        path: String,
        target: String,
        backtrace: Backtrace,
    },

    /// A dependency's `when` guard or constraint subset check failed.
    #[snafu(display("dependency constraint violated at {path}: {reason}"))]
    DependencyConstraint {
        path: String,
        reason: String,
        backtrace: Backtrace,
    },

    /// A model's `include`/inheritance graph contains a cycle.
    #[snafu(display("circular include detected: {cycle}"))]
    CircularInclude { cycle: String, backtrace: Backtrace },

    /// A kind-specific textual form (IPv4, MAC, URI, CPUID...) failed to
    /// parse.
    #[snafu(display("unsupported format at {path}: {reason}"))]
    UnsupportedFormat {
        path: String,
        reason: String,
        backtrace: Backtrace,
    },

    /// A referenced model file or inlined model name could not be
    /// resolved by the registry.
    #[snafu(display("model not found: {name}"))]
    ModelNotFound { name: String, backtrace: Backtrace },

    /// An instance value was supplied for an option whose arity is
    /// `Disabled`.
    #[snafu(display("disabled option used at {path}"))]
    DisabledOptionUsed { path: String, backtrace: Backtrace },

    /// An option marked `deprecated` was used; carried as a diagnostic,
    /// not necessarily fatal (see [`crate::diagnostics::Diagnostics`]).
    #[snafu(display("deprecated option used at {path}: {note}"))]
    Deprecated {
        path: String,
        note: String,
        backtrace: Backtrace,
    },

    /// Catch-all for invariant violations that should be unreachable in
    /// correct callers (e.g. arena key from the wrong tree).
    #[snafu(display("unexpected engine error: {reason}"))]
    Unexpected { reason: String, backtrace: Backtrace },

    /// A dependency target contains a `%` placeholder but the owning option
    /// is not a `String` carrying an `either` attribute (spec.md §4.5).
    #[snafu(display("unbound value expansion at {path}: {reason}"))]
    UnboundValueExpansion {
        path: String,
        reason: String,
        backtrace: Backtrace,
    },
}

impl From<crate::value::TreeError> for Error {
    fn from(e: crate::value::TreeError) -> Self {
        Error::Unexpected {
            reason: e.to_string(),
            backtrace: Backtrace::capture(),
        }
    }
}

impl Error {
    /// Builds an [`Error::InvalidPath`] from a [`crate::path::InvalidPathFormat`].
    #[must_use]
    pub fn from_invalid_path(e: crate::path::InvalidPathFormat) -> Self {
        Error::InvalidPath {
            text: e.text,
            reason: e.reason,
            backtrace: Backtrace::capture(),
        }
    }

    /// A human-readable path label for diagnostics, falling back to `$`
    /// for the root.
    #[must_use]
    pub fn path_label(path: &Path) -> String {
        let s = path.to_string();
        if s.is_empty() {
            "$".to_string()
        } else {
            s
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
