//! Non-fatal observations accumulated while running the pipeline.
//!
//! Mirrors `grill-core::schema::Schemas`'s transactional `start_txn` /
//! `commit_txn` / `rollback_txn` pattern: a phase that may need to back out
//! of partial work (e.g. `expand-instance` abandoning one candidate
//! expansion for another) marks a point with [`Diagnostics::mark`] and
//! either keeps everything recorded since or rolls back to it.

use crate::path::Path;

/// The kind of a single diagnostic record (spec.md §4's non-fatal
/// observations, separate from the fatal [`crate::error::Error`] taxonomy).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// A missing value was filled from an attribute's `default`.
    Defaulted,
    /// A value was copied down from an `inherit` source.
    Inherited,
    /// An optional arity was promoted to required by a dependency.
    Promoted,
    /// An option was left with no value and no default.
    Undefined,
    /// An instance key had no corresponding model option (ignored, not an
    /// error, unless the model forbids unknown keys).
    Unexpected,
}

/// One recorded diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: Kind,
    pub path: String,
    pub note: String,
}

/// An append-only log of [`Diagnostic`]s for a single pipeline run, with
/// transactional mark/rollback support.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: Kind, path: &Path, note: impl Into<String>) {
        self.records.push(Diagnostic {
            kind,
            path: path.to_string(),
            note: note.into(),
        });
    }

    #[must_use]
    pub fn records(&self) -> &[Diagnostic] {
        &self.records
    }

    #[must_use]
    pub fn of_kind(&self, kind: Kind) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter().filter(move |d| d.kind == kind)
    }

    /// Clears all recorded diagnostics.
    pub fn reset(&mut self) {
        self.records.clear();
    }

    /// Marks the current length as a transaction savepoint.
    #[must_use]
    pub fn mark(&self) -> usize {
        self.records.len()
    }

    /// Discards every record appended since `savepoint`.
    pub fn rollback(&mut self, savepoint: usize) {
        self.records.truncate(savepoint.min(self.records.len()));
    }

    /// A no-op that simply documents the commit half of the mark/rollback
    /// pair: the records appended since `savepoint` are kept.
    pub fn commit(&self, _savepoint: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollback_discards_since_mark() {
        let mut d = Diagnostics::new();
        d.record(Kind::Defaulted, &Path::empty(), "a");
        let mark = d.mark();
        d.record(Kind::Inherited, &Path::empty(), "b");
        d.rollback(mark);
        assert_eq!(d.records().len(), 1);
        assert_eq!(d.records()[0].kind, Kind::Defaulted);
    }

    #[test]
    fn reset_clears_everything() {
        let mut d = Diagnostics::new();
        d.record(Kind::Undefined, &Path::empty(), "x");
        d.reset();
        assert!(d.records().is_empty());
    }
}
