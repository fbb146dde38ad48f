//! The external format-plugin interface (spec.md §6). Concrete scanners
//! (JSON, YAML, TOML, ...) are explicitly out of scope; this crate defines
//! only the trait the [`crate::registry::Registry`] dispatches through.

use std::io;
use std::path::Path as StdPath;

use confschema_core::{NodeId, Tree};

/// Output layout requested of [`Scanner::dump`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpFormat {
    Compact,
    Default,
    Inlined,
}

/// A format plugin: reads/writes one concrete textual configuration
/// format into/out of the generic [`Tree`].
#[cfg_attr(test, mockall::automock)]
pub trait Scanner: std::fmt::Debug {
    /// Canonical short name (e.g. `"json"`), used for command-line lookup.
    fn name(&self) -> &str;
    /// Canonical file extension (e.g. `"json"`), used for path-based lookup.
    fn extension(&self) -> &str;
    /// Reads a single document from `path`. `None` on failure.
    fn open(&self, path: &StdPath, argv: &[String]) -> Option<Tree>;
    /// Parses a single document from an in-memory string.
    fn parse(&self, input: &str, argv: &[String]) -> Option<Tree>;
    /// Writes `node` of `tree` to `sink` in the requested layout.
    fn dump(
        &self,
        tree: &Tree,
        node: NodeId,
        format: DumpFormat,
        sink: &mut dyn io::Write,
    ) -> io::Result<()>;
    /// Multi-document variant of [`Scanner::open`]; default: single-document
    /// formats return at most one element.
    fn open_all(&self, path: &StdPath, argv: &[String]) -> Vec<Tree> {
        self.open(path, argv).into_iter().collect()
    }
    /// Multi-document variant of [`Scanner::parse`].
    fn parse_all(&self, input: &str, argv: &[String]) -> Vec<Tree> {
        self.parse(input, argv).into_iter().collect()
    }
}
