//! Named, typed, optional metadata attached to a
//! [`crate::basic_type::BasicType`].

use confschema_core::error::Error;
use confschema_core::{Arity, Scalar};
use indexmap::IndexMap;
use snafu::Backtrace;

use crate::constraint::RangeSpec;
use crate::dependency::Dependency;

/// File open mode, for [`Attribute::Mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Read,
    ReadWrite,
    Write,
    WriteRead,
    Append,
    AppendRead,
}

impl FileMode {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "r" => Some(Self::Read),
            "r+" => Some(Self::ReadWrite),
            "w" => Some(Self::Write),
            "w+" => Some(Self::WriteRead),
            "a" => Some(Self::Append),
            "a+" => Some(Self::AppendRead),
            _ => None,
        }
    }
}

/// One metadata item attached to a type definition (spec.md §4.4).
#[derive(Debug, Clone)]
pub enum Attribute {
    Kind(String),
    Arity(Arity),
    Doc(String),
    Deprecated(String),
    Inherit(bool),
    Hook {
        path: String,
        pattern: String,
        value: String,
    },
    Default(Vec<Scalar>),
    Either(Vec<Scalar>),
    Range(RangeSpec),
    Map(IndexMap<String, Scalar>),
    Model(String),
    Template(String),
    Size(Arity),
    Deps(Vec<Dependency>),
    Bind(IndexMap<String, i64>),
    Mode(FileMode),
}

impl Attribute {
    /// The attribute's name, as it would appear in a model file.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Attribute::Kind(_) => "kind",
            Attribute::Arity(_) => "arity",
            Attribute::Doc(_) => "doc",
            Attribute::Deprecated(_) => "deprecated",
            Attribute::Inherit(_) => "inherit",
            Attribute::Hook { .. } => "hook",
            Attribute::Default(_) => "default",
            Attribute::Either(_) => "either",
            Attribute::Range(_) => "range",
            Attribute::Map(_) => "map",
            Attribute::Model(_) => "model",
            Attribute::Template(_) => "template",
            Attribute::Size(_) => "size",
            Attribute::Deps(_) => "deps",
            Attribute::Bind(_) => "bind",
            Attribute::Mode(_) => "mode",
        }
    }
}

/// Pairwise-exclusive attribute name pairs (SPEC_FULL.md §4.4.1).
const MUTUALLY_EXCLUSIVE: &[(&str, &str)] = &[
    ("either", "range"),
    ("either", "map"),
    ("range", "map"),
    ("hook", "either"),
    ("hook", "map"),
    ("hook", "range"),
    ("hook", "size"),
    ("inherit", "hook"),
];

/// An ordered, name-keyed collection of [`Attribute`]s on one type
/// definition.
#[derive(Debug, Clone, Default)]
pub struct AttributeSet {
    entries: IndexMap<&'static str, Attribute>,
}

impl AttributeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, attr: Attribute) {
        self.entries.insert(attr.name(), attr);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    #[must_use]
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// Validates the local schema: `doc`, if present, is non-empty, and
    /// every declared dependency's own local schema is well-formed (S0,
    /// spec.md §4.7's phase table).
    pub fn check_model(&self) -> Result<(), Error> {
        if let Some(Attribute::Doc(doc)) = self.get("doc") {
            if doc.trim().is_empty() {
                return Err(Error::AttributeSchema {
                    path: String::new(),
                    reason: "'doc' must not be empty".to_string(),
                    backtrace: Backtrace::capture(),
                });
            }
        }
        if let Some(Attribute::Deps(deps)) = self.get("deps") {
            for dep in deps {
                dep.check_model()?;
            }
        }
        Ok(())
    }

    /// Validates that no pairwise-exclusive attribute combination is
    /// present (S1, spec.md §4.4).
    pub fn flatten_model(&self) -> Result<(), Error> {
        for (a, b) in MUTUALLY_EXCLUSIVE {
            if self.contains(a) && self.contains(b) {
                return Err(Error::AttributeSchema {
                    path: String::new(),
                    reason: format!("'{a}' and '{b}' are mutually exclusive"),
                    backtrace: Backtrace::capture(),
                });
            }
        }
        Ok(())
    }

    /// Combines `self` (the parent/merged-so-far set) with `child`: for any
    /// name present in both, collection-valued attributes (`either`,
    /// `bind`, `map`) merge structurally; every other attribute present in
    /// `child` replaces the parent's. Names only in `self` are kept as-is.
    #[must_use]
    pub fn merge(&self, child: &Self) -> Self {
        let mut out = self.clone();
        for (name, attr) in &child.entries {
            let merged = match (out.entries.get(name), attr) {
                (Some(Attribute::Either(parent)), Attribute::Either(incoming)) => {
                    let mut combined = parent.clone();
                    for v in incoming {
                        if !combined.contains(v) {
                            combined.push(v.clone());
                        }
                    }
                    Attribute::Either(combined)
                }
                (Some(Attribute::Bind(parent)), Attribute::Bind(incoming)) => {
                    let mut combined = parent.clone();
                    combined.extend(incoming.clone());
                    Attribute::Bind(combined)
                }
                (Some(Attribute::Map(parent)), Attribute::Map(incoming)) => {
                    let mut combined = parent.clone();
                    combined.extend(incoming.clone());
                    Attribute::Map(combined)
                }
                _ => attr.clone(),
            };
            out.entries.insert(name, merged);
        }
        out
    }

    /// Combines `self` with `child` where every attribute `child` declares
    /// replaces the parent's wholesale, with no structural merging
    /// (glossary: "Override: child-model attribute replaces the merged
    /// parent attribute entirely").
    #[must_use]
    pub fn override_with(&self, child: &Self) -> Self {
        let mut out = self.clone();
        for (name, attr) in &child.entries {
            out.entries.insert(name, attr.clone());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_either_range_conflict() {
        let mut set = AttributeSet::new();
        set.insert(Attribute::Either(vec![Scalar::String("a".into())]));
        set.insert(Attribute::Range(RangeSpec::parse("[0,1]").unwrap()));
        assert!(set.flatten_model().is_err());
    }

    #[test]
    fn allows_doc_and_arity_together() {
        let mut set = AttributeSet::new();
        set.insert(Attribute::Doc("d".into()));
        set.insert(Attribute::Arity(Arity::parse("1")));
        assert!(set.flatten_model().is_ok());
    }

    #[test]
    fn merge_combines_either_lists() {
        let mut parent = AttributeSet::new();
        parent.insert(Attribute::Either(vec![Scalar::String("a".into())]));
        let mut child = AttributeSet::new();
        child.insert(Attribute::Either(vec![Scalar::String("b".into())]));
        let merged = parent.merge(&child);
        let Some(Attribute::Either(values)) = merged.get("either") else {
            panic!("expected either attribute");
        };
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn override_replaces_wholesale() {
        let mut parent = AttributeSet::new();
        parent.insert(Attribute::Doc("old".into()));
        let mut child = AttributeSet::new();
        child.insert(Attribute::Doc("new".into()));
        let overridden = parent.override_with(&child);
        let Some(Attribute::Doc(doc)) = overridden.get("doc") else {
            panic!("expected doc attribute");
        };
        assert_eq!(doc, "new");
    }
}
