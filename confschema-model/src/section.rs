//! An ordered, name-keyed map of [`BasicType`]s: the body or templates
//! area of a [`crate::model::Model`] (spec.md §4.7).

use confschema_core::diagnostics::{Diagnostics, Kind as DiagKind};
use confschema_core::error::Error;
use confschema_core::{NodeId, Path, Tree};
use indexmap::IndexMap;

use crate::basic_type::{BasicType, PathContext};

/// An ordered name-keyed map of [`BasicType`]s.
#[derive(Debug, Clone, Default)]
pub struct Section {
    children: IndexMap<String, BasicType>,
}

impl Section {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ty: BasicType) {
        self.children.insert(ty.name.clone(), ty);
    }

    #[must_use]
    pub fn get_named(&self, name: &str) -> Option<&BasicType> {
        self.children.get(name)
    }

    #[must_use]
    pub fn get_named_mut(&mut self, name: &str) -> Option<&mut BasicType> {
        self.children.get_mut(name)
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &BasicType> {
        self.children.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// S0: validates every child.
    pub fn check_model(&self) -> Result<(), Error> {
        for child in self.children.values() {
            child.check_model()?;
        }
        Ok(())
    }

    /// S1: flattens every child.
    pub fn flatten_model(&self) -> Result<(), Error> {
        for child in self.children.values() {
            child.flatten_model()?;
        }
        Ok(())
    }

    /// S2: validates every child.
    pub fn validate_model(&self) -> Result<(), Error> {
        for child in self.children.values() {
            child.validate_model()?;
        }
        Ok(())
    }

    /// Combines `self` (parent) with `child`: a name present in both must
    /// be mergeable (same kind); otherwise the child's type wins as a new
    /// insertion point. A name only in `child` is inserted.
    pub fn merge(&self, child: &Self) -> Result<Self, Error> {
        let mut out = self.clone();
        for (name, ty) in &child.children {
            match out.children.get(name) {
                Some(existing) if existing.kind != ty.kind => {
                    return Err(Error::AttributeSchema {
                        path: name.clone(),
                        reason: format!(
                            "cannot merge {:?} into {:?}: kind mismatch",
                            ty.kind, existing.kind
                        ),
                        backtrace: snafu::Backtrace::capture(),
                    });
                }
                Some(existing) => {
                    let merged_attrs = existing.attributes.merge(&ty.attributes);
                    let mut merged = existing.clone();
                    merged.attributes = merged_attrs;
                    merged.arity = ty.arity;
                    out.children.insert(name.clone(), merged);
                }
                None => {
                    out.children.insert(name.clone(), ty.clone());
                }
            }
        }
        Ok(out)
    }

    /// Like [`Section::merge`] but `child`'s attributes replace the
    /// parent's wholesale rather than merging structurally (glossary:
    /// "Override").
    #[must_use]
    pub fn override_with(&self, child: &Self) -> Self {
        let mut out = self.clone();
        for (name, ty) in &child.children {
            match out.children.get(name) {
                Some(existing) => {
                    let mut overridden = existing.clone();
                    overridden.attributes = existing.attributes.override_with(&ty.attributes);
                    overridden.arity = ty.arity;
                    out.children.insert(name.clone(), overridden);
                }
                None => {
                    out.children.insert(name.clone(), ty.clone());
                }
            }
        }
        out
    }

    /// Every immediate instance key present that has no matching model
    /// child is recorded as `Unexpected`; `strict` additionally turns that
    /// into a hard failure.
    pub fn check_instance(
        &self,
        tree: &Tree,
        node: NodeId,
        diagnostics: &mut Diagnostics,
        strict: bool,
    ) -> Result<(), Error> {
        let mut unexpected = Vec::new();
        tree.each(node, |child| {
            let key = tree.name(child).to_string();
            if !self.children.contains_key(&key) {
                unexpected.push(key);
            }
        });
        for key in &unexpected {
            let path = Path::parse(&format!(".{key}")).unwrap_or_else(|_| Path::empty());
            diagnostics.record(DiagKind::Unexpected, &path, "no matching model option");
        }
        if strict && !unexpected.is_empty() {
            return Err(Error::Unexpected {
                reason: format!("unexpected keys: {}", unexpected.join(", ")),
                backtrace: snafu::Backtrace::capture(),
            });
        }
        for child in self.children.values() {
            let path = Path::parse(&format!(".{}", child.name)).map_err(Error::from_invalid_path)?;
            if let Some(&id) = tree.get(node, &path).first() {
                child.check_instance(tree, id)?;
            }
        }
        Ok(())
    }

    /// The dependency-stabilisation expansion loop (spec.md §4.7): inject
    /// defaults, re-run until a pass adds nothing new.
    pub fn expand_instance(
        &self,
        tree: &mut Tree,
        node: NodeId,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), Error> {
        loop {
            let mut added = false;
            for child in self.children.values() {
                let path = Path::parse(&format!(".{}", child.name)).map_err(Error::from_invalid_path)?;
                if child.expand_instance(tree, node, &path, diagnostics)? {
                    added = true;
                }
            }
            if !added {
                break;
            }
        }
        Ok(())
    }

    /// Runs every child's dependencies, erasing disabled keys.
    pub fn flatten_instance(
        &self,
        tree: &mut Tree,
        node: NodeId,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), Error> {
        for child in self.children.values() {
            let path = Path::parse(&format!(".{}", child.name)).map_err(Error::from_invalid_path)?;
            child.flatten_instance(tree, node, &path, diagnostics)?;
        }
        Ok(())
    }

    /// Validates presence/absence of every declared option against its
    /// arity.
    pub fn resolve_instance(
        &self,
        tree: &Tree,
        node: NodeId,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), Error> {
        for child in self.children.values() {
            let path = Path::parse(&format!(".{}", child.name)).map_err(Error::from_invalid_path)?;
            child.resolve_instance(tree, node, &path, diagnostics)?;
        }
        Ok(())
    }

    /// Path-introspection dispatch (spec.md §4.7): the first item selects
    /// a named (or every, for `Any`/recursive) child, remaining items
    /// recurse into it.
    #[must_use]
    pub fn get<'a>(&'a self, path: &Path, ctx: &'a dyn PathContext) -> Vec<&'a BasicType> {
        let segs = path.segments();
        let Some(first) = segs.first() else {
            return Vec::new();
        };
        let rest = path.sub(1, segs.len());
        match &first.item {
            confschema_core::path::Item::Named(names) => names
                .iter()
                .filter_map(|n| self.children.get(n))
                .filter_map(|ty| ty.get(&rest, ctx))
                .collect(),
            confschema_core::path::Item::Any => self
                .children
                .values()
                .filter_map(|ty| ty.get(&rest, ctx))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// `true` iff [`Section::get`] returns at least one match.
    #[must_use]
    pub fn has(&self, path: &Path, ctx: &dyn PathContext) -> bool {
        !self.get(path, ctx).is_empty()
    }

    /// Promotes the arity of every direct child matched by `path`'s first
    /// (`Named`/`Any`) item when `path` has exactly that one item; returns
    /// `true` if any promotion was applied.
    pub fn promote_arity(&mut self, path: &Path) -> bool {
        let segs = path.segments();
        let Some(first) = segs.first() else {
            return false;
        };
        if segs.len() != 1 {
            return false;
        }
        let mut promoted = false;
        match &first.item {
            confschema_core::path::Item::Named(names) => {
                for n in names {
                    if let Some(ty) = self.children.get_mut(n) {
                        promoted |= ty.promote_arity(&Path::empty());
                    }
                }
            }
            confschema_core::path::Item::Any => {
                for ty in self.children.values_mut() {
                    promoted |= ty.promote_arity(&Path::empty());
                }
            }
            _ => {}
        }
        promoted
    }

    /// Disables every direct child matched by `path`'s single `Named`/`Any`
    /// item.
    pub fn disable(&mut self, path: &Path) {
        let segs = path.segments();
        let Some(first) = segs.first() else {
            return;
        };
        if segs.len() != 1 {
            return;
        }
        match &first.item {
            confschema_core::path::Item::Named(names) => {
                for n in names {
                    if let Some(ty) = self.children.get_mut(n) {
                        ty.disable(&Path::empty());
                    }
                }
            }
            confschema_core::path::Item::Any => {
                for ty in self.children.values_mut() {
                    ty.disable(&Path::empty());
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{Attribute, AttributeSet};
    use crate::basic_type::NoContext;
    use crate::kind::Kind;
    use confschema_core::Arity;

    fn leaf(name: &str) -> BasicType {
        let mut attrs = AttributeSet::new();
        attrs.insert(Attribute::Doc("d".to_string()));
        BasicType::new(name, Kind::Integer, Arity::parse("?"), attrs)
    }

    #[test]
    fn merge_rejects_kind_mismatch() {
        let mut a = Section::new();
        a.insert(leaf("x"));
        let mut b = Section::new();
        let mut attrs = AttributeSet::new();
        attrs.insert(Attribute::Doc("d".to_string()));
        b.insert(BasicType::new("x", Kind::String, Arity::parse("?"), attrs));
        assert!(a.merge(&b).is_err());
    }

    #[test]
    fn merge_inserts_new_names() {
        let mut a = Section::new();
        a.insert(leaf("x"));
        let mut b = Section::new();
        b.insert(leaf("y"));
        let merged = a.merge(&b).unwrap();
        assert!(merged.get_named("x").is_some());
        assert!(merged.get_named("y").is_some());
    }

    #[test]
    fn get_dispatches_named() {
        let mut s = Section::new();
        s.insert(leaf("x"));
        let path = Path::parse(".x").unwrap();
        assert_eq!(s.get(&path, &NoContext).len(), 1);
    }
}
