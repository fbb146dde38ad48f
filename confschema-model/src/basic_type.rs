//! The abstract option definition: a kind, an arity, attributes, and
//! dependencies, polymorphic over [`Kind`] (spec.md §4.6).

use confschema_core::diagnostics::{Diagnostics, Kind as DiagKind};
use confschema_core::error::Error;
use confschema_core::{Arity, NodeId, Path, Scalar, Tree};
use regex::Regex;
use snafu::Backtrace;

use crate::attribute::Attribute;
use crate::attribute::AttributeSet;
use crate::dependency::{self, Dependency};
use crate::kind::Kind;
use crate::section::Section;

/// Context giving a [`BasicType`] access to the sibling structures it needs
/// to address sub-options across a `Class`/`Plugin`/`Selector` boundary
/// (spec.md §9's "path anywhere in the model tree" requirement).
pub trait PathContext {
    /// A named template from the enclosing model's `templates` section
    /// (for `Selector`).
    fn template(&self, name: &str) -> Option<&BasicType>;
    /// The body of a loaded model named by a `Class`'s `model` attribute.
    fn class_body(&self, model_name: &str) -> Option<&Section>;
    /// The plugin model matched for `child_name` under a `Plugin` option,
    /// by trigger dispatch.
    fn plugin_child(&self, child_name: &str) -> Option<&BasicType>;
}

/// A context with no cross-model knowledge; `Class`/`Plugin`/`Selector`
/// traversal always misses. Useful for addressing within a single,
/// self-contained body that declares no templates/includes.
#[derive(Debug, Default)]
pub struct NoContext;

impl PathContext for NoContext {
    fn template(&self, _name: &str) -> Option<&BasicType> {
        None
    }
    fn class_body(&self, _model_name: &str) -> Option<&Section> {
        None
    }
    fn plugin_child(&self, _child_name: &str) -> Option<&BasicType> {
        None
    }
}

/// One option definition: `(kind, name, arity, attributes)`
/// (spec.md §3.4). Dependencies live inside `attributes` as
/// [`Attribute::Deps`], mirroring the model-file shape.
#[derive(Debug, Clone)]
pub struct BasicType {
    pub name: String,
    pub kind: Kind,
    pub arity: Arity,
    pub attributes: AttributeSet,
}

impl BasicType {
    /// Builds a `BasicType`, taking its arity from `attributes`'s `arity`
    /// attribute if present, else the explicit `arity` argument.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: Kind, arity: Arity, attributes: AttributeSet) -> Self {
        Self {
            name: name.into(),
            kind,
            arity,
            attributes,
        }
    }

    fn deps(&self) -> &[Dependency] {
        match self.attributes.get("deps") {
            Some(Attribute::Deps(deps)) => deps,
            _ => &[],
        }
    }

    /// `true` for the three kinds whose instance value is an `Object`.
    #[must_use]
    pub fn is_object(&self) -> bool {
        self.kind.is_object()
    }

    #[must_use]
    pub fn is_enumerated(&self) -> bool {
        self.attributes.contains("either")
    }

    #[must_use]
    pub fn is_ranged(&self) -> bool {
        self.attributes.contains("range")
    }

    #[must_use]
    pub fn is_mapped(&self) -> bool {
        self.attributes.contains("map")
    }

    /// S0: declared arity lies within the kind's permitted pattern, the
    /// attribute schema is locally well-formed, and every dependency's own
    /// schema is well-formed.
    pub fn check_model(&self) -> Result<(), Error> {
        if !self.arity.is_valid() {
            return Err(Error::ArityMismatch {
                path: self.name.clone(),
                expected: "a valid arity literal".to_string(),
                found: 0,
                backtrace: Backtrace::capture(),
            });
        }
        if !self.kind.permitted_arity(&self.arity) {
            return Err(Error::ArityMismatch {
                path: self.name.clone(),
                expected: format!("an arity permitted for {}", self.kind.type_name()),
                found: self.arity.min(),
                backtrace: Backtrace::capture(),
            });
        }
        self.attributes.check_model()?;
        for dep in self.deps() {
            if dep.has_placeholder() && !(self.kind == Kind::String && self.is_enumerated()) {
                return Err(Error::UnboundValueExpansion {
                    path: self.name.clone(),
                    reason: "a '%' placeholder dependency target requires the owning option \
                             to be a String carrying an 'either' attribute"
                        .to_string(),
                    backtrace: Backtrace::capture(),
                });
            }
        }
        Ok(())
    }

    /// S1: attribute mutual exclusions.
    pub fn flatten_model(&self) -> Result<(), Error> {
        self.attributes.flatten_model()
    }

    /// S2: the `default` value(s), if any, satisfy `either`/`range`/`map`.
    pub fn validate_model(&self) -> Result<(), Error> {
        if self.kind.is_object() {
            return Ok(());
        }
        if let Some(Attribute::Default(values)) = self.attributes.get("default") {
            for v in values {
                self.kind.validate_scalar(v, &self.attributes)?;
            }
        }
        Ok(())
    }

    /// S3: the instance value at `node` (scalar kinds only — object kinds
    /// are validated structurally by [`crate::section::Section`]) matches
    /// this type's format and `either`/`range`/`map` constraints.
    pub fn check_instance(&self, tree: &Tree, node: NodeId) -> Result<(), Error> {
        if self.kind.is_object() {
            return Ok(());
        }
        let mut values = Vec::new();
        tree.each(node, |child| {
            if let Some(scalar) = scalar_of(tree, child) {
                values.push(scalar);
            }
        });
        for v in &values {
            self.kind.validate_scalar(v, &self.attributes)?;
        }
        Ok(())
    }

    /// Injects the `default` attribute's value(s) at `path` if the
    /// instance omits the key, recording a `Defaulted` diagnostic.
    /// Returns `true` if a value was injected.
    pub fn expand_instance(
        &self,
        tree: &mut Tree,
        from: NodeId,
        path: &Path,
        diagnostics: &mut Diagnostics,
    ) -> Result<bool, Error> {
        if tree.has(from, path) {
            return Ok(false);
        }
        let Some(Attribute::Default(values)) = self.attributes.get("default") else {
            return Ok(false);
        };
        for v in values {
            tree.put(from, path, v.clone())?;
        }
        diagnostics.record(
            DiagKind::Defaulted,
            path,
            format!("{:?} = {:?}", path, values),
        );
        Ok(true)
    }

    /// Runs every dependency's priority-ordered pass against the owner's
    /// current instance value(s), applying `%`-expansion and each
    /// dependency's constraint (S5, spec.md §4.5).
    pub fn flatten_instance(
        &self,
        tree: &mut Tree,
        from: NodeId,
        path: &Path,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), Error> {
        let mut deps: Vec<Dependency> = self.deps().to_vec();
        dependency::sort_by_priority(&mut deps);

        let owner_values: Vec<Scalar> = tree
            .get(from, path)
            .into_iter()
            .filter_map(|id| scalar_of(tree, id))
            .collect();

        for dep in &deps {
            if !dep.is_active(&owner_values) {
                continue;
            }
            let placeholder_value = owner_values
                .first()
                .map(scalar_to_string)
                .unwrap_or_default();
            let targets = dep.expand_targets(&placeholder_value)?;
            // Targets resolve against the owning model's body (spec.md §4.5),
            // i.e. relative to `from`, the same scope `path` itself is
            // addressed from — not appended onto `path` as a further
            // descent, and not hardcoded to the tree root (which would be
            // wrong once a body is nested inside a Class/Plugin instance).
            match dep.kind {
                dependency::Kind::Disable => {
                    for target in &targets {
                        let erased = tree.erase(from, target);
                        if erased > 0 {
                            tracing::warn!(path = %target, "option disabled by dependency; value erased");
                        }
                    }
                }
                dependency::Kind::Require => {
                    for target in &targets {
                        if !tree.has(from, target) {
                            return Err(Error::DependencyUnresolved {
                                path: path.to_string(),
                                target: target.to_string(),
                                backtrace: Backtrace::capture(),
                            });
                        }
                        if let Some(constraint) = &dep.constraint {
                            check_dependency_constraint(constraint, tree, from, target)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// S6: the instance satisfies this type's arity (how many values are
    /// present at `path`) and, if deprecated, records a warning.
    pub fn resolve_instance(
        &self,
        tree: &Tree,
        from: NodeId,
        path: &Path,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), Error> {
        let count = tree.get(from, path).len() as u64;
        if count == 0 && matches!(self.arity.kind(), confschema_core::arity::Kind::Disabled) {
            return Ok(());
        }
        if !self.arity.check(count) {
            return Err(Error::ArityMismatch {
                path: path.to_string(),
                expected: self.arity.to_string(),
                found: count,
                backtrace: Backtrace::capture(),
            });
        }
        if count == 0 {
            diagnostics.record(DiagKind::Undefined, path, "no value and no default");
        }
        if let Some(Attribute::Deprecated(note)) = self.attributes.get("deprecated") {
            if count > 0 {
                diagnostics.record(DiagKind::Unexpected, path, format!("deprecated: {note}"));
            }
        }
        if let Some(Attribute::Hook { path: hook_path, pattern, value }) = self.attributes.get("hook") {
            check_hook_rewrite(hook_path, pattern, value, tree, from, path)?;
        }
        Ok(())
    }

    /// Clones this type under a new name (used by `Selector` to
    /// instantiate a template for each instance key).
    #[must_use]
    pub fn clone_as(&self, new_name: impl Into<String>) -> Self {
        Self {
            name: new_name.into(),
            ..self.clone()
        }
    }

    /// `true` iff a sub-option exists at `path`, per spec.md §9's
    /// cross-kind path-introspection requirement.
    #[must_use]
    pub fn has(&self, path: &Path, ctx: &dyn PathContext) -> bool {
        self.get(path, ctx).is_some()
    }

    /// Addresses a sub-option at `path`, recursing into a `Selector`'s
    /// template or a `Class`'s nested body via `ctx`. `Plugin` recurses via
    /// `ctx.plugin_child`. Returns `None` if `ctx` cannot resolve the
    /// cross-boundary hop (e.g. [`NoContext`]).
    #[must_use]
    pub fn get<'a>(&'a self, path: &Path, ctx: &'a dyn PathContext) -> Option<&'a BasicType> {
        let segs = path.segments();
        if segs.is_empty() {
            return Some(self);
        }
        let confschema_core::path::Item::Named(names) = &segs[0].item else {
            return None;
        };
        if names.len() != 1 {
            return None;
        }
        let name = &names[0];
        let rest = path.sub(1, segs.len());
        match self.kind {
            Kind::Selector => {
                let Some(Attribute::Template(t)) = self.attributes.get("template") else {
                    return None;
                };
                ctx.template(t)?.get(&rest, ctx)
            }
            Kind::Class => {
                let Some(Attribute::Model(m)) = self.attributes.get("model") else {
                    return None;
                };
                ctx.class_body(m)?.get_named(name)?.get(&rest, ctx)
            }
            Kind::Plugin => ctx.plugin_child(name)?.get(&rest, ctx),
            _ => None,
        }
    }

    /// Promotes this type's own arity (`UpToOne -> One`, `Any ->
    /// AtLeastOne`) when `path` is empty, i.e. addresses this type itself.
    /// Cross-boundary promotion of a nested option is out of scope of this
    /// read-mostly reimplementation; see DESIGN.md.
    pub fn promote_arity(&mut self, path: &Path) -> bool {
        if path.segments().is_empty() {
            self.arity.promote()
        } else {
            false
        }
    }

    /// Disables this type's own arity when `path` is empty; see
    /// [`BasicType::promote_arity`] for the cross-boundary note.
    pub fn disable(&mut self, path: &Path) {
        if path.segments().is_empty() {
            self.arity.disable();
        }
    }
}

pub(crate) fn scalar_of(tree: &Tree, id: NodeId) -> Option<Scalar> {
    use confschema_core::value::Type;
    match tree.kind(id) {
        Type::Boolean => tree.as_bool(id).map(Scalar::Boolean),
        Type::Integer => tree.as_i64(id).map(Scalar::Integer),
        Type::Float => tree.as_f64(id).map(Scalar::Float),
        Type::String => tree.as_str(id).map(|s| Scalar::String(s.to_string())),
        _ => None,
    }
}

fn scalar_to_string(s: &Scalar) -> String {
    match s {
        Scalar::Boolean(b) => b.to_string(),
        Scalar::Integer(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::String(s) => s.clone(),
    }
}

fn check_dependency_constraint(
    constraint: &crate::dependency::Constraint,
    tree: &Tree,
    from: NodeId,
    target: &Path,
) -> Result<(), Error> {
    use crate::dependency::Constraint;
    let matches = tree.get(from, target);
    for id in matches {
        let Some(value) = scalar_of(tree, id) else {
            continue;
        };
        let ok = match constraint {
            Constraint::Either(allowed) => allowed.contains(&value),
            Constraint::Range(range) => crate::constraint::scalar_in_range(&value, range),
        };
        if !ok {
            return Err(Error::DependencyConstraint {
                path: target.to_string(),
                reason: format!("{value:?} does not satisfy the dependency's constraint"),
                backtrace: Backtrace::capture(),
            });
        }
    }
    Ok(())
}

/// Collects an option's own instance representation at each matched node:
/// its scalar value, or its keys if the node is object-valued, or its
/// elements if array-valued (spec.md glossary, "rewrite between an
/// option's enumerated source and another option's keys").
fn value_or_key_strings(tree: &Tree, ids: &[NodeId]) -> Vec<String> {
    use confschema_core::value::Type;
    let mut out = Vec::new();
    for &id in ids {
        match tree.kind(id) {
            Type::Object => tree.each(id, |child| out.push(tree.name(child).to_string())),
            Type::Array => tree.each(id, |child| {
                if let Some(s) = scalar_of(tree, child) {
                    out.push(scalar_to_string(&s));
                }
            }),
            _ => {
                if let Some(s) = scalar_of(tree, id) {
                    out.push(scalar_to_string(&s));
                }
            }
        }
    }
    out
}

/// Validates a `hook` attribute: every one of this option's own values (or
/// keys, if object-valued) must be reachable from the hooked target's
/// values/keys by matching `pattern` and rewriting with `value`
/// (`libace/model/HookAttribute.cpp`'s `resolveInstance`).
fn check_hook_rewrite(
    hook_path: &str,
    pattern: &str,
    value: &str,
    tree: &Tree,
    from: NodeId,
    path: &Path,
) -> Result<(), Error> {
    let mine = value_or_key_strings(tree, &tree.get(from, path));
    if mine.is_empty() {
        return Ok(());
    }
    let target = Path::parse(hook_path).map_err(Error::from_invalid_path)?;
    let theirs = value_or_key_strings(tree, &tree.get(from, &target));
    let re = Regex::new(pattern).map_err(|e| Error::UnsupportedFormat {
        path: path.to_string(),
        reason: format!("invalid hook pattern {pattern:?}: {e}"),
        backtrace: Backtrace::capture(),
    })?;
    let mut rewritten = Vec::with_capacity(theirs.len());
    for item in &theirs {
        if !re.is_match(item) {
            return Err(Error::ValueConstraint {
                path: target.to_string(),
                reason: format!("hook target value {item:?} does not match pattern {pattern:?}"),
                backtrace: Backtrace::capture(),
            });
        }
        rewritten.push(re.replace(item, value).into_owned());
    }
    for item in &mine {
        if !rewritten.contains(item) {
            return Err(Error::ValueConstraint {
                path: path.to_string(),
                reason: format!("{item:?} is not produced by the hook rewrite of {hook_path:?}"),
                backtrace: Backtrace::capture(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, arity: &str, doc: &str) -> BasicType {
        let mut attrs = AttributeSet::new();
        attrs.insert(Attribute::Doc(doc.to_string()));
        BasicType::new(name, Kind::Integer, Arity::parse(arity), attrs)
    }

    #[test]
    fn check_model_rejects_bad_arity() {
        let mut attrs = AttributeSet::new();
        attrs.insert(Attribute::Doc("d".to_string()));
        let t = BasicType::new("x", Kind::Integer, Arity::parse("bogus"), attrs);
        assert!(t.check_model().is_err());
    }

    #[test]
    fn selector_rejects_any_arity() {
        let mut attrs = AttributeSet::new();
        attrs.insert(Attribute::Doc("d".to_string()));
        attrs.insert(Attribute::Template("t".to_string()));
        let t = BasicType::new("s", Kind::Selector, Arity::parse("*"), attrs);
        assert!(t.check_model().is_err());
    }

    #[test]
    fn expand_instance_injects_default() {
        let mut attrs = AttributeSet::new();
        attrs.insert(Attribute::Doc("d".to_string()));
        attrs.insert(Attribute::Default(vec![Scalar::Integer(7)]));
        let t = BasicType::new("x", Kind::Integer, Arity::parse("?"), attrs);
        let mut tree = Tree::new_object();
        let root = tree.root();
        let path = Path::parse("$.x").unwrap();
        let mut diags = Diagnostics::new();
        let injected = t.expand_instance(&mut tree, root, &path, &mut diags).unwrap();
        assert!(injected);
        assert_eq!(tree.as_i64(tree.get(root, &path)[0]), Some(7));
        assert_eq!(diags.of_kind(DiagKind::Defaulted).count(), 1);
    }

    #[test]
    fn resolve_instance_checks_arity() {
        let t = leaf("x", "1", "d");
        let tree = Tree::new_object();
        let root = tree.root();
        let path = Path::parse("$.x").unwrap();
        let mut diags = Diagnostics::new();
        assert!(t.resolve_instance(&tree, root, &path, &mut diags).is_err());
    }

    #[test]
    fn check_model_rejects_placeholder_on_non_string() {
        let mut attrs = AttributeSet::new();
        attrs.insert(Attribute::Doc("d".to_string()));
        attrs.insert(Attribute::Deps(vec![Dependency::new(
            dependency::Kind::Require,
            vec![".opt-%".into()],
        )]));
        let t = BasicType::new("x", Kind::Integer, Arity::parse("?"), attrs);
        assert!(matches!(t.check_model(), Err(Error::UnboundValueExpansion { .. })));
    }

    #[test]
    fn check_model_allows_placeholder_on_enumerated_string() {
        let mut attrs = AttributeSet::new();
        attrs.insert(Attribute::Doc("d".to_string()));
        attrs.insert(Attribute::Either(vec![Scalar::String("a".into())]));
        attrs.insert(Attribute::Deps(vec![Dependency::new(
            dependency::Kind::Require,
            vec![".opt-%".into()],
        )]));
        let t = BasicType::new("x", Kind::String, Arity::parse("?"), attrs);
        assert!(t.check_model().is_ok());
    }

    #[test]
    fn resolve_instance_hook_rewrite_matches() {
        let mut attrs = AttributeSet::new();
        attrs.insert(Attribute::Doc("d".to_string()));
        attrs.insert(Attribute::Hook {
            path: ".base".into(),
            pattern: "^item-(.+)$".into(),
            value: "$1".into(),
        });
        let t = BasicType::new("ref", Kind::String, Arity::parse("1"), attrs);
        let mut tree = Tree::new_object();
        let root = tree.root();
        tree.put(root, &Path::parse("$.base").unwrap(), Scalar::String("item-a".into()))
            .unwrap();
        tree.put(root, &Path::parse("$.ref").unwrap(), Scalar::String("a".into()))
            .unwrap();
        let path = Path::parse("$.ref").unwrap();
        let mut diags = Diagnostics::new();
        assert!(t.resolve_instance(&tree, root, &path, &mut diags).is_ok());
    }

    #[test]
    fn resolve_instance_hook_rewrite_rejects_unproduced_value() {
        let mut attrs = AttributeSet::new();
        attrs.insert(Attribute::Doc("d".to_string()));
        attrs.insert(Attribute::Hook {
            path: ".base".into(),
            pattern: "^item-(.+)$".into(),
            value: "$1".into(),
        });
        let t = BasicType::new("ref", Kind::String, Arity::parse("1"), attrs);
        let mut tree = Tree::new_object();
        let root = tree.root();
        tree.put(root, &Path::parse("$.base").unwrap(), Scalar::String("item-a".into()))
            .unwrap();
        tree.put(root, &Path::parse("$.ref").unwrap(), Scalar::String("b".into()))
            .unwrap();
        let path = Path::parse("$.ref").unwrap();
        let mut diags = Diagnostics::new();
        assert!(t.resolve_instance(&tree, root, &path, &mut diags).is_err());
    }
}
