//! Tree → Model deserialization: consumes the generic [`Tree`] a scanner
//! hands the core and builds the `Header`/`Section`/`BasicType` structures
//! everything else operates on (spec.md §6, "parsed via a scanner into the
//! Tree, then consumed by the core").

use confschema_core::error::Error;
use confschema_core::{Arity, NodeId, Scalar, Tree};
use indexmap::IndexMap;
use snafu::Backtrace;

use crate::attribute::{Attribute, AttributeSet, FileMode};
use crate::basic_type::{scalar_of, BasicType};
use crate::constraint::RangeSpec;
use crate::dependency::{self, Constraint, Dependency};
use crate::header::Header;
use crate::kind::Kind;
use crate::model::Model;
use crate::section::Section;

fn schema_err(owner: &str, reason: impl Into<String>) -> Error {
    Error::AttributeSchema {
        path: owner.to_string(),
        reason: reason.into(),
        backtrace: Backtrace::capture(),
    }
}

/// Finds `id`'s direct child named `name`, by key rather than by parsing a
/// [`confschema_core::Path`] — model-file field/option names aren't bound
/// by the path grammar's identifier rules.
fn child(tree: &Tree, id: NodeId, name: &str) -> Option<NodeId> {
    let mut found = None;
    tree.each(id, |c| {
        if found.is_none() && tree.name(c) == name {
            found = Some(c);
        }
    });
    found
}

fn string_field(tree: &Tree, id: NodeId, name: &str, owner: &str) -> Result<String, Error> {
    let c = child(tree, id, name)
        .ok_or_else(|| schema_err(owner, format!("missing required field '{name}'")))?;
    tree.as_str(c)
        .map(str::to_string)
        .ok_or_else(|| schema_err(owner, format!("'{name}' must be a string")))
}

fn string_field_opt(tree: &Tree, id: NodeId, name: &str) -> Option<String> {
    child(tree, id, name).and_then(|c| tree.as_str(c).map(str::to_string))
}

fn bool_field_opt(tree: &Tree, id: NodeId, name: &str) -> Option<bool> {
    child(tree, id, name).and_then(|c| tree.as_bool(c))
}

fn string_list(tree: &Tree, id: NodeId, name: &str) -> Vec<String> {
    let Some(c) = child(tree, id, name) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    tree.each(c, |item| {
        if let Some(s) = tree.as_str(item) {
            out.push(s.to_string());
        }
    });
    out
}

/// Reads a single-scalar-or-array-of-scalars field, relying on
/// [`Tree::each`]'s documented behaviour of invoking the callback once with
/// the node itself when it is a bare scalar.
fn scalar_list(tree: &Tree, id: NodeId, name: &str) -> Vec<Scalar> {
    let Some(c) = child(tree, id, name) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    tree.each(c, |item| {
        if let Some(s) = scalar_of(tree, item) {
            out.push(s);
        }
    });
    out
}

/// Builds a [`Header`] from a model file's `header` object (spec.md §6).
pub fn parse_header(tree: &Tree, node: NodeId) -> Result<Header, Error> {
    Ok(Header {
        author: string_field(tree, node, "author", "header")?,
        doc: string_field(tree, node, "doc", "header")?,
        version: string_field(tree, node, "version", "header")?,
        package: string_list(tree, node, "package"),
        namespace: string_list(tree, node, "namespace"),
        include: string_list(tree, node, "include"),
        trigger: string_list(tree, node, "trigger"),
    })
}

/// Builds a [`Dependency`] from one entry of a `deps` list: an object
/// carrying exactly one of `require`/`disable`, plus optional `when` and an
/// `either`/`range` constraint (spec.md §4.5).
pub fn parse_dependency(tree: &Tree, node: NodeId) -> Result<Dependency, Error> {
    let (kind, targets) = if child(tree, node, "require").is_some() {
        (dependency::Kind::Require, string_list(tree, node, "require"))
    } else if child(tree, node, "disable").is_some() {
        (dependency::Kind::Disable, string_list(tree, node, "disable"))
    } else {
        return Err(schema_err("deps", "dependency must carry 'require' or 'disable'"));
    };
    let mut dep = Dependency::new(kind, targets);
    dep.when = scalar_list(tree, node, "when");

    let either = scalar_list(tree, node, "either");
    if !either.is_empty() {
        dep.constraint = Some(Constraint::Either(either));
    } else if let Some(range_str) = string_field_opt(tree, node, "range") {
        let range = RangeSpec::parse(&range_str)
            .map_err(|e| schema_err("deps", format!("invalid range {range_str:?}: {e}")))?;
        dep.constraint = Some(Constraint::Range(range));
    }
    Ok(dep)
}

/// Builds one [`BasicType`] named `name` from its option object, reading
/// every attribute spec.md §4.4 lists as an optional field.
pub fn parse_basic_type(tree: &Tree, node: NodeId, name: &str) -> Result<BasicType, Error> {
    let kind_str = string_field(tree, node, "kind", name)?;
    let kind = Kind::parse(&kind_str).ok_or_else(|| schema_err(name, format!("unknown kind '{kind_str}'")))?;
    let arity_str = string_field(tree, node, "arity", name)?;
    let arity = Arity::parse(&arity_str);

    let mut attrs = AttributeSet::new();
    attrs.insert(Attribute::Doc(string_field(tree, node, "doc", name)?));

    if let Some(note) = string_field_opt(tree, node, "deprecated") {
        attrs.insert(Attribute::Deprecated(note));
    }
    if let Some(inherit) = bool_field_opt(tree, node, "inherit") {
        attrs.insert(Attribute::Inherit(inherit));
    }
    if let Some(hook_id) = child(tree, node, "hook") {
        attrs.insert(Attribute::Hook {
            path: string_field(tree, hook_id, "path", name)?,
            pattern: string_field(tree, hook_id, "pattern", name)?,
            value: string_field(tree, hook_id, "value", name)?,
        });
    }
    let default = scalar_list(tree, node, "default");
    if !default.is_empty() {
        attrs.insert(Attribute::Default(default));
    }
    let either = scalar_list(tree, node, "either");
    if !either.is_empty() {
        attrs.insert(Attribute::Either(either));
    }
    if let Some(range_str) = string_field_opt(tree, node, "range") {
        let range = RangeSpec::parse(&range_str)
            .map_err(|e| schema_err(name, format!("invalid range {range_str:?}: {e}")))?;
        attrs.insert(Attribute::Range(range));
    }
    if let Some(map_id) = child(tree, node, "map") {
        let mut ids = Vec::new();
        tree.each(map_id, |c| ids.push(c));
        let mut map = IndexMap::new();
        for id in ids {
            let value = scalar_of(tree, id).ok_or_else(|| schema_err(name, "'map' values must be scalars"))?;
            map.insert(tree.name(id).to_string(), value);
        }
        attrs.insert(Attribute::Map(map));
    }
    if let Some(model) = string_field_opt(tree, node, "model") {
        attrs.insert(Attribute::Model(model));
    }
    if let Some(template) = string_field_opt(tree, node, "template") {
        attrs.insert(Attribute::Template(template));
    }
    if let Some(size_str) = string_field_opt(tree, node, "size") {
        attrs.insert(Attribute::Size(Arity::parse(&size_str)));
    }
    if let Some(bind_id) = child(tree, node, "bind") {
        let mut ids = Vec::new();
        tree.each(bind_id, |c| ids.push(c));
        let mut bind = IndexMap::new();
        for id in ids {
            let value = tree
                .as_i64(id)
                .ok_or_else(|| schema_err(name, "'bind' values must be integers"))?;
            bind.insert(tree.name(id).to_string(), value);
        }
        attrs.insert(Attribute::Bind(bind));
    }
    if let Some(mode_str) = string_field_opt(tree, node, "mode") {
        let mode = FileMode::parse(&mode_str)
            .ok_or_else(|| schema_err(name, format!("invalid file mode {mode_str:?}")))?;
        attrs.insert(Attribute::Mode(mode));
    }
    if let Some(deps_id) = child(tree, node, "deps") {
        let mut ids = Vec::new();
        tree.each(deps_id, |c| ids.push(c));
        let mut deps = Vec::with_capacity(ids.len());
        for id in ids {
            deps.push(parse_dependency(tree, id)?);
        }
        attrs.insert(Attribute::Deps(deps));
    }

    Ok(BasicType::new(name, kind, arity, attrs))
}

/// Builds a [`Section`] (a model's `body` or `templates` area) from an
/// object mapping option name to option object.
pub fn parse_body(tree: &Tree, node: NodeId) -> Result<Section, Error> {
    let mut ids = Vec::new();
    tree.each(node, |c| ids.push(c));
    let mut section = Section::new();
    for id in ids {
        let name = tree.name(id).to_string();
        section.insert(parse_basic_type(tree, id, &name)?);
    }
    Ok(section)
}

/// Builds a whole [`Model`] from a model file's top-level object: `header`,
/// `body`, and optional `templates` (spec.md §6's "Model file layout").
pub fn parse_model(tree: &Tree, node: NodeId) -> Result<Model, Error> {
    let header_id = child(tree, node, "header").ok_or_else(|| schema_err("model", "missing 'header'"))?;
    let header = parse_header(tree, header_id)?;
    let body_id = child(tree, node, "body").ok_or_else(|| schema_err("model", "missing 'body'"))?;
    let body = parse_body(tree, body_id)?;
    let templates = match child(tree, node, "templates") {
        Some(id) => parse_body(tree, id)?,
        None => Section::new(),
    };
    Ok(Model::new(header, templates, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_minimal_model() {
        let tree = Tree::from_json(&json!({
            "header": {"author": "a", "doc": "d", "version": "1.0"},
            "body": {
                "a": {"kind": "boolean", "arity": "?", "doc": "d"},
                "b": {
                    "kind": "integer",
                    "arity": "?",
                    "doc": "d",
                    "deps": [{"require": ["a"]}],
                },
            },
        }));
        let model = parse_model(&tree, tree.root()).unwrap();
        assert_eq!(model.header.author, "a");
        assert_eq!(model.body.len(), 2);
        let b = model.body.get_named("b").unwrap();
        assert_eq!(b.kind, Kind::Integer);
    }

    #[test]
    fn parses_header_include_and_trigger() {
        let tree = Tree::from_json(&json!({
            "header": {
                "author": "a",
                "doc": "d",
                "version": "1.0",
                "include": ["Base"],
                "trigger": ["$.plg.a"],
            },
            "body": {},
        }));
        let model = parse_model(&tree, tree.root()).unwrap();
        assert_eq!(model.header.include, vec!["Base".to_string()]);
        assert_eq!(model.header.trigger, vec!["$.plg.a".to_string()]);
    }

    #[test]
    fn parses_enumerated_string_with_either() {
        let tree = Tree::from_json(&json!({
            "header": {"author": "a", "doc": "d", "version": "1.0"},
            "body": {
                "mode": {
                    "kind": "string",
                    "arity": "1",
                    "doc": "d",
                    "either": ["on", "off"],
                },
            },
        }));
        let model = parse_model(&tree, tree.root()).unwrap();
        let mode = model.body.get_named("mode").unwrap();
        assert!(mode.is_enumerated());
    }

    #[test]
    fn missing_header_field_errors() {
        let tree = Tree::from_json(&json!({
            "header": {"author": "a", "version": "1.0"},
            "body": {},
        }));
        assert!(parse_model(&tree, tree.root()).is_err());
    }

    #[test]
    fn unknown_kind_errors() {
        let tree = Tree::from_json(&json!({
            "header": {"author": "a", "doc": "d", "version": "1.0"},
            "body": {"x": {"kind": "bogus", "arity": "1", "doc": "d"}},
        }));
        assert!(parse_model(&tree, tree.root()).is_err());
    }
}
