//! A whole model file: header, template definitions, and body
//! (spec.md §3.4, §4.7's composition-by-include semantics).

use confschema_core::diagnostics::Diagnostics;
use confschema_core::error::Error;
use confschema_core::{NodeId, Path, Tree};

use crate::basic_type::PathContext;
use crate::header::Header;
use crate::registry::Registry;
use crate::section::Section;

/// One parsed, composed model: the templates a `Selector` can draw on and
/// the concrete option body instances are checked against.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub header: Header,
    pub templates: Section,
    pub body: Section,
}

impl Model {
    #[must_use]
    pub fn new(header: Header, templates: Section, body: Section) -> Self {
        Self {
            header,
            templates,
            body,
        }
    }

    /// Composes `self` on top of every model named in its header's
    /// `include` list, in declaration order, each already present in
    /// `registry`'s built-model cache. Cycles are caught by the caller via
    /// [`Registry::enter_loading`]/[`Registry::exit_loading`] around the
    /// load that produced `self`; this method only combines already-loaded
    /// models (spec.md §4.7 "composition").
    pub fn compose(&self, registry: &Registry) -> Result<Self, Error> {
        let mut templates = Section::new();
        let mut body = Section::new();
        for include in &self.header.include {
            let parent = registry.built_model(include).ok_or_else(|| Error::ModelNotFound {
                name: include.clone(),
                backtrace: snafu::Backtrace::capture(),
            })?;
            let composed_parent = parent.compose(registry)?;
            templates = templates.merge(&composed_parent.templates)?;
            body = body.merge(&composed_parent.body)?;
        }
        templates = templates.merge(&self.templates)?;
        body = body.override_with(&self.body);
        Ok(Self {
            header: self.header.clone(),
            templates,
            body,
        })
    }

    pub fn check_model(&self) -> Result<(), Error> {
        self.templates.check_model()?;
        self.body.check_model()
    }

    pub fn flatten_model(&self) -> Result<(), Error> {
        self.templates.flatten_model()?;
        self.body.flatten_model()
    }

    pub fn validate_model(&self) -> Result<(), Error> {
        self.templates.validate_model()?;
        self.body.validate_model()
    }

    pub fn check_instance(
        &self,
        tree: &Tree,
        node: NodeId,
        diagnostics: &mut Diagnostics,
        strict: bool,
    ) -> Result<(), Error> {
        self.body.check_instance(tree, node, diagnostics, strict)
    }

    pub fn expand_instance(
        &self,
        tree: &mut Tree,
        node: NodeId,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), Error> {
        self.body.expand_instance(tree, node, diagnostics)
    }

    pub fn flatten_instance(
        &self,
        tree: &mut Tree,
        node: NodeId,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), Error> {
        self.body.flatten_instance(tree, node, diagnostics)
    }

    pub fn resolve_instance(
        &self,
        tree: &Tree,
        node: NodeId,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), Error> {
        self.body.resolve_instance(tree, node, diagnostics)
    }
}

/// Wires a [`Model`]'s own templates/body together with [`Registry`]-backed
/// `Class`/`Plugin` lookups so [`BasicType::get`](crate::basic_type::BasicType::get)
/// can cross those boundaries.
pub struct ModelContext<'a> {
    pub registry: &'a Registry,
    pub model: &'a Model,
    /// This model's own package path, used to scope plugin trigger lookup.
    pub model_path: String,
}

impl<'a> ModelContext<'a> {
    #[must_use]
    pub fn new(registry: &'a Registry, model: &'a Model, model_path: impl Into<String>) -> Self {
        Self {
            registry,
            model,
            model_path: model_path.into(),
        }
    }
}

impl<'a> PathContext for ModelContext<'a> {
    fn template(&self, name: &str) -> Option<&crate::basic_type::BasicType> {
        self.model.templates.get_named(name)
    }

    fn class_body(&self, model_name: &str) -> Option<&Section> {
        self.registry.built_model(model_name).map(|m| &m.body)
    }

    fn plugin_child(&self, child_name: &str) -> Option<&crate::basic_type::BasicType> {
        let trigger_path = format!(".{child_name}");
        let builder_name = self.registry.builder_for(&self.model_path, &trigger_path)?;
        self.registry.built_model(builder_name)?.body.get_named(child_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{Attribute, AttributeSet};
    use crate::basic_type::BasicType;
    use crate::kind::Kind;
    use confschema_core::Arity;

    fn leaf(name: &str) -> BasicType {
        let mut attrs = AttributeSet::new();
        attrs.insert(Attribute::Doc("d".to_string()));
        BasicType::new(name, Kind::Integer, Arity::parse("?"), attrs)
    }

    #[test]
    fn compose_merges_included_parent() {
        let mut registry = Registry::new();
        let mut parent_body = Section::new();
        parent_body.insert(leaf("a"));
        let parent = Model::new(Header::default(), Section::new(), parent_body);
        registry.insert_built_model("Parent", parent);

        let mut child_header = Header::default();
        child_header.include.push("Parent".to_string());
        let mut child_body = Section::new();
        child_body.insert(leaf("b"));
        let child = Model::new(child_header, Section::new(), child_body);

        let composed = child.compose(&registry).unwrap();
        assert!(composed.body.get_named("a").is_some());
        assert!(composed.body.get_named("b").is_some());
    }

    #[test]
    fn compose_missing_include_errors() {
        let mut header = Header::default();
        header.include.push("Nope".to_string());
        let model = Model::new(header, Section::new(), Section::new());
        let registry = Registry::new();
        assert!(model.compose(&registry).is_err());
    }
}
