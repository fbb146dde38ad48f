//! Process-wide state: known model directories, cached model sources,
//! plugin trigger dispatch, and the diagnostics accumulated by the last
//! pipeline run (spec.md §4.8, SPEC_FULL.md §4.8.1).
//!
//! Modeled as an explicit context object rather than a true global
//! singleton (spec.md §9's "prefer passing it in as a context argument");
//! a default CLI path may still stash one behind a `once_cell::sync::Lazy`
//! if it wants process-wide convenience.

use std::collections::HashMap;
use std::path::{Path as StdPath, PathBuf};
use std::sync::Arc;

use confschema_core::diagnostics::Diagnostics;
use confschema_core::error::Error;
use confschema_core::Tree;
use indexmap::IndexMap;
use snafu::Backtrace;

use crate::model::Model;
use crate::scanner::Scanner;

/// Process-wide registry of model search paths, cached sources, plugin
/// dispatch tables, and the last pipeline run's diagnostics.
#[derive(Debug, Default)]
pub struct Registry {
    model_dirs: Vec<PathBuf>,
    inlined_models: IndexMap<String, String>,
    built_models: IndexMap<String, Model>,
    builders: HashMap<String, IndexMap<String, String>>,
    children_for_path: HashMap<String, Vec<String>>,
    loading: Vec<String>,
    scanners_by_name: IndexMap<String, Arc<dyn Scanner>>,
    scanners_by_extension: IndexMap<String, Arc<dyn Scanner>>,
    diagnostics: Diagnostics,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_model_dir(&mut self, dir: PathBuf) {
        self.model_dirs.push(dir);
    }

    #[must_use]
    pub fn model_dirs(&self) -> &[PathBuf] {
        &self.model_dirs
    }

    /// Caches `source` for `name`; a later [`Registry::cached_source`] call
    /// for the same name is served without a filesystem round-trip.
    pub fn cache_source(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.inlined_models.insert(name.into(), source.into());
    }

    #[must_use]
    pub fn cached_source(&self, name: &str) -> Option<&str> {
        self.inlined_models.get(name).map(String::as_str)
    }

    pub fn insert_built_model(&mut self, name: impl Into<String>, model: Model) {
        self.built_models.insert(name.into(), model);
    }

    #[must_use]
    pub fn built_model(&self, name: &str) -> Option<&Model> {
        self.built_models.get(name)
    }

    /// Records that `child`'s header `include`s `parent`.
    pub fn register_child(&mut self, parent: &str, child: &str) {
        self.children_for_path
            .entry(parent.to_string())
            .or_default()
            .push(child.to_string());
    }

    #[must_use]
    pub fn children_of(&self, parent: &str) -> &[String] {
        self.children_for_path
            .get(parent)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Registers `builder_model` as the model that handles `trigger_path`
    /// under `model_path`'s `Plugin` options.
    pub fn register_trigger(&mut self, model_path: &str, trigger_path: &str, builder_model: &str) {
        self.builders
            .entry(model_path.to_string())
            .or_default()
            .insert(trigger_path.to_string(), builder_model.to_string());
    }

    /// The first registered builder model whose trigger matches `path`
    /// under `model_path`, if any.
    #[must_use]
    pub fn builder_for(&self, model_path: &str, path: &str) -> Option<&str> {
        let table = self.builders.get(model_path)?;
        table
            .iter()
            .find(|(trigger, _)| trigger_matches(trigger, path))
            .map(|(_, builder)| builder.as_str())
    }

    /// Marks `path` as currently loading; fails if it is already on the
    /// stack (a cycle).
    pub fn enter_loading(&mut self, path: &str) -> Result<(), Error> {
        if self.loading.iter().any(|p| p == path) {
            let mut cycle = self.loading.clone();
            cycle.push(path.to_string());
            return Err(Error::CircularInclude {
                cycle: cycle.join(" -> "),
                backtrace: Backtrace::capture(),
            });
        }
        self.loading.push(path.to_string());
        Ok(())
    }

    pub fn exit_loading(&mut self, path: &str) {
        if let Some(pos) = self.loading.iter().rposition(|p| p == path) {
            self.loading.remove(pos);
        }
    }

    pub fn register_scanner(&mut self, scanner: Arc<dyn Scanner>) {
        self.scanners_by_name
            .insert(scanner.name().to_string(), scanner.clone());
        self.scanners_by_extension
            .insert(scanner.extension().to_string(), scanner);
    }

    #[must_use]
    pub fn scanner_by_name(&self, name: &str) -> Option<Arc<dyn Scanner>> {
        self.scanners_by_name.get(name).cloned()
    }

    #[must_use]
    pub fn scanner_by_extension(&self, ext: &str) -> Option<Arc<dyn Scanner>> {
        self.scanners_by_extension.get(ext).cloned()
    }

    /// `true` iff `path`'s extension has a registered scanner; lets a
    /// loader fail fast with `UnsupportedFormat` before reading the file.
    #[must_use]
    pub fn has_scanner_by_extension(&self, path: &StdPath) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.scanners_by_extension.contains_key(ext))
    }

    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    #[must_use]
    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Clears the last run's diagnostics and the built-model cache. Model
    /// search directories and registered scanners are configuration, not
    /// run state, and are left untouched.
    pub fn reset(&mut self) {
        self.diagnostics.reset();
        self.built_models.clear();
        self.inlined_models.clear();
    }

    /// Parses `tree` into a [`Model`] named `model_path`, composes it on top
    /// of its already-loaded includes, registers its `include`/`trigger`
    /// declarations, and caches the composed result (spec.md §6's model
    /// load step; SPEC_FULL.md §8 scenario 6's plugin dispatch relies on
    /// the `trigger` registration this performs).
    pub fn load_model(&mut self, model_path: &str, tree: &Tree) -> Result<Model, Error> {
        self.enter_loading(model_path)?;
        let result = self.load_model_inner(model_path, tree);
        self.exit_loading(model_path);
        result
    }

    fn load_model_inner(&mut self, model_path: &str, tree: &Tree) -> Result<Model, Error> {
        let raw = crate::load::parse_model(tree, tree.root())?;
        for include in &raw.header.include {
            self.register_child(include, model_path);
        }
        let composed = raw.compose(self)?;
        for trigger in &raw.header.trigger {
            for include in &raw.header.include {
                self.register_trigger(include, trigger, model_path);
            }
        }
        self.insert_built_model(model_path.to_string(), composed.clone());
        Ok(composed)
    }
}

fn trigger_matches(trigger: &str, path: &str) -> bool {
    match (
        confschema_core::Path::parse(trigger),
        confschema_core::Path::parse(path),
    ) {
        (Ok(t), Ok(p)) => t.matches(&p),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_cycle() {
        let mut r = Registry::new();
        r.enter_loading("a").unwrap();
        r.enter_loading("b").unwrap();
        assert!(r.enter_loading("a").is_err());
    }

    #[test]
    fn exit_allows_reentry() {
        let mut r = Registry::new();
        r.enter_loading("a").unwrap();
        r.exit_loading("a");
        assert!(r.enter_loading("a").is_ok());
    }

    #[test]
    fn reset_clears_run_state_not_config() {
        let mut r = Registry::new();
        r.add_model_dir(PathBuf::from("/models"));
        r.cache_source("m", "...");
        r.reset();
        assert_eq!(r.model_dirs().len(), 1);
        assert!(r.cached_source("m").is_none());
    }

    #[test]
    fn trigger_lookup_matches_wildcard() {
        let mut r = Registry::new();
        r.register_trigger("base", "$.plg.*", "DerivedA");
        assert_eq!(r.builder_for("base", "$.plg.a"), Some("DerivedA"));
    }

    #[test]
    fn load_model_registers_children_and_triggers() {
        use serde_json::json;

        let mut r = Registry::new();
        let base_tree = Tree::from_json(&json!({
            "header": {"author": "a", "doc": "d", "version": "1.0"},
            "body": {"common": {"kind": "boolean", "arity": "?", "doc": "d"}},
        }));
        r.load_model("Base", &base_tree).unwrap();

        let derived_tree = Tree::from_json(&json!({
            "header": {
                "author": "a",
                "doc": "d",
                "version": "1.0",
                "include": ["Base"],
                "trigger": ["$.plg.a"],
            },
            "body": {"extra": {"kind": "integer", "arity": "?", "doc": "d"}},
        }));
        let derived = r.load_model("DerivedA", &derived_tree).unwrap();

        assert!(derived.body.get_named("common").is_some());
        assert!(derived.body.get_named("extra").is_some());
        assert_eq!(r.children_of("Base"), &["DerivedA".to_string()]);
        assert_eq!(r.builder_for("Base", "$.plg.a"), Some("DerivedA"));
    }
}
