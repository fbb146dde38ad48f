//! Cross-option constraints attached to a [`crate::basic_type::BasicType`]:
//! `require`, `disable`, optionally guarded by a `when` value-match and a
//! value-level constraint on the target(s).

use confschema_core::error::Error;
use confschema_core::{Path, Scalar};
use snafu::Backtrace;

use crate::constraint::RangeSpec;

/// Whether a [`Dependency`] requires or disables its targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Require,
    Disable,
}

/// A value-level constraint applied to a dependency's resolved target(s)
/// during `flatten_instance`.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Either(Vec<Scalar>),
    Range(RangeSpec),
}

/// One `require`/`disable` rule.
///
/// `targets` are raw path literals rather than pre-parsed [`Path`]s because
/// a target may contain the `%` placeholder (substituted with the owning
/// type's instance value before parsing — see
/// [`Dependency::expand_targets`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    pub kind: Kind,
    pub targets: Vec<String>,
    pub when: Vec<Scalar>,
    pub constraint: Option<Constraint>,
}

impl Dependency {
    #[must_use]
    pub fn new(kind: Kind, targets: Vec<String>) -> Self {
        Self {
            kind,
            targets,
            when: Vec::new(),
            constraint: None,
        }
    }

    /// `Disable` runs before `Require`; lower value runs first
    /// (SPEC_FULL.md §4.5.1).
    #[must_use]
    pub fn priority(&self) -> u8 {
        match self.kind {
            Kind::Disable => 1,
            Kind::Require => 5,
        }
    }

    /// `true` if any target literal still carries the unexpanded `%`
    /// placeholder.
    #[must_use]
    pub fn has_placeholder(&self) -> bool {
        self.targets.iter().any(|t| t.contains('%'))
    }

    /// Validates the local schema: at least one target, none `Global`-rooted,
    /// and every target parses once any placeholder is substituted with a
    /// dummy identifier.
    pub fn check_model(&self) -> Result<(), Error> {
        if self.targets.is_empty() {
            return Err(Error::AttributeSchema {
                path: String::new(),
                reason: "dependency has no targets".to_string(),
                backtrace: Backtrace::capture(),
            });
        }
        for target in &self.targets {
            if target.starts_with('$') {
                return Err(Error::AttributeSchema {
                    path: target.clone(),
                    reason: "dependency target must not be Global-rooted".to_string(),
                    backtrace: Backtrace::capture(),
                });
            }
            let probe = target.replace('%', "placeholder");
            Path::parse(&probe).map_err(|e| Error::AttributeSchema {
                path: target.clone(),
                reason: e.reason,
                backtrace: Backtrace::capture(),
            })?;
        }
        Ok(())
    }

    /// Substitutes every `%` placeholder in every target with `value` and
    /// parses the result.
    pub fn expand_targets(&self, value: &str) -> Result<Vec<Path>, Error> {
        self.targets
            .iter()
            .map(|t| {
                let expanded = t.replace('%', value);
                Path::parse(&expanded).map_err(Error::from_invalid_path)
            })
            .collect()
    }

    /// `true` iff the dependency is active given the owner's current
    /// instance value(s) (after array flattening). An empty `when` set
    /// means the dependency is unconditionally active.
    #[must_use]
    pub fn is_active(&self, owner_values: &[Scalar]) -> bool {
        if self.when.is_empty() {
            return true;
        }
        owner_values.iter().any(|v| self.when.contains(v))
    }
}

/// Stable-sorts dependencies by [`Dependency::priority`], preserving
/// declaration order within a priority tier.
pub fn sort_by_priority(deps: &mut [Dependency]) {
    deps.sort_by_key(Dependency::priority);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_disable_before_require() {
        let d = Dependency::new(Kind::Disable, vec!["b".into()]);
        let r = Dependency::new(Kind::Require, vec!["b".into()]);
        assert!(d.priority() < r.priority());
    }

    #[test]
    fn sort_is_stable_within_tier() {
        let mut deps = vec![
            Dependency::new(Kind::Require, vec!["a".into()]),
            Dependency::new(Kind::Disable, vec!["x".into()]),
            Dependency::new(Kind::Require, vec!["b".into()]),
        ];
        sort_by_priority(&mut deps);
        assert_eq!(deps[0].targets[0], "x");
        assert_eq!(deps[1].targets[0], "a");
        assert_eq!(deps[2].targets[0], "b");
    }

    #[test]
    fn rejects_global_rooted_target() {
        let d = Dependency::new(Kind::Require, vec!["$.b".into()]);
        assert!(d.check_model().is_err());
    }

    #[test]
    fn expands_placeholder() {
        let d = Dependency::new(Kind::Require, vec![".opt-%".into()]);
        assert!(d.has_placeholder());
    }

    #[test]
    fn when_guard_gates_activity() {
        let mut d = Dependency::new(Kind::Require, vec!["b".into()]);
        assert!(d.is_active(&[]));
        d.when = vec![Scalar::Boolean(true)];
        assert!(d.is_active(&[Scalar::Boolean(true)]));
        assert!(!d.is_active(&[Scalar::Boolean(false)]));
    }
}
