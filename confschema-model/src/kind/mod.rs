//! The `Kind` tagged union and its `TypeOps` capability trait
//! (SPEC_FULL.md §0, grounded on spec.md §9's "tagged variant + capability
//! trait" recommendation and mirroring `grill-json-schema`'s `Keyword` enum
//! + `Keyword` trait split, e.g. `keyword/properties.rs`'s
//! `impl Keyword for Properties`).
//!
//! Each leaf module owns a unit struct implementing [`TypeOps`]; [`Kind`]
//! dispatches to the right one. Shared behaviour (attribute bookkeeping,
//! arity checks) lives in [`crate::basic_type::BasicType`] by composition,
//! not here — this trait only captures what genuinely differs per kind.

pub mod boolean;
pub mod class;
pub mod cpuid;
pub mod enum_;
pub mod file;
pub mod float;
pub mod integer;
pub mod ipv4;
pub mod mac;
pub mod plugin;
pub mod selector;
pub mod string;
pub mod uri;

use confschema_core::error::Error;
use confschema_core::{Arity, Scalar};

use crate::attribute::AttributeSet;

/// Capabilities every concrete kind implements (spec.md §4.6).
pub trait TypeOps: std::fmt::Debug {
    /// The textual kind name, as it appears in a model file's `kind` field.
    fn name(&self) -> &'static str;

    /// `true` iff `arity` lies within this kind's permitted pattern
    /// (SPEC_FULL.md §4.6.1). All kinds but `Selector` permit any arity.
    fn permitted_arity(&self, arity: &Arity) -> bool {
        let _ = arity;
        true
    }

    /// `true` for the three kinds whose instance value is an `Object`
    /// rather than a scalar (`Class`, `Plugin`, `Selector`).
    fn is_object(&self) -> bool {
        false
    }

    /// Validates one scalar instance value against this kind's own rules
    /// (format parsing) plus the `either`/`range`/`map` constraints carried
    /// in `attrs`. Object kinds override this as a no-op — their instance
    /// shape is validated structurally by `BasicType`/`Body`, not here.
    fn validate_scalar(&self, value: &Scalar, attrs: &AttributeSet) -> Result<(), Error> {
        let _ = (value, attrs);
        Ok(())
    }
}

/// The tagged union of concrete option kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Boolean,
    Integer,
    Float,
    String,
    Enum,
    File,
    IPv4,
    MAC,
    URI,
    CPUID,
    Class,
    Plugin,
    Selector,
}

impl Kind {
    /// Parses a model file's `kind` string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "boolean" => Kind::Boolean,
            "integer" => Kind::Integer,
            "float" => Kind::Float,
            "string" => Kind::String,
            "enum" => Kind::Enum,
            "file" => Kind::File,
            "ipv4" => Kind::IPv4,
            "mac" => Kind::MAC,
            "uri" => Kind::URI,
            "cpuid" => Kind::CPUID,
            "class" => Kind::Class,
            "plugin" => Kind::Plugin,
            "select" | "selector" => Kind::Selector,
            _ => return None,
        })
    }

    fn ops(self) -> &'static dyn TypeOps {
        match self {
            Kind::Boolean => &boolean::Boolean,
            Kind::Integer => &integer::Integer,
            Kind::Float => &float::Float,
            Kind::String => &string::StringKind,
            Kind::Enum => &enum_::Enum,
            Kind::File => &file::File,
            Kind::IPv4 => &ipv4::IPv4,
            Kind::MAC => &mac::Mac,
            Kind::URI => &uri::Uri,
            Kind::CPUID => &cpuid::Cpuid,
            Kind::Class => &class::Class,
            Kind::Plugin => &plugin::Plugin,
            Kind::Selector => &selector::Selector,
        }
    }

    #[must_use]
    pub fn type_name(self) -> &'static str {
        self.ops().name()
    }

    #[must_use]
    pub fn permitted_arity(self, arity: &Arity) -> bool {
        self.ops().permitted_arity(arity)
    }

    #[must_use]
    pub fn is_object(self) -> bool {
        self.ops().is_object()
    }

    pub fn validate_scalar(self, value: &Scalar, attrs: &AttributeSet) -> Result<(), Error> {
        self.ops().validate_scalar(value, attrs)
    }
}

/// Checks a scalar value against `Either`/`Range`/`Map` attributes, common
/// to the primitive kinds. Kind-specific leaf modules call this after their
/// own format validation.
pub(crate) fn check_common_constraints(
    value: &Scalar,
    attrs: &AttributeSet,
) -> Result<(), Error> {
    use crate::attribute::Attribute;
    use snafu::Backtrace;

    if let Some(Attribute::Either(allowed)) = attrs.get("either") {
        if !allowed.contains(value) {
            return Err(Error::ValueConstraint {
                path: String::new(),
                reason: format!("{value:?} is not in the 'either' list"),
                backtrace: Backtrace::capture(),
            });
        }
    }
    if let Some(Attribute::Range(range)) = attrs.get("range") {
        if !crate::constraint::scalar_in_range(value, range) {
            return Err(Error::ValueConstraint {
                path: String::new(),
                reason: format!("{value:?} is outside range {range}"),
                backtrace: Backtrace::capture(),
            });
        }
    }
    if let Some(Attribute::Map(map)) = attrs.get("map") {
        let Scalar::String(s) = value else {
            return Err(Error::ValueConstraint {
                path: String::new(),
                reason: "'map' attribute requires a string value".to_string(),
                backtrace: Backtrace::capture(),
            });
        };
        if !map.contains_key(s) {
            return Err(Error::ValueConstraint {
                path: String::new(),
                reason: format!("{s:?} is not a key of the 'map' attribute"),
                backtrace: Backtrace::capture(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_kinds() {
        assert_eq!(Kind::parse("boolean"), Some(Kind::Boolean));
        assert_eq!(Kind::parse("select"), Some(Kind::Selector));
        assert_eq!(Kind::parse("bogus"), None);
    }

    #[test]
    fn only_selector_restricts_arity() {
        let any = Arity::parse("*");
        assert!(Kind::Integer.permitted_arity(&any));
        assert!(!Kind::Selector.permitted_arity(&any));
        assert!(Kind::Selector.permitted_arity(&Arity::parse("?")));
        assert!(Kind::Selector.permitted_arity(&Arity::parse("1")));
    }

    #[test]
    fn object_kinds_flagged() {
        assert!(Kind::Class.is_object());
        assert!(Kind::Plugin.is_object());
        assert!(Kind::Selector.is_object());
        assert!(!Kind::Integer.is_object());
    }
}
