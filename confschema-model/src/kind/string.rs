use confschema_core::error::Error;
use confschema_core::Scalar;

use crate::attribute::AttributeSet;

use super::{check_common_constraints, TypeOps};

/// `range` on a `String` constrains the value's *length*, not a numeric
/// comparison of the string itself (spec.md §4.6's "ranged on length").
#[derive(Debug)]
pub struct StringKind;

impl TypeOps for StringKind {
    fn name(&self) -> &'static str {
        "string"
    }

    fn validate_scalar(&self, value: &Scalar, attrs: &AttributeSet) -> Result<(), Error> {
        let Scalar::String(s) = value else {
            return Err(Error::ValueConstraint {
                path: String::new(),
                reason: format!("expected string, found {value:?}"),
                backtrace: snafu::Backtrace::capture(),
            });
        };
        if let Some(crate::attribute::Attribute::Range(range)) = attrs.get("range") {
            if !range.contains(s.chars().count() as f64) {
                return Err(Error::ValueConstraint {
                    path: String::new(),
                    reason: format!("string length {} is outside range {range}", s.chars().count()),
                    backtrace: snafu::Backtrace::capture(),
                });
            }
            return Ok(());
        }
        check_common_constraints(value, attrs)
    }
}
