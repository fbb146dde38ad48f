use once_cell::sync::Lazy;
use regex::Regex;

use confschema_core::error::Error;
use confschema_core::Scalar;

use crate::attribute::AttributeSet;

use super::{check_common_constraints, TypeOps};

static MAC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Fa-f]{2}(:[0-9A-Fa-f]{2}){5}$").unwrap());

/// Six-byte colon-separated MAC address form (spec.md §4.6).
#[derive(Debug)]
pub struct Mac;

impl TypeOps for Mac {
    fn name(&self) -> &'static str {
        "mac"
    }

    fn validate_scalar(&self, value: &Scalar, attrs: &AttributeSet) -> Result<(), Error> {
        let Scalar::String(s) = value else {
            return Err(Error::ValueConstraint {
                path: String::new(),
                reason: format!("expected MAC address string, found {value:?}"),
                backtrace: snafu::Backtrace::capture(),
            });
        };
        if !MAC_RE.is_match(s) {
            return Err(Error::UnsupportedFormat {
                path: String::new(),
                reason: format!("{s:?} is not a colon-form MAC address"),
                backtrace: snafu::Backtrace::capture(),
            });
        }
        check_common_constraints(value, attrs)
    }
}
