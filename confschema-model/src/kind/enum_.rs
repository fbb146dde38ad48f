use confschema_core::error::Error;
use confschema_core::Scalar;

use crate::attribute::{Attribute, AttributeSet};

use super::TypeOps;

/// `Enum`'s instance value is the string tag; `Bind` maps each legal tag to
/// the integer it materialises to (consumed by codegen, out of scope
/// here — `BasicType` only validates the tag is a key of `Bind`).
#[derive(Debug)]
pub struct Enum;

impl TypeOps for Enum {
    fn name(&self) -> &'static str {
        "enum"
    }

    fn validate_scalar(&self, value: &Scalar, attrs: &AttributeSet) -> Result<(), Error> {
        let Scalar::String(tag) = value else {
            return Err(Error::ValueConstraint {
                path: String::new(),
                reason: format!("expected string tag, found {value:?}"),
                backtrace: snafu::Backtrace::capture(),
            });
        };
        let Some(Attribute::Bind(bindings)) = attrs.get("bind") else {
            return Err(Error::AttributeSchema {
                path: String::new(),
                reason: "enum kind requires a 'bind' attribute".to_string(),
                backtrace: snafu::Backtrace::capture(),
            });
        };
        if !bindings.contains_key(tag) {
            return Err(Error::ValueConstraint {
                path: String::new(),
                reason: format!("{tag:?} is not a bound enum tag"),
                backtrace: snafu::Backtrace::capture(),
            });
        }
        Ok(())
    }
}
