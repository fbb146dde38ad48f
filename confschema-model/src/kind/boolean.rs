use confschema_core::Scalar;
use confschema_core::error::Error;

use crate::attribute::AttributeSet;

use super::{check_common_constraints, TypeOps};

#[derive(Debug)]
pub struct Boolean;

impl TypeOps for Boolean {
    fn name(&self) -> &'static str {
        "boolean"
    }

    fn validate_scalar(&self, value: &Scalar, attrs: &AttributeSet) -> Result<(), Error> {
        if !matches!(value, Scalar::Boolean(_)) {
            return Err(Error::ValueConstraint {
                path: String::new(),
                reason: format!("expected boolean, found {value:?}"),
                backtrace: snafu::Backtrace::capture(),
            });
        }
        check_common_constraints(value, attrs)
    }
}
