use confschema_core::error::Error;
use confschema_core::Scalar;

use crate::attribute::AttributeSet;

use super::{check_common_constraints, TypeOps};

#[derive(Debug)]
pub struct Integer;

impl TypeOps for Integer {
    fn name(&self) -> &'static str {
        "integer"
    }

    fn validate_scalar(&self, value: &Scalar, attrs: &AttributeSet) -> Result<(), Error> {
        if !matches!(value, Scalar::Integer(_)) {
            return Err(Error::ValueConstraint {
                path: String::new(),
                reason: format!("expected integer, found {value:?}"),
                backtrace: snafu::Backtrace::capture(),
            });
        }
        check_common_constraints(value, attrs)
    }
}
