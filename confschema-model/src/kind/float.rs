use confschema_core::error::Error;
use confschema_core::Scalar;

use crate::attribute::AttributeSet;

use super::{check_common_constraints, TypeOps};

/// Float also accepts an `Integer` instance value, per
/// SPEC_FULL.md §3.1.1's fallible widening: an integer that cannot be
/// represented exactly as an `f64` is rejected rather than silently
/// truncated.
#[derive(Debug)]
pub struct Float;

impl TypeOps for Float {
    fn name(&self) -> &'static str {
        "float"
    }

    fn validate_scalar(&self, value: &Scalar, attrs: &AttributeSet) -> Result<(), Error> {
        let widened = match value {
            Scalar::Float(f) => Scalar::Float(*f),
            Scalar::Integer(i) => {
                let f = *i as f64;
                if f as i64 != *i {
                    return Err(Error::ValueConstraint {
                        path: String::new(),
                        reason: format!("integer {i} cannot be widened to f64 losslessly"),
                        backtrace: snafu::Backtrace::capture(),
                    });
                }
                Scalar::Float(f)
            }
            other => {
                return Err(Error::ValueConstraint {
                    path: String::new(),
                    reason: format!("expected float, found {other:?}"),
                    backtrace: snafu::Backtrace::capture(),
                })
            }
        };
        check_common_constraints(&widened, attrs)
    }
}
