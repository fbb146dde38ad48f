use std::net::Ipv4Addr;
use std::str::FromStr;

use confschema_core::error::Error;
use confschema_core::Scalar;

use crate::attribute::AttributeSet;

use super::{check_common_constraints, TypeOps};

#[derive(Debug)]
pub struct IPv4;

impl TypeOps for IPv4 {
    fn name(&self) -> &'static str {
        "ipv4"
    }

    fn validate_scalar(&self, value: &Scalar, attrs: &AttributeSet) -> Result<(), Error> {
        let Scalar::String(s) = value else {
            return Err(Error::ValueConstraint {
                path: String::new(),
                reason: format!("expected dotted-quad string, found {value:?}"),
                backtrace: snafu::Backtrace::capture(),
            });
        };
        Ipv4Addr::from_str(s).map_err(|e| Error::UnsupportedFormat {
            path: String::new(),
            reason: format!("{s:?} is not a valid IPv4 address: {e}"),
            backtrace: snafu::Backtrace::capture(),
        })?;
        check_common_constraints(value, attrs)
    }
}
