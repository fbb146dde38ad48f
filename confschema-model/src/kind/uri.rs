use confschema_core::error::Error;
use confschema_core::Scalar;

use crate::attribute::AttributeSet;

use super::{check_common_constraints, TypeOps};

const SCHEMES: &[&str] = &["file", "http", "ipv4", "ftp"];

/// `scheme://rest` form, restricted to the schemes spec.md §4.6 names.
#[derive(Debug)]
pub struct Uri;

impl TypeOps for Uri {
    fn name(&self) -> &'static str {
        "uri"
    }

    fn validate_scalar(&self, value: &Scalar, attrs: &AttributeSet) -> Result<(), Error> {
        let Scalar::String(s) = value else {
            return Err(Error::ValueConstraint {
                path: String::new(),
                reason: format!("expected URI string, found {value:?}"),
                backtrace: snafu::Backtrace::capture(),
            });
        };
        let Some((scheme, rest)) = s.split_once("://") else {
            return Err(Error::UnsupportedFormat {
                path: String::new(),
                reason: format!("{s:?} has no scheme separator"),
                backtrace: snafu::Backtrace::capture(),
            });
        };
        if !SCHEMES.contains(&scheme) {
            return Err(Error::UnsupportedFormat {
                path: String::new(),
                reason: format!("unsupported URI scheme {scheme:?}"),
                backtrace: snafu::Backtrace::capture(),
            });
        }
        if scheme == "ipv4" {
            use std::net::Ipv4Addr;
            use std::str::FromStr;
            Ipv4Addr::from_str(rest).map_err(|_| Error::UnsupportedFormat {
                path: String::new(),
                reason: format!("{rest:?} is not a valid ipv4 URI host"),
                backtrace: snafu::Backtrace::capture(),
            })?;
        } else if rest.is_empty() {
            return Err(Error::UnsupportedFormat {
                path: String::new(),
                reason: "URI has an empty authority/path".to_string(),
                backtrace: snafu::Backtrace::capture(),
            });
        }
        check_common_constraints(value, attrs)
    }
}
