use once_cell::sync::Lazy;
use std::collections::HashSet;

use confschema_core::error::Error;
use confschema_core::Scalar;

use crate::attribute::AttributeSet;

use super::{check_common_constraints, TypeOps};

/// The platform-reported feature set `CPUID` instance values are checked
/// against. Real `cpuid` probing is architecture-specific unsafe assembly,
/// the same category of external capability as `File`'s filesystem probe;
/// here it is sourced from `CONFSCHEMA_CPUID_FEATURES` (colon-separated) so
/// the check stays portable and testable. A caller embedding this crate on
/// real hardware is expected to populate that variable from an actual
/// probe before running the pipeline.
static REPORTED_FEATURES: Lazy<HashSet<String>> = Lazy::new(|| {
    std::env::var("CONFSCHEMA_CPUID_FEATURES")
        .unwrap_or_default()
        .split(':')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
});

#[derive(Debug)]
pub struct Cpuid;

impl TypeOps for Cpuid {
    fn name(&self) -> &'static str {
        "cpuid"
    }

    fn validate_scalar(&self, value: &Scalar, attrs: &AttributeSet) -> Result<(), Error> {
        let Scalar::String(feature) = value else {
            return Err(Error::ValueConstraint {
                path: String::new(),
                reason: format!("expected feature-name string, found {value:?}"),
                backtrace: snafu::Backtrace::capture(),
            });
        };
        if !REPORTED_FEATURES.contains(feature) {
            return Err(Error::UnsupportedFormat {
                path: String::new(),
                reason: format!("CPU feature {feature:?} is not reported by this platform"),
                backtrace: snafu::Backtrace::capture(),
            });
        }
        check_common_constraints(value, attrs)
    }
}
