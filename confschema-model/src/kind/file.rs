use std::path::Path as StdPath;

use confschema_core::error::Error;
use confschema_core::Scalar;

use crate::attribute::{Attribute, AttributeSet, FileMode};

use super::{check_common_constraints, TypeOps};

/// `File`'s instance value is a filesystem path string, probed against the
/// filesystem according to its `mode` attribute (spec.md §4.6: "validated
/// via external FS probe + Mode flags"). Read modes require the path to
/// exist; write/append modes only require the parent directory to exist.
#[derive(Debug)]
pub struct File;

impl TypeOps for File {
    fn name(&self) -> &'static str {
        "file"
    }

    fn validate_scalar(&self, value: &Scalar, attrs: &AttributeSet) -> Result<(), Error> {
        let Scalar::String(path_str) = value else {
            return Err(Error::ValueConstraint {
                path: String::new(),
                reason: format!("expected path string, found {value:?}"),
                backtrace: snafu::Backtrace::capture(),
            });
        };
        let mode = match attrs.get("mode") {
            Some(Attribute::Mode(m)) => *m,
            _ => FileMode::Read,
        };
        let path = StdPath::new(path_str);
        let ok = match mode {
            FileMode::Read | FileMode::ReadWrite => path.is_file(),
            FileMode::Write | FileMode::WriteRead | FileMode::Append | FileMode::AppendRead => {
                path.parent().map(|p| p.as_os_str().is_empty() || p.is_dir()).unwrap_or(true)
            }
        };
        if !ok {
            return Err(Error::ValueConstraint {
                path: String::new(),
                reason: format!("path {path_str:?} does not satisfy mode {mode:?}"),
                backtrace: snafu::Backtrace::capture(),
            });
        }
        check_common_constraints(value, attrs)
    }
}
