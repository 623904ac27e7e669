//! Measurement errors.
//!
//! Every failure during a measurement is fatal: the in-progress traversal is
//! abandoned and no partial byte count is returned.

use core::fmt;
use std::io;

/// The error type for deep-size measurements.
#[derive(Debug)]
pub enum SizeError {
    /// No footprint oracle was configured. Raised on the first shallow-size
    /// request, never at construction.
    OracleUnavailable,
    /// The host refused to read a field value.
    AccessDenied {
        /// Declaring type of the field.
        type_name: String,
        /// Field name.
        field: String,
    },
    /// A visitor hook failed.
    Visitor(io::Error),
    /// A layout configuration was rejected.
    InvalidLayout(String),
    /// The byte total does not fit in a `u64`.
    Overflow,
}

impl SizeError {
    pub(crate) fn access_denied(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        SizeError::AccessDenied {
            type_name: type_name.into(),
            field: field.into(),
        }
    }
}

impl fmt::Display for SizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeError::OracleUnavailable => f.write_str("footprint oracle is not available"),
            SizeError::AccessDenied { type_name, field } => {
                write!(f, "access denied reading field `{type_name}.{field}`")
            }
            SizeError::Visitor(err) => write!(f, "traversal visitor failed: {err}"),
            SizeError::InvalidLayout(reason) => write!(f, "invalid layout configuration: {reason}"),
            SizeError::Overflow => f.write_str("deep size overflows u64"),
        }
    }
}

impl std::error::Error for SizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SizeError::Visitor(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for SizeError {
    fn from(err: io::Error) -> Self {
        SizeError::Visitor(err)
    }
}
