//! Health data error types.

use std::fmt;

/// Errors from a health data provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthError {
    /// No record of the requested kind exists.
    NotFound { kind: String },
    /// The user refused read access.
    AuthorizationDenied { reason: String },
    /// The provider could not be reached.
    Unavailable { reason: String },
    /// A health export file could not be read.
    ExportUnreadable { path: String, details: String },
    /// A health export file is not valid.
    ExportInvalid { path: String, details: String },
}

impl fmt::Display for HealthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { kind } => write!(f, "no {kind} records found"),
            Self::AuthorizationDenied { reason } => {
                write!(f, "health data access denied: {reason}")
            }
            Self::Unavailable { reason } => write!(f, "health data unavailable: {reason}"),
            Self::ExportUnreadable { path, details } => {
                write!(f, "failed to read health export '{path}': {details}")
            }
            Self::ExportInvalid { path, details } => {
                write!(f, "invalid health export '{path}': {details}")
            }
        }
    }
}

impl std::error::Error for HealthError {}
