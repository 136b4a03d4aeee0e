//! Errors that stop the `vitals` binary.
//!
//! Each variant is attached as context on top of the report that caused it.

use std::fmt;

#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded.
    Config,
    /// The health records could not be loaded.
    HealthStore,
    /// The model client could not be created.
    Model,
    /// The language model cannot be used.
    ModelUnavailable { reason: String },
    /// The session could not be built.
    Session,
    /// Reading input or writing output failed.
    Io { details: String },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "failed to load configuration"),
            Self::HealthStore => write!(f, "failed to load health data"),
            Self::Model => write!(f, "failed to set up the model"),
            Self::ModelUnavailable { reason } => write!(f, "{reason}"),
            Self::Session => write!(f, "failed to start the session"),
            Self::Io { details } => write!(f, "terminal I/O failed: {details}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            details: err.to_string(),
        }
    }
}
