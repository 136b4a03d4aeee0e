//! Ollama client setup errors.
//!
//! Request-time failures are reported as `GenerationError` through the
//! `LanguageModel` trait; these cover constructing the client.

use std::fmt;

/// Errors creating an Ollama client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OllamaError {
    /// The configured base URL is not a valid URL.
    InvalidBaseUrl { url: String, details: String },
    /// The HTTP client could not be built.
    ClientBuild { details: String },
}

impl fmt::Display for OllamaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBaseUrl { url, details } => {
                write!(f, "invalid Ollama base URL '{url}': {details}")
            }
            Self::ClientBuild { details } => write!(f, "failed to build HTTP client: {details}"),
        }
    }
}

impl std::error::Error for OllamaError {}
