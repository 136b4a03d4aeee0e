//! Error types for the conversation crate.
//!
//! Errors are split by who has to deal with them:
//! - `ToolError`: a tool's own failure, folded back into the transcript
//! - `ToolCallError`: the model asked for a tool the session does not have
//! - `RegistryError`: tool set misconfiguration, surfaced at startup
//! - `GenerationError`: failures of the model connection
//! - `SessionError`: everything surfaced to the caller of a session

use crate::session::SessionState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Failures reported by a tool.
///
/// These never abort a generation cycle. The session records them as the
/// tool's output so the model can tell the user what went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolError {
    /// The data source had no usable record.
    MissingData { description: String },
    /// Read access to the data source was refused.
    AuthorizationDenied { reason: String },
    /// Arguments did not match the tool's schema.
    InvalidArguments { reason: String },
    /// The tool failed for any other reason.
    ExecutionFailed { reason: String },
    /// The response stream was dropped while the tool was running.
    Cancelled,
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingData { description } => write!(f, "{description}"),
            Self::AuthorizationDenied { reason } => {
                write!(f, "authorization denied: {reason}")
            }
            Self::InvalidArguments { reason } => write!(f, "invalid arguments: {reason}"),
            Self::ExecutionFailed { reason } => write!(f, "tool execution failed: {reason}"),
            Self::Cancelled => write!(f, "tool call cancelled"),
        }
    }
}

impl std::error::Error for ToolError {}

/// Errors resolving a tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCallError {
    /// No tool with this name is registered.
    UnknownTool { name: String },
}

impl ToolCallError {
    /// Returns the name of the tool the model asked for.
    #[must_use]
    pub fn tool(&self) -> &str {
        match self {
            Self::UnknownTool { name } => name,
        }
    }
}

impl fmt::Display for ToolCallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTool { name } => write!(f, "unknown tool: {name}"),
        }
    }
}

impl std::error::Error for ToolCallError {}

/// Errors registering tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A tool with this name is already registered.
    DuplicateTool { name: String },
    /// The tool's input schema is not a valid JSON Schema.
    InvalidSchema { name: String, reason: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateTool { name } => write!(f, "tool '{name}' is already registered"),
            Self::InvalidSchema { name, reason } => {
                write!(f, "invalid input schema for tool '{name}': {reason}")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Errors from the language model connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The model provider cannot serve requests.
    ProviderUnavailable { provider: String, reason: String },
    /// The request failed.
    RequestFailed { reason: String },
    /// The model's output could not be understood.
    ResponseParseFailed { reason: String },
    /// Timed out waiting for the model.
    Timeout,
    /// Rate limit exceeded.
    RateLimited { retry_after_secs: Option<u64> },
    /// The transcript no longer fits the model's context window.
    ContextWindowExceeded,
}

impl GenerationError {
    /// Returns a stable category name for display and logging.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable { .. } => "unavailable",
            Self::RequestFailed { .. } => "request_failed",
            Self::ResponseParseFailed { .. } => "parse_failed",
            Self::Timeout => "timeout",
            Self::RateLimited { .. } => "rate_limited",
            Self::ContextWindowExceeded => "context_window_exceeded",
        }
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderUnavailable { provider, reason } => {
                write!(f, "model provider '{provider}' unavailable: {reason}")
            }
            Self::RequestFailed { reason } => write!(f, "generation request failed: {reason}"),
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse model output: {reason}")
            }
            Self::Timeout => write!(f, "timed out waiting for the model"),
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "rate limited, retry after {secs}s")
                } else {
                    write!(f, "rate limited")
                }
            }
            Self::ContextWindowExceeded => {
                write!(f, "conversation exceeds the model's context window")
            }
        }
    }
}

impl std::error::Error for GenerationError {}

/// Errors surfaced to the caller of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A generation cycle is already in flight.
    Busy { state: SessionState },
    /// The prompt was empty or whitespace.
    EmptyPrompt,
    /// The model asked for a tool that could not be resolved.
    ToolCall(ToolCallError),
    /// A tool did not finish in time.
    ToolTimedOut { name: String, timeout_ms: u64 },
    /// The model kept calling tools past the configured limit.
    ToolRoundsExceeded { max: u32 },
    /// The model connection failed.
    Generation(GenerationError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy { state } => write!(f, "session is busy ({state})"),
            Self::EmptyPrompt => write!(f, "prompt is empty"),
            Self::ToolCall(err) => write!(f, "tool call failed: {err}"),
            Self::ToolTimedOut { name, timeout_ms } => {
                write!(f, "tool '{name}' timed out after {timeout_ms}ms")
            }
            Self::ToolRoundsExceeded { max } => {
                write!(f, "model exceeded {max} tool calls in one response")
            }
            Self::Generation(err) => write!(f, "{err} [{}]", err.category()),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ToolCall(err) => Some(err),
            Self::Generation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ToolCallError> for SessionError {
    fn from(err: ToolCallError) -> Self {
        Self::ToolCall(err)
    }
}

impl From<GenerationError> for SessionError {
    fn from(err: GenerationError) -> Self {
        Self::Generation(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_data_displays_description_verbatim() {
        let err = ToolError::MissingData {
            description: "Missing blood pressure data".to_string(),
        };
        assert_eq!(err.to_string(), "Missing blood pressure data");
    }

    #[test]
    fn tool_error_serializes_with_kind_tag() {
        let err = ToolError::AuthorizationDenied {
            reason: "read access refused".to_string(),
        };
        let json = serde_json::to_value(&err).expect("serialize");
        assert_eq!(json["kind"], "authorization_denied");
        assert_eq!(json["reason"], "read access refused");
    }

    #[test]
    fn unknown_tool_carries_name() {
        let err = ToolCallError::UnknownTool {
            name: "unknown_tool".to_string(),
        };
        assert_eq!(err.tool(), "unknown_tool");
        assert!(err.to_string().contains("unknown_tool"));
    }

    #[test]
    fn generation_error_category_in_session_display() {
        let err = SessionError::from(GenerationError::Timeout);
        assert_eq!(err.to_string(), "timed out waiting for the model [timeout]");
    }

    #[test]
    fn busy_error_names_state() {
        let err = SessionError::Busy {
            state: SessionState::AwaitingTool,
        };
        assert!(err.to_string().contains("awaiting_tool"));
    }
}
