//! Language model port.
//!
//! A session talks to its model only through [`LanguageModel`]. Generation
//! is a stream of [`ModelEvent`]s; the stream ending without a tool call
//! means the response is complete.

use crate::error::GenerationError;
use crate::tool::ToolDefinition;
use crate::transcript::Entry;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::fmt;
use std::pin::Pin;

/// Whether the model can be used at all.
///
/// Hosts check this once before constructing a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Availability {
    /// The model is ready to serve requests.
    Available,
    /// The model cannot be used.
    Unavailable(UnavailableReason),
}

impl Availability {
    /// Returns true if the model is available.
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

/// Why a model is unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnavailableReason {
    /// The model feature is switched off.
    NotEnabled,
    /// The host cannot run this model.
    DeviceNotEligible,
    /// The model exists but is not downloaded or loaded yet.
    ModelNotReady { model: String },
    /// The model service could not be reached.
    ServiceUnreachable { reason: String },
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotEnabled => write!(f, "The language model is not enabled."),
            Self::DeviceNotEligible => {
                write!(f, "This device is not eligible to run the language model.")
            }
            Self::ModelNotReady { model } => write!(
                f,
                "The language model '{model}' is not ready yet. Please try again later."
            ),
            Self::ServiceUnreachable { reason } => {
                write!(f, "The language model service is unreachable: {reason}")
            }
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    pub arguments: JsonValue,
}

/// One increment of model output.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    /// A piece of response text.
    Text(String),
    /// A structured response segment.
    Structure(JsonMap<String, JsonValue>),
    /// The model wants a tool called before it continues.
    ToolCall(ToolInvocation),
}

impl ModelEvent {
    /// Creates a text event.
    #[must_use]
    pub fn text(delta: impl Into<String>) -> Self {
        Self::Text(delta.into())
    }

    /// Creates a tool call event.
    #[must_use]
    pub fn tool_call(name: impl Into<String>, arguments: JsonValue) -> Self {
        Self::ToolCall(ToolInvocation {
            name: name.into(),
            arguments,
        })
    }
}

/// Everything the model needs to produce the next turn.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// The transcript so far, instructions first.
    pub transcript: Vec<Entry>,
    /// Tools the model may call.
    pub tools: Vec<ToolDefinition>,
}

/// Stream of model output for one generation request.
pub type ModelStream = Pin<Box<dyn Stream<Item = Result<ModelEvent, GenerationError>> + Send>>;

/// Trait for language model backends.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Reports whether the model can serve requests.
    async fn availability(&self) -> Availability;

    /// Loads the model ahead of the first request.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refused. Callers treat this as a hint.
    async fn prewarm(&self) -> Result<(), GenerationError> {
        Ok(())
    }

    /// Starts generating the next turn.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be started.
    async fn generate(&self, request: GenerationRequest) -> Result<ModelStream, GenerationError>;

    /// Returns the model name.
    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_serializes_reason_as_data() {
        let availability = Availability::Unavailable(UnavailableReason::ModelNotReady {
            model: "llama3.2".to_string(),
        });
        let json = serde_json::to_value(&availability).expect("serialize");
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["reason"]["kind"], "model_not_ready");
        assert_eq!(json["reason"]["model"], "llama3.2");
        assert!(!availability.is_available());
        assert!(Availability::Available.is_available());
    }

    #[test]
    fn unavailable_reason_messages() {
        let reason = UnavailableReason::ServiceUnreachable {
            reason: "connection refused".to_string(),
        };
        assert!(reason.to_string().contains("connection refused"));
        assert!(
            UnavailableReason::ModelNotReady {
                model: "llama3.2".to_string()
            }
            .to_string()
            .contains("try again later")
        );
    }

    #[test]
    fn tool_call_event_builder() {
        let event = ModelEvent::tool_call("blood_pressure", serde_json::json!({}));
        match event {
            ModelEvent::ToolCall(invocation) => assert_eq!(invocation.name, "blood_pressure"),
            other => panic!("expected tool call, got {other:?}"),
        }
    }
}
