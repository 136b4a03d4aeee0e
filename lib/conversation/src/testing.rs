//! Test doubles for sessions and tools.
//!
//! Enabled for this crate's tests and for dependents through the `testing`
//! feature.

use crate::error::{GenerationError, ToolError};
use crate::model::{Availability, GenerationRequest, LanguageModel, ModelEvent, ModelStream};
use crate::tool::{Tool, ToolDefinition, ToolPayload};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

type Reply = Box<dyn Fn(&GenerationRequest) -> Vec<Result<ModelEvent, GenerationError>> + Send + Sync>;

enum Turn {
    Reply(Reply),
    Fail(GenerationError),
    Stall,
}

/// A language model that plays back scripted turns in order.
///
/// Each `generate` call consumes one turn. Once the script is exhausted every
/// further request fails.
pub struct ScriptedModel {
    name: String,
    availability: Availability,
    turns: Mutex<VecDeque<Turn>>,
    requests: Mutex<Vec<GenerationRequest>>,
    prewarm_calls: AtomicUsize,
    prewarm_fails: bool,
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedModel {
    /// Creates a model with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "scripted".to_string(),
            availability: Availability::Available,
            turns: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            prewarm_calls: AtomicUsize::new(0),
            prewarm_fails: false,
        }
    }

    /// Adds a turn that streams the given events.
    #[must_use]
    pub fn with_turn(self, events: Vec<ModelEvent>) -> Self {
        self.with_events(events.into_iter().map(Ok).collect())
    }

    /// Adds a turn that streams the given results, errors included.
    #[must_use]
    pub fn with_events(self, events: Vec<Result<ModelEvent, GenerationError>>) -> Self {
        self.with_reply(move |_| events.clone())
    }

    /// Adds a turn computed from the request.
    #[must_use]
    pub fn with_reply<F>(self, reply: F) -> Self
    where
        F: Fn(&GenerationRequest) -> Vec<Result<ModelEvent, GenerationError>>
            + Send
            + Sync
            + 'static,
    {
        self.push(Turn::Reply(Box::new(reply)))
    }

    /// Adds a turn whose request fails before streaming.
    #[must_use]
    pub fn with_failure(self, err: GenerationError) -> Self {
        self.push(Turn::Fail(err))
    }

    /// Adds a turn whose stream never produces anything.
    #[must_use]
    pub fn with_stalled_turn(self) -> Self {
        self.push(Turn::Stall)
    }

    /// Sets the reported availability.
    #[must_use]
    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    /// Makes prewarm fail.
    #[must_use]
    pub fn with_failing_prewarm(mut self) -> Self {
        self.prewarm_fails = true;
        self
    }

    /// Returns every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns how many times prewarm was called.
    #[must_use]
    pub fn prewarm_count(&self) -> usize {
        self.prewarm_calls.load(Ordering::SeqCst)
    }

    fn push(self, turn: Turn) -> Self {
        self.turns
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(turn);
        self
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn availability(&self) -> Availability {
        self.availability.clone()
    }

    async fn prewarm(&self) -> Result<(), GenerationError> {
        self.prewarm_calls.fetch_add(1, Ordering::SeqCst);
        if self.prewarm_fails {
            return Err(GenerationError::ProviderUnavailable {
                provider: self.name.clone(),
                reason: "prewarm refused".to_string(),
            });
        }
        Ok(())
    }

    async fn generate(&self, request: GenerationRequest) -> Result<ModelStream, GenerationError> {
        let turn = self
            .turns
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let events = match turn {
            Some(Turn::Reply(reply)) => reply(&request),
            Some(Turn::Fail(err)) => {
                self.record(request);
                return Err(err);
            }
            Some(Turn::Stall) => {
                self.record(request);
                return Ok(Box::pin(futures::stream::pending()));
            }
            None => {
                return Err(GenerationError::RequestFailed {
                    reason: "script exhausted".to_string(),
                });
            }
        };
        self.record(request);
        Ok(Box::pin(futures::stream::iter(events)))
    }

    fn model(&self) -> &str {
        &self.name
    }
}

impl ScriptedModel {
    fn record(&self, request: GenerationRequest) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
    }
}

/// A tool that returns a fixed result and counts its calls.
pub struct StaticTool {
    definition: ToolDefinition,
    result: Result<ToolPayload, ToolError>,
    calls: AtomicUsize,
    delay: Option<Duration>,
    gate: Option<Arc<Notify>>,
}

impl StaticTool {
    /// Creates a tool that always succeeds with `payload`.
    #[must_use]
    pub fn succeeding(name: impl Into<String>, payload: ToolPayload) -> Self {
        Self::with_result(name, Ok(payload))
    }

    /// Creates a tool that always fails with `err`.
    #[must_use]
    pub fn failing(name: impl Into<String>, err: ToolError) -> Self {
        Self::with_result(name, Err(err))
    }

    fn with_result(name: impl Into<String>, result: Result<ToolPayload, ToolError>) -> Self {
        let name = name.into();
        Self {
            definition: ToolDefinition::new(name.clone(), format!("Test tool {name}")),
            result,
            calls: AtomicUsize::new(0),
            delay: None,
            gate: None,
        }
    }

    /// Replaces the input schema.
    #[must_use]
    pub fn with_input_schema(mut self, schema: JsonValue) -> Self {
        self.definition = self.definition.with_input_schema(schema);
        self
    }

    /// Sleeps before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Holds every call until the returned handle is notified.
    #[must_use]
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    /// Returns how many times the tool ran.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn call(&self, _arguments: JsonValue) -> Result<ToolPayload, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone()
    }
}
