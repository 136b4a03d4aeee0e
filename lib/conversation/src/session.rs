//! Conversation session.
//!
//! A session owns one conversation: its transcript, its model connection
//! and its tools. Each `submit` runs one generation cycle:
//!
//! 1. Append the prompt and ask the model for the next turn
//! 2. Stream text increments into the in-progress response
//! 3. On a tool invocation, record the call, run the tool, record its output
//!    and ask the model again with the augmented transcript
//! 4. When the model stops without calling a tool, finalize the response
//!
//! Only one cycle may be in flight at a time. Tool failures become tool
//! output the model can read; unknown tools and model failures end the cycle
//! in the `Error` state, from which a new prompt may be submitted.

use crate::config::SessionConfig;
use crate::error::{GenerationError, RegistryError, SessionError, ToolError};
use crate::model::{GenerationRequest, LanguageModel, ModelEvent, ModelStream, ToolInvocation};
use crate::stream::{ResponseStream, ResponseUpdate};
use crate::tool::{Tool, ToolRegistry};
use crate::transcript::{Entry, Segment, Transcript};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, instrument, warn};
use vitals_core::{SessionId, ToolCallId};

/// The state of a conversation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No cycle in flight.
    Idle,
    /// Waiting for model output.
    Generating,
    /// Waiting for a tool to finish.
    AwaitingTool,
    /// The last cycle failed.
    Error,
}

impl SessionState {
    /// Returns true if a new prompt may be submitted.
    #[must_use]
    pub fn can_accept_prompt(&self) -> bool {
        matches!(self, Self::Idle | Self::Error)
    }

    /// Returns true while a cycle is in flight.
    #[must_use]
    pub fn is_responding(&self) -> bool {
        matches!(self, Self::Generating | Self::AwaitingTool)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Generating => write!(f, "generating"),
            Self::AwaitingTool => write!(f, "awaiting_tool"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Mutable session data. Never held across an await point.
#[derive(Debug)]
struct Shared {
    transcript: Transcript,
    state: SessionState,
    last_error: Option<SessionError>,
}

struct Inner {
    id: SessionId,
    model: Arc<dyn LanguageModel>,
    tools: ToolRegistry,
    config: SessionConfig,
    shared: Mutex<Shared>,
}

impl Inner {
    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn append(&self, entry: Entry) {
        self.shared().transcript.append(entry);
    }

    fn set_state(&self, state: SessionState) {
        let mut shared = self.shared();
        debug!(session_id = %self.id, from = %shared.state, to = %state, "session state transition");
        shared.state = state;
    }

    /// Asks the model for its next turn over the current transcript.
    async fn open_stream(&self) -> Result<ModelStream, SessionError> {
        let request = GenerationRequest {
            transcript: self.shared().transcript.snapshot(),
            tools: self.tools.definitions(),
        };
        match tokio::time::timeout(self.config.generation_timeout(), self.model.generate(request))
            .await
        {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(GenerationError::Timeout.into()),
        }
    }
}

/// A conversation session.
///
/// Cloning yields another handle to the same conversation.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    /// Starts building a session around a model.
    #[must_use]
    pub fn builder(model: Arc<dyn LanguageModel>) -> SessionBuilder {
        SessionBuilder {
            model,
            instructions: None,
            tools: Vec::new(),
            config: SessionConfig::default(),
        }
    }

    /// Returns the session identifier.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.shared().state
    }

    /// Returns true while a cycle is in flight.
    #[must_use]
    pub fn is_responding(&self) -> bool {
        self.state().is_responding()
    }

    /// Returns a snapshot of the transcript.
    #[must_use]
    pub fn transcript(&self) -> Transcript {
        self.inner.shared().transcript.clone()
    }

    /// Returns the error that ended the last cycle, if it failed.
    #[must_use]
    pub fn last_error(&self) -> Option<SessionError> {
        self.inner.shared().last_error.clone()
    }

    /// Returns the session's tools.
    #[must_use]
    pub fn tools(&self) -> &ToolRegistry {
        &self.inner.tools
    }

    /// Returns the session configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Asks the model to load ahead of the first prompt.
    ///
    /// Failures are logged and otherwise ignored; the state never changes.
    pub async fn prewarm(&self) {
        if let Err(e) = self.inner.model.prewarm().await {
            debug!(session_id = %self.inner.id, error = %e, "prewarm failed");
        }
    }

    /// Submits a prompt and returns the stream of the response.
    ///
    /// The prompt is recorded before this returns; generation starts when the
    /// stream is first polled.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Busy` if a cycle is already in flight and
    /// `SessionError::EmptyPrompt` for a blank prompt. Neither touches the
    /// transcript.
    #[instrument(skip(self, prompt), fields(session_id = %self.inner.id))]
    pub fn submit(&self, prompt: impl Into<String>) -> Result<ResponseStream, SessionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(SessionError::EmptyPrompt);
        }

        {
            let mut shared = self.inner.shared();
            if !shared.state.can_accept_prompt() {
                return Err(SessionError::Busy {
                    state: shared.state,
                });
            }
            shared.transcript.append(Entry::prompt(prompt));
            shared.state = SessionState::Generating;
            shared.last_error = None;
        }
        debug!("prompt accepted");

        let cycle = Cycle::new(Arc::clone(&self.inner));
        Ok(ResponseStream::new(futures::stream::unfold(
            cycle,
            |mut cycle| async move { cycle.next_update().await.map(|update| (update, cycle)) },
        )))
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("model", &self.inner.model.model())
            .field("tools", &self.inner.tools)
            .field("state", &self.state())
            .finish()
    }
}

/// Builder for [`Session`].
pub struct SessionBuilder {
    model: Arc<dyn LanguageModel>,
    instructions: Option<String>,
    tools: Vec<Arc<dyn Tool>>,
    config: SessionConfig,
}

impl SessionBuilder {
    /// Sets the instructions recorded as the first transcript entry.
    #[must_use]
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Adds a tool.
    #[must_use]
    pub fn tool(self, tool: impl Tool + 'static) -> Self {
        self.shared_tool(Arc::new(tool))
    }

    /// Adds a tool that is shared with other owners.
    #[must_use]
    pub fn shared_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Sets the session configuration.
    #[must_use]
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the session.
    ///
    /// # Errors
    ///
    /// Returns an error if two tools share a name or a tool's schema is
    /// invalid.
    pub fn build(self) -> Result<Session, RegistryError> {
        let mut registry = ToolRegistry::new();
        for tool in self.tools {
            registry.register(tool)?;
        }

        let mut transcript = Transcript::new();
        if let Some(instructions) = self.instructions {
            transcript.append(Entry::instructions(instructions));
        }

        let id = SessionId::new();
        debug!(session_id = %id, model = self.model.model(), tools = registry.len(), "session created");

        Ok(Session {
            inner: Arc::new(Inner {
                id,
                model: self.model,
                tools: registry,
                config: self.config,
                shared: Mutex::new(Shared {
                    transcript,
                    state: SessionState::Idle,
                    last_error: None,
                }),
            }),
        })
    }
}

/// A tool call recorded in the transcript whose output is still owed.
#[derive(Debug, Clone)]
struct InFlightCall {
    call_id: ToolCallId,
    name: String,
    arguments: JsonValue,
}

/// One generation cycle, driven by polls of its response stream.
struct Cycle {
    inner: Arc<Inner>,
    model_stream: Option<ModelStream>,
    /// Segments of the response not yet committed to the transcript.
    pending: Vec<Segment>,
    /// Updates already committed but not yet handed to the consumer.
    outbox: VecDeque<ResponseUpdate>,
    /// The recorded tool call awaiting its output, if any.
    in_flight: Option<InFlightCall>,
    tool_rounds: u32,
    finished: bool,
}

impl Cycle {
    fn new(inner: Arc<Inner>) -> Self {
        Self {
            inner,
            model_stream: None,
            pending: Vec::new(),
            outbox: VecDeque::new(),
            in_flight: None,
            tool_rounds: 0,
            finished: false,
        }
    }

    async fn next_update(&mut self) -> Option<Result<ResponseUpdate, SessionError>> {
        loop {
            if let Some(update) = self.outbox.pop_front() {
                return Some(Ok(update));
            }
            if self.finished {
                return None;
            }
            if let Some(call) = self.in_flight.clone() {
                if let Err(e) = self.run_tool(call).await {
                    return Some(Err(self.fail(e)));
                }
                continue;
            }

            if self.model_stream.is_none() {
                match self.inner.open_stream().await {
                    Ok(stream) => self.model_stream = Some(stream),
                    Err(e) => return Some(Err(self.fail(e))),
                }
            }
            let stream = self.model_stream.as_mut()?;

            let next =
                tokio::time::timeout(self.inner.config.generation_timeout(), stream.next()).await;
            match next {
                Err(_) => return Some(Err(self.fail(GenerationError::Timeout.into()))),
                Ok(None) => {
                    self.complete();
                    return None;
                }
                Ok(Some(Err(e))) => return Some(Err(self.fail(e.into()))),
                Ok(Some(Ok(ModelEvent::Text(delta)))) => {
                    if delta.is_empty() {
                        continue;
                    }
                    self.push_text(&delta);
                    return Some(Ok(ResponseUpdate::Text { delta }));
                }
                Ok(Some(Ok(ModelEvent::Structure(content)))) => {
                    self.pending.push(Segment::structure(content.clone()));
                    return Some(Ok(ResponseUpdate::Structure { content }));
                }
                Ok(Some(Ok(ModelEvent::ToolCall(invocation)))) => {
                    // The model's turn ends at the tool call.
                    self.model_stream = None;
                    if let Err(e) = self.begin_tool(invocation) {
                        return Some(Err(self.fail(e)));
                    }
                }
            }
        }
    }

    /// Records the tool call and announces it. The tool runs on the next poll.
    fn begin_tool(&mut self, invocation: ToolInvocation) -> Result<(), SessionError> {
        let max = self.inner.config.max_tool_rounds;
        if self.tool_rounds >= max {
            return Err(SessionError::ToolRoundsExceeded { max });
        }
        self.tool_rounds += 1;

        let ToolInvocation { name, arguments } = invocation;
        let arguments = match arguments {
            JsonValue::Null => JsonValue::Object(serde_json::Map::new()),
            other => other,
        };
        let call_id = ToolCallId::new();

        self.commit_pending();
        self.inner.set_state(SessionState::AwaitingTool);
        self.inner
            .append(Entry::tool_call(call_id, name.clone(), &arguments));

        self.outbox.push_back(ResponseUpdate::ToolCalled {
            call_id,
            name: name.clone(),
            arguments: arguments.clone(),
        });
        self.in_flight = Some(InFlightCall {
            call_id,
            name,
            arguments,
        });
        Ok(())
    }

    #[instrument(skip(self, call), fields(session_id = %self.inner.id, tool = %call.name))]
    async fn run_tool(&mut self, call: InFlightCall) -> Result<(), SessionError> {
        let InFlightCall {
            call_id,
            name,
            arguments,
        } = call;

        let inner = Arc::clone(&self.inner);
        let tool = match inner.tools.resolve(&name) {
            Ok(tool) => tool,
            Err(e) => {
                self.in_flight = None;
                return Err(e.into());
            }
        };

        let tool_timeout = inner.config.tool_timeout();
        let result = tokio::time::timeout(tool_timeout, tool.call(arguments)).await;
        self.in_flight = None;
        let Ok(result) = result else {
            return Err(SessionError::ToolTimedOut {
                name,
                timeout_ms: inner.config.tool_timeout_ms,
            });
        };

        match &result {
            Ok(_) => debug!("tool succeeded"),
            Err(e) => warn!(error = %e, "tool failed; reporting to model"),
        }

        inner.append(Entry::tool_output(call_id, name.clone(), &result));
        inner.set_state(SessionState::Generating);

        self.outbox.push_back(ResponseUpdate::ToolCompleted {
            call_id,
            name,
            result,
        });
        Ok(())
    }

    fn push_text(&mut self, delta: &str) {
        if let Some(Segment::Text { content }) = self.pending.last_mut() {
            content.push_str(delta);
        } else {
            self.pending.push(Segment::text(delta));
        }
    }

    fn commit_pending(&mut self) {
        if !self.pending.is_empty() {
            let segments = std::mem::take(&mut self.pending);
            self.inner.append(Entry::response(segments));
        }
    }

    fn complete(&mut self) {
        self.commit_pending();
        self.model_stream = None;
        self.finished = true;
        self.inner.set_state(SessionState::Idle);
        debug!(session_id = %self.inner.id, "response complete");
    }

    fn fail(&mut self, err: SessionError) -> SessionError {
        self.commit_pending();
        self.model_stream = None;
        self.finished = true;
        warn!(session_id = %self.inner.id, error = %err, "generation cycle failed");

        let mut shared = self.inner.shared();
        shared.state = SessionState::Error;
        shared.last_error = Some(err.clone());
        err
    }
}

impl Drop for Cycle {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Some(InFlightCall { call_id, name, .. }) = self.in_flight.take() {
            self.inner
                .append(Entry::tool_output(call_id, name, &Err(ToolError::Cancelled)));
        }
        self.commit_pending();
        self.inner.set_state(SessionState::Idle);
        debug!(session_id = %self.inner.id, "response stream dropped before completion");
    }
}
