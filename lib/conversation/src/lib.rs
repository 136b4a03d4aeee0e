//! Tool-augmented conversation sessions.
//!
//! This crate provides:
//!
//! - **Transcript**: Append-only record of a conversation
//! - **Tool Registry**: Tools the model may call, with argument validation
//! - **Session**: The generation cycle state machine
//! - **Response Stream**: Incremental delivery of a response to the caller

pub mod config;
pub mod error;
pub mod model;
pub mod session;
pub mod stream;
pub mod tool;
pub mod transcript;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::SessionConfig;
pub use error::{GenerationError, RegistryError, SessionError, ToolCallError, ToolError};
pub use model::{
    Availability, GenerationRequest, LanguageModel, ModelEvent, ModelStream, ToolInvocation,
    UnavailableReason,
};
pub use session::{Session, SessionBuilder, SessionState};
pub use stream::{ResponseStream, ResponseUpdate};
pub use tool::{RegisteredTool, Tool, ToolDefinition, ToolPayload, ToolRegistry};
pub use transcript::{Entry, EntryKind, Segment, Transcript};
pub use vitals_core::{EntryId, SessionId, ToolCallId};
