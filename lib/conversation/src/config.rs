//! Session configuration.
//!
//! Deserialized by the host from its `session` config section.

use serde::Deserialize;
use std::time::Duration;

/// Bounds applied to every generation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Maximum wait for the model to start a response or produce its next
    /// increment, in milliseconds.
    #[serde(default = "default_generation_timeout_ms")]
    pub generation_timeout_ms: u64,

    /// Maximum duration of a single tool call, in milliseconds.
    #[serde(default = "default_tool_timeout_ms")]
    pub tool_timeout_ms: u64,

    /// Maximum tool calls the model may make while answering one prompt.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
}

fn default_generation_timeout_ms() -> u64 {
    60_000
}

fn default_tool_timeout_ms() -> u64 {
    10_000
}

fn default_max_tool_rounds() -> u32 {
    8
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            generation_timeout_ms: default_generation_timeout_ms(),
            tool_timeout_ms: default_tool_timeout_ms(),
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

impl SessionConfig {
    /// Returns the generation timeout.
    #[must_use]
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }

    /// Returns the tool timeout.
    #[must_use]
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_millis(self.tool_timeout_ms)
    }
}
