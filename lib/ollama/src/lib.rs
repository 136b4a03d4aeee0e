//! Ollama backend for vitals conversations.
//!
//! Talks to a local Ollama server over its HTTP chat API, streaming
//! newline-delimited JSON and exposing function tools to the model.

mod decode;
mod wire;

pub mod client;
pub mod config;
pub mod error;

pub use client::OllamaModel;
pub use config::OllamaConfig;
pub use error::OllamaError;
