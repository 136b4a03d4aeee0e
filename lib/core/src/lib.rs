//! Core types and utilities for vitals.
//!
//! This crate provides the identifiers and the error-handling foundation
//! shared by the conversation, health and model crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{EntryId, ParseIdError, SessionId, ToolCallId};
