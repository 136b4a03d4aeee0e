//! Conversation transcript.
//!
//! A transcript is the ordered, append-only history of a conversation.
//! Each entry is one turn (instructions, prompt, tool call, tool output or
//! response) made of ordered segments of text or structured data.

use crate::error::ToolError;
use crate::tool::ToolPayload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use vitals_core::{EntryId, ToolCallId};

/// A content unit within a transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    /// Plain text.
    Text { content: String },
    /// Structured key-value data.
    Structure { content: JsonMap<String, JsonValue> },
}

impl Segment {
    /// Creates a text segment.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    /// Creates a structured segment.
    #[must_use]
    pub fn structure(content: JsonMap<String, JsonValue>) -> Self {
        Self::Structure { content }
    }

    /// Returns the text content, if this is a text segment.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { content } => Some(content),
            Self::Structure { .. } => None,
        }
    }

    /// Returns the structured content, if this is a structured segment.
    #[must_use]
    pub fn as_structure(&self) -> Option<&JsonMap<String, JsonValue>> {
        match self {
            Self::Structure { content } => Some(content),
            Self::Text { .. } => None,
        }
    }
}

/// The kind of a transcript entry, without its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Instructions,
    Prompt,
    ToolCall,
    ToolOutput,
    Response,
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entry {
    /// Fixed instructions the session was created with.
    Instructions {
        id: EntryId,
        created_at: DateTime<Utc>,
        segments: Vec<Segment>,
    },
    /// Text submitted by the caller.
    Prompt {
        id: EntryId,
        created_at: DateTime<Utc>,
        segments: Vec<Segment>,
    },
    /// A tool invocation requested by the model. Segments hold the arguments.
    ToolCall {
        id: EntryId,
        created_at: DateTime<Utc>,
        call_id: ToolCallId,
        tool_name: String,
        segments: Vec<Segment>,
    },
    /// The result of a tool invocation.
    ToolOutput {
        id: EntryId,
        created_at: DateTime<Utc>,
        call_id: ToolCallId,
        tool_name: String,
        /// Set when the tool failed; segments then hold the description.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ToolError>,
        segments: Vec<Segment>,
    },
    /// Model output.
    Response {
        id: EntryId,
        created_at: DateTime<Utc>,
        segments: Vec<Segment>,
    },
}

impl Entry {
    /// Creates an instructions entry.
    #[must_use]
    pub fn instructions(text: impl Into<String>) -> Self {
        Self::Instructions {
            id: EntryId::new(),
            created_at: Utc::now(),
            segments: vec![Segment::text(text)],
        }
    }

    /// Creates a prompt entry.
    #[must_use]
    pub fn prompt(text: impl Into<String>) -> Self {
        Self::Prompt {
            id: EntryId::new(),
            created_at: Utc::now(),
            segments: vec![Segment::text(text)],
        }
    }

    /// Creates a tool call entry.
    ///
    /// Object arguments become a structured segment; anything else is kept
    /// as its JSON text.
    #[must_use]
    pub fn tool_call(call_id: ToolCallId, tool_name: impl Into<String>, arguments: &JsonValue) -> Self {
        let segment = match arguments {
            JsonValue::Object(map) => Segment::structure(map.clone()),
            other => Segment::text(other.to_string()),
        };
        Self::ToolCall {
            id: EntryId::new(),
            created_at: Utc::now(),
            call_id,
            tool_name: tool_name.into(),
            segments: vec![segment],
        }
    }

    /// Creates a tool output entry from a tool's result.
    #[must_use]
    pub fn tool_output(
        call_id: ToolCallId,
        tool_name: impl Into<String>,
        result: &Result<ToolPayload, ToolError>,
    ) -> Self {
        let (error, segments) = match result {
            Ok(payload) => (None, vec![Segment::structure(payload.clone())]),
            Err(err) => (Some(err.clone()), vec![Segment::text(err.to_string())]),
        };
        Self::ToolOutput {
            id: EntryId::new(),
            created_at: Utc::now(),
            call_id,
            tool_name: tool_name.into(),
            error,
            segments,
        }
    }

    /// Creates a response entry.
    #[must_use]
    pub fn response(segments: Vec<Segment>) -> Self {
        Self::Response {
            id: EntryId::new(),
            created_at: Utc::now(),
            segments,
        }
    }

    /// Returns the entry's identifier.
    #[must_use]
    pub fn id(&self) -> EntryId {
        match self {
            Self::Instructions { id, .. }
            | Self::Prompt { id, .. }
            | Self::ToolCall { id, .. }
            | Self::ToolOutput { id, .. }
            | Self::Response { id, .. } => *id,
        }
    }

    /// Returns the entry's kind.
    #[must_use]
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::Instructions { .. } => EntryKind::Instructions,
            Self::Prompt { .. } => EntryKind::Prompt,
            Self::ToolCall { .. } => EntryKind::ToolCall,
            Self::ToolOutput { .. } => EntryKind::ToolOutput,
            Self::Response { .. } => EntryKind::Response,
        }
    }

    /// Returns the entry's segments in order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        match self {
            Self::Instructions { segments, .. }
            | Self::Prompt { segments, .. }
            | Self::ToolCall { segments, .. }
            | Self::ToolOutput { segments, .. }
            | Self::Response { segments, .. } => segments,
        }
    }

    /// Concatenates the entry's text segments.
    #[must_use]
    pub fn text(&self) -> String {
        self.segments().iter().filter_map(Segment::as_text).collect()
    }

    /// Returns the tool call id for tool call and tool output entries.
    #[must_use]
    pub fn call_id(&self) -> Option<ToolCallId> {
        match self {
            Self::ToolCall { call_id, .. } | Self::ToolOutput { call_id, .. } => Some(*call_id),
            _ => None,
        }
    }
}

/// Ordered, append-only log of entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Transcript {
    /// Creates an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends an entry.
    pub fn append(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Returns all entries in conversation order.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Iterates over entries in conversation order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Returns an owned copy of the entries.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Entry> {
        self.entries.clone()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the transcript is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the last entry, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Entry> {
        self.entries.last()
    }

    /// Returns the kinds of all entries in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<EntryKind> {
        self.entries.iter().map(Entry::kind).collect()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
