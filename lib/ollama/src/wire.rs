//! Ollama HTTP API payloads and transcript mapping.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use vitals_conversation::{Entry, GenerationError, ModelEvent, Segment, ToolDefinition};

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ChatTool>,
    pub stream: bool,
    pub keep_alive: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ChatOptions>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatOptions {
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ChatToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl ChatMessage {
    fn new(role: &str, content: String) -> Self {
        Self {
            role: role.to_string(),
            content,
            tool_calls: Vec::new(),
            tool_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ChatToolCall {
    pub function: ChatFunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ChatFunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: JsonValue,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatTool {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: ChatFunction,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatFunction {
    pub name: String,
    pub description: String,
    pub parameters: JsonValue,
}

/// One line of a streamed chat response.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatChunk {
    #[serde(default)]
    pub message: Option<ChatMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl ChatChunk {
    /// Converts the chunk into model events.
    pub fn into_events(self) -> Vec<Result<ModelEvent, GenerationError>> {
        if let Some(error) = self.error {
            return vec![Err(classify_error(error))];
        }
        let Some(message) = self.message else {
            return Vec::new();
        };

        let mut events = Vec::new();
        if !message.content.is_empty() {
            events.push(Ok(ModelEvent::Text(message.content)));
        }
        for call in message.tool_calls {
            events.push(Ok(ModelEvent::tool_call(
                call.function.name,
                call.function.arguments,
            )));
        }
        events
    }
}

fn classify_error(message: String) -> GenerationError {
    if message.contains("context length") || message.contains("context window") {
        GenerationError::ContextWindowExceeded
    } else {
        GenerationError::RequestFailed { reason: message }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TagsResponse {
    #[serde(default)]
    pub models: Vec<TagsModel>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TagsModel {
    pub name: String,
}

impl TagsResponse {
    /// Returns true if `model` is installed. An untagged name matches any tag.
    pub fn contains(&self, model: &str) -> bool {
        self.models.iter().any(|m| {
            m.name == model
                || (!model.contains(':')
                    && m.name
                        .strip_prefix(model)
                        .is_some_and(|tag| tag.starts_with(':')))
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PrewarmRequest<'a> {
    pub model: &'a str,
    pub keep_alive: &'a str,
}

/// Maps transcript entries to chat messages.
pub(crate) fn messages(transcript: &[Entry]) -> Vec<ChatMessage> {
    transcript
        .iter()
        .map(|entry| match entry {
            Entry::Instructions { segments, .. } => ChatMessage::new("system", render(segments)),
            Entry::Prompt { segments, .. } => ChatMessage::new("user", render(segments)),
            Entry::Response { segments, .. } => ChatMessage::new("assistant", render(segments)),
            Entry::ToolCall {
                tool_name,
                segments,
                ..
            } => {
                let arguments = match segments.first() {
                    Some(Segment::Structure { content }) => JsonValue::Object(content.clone()),
                    _ => JsonValue::Object(serde_json::Map::new()),
                };
                ChatMessage {
                    tool_calls: vec![ChatToolCall {
                        function: ChatFunctionCall {
                            name: tool_name.clone(),
                            arguments,
                        },
                    }],
                    ..ChatMessage::new("assistant", String::new())
                }
            }
            Entry::ToolOutput {
                tool_name,
                segments,
                ..
            } => ChatMessage {
                tool_name: Some(tool_name.clone()),
                ..ChatMessage::new("tool", render(segments))
            },
        })
        .collect()
}

pub(crate) fn tools(definitions: Vec<ToolDefinition>) -> Vec<ChatTool> {
    definitions
        .into_iter()
        .map(|d| ChatTool {
            kind: "function",
            function: ChatFunction {
                name: d.name,
                description: d.description,
                parameters: d.input_schema,
            },
        })
        .collect()
}

/// Flattens segments to message text; structures become JSON.
fn render(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Text { content } => content.clone(),
            Segment::Structure { content } => JsonValue::Object(content.clone()).to_string(),
        })
        .collect()
}
