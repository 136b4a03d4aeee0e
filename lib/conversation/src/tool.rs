//! Tool registry for conversation sessions.
//!
//! Tools are capabilities the model can invoke mid-conversation. Each tool
//! declares a JSON Schema for its arguments; the registry compiles it once
//! at registration and checks every invocation against it before the tool
//! is called.

use crate::error::{RegistryError, ToolCallError, ToolError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Structured result of a successful tool call.
pub type ToolPayload = JsonMap<String, JsonValue>;

/// Definition of a tool available during conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description the model uses to decide applicability.
    pub description: String,
    /// JSON schema for input parameters.
    pub input_schema: JsonValue,
}

impl ToolDefinition {
    /// Creates a new tool definition that takes no arguments.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    /// Sets the input schema.
    #[must_use]
    pub fn with_input_schema(mut self, schema: JsonValue) -> Self {
        self.input_schema = schema;
        self
    }
}

/// Trait for tool execution.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool definition.
    fn definition(&self) -> ToolDefinition;

    /// Calls the tool with arguments that already passed schema validation.
    async fn call(&self, arguments: JsonValue) -> Result<ToolPayload, ToolError>;
}

/// A tool together with its compiled argument schema.
pub struct RegisteredTool {
    definition: ToolDefinition,
    validator: jsonschema::Validator,
    tool: Arc<dyn Tool>,
}

impl RegisteredTool {
    /// Returns the tool definition captured at registration.
    #[must_use]
    pub fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    /// Checks arguments against the tool's input schema.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::InvalidArguments` listing every violation.
    pub fn validate(&self, arguments: &JsonValue) -> Result<(), ToolError> {
        let violations: Vec<String> = self
            .validator
            .iter_errors(arguments)
            .map(|err| err.to_string())
            .collect();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ToolError::InvalidArguments {
                reason: violations.join("; "),
            })
        }
    }

    /// Validates the arguments and calls the tool.
    ///
    /// Invalid arguments never reach the tool.
    ///
    /// # Errors
    ///
    /// Returns the validation failure or the tool's own error.
    pub async fn call(&self, arguments: JsonValue) -> Result<ToolPayload, ToolError> {
        self.validate(&arguments)?;
        self.tool.call(arguments).await
    }
}

impl fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

/// Registry of available tools.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Registers a tool.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken or the input schema does not
    /// compile.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let definition = tool.definition();
        if self.by_name.contains_key(&definition.name) {
            return Err(RegistryError::DuplicateTool {
                name: definition.name,
            });
        }

        let validator = jsonschema::validator_for(&definition.input_schema).map_err(|e| {
            RegistryError::InvalidSchema {
                name: definition.name.clone(),
                reason: e.to_string(),
            }
        })?;

        self.by_name
            .insert(definition.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool {
            definition,
            validator,
            tool,
        });
        Ok(())
    }

    /// Resolves a tool by name.
    ///
    /// # Errors
    ///
    /// Returns `ToolCallError::UnknownTool` if no tool has this name.
    pub fn resolve(&self, name: &str) -> Result<&RegisteredTool, ToolCallError> {
        self.by_name
            .get(name)
            .map(|&index| &self.tools[index])
            .ok_or_else(|| ToolCallError::UnknownTool {
                name: name.to_string(),
            })
    }

    /// Gets a tool definition by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.resolve(name).ok().map(RegisteredTool::definition)
    }

    /// Returns all tool definitions in registration order.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition.clone()).collect()
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticTool;
    use serde_json::json;

    fn payload(value: JsonValue) -> ToolPayload {
        match value {
            JsonValue::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn tool_definition_defaults_to_empty_object_schema() {
        let def = ToolDefinition::new("blood_pressure", "Latest reading");
        assert_eq!(def.input_schema["type"], "object");
        assert!(def.input_schema["properties"].as_object().expect("object").is_empty());
    }

    #[test]
    fn register_rejects_duplicate_names() {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(StaticTool::succeeding("lookup", payload(json!({})))))
            .expect("first registration");

        let err = registry
            .register(Arc::new(StaticTool::succeeding("lookup", payload(json!({})))))
            .expect_err("duplicate");
        assert_eq!(
            err,
            RegistryError::DuplicateTool {
                name: "lookup".to_string()
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn register_rejects_invalid_schema() {
        let mut registry = ToolRegistry::new();
        let tool = StaticTool::succeeding("broken", payload(json!({})))
            .with_input_schema(json!({"type": "not-a-type"}));

        let err = registry.register(Arc::new(tool)).expect_err("invalid schema");
        assert!(matches!(err, RegistryError::InvalidSchema { ref name, .. } if name == "broken"));
        assert!(registry.is_empty());
    }

    #[test]
    fn resolve_unknown_tool_names_the_tool() {
        let registry = ToolRegistry::new();
        let err = registry.resolve("unknown_tool").expect_err("unknown");
        assert_eq!(
            err,
            ToolCallError::UnknownTool {
                name: "unknown_tool".to_string()
            }
        );
    }

    #[tokio::test]
    async fn resolve_unknown_tool_invokes_nothing() {
        let tool = Arc::new(StaticTool::succeeding("lookup", payload(json!({"ok": true}))));
        let mut registry = ToolRegistry::new();
        registry.register(tool.clone()).expect("register");

        assert!(registry.resolve("lookup_v2").is_err());
        assert_eq!(tool.call_count(), 0);

        let resolved = registry.resolve("lookup").expect("known");
        resolved.call(json!({})).await.expect("call");
        assert_eq!(tool.call_count(), 1);
    }

    #[tokio::test]
    async fn invalid_arguments_never_reach_the_tool() {
        let tool = Arc::new(
            StaticTool::succeeding("trend", payload(json!({"trend": "stable"}))).with_input_schema(
                json!({
                    "type": "object",
                    "properties": { "days": { "type": "integer", "minimum": 1 } },
                    "required": ["days"]
                }),
            ),
        );
        let mut registry = ToolRegistry::new();
        registry.register(tool.clone()).expect("register");
        let resolved = registry.resolve("trend").expect("known");

        let err = resolved.call(json!({"days": "seven"})).await.expect_err("invalid");
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
        let err = resolved.call(json!({})).await.expect_err("missing");
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
        assert_eq!(tool.call_count(), 0);

        let output = resolved.call(json!({"days": 7})).await.expect("valid");
        assert_eq!(output["trend"], "stable");
        assert_eq!(tool.call_count(), 1);
    }

    #[test]
    fn definitions_keep_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["b_tool", "a_tool", "c_tool"] {
            registry
                .register(Arc::new(StaticTool::succeeding(name, payload(json!({})))))
                .expect("register");
        }
        let names: Vec<_> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["b_tool", "a_tool", "c_tool"]);
        assert!(registry.get("a_tool").is_some());
        assert!(registry.get("d_tool").is_none());
    }
}
