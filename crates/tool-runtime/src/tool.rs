use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

use crate::registry::ValidatedArguments;

/// Primitive JSON type of a tool parameter. Tool arguments are flat:
/// no nested objects or arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Boolean,
    Number,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Boolean => "boolean",
            ParamType::Number => "number",
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Number => value.is_number(),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared tool parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParamType,
    pub description: String,
    pub required: bool,
}

impl Parameter {
    pub fn required(name: &str, kind: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            required: true,
        }
    }

    pub fn optional(name: &str, kind: ParamType, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// Describes a tool's interface for the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name (e.g., "createShorty")
    pub name: String,
    /// Human-readable description for the model
    pub description: String,
    /// Declared parameters, in the order they are presented to the model
    pub parameters: Vec<Parameter>,
}

impl ToolDefinition {
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// JSON Schema object for the parameters, as sent to the model.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            properties.insert(
                param.name.clone(),
                json!({
                    "type": param.kind.as_str(),
                    "description": param.description,
                }),
            );
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

impl fmt::Display for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.description)
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name to execute
    pub name: String,
    /// JSON arguments, validated against the tool's parameters before execution
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Outcome of one dispatched tool call, as fed back to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub name: String,
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn ok(name: &str, content: String) -> Self {
        Self {
            name: name.to_string(),
            content,
            is_error: false,
        }
    }

    pub fn error(name: &str, content: String) -> Self {
        Self {
            name: name.to_string(),
            content,
            is_error: true,
        }
    }
}

/// Server-side function the model can call.
///
/// Implementations receive arguments that already passed schema validation
/// and return the JSON text handed back to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool's definition (name, description, parameters).
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with validated arguments.
    async fn execute(&self, args: ValidatedArguments) -> Result<String, ToolError>;
}

/// Serialize a tool's result to compact JSON, keeping struct field order.
pub fn to_content<T: Serialize>(value: &T) -> Result<String, ToolError> {
    serde_json::to_string(value)
        .map_err(|e| ToolError::ExecutionFailed(format!("JSON serialization failed: {e}")))
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
    #[error("Timeout after {0:?}")]
    Timeout(std::time::Duration),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition() -> ToolDefinition {
        ToolDefinition {
            name: "createShorty".to_string(),
            description: "Creates a new short link".to_string(),
            parameters: vec![
                Parameter::required("slug", ParamType::String, "The shortened part of the url."),
                Parameter::required("url", ParamType::String, "Destination"),
                Parameter::optional("override", ParamType::Boolean, "Replace existing"),
            ],
        }
    }

    #[test]
    fn test_input_schema() {
        let schema = definition().input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["slug"]["type"], "string");
        assert_eq!(schema["properties"]["override"]["type"], "boolean");
        assert_eq!(schema["required"], json!(["slug", "url"]));
    }

    #[test]
    fn test_tool_call_missing_arguments_default_to_null() {
        let call: ToolCall = serde_json::from_str(r#"{"name":"createShorty"}"#).unwrap();
        assert_eq!(call.name, "createShorty");
        assert!(call.arguments.is_null());
    }

    #[test]
    fn test_param_type_matching() {
        assert!(ParamType::Boolean.matches(&json!(true)));
        assert!(!ParamType::Boolean.matches(&json!("true")));
        assert!(ParamType::Number.matches(&json!(1.5)));
        assert!(!ParamType::String.matches(&json!(1)));
    }

    #[test]
    fn test_to_content_keeps_field_order() {
        #[derive(Serialize)]
        struct Out {
            z: u8,
            a: u8,
        }
        assert_eq!(to_content(&Out { z: 1, a: 2 }).unwrap(), r#"{"z":1,"a":2}"#);
    }
}
