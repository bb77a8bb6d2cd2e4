//! Tool System
//!
//! Tools are declared by a [`ToolDescriptor`] (name, description, JSON Schema for
//! the parameters) and registered by name in a [`ToolRegistry`]. The registry is
//! the only way the reasoning loop resolves a tool call; there is no implicit
//! lookup, so an unknown name is an ordinary, testable outcome.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::message::ToolCallRequest;

/// A resolved tool call with parsed arguments
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call ID from the model
    pub id: String,

    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Parse the raw JSON arguments of a model request.
    ///
    /// An empty argument string means "no arguments". Anything that is not a
    /// JSON object is a [`AgentError::Parse`].
    pub fn parse(request: &ToolCallRequest) -> Result<Self> {
        let raw = request.arguments.trim();
        let arguments = if raw.is_empty() {
            Map::new()
        } else {
            match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => map,
                Ok(other) => {
                    return Err(AgentError::Parse(format!(
                        "arguments for '{}' must be a JSON object, got {other}",
                        request.name
                    )));
                }
                Err(e) => {
                    return Err(AgentError::Parse(format!(
                        "invalid JSON arguments for '{}': {e}",
                        request.name
                    )));
                }
            }
        };

        Ok(Self::new(request.id.clone(), request.name.clone(), arguments))
    }

    /// String argument, if present
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }
}

/// Result from tool execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that was called
    pub name: String,

    /// Call ID this result answers
    pub id: Option<String>,

    /// Whether execution succeeded
    pub success: bool,

    /// Output (success payload or error description)
    pub output: String,
}

impl ToolResult {
    pub fn success(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            success: true,
            output: output.into(),
        }
    }

    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            success: false,
            output: error.into(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Text placed in the tool message the model reads
    pub fn message_content(&self) -> String {
        if self.success {
            self.output.clone()
        } else {
            json!({ "error": self.output }).to_string()
        }
    }
}

/// Parameter definition used to build a tool's JSON Schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number, integer, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,

    /// Enum of allowed values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

impl ParameterSchema {
    pub fn required(name: impl Into<String>, param_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: true,
            enum_values: None,
        }
    }

    pub fn optional(name: impl Into<String>, param_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }
}

/// Static declaration of a tool: name, description and parameter schema
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to the model)
    #[serde(default)]
    pub description: String,

    /// JSON Schema of the arguments object
    pub parameters: Value,
}

impl ToolDescriptor {
    /// Build a closed object schema (`additionalProperties: false`) from parameter definitions
    pub fn new(name: impl Into<String>, description: impl Into<String>, params: Vec<ParameterSchema>) -> Self {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in params {
            let mut property = json!({
                "type": param.param_type,
                "description": param.description,
            });
            if let Some(values) = param.enum_values {
                property["enum"] = Value::Array(values);
            }
            if param.required {
                required.push(Value::String(param.name.clone()));
            }
            properties.insert(param.name, property);
        }

        Self {
            name: name.into(),
            description: description.into(),
            parameters: json!({
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": false,
            }),
        }
    }

    /// Wrap a schema received from elsewhere without altering it
    pub fn from_json_schema(name: impl Into<String>, description: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: schema,
        }
    }

    /// Names listed under `required`
    pub fn required_parameters(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Check arguments against the schema: required fields, the
    /// additional-properties policy, primitive types and enums.
    pub fn validate(&self, arguments: &Map<String, Value>) -> Result<()> {
        for name in self.required_parameters() {
            if !arguments.contains_key(name) {
                return Err(AgentError::ToolValidation(format!(
                    "Missing required parameter: {name}"
                )));
            }
        }

        let properties = self.parameters.get("properties").and_then(Value::as_object);
        let closed = self.parameters.get("additionalProperties") == Some(&Value::Bool(false));

        for (key, value) in arguments {
            let Some(property) = properties.and_then(|p| p.get(key)) else {
                if closed {
                    return Err(AgentError::ToolValidation(format!(
                        "Unexpected parameter: {key}"
                    )));
                }
                continue;
            };

            if let Some(expected) = property.get("type").and_then(Value::as_str) {
                if !type_matches(expected, value) {
                    return Err(AgentError::ToolValidation(format!(
                        "Parameter '{key}' must be of type {expected}"
                    )));
                }
            }

            if let Some(allowed) = property.get("enum").and_then(Value::as_array) {
                if !allowed.contains(value) {
                    return Err(AgentError::ToolValidation(format!(
                        "Parameter '{key}' must be one of {}",
                        Value::Array(allowed.clone())
                    )));
                }
            }
        }

        Ok(())
    }
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool's declaration, advertised to the model
    fn descriptor(&self) -> ToolDescriptor;

    /// Execute the tool with given arguments
    async fn execute(&self, call: &ToolCall) -> Result<ToolResult>;

    /// Validate arguments before execution
    fn validate(&self, call: &ToolCall) -> Result<()> {
        self.descriptor().validate(&call.arguments)
    }
}

/// Registry mapping tool names to implementations
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool; names must be unique
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a shared tool; names must be unique
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.descriptor().name;
        if self.tools.contains_key(&name) {
            return Err(AgentError::Config(format!("Tool '{name}' is already registered")));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Look a tool up by name
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Validate and execute a tool call
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let tool = self
            .resolve(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        tool.validate(call)?;
        tool.execute(call).await
    }

    /// Every descriptor, ordered by name
    pub fn describe_all(&self) -> Vec<ToolDescriptor> {
        let mut descriptors: Vec<_> = self.tools.values().map(|t| t.descriptor()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Tool names, ordered
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
