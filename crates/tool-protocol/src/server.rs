//! Tool provider
//!
//! Serves a [`ToolRegistry`] (and optional read-only resources) over one
//! newline-framed JSON-RPC connection. A connection starts in
//! [`ConnectionState::Handshaking`] and only answers `tools/*` and
//! `resources/*` once `initialize` has been received.

use agent_core::{ToolCall, ToolRegistry};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::protocol::{
    CallToolParams, CallToolResult, Content, Implementation, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ListResourcesResult, ListToolsResult, McpTool, PROTOCOL_VERSION, ReadResourceParams,
    ReadResourceResult, ResourceContents, ResourceDescriptor, ServerCapabilities, error_codes, methods,
};

/// Read-only data a provider exposes by URI
#[async_trait]
pub trait Resource: Send + Sync {
    fn descriptor(&self) -> ResourceDescriptor;

    /// Current contents as text
    async fn read(&self) -> Result<String>;
}

/// Lifecycle of a single connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Handshaking,
    Ready,
}

/// Named collection of tools and resources served to consumers
pub struct ToolProvider {
    info: Implementation,
    tools: ToolRegistry,
    resources: Vec<Arc<dyn Resource>>,
}

impl ToolProvider {
    pub fn new(name: impl Into<String>, version: impl Into<String>, tools: ToolRegistry) -> Self {
        Self {
            info: Implementation {
                name: name.into(),
                version: version.into(),
            },
            tools,
            resources: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_resource<R: Resource + 'static>(mut self, resource: R) -> Self {
        self.resources.push(Arc::new(resource));
        self
    }

    pub const fn info(&self) -> &Implementation {
        &self.info
    }

    pub const fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Serve on the process's own stdin/stdout until stdin closes
    pub async fn serve_stdio(&self) -> Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve one connection until the reader reaches end of input.
    ///
    /// Requests are handled one at a time in arrival order. Nothing but
    /// protocol frames is ever written to `writer`.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(
            server = %self.info.name,
            tools = self.tools.len(),
            resources = self.resources.len(),
            "Tool provider listening"
        );

        let mut state = ConnectionState::Handshaking;
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            let response = match decode_frame(&buf) {
                Ok(None) => continue,
                Ok(Some(request)) => self.handle(&mut state, request).await,
                Err(failure) => Some(failure),
            };

            if let Some(response) = response {
                let mut frame = serde_json::to_string(&response)?;
                frame.push('\n');
                writer.write_all(frame.as_bytes()).await?;
                writer.flush().await?;
            }
        }

        info!(server = %self.info.name, "Consumer disconnected, tool provider stopped");
        Ok(())
    }

    /// Answer one request; notifications yield `None`
    pub async fn handle(&self, state: &mut ConnectionState, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id else {
            match request.method.as_str() {
                methods::INITIALIZED => debug!("Consumer confirmed initialization"),
                other => debug!(method = other, "Ignoring notification"),
            }
            return None;
        };

        let method = request.method.as_str();
        let outcome = match method {
            methods::INITIALIZE => {
                *state = ConnectionState::Ready;
                info!("Handshake complete");
                Ok(self.initialize_result())
            }
            methods::PING => Ok(json!({})),
            methods::TOOLS_LIST | methods::TOOLS_CALL | methods::RESOURCES_LIST | methods::RESOURCES_READ
                if *state == ConnectionState::Handshaking =>
            {
                Err(JsonRpcError::new(error_codes::NOT_INITIALIZED, "Server not initialized"))
            }
            methods::TOOLS_LIST => to_value(self.list_tools()),
            methods::TOOLS_CALL => match parse_params::<CallToolParams>(request.params) {
                Ok(params) => self.call_tool(params).await.and_then(to_value),
                Err(e) => Err(e),
            },
            methods::RESOURCES_LIST => to_value(self.list_resources()),
            methods::RESOURCES_READ => match parse_params::<ReadResourceParams>(request.params) {
                Ok(params) => self.read_resource(&params.uri).await.and_then(to_value),
                Err(e) => Err(e),
            },
            other => Err(JsonRpcError::new(
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            )),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => {
                debug!(method, code = error.code, message = %error.message, "Request failed");
                JsonRpcResponse::failure(id, error)
            }
        })
    }

    fn initialize_result(&self) -> Value {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.into(),
            capabilities: ServerCapabilities {
                tools: Some(json!({ "listChanged": false })),
                resources: (!self.resources.is_empty()).then(|| json!({ "listChanged": false })),
            },
            server_info: self.info.clone(),
        };
        serde_json::to_value(result).unwrap_or(Value::Null)
    }

    pub fn list_tools(&self) -> ListToolsResult {
        ListToolsResult {
            tools: self.tools.describe_all().into_iter().map(McpTool::from).collect(),
            next_cursor: None,
        }
    }

    /// Execute a tool.
    ///
    /// Unknown tools and arguments that fail the tool's schema are protocol
    /// errors; failures raised by the tool itself come back as an `isError`
    /// result.
    pub async fn call_tool(&self, params: CallToolParams) -> std::result::Result<CallToolResult, JsonRpcError> {
        let tool = self.tools.resolve(&params.name).ok_or_else(|| {
            JsonRpcError::new(error_codes::INVALID_PARAMS, format!("Unknown tool: {}", params.name))
        })?;

        let arguments = match params.arguments {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(JsonRpcError::new(
                    error_codes::INVALID_PARAMS,
                    format!("Arguments for '{}' must be an object, got {other}", params.name),
                ));
            }
        };

        let call = ToolCall::new(String::new(), params.name.clone(), arguments);
        tool.validate(&call)
            .map_err(|e| JsonRpcError::new(error_codes::INVALID_PARAMS, e.to_string()))?;

        info!(tool = %params.name, "Tool called");
        let result = match tool.execute(&call).await {
            Ok(result) => CallToolResult {
                content: vec![Content::text(result.output)],
                is_error: !result.success,
            },
            Err(e) => {
                warn!(tool = %params.name, error = %e, "Tool execution failed");
                CallToolResult {
                    content: vec![Content::text(e.to_string())],
                    is_error: true,
                }
            }
        };
        Ok(result)
    }

    pub fn list_resources(&self) -> ListResourcesResult {
        ListResourcesResult {
            resources: self.resources.iter().map(|r| r.descriptor()).collect(),
            next_cursor: None,
        }
    }

    pub async fn read_resource(&self, uri: &str) -> std::result::Result<ReadResourceResult, JsonRpcError> {
        let resource = self
            .resources
            .iter()
            .find(|r| r.descriptor().uri == uri)
            .ok_or_else(|| JsonRpcError::new(error_codes::INVALID_PARAMS, format!("Unknown resource: {uri}")))?;

        let descriptor = resource.descriptor();
        let text = resource
            .read()
            .await
            .map_err(|e| JsonRpcError::new(error_codes::INTERNAL_ERROR, e.to_string()))?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: descriptor.uri,
                mime_type: descriptor.mime_type,
                text: Some(text),
            }],
        })
    }
}

/// Turn one raw line into a request.
///
/// Blank lines yield `Ok(None)`. Bytes that are not JSON get a parse error
/// with a null id; JSON that is not a request gets an invalid-request error
/// carrying whatever id it had.
fn decode_frame(raw: &[u8]) -> std::result::Result<Option<JsonRpcRequest>, JsonRpcResponse> {
    let parse_error = |detail: String| {
        warn!(error = %detail, "Received unparseable frame");
        JsonRpcResponse::failure(
            Value::Null,
            JsonRpcError::new(error_codes::PARSE_ERROR, format!("Parse error: {detail}")),
        )
    };

    let text = std::str::from_utf8(raw).map_err(|e| parse_error(e.to_string()))?;
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(text).map_err(|e| parse_error(e.to_string()))?;
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map(Some).map_err(|e| {
        warn!(error = %e, "Received frame that is not a request");
        JsonRpcResponse::failure(
            id,
            JsonRpcError::new(error_codes::INVALID_REQUEST, format!("Invalid request: {e}")),
        )
    })
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> std::result::Result<T, JsonRpcError> {
    serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|e| JsonRpcError::new(error_codes::INVALID_PARAMS, format!("Invalid params: {e}")))
}

fn to_value<T: serde::Serialize>(value: T) -> std::result::Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::new(error_codes::INTERNAL_ERROR, e.to_string()))
}
