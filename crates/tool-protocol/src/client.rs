//! Tool consumer
//!
//! [`ToolConsumer`] launches a provider per operation (one session each),
//! while [`RemoteTool`] adapts a tool on a long-lived [`Session`] to the local
//! [`Tool`] trait so the reasoning loop can call it like any other tool.

use agent_core::{Tool, ToolCall, ToolDescriptor, ToolRegistry, ToolResult};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{McpError, Result};
use crate::protocol::extract_text;
use crate::transport::{DEFAULT_REQUEST_TIMEOUT, ProviderCommand, Session};

/// Launches and talks to one kind of tool provider
#[derive(Debug, Clone)]
pub struct ToolConsumer {
    command: ProviderCommand,
    request_timeout: Duration,
}

impl ToolConsumer {
    pub const fn new(command: ProviderCommand) -> Self {
        Self {
            command,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub const fn command(&self) -> &ProviderCommand {
        &self.command
    }

    /// Spawn the provider and complete the handshake
    pub async fn connect(&self) -> Result<Session> {
        let session = Session::spawn(&self.command, self.request_timeout)?;
        session.initialize().await?;
        Ok(session)
    }

    /// Tool declarations the provider advertises
    pub async fn discover(&self) -> Result<Vec<ToolDescriptor>> {
        let session = self.connect().await?;
        let tools = session.list_tools().await;
        close_quietly(&session).await;
        Ok(tools?.into_iter().map(ToolDescriptor::from).collect())
    }

    /// Call one tool and return its text.
    ///
    /// A structured error from the provider is surfaced as text beginning
    /// with `Error:`; transport failures stay errors.
    pub async fn invoke(&self, name: &str, arguments: Value) -> Result<String> {
        let session = self.connect().await?;
        let outcome = session.call_tool(name, arguments).await;
        close_quietly(&session).await;

        match outcome {
            Ok(result) => Ok(extract_text(&result)),
            Err(McpError::Server { message, .. }) => Ok(format!("Error: {message}")),
            Err(e) => Err(e),
        }
    }

    /// Read a resource's text
    pub async fn read_resource(&self, uri: &str) -> Result<String> {
        let session = self.connect().await?;
        let outcome = session.read_resource(uri).await;
        close_quietly(&session).await;
        outcome
    }
}

async fn close_quietly(session: &Session) {
    if let Err(e) = session.close().await {
        warn!(error = %e, "Failed to close tool provider session");
    }
}

/// A provider's tool exposed through the local [`Tool`] trait
pub struct RemoteTool {
    session: Arc<Session>,
    descriptor: ToolDescriptor,
}

impl RemoteTool {
    pub const fn new(session: Arc<Session>, descriptor: ToolDescriptor) -> Self {
        Self { session, descriptor }
    }

    /// One adapter per tool advertised on an initialized session
    pub async fn discover(session: &Arc<Session>) -> Result<Vec<Self>> {
        let tools = session.list_tools().await?;
        Ok(tools
            .into_iter()
            .map(|tool| Self::new(session.clone(), tool.into()))
            .collect())
    }

    /// Register every remote tool; fails on a name clash with a local tool
    pub async fn register_all(session: &Arc<Session>, registry: &mut ToolRegistry) -> agent_core::Result<usize> {
        let tools = Self::discover(session).await?;
        let count = tools.len();
        for tool in tools {
            registry.register(tool)?;
        }
        debug!(count, "Registered remote tools");
        Ok(count)
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

#[async_trait]
impl Tool for RemoteTool {
    fn descriptor(&self) -> ToolDescriptor {
        self.descriptor.clone()
    }

    async fn execute(&self, call: &ToolCall) -> agent_core::Result<ToolResult> {
        let arguments = Value::Object(call.arguments.clone());
        match self.session.call_tool(self.name(), arguments).await {
            Ok(result) => {
                let text = extract_text(&result);
                if result.get("isError").and_then(Value::as_bool) == Some(true) {
                    Ok(ToolResult::failure(self.name(), text))
                } else {
                    Ok(ToolResult::success(self.name(), text))
                }
            }
            Err(McpError::Server { message, .. }) => Ok(ToolResult::failure(self.name(), message)),
            Err(e) => {
                if e.is_fatal_to_session() {
                    warn!(tool = self.name(), error = %e, "Tool provider session lost");
                }
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ToolProvider;
    use agent_core::{ParameterSchema, ToolCall};
    use serde_json::{Map, json};

    struct Add;

    #[async_trait]
    impl Tool for Add {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new(
                "add",
                "Add two integers",
                vec![
                    ParameterSchema::required("a", "integer", "Left operand"),
                    ParameterSchema::required("b", "integer", "Right operand"),
                ],
            )
        }

        async fn execute(&self, call: &ToolCall) -> agent_core::Result<ToolResult> {
            let a = call.arguments.get("a").and_then(Value::as_i64).unwrap_or_default();
            let b = call.arguments.get("b").and_then(Value::as_i64).unwrap_or_default();
            Ok(ToolResult::success("add", (a + b).to_string()))
        }
    }

    fn in_process_session() -> Arc<Session> {
        let mut tools = ToolRegistry::new();
        tools.register(Add).unwrap();
        let provider = ToolProvider::new("calc", "1.0.0", tools);

        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        tokio::spawn(async move {
            let (read, write) = tokio::io::split(server_io);
            provider.serve(read, write).await
        });

        let (read, write) = tokio::io::split(client_io);
        Arc::new(Session::from_io("calc", read, write, Duration::from_secs(5)))
    }

    #[tokio::test]
    async fn test_handshake_then_discovery_is_stable() {
        let session = in_process_session();
        let info = session.initialize().await.unwrap();
        assert_eq!(info.server_info.name, "calc");
        assert_eq!(session.server_info().unwrap().version, "1.0.0");

        let first: Vec<String> = session.list_tools().await.unwrap().into_iter().map(|t| t.name).collect();
        let second: Vec<String> = session.list_tools().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(first, vec!["add"]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_remote_tool_in_local_registry() {
        let session = in_process_session();
        session.initialize().await.unwrap();

        let mut registry = ToolRegistry::new();
        assert_eq!(RemoteTool::register_all(&session, &mut registry).await.unwrap(), 1);

        let mut args = Map::new();
        args.insert("a".into(), json!(2));
        args.insert("b".into(), json!(40));
        let result = registry.execute(&ToolCall::new("c1", "add", args)).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, "42");
    }

    #[tokio::test]
    async fn test_remote_unknown_tool_becomes_failure_result() {
        let session = in_process_session();
        session.initialize().await.unwrap();

        let ghost = RemoteTool::new(
            session.clone(),
            ToolDescriptor::from_json_schema("ghost", "", json!({"type": "object"})),
        );
        let result = ghost.execute(&ToolCall::new("c2", "ghost", Map::new())).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.output, "Unknown tool: ghost");
    }

    #[tokio::test]
    async fn test_concurrent_calls_share_one_session() {
        let session = in_process_session();
        session.initialize().await.unwrap();

        let calls = (0..5).map(|i| {
            let session = session.clone();
            async move {
                let result = session.call_tool("add", json!({"a": i, "b": i})).await.unwrap();
                (i, extract_text(&result))
            }
        });
        for (i, text) in futures::future::join_all(calls).await {
            assert_eq!(text, (i * 2).to_string());
        }
    }

    #[tokio::test]
    async fn test_spawn_failure_is_transport_error() {
        let consumer = ToolConsumer::new(ProviderCommand::new("/nonexistent/tool-provider"))
            .with_timeout(Duration::from_secs(1));
        assert!(matches!(consumer.discover().await, Err(McpError::Transport(_))));
    }
}
