//! Stdio session
//!
//! A [`Session`] owns one bidirectional newline-framed JSON-RPC channel. Each
//! outgoing request gets a fresh integer id and a oneshot slot in the pending
//! map; a background reader task resolves slots as responses arrive, so
//! responses may come back in any order.

use serde_json::{Value, json};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{McpError, Result};
use crate::protocol::{
    Implementation, InitializeParams, InitializeResult, JsonRpcRequest, JsonRpcResponse, ListParams,
    ListResourcesResult, ListToolsResult, McpTool, PROTOCOL_VERSION, ReadResourceParams, ReadResourceResult,
    ResourceDescriptor, methods,
};

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const CLIENT_NAME: &str = "career-agent";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

/// How to launch a tool provider subprocess
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ProviderCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Split a command line on whitespace; `None` when blank
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next()?;
        Some(Self {
            args: parts.map(str::to_string).collect(),
            ..Self::new(program)
        })
    }

    /// Read a command line from an environment variable
    pub fn from_env(var: &str) -> Option<Self> {
        std::env::var(var).ok().as_deref().and_then(Self::parse)
    }
}

impl std::fmt::Display for ProviderCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// One open channel to a tool provider
pub struct Session {
    label: String,
    writer: Mutex<BoxedWriter>,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
    next_id: AtomicU64,
    initialized: AtomicBool,
    server_info: OnceLock<Implementation>,
    request_timeout: Duration,
    pid: Option<u32>,
    child: Mutex<Option<Child>>,
    reader: JoinHandle<()>,
}

impl Session {
    /// Launch the provider and attach to its stdin/stdout.
    ///
    /// The child inherits stderr so provider logs stay visible, and is killed
    /// if the session is dropped without [`Session::close`].
    pub fn spawn(command: &ProviderCommand, request_timeout: Duration) -> Result<Self> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| McpError::Transport(format!("failed to spawn '{command}': {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Transport("provider stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Transport("provider stdout unavailable".into()))?;

        debug!(command = %command, pid = ?child.id(), "Spawned tool provider");

        Ok(Self::attach(command.program.clone(), stdout, stdin, request_timeout, Some(child)))
    }

    /// Attach to an already-open pair of streams
    pub fn from_io<R, W>(label: impl Into<String>, reader: R, writer: W, request_timeout: Duration) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::attach(label.into(), reader, writer, request_timeout, None)
    }

    fn attach<R, W>(label: String, reader: R, writer: W, request_timeout: Duration, child: Option<Child>) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let reader = tokio::spawn(read_loop(label.clone(), reader, pending.clone(), closed.clone()));
        let pid = child.as_ref().and_then(Child::id);

        Self {
            label,
            writer: Mutex::new(Box::new(writer)),
            pending,
            closed,
            next_id: AtomicU64::new(1),
            initialized: AtomicBool::new(false),
            server_info: OnceLock::new(),
            request_timeout,
            pid,
            child: Mutex::new(child),
            reader,
        }
    }

    /// Perform the handshake: `initialize` then `notifications/initialized`
    pub async fn initialize(&self) -> Result<InitializeResult> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.into(),
            capabilities: json!({}),
            client_info: Implementation {
                name: CLIENT_NAME.into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
        };

        let raw = self.request(methods::INITIALIZE, Some(serde_json::to_value(params)?)).await?;
        let result: InitializeResult = serde_json::from_value(raw)
            .map_err(|e| McpError::Protocol(format!("malformed initialize result: {e}")))?;

        self.notify(methods::INITIALIZED, None).await?;
        self.initialized.store(true, Ordering::SeqCst);
        let _ = self.server_info.set(result.server_info.clone());

        info!(
            provider = %self.label,
            server = %result.server_info.name,
            version = %result.server_info.version,
            "Tool provider session initialized"
        );
        Ok(result)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// OS process id of a spawned provider
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Name and version the provider reported during the handshake
    pub fn server_info(&self) -> Option<&Implementation> {
        self.server_info.get()
    }

    /// Send a request and wait for the response with the matching id
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        if self.closed.load(Ordering::SeqCst) {
            self.pending.lock().await.remove(&id);
            return Err(McpError::Transport(format!("session with '{}' is closed", self.label)));
        }

        let request = JsonRpcRequest::new(id, method, params);
        if let Err(e) = self.write_frame(&serde_json::to_value(&request)?).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        let response = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(McpError::Transport(format!(
                    "'{}' closed the connection before answering '{method}'",
                    self.label
                )));
            }
            Err(_) => {
                self.pending.lock().await.remove(&id);
                warn!(provider = %self.label, method, id, "Tool provider request timed out");
                return Err(McpError::Timeout(method.to_string()));
            }
        };

        if let Some(error) = response.error {
            return Err(McpError::Server {
                code: error.code,
                message: error.message,
            });
        }
        response
            .result
            .ok_or_else(|| McpError::Protocol(format!("response to '{method}' has neither result nor error")))
    }

    /// Send a notification (no response expected)
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        let notification = JsonRpcRequest::notification(method, params);
        self.write_frame(&serde_json::to_value(&notification)?).await
    }

    /// Every tool the provider advertises, following pagination cursors
    pub async fn list_tools(&self) -> Result<Vec<McpTool>> {
        self.ensure_initialized()?;

        let mut tools = Vec::new();
        let mut cursor = None;
        loop {
            let params = serde_json::to_value(ListParams { cursor: cursor.take() })?;
            let raw = self.request(methods::TOOLS_LIST, Some(params)).await?;
            let page: ListToolsResult = serde_json::from_value(raw)
                .map_err(|e| McpError::Protocol(format!("malformed tools/list result: {e}")))?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(tools)
    }

    /// Invoke a tool; the raw result is returned for the caller to unwrap
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value> {
        self.ensure_initialized()?;
        debug!(provider = %self.label, tool = name, "Calling remote tool");
        self.request(methods::TOOLS_CALL, Some(json!({ "name": name, "arguments": arguments })))
            .await
    }

    pub async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>> {
        self.ensure_initialized()?;
        let raw = self.request(methods::RESOURCES_LIST, Some(json!({}))).await?;
        let result: ListResourcesResult = serde_json::from_value(raw)
            .map_err(|e| McpError::Protocol(format!("malformed resources/list result: {e}")))?;
        Ok(result.resources)
    }

    /// Text of the first content entry of a resource
    pub async fn read_resource(&self, uri: &str) -> Result<String> {
        self.ensure_initialized()?;
        let params = serde_json::to_value(ReadResourceParams { uri: uri.to_string() })?;
        let raw = self.request(methods::RESOURCES_READ, Some(params)).await?;
        let result: ReadResourceResult = serde_json::from_value(raw)
            .map_err(|e| McpError::Protocol(format!("malformed resources/read result: {e}")))?;
        result
            .contents
            .into_iter()
            .find_map(|c| c.text)
            .ok_or_else(|| McpError::Protocol(format!("resource '{uri}' has no text content")))
    }

    /// Close the channel and reap the provider process
    pub async fn close(&self) -> Result<()> {
        if let Err(e) = self.writer.lock().await.shutdown().await {
            debug!(provider = %self.label, error = %e, "Writer already closed");
        }

        if let Some(mut child) = self.child.lock().await.take() {
            match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
                Ok(Ok(status)) => debug!(provider = %self.label, %status, "Tool provider exited"),
                Ok(Err(e)) => return Err(McpError::Io(e)),
                Err(_) => {
                    warn!(provider = %self.label, "Tool provider did not exit, killing it");
                    child.kill().await?;
                }
            }
        }
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(McpError::NotInitialized)
        }
    }

    async fn write_frame(&self, frame: &Value) -> Result<()> {
        let mut line = serde_json::to_string(frame)?;
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| McpError::Transport(format!("write to '{}' failed: {e}", self.label)))?;
        writer
            .flush()
            .await
            .map_err(|e| McpError::Transport(format!("flush to '{}' failed: {e}", self.label)))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("label", &self.label)
            .field("pid", &self.pid)
            .field("initialized", &self.is_initialized())
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

async fn read_loop<R>(label: String, reader: R, pending: PendingMap, closed: Arc<AtomicBool>)
where
    R: AsyncRead + Send + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                debug!(provider = %label, "Tool provider closed its output");
                break;
            }
            Ok(_) => match std::str::from_utf8(&buf) {
                Ok(line) => dispatch_line(&label, line, &pending).await,
                Err(e) => warn!(provider = %label, error = %e, "Discarding frame that is not UTF-8"),
            },
            Err(e) => {
                warn!(provider = %label, error = %e, "Failed to read from tool provider");
                break;
            }
        }
    }

    closed.store(true, Ordering::SeqCst);
    // Dropping the senders wakes every waiter with a closed-channel error
    pending.lock().await.clear();
}

async fn dispatch_line(label: &str, line: &str, pending: &PendingMap) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    let frame: Value = match serde_json::from_str(line) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(provider = %label, error = %e, "Discarding unparseable frame");
            return;
        }
    };

    if frame.get("method").is_some() {
        debug!(provider = %label, method = ?frame.get("method"), "Ignoring provider-initiated message");
        return;
    }

    let response: JsonRpcResponse = match serde_json::from_value(frame) {
        Ok(response) => response,
        Err(e) => {
            warn!(provider = %label, error = %e, "Discarding malformed response");
            return;
        }
    };

    let Some(id) = response.id.as_u64() else {
        warn!(provider = %label, id = %response.id, "Response without a usable id");
        return;
    };

    match pending.lock().await.remove(&id) {
        Some(tx) => {
            let _ = tx.send(response);
        }
        None => debug!(provider = %label, id, "No pending request for response"),
    }
}
