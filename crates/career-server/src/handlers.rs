//! HTTP Handlers

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use agent_core::{Agent, AgentError, Message, Role, ToolRegistry};
use tool_protocol::{RemoteTool, Session};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: String,
    pub provider_connected: bool,
    pub remote_tools_configured: bool,
}

#[derive(Debug, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: String,
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub source: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ToolsResponse {
    pub tools: Vec<ToolInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(error: impl Into<String>, code: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

fn agent_failure(e: &AgentError) -> ApiError {
    let (status, code) = match e {
        AgentError::Provider(_)
        | AgentError::ProviderUnavailable(_)
        | AgentError::RateLimited(_)
        | AgentError::Auth(_) => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR"),
        AgentError::Timeout(_) => (StatusCode::BAD_GATEWAY, "TIMEOUT"),
        AgentError::ToolBudgetExceeded(_) => (StatusCode::INTERNAL_SERVER_ERROR, "TOOL_BUDGET_EXCEEDED"),
        AgentError::Parse(_) => (StatusCode::BAD_GATEWAY, "MODEL_PARSE_ERROR"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "AGENT_ERROR"),
    };
    (
        status,
        Json(ErrorResponse {
            error: e.user_message(),
            code: code.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider_connected = state.provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.provider.name().to_string(),
        provider_connected,
        remote_tools_configured: state.consumer.is_some(),
    })
}

/// Local tools plus whatever the remote provider advertises
pub async fn list_tools(State(state): State<AppState>) -> Json<ToolsResponse> {
    let mut tools: Vec<ToolInfo> = state
        .tools
        .describe_all()
        .into_iter()
        .map(|d| ToolInfo {
            name: d.name,
            description: d.description,
            source: "local",
        })
        .collect();

    let mut remote_error = None;
    if let Some(consumer) = &state.consumer {
        match consumer.discover().await {
            Ok(remote) => tools.extend(remote.into_iter().map(|d| ToolInfo {
                name: d.name,
                description: d.description,
                source: "remote",
            })),
            Err(e) => {
                tracing::warn!(error = %e, code = e.code(), "Remote tool discovery failed");
                remote_error = Some(e.to_string());
            }
        }
    }

    Json(ToolsResponse { tools, remote_error })
}

/// One conversation turn
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(bad_request("Message must not be empty", "EMPTY_MESSAGE"));
    }

    let mut history = Vec::with_capacity(payload.history.len());
    for entry in payload.history {
        match entry.role {
            Role::User => history.push(Message::user(entry.content)),
            Role::Assistant => history.push(Message::assistant(entry.content)),
            other => {
                return Err(bad_request(
                    format!("History may only contain user and assistant messages, got '{other}'"),
                    "INVALID_HISTORY",
                ));
            }
        }
    }

    let mut registry = (*state.tools).clone();
    let session = attach_remote_tools(&state, &mut registry).await;

    let agent = Agent::new(state.provider.clone(), Arc::new(registry), state.agent_config.clone());
    let outcome = agent
        .chat(&state.persona.system_prompt(), history, &payload.message)
        .await;

    // Drop the agent's adapters first so this is the last handle to the session
    drop(agent);
    if let Some(session) = session {
        if let Err(e) = session.close().await {
            tracing::warn!(error = %e, "Failed to close tool provider session");
        }
    }

    let message = outcome.map_err(|e| {
        tracing::error!(error = %e, "Agent error");
        agent_failure(&e)
    })?;

    Ok(Json(ChatResponse {
        message,
        model: state.agent_config.generation.model.clone(),
    }))
}

/// Open a session for this turn and register its tools.
///
/// The turn goes ahead with local tools only when the provider cannot be
/// reached.
async fn attach_remote_tools(state: &AppState, registry: &mut ToolRegistry) -> Option<Arc<Session>> {
    let consumer = state.consumer.as_ref()?;

    let session = match consumer.connect().await {
        Ok(session) => Arc::new(session),
        Err(e) => {
            tracing::warn!(command = %consumer.command(), error = %e, "Tool provider unavailable, using local tools");
            return None;
        }
    };

    match RemoteTool::register_all(&session, registry).await {
        Ok(count) => tracing::debug!(count, "Remote tools attached"),
        Err(e) => tracing::warn!(error = %e, "Could not attach remote tools"),
    }
    Some(session)
}
