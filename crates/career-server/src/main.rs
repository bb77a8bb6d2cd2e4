//! career-agent HTTP Server
//!
//! Axum-based server exposing the career persona's conversation loop. Local
//! lead-capture tools are always available; when `DATETIME_SERVER_CMD` is set,
//! the date/time tool provider is launched for each chat turn and its tools
//! are offered alongside.

mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{AgentConfig, LlmProvider};
use agent_runtime::OpenAiProvider;
use career_bot::{GithubClient, Notifier, Persona, ProfileConfig};
use tool_protocol::{ProviderCommand, ToolConsumer};

use crate::handlers::{chat_handler, health_check, list_tools};
use crate::state::AppState;

pub(crate) fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/tools", get(list_tools))
        .route("/api/chat", post(chat_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    // Initialize LLM provider
    let provider = Arc::new(OpenAiProvider::from_env()?);
    match provider.health_check().await {
        Ok(true) => tracing::info!("✓ Connected to {}", provider.name()),
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ {} not reachable - chat requests will fail", provider.name());
            tracing::warn!("  Check OPENAI_API_KEY and OPENAI_BASE_URL");
        }
    }

    // Local tools
    let notifier = career_bot::notify::from_env();
    tracing::info!("Notifications via {}", notifier.name());
    let tools = career_bot::career_tools(notifier)?;

    tracing::info!("Registered {} local tools:", tools.len());
    for name in tools.names() {
        tracing::info!("  • {}", name);
    }

    // Remote tools
    let consumer = ProviderCommand::from_env("DATETIME_SERVER_CMD").map(|cmd| {
        tracing::info!("✓ Remote tool provider: {}", cmd);
        Arc::new(ToolConsumer::new(cmd))
    });
    if consumer.is_none() {
        tracing::info!("No DATETIME_SERVER_CMD set - running with local tools only");
    }

    // Persona
    let persona = Persona::load(&ProfileConfig::from_env()?, &GithubClient::new()?).await?;

    let agent_config = AgentConfig::from_env();
    tracing::info!(
        model = %agent_config.generation.model,
        max_tool_rounds = agent_config.max_tool_rounds,
        "Agent configured"
    );

    let state = AppState {
        provider,
        tools: Arc::new(tools),
        persona: Arc::new(persona),
        consumer,
        agent_config,
    };

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 career-agent server running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health     - Health check");
    tracing::info!("  GET  /api/tools  - List available tools");
    tracing::info!("  POST /api/chat   - Send message");

    axum::serve(listener, router(state)).await?;

    Ok(())
}
