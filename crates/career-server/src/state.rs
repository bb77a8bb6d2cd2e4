//! Application State

use std::sync::Arc;

use agent_core::{AgentConfig, LlmProvider, ToolRegistry};
use career_bot::Persona;
use tool_protocol::ToolConsumer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// LLM provider (OpenAI-compatible endpoint)
    pub provider: Arc<dyn LlmProvider>,

    /// In-process tools offered on every turn
    pub tools: Arc<ToolRegistry>,

    /// Who the bot speaks for; source of the system prompt
    pub persona: Arc<Persona>,

    /// Remote tool provider, if one is configured.
    /// Each chat turn opens its own session.
    pub consumer: Option<Arc<ToolConsumer>>,

    /// Loop limits and generation options
    pub agent_config: AgentConfig,
}
