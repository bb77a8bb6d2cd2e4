//! LLM Provider
//!
//! The completion endpoint the reasoning loop talks to. One call sends the full
//! transcript plus the advertised tools and returns one assistant turn, which is
//! either plain text or a list of tool-call requests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::provider::{GenerationOptions, LlmProvider};
//!
//! let provider = OpenAiProvider::from_env()?;
//! let completion = provider.complete(&messages, &tools, &options).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::{Message, ToolCallRequest};
use crate::tool::ToolDescriptor;

/// Model used when nothing else is configured
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Configuration for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "gpt-4o-mini")
    pub model: String,

    /// Temperature for sampling; provider default when unset
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate; provider default when unset
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            temperature: None,
            max_tokens: None,
        }
    }
}

impl GenerationOptions {
    /// Model from `CHAT_MODEL`, falling back to [`DEFAULT_MODEL`]
    pub fn from_env() -> Self {
        Self {
            model: std::env::var("CHAT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into()),
            ..Default::default()
        }
    }
}

/// Response from an LLM completion
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Completion {
    /// The generated text (may be empty when tools are requested)
    pub content: String,

    /// Tool calls requested in this turn
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRequest>,

    /// Model that generated this response
    pub model: String,

    /// Token usage statistics (if available)
    pub usage: Option<TokenUsage>,

    /// Finish reason
    pub finish_reason: Option<FinishReason>,
}

impl Completion {
    /// A plain text answer
    pub fn text(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
            model: model.into(),
            usage: None,
            finish_reason: Some(FinishReason::Stop),
        }
    }

    /// A turn that requests tools
    pub fn tool_calls(calls: Vec<ToolCallRequest>, model: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            tool_calls: calls,
            model: model.into(),
            usage: None,
            finish_reason: Some(FinishReason::ToolCalls),
        }
    }

    /// Whether the model asked for tool execution
    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Token usage statistics
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Reason for completion finishing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    pub fn parse(reason: &str) -> Self {
        match reason {
            "stop" => Self::Stop,
            "length" => Self::Length,
            "tool_calls" | "function_call" => Self::ToolCalls,
            "content_filter" => Self::ContentFilter,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A chat-completion backend with function calling
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name
    fn name(&self) -> &str;

    /// Check if the provider is reachable and configured correctly
    async fn health_check(&self) -> Result<bool>;

    /// Generate one assistant turn for the transcript
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
        options: &GenerationOptions,
    ) -> Result<Completion>;
}
