//! OpenAI Chat Completions Provider
//!
//! Implementation of `LlmProvider` for the OpenAI chat-completions API, or any
//! server that speaks the same wire format.

use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role, ToolCallRequest},
    provider::{Completion, FinishReason, GenerationOptions, LlmProvider, TokenUsage},
    tool::ToolDescriptor,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Provider configuration
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// Bearer token
    pub api_key: String,

    /// API base URL, without trailing slash
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: OPENAI_API_URL.into(),
            timeout_secs: 60,
        }
    }

    /// Read `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `OPENAI_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| AgentError::Config("OPENAI_API_KEY not set".into()))?;
        let base_url = std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| OPENAI_API_URL.into());
        let timeout_secs = std::env::var("OPENAI_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
        })
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    /// Null for an assistant turn that only carries tool calls
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    #[serde(rename = "type", default = "function_type")]
    kind: String,
    function: WireFunctionCall,
}

fn function_type() -> String {
    "function".into()
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionDef<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunctionDef<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct WireErrorResponse {
    error: WireError,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
}

/// OpenAI LLM provider
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    /// Create from configuration
    pub fn from_config(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(OpenAiConfig::from_env()?)
    }

    /// Convert agent messages to the wire format
    fn convert_messages(messages: &[Message]) -> Vec<WireMessage> {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::Tool => "tool",
                };
                let tool_calls = m.has_tool_calls().then(|| {
                    m.tool_calls
                        .iter()
                        .map(|c| WireToolCall {
                            id: c.id.clone(),
                            kind: function_type(),
                            function: WireFunctionCall {
                                name: c.name.clone(),
                                arguments: c.arguments.clone(),
                            },
                        })
                        .collect()
                });
                let content = if m.content.is_empty() && tool_calls.is_some() {
                    None
                } else {
                    Some(m.content.clone())
                };

                WireMessage {
                    role,
                    content,
                    tool_calls,
                    tool_call_id: m.tool_call_id.clone(),
                }
            })
            .collect()
    }

    /// Each descriptor becomes a `function` tool; the schema is passed through untouched
    fn convert_tools(tools: &[ToolDescriptor]) -> Vec<WireTool<'_>> {
        tools
            .iter()
            .map(|t| WireTool {
                kind: "function",
                function: WireFunctionDef {
                    name: &t.name,
                    description: &t.description,
                    parameters: &t.parameters,
                },
            })
            .collect()
    }

    /// Convert the first choice into a completion
    fn convert_completion(response: ChatResponse, requested_model: &str) -> Result<Completion> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("response contained no choices".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|c| ToolCallRequest::new(c.id, c.function.name, c.function.arguments))
            .collect();

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            model: response.model.unwrap_or_else(|| requested_model.to_string()),
            usage: response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: choice.finish_reason.as_deref().map(FinishReason::parse),
        })
    }

    fn classify_send_error(err: &reqwest::Error) -> AgentError {
        if err.is_timeout() {
            AgentError::Timeout(format!("completion request: {err}"))
        } else if err.is_connect() {
            AgentError::ProviderUnavailable(err.to_string())
        } else {
            AgentError::Provider(err.to_string())
        }
    }

    fn classify_status(status: StatusCode, body: &str) -> AgentError {
        let detail = serde_json::from_str::<WireErrorResponse>(body)
            .map_or_else(|_| body.to_string(), |e| e.error.message);

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Auth(detail),
            StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited(detail),
            s if s.is_server_error() => AgentError::ProviderUnavailable(format!("{s}: {detail}")),
            s => AgentError::Provider(format!("{s}: {detail}")),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "OpenAI"
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/models", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .send()
            .await;

        match response {
            Ok(r) => Ok(r.status().is_success()),
            Err(e) => {
                tracing::warn!("OpenAI health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let request = ChatRequest {
            model: &options.model,
            messages: Self::convert_messages(messages),
            tools: Self::convert_tools(tools),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        tracing::debug!(model = %options.model, messages = messages.len(), tools = tools.len(), "Requesting completion");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::classify_send_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &body));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Parse(format!("invalid completion payload: {e}")))?;

        Self::convert_completion(body, &options.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::tool::ParameterSchema;
    use mockito::Matcher;
    use serde_json::json;

    fn provider(base_url: String) -> OpenAiProvider {
        OpenAiProvider::from_config(OpenAiConfig {
            api_key: "sk-test".into(),
            base_url,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_message_conversion() {
        let messages = vec![
            Message::system("You are helpful."),
            Message::user("Hello"),
            Message::assistant_tool_calls("", vec![ToolCallRequest::new("c1", "lookup", "{}")]),
            Message::tool("{\"recorded\":\"ok\"}", "c1"),
        ];

        let converted = OpenAiProvider::convert_messages(&messages);
        assert_eq!(converted.len(), 4);
        assert_eq!(converted[2].role, "assistant");
        assert!(converted[2].content.is_none());
        assert_eq!(converted[2].tool_calls.as_ref().unwrap()[0].function.name, "lookup");
        assert_eq!(converted[3].tool_call_id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_tool_schema_passes_through() {
        let tools = vec![ToolDescriptor::new(
            "record_unknown_question",
            "Record a question",
            vec![ParameterSchema::required("question", "string", "The question")],
        )];

        let wire = serde_json::to_value(OpenAiProvider::convert_tools(&tools)).unwrap();
        assert_eq!(wire[0]["type"], "function");
        assert_eq!(wire[0]["function"]["parameters"]["additionalProperties"], json!(false));
        assert_eq!(wire[0]["function"]["parameters"]["required"], json!(["question"]));
    }

    #[tokio::test]
    async fn test_complete_with_tool_calls() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({"model": "gpt-4o-mini"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "model": "gpt-4o-mini",
                    "choices": [{
                        "finish_reason": "tool_calls",
                        "message": {
                            "content": null,
                            "tool_calls": [{
                                "id": "call_1",
                                "type": "function",
                                "function": {"name": "record_user_details", "arguments": "{\"email\":\"\"}"}
                            }]
                        }
                    }],
                    "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let completion = provider(server.url())
            .complete(&[Message::user("How can I reach you?")], &[], &GenerationOptions::default())
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(completion.wants_tools());
        assert_eq!(completion.finish_reason, Some(FinishReason::ToolCalls));
        assert_eq!(completion.tool_calls[0].id, "call_1");
        assert_eq!(completion.tool_calls[0].arguments, "{\"email\":\"\"}");
        assert_eq!(completion.usage.unwrap().total_tokens, 15);
    }

    #[tokio::test]
    async fn test_complete_plain_answer() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(
                json!({"choices": [{"finish_reason": "stop", "message": {"content": "Hello!"}}]}).to_string(),
            )
            .create_async()
            .await;

        let completion = provider(server.url())
            .complete(&[Message::user("Hi")], &[], &GenerationOptions::default())
            .await
            .unwrap();

        assert!(!completion.wants_tools());
        assert_eq!(completion.content, "Hello!");
        assert_eq!(completion.model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body(json!({"error": {"message": "slow down"}}).to_string())
            .create_async()
            .await;

        let err = provider(server.url())
            .complete(&[Message::user("Hi")], &[], &GenerationOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::RateLimited(ref m) if m == "slow down"));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_server_error_and_garbled_body() {
        let mut server = mockito::Server::new_async().await;
        let outage = server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("upstream down")
            .expect(1)
            .create_async()
            .await;

        let err = provider(server.url())
            .complete(&[Message::user("Hi")], &[], &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ProviderUnavailable(ref m) if m.contains("upstream down")));
        outage.assert_async().await;

        let mut garbled = mockito::Server::new_async().await;
        garbled
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("{\"choices\": [")
            .create_async()
            .await;

        let err = provider(garbled.url())
            .complete(&[Message::user("Hi")], &[], &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Parse(ref m) if m.starts_with("invalid completion payload")));
    }

    #[tokio::test]
    async fn test_health_check() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/models").with_status(200).with_body("{}").create_async().await;

        assert!(provider(server.url()).health_check().await.unwrap());
    }
}
