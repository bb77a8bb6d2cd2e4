//! Reasoning Loop
//!
//! Drives one user turn: invoke the model with the transcript and the advertised
//! tools; if it requests tools, resolve every call against the registry, append
//! the assistant turn and one result per call, and invoke the model again. The
//! turn ends with the first plain answer or when the tool-round budget runs out.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::timeout;

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message, ToolCallRequest};
use crate::provider::{GenerationOptions, LlmProvider};
use crate::tool::{Tool, ToolCall, ToolRegistry, ToolResult};

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Maximum tool-call rounds per user turn
    pub max_tool_rounds: usize,

    /// Upper bound for a single model invocation
    pub model_timeout: Duration,

    /// Upper bound for a single tool execution
    pub tool_timeout: Duration,

    /// Generation options
    pub generation: GenerationOptions,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 8,
            model_timeout: Duration::from_secs(120),
            tool_timeout: Duration::from_secs(30),
            generation: GenerationOptions::default(),
        }
    }
}

impl AgentConfig {
    /// Read `CHAT_MODEL` and `MAX_TOOL_ROUNDS`
    pub fn from_env() -> Self {
        let max_tool_rounds = std::env::var("MAX_TOOL_ROUNDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8);

        Self {
            max_tool_rounds,
            generation: GenerationOptions::from_env(),
            ..Default::default()
        }
    }
}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self::new(provider, tools, AgentConfig::default())
    }

    /// Answer `message` given the system prompt and the prior turns
    pub async fn chat(
        &self,
        system_prompt: &str,
        history: Vec<Message>,
        message: &str,
    ) -> Result<String> {
        let mut conversation = Conversation::from_history(system_prompt, history);
        conversation.push(Message::user(message));
        self.run(&mut conversation).await
    }

    /// Run the loop until the model gives a plain answer
    pub async fn run(&self, conversation: &mut Conversation) -> Result<String> {
        let descriptors = self.tools.describe_all();
        let mut rounds = 0;

        loop {
            let completion = timeout(
                self.config.model_timeout,
                self.provider
                    .complete(conversation.messages(), &descriptors, &self.config.generation),
            )
            .await
            .map_err(|_| {
                AgentError::Timeout(format!(
                    "model did not answer within {:?}",
                    self.config.model_timeout
                ))
            })??;

            if !completion.wants_tools() {
                conversation.push(Message::assistant(completion.content.clone()));
                return Ok(completion.content);
            }

            rounds += 1;
            if rounds > self.config.max_tool_rounds {
                tracing::warn!(rounds = self.config.max_tool_rounds, "Tool-call budget exceeded");
                return Err(AgentError::ToolBudgetExceeded(self.config.max_tool_rounds));
            }

            let requests: Vec<ToolCallRequest> =
                completion.tool_calls.into_iter().map(with_call_id).collect();
            // A malformed argument payload fails the whole turn before anything is appended.
            let calls = requests
                .iter()
                .map(ToolCall::parse)
                .collect::<Result<Vec<_>>>()?;

            tracing::debug!(round = rounds, calls = calls.len(), "Resolving tool calls");

            conversation.push(Message::assistant_tool_calls(completion.content, requests));

            let results = join_all(calls.iter().map(|call| self.execute_tool(call))).await;
            for result in results {
                let id = result.id.clone().unwrap_or_default();
                conversation.push(Message::tool(result.message_content(), id));
            }
        }
    }

    /// Execute a tool call; every failure becomes an error result for the model
    async fn execute_tool(&self, call: &ToolCall) -> ToolResult {
        tracing::info!(tool = %call.name, call_id = %call.id, "Tool called");

        match timeout(self.config.tool_timeout, self.tools.execute(call)).await {
            Ok(Ok(result)) => result.with_id(call.id.clone()),
            Ok(Err(e)) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool call failed");
                ToolResult::failure(&call.name, e.to_string()).with_id(call.id.clone())
            }
            Err(_) => {
                tracing::warn!(tool = %call.name, "Tool call timed out");
                ToolResult::failure(
                    &call.name,
                    format!("Tool '{}' timed out after {:?}", call.name, self.config.tool_timeout),
                )
                .with_id(call.id.clone())
            }
        }
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get configuration
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }
}

fn with_call_id(mut request: ToolCallRequest) -> ToolCallRequest {
    if request.id.is_empty() {
        request.id = format!("call_{}", uuid::Uuid::new_v4().simple());
    }
    request
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: ToolRegistry,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: ToolRegistry::new(),
            config: AgentConfig::default(),
        }
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Result<Self> {
        self.tools.register(tool)?;
        Ok(self)
    }

    #[must_use]
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub const fn model_timeout(mut self, limit: Duration) -> Self {
        self.config.model_timeout = limit;
        self
    }

    #[must_use]
    pub const fn max_tool_rounds(mut self, max: usize) -> Self {
        self.config.max_tool_rounds = max;
        self
    }

    #[must_use]
    pub const fn tool_timeout(mut self, limit: Duration) -> Self {
        self.config.tool_timeout = limit;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        Ok(Agent::new(provider, Arc::new(self.tools), self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use crate::provider::Completion;
    use crate::tool::{ParameterSchema, ToolDescriptor};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned completions and records every transcript it is shown
    struct ScriptedProvider {
        script: Mutex<VecDeque<Completion>>,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Completion>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn transcripts(&self) -> Vec<Vec<Message>> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(
            &self,
            messages: &[Message],
            _tools: &[ToolDescriptor],
            _options: &GenerationOptions,
        ) -> Result<Completion> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AgentError::Provider("script exhausted".into()))
        }
    }

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new("echo", "Echo text", vec![ParameterSchema::required("text", "string", "Text")])
        }

        async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
            Ok(ToolResult::success("echo", call.str_arg("text").unwrap_or_default()))
        }
    }

    struct Broken;

    #[async_trait]
    impl Tool for Broken {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new("broken", "Always fails", vec![])
        }

        async fn execute(&self, _call: &ToolCall) -> Result<ToolResult> {
            Err(AgentError::ToolExecution("disk on fire".into()))
        }
    }

    fn agent(provider: Arc<ScriptedProvider>, max_rounds: usize) -> Agent {
        let mut tools = ToolRegistry::new();
        tools.register(Echo).unwrap();
        tools.register(Broken).unwrap();
        AgentBuilder::new()
            .provider(provider)
            .tools(tools)
            .max_tool_rounds(max_rounds)
            .build()
            .unwrap()
    }

    fn call(id: &str, name: &str, args: &str) -> ToolCallRequest {
        ToolCallRequest::new(id, name, args)
    }

    #[tokio::test]
    async fn test_plain_answer() {
        let provider = ScriptedProvider::new(vec![Completion::text("Hi there", "m")]);
        let agent = agent(provider.clone(), 4);

        let answer = agent.chat("You are Ada.", vec![], "Hello").await.unwrap();

        assert_eq!(answer, "Hi there");
        let seen = provider.transcripts();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0][0].role, Role::System);
        assert_eq!(seen[0][1].content, "Hello");
    }

    #[tokio::test]
    async fn test_parallel_calls_each_get_one_result() {
        let provider = ScriptedProvider::new(vec![
            Completion::tool_calls(
                vec![call("a", "echo", r#"{"text":"one"}"#), call("b", "echo", r#"{"text":"two"}"#)],
                "m",
            ),
            Completion::text("done", "m"),
        ]);
        let agent = agent(provider.clone(), 4);
        let mut conversation = Conversation::with_system_prompt("sys");
        conversation.push(Message::user("go"));

        agent.run(&mut conversation).await.unwrap();

        let second = &provider.transcripts()[1];
        assert!(second[2].has_tool_calls());
        assert_eq!(second[3].tool_call_id.as_deref(), Some("a"));
        assert_eq!(second[3].content, "one");
        assert_eq!(second[4].tool_call_id.as_deref(), Some("b"));
        assert_eq!(second[4].content, "two");

        for transcript in provider.transcripts() {
            let conv = Conversation::from_history("sys", transcript.into_iter().skip(1));
            assert!(conv.unanswered_tool_calls().is_empty());
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_error_result() {
        let provider = ScriptedProvider::new(vec![
            Completion::tool_calls(vec![call("x", "teleport", "{}")], "m"),
            Completion::text("Sorry, I can't do that.", "m"),
        ]);
        let agent = agent(provider.clone(), 4);

        let answer = agent.chat("sys", vec![], "beam me up").await.unwrap();

        assert_eq!(answer, "Sorry, I can't do that.");
        let result = &provider.transcripts()[1][3];
        assert_eq!(result.role, Role::Tool);
        assert!(result.content.contains("Unknown tool: teleport"));
    }

    #[tokio::test]
    async fn test_failing_and_invalid_calls_do_not_abort_turn() {
        let provider = ScriptedProvider::new(vec![
            Completion::tool_calls(vec![call("1", "broken", "{}"), call("2", "echo", "{}")], "m"),
            Completion::text("ok", "m"),
        ]);
        let agent = agent(provider.clone(), 4);

        agent.chat("sys", vec![], "try").await.unwrap();

        let transcript = &provider.transcripts()[1];
        assert!(transcript[3].content.contains("disk on fire"));
        assert!(transcript[4].content.contains("Missing required parameter: text"));
    }

    #[tokio::test]
    async fn test_malformed_arguments_fail_the_turn() {
        let provider = ScriptedProvider::new(vec![Completion::tool_calls(
            vec![call("1", "echo", "{\"text\": ")],
            "m",
        )]);
        let agent = agent(provider, 4);
        let mut conversation = Conversation::with_system_prompt("sys");
        conversation.push(Message::user("go"));

        let err = agent.run(&mut conversation).await.unwrap_err();

        assert!(matches!(err, AgentError::Parse(_)));
        assert_eq!(conversation.len(), 2);
    }

    #[tokio::test]
    async fn test_tool_budget() {
        let looping = || Completion::tool_calls(vec![call("", "echo", r#"{"text":"again"}"#)], "m");
        let provider = ScriptedProvider::new(vec![looping(), looping(), looping()]);
        let agent = agent(provider.clone(), 2);

        let err = agent.chat("sys", vec![], "loop").await.unwrap_err();

        assert!(matches!(err, AgentError::ToolBudgetExceeded(2)));
        assert_eq!(provider.transcripts().len(), 3);
        let ids: Vec<_> = provider.transcripts()[2]
            .iter()
            .filter_map(|m| m.tool_call_id.clone())
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.iter().all(|id| id.starts_with("call_")));
    }

    struct Sleepy;

    #[async_trait]
    impl Tool for Sleepy {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new("sleepy", "Never finishes in time", vec![])
        }

        async fn execute(&self, _call: &ToolCall) -> Result<ToolResult> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ToolResult::success("sleepy", "woke up"))
        }
    }

    /// Accepts the request and never answers
    struct Silent;

    #[async_trait]
    impl LlmProvider for Silent {
        fn name(&self) -> &str {
            "silent"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[ToolDescriptor],
            _options: &GenerationOptions,
        ) -> Result<Completion> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_slow_tool_times_out_without_ending_turn() {
        let provider = ScriptedProvider::new(vec![
            Completion::tool_calls(vec![call("s", "sleepy", "{}"), call("e", "echo", r#"{"text":"fast"}"#)], "m"),
            Completion::text("That one took too long.", "m"),
        ]);
        let agent = AgentBuilder::new()
            .provider(provider.clone())
            .tool(Sleepy)
            .unwrap()
            .tool(Echo)
            .unwrap()
            .tool_timeout(Duration::from_millis(10))
            .build()
            .unwrap();

        let answer = agent.chat("sys", vec![], "wait for it").await.unwrap();

        assert_eq!(answer, "That one took too long.");
        let transcript = &provider.transcripts()[1];
        assert_eq!(transcript[3].tool_call_id.as_deref(), Some("s"));
        assert!(transcript[3].content.contains("timed out"));
        assert_eq!(transcript[4].content, "fast");
    }

    #[tokio::test]
    async fn test_unresponsive_model_times_out() {
        let agent = AgentBuilder::new()
            .provider(Arc::new(Silent))
            .model_timeout(Duration::from_millis(20))
            .build()
            .unwrap();
        let mut conversation = Conversation::with_system_prompt("sys");
        conversation.push(Message::user("anyone there?"));

        let err = agent.run(&mut conversation).await.unwrap_err();

        assert!(matches!(err, AgentError::Timeout(_)));
        assert_eq!(conversation.len(), 2);
    }
}
