//! Conversation Messages
//!
//! Standard message format used across the agent system. The transcript order
//! is significant: it is replayed verbatim to the model on every invocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
    /// Tool result
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// A tool invocation requested by the model, exactly as emitted.
///
/// `arguments` is the raw JSON text; it is only parsed when the call is resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Call ID the matching tool result must reference
    pub id: String,

    /// Requested tool name
    pub name: String,

    /// JSON-encoded arguments
    pub arguments: String,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// A single message in a conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Text content (empty for an assistant turn that only requests tools)
    #[serde(default)]
    pub content: String,

    /// Call ID this tool message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Tool calls requested by an assistant turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call_id: None,
            tool_calls: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create an assistant turn that requests tool calls
    pub fn assistant_tool_calls(content: impl Into<String>, calls: Vec<ToolCallRequest>) -> Self {
        let mut msg = Self::new(Role::Assistant, content);
        msg.tool_calls = calls;
        msg
    }

    /// Create a tool result message
    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        let mut msg = Self::new(Role::Tool, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    /// Whether this is an assistant turn carrying tool calls
    pub fn has_tool_calls(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls.is_empty()
    }
}

/// Conversation transcript whose first message is always the system prompt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(prompt)],
        }
    }

    /// Build `[system] + history`. System messages inside `history` are dropped
    /// so the leading system prompt stays the only one.
    pub fn from_history(prompt: impl Into<String>, history: impl IntoIterator<Item = Message>) -> Self {
        let mut conv = Self::with_system_prompt(prompt);
        conv.messages
            .extend(history.into_iter().filter(|m| m.role != Role::System));
        conv
    }

    /// Add a message. System messages are ignored once the transcript exists.
    pub fn push(&mut self, message: Message) {
        if message.role == Role::System {
            tracing::warn!("Ignoring system message pushed mid-conversation");
            return;
        }
        self.messages.push(message);
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The system prompt
    pub fn system_prompt(&self) -> &str {
        &self.messages[0].content
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false: the system prompt is present from construction
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Call IDs requested by assistant turns that have no tool result yet
    pub fn unanswered_tool_calls(&self) -> Vec<&str> {
        let mut open: Vec<&str> = Vec::new();
        for message in &self.messages {
            match message.role {
                Role::Assistant => open.extend(message.tool_calls.iter().map(|c| c.id.as_str())),
                Role::Tool => {
                    if let Some(id) = message.tool_call_id.as_deref() {
                        open.retain(|open_id| *open_id != id);
                    }
                }
                _ => {}
            }
        }
        open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
        assert!(!msg.has_tool_calls());
    }

    #[test]
    fn test_system_prompt_stays_first() {
        let mut conv = Conversation::from_history(
            "You are Ada.",
            vec![Message::system("injected"), Message::user("Hi"), Message::assistant("Hello!")],
        );
        conv.push(Message::system("also injected"));

        assert_eq!(conv.len(), 3);
        assert_eq!(conv.system_prompt(), "You are Ada.");
        assert_eq!(conv.messages().iter().filter(|m| m.role == Role::System).count(), 1);
    }

    #[test]
    fn test_unanswered_tool_calls() {
        let mut conv = Conversation::with_system_prompt("sys");
        conv.push(Message::assistant_tool_calls(
            "",
            vec![
                ToolCallRequest::new("a", "x", "{}"),
                ToolCallRequest::new("b", "y", "{}"),
            ],
        ));
        conv.push(Message::tool("done", "a"));

        assert_eq!(conv.unanswered_tool_calls(), vec!["b"]);
        conv.push(Message::tool("done", "b"));
        assert!(conv.unanswered_tool_calls().is_empty());
    }

    #[test]
    fn test_history_roles_deserialize() {
        let msg: Message = serde_json::from_str(r#"{"role":"assistant","content":"hey"}"#).unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.tool_calls.is_empty());
    }
}
