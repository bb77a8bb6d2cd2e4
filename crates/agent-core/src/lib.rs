//! # agent-core
//!
//! Tool-augmented conversation loop with a provider-agnostic LLM seam and an
//! explicit tool registry.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Agent                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  Reasoning  │  │    Tool     │  │   LlmProvider       │  │
//! │  │    Loop     │──│   Registry  │──│   (completion API)  │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tools registered in the [`ToolRegistry`] may run in-process or forward to a
//! remote tool provider; the loop does not distinguish the two.

pub mod error;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod tool;

pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role, ToolCallRequest};
pub use provider::{Completion, FinishReason, GenerationOptions, LlmProvider};
pub use reasoning::{Agent, AgentBuilder, AgentConfig};
pub use tool::{ParameterSchema, Tool, ToolCall, ToolDescriptor, ToolRegistry, ToolResult};
