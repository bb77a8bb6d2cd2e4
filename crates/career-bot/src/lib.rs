//! # career-bot
//!
//! Everything specific to speaking for one person on their website:
//!
//! - [`Persona`]: biography text, GitHub summary and the system prompt built from them
//! - lead-capture tools ([`tools::RecordUserDetailsTool`], [`tools::RecordUnknownQuestionTool`])
//! - [`Notifier`] sinks that tell the site owner about new leads
//!
//! ```rust,ignore
//! let notifier = career_bot::notify::from_env();
//! let tools = career_bot::career_tools(notifier)?;
//! let persona = Persona::load(&ProfileConfig::from_env()?, &GithubClient::new()?).await?;
//! let reply = agent.chat(&persona.system_prompt(), history, "How can I reach you?").await?;
//! ```

pub mod error;
pub mod github;
pub mod notify;
pub mod persona;
pub mod svckit;

use std::sync::Arc;

use agent_core::ToolRegistry;

pub use error::{CareerError, Result};
pub use github::{GithubClient, format_github_info};
pub use notify::{LogNotifier, MemoryNotifier, Notifier, PushoverNotifier};
pub use persona::{Persona, ProfileConfig};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{RecordUnknownQuestionTool, RecordUserDetailsTool};
}

/// Registry with both lead-capture tools sharing one notifier
pub fn career_tools(notifier: Arc<dyn Notifier>) -> agent_core::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(tools::RecordUserDetailsTool::new(notifier.clone()))?;
    registry.register(tools::RecordUnknownQuestionTool::new(notifier))?;
    Ok(registry)
}
