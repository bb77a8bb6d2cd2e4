//! Service Kit - Agent Tools
//!
//! Lead-capture tools that implement `agent_core::Tool` for the career bot.

mod record_unknown_question;
mod record_user_details;

pub use record_unknown_question::RecordUnknownQuestionTool;
pub use record_user_details::RecordUserDetailsTool;

/// Payload both tools hand back to the model
pub(crate) fn recorded() -> String {
    serde_json::json!({ "recorded": "ok" }).to_string()
}
