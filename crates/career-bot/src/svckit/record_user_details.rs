//! Record User Details Tool
//!
//! Captures a visitor's contact details so the site owner can follow up.

use async_trait::async_trait;
use std::sync::Arc;

use agent_core::{ParameterSchema, Result as CoreResult, Tool, ToolCall, ToolDescriptor, ToolResult};

use crate::notify::{Notifier, spawn_notify};

pub struct RecordUserDetailsTool {
    notifier: Arc<dyn Notifier>,
}

impl RecordUserDetailsTool {
    pub const NAME: &'static str = "record_user_details";

    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl Tool for RecordUserDetailsTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            Self::NAME,
            "Use this tool to record that a user is interested in being in touch and provided an email address",
            vec![
                ParameterSchema::required("email", "string", "The email address of this user"),
                ParameterSchema::optional("name", "string", "The user's name, if they provided it"),
                ParameterSchema::optional(
                    "notes",
                    "string",
                    "Any additional information about the conversation that's worth recording to give context",
                ),
            ],
        )
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let email = call.str_arg("email").unwrap_or_default();
        let name = call.str_arg("name").unwrap_or("Name not provided");
        let notes = call.str_arg("notes").unwrap_or("not provided");

        spawn_notify(
            self.notifier.clone(),
            format!("Recording {name} with email {email} and notes {notes}"),
        );

        Ok(ToolResult::success(Self::NAME, super::recorded()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MemoryNotifier;
    use serde_json::{Map, json};

    #[tokio::test]
    async fn test_defaults_for_missing_fields() {
        let memory = Arc::new(MemoryNotifier::new());
        let tool = RecordUserDetailsTool::new(memory.clone());

        let mut args = Map::new();
        args.insert("email".into(), json!("ada@example.com"));
        let result = tool.execute(&ToolCall::new("c1", RecordUserDetailsTool::NAME, args)).await.unwrap();
        assert_eq!(result.output, r#"{"recorded":"ok"}"#);

        let delivered = memory.wait_for(1, std::time::Duration::from_secs(5)).await.unwrap();
        assert_eq!(
            delivered,
            vec!["Recording Name not provided with email ada@example.com and notes not provided"]
        );
    }

    #[test]
    fn test_schema_is_closed_and_requires_email() {
        let tool = RecordUserDetailsTool::new(Arc::new(MemoryNotifier::new()));
        let descriptor = tool.descriptor();
        assert_eq!(descriptor.required_parameters(), vec!["email"]);
        assert_eq!(descriptor.parameters["additionalProperties"], json!(false));

        let mut args = Map::new();
        args.insert("email".into(), json!("a@b.c"));
        args.insert("phone".into(), json!("555"));
        assert!(tool.validate(&ToolCall::new("c2", RecordUserDetailsTool::NAME, args)).is_err());
    }
}
