//! Record Unknown Question Tool

use async_trait::async_trait;
use std::sync::Arc;

use agent_core::{ParameterSchema, Result as CoreResult, Tool, ToolCall, ToolDescriptor, ToolResult};

use crate::notify::{Notifier, spawn_notify};

/// Logs a question the persona could not answer
pub struct RecordUnknownQuestionTool {
    notifier: Arc<dyn Notifier>,
}

impl RecordUnknownQuestionTool {
    pub const NAME: &'static str = "record_unknown_question";

    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl Tool for RecordUnknownQuestionTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            Self::NAME,
            "Always use this tool to record any question that couldn't be answered as you didn't know the answer",
            vec![ParameterSchema::required(
                "question",
                "string",
                "The question that couldn't be answered",
            )],
        )
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let question = call.str_arg("question").unwrap_or_default();
        spawn_notify(self.notifier.clone(), format!("Recording {question}"));
        Ok(ToolResult::success(Self::NAME, super::recorded()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MemoryNotifier;
    use serde_json::{Map, json};

    #[tokio::test]
    async fn test_records_question_verbatim() {
        let memory = Arc::new(MemoryNotifier::new());
        let tool = RecordUnknownQuestionTool::new(memory.clone());

        let mut args = Map::new();
        args.insert("question".into(), json!("What is your favourite pizza?"));
        let result = tool
            .execute(&ToolCall::new("c1", RecordUnknownQuestionTool::NAME, args))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, r#"{"recorded":"ok"}"#);

        let delivered = memory.wait_for(1, std::time::Duration::from_secs(5)).await.unwrap();
        assert_eq!(delivered, vec!["Recording What is your favourite pizza?"]);
    }
}
