//! Transcript message types.

use care_coordinator_core::MessageId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The nurse or other operator driving the booking.
    Operator,
    /// Assistant message.
    Assistant,
    /// Notice inserted by the orchestrator.
    System,
    /// Output of one tool invocation.
    Tool,
}

/// A transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// `msg_`-prefixed ULID.
    pub id: MessageId,
    pub role: MessageRole,
    /// Text; empty for tool-call batches and tool results.
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Tool calls requested by the assistant.
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    /// Tool output (for tool messages).
    #[serde(default)]
    pub tool_output: Option<ToolOutput>,
}

impl Message {
    /// A message with the given role and text.
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            tool_calls: Vec::new(),
            tool_output: None,
        }
    }

    /// Creates an operator message.
    #[must_use]
    pub fn operator(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Operator, content)
    }

    /// The assistant's reply text.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Creates a system notice.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Creates an assistant message carrying a batch of tool calls.
    #[must_use]
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        let mut msg = Self::new(MessageRole::Assistant, "");
        msg.tool_calls = calls;
        msg
    }

    /// Creates a tool result message tagged to its invocation.
    #[must_use]
    pub fn tool(tool_call_id: impl Into<String>, output: JsonValue) -> Self {
        let mut msg = Self::new(MessageRole::Tool, "");
        msg.tool_output = Some(ToolOutput {
            tool_call_id: tool_call_id.into(),
            output,
        });
        msg
    }

    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A tool call requested by the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier assigned by the provider.
    pub id: String,
    pub name: String,
    /// Arguments, unvalidated.
    pub arguments: JsonValue,
}

impl ToolCall {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: JsonValue) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// The output of one tool invocation, as fed back to the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// The tool call this output answers.
    pub tool_call_id: String,
    /// Structured result.
    pub output: JsonValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_message_has_no_calls() {
        let msg = Message::operator("Book John for ortho");
        assert_eq!(msg.role, MessageRole::Operator);
        assert_eq!(msg.content, "Book John for ortho");
        assert!(!msg.has_tool_calls());
    }

    #[test]
    fn tool_call_batch_message() {
        let msg = Message::tool_calls(vec![ToolCall::new(
            "call_1",
            "get_providers_by_specialty",
            serde_json::json!({"specialty": "Orthopedics"}),
        )]);
        assert_eq!(msg.role, MessageRole::Assistant);
        assert!(msg.has_tool_calls());
    }

    #[test]
    fn tool_message_is_tagged() {
        let msg = Message::tool("call_1", serde_json::json!({"status": "ok"}));
        assert_eq!(
            msg.tool_output.map(|o| o.tool_call_id),
            Some("call_1".to_string())
        );
    }

    #[test]
    fn system_notice_survives_serialization() {
        let msg = Message::system("unable to complete; please rephrase or restart");
        let json = serde_json::to_string(&msg).expect("serialize");
        let parsed: Message = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(msg.id, parsed.id);
        assert_eq!(parsed.role, MessageRole::System);
    }
}
