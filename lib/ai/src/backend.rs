//! Completion provider abstraction.
//!
//! A provider receives the system prompt, the transcript and the tool catalog
//! and answers with either a text reply or a batch of tool calls. Nothing in
//! the answer is trusted: tool arguments are validated by the caller before
//! anything runs.

use crate::error::CompletionError;
use crate::message::{Message, ToolCall};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A tool as advertised to the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name.
    pub name: String,
    /// What the tool does, for the provider.
    pub description: String,
    /// JSON schema of the arguments.
    pub parameters: JsonValue,
}

/// A request to a completion provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// System prompt.
    pub system: String,
    /// Transcript so far, oldest first.
    pub transcript: Vec<Message>,
    /// Tools the provider may call.
    pub tools: Vec<ToolSpec>,
    /// Temperature for sampling (0.0 - 1.0).
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Creates a request with a system prompt and transcript.
    #[must_use]
    pub fn new(system: impl Into<String>, transcript: Vec<Message>) -> Self {
        Self {
            system: system.into(),
            transcript,
            tools: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Adds the tool catalog.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the max tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// What the provider answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Completion {
    /// A reply for the operator.
    TextReply(String),
    /// One or more tool invocations, in the order returned.
    ToolCallBatch(Vec<ToolCall>),
}

/// Trait for completion providers.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Produces the next step of the conversation.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout, transport failure, or an answer that is
    /// neither text nor tool calls.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CompletionError>;

    /// Returns the model name.
    fn model(&self) -> &str;
}
