//! OpenAI-compatible chat-completions provider.

use crate::backend::{Completion, CompletionProvider, CompletionRequest};
use crate::error::CompletionError;
use crate::message::{Message, MessageRole, ToolCall};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// A provider speaking the `/chat/completions` protocol.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    /// Creates a provider for the API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompletionError::InvalidConfig {
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    /// Builds the JSON body for a request.
    #[must_use]
    pub fn request_body(&self, request: &CompletionRequest) -> JsonValue {
        let mut messages = vec![json!({ "role": "system", "content": request.system })];
        messages.extend(request.transcript.iter().map(wire_message));

        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });
        if !request.tools.is_empty() {
            body["tools"] = request
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        }
                    })
                })
                .collect();
        }
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }
}

fn wire_message(message: &Message) -> JsonValue {
    match message.role {
        MessageRole::Operator => json!({ "role": "user", "content": message.content }),
        MessageRole::System => json!({ "role": "system", "content": message.content }),
        MessageRole::Assistant if message.has_tool_calls() => {
            let calls: Vec<JsonValue> = message
                .tool_calls
                .iter()
                .map(|call| {
                    let arguments = match &call.arguments {
                        JsonValue::String(raw) => raw.clone(),
                        other => other.to_string(),
                    };
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": { "name": call.name, "arguments": arguments },
                    })
                })
                .collect();
            let content = if message.content.is_empty() {
                JsonValue::Null
            } else {
                JsonValue::String(message.content.clone())
            };
            json!({ "role": "assistant", "content": content, "tool_calls": calls })
        }
        MessageRole::Assistant => json!({ "role": "assistant", "content": message.content }),
        MessageRole::Tool => {
            let (id, output) = message
                .tool_output
                .as_ref()
                .map(|o| (o.tool_call_id.clone(), o.output.to_string()))
                .unwrap_or_default();
            json!({ "role": "tool", "tool_call_id": id, "content": output })
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ChatToolCall>,
}

#[derive(Debug, Deserialize)]
struct ChatToolCall {
    id: String,
    function: ChatFunction,
}

#[derive(Debug, Deserialize)]
struct ChatFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// Interprets a chat-completions response body.
///
/// Arguments that are not valid JSON are kept as a raw string so that schema
/// validation can reject them.
///
/// # Errors
///
/// Returns `ResponseParseFailed` if the body has no choice, or a choice with
/// neither text nor tool calls.
pub fn parse_response(body: JsonValue) -> Result<Completion, CompletionError> {
    let response: ChatResponse =
        serde_json::from_value(body).map_err(|e| CompletionError::ResponseParseFailed {
            reason: e.to_string(),
        })?;
    let message = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::ResponseParseFailed {
            reason: "response contained no choices".to_string(),
        })?
        .message;

    if !message.tool_calls.is_empty() {
        let calls = message
            .tool_calls
            .into_iter()
            .map(|call| {
                let arguments = if call.function.arguments.trim().is_empty() {
                    JsonValue::Object(Default::default())
                } else {
                    serde_json::from_str(&call.function.arguments)
                        .unwrap_or(JsonValue::String(call.function.arguments))
                };
                ToolCall::new(call.id, call.function.name, arguments)
            })
            .collect();
        return Ok(Completion::ToolCallBatch(calls));
    }

    match message.content {
        Some(text) if !text.trim().is_empty() => Ok(Completion::TextReply(text)),
        _ => Err(CompletionError::ResponseParseFailed {
            reason: "response had neither content nor tool calls".to_string(),
        }),
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleProvider {
    #[instrument(skip(self, request), fields(model = %self.model, transcript_len = request.transcript.len()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut http = self.client.post(&url).json(&self.request_body(request));
        if let Some(api_key) = &self.api_key {
            http = http.bearer_auth(api_key);
        }

        let response = http.send().await.map_err(|e| {
            warn!(error = %e, endpoint = %url, "completion request failed");
            if e.is_timeout() {
                CompletionError::Timeout
            } else if e.is_connect() {
                CompletionError::ProviderUnavailable {
                    provider: url.clone(),
                    reason: e.to_string(),
                }
            } else {
                CompletionError::RequestFailed {
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(CompletionError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "completion endpoint returned error");
            return Err(CompletionError::RequestFailed {
                reason: format!("HTTP {status}: {body}"),
            });
        }

        let body: JsonValue = response.json().await.map_err(|e| {
            if e.is_timeout() {
                CompletionError::Timeout
            } else {
                CompletionError::ResponseParseFailed {
                    reason: e.to_string(),
                }
            }
        })?;
        let completion = parse_response(body)?;
        debug!(
            tool_calls = matches!(&completion, Completion::ToolCallBatch(calls) if !calls.is_empty()),
            "completion received"
        );
        Ok(completion)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
