//! Completion provider configuration.

use crate::error::CompletionError;
use crate::openai::OpenAiCompatibleProvider;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the OpenAI-compatible completion provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// API root, e.g. `https://api.openai.com/v1`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key, if the endpoint requires one.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-request timeout.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl CompletionConfig {
    /// Builds the configured provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn build(&self) -> Result<OpenAiCompatibleProvider, CompletionError> {
        OpenAiCompatibleProvider::new(
            self.base_url.clone(),
            self.model.clone(),
            self.api_key.clone(),
            Duration::from_secs(self.timeout_seconds),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CompletionProvider;

    #[test]
    fn defaults() {
        let config: CompletionConfig = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(config, CompletionConfig::default());
        assert_eq!(config.model, "gpt-4");
        assert_eq!(config.timeout_seconds, 60);
    }

    #[test]
    fn builds_provider() {
        let provider = CompletionConfig::default().build().expect("provider");
        assert_eq!(provider.model(), "gpt-4");
    }
}
