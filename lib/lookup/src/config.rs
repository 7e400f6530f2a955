//! Lookup backend configuration.

use crate::error::LookupError;
use crate::http::HttpLookupService;
use crate::memory::InMemoryDirectory;
use crate::service::LookupService;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Which lookup implementation to run against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupBackend {
    /// The records REST API at `base_url`.
    Http,
    /// The seeded in-memory directory.
    #[default]
    Sample,
}

/// Configuration for the lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: LookupBackend,
    /// Records API root, used by the HTTP backend.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout for the HTTP backend.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            backend: LookupBackend::default(),
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl LookupConfig {
    /// Builds the configured service.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn build(&self) -> Result<Arc<dyn LookupService>, LookupError> {
        match self.backend {
            LookupBackend::Http => Ok(Arc::new(HttpLookupService::new(
                self.base_url.clone(),
                Duration::from_secs(self.timeout_seconds),
            )?)),
            LookupBackend::Sample => Ok(Arc::new(InMemoryDirectory::sample())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config: LookupConfig =
            serde_json::from_str(r#"{"backend": "http"}"#).expect("deserialize");
        assert_eq!(config.backend, LookupBackend::Http);
        assert_eq!(config.base_url, "http://localhost:5000");
        assert_eq!(config.timeout_seconds, 10);
    }

    #[test]
    fn builds_both_backends() {
        assert!(LookupConfig::default().build().is_ok());
        let http = LookupConfig {
            backend: LookupBackend::Http,
            ..LookupConfig::default()
        };
        assert!(http.build().is_ok());
    }
}
