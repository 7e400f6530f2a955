//! Centralized server configuration.
//!
//! Loaded with the `config` crate from an optional TOML file, then from
//! environment variables such as `CARE_COORDINATOR__COMPLETION__API_KEY`.

use care_coordinator_ai::CompletionConfig;
use care_coordinator_conversation::OrchestratorConfig;
use care_coordinator_lookup::LookupConfig;
use serde::Deserialize;
use std::path::Path;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "CARE_COORDINATOR";

/// Server configuration composed from library configs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Records API access.
    #[serde(default)]
    pub lookup: LookupConfig,

    /// Completion provider access.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Per-turn limits.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

fn default_bind_address() -> String {
    "127.0.0.1:5001".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            lookup: LookupConfig::default(),
            completion: CompletionConfig::default(),
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from `file`, if given, and the environment.
    ///
    /// Environment variables override file values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value is invalid.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use care_coordinator_lookup::LookupBackend;
    use std::io::Write;

    #[test]
    fn defaults_without_sources() {
        let config = ServerConfig::load(None).expect("load");
        assert_eq!(config.bind_address, "127.0.0.1:5001");
        assert_eq!(config.lookup.backend, LookupBackend::Sample);
        assert_eq!(config.orchestrator.max_round_trips, 10);
    }

    #[test]
    fn file_values_are_read() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("tempfile");
        writeln!(
            file,
            r#"
bind_address = "0.0.0.0:8080"

[lookup]
backend = "http"
base_url = "http://records.internal:5000"

[completion]
model = "gpt-4o"

[orchestrator]
max_round_trips = 8
warning_threshold = 5
"#
        )
        .expect("write");

        let config = ServerConfig::load(Some(file.path())).expect("load");
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.lookup.backend, LookupBackend::Http);
        assert_eq!(config.lookup.base_url, "http://records.internal:5000");
        assert_eq!(config.lookup.timeout_seconds, 10);
        assert_eq!(config.completion.model, "gpt-4o");
        assert_eq!(config.completion.timeout_seconds, 60);
        assert_eq!(config.orchestrator.max_round_trips, 8);
        assert_eq!(config.orchestrator.warning_threshold, Some(5));
        assert_eq!(config.orchestrator.max_tokens, 1000);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.toml");
        assert!(ServerConfig::load(Some(&path)).is_err());
    }
}
