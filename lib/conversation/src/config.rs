//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

/// Limits and sampling settings for one conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Completion round-trips allowed per operator message.
    #[serde(default = "default_max_round_trips")]
    pub max_round_trips: usize,
    /// The assistant is reminded of the budget just before this round-trip
    /// is requested.
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: Option<usize>,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum tokens per completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Tool calls kept for diagnostics.
    #[serde(default = "default_recent_tool_calls")]
    pub recent_tool_calls: usize,
}

fn default_max_round_trips() -> usize {
    10
}

fn default_warning_threshold() -> Option<usize> {
    Some(6)
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_recent_tool_calls() -> usize {
    10
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_round_trips: default_max_round_trips(),
            warning_threshold: default_warning_threshold(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            recent_tool_calls: default_recent_tool_calls(),
        }
    }
}
