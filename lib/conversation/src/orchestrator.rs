//! The conversation loop for one session.
//!
//! Each operator message starts a turn: the transcript and tool catalog go to
//! the completion provider, requested tools are dispatched in order, their
//! results are appended, and the cycle repeats until the provider replies
//! with text or the round-trip limit is reached.

use crate::booking::{Booking, BookingSnapshot};
use crate::catalog::booking_tools;
use crate::config::OrchestratorConfig;
use crate::error::ConversationError;
use crate::prompt::system_prompt;
use crate::tool::{EffectContext, ToolCatalog, ToolResult};
use care_coordinator_ai::{
    Completion, CompletionProvider, CompletionRequest, Message, ToolCall,
};
use care_coordinator_core::{Clock, Patient, SystemClock};
use care_coordinator_lookup::LookupService;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Reply when a turn uses up its round-trips.
pub const ROUND_TRIP_LIMIT_NOTICE: &str = "unable to complete; please rephrase or restart";

/// Reply when the completion provider fails.
pub const PROVIDER_UNAVAILABLE_NOTICE: &str =
    "The assistant is temporarily unavailable; please try again.";

/// Where the orchestrator is within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    /// No turn in progress.
    Idle,
    /// Waiting for the completion provider.
    AwaitingCompletion,
    /// Running requested tools.
    DispatchingTools,
}

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The assistant replied.
    Replied,
    /// The round-trip limit was reached.
    RoundTripLimit,
    /// The completion provider failed.
    ProviderUnavailable,
}

/// Result of one operator message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReply {
    /// Text shown to the operator.
    pub reply: String,
    pub outcome: TurnOutcome,
    /// Completion requests made during the turn.
    pub round_trips: usize,
}

/// One dispatched tool call, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool: String,
    pub arguments: JsonValue,
    /// Round-trip within its turn, starting at 1.
    pub round_trip: usize,
    /// `ok` or the error kind.
    pub outcome: String,
    pub at: DateTime<Utc>,
}

/// Shared services every orchestrator uses.
#[derive(Clone)]
pub struct Collaborators {
    pub provider: Arc<dyn CompletionProvider>,
    pub lookup: Arc<dyn LookupService>,
    pub catalog: Arc<ToolCatalog>,
    pub clock: Arc<dyn Clock>,
    pub config: OrchestratorConfig,
}

impl Collaborators {
    /// Uses the booking tools, the system clock and default limits.
    #[must_use]
    pub fn new(provider: Arc<dyn CompletionProvider>, lookup: Arc<dyn LookupService>) -> Self {
        Self {
            provider,
            lookup,
            catalog: Arc::new(booking_tools()),
            clock: Arc::new(SystemClock),
            config: OrchestratorConfig::default(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: ToolCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("model", &self.provider.model())
            .field("tools", &self.catalog.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Drives the conversation for one session.
pub struct Orchestrator {
    deps: Collaborators,
    patient: Patient,
    booking: Booking,
    transcript: Vec<Message>,
    state: TurnState,
    tool_log: VecDeque<ToolCallRecord>,
}

impl Orchestrator {
    /// Starts with an empty transcript and booking for `patient`.
    #[must_use]
    pub fn new(patient: Patient, deps: Collaborators) -> Self {
        let booking = Booking::new(&patient);
        Self {
            deps,
            patient,
            booking,
            transcript: Vec::new(),
            state: TurnState::Idle,
            tool_log: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> TurnState {
        self.state
    }

    #[must_use]
    pub fn patient(&self) -> &Patient {
        &self.patient
    }

    #[must_use]
    pub fn booking(&self) -> &Booking {
        &self.booking
    }

    #[must_use]
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    /// Read-only view of the booking.
    #[must_use]
    pub fn booking_status(&self) -> BookingSnapshot {
        self.booking.snapshot()
    }

    /// Most recent tool calls, oldest first.
    #[must_use]
    pub fn recent_tool_calls(&self) -> Vec<ToolCallRecord> {
        self.tool_log.iter().cloned().collect()
    }

    /// Clears the transcript, booking and tool log. The patient snapshot is kept.
    pub fn reset(&mut self) {
        self.transcript.clear();
        self.booking = Booking::new(&self.patient);
        self.tool_log.clear();
        self.state = TurnState::Idle;
        info!(patient_id = %self.patient.id, "conversation reset");
    }

    /// Processes one operator message and returns the reply.
    ///
    /// Reaching the round-trip limit or a provider failure ends the turn with
    /// a notice; the session stays usable either way.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMessage` if `text` is blank.
    #[instrument(skip(self, text), fields(patient_id = %self.patient.id))]
    pub async fn handle_message(&mut self, text: &str) -> Result<TurnReply, ConversationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ConversationError::InvalidMessage {
                reason: "message is empty".to_string(),
            });
        }
        self.transcript.push(Message::operator(text));

        let tools = self.deps.catalog.specs();
        let max_round_trips = self.deps.config.max_round_trips;
        let warning_at = self
            .deps
            .config
            .warning_threshold
            .filter(|&n| n > 0 && n < max_round_trips);
        let mut round_trips = 0;

        let reply = loop {
            if round_trips >= max_round_trips {
                warn!(round_trips, "round-trip limit reached");
                break self.notice(ROUND_TRIP_LIMIT_NOTICE, TurnOutcome::RoundTripLimit, round_trips);
            }
            if warning_at == Some(round_trips + 1) {
                let upcoming = round_trips + 1;
                debug!(round_trip = upcoming, "round-trip warning");
                self.transcript.push(Message::system(format!(
                    "This is tool round-trip {upcoming} of {max_round_trips} for this request. \
                     Present what you have to the nurse or ask for clarification rather than \
                     calling more tools."
                )));
            }
            round_trips += 1;

            self.state = TurnState::AwaitingCompletion;
            let request = CompletionRequest::new(
                system_prompt(&self.patient, self.deps.clock.today()),
                self.transcript.clone(),
            )
            .with_tools(tools.clone())
            .with_temperature(self.deps.config.temperature)
            .with_max_tokens(self.deps.config.max_tokens);
            debug!(round_trip = round_trips, "requesting completion");

            match self.deps.provider.complete(&request).await {
                Err(err) => {
                    warn!(error = %err, round_trip = round_trips, "completion provider failed");
                    break self.notice(
                        PROVIDER_UNAVAILABLE_NOTICE,
                        TurnOutcome::ProviderUnavailable,
                        round_trips,
                    );
                }
                Ok(Completion::TextReply(reply)) => {
                    self.transcript.push(Message::assistant(reply.clone()));
                    break TurnReply {
                        reply,
                        outcome: TurnOutcome::Replied,
                        round_trips,
                    };
                }
                Ok(Completion::ToolCallBatch(calls)) => {
                    self.state = TurnState::DispatchingTools;
                    debug!(round_trip = round_trips, calls = calls.len(), "dispatching tools");
                    self.transcript.push(Message::tool_calls(calls.clone()));
                    for call in &calls {
                        let result = self.dispatch(call, round_trips).await;
                        self.transcript.push(Message::tool(call.id.clone(), result.to_json()));
                    }
                }
            }
        };

        self.state = TurnState::Idle;
        Ok(reply)
    }

    async fn dispatch(&mut self, call: &ToolCall, round_trip: usize) -> ToolResult {
        let mut ctx = EffectContext {
            lookup: self.deps.lookup.as_ref(),
            clock: self.deps.clock.as_ref(),
            patient: &mut self.patient,
            booking: &mut self.booking,
        };
        let result = self.deps.catalog.dispatch(call, &mut ctx).await;

        let capacity = self.deps.config.recent_tool_calls;
        if capacity > 0 {
            while self.tool_log.len() >= capacity {
                self.tool_log.pop_front();
            }
            self.tool_log.push_back(ToolCallRecord {
                tool: call.name.clone(),
                arguments: call.arguments.clone(),
                round_trip,
                outcome: result.outcome().to_string(),
                at: Utc::now(),
            });
        }
        result
    }

    fn notice(&mut self, text: &str, outcome: TurnOutcome, round_trips: usize) -> TurnReply {
        self.transcript.push(Message::system(text));
        TurnReply {
            reply: text.to_string(),
            outcome,
            round_trips,
        }
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("patient_id", &self.patient.id)
            .field("state", &self.state)
            .field("transcript_len", &self.transcript.len())
            .field("committed", &self.booking.is_committed())
            .finish_non_exhaustive()
    }
}
