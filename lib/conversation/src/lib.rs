//! Booking conversations for the care coordinator.
//!
//! This crate provides:
//!
//! - **Booking**: the in-progress appointment and its readiness rules
//! - **Tool Catalog**: the typed tools the assistant may call
//! - **Orchestrator**: the bounded completion/tool loop for one session
//! - **Session Registry**: one live session per operator

pub mod booking;
pub mod catalog;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod prompt;
pub mod session;
pub mod tool;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use booking::{Booking, BookingSnapshot, CandidateTime, NamedRef, TimeCheck};
pub use catalog::booking_tools;
pub use config::OrchestratorConfig;
pub use error::{BookingError, ConversationError, SessionError};
pub use orchestrator::{
    Collaborators, Orchestrator, PROVIDER_UNAVAILABLE_NOTICE, ROUND_TRIP_LIMIT_NOTICE,
    ToolCallRecord, TurnOutcome, TurnReply, TurnState,
};
pub use prompt::system_prompt;
pub use session::{Session, SessionKey, SessionRegistry};
pub use tool::{
    ArgumentSchema, ArgumentType, EffectContext, LookupContext, Tool, ToolArguments, ToolCatalog,
    ToolErrorKind, ToolFailure, ToolHandler, ToolResult,
};
