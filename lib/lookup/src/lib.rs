//! Records lookup for the care coordinator.
//!
//! This crate provides:
//!
//! - **Service contract**: the read and commit operations the orchestrator
//!   needs from the records API ([`LookupService`])
//! - **Statement guard**: validation of ad hoc read-only SQL
//! - **HTTP client**: a [`LookupService`] backed by the records REST API
//! - **In-memory directory**: a seeded [`LookupService`] for tests and demos

pub mod config;
pub mod error;
pub mod http;
pub mod memory;
pub mod service;
pub mod statement;

pub use config::{LookupBackend, LookupConfig};
pub use error::{LookupError, StatementError};
pub use http::HttpLookupService;
pub use memory::InMemoryDirectory;
pub use service::{CommitReceipt, CommitRequest, InsuranceAssignment, LookupService, QueryRows};
pub use statement::ReadOnlyStatement;
