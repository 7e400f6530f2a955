//! Error types for the conversation crate.
//!
//! - `BookingError`: illegal changes to the in-progress booking
//! - `SessionError`: session registry faults, reported to the transport
//! - `ConversationError`: faults that end a turn before it starts

use care_coordinator_core::{DepartmentId, PatientId, ProviderId};
use care_coordinator_rules::ValidationError;
use std::fmt;

/// Errors from booking state operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// The booking is committed and the change would alter it.
    ImmutableAfterCommit { field: &'static str },
    /// A field was set before the field it depends on.
    MissingPrerequisite {
        field: &'static str,
        requires: &'static str,
    },
    /// The provider does not practice at the department.
    ProviderNotAtDepartment {
        provider: ProviderId,
        department: DepartmentId,
    },
    /// Commit was attempted while prerequisites are missing.
    NotReady { missing: Vec<&'static str> },
    /// A rule rejected the value.
    Validation(ValidationError),
}

impl fmt::Display for BookingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImmutableAfterCommit { field } => {
                write!(f, "booking is already committed; cannot change {field}")
            }
            Self::MissingPrerequisite { field, requires } => {
                write!(f, "cannot set {field} before {requires}")
            }
            Self::ProviderNotAtDepartment {
                provider,
                department,
            } => write!(
                f,
                "provider {provider} does not practice at department {department}"
            ),
            Self::NotReady { missing } => {
                write!(f, "booking is not ready; missing {}", missing.join(", "))
            }
            Self::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for BookingError {}

impl From<ValidationError> for BookingError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

/// Errors from session registry operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No session exists for the operator.
    NotFound { operator_id: String },
    /// The patient chart could not be loaded.
    PatientUnavailable { patient_id: PatientId, reason: String },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { operator_id } => {
                write!(f, "no session for operator {operator_id}")
            }
            Self::PatientUnavailable { patient_id, reason } => {
                write!(f, "could not load patient {patient_id}: {reason}")
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Errors that reject a turn outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    /// The operator message is unusable.
    InvalidMessage { reason: String },
}

impl fmt::Display for ConversationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMessage { reason } => write!(f, "invalid message: {reason}"),
        }
    }
}

impl std::error::Error for ConversationError {}
