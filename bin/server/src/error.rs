//! API error type and its HTTP mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use care_coordinator_conversation::{ConversationError, SessionError};
use care_coordinator_core::PatientId;
use rootcause::prelude::Report;
use serde_json::json;
use std::fmt;

/// Errors returned to API clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The operator has no session.
    SessionNotFound { operator_id: String },
    /// The patient chart could not be loaded.
    PatientUnavailable { patient_id: PatientId, reason: String },
    /// The request body is unusable.
    InvalidRequest { reason: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionNotFound { operator_id } => {
                write!(f, "no session for operator '{operator_id}'")
            }
            Self::PatientUnavailable { patient_id, reason } => {
                write!(f, "could not load patient {patient_id}: {reason}")
            }
            Self::InvalidRequest { reason } => write!(f, "invalid request: {reason}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::SessionNotFound { .. } => StatusCode::NOT_FOUND,
            Self::PatientUnavailable { .. } => StatusCode::BAD_GATEWAY,
            Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<Report<SessionError>> for ApiError {
    fn from(report: Report<SessionError>) -> Self {
        match report.current_context() {
            SessionError::NotFound { operator_id } => Self::SessionNotFound {
                operator_id: operator_id.clone(),
            },
            SessionError::PatientUnavailable { patient_id, reason } => Self::PatientUnavailable {
                patient_id: *patient_id,
                reason: reason.clone(),
            },
        }
    }
}

impl From<ConversationError> for ApiError {
    fn from(err: ConversationError) -> Self {
        match err {
            ConversationError::InvalidMessage { reason } => Self::InvalidRequest { reason },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
