//! Error types for the lookup crate.
//!
//! - `LookupError`: failures reported by a lookup service
//! - `StatementError`: ad hoc SQL rejected before it is sent anywhere

use std::fmt;

/// Errors from lookup service operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The service did not answer in time.
    Timeout { operation: &'static str },
    /// The requested record does not exist.
    NotFound { entity: &'static str, key: String },
    /// The service refused the request as invalid.
    Rejected {
        operation: &'static str,
        reason: String,
    },
    /// Transport failure or server-side error.
    RequestFailed {
        operation: &'static str,
        reason: String,
    },
    /// The service answered with something that could not be decoded.
    InvalidResponse {
        operation: &'static str,
        reason: String,
    },
    /// The backend does not implement this operation.
    Unsupported { operation: &'static str },
}

impl LookupError {
    /// Shorthand for a missing record.
    #[must_use]
    pub fn not_found(entity: &'static str, key: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { operation } => write!(f, "{operation} timed out"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::Rejected { operation, reason } => {
                write!(f, "{operation} rejected: {reason}")
            }
            Self::RequestFailed { operation, reason } => {
                write!(f, "{operation} failed: {reason}")
            }
            Self::InvalidResponse { operation, reason } => {
                write!(f, "invalid response to {operation}: {reason}")
            }
            Self::Unsupported { operation } => {
                write!(f, "{operation} is not supported by this backend")
            }
        }
    }
}

impl std::error::Error for LookupError {}

/// Reasons an ad hoc statement is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementError {
    /// Nothing but whitespace or comments.
    Empty,
    /// The statement does not begin with SELECT.
    NotARead { leading: String },
    /// More than one statement was supplied.
    MultipleStatements,
    /// A data-modifying or schema-modifying keyword appears.
    ForbiddenKeyword { keyword: String },
    /// A function with side effects is called.
    ForbiddenFunction { name: String },
    /// A quoted literal or comment is never closed.
    Unterminated,
}

impl fmt::Display for StatementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "statement is empty"),
            Self::NotARead { leading } => {
                write!(f, "only SELECT queries are allowed, got '{leading}'")
            }
            Self::MultipleStatements => write!(f, "only a single statement is allowed"),
            Self::ForbiddenKeyword { keyword } => {
                write!(f, "statement contains forbidden keyword {keyword}")
            }
            Self::ForbiddenFunction { name } => {
                write!(f, "statement calls forbidden function {name}")
            }
            Self::Unterminated => write!(f, "unterminated quoted literal or comment"),
        }
    }
}

impl std::error::Error for StatementError {}
