//! Error types for the rules crate.

use chrono::{NaiveDate, NaiveTime};
use std::fmt;

/// Malformed input to a business rule.
///
/// These indicate a programming or data error and are never defaulted away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The arrival time would fall on the previous calendar day.
    ArrivalBeforeMidnight {
        start: NaiveTime,
        offset_minutes: i64,
    },
    /// A duration of zero or fewer minutes was supplied.
    NonPositiveDuration { minutes: i64 },
    /// A weekday token could not be recognised.
    UnknownWeekday { token: String },
    /// A clock time could not be parsed.
    MalformedTime { input: String },
    /// An office-hours specification could not be parsed.
    MalformedOfficeHours { spec: String, reason: String },
    /// A completed visit is dated after today.
    VisitInFuture { visit: NaiveDate, today: NaiveDate },
    /// A date range is empty, reversed or too long.
    InvalidDateRange {
        start: NaiveDate,
        end: NaiveDate,
        reason: String,
    },
    /// Date arithmetic left the representable calendar.
    DateOutOfRange { date: NaiveDate },
}

impl ValidationError {
    /// Returns a stable machine-readable reason code.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::ArrivalBeforeMidnight { .. } => "arrival_before_midnight",
            Self::NonPositiveDuration { .. } => "non_positive_duration",
            Self::UnknownWeekday { .. } => "unknown_weekday",
            Self::MalformedTime { .. } => "malformed_time",
            Self::MalformedOfficeHours { .. } => "malformed_office_hours",
            Self::VisitInFuture { .. } => "visit_in_future",
            Self::InvalidDateRange { .. } => "invalid_date_range",
            Self::DateOutOfRange { .. } => "date_out_of_range",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArrivalBeforeMidnight {
                start,
                offset_minutes,
            } => write!(
                f,
                "arrival {offset_minutes} minutes before {} falls on the previous day",
                start.format("%H:%M")
            ),
            Self::NonPositiveDuration { minutes } => {
                write!(f, "duration must be positive, got {minutes} minutes")
            }
            Self::UnknownWeekday { token } => write!(f, "unknown weekday '{token}'"),
            Self::MalformedTime { input } => write!(f, "malformed time '{input}'"),
            Self::MalformedOfficeHours { spec, reason } => {
                write!(f, "malformed office hours '{spec}': {reason}")
            }
            Self::VisitInFuture { visit, today } => {
                write!(f, "completed visit on {visit} is after today ({today})")
            }
            Self::InvalidDateRange { start, end, reason } => {
                write!(f, "invalid date range {start}..{end}: {reason}")
            }
            Self::DateOutOfRange { date } => write!(f, "date arithmetic overflowed at {date}"),
        }
    }
}

impl std::error::Error for ValidationError {}
