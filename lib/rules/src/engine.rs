//! Appointment rules: classification, timing and self-pay.
//!
//! All functions are pure. Inputs outside the documented domain fail with a
//! [`ValidationError`] instead of falling back to a default.

use crate::error::ValidationError;
use crate::hours::OfficeHours;
use care_coordinator_core::{
    AppointmentRecord, AppointmentStatus, Classification, Insurance, ProviderId, SelfPayRate,
    Specialty,
};
use chrono::{Months, NaiveDate, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Look-back window for an ESTABLISHED classification.
pub const ESTABLISHED_LOOKBACK_MONTHS: u32 = 60;

/// Classifies a visit from the date of the patient's most recent completed
/// visit with the same provider.
///
/// A visit exactly five years before `today` still counts as ESTABLISHED.
///
/// # Errors
///
/// Returns `VisitInFuture` if the visit is dated after `today`.
pub fn classify(
    last_visit: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<Classification, ValidationError> {
    let Some(visit) = last_visit else {
        return Ok(Classification::New);
    };
    if visit > today {
        return Err(ValidationError::VisitInFuture { visit, today });
    }
    let cutoff = today
        .checked_sub_months(Months::new(ESTABLISHED_LOOKBACK_MONTHS))
        .ok_or(ValidationError::DateOutOfRange { date: today })?;

    if visit >= cutoff {
        Ok(Classification::Established)
    } else {
        Ok(Classification::New)
    }
}

/// Length of the visit in minutes.
#[must_use]
pub const fn duration_minutes(classification: Classification) -> i64 {
    match classification {
        Classification::New => 30,
        Classification::Established => 15,
    }
}

/// Minutes before the start time the patient should arrive.
#[must_use]
pub const fn arrival_offset_minutes(classification: Classification) -> i64 {
    match classification {
        Classification::New => 30,
        Classification::Established => 10,
    }
}

/// Computes the arrival time for an appointment starting at `start`.
///
/// # Errors
///
/// Returns `ArrivalBeforeMidnight` if arriving would fall on the previous day.
pub fn arrival_time(
    start: NaiveTime,
    classification: Classification,
) -> Result<NaiveTime, ValidationError> {
    let offset_minutes = arrival_offset_minutes(classification);
    let (arrival, wrapped) = start.overflowing_sub_signed(TimeDelta::minutes(offset_minutes));
    if wrapped != 0 {
        return Err(ValidationError::ArrivalBeforeMidnight {
            start,
            offset_minutes,
        });
    }
    Ok(arrival)
}

/// Checks that `[start, start + duration)` fits inside the department's
/// window for the weekday of `date`.
///
/// A department closed on that weekday never fits.
///
/// # Errors
///
/// Returns `NonPositiveDuration` if `duration_minutes <= 0`.
pub fn within_office_hours(
    hours: &OfficeHours,
    date: NaiveDate,
    start: NaiveTime,
    duration_minutes: i64,
) -> Result<bool, ValidationError> {
    if duration_minutes <= 0 {
        return Err(ValidationError::NonPositiveDuration {
            minutes: duration_minutes,
        });
    }
    let Some(window) = hours.window_on(date) else {
        return Ok(false);
    };
    let (end, wrapped) = start.overflowing_add_signed(TimeDelta::minutes(duration_minutes));
    if wrapped != 0 {
        return Ok(false);
    }
    Ok(start >= window.open && end <= window.close)
}

/// Whether insurance covers the visit or a flat rate applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "disposition", rename_all = "snake_case")]
pub enum InsuranceDisposition {
    /// The patient's insurance is accepted.
    Accepted,
    /// The patient pays the specialty's flat rate.
    SelfPay { rate: SelfPayRate },
}

impl fmt::Display for InsuranceDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => write!(f, "insurance accepted"),
            Self::SelfPay { rate } => write!(f, "self-pay {rate}"),
        }
    }
}

/// Decides the payment disposition for a visit in `specialty`.
#[must_use]
pub fn self_pay_disposition(
    insurance: Option<&Insurance>,
    specialty: &Specialty,
) -> InsuranceDisposition {
    match insurance {
        Some(insurance) if insurance.accepted => InsuranceDisposition::Accepted,
        _ => InsuranceDisposition::SelfPay {
            rate: specialty.self_pay_rate,
        },
    }
}

/// Date of the most recent completed visit with `provider` in `history`.
#[must_use]
pub fn last_completed_visit(
    history: &[AppointmentRecord],
    provider: ProviderId,
) -> Option<NaiveDate> {
    history
        .iter()
        .filter(|a| a.provider_id == provider && a.status == AppointmentStatus::Completed)
        .map(|a| a.date)
        .max()
}
