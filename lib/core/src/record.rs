//! Domain records shared by every layer.
//!
//! These are read-only snapshots of what the records API knows. The
//! conversation layer never mutates them in place; changes are round-tripped
//! through the lookup service and the snapshot is fetched again.

use crate::id::{AppointmentId, DepartmentId, InsuranceId, PatientId, ProviderId, SpecialtyId};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// NEW or ESTABLISHED designation of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    /// No completed visit with the provider in the look-back window.
    New,
    /// A completed visit with the provider inside the look-back window.
    Established,
}

impl Classification {
    /// Returns the wire spelling (`NEW` / `ESTABLISHED`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Established => "ESTABLISHED",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an enumerated record field has an unknown spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    /// The field being parsed.
    pub field: &'static str,
    /// The offending input.
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.field, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

impl FromStr for Classification {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NEW" => Ok(Self::New),
            "ESTABLISHED" => Ok(Self::Established),
            _ => Err(UnknownVariant {
                field: "classification",
                value: s.to_string(),
            }),
        }
    }
}

/// Lifecycle status of an appointment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    /// Booked and upcoming.
    Scheduled,
    /// The visit took place.
    Completed,
    /// Cancelled before the visit.
    Cancelled,
    /// The patient did not show up.
    #[serde(alias = "no-show", alias = "no_show")]
    Noshow,
}

impl AppointmentStatus {
    /// Returns the wire spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Noshow => "noshow",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Ok(Self::Scheduled),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            "noshow" | "no-show" | "no_show" => Ok(Self::Noshow),
            _ => Err(UnknownVariant {
                field: "appointment status",
                value: s.to_string(),
            }),
        }
    }
}

/// Flat self-pay price of a specialty visit, in whole US dollars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelfPayRate(u32);

impl SelfPayRate {
    /// Creates a rate from whole dollars.
    #[must_use]
    pub const fn dollars(amount: u32) -> Self {
        Self(amount)
    }

    /// Returns the amount in whole dollars.
    #[must_use]
    pub const fn as_dollars(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SelfPayRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// A medical specialty and its self-pay rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specialty {
    /// Record identifier.
    pub id: SpecialtyId,
    /// Display name, e.g. "Orthopedics".
    pub name: String,
    /// Flat rate charged when insurance does not cover the visit.
    pub self_pay_rate: SelfPayRate,
}

/// An insurance plan as known to the records API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insurance {
    /// Record identifier.
    pub id: InsuranceId,
    /// Plan name.
    pub name: String,
    /// Whether the practice currently accepts this plan.
    pub accepted: bool,
}

/// A pending specialty referral on a patient's chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referral {
    /// Specialty the patient was referred to.
    pub specialty: String,
    /// Named provider, when the referral names one.
    #[serde(default)]
    pub provider: Option<String>,
}

/// One line of a patient's visit history as shown on the chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitSummary {
    /// Visit date.
    pub date: NaiveDate,
    /// Visit start time, when recorded.
    #[serde(default)]
    pub time: Option<NaiveTime>,
    /// Provider display name.
    pub provider: String,
    /// Outcome of the visit.
    pub status: AppointmentStatus,
    /// Free-text notes.
    #[serde(default)]
    pub notes: String,
}

/// Immutable snapshot of a patient chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    /// Record identifier.
    pub id: PatientId,
    /// Full name.
    pub name: String,
    /// Date of birth as recorded on the chart.
    pub dob: String,
    /// Primary care provider name.
    #[serde(default)]
    pub pcp: String,
    /// External health-record identifier.
    #[serde(default)]
    pub ehr_id: String,
    /// Free-text notes (preferences, history of no-shows, ...).
    #[serde(default)]
    pub notes: String,
    /// Insurance on file, if any.
    #[serde(default)]
    pub insurance: Option<Insurance>,
    /// Pending referrals, in chart order.
    #[serde(default)]
    pub referrals: Vec<Referral>,
    /// Visit history, most recent first.
    #[serde(default)]
    pub appointments: Vec<VisitSummary>,
}

/// A clinician who can be booked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    /// Record identifier.
    pub id: ProviderId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Certification or role, e.g. "MD".
    #[serde(default)]
    pub certification: String,
    /// Specialty name.
    pub specialty: String,
    /// Departments where the provider practices.
    #[serde(default)]
    pub department_ids: Vec<DepartmentId>,
}

impl Provider {
    /// Returns the name as presented to operators ("Dr. First Last").
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("Dr. {} {}", self.first_name, self.last_name)
    }
}

/// A clinic location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    /// Record identifier.
    pub id: DepartmentId,
    /// Location name.
    pub name: String,
    /// Contact phone number.
    #[serde(default)]
    pub phone: String,
    /// Street address.
    #[serde(default)]
    pub address: String,
    /// Office-hours specification, e.g. "M-F 9am-5pm".
    pub hours: String,
}

/// A stored appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentRecord {
    /// Record identifier.
    pub id: AppointmentId,
    /// The patient seen.
    pub patient_id: PatientId,
    /// The provider seen.
    pub provider_id: ProviderId,
    /// Where the visit happens.
    pub department_id: DepartmentId,
    /// NEW or ESTABLISHED.
    pub classification: Classification,
    /// Visit date.
    pub date: NaiveDate,
    /// Visit start time.
    pub start_time: NaiveTime,
    /// Time the patient was asked to arrive.
    #[serde(default)]
    pub arrival_time: Option<NaiveTime>,
    /// Lifecycle status.
    pub status: AppointmentStatus,
    /// Free-text notes.
    #[serde(default)]
    pub notes: String,
}
