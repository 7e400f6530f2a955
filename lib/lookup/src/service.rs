//! The lookup service contract.

use crate::error::LookupError;
use crate::statement::ReadOnlyStatement;
use async_trait::async_trait;
use care_coordinator_core::{
    AppointmentId, AppointmentRecord, Classification, Department, DepartmentId, Insurance,
    InsuranceId, Patient, PatientId, Provider, ProviderId, Specialty,
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Everything needed to store a new appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRequest {
    /// The patient being booked.
    pub patient_id: PatientId,
    /// The provider seen.
    pub provider_id: ProviderId,
    /// Where the visit happens.
    pub department_id: DepartmentId,
    /// Visit date.
    pub date: NaiveDate,
    /// Visit start.
    pub time: NaiveTime,
    /// NEW or ESTABLISHED.
    pub classification: Classification,
    /// Visit length in minutes.
    pub duration_minutes: i64,
    /// Time the patient should arrive.
    pub arrival_time: NaiveTime,
    /// Free-text notes.
    #[serde(default)]
    pub notes: String,
}

/// Result of a successful commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReceipt {
    /// Identifier of the stored appointment.
    pub appointment_id: AppointmentId,
}

/// Result of assigning insurance to a patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceAssignment {
    /// The insurance record now on the patient's chart.
    pub insurance_id: InsuranceId,
    /// Canonical name of that record.
    pub name: String,
    /// Whether the practice accepts it.
    pub accepted: bool,
}

/// Rows returned by an ad hoc query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRows {
    /// One JSON object per row.
    pub rows: Vec<Map<String, JsonValue>>,
    /// Number of rows.
    pub row_count: usize,
}

/// Records API operations used while booking.
///
/// Implementations own their timeouts and report them as
/// [`LookupError::Timeout`].
#[async_trait]
pub trait LookupService: Send + Sync {
    /// Fetches a patient chart.
    async fn patient(&self, id: PatientId) -> Result<Patient, LookupError>;

    /// Lists providers whose specialty matches `specialty` (case-insensitive).
    async fn providers_by_specialty(&self, specialty: &str) -> Result<Vec<Provider>, LookupError>;

    /// Fetches one provider.
    async fn provider(&self, id: ProviderId) -> Result<Provider, LookupError>;

    /// Lists the departments where a provider practices.
    async fn provider_departments(&self, id: ProviderId) -> Result<Vec<Department>, LookupError>;

    /// Fetches one department.
    async fn department(&self, id: DepartmentId) -> Result<Department, LookupError>;

    /// Lists scheduled appointments for a provider at a department within
    /// `[start, end]`.
    async fn booked_appointments(
        &self,
        provider: ProviderId,
        department: DepartmentId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AppointmentRecord>, LookupError>;

    /// Lists every appointment a patient has had with a provider.
    async fn appointment_history(
        &self,
        patient: PatientId,
        provider: ProviderId,
    ) -> Result<Vec<AppointmentRecord>, LookupError>;

    /// Lists every known insurance, accepted or not.
    async fn insurances(&self) -> Result<Vec<Insurance>, LookupError>;

    /// Fetches a specialty by name (case-insensitive).
    async fn specialty(&self, name: &str) -> Result<Specialty, LookupError>;

    /// Puts `insurance_name` on the patient's chart, creating an unaccepted
    /// insurance record if the name is unknown.
    async fn set_patient_insurance(
        &self,
        patient: PatientId,
        insurance_name: &str,
    ) -> Result<InsuranceAssignment, LookupError>;

    /// Stores a new appointment.
    async fn commit_appointment(
        &self,
        request: &CommitRequest,
    ) -> Result<CommitReceipt, LookupError>;

    /// Runs a guarded read-only statement.
    async fn query(&self, statement: &ReadOnlyStatement) -> Result<QueryRows, LookupError>;
}
