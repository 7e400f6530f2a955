//! The in-progress booking.
//!
//! A [`Booking`] accumulates the facts gathered during a conversation. Every
//! setter is idempotent, refuses changes once the booking is committed, and
//! recomputes readiness before returning.

use crate::error::BookingError;
use care_coordinator_core::{
    AppointmentId, Classification, Department, DepartmentId, Patient, PatientId, Provider,
    ProviderId, Specialty,
};
use care_coordinator_lookup::CommitRequest;
use care_coordinator_rules::{
    InsuranceDisposition, OfficeHours, ValidationError, arrival_offset_minutes, arrival_time,
    duration_minutes, within_office_hours,
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// A proposed appointment start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTime {
    /// Appointment date.
    pub date: NaiveDate,
    /// Appointment start.
    pub time: NaiveTime,
}

/// Outcome of checking the candidate time against the rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeCheck {
    /// Visit length for the current classification.
    pub duration_minutes: i64,
    /// Arrival time, absent when it would fall on the previous day.
    pub arrival_time: Option<NaiveTime>,
    /// Why no arrival time could be computed.
    #[serde(skip)]
    pub arrival_error: Option<ValidationError>,
    /// Whether the whole visit fits the department's hours.
    pub within_office_hours: bool,
}

impl TimeCheck {
    /// Whether the candidate time passed every check.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.within_office_hours && self.arrival_time.is_some()
    }
}

/// The appointment being assembled for one session.
#[derive(Debug, Clone)]
pub struct Booking {
    patient_id: PatientId,
    patient_name: String,
    specialty: Option<Specialty>,
    provider: Option<Provider>,
    department: Option<Department>,
    hours: Option<OfficeHours>,
    candidate: Option<CandidateTime>,
    classification: Option<Classification>,
    insurance: Option<InsuranceDisposition>,
    notes: String,
    time_check: Option<TimeCheck>,
    ready_to_book: bool,
    committed: Option<AppointmentId>,
}

impl Booking {
    /// Starts an empty booking for `patient`.
    #[must_use]
    pub fn new(patient: &Patient) -> Self {
        Self {
            patient_id: patient.id,
            patient_name: patient.name.clone(),
            specialty: None,
            provider: None,
            department: None,
            hours: None,
            candidate: None,
            classification: None,
            insurance: None,
            notes: String::new(),
            time_check: None,
            ready_to_book: false,
            committed: None,
        }
    }

    /// The patient being booked.
    #[must_use]
    pub fn patient_id(&self) -> PatientId {
        self.patient_id
    }

    #[must_use]
    pub fn specialty(&self) -> Option<&Specialty> {
        self.specialty.as_ref()
    }

    #[must_use]
    pub fn provider(&self) -> Option<&Provider> {
        self.provider.as_ref()
    }

    #[must_use]
    pub fn department(&self) -> Option<&Department> {
        self.department.as_ref()
    }

    #[must_use]
    pub fn candidate(&self) -> Option<CandidateTime> {
        self.candidate
    }

    #[must_use]
    pub fn classification(&self) -> Option<Classification> {
        self.classification
    }

    /// Classification cached for `provider`, if that provider is the one chosen.
    #[must_use]
    pub fn classification_for(&self, provider: ProviderId) -> Option<Classification> {
        match &self.provider {
            Some(chosen) if chosen.id == provider => self.classification,
            _ => None,
        }
    }

    #[must_use]
    pub fn insurance(&self) -> Option<InsuranceDisposition> {
        self.insurance
    }

    #[must_use]
    pub fn time_check(&self) -> Option<&TimeCheck> {
        self.time_check.as_ref()
    }

    /// Whether every prerequisite is present and the time is valid.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready_to_book
    }

    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.committed.is_some()
    }

    /// The stored appointment, once committed.
    #[must_use]
    pub fn appointment_id(&self) -> Option<AppointmentId> {
        self.committed
    }

    /// Fails if the booking has been committed.
    ///
    /// # Errors
    ///
    /// Returns `ImmutableAfterCommit` once committed.
    pub fn ensure_uncommitted(&self, field: &'static str) -> Result<(), BookingError> {
        if self.is_committed() {
            return Err(BookingError::ImmutableAfterCommit { field });
        }
        Ok(())
    }

    /// Chooses the specialty. A different specialty clears the insurance
    /// disposition, whose self-pay rate depends on it.
    ///
    /// # Errors
    ///
    /// Returns `ImmutableAfterCommit` for a change after commit.
    pub fn set_specialty(&mut self, specialty: Specialty) -> Result<(), BookingError> {
        if self.specialty.as_ref() == Some(&specialty) {
            return Ok(());
        }
        self.ensure_uncommitted("specialty")?;
        self.specialty = Some(specialty);
        self.insurance = None;
        self.recompute_readiness();
        Ok(())
    }

    /// Chooses the provider.
    ///
    /// A different provider clears the cached classification, and the
    /// department if the new provider does not practice there.
    ///
    /// # Errors
    ///
    /// Returns `ImmutableAfterCommit` for a change after commit.
    pub fn set_provider(&mut self, provider: Provider) -> Result<(), BookingError> {
        if self.provider.as_ref() == Some(&provider) {
            return Ok(());
        }
        self.ensure_uncommitted("provider")?;
        if self.provider.as_ref().map(|p| p.id) != Some(provider.id) {
            self.classification = None;
        }
        if let Some(department) = &self.department
            && !provider.department_ids.contains(&department.id)
        {
            self.department = None;
            self.hours = None;
        }
        self.provider = Some(provider);
        self.recompute_readiness();
        Ok(())
    }

    /// Chooses the location.
    ///
    /// # Errors
    ///
    /// Returns `MissingPrerequisite` without a provider,
    /// `ProviderNotAtDepartment` if the provider does not practice there,
    /// `Validation` if the office hours cannot be parsed, and
    /// `ImmutableAfterCommit` for a change after commit.
    pub fn set_department(&mut self, department: Department) -> Result<(), BookingError> {
        if self.department.as_ref() == Some(&department) {
            return Ok(());
        }
        self.ensure_uncommitted("location")?;
        let Some(provider) = &self.provider else {
            return Err(BookingError::MissingPrerequisite {
                field: "location",
                requires: "provider",
            });
        };
        if !provider.department_ids.contains(&department.id) {
            return Err(BookingError::ProviderNotAtDepartment {
                provider: provider.id,
                department: department.id,
            });
        }
        let hours = OfficeHours::parse(&department.hours)?;
        self.department = Some(department);
        self.hours = Some(hours);
        self.recompute_readiness();
        Ok(())
    }

    /// Proposes a date and start time.
    ///
    /// # Errors
    ///
    /// Returns `ImmutableAfterCommit` for a change after commit.
    pub fn set_candidate_time(
        &mut self,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<(), BookingError> {
        let candidate = CandidateTime { date, time };
        if self.candidate == Some(candidate) {
            return Ok(());
        }
        self.ensure_uncommitted("date/time")?;
        self.candidate = Some(candidate);
        self.recompute_readiness();
        Ok(())
    }

    /// Records the classification computed for the chosen provider.
    ///
    /// # Errors
    ///
    /// Returns `MissingPrerequisite` without a provider and
    /// `ImmutableAfterCommit` for a change after commit.
    pub fn set_classification(
        &mut self,
        classification: Classification,
    ) -> Result<(), BookingError> {
        if self.classification == Some(classification) {
            return Ok(());
        }
        self.ensure_uncommitted("appointment type")?;
        if self.provider.is_none() {
            return Err(BookingError::MissingPrerequisite {
                field: "appointment type",
                requires: "provider",
            });
        }
        self.classification = Some(classification);
        self.recompute_readiness();
        Ok(())
    }

    /// Records whether insurance covers the visit.
    ///
    /// # Errors
    ///
    /// Returns `ImmutableAfterCommit` for a change after commit.
    pub fn set_insurance_disposition(
        &mut self,
        disposition: InsuranceDisposition,
    ) -> Result<(), BookingError> {
        if self.insurance == Some(disposition) {
            return Ok(());
        }
        self.ensure_uncommitted("insurance disposition")?;
        self.insurance = Some(disposition);
        self.recompute_readiness();
        Ok(())
    }

    /// Sets the notes forwarded with the commit.
    ///
    /// # Errors
    ///
    /// Returns `ImmutableAfterCommit` for a change after commit.
    pub fn set_notes(&mut self, notes: impl Into<String>) -> Result<(), BookingError> {
        let notes = notes.into();
        if self.notes == notes {
            return Ok(());
        }
        self.ensure_uncommitted("notes")?;
        self.notes = notes;
        Ok(())
    }

    /// Re-checks the candidate time and recomputes `ready_to_book`.
    pub fn recompute_readiness(&mut self) -> bool {
        self.time_check = match (self.candidate, &self.hours, self.classification) {
            (Some(candidate), Some(hours), Some(classification)) => {
                let duration = duration_minutes(classification);
                let arrival = arrival_time(candidate.time, classification);
                Some(TimeCheck {
                    duration_minutes: duration,
                    arrival_time: arrival.as_ref().ok().copied(),
                    arrival_error: arrival.err(),
                    within_office_hours: within_office_hours(
                        hours,
                        candidate.date,
                        candidate.time,
                        duration,
                    )
                    .unwrap_or(false),
                })
            }
            _ => None,
        };
        self.ready_to_book = self.missing_fields().is_empty();
        self.ready_to_book
    }

    /// Lists what still blocks the commit, in the order it is usually gathered.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.specialty.is_none() {
            missing.push("specialty");
        }
        if self.provider.is_none() {
            missing.push("provider");
        }
        if self.department.is_none() {
            missing.push("location");
        }
        if self.candidate.is_none() {
            missing.push("date/time");
        }
        if self.classification.is_none() {
            missing.push("appointment type");
        }
        if self.insurance.is_none() {
            missing.push("insurance disposition");
        }
        if let Some(check) = &self.time_check
            && !check.is_valid()
        {
            missing.push("time within office hours");
        }
        missing
    }

    /// Builds the commit payload.
    ///
    /// # Errors
    ///
    /// Returns `ImmutableAfterCommit` if already committed and `NotReady`
    /// while prerequisites are missing.
    pub fn commit_request(&self) -> Result<CommitRequest, BookingError> {
        self.ensure_uncommitted("committed")?;
        let not_ready = || BookingError::NotReady {
            missing: self.missing_fields(),
        };
        if !self.ready_to_book {
            return Err(not_ready());
        }
        match (
            &self.provider,
            &self.department,
            self.candidate,
            self.classification,
            &self.time_check,
        ) {
            (
                Some(provider),
                Some(department),
                Some(candidate),
                Some(classification),
                Some(TimeCheck {
                    duration_minutes,
                    arrival_time: Some(arrival),
                    ..
                }),
            ) => Ok(CommitRequest {
                patient_id: self.patient_id,
                provider_id: provider.id,
                department_id: department.id,
                date: candidate.date,
                time: candidate.time,
                classification,
                duration_minutes: *duration_minutes,
                arrival_time: *arrival,
                notes: self.notes.clone(),
            }),
            _ => Err(not_ready()),
        }
    }

    /// Marks the booking as stored. Allowed exactly once.
    ///
    /// # Errors
    ///
    /// Returns `ImmutableAfterCommit` if already committed and `NotReady`
    /// if the booking is incomplete.
    pub fn mark_committed(&mut self, appointment_id: AppointmentId) -> Result<(), BookingError> {
        self.ensure_uncommitted("committed")?;
        if !self.ready_to_book {
            return Err(BookingError::NotReady {
                missing: self.missing_fields(),
            });
        }
        self.committed = Some(appointment_id);
        Ok(())
    }

    /// Human-readable progress report.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = format!("Patient: {}\n", self.patient_name);
        let _ = writeln!(
            out,
            "Specialty: {}",
            self.specialty
                .as_ref()
                .map_or("(not selected)", |s| s.name.as_str())
        );
        match &self.provider {
            Some(provider) => {
                let _ = writeln!(out, "Provider: {}", provider.display_name());
            }
            None => out.push_str("Provider: (not selected)\n"),
        }
        let _ = writeln!(
            out,
            "Location: {}",
            self.department
                .as_ref()
                .map_or("(not selected)", |d| d.name.as_str())
        );
        match self.classification {
            Some(c) => {
                let _ = writeln!(
                    out,
                    "Type: {c} ({} min, arrive {} min early)",
                    duration_minutes(c),
                    arrival_offset_minutes(c)
                );
            }
            None => out.push_str("Type: (not determined)\n"),
        }
        match (self.candidate, &self.time_check) {
            (Some(candidate), Some(check)) if !check.is_valid() => {
                let _ = writeln!(
                    out,
                    "Date/Time: {} at {} (outside office hours)",
                    candidate.date,
                    candidate.time.format("%H:%M")
                );
            }
            (Some(candidate), _) => {
                let _ = writeln!(
                    out,
                    "Date/Time: {} at {}",
                    candidate.date,
                    candidate.time.format("%H:%M")
                );
            }
            (None, _) => out.push_str("Date/Time: (not selected)\n"),
        }
        match self.insurance {
            Some(disposition) => {
                let _ = writeln!(out, "Payment: {disposition}");
            }
            None => out.push_str("Payment: (not determined)\n"),
        }
        if !self.notes.is_empty() {
            let _ = writeln!(out, "Notes: {}", self.notes);
        }
        if let Some(id) = self.committed {
            let _ = writeln!(out, "Booked: appointment {id}");
        }
        out.trim_end().to_string()
    }

    /// Read-only view for diagnostics.
    #[must_use]
    pub fn snapshot(&self) -> BookingSnapshot {
        BookingSnapshot {
            patient_id: self.patient_id,
            specialty: self.specialty.as_ref().map(|s| s.name.clone()),
            provider: self.provider.as_ref().map(|p| NamedRef {
                id: p.id.get(),
                name: p.display_name(),
            }),
            department: self.department.as_ref().map(|d| NamedRef {
                id: d.id.get(),
                name: d.name.clone(),
            }),
            date: self.candidate.map(|c| c.date),
            time: self.candidate.map(|c| c.time),
            classification: self.classification,
            duration_minutes: self.classification.map(duration_minutes),
            arrival_offset_minutes: self.classification.map(arrival_offset_minutes),
            arrival_time: self.time_check.as_ref().and_then(|c| c.arrival_time),
            within_office_hours: self.time_check.as_ref().map(|c| c.within_office_hours),
            insurance: self.insurance,
            notes: self.notes.clone(),
            ready_to_book: self.ready_to_book,
            committed: self.is_committed(),
            appointment_id: self.committed,
            missing_fields: self.missing_fields().into_iter().map(String::from).collect(),
            summary: self.summary(),
        }
    }

    /// The chosen department's id, if any.
    #[must_use]
    pub fn department_id(&self) -> Option<DepartmentId> {
        self.department.as_ref().map(|d| d.id)
    }
}

/// An id and display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: i64,
    pub name: String,
}

/// Serializable view of a [`Booking`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingSnapshot {
    pub patient_id: PatientId,
    pub specialty: Option<String>,
    pub provider: Option<NamedRef>,
    pub department: Option<NamedRef>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub classification: Option<Classification>,
    pub duration_minutes: Option<i64>,
    pub arrival_offset_minutes: Option<i64>,
    pub arrival_time: Option<NaiveTime>,
    pub within_office_hours: Option<bool>,
    pub insurance: Option<InsuranceDisposition>,
    pub notes: String,
    pub ready_to_book: bool,
    pub committed: bool,
    pub appointment_id: Option<AppointmentId>,
    pub missing_fields: Vec<String>,
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use care_coordinator_core::{SelfPayRate, SpecialtyId};

    fn patient() -> Patient {
        Patient {
            id: PatientId::new(1),
            name: "John Doe".to_string(),
            dob: "01/01/1975".to_string(),
            pcp: "Dr. Meredith Grey".to_string(),
            ehr_id: "1234abcd".to_string(),
            notes: String::new(),
            insurance: None,
            referrals: Vec::new(),
            appointments: Vec::new(),
        }
    }

    fn orthopedics() -> Specialty {
        Specialty {
            id: SpecialtyId::new(2),
            name: "Orthopedics".to_string(),
            self_pay_rate: SelfPayRate::dollars(300),
        }
    }

    fn house() -> Provider {
        Provider {
            id: ProviderId::new(2),
            first_name: "Gregory".to_string(),
            last_name: "House".to_string(),
            certification: "MD".to_string(),
            specialty: "Orthopedics".to_string(),
            department_ids: vec![DepartmentId::new(2), DepartmentId::new(3)],
        }
    }

    fn brennan() -> Provider {
        Provider {
            id: ProviderId::new(5),
            first_name: "Temperance".to_string(),
            last_name: "Brennan".to_string(),
            certification: "PA-C".to_string(),
            specialty: "Orthopedics".to_string(),
            department_ids: vec![DepartmentId::new(2)],
        }
    }

    fn ppth() -> Department {
        Department {
            id: DepartmentId::new(2),
            name: "PPTH Orthopedics".to_string(),
            phone: "445-555-6205".to_string(),
            address: "101 Pine St, Greensboro, NC 27401".to_string(),
            hours: "M-W 9am-5pm".to_string(),
        }
    }

    fn jefferson() -> Department {
        Department {
            id: DepartmentId::new(3),
            name: "Jefferson Hospital".to_string(),
            phone: "215-555-6123".to_string(),
            address: "202 Maple St, Claremont, NC 28610".to_string(),
            hours: "Th-F 9am-5pm".to_string(),
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    /// Monday 2025-06-16 at 10:00 with House at PPTH, NEW, insured.
    fn ready_booking() -> Booking {
        let mut booking = Booking::new(&patient());
        booking.set_specialty(orthopedics()).expect("specialty");
        booking.set_provider(house()).expect("provider");
        booking.set_department(ppth()).expect("department");
        booking
            .set_candidate_time(d(2025, 6, 16), t(10, 0))
            .expect("time");
        booking
            .set_classification(Classification::New)
            .expect("classification");
        booking
            .set_insurance_disposition(InsuranceDisposition::Accepted)
            .expect("insurance");
        booking
    }

    #[test]
    fn ready_only_when_everything_is_present() {
        let mut booking = Booking::new(&patient());
        assert!(!booking.is_ready());
        assert_eq!(booking.missing_fields().len(), 6);

        booking.set_specialty(orthopedics()).expect("specialty");
        booking.set_provider(house()).expect("provider");
        booking.set_department(ppth()).expect("department");
        booking
            .set_candidate_time(d(2025, 6, 16), t(10, 0))
            .expect("time");
        booking
            .set_classification(Classification::New)
            .expect("classification");
        assert!(!booking.is_ready());
        assert_eq!(booking.missing_fields(), vec!["insurance disposition"]);

        booking
            .set_insurance_disposition(InsuranceDisposition::Accepted)
            .expect("insurance");
        assert!(booking.is_ready());
        assert!(booking.missing_fields().is_empty());
    }

    #[test]
    fn changing_provider_clears_classification() {
        let mut booking = ready_booking();
        assert!(booking.is_ready());

        booking.set_provider(brennan()).expect("provider");
        assert_eq!(booking.classification(), None);
        assert!(!booking.is_ready());
        assert!(booking.missing_fields().contains(&"appointment type"));
        // Brennan also practices at PPTH.
        assert_eq!(booking.department_id(), Some(DepartmentId::new(2)));

        booking
            .set_classification(Classification::Established)
            .expect("classification");
        assert!(booking.is_ready());
    }

    #[test]
    fn provider_elsewhere_clears_department() {
        let mut booking = Booking::new(&patient());
        booking.set_provider(house()).expect("provider");
        booking.set_department(jefferson()).expect("department");
        booking.set_provider(brennan()).expect("provider");
        assert_eq!(booking.department(), None);
    }

    #[test]
    fn department_requires_provider_practicing_there() {
        let mut booking = Booking::new(&patient());
        assert!(matches!(
            booking.set_department(ppth()),
            Err(BookingError::MissingPrerequisite { .. })
        ));
        booking.set_provider(brennan()).expect("provider");
        assert!(matches!(
            booking.set_department(jefferson()),
            Err(BookingError::ProviderNotAtDepartment { .. })
        ));
    }

    #[test]
    fn time_outside_office_hours_blocks_readiness() {
        let mut booking = ready_booking();
        // Thursday: PPTH is closed.
        booking
            .set_candidate_time(d(2025, 6, 19), t(10, 0))
            .expect("time");
        assert!(!booking.is_ready());
        assert_eq!(booking.missing_fields(), vec!["time within office hours"]);

        // Ends exactly at closing.
        booking
            .set_candidate_time(d(2025, 6, 16), t(16, 30))
            .expect("time");
        assert!(booking.is_ready());

        // Ends one minute after closing.
        booking
            .set_candidate_time(d(2025, 6, 16), t(16, 31))
            .expect("time");
        assert!(!booking.is_ready());
    }

    #[test]
    fn specialty_change_clears_insurance_disposition() {
        let mut booking = ready_booking();
        booking
            .set_specialty(Specialty {
                id: SpecialtyId::new(3),
                name: "Surgery".to_string(),
                self_pay_rate: SelfPayRate::dollars(1000),
            })
            .expect("specialty");
        assert_eq!(booking.insurance(), None);
        assert!(!booking.is_ready());
    }

    #[test]
    fn setters_are_idempotent_after_commit() {
        let mut booking = ready_booking();
        booking
            .mark_committed(AppointmentId::new(6))
            .expect("commit");

        booking.set_provider(house()).expect("same provider is a no-op");
        booking
            .set_candidate_time(d(2025, 6, 16), t(10, 0))
            .expect("same time is a no-op");
        assert_eq!(
            booking.set_provider(brennan()),
            Err(BookingError::ImmutableAfterCommit { field: "provider" })
        );
        assert!(matches!(
            booking.set_candidate_time(d(2025, 6, 17), t(10, 0)),
            Err(BookingError::ImmutableAfterCommit { .. })
        ));
        assert_eq!(booking.classification(), Some(Classification::New));
    }

    #[test]
    fn commits_exactly_once() {
        let mut booking = ready_booking();
        let request = booking.commit_request().expect("request");
        assert_eq!(request.duration_minutes, 30);
        assert_eq!(request.arrival_time, t(9, 30));
        assert_eq!(request.provider_id, ProviderId::new(2));

        booking
            .mark_committed(AppointmentId::new(6))
            .expect("first commit");
        assert!(booking.is_committed());
        assert_eq!(
            booking.mark_committed(AppointmentId::new(7)),
            Err(BookingError::ImmutableAfterCommit { field: "committed" })
        );
        assert!(matches!(
            booking.commit_request(),
            Err(BookingError::ImmutableAfterCommit { .. })
        ));
        assert_eq!(booking.appointment_id(), Some(AppointmentId::new(6)));
    }

    #[test]
    fn incomplete_booking_cannot_commit() {
        let mut booking = Booking::new(&patient());
        booking.set_specialty(orthopedics()).expect("specialty");
        assert!(matches!(
            booking.mark_committed(AppointmentId::new(6)),
            Err(BookingError::NotReady { .. })
        ));
        assert!(!booking.is_committed());
    }

    #[test]
    fn snapshot_reports_computed_fields() {
        let mut booking = ready_booking();
        booking
            .mark_committed(AppointmentId::new(6))
            .expect("commit");
        let snapshot = booking.snapshot();
        assert!(snapshot.committed);
        assert_eq!(snapshot.duration_minutes, Some(30));
        assert_eq!(snapshot.arrival_offset_minutes, Some(30));
        assert_eq!(snapshot.arrival_time, Some(t(9, 30)));
        assert_eq!(snapshot.within_office_hours, Some(true));
        assert!(snapshot.summary.contains("Dr. Gregory House"));
        assert!(snapshot.summary.contains("Booked: appointment 6"));

        let json = serde_json::to_value(&snapshot).expect("serialize");
        assert_eq!(json["classification"], "NEW");
        assert_eq!(json["insurance"]["disposition"], "accepted");
    }
}
