//! Core domain types for the care coordinator.
//!
//! This crate provides the record identifiers, the read-only domain records
//! fetched from the records API, the clock abstraction used by date rules,
//! and the shared `Result` alias.

pub mod clock;
pub mod error;
pub mod id;
pub mod record;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::Result;
pub use id::{
    AppointmentId, DepartmentId, InsuranceId, MessageId, ParseIdError, PatientId, ProviderId,
    SessionInstanceId, SpecialtyId,
};
pub use record::{
    AppointmentRecord, AppointmentStatus, Classification, Department, Insurance, Patient,
    Provider, Referral, SelfPayRate, Specialty, UnknownVariant, VisitSummary,
};
