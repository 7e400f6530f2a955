//! Business rule engine for appointment booking.
//!
//! This crate provides:
//!
//! - **Engine**: classification, duration, arrival offset and self-pay rules
//! - **Office hours**: parsing and querying department opening windows
//! - **Slots**: candidate start times that satisfy every timing rule
//!
//! Everything here is synchronous and free of I/O.

pub mod engine;
pub mod error;
pub mod hours;
pub mod slots;

pub use engine::{
    ESTABLISHED_LOOKBACK_MONTHS, InsuranceDisposition, arrival_offset_minutes, arrival_time,
    classify, duration_minutes, last_completed_visit, self_pay_disposition, within_office_hours,
};
pub use error::ValidationError;
pub use hours::{DailyWindow, OfficeHours, parse_time, parse_weekday};
pub use slots::{
    BookedSlot, MAX_RANGE_DAYS, SLOT_STEP_MINUTES, Slot, SlotRequest, available_slots,
};
