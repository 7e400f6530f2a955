//! Available appointment slots.

use crate::engine::{arrival_time, duration_minutes, within_office_hours};
use crate::error::ValidationError;
use crate::hours::OfficeHours;
use care_coordinator_core::{AppointmentRecord, AppointmentStatus, Classification};
use chrono::{NaiveDate, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

/// Spacing between candidate start times.
pub const SLOT_STEP_MINUTES: i64 = 15;

/// Longest date range searched in one request, inclusive.
pub const MAX_RANGE_DAYS: i64 = 31;

/// An interval already taken on a provider's calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookedSlot {
    /// Day of the booking.
    pub date: NaiveDate,
    /// Start of the booking.
    pub start: NaiveTime,
    /// Length in minutes.
    pub duration_minutes: i64,
}

impl BookedSlot {
    /// Converts a stored appointment, or `None` if it no longer holds time.
    #[must_use]
    pub fn from_record(record: &AppointmentRecord) -> Option<Self> {
        (record.status == AppointmentStatus::Scheduled).then(|| Self {
            date: record.date,
            start: record.start_time,
            duration_minutes: duration_minutes(record.classification),
        })
    }

    /// Whether `[start, start + minutes)` on `date` intersects this booking.
    #[must_use]
    pub fn overlaps(&self, date: NaiveDate, start: NaiveTime, minutes: i64) -> bool {
        if self.date != date {
            return false;
        }
        let (end, end_wrapped) = start.overflowing_add_signed(TimeDelta::minutes(minutes));
        let (booked_end, booked_wrapped) = self
            .start
            .overflowing_add_signed(TimeDelta::minutes(self.duration_minutes));
        let ends_before_booking = end_wrapped == 0 && end <= self.start;
        let starts_after_booking = booked_wrapped == 0 && start >= booked_end;
        !(ends_before_booking || starts_after_booking)
    }
}

/// A free slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Day of the slot.
    pub date: NaiveDate,
    /// Appointment start.
    pub start: NaiveTime,
    /// Time the patient should arrive.
    pub arrival: NaiveTime,
    /// Length in minutes.
    pub duration_minutes: i64,
}

/// Inputs for [`available_slots`].
#[derive(Debug, Clone)]
pub struct SlotRequest<'a> {
    /// The department's weekly hours.
    pub hours: &'a OfficeHours,
    /// First day searched.
    pub start_date: NaiveDate,
    /// Last day searched, inclusive.
    pub end_date: NaiveDate,
    /// Classification that fixes slot length and arrival offset.
    pub classification: Classification,
    /// Intervals already taken.
    pub booked: &'a [BookedSlot],
}

/// Lists start times on a 15-minute grid from opening that fit office hours,
/// keep the arrival time on the same day, and avoid existing bookings.
///
/// # Errors
///
/// Returns `InvalidDateRange` if the range is reversed or longer than
/// [`MAX_RANGE_DAYS`].
pub fn available_slots(request: &SlotRequest<'_>) -> Result<Vec<Slot>, ValidationError> {
    let span = (request.end_date - request.start_date).num_days();
    if span < 0 {
        return Err(ValidationError::InvalidDateRange {
            start: request.start_date,
            end: request.end_date,
            reason: "end date is before start date".to_string(),
        });
    }
    if span >= MAX_RANGE_DAYS {
        return Err(ValidationError::InvalidDateRange {
            start: request.start_date,
            end: request.end_date,
            reason: format!("range may cover at most {MAX_RANGE_DAYS} days"),
        });
    }

    let minutes = duration_minutes(request.classification);
    let mut slots = Vec::new();

    for date in request.start_date.iter_days().take(span as usize + 1) {
        let Some(window) = request.hours.window_on(date) else {
            continue;
        };
        let mut start = window.open;
        while within_office_hours(request.hours, date, start, minutes)? {
            let free = !request
                .booked
                .iter()
                .any(|b| b.overlaps(date, start, minutes));
            if free {
                if let Ok(arrival) = arrival_time(start, request.classification) {
                    slots.push(Slot {
                        date,
                        start,
                        arrival,
                        duration_minutes: minutes,
                    });
                }
            }
            let (next, wrapped) =
                start.overflowing_add_signed(TimeDelta::minutes(SLOT_STEP_MINUTES));
            if wrapped != 0 {
                break;
            }
            start = next;
        }
    }

    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    fn short_day() -> OfficeHours {
        OfficeHours::closed().with_window(Weekday::Mon, t(9, 0), t(10, 0))
    }

    #[test]
    fn new_slots_fill_the_window() {
        let hours = short_day();
        let monday = d(2025, 6, 16);
        let slots = available_slots(&SlotRequest {
            hours: &hours,
            start_date: monday,
            end_date: monday,
            classification: Classification::New,
            booked: &[],
        })
        .expect("slots");
        let starts: Vec<NaiveTime> = slots.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![t(9, 0), t(9, 15), t(9, 30)]);
        assert_eq!(slots[0].arrival, t(8, 30));
        assert!(slots.iter().all(|s| s.duration_minutes == 30));
    }

    #[test]
    fn booked_interval_blocks_overlapping_starts() {
        let hours = short_day();
        let monday = d(2025, 6, 16);
        let booked = [BookedSlot {
            date: monday,
            start: t(9, 15),
            duration_minutes: 15,
        }];
        let slots = available_slots(&SlotRequest {
            hours: &hours,
            start_date: monday,
            end_date: monday,
            classification: Classification::Established,
            booked: &booked,
        })
        .expect("slots");
        let starts: Vec<NaiveTime> = slots.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![t(9, 0), t(9, 30), t(9, 45)]);
    }

    #[test]
    fn closed_days_are_skipped() {
        let hours = short_day();
        let slots = available_slots(&SlotRequest {
            hours: &hours,
            start_date: d(2025, 6, 17),
            end_date: d(2025, 6, 22),
            classification: Classification::New,
            booked: &[],
        })
        .expect("slots");
        assert!(slots.is_empty());
    }

    #[test]
    fn early_starts_that_would_arrive_before_midnight_are_dropped() {
        let hours = OfficeHours::closed().with_window(Weekday::Mon, t(0, 0), t(1, 0));
        let monday = d(2025, 6, 16);
        let slots = available_slots(&SlotRequest {
            hours: &hours,
            start_date: monday,
            end_date: monday,
            classification: Classification::New,
            booked: &[],
        })
        .expect("slots");
        let starts: Vec<NaiveTime> = slots.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![t(0, 30)]);
    }

    #[test]
    fn rejects_reversed_and_oversized_ranges() {
        let hours = short_day();
        let reversed = SlotRequest {
            hours: &hours,
            start_date: d(2025, 6, 20),
            end_date: d(2025, 6, 16),
            classification: Classification::New,
            booked: &[],
        };
        assert_eq!(
            available_slots(&reversed).unwrap_err().reason(),
            "invalid_date_range"
        );

        let oversized = SlotRequest {
            start_date: d(2025, 6, 1),
            end_date: d(2025, 7, 2),
            ..reversed
        };
        assert!(available_slots(&oversized).is_err());

        let full_month = SlotRequest {
            start_date: d(2025, 6, 1),
            end_date: d(2025, 7, 1),
            ..oversized
        };
        assert!(available_slots(&full_month).is_ok());
    }

    #[test]
    fn cancelled_records_do_not_hold_time() {
        use care_coordinator_core::{AppointmentId, DepartmentId, PatientId, ProviderId};
        let mut record = AppointmentRecord {
            id: AppointmentId::new(1),
            patient_id: PatientId::new(1),
            provider_id: ProviderId::new(1),
            department_id: DepartmentId::new(1),
            classification: Classification::New,
            date: d(2025, 6, 16),
            start_time: t(9, 0),
            arrival_time: None,
            status: AppointmentStatus::Scheduled,
            notes: String::new(),
        };
        assert_eq!(
            BookedSlot::from_record(&record).map(|b| b.duration_minutes),
            Some(30)
        );
        record.status = AppointmentStatus::Cancelled;
        assert!(BookedSlot::from_record(&record).is_none());
    }
}
