//! Department office hours.
//!
//! Hours are written as segments separated by `;` or `,`, each naming a day
//! or day range followed by an open-close window:
//!
//! ```text
//! M-F 9am-5pm
//! Mon-Thu 8:30am-4pm; Sat 9am-12pm
//! ```

use crate::error::ValidationError;
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Opening window for a single weekday, `[open, close)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyWindow {
    /// First minute the office is open.
    pub open: NaiveTime,
    /// Closing time; an appointment may end exactly here.
    pub close: NaiveTime,
}

/// Weekly office hours, indexed Monday first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficeHours {
    days: [Option<DailyWindow>; 7],
}

impl OfficeHours {
    /// Hours with every day closed.
    #[must_use]
    pub fn closed() -> Self {
        Self::default()
    }

    /// Opens `day` between `open` and `close`.
    #[must_use]
    pub fn with_window(mut self, day: Weekday, open: NaiveTime, close: NaiveTime) -> Self {
        self.days[day.num_days_from_monday() as usize] = Some(DailyWindow { open, close });
        self
    }

    /// Returns the window for `day`, or `None` if the office is closed.
    #[must_use]
    pub fn window(&self, day: Weekday) -> Option<DailyWindow> {
        self.days[day.num_days_from_monday() as usize]
    }

    /// Returns the window that applies on `date`.
    #[must_use]
    pub fn window_on(&self, date: NaiveDate) -> Option<DailyWindow> {
        self.window(date.weekday())
    }

    /// Returns true if no day has a window.
    #[must_use]
    pub fn is_always_closed(&self) -> bool {
        self.days.iter().all(Option::is_none)
    }

    /// Parses an office-hours specification.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for an unknown weekday, an unparseable
    /// time, or a window that does not close after it opens.
    pub fn parse(spec: &str) -> Result<Self, ValidationError> {
        let malformed = |reason: &str| ValidationError::MalformedOfficeHours {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let mut hours = Self::closed();
        let mut segments = 0;
        for segment in spec.split([';', ',']) {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (days, window) = segment
                .split_once(char::is_whitespace)
                .ok_or_else(|| malformed("expected '<days> <open>-<close>'"))?;
            let days = parse_days(days.trim().trim_end_matches(':'))?;
            let window: String = window.split_whitespace().collect();
            let (open, close) = window
                .split_once('-')
                .ok_or_else(|| malformed("expected '<open>-<close>'"))?;
            let open = parse_time(open)?;
            let close = parse_time(close)?;
            if close <= open {
                return Err(malformed("closing time must be after opening time"));
            }
            for day in days {
                hours = hours.with_window(day, open, close);
            }
            segments += 1;
        }

        if segments == 0 {
            return Err(malformed("no day segments"));
        }
        Ok(hours)
    }
}

impl FromStr for OfficeHours {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parses a weekday token such as `M`, `Th`, `Wed` or `Saturday`.
///
/// # Errors
///
/// Returns `ValidationError::UnknownWeekday` for anything else.
pub fn parse_weekday(token: &str) -> Result<Weekday, ValidationError> {
    let day = match token.trim().to_ascii_lowercase().as_str() {
        "m" | "mo" | "mon" | "monday" => Weekday::Mon,
        "tu" | "tue" | "tues" | "tuesday" => Weekday::Tue,
        "w" | "we" | "wed" | "wednesday" => Weekday::Wed,
        "th" | "thu" | "thur" | "thurs" | "thursday" => Weekday::Thu,
        "f" | "fr" | "fri" | "friday" => Weekday::Fri,
        "sa" | "sat" | "saturday" => Weekday::Sat,
        "su" | "sun" | "sunday" => Weekday::Sun,
        _ => {
            return Err(ValidationError::UnknownWeekday {
                token: token.to_string(),
            });
        }
    };
    Ok(day)
}

fn parse_days(token: &str) -> Result<Vec<Weekday>, ValidationError> {
    match token.split_once('-') {
        None => Ok(vec![parse_weekday(token)?]),
        Some((first, last)) => {
            let first = parse_weekday(first)?;
            let last = parse_weekday(last)?;
            let mut days = vec![first];
            let mut day = first;
            while day != last {
                day = day.succ();
                days.push(day);
            }
            Ok(days)
        }
    }
}

/// Parses a clock time: `9am`, `9:30am`, `12pm`, `17:00` or `17`.
///
/// # Errors
///
/// Returns `ValidationError::MalformedTime` if the input is not a valid time.
pub fn parse_time(input: &str) -> Result<NaiveTime, ValidationError> {
    let malformed = || ValidationError::MalformedTime {
        input: input.to_string(),
    };

    let text = input.trim().to_ascii_lowercase().replace(' ', "");
    let (clock, meridiem) = if let Some(rest) = text.strip_suffix("am") {
        (rest, Some(false))
    } else if let Some(rest) = text.strip_suffix("pm") {
        (rest, Some(true))
    } else {
        (text.as_str(), None)
    };

    let (hour, minute) = match clock.split_once(':') {
        Some((h, m)) if m.len() == 2 => (h, m),
        Some(_) => return Err(malformed()),
        None => (clock, "00"),
    };
    let hour: u32 = hour.parse().map_err(|_| malformed())?;
    let minute: u32 = minute.parse().map_err(|_| malformed())?;

    let hour = match meridiem {
        Some(pm) => {
            if !(1..=12).contains(&hour) {
                return Err(malformed());
            }
            hour % 12 + if pm { 12 } else { 0 }
        }
        None => hour,
    };

    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    #[test]
    fn parses_weekday_range() {
        let hours = OfficeHours::parse("M-F 9am-5pm").expect("should parse");
        for day in [Weekday::Mon, Weekday::Wed, Weekday::Fri] {
            assert_eq!(
                hours.window(day),
                Some(DailyWindow {
                    open: t(9, 0),
                    close: t(17, 0)
                })
            );
        }
        assert_eq!(hours.window(Weekday::Sat), None);
        assert_eq!(hours.window(Weekday::Sun), None);
    }

    #[test]
    fn parses_multiple_segments() {
        let hours = OfficeHours::parse("Mon-Thu 8:30am-4pm; Sat 9am-12pm").expect("should parse");
        assert_eq!(hours.window(Weekday::Thu).map(|w| w.open), Some(t(8, 30)));
        assert_eq!(hours.window(Weekday::Fri), None);
        assert_eq!(hours.window(Weekday::Sat).map(|w| w.close), Some(t(12, 0)));
    }

    #[test]
    fn range_wraps_through_sunday() {
        let hours = OfficeHours::parse("Sa-M 10:00-14:00").expect("should parse");
        assert!(hours.window(Weekday::Sat).is_some());
        assert!(hours.window(Weekday::Sun).is_some());
        assert!(hours.window(Weekday::Mon).is_some());
        assert!(hours.window(Weekday::Tue).is_none());
    }

    #[test]
    fn rejects_unknown_weekday() {
        let err = OfficeHours::parse("Funday 9am-5pm").unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownWeekday {
                token: "Funday".to_string()
            }
        );
    }

    #[test]
    fn rejects_inverted_window() {
        let err = OfficeHours::parse("M-F 5pm-9am").unwrap_err();
        assert_eq!(err.reason(), "malformed_office_hours");
    }

    #[test]
    fn rejects_empty_spec() {
        assert!(OfficeHours::parse("  ").is_err());
    }

    #[test]
    fn parses_clock_times() {
        assert_eq!(parse_time("9am").expect("parse"), t(9, 0));
        assert_eq!(parse_time("9:30 AM").expect("parse"), t(9, 30));
        assert_eq!(parse_time("12pm").expect("parse"), t(12, 0));
        assert_eq!(parse_time("12am").expect("parse"), t(0, 0));
        assert_eq!(parse_time("17:00").expect("parse"), t(17, 0));
        assert!(parse_time("13pm").is_err());
        assert!(parse_time("25:00").is_err());
        assert!(parse_time("9:5am").is_err());
    }
}
