//! Daily check-in reminder scheduling.
//!
//! Only the timing and the message catalogue live here; how the reminder
//! is delivered is up to the host.

use chrono::{DateTime, Days, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Built-in messages the user can pick from.
pub const MOTIVATIONAL_MESSAGES: [&str; 5] = [
    "You haven't broken the chain, have you? Update your status!",
    "Did you keep the promise you made yourself today? Check in.",
    "Small steps bring big victories. How was today?",
    "No giving up! Did you get one day closer to your goal?",
    "Warrior, how are things on the front today? Report in!",
];

pub const DEFAULT_MESSAGE: &str = MOTIVATIONAL_MESSAGES[0];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSettings {
    pub hour: u32,
    pub minute: u32,
    pub message: String,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            hour: 21,
            minute: 0,
            message: DEFAULT_MESSAGE.to_string(),
        }
    }
}

impl ReminderSettings {
    /// # Errors
    /// Rejects an hour past 23, a minute past 59, or a blank message.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.hour > 23 {
            return Err(ValidationError::InvalidValue {
                field: "hour".into(),
                message: format!("must be 0-23, got {}", self.hour),
            });
        }
        if self.minute > 59 {
            return Err(ValidationError::InvalidValue {
                field: "minute".into(),
                message: format!("must be 0-59, got {}", self.minute),
            });
        }
        if self.message.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "message".into(),
                message: "must not be blank".into(),
            });
        }
        Ok(())
    }

    /// # Errors
    /// See [`next_due`].
    pub fn next_due<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<DateTime<Tz>, ValidationError> {
        next_due(now, self.hour, self.minute)
    }
}

fn resolve<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(at) => Some(at),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        // Inside a DST gap: the wall-clock time does not exist that day.
        LocalResult::None => match tz.from_local_datetime(&(naive + Duration::hours(1))) {
            LocalResult::Single(at) | LocalResult::Ambiguous(at, _) => Some(at),
            LocalResult::None => None,
        },
    }
}

fn at_time<Tz: TimeZone>(tz: &Tz, date: NaiveDate, hour: u32, minute: u32) -> Option<DateTime<Tz>> {
    resolve(tz, date.and_hms_opt(hour, minute, 0)?)
}

/// The next reminder instant: today at `hour:minute:00` in `now`'s zone,
/// or the same time tomorrow when today's is not strictly in the future.
///
/// # Errors
/// Rejects an out-of-range hour or minute.
pub fn next_due<Tz: TimeZone>(
    now: &DateTime<Tz>,
    hour: u32,
    minute: u32,
) -> Result<DateTime<Tz>, ValidationError> {
    let invalid = || ValidationError::InvalidValue {
        field: "reminder".into(),
        message: format!("{hour:02}:{minute:02} is not a time of day"),
    };
    let tz = now.timezone();
    let today = now.date_naive();

    let candidate = at_time(&tz, today, hour, minute).ok_or_else(invalid)?;
    if candidate > *now {
        return Ok(candidate);
    }
    let tomorrow = today.checked_add_days(Days::new(1)).ok_or_else(invalid)?;
    at_time(&tz, tomorrow, hour, minute).ok_or_else(invalid)
}

/// How long to wait from `now` until [`next_due`]. Always positive.
///
/// # Errors
/// Rejects an out-of-range hour or minute.
pub fn delay_until_next<Tz: TimeZone>(
    now: &DateTime<Tz>,
    hour: u32,
    minute: u32,
) -> Result<Duration, ValidationError> {
    let due = next_due(now, hour, minute)?;
    Ok(due.signed_duration_since(now.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn due_later_today() {
        let now = utc("2024-03-10T18:30:15Z");
        assert_eq!(next_due(&now, 21, 0).unwrap(), utc("2024-03-10T21:00:00Z"));
    }

    #[test]
    fn rolls_over_to_tomorrow() {
        let now = utc("2024-03-10T22:00:00Z");
        assert_eq!(next_due(&now, 21, 0).unwrap(), utc("2024-03-11T21:00:00Z"));
    }

    #[test]
    fn exactly_now_is_not_in_the_future() {
        let now = utc("2024-03-10T21:00:00Z");
        assert_eq!(next_due(&now, 21, 0).unwrap(), utc("2024-03-11T21:00:00Z"));
    }

    #[test]
    fn uses_the_local_wall_clock() {
        let tz = FixedOffset::east_opt(3 * 3600).unwrap();
        let now = utc("2024-03-10T17:00:00Z").with_timezone(&tz);
        let due = next_due(&now, 21, 0).unwrap();
        assert_eq!(due.with_timezone(&Utc), utc("2024-03-10T18:00:00Z"));
    }

    #[test]
    fn delay_is_positive() {
        let now = utc("2024-03-10T20:59:00Z");
        assert_eq!(delay_until_next(&now, 21, 0).unwrap(), Duration::minutes(1));
        let now = utc("2024-03-10T21:00:00Z");
        assert_eq!(delay_until_next(&now, 21, 0).unwrap(), Duration::hours(24));
    }

    #[test]
    fn rejects_invalid_times() {
        let now = utc("2024-03-10T20:59:00Z");
        assert!(next_due(&now, 24, 0).is_err());
        assert!(next_due(&now, 12, 60).is_err());
        let settings = ReminderSettings {
            hour: 25,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn default_settings() {
        let settings = ReminderSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.message, DEFAULT_MESSAGE);
        assert!(MOTIVATIONAL_MESSAGES.contains(&DEFAULT_MESSAGE));
    }
}
