//! Reconstructs absolute observation instants from local date and hour strings.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::TimestampError;

const LOCAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn parse_timezone(name: &str) -> Result<Tz, TimestampError> {
    name.parse::<Tz>()
        .map_err(|_| TimestampError::UnknownTimezone(name.to_string()))
}

/// Interprets `date hour:00:00` in the station's zone and returns the UTC instant.
///
/// The date must be `YYYY-MM-DD` and the hour one or two digits. Repeated
/// local times resolve to the later (standard time) instant. Times skipped by
/// a DST gap use the offset in force just before the gap.
pub fn reconstruct(date: &str, hour: &str, tz: Tz) -> Result<DateTime<Utc>, TimestampError> {
    let value = format!("{} {}:00:00", date, hour);
    if !is_calendar_date(date) || !is_hour(hour) {
        return Err(TimestampError::Format {
            value,
            reason: "expected YYYY-MM-DD and a one or two digit hour".to_string(),
        });
    }
    let naive = NaiveDateTime::parse_from_str(&value, LOCAL_FORMAT).map_err(|e| {
        TimestampError::Format {
            value: value.clone(),
            reason: e.to_string(),
        }
    })?;

    let local = match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(_, latest) => latest,
        LocalResult::None => {
            let before_gap = tz
                .from_local_datetime(&(naive - Duration::hours(1)))
                .earliest()
                .ok_or(TimestampError::Unresolvable(value))?;
            before_gap + Duration::hours(1)
        }
    };

    Ok(local.with_timezone(&Utc))
}

fn is_calendar_date(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && b.iter().enumerate().all(|(i, c)| match i {
            4 | 7 => *c == b'-',
            _ => c.is_ascii_digit(),
        })
}

fn is_hour(s: &str) -> bool {
    (1..=2).contains(&s.len()) && s.bytes().all(|c| c.is_ascii_digit())
}

// -- Tests -------------------------------------------------------------------
