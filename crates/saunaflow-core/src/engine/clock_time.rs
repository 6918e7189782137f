use std::fmt;
use std::str::FromStr;

use chrono::{Duration, LocalResult, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::clock::Zone;
use crate::error::ScheduleError;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;
/// Longest daylight-saving gap searched past a skipped wall-clock time.
const MAX_GAP_MINUTES: i64 = 3 * 60;

/// A wall-clock start time, `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime {
    hour: u8,
    minute: u8,
}

impl ClockTime {
    /// # Errors
    /// Returns `InvalidTime` if hour > 23 or minute > 59.
    pub fn new(hour: u8, minute: u8) -> Result<Self, ScheduleError> {
        if hour > 23 || minute > 59 {
            return Err(ScheduleError::InvalidTime {
                input: format!("{hour}:{minute:02}"),
            });
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(self) -> u8 {
        self.hour
    }

    pub fn minute(self) -> u8 {
        self.minute
    }

    /// Epoch milliseconds of the next occurrence strictly after `now_ms`,
    /// read as a wall-clock time in `zone` on the day it falls on.
    ///
    /// A time equal to or earlier than now today resolves to tomorrow. A time
    /// skipped by a spring-forward gap starts when the gap ends; a time
    /// repeated by a fall-back starts at its first occurrence.
    pub fn next_occurrence_ms(self, now_ms: i64, zone: Zone) -> i64 {
        let fallback = now_ms.saturating_add(DAY_MS);
        let time = NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0);
        let (Some(time), Some(now_local)) = (time, zone.local_at(now_ms)) else {
            return fallback;
        };
        let mut date = now_local.date();
        for _ in 0..3 {
            if let Some(target) = resolve_wall_time(zone, date.and_time(time)) {
                if target > now_ms {
                    return target;
                }
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }
        fallback
    }
}

fn resolve_wall_time(zone: Zone, local: NaiveDateTime) -> Option<i64> {
    match zone.resolve(&local) {
        LocalResult::Single(ms) => Some(ms),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => (1..=MAX_GAP_MINUTES).find_map(|minutes| {
            let shifted = local.checked_add_signed(Duration::minutes(minutes))?;
            match zone.resolve(&shifted) {
                LocalResult::None => None,
                resolved => resolved.earliest(),
            }
        }),
    }
}

impl FromStr for ClockTime {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScheduleError::InvalidTime {
            input: s.to_string(),
        };
        let (h, m) = s.split_once(':').ok_or_else(invalid)?;
        let digits = |part: &str| part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit());
        if !digits(h) || !digits(m) {
            return Err(invalid());
        }
        let hour: u8 = h.parse().map_err(|_| invalid())?;
        let minute: u8 = m.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}
