//! Wall-clock sources.
//!
//! The engine never reads the system time directly. Every timing decision is
//! made against a [`Clock`], so tests and simulations can move time forward
//! (or backward) without sleeping.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

/// Zone in which `HH:MM` start times are read as wall-clock times.
///
/// Daylight-saving rules of the zone apply on the day the time falls on, not
/// the day it was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    /// The machine's local zone.
    System,
    /// A named IANA zone such as `Europe/Berlin`.
    Named(Tz),
    /// A constant offset with no daylight saving.
    Fixed(FixedOffset),
}

impl Zone {
    /// Wall-clock reading of `epoch_ms` in this zone.
    pub fn local_at(&self, epoch_ms: i64) -> Option<NaiveDateTime> {
        let utc = Utc.timestamp_millis_opt(epoch_ms).single()?;
        Some(match self {
            Zone::System => utc.with_timezone(&Local).naive_local(),
            Zone::Named(tz) => utc.with_timezone(tz).naive_local(),
            Zone::Fixed(offset) => utc.with_timezone(offset).naive_local(),
        })
    }

    /// Epoch milliseconds of a local wall-clock time. `None` when the time
    /// falls in a spring-forward gap, `Ambiguous` when a fall-back repeats it.
    pub fn resolve(&self, local: &NaiveDateTime) -> LocalResult<i64> {
        match self {
            Zone::System => epoch_ms(Local.from_local_datetime(local)),
            Zone::Named(tz) => epoch_ms(tz.from_local_datetime(local)),
            Zone::Fixed(offset) => epoch_ms(offset.from_local_datetime(local)),
        }
    }
}

fn epoch_ms<T: TimeZone>(result: LocalResult<DateTime<T>>) -> LocalResult<i64> {
    result.map(|dt| dt.timestamp_millis())
}

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;

    /// Zone used to interpret `HH:MM` start times.
    fn zone(&self) -> Zone;
}

/// The real system clock, interpreting start times in the machine's local zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn zone(&self) -> Zone {
        Zone::System
    }
}

/// A manually driven clock.
///
/// Clones share the same underlying time, so a test can hand one clone to the
/// engine and keep another to advance it.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now_ms: Arc<AtomicI64>,
    zone: Zone,
}

impl ManualClock {
    /// Clock frozen at `now_ms`, interpreting start times in UTC.
    pub fn at_ms(now_ms: i64) -> Self {
        Self {
            now_ms: Arc::new(AtomicI64::new(now_ms)),
            zone: Zone::Fixed(Utc.fix()),
        }
    }

    pub fn at(time: DateTime<Utc>) -> Self {
        Self::at_ms(time.timestamp_millis())
    }

    /// Interpret `HH:MM` start times in `zone`.
    pub fn with_zone(mut self, zone: Zone) -> Self {
        self.zone = zone;
        self
    }

    /// Interpret `HH:MM` start times at a constant offset.
    pub fn with_offset(self, offset: FixedOffset) -> Self {
        self.with_zone(Zone::Fixed(offset))
    }

    pub fn set_ms(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn set(&self, time: DateTime<Utc>) {
        self.set_ms(time.timestamp_millis());
    }

    /// Move the clock by `delta_ms`. Negative values simulate a backward jump.
    pub fn advance_ms(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance_ms(secs.saturating_mul(1000));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn zone(&self) -> Zone {
        self.zone
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::at_ms(1_000);
        let handle = clock.clone();
        handle.advance_secs(5);
        assert_eq!(clock.now_ms(), 6_000);
        handle.advance_ms(-2_000);
        assert_eq!(clock.now_ms(), 4_000);
    }

    #[test]
    fn local_reading_applies_offset() {
        let start = Utc.with_ymd_and_hms(2026, 1, 10, 22, 30, 0).unwrap();
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let clock = ManualClock::at(start).with_offset(offset);
        let local = clock.zone().local_at(clock.now_ms()).unwrap();
        assert_eq!(local.format("%Y-%m-%d %H:%M").to_string(), "2026-01-11 00:30");
    }

    #[test]
    fn named_zone_follows_daylight_saving() {
        let berlin = Zone::Named(chrono_tz::Europe::Berlin);
        let winter = Utc.with_ymd_and_hms(2026, 3, 28, 12, 0, 0).unwrap();
        let summer = Utc.with_ymd_and_hms(2026, 3, 29, 12, 0, 0).unwrap();
        let hour = |ms: i64| berlin.local_at(ms).unwrap().format("%H").to_string();
        assert_eq!(hour(winter.timestamp_millis()), "13");
        assert_eq!(hour(summer.timestamp_millis()), "14");
    }

    #[test]
    fn resolve_reports_gaps_and_folds() {
        let berlin = Zone::Named(chrono_tz::Europe::Berlin);
        let at = |y, mo, d, h, mi| {
            chrono::NaiveDate::from_ymd_opt(y, mo, d)
                .unwrap()
                .and_hms_opt(h, mi, 0)
                .unwrap()
        };
        assert!(matches!(berlin.resolve(&at(2026, 3, 29, 2, 30)), LocalResult::None));
        assert!(matches!(
            berlin.resolve(&at(2026, 10, 25, 2, 30)),
            LocalResult::Ambiguous(_, _)
        ));
        assert!(matches!(berlin.resolve(&at(2026, 6, 1, 8, 0)), LocalResult::Single(_)));
    }

    #[test]
    fn system_clock_is_close_to_utc_now() {
        let diff = (SystemClock.now_ms() - Utc::now().timestamp_millis()).abs();
        assert!(diff < 1_000);
    }
}
