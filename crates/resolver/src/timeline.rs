use catalog::ServiceId;
use chrono::{DateTime, Duration, Timelike, Utc};

use crate::clock::Clock;

pub const MIN_OFFSET_HOURS: i64 = -48;
pub const MAX_OFFSET_HOURS: i64 = 48;

/// User-chosen time offset in whole hours from "now", clamped to ±48.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOffset(i64);

impl TimeOffset {
    pub const LIVE: TimeOffset = TimeOffset(0);

    pub fn new(hours: i64) -> Self {
        Self(hours.clamp(MIN_OFFSET_HOURS, MAX_OFFSET_HOURS))
    }

    pub fn hours(self) -> i64 {
        self.0
    }

    pub fn is_live(self) -> bool {
        self.0 == 0
    }
}

/// Derives the ISO-8601 timestamp the layer resolver consumes.
///
/// - live + near-real-time service: back off 60 minutes of publication lag,
///   then floor the minute to a quarter hour.
/// - live otherwise: floor the current hour to a 3-hour step.
/// - any non-zero offset: shift the wall clock by the offset, then floor the
///   hour to a 3-hour step. Flooring commutes with day rollover because 24
///   is a multiple of 3.
///
/// Output is always `YYYY-MM-DDTHH:MM:SSZ`, seconds zeroed.
pub fn derive_timestamp(clock: &impl Clock, offset: TimeOffset, service: ServiceId) -> String {
    let now = clock.now_utc();
    if offset.is_live() && service == ServiceId::NearRealTime {
        let lagged = now - Duration::minutes(60);
        let minute = lagged.minute() - lagged.minute() % 15;
        return format!(
            "{}T{:02}:{:02}:00Z",
            lagged.format("%Y-%m-%d"),
            lagged.hour(),
            minute
        );
    }

    let shifted = now + Duration::hours(offset.hours());
    format_floored_3h(shifted)
}

fn format_floored_3h(t: DateTime<Utc>) -> String {
    let hour = t.hour() - t.hour() % 3;
    format!("{}T{:02}:00:00Z", t.format("%Y-%m-%d"), hour)
}

/// Play-mode stepping: advance by the category step and wrap past the end of
/// the window back to the 24-hour archive mark.
pub fn advance_for_play(offset: TimeOffset, step_hours: i64) -> TimeOffset {
    let next = offset.hours() + step_hours;
    if next > MAX_OFFSET_HOURS {
        TimeOffset::new(-24)
    } else {
        TimeOffset::new(next)
    }
}
