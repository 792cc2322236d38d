//! Time remaining until the ceremony

use time::OffsetDateTime;

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: i64 = 24 * SECS_PER_HOUR;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeLeft {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl TimeLeft {
    /// Whole units until `target`; all zero once `target` has passed
    pub fn until(target: OffsetDateTime, now: OffsetDateTime) -> Self {
        let remaining = (target - now).whole_seconds();
        if remaining <= 0 {
            return Self::default();
        }

        Self {
            days: remaining / SECS_PER_DAY,
            hours: (remaining % SECS_PER_DAY) / SECS_PER_HOUR,
            minutes: (remaining % SECS_PER_HOUR) / SECS_PER_MINUTE,
            seconds: remaining % SECS_PER_MINUTE,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    pub fn units(&self) -> [(&'static str, i64); 4] {
        [("Days", self.days), ("Hours", self.hours), ("Minutes", self.minutes), ("Seconds", self.seconds)]
    }
}

impl std::fmt::Display for TimeLeft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}d {:02}h {:02}m {:02}s", self.days, self.hours, self.minutes, self.seconds)
    }
}
