use anyhow::{Context, Result};
use chrono::{NaiveTime, Timelike};

/// Daily time-of-day interval during which motion analysis runs.
///
/// Comparisons are at minute granularity, matching the `"HH:MM"`
/// configuration keys. A window whose start is later than its end wraps past
/// midnight: `"22:00"`-`"05:00"` is active from 22:00 through 05:00 the next
/// morning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl DetectionWindow {
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let start = NaiveTime::parse_from_str(start, "%H:%M")
            .with_context(|| format!("invalid window start {start:?}, expected HH:MM"))?;
        let end = NaiveTime::parse_from_str(end, "%H:%M")
            .with_context(|| format!("invalid window end {end:?}, expected HH:MM"))?;
        Ok(Self { start, end })
    }

    /// Whether detection is active at the given wall-clock time-of-day.
    pub fn contains(&self, now: NaiveTime) -> bool {
        // Truncate to the minute so 17:00:42 still falls inside a window
        // that ends at 17:00.
        let now = NaiveTime::from_hms_opt(now.hour(), now.minute(), 0).unwrap_or(now);

        if self.start <= self.end {
            self.start <= now && now <= self.end
        } else {
            now >= self.start || now <= self.end
        }
    }
}
