//! Time-of-day bandwidth shaping.
//!
//! Best-effort: a transfer asks [`SpeedThrottle::should_pause`] before each
//! buffered write and sleeps [`THROTTLE_PAUSE`] when it is running faster than
//! the ceiling inside the window. No token bucket, re-evaluated every chunk.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::sync::Arc;
use std::time::Duration;

/// Sleep applied when a chunk arrives above the ceiling.
pub const THROTTLE_PAUSE: Duration = Duration::from_millis(100);

pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Clock frozen at one instant (tests, dry runs).
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Today-independent clock at `hour:minute`.
    pub fn at(hour: u32, minute: u32) -> Option<Self> {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1)?;
        let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
        Some(Self(date.and_time(time)))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Daily `[start, end)` window; wraps past midnight when `end < start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl ThrottleWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.start == self.end {
            return false;
        }
        if self.start < self.end {
            self.start <= t && t < self.end
        } else {
            t >= self.start || t < self.end
        }
    }
}

impl Default for ThrottleWindow {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(20, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Parses `HH:MM:SS`, `HH:MM` or a bare hour `HH`.
pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .or_else(|_| NaiveTime::parse_from_str(&format!("{s}:00"), "%H:%M"))
        .ok()
}

/// Window policy plus the clock it is evaluated against. The enabled flag
/// and ceiling live in the monitor's dynamic config and are passed in.
#[derive(Clone)]
pub struct SpeedThrottle {
    window: ThrottleWindow,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SpeedThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeedThrottle")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl SpeedThrottle {
    pub fn new(window: ThrottleWindow) -> Self {
        Self::with_clock(window, Arc::new(SystemClock))
    }

    pub fn with_clock(window: ThrottleWindow, clock: Arc<dyn Clock>) -> Self {
        Self { window, clock }
    }

    /// Shaping is active: enabled and the clock is inside the window.
    pub fn is_active(&self, enabled: bool) -> bool {
        enabled && self.window.contains(self.clock.now().time())
    }

    /// Whether a transfer measured at `speed_mb` (MB/s) should sleep before its next write.
    pub fn should_pause(&self, enabled: bool, limit_mb: f64, speed_mb: f64) -> bool {
        limit_mb > 0.0 && speed_mb > limit_mb && self.is_active(enabled)
    }
}

impl Default for SpeedThrottle {
    fn default() -> Self {
        Self::new(ThrottleWindow::default())
    }
}
