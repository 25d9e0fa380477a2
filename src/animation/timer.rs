use web_time::{Duration, Instant};

/// Identifies one armed playback timer.
///
/// Every (re)start of playback allocates a fresh id, so a callback that
/// still holds an old id can be recognised and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// A repeating interval timer driven by the host's clock.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    id: TimerId,
    interval: Duration,
    last_fire: Instant,
}

impl IntervalTimer {
    /// Arm a timer whose first expiry is `interval` after `now`.
    #[must_use]
    pub fn new(id: TimerId, interval: Duration, now: Instant) -> Self {
        Self {
            id,
            interval,
            last_fire: now,
        }
    }

    /// This timer's id.
    #[must_use]
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Configured interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the interval has elapsed since the last expiry.
    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_fire) >= self.interval
    }

    /// Record an expiry at `now`; the next one is an interval later.
    pub fn rearm(&mut self, now: Instant) {
        self.last_fire = now;
    }
}
