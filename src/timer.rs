use std::time::Duration;

/// A repeating timer driven by an external monotonic clock.
///
/// Nothing fires on its own: the frame loop calls [`RepeatingTimer::poll`] with the
/// current time. Missed ticks are coalesced into a single firing, since every tick
/// consumer in this crate is stateless.
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatingTimer {
    period: Duration,
    next_due: Option<Duration>,
}

impl RepeatingTimer {
    /// Creates an invalidated timer. Call `schedule` to arm it.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_due: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Arms the timer so the first tick lands at `now + first_delay`, replacing any
    /// pending schedule.
    pub fn schedule(&mut self, now: Duration, first_delay: Duration) {
        self.next_due = Some(now + first_delay);
    }

    /// Stops the timer. Invalidating an invalid timer is a no-op.
    pub fn invalidate(&mut self) {
        self.next_due = None;
    }

    pub fn is_valid(&self) -> bool {
        self.next_due.is_some()
    }

    /// When the next tick is due, if armed.
    pub fn next_due(&self) -> Option<Duration> {
        self.next_due
    }

    /// Returns the time of the tick that fired, or None. Re-arms at the next
    /// multiple of the period strictly after `now`.
    pub fn poll(&mut self, now: Duration) -> Option<Duration> {
        let due = self.next_due?;
        if due > now {
            return None;
        }
        let period = self.period.as_nanos();
        if period == 0 {
            self.next_due = Some(now + Duration::from_nanos(1));
            return Some(due);
        }
        // Report the most recent scheduled tick, not the first missed one.
        let missed = (now - due).as_nanos() / period;
        let fired = Duration::from_nanos((due.as_nanos() + period * missed) as u64);
        self.next_due = Some(fired + self.period);
        Some(fired)
    }
}
