use std::time::Duration;

/// Default redraw period for `Cadence::FixedInterval`, roughly 60Hz.
pub const DEFAULT_REDRAW_INTERVAL: Duration = Duration::from_millis(16);

/// How often the static is regenerated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cadence {
    /// Redraws on every presented frame, tied to the display refresh.
    DisplayRefresh,
    /// Redraws from a repeating timer with the given period.
    FixedInterval(Duration),
}

impl Default for Cadence {
    fn default() -> Self {
        Cadence::FixedInterval(DEFAULT_REDRAW_INTERVAL)
    }
}

impl Cadence {
    /// The timer period, or None when redraws follow the display.
    pub fn period(&self) -> Option<Duration> {
        match self {
            Cadence::DisplayRefresh => None,
            Cadence::FixedInterval(period) => Some(*period),
        }
    }
}
