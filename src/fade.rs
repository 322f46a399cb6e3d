use crate::timer::RepeatingTimer;
use std::time::Duration;

/// How long before the loop boundary the fade to black begins.
pub const DEFAULT_FADE_LEAD: Duration = Duration::from_millis(400);

/// Blacks out the screen around each loop boundary to hide the seam.
///
/// After `start`, the first fade begins `lead` before the next loop boundary and
/// repeats every `loop_duration`. The overlay reaches full opacity exactly at the boundary and
/// clears again `lead` later.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopFade {
    lead: Duration,
    timer: RepeatingTimer,
    fade_started: Option<Duration>,
}

impl LoopFade {
    pub fn new(loop_duration: Duration, lead: Duration) -> Self {
        Self {
            lead: lead.min(loop_duration),
            timer: RepeatingTimer::new(loop_duration),
            fade_started: None,
        }
    }

    pub fn loop_duration(&self) -> Duration {
        self.timer.period()
    }

    pub fn lead(&self) -> Duration {
        self.lead
    }

    pub fn is_active(&self) -> bool {
        self.timer.is_valid()
    }

    /// Called when playback starts (or resumes) at `now`, with `position` being how far
    /// into the loop the first audible sample is.
    pub fn start(&mut self, now: Duration, position: Duration) {
        let duration = self.loop_duration();
        let remaining = duration.saturating_sub(position);
        self.fade_started = None;
        match remaining.checked_sub(self.lead) {
            Some(delay) => self.timer.schedule(now, delay),
            None => {
                // Already inside the lead window of the coming boundary.
                self.fade_started = (now + remaining).checked_sub(self.lead);
                self.timer.schedule(now, remaining + duration - self.lead);
            }
        }
    }

    /// Stops all pending fades and clears the overlay. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        self.timer.invalidate();
        self.fade_started = None;
    }

    /// When the next fade will begin, if playing.
    pub fn next_fade(&self) -> Option<Duration> {
        self.timer.next_due()
    }

    /// Returns the start time of a fade that began since the last poll.
    pub fn poll(&mut self, now: Duration) -> Option<Duration> {
        let began = self.timer.poll(now)?;
        self.fade_started = Some(began);
        log::trace!("Loop fade at {:.3}s", began.as_secs_f64());
        Some(began)
    }

    /// Black overlay opacity in [0, 1] at `now`.
    pub fn opacity(&self, now: Duration) -> f32 {
        let Some(start) = self.fade_started else {
            return 0.0;
        };
        if self.lead.is_zero() || now < start {
            return 0.0;
        }
        let t = (now - start).as_secs_f32() / self.lead.as_secs_f32();
        if t < 1.0 {
            t
        } else if t < 2.0 {
            2.0 - t
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn first_fade_is_lead_before_boundary_then_every_loop() {
        let mut fade = LoopFade::new(ms(3000), DEFAULT_FADE_LEAD);
        fade.start(ms(10000), Duration::ZERO);
        assert_eq!(fade.poll(ms(12500)), None);
        assert_eq!(fade.poll(ms(12600)), Some(ms(12600)));
        assert_eq!(fade.poll(ms(13000)), None);
        assert_eq!(fade.next_fade(), Some(ms(15600)));
    }

    #[test]
    fn overlay_ramps_to_black_at_boundary_and_back() {
        let mut fade = LoopFade::new(ms(1000), ms(400));
        fade.start(Duration::ZERO, Duration::ZERO);
        assert_eq!(fade.opacity(ms(500)), 0.0);
        fade.poll(ms(600));
        assert!((fade.opacity(ms(800)) - 0.5).abs() < 1e-4);
        assert!((fade.opacity(ms(1000)) - 1.0).abs() < 1e-4);
        assert!((fade.opacity(ms(1200)) - 0.5).abs() < 1e-4);
        assert_eq!(fade.opacity(ms(1500)), 0.0);
    }

    #[test]
    fn cancel_is_synchronous_and_idempotent() {
        let mut fade = LoopFade::new(ms(2000), DEFAULT_FADE_LEAD);
        fade.start(Duration::ZERO, Duration::ZERO);
        fade.poll(ms(1600));
        fade.cancel();
        fade.cancel();
        assert!(!fade.is_active());
        assert_eq!(fade.opacity(ms(1800)), 0.0);
        assert_eq!(fade.poll(ms(3600)), None);
    }

    #[test]
    fn lead_longer_than_loop_is_clamped() {
        let mut fade = LoopFade::new(ms(200), ms(400));
        assert_eq!(fade.lead(), ms(200));
        fade.start(Duration::ZERO, Duration::ZERO);
        assert_eq!(fade.poll(Duration::ZERO), Some(Duration::ZERO));
    }

    #[test]
    fn resuming_mid_loop_aims_at_the_next_boundary() {
        let mut fade = LoopFade::new(ms(1000), ms(400));
        // Resumed half way through the loop: the boundary is 500ms away.
        fade.start(ms(2000), ms(500));
        assert_eq!(fade.next_fade(), Some(ms(2100)));
        assert_eq!(fade.poll(ms(2100)), Some(ms(2100)));
        assert!((fade.opacity(ms(2500)) - 1.0).abs() < 1e-4);
        assert_eq!(fade.next_fade(), Some(ms(3100)));
    }

    #[test]
    fn resuming_inside_the_lead_window_is_already_fading() {
        let mut fade = LoopFade::new(ms(1000), ms(400));
        // 200ms to the boundary, so the fade began 200ms ago.
        fade.start(ms(5000), ms(800));
        assert!((fade.opacity(ms(5000)) - 0.5).abs() < 1e-4);
        assert!((fade.opacity(ms(5200)) - 1.0).abs() < 1e-4);
        assert_eq!(fade.next_fade(), Some(ms(5800)));
    }
}
