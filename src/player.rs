use crate::audio::{LoopBuffer, LoopCursor};
use crate::fade::LoopFade;
use crate::NoiseResult;
use std::time::Duration;

/// Audio queued ahead of time when playback starts, so the device never starves
/// while the first UI frame is being produced.
pub const PRIME_TIME: Duration = Duration::from_millis(20);

/// Most audio a single `pump` may queue. Longer frames (a stall, a window drag) are
/// not caught up, so the backlog stays small.
pub const MAX_PUMP_SPAN: Duration = Duration::from_millis(100);

/// Where the looped samples go. Implemented over an SDL audio stream by the app,
/// and by recording mocks in tests.
pub trait AudioOutput {
    /// Starts or resumes playback of queued samples.
    fn resume(&mut self) -> NoiseResult<()>;
    /// Stops all output immediately.
    fn pause(&mut self) -> NoiseResult<()>;
    /// Queues interleaved stereo samples.
    fn push_samples(&mut self, samples: &[i16]) -> NoiseResult<()>;
    /// Drops every queued sample that has not been played yet.
    fn clear(&mut self) -> NoiseResult<()>;
}

/// Plays a `LoopBuffer` forever with no seam. The buffer is looped at the sample
/// level by a wrapping cursor, so there is no end-of-media event to react to.
pub struct LoopPlayer<O: AudioOutput> {
    output: O,
    buffer: LoopBuffer,
    cursor: LoopCursor,
    fade: Option<LoopFade>,
    playing: bool,
    /// Output volume, applied to every sample.
    pub gain: f32,
    pending_frames: f64,
    samples: Vec<i16>,
}

impl<O: AudioOutput> LoopPlayer<O> {
    pub fn new(output: O, buffer: LoopBuffer, gain: f32) -> Self {
        Self {
            output,
            buffer,
            cursor: LoopCursor::new(),
            fade: None,
            playing: false,
            gain,
            pending_frames: 0.0,
            samples: Vec::new(),
        }
    }

    /// Enables the loop boundary fade with the given lead time.
    pub fn with_fade(mut self, lead: Duration) -> Self {
        self.fade = Some(LoopFade::new(self.buffer.duration(), lead));
        self
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn buffer(&self) -> &LoopBuffer {
        &self.buffer
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn fade(&self) -> Option<&LoopFade> {
        self.fade.as_ref()
    }

    /// Starts playback at `now`. Returns false if already playing.
    pub fn play(&mut self, now: Duration) -> NoiseResult<bool> {
        if self.playing {
            return Ok(false);
        }
        // The queue is empty here, so the cursor is the first audible sample.
        let position = self.position();
        self.pending_frames = 0.0;
        self.queue(PRIME_TIME)?;
        self.output.resume()?;
        if let Some(fade) = &mut self.fade {
            fade.start(now, position);
        }
        self.playing = true;
        Ok(true)
    }

    /// Silences output, drops the queued backlog and cancels any pending fade.
    /// Returns false if already paused.
    pub fn pause(&mut self) -> NoiseResult<bool> {
        if !self.playing {
            return Ok(false);
        }
        self.output.pause()?;
        self.playing = false;
        if let Some(fade) = &mut self.fade {
            fade.cancel();
        }
        self.output.clear()?;
        Ok(true)
    }

    /// How far into the loop the cursor is.
    pub fn position(&self) -> Duration {
        let rate = self.buffer.sample_rate() as u128;
        if rate == 0 {
            return Duration::ZERO;
        }
        let nanos = self.cursor.position() as u128 * 1_000_000_000 / rate;
        Duration::from_nanos(nanos as u64)
    }

    /// Queues enough audio to cover `elapsed`, the duration of the last UI frame,
    /// up to `MAX_PUMP_SPAN`. Ideally you should call this only once per frame.
    pub fn pump(&mut self, elapsed: Duration) -> NoiseResult<()> {
        if !self.playing {
            return Ok(());
        }
        if elapsed > MAX_PUMP_SPAN {
            log::debug!(
                "Frame took {:.1}ms, queuing {}ms of audio",
                elapsed.as_secs_f64() * 1000.0,
                MAX_PUMP_SPAN.as_millis()
            );
            self.pending_frames = 0.0;
        }
        self.queue(elapsed.min(MAX_PUMP_SPAN))
    }

    /// Polls the fade timer, returning when a fade began.
    pub fn poll_fade(&mut self, now: Duration) -> Option<Duration> {
        self.fade.as_mut()?.poll(now)
    }

    /// Opacity of the black fade overlay at `now`.
    pub fn fade_opacity(&self, now: Duration) -> f32 {
        match &self.fade {
            Some(fade) if self.playing => fade.opacity(now),
            _ => 0.0,
        }
    }

    fn queue(&mut self, span: Duration) -> NoiseResult<()> {
        // Fractional frames are carried over so the stream does not drift.
        self.pending_frames += span.as_secs_f64() * self.buffer.sample_rate() as f64;
        let frames = self.pending_frames.floor();
        self.pending_frames -= frames;
        if frames < 1.0 {
            return Ok(());
        }
        self.samples.clear();
        self.cursor
            .fill(&self.buffer, frames as usize, self.gain, &mut self.samples);
        self.output.push_samples(&self.samples)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Call {
        Resume,
        Pause,
        Push(usize),
        Clear,
    }

    /// Records every call, shared so tests can inspect it after handing the output over.
    #[derive(Debug, Default, Clone)]
    pub(crate) struct MockOutput {
        pub calls: Rc<RefCell<Vec<Call>>>,
        pub running: Rc<RefCell<bool>>,
        /// Samples queued and not yet cleared.
        pub queued: Rc<RefCell<usize>>,
        pub fail_resume: Rc<RefCell<bool>>,
        pub fail_pause: Rc<RefCell<bool>>,
    }

    impl AudioOutput for MockOutput {
        fn resume(&mut self) -> NoiseResult<()> {
            self.calls.borrow_mut().push(Call::Resume);
            if *self.fail_resume.borrow() {
                return Err("device lost".into());
            }
            *self.running.borrow_mut() = true;
            Ok(())
        }

        fn pause(&mut self) -> NoiseResult<()> {
            self.calls.borrow_mut().push(Call::Pause);
            if *self.fail_pause.borrow() {
                return Err("device lost".into());
            }
            *self.running.borrow_mut() = false;
            Ok(())
        }

        fn push_samples(&mut self, samples: &[i16]) -> NoiseResult<()> {
            self.calls.borrow_mut().push(Call::Push(samples.len()));
            *self.queued.borrow_mut() += samples.len();
            Ok(())
        }

        fn clear(&mut self) -> NoiseResult<()> {
            self.calls.borrow_mut().push(Call::Clear);
            *self.queued.borrow_mut() = 0;
            Ok(())
        }
    }

    fn player(output: MockOutput) -> LoopPlayer<MockOutput> {
        let buffer = LoopBuffer::from_samples(vec![0.5; 1000], 1000);
        LoopPlayer::new(output, buffer, 1.0)
    }

    #[test]
    fn play_primes_before_resuming() {
        let output = MockOutput::default();
        let mut player = player(output.clone());
        assert!(player.play(Duration::ZERO).unwrap());
        // 20ms at 1kHz, stereo
        assert_eq!(*output.calls.borrow(), vec![Call::Push(40), Call::Resume]);
    }

    #[test]
    fn play_and_pause_are_idempotent() {
        let output = MockOutput::default();
        let mut player = player(output.clone());
        assert!(player.play(Duration::ZERO).unwrap());
        assert!(!player.play(Duration::ZERO).unwrap());
        assert!(player.pause().unwrap());
        assert!(!player.pause().unwrap());
        let calls = output.calls.borrow();
        assert_eq!(calls.iter().filter(|c| **c == Call::Resume).count(), 1);
        assert_eq!(calls.iter().filter(|c| **c == Call::Pause).count(), 1);
    }

    #[test]
    fn play_then_pause_leaves_output_silent() {
        let output = MockOutput::default();
        let mut player = player(output.clone());
        player.play(Duration::ZERO).unwrap();
        player.pause().unwrap();
        assert!(!*output.running.borrow());
        let before = output.calls.borrow().len();
        player.pump(Duration::from_millis(100)).unwrap();
        assert_eq!(output.calls.borrow().len(), before);
    }

    #[test]
    fn pump_carries_fractional_frames() {
        let output = MockOutput::default();
        let buffer = LoopBuffer::from_samples(vec![0.5; 8], 4);
        let mut player = LoopPlayer::new(output.clone(), buffer, 1.0);
        player.play(Duration::ZERO).unwrap();
        output.calls.borrow_mut().clear();
        // 1.5 frames per pump at 4Hz
        for _ in 0..4 {
            player.pump(Duration::from_millis(375)).unwrap();
        }
        let pushed: usize = output
            .calls
            .borrow()
            .iter()
            .map(|c| match c {
                Call::Push(n) => *n,
                _ => 0,
            })
            .sum();
        assert_eq!(pushed, 6 * 2);
    }

    #[test]
    fn fade_follows_playback() {
        let output = MockOutput::default();
        let mut player = player(output).with_fade(Duration::from_millis(400));
        assert_eq!(player.poll_fade(Duration::from_secs(5)), None);
        player.play(Duration::ZERO).unwrap();
        assert_eq!(
            player.poll_fade(Duration::from_millis(600)),
            Some(Duration::from_millis(600))
        );
        assert!(player.fade_opacity(Duration::from_millis(1000)) > 0.99);
        player.pause().unwrap();
        assert_eq!(player.fade_opacity(Duration::from_millis(1000)), 0.0);
        assert_eq!(player.poll_fade(Duration::from_millis(1600)), None);
    }

    #[test]
    fn pause_drops_the_backlog() {
        let output = MockOutput::default();
        let mut player = player(output.clone());
        for _ in 0..100 {
            player.play(Duration::ZERO).unwrap();
            player.pause().unwrap();
        }
        assert_eq!(*output.queued.borrow(), 0);
        player.play(Duration::ZERO).unwrap();
        // Only the 20ms prime, stereo at 1kHz.
        assert_eq!(*output.queued.borrow(), 40);
    }

    #[test]
    fn long_frames_are_not_caught_up() {
        let output = MockOutput::default();
        let mut player = player(output.clone());
        player.play(Duration::ZERO).unwrap();
        player.pump(Duration::from_secs(10)).unwrap();
        // 20ms prime plus at most 100ms, stereo at 1kHz.
        assert!(*output.queued.borrow() <= 240);
    }

    #[test]
    fn resuming_mid_loop_keeps_the_fade_on_the_boundary() {
        let output = MockOutput::default();
        let mut player = player(output).with_fade(Duration::from_millis(400));
        player.play(Duration::ZERO).unwrap();
        player.pump(Duration::from_millis(250)).unwrap();
        player.pump(Duration::from_millis(250)).unwrap();
        player.pause().unwrap();
        // The 20ms prime and two pumps.
        assert_eq!(player.position(), Duration::from_millis(520));
        player.play(Duration::from_secs(2)).unwrap();
        // 480ms left in the loop, minus the 400ms lead.
        let fade = player.fade().unwrap();
        assert_eq!(fade.next_fade(), Some(Duration::from_millis(2080)));
        player.poll_fade(Duration::from_millis(2080));
        assert!(player.fade_opacity(Duration::from_millis(2480)) > 0.99);
    }

    #[test]
    fn failed_pause_keeps_playing_and_can_be_retried() {
        let output = MockOutput::default();
        let mut player = player(output.clone());
        player.play(Duration::ZERO).unwrap();
        *output.fail_pause.borrow_mut() = true;
        assert!(player.pause().is_err());
        assert!(player.is_playing());
        *output.fail_pause.borrow_mut() = false;
        assert!(player.pause().unwrap());
        assert!(!player.is_playing());
        let pauses = output.calls.borrow().iter().filter(|c| **c == Call::Pause).count();
        assert_eq!(pauses, 2);
    }
}
