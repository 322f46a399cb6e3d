use rand::Rng;
use std::time::Duration;

/// Mix rate used for the synthesized loop.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// A single audio sample, with left and right channels.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StereoFrame {
    pub left: i16,
    pub right: i16,
}

impl StereoFrame {
    /// Same value on both channels.
    pub fn mono(value: i16) -> Self {
        Self {
            left: value,
            right: value,
        }
    }
}

/// Converts a sample in [-1, 1] to signed 16 bit, clamping anything outside.
#[inline(always)]
pub fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// An immutable mono buffer that is played back over and over.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl LoopBuffer {
    /// White noise: `frames` independent uniform samples in [-1, 1].
    pub fn white_noise<R: Rng>(sample_rate: u32, frames: usize, rng: &mut R) -> Self {
        let samples = (0..frames).map(|_| rng.gen_range(-1.0..=1.0)).collect();
        Self {
            samples,
            sample_rate,
        }
    }

    /// Wraps decoded samples, clamping them to [-1, 1].
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Self {
        let samples = samples.into_iter().map(|s| s.clamp(-1.0, 1.0)).collect();
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length of one loop cycle.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Read position into a `LoopBuffer`. Wraps around at the end of the buffer, so
/// consecutive fills are continuous across the loop boundary.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LoopCursor {
    position: usize,
}

impl LoopCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Appends `frames` interleaved stereo frames to `out`, scaled by `gain`.
    /// An empty buffer produces silence.
    pub fn fill(&mut self, buffer: &LoopBuffer, frames: usize, gain: f32, out: &mut Vec<i16>) {
        out.reserve(frames * 2);
        if buffer.is_empty() {
            out.extend(std::iter::repeat(0).take(frames * 2));
            return;
        }
        for _ in 0..frames {
            let frame = StereoFrame::mono(to_i16(buffer.samples[self.position] * gain));
            out.push(frame.left);
            out.push(frame.right);
            self.position += 1;
            if self.position == buffer.len() {
                self.position = 0;
            }
        }
    }
}
