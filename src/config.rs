use crate::audio::DEFAULT_SAMPLE_RATE;
use crate::fade::DEFAULT_FADE_LEAD;
use crate::media::LoopMedia;
use crate::noise::{Flicker, NoiseRenderer, Viewport, DEFAULT_CELL_SIZE};
use crate::timing::Cadence;
use std::time::Duration;

/// Everything the app needs to know before it opens a window.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Window title.
    pub title: String,
    /// Initial window size in logical pixels.
    pub viewport: Viewport,
    /// Edge length of a static cell.
    pub cell_size: u32,
    pub flicker: Flicker,
    pub cadence: Cadence,
    /// The looped audio asset.
    pub media: LoopMedia,
    /// Lead time of the loop boundary fade. None disables it.
    pub fade_lead: Option<Duration>,
    /// Output volume in [0, 1].
    pub gain: f32,
    /// Upper bound on presented frames per second.
    pub frame_limit: Option<f64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: String::from("White Noise Now"),
            viewport: Viewport::new(390, 844),
            cell_size: DEFAULT_CELL_SIZE,
            flicker: Flicker::ANALOG,
            cadence: Cadence::default(),
            media: LoopMedia::Synthesized {
                sample_rate: DEFAULT_SAMPLE_RATE,
                frames: DEFAULT_SAMPLE_RATE as usize,
            },
            fade_lead: None,
            gain: 0.25,
            frame_limit: Some(120.0),
        }
    }
}

impl Config {
    /// Turns on the loop boundary fade with the default lead time.
    pub fn with_fade(mut self) -> Self {
        self.fade_lead = Some(DEFAULT_FADE_LEAD);
        self
    }

    pub fn renderer(&self) -> NoiseRenderer {
        NoiseRenderer::new(self.cell_size, self.flicker)
    }
}
