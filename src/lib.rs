#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

mod audio;
mod config;
mod controller;
mod fade;
mod media;
mod noise;
mod player;
mod timer;
mod timing;

pub use audio::{to_i16, LoopBuffer, LoopCursor, StereoFrame, DEFAULT_SAMPLE_RATE};
pub use config::Config;
pub use controller::{Gesture, PlaybackState, Step, ToggleController, Transition};
pub use fade::{LoopFade, DEFAULT_FADE_LEAD};
pub use media::{LoopMedia, MediaError};
pub use noise::{fill_black, Flicker, NoiseFrame, NoiseRenderer, Viewport, DEFAULT_CELL_SIZE};
pub use player::{AudioOutput, LoopPlayer, MAX_PUMP_SPAN, PRIME_TIME};
pub use timer::RepeatingTimer;
pub use timing::{Cadence, DEFAULT_REDRAW_INTERVAL};

#[cfg(feature = "sdl")]
mod app;
#[cfg(feature = "sdl")]
pub use app::{configure_audio_session, App, SdlAudio};
#[cfg(feature = "sdl")]
pub use sdl3;

pub type NoiseResult<T> = Result<T, Box<dyn std::error::Error>>;
