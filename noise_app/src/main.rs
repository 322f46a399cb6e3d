//! Full screen TV static with looping white noise. Tap, click or press Space to
//! turn the noise off and on again.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tv_static::*;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Refresh {
    /// Regenerate on every presented frame.
    Display,
    /// Regenerate from a fixed interval timer.
    Fixed,
}

#[derive(Debug, Parser)]
#[command(name = "noise_app")]
#[command(about = "TV static and white noise, toggled by a tap")]
struct Cli {
    #[arg(long, default_value_t = 390)]
    width: u32,
    #[arg(long, default_value_t = 844)]
    height: u32,
    #[arg(long = "cell-size", default_value_t = DEFAULT_CELL_SIZE)]
    cell_size: u32,
    /// Change every cell on every redraw instead of the analog flicker.
    #[arg(long)]
    no_flicker: bool,
    #[arg(long, value_enum, default_value_t = Refresh::Fixed)]
    refresh: Refresh,
    #[arg(long = "interval-ms", default_value_t = 16)]
    interval_ms: u64,
    /// Loop this WAV file instead of synthesized noise.
    #[arg(long)]
    wav: Option<PathBuf>,
    /// Fade to black around each loop boundary.
    #[arg(long)]
    fade: bool,
    #[arg(long = "fade-lead-ms", default_value_t = 400)]
    fade_lead_ms: u64,
    #[arg(long, default_value_t = 0.25)]
    gain: f32,
    /// Log the frame rate every second.
    #[arg(long)]
    fps: bool,
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config {
            viewport: Viewport::new(self.width, self.height),
            cell_size: self.cell_size,
            gain: self.gain.clamp(0.0, 1.0),
            ..Config::default()
        };
        if self.no_flicker {
            config.flicker = Flicker::Always;
        }
        config.cadence = match self.refresh {
            Refresh::Display => Cadence::DisplayRefresh,
            Refresh::Fixed => Cadence::FixedInterval(Duration::from_millis(self.interval_ms)),
        };
        if let Some(path) = &self.wav {
            config.media = LoopMedia::Wav(path.clone());
        }
        if self.fade {
            config.fade_lead = Some(Duration::from_millis(self.fade_lead_ms));
        }
        config
    }
}

// The library reports errors as Box<dyn Error>, which anyhow can't wrap directly.
fn sdl<T>(result: NoiseResult<T>) -> Result<T> {
    result.map_err(|e| anyhow!("{e}"))
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    // Fail before any window or device is opened.
    config
        .media
        .check()
        .context("the loop asset is required at startup")?;

    configure_audio_session();

    let mut rng = ChaCha8Rng::from_entropy();
    let buffer = config.media.load(&mut rng)?;

    let mut app = sdl(App::new(&config.title, config.viewport))?;
    app.frame_limit = config.frame_limit;
    if cli.fps {
        app.print_fps_interval = Some(1.0);
    }

    let output = sdl(app.open_audio(buffer.sample_rate()))?;
    let mut player = LoopPlayer::new(output, buffer, config.gain);
    if let Some(lead) = config.fade_lead {
        player = player.with_fade(lead);
    }

    let mut controller = ToggleController::new(
        config.renderer(),
        config.cadence,
        player,
        rng,
        app.viewport(),
    );
    sdl(controller.launch(app.time()))?;

    while !app.quit_requested {
        sdl(app.frame_start())?;
        let now = app.time();
        for gesture in app.gestures().collect::<Vec<_>>() {
            let transition = sdl(controller.handle(gesture, now))?;
            log::info!("Noise {:?}", transition.state);
        }
        sdl(controller.update(now, app.elapsed(), app.viewport()))?;
        if let Some(frame) = controller.frame() {
            sdl(app.pixel_buffer_update(|buffer: &mut [u8], pitch: usize| {
                frame.paint_rgb24(buffer, pitch)
            }))?;
            sdl(app.pixel_buffer_present())?;
            sdl(app.overlay_present(controller.overlay_opacity(now)))?;
        }
        // Always call "start" and "finish" frame!
        sdl(app.frame_finish())?;
    }
    Ok(())
}
