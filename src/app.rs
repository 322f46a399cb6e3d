use crate::controller::Gesture;
use crate::noise::{fill_black, Viewport};
use crate::player::AudioOutput;
use crate::NoiseResult;
use sdl3::audio::{AudioFormat, AudioSpec, AudioStreamOwner};
use sdl3::pixels::PixelFormat;
use sdl3::sys::pixels::SDL_PixelFormat;
use sdl3::{
    event::{Event, WindowEvent},
    keyboard::Keycode,
    render::{BlendMode, Canvas, ScaleMode, Texture, TextureCreator},
    video::{Window, WindowContext},
    EventPump, Sdl,
};
use smooth_buffer::SmoothBuffer;
use std::time::{Duration, Instant};

/// Asks the platform to keep playing when the device is in silent mode, and to follow
/// wireless and Bluetooth routing. Must run before `App::new`. Returns false if the
/// hint was rejected; playback then uses the default routing.
pub fn configure_audio_session() -> bool {
    let accepted = sdl3::hint::set("SDL_AUDIO_CATEGORY", "playback");
    if !accepted {
        log::warn!("Audio session: playback category rejected, using default routing");
    }
    accepted
}

/// Provides SDL initialization and stores the SDL context and its associated data.
/// The window is covered by a streaming RGB24 pixel buffer that always matches the
/// window's logical size, so one buffer pixel is one logical unit of the static.
pub struct App {
    /// Set to true to quit App on the next update.
    pub quit_requested: bool,
    /// Minimum sleep time when limiting fps. The smaller it is, the more accurate it will be,
    /// but some platforms (Windows...) seem to struggle with that.
    pub idle_increments_microsecs: u64,
    /// Logs the current FPS value every f32 seconds.
    pub print_fps_interval: Option<f32>,
    /// Upper bound on frames per second. None presents as fast as possible.
    pub frame_limit: Option<f64>,
    // SDL
    /// The internal SDL canvas. It is automatically cleared to black on every frame start.
    pub canvas: Canvas<Window>,
    /// The internal SDL texture creator associated with the canvas.
    pub texture_creator: TextureCreator<WindowContext>,
    /// The internal SDL context.
    pub context: Sdl,
    /// Cache for the event pump
    pub events: EventPump,
    pixel_buffer: Texture,
    viewport: Viewport,
    gestures: Vec<Gesture>,
    // Timing
    app_time: Instant,
    last_second: Instant,
    frame_start: Instant,
    update_time_buffer: SmoothBuffer<60, f64>,
    elapsed: Duration,
}

impl App {
    /// Returns a result containing a new App with a window of the given logical size.
    pub fn new(name: &str, viewport: Viewport) -> NoiseResult<App> {
        let context = sdl3::init()?;

        let video_subsystem = context.video()?;
        let window = video_subsystem
            .window(name, viewport.width.max(1), viewport.height.max(1))
            .high_pixel_density()
            .position_centered()
            .resizable()
            .build()?;

        let canvas = window.into_canvas();
        let texture_creator = canvas.texture_creator();
        let pixel_buffer = create_pixel_buffer(&texture_creator, viewport)?;
        let events = context.event_pump()?;

        log::info!(
            "Window \"{}\" opened at {}x{}",
            name,
            viewport.width,
            viewport.height
        );

        Ok(Self {
            quit_requested: false,
            idle_increments_microsecs: 100,
            print_fps_interval: None,
            frame_limit: Some(120.0),
            canvas,
            texture_creator,
            context,
            events,
            pixel_buffer,
            viewport,
            gestures: Vec::with_capacity(4),
            app_time: Instant::now(),
            last_second: Instant::now(),
            frame_start: Instant::now(),
            update_time_buffer: SmoothBuffer::pre_filled(1.0 / 120.0),
            elapsed: Duration::ZERO,
        })
    }

    /// Opens a stereo, 16 bit playback stream at the given mix rate. The stream starts paused.
    pub fn open_audio(&self, sample_rate: u32) -> NoiseResult<SdlAudio> {
        let spec = AudioSpec {
            freq: Some(sample_rate as i32),
            channels: Some(2),
            format: Some(AudioFormat::s16_sys()),
        };
        let audio_subsystem = self.context.audio()?;
        let device = audio_subsystem.open_playback_device(&spec)?;
        let mut stream = device.open_device_stream(Some(&spec))?;
        stream.pause()?;
        log::info!("Audio stream opened at {}Hz", sample_rate);
        Ok(SdlAudio { stream })
    }

    /// The logical window size, which is also the pixel buffer size.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Time since the start of the app
    pub fn time(&self) -> Duration {
        self.app_time.elapsed()
    }

    /// Duration of the last whole frame, without smoothing.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// How long the frame took to update before presenting the canvas.
    pub fn update_time(&self) -> f64 {
        self.update_time_buffer.average()
    }

    /// The current frame rate.
    pub fn fps(&self) -> f64 {
        1.0 / self.elapsed.as_secs_f64().max(f64::EPSILON)
    }

    /// Gestures collected by the last `frame_start`.
    pub fn gestures(&mut self) -> std::vec::Drain<'_, Gesture> {
        self.gestures.drain(..)
    }

    /// Required at the start of a frame loop: performs timing math, turns input
    /// events into gestures, follows window resizes and clears the canvas.
    pub fn frame_start(&mut self) -> NoiseResult<()> {
        self.elapsed = self.frame_start.elapsed();
        self.frame_start = Instant::now();

        self.gestures.clear();
        let mut resized = false;
        for event in self.events.poll_iter() {
            match event {
                // Touches arrive as synthesized mouse events.
                Event::MouseButtonUp { .. } => self.gestures.push(Gesture::Release),
                Event::KeyDown {
                    keycode,
                    repeat: false,
                    ..
                } => match keycode {
                    Some(Keycode::Space) | Some(Keycode::Return) => {
                        self.gestures.push(Gesture::Tap)
                    }
                    Some(Keycode::Escape) => self.quit_requested = true,
                    _ => {} // ignore the rest
                },
                Event::Window {
                    win_event: WindowEvent::Resized(..),
                    ..
                } => resized = true,
                Event::Quit { .. } => self.quit_requested = true,
                _ => {}
            }
        }

        if resized {
            let (width, height) = self.canvas.window().size();
            let viewport = Viewport::new(width, height);
            if viewport != self.viewport && width > 0 && height > 0 {
                let buffer = create_pixel_buffer(&self.texture_creator, viewport)?;
                let old = std::mem::replace(&mut self.pixel_buffer, buffer);
                // Textures are not freed on drop with "unsafe_textures".
                unsafe { old.destroy() };
                self.viewport = viewport;
                log::debug!("Viewport resized to {}x{}", width, height);
            }
        }

        self.canvas.set_draw_color((0, 0, 0, 255));
        self.canvas.clear();
        Ok(())
    }

    /// Uses SDL's "texture.with_lock" function to access the pixel buffer as an RGB array.
    pub fn pixel_buffer_update<F, R>(&mut self, func: F) -> NoiseResult<()>
    where
        F: FnOnce(&mut [u8], usize) -> R,
    {
        self.pixel_buffer.with_lock(None, func)?;
        Ok(())
    }

    /// Stretches the pixel buffer over the whole window.
    pub fn pixel_buffer_present(&mut self) -> NoiseResult<()> {
        self.canvas.copy(&self.pixel_buffer, None, None)?;
        Ok(())
    }

    /// Draws a black rectangle over the whole window with the given opacity.
    pub fn overlay_present(&mut self, opacity: f32) -> NoiseResult<()> {
        if opacity <= 0.0 {
            return Ok(());
        }
        let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        self.canvas.set_blend_mode(BlendMode::Blend);
        self.canvas.set_draw_color((0, 0, 0, alpha));
        self.canvas.fill_rect(None)?;
        self.canvas.set_blend_mode(BlendMode::None);
        Ok(())
    }

    /// Required to be called at the end of a frame loop. Presents the canvas and performs an idle wait
    /// if frame rate limiting is required.
    pub fn frame_finish(&mut self) -> NoiseResult<()> {
        if self.app_time.elapsed().as_secs_f32() > 0.5 {
            // Skips the first frames
            self.update_time_buffer
                .push(self.frame_start.elapsed().as_secs_f64());
        }

        self.canvas.present();

        if let Some(fps_limit) = self.frame_limit {
            const LARGE_STEP: f64 = 1.0 / 1000.0; // 1ms
            let small_step = self.idle_increments_microsecs as f64 / 1_000_000.0;
            let target_time = 1.0 / fps_limit;
            loop {
                let diff = target_time - self.frame_start.elapsed().as_secs_f64();
                if diff > LARGE_STEP {
                    std::thread::sleep(Duration::from_secs_f64(LARGE_STEP));
                } else if diff > small_step {
                    std::thread::sleep(Duration::from_secs_f64(small_step));
                } else {
                    break;
                }
            }
        }

        if let Some(interval) = self.print_fps_interval {
            if self.last_second.elapsed().as_secs_f32() > interval {
                self.last_second = Instant::now();
                log::info!(
                    "FPS: {:.1}, update: {:.2}ms",
                    self.fps(),
                    self.update_time() * 1000.0
                );
            }
        }

        Ok(())
    }
}

fn create_pixel_buffer(
    texture_creator: &TextureCreator<WindowContext>,
    viewport: Viewport,
) -> NoiseResult<Texture> {
    let mut texture = texture_creator.create_texture_streaming(
        unsafe { PixelFormat::from_ll(SDL_PixelFormat::RGB24) },
        viewport.width.max(1),
        viewport.height.max(1),
    )?;
    texture.set_scale_mode(ScaleMode::Nearest);
    texture.with_lock(None, |buffer: &mut [u8], _pitch: usize| fill_black(buffer))?;
    Ok(texture)
}

/// Plays queued samples through an SDL audio stream.
pub struct SdlAudio {
    stream: AudioStreamOwner,
}

impl AudioOutput for SdlAudio {
    fn resume(&mut self) -> NoiseResult<()> {
        self.stream.resume()?;
        Ok(())
    }

    fn pause(&mut self) -> NoiseResult<()> {
        self.stream.pause()?;
        Ok(())
    }

    fn push_samples(&mut self, samples: &[i16]) -> NoiseResult<()> {
        self.stream.put_data_i16(samples)?;
        Ok(())
    }

    fn clear(&mut self) -> NoiseResult<()> {
        self.stream.clear()?;
        Ok(())
    }
}
