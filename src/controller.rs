use crate::noise::{NoiseFrame, NoiseRenderer, Viewport};
use crate::player::{AudioOutput, LoopPlayer};
use crate::timer::RepeatingTimer;
use crate::timing::Cadence;
use crate::NoiseResult;
use rand::Rng;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// "Noise is on". Starts `On` at launch, never persisted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Off,
    #[default]
    On,
}

impl PlaybackState {
    pub fn toggled(self) -> Self {
        match self {
            PlaybackState::Off => PlaybackState::On,
            PlaybackState::On => PlaybackState::Off,
        }
    }

    pub fn is_on(self) -> bool {
        self == PlaybackState::On
    }
}

/// The only user input. Both gestures flip the playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Tap,
    /// End of a press or drag anywhere on screen.
    Release,
}

/// One side effect of a state change, in the order it was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ShowStatic,
    StartAudio,
    StopAudio,
    ShowBlack,
}

/// The outcome of a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub state: PlaybackState,
    pub steps: [Step; 2],
}

/// Owns the playback pipeline for the whole foreground session and maps gestures
/// to state changes. The static always becomes visible before the audio starts, and
/// the audio always stops before the screen goes black.
pub struct ToggleController<O: AudioOutput, R: Rng> {
    state: PlaybackState,
    renderer: NoiseRenderer,
    cadence: Cadence,
    redraw: RepeatingTimer,
    player: LoopPlayer<O>,
    rng: R,
    viewport: Viewport,
    frame: NoiseFrame,
    visible: Rc<Cell<bool>>,
}

impl<O: AudioOutput, R: Rng> ToggleController<O, R> {
    /// Creates a controller in the `Off` state. Call `launch` to start the noise.
    pub fn new(
        renderer: NoiseRenderer,
        cadence: Cadence,
        player: LoopPlayer<O>,
        rng: R,
        viewport: Viewport,
    ) -> Self {
        Self {
            state: PlaybackState::Off,
            renderer,
            cadence,
            redraw: RepeatingTimer::new(cadence.period().unwrap_or_default()),
            player,
            rng,
            viewport,
            frame: NoiseFrame::default(),
            visible: Rc::new(Cell::new(false)),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn player(&self) -> &LoopPlayer<O> {
        &self.player
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// The static to present, or None when the screen should be black.
    pub fn frame(&self) -> Option<&NoiseFrame> {
        self.visible.get().then_some(&self.frame)
    }

    /// Shared flag that is true while the static is on screen. Lets an audio backend
    /// observe what the screen shows at the moment it is started or stopped.
    pub fn visibility(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.visible)
    }

    /// Whether the redraw timer is armed.
    pub fn is_redrawing(&self) -> bool {
        self.visible.get() && (self.cadence.period().is_none() || self.redraw.is_valid())
    }

    /// Noise starts automatically at launch.
    pub fn launch(&mut self, now: Duration) -> NoiseResult<Transition> {
        log::info!("Starting noise");
        self.turn_on(now)
    }

    pub fn handle(&mut self, gesture: Gesture, now: Duration) -> NoiseResult<Transition> {
        log::debug!("{:?} while {:?}", gesture, self.state);
        self.toggle(now)
    }

    pub fn toggle(&mut self, now: Duration) -> NoiseResult<Transition> {
        match self.state {
            PlaybackState::Off => self.turn_on(now),
            PlaybackState::On => self.turn_off(),
        }
    }

    /// Advances one UI frame: regenerates the static when due or when the viewport
    /// changed, queues audio for `elapsed` and polls the loop fade.
    pub fn update(
        &mut self,
        now: Duration,
        elapsed: Duration,
        viewport: Viewport,
    ) -> NoiseResult<()> {
        let resized = viewport != self.viewport;
        self.viewport = viewport;
        if !self.state.is_on() {
            return Ok(());
        }
        let due = match self.cadence {
            Cadence::DisplayRefresh => true,
            Cadence::FixedInterval(_) => self.redraw.poll(now).is_some(),
        };
        if due || resized {
            self.redraw_now();
        }
        self.player.pump(elapsed)?;
        if let Some(at) = self.player.poll_fade(now) {
            log::debug!("Loop fade began at {:.3}s", at.as_secs_f64());
        }
        Ok(())
    }

    /// Opacity of the loop fade overlay, zero when off or when fades are disabled.
    pub fn overlay_opacity(&self, now: Duration) -> f32 {
        self.player.fade_opacity(now)
    }

    fn redraw_now(&mut self) {
        self.renderer
            .render_into(self.viewport, &mut self.rng, &mut self.frame);
    }

    fn turn_on(&mut self, now: Duration) -> NoiseResult<Transition> {
        // Static first, then sound.
        self.redraw_now();
        self.visible.set(true);
        if let Some(period) = self.cadence.period() {
            self.redraw.schedule(now, period);
        }
        if let Err(e) = self.player.play(now) {
            log::error!("Audio failed to start: {}", e);
            self.redraw.invalidate();
            self.visible.set(false);
            return Err(e);
        }
        self.state = PlaybackState::On;
        Ok(Transition {
            state: self.state,
            steps: [Step::ShowStatic, Step::StartAudio],
        })
    }

    fn turn_off(&mut self) -> NoiseResult<Transition> {
        self.player.pause()?;
        self.redraw.invalidate();
        self.visible.set(false);
        self.state = PlaybackState::Off;
        Ok(Transition {
            state: self.state,
            steps: [Step::StopAudio, Step::ShowBlack],
        })
    }
}
