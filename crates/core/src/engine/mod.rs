use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use crossbeam_channel::Receiver;

use crate::{
    sink::DisplayDispatcher, AccentPattern, BeatDisplaySink, BeatScheduler, EngineConfig,
    MetronomeError, NotificationPorts, Result, SoundSink, Tempo, TempoPatternState,
};

/// Play/stop controller for the beat engine.
///
/// The engine is `Send + Sync`; every control operation is serialised by one
/// session lock, so callers may share it behind an `Arc`. Sinks must not call
/// back into the engine from inside a beat.
pub struct MetronomeEngine {
    config: EngineConfig,
    state: TempoPatternState,
    sound: Arc<dyn SoundSink>,
    display: DisplayDispatcher,
    session: Mutex<Option<BeatScheduler>>,
    ports: Mutex<Option<NotificationPorts>>,
}

impl MetronomeEngine {
    /// Creates a stopped engine at 120 bpm with no rhythm selected.
    pub fn new(sound: Arc<dyn SoundSink>, display: Arc<dyn BeatDisplaySink>) -> Result<Self> {
        Self::with_config(EngineConfig::default(), sound, display)
    }

    /// Creates a stopped engine from `config`, rejecting a non-positive tempo.
    pub fn with_config(
        config: EngineConfig,
        sound: Arc<dyn SoundSink>,
        display: Arc<dyn BeatDisplaySink>,
    ) -> Result<Self> {
        let tempo = Tempo::new(config.default_bpm)?;
        let pattern = if config.default_pattern.is_empty() {
            AccentPattern::empty()
        } else {
            AccentPattern::new(config.default_pattern.clone())?
        };
        Self::with_state(config, TempoPatternState::new(tempo, pattern), sound, display)
    }

    /// Builds the engine around an existing state, so collaborators created
    /// beforehand (such as a [`crate::BeatIndicator`]) can share it.
    pub fn with_state(
        config: EngineConfig,
        state: TempoPatternState,
        sound: Arc<dyn SoundSink>,
        display: Arc<dyn BeatDisplaySink>,
    ) -> Result<Self> {
        let display = DisplayDispatcher::spawn(display, &config.display_thread_name)?;

        Ok(Self {
            state,
            sound,
            display,
            session: Mutex::new(None),
            ports: Mutex::new(None),
            config,
        })
    }

    /// Shared tempo/pattern state, e.g. for a display that needs the pattern.
    pub fn state(&self) -> &TempoPatternState {
        &self.state
    }

    /// Attaches the rhythm and tempo notification streams. Any previously
    /// attached streams are detached first.
    pub fn connect_sources(
        &self,
        rhythm: Receiver<AccentPattern>,
        tempo: Receiver<i64>,
    ) -> Result<()> {
        let mut ports = self.lock_ports()?;
        if let Some(mut previous) = ports.take() {
            previous.shutdown();
        }
        *ports = Some(NotificationPorts::spawn(
            self.state.clone(),
            rhythm,
            tempo,
            &self.config.notification_thread_name,
        )?);
        Ok(())
    }

    /// Replaces the rhythm. Takes effect on the next beat without touching
    /// the beat counter.
    pub fn on_pattern_changed(&self, pattern: AccentPattern) -> Result<()> {
        self.state.on_pattern_changed(pattern)
    }

    /// Stores a tempo for the next `play` without reprogramming a running
    /// timer; use [`MetronomeEngine::update_tempo`] for that.
    pub fn on_tempo_changed(&self, bpm: i64) -> Result<Tempo> {
        self.state.on_tempo_changed(bpm)
    }

    /// Starts beating from beat 0. Called while already playing, the running
    /// session is torn down first, so this is a full restart.
    pub fn play(&self) -> Result<()> {
        let mut session = self.lock_session()?;
        if let Some(mut running) = session.take() {
            running.cancel();
        }

        let tempo = self.state.tempo()?;
        let scheduler = BeatScheduler::start(
            tempo.period(),
            self.state.clone(),
            self.sound.clone(),
            self.display.handle(),
            &self.config.timer_thread_name,
        )?;
        *session = Some(scheduler);

        tracing::info!(bpm = tempo.bpm(), "metronome playing");
        Ok(())
    }

    /// Stops beating. Safe to call when already stopped.
    pub fn stop(&self) -> Result<()> {
        let mut session = self.lock_session()?;
        if let Some(mut running) = session.take() {
            running.cancel();
            tracing::info!("metronome stopped");
        }
        Ok(())
    }

    /// Stores `bpm` and, when playing, reprograms the timer so the next beat
    /// lands one new period from now. The beat counter keeps counting.
    ///
    /// A non-positive `bpm` is refused: the stored tempo and the running
    /// period both stay as they were.
    pub fn update_tempo(&self, bpm: i64) -> Result<()> {
        let mut session = self.lock_session()?;
        let tempo = self.state.on_tempo_changed(bpm)?;
        if let Some(running) = session.as_mut() {
            running.reschedule(tempo.period())?;
        }
        Ok(())
    }

    /// Returns whether a play session is running.
    pub fn is_playing(&self) -> Result<bool> {
        Ok(self.lock_session()?.is_some())
    }

    /// Returns the stored tempo, which the next `play` will use.
    pub fn tempo(&self) -> Result<Tempo> {
        self.state.tempo()
    }

    /// Returns the pattern the next beat will read.
    pub fn pattern(&self) -> Result<Arc<AccentPattern>> {
        self.state.pattern()
    }

    /// Period of the running timer, `None` while stopped.
    pub fn current_period(&self) -> Result<Option<Duration>> {
        Ok(self.lock_session()?.as_ref().map(BeatScheduler::period))
    }

    fn lock_session(&self) -> Result<MutexGuard<'_, Option<BeatScheduler>>> {
        self.session
            .lock()
            .map_err(|_| MetronomeError::Poisoned("metronome session"))
    }

    fn lock_ports(&self) -> Result<MutexGuard<'_, Option<NotificationPorts>>> {
        self.ports
            .lock()
            .map_err(|_| MetronomeError::Poisoned("notification ports"))
    }
}

impl Drop for MetronomeEngine {
    fn drop(&mut self) {
        // Timer first so no beat fires into a half torn-down engine.
        let session = self.session.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut running) = session.take() {
            running.cancel();
        }
        let ports = self.ports.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut listener) = ports.take() {
            listener.shutdown();
        }
        self.display.shutdown();
    }
}

impl std::fmt::Debug for MetronomeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetronomeEngine")
            .field("state", &self.state)
            .field("playing", &self.is_playing().ok())
            .finish()
    }
}
