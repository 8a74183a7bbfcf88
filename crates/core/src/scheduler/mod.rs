//! Periodic beat firing.
//!
//! A [`BeatScheduler`] owns one dedicated timer thread for the length of a
//! play session. The thread sleeps on its command channel until the next
//! deadline, so a reschedule or cancel wakes it immediately, and a timeout is
//! a beat.

use std::{
    sync::Arc,
    thread::{self, JoinHandle, ThreadId},
    time::{Duration, Instant},
};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::{
    sink::DisplayHandle, AccentLevel, AccentPattern, MetronomeError, Result, SoundSink,
    TempoPatternState,
};

/// One emitted beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Beat {
    pub index: u64,
    pub accent: AccentLevel,
}

/// Beat counter for a single play session.
#[derive(Debug, Default, Clone)]
pub struct BeatCursor {
    next: u64,
}

impl BeatCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of beats emitted so far.
    pub fn emitted(&self) -> u64 {
        self.next
    }

    /// Picks the accent for the current beat and advances. An empty pattern
    /// yields `None` and leaves the counter where it was.
    pub fn fire(&mut self, pattern: &AccentPattern) -> Option<Beat> {
        let accent = pattern.accent_at(self.next)?;
        let beat = Beat {
            index: self.next,
            accent,
        };
        self.next += 1;
        Some(beat)
    }
}

/// Deadline bookkeeping for a fixed-period timer.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    period: Duration,
    next_fire: Instant,
}

impl Cadence {
    /// First fire is due immediately.
    pub fn starting_at(now: Instant, period: Duration) -> Self {
        Self {
            period,
            next_fire: now,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn next_fire(&self) -> Instant {
        self.next_fire
    }

    /// Moves to the following deadline after a fire. Deadlines step by whole
    /// periods so sleep overshoot does not accumulate; when the thread is a
    /// full period or more behind, the late beat fires once at `now` instead
    /// of bursting to catch up.
    pub fn advance(&mut self, now: Instant) {
        let next = self.next_fire + self.period;
        self.next_fire = if next < now { now } else { next };
    }

    /// Switches to `period`, with the next fire at `now + period`. The beat
    /// counter is not involved, so no beat index is skipped or repeated.
    pub fn reschedule(&mut self, now: Instant, period: Duration) {
        self.period = period;
        self.next_fire = now + period;
    }
}

enum TimerCommand {
    Reschedule(Duration),
    Cancel,
}

/// Handle to a running timer thread.
pub struct BeatScheduler {
    commands: Sender<TimerCommand>,
    worker: Option<JoinHandle<()>>,
    worker_id: ThreadId,
    period: Duration,
}

impl BeatScheduler {
    /// Spawns the timer thread. The first beat fires right away, then one
    /// every `period` until cancelled.
    pub fn start(
        period: Duration,
        state: TempoPatternState,
        sound: Arc<dyn SoundSink>,
        display: DisplayHandle,
        thread_name: &str,
    ) -> Result<Self> {
        if period.is_zero() {
            return Err(MetronomeError::msg("beat period must be non-zero"));
        }

        // Queued ahead of beat 0 so the display restarts with the counter.
        display.session_started();

        let (commands, rx) = unbounded();
        let timer = TimerThread {
            commands: rx,
            cadence: Cadence::starting_at(Instant::now(), period),
            cursor: BeatCursor::new(),
            state,
            sound,
            display,
        };
        let worker = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || timer.run())
            .map_err(|source| MetronomeError::ThreadSpawn {
                name: thread_name.to_string(),
                source,
            })?;

        tracing::debug!(period_ms = period.as_secs_f64() * 1000.0, "timer started");
        Ok(Self {
            commands,
            worker_id: worker.thread().id(),
            worker: Some(worker),
            period,
        })
    }

    /// Period currently programmed into the timer.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Returns `false` once the timer has been cancelled.
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Changes the firing period of the running timer. A zero period is
    /// refused and the previous one stays in effect.
    pub fn reschedule(&mut self, period: Duration) -> Result<()> {
        if period.is_zero() {
            return Err(MetronomeError::msg("beat period must be non-zero"));
        }
        if self.worker.is_none() {
            return Ok(());
        }
        self.commands
            .send(TimerCommand::Reschedule(period))
            .map_err(|_| MetronomeError::msg("timer thread has exited"))?;
        self.period = period;
        tracing::debug!(period_ms = period.as_secs_f64() * 1000.0, "timer rescheduled");
        Ok(())
    }

    /// Stops future beats. Returns once the timer thread has exited, so no
    /// beat fires afterwards; a beat already in progress finishes first.
    /// Calling it again is a no-op.
    pub fn cancel(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = self.commands.send(TimerCommand::Cancel);

        // A sink cancelling from inside a beat cannot join its own thread; the
        // loop exits as soon as that beat returns.
        if thread::current().id() == self.worker_id {
            return;
        }
        if worker.join().is_err() {
            tracing::warn!("timer thread panicked");
        }
        tracing::debug!("timer cancelled");
    }
}

impl Drop for BeatScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for BeatScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeatScheduler")
            .field("period", &self.period)
            .field("running", &self.worker.is_some())
            .finish()
    }
}

struct TimerThread {
    commands: Receiver<TimerCommand>,
    cadence: Cadence,
    cursor: BeatCursor,
    state: TempoPatternState,
    sound: Arc<dyn SoundSink>,
    display: DisplayHandle,
}

impl TimerThread {
    fn run(mut self) {
        loop {
            match self.commands.recv_deadline(self.cadence.next_fire()) {
                Ok(TimerCommand::Reschedule(period)) => {
                    self.cadence.reschedule(Instant::now(), period);
                }
                Ok(TimerCommand::Cancel) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    self.fire();
                    self.cadence.advance(Instant::now());
                }
            }
        }
    }

    fn fire(&mut self) {
        // Pattern and beat index are captured together for the whole beat.
        let snapshot = match self.state.snapshot() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(%err, "skipping beat");
                return;
            }
        };

        let Some(beat) = self.cursor.fire(&snapshot.pattern) else {
            tracing::warn!("accent pattern is empty, skipping beat");
            return;
        };

        tracing::trace!(index = beat.index, accent = %beat.accent, "beat");
        self.sound.play(beat.accent);
        self.display.dispatch();
    }
}
