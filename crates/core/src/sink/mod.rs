use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Instant,
};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::{AccentLevel, MetronomeError, Result};

/// Audible click collaborator. Called on the timer thread once per beat, so
/// implementations must return quickly (queue the sample, don't render it).
pub trait SoundSink: Send + Sync {
    fn play(&self, accent: AccentLevel);
}

/// Visual beat indicator collaborator. Only ever invoked from the display
/// worker, never from the timer thread.
pub trait BeatDisplaySink: Send + Sync {
    fn next_beat(&self);

    /// A new play session is about to emit beat 0.
    fn session_started(&self) {}
}

impl<F> SoundSink for F
where
    F: Fn(AccentLevel) + Send + Sync,
{
    fn play(&self, accent: AccentLevel) {
        self(accent)
    }
}

/// Sound event captured by [`ChannelSound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundEvent {
    pub accent: AccentLevel,
    pub at: Instant,
}

/// Forwards every click into a channel, stamped with the time it was played.
#[derive(Debug, Clone)]
pub struct ChannelSound {
    tx: Sender<SoundEvent>,
}

impl ChannelSound {
    /// Returns the sink and the receiver its clicks arrive on.
    pub fn new() -> (Self, Receiver<SoundEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl SoundSink for ChannelSound {
    fn play(&self, accent: AccentLevel) {
        let _ = self.tx.send(SoundEvent {
            accent,
            at: Instant::now(),
        });
    }
}

/// Sound sink that only logs; useful when no audio backend is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSound;

impl SoundSink for TracingSound {
    fn play(&self, accent: AccentLevel) {
        tracing::info!(%accent, "click");
    }
}

/// Display sink that discards beats.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplay;

impl BeatDisplaySink for NullDisplay {
    fn next_beat(&self) {}
}

enum DisplayCommand {
    SessionStarted,
    NextBeat,
    Shutdown,
}

/// Fire-and-forget bridge between the timer thread and a [`BeatDisplaySink`].
///
/// A single worker thread drains an unbounded queue, so a slow display never
/// delays the next click.
pub struct DisplayDispatcher {
    tx: Sender<DisplayCommand>,
    worker: Option<JoinHandle<()>>,
}

/// Cheap clonable sender half handed to the timer thread.
#[derive(Clone)]
pub struct DisplayHandle {
    tx: Sender<DisplayCommand>,
}

impl DisplayHandle {
    /// Queues a "session started" notification. Sent before the first beat of
    /// every play, so it is handled after any beat left from the previous one.
    pub fn session_started(&self) {
        if self.tx.send(DisplayCommand::SessionStarted).is_err() {
            tracing::debug!("display worker is gone, dropping session start");
        }
    }

    /// Queues a "next beat" notification without waiting for it.
    pub fn dispatch(&self) {
        if self.tx.send(DisplayCommand::NextBeat).is_err() {
            tracing::debug!("display worker is gone, dropping beat");
        }
    }
}

impl DisplayDispatcher {
    /// Starts the worker thread that forwards beats to `sink`.
    pub fn spawn(sink: Arc<dyn BeatDisplaySink>, thread_name: &str) -> Result<Self> {
        let (tx, rx) = unbounded();
        let worker = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || run_display(sink, rx))
            .map_err(|source| MetronomeError::ThreadSpawn {
                name: thread_name.to_string(),
                source,
            })?;

        Ok(Self {
            tx,
            worker: Some(worker),
        })
    }

    /// Cheap sender for the timer thread.
    pub fn handle(&self) -> DisplayHandle {
        DisplayHandle {
            tx: self.tx.clone(),
        }
    }

    /// Lets queued beats drain, then stops the worker.
    pub fn shutdown(&mut self) {
        let _ = self.tx.send(DisplayCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("display worker panicked");
            }
        }
    }
}

impl Drop for DisplayDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for DisplayDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayDispatcher")
            .field("running", &self.worker.is_some())
            .finish()
    }
}

fn run_display(sink: Arc<dyn BeatDisplaySink>, rx: Receiver<DisplayCommand>) {
    for command in rx {
        match command {
            DisplayCommand::SessionStarted => sink.session_started(),
            DisplayCommand::NextBeat => sink.next_beat(),
            DisplayCommand::Shutdown => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };
    use std::time::Duration;

    #[derive(Default)]
    struct CountingDisplay(AtomicUsize);

    impl BeatDisplaySink for CountingDisplay {
        fn next_beat(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn session_started(&self) {
            self.0.store(0, Ordering::SeqCst);
        }
    }

    struct SlowDisplay;

    impl BeatDisplaySink for SlowDisplay {
        fn next_beat(&self) {
            thread::sleep(Duration::from_millis(200));
        }
    }

    #[test]
    fn dispatches_every_beat_before_shutdown() {
        let display = Arc::new(CountingDisplay::default());
        let mut dispatcher = DisplayDispatcher::spawn(display.clone(), "test-display").unwrap();
        let handle = dispatcher.handle();
        for _ in 0..5 {
            handle.dispatch();
        }
        dispatcher.shutdown();
        assert_eq!(display.0.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn session_start_is_handled_in_queue_order() {
        let display = Arc::new(CountingDisplay::default());
        let mut dispatcher = DisplayDispatcher::spawn(display.clone(), "test-display").unwrap();
        let handle = dispatcher.handle();
        handle.dispatch();
        handle.dispatch();
        handle.session_started();
        handle.dispatch();
        dispatcher.shutdown();
        assert_eq!(display.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn default_session_start_is_a_no_op() {
        NullDisplay.session_started();
        NullDisplay.next_beat();
    }

    #[test]
    fn dispatch_does_not_wait_for_slow_display() {
        let dispatcher = DisplayDispatcher::spawn(Arc::new(SlowDisplay), "slow-display").unwrap();
        let handle = dispatcher.handle();
        let started = Instant::now();
        for _ in 0..3 {
            handle.dispatch();
        }
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn dispatch_after_shutdown_is_harmless() {
        let mut dispatcher = DisplayDispatcher::spawn(Arc::new(NullDisplay), "gone").unwrap();
        let handle = dispatcher.handle();
        dispatcher.shutdown();
        handle.dispatch();
    }

    #[test]
    fn channel_sound_records_accents() {
        let (sound, rx) = ChannelSound::new();
        sound.play(AccentLevel::Strong);
        sound.play(AccentLevel::Weak);
        let accents: Vec<_> = rx.try_iter().map(|e| e.accent).collect();
        assert_eq!(accents, vec![AccentLevel::Strong, AccentLevel::Weak]);
    }

    #[test]
    fn closures_are_sound_sinks() {
        let heard = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let heard = heard.clone();
            move |accent: AccentLevel| heard.lock().unwrap().push(accent)
        };
        sink.play(AccentLevel::Medium);
        assert_eq!(*heard.lock().unwrap(), vec![AccentLevel::Medium]);
    }
}
