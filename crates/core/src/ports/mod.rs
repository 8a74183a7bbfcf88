use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, never, select, Receiver, Sender};

use crate::{AccentPattern, MetronomeError, Result, TempoPatternState};

/// Listener that feeds the rhythm and tempo notification streams into the
/// shared state until it is shut down or both streams close.
pub struct NotificationPorts {
    shutdown: Sender<()>,
    listener: Option<JoinHandle<()>>,
}

impl NotificationPorts {
    /// Starts listening. Tempo values are only stored; a running timer is not
    /// rescheduled by this path.
    pub fn spawn(
        state: TempoPatternState,
        rhythm: Receiver<AccentPattern>,
        tempo: Receiver<i64>,
        thread_name: &str,
    ) -> Result<Self> {
        let (shutdown, shutdown_rx) = bounded(1);
        let listener = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || listen(state, rhythm, tempo, shutdown_rx))
            .map_err(|source| MetronomeError::ThreadSpawn {
                name: thread_name.to_string(),
                source,
            })?;

        Ok(Self {
            shutdown,
            listener: Some(listener),
        })
    }

    /// Stops the listener and waits for it. Notifications still queued are
    /// dropped.
    pub fn shutdown(&mut self) {
        let _ = self.shutdown.try_send(());
        if let Some(listener) = self.listener.take() {
            if listener.join().is_err() {
                tracing::warn!("notification listener panicked");
            }
        }
    }

    /// Returns whether the listener thread is still attached.
    pub fn is_listening(&self) -> bool {
        self.listener
            .as_ref()
            .is_some_and(|listener| !listener.is_finished())
    }
}

impl Drop for NotificationPorts {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for NotificationPorts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationPorts")
            .field("listening", &self.is_listening())
            .finish()
    }
}

enum Closed {
    Rhythm,
    Tempo,
}

fn listen(
    state: TempoPatternState,
    mut rhythm: Receiver<AccentPattern>,
    mut tempo: Receiver<i64>,
    shutdown: Receiver<()>,
) {
    let mut open = 2;
    while open > 0 {
        let closed = select! {
            recv(shutdown) -> _ => break,
            recv(rhythm) -> msg => match msg {
                Ok(pattern) => {
                    if let Err(err) = state.on_pattern_changed(pattern) {
                        tracing::warn!(%err, "dropping rhythm notification");
                    }
                    None
                }
                Err(_) => Some(Closed::Rhythm),
            },
            recv(tempo) -> msg => match msg {
                // Rejected values are already logged by the state.
                Ok(bpm) => {
                    let _ = state.on_tempo_changed(bpm);
                    None
                }
                Err(_) => Some(Closed::Tempo),
            },
        };

        match closed {
            Some(Closed::Rhythm) => {
                tracing::debug!("rhythm source closed");
                rhythm = never();
                open -= 1;
            }
            Some(Closed::Tempo) => {
                tracing::debug!("tempo source closed");
                tempo = never();
                open -= 1;
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AccentLevel::*;
    use crossbeam_channel::unbounded;
    use std::time::{Duration, Instant};

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn forwards_notifications_into_state() {
        let state = TempoPatternState::default();
        let (rhythm_tx, rhythm_rx) = unbounded();
        let (tempo_tx, tempo_rx) = unbounded();
        let _ports = NotificationPorts::spawn(state.clone(), rhythm_rx, tempo_rx, "ports").unwrap();

        rhythm_tx
            .send(AccentPattern::new(vec![Strong, Weak, Medium]).unwrap())
            .unwrap();
        tempo_tx.send(84).unwrap();

        assert!(wait_until(|| state.tempo().unwrap().bpm() == 84));
        assert!(wait_until(|| state.pattern().unwrap().len() == 3));
    }

    #[test]
    fn ignores_non_positive_tempo_notifications() {
        let state = TempoPatternState::default();
        let (_rhythm_tx, rhythm_rx) = unbounded();
        let (tempo_tx, tempo_rx) = unbounded();
        let _ports = NotificationPorts::spawn(state.clone(), rhythm_rx, tempo_rx, "ports").unwrap();

        tempo_tx.send(0).unwrap();
        tempo_tx.send(-12).unwrap();
        tempo_tx.send(66).unwrap();

        assert!(wait_until(|| state.tempo().unwrap().bpm() == 66));
    }

    #[test]
    fn exits_when_both_sources_close() {
        let state = TempoPatternState::default();
        let (rhythm_tx, rhythm_rx) = unbounded::<AccentPattern>();
        let (tempo_tx, tempo_rx) = unbounded::<i64>();
        let ports = NotificationPorts::spawn(state, rhythm_rx, tempo_rx, "ports").unwrap();

        drop(rhythm_tx);
        drop(tempo_tx);
        assert!(wait_until(|| !ports.is_listening()));
    }

    #[test]
    fn shutdown_stops_listening() {
        let (_rhythm_tx, rhythm_rx) = unbounded::<AccentPattern>();
        let (_tempo_tx, tempo_rx) = unbounded::<i64>();
        let mut ports =
            NotificationPorts::spawn(TempoPatternState::default(), rhythm_rx, tempo_rx, "ports")
                .unwrap();
        assert!(ports.is_listening());
        ports.shutdown();
        assert!(!ports.is_listening());
        ports.shutdown();
    }
}
