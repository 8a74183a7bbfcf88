use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{AccentPattern, MetronomeError, Result, Tempo};

/// Latest rhythm and tempo, shared between the notification sources that
/// write it and the timer thread that reads it on every beat.
#[derive(Debug, Clone, Default)]
pub struct TempoPatternState {
    shared: Arc<RwLock<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    pattern: Arc<AccentPattern>,
    tempo: Tempo,
}

/// Consistent view of the state taken under a single read lock.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub pattern: Arc<AccentPattern>,
    pub tempo: Tempo,
}

impl TempoPatternState {
    pub fn new(tempo: Tempo, pattern: AccentPattern) -> Self {
        Self {
            shared: Arc::new(RwLock::new(Inner {
                pattern: Arc::new(pattern),
                tempo,
            })),
        }
    }

    /// Replaces the whole pattern. The beat counter is untouched, so the next
    /// beat reads `new_pattern[counter % new_len]`.
    pub fn on_pattern_changed(&self, pattern: AccentPattern) -> Result<()> {
        tracing::debug!(beats = pattern.len(), %pattern, "accent pattern changed");
        let mut inner = self.write()?;
        inner.pattern = Arc::new(pattern);
        Ok(())
    }

    /// Stores a new tempo without touching any running timer. A non-positive
    /// value is refused and the previous tempo stays in effect.
    pub fn on_tempo_changed(&self, bpm: i64) -> Result<Tempo> {
        let tempo = Tempo::new(bpm).inspect_err(|_| {
            tracing::warn!(bpm, "ignoring non-positive tempo");
        })?;
        tracing::debug!(bpm = tempo.bpm(), "tempo changed");
        self.write()?.tempo = tempo;
        Ok(tempo)
    }

    /// Returns the tempo currently held.
    pub fn tempo(&self) -> Result<Tempo> {
        Ok(self.read()?.tempo)
    }

    /// Returns the pattern currently held.
    pub fn pattern(&self) -> Result<Arc<AccentPattern>> {
        Ok(self.read()?.pattern.clone())
    }

    /// Reads pattern and tempo under one lock.
    pub fn snapshot(&self) -> Result<StateSnapshot> {
        let inner = self.read()?;
        Ok(StateSnapshot {
            pattern: inner.pattern.clone(),
            tempo: inner.tempo,
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.shared
            .read()
            .map_err(|_| MetronomeError::Poisoned("tempo/pattern state"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.shared
            .write()
            .map_err(|_| MetronomeError::Poisoned("tempo/pattern state"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AccentLevel::*;

    #[test]
    fn starts_with_defaults() {
        let state = TempoPatternState::default();
        assert_eq!(state.tempo().unwrap().bpm(), 120);
        assert!(state.pattern().unwrap().is_empty());
    }

    #[test]
    fn pattern_is_replaced_wholesale() {
        let state = TempoPatternState::default();
        let first = AccentPattern::new(vec![Strong, Weak]).unwrap();
        state.on_pattern_changed(first).unwrap();
        let held = state.pattern().unwrap();

        let second = AccentPattern::new(vec![Medium, Medium, Weak]).unwrap();
        state.on_pattern_changed(second.clone()).unwrap();

        assert_eq!(held.as_slice(), &[Strong, Weak]);
        assert_eq!(*state.pattern().unwrap(), second);
    }

    #[test]
    fn keeps_previous_tempo_on_invalid_value() {
        let state = TempoPatternState::default();
        state.on_tempo_changed(90).unwrap();
        assert!(state.on_tempo_changed(0).is_err());
        assert!(state.on_tempo_changed(-30).is_err());
        assert_eq!(state.tempo().unwrap().bpm(), 90);
    }

    #[test]
    fn clones_share_the_same_values() {
        let state = TempoPatternState::default();
        let reader = state.clone();
        state.on_tempo_changed(75).unwrap();
        let snapshot = reader.snapshot().unwrap();
        assert_eq!(snapshot.tempo.bpm(), 75);
        assert_eq!(snapshot.pattern.accent_at(3), Option::None);
    }

    #[test]
    fn writes_from_another_thread_are_visible() {
        let state = TempoPatternState::default();
        let writer = state.clone();
        std::thread::spawn(move || {
            writer
                .on_pattern_changed(AccentPattern::new(vec![Strong, Weak, Weak]).unwrap())
                .unwrap();
        })
        .join()
        .unwrap();
        assert_eq!(state.snapshot().unwrap().pattern.accent_at(4), Some(Weak));
    }
}
