use std::sync::atomic::{AtomicU64, Ordering};

use crate::{AccentLevel, BeatDisplaySink, TempoPatternState};

/// Headless beat indicator: knows which beat of the measure is lit.
///
/// Reads the pattern length from the shared state on every beat, so a rhythm
/// change mid-playback re-wraps the position the same way the click does.
#[derive(Debug)]
pub struct BeatIndicator {
    state: TempoPatternState,
    beats_seen: AtomicU64,
}

/// One beat bar as the indicator would draw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarView {
    pub accent: AccentLevel,
    pub is_active: bool,
    /// 1-based beat number within the measure.
    pub number: usize,
}

impl BarView {
    /// Returns the character drawn for this bar.
    pub fn glyph(&self) -> char {
        match self.accent.lit_segments() {
            0 => '·',
            1 => '▂',
            2 => '▅',
            _ => '█',
        }
    }
}

impl BeatIndicator {
    pub fn new(state: TempoPatternState) -> Self {
        Self {
            state,
            beats_seen: AtomicU64::new(0),
        }
    }

    /// Clears the lit position. Runs at the start of every play session.
    pub fn reset(&self) {
        self.beats_seen.store(0, Ordering::SeqCst);
    }

    /// Beats shown since the last reset.
    pub fn beats_seen(&self) -> u64 {
        self.beats_seen.load(Ordering::SeqCst)
    }

    /// Zero-based position of the lit beat, `None` before the first beat or
    /// while no rhythm is selected.
    pub fn active_position(&self) -> Option<usize> {
        let seen = self.beats_seen();
        let len = self.state.pattern().ok()?.len() as u64;
        if seen == 0 || len == 0 {
            return None;
        }
        Some(((seen - 1) % len) as usize)
    }

    /// One bar per beat of the current pattern, with the lit one flagged.
    pub fn bars(&self) -> Vec<BarView> {
        let Ok(pattern) = self.state.pattern() else {
            return Vec::new();
        };
        let active = self.active_position();
        pattern
            .iter()
            .enumerate()
            .map(|(i, &accent)| BarView {
                accent,
                is_active: active == Some(i),
                number: i + 1,
            })
            .collect()
    }

    /// Text rendering such as `[█] ▂  ▂  ▅ `.
    pub fn render_line(&self) -> String {
        self.bars()
            .iter()
            .map(|bar| {
                if bar.is_active {
                    format!("[{}]", bar.glyph())
                } else {
                    format!(" {} ", bar.glyph())
                }
            })
            .collect()
    }
}

impl BeatDisplaySink for BeatIndicator {
    fn next_beat(&self) {
        self.beats_seen.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(line = %self.render_line(), "beat display");
    }

    fn session_started(&self) {
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccentLevel::*, AccentPattern, Tempo};

    fn indicator(beats: Vec<AccentLevel>) -> BeatIndicator {
        let state = TempoPatternState::new(Tempo::default(), AccentPattern::new(beats).unwrap());
        BeatIndicator::new(state)
    }

    #[test]
    fn nothing_is_lit_before_first_beat() {
        let indicator = indicator(vec![Strong, Weak]);
        assert_eq!(indicator.active_position(), Option::None);
        assert!(indicator.bars().iter().all(|bar| !bar.is_active));
    }

    #[test]
    fn active_position_wraps_with_the_measure() {
        let indicator = indicator(vec![Strong, Weak, Medium]);
        let positions: Vec<_> = (0..5)
            .map(|_| {
                indicator.next_beat();
                indicator.active_position().unwrap()
            })
            .collect();
        assert_eq!(positions, vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn renders_glyphs_by_accent() {
        let indicator = indicator(vec![Strong, Weak, None, Medium]);
        indicator.next_beat();
        assert_eq!(indicator.render_line(), "[█] ▂  ·  ▅ ");
    }

    #[test]
    fn session_start_clears_the_position() {
        let indicator = indicator(vec![Strong, Weak]);
        indicator.next_beat();
        indicator.next_beat();
        indicator.session_started();
        assert_eq!(indicator.beats_seen(), 0);
        assert_eq!(indicator.active_position(), Option::None);
    }

    #[test]
    fn bars_are_numbered_from_one() {
        let indicator = indicator(vec![Strong, Weak, Weak]);
        let numbers: Vec<_> = indicator.bars().iter().map(|bar| bar.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }
}
