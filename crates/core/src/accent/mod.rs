use std::{fmt, ops::Deref, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{MetronomeError, Result};

/// Relative emphasis of a single beat within a measure.
///
/// The derive order matters: variants compare `None < Weak < Medium < Strong`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccentLevel {
    None,
    Weak,
    Medium,
    Strong,
}

impl AccentLevel {
    /// Every level from quietest to loudest.
    pub const ALL: [AccentLevel; 4] = [
        AccentLevel::None,
        AccentLevel::Weak,
        AccentLevel::Medium,
        AccentLevel::Strong,
    ];

    /// Number of lit segments in a three-segment beat bar.
    pub fn lit_segments(self) -> usize {
        match self {
            AccentLevel::None => 0,
            AccentLevel::Weak => 1,
            AccentLevel::Medium => 2,
            AccentLevel::Strong => 3,
        }
    }

    /// Returns `true` when `self` is a stronger accent than `other`.
    pub fn is_louder_than(self, other: AccentLevel) -> bool {
        self > other
    }

    /// Lowercase name used in logs and config files.
    pub fn name(self) -> &'static str {
        match self {
            AccentLevel::None => "none",
            AccentLevel::Weak => "weak",
            AccentLevel::Medium => "medium",
            AccentLevel::Strong => "strong",
        }
    }
}

impl fmt::Display for AccentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AccentLevel {
    type Err = MetronomeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "n" | "-" => Ok(AccentLevel::None),
            "weak" | "w" => Ok(AccentLevel::Weak),
            "medium" | "m" => Ok(AccentLevel::Medium),
            "strong" | "s" => Ok(AccentLevel::Strong),
            other => Err(MetronomeError::UnknownAccent(other.to_string())),
        }
    }
}

/// One full measure of a rhythm, one accent per beat.
///
/// Construction through [`AccentPattern::new`] enforces the non-empty
/// invariant. An empty pattern still exists as the engine's initial value
/// before any rhythm has been selected, so readers must go through
/// [`AccentPattern::accent_at`], which never divides by zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccentPattern {
    beats: Vec<AccentLevel>,
}

impl AccentPattern {
    /// Builds a pattern, rejecting an empty measure.
    pub fn new(beats: Vec<AccentLevel>) -> Result<Self> {
        if beats.is_empty() {
            return Err(MetronomeError::EmptyPattern);
        }
        Ok(Self { beats })
    }

    /// The placeholder pattern held before a rhythm is selected.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Beats per measure.
    pub fn len(&self) -> usize {
        self.beats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beats.is_empty()
    }

    /// Accent for an absolute beat number, wrapping around the measure.
    /// Returns `None` for an empty pattern.
    pub fn accent_at(&self, beat: u64) -> Option<AccentLevel> {
        if self.beats.is_empty() {
            return None;
        }
        let position = (beat % self.beats.len() as u64) as usize;
        self.beats.get(position).copied()
    }

    /// Returns the beats of one measure in order.
    pub fn as_slice(&self) -> &[AccentLevel] {
        &self.beats
    }
}

impl Deref for AccentPattern {
    type Target = [AccentLevel];

    fn deref(&self) -> &Self::Target {
        &self.beats
    }
}

impl TryFrom<Vec<AccentLevel>> for AccentPattern {
    type Error = MetronomeError;

    fn try_from(beats: Vec<AccentLevel>) -> Result<Self> {
        Self::new(beats)
    }
}

impl FromStr for AccentPattern {
    type Err = MetronomeError;

    /// Parses a comma or whitespace separated list such as
    /// `"strong,weak,weak,medium"` or `"s w w m"`.
    fn from_str(s: &str) -> Result<Self> {
        let beats = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<AccentLevel>>>()?;
        Self::new(beats)
    }
}

impl fmt::Display for AccentPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, accent) in self.beats.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{accent}")?;
        }
        Ok(())
    }
}
