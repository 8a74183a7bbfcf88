use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{MetronomeError, Result};

/// Tempo in beats per minute.
///
/// Always positive: non-positive values are refused at construction so a
/// stored tempo can never yield a zero or negative timer period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Tempo(u32);

impl Tempo {
    pub const DEFAULT_BPM: u32 = 120;

    /// Validates `bpm`, refusing zero, negative and out-of-range values.
    pub fn new(bpm: i64) -> Result<Self> {
        match u32::try_from(bpm) {
            Ok(bpm) if bpm > 0 => Ok(Self(bpm)),
            _ => Err(MetronomeError::InvalidTempo(bpm)),
        }
    }

    /// Returns the tempo in beats per minute.
    pub fn bpm(self) -> u32 {
        self.0
    }

    /// Time between two beats: `60 / bpm` seconds.
    pub fn period(self) -> Duration {
        Duration::from_secs_f64(60.0 / f64::from(self.0))
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self(Self::DEFAULT_BPM)
    }
}

impl TryFrom<i64> for Tempo {
    type Error = MetronomeError;

    fn try_from(bpm: i64) -> Result<Self> {
        Self::new(bpm)
    }
}

impl From<Tempo> for i64 {
    fn from(tempo: Tempo) -> Self {
        i64::from(tempo.0)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bpm", self.0)
    }
}
