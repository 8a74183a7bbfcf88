//! Core library for the jangdan metronome.
//!
//! The crate drives a steady sequence of beats, each carrying the accent of
//! its position in the selected rhythm, and hands every beat to two
//! collaborators: a sound sink that clicks and a display sink that lights the
//! beat indicator. Rendering, audio playback and rhythm storage live outside
//! this crate; they plug in through the traits in [`sink`] and the
//! notification streams in [`ports`].

pub mod accent;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod ports;
pub mod scheduler;
pub mod sink;
pub mod state;
pub mod tempo;

pub use accent::{AccentLevel, AccentPattern};
pub use config::EngineConfig;
pub use display::{BarView, BeatIndicator};
pub use engine::MetronomeEngine;
pub use error::{MetronomeError, Result};
pub use ports::NotificationPorts;
pub use scheduler::{Beat, BeatCursor, BeatScheduler, Cadence};
pub use sink::{BeatDisplaySink, ChannelSound, NullDisplay, SoundSink, TracingSound};
pub use state::{StateSnapshot, TempoPatternState};
pub use tempo::Tempo;
