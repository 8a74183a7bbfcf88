use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use jangdan_core::{
    AccentPattern, BeatIndicator, ChannelSound, EngineConfig, MetronomeEngine, Tempo,
    TempoPatternState,
};
use tracing_subscriber::EnvFilter;

fn main() -> jangdan_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            config,
            bpm,
            pattern,
            beats,
            retune_after,
            retune_bpm,
        } => {
            let config = load_config(config.as_ref(), bpm, pattern.as_deref())?;
            let retune = retune_after.zip(retune_bpm);
            run_play(config, beats, retune)
        }
        Commands::Inspect { pattern, bpm } => run_inspect(&pattern, bpm),
    }
}

fn load_config(
    path: Option<&PathBuf>,
    bpm: Option<i64>,
    pattern: Option<&str>,
) -> jangdan_core::Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(bpm) = bpm {
        config.default_bpm = bpm;
    }
    if let Some(pattern) = pattern {
        config.default_pattern = pattern.parse::<AccentPattern>()?.to_vec();
    }
    Ok(config)
}

fn run_play(
    config: EngineConfig,
    beats: u64,
    retune: Option<(u64, i64)>,
) -> jangdan_core::Result<()> {
    let tempo = Tempo::new(config.default_bpm)?;
    let pattern = AccentPattern::new(config.default_pattern.clone())?;
    tracing::info!(%tempo, %pattern, beats, "starting metronome");

    let state = TempoPatternState::new(tempo, pattern);
    let indicator = Arc::new(BeatIndicator::new(state.clone()));
    let (sound, clicks) = ChannelSound::new();
    let engine = MetronomeEngine::with_state(config, state, Arc::new(sound), indicator.clone())?;

    engine.play()?;
    // Generous enough for the slowest sensible tempo plus a retune.
    let patience = Duration::from_secs(10);
    for index in 0..beats {
        let Ok(click) = clicks.recv_timeout(patience) else {
            tracing::warn!(index, "no beat arrived, giving up");
            break;
        };
        tracing::info!(index, accent = %click.accent, bar = %indicator.render_line(), "beat");

        if let Some((after, bpm)) = retune {
            if index + 1 == after {
                match engine.update_tempo(bpm) {
                    Ok(()) => tracing::info!(bpm, "tempo updated"),
                    Err(err) => tracing::warn!(%err, "tempo update refused"),
                }
            }
        }
    }
    engine.stop()
}

fn run_inspect(pattern: &str, bpm: i64) -> jangdan_core::Result<()> {
    let pattern: AccentPattern = pattern.parse()?;
    let tempo = Tempo::new(bpm)?;
    let measure = tempo.period() * pattern.len() as u32;
    tracing::info!(
        %tempo,
        period_ms = tempo.period().as_secs_f64() * 1000.0,
        measure_ms = measure.as_secs_f64() * 1000.0,
        beats = pattern.len(),
        "pattern timing"
    );
    let indicator = BeatIndicator::new(TempoPatternState::new(tempo, pattern));
    tracing::info!(bar = %indicator.render_line(), "pattern");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Jangdan practice metronome", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a rhythm for a fixed number of beats.
    Play {
        /// JSON engine configuration to start from.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Tempo in beats per minute; overrides the configuration.
        #[arg(short, long, allow_negative_numbers = true)]
        bpm: Option<i64>,
        /// Accents such as `strong,weak,weak,medium`; overrides the configuration.
        #[arg(short, long)]
        pattern: Option<String>,
        /// Number of beats to play before stopping.
        #[arg(short = 'n', long, default_value_t = 8)]
        beats: u64,
        /// Change tempo after this many beats.
        #[arg(long, requires = "retune_bpm")]
        retune_after: Option<u64>,
        /// Tempo to switch to once `--retune-after` beats have played.
        #[arg(long, allow_negative_numbers = true)]
        retune_bpm: Option<i64>,
    },
    /// Print the timing of a pattern without playing it.
    Inspect {
        /// Accents such as `strong,weak,weak,medium`.
        pattern: String,
        /// Tempo in beats per minute.
        #[arg(short, long, default_value_t = 120)]
        bpm: i64,
    },
}
