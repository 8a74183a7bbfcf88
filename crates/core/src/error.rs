/// Result alias that carries the custom [`MetronomeError`] type.
pub type Result<T> = std::result::Result<T, MetronomeError>;

/// Common error type for the core crate.
///
/// Most guards inside the engine degrade to "skip this beat" or "keep the
/// previous value" and only log; the variants here cover what is reported back
/// to the caller of the control surface or the configuration loaders.
#[derive(Debug, thiserror::Error)]
pub enum MetronomeError {
    /// A tempo that cannot produce a positive beat period.
    #[error("tempo must be a positive number of beats per minute, got {0}")]
    InvalidTempo(i64),
    /// An accent pattern without any beats.
    #[error("accent pattern must contain at least one beat")]
    EmptyPattern,
    /// A token in a textual accent pattern that names no accent level.
    #[error("unknown accent `{0}`")]
    UnknownAccent(String),
    /// A shared lock was poisoned by a panicking thread.
    #[error("{0} has been poisoned")]
    Poisoned(&'static str),
    /// A worker thread could not be started.
    #[error("failed to spawn {name} thread: {source}")]
    ThreadSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
    /// Malformed JSON configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Message(String),
}

impl MetronomeError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for MetronomeError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for MetronomeError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
