use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{AccentLevel, Result};

/// Construction-time settings for a [`crate::MetronomeEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tempo held until the first tempo notification arrives.
    pub default_bpm: i64,
    /// Accents held until the first rhythm notification arrives. Empty means
    /// "no rhythm selected yet".
    pub default_pattern: Vec<AccentLevel>,
    pub timer_thread_name: String,
    pub display_thread_name: String,
    pub notification_thread_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_bpm: 120,
            default_pattern: Vec::new(),
            timer_thread_name: "metronome-timer".to_string(),
            display_thread_name: "metronome-display".to_string(),
            notification_thread_name: "metronome-notifications".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from JSON text. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(?path, "loading engine configuration");
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MetronomeError;
    use std::io::Write;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "default_bpm": 72 }"#).unwrap();
        assert_eq!(config.default_bpm, 72);
        assert!(config.default_pattern.is_empty());
        assert_eq!(config.timer_thread_name, "metronome-timer");
    }

    #[test]
    fn loads_pattern_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "default_bpm": 96, "default_pattern": ["strong", "weak", "none", "medium"] }}"#
        )
        .unwrap();

        let config = EngineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.default_bpm, 96);
        assert_eq!(
            config.default_pattern,
            vec![
                AccentLevel::Strong,
                AccentLevel::Weak,
                AccentLevel::None,
                AccentLevel::Medium
            ]
        );
    }

    #[test]
    fn reports_malformed_json() {
        let err = EngineConfig::from_json_str(r#"{ "default_pattern": ["loud"] }"#).unwrap_err();
        assert!(matches!(err, MetronomeError::Config(_)));
    }

    #[test]
    fn reports_missing_file() {
        let err = EngineConfig::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, MetronomeError::Io(_)));
    }
}
