// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sequence controller configuration, stored as RON.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the config file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The config text is not valid RON for [`SequenceConfig`]
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// The config could not be serialized
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),
}

/// Result type for config operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Tuning for a [`SequenceController`](crate::SequenceController).
///
/// Missing fields take their default values when loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Cap on idle handlers kept per handler type (`None` = unbounded)
    pub max_pooled_handlers_per_type: Option<usize>,
    /// Playback slots reserved up front
    pub initial_playback_capacity: usize,
    /// Log unbound events at warn level instead of trace
    pub warn_on_unhandled: bool,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            max_pooled_handlers_per_type: None,
            initial_playback_capacity: 8,
            warn_on_unhandled: false,
        }
    }
}

impl SequenceConfig {
    /// Parse a config from RON text
    pub fn from_ron(s: &str) -> Result<Self> {
        Ok(ron::from_str(s)?)
    }

    /// Serialize the config to pretty RON
    pub fn to_ron(&self) -> Result<String> {
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Load a config from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_ron(&content)?;
        tracing::debug!("Loaded sequence config from {}", path.display());
        Ok(config)
    }

    /// Save the config to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_ron()?)?;
        tracing::debug!("Saved sequence config to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SequenceConfig::default();
        assert_eq!(config.max_pooled_handlers_per_type, None);
        assert_eq!(config.initial_playback_capacity, 8);
        assert!(!config.warn_on_unhandled);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = SequenceConfig::from_ron("(warn_on_unhandled: true)").unwrap();
        assert!(config.warn_on_unhandled);
        assert_eq!(config.initial_playback_capacity, 8);

        let config =
            SequenceConfig::from_ron("SequenceConfig(max_pooled_handlers_per_type: Some(4))")
                .unwrap();
        assert_eq!(config.max_pooled_handlers_per_type, Some(4));
    }

    #[test]
    fn test_to_ron_is_readable() {
        let config = SequenceConfig {
            max_pooled_handlers_per_type: Some(16),
            initial_playback_capacity: 2,
            warn_on_unhandled: true,
        };
        let text = config.to_ron().unwrap();
        assert!(text.contains("max_pooled_handlers_per_type"));
        assert_eq!(SequenceConfig::from_ron(&text).unwrap(), config);
    }

    #[test]
    fn test_parse_error() {
        let err = SequenceConfig::from_ron("(initial_playback_capacity: \"eight\")").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!(
            "ordoplay_sequence_config_{}.ron",
            uuid::Uuid::new_v4()
        ));
        let config = SequenceConfig {
            warn_on_unhandled: true,
            ..Default::default()
        };
        config.save(&path).unwrap();
        let loaded = SequenceConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);

        let err = SequenceConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
