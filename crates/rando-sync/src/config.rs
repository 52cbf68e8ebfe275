//! Configuration loading for `rando-sync`.
//!
//! The configuration lives in `rando-sync.yaml` in the working directory.
//! Every field has a default, so the file and any section of it may be
//! left out.

use std::path::Path;

use rando_observer::ObserverConfig;
use rando_tracker::HubConfig;
use serde::Deserialize;
use tracing::warn;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration. Mirrors `rando-sync.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SyncConfig {
    /// Local tracker server.
    #[serde(default)]
    pub tracker: HubConfig,

    /// Remote match observers.
    #[serde(default)]
    pub observer: ObserverConfig,
}

impl SyncConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the YAML is malformed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string. The environment is not
    /// consulted.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Override fields from environment variables.
    ///
    /// `RANDO_TRACKER_PORT` plus everything
    /// [`ObserverConfig::apply_env_overrides`] reads.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("RANDO_TRACKER_PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.tracker.port = port,
                Err(e) => warn!(value = %val, error = %e, "Ignoring invalid RANDO_TRACKER_PORT"),
            }
        }
        self.observer.apply_env_overrides();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rando_tracker::DEFAULT_TRACKER_PORT;
    use rando_types::{GameId, UserId};

    #[test]
    fn empty_document_uses_defaults() {
        let config = SyncConfig::parse("{}").unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.tracker.port, DEFAULT_TRACKER_PORT);
        assert_eq!(config.observer.max_retries, 5);
        assert_eq!(config.observer.user_id, None);
    }

    #[test]
    fn full_document_parses() {
        let yaml = r"
tracker:
  host: 127.0.0.1
  port: 31411
  debug_routes: true
observer:
  ws_base_url: ws://localhost:8081/api
  api_base_url: http://localhost:8081/api
  max_retries: 3
  retry_delay_ms: 250
  user_id: player-1
  games: [42, 43]
";
        let config = SyncConfig::parse(yaml).ok();
        assert_eq!(config.as_ref().map(|c| c.tracker.debug_routes), Some(true));
        assert_eq!(config.as_ref().map(|c| c.observer.retry_delay_ms), Some(250));
        assert_eq!(
            config.as_ref().map(|c| c.observer.games.clone()),
            Some(vec![GameId::from(42), GameId::from(43)])
        );
        assert_eq!(
            config.and_then(|c| c.observer.user_id),
            Some(UserId::new("player-1"))
        );
    }

    #[test]
    fn parse_takes_document_values_verbatim() {
        let config = SyncConfig::parse("tracker:\n  port: 40000\nobserver:\n  user_id: alice\n")
            .unwrap();
        assert_eq!(config.tracker.port, 40000);
        assert_eq!(config.observer.user_id, Some(UserId::new("alice")));
        assert_eq!(
            config.observer,
            ObserverConfig {
                user_id: Some(UserId::new("alice")),
                ..ObserverConfig::default()
            }
        );
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = SyncConfig::parse("observer:\n  max_retries: 9\n").ok();
        assert_eq!(config.as_ref().map(|c| c.observer.max_retries), Some(9));
        assert_eq!(config.map(|c| c.observer.retry_delay_ms), Some(1000));
    }

    #[test]
    fn malformed_yaml_is_rejected() {
        let result = SyncConfig::parse("tracker: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = SyncConfig::from_file(Path::new("does-not-exist/rando-sync.yaml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
