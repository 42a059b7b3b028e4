//! Application configuration
//!
//! Loaded from `~/.config/echobox/config.json` if present. A missing file means
//! defaults; a malformed file is logged and ignored.

use anyhow::{Context as _, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Directory where saved recordings are stored
    #[serde(default = "default_recordings_dir")]
    pub recordings_dir: PathBuf,

    /// Require a second click before deleting a recording
    #[serde(default = "default_confirm_on_delete")]
    pub confirm_on_delete: bool,
}

fn default_recordings_dir() -> PathBuf {
    PathBuf::from("recordings")
}

fn default_confirm_on_delete() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recordings_dir: default_recordings_dir(),
            confirm_on_delete: default_confirm_on_delete(),
        }
    }
}

impl Config {
    /// Load the configuration, falling back to defaults on any failure.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::read_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring config at {:?}: {:#}", path, e);
                Self::default()
            }
        }
    }

    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("echobox").join("config.json"))
    }

    fn read_from(path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).context("failed to read config file")?;
        serde_json::from_str(&contents).context("failed to parse config file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.recordings_dir, PathBuf::from("recordings"));
        assert!(config.confirm_on_delete);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"confirm_on_delete": false}"#).unwrap();
        assert_eq!(config.recordings_dir, PathBuf::from("recordings"));
        assert!(!config.confirm_on_delete);
    }

    #[test]
    fn test_full_config() {
        let config: Config =
            serde_json::from_str(r#"{"recordings_dir": "/tmp/voice", "confirm_on_delete": true}"#)
                .unwrap();
        assert_eq!(config.recordings_dir, PathBuf::from("/tmp/voice"));
    }

    #[test]
    fn test_malformed_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(Config::read_from(&path).is_err());
    }
}
