//! Configuration management.
//!
//! Loads settings from `~/.config/phosphor/config.json`; every field is
//! optional and falls back to its default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shell to spawn; `$SHELL` then `/bin/sh` when unset.
    pub shell: Option<String>,
    /// Literal reply to ENQ. Empty by default.
    pub answerback: String,
    /// Initial grid size.
    pub columns: usize,
    pub rows: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: None,
            answerback: String::new(),
            columns: 80,
            rows: 24,
        }
    }
}

impl Config {
    fn path() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".config/phosphor/config.json"))
    }

    /// Load the config file, falling back to defaults when it is
    /// missing or malformed.
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            return Self::default();
        };
        let Ok(text) = fs::read_to_string(&path) else {
            return Self::default();
        };
        match serde_json::from_str(&text) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("invalid config {}: {}", path.display(), err);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_a_vt100() {
        let config = Config::default();
        assert_eq!(config.columns, 80);
        assert_eq!(config.rows, 24);
        assert!(config.answerback.is_empty());
        assert!(config.shell.is_none());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: Config = serde_json::from_str(r#"{"answerback":"here"}"#).unwrap();
        assert_eq!(config.answerback, "here");
        assert_eq!(config.columns, 80);
    }
}
