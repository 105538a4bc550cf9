use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::shell::recent::DEFAULT_RECENT_CAPACITY;
use crate::tui::ThemeVariant;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub theme: ThemeVariant,
    pub recent_capacity: usize,
    pub toast_lifetime_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: ThemeVariant::Mocha,
            recent_capacity: DEFAULT_RECENT_CAPACITY,
            toast_lifetime_secs: 6,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vellum").join("shell.toml"))
    }

    /// Load settings from `path`, or the default location. A missing file
    /// (or missing keys) falls back to defaults; a file that exists but does
    /// not parse is a startup error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::config_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_all_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn missing_keys_fall_back_individually() {
        let settings: Settings = toml::from_str("theme = \"latte\"").unwrap();
        assert_eq!(settings.theme, ThemeVariant::Latte);
        assert_eq!(settings.recent_capacity, DEFAULT_RECENT_CAPACITY);
    }

    #[test]
    fn malformed_config_is_rejected() {
        assert!(toml::from_str::<Settings>("recent_capacity = \"lots\"").is_err());
    }
}
