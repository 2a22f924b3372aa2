use crate::order::RecordLayout;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Apps Script endpoint returning the latest order row
pub const DEFAULT_ENDPOINT: &str = "https://script.google.com/macros/s/AKfycbwOltLszBi2RPoNgBmEouIRY7U3S5VIx_C6zrow1M_ck00_FnW8AJm9FNGL8K7VBmRW/exec";

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub source: SourceSettings,
    #[serde(default)]
    pub record: RecordLayout,
    #[serde(default)]
    pub display: DisplaySettings,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceSettings {
    pub endpoint: String,
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            poll_interval_ms: 5000,
            timeout_ms: 10_000,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplaySettings {
    pub color_scheme: u8,   // 0-9, same as the !..) keys
    pub frame_ms: u64,
    pub map_padding: u16,   // braille dots kept clear around fitted map bounds
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            color_scheme: 0,
            frame_ms: 50,
            map_padding: 12,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("config file {0} does not exist")]
    Missing(PathBuf),
    #[error("cannot read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid config {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}

impl Settings {
    /// Load from the default config location. No file means defaults;
    /// an unreadable or invalid one is logged and also gives defaults.
    pub fn load() -> Self {
        match Self::read(&Self::config_path()) {
            Ok(settings) => settings,
            Err(SettingsError::Missing(_)) => Self::default(),
            Err(e) => {
                warn!("{e}; using defaults");
                Self::default()
            }
        }
    }

    /// Read a config file the user asked for; every problem is an error
    pub fn read(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Err(SettingsError::Missing(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("orderglobe")
            .join("config.toml")
    }

    /// Default log file for interactive mode
    pub fn log_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("orderglobe")
            .join("orderglobe.log")
    }
}
