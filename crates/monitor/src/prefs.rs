//! Preference store
//!
//! Remembers the last log file path and chat channel between runs, as a
//! small TOML file under the OS config directory. Reading tolerates a
//! missing or unreadable file (first run, corrupted file): preferences
//! simply start empty.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Stored preferences; every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Last monitored log file path
    pub path: Option<String>,
    /// Last monitored chat channel
    pub channel: Option<String>,
}

/// Reads and writes [`Preferences`] at a fixed location
#[derive(Debug)]
pub struct PrefStore {
    file: PathBuf,
}

impl PrefStore {
    /// Store backed by the given file
    pub fn at(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }

    /// Default location under the OS config directory, if one exists
    pub fn default_location() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("bidwatch").join("prefs.toml"))
    }

    /// Load preferences; any failure yields empty preferences
    pub fn load(&self) -> Preferences {
        let raw = match fs::read_to_string(&self.file) {
            Ok(raw) => raw,
            // First run: nothing stored yet
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Preferences::default(),
            Err(e) => {
                warn!(file = %self.file.display(), error = %e, "cannot read preferences");
                return Preferences::default();
            }
        };
        match toml::from_str(&raw) {
            Ok(preferences) => preferences,
            Err(e) => {
                warn!(file = %self.file.display(), error = %e, "ignoring malformed preferences");
                Preferences::default()
            }
        }
    }

    /// Persist preferences, creating parent directories as needed
    pub fn save(&self, preferences: &Preferences) -> anyhow::Result<()> {
        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let raw = toml::to_string_pretty(preferences)?;
        fs::write(&self.file, raw).with_context(|| format!("writing {}", self.file.display()))
    }
}
