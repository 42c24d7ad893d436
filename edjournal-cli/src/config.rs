// Copyright 2025 EDJournal (https://github.com/edjournal)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! EDJournal configuration
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables, then by command-line flags in `main`.

use anyhow::{bail, Context, Result};
use edjournal_ingest::{DispatchConfig, WatcherConfig, STATUS_FILE_NAME};
use edjournal_storage::{StoreConfig, DEFAULT_MAX_EVENTS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_DIR: &str = "EDJOURNAL_DIR";
const ENV_MAX_EVENTS: &str = "EDJOURNAL_MAX_EVENTS";
const ENV_CATCH_UP: &str = "EDJOURNAL_CATCH_UP";
const ENV_STATUS_DEBOUNCE_MS: &str = "EDJOURNAL_STATUS_DEBOUNCE_MS";
const ENV_LOG_JSON: &str = "EDJOURNAL_LOG_JSON";

/// Longest accepted status debounce window
const MAX_STATUS_DEBOUNCE_MS: u64 = 10_000;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub journal: JournalConfig,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JournalConfig {
    /// Directory holding `Journal.*.log` and `Status.json`
    #[serde(default = "default_journal_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_status_file")]
    pub status_file: String,

    /// Replay the newest journal from its start when watching begins
    #[serde(default)]
    pub catch_up: bool,

    #[serde(default = "default_status_debounce_ms")]
    pub status_debounce_ms: u64,

    /// Batches buffered between the watcher and the handlers
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreSection {
    #[serde(default = "default_max_events")]
    pub max_events: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable ones
    #[serde(default)]
    pub json: bool,

    /// Filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            dir: default_journal_dir(),
            status_file: default_status_file(),
            catch_up: false,
            status_debounce_ms: default_status_debounce_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            max_events: default_max_events(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            filter: default_log_filter(),
        }
    }
}

/// The game's journal folder under the user's Saved Games.
fn default_journal_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| {
            home.join("Saved Games")
                .join("Frontier Developments")
                .join("Elite Dangerous")
        })
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_status_file() -> String {
    STATUS_FILE_NAME.to_string()
}

fn default_status_debounce_ms() -> u64 {
    250
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_max_events() -> usize {
    DEFAULT_MAX_EVENTS
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// Where [`AppConfig::load`] found its base configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// A file was named but does not exist
    Missing(PathBuf),
    Defaults,
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => {
                tracing::info!(path = %path.display(), "Loaded configuration from file")
            }
            ConfigSource::Missing(path) => {
                tracing::warn!(path = %path.display(), "Config file not found, using defaults")
            }
            ConfigSource::Defaults => tracing::debug!("Using default configuration"),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration with priority: env > file > defaults
    ///
    /// Supported environment variables:
    /// - EDJOURNAL_DIR: journal directory
    /// - EDJOURNAL_MAX_EVENTS: retention bound (default: 10000)
    /// - EDJOURNAL_CATCH_UP: replay the newest journal on start (default: false)
    /// - EDJOURNAL_STATUS_DEBOUNCE_MS: status dispatch window (default: 250)
    /// - EDJOURNAL_LOG_JSON: JSON log output (default: false)
    ///
    /// Runs before logging is set up, so where the file came from is
    /// returned for the caller to log.
    pub fn load(config_file: Option<&Path>) -> Result<(Self, ConfigSource)> {
        let (config, source) = match config_file {
            Some(path) if path.exists() => {
                (Self::from_file(path)?, ConfigSource::File(path.to_path_buf()))
            }
            Some(path) => (Self::default(), ConfigSource::Missing(path.to_path_buf())),
            None => (Self::default(), ConfigSource::Defaults),
        };

        let config = config.merge_with(|key| std::env::var(key).ok());
        config.validate()?;
        Ok((config, source))
    }

    /// Override fields whose variable is set and parses.
    fn merge_with(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = var(ENV_DIR) {
            self.journal.dir = PathBuf::from(dir);
        }
        if let Some(max) = var(ENV_MAX_EVENTS).and_then(|v| v.parse().ok()) {
            self.store.max_events = max;
        }
        if let Some(catch_up) = var(ENV_CATCH_UP).and_then(|v| parse_bool(&v)) {
            self.journal.catch_up = catch_up;
        }
        if let Some(ms) = var(ENV_STATUS_DEBOUNCE_MS).and_then(|v| v.parse().ok()) {
            self.journal.status_debounce_ms = ms;
        }
        if let Some(json) = var(ENV_LOG_JSON).and_then(|v| parse_bool(&v)) {
            self.logging.json = json;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.max_events == 0 {
            bail!("store.max_events must be at least 1");
        }
        if self.journal.queue_capacity == 0 {
            bail!("journal.queue_capacity must be at least 1");
        }
        if self.journal.status_debounce_ms > MAX_STATUS_DEBOUNCE_MS {
            bail!(
                "journal.status_debounce_ms must be at most {}ms, got {}",
                MAX_STATUS_DEBOUNCE_MS,
                self.journal.status_debounce_ms
            );
        }
        if self.journal.status_file.is_empty() {
            bail!("journal.status_file must not be empty");
        }
        Ok(())
    }

    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig::new(&self.journal.dir)
            .with_catch_up(self.journal.catch_up)
            .with_status_file(&self.journal.status_file)
            .with_status_debounce(Duration::from_millis(self.journal.status_debounce_ms))
            .with_dispatch(DispatchConfig {
                queue_capacity: self.journal.queue_capacity,
                ..DispatchConfig::default()
            })
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::with_max_events(self.store.max_events)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.store.max_events, DEFAULT_MAX_EVENTS);
        assert_eq!(config.journal.status_file, "Status.json");
        assert_eq!(config.journal.status_debounce_ms, 250);
        assert!(!config.journal.catch_up);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[journal]\ndir = \"/data/journal\"\ncatch_up = true\n\n[store]\nmax_events = 500").unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.journal.dir, PathBuf::from("/data/journal"));
        assert!(config.journal.catch_up);
        assert_eq!(config.store.max_events, 500);
        assert_eq!(config.journal.status_debounce_ms, 250);
        assert!(!config.logging.json);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_DIR, "/env/journal"),
            (ENV_MAX_EVENTS, "42"),
            (ENV_CATCH_UP, "yes"),
            (ENV_STATUS_DEBOUNCE_MS, "not-a-number"),
            (ENV_LOG_JSON, "1"),
        ]
        .into_iter()
        .collect();

        let config = AppConfig::default().merge_with(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.journal.dir, PathBuf::from("/env/journal"));
        assert_eq!(config.store.max_events, 42);
        assert!(config.journal.catch_up);
        assert_eq!(config.journal.status_debounce_ms, 250);
        assert!(config.logging.json);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.store.max_events = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.journal.status_debounce_ms = 60_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_watcher_config_mapping() {
        let mut config = AppConfig::default();
        config.journal.dir = PathBuf::from("/j");
        config.journal.status_debounce_ms = 100;
        let watcher = config.watcher_config();
        assert_eq!(watcher.journal_dir, PathBuf::from("/j"));
        assert_eq!(watcher.status_debounce, Duration::from_millis(100));
        assert_eq!(config.store_config().max_events, DEFAULT_MAX_EVENTS);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("absent.toml");
        let (config, source) = AppConfig::load(Some(&absent)).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(source, ConfigSource::Missing(absent));
    }

    #[test]
    fn test_load_reports_file_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\njson = true").unwrap();
        let (_, source) = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(source, ConfigSource::File(file.path().to_path_buf()));

        let (_, source) = AppConfig::load(None).unwrap();
        assert_eq!(source, ConfigSource::Defaults);
    }
}
