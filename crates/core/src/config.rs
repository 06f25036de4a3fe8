//! Store configuration.
//!
//! A `StoreConfig` names the roots the store lays its directories out under
//! and how eagerly record metadata is written back to disk.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Delay used when a configuration does not specify one.
pub const DEFAULT_SAVE_DELAY_MS: i64 = 30_000;

/// When record metadata is written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceMode {
    /// Every mutation is written immediately.
    Immediate,
    /// Mutations are flushed by an external scheduler at this interval.
    Periodic(Duration),
    /// Mutations are only written on an explicit flush (e.g. shutdown).
    Disabled,
}

impl PersistenceMode {
    /// `0` is immediate, a positive value is periodic, a negative value disables
    /// persistence on update.
    pub fn from_interval_ms(interval: i64) -> Self {
        match interval {
            0 => PersistenceMode::Immediate,
            ms if ms > 0 => PersistenceMode::Periodic(Duration::from_millis(ms as u64)),
            _ => PersistenceMode::Disabled,
        }
    }

    pub fn is_immediate(&self) -> bool {
        matches!(self, PersistenceMode::Immediate)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root of `<id>/<generation>` content directories.
    pub storage_root: PathBuf,
    /// Root of `<id>/data` directories. Data files are unavailable without it.
    #[serde(default)]
    pub data_root: Option<PathBuf>,
    /// Milliseconds between metadata saves, see [`PersistenceMode::from_interval_ms`].
    #[serde(default = "default_save_delay")]
    pub save_delay_interval_ms: i64,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_save_delay() -> i64 {
    DEFAULT_SAVE_DELAY_MS
}

impl StoreConfig {
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            data_root: None,
            save_delay_interval_ms: DEFAULT_SAVE_DELAY_MS,
            log_dir: None,
        }
    }

    pub fn with_data_root(mut self, data_root: impl Into<PathBuf>) -> Self {
        self.data_root = Some(data_root.into());
        self
    }

    pub fn with_save_delay(mut self, interval_ms: i64) -> Self {
        self.save_delay_interval_ms = interval_ms;
        self
    }

    /// Get the default base directory (`~/.modstore`)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".modstore")
    }

    /// Configuration rooted at the default base directory.
    pub fn default_location() -> Self {
        let base = Self::default_base_dir();
        Self::new(base.join("storage")).with_data_root(base.join("data"))
    }

    /// Load a JSON configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid config {}: {}", path.display(), e),
            )
            .into()
        })
    }

    pub fn persistence_mode(&self) -> PersistenceMode {
        PersistenceMode::from_interval_ms(self.save_delay_interval_ms)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| Self::default_base_dir().join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_mode_from_interval() {
        assert_eq!(
            PersistenceMode::from_interval_ms(0),
            PersistenceMode::Immediate
        );
        assert_eq!(
            PersistenceMode::from_interval_ms(5000),
            PersistenceMode::Periodic(Duration::from_millis(5000))
        );
        assert_eq!(
            PersistenceMode::from_interval_ms(-1),
            PersistenceMode::Disabled
        );
    }

    #[test]
    fn test_config_from_json_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, br#"{ "storage_root": "/var/lib/mods" }"#).unwrap();

        let config = StoreConfig::from_file(&path).unwrap();
        assert_eq!(config.storage_root, PathBuf::from("/var/lib/mods"));
        assert!(config.data_root.is_none());
        assert_eq!(config.save_delay_interval_ms, DEFAULT_SAVE_DELAY_MS);
        assert_eq!(
            config.persistence_mode(),
            PersistenceMode::Periodic(Duration::from_millis(30_000))
        );
    }

    #[test]
    fn test_config_from_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, b"not json").unwrap();

        assert!(StoreConfig::from_file(&path).is_err());
    }
}
