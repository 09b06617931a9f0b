//! Configuration file handling for ~/.blegps/config.ini.
//!
//! Loads and saves user configuration with sensible defaults.
//! Settings structs live in [`super::settings`], constants in [`super::defaults`],
//! parsing in [`super::parser`], and serialization in [`super::writer`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::beacon::BeaconConfig;
pub use super::defaults::*;
pub use super::settings::*;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path (~/.blegps/config.ini).
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to the default path (~/.blegps/config.ini).
    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Create the default config file if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            Self::default().save_to(&path)?;
        }
        Ok(path)
    }

    /// Runtime configuration for the engines.
    pub fn beacon_config(&self) -> BeaconConfig {
        BeaconConfig::default()
            .with_broadcast_interval(Duration::from_millis(self.beacon.broadcast_interval_ms))
            .with_no_data_timeout(Duration::from_millis(self.beacon.no_data_timeout_ms))
            .with_vendor_id(self.beacon.vendor_id)
            .with_lag_allowance(Duration::from_millis(self.receiver.lag_allowance_ms))
            .with_scan_cycle(Duration::from_millis(self.receiver.scan_cycle_ms))
            .with_scan_settle(Duration::from_millis(self.receiver.scan_settle_ms))
            .with_delay_window(self.receiver.delay_window)
    }
}

/// Get the path to the config directory (~/.blegps).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".blegps")
}

/// Get the path to the config file (~/.blegps/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();

        assert_eq!(config.beacon.broadcast_interval_ms, 2000);
        assert_eq!(config.beacon.no_data_timeout_ms, 300_000);
        assert_eq!(config.beacon.vendor_id, 1001);
        assert_eq!(config.receiver.lag_allowance_ms, 1000);
        assert_eq!(config.receiver.scan_cycle_ms, 30_000);
        assert_eq!(config.receiver.scan_settle_ms, 500);
        assert!(config.logging.file.ends_with("blegps.log"));
    }

    #[test]
    fn test_default_beacon_config_matches_runtime_defaults() {
        assert_eq!(ConfigFile::default().beacon_config(), BeaconConfig::default());
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.ini");

        let config = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.ini");

        ConfigFile::default().save_to(&config_path).unwrap();
        assert!(config_path.exists());
    }

    #[test]
    fn test_save_then_load_preserves_values() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");

        let mut config = ConfigFile::default();
        config.beacon.broadcast_interval_ms = 750;
        config.receiver.lag_allowance_ms = 0;
        config.receiver.delay_window = 4;
        config.logging.file = temp_dir.path().join("beacon.log");
        config.save_to(&config_path).unwrap();

        let loaded = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(
            loaded.beacon_config().max_acceptable_delay(),
            Duration::from_millis(750)
        );
    }
}
