//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;

use ini::Ini;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [beacon] section
    if let Some(section) = ini.section(Some("beacon")) {
        if let Some(v) = section.get("broadcast_interval_ms") {
            config.beacon.broadcast_interval_ms =
                parse_interval("beacon", "broadcast_interval_ms", v)?;
        }
        if let Some(v) = section.get("no_data_timeout_ms") {
            config.beacon.no_data_timeout_ms =
                parse_interval("beacon", "no_data_timeout_ms", v)?;
        }
        if let Some(v) = section.get("vendor_id") {
            config.beacon.vendor_id =
                v.trim().parse().map_err(|_| ConfigFileError::InvalidValue {
                    section: "beacon".to_string(),
                    key: "vendor_id".to_string(),
                    value: v.to_string(),
                    reason: "must be an integer between 0 and 65535".to_string(),
                })?;
        }
    }

    // [receiver] section
    if let Some(section) = ini.section(Some("receiver")) {
        if let Some(v) = section.get("lag_allowance_ms") {
            config.receiver.lag_allowance_ms = parse_millis("receiver", "lag_allowance_ms", v)?;
        }
        if let Some(v) = section.get("scan_cycle_ms") {
            config.receiver.scan_cycle_ms = parse_interval("receiver", "scan_cycle_ms", v)?;
        }
        if let Some(v) = section.get("scan_settle_ms") {
            config.receiver.scan_settle_ms = parse_millis("receiver", "scan_settle_ms", v)?;
        }
        if let Some(v) = section.get("delay_window") {
            config.receiver.delay_window = match v.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigFileError::InvalidValue {
                        section: "receiver".to_string(),
                        key: "delay_window".to_string(),
                        value: v.to_string(),
                        reason: "must be a positive integer".to_string(),
                    });
                }
            };
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

/// Parses a non-negative millisecond value.
fn parse_millis(section: &str, key: &str, value: &str) -> Result<u64, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be a non-negative integer (milliseconds)".to_string(),
        })
}

/// Parses a strictly positive millisecond value.
fn parse_interval(section: &str, key: &str, value: &str) -> Result<u64, ConfigFileError> {
    match value.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(ms),
        _ => Err(ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be a positive integer (milliseconds)".to_string(),
        }),
    }
}

pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;
    use tempfile::TempDir;

    fn load(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(&config_path, content).unwrap();
        ConfigFile::load_from(&config_path)
    }

    #[test]
    fn test_overlays_values() {
        let config = load(
            r#"
[beacon]
broadcast_interval_ms = 1000
vendor_id = 76

[receiver]
lag_allowance_ms = 250
scan_settle_ms = 0
delay_window = 3
"#,
        )
        .unwrap();

        assert_eq!(config.beacon.broadcast_interval_ms, 1000);
        assert_eq!(config.beacon.vendor_id, 76);
        assert_eq!(config.beacon.no_data_timeout_ms, DEFAULT_NO_DATA_TIMEOUT_MS);
        assert_eq!(config.receiver.lag_allowance_ms, 250);
        assert_eq!(config.receiver.scan_settle_ms, 0);
        assert_eq!(config.receiver.scan_cycle_ms, DEFAULT_SCAN_CYCLE_MS);
        assert_eq!(config.receiver.delay_window, 3);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = load(
            r#"
[beacon]
broadcast_interval_ms = 0
"#,
        )
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("beacon.broadcast_interval_ms"));
        assert!(message.contains("must be a positive integer"));
    }

    #[test]
    fn test_zero_scan_cycle_rejected() {
        assert!(load("[receiver]\nscan_cycle_ms = 0\n").is_err());
        assert!(load("[beacon]\nno_data_timeout_ms = 0\n").is_err());
    }

    #[test]
    fn test_non_numeric_rejected() {
        let err = load("[receiver]\nlag_allowance_ms = soon\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigFileError::InvalidValue { ref key, .. } if key == "lag_allowance_ms"
        ));
    }

    #[test]
    fn test_vendor_id_out_of_range() {
        assert!(load("[beacon]\nvendor_id = 70000\n").is_err());
    }

    #[test]
    fn test_zero_delay_window_rejected() {
        assert!(load("[receiver]\ndelay_window = 0\n").is_err());
    }

    #[test]
    fn test_logging_file_tilde_expanded() {
        let config = load("[logging]\nfile = ~/logs/beacon.log\n").unwrap();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(config.logging.file, home.join("logs/beacon.log"));
        }
    }

    #[test]
    fn test_empty_logging_file_keeps_default() {
        let config = load("[logging]\nfile =\n").unwrap();
        assert!(config.logging.file.ends_with(DEFAULT_LOG_FILE_NAME));
    }
}
