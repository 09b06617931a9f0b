//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[beacon]
; How often the broadcaster refreshes its advertisement, in milliseconds (default: 2000)
; The receiver uses the same value to judge staleness, so set it identically
; on both devices.
broadcast_interval_ms = {}
; Receiver stops after this long without a valid frame, in milliseconds
; (default: 300000 = 5 minutes)
no_data_timeout_ms = {}
; Manufacturer id the position frame is advertised under (default: 1001)
vendor_id = {}

[receiver]
; Extra age tolerated on top of broadcast_interval_ms before a scan result
; is dropped as stale, in milliseconds (default: 1000)
lag_allowance_ms = {}
; Scans are stopped and restarted this often, in milliseconds (default: 30000)
scan_cycle_ms = {}
; Pause between stopping and restarting a scan, in milliseconds (default: 500)
scan_settle_ms = {}
; Number of recent observation ages averaged for diagnostics (default: 10)
delay_window = {}

[logging]
; Log file path (default: ~/.blegps/blegps.log)
file = {}
"#,
        config.beacon.broadcast_interval_ms,
        config.beacon.no_data_timeout_ms,
        config.beacon.vendor_id,
        config.receiver.lag_allowance_ms,
        config.receiver.scan_cycle_ms,
        config.receiver.scan_settle_ms,
        config.receiver.delay_window,
        path_to_string(&config.logging.file),
    )
}

/// Shortens paths under the home directory to `~/...`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_every_section() {
        let content = to_config_string(&ConfigFile::default());

        assert!(content.contains("[beacon]"));
        assert!(content.contains("[receiver]"));
        assert!(content.contains("[logging]"));
        assert!(content.contains("broadcast_interval_ms = 2000"));
        assert!(content.contains("scan_settle_ms = 500"));
    }

    #[test]
    fn test_home_paths_shortened() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(path_to_string(&home.join(".blegps/x.log")), "~/.blegps/x.log");
        }
    }
}
