//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    /// Broadcaster-side and shared settings
    pub beacon: BeaconSettings,
    /// Receiver-only settings
    pub receiver: ReceiverSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// `[beacon]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconSettings {
    /// Advertise interval in milliseconds. Both ends must agree on it.
    pub broadcast_interval_ms: u64,
    /// Receiver stops after this many milliseconds without data.
    pub no_data_timeout_ms: u64,
    /// Manufacturer id the frame is advertised under.
    pub vendor_id: u16,
}

/// `[receiver]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverSettings {
    /// Slack on top of the broadcast interval, in milliseconds.
    pub lag_allowance_ms: u64,
    /// Scan restart period in milliseconds.
    pub scan_cycle_ms: u64,
    /// Pause between stopping and restarting a scan, in milliseconds.
    pub scan_settle_ms: u64,
    /// Number of ages kept for the delay average.
    pub delay_window: usize,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
