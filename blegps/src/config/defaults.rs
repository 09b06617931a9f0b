//! Default values for all configuration settings.
//!
//! Config-file defaults are expressed in the file's units and derived from
//! the runtime defaults in [`super::beacon`], so the two cannot drift.

use super::beacon::{
    DEFAULT_BROADCAST_INTERVAL, DEFAULT_LAG_ALLOWANCE, DEFAULT_SCAN_CYCLE, DEFAULT_SCAN_SETTLE,
};
use super::file::config_directory;
use super::settings::*;
use crate::delay::DEFAULT_DELAY_WINDOW;
use crate::frame::MANUFACTURER_ID;
use crate::watchdog::DEFAULT_NO_DATA_TIMEOUT;

/// Default log file name inside the config directory.
pub const DEFAULT_LOG_FILE_NAME: &str = "blegps.log";

pub const DEFAULT_BROADCAST_INTERVAL_MS: u64 = DEFAULT_BROADCAST_INTERVAL.as_millis() as u64;
pub const DEFAULT_NO_DATA_TIMEOUT_MS: u64 = DEFAULT_NO_DATA_TIMEOUT.as_millis() as u64;
pub const DEFAULT_LAG_ALLOWANCE_MS: u64 = DEFAULT_LAG_ALLOWANCE.as_millis() as u64;
pub const DEFAULT_SCAN_CYCLE_MS: u64 = DEFAULT_SCAN_CYCLE.as_millis() as u64;
pub const DEFAULT_SCAN_SETTLE_MS: u64 = DEFAULT_SCAN_SETTLE.as_millis() as u64;

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            beacon: BeaconSettings {
                broadcast_interval_ms: DEFAULT_BROADCAST_INTERVAL_MS,
                no_data_timeout_ms: DEFAULT_NO_DATA_TIMEOUT_MS,
                vendor_id: MANUFACTURER_ID,
            },
            receiver: ReceiverSettings {
                lag_allowance_ms: DEFAULT_LAG_ALLOWANCE_MS,
                scan_cycle_ms: DEFAULT_SCAN_CYCLE_MS,
                scan_settle_ms: DEFAULT_SCAN_SETTLE_MS,
                delay_window: DEFAULT_DELAY_WINDOW,
            },
            logging: LoggingSettings {
                file: config_directory().join(DEFAULT_LOG_FILE_NAME),
            },
        }
    }
}
