//! Configuration for the beacon.
//!
//! Two layers:
//!
//! - [`BeaconConfig`] - immutable timing and identity values handed to each
//!   engine at construction
//! - [`ConfigFile`] - the user's `~/.blegps/config.ini`, which produces a
//!   `BeaconConfig` via [`ConfigFile::beacon_config`]
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use blegps::config::BeaconConfig;
//!
//! let config = BeaconConfig::default().with_lag_allowance(Duration::from_millis(500));
//! assert_eq!(config.max_acceptable_delay(), Duration::from_millis(2500));
//! ```

mod beacon;
mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use beacon::{
    BeaconConfig, DEFAULT_BROADCAST_INTERVAL, DEFAULT_LAG_ALLOWANCE, DEFAULT_SCAN_CYCLE,
    DEFAULT_SCAN_SETTLE,
};
pub use file::{
    config_directory, config_file_path, BeaconSettings, ConfigFile, ConfigFileError,
    LoggingSettings, ReceiverSettings, DEFAULT_LOG_FILE_NAME,
};
