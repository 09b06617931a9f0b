//! CLI runner for common setup.
//!
//! Encapsulates config loading, logging initialization and the async
//! runtime so command handlers only deal with their own work.

use std::future::Future;

use tracing::info;

use blegps::config::{BeaconConfig, ConfigFile};
use blegps::logging::{init_logging, LoggingGuard};

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
}

impl CliRunner {
    /// Create a new CLI runner, loading config and initializing logging.
    ///
    /// Log output goes to the file named in `[logging]`. With `debug_mode`
    /// the level drops to debug and log lines are mirrored to stdout.
    pub fn with_debug(debug_mode: bool) -> Result<Self, CliError> {
        let config = ConfigFile::load()?;

        let logging_guard = init_logging(&config.logging.file, debug_mode, debug_mode)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Timing and identity values for the engines.
    pub fn beacon_config(&self) -> BeaconConfig {
        self.config.beacon_config()
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("BLE GPS v{}", blegps::VERSION);
        info!("BLE GPS CLI: {} command", command);
    }

    /// Runs `future` to completion on a fresh multi-threaded runtime.
    pub fn block_on<F: Future>(&self, future: F) -> Result<F::Output, CliError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)?;
        Ok(runtime.block_on(future))
    }
}
