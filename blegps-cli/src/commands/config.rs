//! Configuration management CLI commands.
//!
//! Provides `config path`, `config show` and `config init` for locating,
//! viewing and creating the configuration file.

use clap::Subcommand;

use blegps::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show the effective configuration (file values over defaults)
    Show,

    /// Create the configuration file with default values if missing
    Init,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(),
        ConfigCommands::Show => run_show(),
        ConfigCommands::Init => run_init(),
    }
}

/// Show the configuration file path.
fn run_path() -> Result<(), CliError> {
    println!("{}", config_file_path().display());
    Ok(())
}

/// Show the effective configuration.
fn run_show() -> Result<(), CliError> {
    let path = config_file_path();
    let config = ConfigFile::load()?;

    println!("Configuration Settings");
    println!("======================");
    if !path.exists() {
        println!("(no file at {}, showing defaults)", path.display());
    }
    println!();

    println!("[beacon]");
    println!("  broadcast_interval_ms = {}", config.beacon.broadcast_interval_ms);
    println!("  no_data_timeout_ms = {}", config.beacon.no_data_timeout_ms);
    println!("  vendor_id = {}", config.beacon.vendor_id);
    println!();

    println!("[receiver]");
    println!("  lag_allowance_ms = {}", config.receiver.lag_allowance_ms);
    println!("  scan_cycle_ms = {}", config.receiver.scan_cycle_ms);
    println!("  scan_settle_ms = {}", config.receiver.scan_settle_ms);
    println!("  delay_window = {}", config.receiver.delay_window);
    println!();

    println!("[logging]");
    println!("  file = {}", config.logging.file.display());
    println!();

    let beacon = config.beacon_config();
    println!(
        "Receiver accepts frames up to {} ms old.",
        beacon.max_acceptable_delay().as_millis()
    );

    Ok(())
}

/// Create the configuration file if missing.
fn run_init() -> Result<(), CliError> {
    let existed = config_file_path().exists();
    let path = ConfigFile::ensure_exists()?;

    if existed {
        println!("Configuration already exists: {}", path.display());
    } else {
        println!("Created configuration: {}", path.display());
    }

    Ok(())
}
