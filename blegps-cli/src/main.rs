//! BLE GPS CLI - Command-line interface
//!
//! This binary provides a command-line interface to the blegps library:
//! frame encoding and decoding, a two-device simulation over an in-memory
//! radio, and configuration management.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};

use commands::codec::{DecodeArgs, EncodeArgs};
use commands::config::ConfigCommands;
use commands::simulate::SimulateArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "blegps")]
#[command(version = blegps::VERSION)]
#[command(about = "Share a GPS position between nearby devices over BLE", long_about = None)]
struct Cli {
    /// Enable debug logging (also mirrors log output to stdout)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a position into a frame and print it as hex
    Encode(EncodeArgs),

    /// Decode a hex frame and print the position
    Decode(DecodeArgs),

    /// Run a broadcaster and a receiver against a simulated radio
    Simulate(SimulateArgs),

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    let result: Result<(), CliError> = match cli.command {
        Commands::Encode(args) => commands::codec::run_encode(args),
        Commands::Decode(args) => commands::codec::run_decode(args),
        Commands::Simulate(args) => commands::simulate::run(args, cli.debug),
        Commands::Config(command) => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
