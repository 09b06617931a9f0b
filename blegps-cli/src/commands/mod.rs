//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`codec`] - Frame encoding and decoding (encode, decode)
//! - [`config`] - Configuration management (path, show, init)
//! - [`simulate`] - Broadcaster and receiver over a simulated radio

pub mod codec;
pub mod config;
pub mod simulate;
