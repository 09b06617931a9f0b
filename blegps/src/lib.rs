//! BLE GPS - share a position between two nearby devices over Bluetooth LE
//!
//! One device runs the **broadcaster**: it encodes its position into a
//! 19-byte frame and advertises it as manufacturer data. The other runs the
//! **receiver**: it scans for the frame, drops stale or malformed
//! observations and injects the rest into a location sink.
//!
//! # High-Level API
//!
//! [`service::RoleController`] owns the engines and keeps the two roles
//! mutually exclusive:
//!
//! ```ignore
//! use std::sync::Arc;
//! use blegps::config::BeaconConfig;
//! use blegps::radio::{memory::{Airwaves, StaticCapabilities}, RadioPorts};
//! use blegps::service::RoleController;
//! use blegps::sink::ChannelSink;
//!
//! let airwaves = Airwaves::new();
//! let ports = RadioPorts {
//!     advertiser: Arc::new(airwaves.advertiser()),
//!     scanner: Arc::new(airwaves.scanner()),
//!     capabilities: Arc::new(StaticCapabilities::all()),
//! };
//! let mut controller =
//!     RoleController::new(BeaconConfig::default(), ports, Arc::new(ChannelSink::new(16)));
//!
//! controller.start_receiver().await?;
//! ```

pub mod broadcaster;
pub mod config;
pub mod delay;
pub mod frame;
pub mod logging;
pub mod radio;
pub mod receiver;
pub mod service;
pub mod sink;
pub mod timer;
pub mod watchdog;

/// Version of the library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
