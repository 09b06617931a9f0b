//! Error types for the radio ports.

use thiserror::Error;

/// Errors raised synchronously by a radio port.
///
/// Asynchronous failures (a scan or advertisement that fails after being
/// accepted) arrive as events instead; see [`super::ScanEvent`] and
/// [`super::AdvertiseStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RadioError {
    /// The adapter is missing or switched off.
    #[error("Bluetooth adapter unavailable")]
    Unavailable,

    /// The host rejected the scan request outright.
    #[error("Scan start rejected: {0}")]
    ScanRejected(String),

    /// The host rejected the advertisement request outright.
    #[error("Advertise start rejected: {0}")]
    AdvertiseRejected(String),
}
