//! Start failures.

use thiserror::Error;

use crate::radio::{Capability, RadioError};

/// Why an engine refused to start. The engine stays `Stopped`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    /// The scanning radio is missing or off.
    #[error("Bluetooth scanner unavailable")]
    ScannerUnavailable,

    /// The advertising radio is missing or off.
    #[error("Bluetooth advertiser unavailable")]
    AdvertiserUnavailable,

    /// A required capability was not granted.
    #[error("Missing permission: {0}")]
    PermissionDenied(Capability),

    /// The radio rejected the initial request.
    #[error("Radio failure: {0}")]
    Radio(#[from] RadioError),
}
