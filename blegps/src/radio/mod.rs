//! Radio ports.
//!
//! The engines never talk to a Bluetooth stack directly. They drive these
//! traits, which a host binding implements over its native advertise and
//! scan APIs:
//!
//! - [`Advertiser`] - broadcasts a vendor-tagged payload
//! - [`Scanner`] - reports advertisements matching a vendor filter
//! - [`Capabilities`] - answers whether the host granted a permission
//!
//! Completion and failure callbacks are delivered over unbounded channels so
//! a host callback thread never blocks on an engine.
//!
//! [`memory`] provides an in-process implementation used by the CLI
//! simulator and the tests.

mod error;
pub mod memory;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::Instant;

pub use error::RadioError;

/// Channel the scanner reports results and failures on.
pub type ScanEventSender = mpsc::UnboundedSender<ScanEvent>;

/// Channel the advertiser reports start outcomes on.
pub type AdvertiseStatusSender = mpsc::UnboundedSender<AdvertiseStatus>;

/// Host permissions the engines check before starting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Scan for nearby advertisements.
    Scan,
    /// Emit advertisements.
    Advertise,
    /// Read the device position.
    Location,
    /// Keep running as a foreground service.
    ForegroundService,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Scan => "scan",
            Capability::Advertise => "advertise",
            Capability::Location => "location",
            Capability::ForegroundService => "foreground-service",
        };
        f.write_str(name)
    }
}

/// Permission oracle.
pub trait Capabilities: Send + Sync {
    fn is_granted(&self, capability: Capability) -> bool;
}

// ─────────────────────────────────────────────────────────────────────────────
// Advertising
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertiseMode {
    LowPower,
    Balanced,
    LowLatency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxPowerLevel {
    UltraLow,
    Low,
    Medium,
    High,
}

/// How the advertisement is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertiseSettings {
    pub mode: AdvertiseMode,
    pub tx_power: TxPowerLevel,
    pub connectable: bool,
    /// `None` advertises until stopped.
    pub timeout: Option<Duration>,
}

impl Default for AdvertiseSettings {
    /// Low latency, low power, non-connectable, no timeout.
    fn default() -> Self {
        Self {
            mode: AdvertiseMode::LowLatency,
            tx_power: TxPowerLevel::Low,
            connectable: false,
            timeout: None,
        }
    }
}

/// One advertisement: settings plus the manufacturer-specific data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertiseRequest {
    pub settings: AdvertiseSettings,
    pub vendor_id: u16,
    pub payload: Bytes,
    pub include_device_name: bool,
    pub include_tx_power_level: bool,
}

impl AdvertiseRequest {
    /// Request with default settings and no device name or TX power level.
    pub fn new(vendor_id: u16, payload: Bytes) -> Self {
        Self {
            settings: AdvertiseSettings::default(),
            vendor_id,
            payload,
            include_device_name: false,
            include_tx_power_level: false,
        }
    }
}

/// Reason an advertisement failed to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertiseFailure {
    DataTooLarge,
    TooManyAdvertisers,
    AlreadyStarted,
    InternalError,
    FeatureUnsupported,
    Other(i32),
}

impl AdvertiseFailure {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::DataTooLarge,
            2 => Self::TooManyAdvertisers,
            3 => Self::AlreadyStarted,
            4 => Self::InternalError,
            5 => Self::FeatureUnsupported,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::DataTooLarge => 1,
            Self::TooManyAdvertisers => 2,
            Self::AlreadyStarted => 3,
            Self::InternalError => 4,
            Self::FeatureUnsupported => 5,
            Self::Other(code) => *code,
        }
    }
}

impl fmt::Display for AdvertiseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "advertise failed: {:?} (code {})", self, self.code())
    }
}

/// Outcome of a start request, reported after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertiseStatus {
    Started,
    Failed(AdvertiseFailure),
}

/// Advertising port.
pub trait Advertiser: Send + Sync {
    /// Whether an advertiser is present and enabled.
    fn is_available(&self) -> bool;

    /// Starts advertising. The outcome is reported on `status`.
    fn start_advertising(
        &self,
        request: AdvertiseRequest,
        status: AdvertiseStatusSender,
    ) -> Result<(), RadioError>;

    /// Stops the current advertisement. No-op when none is active.
    fn stop_advertising(&self);
}

// ─────────────────────────────────────────────────────────────────────────────
// Scanning
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    LowPower,
    Balanced,
    LowLatency,
}

/// Scan settings: low latency with immediate reporting by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
    pub mode: ScanMode,
    pub report_delay: Duration,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            mode: ScanMode::LowLatency,
            report_delay: Duration::ZERO,
        }
    }
}

/// Matches advertisements carrying manufacturer data for one vendor id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanFilter {
    pub vendor_id: u16,
}

/// One observed advertisement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Manufacturer-specific data for the filtered vendor id.
    pub payload: Bytes,
    /// When the radio captured the advertisement.
    pub captured_at: Instant,
}

/// Reason a scan failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanFailure {
    AlreadyStarted,
    /// The host lost the scan registration; recoverable by restarting.
    ApplicationRegistrationFailed,
    InternalError,
    FeatureUnsupported,
    OutOfHardwareResources,
    ScanningTooFrequently,
    Other(i32),
}

impl ScanFailure {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::AlreadyStarted,
            2 => Self::ApplicationRegistrationFailed,
            3 => Self::InternalError,
            4 => Self::FeatureUnsupported,
            5 => Self::OutOfHardwareResources,
            6 => Self::ScanningTooFrequently,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::AlreadyStarted => 1,
            Self::ApplicationRegistrationFailed => 2,
            Self::InternalError => 3,
            Self::FeatureUnsupported => 4,
            Self::OutOfHardwareResources => 5,
            Self::ScanningTooFrequently => 6,
            Self::Other(code) => *code,
        }
    }

    /// Whether restarting the scan is expected to clear the failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ApplicationRegistrationFailed)
    }
}

impl fmt::Display for ScanFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scan failed: {:?} (code {})", self, self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    Report(ScanReport),
    Failed(ScanFailure),
}

/// Scanning port.
pub trait Scanner: Send + Sync {
    /// Whether a scanner is present and enabled.
    fn is_available(&self) -> bool;

    /// Starts scanning. Matching advertisements and asynchronous failures
    /// are reported on `events`.
    fn start_scan(
        &self,
        filter: ScanFilter,
        settings: ScanSettings,
        events: ScanEventSender,
    ) -> Result<(), RadioError>;

    /// Stops the current scan. No-op when none is active.
    fn stop_scan(&self);
}

/// The set of ports a beacon runs against.
#[derive(Clone)]
pub struct RadioPorts {
    pub advertiser: Arc<dyn Advertiser>,
    pub scanner: Arc<dyn Scanner>,
    pub capabilities: Arc<dyn Capabilities>,
}

impl fmt::Debug for RadioPorts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RadioPorts")
            .field("advertiser_available", &self.advertiser.is_available())
            .field("scanner_available", &self.scanner.is_available())
            .finish()
    }
}
