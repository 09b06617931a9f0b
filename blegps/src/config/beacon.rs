//! Runtime configuration for the beacon engines.

use std::time::Duration;

use crate::delay::DEFAULT_DELAY_WINDOW;
use crate::frame::MANUFACTURER_ID;
use crate::watchdog::DEFAULT_NO_DATA_TIMEOUT;

/// Default advertise interval (2 seconds).
pub const DEFAULT_BROADCAST_INTERVAL: Duration = Duration::from_millis(2000);

/// Default slack on top of the broadcast interval before a scan result is
/// considered stale (1 second).
pub const DEFAULT_LAG_ALLOWANCE: Duration = Duration::from_millis(1000);

/// Default scan restart period (30 seconds).
pub const DEFAULT_SCAN_CYCLE: Duration = Duration::from_secs(30);

/// Default pause between stopping and restarting a scan (500 ms).
pub const DEFAULT_SCAN_SETTLE: Duration = Duration::from_millis(500);

/// Timing and identity shared by the broadcaster and the receiver.
///
/// The receiver uses the broadcaster's interval to judge staleness, so both
/// ends must agree on `broadcast_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeaconConfig {
    /// Minimum spacing between position-driven advertisement changes, and
    /// the refresh tick period.
    pub broadcast_interval: Duration,
    /// Extra age tolerated on top of `broadcast_interval`.
    pub lag_allowance: Duration,
    /// Receiver stops after this long without an admitted frame.
    pub no_data_timeout: Duration,
    /// Scan restart period.
    pub scan_cycle: Duration,
    /// Pause between stopping and restarting a scan.
    pub scan_settle: Duration,
    /// Number of ages kept for the delay average.
    pub delay_window: usize,
    /// Manufacturer id the frame is advertised under and filtered by.
    pub vendor_id: u16,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            broadcast_interval: DEFAULT_BROADCAST_INTERVAL,
            lag_allowance: DEFAULT_LAG_ALLOWANCE,
            no_data_timeout: DEFAULT_NO_DATA_TIMEOUT,
            scan_cycle: DEFAULT_SCAN_CYCLE,
            scan_settle: DEFAULT_SCAN_SETTLE,
            delay_window: DEFAULT_DELAY_WINDOW,
            vendor_id: MANUFACTURER_ID,
        }
    }
}

impl BeaconConfig {
    /// Oldest observation the receiver admits.
    pub fn max_acceptable_delay(&self) -> Duration {
        self.broadcast_interval + self.lag_allowance
    }

    pub fn with_broadcast_interval(mut self, interval: Duration) -> Self {
        self.broadcast_interval = interval;
        self
    }

    pub fn with_lag_allowance(mut self, lag: Duration) -> Self {
        self.lag_allowance = lag;
        self
    }

    pub fn with_no_data_timeout(mut self, timeout: Duration) -> Self {
        self.no_data_timeout = timeout;
        self
    }

    pub fn with_scan_cycle(mut self, cycle: Duration) -> Self {
        self.scan_cycle = cycle;
        self
    }

    pub fn with_scan_settle(mut self, settle: Duration) -> Self {
        self.scan_settle = settle;
        self
    }

    pub fn with_delay_window(mut self, samples: usize) -> Self {
        self.delay_window = samples;
        self
    }

    pub fn with_vendor_id(mut self, vendor_id: u16) -> Self {
        self.vendor_id = vendor_id;
        self
    }
}
