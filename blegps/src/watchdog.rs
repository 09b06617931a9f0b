//! No-data watchdog.
//!
//! Stops the receiver when no valid frame has been admitted for a whole
//! timeout. The deadline is re-armed when scanning starts, after every
//! admitted frame and after every scan-cycle restart. It fires at most once
//! per arm.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::timer::Deadline;

/// Default no-data timeout (5 minutes).
pub const DEFAULT_NO_DATA_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Snapshot of the watchdog for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogState {
    /// When the pending deadline elapses, if armed.
    pub deadline: Option<Instant>,
    /// Whether the watchdog has fired since it was last armed.
    pub has_fired_since_arm: bool,
}

/// Re-armable no-data deadline.
///
/// The owner forwards mailbox messages carrying the fire generation to
/// [`NoDataWatchdog::on_fire`], which decides whether the fire is live.
#[derive(Debug)]
pub struct NoDataWatchdog<M> {
    timeout: Duration,
    deadline: Deadline<M>,
    fired_since_arm: bool,
}

impl<M: Send + 'static> NoDataWatchdog<M> {
    /// Creates a disarmed watchdog posting `signal(generation)` to `mailbox`.
    pub fn new(timeout: Duration, mailbox: mpsc::UnboundedSender<M>, signal: fn(u64) -> M) -> Self {
        Self {
            timeout,
            deadline: Deadline::new(mailbox, signal),
            fired_since_arm: false,
        }
    }

    /// Discards any pending deadline and sets a new one `timeout` from now.
    pub fn arm(&mut self) {
        let generation = self.deadline.arm(self.timeout);
        self.fired_since_arm = false;
        debug!(
            generation,
            timeout_ms = self.timeout.as_millis() as u64,
            "No-data watchdog armed"
        );
    }

    /// Disarms the watchdog.
    pub fn cancel(&mut self) {
        self.deadline.cancel();
    }

    /// Handles a fire message. Returns true when the no-data timeout
    /// elapsed and the owner should stop.
    pub fn on_fire(&mut self, generation: u64) -> bool {
        if self.fired_since_arm || !self.deadline.take_fire(generation) {
            debug!(generation, "Ignoring superseded watchdog fire");
            return false;
        }

        self.fired_since_arm = true;
        info!(
            timeout_ms = self.timeout.as_millis() as u64,
            "No data received within timeout"
        );
        true
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn state(&self) -> WatchdogState {
        WatchdogState {
            deadline: self.deadline.due(),
            has_fired_since_arm: self.fired_since_arm,
        }
    }
}
