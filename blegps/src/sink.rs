//! Location sink.
//!
//! Where the receiver hands admitted positions. On a phone this is the
//! mock-location provider; here it is a trait so a host binding can plug in
//! its own. Sink failures are logged by the receiver and never stop it.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::frame::PositionFrame;

/// Provider name attached to every injected fix.
pub const PROVIDER: &str = "BLE";

/// An admitted position, ready for injection.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedFix {
    /// The decoded frame.
    pub frame: PositionFrame,
    /// When the radio captured the advertisement.
    pub captured_at: Instant,
    /// Wall-clock time the fix was admitted.
    pub received_at: DateTime<Utc>,
    /// Age of the observation at admission.
    pub age_ms: u64,
    /// Provider the fix is attributed to.
    pub provider: &'static str,
}

impl ReceivedFix {
    pub fn new(frame: PositionFrame, captured_at: Instant, age_ms: u64) -> Self {
        Self {
            frame,
            captured_at,
            received_at: Utc::now(),
            age_ms,
            provider: PROVIDER,
        }
    }
}

/// Errors a sink may return.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The host refused the injected location.
    #[error("Location rejected: {0}")]
    Rejected(String),

    /// The sink is not set up to accept locations.
    #[error("Location sink unavailable")]
    Unavailable,
}

/// Destination for admitted positions.
pub trait LocationSink: Send + Sync {
    fn deliver(&self, fix: &ReceivedFix) -> Result<(), SinkError>;
}

/// Sink that fans fixes out to broadcast subscribers.
///
/// Having no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: broadcast::Sender<ReceivedFix>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReceivedFix> {
        self.tx.subscribe()
    }
}

impl LocationSink for ChannelSink {
    fn deliver(&self, fix: &ReceivedFix) -> Result<(), SinkError> {
        let _ = self.tx.send(fix.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{decode, encode, Position};

    fn fix(accuracy: Option<f32>) -> ReceivedFix {
        let mut position = Position::new(1.0, 2.0);
        position.accuracy = accuracy;
        let frame = decode(&encode(&position)).unwrap();
        ReceivedFix::new(frame, Instant::now(), 12)
    }

    #[test]
    fn test_fix_carries_provider_and_decoded_accuracy() {
        let fix = fix(None);
        assert_eq!(fix.provider, "BLE");
        assert_eq!(fix.frame.accuracy, 0);
        assert_eq!(self::fix(Some(17.0)).frame.accuracy, 17);
    }

    #[tokio::test]
    async fn test_channel_sink_fans_out() {
        let sink = ChannelSink::new(4);
        let mut rx = sink.subscribe();

        let fix = fix(Some(3.0));
        sink.deliver(&fix).unwrap();

        assert_eq!(rx.recv().await.unwrap(), fix);
    }

    #[test]
    fn test_channel_sink_without_subscribers() {
        let sink = ChannelSink::new(4);
        assert_eq!(sink.deliver(&fix(None)), Ok(()));
    }
}
