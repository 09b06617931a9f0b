//! Lifecycle and activity events.
//!
//! Engines publish on a shared broadcast channel. The user-facing surface
//! (notifications, CLI output) subscribes; engines never depend on anyone
//! listening.

use std::fmt;

use tokio::sync::broadcast;

use super::error::StartError;
use super::state::Role;
use crate::frame::Position;
use crate::sink::ReceivedFix;

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Why a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Stop was requested by the owner.
    Requested,
    /// No valid frame arrived within the no-data timeout.
    NoData,
    /// The radio reported an unrecoverable failure.
    RadioFailure(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Requested => f.write_str("requested"),
            StopReason::NoData => f.write_str("no data"),
            StopReason::RadioFailure(detail) => write!(f, "radio failure: {}", detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceEventKind {
    /// Engine entered `Running`.
    Started,
    /// Engine returned to `Stopped`. Published exactly once per run.
    Stopped(StopReason),
    /// Engine refused to start.
    StartFailed(StartError),
    /// Receiver admitted a frame.
    PositionUpdated(ReceivedFix),
    /// Broadcaster put a position on air.
    PositionAdvertised(Position),
}

/// An event from one engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceEvent {
    pub role: Role,
    pub kind: ServiceEventKind,
}

impl ServiceEvent {
    pub fn new(role: Role, kind: ServiceEventKind) -> Self {
        Self { role, kind }
    }
}

/// Creates an event channel with the default capacity.
pub fn event_channel() -> (broadcast::Sender<ServiceEvent>, broadcast::Receiver<ServiceEvent>) {
    broadcast::channel(DEFAULT_EVENT_CAPACITY)
}

/// Publishes an event, ignoring the absence of subscribers.
pub(crate) fn publish(events: &broadcast::Sender<ServiceEvent>, role: Role, kind: ServiceEventKind) {
    let _ = events.send(ServiceEvent::new(role, kind));
}
