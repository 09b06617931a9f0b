//! Broadcaster engine.
//!
//! Keeps the latest position on air. Position updates are throttled to one
//! advertisement change per broadcast interval; a refresh tick re-advertises
//! the latest position every interval regardless, so receivers keep seeing
//! fresh captures while the position is unchanged.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::BeaconConfig;
use crate::frame::{encode, Position};
use crate::radio::{
    AdvertiseRequest, AdvertiseStatus, AdvertiseStatusSender, Advertiser, Capabilities,
    Capability, RadioError,
};
use crate::service::events::publish;
use crate::service::{Role, RunState, ServiceEvent, ServiceEventKind, StartError, StopReason};
use crate::timer::Deadline;

/// Capabilities the broadcaster needs before it will start.
pub const BROADCASTER_CAPABILITIES: [Capability; 3] = [
    Capability::Advertise,
    Capability::Location,
    Capability::ForegroundService,
];

/// Counters for one broadcaster run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BroadcasterStats {
    /// Position updates received from the host.
    pub positions_received: u64,
    /// Advertisements put on air, including the initial empty one.
    pub advertisements: u64,
    /// Position currently on air.
    pub on_air: Option<Position>,
}

#[derive(Debug)]
enum Signal {
    Position(Position),
    Refresh(u64),
}

/// Advertises the local position as a frame.
pub struct BroadcasterEngine {
    config: BeaconConfig,
    advertiser: Arc<dyn Advertiser>,
    capabilities: Arc<dyn Capabilities>,
    events: broadcast::Sender<ServiceEvent>,
}

impl BroadcasterEngine {
    pub fn new(
        config: BeaconConfig,
        advertiser: Arc<dyn Advertiser>,
        capabilities: Arc<dyn Capabilities>,
        events: broadcast::Sender<ServiceEvent>,
    ) -> Self {
        Self {
            config,
            advertiser,
            capabilities,
            events,
        }
    }

    /// Starts advertising and spawns the engine task.
    ///
    /// With no position yet, an empty payload goes on air until the first
    /// update. Must be called from within a tokio runtime.
    pub fn start(self) -> Result<BroadcasterHandle, StartError> {
        info!(vendor_id = self.config.vendor_id, "Starting broadcaster");

        if let Err(e) = self.preflight() {
            warn!(error = %e, "Broadcaster start rejected");
            publish(&self.events, Role::Broadcaster, ServiceEventKind::StartFailed(e.clone()));
            return Err(e);
        }

        let (state_tx, state_rx) = watch::channel(RunState::Starting);
        let (stats_tx, stats_rx) = watch::channel(BroadcasterStats::default());
        let (mailbox_tx, mailbox_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = mpsc::unbounded_channel();

        let mut actor = BroadcasterActor {
            config: self.config,
            advertiser: self.advertiser,
            events: self.events.clone(),
            state: state_tx,
            stats: stats_tx,
            shutdown: CancellationToken::new(),
            mailbox: mailbox_rx,
            status: status_rx,
            status_tx,
            refresh: Deadline::new(mailbox_tx.clone(), Signal::Refresh),
            latest: None,
            last_advertised: None,
        };

        if let Err(e) = actor.put_on_air(Bytes::new()) {
            actor.advertiser.stop_advertising();
            let e = StartError::from(e);
            error!(error = %e, "Failed to start advertising");
            publish(&self.events, Role::Broadcaster, ServiceEventKind::StartFailed(e.clone()));
            return Err(e);
        }
        actor.refresh.arm(self.config.broadcast_interval);

        actor.state.send_replace(RunState::Running);
        publish(&self.events, Role::Broadcaster, ServiceEventKind::Started);
        info!(
            interval_ms = self.config.broadcast_interval.as_millis() as u64,
            "Broadcaster running"
        );

        let shutdown = actor.shutdown.clone();
        tokio::spawn(actor.run());

        Ok(BroadcasterHandle {
            state: state_rx,
            stats: stats_rx,
            shutdown,
            updates: PositionUpdater { tx: mailbox_tx },
            events: self.events,
        })
    }

    fn preflight(&self) -> Result<(), StartError> {
        if !self.advertiser.is_available() {
            return Err(StartError::AdvertiserUnavailable);
        }
        for capability in BROADCASTER_CAPABILITIES {
            if !self.capabilities.is_granted(capability) {
                return Err(StartError::PermissionDenied(capability));
            }
        }
        Ok(())
    }
}

/// Cloneable sender of position updates into a running broadcaster.
#[derive(Debug, Clone)]
pub struct PositionUpdater {
    tx: mpsc::UnboundedSender<Signal>,
}

impl PositionUpdater {
    /// Queues a position. Returns false once the broadcaster has stopped.
    pub fn update(&self, position: Position) -> bool {
        self.tx.send(Signal::Position(position)).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Owner's view of a running broadcaster.
///
/// Dropping the handle stops the broadcaster.
pub struct BroadcasterHandle {
    state: watch::Receiver<RunState>,
    stats: watch::Receiver<BroadcasterStats>,
    shutdown: CancellationToken,
    updates: PositionUpdater,
    events: broadcast::Sender<ServiceEvent>,
}

impl BroadcasterHandle {
    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    pub fn stats(&self) -> BroadcasterStats {
        self.stats.borrow().clone()
    }

    /// Feeds a new local position.
    pub fn update_position(&self, position: Position) -> bool {
        self.updates.update(position)
    }

    /// Sender for wiring a position source.
    pub fn updater(&self) -> PositionUpdater {
        self.updates.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServiceEvent> {
        self.events.subscribe()
    }

    /// Requests a stop and waits for the engine to reach `Stopped`.
    /// Idempotent.
    pub async fn stop(&self) {
        self.shutdown.cancel();
        self.stopped().await;
    }

    /// Waits until the engine stops for any reason.
    pub async fn stopped(&self) {
        let mut state = self.state.clone();
        let _ = state.wait_for(RunState::is_stopped).await;
    }
}

impl Drop for BroadcasterHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct BroadcasterActor {
    config: BeaconConfig,
    advertiser: Arc<dyn Advertiser>,
    events: broadcast::Sender<ServiceEvent>,
    state: watch::Sender<RunState>,
    stats: watch::Sender<BroadcasterStats>,
    shutdown: CancellationToken,
    mailbox: mpsc::UnboundedReceiver<Signal>,
    status: mpsc::UnboundedReceiver<AdvertiseStatus>,
    status_tx: AdvertiseStatusSender,
    refresh: Deadline<Signal>,
    latest: Option<Position>,
    last_advertised: Option<Instant>,
}

impl BroadcasterActor {
    async fn run(mut self) {
        let reason = loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break StopReason::Requested,

                Some(status) = self.status.recv() => {
                    if let Some(reason) = self.on_status(status) {
                        break reason;
                    }
                }

                Some(signal) = self.mailbox.recv() => {
                    if let Some(reason) = self.on_signal(signal) {
                        break reason;
                    }
                }
            }
        };

        self.finish(reason);
    }

    fn on_status(&mut self, status: AdvertiseStatus) -> Option<StopReason> {
        match status {
            AdvertiseStatus::Started => {
                trace!("Advertisement started");
                None
            }
            AdvertiseStatus::Failed(failure) => {
                error!(code = failure.code(), failure = ?failure, "Advertising failed");
                Some(StopReason::RadioFailure(failure.to_string()))
            }
        }
    }

    fn on_signal(&mut self, signal: Signal) -> Option<StopReason> {
        match signal {
            Signal::Position(position) => {
                self.latest = Some(position);
                self.stats.send_modify(|s| s.positions_received += 1);

                let due = self
                    .last_advertised
                    .map_or(true, |at| at.elapsed() >= self.config.broadcast_interval);
                if due {
                    return self.advertise(position);
                }
                trace!("Position update throttled");
                None
            }
            Signal::Refresh(generation) => {
                if !self.refresh.take_fire(generation) {
                    return None;
                }
                self.refresh.arm(self.config.broadcast_interval);
                match self.latest {
                    Some(position) => self.advertise(position),
                    None => None,
                }
            }
        }
    }

    fn advertise(&mut self, position: Position) -> Option<StopReason> {
        let payload = Bytes::copy_from_slice(&encode(&position));
        if let Err(e) = self.put_on_air(payload) {
            error!(error = %e, "Failed to update advertisement");
            return Some(StopReason::RadioFailure(e.to_string()));
        }

        self.last_advertised = Some(Instant::now());
        self.stats.send_modify(|s| s.on_air = Some(position));
        debug!(
            lat = position.latitude,
            lon = position.longitude,
            "Position advertised"
        );
        publish(
            &self.events,
            Role::Broadcaster,
            ServiceEventKind::PositionAdvertised(position),
        );
        None
    }

    /// Replaces whatever is on air with `payload`.
    fn put_on_air(&mut self, payload: Bytes) -> Result<(), RadioError> {
        self.advertiser.stop_advertising();
        let request = AdvertiseRequest::new(self.config.vendor_id, payload);
        self.advertiser
            .start_advertising(request, self.status_tx.clone())?;
        self.stats.send_modify(|s| s.advertisements += 1);
        Ok(())
    }

    fn finish(mut self, reason: StopReason) {
        self.state.send_replace(RunState::Stopping);
        self.refresh.cancel();
        self.advertiser.stop_advertising();
        self.state.send_replace(RunState::Stopped);

        let stats = self.stats.borrow().clone();
        info!(
            reason = %reason,
            positions_received = stats.positions_received,
            advertisements = stats.advertisements,
            "Broadcaster stopped"
        );
        publish(&self.events, Role::Broadcaster, ServiceEventKind::Stopped(reason));
    }
}
