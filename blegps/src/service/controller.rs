//! Role switching.
//!
//! A device is either broadcasting or receiving, never both. The controller
//! owns at most one engine and stops it before starting the other role.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use super::error::StartError;
use super::events::{event_channel, ServiceEvent};
use super::state::Role;
use crate::broadcaster::{BroadcasterEngine, BroadcasterHandle};
use crate::config::BeaconConfig;
use crate::radio::RadioPorts;
use crate::receiver::{ReceiverEngine, ReceiverHandle};
use crate::sink::LocationSink;

enum ActiveRole {
    Broadcaster(BroadcasterHandle),
    Receiver(ReceiverHandle),
}

impl ActiveRole {
    fn role(&self) -> Role {
        match self {
            ActiveRole::Broadcaster(_) => Role::Broadcaster,
            ActiveRole::Receiver(_) => Role::Receiver,
        }
    }

    fn is_stopped(&self) -> bool {
        match self {
            ActiveRole::Broadcaster(h) => h.state().is_stopped(),
            ActiveRole::Receiver(h) => h.state().is_stopped(),
        }
    }

    async fn stop(&self) {
        match self {
            ActiveRole::Broadcaster(h) => h.stop().await,
            ActiveRole::Receiver(h) => h.stop().await,
        }
    }
}

/// Owns the active engine and enforces one role at a time.
pub struct RoleController {
    config: BeaconConfig,
    ports: RadioPorts,
    sink: Arc<dyn LocationSink>,
    events: broadcast::Sender<ServiceEvent>,
    active: Option<ActiveRole>,
}

impl RoleController {
    pub fn new(config: BeaconConfig, ports: RadioPorts, sink: Arc<dyn LocationSink>) -> Self {
        let (events, _) = event_channel();
        Self {
            config,
            ports,
            sink,
            events,
            active: None,
        }
    }

    pub fn config(&self) -> &BeaconConfig {
        &self.config
    }

    /// Subscribes to events from every engine this controller starts.
    pub fn subscribe(&self) -> broadcast::Receiver<ServiceEvent> {
        self.events.subscribe()
    }

    /// Role of the engine currently running, if any.
    ///
    /// An engine that stopped on its own (no data, radio failure) no longer
    /// counts as active.
    pub fn active_role(&self) -> Option<Role> {
        self.active
            .as_ref()
            .filter(|active| !active.is_stopped())
            .map(ActiveRole::role)
    }

    pub fn broadcaster(&self) -> Option<&BroadcasterHandle> {
        match &self.active {
            Some(ActiveRole::Broadcaster(handle)) => Some(handle),
            _ => None,
        }
    }

    pub fn receiver(&self) -> Option<&ReceiverHandle> {
        match &self.active {
            Some(ActiveRole::Receiver(handle)) => Some(handle),
            _ => None,
        }
    }

    /// Starts broadcasting, stopping the receiver first if it runs.
    /// No-op when already broadcasting.
    pub async fn start_broadcaster(&mut self) -> Result<(), StartError> {
        if self.active_role() == Some(Role::Broadcaster) {
            return Ok(());
        }
        self.stop().await;

        let handle = BroadcasterEngine::new(
            self.config,
            self.ports.advertiser.clone(),
            self.ports.capabilities.clone(),
            self.events.clone(),
        )
        .start()?;
        self.active = Some(ActiveRole::Broadcaster(handle));
        Ok(())
    }

    /// Starts receiving, stopping the broadcaster first if it runs.
    /// No-op when already receiving.
    pub async fn start_receiver(&mut self) -> Result<(), StartError> {
        if self.active_role() == Some(Role::Receiver) {
            return Ok(());
        }
        self.stop().await;

        let handle = ReceiverEngine::new(
            self.config,
            self.ports.scanner.clone(),
            self.ports.capabilities.clone(),
            self.sink.clone(),
            self.events.clone(),
        )
        .start()?;
        self.active = Some(ActiveRole::Receiver(handle));
        Ok(())
    }

    /// Stops whichever engine is active and waits for it.
    pub async fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            if !active.is_stopped() {
                info!(role = %active.role(), "Stopping active role");
            }
            active.stop().await;
        }
    }
}
