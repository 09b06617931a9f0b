//! In-process radio.
//!
//! [`Airwaves`] is a shared medium: every [`MemoryAdvertiser`] created from
//! it is heard by every [`MemoryScanner`] created from it whose filter
//! matches. An advertisement is delivered once when it starts and once to
//! each scan that starts while it is still active.
//!
//! Reports are stamped with a capture time `delay` in the past, which lets
//! tests and the simulator model a lagging radio. The fakes also count calls
//! and can be told to fail, so engine behavior around radio faults can be
//! exercised without hardware.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;
use tracing::trace;

use super::{
    AdvertiseFailure, AdvertiseRequest, AdvertiseStatus, AdvertiseStatusSender, Advertiser,
    Capabilities, Capability, RadioError, ScanEvent, ScanEventSender, ScanFailure, ScanFilter,
    ScanReport, ScanSettings, Scanner,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Listener {
    filter: ScanFilter,
    events: ScanEventSender,
}

#[derive(Default)]
struct Medium {
    next_id: u64,
    delay: Duration,
    listeners: HashMap<u64, Listener>,
    broadcasts: HashMap<u64, (u16, Bytes)>,
}

impl Medium {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Delivers to matching listeners, dropping any whose receiver is gone.
    fn deliver(&mut self, vendor_id: u16, payload: &Bytes, age: Duration) {
        let now = Instant::now();
        let captured_at = now.checked_sub(age).unwrap_or(now);

        self.listeners.retain(|id, listener| {
            if listener.filter.vendor_id != vendor_id {
                return true;
            }
            trace!(listener = id, len = payload.len(), "Delivering advertisement");
            listener
                .events
                .send(ScanEvent::Report(ScanReport {
                    payload: payload.clone(),
                    captured_at,
                }))
                .is_ok()
        });
    }
}

/// Shared broadcast medium.
#[derive(Clone, Default)]
pub struct Airwaves {
    medium: Arc<Mutex<Medium>>,
}

impl Airwaves {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how far in the past subsequent reports are stamped.
    pub fn set_delay(&self, delay: Duration) {
        lock(&self.medium).delay = delay;
    }

    pub fn delay(&self) -> Duration {
        lock(&self.medium).delay
    }

    /// Creates an advertiser on this medium.
    pub fn advertiser(&self) -> MemoryAdvertiser {
        let id = lock(&self.medium).allocate_id();
        MemoryAdvertiser {
            id,
            airwaves: self.clone(),
            state: Arc::new(Mutex::new(AdvertiserState::new())),
        }
    }

    /// Creates a scanner on this medium.
    pub fn scanner(&self) -> MemoryScanner {
        MemoryScanner {
            airwaves: self.clone(),
            state: Arc::new(Mutex::new(ScannerState::new())),
        }
    }

    /// Injects a one-off advertisement using the configured delay.
    pub fn transmit(&self, vendor_id: u16, payload: Bytes) {
        let mut medium = lock(&self.medium);
        let delay = medium.delay;
        medium.deliver(vendor_id, &payload, delay);
    }

    /// Injects a one-off advertisement captured `age` ago.
    pub fn transmit_aged(&self, vendor_id: u16, payload: Bytes, age: Duration) {
        lock(&self.medium).deliver(vendor_id, &payload, age);
    }

    /// Number of scans currently listening.
    pub fn listener_count(&self) -> usize {
        lock(&self.medium).listeners.len()
    }

    /// Number of advertisements currently on air.
    pub fn broadcast_count(&self) -> usize {
        lock(&self.medium).broadcasts.len()
    }

    fn start_broadcast(&self, advertiser: u64, vendor_id: u16, payload: Bytes) {
        let mut medium = lock(&self.medium);
        let delay = medium.delay;
        medium.deliver(vendor_id, &payload, delay);
        medium.broadcasts.insert(advertiser, (vendor_id, payload));
    }

    fn stop_broadcast(&self, advertiser: u64) {
        lock(&self.medium).broadcasts.remove(&advertiser);
    }

    fn listen(&self, filter: ScanFilter, events: ScanEventSender) -> u64 {
        let mut medium = lock(&self.medium);
        let id = medium.allocate_id();
        let delay = medium.delay;

        let now = Instant::now();
        let captured_at = now.checked_sub(delay).unwrap_or(now);
        for (vendor_id, payload) in medium.broadcasts.values() {
            if *vendor_id == filter.vendor_id {
                let _ = events.send(ScanEvent::Report(ScanReport {
                    payload: payload.clone(),
                    captured_at,
                }));
            }
        }

        medium.listeners.insert(id, Listener { filter, events });
        id
    }

    fn unlisten(&self, listener: u64) {
        lock(&self.medium).listeners.remove(&listener);
    }

    fn fail_listener(&self, listener: u64, failure: ScanFailure) {
        if let Some(l) = lock(&self.medium).listeners.get(&listener) {
            let _ = l.events.send(ScanEvent::Failed(failure));
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Advertiser
// ─────────────────────────────────────────────────────────────────────────────

struct AdvertiserState {
    available: bool,
    reject_starts: bool,
    fail_next_start: Option<AdvertiseFailure>,
    start_calls: usize,
    stop_calls: usize,
    active: Option<AdvertiseRequest>,
    history: Vec<AdvertiseRequest>,
    status: Option<AdvertiseStatusSender>,
}

impl AdvertiserState {
    fn new() -> Self {
        Self {
            available: true,
            reject_starts: false,
            fail_next_start: None,
            start_calls: 0,
            stop_calls: 0,
            active: None,
            history: Vec::new(),
            status: None,
        }
    }
}

/// Advertiser on an [`Airwaves`] medium. Clones share state.
#[derive(Clone)]
pub struct MemoryAdvertiser {
    id: u64,
    airwaves: Airwaves,
    state: Arc<Mutex<AdvertiserState>>,
}

impl MemoryAdvertiser {
    pub fn set_available(&self, available: bool) {
        lock(&self.state).available = available;
    }

    /// Makes every start request fail synchronously.
    pub fn reject_starts(&self, reject: bool) {
        lock(&self.state).reject_starts = reject;
    }

    /// Makes the next accepted start report `failure` instead of starting.
    pub fn fail_next_start(&self, failure: AdvertiseFailure) {
        lock(&self.state).fail_next_start = Some(failure);
    }

    /// Reports `failure` on the status channel of the last accepted start.
    pub fn report_failure(&self, failure: AdvertiseFailure) {
        if let Some(status) = &lock(&self.state).status {
            let _ = status.send(AdvertiseStatus::Failed(failure));
        }
    }

    pub fn start_calls(&self) -> usize {
        lock(&self.state).start_calls
    }

    pub fn stop_calls(&self) -> usize {
        lock(&self.state).stop_calls
    }

    pub fn is_advertising(&self) -> bool {
        lock(&self.state).active.is_some()
    }

    /// The advertisement currently on air.
    pub fn active(&self) -> Option<AdvertiseRequest> {
        lock(&self.state).active.clone()
    }

    /// Every advertisement that went on air, oldest first.
    pub fn history(&self) -> Vec<AdvertiseRequest> {
        lock(&self.state).history.clone()
    }
}

impl Advertiser for MemoryAdvertiser {
    fn is_available(&self) -> bool {
        lock(&self.state).available
    }

    fn start_advertising(
        &self,
        request: AdvertiseRequest,
        status: AdvertiseStatusSender,
    ) -> Result<(), RadioError> {
        {
            let mut state = lock(&self.state);
            state.start_calls += 1;

            if !state.available {
                return Err(RadioError::Unavailable);
            }
            if state.reject_starts {
                return Err(RadioError::AdvertiseRejected(
                    "advertiser rejected request".to_string(),
                ));
            }
            if let Some(failure) = state.fail_next_start.take() {
                let _ = status.send(AdvertiseStatus::Failed(failure));
                return Ok(());
            }

            state.active = Some(request.clone());
            state.history.push(request.clone());
            let _ = status.send(AdvertiseStatus::Started);
            state.status = Some(status);
        }

        self.airwaves
            .start_broadcast(self.id, request.vendor_id, request.payload);
        Ok(())
    }

    fn stop_advertising(&self) {
        {
            let mut state = lock(&self.state);
            state.stop_calls += 1;
            state.active = None;
        }
        self.airwaves.stop_broadcast(self.id);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scanner
// ─────────────────────────────────────────────────────────────────────────────

struct ScannerState {
    available: bool,
    reject_starts: bool,
    start_calls: usize,
    stop_calls: usize,
    listener: Option<u64>,
    last_settings: Option<ScanSettings>,
}

impl ScannerState {
    fn new() -> Self {
        Self {
            available: true,
            reject_starts: false,
            start_calls: 0,
            stop_calls: 0,
            listener: None,
            last_settings: None,
        }
    }
}

/// Scanner on an [`Airwaves`] medium. Clones share state.
#[derive(Clone)]
pub struct MemoryScanner {
    airwaves: Airwaves,
    state: Arc<Mutex<ScannerState>>,
}

impl MemoryScanner {
    pub fn set_available(&self, available: bool) {
        lock(&self.state).available = available;
    }

    /// Makes every start request fail synchronously.
    pub fn reject_starts(&self, reject: bool) {
        lock(&self.state).reject_starts = reject;
    }

    /// Reports `failure` on the active scan's event channel.
    pub fn report_failure(&self, failure: ScanFailure) {
        let listener = lock(&self.state).listener;
        if let Some(listener) = listener {
            self.airwaves.fail_listener(listener, failure);
        }
    }

    pub fn start_calls(&self) -> usize {
        lock(&self.state).start_calls
    }

    pub fn stop_calls(&self) -> usize {
        lock(&self.state).stop_calls
    }

    pub fn is_scanning(&self) -> bool {
        lock(&self.state).listener.is_some()
    }

    pub fn last_settings(&self) -> Option<ScanSettings> {
        lock(&self.state).last_settings
    }
}

impl Scanner for MemoryScanner {
    fn is_available(&self) -> bool {
        lock(&self.state).available
    }

    fn start_scan(
        &self,
        filter: ScanFilter,
        settings: ScanSettings,
        events: ScanEventSender,
    ) -> Result<(), RadioError> {
        let previous = {
            let mut state = lock(&self.state);
            state.start_calls += 1;

            if !state.available {
                return Err(RadioError::Unavailable);
            }
            if state.reject_starts {
                return Err(RadioError::ScanRejected("scanner rejected request".to_string()));
            }
            state.last_settings = Some(settings);
            state.listener.take()
        };

        if let Some(previous) = previous {
            self.airwaves.unlisten(previous);
        }

        let listener = self.airwaves.listen(filter, events);
        lock(&self.state).listener = Some(listener);
        Ok(())
    }

    fn stop_scan(&self) {
        let listener = {
            let mut state = lock(&self.state);
            state.stop_calls += 1;
            state.listener.take()
        };
        if let Some(listener) = listener {
            self.airwaves.unlisten(listener);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Capabilities
// ─────────────────────────────────────────────────────────────────────────────

/// Fixed set of granted capabilities.
#[derive(Debug, Clone, Default)]
pub struct StaticCapabilities {
    granted: HashSet<Capability>,
}

impl StaticCapabilities {
    /// Grants everything.
    pub fn all() -> Self {
        Self::granting([
            Capability::Scan,
            Capability::Advertise,
            Capability::Location,
            Capability::ForegroundService,
        ])
    }

    /// Grants nothing.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn granting(capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            granted: capabilities.into_iter().collect(),
        }
    }

    pub fn without(mut self, capability: Capability) -> Self {
        self.granted.remove(&capability);
        self
    }
}

impl Capabilities for StaticCapabilities {
    fn is_granted(&self, capability: Capability) -> bool {
        self.granted.contains(&capability)
    }
}
