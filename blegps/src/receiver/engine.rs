//! Receiver engine.
//!
//! One spawned task owns all receiver state. Scan results, timer fires and
//! stop requests are all serialized through its `select!` loop, so no state
//! is shared across threads.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::admission::{Admission, AdmissionPolicy};
use super::scan_cycle::ScanCycleDriver;
use crate::config::BeaconConfig;
use crate::delay::RollingDelayTracker;
use crate::frame::PositionFrame;
use crate::radio::{Capabilities, Capability, ScanEvent, ScanFilter, ScanReport, Scanner};
use crate::service::events::publish;
use crate::service::{Role, RunState, ServiceEvent, ServiceEventKind, StartError, StopReason};
use crate::sink::{LocationSink, ReceivedFix};
use crate::watchdog::NoDataWatchdog;

/// Capabilities the receiver needs before it will start.
pub const RECEIVER_CAPABILITIES: [Capability; 2] = [Capability::Scan, Capability::ForegroundService];

/// Counters for one receiver run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiverStats {
    /// Frames admitted and handed to the sink.
    pub admitted: u64,
    /// Observations dropped as too old.
    pub stale: u64,
    /// Observations that were fresh but failed to decode.
    pub malformed: u64,
    /// Sink deliveries that failed.
    pub sink_failures: u64,
    /// Scan restarts, periodic or recovery.
    pub scan_restarts: u64,
    /// Mean age of recent observations.
    pub average_delay_ms: Option<f64>,
    /// Most recently admitted frame.
    pub last_frame: Option<PositionFrame>,
}

/// Mailbox messages from the engine's own timers.
#[derive(Debug)]
enum Signal {
    NoData(u64),
    CycleTick(u64),
}

/// Scans for position frames and injects admitted ones into a sink.
pub struct ReceiverEngine {
    config: BeaconConfig,
    scanner: Arc<dyn Scanner>,
    capabilities: Arc<dyn Capabilities>,
    sink: Arc<dyn LocationSink>,
    events: broadcast::Sender<ServiceEvent>,
}

impl ReceiverEngine {
    pub fn new(
        config: BeaconConfig,
        scanner: Arc<dyn Scanner>,
        capabilities: Arc<dyn Capabilities>,
        sink: Arc<dyn LocationSink>,
        events: broadcast::Sender<ServiceEvent>,
    ) -> Self {
        Self {
            config,
            scanner,
            capabilities,
            sink,
            events,
        }
    }

    /// Starts scanning and spawns the engine task.
    ///
    /// On failure nothing is left running and a `StartFailed` event is
    /// published. Must be called from within a tokio runtime.
    pub fn start(self) -> Result<ReceiverHandle, StartError> {
        info!(vendor_id = self.config.vendor_id, "Starting receiver");

        if let Err(e) = self.preflight() {
            warn!(error = %e, "Receiver start rejected");
            publish(&self.events, Role::Receiver, ServiceEventKind::StartFailed(e.clone()));
            return Err(e);
        }

        let (state_tx, state_rx) = watch::channel(RunState::Starting);
        let (stats_tx, stats_rx) = watch::channel(ReceiverStats::default());
        let (mailbox_tx, mailbox_rx) = mpsc::unbounded_channel();
        let (scan_tx, scan_rx) = mpsc::unbounded_channel();

        let mut watchdog =
            NoDataWatchdog::new(self.config.no_data_timeout, mailbox_tx.clone(), Signal::NoData);
        let mut cycle = ScanCycleDriver::new(
            self.scanner,
            ScanFilter {
                vendor_id: self.config.vendor_id,
            },
            scan_tx,
            self.config.scan_cycle,
            self.config.scan_settle,
            mailbox_tx,
            Signal::CycleTick,
        );

        if let Err(e) = cycle.start(&mut watchdog) {
            watchdog.cancel();
            let e = StartError::from(e);
            error!(error = %e, "Failed to start scan");
            publish(&self.events, Role::Receiver, ServiceEventKind::StartFailed(e.clone()));
            return Err(e);
        }

        state_tx.send_replace(RunState::Running);
        publish(&self.events, Role::Receiver, ServiceEventKind::Started);
        info!(
            max_delay_ms = self.config.max_acceptable_delay().as_millis() as u64,
            no_data_timeout_secs = self.config.no_data_timeout.as_secs(),
            "Receiver running"
        );

        let shutdown = CancellationToken::new();
        let actor = ReceiverActor {
            admission: AdmissionPolicy::new(self.config.max_acceptable_delay()),
            delays: RollingDelayTracker::new(self.config.delay_window),
            sink: self.sink,
            events: self.events.clone(),
            state: state_tx,
            stats: stats_tx,
            shutdown: shutdown.clone(),
            mailbox: mailbox_rx,
            scan_events: scan_rx,
            watchdog,
            cycle,
        };
        tokio::spawn(actor.run());

        Ok(ReceiverHandle {
            state: state_rx,
            stats: stats_rx,
            shutdown,
            events: self.events,
        })
    }

    fn preflight(&self) -> Result<(), StartError> {
        if !self.scanner.is_available() {
            return Err(StartError::ScannerUnavailable);
        }
        for capability in RECEIVER_CAPABILITIES {
            if !self.capabilities.is_granted(capability) {
                return Err(StartError::PermissionDenied(capability));
            }
        }
        Ok(())
    }
}

/// Owner's view of a running receiver.
///
/// Dropping the handle stops the receiver.
pub struct ReceiverHandle {
    state: watch::Receiver<RunState>,
    stats: watch::Receiver<ReceiverStats>,
    shutdown: CancellationToken,
    events: broadcast::Sender<ServiceEvent>,
}

impl ReceiverHandle {
    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    pub fn stats(&self) -> ReceiverStats {
        self.stats.borrow().clone()
    }

    /// Subscribes to the engine's event channel.
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

impl Drop for ReceiverHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct ReceiverActor {
    admission: AdmissionPolicy,
    delays: RollingDelayTracker,
    sink: Arc<dyn LocationSink>,
    events: broadcast::Sender<ServiceEvent>,
    state: watch::Sender<RunState>,
    stats: watch::Sender<ReceiverStats>,
    shutdown: CancellationToken,
    mailbox: mpsc::UnboundedReceiver<Signal>,
    scan_events: mpsc::UnboundedReceiver<ScanEvent>,
    watchdog: NoDataWatchdog<Signal>,
    cycle: ScanCycleDriver<Signal>,
}

impl ReceiverActor {
    async fn run(mut self) {
        let reason = loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break StopReason::Requested,

                Some(signal) = self.mailbox.recv() => {
                    if let Some(reason) = self.on_signal(signal) {
                        break reason;
                    }
                }

                Some(event) = self.scan_events.recv() => {
                    if let Some(reason) = self.on_scan_event(event) {
                        break reason;
                    }
                }
            }
        };

        self.finish(reason);
    }

    fn on_signal(&mut self, signal: Signal) -> Option<StopReason> {
        match signal {
            Signal::NoData(generation) => self
                .watchdog
                .on_fire(generation)
                .then_some(StopReason::NoData),
            Signal::CycleTick(generation) => {
                if let Err(e) = self.cycle.on_tick(generation, &mut self.watchdog) {
                    error!(error = %e, "Scan restart failed");
                    return Some(StopReason::RadioFailure(e.to_string()));
                }
                self.record_restarts();
                None
            }
        }
    }

    fn on_scan_event(&mut self, event: ScanEvent) -> Option<StopReason> {
        match event {
            ScanEvent::Report(report) => {
                self.on_report(report);
                None
            }
            ScanEvent::Failed(failure) if failure.is_recoverable() => {
                warn!(code = failure.code(), "Scan registration lost");
                if let Err(e) = self.cycle.restart_now(&mut self.watchdog) {
                    error!(error = %e, "Scan recovery failed");
                    return Some(StopReason::RadioFailure(e.to_string()));
                }
                self.record_restarts();
                None
            }
            ScanEvent::Failed(failure) => {
                error!(code = failure.code(), failure = ?failure, "Scan failed");
                Some(StopReason::RadioFailure(failure.to_string()))
            }
        }
    }

    fn on_report(&mut self, report: ScanReport) {
        let age_ms = Instant::now()
            .saturating_duration_since(report.captured_at)
            .as_millis() as u64;
        let average_ms = self.delays.observe(age_ms);
        debug!(age_ms, average_ms, "Scan result");

        match self.admission.judge(age_ms, &report.payload) {
            Admission::Stale { age_ms, max_ms } => {
                warn!(age_ms, max_ms, "Ignoring stale scan result");
                self.stats.send_modify(|s| {
                    s.stale += 1;
                    s.average_delay_ms = Some(average_ms);
                });
            }
            Admission::Malformed(e) => {
                debug!(error = %e, len = report.payload.len(), "Ignoring malformed frame");
                self.stats.send_modify(|s| {
                    s.malformed += 1;
                    s.average_delay_ms = Some(average_ms);
                });
            }
            Admission::Admitted(frame) => {
                self.watchdog.arm();

                let fix = ReceivedFix::new(frame, report.captured_at, age_ms);
                let delivered = match self.sink.deliver(&fix) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "Failed to inject location");
                        false
                    }
                };

                debug!(position = %frame, age_ms, "Position received");
                self.stats.send_modify(|s| {
                    s.admitted += 1;
                    if !delivered {
                        s.sink_failures += 1;
                    }
                    s.average_delay_ms = Some(average_ms);
                    s.last_frame = Some(frame);
                });
                publish(
                    &self.events,
                    Role::Receiver,
                    ServiceEventKind::PositionUpdated(fix),
                );
            }
        }
    }

    fn record_restarts(&mut self) {
        let restarts = self.cycle.restarts();
        self.stats.send_if_modified(|s| {
            let changed = s.scan_restarts != restarts;
            s.scan_restarts = restarts;
            changed
        });
    }

    fn finish(mut self, reason: StopReason) {
        self.state.send_replace(RunState::Stopping);
        self.cycle.stop(&mut self.watchdog);
        self.state.send_replace(RunState::Stopped);

        let stats = self.stats.borrow().clone();
        info!(
            reason = %reason,
            admitted = stats.admitted,
            stale = stats.stale,
            malformed = stats.malformed,
            scan_restarts = stats.scan_restarts,
            "Receiver stopped"
        );
        publish(&self.events, Role::Receiver, ServiceEventKind::Stopped(reason));
    }
}
