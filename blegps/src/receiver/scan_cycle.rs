//! Periodic scan restarts.
//!
//! Hosts quietly throttle or stall long-running scans. The driver stops the
//! scan every cycle, waits a short settle period and starts it again:
//!
//! ```text
//! Idle --start--> Scanning --cycle--> Restarting --settle--> Scanning ...
//! ```
//!
//! Every (re)start re-arms the no-data watchdog.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::radio::{RadioError, ScanEventSender, ScanFilter, ScanSettings, Scanner};
use crate::timer::Deadline;
use crate::watchdog::NoDataWatchdog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Scanning,
    Restarting,
}

/// Stop/settle/start loop around a [`Scanner`].
pub struct ScanCycleDriver<M> {
    scanner: Arc<dyn Scanner>,
    filter: ScanFilter,
    settings: ScanSettings,
    events: ScanEventSender,
    cycle: Duration,
    settle: Duration,
    timer: Deadline<M>,
    phase: CyclePhase,
    restarts: u64,
}

impl<M: Send + 'static> ScanCycleDriver<M> {
    pub fn new(
        scanner: Arc<dyn Scanner>,
        filter: ScanFilter,
        events: ScanEventSender,
        cycle: Duration,
        settle: Duration,
        mailbox: mpsc::UnboundedSender<M>,
        tick: fn(u64) -> M,
    ) -> Self {
        Self {
            scanner,
            filter,
            settings: ScanSettings::default(),
            events,
            cycle,
            settle,
            timer: Deadline::new(mailbox, tick),
            phase: CyclePhase::Idle,
            restarts: 0,
        }
    }

    /// Starts the first scan.
    pub fn start(&mut self, watchdog: &mut NoDataWatchdog<M>) -> Result<(), RadioError> {
        self.begin_scan(watchdog)?;
        info!(
            vendor_id = self.filter.vendor_id,
            cycle_ms = self.cycle.as_millis() as u64,
            "Scan started"
        );
        Ok(())
    }

    /// Advances the cycle on a timer message. Superseded ticks are ignored.
    pub fn on_tick(
        &mut self,
        generation: u64,
        watchdog: &mut NoDataWatchdog<M>,
    ) -> Result<(), RadioError> {
        if !self.timer.take_fire(generation) {
            return Ok(());
        }

        match self.phase {
            CyclePhase::Scanning => {
                debug!("Scan cycle elapsed, stopping scan");
                self.scanner.stop_scan();
                self.phase = CyclePhase::Restarting;
                self.timer.arm(self.settle);
                Ok(())
            }
            CyclePhase::Restarting => {
                self.restarts += 1;
                debug!(restarts = self.restarts, "Restarting scan");
                self.begin_scan(watchdog)
            }
            CyclePhase::Idle => Ok(()),
        }
    }

    /// Restarts immediately, skipping the settle period.
    pub fn restart_now(&mut self, watchdog: &mut NoDataWatchdog<M>) -> Result<(), RadioError> {
        self.timer.cancel();
        if self.phase == CyclePhase::Scanning {
            self.scanner.stop_scan();
        }
        self.restarts += 1;
        info!(restarts = self.restarts, "Restarting scan after registration failure");
        self.begin_scan(watchdog)
    }

    /// Cancels the watchdog and the cycle timer, then releases the scanner.
    pub fn stop(&mut self, watchdog: &mut NoDataWatchdog<M>) {
        watchdog.cancel();
        self.timer.cancel();
        if self.phase == CyclePhase::Scanning {
            self.scanner.stop_scan();
        }
        self.phase = CyclePhase::Idle;
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    /// Restarts performed since the first scan.
    pub fn restarts(&self) -> u64 {
        self.restarts
    }

    fn begin_scan(&mut self, watchdog: &mut NoDataWatchdog<M>) -> Result<(), RadioError> {
        if let Err(e) = self
            .scanner
            .start_scan(self.filter, self.settings, self.events.clone())
        {
            self.phase = CyclePhase::Idle;
            return Err(e);
        }

        self.phase = CyclePhase::Scanning;
        watchdog.arm();
        self.timer.arm(self.cycle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::memory::{Airwaves, MemoryScanner};
    use tokio::time::Instant;

    #[derive(Debug, PartialEq)]
    enum Signal {
        Tick(u64),
        NoData(u64),
    }

    struct Rig {
        scanner: MemoryScanner,
        driver: ScanCycleDriver<Signal>,
        watchdog: NoDataWatchdog<Signal>,
        mailbox: mpsc::UnboundedReceiver<Signal>,
        _scan_rx: mpsc::UnboundedReceiver<crate::radio::ScanEvent>,
    }

    fn rig() -> Rig {
        let airwaves = Airwaves::new();
        let scanner = airwaves.scanner();
        let (tx, mailbox) = mpsc::unbounded_channel();
        let (scan_tx, scan_rx) = mpsc::unbounded_channel();

        let driver = ScanCycleDriver::new(
            Arc::new(scanner.clone()),
            ScanFilter { vendor_id: 1001 },
            scan_tx,
            Duration::from_secs(30),
            Duration::from_millis(500),
            tx.clone(),
            Signal::Tick,
        );
        let watchdog = NoDataWatchdog::new(Duration::from_secs(300), tx, Signal::NoData);

        Rig {
            scanner,
            driver,
            watchdog,
            mailbox,
            _scan_rx: scan_rx,
        }
    }

    async fn next_tick(rig: &mut Rig) -> u64 {
        loop {
            match rig.mailbox.recv().await {
                Some(Signal::Tick(generation)) => return generation,
                Some(Signal::NoData(_)) => continue,
                None => panic!("mailbox closed"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_cycle() {
        let mut rig = rig();
        let start = Instant::now();

        rig.driver.start(&mut rig.watchdog).unwrap();
        assert_eq!(rig.driver.phase(), CyclePhase::Scanning);
        assert!(rig.scanner.is_scanning());

        let generation = next_tick(&mut rig).await;
        assert_eq!(start.elapsed(), Duration::from_secs(30));
        rig.driver.on_tick(generation, &mut rig.watchdog).unwrap();
        assert_eq!(rig.driver.phase(), CyclePhase::Restarting);
        assert!(!rig.scanner.is_scanning());

        let generation = next_tick(&mut rig).await;
        assert_eq!(start.elapsed(), Duration::from_millis(30_500));
        rig.driver.on_tick(generation, &mut rig.watchdog).unwrap();
        assert_eq!(rig.driver.phase(), CyclePhase::Scanning);
        assert!(rig.scanner.is_scanning());
        assert_eq!(rig.driver.restarts(), 1);
        assert_eq!(rig.scanner.start_calls(), 2);

        // Restart re-armed the watchdog from t=30.5s.
        assert_eq!(
            rig.watchdog.state().deadline,
            Some(start + Duration::from_millis(330_500))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_releases_scanner() {
        let mut rig = rig();
        rig.driver.start(&mut rig.watchdog).unwrap();
        rig.driver.stop(&mut rig.watchdog);

        assert_eq!(rig.driver.phase(), CyclePhase::Idle);
        assert!(!rig.scanner.is_scanning());

        let waited = tokio::time::timeout(Duration::from_secs(60), next_tick(&mut rig)).await;
        assert!(waited.is_err(), "no tick after stop");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_disarms_watchdog_with_scanner() {
        let mut rig = rig();
        rig.driver.start(&mut rig.watchdog).unwrap();
        assert!(rig.watchdog.state().deadline.is_some());

        rig.driver.stop(&mut rig.watchdog);

        assert_eq!(rig.watchdog.state().deadline, None);
        assert_eq!(rig.scanner.stop_calls(), 1);

        // Neither timer posts anything past the no-data timeout.
        let waited = tokio::time::timeout(Duration::from_secs(400), rig.mailbox.recv()).await;
        assert!(waited.is_err(), "no signal after stop");
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_failure_goes_idle() {
        let mut rig = rig();
        rig.driver.start(&mut rig.watchdog).unwrap();

        let generation = next_tick(&mut rig).await;
        rig.driver.on_tick(generation, &mut rig.watchdog).unwrap();

        rig.scanner.reject_starts(true);
        let generation = next_tick(&mut rig).await;
        assert!(rig.driver.on_tick(generation, &mut rig.watchdog).is_err());
        assert_eq!(rig.driver.phase(), CyclePhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_now_skips_settle() {
        let mut rig = rig();
        rig.driver.start(&mut rig.watchdog).unwrap();

        rig.driver.restart_now(&mut rig.watchdog).unwrap();
        assert_eq!(rig.scanner.stop_calls(), 1);
        assert_eq!(rig.scanner.start_calls(), 2);
        assert_eq!(rig.driver.phase(), CyclePhase::Scanning);
    }
}
