//! Receiver role.
//!
//! Scans for position frames from a nearby broadcaster and hands every
//! fresh, well-formed one to a [`LocationSink`](crate::sink::LocationSink):
//!
//! - [`ReceiverEngine`] - lifecycle and the scan-event loop
//! - [`ScanCycleDriver`] - periodic stop/settle/start of the scan
//! - [`AdmissionPolicy`] - per-observation staleness and decode check
//!
//! The receiver stops itself when no frame is admitted for the configured
//! no-data timeout, or when the scanner fails in a way a restart cannot fix.

mod admission;
mod engine;
mod scan_cycle;

pub use admission::{Admission, AdmissionPolicy};
pub use engine::{ReceiverEngine, ReceiverHandle, ReceiverStats, RECEIVER_CAPABILITIES};
pub use scan_cycle::{CyclePhase, ScanCycleDriver};
