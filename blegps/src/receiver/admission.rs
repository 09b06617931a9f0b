//! Per-observation admission.
//!
//! An observation is admitted when it is fresh enough and decodes. The
//! freshness limit is one broadcast interval plus the lag allowance: a
//! broadcaster re-advertises at least that often, so anything older has
//! already been superseded on air.

use std::time::Duration;

use crate::frame::{decode, DecodeError, PositionFrame};

/// Verdict on one scan observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Admission {
    Admitted(PositionFrame),
    Stale { age_ms: u64, max_ms: u64 },
    Malformed(DecodeError),
}

/// Staleness and decode check for scan observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionPolicy {
    max_delay_ms: u64,
}

impl AdmissionPolicy {
    pub fn new(max_acceptable_delay: Duration) -> Self {
        Self {
            max_delay_ms: max_acceptable_delay.as_millis() as u64,
        }
    }

    pub fn max_delay_ms(&self) -> u64 {
        self.max_delay_ms
    }

    /// Judges an observation of `age_ms`. Stale observations are not decoded.
    pub fn judge(&self, age_ms: u64, payload: &[u8]) -> Admission {
        if age_ms > self.max_delay_ms {
            return Admission::Stale {
                age_ms,
                max_ms: self.max_delay_ms,
            };
        }

        match decode(payload) {
            Ok(frame) => Admission::Admitted(frame),
            Err(e) => Admission::Malformed(e),
        }
    }
}
