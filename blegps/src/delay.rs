//! Rolling window of recent observation ages.
//!
//! Used by the receiver for diagnostics only. The average never gates
//! admission; staleness is judged per observation.

use std::collections::VecDeque;

/// Default number of ages retained.
pub const DEFAULT_DELAY_WINDOW: usize = 10;

/// Bounded FIFO of observation ages with a running mean.
#[derive(Debug, Clone)]
pub struct RollingDelayTracker {
    ages_ms: VecDeque<u64>,
    capacity: usize,
    sum_ms: u64,
}

impl RollingDelayTracker {
    /// Creates a tracker holding up to `capacity` ages (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ages_ms: VecDeque::with_capacity(capacity + 1),
            capacity,
            sum_ms: 0,
        }
    }

    /// Records an age and returns the mean of the current window.
    pub fn observe(&mut self, age_ms: u64) -> f64 {
        self.ages_ms.push_back(age_ms);
        self.sum_ms = self.sum_ms.saturating_add(age_ms);

        while self.ages_ms.len() > self.capacity {
            if let Some(evicted) = self.ages_ms.pop_front() {
                self.sum_ms = self.sum_ms.saturating_sub(evicted);
            }
        }

        self.average_ms().unwrap_or(0.0)
    }

    /// Mean of the current window, `None` before the first observation.
    pub fn average_ms(&self) -> Option<f64> {
        if self.ages_ms.is_empty() {
            None
        } else {
            Some(self.sum_ms as f64 / self.ages_ms.len() as f64)
        }
    }

    pub fn len(&self) -> usize {
        self.ages_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ages_ms.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Ages currently in the window, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = u64> + '_ {
        self.ages_ms.iter().copied()
    }
}

impl Default for RollingDelayTracker {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY_WINDOW)
    }
}
