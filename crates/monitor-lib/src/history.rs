//! Rolling metric history
//!
//! Fixed-capacity ring buffer shared by every request handler:
//! - FIFO eviction once capacity is reached
//! - Consistent snapshots taken under a single lock acquisition
//! - In-memory only, lost on restart

use crate::models::MetricSample;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Default number of samples retained
pub const DEFAULT_HISTORY_SIZE: usize = 100;

/// Bounded, chronologically ordered store of metric samples
#[derive(Debug)]
pub struct HistoryStore {
    capacity: usize,
    samples: RwLock<VecDeque<MetricSample>>,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl HistoryStore {
    /// Create a store holding at most `capacity` samples (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            // Capacity may be huge; only a bounded prefix is reserved
            samples: RwLock::new(VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_SIZE))),
        }
    }

    // A panicking writer cannot leave the deque half-mutated, so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, VecDeque<MetricSample>> {
        self.samples.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, VecDeque<MetricSample>> {
        self.samples
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a sample, evicting the oldest ones beyond capacity
    ///
    /// Returns the number of retained samples right after this insertion.
    pub fn record(&self, sample: MetricSample) -> usize {
        let mut samples = self.write();
        self.push_bounded(&mut samples, sample);
        debug!(entries = samples.len(), capacity = self.capacity, "Sample recorded");
        samples.len()
    }

    /// Record a sample and return the resulting contents in one atomic step
    pub fn record_and_snapshot(&self, sample: MetricSample) -> Vec<MetricSample> {
        let mut samples = self.write();
        self.push_bounded(&mut samples, sample);
        samples.iter().cloned().collect()
    }

    fn push_bounded(&self, samples: &mut VecDeque<MetricSample>, sample: MetricSample) {
        samples.push_back(sample);
        while samples.len() > self.capacity {
            samples.pop_front();
        }
    }

    /// Independent copy of the current contents, oldest first
    pub fn snapshot(&self) -> Vec<MetricSample> {
        self.read().iter().cloned().collect()
    }

    /// Drop every retained sample
    pub fn clear(&self) {
        self.write().clear();
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get statistics about the store
    pub fn stats(&self) -> HistoryStats {
        let samples = self.read();
        HistoryStats {
            entries: samples.len(),
            capacity: self.capacity,
            oldest_timestamp: samples.front().map(|s| s.timestamp),
            newest_timestamp: samples.back().map(|s| s.timestamp),
        }
    }
}

/// History store statistics
#[derive(Debug, Clone, Serialize)]
pub struct HistoryStats {
    /// Number of samples retained
    pub entries: usize,
    /// Maximum capacity
    pub capacity: usize,
    /// Timestamp of the oldest retained sample
    pub oldest_timestamp: Option<DateTime<Utc>>,
    /// Timestamp of the newest retained sample
    pub newest_timestamp: Option<DateTime<Utc>>,
}
