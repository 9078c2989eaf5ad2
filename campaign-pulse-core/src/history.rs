//! Rolling history buffers
//!
//! A [`HistoryBuffer`] keeps the most recent `capacity` records in arrival
//! order and evicts the oldest one when full. Views own their buffers; the
//! stream controller only feeds them.

use std::collections::VecDeque;

use crate::types::NormalizedMetrics;

/// Fixed-capacity FIFO of normalized records.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    capacity: usize,
    records: VecDeque<NormalizedMetrics>,
}

impl HistoryBuffer {
    /// Create an empty buffer. A capacity of 0 retains nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a record, evicting the oldest one when the buffer is full.
    pub fn append(&mut self, record: NormalizedMetrics) {
        if self.capacity == 0 {
            return;
        }
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Copy of the buffered records, oldest first.
    pub fn snapshot(&self) -> Vec<NormalizedMetrics> {
        self.records.iter().cloned().collect()
    }

    /// Copy of the newest `n` records, oldest first.
    pub fn recent(&self, n: usize) -> Vec<NormalizedMetrics> {
        let skip = self.records.len().saturating_sub(n);
        self.records.iter().skip(skip).cloned().collect()
    }

    /// Newest record
    pub fn latest(&self) -> Option<&NormalizedMetrics> {
        self.records.back()
    }

    /// Record appended just before the newest one
    pub fn previous(&self) -> Option<&NormalizedMetrics> {
        self.records.len().checked_sub(2).and_then(|i| self.records.get(i))
    }

    /// Extract one series (e.g. clicks) for charting, oldest first.
    pub fn series(&self, n: usize, field: fn(&NormalizedMetrics) -> f64) -> Vec<f64> {
        let skip = self.records.len().saturating_sub(n);
        self.records.iter().skip(skip).map(field).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

/// Time range selector for charts: how many points to show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeRange {
    #[default]
    Week,
    Month,
    Quarter,
}

impl TimeRange {
    /// Number of points the range covers.
    pub fn points(&self) -> usize {
        match self {
            TimeRange::Week => 7,
            TimeRange::Month => 30,
            TimeRange::Quarter => 90,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeRange::Week => "7d",
            TimeRange::Month => "30d",
            TimeRange::Quarter => "90d",
        }
    }

    pub const ALL: [TimeRange; 3] = [TimeRange::Week, TimeRange::Month, TimeRange::Quarter];
}
