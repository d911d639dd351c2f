//! Per-minute node summaries and their write outcomes

use chrono::{TimeZone, Utc};
use std::fmt;

/// Statistics of one node within a one-minute bucket.
///
/// Combined additively; the zero value is what an empty stored cell means.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MinSummary {
    /// Calls in the bucket
    pub total_call: u64,
    /// Sum of call durations in milliseconds
    pub total_cost_time: u64,
    /// Calls that completed without error
    pub correct_number: u64,
    /// Calls interrupted by an operator
    pub human_interruption_number: u64,
}

impl MinSummary {
    /// Summary describing a single call
    pub fn from_call(cost_ms: u64, is_error: bool) -> Self {
        Self {
            total_call: 1,
            total_cost_time: cost_ms,
            correct_number: u64::from(!is_error),
            human_interruption_number: 0,
        }
    }

    /// Fold `other` into `self`
    pub fn combine(&mut self, other: &MinSummary) {
        self.total_call = self.total_call.saturating_add(other.total_call);
        self.total_cost_time = self.total_cost_time.saturating_add(other.total_cost_time);
        self.correct_number = self.correct_number.saturating_add(other.correct_number);
        self.human_interruption_number = self
            .human_interruption_number
            .saturating_add(other.human_interruption_number);
    }

    /// Mean call duration, `None` for an empty bucket
    pub fn average_cost(&self) -> Option<f64> {
        if self.total_call == 0 {
            None
        } else {
            Some(self.total_cost_time as f64 / self.total_call as f64)
        }
    }
}

/// A one-minute bucket, stored as minutes since the Unix epoch (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MinuteBucket(i64);

impl MinuteBucket {
    /// Bucket containing the given millisecond timestamp
    pub fn from_timestamp_ms(timestamp_ms: i64) -> Self {
        MinuteBucket(timestamp_ms.div_euclid(60_000))
    }

    /// Bucket start in milliseconds since the epoch
    pub fn start_ms(&self) -> i64 {
        self.0 * 60_000
    }

    /// Column qualifier of this bucket, `yyyyMMddHHmm` in UTC
    pub fn qualifier(&self) -> String {
        match Utc.timestamp_millis_opt(self.start_ms()).single() {
            Some(at) => at.format("%Y%m%d%H%M").to_string(),
            // outside chrono's range; fall back to the raw minute index
            None => self.0.to_string(),
        }
    }
}

/// Row key of a node's summary row: `"{entry_point}:{node_qualifier}"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    entry_point: String,
    qualifier: String,
}

impl NodeKey {
    /// Create a node key
    pub fn new(entry_point: impl Into<String>, qualifier: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
            qualifier: qualifier.into(),
        }
    }

    /// Entry point part
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Node qualifier part
    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    /// Storage row key
    pub fn row_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entry_point, self.qualifier)
    }
}

/// One summary cell to persist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryUpdate {
    /// Summary row (node key)
    pub row_key: String,
    /// Minute qualifier
    pub qualifier: String,
    /// Value to store
    pub summary: MinSummary,
}

impl SummaryUpdate {
    /// Create an update
    pub fn new(row_key: impl Into<String>, qualifier: impl Into<String>, summary: MinSummary) -> Self {
        Self {
            row_key: row_key.into(),
            qualifier: qualifier.into(),
            summary,
        }
    }
}

/// Outcome of one item of a batch write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Item persisted
    Ok,
    /// Item not persisted, with the store's reason
    Failed(String),
}

impl WriteOutcome {
    /// Whether the item was persisted
    pub fn is_ok(&self) -> bool {
        matches!(self, WriteOutcome::Ok)
    }

    /// Failure reason, if any
    pub fn failure(&self) -> Option<&str> {
        match self {
            WriteOutcome::Ok => None,
            WriteOutcome::Failed(reason) => Some(reason),
        }
    }
}
