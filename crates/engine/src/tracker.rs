//! MergeTracker: the set of chain ids already folded into a tree
//!
//! Ingestion delivers segments at least once. The tracker turns a repeated
//! delivery into a no-op: a chain id is merged at most once per tree, and
//! the set only grows.
//!
//! Persisted as a JSON array of strings in insertion order.

use chaintree_core::{Error, Result};
use std::collections::HashSet;

/// Append-only set of merged chain ids
#[derive(Debug, Clone, Default)]
pub struct MergeTracker {
    order: Vec<String>,
    index: HashSet<String>,
}

impl MergeTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `chain_id` has been merged
    pub fn contains(&self, chain_id: &str) -> bool {
        self.index.contains(chain_id)
    }

    /// Record `chain_id`; returns false if it was already present
    pub fn add(&mut self, chain_id: impl Into<String>) -> bool {
        let chain_id = chain_id.into();
        if self.index.contains(&chain_id) {
            return false;
        }
        self.index.insert(chain_id.clone());
        self.order.push(chain_id);
        true
    }

    /// Add every id of `other`; returns how many were new
    pub fn union_with(&mut self, other: &MergeTracker) -> usize {
        other.iter().filter(|id| self.add(*id)).count()
    }

    /// Whether every id of `other` is present here
    pub fn is_superset(&self, other: &MergeTracker) -> bool {
        other.iter().all(|id| self.contains(id))
    }

    /// Number of merged ids
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing has been merged
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// JSON array of ids
    pub fn serialize(&self) -> String {
        // Vec<String> always serializes
        serde_json::to_string(&self.order).unwrap_or_else(|_| "[]".to_string())
    }

    /// Parse a stored id set. The empty value is the empty set; duplicate
    /// entries collapse.
    pub fn deserialize(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Ok(Self::new());
        }
        let ids: Vec<String> = serde_json::from_str(value)
            .map_err(|e| Error::MalformedRecord(format!("merged chain ids: {}", e)))?;
        Ok(ids.into_iter().collect())
    }
}

impl PartialEq for MergeTracker {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for MergeTracker {}

impl<S: Into<String>> FromIterator<S> for MergeTracker {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut tracker = MergeTracker::new();
        tracker.extend(iter);
        tracker
    }
}

impl<S: Into<String>> Extend<S> for MergeTracker {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for id in iter {
            self.add(id);
        }
    }
}
