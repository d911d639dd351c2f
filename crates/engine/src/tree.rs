//! CallChainTree: the aggregate for one entry point
//!
//! A tree owns its nodes and its [`MergeTracker`]. Nodes are only mutated
//! through [`CallChainTree::apply_segments`], which enforces the merge rules:
//!
//! - a chain id already in the tracker never touches a node again, whatever
//!   its payload
//! - every segment of a chain id that is new to this tree is applied, and
//!   the id is recorded
//! - a `(chain id, qualifier)` pair repeated within one batch is applied once,
//!   with the largest of its payloads
//!
//! Payload combination is commutative and associative, so the resulting tree
//! does not depend on segment order.

use crate::tracker::MergeTracker;
use chaintree_core::{CallChainTreeNode, ChainSegment, NodePayload};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Aggregated call tree of one entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallChainTree {
    entry_point: String,
    nodes: BTreeMap<String, CallChainTreeNode>,
    tracker: MergeTracker,
    /// Row version this tree was loaded at; 0 = never persisted
    version: u64,
}

/// What one call to [`CallChainTree::apply_segments`] did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeDelta {
    /// Chain ids merged by this call, first-seen order
    pub applied: Vec<String>,
    /// Chain ids dropped because they were already merged
    pub skipped: Vec<String>,
    /// Qualifiers of nodes created by this call
    pub created_nodes: Vec<String>,
}

impl MergeDelta {
    /// Whether the tree changed
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}

impl CallChainTree {
    /// Empty tree for an entry point
    pub fn new(entry_point: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
            nodes: BTreeMap::new(),
            tracker: MergeTracker::new(),
            version: 0,
        }
    }

    pub(crate) fn from_parts(
        entry_point: String,
        nodes: BTreeMap<String, CallChainTreeNode>,
        tracker: MergeTracker,
        version: u64,
    ) -> Self {
        Self {
            entry_point,
            nodes,
            tracker,
            version,
        }
    }

    /// Entry point (row key)
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Nodes keyed by qualifier
    pub fn nodes(&self) -> &BTreeMap<String, CallChainTreeNode> {
        &self.nodes
    }

    /// One node
    pub fn node(&self, qualifier: &str) -> Option<&CallChainTreeNode> {
        self.nodes.get(qualifier)
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Merged chain ids
    pub fn tracker(&self) -> &MergeTracker {
        &self.tracker
    }

    /// Whether `chain_id` has been merged into this tree
    pub fn has_merged(&self, chain_id: &str) -> bool {
        self.tracker.contains(chain_id)
    }

    /// Row version the tree was loaded at
    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Fold segments into the tree.
    pub fn apply_segments(&mut self, segments: &[ChainSegment]) -> MergeDelta {
        let mut delta = MergeDelta::default();
        let mut skipped: HashSet<&str> = HashSet::new();
        let mut slots: HashMap<(&str, &str), usize> = HashMap::new();
        let mut pending: Vec<(&str, &str, NodePayload)> = Vec::new();

        for segment in segments {
            let chain_id = segment.chain_id.as_str();
            if self.tracker.contains(chain_id) {
                if skipped.insert(chain_id) {
                    delta.skipped.push(segment.chain_id.clone());
                }
                continue;
            }
            match slots.entry((chain_id, segment.qualifier.as_str())) {
                Entry::Occupied(slot) => {
                    // repeated pair: keep the largest payload
                    let kept = &mut pending[*slot.get()].2;
                    if rank(&segment.payload) > rank(kept) {
                        *kept = segment.payload;
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(pending.len());
                    pending.push((chain_id, segment.qualifier.as_str(), segment.payload));
                }
            }
        }

        for (chain_id, qualifier, payload) in pending {
            let node = self.nodes.entry(qualifier.to_string()).or_insert_with(|| {
                delta.created_nodes.push(qualifier.to_string());
                CallChainTreeNode::new(qualifier, NodePayload::default())
            });
            node.absorb(&payload);

            if self.tracker.add(chain_id) {
                delta.applied.push(chain_id.to_string());
            }
        }

        delta
    }
}

fn rank(payload: &NodePayload) -> (u64, u64, u64, u64) {
    (
        payload.call_count,
        payload.error_count,
        payload.total_cost_ms,
        payload.max_cost_ms,
    )
}
