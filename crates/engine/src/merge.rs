//! MergeEngine: folds incoming chain segments into stored trees
//!
//! ## Merge Sequence
//!
//! ```text
//! 1. load tree + merged ids (absent => empty tree, version 0)
//! 2. apply segments whose chain id is not yet merged
//! 3. IF nothing applied: return the loaded tree, no writes
//! 4. check_and_put tree row against the loaded version
//! 5. IF version conflict: back off, go to 1 (bounded by RetryPolicy)
//! 6. put merged ids into the mapping table
//! 7. return the tree
//! ```
//!
//! Step 4 is the commit point. The tree row carries the merged ids, so a
//! failure in step 6 does not lose the merge and does not break idempotence:
//! the next load takes the union of both id sets.
//!
//! Merges of the same entry point may run concurrently in any number of
//! threads or processes; step 5 guarantees none of them is lost.

use crate::repository::TreeRepository;
use crate::retry::RetryPolicy;
use crate::tree::CallChainTree;
use chaintree_core::{ChainSegment, Error, Result};
use chaintree_storage::StorageGateway;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of [`MergeEngine::merge_detailed`]
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Tree after the merge, as persisted
    pub tree: CallChainTree,
    /// Chain ids merged by this call
    pub applied: Vec<String>,
    /// Chain ids dropped because they were already merged
    pub skipped: Vec<String>,
    /// Load/apply/write cycles used, 1 without contention
    pub attempts: u32,
    /// False if the mapping-table write failed after the tree was committed
    pub tracker_synced: bool,
}

/// Applies segments to trees with optimistic concurrency control
#[derive(Clone)]
pub struct MergeEngine {
    repository: TreeRepository,
    retry: RetryPolicy,
}

impl MergeEngine {
    /// Create an engine over a shared gateway
    pub fn new(gateway: Arc<dyn StorageGateway>, retry: RetryPolicy) -> Self {
        Self {
            repository: TreeRepository::new(gateway),
            retry,
        }
    }

    /// The repository used for loads and writes
    pub fn repository(&self) -> &TreeRepository {
        &self.repository
    }

    /// Load the stored tree of an entry point
    pub fn load_tree(&self, entry_point: &str) -> Result<Option<CallChainTree>> {
        validate_entry_point(entry_point)?;
        self.repository.load(entry_point)
    }

    /// Merge segments into the tree of `entry_point` and return the new tree
    pub fn merge(&self, entry_point: &str, segments: &[ChainSegment]) -> Result<CallChainTree> {
        self.merge_detailed(entry_point, segments).map(|outcome| outcome.tree)
    }

    /// Merge segments and report what happened
    pub fn merge_detailed(&self, entry_point: &str, segments: &[ChainSegment]) -> Result<MergeOutcome> {
        validate_entry_point(entry_point)?;

        let mut attempt = 0u32;
        loop {
            attempt += 1;

            let mut tree = self
                .repository
                .load(entry_point)?
                .unwrap_or_else(|| CallChainTree::new(entry_point));
            let delta = tree.apply_segments(segments);

            if delta.is_empty() {
                debug!(
                    entry_point,
                    segments = segments.len(),
                    skipped = delta.skipped.len(),
                    "nothing new to merge"
                );
                return Ok(MergeOutcome {
                    tree,
                    applied: delta.applied,
                    skipped: delta.skipped,
                    attempts: attempt,
                    tracker_synced: true,
                });
            }

            if self.repository.try_save_tree(&mut tree)? {
                let tracker_synced = match self.repository.save_tracker(&tree, &self.retry) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(
                            entry_point,
                            version = tree.version(),
                            error = %e,
                            "tree committed but merged-id mapping write failed; next load reconciles"
                        );
                        false
                    }
                };
                debug!(
                    entry_point,
                    applied = delta.applied.len(),
                    skipped = delta.skipped.len(),
                    created_nodes = delta.created_nodes.len(),
                    version = tree.version(),
                    attempt,
                    "merged chain segments"
                );
                return Ok(MergeOutcome {
                    tree,
                    applied: delta.applied,
                    skipped: delta.skipped,
                    attempts: attempt,
                    tracker_synced,
                });
            }

            if attempt >= self.retry.max_attempts {
                warn!(entry_point, attempts = attempt, "giving up merge after repeated conflicts");
                return Err(Error::Conflict(format!(
                    "tree {} changed concurrently on each of {} attempts",
                    entry_point, attempt
                )));
            }

            let sleep = self.retry.backoff(attempt);
            debug!(entry_point, attempt, backoff = ?sleep, "tree version conflict, retrying");
            if !sleep.is_zero() {
                std::thread::sleep(sleep);
            }
        }
    }
}

fn validate_entry_point(entry_point: &str) -> Result<()> {
    if entry_point.is_empty() {
        return Err(Error::InvalidInput("entry point must not be empty".into()));
    }
    Ok(())
}
