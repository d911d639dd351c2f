//! TreeRepository: persistence of trees and their merged-id sets
//!
//! ## Layout
//!
//! | Table | Row key | Family | Qualifier | Value |
//! |-------|---------|--------|-----------|-------|
//! | CallChainTreeDetail | entry point | chain_tree_detail | node qualifier | encoded node |
//! | CallChainTreeDetail | entry point | merge_state | HAS_BEEN_MERGED_CHAIN_ID | id set |
//! | TreeIdCidMapping | entry point | trace_id | HAS_BEEN_MERGED_CHAIN_ID | id set |
//!
//! The tree row carries its own copy of the merged-id set and is written with
//! one `check_and_put`, so nodes and ids always change together. The mapping
//! row is written afterwards, unioned with what it already holds, so it only
//! grows. If that write fails the mapping lags behind, and loading reconciles
//! by taking the union of both sets.

use crate::retry::RetryPolicy;
use crate::tracker::MergeTracker;
use crate::tree::CallChainTree;
use chaintree_core::{ColumnFamily, Error, NodeCodec, Result, Table, MERGED_CHAIN_IDS_QUALIFIER};
use chaintree_storage::{Cell, StorageGateway};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Loads and stores [`CallChainTree`]s through a [`StorageGateway`]
#[derive(Clone)]
pub struct TreeRepository {
    gateway: Arc<dyn StorageGateway>,
}

impl TreeRepository {
    /// Create a repository over a shared gateway
    pub fn new(gateway: Arc<dyn StorageGateway>) -> Self {
        Self { gateway }
    }

    /// Load the tree of an entry point; `None` when nothing was ever stored.
    ///
    /// Undecodable node cells are logged and treated as absent. Empty node
    /// cells are skipped.
    pub fn load(&self, entry_point: &str) -> Result<Option<CallChainTree>> {
        let row = self.gateway.get_row(Table::CallChainTreeDetail, entry_point)?;
        let mapped = self.load_merged_chain_ids(entry_point)?;

        let (row, mapped) = match (row, mapped) {
            (None, None) => return Ok(None),
            (None, Some(tracker)) => {
                // ids recorded without a tree row: nothing to merge into, keep them
                return Ok(Some(CallChainTree::from_parts(
                    entry_point.to_string(),
                    BTreeMap::new(),
                    tracker,
                    0,
                )));
            }
            (Some(row), mapped) => (row, mapped),
        };

        let mut nodes = BTreeMap::new();
        for cell in row.family(ColumnFamily::ChainTreeDetail) {
            if cell.value.is_empty() {
                continue;
            }
            match NodeCodec::decode_node(&cell.value) {
                Ok(mut node) => {
                    if node.qualifier != cell.qualifier {
                        debug!(
                            entry_point,
                            column = %cell.qualifier,
                            stored = %node.qualifier,
                            "node qualifier differs from its column, using the column"
                        );
                        node.qualifier = cell.qualifier.clone();
                    }
                    nodes.insert(cell.qualifier.clone(), node);
                }
                Err(e) => {
                    warn!(entry_point, qualifier = %cell.qualifier, error = %e, "dropping undecodable tree node");
                }
            }
        }

        let mut tracker = match row.cell(ColumnFamily::MergeState, MERGED_CHAIN_IDS_QUALIFIER) {
            Some(value) => decode_tracker(entry_point, Table::CallChainTreeDetail, value),
            None => MergeTracker::new(),
        };
        if let Some(mapped) = mapped {
            if !mapped.is_superset(&tracker) {
                debug!(
                    entry_point,
                    tree_ids = tracker.len(),
                    mapped_ids = mapped.len(),
                    "merged-id mapping lags behind tree row"
                );
            }
            tracker.union_with(&mapped);
        }

        Ok(Some(CallChainTree::from_parts(
            entry_point.to_string(),
            nodes,
            tracker,
            row.version,
        )))
    }

    /// Read the merged-id set stored in the mapping table.
    ///
    /// `None` when the row or its cell is absent. An undecodable value is
    /// logged and read as the empty set.
    pub fn load_merged_chain_ids(&self, entry_point: &str) -> Result<Option<MergeTracker>> {
        let value = self.gateway.get_cell(
            Table::TreeIdCidMapping,
            entry_point,
            ColumnFamily::TraceId,
            MERGED_CHAIN_IDS_QUALIFIER,
        )?;
        Ok(value.map(|v| decode_tracker(entry_point, Table::TreeIdCidMapping, &v)))
    }

    /// Write the tree row if nobody else wrote it since it was loaded.
    ///
    /// Returns `Ok(false)` on a version conflict. On success the tree's
    /// version is advanced to the stored one.
    pub fn try_save_tree(&self, tree: &mut CallChainTree) -> Result<bool> {
        let mut cells: Vec<Cell> = tree
            .nodes()
            .iter()
            .map(|(qualifier, node)| {
                Cell::new(ColumnFamily::ChainTreeDetail, qualifier.clone(), NodeCodec::encode_node(node))
            })
            .collect();
        cells.push(Cell::new(
            ColumnFamily::MergeState,
            MERGED_CHAIN_IDS_QUALIFIER,
            tree.tracker().serialize(),
        ));

        let written = self.gateway.check_and_put(
            Table::CallChainTreeDetail,
            tree.entry_point(),
            tree.version(),
            cells,
        )?;
        if written {
            tree.set_version(tree.version() + 1);
        }
        Ok(written)
    }

    /// Add the tree's merged ids to the mapping table.
    ///
    /// The stored set is read and unioned before writing, and the write is
    /// conditional on the row version, so the mapping never loses ids written
    /// by a concurrent merge. Gives up with `Error::Conflict` once `retry` is
    /// exhausted.
    pub fn save_tracker(&self, tree: &CallChainTree, retry: &RetryPolicy) -> Result<()> {
        let entry_point = tree.entry_point();
        let mut attempt = 0u32;
        loop {
            attempt += 1;

            let row = self.gateway.get_row(Table::TreeIdCidMapping, entry_point)?;
            let (mut ids, version) = match &row {
                Some(row) => (
                    row.cell(ColumnFamily::TraceId, MERGED_CHAIN_IDS_QUALIFIER)
                        .map(|v| decode_tracker(entry_point, Table::TreeIdCidMapping, v))
                        .unwrap_or_default(),
                    row.version,
                ),
                None => (MergeTracker::new(), 0),
            };
            if row.is_some() && ids.is_superset(tree.tracker()) {
                return Ok(());
            }
            ids.union_with(tree.tracker());

            let cell = Cell::new(ColumnFamily::TraceId, MERGED_CHAIN_IDS_QUALIFIER, ids.serialize());
            if self
                .gateway
                .check_and_put(Table::TreeIdCidMapping, entry_point, version, vec![cell])?
            {
                return Ok(());
            }

            if attempt >= retry.max_attempts {
                return Err(Error::Conflict(format!(
                    "merged-id mapping of {} changed concurrently on each of {} attempts",
                    entry_point, attempt
                )));
            }
            let sleep = retry.backoff(attempt);
            debug!(entry_point, attempt, backoff = ?sleep, "merged-id mapping conflict, retrying");
            if !sleep.is_zero() {
                std::thread::sleep(sleep);
            }
        }
    }
}

fn decode_tracker(entry_point: &str, table: Table, value: &str) -> MergeTracker {
    MergeTracker::deserialize(value).unwrap_or_else(|e| {
        warn!(entry_point, %table, error = %e, "undecodable merged-id set, reading it as empty");
        MergeTracker::new()
    })
}
