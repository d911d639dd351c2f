//! Closed schema of the tables and column families the core touches
//!
//! Every storage call names a [`Table`] and a [`ColumnFamily`] instead of a
//! raw string. The storage names returned by `name()` are frozen; they are
//! what existing stores hold.

use std::fmt;

/// Qualifier under which a serialized merged-chain-id set is stored.
pub const MERGED_CHAIN_IDS_QUALIFIER: &str = "HAS_BEEN_MERGED_CHAIN_ID";

/// Tables referenced by the aggregation core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    /// Row key = entry point, columns = node qualifier -> encoded node
    CallChainTreeDetail,
    /// Row key = entry point, single column = merged chain id set
    TreeIdCidMapping,
    /// Row key = node key, columns = minute -> encoded summary
    ChainOneMinuteSummary,
}

impl Table {
    /// All known tables
    pub const ALL: [Table; 3] = [
        Table::CallChainTreeDetail,
        Table::TreeIdCidMapping,
        Table::ChainOneMinuteSummary,
    ];

    /// Storage name of the table
    pub fn name(&self) -> &'static str {
        match self {
            Table::CallChainTreeDetail => "trace-call-chain-tree-detail",
            Table::TreeIdCidMapping => "trace-call-chain-tree-id-cid-mapping",
            Table::ChainOneMinuteSummary => "trace-chain-one-minute-summary",
        }
    }

    /// Column families a row of this table may carry
    pub fn families(&self) -> &'static [ColumnFamily] {
        match self {
            Table::CallChainTreeDetail => &[ColumnFamily::ChainTreeDetail, ColumnFamily::MergeState],
            Table::TreeIdCidMapping => &[ColumnFamily::TraceId],
            Table::ChainOneMinuteSummary => &[ColumnFamily::ChainSummary],
        }
    }

    /// Whether `family` belongs to this table
    pub fn has_family(&self, family: ColumnFamily) -> bool {
        self.families().contains(&family)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column families, each with a fixed value schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnFamily {
    /// Encoded [`CallChainTreeNode`](crate::CallChainTreeNode) values
    ChainTreeDetail,
    /// Merged chain id set kept alongside the nodes of a tree row
    MergeState,
    /// Merged chain id set in the mapping table
    TraceId,
    /// Encoded [`MinSummary`](crate::MinSummary) values
    ChainSummary,
}

impl ColumnFamily {
    /// Storage name of the family
    pub fn name(&self) -> &'static str {
        match self {
            ColumnFamily::ChainTreeDetail => "chain_tree_detail",
            ColumnFamily::MergeState => "merge_state",
            ColumnFamily::TraceId => "trace_id",
            ColumnFamily::ChainSummary => "chain_summary",
        }
    }
}

impl fmt::Display for ColumnFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
