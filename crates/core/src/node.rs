//! Call-chain tree nodes and the segments merged into them

/// Statistics carried by one tree node.
///
/// [`combine`](NodePayload::combine) is commutative and associative, so the
/// order in which segments are folded into a node never changes the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NodePayload {
    /// Number of calls observed at this node
    pub call_count: u64,
    /// Number of those calls that ended in error
    pub error_count: u64,
    /// Sum of call durations in milliseconds
    pub total_cost_ms: u64,
    /// Longest single call in milliseconds
    pub max_cost_ms: u64,
}

impl NodePayload {
    /// Payload describing a single call
    pub fn single_call(cost_ms: u64, is_error: bool) -> Self {
        Self {
            call_count: 1,
            error_count: u64::from(is_error),
            total_cost_ms: cost_ms,
            max_cost_ms: cost_ms,
        }
    }

    /// Fold `other` into `self`
    pub fn combine(&mut self, other: &NodePayload) {
        self.call_count = self.call_count.saturating_add(other.call_count);
        self.error_count = self.error_count.saturating_add(other.error_count);
        self.total_cost_ms = self.total_cost_ms.saturating_add(other.total_cost_ms);
        self.max_cost_ms = self.max_cost_ms.max(other.max_cost_ms);
    }

    /// True when no call has been recorded
    pub fn is_zero(&self) -> bool {
        *self == NodePayload::default()
    }
}

/// One node of an aggregated call-chain tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallChainTreeNode {
    /// Identity of the node within its tree
    pub qualifier: String,
    /// Merged statistics
    pub payload: NodePayload,
}

impl CallChainTreeNode {
    /// Create a node
    pub fn new(qualifier: impl Into<String>, payload: NodePayload) -> Self {
        Self {
            qualifier: qualifier.into(),
            payload,
        }
    }

    /// Build a node qualifier from a trace level id and a view point,
    /// e.g. `"0.1@/order/create"`.
    pub fn qualifier_for(level_id: &str, view_point: &str) -> String {
        format!("{}@{}", level_id, view_point)
    }

    /// Fold a segment payload into this node
    pub fn absorb(&mut self, payload: &NodePayload) {
        self.payload.combine(payload);
    }
}

/// A unit of incoming trace data for one node of one chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainSegment {
    /// Identifier of the source chain
    pub chain_id: String,
    /// Node the segment contributes to
    pub qualifier: String,
    /// Contribution
    pub payload: NodePayload,
}

impl ChainSegment {
    /// Create a segment
    pub fn new(chain_id: impl Into<String>, qualifier: impl Into<String>, payload: NodePayload) -> Self {
        Self {
            chain_id: chain_id.into(),
            qualifier: qualifier.into(),
            payload,
        }
    }
}
