//! NodeCodec: string encoding of tree nodes and minute summaries
//!
//! Each value is a compact JSON object stored as a single UTF-8 cell value.
//! Field names are camelCase so cells written by older producers decode
//! unchanged.
//!
//! | Input | Result |
//! |-------|--------|
//! | output of `encode_*` | the encoded value, exactly |
//! | empty string | default value (empty node, zero summary) |
//! | anything else | `Error::MalformedRecord` |

use crate::error::{Error, Result};
use crate::node::{CallChainTreeNode, NodePayload};
use crate::summary::MinSummary;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeRecord {
    #[serde(default)]
    qualifier: String,
    #[serde(default)]
    call_count: u64,
    #[serde(default)]
    error_count: u64,
    #[serde(default)]
    total_cost_ms: u64,
    #[serde(default)]
    max_cost_ms: u64,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryRecord {
    #[serde(default)]
    total_call: u64,
    #[serde(default)]
    total_cost_time: u64,
    #[serde(default)]
    correct_number: u64,
    #[serde(default)]
    human_interruption_number: u64,
}

/// Encoder/decoder for cell values
pub struct NodeCodec;

impl NodeCodec {
    /// Encode a tree node
    pub fn encode_node(node: &CallChainTreeNode) -> String {
        let record = NodeRecord {
            qualifier: node.qualifier.clone(),
            call_count: node.payload.call_count,
            error_count: node.payload.error_count,
            total_cost_ms: node.payload.total_cost_ms,
            max_cost_ms: node.payload.max_cost_ms,
        };
        // a struct of strings and integers always serializes
        serde_json::to_string(&record).unwrap_or_default()
    }

    /// Decode a tree node; the empty value decodes to the empty node
    pub fn decode_node(value: &str) -> Result<CallChainTreeNode> {
        if value.is_empty() {
            return Ok(CallChainTreeNode::default());
        }
        let record: NodeRecord = serde_json::from_str(value)
            .map_err(|e| Error::MalformedRecord(format!("tree node: {}", e)))?;
        Ok(CallChainTreeNode {
            qualifier: record.qualifier,
            payload: NodePayload {
                call_count: record.call_count,
                error_count: record.error_count,
                total_cost_ms: record.total_cost_ms,
                max_cost_ms: record.max_cost_ms,
            },
        })
    }

    /// Encode a minute summary
    pub fn encode_summary(summary: &MinSummary) -> String {
        let record = SummaryRecord {
            total_call: summary.total_call,
            total_cost_time: summary.total_cost_time,
            correct_number: summary.correct_number,
            human_interruption_number: summary.human_interruption_number,
        };
        serde_json::to_string(&record).unwrap_or_default()
    }

    /// Decode a minute summary; the empty value decodes to the zero summary
    pub fn decode_summary(value: &str) -> Result<MinSummary> {
        if value.is_empty() {
            return Ok(MinSummary::default());
        }
        let record: SummaryRecord = serde_json::from_str(value)
            .map_err(|e| Error::MalformedRecord(format!("minute summary: {}", e)))?;
        Ok(MinSummary {
            total_call: record.total_call,
            total_cost_time: record.total_cost_time,
            correct_number: record.correct_number,
            human_interruption_number: record.human_interruption_number,
        })
    }
}
