//! Core types for chaintree
//!
//! This crate defines the pieces every other layer agrees on:
//! - Error: the single error taxonomy and `Result` alias
//! - Schema: closed enumeration of tables and column families
//! - Node / MinSummary: the aggregated entities and their combination rules
//! - NodeCodec: flat string encoding of entities stored as cell values

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod error;
pub mod node;
pub mod schema;
pub mod summary;

pub use codec::NodeCodec;
pub use error::{Error, Result};
pub use node::{CallChainTreeNode, ChainSegment, NodePayload};
pub use schema::{ColumnFamily, Table, MERGED_CHAIN_IDS_QUALIFIER};
pub use summary::{MinSummary, MinuteBucket, NodeKey, SummaryUpdate, WriteOutcome};
