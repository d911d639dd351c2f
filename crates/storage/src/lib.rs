//! Storage layer for chaintree
//!
//! This crate defines the column-family key-value contract the aggregation
//! core consumes, plus:
//! - MemoryStore: DashMap-sharded implementation with per-row versions
//!   and fault injection, used for tests and embedding
//! - StorageConfig: connection settings validated at construction time

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod gateway;
pub mod memory;

pub use config::StorageConfig;
pub use gateway::{Cell, Row, RowPut, StorageGateway};
pub use memory::MemoryStore;
