//! Aggregator configuration.
//!
//! One TOML document with a table per concern:
//!
//! ```toml
//! [storage]
//! quorum = "zk1,zk2,zk3"
//! client_port = 2181
//!
//! [retry]
//! max_attempts = 16
//!
//! [summary]
//! max_batch_size = 1000
//! ```
//!
//! Every field has a default except the storage quorum, which
//! [`AggregatorConfig::validate`] requires.

use chaintree_core::{Error, Result};
use chaintree_engine::{RetryPolicy, SummaryWriterConfig};
use chaintree_storage::StorageConfig;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;

/// Settings for a [`ChainAggregator`](crate::ChainAggregator)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Storage connection
    pub storage: StorageConfig,
    /// Optimistic merge retries
    pub retry: RetryPolicy,
    /// Summary flushing
    pub summary: SummaryWriterConfig,
}

impl AggregatorConfig {
    /// Defaults with the given storage quorum
    pub fn with_quorum(quorum: impl Into<String>) -> Self {
        Self {
            storage: StorageConfig::with_quorum(quorum),
            ..Self::default()
        }
    }

    /// Parse a TOML document.
    ///
    /// Unparseable text is `InvalidConfiguration`. The result is not
    /// validated; [`ChainAggregatorBuilder::build`](crate::ChainAggregatorBuilder::build) does that.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::InvalidConfiguration(e.to_string()))
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                Error::MissingConfiguration(format!("config file {} not found", path.display()))
            }
            _ => Error::InvalidConfiguration(format!("cannot read {}: {}", path.display(), e)),
        })?;
        Self::from_toml_str(&text)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.storage.validate()?;
        self.retry.validate()?;
        self.summary.validate()
    }
}
