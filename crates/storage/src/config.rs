//! Storage connection settings
//!
//! Gateways that talk to a real cluster are constructed from a
//! [`StorageConfig`]. Validation happens at construction time and reports
//! `MissingConfiguration`; deciding whether that stops the process is left to
//! the caller.

use chaintree_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default coordination service client port
pub const DEFAULT_CLIENT_PORT: u16 = 2181;

/// Default bound for a single storage call
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 30_000;

/// Connection settings for a column-family store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Comma-separated coordination quorum, e.g. `"zk1,zk2,zk3"`
    pub quorum: Option<String>,
    /// Client port of the quorum members
    pub client_port: u16,
    /// Upper bound for one storage call, enforced by the gateway
    pub operation_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            quorum: None,
            client_port: DEFAULT_CLIENT_PORT,
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
        }
    }
}

impl StorageConfig {
    /// Settings for the given quorum, other fields defaulted
    pub fn with_quorum(quorum: impl Into<String>) -> Self {
        Self {
            quorum: Some(quorum.into()),
            ..Self::default()
        }
    }

    /// Set the client port
    pub fn client_port(mut self, port: u16) -> Self {
        self.client_port = port;
        self
    }

    /// Set the per-call timeout
    pub fn operation_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.operation_timeout_ms = timeout_ms;
        self
    }

    /// Check that everything a connection needs is present
    pub fn validate(&self) -> Result<()> {
        match self.quorum.as_deref().map(str::trim) {
            None | Some("") => Err(Error::MissingConfiguration(
                "storage quorum is not configured".into(),
            )),
            Some(_) if self.client_port == 0 => Err(Error::MissingConfiguration(
                "storage client port is not configured".into(),
            )),
            Some(_) if self.operation_timeout_ms == 0 => Err(Error::InvalidConfiguration(
                "operation timeout must be positive".into(),
            )),
            Some(_) => Ok(()),
        }
    }

    /// Quorum members, trimmed, empty entries dropped
    pub fn quorum_members(&self) -> Vec<String> {
        self.quorum
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(|m| format!("{}:{}", m, self.client_port))
            .collect()
    }
}
