//! The column-family storage contract
//!
//! A row is addressed by `(Table, row key)` and holds cells addressed by
//! `(ColumnFamily, qualifier)`. Every row carries a version that the store
//! bumps on each successful write; version 0 means the row does not exist.
//! `check_and_put` is the single-row conditional write the merge engine
//! uses to detect concurrent modification.

use chaintree_core::{ColumnFamily, Result, Table, WriteOutcome};
use std::collections::BTreeMap;

/// A stored cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Column family
    pub family: ColumnFamily,
    /// Column qualifier
    pub qualifier: String,
    /// UTF-8 value; empty means "present but empty"
    pub value: String,
}

impl Cell {
    /// Create a cell
    pub fn new(family: ColumnFamily, qualifier: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            family,
            qualifier: qualifier.into(),
            value: value.into(),
        }
    }
}

/// A row as returned by [`StorageGateway::get_row`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Row key
    pub row_key: String,
    /// Cells ordered by (family, qualifier)
    pub cells: Vec<Cell>,
    /// Row version, always >= 1 for a stored row
    pub version: u64,
}

impl Row {
    /// Cells of one family
    pub fn family(&self, family: ColumnFamily) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(move |c| c.family == family)
    }

    /// Value of one cell
    pub fn cell(&self, family: ColumnFamily, qualifier: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|c| c.family == family && c.qualifier == qualifier)
            .map(|c| c.value.as_str())
    }
}

/// One row of a batch write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowPut {
    /// Row key
    pub row_key: String,
    /// Cells to write
    pub cells: Vec<Cell>,
}

impl RowPut {
    /// Start an empty row mutation
    pub fn new(row_key: impl Into<String>) -> Self {
        Self {
            row_key: row_key.into(),
            cells: Vec::new(),
        }
    }

    /// Add a cell
    pub fn with_cell(mut self, family: ColumnFamily, qualifier: impl Into<String>, value: impl Into<String>) -> Self {
        self.cells.push(Cell::new(family, qualifier, value));
        self
    }
}

/// Column-family key-value store.
///
/// Implementations own their connection and its timeouts. They must be
/// thread-safe: one instance is shared by every merge and summary write in
/// the process.
pub trait StorageGateway: Send + Sync {
    /// Read a whole row; `None` when the row does not exist
    fn get_row(&self, table: Table, row_key: &str) -> Result<Option<Row>>;

    /// Read one cell; `None` when the row or the cell does not exist
    fn get_cell(
        &self,
        table: Table,
        row_key: &str,
        family: ColumnFamily,
        qualifier: &str,
    ) -> Result<Option<String>> {
        Ok(self
            .get_row(table, row_key)?
            .and_then(|row| row.cell(family, qualifier).map(str::to_string)))
    }

    /// Write columns of one family into a row, unconditionally
    fn put(
        &self,
        table: Table,
        row_key: &str,
        family: ColumnFamily,
        columns: &BTreeMap<String, String>,
    ) -> Result<()>;

    /// Write cells into a row only if its version still equals
    /// `expected_version` (0 = row must not exist).
    ///
    /// Returns `Ok(false)` when the version did not match; nothing is written
    /// in that case.
    ///
    /// Implementations must advance the row version by exactly one for every
    /// accepted write, whichever method made it. A caller that wrote at
    /// version `v` relies on the row being at `v + 1` afterwards.
    fn check_and_put(
        &self,
        table: Table,
        row_key: &str,
        expected_version: u64,
        cells: Vec<Cell>,
    ) -> Result<bool>;

    /// Write many rows with one call.
    ///
    /// Returns one outcome per input row, in input order. A failed row does
    /// not abort its siblings. `Err` means the call as a whole failed.
    fn batch_put(&self, table: Table, rows: &[RowPut]) -> Result<Vec<WriteOutcome>>;

    /// Release the connection. Later calls may fail with `StorageUnavailable`.
    fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
