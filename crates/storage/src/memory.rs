//! In-memory column-family store
//!
//! Rows are sharded by `(Table, row key)` in a DashMap, so writes to
//! different entry points never contend and a conditional write only locks
//! the shard holding its row.
//!
//! # Fault injection
//!
//! The store can be told to misbehave, which is how the failure paths of the
//! engine are exercised:
//! - `fail_rows`: batch items with these row keys report `Failed`
//! - `fail_table`: every write into a table returns `StorageUnavailable`
//! - `set_unavailable`: every call returns `StorageUnavailable`
//!
//! # Example
//!
//! ```ignore
//! use chaintree_storage::{MemoryStore, StorageGateway};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! store.fail_rows(["node-2", "node-4"]);
//! ```

use crate::gateway::{Cell, Row, RowPut, StorageGateway};
use chaintree_core::{ColumnFamily, Error, Result, Table, WriteOutcome};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// A stored row: cells plus the row version
#[derive(Debug, Default)]
struct StoredRow {
    cells: BTreeMap<(ColumnFamily, String), String>,
    version: u64,
}

impl StoredRow {
    fn apply(&mut self, cells: impl IntoIterator<Item = Cell>) {
        for cell in cells {
            self.cells.insert((cell.family, cell.qualifier), cell.value);
        }
        self.version += 1;
    }

    fn to_row(&self, row_key: &str) -> Row {
        Row {
            row_key: row_key.to_string(),
            cells: self
                .cells
                .iter()
                .map(|((family, qualifier), value)| Cell::new(*family, qualifier.clone(), value.clone()))
                .collect(),
            version: self.version,
        }
    }
}

#[derive(Debug, Default)]
struct FaultPlan {
    failing_rows: HashSet<String>,
    failing_tables: HashSet<Table>,
}

/// DashMap-backed [`StorageGateway`]
#[derive(Default)]
pub struct MemoryStore {
    rows: DashMap<(Table, String), StoredRow>,
    faults: Mutex<FaultPlan>,
    unavailable: AtomicBool,
    closed: AtomicBool,
    writes: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make batch items with these row keys fail
    pub fn fail_rows<I, S>(&self, row_keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut faults = self.faults.lock();
        faults.failing_rows.extend(row_keys.into_iter().map(Into::into));
    }

    /// Make every write into `table` fail with `StorageUnavailable`
    pub fn fail_table(&self, table: Table) {
        self.faults.lock().failing_tables.insert(table);
    }

    /// Remove all injected faults
    pub fn clear_faults(&self) {
        let mut faults = self.faults.lock();
        faults.failing_rows.clear();
        faults.failing_tables.clear();
    }

    /// Simulate losing (or regaining) the connection
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Release);
    }

    /// Number of successful row writes so far
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Acquire)
    }

    /// Number of rows stored in a table
    pub fn row_count(&self, table: Table) -> usize {
        self.rows.iter().filter(|entry| entry.key().0 == table).count()
    }

    /// Store a raw cell value, bypassing every check.
    ///
    /// Used to seed rows written by other producers, including values that
    /// do not decode.
    pub fn seed(&self, table: Table, row_key: &str, family: ColumnFamily, qualifier: &str, value: &str) {
        self.rows
            .entry((table, row_key.to_string()))
            .or_default()
            .apply([Cell::new(family, qualifier, value)]);
    }

    fn check_available(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::StorageUnavailable("store is shut down".into()));
        }
        if self.unavailable.load(Ordering::Acquire) {
            return Err(Error::StorageUnavailable("store unreachable".into()));
        }
        Ok(())
    }

    fn check_writable(&self, table: Table, cells: &[Cell]) -> Result<()> {
        self.check_available()?;
        if self.faults.lock().failing_tables.contains(&table) {
            return Err(Error::StorageUnavailable(format!("writes to {} are failing", table)));
        }
        if cells.is_empty() {
            return Err(Error::InvalidInput(format!("empty write to {}", table)));
        }
        if let Some(cell) = cells.iter().find(|c| !table.has_family(c.family)) {
            return Err(Error::InvalidInput(format!(
                "column family {} does not exist in {}",
                cell.family, table
            )));
        }
        Ok(())
    }
}

impl StorageGateway for MemoryStore {
    fn get_row(&self, table: Table, row_key: &str) -> Result<Option<Row>> {
        self.check_available()?;
        Ok(self
            .rows
            .get(&(table, row_key.to_string()))
            .map(|stored| stored.to_row(row_key)))
    }

    fn put(
        &self,
        table: Table,
        row_key: &str,
        family: ColumnFamily,
        columns: &BTreeMap<String, String>,
    ) -> Result<()> {
        let cells: Vec<Cell> = columns
            .iter()
            .map(|(qualifier, value)| Cell::new(family, qualifier.clone(), value.clone()))
            .collect();
        self.check_writable(table, &cells)?;
        self.rows
            .entry((table, row_key.to_string()))
            .or_default()
            .apply(cells);
        self.writes.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn check_and_put(
        &self,
        table: Table,
        row_key: &str,
        expected_version: u64,
        cells: Vec<Cell>,
    ) -> Result<bool> {
        self.check_writable(table, &cells)?;
        // the entry guard holds the shard lock, so compare and write are atomic
        match self.rows.entry((table, row_key.to_string())) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().version != expected_version {
                    return Ok(false);
                }
                occupied.get_mut().apply(cells);
            }
            Entry::Vacant(vacant) => {
                if expected_version != 0 {
                    return Ok(false);
                }
                vacant.insert(StoredRow::default()).apply(cells);
            }
        }
        self.writes.fetch_add(1, Ordering::AcqRel);
        Ok(true)
    }

    fn batch_put(&self, table: Table, rows: &[RowPut]) -> Result<Vec<WriteOutcome>> {
        self.check_available()?;
        if self.faults.lock().failing_tables.contains(&table) {
            return Err(Error::StorageUnavailable(format!("writes to {} are failing", table)));
        }

        let failing_rows = self.faults.lock().failing_rows.clone();
        let outcomes = rows
            .iter()
            .map(|row| {
                if failing_rows.contains(&row.row_key) {
                    return WriteOutcome::Failed(format!("region serving {} rejected the write", row.row_key));
                }
                if row.cells.is_empty() {
                    return WriteOutcome::Failed("empty row mutation".into());
                }
                if let Some(cell) = row.cells.iter().find(|c| !table.has_family(c.family)) {
                    return WriteOutcome::Failed(format!(
                        "column family {} does not exist in {}",
                        cell.family, table
                    ));
                }
                self.rows
                    .entry((table, row.row_key.clone()))
                    .or_default()
                    .apply(row.cells.iter().cloned());
                self.writes.fetch_add(1, Ordering::AcqRel);
                WriteOutcome::Ok
            })
            .collect();
        Ok(outcomes)
    }

    fn shutdown(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!(rows = self.rows.len(), "memory store shut down");
        }
        Ok(())
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("rows", &self.rows.len())
            .field("writes", &self.write_count())
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish()
    }
}
