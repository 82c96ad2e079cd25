//! # redb-backed Key-Value Store
//!
//! A disk-backed `KeyValueStore` using the redb embedded database.
//!
//! One database file can hold several logical stores: each `RedbStore`
//! addresses one table, and `RedbStore::table` opens a sibling table on the
//! same database handle. The CLI keeps cache entries and the session token
//! in separate tables of a single state file.

use super::KeyValueStore;
use crate::ArcherError;
use redb::{Database, ReadableDatabase, TableDefinition};
use std::path::Path;
use std::sync::Arc;

fn storage_error(e: impl std::fmt::Display) -> ArcherError {
    ArcherError::Storage(e.to_string())
}

/// A string key-value table in a redb database.
#[derive(Clone)]
pub struct RedbStore {
    /// Shared database handle (one per file per process).
    db: Arc<Database>,
    /// Table addressed by this store.
    table: String,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create the database at `path` and address `table`.
    pub fn open(path: impl AsRef<Path>, table: &str) -> Result<Self, ArcherError> {
        let db = Database::create(path.as_ref()).map_err(storage_error)?;
        let store = Self {
            db: Arc::new(db),
            table: table.to_string(),
        };
        store.ensure_table()?;
        Ok(store)
    }

    /// Address another table in the same database.
    pub fn table(&self, table: &str) -> Result<Self, ArcherError> {
        let store = Self {
            db: Arc::clone(&self.db),
            table: table.to_string(),
        };
        store.ensure_table()?;
        Ok(store)
    }

    /// Name of the addressed table.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }

    fn definition(&self) -> TableDefinition<'_, &'static str, &'static str> {
        TableDefinition::new(&self.table)
    }

    /// Create the table if it does not exist, so reads never hit a
    /// missing-table error.
    fn ensure_table(&self) -> Result<(), ArcherError> {
        let write_txn = self.db.begin_write().map_err(storage_error)?;
        {
            let _ = write_txn
                .open_table(self.definition())
                .map_err(storage_error)?;
        }
        write_txn.commit().map_err(storage_error)
    }
}

impl KeyValueStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<String>, ArcherError> {
        let read_txn = self.db.begin_read().map_err(storage_error)?;
        let table = read_txn
            .open_table(self.definition())
            .map_err(storage_error)?;
        let value = table
            .get(key)
            .map_err(storage_error)?
            .map(|guard| guard.value().to_string());
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ArcherError> {
        let write_txn = self.db.begin_write().map_err(storage_error)?;
        {
            let mut table = write_txn
                .open_table(self.definition())
                .map_err(storage_error)?;
            table.insert(key, value).map_err(storage_error)?;
        }
        write_txn.commit().map_err(storage_error)
    }

    fn delete(&self, key: &str) -> Result<(), ArcherError> {
        let write_txn = self.db.begin_write().map_err(storage_error)?;
        {
            let mut table = write_txn
                .open_table(self.definition())
                .map_err(storage_error)?;
            table.remove(key).map_err(storage_error)?;
        }
        write_txn.commit().map_err(storage_error)
    }
}

// =============================================================================
// TESTS
// =============================================================================
