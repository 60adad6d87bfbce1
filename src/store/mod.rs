//! Persistence for patient records and the supplement catalog.

mod catalog;
mod records;
mod schema;

pub use schema::SCHEMA;

use std::path::Path;

use rusqlite::Connection;
use thiserror::Error;

use crate::model::{CatalogEntry, LineItem, PatientRecord, StoredRecord};
use crate::sections::SectionBundle;

/// Storage errors.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record {name} changed elsewhere (expected {expected:?}, found {found:?})")]
    Conflict {
        name: String,
        expected: Option<i64>,
        found: Option<i64>,
    },

    #[error("Unknown catalog item: {0}")]
    UnknownCatalogItem(String),

    #[error("Invalid stored value: {0}")]
    Corrupt(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Load and save whole patient records.
///
/// A save replaces the record's items and section data in one transaction.
/// `expected_revision` is the revision the caller loaded (`None` for a new
/// record); a mismatch fails with [`PersistenceError::Conflict`] and leaves
/// the store untouched.
pub trait RecordStore {
    fn load_record(&self, name: &str) -> PersistenceResult<Option<StoredRecord>>;

    fn save_record(
        &mut self,
        patient: &PatientRecord,
        items: &[LineItem],
        sections: &SectionBundle,
        expected_revision: Option<i64>,
    ) -> PersistenceResult<i64>;

    /// Returns whether a record was deleted.
    fn delete_record(&mut self, name: &str) -> PersistenceResult<bool>;

    fn list_names(&self) -> PersistenceResult<Vec<String>>;

    fn list_catalog(&self) -> PersistenceResult<Vec<CatalogEntry>>;
}

/// SQLite-backed store.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open the store at path, creating and seeding it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> PersistenceResult<Self> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Create in-memory store (for testing).
    pub fn open_in_memory() -> PersistenceResult<Self> {
        let conn = Connection::open_in_memory()?;
        let mut store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&mut self) -> PersistenceResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        self.seed_catalog()?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        assert!(SqliteStore::open_in_memory().is_ok());
    }

    #[test]
    fn test_schema_initialized() {
        let store = SqliteStore::open_in_memory().unwrap();
        let tables: Vec<String> = store
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        for table in [
            "supplement_categories",
            "supplements",
            "patients",
            "patient_prescriptions",
            "patient_sections",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {}", table);
        }
    }

    #[test]
    fn test_reopen_file_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.db");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store
                .save_record(
                    &PatientRecord::new("Max Muster"),
                    &[],
                    &SectionBundle::default(),
                    None,
                )
                .unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.list_names().unwrap(), vec!["Max Muster".to_string()]);
        // Seeding is not repeated
        let count: i64 = store
            .conn()
            .query_row("SELECT COUNT(*) FROM supplements", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count as usize, store.list_catalog().unwrap().len());
    }
}
