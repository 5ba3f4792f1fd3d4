//! SQLite persistence for saved scan results.

use std::{path::Path, sync::Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use serde::Serialize;
use thiserror::Error;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    heatmap_image BLOB NOT NULL,
    prediction TEXT NOT NULL,
    confidence REAL NOT NULL
);";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("database connection mutex was poisoned by a previous panic")]
    LockPoisoned,
}

/// A result to be saved.
#[derive(Debug, Clone, PartialEq)]
pub struct NewResult {
    /// PNG-encoded overlay.
    pub heatmap_image: Vec<u8>,
    pub prediction: String,
    pub confidence: f64,
}

/// A saved result as read back from the database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredResult {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub heatmap_image: Vec<u8>,
    pub prediction: String,
    pub confidence: f64,
}

/// Result table behind a single shared connection.
#[derive(Debug)]
pub struct ResultStore {
    conn: Mutex<Connection>,
}

impl ResultStore {
    /// Open (creating if needed) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the file cannot be opened or the
    /// schema cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Save `result` stamped with the current time and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    pub fn insert(&self, result: &NewResult) -> Result<i64, StoreError> {
        self.insert_at(result, Utc::now())
    }

    /// Save `result` with an explicit timestamp and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    pub fn insert_at(&self, result: &NewResult, timestamp: DateTime<Utc>) -> Result<i64, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        conn.execute(
            "INSERT INTO results (timestamp, heatmap_image, prediction, confidence)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                timestamp,
                result.heatmap_image,
                result.prediction,
                result.confidence
            ],
        )?;
        let id = conn.last_insert_rowid();
        tracing::info!(id, prediction = %result.prediction, "saved result");
        Ok(id)
    }

    /// All saved results, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    pub fn list(&self) -> Result<Vec<StoredResult>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, heatmap_image, prediction, confidence
             FROM results ORDER BY timestamp DESC, id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(StoredResult {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                heatmap_image: row.get(2)?,
                prediction: row.get(3)?,
                confidence: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Delete the given ids and return how many rows were removed.
    ///
    /// Unknown ids are ignored; an empty slice deletes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the transaction fails; no rows are removed
    /// in that case.
    pub fn delete(&self, ids: &[i64]) -> Result<usize, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        let tx = conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM results WHERE id = ?1")?;
            for id in ids {
                removed += stmt.execute([id])?;
            }
        }
        tx.commit()?;
        tracing::info!(requested = ids.len(), removed, "deleted results");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> ResultStore {
        ResultStore::open_in_memory().unwrap_or_else(|e| panic!("open store: {e}"))
    }

    fn result(prediction: &str) -> NewResult {
        NewResult {
            heatmap_image: vec![1, 2, 3],
            prediction: prediction.into(),
            confidence: 0.5,
        }
    }

    #[rstest]
    fn empty_store_lists_nothing(store: ResultStore) {
        assert_eq!(store.list().map(|rows| rows.len()).ok(), Some(0));
    }

    #[rstest]
    fn empty_delete_is_a_no_op(store: ResultStore) {
        store
            .insert(&result("No Tumor"))
            .unwrap_or_else(|e| panic!("insert: {e}"));
        assert_eq!(store.delete(&[]).ok(), Some(0));
        assert_eq!(store.list().map(|rows| rows.len()).ok(), Some(1));
    }

    #[rstest]
    fn unknown_ids_are_ignored(store: ResultStore) {
        assert_eq!(store.delete(&[42, 43]).ok(), Some(0));
    }
}
