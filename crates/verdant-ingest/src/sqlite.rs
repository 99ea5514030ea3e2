use std::path::PathBuf;

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::Connection;
use verdant_core::FlatRecord;

use crate::backend::{StorageBackend, StorageConnection};
use crate::error::{Result, StorageError};

/// Embedded file-backed target. The database file (and its parent
/// directory) is created on first connect.
pub struct SqliteBackend {
    path: PathBuf,
}

impl SqliteBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    async fn connect(&self) -> Result<Box<dyn StorageConnection>> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::Connect(e.to_string()))?;
            }
        }
        let conn =
            Connection::open(&self.path).map_err(|e| StorageError::Connect(e.to_string()))?;
        Ok(Box::new(SqliteConnection { conn }))
    }
}

struct SqliteConnection {
    conn: Connection,
}

// Column names are quoted in both statements: OFFSET is a keyword, and
// value keys come from worker output.
#[async_trait]
impl StorageConnection for SqliteConnection {
    async fn list_tables(&mut self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")
            .map_err(write_err)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(write_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(write_err)?;
        Ok(names)
    }

    async fn create_table(&mut self, table: &str, record: &FlatRecord) -> Result<()> {
        let columns = record
            .values
            .keys()
            .map(|k| format!("\"{k}\" REAL"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "CREATE TABLE {table} (\"TIMESTAMP\" INTEGER, \"OFFSET\" REAL, \"SENSOR\" TEXT, \
             {columns}, PRIMARY KEY (\"TIMESTAMP\"))"
        );
        self.conn.execute(&sql, []).map_err(write_err)?;
        Ok(())
    }

    async fn insert(&mut self, table: &str, record: &FlatRecord) -> Result<()> {
        let keys = record
            .values
            .keys()
            .map(|k| format!("\"{k}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=3 + record.values.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {table} (\"TIMESTAMP\", \"OFFSET\", \"SENSOR\", {keys}) \
             VALUES ({placeholders})"
        );

        let mut params: Vec<Value> = Vec::with_capacity(3 + record.values.len());
        params.push(Value::Integer(record.timestamp));
        params.push(Value::Real(record.offset));
        params.push(Value::Text(record.sensor.clone()));
        params.extend(record.values.values().map(|v| Value::Real(*v)));

        self.conn
            .execute(&sql, rusqlite::params_from_iter(params))
            .map_err(write_err)?;
        Ok(())
    }
}

fn write_err(e: rusqlite::Error) -> StorageError {
    StorageError::Write(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::IngestionQueue;
    use indexmap::IndexMap;
    use std::sync::Arc;
    use verdant_core::{Reading, Record};

    fn bme_record(timestamp: i64) -> Record {
        let mut fields = IndexMap::new();
        fields.insert("TEMP".to_string(), 21.5);
        fields.insert("HUM".to_string(), 55.0);
        Record {
            timestamp,
            offset: 0.3,
            sensor: "BME280".to_string(),
            value: Reading::Fields(fields),
        }
    }

    #[tokio::test]
    async fn round_trip_creates_table_and_row() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("sensors.db");
        let backend = Arc::new(SqliteBackend::new(&db_path));
        let queue = IngestionQueue::new(backend, "data");

        queue.enqueue(&bme_record(1_700_000_000)).unwrap();
        queue.flush_batch().await;
        assert_eq!(queue.pending_len(), 0);

        let conn = Connection::open(&db_path).unwrap();
        let mut stmt = conn.prepare("PRAGMA table_info(data_bme280)").unwrap();
        let columns: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(columns, vec!["TIMESTAMP", "OFFSET", "SENSOR", "TEMP", "HUM"]);

        let (ts, offset, sensor, temp, hum): (i64, f64, String, f64, f64) = conn
            .query_row("SELECT * FROM data_bme280", [], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            })
            .unwrap();
        assert_eq!(ts, 1_700_000_000);
        assert_eq!(offset, 0.3);
        assert_eq!(sensor, "BME280");
        assert_eq!(temp, 21.5);
        assert_eq!(hum, 55.0);
    }

    #[tokio::test]
    async fn existing_table_is_reused_across_flushes() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("sensors.db");
        let backend = Arc::new(SqliteBackend::new(&db_path));
        let queue = IngestionQueue::new(backend, "data");

        queue.enqueue(&bme_record(1_700_000_000)).unwrap();
        queue.flush_batch().await;
        queue.enqueue(&bme_record(1_700_000_060)).unwrap();
        queue.flush_batch().await;

        let conn = Connection::open(&db_path).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM data_bme280", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn duplicate_timestamp_fails_but_stays_queued() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("sensors.db");
        let backend = Arc::new(SqliteBackend::new(&db_path));
        let queue = IngestionQueue::new(backend, "data");

        queue.enqueue(&bme_record(1_700_000_000)).unwrap();
        queue.flush_batch().await;

        // Same primary key again: the insert fails and the record is
        // retried rather than dropped.
        queue.enqueue(&bme_record(1_700_000_000)).unwrap();
        queue.flush_batch().await;
        assert_eq!(queue.pending_len(), 1);
    }
}
