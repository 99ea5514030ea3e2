//! `verdant-ingest` — buffered, at-least-once delivery of records to storage.
//!
//! # Overview
//!
//! The scheduler enqueues finished records into an [`IngestionQueue`]; a
//! background flush task drains the buffer into a [`StorageBackend`]
//! (embedded SQLite or networked Postgres). At most one flush runs at a
//! time, failed records are retried ahead of newer arrivals, and the
//! pending buffer is capped so a long storage outage cannot eat the heap.
//!
//! Per-sensor tables are created on first sight of a record; the value keys
//! of that first record fix the column set.

pub mod backend;
pub mod error;
pub mod postgres;
pub mod queue;
pub mod sqlite;
pub mod textlog;

pub use backend::{StorageBackend, StorageConnection};
pub use error::{Result, StorageError};
pub use postgres::PostgresBackend;
pub use queue::{IngestionQueue, QueueEntry};
pub use sqlite::SqliteBackend;
