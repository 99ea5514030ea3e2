use async_trait::async_trait;
use verdant_core::FlatRecord;

use crate::error::Result;

/// A persistence target. `connect` is scoped acquisition: the returned
/// connection lives for exactly one flush batch and is dropped afterwards.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn StorageConnection>>;
}

/// One live connection. SQL syntax (column types, placeholders, catalog
/// queries) is backend-specific, so statement generation lives behind
/// these methods rather than in the queue.
#[async_trait]
pub trait StorageConnection: Send {
    /// Names of existing tables. Callers compare case-insensitively.
    async fn list_tables(&mut self) -> Result<Vec<String>>;

    /// Create the table for a sensor's first record: fixed
    /// TIMESTAMP/OFFSET/SENSOR columns plus one numeric column per value key,
    /// TIMESTAMP as primary key.
    async fn create_table(&mut self, table: &str, record: &FlatRecord) -> Result<()>;

    /// Insert one row, committed immediately.
    async fn insert(&mut self, table: &str, record: &FlatRecord) -> Result<()>;
}
