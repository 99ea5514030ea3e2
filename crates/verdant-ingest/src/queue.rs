use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};
use verdant_core::config::PENDING_CAP;
use verdant_core::{table_name, FlatRecord, Record, RecordError};

use crate::backend::{StorageBackend, StorageConnection};
use crate::error::Result;

/// A normalized record bound to its destination table.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub table: String,
    pub record: FlatRecord,
}

/// Bounded buffer between the scheduler tick and durable storage.
///
/// `enqueue` and `flush` never block on storage I/O: the lock guards only
/// the brief push/swap/requeue operations, and the actual write runs on a
/// spawned task. The `flush_running` flag makes `flush` single-flight — a
/// second call while a flush is underway is a no-op, so calling it once
/// per tick is safe whether or not data arrived.
pub struct IngestionQueue {
    backend: Arc<dyn StorageBackend>,
    table_prefix: String,
    pending: Mutex<Vec<QueueEntry>>,
    flush_running: AtomicBool,
    cap: usize,
}

impl IngestionQueue {
    pub fn new(backend: Arc<dyn StorageBackend>, table_prefix: impl Into<String>) -> Self {
        Self {
            backend,
            table_prefix: table_prefix.into(),
            pending: Mutex::new(Vec::new()),
            flush_running: AtomicBool::new(false),
            cap: PENDING_CAP,
        }
    }

    /// Normalize and append one record. O(1), non-blocking.
    pub fn enqueue(&self, record: &Record) -> std::result::Result<(), RecordError> {
        let flat = record.flatten()?;
        let entry = QueueEntry {
            table: table_name(&self.table_prefix, &flat.sensor),
            record: flat,
        };
        self.pending.lock().unwrap().push(entry);
        Ok(())
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Trigger an asynchronous flush of everything currently pending.
    ///
    /// No-op while a previous flush is still running: the flag is taken with
    /// a compare-and-set, so at most one batch is ever in flight.
    pub fn flush(self: &Arc<Self>) {
        if self
            .flush_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            queue.flush_batch().await;
            queue.flush_running.store(false, Ordering::SeqCst);
        });
    }

    /// Shutdown drain: wait out any in-flight background flush, then write
    /// everything still pending on the caller's task.
    ///
    /// Takes the same `flush_running` flag as [`Self::flush`], so the
    /// one-flush-at-a-time guarantee holds on the exit path too and records
    /// a late background flush returns to pending are not lost.
    pub async fn drain(&self) {
        loop {
            if self
                .flush_running
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        self.flush_batch().await;
        self.flush_running.store(false, Ordering::SeqCst);
    }

    /// One complete flush attempt, on the caller's task. [`Self::flush`] is
    /// the non-blocking entry point; callers are responsible for holding the
    /// `flush_running` flag if a background flush could be underway.
    pub async fn flush_batch(&self) {
        // Swap the whole buffer out so producers keep enqueueing into a
        // fresh one while this batch is written.
        let batch = std::mem::take(&mut *self.pending.lock().unwrap());
        if batch.is_empty() {
            return;
        }

        let failed = self.write_batch(batch).await;

        // Failed records go back in front of newer arrivals (priority
        // retry), then the combined buffer is cut to the newest `cap`
        // entries. Old data loses to recent data once the cap is hit.
        let mut pending = self.pending.lock().unwrap();
        let mut combined = failed;
        combined.append(&mut pending);
        if combined.len() > self.cap {
            let dropped = combined.len() - self.cap;
            combined.drain(..dropped);
            warn!(dropped, cap = self.cap, "retry buffer full; oldest records dropped");
        }
        *pending = combined;
    }

    /// Write one batch; returns the entries that must be retried.
    async fn write_batch(&self, batch: Vec<QueueEntry>) -> Vec<QueueEntry> {
        let total = batch.len();

        let mut conn = match self.backend.connect().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, pending = total, "storage connect failed; whole batch queued for retry");
                return batch;
            }
        };
        let mut tables: HashSet<String> = match conn.list_tables().await {
            Ok(names) => names.into_iter().map(|n| n.to_lowercase()).collect(),
            Err(e) => {
                warn!(error = %e, pending = total, "table listing failed; whole batch queued for retry");
                return batch;
            }
        };

        let mut failed = Vec::new();
        for entry in batch {
            if let Err(e) = write_entry(conn.as_mut(), &mut tables, &entry).await {
                warn!(table = %entry.table, error = %e, "record write failed; queued for retry");
                failed.push(entry);
            }
        }

        if failed.is_empty() {
            debug!(written = total, "flush complete");
        } else {
            warn!(failed = failed.len(), total, "flush finished with failures");
        }
        failed
    }
}

async fn write_entry(
    conn: &mut dyn StorageConnection,
    tables: &mut HashSet<String>,
    entry: &QueueEntry,
) -> Result<()> {
    if !tables.contains(&entry.table) {
        conn.create_table(&entry.table, &entry.record).await?;
        tables.insert(entry.table.clone());
    }
    conn.insert(&entry.table, &entry.record).await
}
