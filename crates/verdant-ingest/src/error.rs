use thiserror::Error;

/// Storage failures, split by blast radius: a connect failure retries the
/// whole batch, a write failure retries only the record that caused it.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("cannot connect to storage backend: {0}")]
    Connect(String),

    #[error("storage write failed: {0}")]
    Write(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;
