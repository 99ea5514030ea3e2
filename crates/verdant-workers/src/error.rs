use thiserror::Error;

/// Errors raised while constructing or running a worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// No constructor registered under this class name.
    #[error("unknown worker class: {0}")]
    UnknownClass(String),

    /// A constructor parameter is missing or has the wrong shape.
    #[error("invalid worker param `{param}`: {reason}")]
    InvalidParam { param: &'static str, reason: String },

    /// Hardware or filesystem access failed.
    #[error("worker I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Driver-specific failure during do_work.
    #[error("{0}")]
    Failed(String),
}

pub type Result<T> = std::result::Result<T, WorkerError>;
