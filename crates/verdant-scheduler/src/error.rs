use thiserror::Error;
use verdant_workers::WorkerError;

/// Errors that reject a jobs-file reload. The previously loaded job set
/// stays in effect whenever one of these is raised.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A job entry lacks one of the required fields.
    #[error("job {job}: missing required field `{field}`")]
    MissingField { job: String, field: &'static str },

    /// The `run_at` expression does not parse as cron.
    #[error("job {job}: invalid cron expression `{expr}`: {source}")]
    InvalidCron {
        job: String,
        expr: String,
        #[source]
        source: cron::error::Error,
    },

    /// Worker construction failed (unknown class or bad params).
    #[error("job {job}: {source}")]
    Worker {
        job: String,
        #[source]
        source: WorkerError,
    },

    #[error("cannot read jobs file: {0}")]
    Io(#[from] std::io::Error),

    #[error("jobs file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
