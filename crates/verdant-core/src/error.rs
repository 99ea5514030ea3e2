use thiserror::Error;

/// Errors raised while validating a produced record.
#[derive(Debug, Error)]
pub enum RecordError {
    /// A required record field is absent or empty.
    #[error("record field {0} is missing or empty")]
    MissingField(&'static str),

    /// The value mapping contains no entries after normalization.
    #[error("record from sensor {sensor} has no value fields")]
    EmptyValue { sensor: String },
}

pub type Result<T> = std::result::Result<T, RecordError>;
