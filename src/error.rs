use thiserror::Error;

/// Failure categories of a price tracking run.
///
/// Only `StorageConflict` is recoverable (the offending record is skipped);
/// every other variant aborts the run.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("marketplace unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("unexpected marketplace response: {0}")]
    UpstreamSchema(String),
    #[error("price history storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("duplicate price history row for barcode {barcode}")]
    StorageConflict { barcode: String },
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl TrackerError {
    /// Stable category name used in log lines.
    pub fn category(&self) -> &'static str {
        match self {
            TrackerError::UpstreamUnavailable(_) => "UpstreamUnavailable",
            TrackerError::UpstreamSchema(_) => "UpstreamSchemaError",
            TrackerError::StorageUnavailable(_) => "StorageUnavailable",
            TrackerError::StorageConflict { .. } => "StorageConflict",
            TrackerError::Configuration(_) => "ConfigurationError",
        }
    }

    /// Map a `reqwest` transport failure (connect, timeout, body read).
    pub fn from_transport(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            "timed out"
        } else if err.is_connect() {
            "connection failed"
        } else {
            "request failed"
        };
        TrackerError::UpstreamUnavailable(format!("{kind}: {err}"))
    }
}

/// True if the database rejected a row because of a duplicate key.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
