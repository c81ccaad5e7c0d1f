use thiserror::Error;
use uuid::Uuid;

/// Failures reported by a `TaskStore`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("task {0} not found")]
    NotFound(Uuid),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum TodoError {
    #[error("no signed-in user")]
    SignedOut,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("remote write was aborted before it settled")]
    WriteAborted,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} missing, it is required")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}
