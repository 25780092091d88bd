//! # Sync Error Types
//!
//! Errors for the offline queue reconciler. The important split is between
//! rejections (the backend looked at the sale and said no) and transient
//! failures (the backend couldn't be reached): rejections park the entry as
//! failed, transient failures put it back in line.

use thiserror::Error;

use bodega_db::DbError;

/// Reconciler errors.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Local queue storage failed.
    #[error("Queue storage error: {0}")]
    Db(#[from] DbError),

    /// A queue payload could not be (de)serialized.
    #[error("Payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal channel closed unexpectedly.
    #[error("Channel error: {0}")]
    Channel(String),
}

/// Result type for reconciler operations.
pub type SyncResult<T> = Result<T, SyncError>;
