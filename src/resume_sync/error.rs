use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage quota exceeded writing {key} ({needed} bytes, {available} available)")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Remote error: {0}")]
    Remote(String),
}

impl SyncError {
    /// Quota-class failures are the only ones the adapter degrades instead of returning.
    pub fn is_quota(&self) -> bool {
        matches!(self, SyncError::QuotaExceeded { .. })
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
