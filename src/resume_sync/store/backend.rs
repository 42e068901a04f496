use crate::error::Result;

/// Abstract interface for raw key-value storage.
///
/// This trait handles the "how" of storage (filesystem vs memory), while
/// [`StorageAdapter`](super::StorageAdapter) handles the "what" (quota
/// degradation, write ordering).
///
/// All methods take `&self`; implementations use interior mutability since
/// the sync layer is single-threaded.
pub trait StorageBackend {
    /// Read the payload stored under `key`.
    /// Returns Ok(None) if nothing is stored there.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `payload` under `key`, replacing any previous value.
    /// MUST fail with `SyncError::QuotaExceeded` when the write does not fit,
    /// and must leave the previous value intact in that case.
    fn set(&self, key: &str, payload: &[u8]) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// All keys currently stored.
    fn keys(&self) -> Result<Vec<String>>;
}
