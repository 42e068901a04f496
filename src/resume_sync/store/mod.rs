//! # Storage Layer
//!
//! Both stores persist through the same narrow seam: a key-value byte store.
//!
//! ## Two Levels
//!
//! 1. **Backend** ([`backend::StorageBackend`]): raw `get` / `set` / `remove`.
//!    Returns every failure, including [`SyncError::QuotaExceeded`], and never
//!    retries. Implementations:
//!    - [`fs_backend::FsBackend`]: durable, one JSON file per key, atomic writes.
//!    - [`mem_backend::MemBackend`]: session-scoped, gone when dropped. Also the
//!      test double, with a simulated quota and write failures.
//! 2. **Adapter** ([`adapter::StorageAdapter`]): what the stores talk to. It
//!    adds quota degradation and the write queue.
//!
//! ## Quota Degradation
//!
//! A write that does not fit is never surfaced to the caller:
//!
//! 1. The payload is written as given.
//! 2. On a quota error, if the payload is a JSON object whose bulk collection
//!    (`jobs` by default) is longer than the cap, the collection is cut to the
//!    cap and the write retried.
//! 3. Otherwise, or if that also fails, a skeleton is written: top-level
//!    scalars kept, arrays emptied, nested objects dropped.
//! 4. If even the skeleton does not fit the write is dropped and logged. The
//!    in-memory state stays correct; durability returns with the next write
//!    that fits.
//!
//! ## Write Queue
//!
//! The document store debounces its writes, but some transitions (selecting a
//! resume) must hit storage right away. Both paths go through one queue per
//! adapter: a scheduled write for a key is replaced by any later schedule, and
//! an immediate write cancels whatever was queued for the key. There is a
//! single writer per key, so a stale debounced payload can never land after a
//! newer immediate one.
//!
//! [`SyncError::QuotaExceeded`]: crate::error::SyncError::QuotaExceeded

pub mod adapter;
pub mod backend;
pub mod fs_backend;
pub mod mem_backend;

pub use adapter::{QuotaPolicy, StorageAdapter, WriteOutcome};
pub use backend::StorageBackend;
pub use fs_backend::FsBackend;
pub use mem_backend::MemBackend;

/// Report from the `doctor` operation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DoctorReport {
    pub checked: usize,
    pub removed_corrupt: usize,
    pub flushed_pending: usize,
}

/// Check every stored entry and drop the ones that are not valid JSON.
///
/// Corrupt entries would otherwise be discarded silently on the next load;
/// removing them up front makes the loss visible in the report.
pub fn doctor<B: StorageBackend>(adapter: &StorageAdapter<B>) -> crate::error::Result<DoctorReport> {
    let mut report = DoctorReport {
        flushed_pending: adapter.flush_all()?,
        ..Default::default()
    };

    for key in adapter.keys()? {
        report.checked += 1;
        let Some(bytes) = adapter.get(&key)? else {
            continue;
        };
        if serde_json::from_slice::<serde_json::Value>(&bytes).is_err() {
            tracing::warn!(key = %key, "removing corrupt storage entry");
            adapter.remove(&key)?;
            report.removed_corrupt += 1;
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doctor_removes_corrupt_entries() {
        let backend = MemBackend::new();
        backend.set("good", br#"{"jobs": []}"#).unwrap();
        backend.set("bad", b"{not json").unwrap();

        let adapter = StorageAdapter::new(backend.clone(), QuotaPolicy::default());
        let report = doctor(&adapter).unwrap();

        assert_eq!(report.checked, 2);
        assert_eq!(report.removed_corrupt, 1);
        assert!(backend.get("bad").unwrap().is_none());
        assert!(backend.get("good").unwrap().is_some());
    }

    #[test]
    fn test_doctor_flushes_queued_writes_first() {
        let backend = MemBackend::new();
        let adapter = StorageAdapter::new(backend.clone(), QuotaPolicy::default());
        adapter.schedule("doc", br#"{"a": 1}"#.to_vec(), chrono::Utc::now() + chrono::Duration::hours(1));

        let report = doctor(&adapter).unwrap();

        assert_eq!(report.flushed_pending, 1);
        assert_eq!(report.removed_corrupt, 0);
        assert!(backend.get("doc").unwrap().is_some());
    }

    #[test]
    fn test_doctor_on_empty_store() {
        let adapter = StorageAdapter::new(MemBackend::new(), QuotaPolicy::default());
        assert_eq!(doctor(&adapter).unwrap(), DoctorReport::default());
    }
}
