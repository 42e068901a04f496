use super::backend::StorageBackend;
use crate::error::{Result, SyncError};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Default)]
struct MemState {
    entries: BTreeMap<String, Vec<u8>>,
    quota_bytes: Option<usize>,
    simulate_write_error: bool,
    write_count: usize,
}

impl MemState {
    /// Bytes in use if `key` were replaced by a payload of `len` bytes.
    /// Keys count toward the quota, as they do in browser storage.
    fn usage_with(&self, key: &str, len: usize) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum::<usize>()
            + key.len()
            + len
    }
}

/// In-memory storage backend, the session-scoped engine.
///
/// Clones share the same entries, like two handles on one browser origin; a
/// test simulates a page reload by building a fresh store over a clone.
///
/// Uses `RefCell` for interior mutability since the sync layer is
/// single-threaded.
#[derive(Clone, Default)]
pub struct MemBackend {
    state: Rc<RefCell<MemState>>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that rejects writes pushing total usage past `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        let backend = Self::new();
        backend.set_quota(Some(bytes));
        backend
    }

    pub fn set_quota(&self, bytes: Option<usize>) {
        self.state.borrow_mut().quota_bytes = bytes;
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.state.borrow_mut().simulate_write_error = simulate;
    }

    /// Number of successful `set` calls, for asserting on write coalescing.
    pub fn write_count(&self) -> usize {
        self.state.borrow().write_count
    }

    pub fn usage(&self) -> usize {
        self.state.borrow().usage_with("", 0)
    }

    /// Store a payload directly, bypassing quota checks. Used to seed corrupt data.
    pub fn insert_raw(&self, key: &str, payload: &[u8]) {
        self.state
            .borrow_mut()
            .entries
            .insert(key.to_string(), payload.to_vec());
    }
}

impl StorageBackend for MemBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.state.borrow().entries.get(key).cloned())
    }

    fn set(&self, key: &str, payload: &[u8]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.simulate_write_error {
            return Err(SyncError::Store("Simulated write error".to_string()));
        }

        if let Some(quota) = state.quota_bytes {
            let needed = state.usage_with(key, payload.len());
            if needed > quota {
                return Err(SyncError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    available: quota,
                });
            }
        }

        state.entries.insert(key.to_string(), payload.to_vec());
        state.write_count += 1;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.state.borrow_mut().entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.state.borrow().entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let backend = MemBackend::new();
        backend.set("k", b"v").unwrap();
        assert_eq!(backend.get("k").unwrap(), Some(b"v".to_vec()));

        backend.remove("k").unwrap();
        assert_eq!(backend.get("k").unwrap(), None);
        // removing twice is fine
        backend.remove("k").unwrap();
    }

    #[test]
    fn test_clones_share_entries() {
        let backend = MemBackend::new();
        let handle = backend.clone();
        backend.set("k", b"v").unwrap();
        assert_eq!(handle.get("k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(handle.keys().unwrap(), vec!["k".to_string()]);
    }

    #[test]
    fn test_quota_rejects_and_keeps_previous_value() {
        let backend = MemBackend::with_quota(10);
        backend.set("k", b"12345").unwrap();

        let err = backend.set("k", b"123456789").unwrap_err();
        assert!(err.is_quota());
        assert_eq!(backend.get("k").unwrap(), Some(b"12345".to_vec()));
    }

    #[test]
    fn test_quota_counts_replaced_entry_once() {
        // key (1) + payload (9) == quota
        let backend = MemBackend::with_quota(10);
        backend.set("k", b"123456789").unwrap();
        backend.set("k", b"987654321").unwrap();
        assert_eq!(backend.usage(), 10);
    }

    #[test]
    fn test_simulated_write_error_is_not_quota() {
        let backend = MemBackend::new();
        backend.set_simulate_write_error(true);
        let err = backend.set("k", b"v").unwrap_err();
        assert!(!err.is_quota());
        assert_eq!(backend.write_count(), 0);
    }
}
