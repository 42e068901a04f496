use super::backend::StorageBackend;
use crate::config::{SyncConfig, DEFAULT_BULK_CAP};
use crate::error::{Result, SyncError};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use tracing::{debug, error, warn};

/// Which collection gets truncated first when a write does not fit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaPolicy {
    pub bulk_field: String,
    pub cap: usize,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            bulk_field: "jobs".to_string(),
            cap: DEFAULT_BULK_CAP,
        }
    }
}

impl From<&SyncConfig> for QuotaPolicy {
    fn from(config: &SyncConfig) -> Self {
        Self {
            bulk_field: config.bulk_field.clone(),
            cap: config.bulk_cap,
        }
    }
}

/// What actually reached storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// The bulk collection was cut down to `kept` elements.
    Truncated { kept: usize },
    /// Only top-level scalars were kept.
    Skeleton,
    /// Nothing fit; the previous value (if any) is still stored.
    Dropped,
}

impl WriteOutcome {
    pub fn is_degraded(&self) -> bool {
        !matches!(self, WriteOutcome::Written)
    }
}

struct QueuedWrite {
    payload: Vec<u8>,
    due: DateTime<Utc>,
}

pub struct StorageAdapter<B: StorageBackend> {
    backend: B,
    policy: QuotaPolicy,
    queue: RefCell<BTreeMap<String, QueuedWrite>>,
}

impl<B: StorageBackend> StorageAdapter<B> {
    pub fn new(backend: B, policy: QuotaPolicy) -> Self {
        Self {
            backend,
            policy,
            queue: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn from_config(backend: B, config: &SyncConfig) -> Self {
        Self::new(backend, QuotaPolicy::from(config))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }

    /// Read `key`, preferring a queued payload over what is on the backend so a
    /// reader never sees an older value than the last write request.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(queued) = self.queue.borrow().get(key) {
            return Ok(Some(queued.payload.clone()));
        }
        self.backend.get(key)
    }

    /// Write immediately. Any queued write for the same key is superseded.
    pub fn set(&self, key: &str, payload: &[u8]) -> Result<WriteOutcome> {
        if self.queue.borrow_mut().remove(key).is_some() {
            debug!(key, "immediate write supersedes queued write");
        }
        self.write_through(key, payload)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.queue.borrow_mut().remove(key);
        self.backend.remove(key)
    }

    /// Queue a write for `due`. A later schedule for the same key replaces this one.
    pub fn schedule(&self, key: &str, payload: Vec<u8>, due: DateTime<Utc>) {
        debug!(key, %due, "write scheduled");
        self.queue
            .borrow_mut()
            .insert(key.to_string(), QueuedWrite { payload, due });
    }

    pub fn has_pending(&self, key: &str) -> bool {
        self.queue.borrow().contains_key(key)
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.queue.borrow().values().map(|w| w.due).min()
    }

    /// Perform every queued write due at or before `now`.
    ///
    /// All due writes are attempted. Returns how many reached storage, or the
    /// first non-quota error; a failed write is not requeued.
    pub fn flush_due(&self, now: DateTime<Utc>) -> Result<usize> {
        let due: Vec<(String, QueuedWrite)> = {
            let mut queue = self.queue.borrow_mut();
            let keys: Vec<String> = queue
                .iter()
                .filter(|(_, w)| w.due <= now)
                .map(|(k, _)| k.clone())
                .collect();
            keys.into_iter()
                .filter_map(|k| queue.remove(&k).map(|w| (k, w)))
                .collect()
        };

        let mut written = 0;
        let mut first_err: Option<SyncError> = None;
        for (key, write) in due {
            match self.write_through(&key, &write.payload) {
                Ok(WriteOutcome::Dropped) => {}
                Ok(_) => written += 1,
                Err(e) => {
                    warn!(key = %key, error = %e, "queued write failed");
                    first_err.get_or_insert(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }

    /// Perform every queued write regardless of due time.
    pub fn flush_all(&self) -> Result<usize> {
        self.flush_due(DateTime::<Utc>::MAX_UTC)
    }

    /// Keys on the backend plus keys only present in the queue.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut keys = self.backend.keys()?;
        for key in self.queue.borrow().keys() {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn write_through(&self, key: &str, payload: &[u8]) -> Result<WriteOutcome> {
        match self.backend.set(key, payload) {
            Ok(()) => Ok(WriteOutcome::Written),
            Err(e) if e.is_quota() => Ok(self.degrade(key, payload, &e)),
            Err(e) => Err(e),
        }
    }

    fn degrade(&self, key: &str, payload: &[u8], cause: &SyncError) -> WriteOutcome {
        warn!(key, error = %cause, "storage quota exceeded, degrading payload");

        let object = match serde_json::from_slice::<Value>(payload) {
            Ok(Value::Object(map)) => map,
            _ => {
                error!(key, "payload is not a JSON object, write dropped");
                return WriteOutcome::Dropped;
            }
        };

        if let Some(truncated) = truncate_bulk(&object, &self.policy) {
            match self.try_write_value(key, &Value::Object(truncated)) {
                Ok(()) => {
                    warn!(key, kept = self.policy.cap, "stored truncated payload");
                    return WriteOutcome::Truncated {
                        kept: self.policy.cap,
                    };
                }
                Err(e) => warn!(key, error = %e, "truncated payload still does not fit"),
            }
        }

        match self.try_write_value(key, &Value::Object(skeleton(&object))) {
            Ok(()) => {
                warn!(key, "stored skeleton payload");
                WriteOutcome::Skeleton
            }
            Err(e) => {
                error!(key, error = %e, "skeleton payload does not fit, write dropped");
                WriteOutcome::Dropped
            }
        }
    }

    fn try_write_value(&self, key: &str, value: &Value) -> Result<()> {
        let bytes = serde_json::to_vec(value).map_err(SyncError::Serialization)?;
        self.backend.set(key, &bytes)
    }
}

/// The object with its bulk collection cut to the cap, or `None` when there is
/// nothing to cut.
fn truncate_bulk(object: &Map<String, Value>, policy: &QuotaPolicy) -> Option<Map<String, Value>> {
    match object.get(&policy.bulk_field) {
        Some(Value::Array(items)) if items.len() > policy.cap => {
            let mut reduced = object.clone();
            reduced.insert(
                policy.bulk_field.clone(),
                Value::Array(items[..policy.cap].to_vec()),
            );
            Some(reduced)
        }
        _ => None,
    }
}

fn skeleton(object: &Map<String, Value>) -> Map<String, Value> {
    object
        .iter()
        .filter_map(|(k, v)| match v {
            Value::Array(_) => Some((k.clone(), Value::Array(Vec::new()))),
            Value::Object(_) => None,
            scalar => Some((k.clone(), scalar.clone())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mem_backend::MemBackend;
    use chrono::Duration;
    use serde_json::json;

    fn jobs_payload(count: usize) -> Vec<u8> {
        let jobs: Vec<Value> = (0..count)
            .map(|i| json!({"jobID": format!("j{}", i), "title": "Backend Engineer", "currentStatus": "saved"}))
            .collect();
        serde_json::to_vec(&json!({
            "jobs": jobs,
            "lastFetched": 1_700_000_000_000_i64,
            "userEmail": "jane@example.com",
        }))
        .unwrap()
    }

    fn stored_json(backend: &MemBackend, key: &str) -> Value {
        serde_json::from_slice(&backend.get(key).unwrap().unwrap()).unwrap()
    }

    #[test]
    fn test_write_that_fits_is_untouched() {
        let backend = MemBackend::new();
        let adapter = StorageAdapter::new(backend.clone(), QuotaPolicy::default());

        let outcome = adapter.set("job-cache", &jobs_payload(3)).unwrap();

        assert_eq!(outcome, WriteOutcome::Written);
        assert_eq!(stored_json(&backend, "job-cache")["jobs"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_quota_truncates_bulk_collection_to_cap() {
        let fits_100 = "job-cache".len() + jobs_payload(100).len();
        let backend = MemBackend::with_quota(fits_100 + 64);
        let adapter = StorageAdapter::new(backend.clone(), QuotaPolicy::default());

        let outcome = adapter.set("job-cache", &jobs_payload(500)).unwrap();

        assert_eq!(outcome, WriteOutcome::Truncated { kept: 100 });
        let stored = stored_json(&backend, "job-cache");
        let jobs = stored["jobs"].as_array().unwrap();
        assert_eq!(jobs.len(), 100);
        assert_eq!(jobs[0]["jobID"], "j0");
        assert_eq!(stored["userEmail"], "jane@example.com");
        assert_eq!(stored["lastFetched"], 1_700_000_000_000_i64);
    }

    #[test]
    fn test_quota_falls_back_to_skeleton_when_truncation_does_not_fit() {
        let backend = MemBackend::with_quota(200);
        let adapter = StorageAdapter::new(backend.clone(), QuotaPolicy::default());

        let outcome = adapter.set("job-cache", &jobs_payload(500)).unwrap();

        assert_eq!(outcome, WriteOutcome::Skeleton);
        let stored = stored_json(&backend, "job-cache");
        assert_eq!(stored["jobs"], json!([]));
        assert_eq!(stored["userEmail"], "jane@example.com");
    }

    #[test]
    fn test_skeleton_for_payload_without_bulk_collection() {
        let backend = MemBackend::with_quota(120);
        let adapter = StorageAdapter::new(backend.clone(), QuotaPolicy::default());
        let big = "x".repeat(500);
        let payload = serde_json::to_vec(&json!({
            "resumeData": {"summary": big},
            "changedFields": ["summary"],
            "isSaved": true,
            "lastSelectedResumeId": "r1",
        }))
        .unwrap();

        let outcome = adapter.set("resume-store", &payload).unwrap();

        assert_eq!(outcome, WriteOutcome::Skeleton);
        let stored = stored_json(&backend, "resume-store");
        assert!(stored.get("resumeData").is_none());
        assert_eq!(stored["changedFields"], json!([]));
        assert_eq!(stored["isSaved"], true);
        assert_eq!(stored["lastSelectedResumeId"], "r1");
    }

    #[test]
    fn test_dropped_when_nothing_fits() {
        let backend = MemBackend::with_quota(4);
        backend.insert_raw("job-cache", b"{}");
        let adapter = StorageAdapter::new(backend.clone(), QuotaPolicy::default());

        let outcome = adapter.set("job-cache", &jobs_payload(10)).unwrap();

        assert_eq!(outcome, WriteOutcome::Dropped);
        assert_eq!(backend.get("job-cache").unwrap(), Some(b"{}".to_vec()));
    }

    #[test]
    fn test_non_quota_errors_are_returned() {
        let backend = MemBackend::new();
        backend.set_simulate_write_error(true);
        let adapter = StorageAdapter::new(backend, QuotaPolicy::default());

        assert!(adapter.set("k", b"{}").is_err());
    }

    #[test]
    fn test_scheduled_writes_coalesce() {
        let backend = MemBackend::new();
        let adapter = StorageAdapter::new(backend.clone(), QuotaPolicy::default());
        let now = Utc::now();

        adapter.schedule("doc", b"1".to_vec(), now + Duration::milliseconds(100));
        adapter.schedule("doc", b"2".to_vec(), now + Duration::milliseconds(200));
        assert_eq!(adapter.flush_due(now).unwrap(), 0);
        assert_eq!(adapter.get("doc").unwrap(), Some(b"2".to_vec()));

        assert_eq!(adapter.flush_due(now + Duration::seconds(1)).unwrap(), 1);
        assert_eq!(backend.write_count(), 1);
        assert_eq!(backend.get("doc").unwrap(), Some(b"2".to_vec()));
        assert!(!adapter.has_pending("doc"));
    }

    #[test]
    fn test_immediate_write_cancels_queued_write() {
        let backend = MemBackend::new();
        let adapter = StorageAdapter::new(backend.clone(), QuotaPolicy::default());
        let now = Utc::now();

        adapter.schedule("doc", b"stale".to_vec(), now + Duration::milliseconds(250));
        adapter.set("doc", b"fresh").unwrap();
        adapter.flush_all().unwrap();

        assert_eq!(backend.get("doc").unwrap(), Some(b"fresh".to_vec()));
        assert_eq!(backend.write_count(), 1);
    }

    #[test]
    fn test_remove_cancels_queued_write() {
        let backend = MemBackend::new();
        let adapter = StorageAdapter::new(backend.clone(), QuotaPolicy::default());
        adapter.schedule("doc", b"x".to_vec(), Utc::now());
        adapter.remove("doc").unwrap();
        adapter.flush_all().unwrap();
        assert_eq!(backend.get("doc").unwrap(), None);
    }

    #[test]
    fn test_flush_reports_failure_but_attempts_all() {
        let backend = MemBackend::new();
        let adapter = StorageAdapter::new(backend.clone(), QuotaPolicy::default());
        adapter.schedule("a", b"1".to_vec(), Utc::now());
        adapter.schedule("b", b"2".to_vec(), Utc::now());

        backend.set_simulate_write_error(true);
        assert!(adapter.flush_all().is_err());
        assert!(!adapter.has_pending("a"));
        assert!(!adapter.has_pending("b"));
        assert!(adapter.next_due().is_none());
    }
}
