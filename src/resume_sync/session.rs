//! # Session Record Cache
//!
//! A per-session list of [`JobRecord`]s fetched in bulk from the server, with
//! locally applied status changes layered on top.
//!
//! ## Staleness
//!
//! The cache is stale when it was never filled, when it was filled for a
//! different user, or when the last fetch is older than the freshness window.
//! Callers refetch whenever [`SessionCache::is_stale`] says so; stale
//! contents are only good as "last known state" while that fetch runs.
//!
//! ## Optimistic Overlay
//!
//! A status change is shown before the server confirms it. The change is kept
//! as a [`PendingUpdate`] next to the record rather than written into it:
//!
//! 1. `apply_optimistic_status` records `{original, new}`. Repeating it for
//!    the same record only moves `new`; `original` stays the first baseline.
//! 2. `by_status` consults the overlay first, and matches by prefix.
//! 3. `set_all` replaces the records but keeps the overlay, so a bulk refresh
//!    cannot make an unconfirmed change disappear. Entries for records that
//!    are no longer returned are dropped with them.
//! 4. `refresh_one` merges the server copy of one record and leaves the
//!    overlay alone. Only `confirm_or_supersede` removes an entry.
//!
//! The overlay is persisted with the records, so it survives a reload within
//! the session.

use crate::config::SyncConfig;
use crate::error::Result;
use crate::model::{status_matches, CacheMeta, JobPatch, JobRecord, PendingUpdate};
use crate::remote::RemoteApi;
use crate::store::{StorageAdapter, StorageBackend, WriteOutcome};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// The persisted layout: `{ jobs, lastFetched, userEmail, pendingUpdates }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CacheState {
    jobs: Vec<JobRecord>,
    #[serde(flatten)]
    meta: CacheMeta,
    pending_updates: BTreeMap<String, PendingUpdate>,
}

pub struct SessionCache<B: StorageBackend> {
    adapter: StorageAdapter<B>,
    key: String,
    freshness: Duration,
    state: CacheState,
}

impl<B: StorageBackend> SessionCache<B> {
    pub fn open(adapter: StorageAdapter<B>, config: &SyncConfig) -> Self {
        let key = config.session_key.clone();
        let state = load_state(&adapter, &key);
        Self {
            adapter,
            key,
            freshness: config.freshness_window(),
            state,
        }
    }

    pub fn all(&self) -> &[JobRecord] {
        &self.state.jobs
    }

    /// The cached record, without the overlay applied.
    pub fn get(&self, job_id: &str) -> Option<&JobRecord> {
        self.state.jobs.iter().find(|r| r.job_id == job_id)
    }

    pub fn meta(&self) -> &CacheMeta {
        &self.state.meta
    }

    pub fn pending(&self, job_id: &str) -> Option<&PendingUpdate> {
        self.state.pending_updates.get(job_id)
    }

    pub fn pending_count(&self) -> usize {
        self.state.pending_updates.len()
    }

    pub fn adapter(&self) -> &StorageAdapter<B> {
        &self.adapter
    }

    /// The status to display: the overlay's target if there is one.
    pub fn effective_status<'a>(&'a self, record: &'a JobRecord) -> &'a str {
        self.state
            .pending_updates
            .get(&record.job_id)
            .map(|p| p.new_status.as_str())
            .unwrap_or(record.current_status.as_str())
    }

    pub fn set_all(&mut self, records: Vec<JobRecord>, email: &str) {
        self.set_all_at(records, email, Utc::now());
    }

    /// Replace every record after a full fetch.
    ///
    /// Overlay entries are kept for records still present; entries for
    /// records the server no longer returns are dropped.
    pub fn set_all_at(&mut self, records: Vec<JobRecord>, email: &str, fetched_at: DateTime<Utc>) {
        debug!(count = records.len(), email, "job cache replaced");
        self.state.pending_updates.retain(|job_id, _| {
            let present = records.iter().any(|r| &r.job_id == job_id);
            if !present {
                warn!(job_id = %job_id, "dropping pending status for job no longer on the server");
            }
            present
        });
        self.state.jobs = records;
        self.state.meta = CacheMeta {
            last_fetched: Some(fetched_at),
            user_email: Some(email.to_string()),
        };
        self.persist();
    }

    /// Patch one record in place, stamping a new `updated_at`.
    /// Returns false if the record is not cached.
    pub fn upsert_local(&mut self, job_id: &str, patch: JobPatch) -> bool {
        let Some(record) = self.state.jobs.iter_mut().find(|r| r.job_id == job_id) else {
            debug!(job_id, "upsert for uncached job ignored");
            return false;
        };
        patch.merge_into(record);
        record.updated_at = Utc::now();
        self.persist();
        true
    }

    /// Show `to` for the record until the change is confirmed or superseded.
    /// Returns false if the record is not cached.
    pub fn apply_optimistic_status(&mut self, job_id: &str, from: &str, to: &str) -> bool {
        if self.get(job_id).is_none() {
            debug!(job_id, "optimistic status for uncached job ignored");
            return false;
        }

        let now = Utc::now();
        self.state
            .pending_updates
            .entry(job_id.to_string())
            .and_modify(|p| {
                p.new_status = to.to_string();
                p.applied_at = now;
            })
            .or_insert_with(|| PendingUpdate {
                original_status: from.to_string(),
                new_status: to.to_string(),
                applied_at: now,
            });
        self.persist();
        true
    }

    /// Drop the overlay entry for a record, returning it if there was one.
    pub fn confirm_or_supersede(&mut self, job_id: &str) -> Option<PendingUpdate> {
        let removed = self.state.pending_updates.remove(job_id);
        if removed.is_some() {
            self.persist();
        }
        removed
    }

    /// Merge the server's copy of one record into the cache.
    ///
    /// On a remote failure the cache is left as it was. The overlay is never
    /// touched here; a record the cache does not hold is ignored.
    pub fn refresh_one<R: RemoteApi + ?Sized>(&mut self, remote: &R, server_id: &str) -> Result<()> {
        let fetched = remote.fetch_job(server_id)?;

        let Some(record) = self
            .state
            .jobs
            .iter_mut()
            .find(|r| r.server_id == server_id || r.job_id == fetched.job_id)
        else {
            debug!(server_id, "refreshed job is not cached");
            return Ok(());
        };

        JobPatch::from(fetched).merge_into(record);
        self.persist();
        Ok(())
    }

    /// Records whose displayed status starts with `status`.
    pub fn by_status(&self, status: &str) -> Vec<&JobRecord> {
        self.state
            .jobs
            .iter()
            .filter(|r| status_matches(self.effective_status(r), status))
            .collect()
    }

    /// Explicit delete. Any overlay entry goes with it.
    pub fn remove(&mut self, job_id: &str) -> Option<JobRecord> {
        let index = self.state.jobs.iter().position(|r| r.job_id == job_id)?;
        let record = self.state.jobs.remove(index);
        self.state.pending_updates.remove(job_id);
        self.persist();
        Some(record)
    }

    /// Force the next `is_stale` check to report stale.
    pub fn invalidate(&mut self) {
        self.state.meta.last_fetched = None;
        self.persist();
    }

    pub fn is_stale(&self, email: &str) -> bool {
        self.is_stale_at(email, Utc::now())
    }

    pub fn is_stale_at(&self, email: &str, now: DateTime<Utc>) -> bool {
        let meta = &self.state.meta;
        let Some(last_fetched) = meta.last_fetched else {
            return true;
        };
        if meta.user_email.as_deref() != Some(email) {
            return true;
        }
        now - last_fetched > self.freshness
    }

    fn persist(&self) {
        let bytes = match serde_json::to_vec(&self.state) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %self.key, error = %e, "could not serialize job cache");
                return;
            }
        };
        match self.adapter.set(&self.key, &bytes) {
            Ok(WriteOutcome::Written) => {}
            Ok(outcome) => warn!(key = %self.key, ?outcome, "job cache stored degraded"),
            Err(e) => warn!(key = %self.key, error = %e, "job cache not persisted"),
        }
    }
}

fn load_state<B: StorageBackend>(adapter: &StorageAdapter<B>, key: &str) -> CacheState {
    let bytes = match adapter.get(key) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return CacheState::default(),
        Err(e) => {
            warn!(key, error = %e, "could not read job cache, starting empty");
            return CacheState::default();
        }
    };

    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        warn!(key, error = %e, "corrupt job cache, starting empty");
        CacheState::default()
    })
}
