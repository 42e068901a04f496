//! # API Facade
//!
//! [`SyncApi`] owns the document store, the session cache and the remote, and
//! is the single entry point for clients. It is built once by the caller and
//! passed around; nothing in this crate is a process-wide singleton.
//!
//! ## Role
//!
//! The facade sequences the stores and the remote:
//! - fetch, then bind (`select_resume_by_id`)
//! - refetch only when the cache says it is stale (`jobs`)
//! - show a status change at once, then reconcile with the server
//!   (`change_status`)
//!
//! It holds no state of its own and does no presentation.
//!
//! ## Failure Handling
//!
//! Remote calls are attempted once. Their errors are returned unchanged, and
//! the stores are left as they were before the call, except that a rejected
//! status change drops its optimistic overlay so the record shows its last
//! confirmed status again.
//!
//! ## Generic Over Storage and Remote
//!
//! - CLI: `SyncApi<FsBackend, FsBackend, DirRemote>`
//! - Tests: `SyncApi<MemBackend, MemBackend, MemRemote>`

use crate::diff::{diff_documents, FieldDiff};
use crate::document::DocumentStore;
use crate::error::{Result, SyncError};
use crate::model::{JobPatch, JobRecord, ResumeDocument};
use crate::remote::RemoteApi;
use crate::session::SessionCache;
use crate::store::StorageBackend;
use tracing::{debug, info, warn};

pub struct SyncApi<D: StorageBackend, S: StorageBackend, R: RemoteApi> {
    document: DocumentStore<D>,
    session: SessionCache<S>,
    remote: R,
}

impl<D: StorageBackend, S: StorageBackend, R: RemoteApi> SyncApi<D, S, R> {
    pub fn new(document: DocumentStore<D>, session: SessionCache<S>, remote: R) -> Self {
        Self {
            document,
            session,
            remote,
        }
    }

    pub fn document(&self) -> &DocumentStore<D> {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut DocumentStore<D> {
        &mut self.document
    }

    pub fn session(&self) -> &SessionCache<S> {
        &self.session
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Fetch a resume and bind it as the current selection.
    pub fn select_resume_by_id(&mut self, id: &str) -> Result<&ResumeDocument> {
        let doc = self.remote.fetch_resume(id)?;
        self.document.select_resume(doc, id);
        info!(id, "resume bound");
        Ok(self.document.active())
    }

    /// Bring back the last selected resume after a reload.
    pub fn restore_selection(&mut self) -> bool {
        self.document.load_selection()
    }

    pub fn start_over(&mut self) {
        self.document.reset();
    }

    /// Send the active document to the server under `id`.
    pub fn save_active(&mut self, id: &str) -> Result<()> {
        self.remote.save_resume(id, self.document.active())?;
        self.document.mark_saved();
        Ok(())
    }

    /// The user's job records, refetched first if the cache is stale.
    pub fn jobs(&mut self, email: &str) -> Result<&[JobRecord]> {
        if self.session.is_stale(email) {
            debug!(email, "job cache stale, refetching");
            let records = self.remote.fetch_jobs(email)?;
            self.session.set_all(records, email);
        }
        Ok(self.session.all())
    }

    pub fn jobs_by_status(&mut self, email: &str, status: &str) -> Result<Vec<&JobRecord>> {
        self.jobs(email)?;
        Ok(self.session.by_status(status))
    }

    /// Move a record to `to`, showing the change before the server answers.
    pub fn change_status(&mut self, job_id: &str, to: &str) -> Result<()> {
        let record = self
            .session
            .get(job_id)
            .ok_or_else(|| SyncError::NotFound(format!("job {}", job_id)))?;
        let from = self.session.effective_status(record).to_string();
        let server_id = record.server_id.clone();

        self.session.apply_optimistic_status(job_id, &from, to);

        if let Err(e) = self.remote.update_job_status(job_id, to) {
            warn!(job_id, error = %e, "status change rejected, reverting");
            self.session.confirm_or_supersede(job_id);
            return Err(e);
        }

        let refreshed = if server_id.is_empty() {
            false
        } else {
            match self.session.refresh_one(&self.remote, &server_id) {
                Ok(()) => true,
                Err(e) => {
                    warn!(job_id, error = %e, "could not refresh job after status change");
                    false
                }
            }
        };
        if !refreshed {
            self.session.upsert_local(job_id, JobPatch::status(to));
        }

        self.session.confirm_or_supersede(job_id);
        Ok(())
    }

    /// Log the fields that changed between two versions of a resume.
    pub fn record_session_changes(
        &self,
        resume_id: &str,
        before: &ResumeDocument,
        after: &ResumeDocument,
    ) -> Result<FieldDiff> {
        let diff = diff_documents(before, after)?;
        if diff.is_empty() {
            return Ok(diff);
        }
        self.remote.save_session_changes(resume_id, &diff)?;
        Ok(diff)
    }

    /// Write anything still queued; call before the process exits.
    pub fn flush(&self) {
        self.document.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::remote::memory::MemRemote;
    use crate::store::{MemBackend, QuotaPolicy, StorageAdapter};

    const EMAIL: &str = "jane@example.com";

    type TestApi = SyncApi<MemBackend, MemBackend, MemRemote>;

    fn api_over(durable: &MemBackend, session: &MemBackend, remote: MemRemote) -> TestApi {
        let config = SyncConfig::default();
        let document = DocumentStore::open(
            StorageAdapter::new(durable.clone(), QuotaPolicy::default()),
            &config,
        );
        let cache = SessionCache::open(
            StorageAdapter::new(session.clone(), QuotaPolicy::default()),
            &config,
        );
        SyncApi::new(document, cache, remote)
    }

    fn remote() -> MemRemote {
        MemRemote::new()
            .with_resume("r1", ResumeDocument::with_name("Jane Doe"))
            .with_jobs(vec![
                JobRecord::new("j1", "Rust Dev", "Acme", "saved").with_server_id("s1"),
                JobRecord::new("j2", "Go Dev", "Globex", "applied").with_server_id("s2"),
            ])
    }

    fn fetch_count(api: &TestApi) -> usize {
        api.remote()
            .calls()
            .iter()
            .filter(|c| c.as_str() == "fetch_jobs")
            .count()
    }

    #[test]
    fn test_select_by_id_persists_selection() {
        let durable = MemBackend::new();
        let mut api = api_over(&durable, &MemBackend::new(), remote());

        let doc = api.select_resume_by_id("r1").unwrap();
        assert_eq!(doc.personal_info.name, "Jane Doe");

        let mut reloaded = api_over(&durable, &MemBackend::new(), MemRemote::new());
        assert!(reloaded.restore_selection());
        assert_eq!(reloaded.document().active().personal_info.name, "Jane Doe");
    }

    #[test]
    fn test_select_failure_leaves_store_untouched() {
        let durable = MemBackend::new();
        let mut api = api_over(&durable, &MemBackend::new(), remote());
        api.select_resume_by_id("r1").unwrap();

        assert!(matches!(
            api.select_resume_by_id("missing"),
            Err(SyncError::NotFound(_))
        ));
        assert_eq!(api.document().last_selected().map(|(_, id)| id), Some("r1"));
    }

    #[test]
    fn test_jobs_refetch_only_when_stale() {
        let mut api = api_over(&MemBackend::new(), &MemBackend::new(), remote());

        assert_eq!(api.jobs(EMAIL).unwrap().len(), 2);
        assert_eq!(api.jobs(EMAIL).unwrap().len(), 2);
        assert_eq!(fetch_count(&api), 1);

        api.jobs("john@example.com").unwrap();
        assert_eq!(fetch_count(&api), 2);
    }

    #[test]
    fn test_change_status_confirms_after_server_accepts() {
        let mut api = api_over(&MemBackend::new(), &MemBackend::new(), remote());
        api.jobs(EMAIL).unwrap();

        api.change_status("j1", "applied").unwrap();

        assert!(api.session().pending("j1").is_none());
        assert_eq!(api.session().get("j1").unwrap().current_status, "applied");
        let applied = api.jobs_by_status(EMAIL, "applied").unwrap();
        assert_eq!(applied.len(), 2);
    }

    #[test]
    fn test_change_status_reverts_when_server_rejects() {
        let mut api = api_over(&MemBackend::new(), &MemBackend::new(), remote());
        api.jobs(EMAIL).unwrap();
        api.remote().set_fail(true);

        assert!(api.change_status("j1", "applied").is_err());

        assert!(api.session().pending("j1").is_none());
        assert_eq!(api.session().by_status("saved").len(), 1);
        assert_eq!(api.session().get("j1").unwrap().current_status, "saved");
    }

    #[test]
    fn test_change_status_unknown_job() {
        let mut api = api_over(&MemBackend::new(), &MemBackend::new(), remote());
        api.jobs(EMAIL).unwrap();
        assert!(matches!(
            api.change_status("nope", "applied"),
            Err(SyncError::NotFound(_))
        ));
    }

    #[test]
    fn test_save_active_marks_saved() {
        let mut api = api_over(&MemBackend::new(), &MemBackend::new(), remote());
        api.select_resume_by_id("r1").unwrap();
        api.document_mut().update(|doc| doc.summary = "Edited".into());
        assert!(!api.document().state().is_saved);

        api.save_active("r1").unwrap();

        assert!(api.document().state().is_saved);
        assert_eq!(api.remote().fetch_resume("r1").unwrap().summary, "Edited");
    }

    #[test]
    fn test_record_session_changes_skips_empty_diff() {
        let api = api_over(&MemBackend::new(), &MemBackend::new(), remote());
        let before = ResumeDocument::with_name("Jane Doe");
        let mut after = before.clone();

        assert!(api.record_session_changes("r1", &before, &after).unwrap().is_empty());
        assert!(api.remote().session_changes().is_empty());

        after.summary = "New summary".into();
        let diff = api.record_session_changes("r1", &before, &after).unwrap();
        assert_eq!(diff.changed_fields(), vec!["summary"]);
        assert_eq!(api.remote().session_changes().len(), 1);
    }
}
