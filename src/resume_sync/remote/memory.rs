use super::RemoteApi;
use crate::diff::FieldDiff;
use crate::error::{Result, SyncError};
use crate::model::{JobRecord, ResumeDocument};
use chrono::Utc;
use std::cell::RefCell;
use std::collections::HashMap;

/// In-memory remote for tests. Every call is logged; `set_fail` makes every
/// call fail like a dropped connection.
#[derive(Default)]
pub struct MemRemote {
    resumes: RefCell<HashMap<String, ResumeDocument>>,
    jobs: RefCell<Vec<JobRecord>>,
    session_changes: RefCell<Vec<(String, FieldDiff)>>,
    calls: RefCell<Vec<String>>,
    fail: RefCell<bool>,
}

impl MemRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resume(self, id: &str, doc: ResumeDocument) -> Self {
        self.resumes.borrow_mut().insert(id.to_string(), doc);
        self
    }

    pub fn with_jobs(self, jobs: Vec<JobRecord>) -> Self {
        *self.jobs.borrow_mut() = jobs;
        self
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.borrow_mut() = fail;
    }

    /// Change a record server-side, as another client would.
    pub fn edit_job<F: FnOnce(&mut JobRecord)>(&self, job_id: &str, edit: F) {
        if let Some(record) = self.jobs.borrow_mut().iter_mut().find(|r| r.job_id == job_id) {
            edit(record);
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn session_changes(&self) -> Vec<(String, FieldDiff)> {
        self.session_changes.borrow().clone()
    }

    fn call(&self, name: &str) -> Result<()> {
        self.calls.borrow_mut().push(name.to_string());
        if *self.fail.borrow() {
            return Err(SyncError::Remote(format!("{} failed: connection reset", name)));
        }
        Ok(())
    }
}

impl RemoteApi for MemRemote {
    fn fetch_resume(&self, id: &str) -> Result<ResumeDocument> {
        self.call("fetch_resume")?;
        self.resumes
            .borrow()
            .get(id)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("resume {}", id)))
    }

    fn save_resume(&self, id: &str, doc: &ResumeDocument) -> Result<()> {
        self.call("save_resume")?;
        self.resumes
            .borrow_mut()
            .insert(id.to_string(), doc.clone());
        Ok(())
    }

    fn fetch_jobs(&self, _email: &str) -> Result<Vec<JobRecord>> {
        self.call("fetch_jobs")?;
        Ok(self.jobs.borrow().clone())
    }

    fn fetch_job(&self, server_id: &str) -> Result<JobRecord> {
        self.call("fetch_job")?;
        self.jobs
            .borrow()
            .iter()
            .find(|r| r.server_id == server_id)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("job {}", server_id)))
    }

    fn update_job_status(&self, job_id: &str, status: &str) -> Result<()> {
        self.call("update_job_status")?;
        let mut jobs = self.jobs.borrow_mut();
        let record = jobs
            .iter_mut()
            .find(|r| r.job_id == job_id)
            .ok_or_else(|| SyncError::NotFound(format!("job {}", job_id)))?;
        let now = Utc::now();
        record.current_status = status.to_string();
        record.last_status_change = Some(now);
        record.updated_at = now;
        Ok(())
    }

    fn save_session_changes(&self, resume_id: &str, diff: &FieldDiff) -> Result<()> {
        self.call("save_session_changes")?;
        self.session_changes
            .borrow_mut()
            .push((resume_id.to_string(), diff.clone()));
        Ok(())
    }
}
