use super::RemoteApi;
use crate::diff::FieldDiff;
use crate::error::{Result, SyncError};
use crate::model::{JobRecord, ResumeDocument};
use crate::store::fs_backend::is_safe_file_stem;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A directory laid out like the server's collections:
///
/// ```text
/// root/
/// ├── resumes/{id}.json        # one ResumeDocument per file
/// ├── jobs/{email}.json        # array of JobRecord per user
/// └── sessions/{id}.jsonl      # appended change-log entries
/// ```
pub struct DirRemote {
    root: PathBuf,
}

fn remote_err(context: &str, e: impl std::fmt::Display) -> SyncError {
    SyncError::Remote(format!("{}: {}", context, e))
}

impl DirRemote {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `root/<collection>/<name>.<ext>`, refusing names that would leave
    /// the collection directory.
    fn file_in(&self, collection: &str, name: &str, ext: &str) -> Result<PathBuf> {
        if !is_safe_file_stem(name) {
            return Err(remote_err("invalid name", format!("{:?}", name)));
        }
        Ok(self.root.join(collection).join(format!("{}.{}", name, ext)))
    }

    fn resume_path(&self, id: &str) -> Result<PathBuf> {
        self.file_in("resumes", id, "json")
    }

    fn jobs_dir(&self) -> PathBuf {
        self.root.join("jobs")
    }

    fn jobs_path(&self, email: &str) -> Result<PathBuf> {
        self.file_in("jobs", email, "json")
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        if !path.exists() {
            return Err(SyncError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path).map_err(|e| remote_err("read", e))?;
        serde_json::from_str(&content).map_err(|e| remote_err("decode", e))
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| remote_err("mkdir", e))?;
        }
        let content = serde_json::to_string_pretty(value).map_err(SyncError::Serialization)?;
        fs::write(path, content).map_err(|e| remote_err("write", e))
    }

    /// Every per-user job file with its records.
    fn job_files(&self) -> Result<Vec<(PathBuf, Vec<JobRecord>)>> {
        let dir = self.jobs_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| remote_err("list jobs", e))? {
            let path = entry.map_err(|e| remote_err("list jobs", e))?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                let records: Vec<JobRecord> = self.read_json(&path)?;
                files.push((path, records));
            }
        }
        Ok(files)
    }

    /// Seed the records for one user. Used by tests and demos.
    pub fn put_jobs(&self, email: &str, jobs: &[JobRecord]) -> Result<()> {
        self.write_json(&self.jobs_path(email)?, jobs)
    }
}

impl RemoteApi for DirRemote {
    fn fetch_resume(&self, id: &str) -> Result<ResumeDocument> {
        self.read_json(&self.resume_path(id)?)
    }

    fn save_resume(&self, id: &str, doc: &ResumeDocument) -> Result<()> {
        self.write_json(&self.resume_path(id)?, doc)
    }

    fn fetch_jobs(&self, email: &str) -> Result<Vec<JobRecord>> {
        let path = self.jobs_path(email)?;
        if !path.exists() {
            return Ok(Vec::new());
        }
        self.read_json(&path)
    }

    fn fetch_job(&self, server_id: &str) -> Result<JobRecord> {
        self.job_files()?
            .into_iter()
            .flat_map(|(_, records)| records)
            .find(|r| r.server_id == server_id)
            .ok_or_else(|| SyncError::NotFound(format!("job {}", server_id)))
    }

    fn update_job_status(&self, job_id: &str, status: &str) -> Result<()> {
        for (path, mut records) in self.job_files()? {
            if let Some(record) = records.iter_mut().find(|r| r.job_id == job_id) {
                let now = Utc::now();
                record.current_status = status.to_string();
                record.last_status_change = Some(now);
                record.updated_at = now;
                return self.write_json(&path, &records);
            }
        }
        Err(SyncError::NotFound(format!("job {}", job_id)))
    }

    fn save_session_changes(&self, resume_id: &str, diff: &FieldDiff) -> Result<()> {
        let path = self.file_in("sessions", resume_id, "jsonl")?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| remote_err("mkdir", e))?;
        }
        let line = serde_json::to_string(diff).map_err(SyncError::Serialization)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| remote_err("open session log", e))?;
        writeln!(file, "{}", line).map_err(|e| remote_err("append session log", e))
    }
}
