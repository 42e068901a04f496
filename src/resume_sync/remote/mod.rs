//! # Remote API
//!
//! The sync layer treats the server as an opaque request/response collaborator:
//! single attempt, no retry, failures returned to the caller. [`RemoteApi`] is
//! the seam; the stores never call it directly except `SessionCache::refresh_one`,
//! and everything else is wired through [`crate::api::SyncApi`].
//!
//! ## Implementations
//!
//! - [`dir::DirRemote`]: a directory of JSON files standing in for the server.
//!   Used by the CLI and by integration tests.
//! - [`memory::MemRemote`]: in-memory double with failure injection, for tests.

use crate::diff::FieldDiff;
use crate::error::Result;
use crate::model::{JobRecord, ResumeDocument};

pub mod dir;
#[cfg(any(test, feature = "test_utils"))]
pub mod memory;

pub use dir::DirRemote;

pub trait RemoteApi {
    fn fetch_resume(&self, id: &str) -> Result<ResumeDocument>;

    fn save_resume(&self, id: &str, doc: &ResumeDocument) -> Result<()>;

    /// Every job record belonging to `email`.
    fn fetch_jobs(&self, email: &str) -> Result<Vec<JobRecord>>;

    /// The authoritative copy of one record, by server id.
    fn fetch_job(&self, server_id: &str) -> Result<JobRecord>;

    fn update_job_status(&self, job_id: &str, status: &str) -> Result<()>;

    /// Append a before/after field diff to the resume's change log.
    fn save_session_changes(&self, resume_id: &str, diff: &FieldDiff) -> Result<()>;
}
