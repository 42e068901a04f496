use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A job application as cached on the client.
///
/// The server copy is authoritative; this one is advisory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    /// Client-facing identifier, the key of the session cache.
    #[serde(rename = "jobID")]
    pub job_id: String,
    /// Server-side document id.
    #[serde(rename = "serverId", alias = "_id", default)]
    pub server_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    /// Fetched lazily; `None` until the detail view asks for it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub current_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_status_change: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub fn new(job_id: &str, title: &str, company: &str, status: &str) -> Self {
        let now = Utc::now();
        Self {
            job_id: job_id.to_string(),
            server_id: String::new(),
            title: title.to_string(),
            company: company.to_string(),
            description: None,
            current_status: status.to_string(),
            url: None,
            notes: None,
            created_at: now,
            updated_at: now,
            last_status_change: None,
        }
    }

    pub fn with_server_id(mut self, server_id: &str) -> Self {
        self.server_id = server_id.to_string();
        self
    }
}

/// Prefix match, so a query for `Applied` also picks up `Applied - Follow-up`.
pub fn status_matches(status: &str, query: &str) -> bool {
    status.starts_with(query)
}

/// A partial update. `None` fields leave the target untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobPatch {
    pub server_id: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub description: Option<String>,
    pub current_status: Option<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_status_change: Option<DateTime<Utc>>,
}

impl JobPatch {
    pub fn status(status: &str) -> Self {
        Self {
            current_status: Some(status.to_string()),
            ..Default::default()
        }
    }

    pub fn notes(notes: &str) -> Self {
        Self {
            notes: Some(notes.to_string()),
            ..Default::default()
        }
    }

    pub fn merge_into(self, record: &mut JobRecord) {
        if let Some(v) = self.server_id {
            record.server_id = v;
        }
        if let Some(v) = self.title {
            record.title = v;
        }
        if let Some(v) = self.company {
            record.company = v;
        }
        if let Some(v) = self.description {
            record.description = Some(v);
        }
        if let Some(v) = self.current_status {
            record.current_status = v;
        }
        if let Some(v) = self.url {
            record.url = Some(v);
        }
        if let Some(v) = self.notes {
            record.notes = Some(v);
        }
        if let Some(v) = self.created_at {
            record.created_at = v;
        }
        if let Some(v) = self.updated_at {
            record.updated_at = v;
        }
        if let Some(v) = self.last_status_change {
            record.last_status_change = Some(v);
        }
    }
}

/// Every field the server returned, ready to merge over a cached copy.
/// Absent optional fields (such as an unfetched description) keep the cached value.
impl From<JobRecord> for JobPatch {
    fn from(record: JobRecord) -> Self {
        Self {
            server_id: Some(record.server_id).filter(|s| !s.is_empty()),
            title: Some(record.title),
            company: Some(record.company),
            description: record.description,
            current_status: Some(record.current_status),
            url: record.url,
            notes: record.notes,
            created_at: Some(record.created_at),
            updated_at: Some(record.updated_at),
            last_status_change: record.last_status_change,
        }
    }
}

/// A locally applied status change the server has not confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingUpdate {
    pub original_status: String,
    pub new_status: String,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheMeta {
    /// Stored as epoch milliseconds.
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub last_fetched: Option<DateTime<Utc>>,
    pub user_email: Option<String>,
}
