//! # Configuration
//!
//! Settings live in `config.json` inside the data directory. Every field has a
//! default, so a missing file or a partial file both load cleanly.
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `freshness_secs` | `300` | Max age of the job cache before it must be refetched |
//! | `debounce_ms` | `250` | Delay before an edited document is flushed to storage |
//! | `bulk_field` | `jobs` | Collection truncated first when storage is full |
//! | `bulk_cap` | `100` | Elements kept when the bulk collection is truncated |
//! | `document_key` | `resume-store` | Storage key of the document store |
//! | `session_key` | `job-cache` | Storage key of the job cache |
//! | `quota_bytes` | none | Byte budget enforced by the file backend |

use crate::error::{Result, SyncError};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const CONFIG_FILENAME: &str = "config.json";

pub const DEFAULT_BULK_CAP: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncConfig {
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: u64,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Top-level array field dropped to `bulk_cap` elements on quota pressure
    #[serde(default = "default_bulk_field")]
    pub bulk_field: String,

    #[serde(default = "default_bulk_cap")]
    pub bulk_cap: usize,

    #[serde(default = "default_document_key")]
    pub document_key: String,

    #[serde(default = "default_session_key")]
    pub session_key: String,

    #[serde(default)]
    pub quota_bytes: Option<usize>,
}

fn default_freshness_secs() -> u64 {
    300
}

fn default_debounce_ms() -> u64 {
    250
}

fn default_bulk_field() -> String {
    "jobs".to_string()
}

fn default_bulk_cap() -> usize {
    DEFAULT_BULK_CAP
}

fn default_document_key() -> String {
    "resume-store".to_string()
}

fn default_session_key() -> String {
    "job-cache".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            freshness_secs: default_freshness_secs(),
            debounce_ms: default_debounce_ms(),
            bulk_field: default_bulk_field(),
            bulk_cap: default_bulk_cap(),
            document_key: default_document_key(),
            session_key: default_session_key(),
            quota_bytes: None,
        }
    }
}

impl SyncConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);
        if !config_path.exists() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&fs::read_to_string(config_path)?)?)
    }

    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();
        fs::create_dir_all(config_dir)?;
        fs::write(config_dir.join(CONFIG_FILENAME), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn freshness_window(&self) -> Duration {
        Duration::seconds(self.freshness_secs as i64)
    }

    pub fn debounce(&self) -> Duration {
        Duration::milliseconds(self.debounce_ms as i64)
    }

    /// Look up a setting by its (kebab or snake case) name, formatted for display.
    pub fn get(&self, key: &str) -> Option<String> {
        match normalize_key(key).as_str() {
            "freshness_secs" => Some(self.freshness_secs.to_string()),
            "debounce_ms" => Some(self.debounce_ms.to_string()),
            "bulk_field" => Some(self.bulk_field.clone()),
            "bulk_cap" => Some(self.bulk_cap.to_string()),
            "document_key" => Some(self.document_key.clone()),
            "session_key" => Some(self.session_key.clone()),
            "quota_bytes" => Some(
                self.quota_bytes
                    .map(|q| q.to_string())
                    .unwrap_or_else(|| "none".to_string()),
            ),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let bad_value = || SyncError::Store(format!("Invalid value for {}: {}", key, value));
        match normalize_key(key).as_str() {
            "freshness_secs" => self.freshness_secs = value.parse().map_err(|_| bad_value())?,
            "debounce_ms" => self.debounce_ms = value.parse().map_err(|_| bad_value())?,
            "bulk_field" => self.bulk_field = value.to_string(),
            "bulk_cap" => self.bulk_cap = value.parse().map_err(|_| bad_value())?,
            "document_key" => self.document_key = value.to_string(),
            "session_key" => self.session_key = value.to_string(),
            "quota_bytes" => {
                self.quota_bytes = if value == "none" {
                    None
                } else {
                    Some(value.parse().map_err(|_| bad_value())?)
                }
            }
            _ => return Err(SyncError::Store(format!("Unknown config key: {}", key))),
        }
        Ok(())
    }

    pub fn keys() -> &'static [&'static str] {
        &[
            "freshness-secs",
            "debounce-ms",
            "bulk-field",
            "bulk-cap",
            "document-key",
            "session-key",
            "quota-bytes",
        ]
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().replace('-', "_")
}
