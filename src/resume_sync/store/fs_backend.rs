use super::backend::StorageBackend;
use crate::error::{Result, SyncError};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const ENTRY_EXT: &str = "json";

/// True when `name` can be used as one file name inside a directory: not
/// empty, no leading dot, and only ASCII alphanumerics or `-_.@+`.
pub(crate) fn is_safe_file_stem(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@' | '+'))
}

/// Durable storage backend: one file per key under `root`.
pub struct FsBackend {
    root: PathBuf,
    quota_bytes: Option<usize>,
}

impl FsBackend {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            quota_bytes: None,
        }
    }

    pub fn with_quota(mut self, quota_bytes: Option<usize>) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf> {
        if !is_safe_file_stem(key) {
            return Err(SyncError::Store(format!("Invalid storage key: {:?}", key)));
        }
        Ok(self.root.join(format!("{}.{}", key, ENTRY_EXT)))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(SyncError::Io)?;
        }
        Ok(())
    }

    /// Bytes used by every entry except `skip`.
    fn usage_excluding(&self, skip: &Path) -> Result<usize> {
        let mut total = 0;
        for path in self.entry_paths()? {
            if path != skip {
                total += fs::metadata(&path).map_err(SyncError::Io)?.len() as usize;
            }
        }
        Ok(total)
    }

    fn entry_paths(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(SyncError::Io)? {
            let path = entry.map_err(SyncError::Io)?.path();
            let is_entry = path.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXT)
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| !n.starts_with('.'));
            if is_entry {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

impl StorageBackend for FsBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        fs::read(path).map(Some).map_err(SyncError::Io)
    }

    fn set(&self, key: &str, payload: &[u8]) -> Result<()> {
        let path = self.entry_path(key)?;
        self.ensure_dir()?;

        if let Some(quota) = self.quota_bytes {
            let needed = self.usage_excluding(&path)? + payload.len();
            if needed > quota {
                return Err(SyncError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    available: quota,
                });
            }
        }

        // Atomic write; the temp file never outlives a failed attempt
        let tmp_path = self.root.join(format!(".{}-{}.tmp", key, Uuid::new_v4()));
        let written = fs::write(&tmp_path, payload).and_then(|_| fs::rename(&tmp_path, &path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(SyncError::Io(e));
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.entry_path(key)?;
        if path.exists() {
            fs::remove_file(path).map_err(SyncError::Io)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .entry_paths()?
            .iter()
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rejects_path_like_keys() {
        let dir = TempDir::new().unwrap();
        let backend = FsBackend::new(dir.path().to_path_buf());
        assert!(backend.set("../escape", b"{}").is_err());
        assert!(backend.set("", b"{}").is_err());
        assert!(backend.set(".hidden", b"{}").is_err());
    }

    #[test]
    fn test_accepts_email_like_keys() {
        assert!(is_safe_file_stem("jane+cv@example.com"));
        assert!(!is_safe_file_stem("a/b"));
        assert!(!is_safe_file_stem("..\\x"));
    }

    #[test]
    fn test_failed_rename_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let backend = FsBackend::new(dir.path().to_path_buf());
        // A non-empty directory where the entry file should go makes the
        // rename fail after the temp file was written.
        fs::create_dir_all(dir.path().join("blocked.json").join("inner")).unwrap();

        let result = backend.set("blocked", b"{}");
        assert!(matches!(result, Err(SyncError::Io(_))));

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left: {:?}", leftovers);

        backend.set("other", b"{}").unwrap();
        assert_eq!(backend.get("other").unwrap(), Some(b"{}".to_vec()));
    }

    #[test]
    fn test_missing_root_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let backend = FsBackend::new(dir.path().join("not-yet"));
        assert_eq!(backend.get("k").unwrap(), None);
        assert!(backend.keys().unwrap().is_empty());
    }
}
