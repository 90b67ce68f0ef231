// SPDX-License-Identifier: MIT

//! Persisted local key-value store.
//!
//! Backs the profile read cache, the offline queue slots, and the session
//! snapshot. Values are JSON, one file per key. Reads always go back to
//! disk: the storage may be shared with other processes of the same app
//! (multi-tab style), so nothing is cached in memory beyond a single call.
//!
//! Constructed without a directory the store degrades to a process-local
//! map with the same shape the production store exposes, used by tests and by
//! embedders that do not want persistence.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, SyncError};

/// Synchronous persisted key-value store. Cheap to clone.
#[derive(Clone)]
pub struct LocalStore {
    dir: Option<PathBuf>,
    memory: Arc<DashMap<String, String>>,
}

impl LocalStore {
    /// File-backed store rooted at `dir` (created if missing).
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| SyncError::Storage(format!("create {}: {}", dir.display(), e)))?;

        Ok(Self {
            dir: Some(dir),
            memory: Arc::new(DashMap::new()),
        })
    }

    /// Process-local store with no persistence.
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            memory: Arc::new(DashMap::new()),
        }
    }

    /// Read and deserialize the value under `key`, `None` if absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let raw = match &self.dir {
            Some(dir) => {
                let path = path_for(dir, key);
                match std::fs::read_to_string(&path) {
                    Ok(raw) => Some(raw),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                    Err(e) => {
                        return Err(SyncError::Storage(format!(
                            "read {}: {}",
                            path.display(),
                            e
                        )))
                    }
                }
            }
            None => self.memory.get(key).map(|entry| entry.value().clone()),
        };

        match raw {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| SyncError::Storage(format!("decode {}: {}", key, e))),
            None => Ok(None),
        }
    }

    /// Serialize and store `value` under `key`, overwriting any prior value.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)
            .map_err(|e| SyncError::Storage(format!("encode {}: {}", key, e)))?;

        match &self.dir {
            Some(dir) => {
                let path = path_for(dir, key);
                // Write-then-rename so a concurrent reader never sees a
                // half-written value.
                let tmp = path.with_extension("json.tmp");
                std::fs::write(&tmp, &raw)
                    .map_err(|e| SyncError::Storage(format!("write {}: {}", tmp.display(), e)))?;
                std::fs::rename(&tmp, &path)
                    .map_err(|e| SyncError::Storage(format!("rename {}: {}", path.display(), e)))?;
            }
            None => {
                self.memory.insert(key.to_string(), raw);
            }
        }
        Ok(())
    }

    /// Remove the value under `key`. Removing an absent key is not an error.
    pub fn remove(&self, key: &str) -> Result<()> {
        match &self.dir {
            Some(dir) => {
                let path = path_for(dir, key);
                match std::fs::remove_file(&path) {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(SyncError::Storage(format!(
                        "remove {}: {}",
                        path.display(),
                        e
                    ))),
                }
            }
            None => {
                self.memory.remove(key);
                Ok(())
            }
        }
    }
}

/// Map a storage key to a file path. Uids are opaque strings, so anything
/// outside a conservative character set is escaped.
fn path_for(dir: &std::path::Path, key: &str) -> PathBuf {
    let safe: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '~'
            }
        })
        .collect();
    dir.join(format!("{safe}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PersistedSession, UserProfile};
    use chrono::Utc;

    #[test]
    fn test_memory_roundtrip_and_remove() {
        let store = LocalStore::in_memory();

        assert!(store.get::<PersistedSession>("auth-storage").unwrap().is_none());

        let snapshot = PersistedSession {
            user: Some(UserProfile::new("u1", "a@b.com", "A", "B", Utc::now())),
        };
        store.put("auth-storage", &snapshot).unwrap();

        let loaded: PersistedSession = store.get("auth-storage").unwrap().unwrap();
        assert_eq!(loaded.user.unwrap().uid, "u1");

        store.remove("auth-storage").unwrap();
        assert!(store.get::<PersistedSession>("auth-storage").unwrap().is_none());
        // Removing twice is fine.
        store.remove("auth-storage").unwrap();
    }

    #[test]
    fn test_file_backed_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let store = LocalStore::new(dir.path()).unwrap();
        store.put("user_profile_u1", &serde_json::json!({"bio": "hi"})).unwrap();
        drop(store);

        let reopened = LocalStore::new(dir.path()).unwrap();
        let value: serde_json::Value = reopened.get("user_profile_u1").unwrap().unwrap();
        assert_eq!(value["bio"], "hi");
    }

    #[test]
    fn test_reads_see_external_writes() {
        let dir = tempfile::tempdir().unwrap();
        let a = LocalStore::new(dir.path()).unwrap();
        let b = LocalStore::new(dir.path()).unwrap();

        a.put("k", &serde_json::json!(1)).unwrap();
        assert_eq!(b.get::<serde_json::Value>("k").unwrap().unwrap(), 1);

        // Another handle overwrites; the first sees it on re-read.
        b.put("k", &serde_json::json!(2)).unwrap();
        assert_eq!(a.get::<serde_json::Value>("k").unwrap().unwrap(), 2);
    }

    #[test]
    fn test_hostile_key_characters_are_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path()).unwrap();

        store
            .put("user_profile_../../etc/passwd", &serde_json::json!("x"))
            .unwrap();
        let value: serde_json::Value = store
            .get("user_profile_../../etc/passwd")
            .unwrap()
            .unwrap();
        assert_eq!(value, "x");
    }
}
