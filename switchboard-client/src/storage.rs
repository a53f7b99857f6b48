//! Durable key-value storage
//!
//! String keys to string values, like browser local storage. Batch writes and
//! removals are atomic: either every key of the batch changes or none does.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::ClientResult;

type Document = BTreeMap<String, String>;

/// Durable key-value store
pub trait KeyValueStore: Send + Sync {
    /// Read one key
    fn get(&self, key: &str) -> ClientResult<Option<String>>;

    /// Write every pair as one unit
    fn set_all(&self, entries: &[(&str, String)]) -> ClientResult<()>;

    /// Remove every key as one unit; missing keys are fine
    fn remove_all(&self, keys: &[&str]) -> ClientResult<()>;
}

// ============================================================================
// File store
// ============================================================================

/// All keys in one JSON document, replaced via temp file + rename
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// 创建文件存储
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// 获取路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unreadable or malformed documents count as empty and are overwritten
    /// on the next write.
    fn read_document(&self) -> Document {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Document::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read storage document");
                return Document::new();
            }
        };
        serde_json::from_str(&json).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "Malformed storage document, treating as empty");
            Document::new()
        })
    }

    fn write_document(&self, document: &Document) -> ClientResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(document)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut Document)) -> ClientResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut document = self.read_document();
        apply(&mut document);
        self.write_document(&document)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_document().remove(key))
    }

    fn set_all(&self, entries: &[(&str, String)]) -> ClientResult<()> {
        self.update(|doc| {
            for (key, value) in entries {
                doc.insert((*key).to_string(), value.clone());
            }
        })
    }

    fn remove_all(&self, keys: &[&str]) -> ClientResult<()> {
        self.update(|doc| {
            for key in keys {
                doc.remove(*key);
            }
        })
    }
}

// ============================================================================
// Memory store
// ============================================================================

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<Document>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set_all(&self, entries: &[(&str, String)]) -> ClientResult<()> {
        let mut map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        for (key, value) in entries {
            map.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> ClientResult<()> {
        let mut map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_batch_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("nested/session.json"));

        assert_eq!(store.get("token").unwrap(), None);
        store
            .set_all(&[("token", "abc".into()), ("loginTime", "1".into())])
            .unwrap();
        assert_eq!(store.get("token").unwrap().as_deref(), Some("abc"));
        assert_eq!(store.get("loginTime").unwrap().as_deref(), Some("1"));

        // Survives a new handle on the same file
        let reopened = FileStore::new(store.path());
        assert_eq!(reopened.get("token").unwrap().as_deref(), Some("abc"));

        reopened.remove_all(&["token", "loginTime", "missing"]).unwrap();
        assert_eq!(store.get("token").unwrap(), None);
        assert_eq!(store.get("loginTime").unwrap(), None);
    }

    #[test]
    fn test_file_store_malformed_document_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{ not json").unwrap();

        let store = FileStore::new(&path);
        assert_eq!(store.get("token").unwrap(), None);

        store.set_all(&[("token", "fresh".into())]).unwrap();
        assert_eq!(store.get("token").unwrap().as_deref(), Some("fresh"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        store.set_all(&[("a", "1".into()), ("b", "2".into())]).unwrap();
        assert_eq!(store.len(), 2);
        store.remove_all(&["a", "b"]).unwrap();
        assert!(store.is_empty());
    }
}
