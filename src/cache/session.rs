//! Session-scoped persistence
//!
//! Last-known-good values survive a network outage (and, with the file
//! backend, a process restart). Snapshots are served regardless of age.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub value: serde_json::Value,
    pub saved_at: DateTime<Utc>,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, key: &str) -> EngineResult<Option<SessionSnapshot>>;
    async fn save(&self, key: &str, snapshot: SessionSnapshot) -> EngineResult<()>;
    async fn remove(&self, key: &str) -> EngineResult<()>;
    async fn clear(&self) -> EngineResult<()>;
    /// Keep only the `keep` newest snapshots whose key starts with `prefix`.
    /// Returns how many were dropped.
    async fn prune(&self, prefix: &str, keep: usize) -> EngineResult<usize>;
}

/// Keys under `prefix` beyond the `keep` newest, oldest first
fn overflow(entries: &HashMap<String, SessionSnapshot>, prefix: &str, keep: usize) -> Vec<String> {
    let mut scoped: Vec<(&String, DateTime<Utc>)> =
        entries.iter().filter(|(k, _)| k.starts_with(prefix)).map(|(k, s)| (k, s.saved_at)).collect();
    if scoped.len() <= keep {
        return Vec::new();
    }
    scoped.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    let excess = scoped.len() - keep;
    scoped.into_iter().take(excess).map(|(k, _)| k.clone()).collect()
}

/// Process-lifetime store
#[derive(Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, SessionSnapshot>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, key: &str) -> EngineResult<Option<SessionSnapshot>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, snapshot: SessionSnapshot) -> EngineResult<()> {
        self.entries.write().await.insert(key.to_string(), snapshot);
        Ok(())
    }

    async fn remove(&self, key: &str) -> EngineResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> EngineResult<()> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn prune(&self, prefix: &str, keep: usize) -> EngineResult<usize> {
        let mut entries = self.entries.write().await;
        let doomed = overflow(&entries, prefix, keep);
        for key in &doomed {
            entries.remove(key);
        }
        Ok(doomed.len())
    }
}

/// Store backed by a single JSON file holding every snapshot
pub struct FileSessionStore {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file.
    guard: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), guard: Mutex::new(()) }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn read_all(&self) -> EngineResult<HashMap<String, SessionSnapshot>> {
        if !fs::try_exists(&self.path).await? {
            return Ok(HashMap::new());
        }
        let json = fs::read_to_string(&self.path).await?;
        if json.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&json).map_err(|e| EngineError::Session(format!("corrupt session file {:?}: {}", self.path, e)))
    }

    /// Like `read_all`, but a corrupt file is discarded so the next write
    /// replaces it instead of failing forever
    async fn read_for_write(&self) -> EngineResult<HashMap<String, SessionSnapshot>> {
        match self.read_all().await {
            Err(EngineError::Session(reason)) => {
                warn!(path = ?self.path, %reason, "discarding unreadable session file");
                Ok(HashMap::new())
            }
            other => other,
        }
    }

    pub async fn len(&self) -> EngineResult<usize> {
        let _guard = self.guard.lock().await;
        Ok(self.read_all().await?.len())
    }

    async fn write_all(&self, entries: &HashMap<String, SessionSnapshot>) -> EngineResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self, key: &str) -> EngineResult<Option<SessionSnapshot>> {
        let _guard = self.guard.lock().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn save(&self, key: &str, snapshot: SessionSnapshot) -> EngineResult<()> {
        let _guard = self.guard.lock().await;
        let mut entries = self.read_for_write().await?;
        entries.insert(key.to_string(), snapshot);
        self.write_all(&entries).await
    }

    async fn remove(&self, key: &str) -> EngineResult<()> {
        let _guard = self.guard.lock().await;
        let mut entries = self.read_for_write().await?;
        if entries.remove(key).is_some() {
            self.write_all(&entries).await?;
        }
        Ok(())
    }

    async fn clear(&self) -> EngineResult<()> {
        let _guard = self.guard.lock().await;
        if fs::try_exists(&self.path).await? {
            fs::remove_file(&self.path).await?;
        }
        Ok(())
    }

    async fn prune(&self, prefix: &str, keep: usize) -> EngineResult<usize> {
        let _guard = self.guard.lock().await;
        let mut entries = self.read_for_write().await?;
        let doomed = overflow(&entries, prefix, keep);
        if doomed.is_empty() {
            return Ok(0);
        }
        for key in &doomed {
            entries.remove(key);
        }
        self.write_all(&entries).await?;
        Ok(doomed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn snapshot(v: serde_json::Value) -> SessionSnapshot {
        SessionSnapshot { value: v, saved_at: Utc::now() }
    }

    #[tokio::test]
    async fn test_file_store_survives_new_instance() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session").join("vulca.json");

        let store = FileSessionStore::new(&path);
        store.save("evaluations:gpt", snapshot(json!({"score": 1}))).await.unwrap();

        let reopened = FileSessionStore::new(&path);
        let loaded = reopened.load("evaluations:gpt").await.unwrap().unwrap();
        assert_eq!(loaded.value["score"], 1);
        assert!(reopened.load("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_remove_and_clear() {
        let dir = tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("s.json"));
        store.save("a", snapshot(json!(1))).await.unwrap();
        store.save("b", snapshot(json!(2))).await.unwrap();

        store.remove("a").await.unwrap();
        assert!(store.load("a").await.unwrap().is_none());
        assert!(store.load("b").await.unwrap().is_some());

        store.clear().await.unwrap();
        assert!(!store.path().exists());
        assert!(store.load("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_replaced_on_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.json");
        std::fs::write(&path, "{ truncated").unwrap();

        let store = FileSessionStore::new(&path);
        assert!(matches!(store.load("a").await, Err(EngineError::Session(_))));

        store.save("a", snapshot(json!(1))).await.unwrap();
        assert_eq!(store.load("a").await.unwrap().unwrap().value, json!(1));
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_prune_keeps_newest_under_prefix() {
        let dir = tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("s.json"));
        let start = Utc::now();
        for i in 0..5 {
            let snap = SessionSnapshot { value: json!(i), saved_at: start + chrono::Duration::seconds(i) };
            store.save(&format!("evaluations:{}", i), snap).await.unwrap();
        }
        store.save("comparisons:x", snapshot(json!("other"))).await.unwrap();

        assert_eq!(store.prune("evaluations:", 2).await.unwrap(), 3);
        assert!(store.load("evaluations:0").await.unwrap().is_none());
        assert!(store.load("evaluations:3").await.unwrap().is_some());
        assert!(store.load("evaluations:4").await.unwrap().is_some());
        assert!(store.load("comparisons:x").await.unwrap().is_some());
        assert_eq!(store.prune("evaluations:", 2).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemorySessionStore::new();
        store.save("k", snapshot(json!("v"))).await.unwrap();
        assert_eq!(store.load("k").await.unwrap().unwrap().value, json!("v"));
        store.clear().await.unwrap();
        assert!(store.load("k").await.unwrap().is_none());
    }
}
