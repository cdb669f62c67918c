//! Per-user progress persistence.
//!
//! `QuestStore` is the seam the progression engine talks to. Two backends:
//!   - `FileStore`: one JSON snapshot mapping user id -> state, replaced
//!     wholesale on every save (write `<path>.tmp`, then rename over the file)
//!   - `MemoryStore`: process-local map, used by tests and throwaway runs
//!
//! A snapshot that cannot be parsed is treated as empty. The fallback is logged
//! and counted so callers can observe it.

use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, instrument, warn};

use crate::domain::UserState;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state snapshot I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize state snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[async_trait]
pub trait QuestStore: Send + Sync {
    /// Stored state for the user, or `None` if there is none (or it was unreadable).
    async fn load(&self, user_id: &str) -> Option<UserState>;

    /// Persist the user's state, replacing any previous record.
    async fn save(&self, user_id: &str, state: &UserState) -> Result<(), StoreError>;
}

type Snapshot = HashMap<String, UserState>;

pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles on the snapshot within this process.
    io_lock: Mutex<()>,
    recovered: AtomicU64,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_lock: Mutex::new(()),
            recovered: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// How many times an unreadable snapshot was discarded and treated as empty.
    #[allow(dead_code)]
    pub fn recovered_corruptions(&self) -> u64 {
        self.recovered.load(Ordering::Relaxed)
    }

    fn io_err(&self, source: io::Error) -> StoreError {
        StoreError::Io { path: self.path.clone(), source }
    }

    async fn read_snapshot(&self) -> Snapshot {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Snapshot::new(),
            Err(e) => {
                warn!(target: "store", path = %self.path.display(), error = %e, "State snapshot unreadable; treating as empty");
                self.recovered.fetch_add(1, Ordering::Relaxed);
                return Snapshot::new();
            }
        };
        if raw.trim().is_empty() {
            return Snapshot::new();
        }
        match serde_json::from_str::<Snapshot>(&raw) {
            Ok(snap) => snap,
            Err(e) => {
                warn!(target: "store", path = %self.path.display(), error = %e, "State snapshot corrupt; discarding prior data");
                self.recovered.fetch_add(1, Ordering::Relaxed);
                Snapshot::new()
            }
        }
    }

    async fn write_snapshot(&self, snap: &Snapshot) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| self.io_err(e))?;
        }
        let body = serde_json::to_string_pretty(snap)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await.map_err(|e| self.io_err(e))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| self.io_err(e))?;
        Ok(())
    }
}

#[async_trait]
impl QuestStore for FileStore {
    #[instrument(level = "debug", skip(self))]
    async fn load(&self, user_id: &str) -> Option<UserState> {
        let _guard = self.io_lock.lock().await;
        self.read_snapshot().await.remove(user_id)
    }

    #[instrument(level = "debug", skip(self, state), fields(current = %state.current))]
    async fn save(&self, user_id: &str, state: &UserState) -> Result<(), StoreError> {
        let _guard = self.io_lock.lock().await;
        let mut snap = self.read_snapshot().await;
        snap.insert(user_id.to_string(), state.clone());
        self.write_snapshot(&snap).await?;
        debug!(target: "store", users = snap.len(), "State snapshot written");
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuestStore for MemoryStore {
    async fn load(&self, user_id: &str) -> Option<UserState> {
        self.users.read().await.get(user_id).cloned()
    }

    async fn save(&self, user_id: &str, state: &UserState) -> Result<(), StoreError> {
        self.users.write().await.insert(user_id.to_string(), state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sample(current: &str) -> UserState {
        UserState {
            current: current.into(),
            history: vec!["a".into()],
            prize: None,
        }
    }

    #[tokio::test]
    async fn missing_file_means_no_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("state.json"));
        assert_eq!(store.load("u1").await, None);
        assert_eq!(store.recovered_corruptions(), 0);
    }

    #[tokio::test]
    async fn saves_and_loads_per_user() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested/state.json"));
        store.save("u1", &sample("b")).await.unwrap();
        store.save("u2", &sample("c")).await.unwrap();

        assert_eq!(store.load("u1").await, Some(sample("b")));
        assert_eq!(store.load("u2").await, Some(sample("c")));
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn snapshot_uses_documented_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = FileStore::new(&path);
        store.save("42", &sample("b")).await.unwrap();

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "42": { "current": "b", "history": ["a"], "prize": null } })
        );
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_discarded_and_counted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = FileStore::new(&path);

        assert_eq!(store.load("u1").await, None);
        assert_eq!(store.recovered_corruptions(), 1);

        // The next save replaces the corrupt file with a valid snapshot.
        store.save("u1", &sample("b")).await.unwrap();
        assert_eq!(store.load("u1").await, Some(sample("b")));
        assert_eq!(store.recovered_corruptions(), 2);
    }

    #[tokio::test]
    async fn concurrent_saves_for_different_users_are_all_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path().join("state.json")));
        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.save(&format!("user-{i}"), &sample("x")).await.unwrap();
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
        for i in 0..16 {
            assert!(store.load(&format!("user-{i}")).await.is_some(), "user-{i} lost");
        }
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.load("u").await, None);
        store.save("u", &sample("z")).await.unwrap();
        assert_eq!(store.load("u").await, Some(sample("z")));
    }
}
