use std::{collections::HashMap, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use console_state::{transition::rehydrate, SessionSnapshot};
use shared::domain::ViewKey;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{config::ConsoleSettings, store::ConsoleStore, SessionError};

/// Opaque key/value blob store used to resume a session after a reload.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>, SessionError>;
    async fn save(&self, key: &str, blob: &str) -> Result<(), SessionError>;
}

#[derive(Default)]
pub struct MemorySessionStorage {
    entries: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn load(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn save(&self, key: &str, blob: &str) -> Result<(), SessionError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), blob.to_string());
        Ok(())
    }
}

/// Keeps each blob in `<dir>/<key>.json`.
pub struct FileSessionStorage {
    dir: PathBuf,
}

impl FileSessionStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }
}

#[async_trait]
impl SessionStorage for FileSessionStorage {
    async fn load(&self, key: &str) -> Result<Option<String>, SessionError> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(blob) => Ok(Some(blob)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SessionError::Io { path, source }),
        }
    }

    async fn save(&self, key: &str, blob: &str) -> Result<(), SessionError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| SessionError::Io {
                path: self.dir.clone(),
                source,
            })?;
        let path = self.path_for(key);
        tokio::fs::write(&path, blob)
            .await
            .map_err(|source| SessionError::Io { path, source })
    }
}

/// Persists the whitelisted view queries of a store and restores them later.
pub struct SessionBridge {
    storage: Arc<dyn SessionStorage>,
    key: String,
    whitelist: Vec<ViewKey>,
}

impl SessionBridge {
    pub fn new(storage: Arc<dyn SessionStorage>, key: impl Into<String>, whitelist: Vec<ViewKey>) -> Self {
        Self {
            storage,
            key: key.into(),
            whitelist,
        }
    }

    /// File-backed bridge when a session directory is configured, in-memory
    /// otherwise.
    pub fn from_settings(settings: &ConsoleSettings) -> Self {
        let storage: Arc<dyn SessionStorage> = match &settings.session_dir {
            Some(dir) => Arc::new(FileSessionStorage::new(dir.clone())),
            None => Arc::new(MemorySessionStorage::default()),
        };
        Self::new(
            storage,
            settings.session_key.clone(),
            settings.persisted_views.clone(),
        )
    }

    pub async fn persist(&self, store: &ConsoleStore) -> Result<(), SessionError> {
        let snapshot = SessionSnapshot::capture(&store.snapshot().await, &self.whitelist);
        let blob = snapshot.to_blob()?;
        self.storage.save(&self.key, &blob).await?;
        debug!(key = %self.key, views = snapshot.views.len(), "persisted session snapshot");
        Ok(())
    }

    /// Applies a stored snapshot, if any. Missing, unreadable or malformed
    /// blobs leave the store untouched and return `false`.
    pub async fn restore(&self, store: &ConsoleStore) -> bool {
        let blob = match self.storage.load(&self.key).await {
            Ok(Some(blob)) => blob,
            Ok(None) => return false,
            Err(err) => {
                warn!(key = %self.key, "failed to read session snapshot: {err}");
                return false;
            }
        };
        let mut snapshot = match SessionSnapshot::from_blob(&blob) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(key = %self.key, "ignoring malformed session snapshot: {err}");
                return false;
            }
        };
        snapshot
            .views
            .retain(|view_key, _| self.whitelist.contains(view_key));
        if snapshot.is_empty() {
            return false;
        }
        store.dispatch(rehydrate(snapshot)).await;
        true
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
