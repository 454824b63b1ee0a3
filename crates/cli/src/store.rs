//! File-backed session storage.
//!
//! The terminal equivalent of browser storage: a single JSON object on disk
//! mapping the storage keys to their values. Every operation reads the file
//! and every write replaces it whole.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bazaar_storefront::storage::SessionStore;

/// [`SessionStore`] persisted as a JSON file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: Arc<PathBuf>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> HashMap<String, String> {
        match tokio::fs::read(self.path()).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring unreadable state file");
                HashMap::new()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read state file");
                HashMap::new()
            }
        }
    }

    async fn save(&self, values: &HashMap<String, String>) {
        let bytes = match serde_json::to_vec_pretty(values) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode state file");
                return;
            }
        };

        if let Err(e) = tokio::fs::write(self.path(), bytes).await {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to write state file");
        }
    }
}

impl SessionStore for FileStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.load().await.remove(key)
    }

    async fn set(&self, key: &str, value: String) {
        let mut values = self.load().await;
        values.insert(key.to_string(), value);
        self.save(&values).await;
    }

    async fn remove(&self, key: &str) {
        let mut values = self.load().await;
        if values.remove(key).is_some() {
            self.save(&values).await;
        }
    }
}
