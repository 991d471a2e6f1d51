pub mod selection;

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use cnidarium::{StateDelta, StateRead, StateWrite, Storage};
use tokio::sync::RwLock;
use tracing::debug;

// Key prefixes (no trailing slashes — cnidarium convention)
pub const ENTRY_PREFIX: &str = "gap/entry";
pub const SELECTION_PREFIX: &str = "gap/selection";

pub fn entry_key(session_id: &str) -> String {
    format!("{}/{}", ENTRY_PREFIX, session_id)
}
pub fn selection_key(session_id: &str) -> String {
    format!("{}/{}", SELECTION_PREFIX, session_id)
}

/// Byte-level key-value store used to carry cache and selection state across
/// a UI session boundary.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn save(&self, key: &str, bytes: Vec<u8>) -> Result<()>;
}

/// Process-local store.
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.values.write().await.insert(key.to_string(), bytes);
        Ok(())
    }
}

/// Store backed by cnidarium on local disk.
pub struct CnidariumStore {
    storage: Storage,
}

impl CnidariumStore {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let prefixes = vec![ENTRY_PREFIX.to_string(), SELECTION_PREFIX.to_string()];
        let storage = Storage::load(data_dir.to_path_buf(), prefixes)
            .await
            .context("Failed to init cnidarium storage")?;
        Ok(Self { storage })
    }
}

#[async_trait]
impl SessionStore for CnidariumStore {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let snapshot = self.storage.latest_snapshot();
        snapshot.get_raw(key).await
    }

    async fn save(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let snapshot = self.storage.latest_snapshot();
        let mut delta = StateDelta::new(snapshot);
        let size = bytes.len();
        delta.put_raw(key.to_string(), bytes);
        self.storage.commit(delta).await?;
        debug!(key, size, "session state saved");
        Ok(())
    }
}
