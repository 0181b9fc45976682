//! Device-local key/value storage. Each key holds one JSON blob that is read
//! and written whole.
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const SESSION_KEY: &str = "auth";
pub const FAVORITES_KEY: &str = "favorites";

#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Read and decode a blob. A blob that no longer decodes is reported as an error,
/// not as absent, so callers can decide whether to discard it.
pub async fn load_json<T: DeserializeOwned>(store: &dyn LocalStore, key: &str) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(raw) => {
            let parsed = serde_json::from_str(&raw)
                .with_context(|| format!("stored '{}' is not valid JSON", key))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

pub async fn save_json<T: Serialize + ?Sized>(store: &dyn LocalStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value).context("JSON encode failed")?;
    store.set(key, raw).await
}

/// One `<key>.json` file per key under a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create data directory {:?}", dir))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl LocalStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {:?} failed", path)),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        tokio::fs::write(&tmp, value)
            .await
            .with_context(|| format!("writing {:?} failed", tmp))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("replacing {:?} failed", path))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing {:?} failed", path)),
        }
    }
}

/// Volatile store, used for ephemeral runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let guard = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        guard.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        guard.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_store_replaces_whole_blob_and_removes_idempotently() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("nested")).await.unwrap();

        assert_eq!(store.get("favorites").await.unwrap(), None);
        store.set("favorites", "[1]".to_string()).await.unwrap();
        store.set("favorites", "[1,2]".to_string()).await.unwrap();
        assert_eq!(store.get("favorites").await.unwrap().as_deref(), Some("[1,2]"));

        store.remove("favorites").await.unwrap();
        store.remove("favorites").await.unwrap();
        assert_eq!(store.get("favorites").await.unwrap(), None);
    }

    #[tokio::test]
    async fn load_json_reports_corrupt_blob() {
        let store = MemoryStore::new();
        store.set("auth", "{not json".to_string()).await.unwrap();
        let res: Result<Option<Vec<String>>> = load_json(&store, "auth").await;
        assert!(res.is_err());

        let missing: Option<Vec<String>> = load_json(&store, "nothing").await.unwrap();
        assert!(missing.is_none());
    }
}
