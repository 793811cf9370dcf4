//! Durable caption content keyed by an identifier.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::error::{StoreError, StoreResult};

/// Tags written alongside stored content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMeta {
    pub format: String,
    pub language: String,
}

#[async_trait]
pub trait CaptionStore: Send + Sync {
    /// Stored content for `key`, `None` when nothing is stored.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Replaces whatever is stored under `key`.
    async fn put(&self, key: &str, content: &str, meta: &StoredMeta) -> StoreResult<()>;
}

/// In-process store, mostly for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (String, StoredMeta)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, key: &str) -> Option<(String, StoredMeta)> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    pub fn insert(&self, key: &str, content: &str, meta: StoredMeta) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), (content.to_string(), meta));
    }
}

#[async_trait]
impl CaptionStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entry(key).map(|(content, _)| content))
    }

    async fn put(&self, key: &str, content: &str, meta: &StoredMeta) -> StoreResult<()> {
        self.insert(key, content, meta.clone());
        Ok(())
    }
}

/// On-disk record next to the content file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaRecord {
    pub format: String,
    pub language: String,
    pub stored_at: DateTime<Utc>,
}

/// Directory-backed store: `<key>.txt` holds content, `<key>.meta.json` its tags.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn content_path(&self, key: &str) -> StoreResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.txt")))
    }

    fn meta_path(&self, key: &str) -> StoreResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.meta.json")))
    }

    pub async fn metadata(&self, key: &str) -> StoreResult<Option<MetaRecord>> {
        let path = self.meta_path(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl CaptionStore for FileStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.content_path(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, content: &str, meta: &StoredMeta) -> StoreResult<()> {
        let content_path = self.content_path(key)?;
        let meta_path = self.meta_path(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let record = MetaRecord {
            format: meta.format.clone(),
            language: meta.language.clone(),
            stored_at: Utc::now(),
        };
        write_replacing(&meta_path, serde_json::to_string_pretty(&record)?.as_bytes()).await?;
        write_replacing(&content_path, content.as_bytes()).await?;

        tracing::debug!(key, bytes = content.len(), "stored caption content");
        Ok(())
    }
}

async fn write_replacing(path: &Path, data: &[u8]) -> StoreResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, data).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

fn validate_key(key: &str) -> StoreResult<()> {
    let ok = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
