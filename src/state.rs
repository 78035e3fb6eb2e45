// src/state.rs
//! Watermark persistence.
//!
//! `JsonFileStore` keeps every feed's watermark in one JSON document:
//! `{"feeds": {"<name>": {"feed_name", "last_updated", "last_published"}}}`.
//! A feed with no stored record starts from the epoch sentinel.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::delta::FeedWatermark;
use crate::error::StateError;

#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Stored watermark, or a fresh one when the feed has never been saved.
    async fn load(&self, feed_name: &str) -> Result<FeedWatermark, StateError>;

    async fn save(&self, watermark: &FeedWatermark) -> Result<(), StateError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateDoc {
    #[serde(default)]
    feeds: BTreeMap<String, FeedWatermark>,
}

pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write between feeds sharing the file.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_doc(&self) -> Result<StateDoc, StateError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StateDoc::default()),
            Err(source) => {
                return Err(StateError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if raw.trim().is_empty() {
            return Ok(StateDoc::default());
        }
        serde_json::from_str(&raw).map_err(|e| StateError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    async fn write_doc(&self, doc: &StateDoc) -> Result<(), StateError> {
        let io_err = |source| StateError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(io_err)?;
        }
        let body = serde_json::to_vec_pretty(doc).map_err(|e| StateError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, body).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)
    }
}

#[async_trait]
impl WatermarkStore for JsonFileStore {
    async fn load(&self, feed_name: &str) -> Result<FeedWatermark, StateError> {
        let _guard = self.lock.lock().await;
        let doc = self.read_doc().await?;
        Ok(doc
            .feeds
            .get(feed_name)
            .cloned()
            .unwrap_or_else(|| FeedWatermark::fresh(feed_name)))
    }

    async fn save(&self, watermark: &FeedWatermark) -> Result<(), StateError> {
        let _guard = self.lock.lock().await;
        let mut doc = self.read_doc().await?;
        doc.feeds
            .insert(watermark.feed_name.clone(), watermark.clone());
        self.write_doc(&doc).await?;
        tracing::debug!(
            feed = %watermark.feed_name,
            path = %self.path.display(),
            "watermark saved"
        );
        Ok(())
    }
}

/// In-process store. `failing()` makes every save error out.
#[derive(Default)]
pub struct MemoryStore {
    feeds: Mutex<BTreeMap<String, FeedWatermark>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_watermark(watermark: FeedWatermark) -> Self {
        let mut feeds = BTreeMap::new();
        feeds.insert(watermark.feed_name.clone(), watermark);
        Self {
            feeds: Mutex::new(feeds),
            ..Self::default()
        }
    }

    pub fn failing(self) -> Self {
        self.fail_saves.store(true, Ordering::SeqCst);
        self
    }

    /// Number of successful saves so far.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub async fn get(&self, feed_name: &str) -> Option<FeedWatermark> {
        self.feeds.lock().await.get(feed_name).cloned()
    }
}

#[async_trait]
impl WatermarkStore for MemoryStore {
    async fn load(&self, feed_name: &str) -> Result<FeedWatermark, StateError> {
        Ok(self
            .get(feed_name)
            .await
            .unwrap_or_else(|| FeedWatermark::fresh(feed_name)))
    }

    async fn save(&self, watermark: &FeedWatermark) -> Result<(), StateError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StateError::Io {
                path: PathBuf::from("<memory>"),
                source: io::Error::other("store configured to fail"),
            });
        }
        self.feeds
            .lock()
            .await
            .insert(watermark.feed_name.clone(), watermark.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
