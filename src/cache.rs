use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{PageError, Result};

// Cache entry with timestamp
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub html: String,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            created_at: Utc::now(),
        }
    }

    // `None` ttl means entries never expire
    pub fn is_fresh(&self, ttl: Option<Duration>) -> bool {
        let Some(ttl) = ttl else {
            return true;
        };
        match Utc::now().signed_duration_since(self.created_at).to_std() {
            Ok(age) => age < ttl,
            // created in the "future" (clock moved back), keep it
            Err(_) => true,
        }
    }
}

/// Turn an untrusted request path into a cache key.
///
/// Percent-decodes the path (invalid encodings are kept as-is), then drops
/// empty and `.` segments so `/foo`, `/foo/`, `//foo` and `/f%6Fo` all
/// become `/foo`. The root is `/`.
pub fn normalize_path(raw: &str) -> String {
    let decoded = urlencoding::decode(raw)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| raw.to_string());

    let segments: Vec<&str> = decoded
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();

    format!("/{}", segments.join("/"))
}

// What the page is "about": the key without its leading slash, "home" for the root
pub fn topic(key: &str) -> &str {
    match key.trim_start_matches('/') {
        "" => "home",
        rest => rest,
    }
}

// File name for a key (sha256 of the normalized path)
pub fn make_cache_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Storage capability injected into the page service.
#[async_trait]
pub trait PageCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Replace whatever is stored under `key`. Readers see either the old
    /// entry or the new one, never a mix.
    async fn put(&self, key: &str, entry: CacheEntry) -> Result<()>;

    async fn len(&self) -> Result<usize>;
}

// In-process cache, gone on restart
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PageCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        Ok(self.entries.get(key).map(|e| e.value().clone()))
    }

    async fn put(&self, key: &str, entry: CacheEntry) -> Result<()> {
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.len())
    }
}

// What actually lands on disk: the entry plus the key it belongs to
#[derive(Serialize, Deserialize)]
struct StoredPage {
    key: String,
    #[serde(flatten)]
    entry: CacheEntry,
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// One JSON file per page under `dir`, named by the key's digest.
pub struct DiskCache {
    dir: PathBuf,
    // pages on disk, counted once in `open` and kept up to date by `put`.
    // The lock also covers the exists check + rename pair.
    pages: Mutex<usize>,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            pages: Mutex::new(0),
        }
    }

    /// Create the directory, count the pages already in it and remove
    /// temp files left behind by interrupted writes.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;

        let mut pages = 0;
        let mut listing = tokio::fs::read_dir(&dir).await?;
        while let Some(item) = listing.next_entry().await? {
            let path = item.path();
            if is_temp_file(&path) {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => debug!(path = %path.display(), "Removed stale cache temp file"),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Could not remove stale temp file")
                    }
                }
            } else if path.extension().is_some_and(|ext| ext == "json") {
                pages += 1;
            }
        }

        Ok(Self {
            dir,
            pages: Mutex::new(pages),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", make_cache_key(key)))
    }

    fn temp_path_for(&self, key: &str) -> PathBuf {
        let seq = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!(
            ".{}.{}.{}.tmp",
            make_cache_key(key),
            std::process::id(),
            seq
        ))
    }
}

#[async_trait]
impl PageCache for DiskCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<StoredPage>(&bytes) {
            Ok(stored) if stored.key == key => Ok(Some(stored.entry)),
            Ok(stored) => {
                warn!(key, found = %stored.key, "cache file belongs to another key, ignoring");
                Ok(None)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cache file is corrupt, ignoring");
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &str, entry: CacheEntry) -> Result<()> {
        let stored = StoredPage {
            key: key.to_string(),
            entry,
        };
        let data = serde_json::to_vec(&stored)
            .map_err(|e| PageError::CacheUnavailable(format!("serialize entry: {e}")))?;

        // write aside, then rename over the old file
        let tmp = self.temp_path_for(key);
        if let Err(e) = tokio::fs::write(&tmp, data).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        let path = self.path_for(key);
        let mut pages = self.pages.lock().await;
        let existed = tokio::fs::try_exists(&path).await.unwrap_or(true);
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if !existed {
            *pages += 1;
        }
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(*self.pages.lock().await)
    }
}

// `.<digest>.<pid>.<seq>.tmp`, see `temp_path_for`
fn is_temp_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'));
    hidden && path.extension().is_some_and(|ext| ext == "tmp")
}
