//! The append-only dedup index of stored article URLs.
//!
//! Persisted as `stored_urls.json` = `{"urls": [...]}` under the storage
//! root. In memory it keeps insertion order plus a hash set so membership
//! checks never touch the disk.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// File name of the index under the storage root.
pub const INDEX_FILENAME: &str = "stored_urls.json";

#[derive(Serialize)]
struct IndexFileOut<'a> {
    urls: &'a [String],
}

// Older runs wrote either shape.
#[derive(Deserialize)]
#[serde(untagged)]
enum IndexFileIn {
    Object { urls: Vec<String> },
    List(Vec<String>),
}

#[derive(Debug, Default, Clone)]
pub struct DedupIndex {
    urls: Vec<String>,
    seen: HashSet<String>,
}

impl DedupIndex {
    pub fn from_urls<I>(urls: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut index = Self::default();
        for url in urls {
            index.insert(url);
        }
        index
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    /// Append `url` unless present. Returns whether it was added.
    pub fn insert(&mut self, url: String) -> bool {
        if self.seen.contains(&url) {
            return false;
        }
        self.seen.insert(url.clone());
        self.urls.push(url);
        true
    }

    /// Drop `url`. Returns whether it was present.
    pub fn remove(&mut self, url: &str) -> bool {
        if !self.seen.remove(url) {
            return false;
        }
        self.urls.retain(|u| u != url);
        true
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Read the index file. `Ok(None)` when it does not exist yet.
    pub async fn load(path: &Path) -> io::Result<Option<Self>> {
        let raw = match fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let parsed: IndexFileIn = serde_json::from_str(&raw)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let urls = match parsed {
            IndexFileIn::Object { urls } | IndexFileIn::List(urls) => urls,
        };
        Ok(Some(Self::from_urls(urls)))
    }

    /// Write the whole index, replacing the previous file atomically.
    pub async fn persist(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&IndexFileOut { urls: &self.urls })
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, path).await?;
        debug!(count = self.urls.len(), path = %path.display(), "Persisted dedup index");
        Ok(())
    }
}
