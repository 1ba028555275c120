//! Content-addressed JSON blob storage plus the URL dedup index.
//!
//! # Layout
//!
//! ```text
//! <root>/
//! ├── stored_urls.json                          # dedup index
//! ├── latest_digest.json                        # most recent DigestSnapshot
//! ├── site=<host>/<YYYYMMDD>/<sha1(url)>.json   # StoredArticle
//! └── summaries/
//!     └── site=<host>/<YYYYMMDD>/<sha1(url)>.json   # ArticleSummary
//! ```
//!
//! Articles and summaries are written once and never rewritten. The index
//! is the only shared read-modify-write structure; it sits behind a
//! `RwLock` so every append is serialized through a single writer.

pub mod index;

use crate::models::{ArticleSummary, DigestSnapshot, StoredArticle};
use crate::utils::url_fingerprint;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

pub use index::{DedupIndex, INDEX_FILENAME};

/// File name of the digest snapshot under the storage root.
pub const LATEST_DIGEST_FILENAME: &str = "latest_digest.json";
const SUMMARIES_DIR: &str = "summaries";
const SITE_PREFIX: &str = "site=";

/// Outcome of [`ContentStore::put_article`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    /// The blob was written and the URL recorded.
    Stored(PathBuf),
    /// Another writer recorded the URL first; nothing was written.
    AlreadyStored,
}

#[derive(Debug)]
pub struct ContentStore {
    root: PathBuf,
    index: RwLock<DedupIndex>,
}

impl ContentStore {
    /// Open (creating if needed) the store at `root`.
    ///
    /// When no index file exists yet, every article blob is scanned once to
    /// rebuild it and the result is persisted.
    #[instrument(level = "info", skip_all, fields(root = %root.as_ref().display()))]
    pub async fn open(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        let index_path = root.join(INDEX_FILENAME);

        let index = match DedupIndex::load(&index_path).await {
            Ok(Some(index)) => index,
            Ok(None) => Self::repair_index(&root).await?,
            Err(e) => {
                warn!(error = %e, "Dedup index unreadable; rebuilding from stored articles");
                Self::repair_index(&root).await?
            }
        };
        info!(count = index.len(), "Opened content store");

        Ok(Self {
            root,
            index: RwLock::new(index),
        })
    }

    async fn repair_index(root: &Path) -> io::Result<DedupIndex> {
        let articles = read_blobs::<StoredArticle>(&article_files(root).await?).await;
        let index = DedupIndex::from_urls(articles.into_iter().map(|a| a.url));
        index.persist(&root.join(INDEX_FILENAME)).await?;
        info!(count = index.len(), "Rebuilt dedup index from article blobs");
        Ok(index)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn contains(&self, url: &str) -> bool {
        self.index.read().await.contains(url)
    }

    /// Snapshot of every URL ever stored, in insertion order.
    pub async fn stored_urls(&self) -> Vec<String> {
        self.index.read().await.urls().to_vec()
    }

    /// Where the article for `url` fetched at `at` lives.
    pub fn article_path(&self, url: &str, at: DateTime<Utc>) -> PathBuf {
        self.root.join(blob_relative_path(url, at))
    }

    /// Where the summary for `url` written at `at` lives.
    pub fn summary_path(&self, url: &str, at: DateTime<Utc>) -> PathBuf {
        self.root.join(SUMMARIES_DIR).join(blob_relative_path(url, at))
    }

    /// Persist a new article and record its URL.
    ///
    /// The blob is written before the index entry. When either write fails
    /// the URL stays unrecorded, no blob is left behind, and a later crawl
    /// fetches it again.
    #[instrument(level = "debug", skip_all, fields(url = %article.url))]
    pub async fn put_article(&self, article: &StoredArticle) -> io::Result<PutOutcome> {
        let mut index = self.index.write().await;
        if index.contains(&article.url) {
            return Ok(PutOutcome::AlreadyStored);
        }

        let fetched_at = DateTime::parse_from_rfc3339(&article.fetched_at)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        let path = self.article_path(&article.url, fetched_at);
        write_json(&path, article).await?;

        index.insert(article.url.clone());
        if let Err(e) = index.persist(&self.root.join(INDEX_FILENAME)).await {
            index.remove(&article.url);
            if let Err(cleanup) = fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %cleanup, "Failed to remove unindexed blob");
            }
            return Err(e);
        }
        debug!(path = %path.display(), "Stored article");
        Ok(PutOutcome::Stored(path))
    }

    /// Load the stored article for `url`, whichever day it was fetched.
    pub async fn find_article(&self, url: &str) -> Option<StoredArticle> {
        let host_dir = self.root.join(site_dir_name(url));
        let file_name = format!("{}.json", url_fingerprint(url));

        let mut days = fs::read_dir(&host_dir).await.ok()?;
        while let Ok(Some(day)) = days.next_entry().await {
            let candidate = day.path().join(&file_name);
            if fs::try_exists(&candidate).await.unwrap_or(false) {
                return read_blob(&candidate).await;
            }
        }
        None
    }

    /// Every readable article blob in the store.
    pub async fn load_articles(&self) -> io::Result<Vec<StoredArticle>> {
        Ok(read_blobs(&article_files(&self.root).await?).await)
    }

    pub async fn put_summary(&self, summary: &ArticleSummary) -> io::Result<PathBuf> {
        let path = self.summary_path(&summary.url, Utc::now());
        write_json(&path, summary).await?;
        debug!(path = %path.display(), "Stored summary");
        Ok(path)
    }

    /// Every readable summary blob in the store.
    pub async fn load_summaries(&self) -> io::Result<Vec<ArticleSummary>> {
        let dir = self.root.join(SUMMARIES_DIR);
        if !fs::try_exists(&dir).await? {
            return Ok(Vec::new());
        }
        Ok(read_blobs(&site_files(&dir).await?).await)
    }

    /// Stamp `stored_at` and overwrite the latest snapshot.
    pub async fn store_latest_digest(&self, snapshot: &DigestSnapshot) -> io::Result<DigestSnapshot> {
        let mut stamped = snapshot.clone();
        stamped.stored_at = Some(Utc::now().to_rfc3339());
        write_json(&self.root.join(LATEST_DIGEST_FILENAME), &stamped).await?;
        info!("Stored latest digest");
        Ok(stamped)
    }

    /// The latest snapshot, or `None` if absent or unreadable.
    pub async fn load_latest_digest(&self) -> Option<DigestSnapshot> {
        let path = self.root.join(LATEST_DIGEST_FILENAME);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return None;
        }
        read_blob(&path).await
    }
}

fn site_dir_name(url: &str) -> String {
    let host = url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string());
    format!("{SITE_PREFIX}{host}")
}

fn blob_relative_path(url: &str, at: DateTime<Utc>) -> PathBuf {
    PathBuf::from(site_dir_name(url))
        .join(at.format("%Y%m%d").to_string())
        .join(format!("{}.json", url_fingerprint(url)))
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(path, json).await
}

async fn read_blob<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping unreadable blob");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping malformed blob");
            None
        }
    }
}

async fn read_blobs<T: DeserializeOwned>(paths: &[PathBuf]) -> Vec<T> {
    let mut out = Vec::with_capacity(paths.len());
    for path in paths {
        if let Some(value) = read_blob(path).await {
            out.push(value);
        }
    }
    out
}

/// Article blobs: JSON files below `site=*` directories of the root.
async fn article_files(root: &Path) -> io::Result<Vec<PathBuf>> {
    site_files(root).await
}

/// JSON files below every `site=*` directory of `dir`, sorted by path.
async fn site_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut stack = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let is_site = entry.file_name().to_string_lossy().starts_with(SITE_PREFIX);
        if is_site && entry.file_type().await?.is_dir() {
            stack.push(entry.path());
        }
    }

    let mut files = Vec::new();
    while let Some(current) = stack.pop() {
        let mut entries = fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                stack.push(path);
            } else if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryDigest;
    use tempfile::TempDir;

    fn article(url: &str) -> StoredArticle {
        StoredArticle {
            url: url.to_string(),
            title: "Title".to_string(),
            site: Some("Test".to_string()),
            fetched_at: "2025-09-30T10:00:00+00:00".to_string(),
            published_at: None,
            text: "x".repeat(250),
        }
    }

    #[tokio::test]
    async fn test_put_article_uses_content_addressed_layout() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::open(dir.path()).await.unwrap();

        let outcome = store.put_article(&article("https://a.test/story")).await.unwrap();
        let expected = dir
            .path()
            .join("site=a.test")
            .join("20250930")
            .join(format!("{}.json", url_fingerprint("https://a.test/story")));
        assert_eq!(outcome, PutOutcome::Stored(expected.clone()));
        assert!(expected.exists());
        assert!(store.contains("https://a.test/story").await);
    }

    #[tokio::test]
    async fn test_put_article_twice_stores_once() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::open(dir.path()).await.unwrap();

        store.put_article(&article("https://a.test/story")).await.unwrap();
        let second = store.put_article(&article("https://a.test/story")).await.unwrap();
        assert_eq!(second, PutOutcome::AlreadyStored);
        assert_eq!(store.stored_urls().await, vec!["https://a.test/story".to_string()]);
        assert_eq!(store.load_articles().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_index_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = ContentStore::open(dir.path()).await.unwrap();
            store.put_article(&article("https://a.test/1")).await.unwrap();
            store.put_article(&article("https://a.test/2")).await.unwrap();
        }
        let store = ContentStore::open(dir.path()).await.unwrap();
        assert_eq!(
            store.stored_urls().await,
            vec!["https://a.test/1".to_string(), "https://a.test/2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_missing_index_is_rebuilt_from_blobs() {
        let dir = TempDir::new().unwrap();
        {
            let store = ContentStore::open(dir.path()).await.unwrap();
            store.put_article(&article("https://a.test/1")).await.unwrap();
        }
        std::fs::remove_file(dir.path().join(INDEX_FILENAME)).unwrap();

        let store = ContentStore::open(dir.path()).await.unwrap();
        assert!(store.contains("https://a.test/1").await);
        assert!(dir.path().join(INDEX_FILENAME).exists());
    }

    #[tokio::test]
    async fn test_failed_index_persist_rolls_back() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::open(dir.path()).await.unwrap();
        let index_path = dir.path().join(INDEX_FILENAME);
        std::fs::remove_file(&index_path).unwrap();
        std::fs::create_dir_all(index_path.join("blocker")).unwrap();

        let err = store.put_article(&article("https://a.test/story")).await;
        assert!(err.is_err());
        assert!(!store.contains("https://a.test/story").await);
        assert!(store.load_articles().await.unwrap().is_empty());

        std::fs::remove_dir_all(&index_path).unwrap();
        let mut later = article("https://a.test/story");
        later.fetched_at = "2025-10-01T10:00:00+00:00".to_string();
        let outcome = store.put_article(&later).await.unwrap();
        assert!(matches!(outcome, PutOutcome::Stored(_)));
        assert_eq!(store.load_articles().await.unwrap().len(), 1);
        assert_eq!(store.stored_urls().await, vec!["https://a.test/story".to_string()]);
    }

    #[tokio::test]
    async fn test_find_article() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::open(dir.path()).await.unwrap();
        store.put_article(&article("https://a.test/story")).await.unwrap();

        let found = store.find_article("https://a.test/story").await.unwrap();
        assert_eq!(found, article("https://a.test/story"));
        assert!(store.find_article("https://a.test/other").await.is_none());
    }

    #[tokio::test]
    async fn test_summaries_kept_apart_from_articles() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::open(dir.path()).await.unwrap();
        store.put_article(&article("https://a.test/story")).await.unwrap();
        store
            .put_summary(&ArticleSummary {
                url: "https://a.test/story".to_string(),
                title: "Title".to_string(),
                site: None,
                summary: "- one".to_string(),
                categories: vec!["Digital".to_string()],
                topics: vec![],
                summarized_at: Utc::now().to_rfc3339(),
            })
            .await
            .unwrap();

        assert_eq!(store.load_articles().await.unwrap().len(), 1);
        let summaries = store.load_summaries().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].categories, vec!["Digital".to_string()]);
    }

    #[tokio::test]
    async fn test_latest_digest_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::open(dir.path()).await.unwrap();
        assert!(store.load_latest_digest().await.is_none());

        let snapshot = DigestSnapshot {
            digest: "Test digest".to_string(),
            categories: vec![CategoryDigest {
                name: "Category".to_string(),
                slug: "category".to_string(),
                summary: "Details here".to_string(),
            }],
            model: "demo-model".to_string(),
            blob_root: dir.path().display().to_string(),
            stored_at: None,
        };
        let stored = store.store_latest_digest(&snapshot).await.unwrap();
        assert!(stored.stored_at.is_some());

        let loaded = store.load_latest_digest().await.unwrap();
        assert_eq!(loaded, stored);
    }
}
