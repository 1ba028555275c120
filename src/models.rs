//! Data models for crawled articles and their derived summaries.
//!
//! This module defines the records that flow through the pipeline:
//! - [`StoredArticle`]: an article persisted once by the crawler
//! - [`ArticleSummary`]: the per-article map-stage output
//! - [`CategoryDigest`] and [`DigestSnapshot`]: the reduce-stage output
//! - [`CrawlReport`]: what a crawl invocation hands back to its caller
//!
//! On-disk records use snake_case keys so blobs written by earlier runs of
//! the pipeline stay readable.

use serde::{Deserialize, Serialize};

/// An article persisted in the content store.
///
/// Created the first time a URL is fetched and passes the acceptance
/// threshold. Never updated afterwards.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StoredArticle {
    /// The article URL; unique key across the whole store.
    pub url: String,
    /// The page `<title>`.
    pub title: String,
    /// Name of the configured site this article was discovered from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    /// RFC 3339 UTC timestamp of the fetch.
    pub fetched_at: String,
    /// Best-effort publish date, usually `YYYY-MM-DD`.
    #[serde(default)]
    pub published_at: Option<String>,
    /// Flattened body text.
    pub text: String,
}

/// A discovered URL together with the topics of the site that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLink {
    pub url: String,
    pub topics: Vec<String>,
}

/// Map-stage output for a single article.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ArticleSummary {
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    /// Bullet-point summary returned by the model.
    pub summary: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub summarized_at: String,
}

impl ArticleSummary {
    /// Host of the summarized article, used to apply source allow-lists.
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}

/// Reduce-stage output for one configured category.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CategoryDigest {
    pub name: String,
    pub slug: String,
    pub summary: String,
}

/// The most recent summarization result.
///
/// Overwritten wholesale on every successful summarize run.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct DigestSnapshot {
    /// Overall narrative digest across every selected summary.
    pub digest: String,
    #[serde(default)]
    pub categories: Vec<CategoryDigest>,
    pub model: String,
    pub blob_root: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_at: Option<String>,
}

/// Result of crawling a single site.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SiteCrawlResult {
    /// Site name from the configuration.
    pub site: String,
    /// Existing and newly stored articles for every accepted candidate.
    pub articles: Vec<StoredArticle>,
    /// Number of URLs fetched over the network during this run.
    pub fetched: usize,
    /// Number of candidates short-circuited by the dedup index.
    pub skipped: usize,
    /// Number of fetched pages rejected for being too short.
    pub rejected: usize,
    /// Number of candidates whose fetch failed.
    pub failed: usize,
}

/// A site whose crawl could not run to completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlError {
    pub site: String,
    pub url: String,
    pub error: String,
}

/// Aggregated result of crawling every configured site.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlReport {
    pub sites: Vec<SiteCrawlResult>,
    pub errors: Vec<CrawlError>,
    /// Contents of the dedup index after the crawl.
    pub stored_urls: Vec<String>,
}

/// Model-generated guidance for a single category digest.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryAdvice {
    pub category: CategoryDigest,
    pub prompt: String,
    pub advice: String,
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_article_deserializes_without_optional_fields() {
        let json = r#"{
            "url": "https://example.com/a",
            "title": "A",
            "fetched_at": "2025-09-30 10:00:00",
            "text": "body"
        }"#;

        let article: StoredArticle = serde_json::from_str(json).unwrap();
        assert_eq!(article.site, None);
        assert_eq!(article.published_at, None);
        assert_eq!(article.title, "A");
    }

    #[test]
    fn test_summary_host() {
        let summary = ArticleSummary {
            url: "https://www.retailgazette.co.uk/blog/2025/09/x".to_string(),
            title: "X".to_string(),
            site: None,
            summary: "- point".to_string(),
            categories: vec![],
            topics: vec![],
            summarized_at: String::new(),
        };
        assert_eq!(summary.host().as_deref(), Some("www.retailgazette.co.uk"));
    }

    #[test]
    fn test_snapshot_deserializes_legacy_payload() {
        let json = r#"{
            "digest": "Test digest",
            "blob_root": "/tmp/blobs",
            "model": "demo-model",
            "categories": [{"name": "Category", "slug": "category", "summary": "Details"}],
            "stored_at": "2025-10-01T00:00:00+00:00"
        }"#;

        let snapshot: DigestSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.categories.len(), 1);
        assert_eq!(snapshot.categories[0].slug, "category");
        assert!(snapshot.stored_at.is_some());
    }
}
