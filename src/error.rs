//! Error types for the crawl and summarize stages.

use std::path::PathBuf;
use thiserror::Error;

/// Failure retrieving a page over a transport.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP status {status} fetching {url}")]
    Status { status: u16, url: String },

    #[error("failed to read body of {url}: {message}")]
    Body { url: String, message: String },
}

impl FetchError {
    /// Only rate limiting and server-class responses are worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Missing or invalid configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("site configuration not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid site '{site}': {reason}")]
    InvalidSite { site: String, reason: String },
}

/// A site-level crawl failure. Other sites keep going.
#[derive(Debug, Error)]
pub enum CrawlFailure {
    #[error("link discovery failed: {0}")]
    Discovery(#[from] FetchError),

    #[error("sitemap URL must be provided when useSitemap is true")]
    MissingSitemap,

    #[error("invalid site URL {url}: {message}")]
    InvalidUrl { url: String, message: String },
}

/// Failure of the summarize operation as a whole.
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("summarization service failed: {0}")]
    Service(String),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("no stored summaries are available; generate a summary first")]
    NoDigest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        let status = |status| FetchError::Status {
            status,
            url: "https://example.com/sitemap.xml".to_string(),
        };
        assert!(status(429).is_retryable());
        assert!(status(503).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(
            !FetchError::Network {
                url: "https://example.com".to_string(),
                message: "connection reset".to_string(),
            }
            .is_retryable()
        );
    }
}
