//! Link discovery strategies.
//!
//! Each site is crawled with exactly one strategy, picked from its
//! configuration:
//!
//! | Strategy | Module | Source of links | Retries |
//! |----------|--------|-----------------|---------|
//! | Page scan | [`page`] | same-prefix anchors on the site page | none |
//! | Sitemap scan | [`sitemap`] | `<loc>` entries of an XML sitemap | 429/5xx with backoff |
//!
//! Both cap their fan-out so a huge index page or sitemap cannot turn into
//! an unbounded crawl. Network failures propagate; unparseable documents
//! yield no links.

pub mod page;
pub mod sitemap;

use crate::config::{CrawlSettings, SiteSpec};
use crate::error::{CrawlFailure, FetchError};
use crate::fetch::PageFetch;
use tracing::instrument;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryStrategy {
    PageScan {
        page_url: String,
    },
    SitemapScan {
        sitemap_url: String,
        filter_path: Option<String>,
    },
}

impl DiscoveryStrategy {
    /// Pick the strategy a site is configured for.
    pub fn for_site(site: &SiteSpec) -> Result<Self, CrawlFailure> {
        if !site.use_sitemap {
            return Ok(DiscoveryStrategy::PageScan {
                page_url: site.url.clone(),
            });
        }
        match site.sitemap_url.as_deref().map(str::trim) {
            Some(sitemap_url) if !sitemap_url.is_empty() => Ok(DiscoveryStrategy::SitemapScan {
                sitemap_url: sitemap_url.to_string(),
                filter_path: site.filter_path.clone().filter(|f| !f.is_empty()),
            }),
            _ => Err(CrawlFailure::MissingSitemap),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DiscoveryStrategy::PageScan { .. } => "page",
            DiscoveryStrategy::SitemapScan { .. } => "sitemap",
        }
    }

    #[instrument(level = "info", skip(fetcher, settings), fields(strategy = self.name()))]
    pub async fn discover<F: PageFetch>(
        &self,
        fetcher: &F,
        settings: &CrawlSettings,
    ) -> Result<Vec<String>, FetchError> {
        match self {
            DiscoveryStrategy::PageScan { page_url } => {
                page::scan_page(fetcher, page_url, settings.max_links_per_page).await
            }
            DiscoveryStrategy::SitemapScan {
                sitemap_url,
                filter_path,
            } => sitemap::scan_sitemap(fetcher, sitemap_url, filter_path.as_deref(), settings).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(use_sitemap: bool, sitemap_url: Option<&str>) -> SiteSpec {
        SiteSpec {
            name: "S".to_string(),
            url: "https://a.test/news/".to_string(),
            root: None,
            topics: vec![],
            use_sitemap,
            sitemap_url: sitemap_url.map(str::to_string),
            filter_path: Some("/news/".to_string()),
            headless: false,
        }
    }

    #[test]
    fn test_page_scan_by_default() {
        assert_eq!(
            DiscoveryStrategy::for_site(&site(false, None)).unwrap(),
            DiscoveryStrategy::PageScan {
                page_url: "https://a.test/news/".to_string()
            }
        );
    }

    #[test]
    fn test_sitemap_scan_when_configured() {
        let strategy =
            DiscoveryStrategy::for_site(&site(true, Some("https://a.test/sitemap.xml"))).unwrap();
        assert_eq!(
            strategy,
            DiscoveryStrategy::SitemapScan {
                sitemap_url: "https://a.test/sitemap.xml".to_string(),
                filter_path: Some("/news/".to_string()),
            }
        );
    }

    #[test]
    fn test_sitemap_without_url_fails_fast() {
        assert!(matches!(
            DiscoveryStrategy::for_site(&site(true, None)),
            Err(CrawlFailure::MissingSitemap)
        ));
        assert!(matches!(
            DiscoveryStrategy::for_site(&site(true, Some("  "))),
            Err(CrawlFailure::MissingSitemap)
        ));
    }
}
