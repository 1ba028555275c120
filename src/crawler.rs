//! Crawl orchestration: discovery, root filtering, dedup, fetch and store.
//!
//! Each site moves through `Discovering -> Filtering -> per-URL -> Done`.
//! Sites run concurrently on a bounded pool; URLs within one site are
//! processed one after another. A URL already in the dedup index is never
//! fetched again, and a failed URL never aborts its site.

use crate::config::{CrawlSettings, SiteSpec};
use crate::discovery::DiscoveryStrategy;
use crate::error::CrawlFailure;
use crate::extract::extract_article;
use crate::fetch::{PageFetch, Transports};
use crate::models::{CandidateLink, CrawlError, CrawlReport, SiteCrawlResult, StoredArticle};
use crate::store::{ContentStore, PutOutcome};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

enum UrlOutcome {
    /// Already in the index; carries the stored blob when it was readable.
    Skipped(Option<StoredArticle>),
    Stored(StoredArticle),
    Rejected,
    FetchFailed,
    StoreFailed,
}

/// Whether `candidate` lives on the same host and port as `root`, at or
/// below its path.
pub fn within_root(candidate: &str, root: &Url) -> bool {
    let Ok(url) = Url::parse(candidate) else {
        return false;
    };
    if url.host_str() != root.host_str()
        || url.port_or_known_default() != root.port_or_known_default()
    {
        return false;
    }
    let root_path = root.path().trim_end_matches('/');
    if root_path.is_empty() {
        return true;
    }
    let path = url.path();
    path.trim_end_matches('/') == root_path || path.starts_with(&format!("{root_path}/"))
}

/// Crawl one site to completion.
///
/// Discovery failures and configuration problems fail the site; anything
/// that goes wrong with an individual URL is logged and counted instead.
#[instrument(level = "info", skip_all, fields(site = %site.name))]
pub async fn crawl_site<F: PageFetch>(
    site: &SiteSpec,
    transports: &Transports<F>,
    store: &ContentStore,
    settings: &CrawlSettings,
) -> Result<SiteCrawlResult, CrawlFailure> {
    let strategy = DiscoveryStrategy::for_site(site)?;
    let root = Url::parse(site.allowed_root()).map_err(|e| CrawlFailure::InvalidUrl {
        url: site.allowed_root().to_string(),
        message: e.to_string(),
    })?;

    let discovered = strategy
        .discover(transports.for_discovery(site), settings)
        .await?;
    let total = discovered.len();
    let candidates: Vec<CandidateLink> = discovered
        .into_iter()
        .filter(|url| within_root(url, &root))
        .map(|url| CandidateLink {
            url,
            topics: site.topics.clone(),
        })
        .collect();
    info!(
        strategy = strategy.name(),
        discovered = total,
        in_scope = candidates.len(),
        "Filtered candidate links"
    );

    let mut result = SiteCrawlResult {
        site: site.name.clone(),
        ..Default::default()
    };
    let fetcher = transports.select(site);
    for candidate in &candidates {
        match process_candidate(site, candidate, fetcher, store).await {
            UrlOutcome::Skipped(existing) => {
                result.skipped += 1;
                result.articles.extend(existing);
            }
            UrlOutcome::Stored(article) => {
                result.fetched += 1;
                result.articles.push(article);
            }
            UrlOutcome::Rejected => {
                result.fetched += 1;
                result.rejected += 1;
            }
            UrlOutcome::FetchFailed => result.failed += 1,
            UrlOutcome::StoreFailed => {
                result.fetched += 1;
                result.failed += 1;
            }
        }
    }

    info!(
        articles = result.articles.len(),
        fetched = result.fetched,
        skipped = result.skipped,
        rejected = result.rejected,
        failed = result.failed,
        "Site crawl complete"
    );
    Ok(result)
}

async fn process_candidate<F: PageFetch>(
    site: &SiteSpec,
    candidate: &CandidateLink,
    fetcher: &F,
    store: &ContentStore,
) -> UrlOutcome {
    let url = candidate.url.as_str();
    if store.contains(url).await {
        debug!(url, "Already stored; skipping fetch");
        return UrlOutcome::Skipped(store.find_article(url).await);
    }

    debug!(url, topics = ?candidate.topics, "Fetching article");
    let html = match fetcher.get_text(url).await {
        Ok(html) => html,
        Err(e) => {
            warn!(url, error = %e, "Failed to fetch article");
            return UrlOutcome::FetchFailed;
        }
    };

    let page = extract_article(&html);
    if !page.is_acceptable() {
        debug!(url, chars = page.text.chars().count(), "Article text below threshold; rejecting");
        return UrlOutcome::Rejected;
    }

    let title = if page.title.is_empty() {
        url.to_string()
    } else {
        page.title
    };
    let article = StoredArticle {
        url: url.to_string(),
        title,
        site: Some(site.name.clone()),
        fetched_at: Utc::now().to_rfc3339(),
        published_at: page.published_at,
        text: page.text,
    };

    match store.put_article(&article).await {
        Ok(PutOutcome::Stored(path)) => {
            info!(url, path = %path.display(), published_at = ?article.published_at, "Stored article");
            UrlOutcome::Stored(article)
        }
        Ok(PutOutcome::AlreadyStored) => {
            debug!(url, "Stored concurrently by another site");
            UrlOutcome::Stored(article)
        }
        Err(e) => {
            warn!(url, error = %e, "Failed to store article");
            UrlOutcome::StoreFailed
        }
    }
}

/// Crawl every site and collect successes and failures side by side.
///
/// Never fails as a whole: a site that cannot be crawled becomes an entry in
/// [`CrawlReport::errors`]. Results keep the order of `sites`.
#[instrument(level = "info", skip_all, fields(sites = sites.len()))]
pub async fn crawl_all<F: PageFetch>(
    sites: &[SiteSpec],
    transports: &Transports<F>,
    store: &ContentStore,
    settings: &CrawlSettings,
) -> CrawlReport {
    let before = store.stored_urls().await.len();
    info!(concurrency = settings.site_concurrency, indexed = before, "Starting crawl");
    crate::publish_info!(
        "retail_news",
        event_kind = "crawl.started",
        sites = sites.len(),
        concurrency = settings.site_concurrency,
        "Starting crawl"
    );

    let mut outcomes: Vec<(usize, Result<SiteCrawlResult, CrawlFailure>)> =
        stream::iter(sites.iter().enumerate())
            .map(|(i, site)| async move { (i, crawl_site(site, transports, store, settings).await) })
            .buffer_unordered(settings.site_concurrency.max(1))
            .collect()
            .await;
    outcomes.sort_by_key(|(i, _)| *i);

    let mut report = CrawlReport::default();
    for (i, outcome) in outcomes {
        let site = &sites[i];
        match outcome {
            Ok(result) => report.sites.push(result),
            Err(e) => {
                error!(site = %site.name, url = %site.url, error = %e, "Site crawl failed");
                crate::publish_error!(
                    "retail_news",
                    event_kind = "crawl.site.failed",
                    site = site.name.clone(),
                    error = e.to_string(),
                    "Site crawl failed"
                );
                report.errors.push(CrawlError {
                    site: site.name.clone(),
                    url: site.url.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
    report.stored_urls = store.stored_urls().await;

    let new_articles = report.stored_urls.len().saturating_sub(before);
    info!(
        succeeded = report.sites.len(),
        failed = report.errors.len(),
        new_articles,
        stored_urls = report.stored_urls.len(),
        "Crawl complete"
    );
    crate::publish_info!(
        "retail_news",
        event_kind = "crawl.completed",
        succeeded = report.sites.len(),
        failed = report.errors.len(),
        new_articles = new_articles,
        stored_urls = report.stored_urls.len(),
        "Crawl completed"
    );
    report
}
