//! Page scan: same-prefix anchors on a single page.

use crate::error::FetchError;
use crate::fetch::PageFetch;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Fetch `page_url` (no retry) and return the article links it carries.
#[instrument(level = "info", skip(fetcher))]
pub async fn scan_page<F: PageFetch>(
    fetcher: &F,
    page_url: &str,
    max_links: usize,
) -> Result<Vec<String>, FetchError> {
    let html = fetcher.get_text(page_url).await?;
    let links = extract_page_links(&html, page_url, max_links);
    info!(count = links.len(), "Discovered links from page");
    debug!(urls = ?links, "Page links");
    Ok(links)
}

/// Anchors under the same host and path prefix as `page_url`.
///
/// Fragments are stripped, duplicates removed in document order, the page
/// itself skipped, and at most `max_links` returned.
pub fn extract_page_links(html: &str, page_url: &str, max_links: usize) -> Vec<String> {
    let Ok(base) = Url::parse(page_url) else {
        return Vec::new();
    };
    let prefix = format!("{}/", base.path().trim_end_matches('/'));
    let mut base_no_fragment = base.clone();
    base_no_fragment.set_fragment(None);

    let document = Html::parse_document(html);
    document
        .select(&ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| {
            !(href.is_empty()
                || href.starts_with('#')
                || href.starts_with("javascript:")
                || href.starts_with("mailto:")
                || href.starts_with("tel:"))
        })
        .filter_map(|href| base.join(href).ok())
        .filter(|candidate| matches!(candidate.scheme(), "http" | "https"))
        .filter(|candidate| {
            candidate.host_str() == base.host_str()
                && candidate.port_or_known_default() == base.port_or_known_default()
        })
        .filter(|candidate| candidate.path().starts_with(&prefix))
        .map(|mut candidate| {
            candidate.set_fragment(None);
            candidate
        })
        .filter(|candidate| *candidate != base_no_fragment)
        .map(String::from)
        .unique()
        .take(max_links)
        .collect()
}
