//! Sitemap scan: `<loc>` entries of an XML sitemap.

use crate::config::CrawlSettings;
use crate::error::FetchError;
use crate::fetch::{PageFetch, Retrying};
use itertools::Itertools;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const SITEMAP_BASE_DELAY: Duration = Duration::from_millis(500);

/// Fetch a sitemap with backoff and return the selected article links.
#[instrument(level = "info", skip(fetcher, settings))]
pub async fn scan_sitemap<F: PageFetch>(
    fetcher: &F,
    sitemap_url: &str,
    filter_path: Option<&str>,
    settings: &CrawlSettings,
) -> Result<Vec<String>, FetchError> {
    let client = Retrying::new(fetcher, settings.sitemap_attempts, SITEMAP_BASE_DELAY);
    let xml = client.get_text(sitemap_url).await?;

    let locs = parse_sitemap(&xml);
    let total = locs.len();
    let links = select_links(
        locs,
        filter_path,
        &settings.blacklist,
        settings.max_filtered_sitemap_links,
    );
    info!(total, selected = links.len(), "Discovered links from sitemap");
    debug!(urls = ?links, "Sitemap links");
    Ok(links)
}

/// Every `<loc>` value in the document, in order.
///
/// A document that fails to parse yields no links at all.
pub fn parse_sitemap(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut urls = Vec::new();
    let mut current: Option<String> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"loc" => {
                current = Some(String::new());
            }
            Ok(Event::Text(t)) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::GeneralRef(r)) => {
                if let Some(buf) = current.as_mut() {
                    if let Some(ch) = resolve_entity(&String::from_utf8_lossy(&r)) {
                        buf.push(ch);
                    }
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"loc" => {
                if let Some(loc) = current.take() {
                    let loc = loc.trim();
                    if !loc.is_empty() {
                        urls.push(loc.to_string());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(position = reader.error_position(), error = %e, "Malformed sitemap; ignoring it");
                return Vec::new();
            }
        }
    }
    urls
}

fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = name.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}

/// Apply the path filter and blacklist, then cap filtered results.
pub fn select_links(
    locs: Vec<String>,
    filter_path: Option<&str>,
    blacklist: &BTreeSet<String>,
    max_filtered: usize,
) -> Vec<String> {
    let filter = filter_path.filter(|f| !f.is_empty());
    let selected = locs
        .into_iter()
        .filter(|u| filter.is_none_or(|f| u.contains(f)))
        .filter(|u| !blacklist.contains(u))
        .unique();

    match filter {
        Some(_) => selected.take(max_filtered).collect(),
        None => selected.collect(),
    }
}
