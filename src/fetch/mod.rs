//! Page retrieval transports.
//!
//! Everything that needs a page (link discovery and article fetching) goes
//! through [`PageFetch`], so the crawler never knows whether a page came
//! from a plain HTTP request or a headless browser.
//!
//! | Transport | Module | When |
//! |-----------|--------|------|
//! | Plain HTTP | [`http`] | default |
//! | Headless browser | [`headless`] | sites with `usePlaywright` set |
//!
//! [`retry`] wraps any transport with bounded exponential backoff; only
//! sitemap fetches use it. Sitemaps always travel over plain HTTP, whatever
//! the site's rendering setting.

pub mod headless;
pub mod http;
pub mod retry;

use crate::config::SiteSpec;
use crate::error::FetchError;
use tracing::warn;

pub use headless::HeadlessTransport;
pub use http::HttpTransport;
pub use retry::Retrying;

/// Something that can return the body of a URL.
pub trait PageFetch {
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;
}

impl<T: PageFetch> PageFetch for &T {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        (**self).get_text(url).await
    }
}

/// The closed set of production transports.
#[derive(Debug)]
pub enum FetchTransport {
    Http(HttpTransport),
    Headless(HeadlessTransport),
}

impl PageFetch for FetchTransport {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        match self {
            FetchTransport::Http(t) => t.get_text(url).await,
            FetchTransport::Headless(t) => t.get_text(url).await,
        }
    }
}

/// Transports available to a crawl, chosen once per site.
#[derive(Debug)]
pub struct Transports<F> {
    pub http: F,
    pub headless: Option<F>,
}

impl<F> Transports<F> {
    /// Transport for link discovery. Sitemaps are XML and always go over
    /// plain HTTP; a scanned page is rendered like the site's articles.
    pub fn for_discovery(&self, site: &SiteSpec) -> &F {
        if site.use_sitemap {
            &self.http
        } else {
            self.select(site)
        }
    }

    /// Transport for the site's pages.
    pub fn select(&self, site: &SiteSpec) -> &F {
        match (&self.headless, site.headless) {
            (Some(headless), true) => headless,
            (None, true) => {
                warn!(site = %site.name, "Headless rendering requested but no endpoint configured; using plain HTTP");
                &self.http
            }
            _ => &self.http,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(headless: bool) -> SiteSpec {
        SiteSpec {
            name: "S".to_string(),
            url: "https://a.test/".to_string(),
            root: None,
            topics: vec![],
            use_sitemap: false,
            sitemap_url: None,
            filter_path: None,
            headless,
        }
    }

    #[test]
    fn test_select_prefers_headless_when_requested() {
        let transports = Transports {
            http: "http",
            headless: Some("headless"),
        };
        assert_eq!(*transports.select(&site(true)), "headless");
        assert_eq!(*transports.select(&site(false)), "http");
    }

    #[test]
    fn test_sitemaps_are_discovered_over_http() {
        let transports = Transports {
            http: "http",
            headless: Some("headless"),
        };
        let mut sitemap_site = site(true);
        sitemap_site.use_sitemap = true;
        assert_eq!(*transports.for_discovery(&sitemap_site), "http");
        assert_eq!(*transports.select(&sitemap_site), "headless");
        assert_eq!(*transports.for_discovery(&site(true)), "headless");
    }

    #[test]
    fn test_select_falls_back_to_http() {
        let transports = Transports {
            http: "http",
            headless: None,
        };
        assert_eq!(*transports.select(&site(true)), "http");
    }
}
