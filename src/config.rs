//! Site, category, and crawl configuration.
//!
//! Site and category lists are JSON documents maintained outside this
//! tool. A missing or malformed site list is fatal to the operation that
//! needs it; a missing category list simply means no categories.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, instrument, warn};
use url::Url;

/// A crawl target.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SiteSpec {
    /// Human readable name of the source.
    pub name: String,
    /// Page to scan, or the site the sitemap belongs to.
    pub url: String,
    /// Prefix every stored article must live under. Defaults to `url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    /// Keyword hints carried with each candidate link.
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default, rename = "useSitemap", alias = "use_sitemap")]
    pub use_sitemap: bool,
    #[serde(
        default,
        rename = "sitemapURL",
        alias = "sitemap_url",
        alias = "sitemapUrl",
        skip_serializing_if = "Option::is_none"
    )]
    pub sitemap_url: Option<String>,
    /// Substring every sitemap entry must contain.
    #[serde(
        default,
        rename = "filterPath",
        alias = "filter_path",
        skip_serializing_if = "Option::is_none"
    )]
    pub filter_path: Option<String>,
    /// Render pages through the headless browser endpoint.
    #[serde(
        default,
        rename = "usePlaywright",
        alias = "use_playwright",
        alias = "headless"
    )]
    pub headless: bool,
}

impl SiteSpec {
    /// The allowed-article prefix for this site.
    pub fn allowed_root(&self) -> &str {
        self.root.as_deref().unwrap_or(&self.url)
    }

    /// Host of the site's root URL.
    pub fn host(&self) -> Option<String> {
        Url::parse(self.allowed_root())
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidSite {
            site: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty".to_string()));
        }
        let parsed = Url::parse(&self.url).map_err(|e| invalid(format!("url: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!("url must be http(s), got {}", self.url)));
        }
        if let Some(root) = &self.root {
            Url::parse(root).map_err(|e| invalid(format!("root: {e}")))?;
        }
        if let Some(sitemap) = &self.sitemap_url {
            if !sitemap.is_empty() {
                Url::parse(sitemap).map_err(|e| invalid(format!("sitemapURL: {e}")))?;
            }
        }
        Ok(())
    }
}

/// The full list of crawl targets.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SitesConfig {
    #[serde(default)]
    pub sites: Vec<SiteSpec>,
}

impl SitesConfig {
    /// Load and validate the site list. Fails fast when the file is absent.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: SitesConfig =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        for site in &config.sites {
            site.validate()?;
        }
        info!(count = config.sites.len(), "Loaded site configuration");
        Ok(config)
    }

    /// Write the site list as pretty JSON, creating parent directories.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let raw = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, raw).map_err(io_err)?;
        info!(count = self.sites.len(), "Saved site configuration");
        Ok(())
    }

    /// Add a site, replacing any existing entry with the same URL.
    pub fn add_site(&mut self, site: SiteSpec) -> Result<(), ConfigError> {
        site.validate()?;
        self.sites.retain(|s| s.url != site.url);
        self.sites.push(site);
        Ok(())
    }

    /// Remove every site with the given URL. Returns whether any was removed.
    pub fn remove_site(&mut self, url: &str) -> bool {
        let before = self.sites.len();
        self.sites.retain(|s| s.url != url);
        self.sites.len() != before
    }

    /// Hosts of the named sites, for source allow-lists.
    pub fn hosts_for(&self, names: &[String]) -> BTreeSet<String> {
        self.sites
            .iter()
            .filter(|s| names.iter().any(|n| n.eq_ignore_ascii_case(&s.name)))
            .filter_map(SiteSpec::host)
            .collect()
    }
}

/// A topic and the keywords that identify it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TopicConfig {
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl TopicConfig {
    /// The topic name plus every explicit keyword, blanks dropped.
    pub fn keyword_set(&self) -> BTreeSet<String> {
        std::iter::once(&self.name)
            .chain(self.keywords.iter())
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CategoryConfig {
    pub name: String,
    #[serde(default)]
    pub topics: Vec<TopicConfig>,
}

/// The two-level category/topic taxonomy.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CategoriesConfig {
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
}

impl CategoriesConfig {
    /// Load the taxonomy. A missing file yields an empty configuration.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            warn!("Category configuration not found; no categories configured");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: CategoriesConfig =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        info!(count = config.categories.len(), "Loaded category configuration");
        Ok(config)
    }
}

/// Sitemap URLs never worth crawling, whatever the site.
pub const DEFAULT_BLACKLIST: &[&str] = &[
    "https://www.mckinsey.com/industries/retail/our-insights/",
    "https://www.mckinsey.com/industries/retail/our-insights/all-insights",
];

/// Runtime knobs for link discovery and crawl fan-out.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Links taken from a single scanned page.
    pub max_links_per_page: usize,
    /// Links taken from a sitemap once a `filterPath` was applied.
    pub max_filtered_sitemap_links: usize,
    /// Exact URLs dropped from sitemap results.
    pub blacklist: BTreeSet<String>,
    /// Sites crawled at the same time.
    pub site_concurrency: usize,
    /// Attempts for a sitemap fetch, including the first one.
    pub sitemap_attempts: usize,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            max_links_per_page: 20,
            max_filtered_sitemap_links: 4,
            blacklist: DEFAULT_BLACKLIST.iter().map(|s| s.to_string()).collect(),
            site_concurrency: 4,
            sitemap_attempts: 3,
        }
    }
}
