//! Command-line interface definitions for Retail News.
//!
//! This module defines the CLI arguments and subcommands using the `clap`
//! crate. Storage, configuration, and service options can be provided via
//! command-line flags or environment variables and apply to every
//! subcommand.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the Retail News application.
///
/// # Examples
///
/// ```sh
/// # Crawl every configured site into ./blobstore
/// retail_news crawl
///
/// # Summarize only two sources and only the Digital category
/// retail_news summarize --source "Retail Dive" --source "Modern Retail" --category digital
///
/// # Ask for guidance on a category of the latest digest
/// retail_news advice supply-chain --prompt "List the three biggest risks."
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Root directory of the content store
    #[arg(long, env = "RETAIL_NEWS_BLOB_ROOT", default_value = "./blobstore", global = true)]
    pub blob_root: PathBuf,

    /// Site configuration file (JSON)
    #[arg(long, env = "RETAIL_NEWS_SITES", default_value = "data/sites.json", global = true)]
    pub sites: PathBuf,

    /// Category taxonomy file (JSON)
    #[arg(long, env = "RETAIL_NEWS_CATEGORIES", default_value = "data/categories.json", global = true)]
    pub categories: PathBuf,

    /// AMQP URL for message bus (optional, enables event publishing when `publish` feature is enabled)
    #[arg(long, env = "AMQP_URL", global = true)]
    pub amqp_url: Option<String>,

    /// Message bus exchange name (only used when `publish` feature is enabled)
    #[arg(long, env = "MESSAGE_BUS_EXCHANGE", default_value = "events", global = true)]
    pub message_bus_exchange: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Crawl every configured site and store new articles
    Crawl(CrawlArgs),
    /// Print the URLs recorded in the dedup index
    Urls,
    /// Summarize stored articles into an overall and per-category digest
    Summarize(SummarizeArgs),
    /// Print the most recently stored digest
    Latest,
    /// Generate strategic guidance for one category of the latest digest
    Advice(AdviceArgs),
    /// Inspect or edit the site configuration
    #[command(subcommand)]
    Sites(SitesCommand),
}

#[derive(Subcommand, Debug)]
pub enum SitesCommand {
    /// Print the configured sites
    List,
    /// Add a site, replacing any existing entry with the same URL
    Add(AddSiteArgs),
    /// Remove the site with this URL
    Remove {
        url: String,
    },
}

#[derive(Args, Debug)]
pub struct AddSiteArgs {
    /// Human readable name of the source
    pub name: String,

    /// Page to scan, or the site a sitemap belongs to
    pub url: String,

    /// Prefix stored articles must live under (defaults to the URL)
    #[arg(long)]
    pub root: Option<String>,

    /// Topic hint (repeatable)
    #[arg(long = "topic")]
    pub topics: Vec<String>,

    /// Discover links from this sitemap instead of scanning the page
    #[arg(long)]
    pub sitemap_url: Option<String>,

    /// Substring sitemap entries must contain
    #[arg(long, requires = "sitemap_url")]
    pub filter_path: Option<String>,

    /// Render pages through the headless browser endpoint
    #[arg(long)]
    pub headless: bool,
}

#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// Links taken from a single scanned page
    #[arg(long, default_value_t = 20)]
    pub max_links_per_page: usize,

    /// Links taken from a sitemap once its path filter applied
    #[arg(long, default_value_t = 4)]
    pub max_sitemap_links: usize,

    /// Extra sitemap URLs to never crawl (repeatable)
    #[arg(long)]
    pub blacklist: Vec<String>,

    /// Sites crawled concurrently
    #[arg(long, default_value_t = 4)]
    pub site_concurrency: usize,

    /// Browserless-compatible endpoint for sites that need rendering
    #[arg(long, env = "BROWSERLESS_URL")]
    pub browserless_url: Option<String>,

    /// Token for the Browserless endpoint
    #[arg(long, env = "BROWSERLESS_TOKEN", hide_env_values = true)]
    pub browserless_token: Option<String>,
}

/// Options for the language model.
#[derive(Args, Debug, Clone)]
pub struct LlmArgs {
    /// Optional path to the awful_aj config.yaml file
    #[arg(long)]
    pub llm_config: Option<String>,

    /// Override the model named in the config file
    #[arg(long, env = "RETAIL_NEWS_MODEL")]
    pub model: Option<String>,

    /// Template used for per-article summaries
    #[arg(long, default_value = "retail_article_summary")]
    pub article_template: String,

    /// Template used for digests and advice
    #[arg(long, default_value = "retail_digest")]
    pub digest_template: String,
}

#[derive(Args, Debug)]
pub struct SummarizeArgs {
    /// Only produce the digest for this category slug
    #[arg(long)]
    pub category: Option<String>,

    /// Only summarize articles from these site names (repeatable)
    #[arg(long = "source")]
    pub sources: Vec<String>,

    /// Summaries requested concurrently
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,

    /// Article characters sent to the model; longer texts are truncated
    #[arg(long, default_value_t = crate::summarize::DEFAULT_MAX_INPUT_CHARS)]
    pub max_input_chars: usize,

    #[command(flatten)]
    pub llm: LlmArgs,
}

#[derive(Args, Debug)]
pub struct AdviceArgs {
    /// Category slug, e.g. `supply-chain`
    pub category: String,

    /// Custom instructions; the default executive prompt when omitted
    #[arg(long)]
    pub prompt: Option<String>,

    #[command(flatten)]
    pub llm: LlmArgs,
}
