//! # Retail News
//!
//! An incremental crawler and digest builder for retail industry news. It
//! discovers articles on configured sites, stores each one exactly once in a
//! content-addressed blob store, and condenses the stored corpus into an
//! executive digest through an OpenAI-compatible LLM.
//!
//! ## Usage
//!
//! ```sh
//! retail_news crawl
//! retail_news summarize --category digital
//! retail_news latest
//! ```
//!
//! ## Architecture
//!
//! 1. **Discovery**: page scan or sitemap scan per site ([`discovery`])
//! 2. **Crawl**: root filter, dedup, fetch, extract, store ([`crawler`], [`store`])
//! 3. **Map**: per-article bullet summaries plus keyword tags ([`summarize`], [`classify`])
//! 4. **Reduce**: overall and per-category digests saved as the latest snapshot

use awful_aj::{config::AwfulJadeConfig, config_dir, template};
use clap::Parser;
use serde::Serialize;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod advice;
mod api;
mod classify;
mod cli;
mod config;
mod crawler;
mod discovery;
mod error;
mod extract;
mod fetch;
mod models;
mod publish;
mod store;
mod summarize;
mod utils;

use api::AskFnWrapper;
use cli::{AdviceArgs, Cli, Command, CrawlArgs, LlmArgs, SitesCommand, SummarizeArgs};
use error::ConfigError;
use config::{CategoriesConfig, CrawlSettings, SiteSpec, SitesConfig};
use fetch::{FetchTransport, HeadlessTransport, HttpTransport, Transports};
use models::DigestSnapshot;
use store::ContentStore;
use summarize::{DigestBuilder, SummarizeRequest};
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    debug!(blob_root = %args.blob_root.display(), command = ?args.command, "Parsed CLI arguments");

    publish::init(args.amqp_url.as_ref(), &args.message_bus_exchange).await;
    crate::publish_info!(
        "retail_news",
        event_kind = "application.started",
        version = env!("CARGO_PKG_VERSION"),
        "Application starting"
    );

    match &args.command {
        Command::Crawl(crawl) => run_crawl(&args, crawl).await,
        Command::Urls => {
            let store = ContentStore::open(&args.blob_root).await?;
            print_json(&serde_json::json!({ "urls": store.stored_urls().await }))
        }
        Command::Summarize(summarize) => run_summarize(&args, summarize).await,
        Command::Latest => {
            let store = ContentStore::open(&args.blob_root).await?;
            let snapshot = store.load_latest_digest().await.unwrap_or_else(|| DigestSnapshot {
                blob_root: store.root().display().to_string(),
                ..Default::default()
            });
            print_json(&snapshot)
        }
        Command::Advice(advice) => run_advice(&args, advice).await,
        Command::Sites(sites) => run_sites(&args, sites),
    }
}

fn run_sites(args: &Cli, command: &SitesCommand) -> Result<(), Box<dyn Error>> {
    match command {
        SitesCommand::List => print_json(&SitesConfig::from_file(&args.sites)?),
        SitesCommand::Add(add) => {
            let mut config = if args.sites.exists() {
                SitesConfig::from_file(&args.sites)?
            } else {
                SitesConfig::default()
            };
            config.add_site(SiteSpec {
                name: add.name.clone(),
                url: add.url.clone(),
                root: add.root.clone(),
                topics: add.topics.clone(),
                use_sitemap: add.sitemap_url.is_some(),
                sitemap_url: add.sitemap_url.clone(),
                filter_path: add.filter_path.clone(),
                headless: add.headless,
            })?;
            config.save(&args.sites)?;
            info!(site = %add.name, count = config.sites.len(), "Site added");
            print_json(&config)
        }
        SitesCommand::Remove { url } => {
            let mut config = SitesConfig::from_file(&args.sites)?;
            if config.remove_site(url) {
                config.save(&args.sites)?;
                info!(url = %url, "Site removed");
            } else {
                warn!(url = %url, "No site with this URL is configured");
            }
            print_json(&config)
        }
    }
}

async fn open_store(args: &Cli) -> Result<ContentStore, Box<dyn Error>> {
    if let Err(e) = ensure_writable_dir(&args.blob_root).await {
        error!(
            path = %args.blob_root.display(),
            error = %e,
            "Storage root is not writable (fix perms or choose a different path)"
        );
        crate::publish_error!(
            "retail_news",
            event_kind = "application.failed",
            reason = "storage_not_writable",
            path = args.blob_root.display().to_string(),
            "Application failed: storage root not writable"
        );
        return Err(e);
    }
    Ok(ContentStore::open(&args.blob_root).await?)
}

/// Load a configuration file, reporting failures as fatal.
fn load_config<T>(
    path: &Path,
    load: impl FnOnce(&Path) -> Result<T, ConfigError>,
) -> Result<T, Box<dyn Error>> {
    load(path).map_err(|e| {
        error!(path = %path.display(), error = %e, "Invalid configuration");
        crate::publish_error!(
            "retail_news",
            event_kind = "application.failed",
            reason = "config_invalid",
            path = path.display().to_string(),
            error = e.to_string(),
            "Application failed: invalid configuration"
        );
        e.into()
    })
}

async fn run_crawl(args: &Cli, crawl: &CrawlArgs) -> Result<(), Box<dyn Error>> {
    let sites = load_config(&args.sites, SitesConfig::from_file)?;
    let store = open_store(args).await?;

    let mut settings = CrawlSettings {
        max_links_per_page: crawl.max_links_per_page,
        max_filtered_sitemap_links: crawl.max_sitemap_links,
        site_concurrency: crawl.site_concurrency.max(1),
        ..Default::default()
    };
    settings.blacklist.extend(crawl.blacklist.iter().cloned());

    let headless = crawl
        .browserless_url
        .as_deref()
        .map(|endpoint| HeadlessTransport::new(endpoint, crawl.browserless_token.as_deref()))
        .transpose()?
        .map(FetchTransport::Headless);
    let transports = Transports {
        http: FetchTransport::Http(HttpTransport::new()?),
        headless,
    };

    let report = crawler::crawl_all(&sites.sites, &transports, &store, &settings).await;
    print_json(&report)
}

async fn run_summarize(args: &Cli, summarize: &SummarizeArgs) -> Result<(), Box<dyn Error>> {
    let categories = load_config(&args.categories, CategoriesConfig::from_file)?;
    let source_hosts = if summarize.sources.is_empty() {
        Default::default()
    } else {
        load_config(&args.sites, SitesConfig::from_file)?.hosts_for(&summarize.sources)
    };
    let request = SummarizeRequest {
        category: summarize.category.clone(),
        sources: summarize.sources.clone(),
        source_hosts,
    };

    let store = open_store(args).await?;
    let config = load_llm_config(&summarize.llm)?;
    let article_template = template::load_template(&summarize.llm.article_template).await?;
    let digest_template = template::load_template(&summarize.llm.digest_template).await?;
    info!(
        article_template = %summarize.llm.article_template,
        digest_template = %summarize.llm.digest_template,
        "Loaded templates"
    );

    let builder = DigestBuilder::new(
        AskFnWrapper {
            config: &config,
            template: &article_template,
        },
        AskFnWrapper {
            config: &config,
            template: &digest_template,
        },
        categories,
    )
    .with_concurrency(summarize.concurrency)
    .with_max_input_chars(summarize.max_input_chars);

    crate::publish_info!(
        "retail_news",
        event_kind = "summarize.started",
        model = config.model.clone(),
        category = request.category.clone(),
        sources = request.sources.clone(),
        "Starting summarization"
    );

    match summarize::summarize(&store, &builder, &request).await {
        Ok(snapshot) => {
            info!(categories = snapshot.categories.len(), "Digest ready");
            crate::publish_info!(
                "retail_news",
                event_kind = "summarize.completed",
                categories = snapshot.categories.len(),
                model = snapshot.model.clone(),
                "Summarization completed"
            );
            print_json(&snapshot)
        }
        Err(e) => {
            error!(error = %e, "Summarization failed");
            crate::publish_error!(
                "retail_news",
                event_kind = "summarize.failed",
                error = e.to_string(),
                "Summarization failed"
            );
            Err(e.into())
        }
    }
}

async fn run_advice(args: &Cli, advice: &AdviceArgs) -> Result<(), Box<dyn Error>> {
    let store = ContentStore::open(&args.blob_root).await?;
    let config = load_llm_config(&advice.llm)?;
    let template = template::load_template(&advice.llm.digest_template).await?;
    let llm = AskFnWrapper {
        config: &config,
        template: &template,
    };

    let result =
        advice::category_advice(&store, &llm, &advice.category, advice.prompt.as_deref()).await?;
    print_json(&result)
}

/// Load the awful_aj configuration, applying the `--model` override.
fn load_llm_config(llm: &LlmArgs) -> Result<AwfulJadeConfig, Box<dyn Error>> {
    let config_path = match &llm.llm_config {
        Some(path) => path.clone(),
        None => config_dir()?
            .join("config.yaml")
            .to_string_lossy()
            .into_owned(),
    };
    let mut config = awful_aj::config::load_config(&config_path)?;
    if let Some(model) = &llm.model {
        config.model = model.clone();
    }
    info!(config_path, model = %config.model, "Loaded configuration");
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_surfaces_config_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("sites.json");
        let err = load_config(&missing, SitesConfig::from_file).unwrap_err();
        assert!(err.to_string().contains("not found"));

        let broken = dir.path().join("categories.json");
        std::fs::write(&broken, "{ not json").unwrap();
        let err = load_config(&broken, CategoriesConfig::from_file).unwrap_err();
        assert!(err.to_string().contains("invalid configuration"));
    }

    #[test]
    fn test_load_config_passes_valid_files_through() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sites.json");
        std::fs::write(
            &path,
            r#"{"sites": [{"name": "A", "url": "https://a.test/news"}]}"#,
        )
        .unwrap();
        let sites = load_config(&path, SitesConfig::from_file).unwrap();
        assert_eq!(sites.sites.len(), 1);
    }
}
