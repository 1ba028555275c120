//! Map-reduce summarization of stored articles into executive digests.
//!
//! # Stages
//!
//! 1. **Map**: every stored article without a summary is summarized into
//!    bullet points, classified, and persisted right away, so a failure
//!    halfway through keeps the summaries already produced.
//! 2. **Reduce (overall)**: all selected summaries become one narrative
//!    digest with source URL citations.
//! 3. **Reduce (per category)**: the same reduction over each category's
//!    summaries; a category without articles gets [`NO_CATEGORY_UPDATES`].
//!
//! Any model failure aborts the operation; nothing is retried here.

use crate::api::AskAsync;
use crate::classify::classify;
use crate::config::CategoriesConfig;
use crate::error::SummarizeError;
use crate::models::{ArticleSummary, CategoryDigest, DigestSnapshot, StoredArticle};
use crate::store::ContentStore;
use crate::utils::{slugify, truncate_chars, truncate_for_log};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use std::collections::{BTreeSet, HashMap};
use std::fmt::Write;
use tracing::{debug, info, instrument, warn};

pub const NO_SUMMARIES: &str = "No summaries available.";
pub const NO_CATEGORY_UPDATES: &str = "No updates available for this category yet.";

/// Characters of article text sent to the model.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 4000;
const DEFAULT_CONCURRENCY: usize = 4;

/// Which slice of the store a summarize run covers.
#[derive(Debug, Clone, Default)]
pub struct SummarizeRequest {
    /// Only produce the digest for this category slug.
    pub category: Option<String>,
    /// Site names to restrict to; empty means every source.
    pub sources: Vec<String>,
    /// Hosts of the named sites.
    pub source_hosts: BTreeSet<String>,
}

impl SummarizeRequest {
    fn allows(&self, site: Option<&str>, host: Option<String>) -> bool {
        if self.sources.is_empty() {
            return true;
        }
        site.is_some_and(|s| self.sources.iter().any(|n| n.eq_ignore_ascii_case(s)))
            || host.is_some_and(|h| self.source_hosts.contains(&h))
    }
}

pub struct DigestBuilder<A> {
    article_llm: A,
    digest_llm: A,
    categories: CategoriesConfig,
    max_input_chars: usize,
    concurrency: usize,
}

impl<A> DigestBuilder<A>
where
    A: AskAsync<Response = String>,
{
    pub fn new(article_llm: A, digest_llm: A, categories: CategoriesConfig) -> Self {
        Self {
            article_llm,
            digest_llm,
            categories,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_max_input_chars(mut self, max: usize) -> Self {
        self.max_input_chars = max;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn model(&self) -> &str {
        self.digest_llm.model()
    }

    /// Summarize and classify one article.
    #[instrument(level = "info", skip_all, fields(url = %article.url))]
    pub async fn summarize_article(
        &self,
        article: &StoredArticle,
    ) -> Result<ArticleSummary, SummarizeError> {
        let prompt = article_prompt(article, self.max_input_chars);
        let summary = self
            .article_llm
            .ask(&prompt)
            .await
            .map_err(|e| SummarizeError::Service(e.to_string()))?;
        debug!(response = %truncate_for_log(&summary, 300), "Article summarized");

        let tags = classify(&summary, &article.text, &self.categories);
        Ok(ArticleSummary {
            url: article.url.clone(),
            title: article.title.clone(),
            site: article.site.clone(),
            summary,
            categories: tags.categories,
            topics: tags.topics,
            summarized_at: Utc::now().to_rfc3339(),
        })
    }

    /// Map stage. Returns every summary in scope, existing and new.
    #[instrument(level = "info", skip_all)]
    pub async fn map_articles(
        &self,
        store: &ContentStore,
        request: &SummarizeRequest,
    ) -> Result<Vec<ArticleSummary>, SummarizeError> {
        let articles: Vec<StoredArticle> = store
            .load_articles()
            .await?
            .into_iter()
            .filter(|a| request.allows(a.site.as_deref(), host_of(&a.url)))
            .unique_by(|a| a.url.clone())
            .collect();
        let texts: HashMap<&str, &str> = articles
            .iter()
            .map(|a| (a.url.as_str(), a.text.as_str()))
            .collect();

        // Re-tag existing summaries so taxonomy edits apply without re-summarizing.
        let mut summaries: Vec<ArticleSummary> = Vec::new();
        let mut summarized: BTreeSet<String> = BTreeSet::new();
        for mut summary in store.load_summaries().await? {
            if !request.allows(summary.site.as_deref(), summary.host())
                || !summarized.insert(summary.url.clone())
            {
                continue;
            }
            let text = texts.get(summary.url.as_str()).copied().unwrap_or_default();
            let tags = classify(&summary.summary, text, &self.categories);
            summary.categories = tags.categories;
            summary.topics = tags.topics;
            summaries.push(summary);
        }

        let pending: Vec<&StoredArticle> = articles
            .iter()
            .filter(|a| !summarized.contains(&a.url))
            .collect();
        info!(
            stored = articles.len(),
            existing = summaries.len(),
            pending = pending.len(),
            concurrency = self.concurrency,
            "Starting map stage"
        );

        let mut results = stream::iter(pending)
            .map(|article| self.summarize_article(article))
            .buffer_unordered(self.concurrency);

        while let Some(result) = results.next().await {
            let summary = result?;
            if let Err(e) = store.put_summary(&summary).await {
                warn!(url = %summary.url, error = %e, "Failed to persist summary");
            }
            summaries.push(summary);
        }

        summaries.sort_by(|a, b| a.url.cmp(&b.url));
        info!(count = summaries.len(), "Map stage complete");
        Ok(summaries)
    }

    /// Reduce a set of summaries into one narrative digest.
    #[instrument(level = "info", skip_all, fields(count = summaries.len(), scope = scope.unwrap_or("overall")))]
    pub async fn reduce(
        &self,
        summaries: &[&ArticleSummary],
        scope: Option<&str>,
    ) -> Result<String, SummarizeError> {
        let prompt = digest_prompt(summaries, scope);
        self.digest_llm
            .ask(&prompt)
            .await
            .map_err(|e| SummarizeError::Service(e.to_string()))
    }

    /// Overall digest, or [`NO_SUMMARIES`] when there is nothing to reduce.
    pub async fn overall_digest(
        &self,
        summaries: &[ArticleSummary],
    ) -> Result<String, SummarizeError> {
        if summaries.is_empty() {
            return Ok(NO_SUMMARIES.to_string());
        }
        let all: Vec<&ArticleSummary> = summaries.iter().collect();
        self.reduce(&all, None).await
    }

    /// One digest per configured category, optionally only `only_slug`.
    pub async fn category_digests(
        &self,
        summaries: &[ArticleSummary],
        only_slug: Option<&str>,
    ) -> Result<Vec<CategoryDigest>, SummarizeError> {
        let mut digests = Vec::new();
        for category in &self.categories.categories {
            let slug = slugify(&category.name);
            if only_slug.is_some_and(|wanted| wanted != slug) {
                continue;
            }
            let matching: Vec<&ArticleSummary> = summaries
                .iter()
                .filter(|s| s.categories.iter().any(|c| c == &category.name))
                .collect();

            let summary = if matching.is_empty() {
                NO_CATEGORY_UPDATES.to_string()
            } else {
                self.reduce(&matching, Some(&category.name)).await?
            };
            info!(category = %category.name, articles = matching.len(), "Category digest ready");
            digests.push(CategoryDigest {
                name: category.name.clone(),
                slug,
                summary,
            });
        }
        Ok(digests)
    }

    fn resolve_category(&self, slug: &str) -> Result<String, SummarizeError> {
        let wanted = slug.trim().to_lowercase();
        self.categories
            .categories
            .iter()
            .map(|c| slugify(&c.name))
            .find(|s| *s == wanted || *s == slugify(&wanted))
            .ok_or_else(|| SummarizeError::UnknownCategory(slug.to_string()))
    }
}

/// Run the whole summarize operation and persist the snapshot.
#[instrument(level = "info", skip_all, fields(category = ?request.category, sources = ?request.sources))]
pub async fn summarize<A>(
    store: &ContentStore,
    builder: &DigestBuilder<A>,
    request: &SummarizeRequest,
) -> Result<DigestSnapshot, SummarizeError>
where
    A: AskAsync<Response = String>,
{
    let only_slug = request
        .category
        .as_deref()
        .map(|slug| builder.resolve_category(slug))
        .transpose()?;

    let summaries = builder.map_articles(store, request).await?;
    let digest = builder.overall_digest(&summaries).await?;
    let categories = builder
        .category_digests(&summaries, only_slug.as_deref())
        .await?;

    let snapshot = DigestSnapshot {
        digest,
        categories,
        model: builder.model().to_string(),
        blob_root: store.root().display().to_string(),
        stored_at: None,
    };
    match store.store_latest_digest(&snapshot).await {
        Ok(stamped) => Ok(stamped),
        Err(e) => {
            warn!(error = %e, "Failed to store latest digest");
            Ok(snapshot)
        }
    }
}

fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

fn article_prompt(article: &StoredArticle, max_chars: usize) -> String {
    let title = if article.title.trim().is_empty() {
        "(untitled)"
    } else {
        article.title.trim()
    };
    format!(
        "Summarize the following article into 3-5 short bullet points focusing on key facts \
and implications for retail executives.\n\nTitle: {title}\n\nContent:\n{content}",
        content = truncate_chars(&article.text, max_chars),
    )
}

fn digest_prompt(summaries: &[&ArticleSummary], scope: Option<&str>) -> String {
    let mut blocks = String::new();
    for summary in summaries {
        let _ = write!(
            blocks,
            "Title: {}\nSource: {}\n{}\n\n",
            summary.title, summary.url, summary.summary
        );
    }
    let scope = scope
        .map(|name| format!(" in the \"{name}\" category"))
        .unwrap_or_default();
    format!(
        "Using the following bullet-point summaries from recent retail news{scope}, produce a \
cohesive digest that highlights key themes, risks, and opportunities for retail executives. \
Keep it concise and action-oriented. Every fact you state must cite its source URL in \
parentheses, and only the source URLs listed below may be cited.\n\nSummaries:\n{}",
        blocks.trim_end()
    )
}
