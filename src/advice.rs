//! Strategic guidance for one category of the latest digest.

use crate::api::AskAsync;
use crate::error::SummarizeError;
use crate::models::{CategoryAdvice, CategoryDigest};
use crate::store::ContentStore;
use crate::utils::slugify;
use tracing::{info, instrument};

pub const DEFAULT_ADVICE_PROMPT: &str = "You are advising the executive team of a large retailer. \
Based on the category digest below, recommend three to five concrete actions for the next quarter. \
For each action, name the opportunity or risk it addresses and how success should be measured.";

/// Ask the model for guidance on the named category of the latest digest.
///
/// `slug` matches a stored category slug or a slugified category name; a
/// blank `prompt` falls back to [`DEFAULT_ADVICE_PROMPT`].
#[instrument(level = "info", skip(store, llm, prompt))]
pub async fn category_advice<A>(
    store: &ContentStore,
    llm: &A,
    slug: &str,
    prompt: Option<&str>,
) -> Result<CategoryAdvice, SummarizeError>
where
    A: AskAsync<Response = String>,
{
    let snapshot = store
        .load_latest_digest()
        .await
        .ok_or(SummarizeError::NoDigest)?;

    let category = find_category(&snapshot.categories, slug)
        .cloned()
        .ok_or_else(|| SummarizeError::UnknownCategory(slug.trim().to_string()))?;

    let prompt = prompt
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_ADVICE_PROMPT)
        .to_string();

    let request = format!(
        "{prompt}\n\nCategory: {}\n\nDigest:\n{}",
        category.name, category.summary
    );
    let advice = llm
        .ask(&request)
        .await
        .map_err(|e| SummarizeError::Service(e.to_string()))?;
    info!(category = %category.name, "Category advice generated");

    Ok(CategoryAdvice {
        category,
        prompt,
        advice,
        model: llm.model().to_string(),
    })
}

fn find_category<'a>(categories: &'a [CategoryDigest], slug: &str) -> Option<&'a CategoryDigest> {
    let wanted = slug.trim().to_lowercase();
    categories
        .iter()
        .find(|c| c.slug.to_lowercase() == wanted || slugify(&c.name) == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DigestSnapshot;
    use crate::summarize::tests::FakeLlm;
    use tempfile::TempDir;

    async fn store_with_digest(dir: &TempDir) -> ContentStore {
        let store = ContentStore::open(dir.path()).await.unwrap();
        store
            .store_latest_digest(&DigestSnapshot {
                digest: "overall".to_string(),
                categories: vec![CategoryDigest {
                    name: "Supply Chain".to_string(),
                    slug: "supply-chain".to_string(),
                    summary: "Ports are congested (https://a.test/ports).".to_string(),
                }],
                model: "fake-model".to_string(),
                blob_root: dir.path().display().to_string(),
                stored_at: None,
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_advice_uses_default_prompt() {
        let dir = TempDir::new().unwrap();
        let store = store_with_digest(&dir).await;
        let llm = FakeLlm::new();

        let advice = category_advice(&store, &llm, " Supply-Chain ", Some("   "))
            .await
            .unwrap();
        assert_eq!(advice.category.slug, "supply-chain");
        assert_eq!(advice.prompt, DEFAULT_ADVICE_PROMPT);
        assert_eq!(advice.model, "fake-model");
        let prompts = llm.prompts.borrow();
        assert!(prompts[0].contains("Ports are congested"));
    }

    #[tokio::test]
    async fn test_advice_custom_prompt() {
        let dir = TempDir::new().unwrap();
        let store = store_with_digest(&dir).await;
        let llm = FakeLlm::new();

        let advice = category_advice(&store, &llm, "supply-chain", Some("List risks only."))
            .await
            .unwrap();
        assert_eq!(advice.prompt, "List risks only.");
        assert!(llm.prompts.borrow()[0].starts_with("List risks only."));
    }

    #[tokio::test]
    async fn test_advice_without_digest() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::open(dir.path()).await.unwrap();
        let err = category_advice(&store, &FakeLlm::new(), "digital", None)
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizeError::NoDigest));
    }

    #[tokio::test]
    async fn test_advice_unknown_category() {
        let dir = TempDir::new().unwrap();
        let store = store_with_digest(&dir).await;
        let err = category_advice(&store, &FakeLlm::new(), "pricing", None)
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizeError::UnknownCategory(ref s) if s == "pricing"));
    }

    #[test]
    fn test_find_category_by_name() {
        let categories = vec![CategoryDigest {
            name: "Store Operations".to_string(),
            slug: String::new(),
            summary: String::new(),
        }];
        assert!(find_category(&categories, "store-operations").is_some());
        assert!(find_category(&categories, "stores").is_none());
    }
}
