//! Keyword classification of summaries into categories and topics.

use crate::config::CategoriesConfig;
use std::collections::BTreeSet;

/// Categories and topics an article matched, sorted and deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub categories: Vec<String>,
    pub topics: Vec<String>,
}

/// Match a summary and its article text against the configured taxonomy.
///
/// A topic matches when any of its keywords (the topic name included)
/// occurs case-insensitively in either text; a category matches when any
/// of its topics does.
pub fn classify(summary: &str, full_text: &str, config: &CategoriesConfig) -> Classification {
    let haystacks = [summary.to_lowercase(), full_text.to_lowercase()];
    let mut categories = BTreeSet::new();
    let mut topics = BTreeSet::new();

    for category in &config.categories {
        for topic in &category.topics {
            let hit = topic.keyword_set().iter().any(|keyword| {
                let needle = keyword.to_lowercase();
                haystacks.iter().any(|h| h.contains(&needle))
            });
            if hit {
                categories.insert(category.name.clone());
                topics.insert(topic.name.clone());
            }
        }
    }

    Classification {
        categories: categories.into_iter().collect(),
        topics: topics.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CategoryConfig, TopicConfig};

    fn taxonomy() -> CategoriesConfig {
        CategoriesConfig {
            categories: vec![
                CategoryConfig {
                    name: "Digital".to_string(),
                    topics: vec![TopicConfig {
                        name: "E-commerce".to_string(),
                        keywords: vec!["online sales".to_string()],
                    }],
                },
                CategoryConfig {
                    name: "Stores".to_string(),
                    topics: vec![TopicConfig {
                        name: "Operations".to_string(),
                        keywords: vec![],
                    }],
                },
            ],
        }
    }

    #[test]
    fn test_matches_summary_and_full_text() {
        let result = classify(
            "Retailer reports booming online sales in Q4",
            "Stores improved operations",
            &taxonomy(),
        );
        assert_eq!(result.categories, vec!["Digital", "Stores"]);
        assert_eq!(result.topics, vec!["E-commerce", "Operations"]);
    }

    #[test]
    fn test_no_match_is_empty() {
        let result = classify("Quarterly earnings", "Nothing relevant", &taxonomy());
        assert_eq!(result, Classification::default());
    }

    #[test]
    fn test_duplicate_topic_names_collapse() {
        let mut config = taxonomy();
        config.categories.push(CategoryConfig {
            name: "Digital".to_string(),
            topics: vec![TopicConfig {
                name: "E-commerce".to_string(),
                keywords: vec!["ONLINE".to_string()],
            }],
        });
        let result = classify("Online sales jump", "", &config);
        assert_eq!(result.categories, vec!["Digital"]);
        assert_eq!(result.topics, vec!["E-commerce"]);
    }

    #[test]
    fn test_empty_taxonomy() {
        let result = classify("online sales", "operations", &CategoriesConfig::default());
        assert!(result.categories.is_empty());
        assert!(result.topics.is_empty());
    }
}
