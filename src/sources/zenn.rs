use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::error::Result;
use crate::models::Article;

use super::ArticleSource;

const SOURCE_NAME: &str = "Zenn";

/// Serves a fixed pair of sample articles until a real Zenn feed integration exists.
#[derive(Debug, Default)]
pub struct ZennFetcher;

impl ZennFetcher {
    pub fn new() -> Self {
        Self
    }

    fn samples() -> Vec<Article> {
        let now = Utc::now();
        vec![
            Article {
                id: "zenn-sample-1".to_string(),
                title: "Zenn sample article 1".to_string(),
                url: "https://zenn.dev/sample/1".to_string(),
                tags: vec!["Go".to_string(), "Zenn".to_string()],
                likes: 100,
                published_at: now - Duration::hours(24),
                source: SOURCE_NAME.to_string(),
                fetched_at: None,
            },
            Article {
                id: "zenn-sample-2".to_string(),
                title: "Zenn sample article 2 (Python)".to_string(),
                url: "https://zenn.dev/sample/2".to_string(),
                tags: vec!["Python".to_string(), "Zenn".to_string()],
                likes: 50,
                published_at: now - Duration::hours(48),
                source: SOURCE_NAME.to_string(),
                fetched_at: None,
            },
        ]
    }
}

#[async_trait]
impl ArticleSource for ZennFetcher {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch(&self, tag: &str) -> Result<Vec<Article>> {
        tracing::debug!("Fetching Zenn articles for tag '{}' (sample data)", tag);

        let articles = Self::samples()
            .into_iter()
            .filter(|a| tag.is_empty() || a.has_tag(tag))
            .collect();

        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn filters_samples_by_exact_tag() {
        let zenn = ZennFetcher::new();

        let go = zenn.fetch("Go").await.unwrap();
        assert_eq!(go.len(), 1);
        assert_eq!(go[0].id, "zenn-sample-1");
        assert_eq!(go[0].source, "Zenn");

        assert_eq!(zenn.fetch("").await.unwrap().len(), 2);
        assert!(zenn.fetch("go").await.unwrap().is_empty());
        assert!(zenn.fetch("Rust").await.unwrap().is_empty());
    }
}
