use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};

use crate::db::ArticleRepository;
use crate::error::Result;
use crate::models::Article;
use crate::sources::ArticleSource;

pub const DEFAULT_LIMIT: usize = 15;
pub const MAX_LIMIT: usize = 30;

const MAX_CONCURRENT_FETCHES: usize = 4;

/// Parse a caller-supplied result limit. Anything missing, non-numeric or outside
/// `1..=MAX_LIMIT` becomes [`DEFAULT_LIMIT`].
pub fn clamp_limit(raw: Option<&str>) -> usize {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|l| (1..=MAX_LIMIT).contains(l))
        .unwrap_or(DEFAULT_LIMIT)
}

/// Outcome of one ingestion pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestReport {
    pub tags: usize,
    pub persisted: usize,
    pub failed_fetches: usize,
}

pub struct ArticleService {
    repo: Arc<dyn ArticleRepository>,
    sources: Vec<Arc<dyn ArticleSource>>,
}

impl ArticleService {
    pub fn new(repo: Arc<dyn ArticleRepository>, sources: Vec<Arc<dyn ArticleSource>>) -> Self {
        Self { repo, sources }
    }

    /// Fetch every tag from every source and persist the combined batch in one write.
    ///
    /// A source failing for a tag only loses that contribution; the pass fails only when the
    /// final write does.
    pub async fn ingest_all(&self, tags: &[String]) -> Result<IngestReport> {
        let fetched_at = Utc::now();

        // Futures are built up front from owned jobs so the whole pass stays `Send` when spawned.
        let fetches: Vec<_> = tags
            .iter()
            .flat_map(|tag| self.sources.iter().map(move |source| (tag.clone(), Arc::clone(source))))
            .map(|(tag, source)| async move {
                let result = source.fetch(&tag).await;
                (tag, source.name(), result)
            })
            .collect();

        // `buffered` keeps results in job order, so later duplicates still merge over earlier ones.
        let results: Vec<_> = stream::iter(fetches)
            .buffered(MAX_CONCURRENT_FETCHES)
            .collect()
            .await;

        let mut batch: Vec<Article> = Vec::new();
        let mut failed_fetches = 0;
        for (tag, source, result) in results {
            match result {
                Ok(articles) => {
                    tracing::debug!("{} returned {} articles for tag '{}'", source, articles.len(), tag);
                    batch.extend(articles);
                }
                Err(e) => {
                    tracing::warn!("Error fetching {} articles for tag '{}': {}", source, tag, e);
                    failed_fetches += 1;
                }
            }
        }

        for article in &mut batch {
            article.fetched_at = Some(fetched_at);
        }

        let persisted = self.repo.upsert_many(batch).await.map_err(|e| {
            tracing::error!("Failed to save articles: {}", e);
            e
        })?;

        tracing::info!(
            "Ingested {} articles for {} tags ({} failed fetches)",
            persisted,
            tags.len(),
            failed_fetches
        );

        Ok(IngestReport {
            tags: tags.len(),
            persisted,
            failed_fetches,
        })
    }

    /// Read from the cache only; never triggers a fetch.
    pub async fn list_articles(&self, tag: &str, limit: usize) -> Result<Vec<Article>> {
        self.repo.query_by_tag(tag, limit).await
    }
}
