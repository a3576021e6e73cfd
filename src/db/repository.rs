use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use crate::error::Result;
use crate::models::{Article, User};

use super::documents::DocumentDb;
use super::schema::{ARTICLES, USERS};

#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Merge every article into the document under its key, as one atomic batch.
    /// Returns the number of distinct documents written.
    async fn upsert_many(&self, articles: Vec<Article>) -> Result<usize>;

    /// Up to `limit` articles by likes, descending. An empty `tag` matches everything.
    async fn query_by_tag(&self, tag: &str, limit: usize) -> Result<Vec<Article>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// `None` when the user has never saved any tags.
    async fn get(&self, user_id: &str) -> Result<Option<User>>;

    async fn set_tags(&self, user_id: &str, tags: Vec<String>) -> Result<User>;
}

#[derive(Clone)]
pub struct DocumentArticleRepository {
    db: DocumentDb,
}

impl DocumentArticleRepository {
    pub fn new(db: DocumentDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ArticleRepository for DocumentArticleRepository {
    async fn upsert_many(&self, articles: Vec<Article>) -> Result<usize> {
        let mut docs = Vec::with_capacity(articles.len());
        for article in articles {
            let Some(key) = article.key().map(str::to_string) else {
                tracing::warn!("Skipping {} article '{}' with no id or url", article.source, article.title);
                continue;
            };
            docs.push((key, serde_json::to_value(&article)?));
        }

        self.db.merge_many(ARTICLES, docs).await
    }

    async fn query_by_tag(&self, tag: &str, limit: usize) -> Result<Vec<Article>> {
        let docs = self.db.query_tagged(ARTICLES, tag, limit).await?;

        let mut skipped = 0usize;
        let articles: Vec<Article> = docs
            .into_iter()
            .filter_map(|(id, data)| match serde_json::from_str::<Article>(&data) {
                Ok(article) => Some(article),
                Err(e) => {
                    tracing::debug!("Unreadable article document {}: {}", id, e);
                    skipped += 1;
                    None
                }
            })
            .collect();

        if skipped > 0 {
            tracing::warn!("Skipped {} unreadable article documents", skipped);
        }

        Ok(articles)
    }
}

#[derive(Clone)]
pub struct DocumentUserRepository {
    db: DocumentDb,
}

impl DocumentUserRepository {
    pub fn new(db: DocumentDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for DocumentUserRepository {
    async fn get(&self, user_id: &str) -> Result<Option<User>> {
        let Some(doc) = self.db.get(USERS, user_id).await? else {
            return Ok(None);
        };

        let mut user: User = serde_json::from_value(doc)?;
        user.id = user_id.to_string();
        Ok(Some(user))
    }

    async fn set_tags(&self, user_id: &str, tags: Vec<String>) -> Result<User> {
        let patch = json!({
            "tags": tags,
            "updatedAt": Utc::now(),
        });

        let doc = self.db.merge(USERS, user_id, patch).await?;

        let mut user: User = serde_json::from_value(doc)?;
        user.id = user_id.to_string();
        Ok(user)
    }
}
