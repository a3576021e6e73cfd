use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::config::QiitaConfig;
use crate::error::{AppError, Result};
use crate::models::{normalize_timestamp, Article};

use super::ArticleSource;

const SOURCE_NAME: &str = "Qiita";

#[derive(Debug, Deserialize)]
struct QiitaItem {
    #[serde(default)]
    id: String,
    title: String,
    url: String,
    #[serde(default)]
    likes_count: i64,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    tags: Vec<QiitaTag>,
}

#[derive(Debug, Deserialize)]
struct QiitaTag {
    name: String,
}

impl From<QiitaItem> for Article {
    fn from(item: QiitaItem) -> Self {
        let published_at = normalize_timestamp(&item.created_at, "Qiita created_at");
        Article {
            id: item.id,
            title: item.title,
            url: item.url,
            tags: item.tags.into_iter().map(|t| t.name).collect(),
            likes: item.likes_count,
            published_at,
            source: SOURCE_NAME.to_string(),
            fetched_at: None,
        }
    }
}

/// Popular articles from the Qiita v2 items API.
pub struct QiitaFetcher {
    client: Client,
    items_url: Url,
    per_page: u32,
    access_token: Option<String>,
}

impl QiitaFetcher {
    pub fn new(config: &QiitaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("tech-digest/1.0")
            .build()?;

        let items_url = Url::parse(&config.base_url)
            .and_then(|base| base.join("/api/v2/items"))
            .map_err(|e| AppError::Config(format!("invalid qiita.base_url: {}", e)))?;

        Ok(Self {
            client,
            items_url,
            per_page: config.per_page,
            access_token: config.access_token.clone(),
        })
    }
}

#[async_trait]
impl ArticleSource for QiitaFetcher {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch(&self, tag: &str) -> Result<Vec<Article>> {
        let mut query = vec![
            ("sort", "likes".to_string()),
            ("per_page", self.per_page.to_string()),
        ];
        if !tag.is_empty() {
            query.push(("query", format!("tag:{}", tag)));
        }

        let mut request = self.client.get(self.items_url.clone()).query(&query);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::SourceApi {
                platform: SOURCE_NAME,
                status,
                body,
            });
        }

        let items: Vec<QiitaItem> = response.json().await?;
        let articles: Vec<Article> = items.into_iter().map(Article::from).collect();

        tracing::debug!("Fetched {} Qiita articles for tag '{}'", articles.len(), tag);

        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::zero_timestamp;
    use httpmock::prelude::*;
    use serde_json::json;

    fn fetcher(server: &MockServer, token: Option<&str>) -> QiitaFetcher {
        QiitaFetcher::new(&QiitaConfig {
            base_url: server.base_url(),
            per_page: 5,
            access_token: token.map(String::from),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn maps_items_into_articles() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v2/items")
                    .query_param("sort", "likes")
                    .query_param("per_page", "5")
                    .query_param("query", "tag:Go");
                then.status(200).json_body(json!([
                    {
                        "id": "abc123",
                        "title": "Goroutines in depth",
                        "url": "https://qiita.com/u/items/abc123",
                        "likes_count": 120,
                        "created_at": "2024-05-01T10:00:00+09:00",
                        "tags": [{"name": "Go", "versions": []}, {"name": "Concurrency", "versions": []}]
                    }
                ]));
            })
            .await;

        let articles = fetcher(&server, None).fetch("Go").await.unwrap();

        mock.assert_async().await;
        assert_eq!(articles.len(), 1);
        let a = &articles[0];
        assert_eq!(a.id, "abc123");
        assert_eq!(a.likes, 120);
        assert_eq!(a.tags, vec!["Go", "Concurrency"]);
        assert_eq!(a.source, "Qiita");
        assert_eq!(a.published_at.to_rfc3339(), "2024-05-01T01:00:00+00:00");
        assert_eq!(a.fetched_at, None);
    }

    #[tokio::test]
    async fn bad_timestamp_keeps_the_record() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v2/items");
                then.status(200).json_body(json!([
                    {"id": "x", "title": "t", "url": "https://qiita.com/x", "likes_count": 1, "created_at": "not a date", "tags": []},
                    {"id": "y", "title": "t", "url": "https://qiita.com/y", "likes_count": 2, "created_at": "2024-01-01T00:00:00Z", "tags": []}
                ]));
            })
            .await;

        let articles = fetcher(&server, None).fetch("Go").await.unwrap();

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].published_at, zero_timestamp());
        assert_ne!(articles[1].published_at, zero_timestamp());
    }

    #[tokio::test]
    async fn empty_tag_sends_no_query_and_token_is_forwarded() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v2/items")
                    .query_param_missing("query")
                    .header("authorization", "Bearer secret");
                then.status(200).json_body(json!([]));
            })
            .await;

        let articles = fetcher(&server, Some("secret")).fetch("").await.unwrap();

        mock.assert_async().await;
        assert!(articles.is_empty());
    }

    #[tokio::test]
    async fn non_success_status_is_a_source_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v2/items");
                then.status(403).body("Rate limit exceeded");
            })
            .await;

        let err = fetcher(&server, None).fetch("Go").await.unwrap_err();

        match err {
            AppError::SourceApi { platform, status, body } => {
                assert_eq!(platform, "Qiita");
                assert_eq!(status, 403);
                assert_eq!(body, "Rate limit exceeded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn malformed_payload_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v2/items");
                then.status(200).body("{\"not\": \"a list\"}");
            })
            .await;

        assert!(fetcher(&server, None).fetch("Go").await.is_err());
    }
}
