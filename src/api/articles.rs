use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::models::Article;
use crate::services::clamp_limit;

use super::{error::ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct ArticlesQuery {
    tag: Option<String>,
    // Kept as text so a bad value falls back to the default instead of rejecting the request.
    limit: Option<String>,
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ArticlesQuery>,
) -> Result<Json<Vec<Article>>, ApiError> {
    let limit = clamp_limit(params.limit.as_deref());
    let tag = params.tag.unwrap_or_default();

    let articles = state
        .articles
        .list_articles(&tag, limit)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list articles for tag '{}': {}", tag, e);
            ApiError::Internal("failed to fetch articles")
        })?;

    Ok(Json(articles))
}
