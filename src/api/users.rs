use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};

use crate::models::{TagsUpdate, User};

use super::{auth::AuthenticatedUser, error::ApiError, AppState};

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> Result<Json<User>, ApiError> {
    match state.users.get_user(&user_id).await {
        Ok(Some(user)) => Ok(Json(user)),
        Ok(None) => Err(ApiError::NotFound("user not found")),
        Err(e) => {
            tracing::error!("Failed to load user {}: {}", user_id, e);
            Err(ApiError::Internal("failed to fetch user"))
        }
    }
}

pub async fn update_tags(
    State(state): State<Arc<AppState>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    payload: Result<Json<TagsUpdate>, JsonRejection>,
) -> Result<Json<TagsUpdate>, ApiError> {
    let Json(update) = payload.map_err(|e| {
        tracing::debug!("Rejected tag update body: {}", e);
        ApiError::MalformedPayload
    })?;

    let user = state
        .users
        .set_user_tags(&user_id, update.tags)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update tags for {}: {}", user_id, e);
            ApiError::Internal("failed to update tags")
        })?;

    Ok(Json(TagsUpdate { tags: user.tags }))
}
