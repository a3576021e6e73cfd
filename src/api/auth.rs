use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{error::ApiError, AppState};

/// The verified subject of the request's identity token, inserted by [`require_identity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

/// Middleware gating the user routes on a valid `Authorization: Bearer <token>` header.
///
/// Requests without a verified token are answered here and never reach a handler.
pub async fn require_identity(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()).map(str::to_string) else {
        return ApiError::Unauthorized("missing or invalid token").into_response();
    };

    match state.verifier.verify(&token).await {
        Ok(Some(user_id)) => {
            tracing::debug!("Authenticated user {}", user_id);
            request.extensions_mut().insert(AuthenticatedUser(user_id));
            next.run(request).await
        }
        Ok(None) => ApiError::Unauthorized("invalid token").into_response(),
        Err(e) => {
            tracing::error!("Token verification failed: {}", e);
            ApiError::Internal("authentication unavailable").into_response()
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_tokens_only() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
