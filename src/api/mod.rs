mod articles;
mod auth;
mod error;
mod users;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::TokenVerifier;
use crate::error::{AppError, Result};
use crate::services::{ArticleService, UserService};

pub use auth::AuthenticatedUser;
pub use error::ApiError;

/// Everything a request handler can reach. Built once at startup.
pub struct AppState {
    pub articles: Arc<ArticleService>,
    pub users: UserService,
    pub verifier: Arc<dyn TokenVerifier>,
}

pub fn router(state: Arc<AppState>, allowed_origin: &str) -> Result<Router> {
    let origin = HeaderValue::from_str(allowed_origin)
        .map_err(|e| AppError::Config(format!("invalid allowed_origin '{}': {}", allowed_origin, e)))?;

    // Requests from any other origin get no allow-origin header.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list([origin]))
        .allow_methods([
            Method::GET,
            Method::PUT,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([ORIGIN, CONTENT_TYPE, ACCEPT, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let user_routes = Router::new()
        .route("/api/user", get(users::get_user))
        .route("/api/user/tags", put(users::update_tags))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_identity,
        ));

    let app = Router::new()
        .route("/api/articles", get(articles::list_articles))
        .merge(user_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    Ok(app)
}
