//! Aggregates tech articles from external platforms into a document store and serves them,
//! together with per-user tag preferences, over a small REST API.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod sources;

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;

use api::AppState;
use auth::IdentityToolkitVerifier;
use config::Config;
use db::{DocumentArticleRepository, DocumentDb, DocumentUserRepository};
use error::{AppError, Result};
use services::{ArticleService, IngestReport, UserService};
use sources::{ArticleSource, QiitaFetcher, ZennFetcher};

fn article_service(config: &Config, db: DocumentDb) -> Result<ArticleService> {
    let sources: Vec<Arc<dyn ArticleSource>> = vec![
        Arc::new(QiitaFetcher::new(&config.qiita)?),
        Arc::new(ZennFetcher::new()),
    ];
    let repo = Arc::new(DocumentArticleRepository::new(db));
    Ok(ArticleService::new(repo, sources))
}

pub async fn build_state(config: &Config) -> Result<Arc<AppState>> {
    let db = DocumentDb::open(&config.db_path).await?;

    let articles = Arc::new(article_service(config, db.clone())?);
    let users = UserService::new(Arc::new(DocumentUserRepository::new(db)));
    let verifier = Arc::new(IdentityToolkitVerifier::new(&config.identity)?);

    Ok(Arc::new(AppState {
        articles,
        users,
        verifier,
    }))
}

/// Run one ingestion pass as its own task, giving up after `timeout`.
///
/// On timeout the task is aborted, which drops any fetch or write still in flight.
pub async fn ingest_with_timeout(
    service: Arc<ArticleService>,
    tags: Vec<String>,
    timeout: Duration,
) -> Result<IngestReport> {
    let mut task = tokio::spawn(async move { service.ingest_all(&tags).await });

    match tokio::time::timeout(timeout, &mut task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(anyhow::anyhow!("ingestion task failed: {}", e).into()),
        Err(_) => {
            task.abort();
            Err(AppError::Timeout(format!(
                "ingestion did not finish within {}s",
                timeout.as_secs()
            )))
        }
    }
}

/// One ingestion pass over the configured tags, for an external scheduler to invoke.
pub async fn refresh(config: &Config) -> Result<IngestReport> {
    let db = DocumentDb::open(&config.db_path).await?;
    let service = Arc::new(article_service(config, db)?);
    ingest_with_timeout(service, config.ingest_tags.clone(), config.ingest_timeout()).await
}

pub async fn run_server(config: Config) -> Result<()> {
    config.validate()?;

    tracing::info!("Initializing state...");
    let state = build_state(&config).await?;

    // Ingestion failure never keeps the server from starting.
    tracing::info!("Fetching and saving initial articles...");
    match ingest_with_timeout(
        state.articles.clone(),
        config.ingest_tags.clone(),
        config.ingest_timeout(),
    )
    .await
    {
        Ok(report) => tracing::info!(
            "Initial articles saved: {} articles, {} failed fetches",
            report.persisted,
            report.failed_fetches
        ),
        Err(e) => tracing::warn!("Failed to fetch and save initial articles: {}", e),
    }

    let app = api::router(state, &config.allowed_origin)?;

    let listener = TcpListener::bind(&config.bind_address).await?;
    tracing::info!("Server running on {}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
