use tracing_subscriber::EnvFilter;

use tech_digest::config::Config;
use tech_digest::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (info and above unless RUST_LOG says otherwise)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    // Load configuration
    let config = Config::load()?;

    // Check for --refresh flag (one ingestion pass, then exit)
    let headless_refresh = args.len() >= 2 && args[1] == "--refresh";

    if headless_refresh {
        let report = tech_digest::refresh(&config).await?;
        println!(
            "Refreshed {} articles across {} tags ({} failed fetches)",
            report.persisted, report.tags, report.failed_fetches
        );
        return Ok(());
    }

    tech_digest::run_server(config).await
}
