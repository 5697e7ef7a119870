use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docent_core::server::{router, AppState};
use docent_core::{Config, Describer, Pipeline, Publisher};
use docent_tools::{CompletionClient, GitHubClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "docent=debug,docent_core=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🖼️  Docent starting up...");

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Configuration loaded");
    info!("  Completion API: {}", config.openai_api_url);
    info!("  Model: {} (max_tokens {})", config.model, config.max_tokens);

    let completions = CompletionClient::new(&config.openai_api_url, config.openai_api_key.clone())
        .context("Failed to build completion client")?;
    let describer = Describer::new(Arc::new(completions), &config.model, config.max_tokens);

    let publisher = match &config.storage {
        Some(storage) => {
            let repository = storage.repository.clone();
            info!(
                "Publishing uploads to {}/{}@{} under {}/",
                repository.owner, repository.name, repository.branch, config.upload_dir
            );
            let github = GitHubClient::new(storage.token.clone(), repository)
                .context("Failed to build GitHub client")?;
            Some(Publisher::new(Arc::new(github)))
        }
        None => {
            warn!("GITHUB_TOKEN/GITHUB_REPO not set - uploads will be sent inline");
            None
        }
    };

    let pipeline = Pipeline::new(publisher, describer, &config.upload_dir);
    let app = router(AppState {
        pipeline: Arc::new(pipeline),
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.http_port))?;
    info!("🖼️  Docent listening on port {}", config.http_port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down...");
        })
        .await
        .context("HTTP server error")?;

    info!("🖼️  Docent has shut down.");
    Ok(())
}
