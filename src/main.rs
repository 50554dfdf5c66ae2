//! frink-embeddings server binary

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use frink_embeddings::api::{create_router, AppState};
use frink_embeddings::config::{AppConfig, LogFormat};
use frink_embeddings::context::AppContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;

    init_tracing(&config)?;
    tracing::info!(?config, "Detected configuration");

    let ctx = AppContext::from_config(&config).await?;

    // Warm the graph catalog; a failure here is not fatal
    match ctx.catalog.refresh().await {
        Ok(graphs) => tracing::info!(graphs = graphs.len(), "Graph catalog ready"),
        Err(err) => tracing::warn!(error = %err, "Failed to build graph catalog"),
    }

    let router = create_router(AppState::from(ctx));

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    tracing::info!(%addr, "Listening for HTTP traffic");

    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.logging.level.clone()))
        .unwrap_or_else(|_| EnvFilter::new("frink_embeddings=info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format {
        LogFormat::Json => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            registry.with(tracing_subscriber::fmt::layer()).init();
        }
    }

    Ok(())
}
