use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use resume_match::config::Config;
use resume_match::llm_client::ProviderRegistry;
use resume_match::routes::build_router;
use resume_match::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on invalid env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("resume_match={},tower_http={}", &config.rust_log, &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume-match v{}", env!("CARGO_PKG_VERSION"));

    // One pooled HTTP adapter per configured provider
    let registry = Arc::new(ProviderRegistry::from_settings(&config.providers)?);
    for kind in registry.configured() {
        let settings = &config.providers[&kind];
        info!(
            "Provider {kind} configured (model: {}, timeout: {}s)",
            settings.model_id,
            settings.timeout.as_secs()
        );
    }
    info!(
        "Engine: default provider {}, fallback {}, pool size {}, max retries {}",
        config.engine.default_provider,
        config
            .engine
            .retry
            .fallback
            .map(|k| k.to_string())
            .unwrap_or_else(|| "none".to_string()),
        config.engine.pool_size,
        config.engine.retry.max_retries
    );

    let state = AppState::new(registry, &config.engine);

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
