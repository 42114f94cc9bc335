use std::sync::Arc;

use cinematch_client::{
    api::{create_router, AppState},
    config::Config,
    services::{spawn_sweeper, HttpRecommender},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cinematch_client=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let recommender = HttpRecommender::new(
        &config.recommender_url,
        &config.endpoints(),
        config.request_timeout(),
    )?;

    // Initialize application state
    let state = AppState::new(Arc::new(recommender), config.session_settings());
    let sweeper = spawn_sweeper(
        state.sessions.clone(),
        config.session_sweep_interval(),
        config.session_idle_ttl(),
    );

    // Create the router with all routes
    let app = create_router(state);

    // Start the server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        addr = %addr,
        recommender = %config.recommender_url,
        page_size = config.page_size.get(),
        "Server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    sweeper.shutdown().await;
    Ok(())
}
