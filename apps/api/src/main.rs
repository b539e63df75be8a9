mod campaign;
mod clock;
mod config;
mod errors;
mod gateway;
mod models;
mod routes;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::campaign::runner::{CampaignRunner, Pacing};
use crate::campaign::scheduler;
use crate::clock::SystemClock;
use crate::config::Config;
use crate::gateway::VapiClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::postgres::PgCampaignStore;
use crate::store::CampaignStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Autodial API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the campaign state store (PostgreSQL)
    let store: Arc<dyn CampaignStore> =
        Arc::new(PgCampaignStore::connect(&config.database_url).await?);

    // Initialize the calling gateway
    let gateway = Arc::new(VapiClient::new(config.gateway.clone())?);
    info!("Calling gateway initialized ({})", config.gateway.base_url);

    // Build the run loop and the tick scheduler
    let runner = Arc::new(CampaignRunner::new(
        Arc::clone(&store),
        gateway,
        Arc::new(SystemClock),
        Pacing::default(),
    ));
    scheduler::spawn(
        Arc::clone(&runner),
        Duration::from_secs(config.scheduler_interval_secs),
    );
    info!(
        "Campaign scheduler armed (every {}s)",
        config.scheduler_interval_secs
    );

    // Build app state
    let state = AppState {
        store,
        runner,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
