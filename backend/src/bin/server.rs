//! Trip Quality HTTP Server Binary
//!
//! Main entry point for the trip quality REST API server. It loads the
//! configuration, wires the trip source, repository and worker pool, sets up
//! the HTTP router and starts serving requests.
//!
//! # Usage
//!
//! ```bash
//! TRIP_QUALITY_CONFIG=trip-quality.toml \
//!   cargo run --bin trip-quality-server
//! ```
//!
//! # Environment Variables
//!
//! - `TRIP_QUALITY_CONFIG`: Path to the TOML configuration file
//! - `HOST`, `PORT`: Bind address overrides
//! - `EXPORT_SECRET`, `TRIP_API_BASE_URL`, `TRIP_API_TOKEN`, ...: Source overrides
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use trip_quality::config::AppConfig;
use trip_quality::db::{LocalRepository, TripRepository};
use trip_quality::http::{create_router, AppState};
use trip_quality::services::{ComparisonOrchestrator, ProgressStore, WorkerPool};
use trip_quality::source::{HttpTripSource, TripDataSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting trip quality HTTP server");

    let config = AppConfig::load()?;
    if config.source.export_secret.is_none() {
        warn!("No export secret configured; comparison jobs will fail at the export step");
    }

    let repository: Arc<dyn TripRepository> = Arc::new(LocalRepository::new());
    let source: Arc<dyn TripDataSource> = Arc::new(HttpTripSource::new(config.source.clone())?);
    info!(
        "Repository '{}' ready, worker pool of {} jobs",
        repository.backend_name(),
        config.workers.max_concurrent_jobs
    );

    let orchestrator = ComparisonOrchestrator::new(
        source,
        repository,
        ProgressStore::new(),
        WorkerPool::new(config.workers.max_concurrent_jobs),
        config.workers.detail_fetch_concurrency,
    );

    let app = create_router(AppState::new(orchestrator));

    let addr: SocketAddr = config.bind_address().parse()?;
    info!("Server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
