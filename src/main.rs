// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use axum::{routing::get, Router};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_service::DashboardService;
use crate::application::sensor_store::SensorDataStore;
use crate::application::timing::{NoopTiming, TimingHook};
use crate::infrastructure::config::load_dashboard_config;
use crate::infrastructure::performance_monitor::PerformanceMonitor;
use crate::infrastructure::simulated_source::SimulatedSensorSource;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{get_readings, get_status, health_check, stream_readings};
use crate::presentation::live_stream::watch_store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_dashboard_config()?;

    // Reading source (infrastructure layer)
    let source = match config.store.seed {
        Some(seed) => SimulatedSensorSource::with_seed(seed),
        None => SimulatedSensorSource::new(),
    }
    .with_fault_rate(config.store.fault_rate);

    // Store and services (application layer)
    let monitor = Arc::new(PerformanceMonitor::new());
    let timing: Arc<dyn TimingHook> = if config.instrumentation.enabled {
        monitor.clone() as Arc<dyn TimingHook>
    } else {
        Arc::new(NoopTiming)
    };
    let store = Arc::new(SensorDataStore::new(
        config.store.to_settings(),
        Arc::new(source),
        timing.clone(),
    ));

    let (_updates_subscription, updates) = watch_store(&store);
    let _cadence_subscription = monitor.track_store_updates(&store);

    store.start();

    let dashboard_service = Arc::new(DashboardService::new(store.clone(), timing));

    // Create application state
    let state = Arc::new(AppState {
        dashboard_service,
        performance_monitor: monitor,
        updates,
        default_page_size: config.query.default_page_size,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/readings", get(get_readings))
        .route("/readings/stream", get(stream_readings))
        .route("/status", get(get_status))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind_addr.parse()?;
    tracing::info!("Starting greenhouse-telemetry service on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(store.clone()))
        .await?;

    tracing::info!("Shut down cleanly");

    Ok(())
}

/// Wait for Ctrl-C, then destroy the store so open live streams finish.
async fn shutdown_signal(store: Arc<SensorDataStore>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
    store.destroy();
}
