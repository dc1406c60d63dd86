// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use anyhow::Context;
use axum::{routing::get, Router};
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_client::{run_client, run_notifier, DashboardClient, LogNotifier, LogRenderer};
use crate::application::monitor_service::MonitorService;
use crate::application::reading_source::ReadingSource;
use crate::domain::dashboard::DashboardView;
use crate::infrastructure::config::{load_app_config, SourceKind};
use crate::infrastructure::email_notifier::EmailNotifier;
use crate::infrastructure::gateway_source::GatewaySource;
use crate::infrastructure::simulated_source::SimulatedSource;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{dashboard, events, health_check, latest_reading, recent_readings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_app_config().context("Failed to load configuration")?;

    // Create reading source (infrastructure layer)
    let source: Arc<dyn ReadingSource> = match config.monitor.source {
        SourceKind::Simulated => {
            tracing::info!("Using simulated battery readings");
            Arc::new(SimulatedSource::new())
        }
        SourceKind::Gateway => {
            let gateway = config
                .gateway
                .clone()
                .context("monitor.source = \"gateway\" needs a [gateway] section")?;
            tracing::info!("Reading battery {} from {}", gateway.device, gateway.url);
            Arc::new(GatewaySource::new(gateway))
        }
    };

    // Create services (application layer)
    let monitor = MonitorService::new(
        source,
        config.thresholds,
        config.monitor.history_size,
        config.monitor.broadcast_capacity,
    );

    // In-process dashboard that mirrors what a browser client would show
    let dashboard_rx = if config.dashboard.local_client {
        let view = DashboardView::new(config.thresholds, config.dashboard.chart_capacity);
        let (published, rx) = watch::channel(view.snapshot());
        let client = DashboardClient::new(view, LogRenderer, LogNotifier);
        tokio::spawn(run_client(monitor.subscribe(), client, published));
        Some(rx)
    } else {
        None
    };

    // Email alerts for high battery temperature
    match &config.alerts {
        Some(alerts) if alerts.enabled => {
            let notifier = EmailNotifier::new(alerts).context("Failed to set up email alerts")?;
            tracing::info!(
                "Emailing {} when the battery exceeds {:.1} °C",
                alerts.to,
                alerts.temperature_threshold
            );
            tokio::spawn(run_notifier(monitor.subscribe(), notifier));
        }
        _ => tracing::info!("Email alerts disabled"),
    }

    let sampler = monitor.clone();
    let interval = config.monitor.sample_interval();
    tokio::spawn(async move { sampler.run(interval).await });

    // Create application state
    let state = Arc::new(AppState {
        monitor,
        dashboard: dashboard_rx,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/api/readings", get(recent_readings))
        .route("/api/readings/latest", get(latest_reading))
        .route("/dashboard", get(dashboard))
        .route("/events", get(events))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind))?;
    tracing::info!("Starting bms-dashboard on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
