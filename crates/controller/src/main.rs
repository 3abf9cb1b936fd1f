//! Search Remediator - remediation control loop for managed search clusters
//!
//! Receives alarm events, decides and gates remediation actions and applies
//! them through the cluster control plane.

use anyhow::Result;
use controller_lib::{
    alert::AlertDispatcher,
    control_plane::SimulatedControlPlane,
    controller::ControllerBuilder,
    health::HealthRegistry,
    observability::StructuredLogger,
    store::InMemoryClusterStore,
};
use search_remediator::{api, config::ControllerSettings};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const CONTROLLER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting search-remediator");

    let settings = ControllerSettings::load()?;
    info!(
        instance = %settings.instance,
        namespace = %settings.namespace,
        strategy = ?settings.strategy,
        "Controller configured"
    );

    let health_registry = HealthRegistry::new();
    let logger = StructuredLogger::new(&settings.instance);

    let store = Arc::new(InMemoryClusterStore::new());
    let control_plane =
        Arc::new(SimulatedControlPlane::new().with_latency(settings.simulated_latency()));
    let alerts = Arc::new(AlertDispatcher::new(settings.alert_history));

    let (controller, deferred_rx) =
        ControllerBuilder::new(store, control_plane, alerts.clone())
            .policy(settings.policy(&logger))
            .cooldowns(settings.cooldown_policy()?)
            .health(health_registry.clone())
            .logger(logger.clone())
            .config(settings.controller_config())
            .build();

    controller.initialize().await;
    logger.log_startup(CONTROLLER_VERSION, controller.strategy());

    // Shutdown signal for the deferred action loop
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    let deferred_handle = tokio::spawn(controller.clone().run_deferred(deferred_rx, shutdown_rx));

    let app_state = Arc::new(api::AppState::new(controller.clone(), alerts));
    let api_handle = tokio::spawn(api::serve(settings.api_port, app_state));

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
        served = api_handle => {
            match served {
                Ok(Ok(())) => logger.log_shutdown("API server stopped"),
                Ok(Err(e)) => {
                    error!(error = %e, "API server failed");
                    logger.log_shutdown("API server failed");
                }
                Err(e) => {
                    error!(error = %e, "API server task panicked");
                    logger.log_shutdown("API server task panicked");
                }
            }
        }
    }

    health_registry.mark_shutting_down().await;
    let _ = shutdown_tx.send(());
    if let Err(e) = deferred_handle.await {
        error!(error = %e, "Deferred action loop panicked");
    }
    info!("Shutdown complete");

    Ok(())
}
