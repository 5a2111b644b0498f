use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use super::{services, state::AppState};
use crate::config::Config;
use crate::export::{ExportSettings, Exporter, RefreshScheduler};
use crate::modbus::ModbusServer;
use crate::observability::Metrics;
use crate::store::{FactStore, FjallStore};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(services::root))
        .route("/prices/available-dates", get(services::available_dates))
        .route("/prices/date/{date}", get(services::prices_for_date))
        .route(
            "/devices",
            get(services::list_devices).post(services::create_device),
        )
        .route(
            "/devices/{id}",
            put(services::update_device).delete(services::delete_device),
        )
        .route("/devices/{id}/presence", put(services::set_presence))
        .route("/network/stats", get(services::network_stats))
        .route("/export/registers", get(services::export_registers))
        .route("/export/status", get(services::export_status))
        .route("/export/map", get(services::export_map))
        .route("/export/refresh", post(services::export_refresh))
        .route("/health", get(services::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Wire store, exporter, scheduler and both adapters, then serve until
/// a shutdown signal arrives
pub async fn run(config: Config) -> Result<(), AnyError> {
    let map = Arc::new(
        config
            .address_map()
            .map_err(|e| format!("Invalid address map: {}", e))?,
    );
    info!(entries = map.len(), "Address map loaded");

    info!(path = %config.server.store_path.display(), "Opening Fjall store");
    let store = Arc::new(
        FjallStore::open(&config.server.store_path)
            .map_err(|e| format!("Failed to open Fjall store: {}", e))?,
    );

    let metrics = Arc::new(Metrics::new());
    let settings = ExportSettings::from_config(&config.exporter)?;
    let fact_store: Arc<dyn FactStore> = store.clone();
    let exporter = Arc::new(Exporter::new(map, fact_store, settings));
    let scheduler = Arc::new(RefreshScheduler::new(
        exporter.clone(),
        config.exporter.refresh_interval(),
        metrics.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let modbus_task = if config.modbus.enabled {
        let listener = TcpListener::bind(config.modbus.bind_addr).await?;
        let modbus = ModbusServer::new(exporter.clone(), metrics.clone());
        Some(tokio::spawn(modbus.serve(listener, shutdown_rx)))
    } else {
        info!("Modbus adapter disabled");
        None
    };

    scheduler.start();

    let address = config.server.bind_addr;
    let state = AppState::new(config, store.clone(), scheduler.clone(), metrics);
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "spotreg API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await;
    let _ = shutdown_tx.send(true);
    if let Some(task) = modbus_task {
        match task.await {
            Ok(Err(e)) => error!(error = %e, "Modbus adapter failed"),
            Err(e) => error!(error = %e, "Modbus task panicked"),
            Ok(Ok(())) => {}
        }
    }

    store.persist()?;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
