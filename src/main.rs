use anyhow::{Context, Result};
use axum::Router;
use buswatch::api::{
    create_buses_router, create_location_router, create_ws_router, BusesAppState,
    LocationAppState, WsAppState,
};
use buswatch::config::{load_config, BuswatchConfig};
use buswatch::hub::BroadcastHub;
use buswatch::ingress::UpdateIngress;
use buswatch::store::{SqliteStore, VehicleStore};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "buswatch=info".into()),
        )
        .init();

    info!("buswatch starting...");

    // Load configuration: TOML file, then BUSWATCH_* env overrides
    let config_path =
        std::env::var("BUSWATCH_CONFIG").unwrap_or_else(|_| "buswatch.toml".to_string());
    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %config_path, error = %e, "Config file not loaded, using defaults");
            BuswatchConfig::default()
        }
    };
    let config = config.with_env_overrides();

    info!(
        port = config.server.port,
        db_path = %config.storage.path,
        freshness_window_seconds = config.freshness.window_seconds,
        broadcast_on_persist_failure = config.ingress.broadcast_on_persist_failure,
        "Configuration loaded"
    );

    // Initialize vehicle store
    let store: Arc<dyn VehicleStore> = Arc::new(
        SqliteStore::new(&config.storage.path).context("Failed to initialize vehicle store")?,
    );
    info!("Vehicle store initialized");

    // Broadcast hub and the two ingress paths share one pipeline
    let hub = Arc::new(BroadcastHub::new());
    let ingress = Arc::new(UpdateIngress::new(
        Arc::clone(&store),
        Arc::clone(&hub),
        config.ingress.broadcast_on_persist_failure,
    ));

    let buses_state = Arc::new(BusesAppState {
        store: Arc::clone(&store),
        freshness_window: config.freshness.window(),
    });
    let location_state = Arc::new(LocationAppState {
        ingress: Arc::clone(&ingress),
    });
    let ws_state = Arc::new(WsAppState {
        hub: Arc::clone(&hub),
        ingress: Arc::clone(&ingress),
    });

    let app = Router::new()
        .merge(create_buses_router(buses_state))
        .merge(create_location_router(location_state))
        .merge(create_ws_router(ws_state))
        .layer(cors_layer(&config.cors.allowed_origin)?);

    // Start HTTP/WebSocket server
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.server.port))
        .await
        .context("Failed to bind listen port")?;
    info!(port = config.server.port, "buswatch listening");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    server_handle.abort();
    info!("buswatch stopped");

    Ok(())
}

/// Build the CORS layer from config. "*" admits any origin (the insecure
/// default, kept for drop-in mobile/web clients).
fn cors_layer(allowed_origin: &str) -> Result<CorsLayer> {
    let layer = if allowed_origin == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origin = allowed_origin
            .parse::<axum::http::HeaderValue>()
            .context("Invalid cors.allowed_origin")?;
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any)
    };
    Ok(layer)
}
