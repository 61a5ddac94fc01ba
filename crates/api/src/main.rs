use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scriptsui_api::config::ServerConfig;
use scriptsui_api::router::build_app_router;
use scriptsui_api::sources::SourceStore;
use scriptsui_api::state::AppState;
use scriptsui_api::ws;
use scriptsui_core::scripting::orchestrator::Orchestrator;
use scriptsui_events::UsageWebhook;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "scriptsui_api=debug,scriptsui_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        scripts_dir = %config.scripts_dir.display(),
        data_dir = %config.data_dir.display(),
        "Loaded server configuration"
    );

    // --- Orchestrator ---
    let usage = UsageWebhook::new(config.usage.clone()).expect("Failed to build usage client");
    if usage.target().is_some() {
        tracing::info!("Anonymous usage collection enabled");
    }
    let orchestrator =
        Arc::new(Orchestrator::new(config.orchestrator_config()).with_usage_reporter(Arc::new(usage)));

    // --- WebSocket manager ---
    let ws_manager = Arc::new(ws::WsManager::new());

    // --- Heartbeat ---
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&ws_manager));

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        ws_manager: Arc::clone(&ws_manager),
        orchestrator: Arc::clone(&orchestrator),
        sources: Arc::new(SourceStore::new(&config.data_dir, &config.scripts_dir)),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    // Env files still inside their grace period are removed now.
    let released = tokio::time::timeout(
        Duration::from_secs(config.shutdown_timeout_secs),
        orchestrator.temp_files().release_all(),
    )
    .await;
    if released.is_err() {
        tracing::warn!("Timed out releasing temp files");
    }

    heartbeat_handle.abort();
    tracing::info!("Heartbeat task stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
