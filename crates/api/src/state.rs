use std::sync::Arc;

use scriptsui_core::scripting::orchestrator::Orchestrator;

use crate::config::ServerConfig;
use crate::sources::SourceStore;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
    /// Launches and supervises script runs for every connection.
    pub orchestrator: Arc<Orchestrator>,
    /// Where the configured script sources are read from.
    pub sources: Arc<SourceStore>,
}
