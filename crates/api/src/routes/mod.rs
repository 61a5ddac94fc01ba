pub mod health;
pub mod scripts;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws         WebSocket (run / stop, event stream)
/// /scripts    runnable scripts per source (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/scripts", get(scripts::list_scripts))
}
