use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use scriptsui_core::scripting::channel::OutputChannel;
use scriptsui_core::scripting::events::WireEvent;
use scriptsui_core::scripting::orchestrator::{Invocation, RunHandle};

use crate::state::AppState;
use crate::ws::channel::WsChannel;
use crate::ws::protocol::{self, ClientMessage};

/// HTTP handler that upgrades the connection to WebSocket.
///
/// After the upgrade the connection is registered with `WsManager` and
/// managed by a sender task plus the inbound loop below.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Runs started on one connection. Owned by that connection only.
#[derive(Default)]
struct ConnectionRuns {
    runs: Vec<RunHandle>,
}

impl ConnectionRuns {
    fn track(&mut self, handle: RunHandle) {
        self.runs.retain(|run| !run.is_finished());
        self.runs.push(handle);
    }

    fn terminate_all(&mut self) {
        self.runs.retain(|run| !run.is_finished());
        for run in &self.runs {
            tracing::debug!(run_id = %run.id(), state = %run.state(), "Stopping run");
            run.terminate();
        }
    }

    /// Drop every handle without stopping the processes.
    fn detach(self) -> usize {
        self.runs.iter().filter(|run| !run.is_finished()).count()
    }
}

/// Manage a single WebSocket connection after upgrade.
///
///   1. Registers the connection with `WsManager`.
///   2. Spawns a sender task that forwards messages from the manager channel.
///   3. Processes inbound run / stop messages on the current task.
///   4. Cleans up on disconnect. Runs still in flight are detached.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let (sender, mut rx) = state.ws_manager.add(conn_id.clone()).await;
    let channel = WsChannel::new(sender);

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    let mut runs = ConnectionRuns::default();

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                handle_text(&state, &conn_id, &channel, text.as_str(), &mut runs).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    let detached = runs.detach();
    if detached > 0 {
        tracing::info!(conn_id = %conn_id, detached, "Client left with runs in flight; they continue unobserved");
    }

    state.ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}

async fn handle_text(
    state: &AppState,
    conn_id: &str,
    channel: &WsChannel,
    text: &str,
    runs: &mut ConnectionRuns,
) {
    match protocol::parse(text) {
        Ok(ClientMessage::Run(invocation)) => {
            if let Some(handle) = launch(state, conn_id, channel, invocation).await {
                runs.track(handle);
            }
        }
        Ok(ClientMessage::Stop) => {
            tracing::info!(conn_id, "Stop requested");
            runs.terminate_all();
        }
        Ok(ClientMessage::Unknown(kind)) => {
            tracing::warn!(conn_id, kind = ?kind, "Ignoring unknown message type");
        }
        Err(e) => {
            tracing::warn!(conn_id, error = %e, "Malformed WebSocket message");
            channel.send_wire(&WireEvent::Error(format!("Server error: {e}")));
        }
    }
}

async fn launch(
    state: &AppState,
    conn_id: &str,
    channel: &WsChannel,
    invocation: Invocation,
) -> Option<RunHandle> {
    let sources = match state.sources.snapshot().await {
        Ok(sources) => sources,
        Err(e) => {
            tracing::error!(conn_id, error = %e, "Failed to load script sources");
            channel.send_wire(&WireEvent::Error(format!("Server error: {e}")));
            return None;
        }
    };

    let output: Arc<dyn OutputChannel> = Arc::new(channel.clone());
    match state.orchestrator.launch(invocation, &sources, output).await {
        Ok(handle) => {
            tracing::debug!(conn_id, run_id = %handle.id(), script = handle.script(), "Run attached to connection");
            Some(handle)
        }
        // The setup error has already been sent to the client.
        Err(_) => None,
    }
}
