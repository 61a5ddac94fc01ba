//! End-to-end script runs over a real WebSocket connection.

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use common::TestDirs;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(addr: SocketAddr) -> Client {
    connect_path(addr, "/api/v1/ws").await
}

async fn connect_path(addr: SocketAddr, path: &str) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}{path}"))
        .await
        .expect("WebSocket handshake");
    client
}

async fn send(client: &mut Client, frame: Value) {
    client
        .send(Message::text(frame.to_string()))
        .await
        .expect("send frame");
}

/// Next JSON text frame, skipping control frames.
async fn next_event(client: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(10), client.next())
            .await
            .expect("frame within timeout")
            .expect("stream open")
            .expect("valid frame");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("JSON frame");
        }
    }
}

/// Collect frames up to and including the first terminal one.
async fn events_until_exit(client: &mut Client) -> Vec<Value> {
    let mut events = Vec::new();
    loop {
        let event = next_event(client).await;
        let done = event["type"] == "exit";
        events.push(event);
        if done {
            return events;
        }
    }
}

// ---------------------------------------------------------------------------
// Test: hello.sh streams its output then the exit frame
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shell_script_streams_output_then_exit() {
    let dirs = TestDirs::new();
    dirs.script("hello.sh", "echo hi\n");
    let mut client = connect(common::spawn_server(&dirs).await).await;

    send(&mut client, json!({"type": "run", "script": "hello.sh"})).await;

    let events = events_until_exit(&mut client).await;
    assert_eq!(
        events,
        vec![
            json!({"type": "output", "data": "hi\n"}),
            json!({"type": "exit", "data": "Process exited with code 0"}),
        ]
    );
}

// ---------------------------------------------------------------------------
// Test: the bare /ws path serves the same protocol
// ---------------------------------------------------------------------------

#[tokio::test]
async fn root_ws_path_runs_scripts() {
    let dirs = TestDirs::new();
    dirs.script("hello.sh", "echo hi\n");
    let mut client = connect_path(common::spawn_server(&dirs).await, "/ws").await;

    send(&mut client, json!({"type": "run", "script": "hello.sh"})).await;

    let events = events_until_exit(&mut client).await;
    assert_eq!(events.first(), Some(&json!({"type": "output", "data": "hi\n"})));
    assert_eq!(
        events.last(),
        Some(&json!({"type": "exit", "data": "Process exited with code 0"}))
    );
}

// ---------------------------------------------------------------------------
// Test: null config fields are treated as absent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn null_config_fields_still_run() {
    let dirs = TestDirs::new();
    dirs.script("hello.sh", "echo hi\n");
    let mut client = connect(common::spawn_server(&dirs).await).await;

    send(
        &mut client,
        json!({
            "type": "run",
            "script": "hello.sh",
            "config": {"args": null, "env": null, "permissions": null}
        }),
    )
    .await;

    assert_eq!(
        next_event(&mut client).await,
        json!({"type": "output", "data": "hi\n"})
    );
}

// ---------------------------------------------------------------------------
// Test: args and env reach the script
// ---------------------------------------------------------------------------

#[tokio::test]
async fn config_args_and_env_reach_the_script() {
    let dirs = TestDirs::new();
    dirs.script("greet.sh", "echo \"$GREETING $1 $2\"\n");
    let mut client = connect(common::spawn_server(&dirs).await).await;

    send(
        &mut client,
        json!({
            "type": "run",
            "scriptName": "greet.sh",
            "config": {"env": {"GREETING": "hello"}, "args": "big   world"}
        }),
    )
    .await;

    let events = events_until_exit(&mut client).await;
    assert_eq!(events[0], json!({"type": "output", "data": "hello big world\n"}));
}

// ---------------------------------------------------------------------------
// Test: missing script yields a single error frame and nothing else
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_script_yields_single_error_frame() {
    let dirs = TestDirs::new();
    let mut client = connect(common::spawn_server(&dirs).await).await;

    send(&mut client, json!({"type": "run", "script": "ghost.sh"})).await;
    assert_eq!(
        next_event(&mut client).await,
        json!({"type": "error", "data": "Script not found in any source"})
    );

    // The connection stays usable and nothing else arrives for the failed run.
    dirs.script("after.sh", "echo after\n");
    send(&mut client, json!({"type": "run", "script": "after.sh"})).await;
    assert_eq!(
        next_event(&mut client).await,
        json!({"type": "output", "data": "after\n"})
    );
}

// ---------------------------------------------------------------------------
// Test: malformed frames are answered with a server error
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_frame_is_reported() {
    let dirs = TestDirs::new();
    let mut client = connect(common::spawn_server(&dirs).await).await;

    client
        .send(Message::text("{not json"))
        .await
        .expect("send frame");

    let event = next_event(&mut client).await;
    assert_eq!(event["type"], "error");
    assert!(event["data"]
        .as_str()
        .unwrap()
        .starts_with("Server error: "));
}

// ---------------------------------------------------------------------------
// Test: stop terminates the connection's running scripts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stop_terminates_running_script() {
    let dirs = TestDirs::new();
    dirs.script("wait.sh", "echo ready\nexec sleep 60\n");
    let mut client = connect(common::spawn_server(&dirs).await).await;

    send(&mut client, json!({"type": "run", "script": "wait.sh"})).await;
    assert_eq!(
        next_event(&mut client).await,
        json!({"type": "output", "data": "ready\n"})
    );

    send(&mut client, json!({"type": "stop"})).await;
    assert_eq!(
        next_event(&mut client).await,
        json!({"type": "exit", "data": "Process exited with code -1"})
    );
}

// ---------------------------------------------------------------------------
// Test: stderr is streamed as error frames and does not end the run
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stderr_is_not_terminal() {
    let dirs = TestDirs::new();
    dirs.script("warn.sh", "echo oops >&2\nexit 4\n");
    let mut client = connect(common::spawn_server(&dirs).await).await;

    send(&mut client, json!({"type": "run", "script": "warn.sh"})).await;

    let events = events_until_exit(&mut client).await;
    assert_eq!(
        events,
        vec![
            json!({"type": "error", "data": "oops\n"}),
            json!({"type": "exit", "data": "Process exited with code 4"}),
        ]
    );
}
