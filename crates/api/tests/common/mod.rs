#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use scriptsui_api::config::ServerConfig;
use scriptsui_api::router::build_app_router;
use scriptsui_api::sources::SourceStore;
use scriptsui_api::state::AppState;
use scriptsui_api::ws::WsManager;
use scriptsui_core::scripting::config::RuntimeBinaries;
use scriptsui_core::scripting::orchestrator::Orchestrator;
use scriptsui_events::UsageWebhookConfig;

/// Scratch directories backing one test server.
pub struct TestDirs {
    pub scripts: tempfile::TempDir,
    pub data: tempfile::TempDir,
    pub temp: tempfile::TempDir,
}

impl TestDirs {
    pub fn new() -> Self {
        Self {
            scripts: tempfile::tempdir().expect("scripts dir"),
            data: tempfile::tempdir().expect("data dir"),
            temp: tempfile::tempdir().expect("temp dir"),
        }
    }

    /// Write an executable-agnostic script into the default source.
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        write_file(self.scripts.path(), name, body)
    }
}

pub fn write_file(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).expect("write file");
    path
}

/// Build a test `ServerConfig` with safe defaults rooted at `dirs`.
pub fn test_config(dirs: &TestDirs) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        scripts_dir: dirs.scripts.path().to_path_buf(),
        data_dir: dirs.data.path().to_path_buf(),
        temp_dir: dirs.temp.path().to_path_buf(),
        env_file_grace_secs: 1,
        runtimes: RuntimeBinaries::default(),
        usage: UsageWebhookConfig::default(),
    }
}

pub fn test_state(config: &ServerConfig) -> AppState {
    let mut orchestrator_config = config.orchestrator_config();
    orchestrator_config.drain_timeout = Duration::from_secs(1);

    AppState {
        config: Arc::new(config.clone()),
        ws_manager: Arc::new(WsManager::new()),
        orchestrator: Arc::new(Orchestrator::new(orchestrator_config)),
        sources: Arc::new(SourceStore::new(&config.data_dir, &config.scripts_dir)),
    }
}

/// Build the full application router with all middleware layers, the same
/// way `main.rs` does.
pub fn build_test_app(dirs: &TestDirs) -> Router {
    let config = test_config(dirs);
    build_app_router(test_state(&config), &config)
}

/// Serve the app on an ephemeral port and return its address.
pub async fn spawn_server(dirs: &TestDirs) -> SocketAddr {
    let app = build_test_app(dirs);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
