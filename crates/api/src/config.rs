use std::path::PathBuf;
use std::time::Duration;

use scriptsui_core::scripting::config::{
    OrchestratorConfig, RuntimeBinaries, DEFAULT_DRAIN_TIMEOUT,
};
use scriptsui_events::UsageWebhookConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long to wait for in-flight connections on shutdown (default: `10`).
    pub shutdown_timeout_secs: u64,
    /// Directory of the built-in default source.
    pub scripts_dir: PathBuf,
    /// Directory holding `sources.json`.
    pub data_dir: PathBuf,
    /// Where per-run env files are written.
    pub temp_dir: PathBuf,
    /// Lifetime of a sandboxed runtime's env file in seconds (default: `10`).
    pub env_file_grace_secs: u64,
    pub runtimes: RuntimeBinaries,
    pub usage: UsageWebhookConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `HOST`                  | `0.0.0.0`                  |
    /// | `PORT`                  | `3000`                     |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `10`                       |
    /// | `SCRIPTS_DIR`           | `./scripts`                |
    /// | `DATA_DIR`              | `./data`                   |
    /// | `TEMP_DIR`              | OS temp dir                |
    /// | `ENV_FILE_GRACE_SECS`   | `10`                       |
    /// | `SHELL_BIN`             | `bash`                     |
    /// | `NODE_BIN`              | `node`                     |
    /// | `DENO_BIN`              | `deno`                     |
    /// | `USAGE_COLLECTION`      | `false`                    |
    /// | `USAGE_WEBHOOK_URL`     | unset                      |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let scripts_dir = PathBuf::from(
            std::env::var("SCRIPTS_DIR").unwrap_or_else(|_| "./scripts".into()),
        );
        let data_dir =
            PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".into()));
        let temp_dir = std::env::var("TEMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir());

        let env_file_grace_secs: u64 = std::env::var("ENV_FILE_GRACE_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("ENV_FILE_GRACE_SECS must be a valid u64");

        let defaults = RuntimeBinaries::default();
        let runtimes = RuntimeBinaries {
            shell: std::env::var("SHELL_BIN").unwrap_or(defaults.shell),
            node: std::env::var("NODE_BIN").unwrap_or(defaults.node),
            deno: std::env::var("DENO_BIN").unwrap_or(defaults.deno),
        };

        let usage = UsageWebhookConfig {
            enabled: std::env::var("USAGE_COLLECTION")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            url: std::env::var("USAGE_WEBHOOK_URL").ok(),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            scripts_dir,
            data_dir,
            temp_dir,
            env_file_grace_secs,
            runtimes,
            usage,
        }
    }

    /// Settings for the script orchestrator.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            runtimes: self.runtimes.clone(),
            temp_dir: self.temp_dir.clone(),
            env_file_grace: Duration::from_secs(self.env_file_grace_secs),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_truthy_values() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" YES "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }
}
