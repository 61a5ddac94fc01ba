//! Per-invocation script configuration and orchestrator settings.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Grace period before a sandboxed runtime's env file is deleted.
pub const DEFAULT_ENV_FILE_GRACE: Duration = Duration::from_secs(10);

/// How long to keep reading output after the process has exited.
///
/// A backgrounded grandchild can keep the pipes open indefinitely; past this
/// point the remaining output is abandoned so the exit event still goes out.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Capability flags handed to the sandboxed runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Permissions {
    pub allow_read: bool,
    pub allow_write: bool,
    pub allow_net: bool,
    pub allow_env: bool,
    pub allow_run: bool,
    pub allow_ffi: bool,
    pub allow_hrtime: bool,
}

/// Configuration supplied by the caller for one invocation.
///
/// Immutable for the lifetime of the run. Every field is optional on the
/// wire and defaults to "no permissions, no env, no args".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScriptConfig {
    pub script_name: String,
    pub source_id: String,
    pub permissions: Permissions,
    pub env: BTreeMap<String, String>,
    pub args: String,
}

/// Executables used for each runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeBinaries {
    pub shell: String,
    pub node: String,
    pub deno: String,
}

impl Default for RuntimeBinaries {
    fn default() -> Self {
        Self {
            shell: "bash".to_string(),
            node: "node".to_string(),
            deno: "deno".to_string(),
        }
    }
}

/// Settings shared by every invocation an orchestrator runs.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub runtimes: RuntimeBinaries,
    /// Directory where per-run env files are written.
    pub temp_dir: PathBuf,
    /// Lifetime of a sandboxed runtime's env file, counted from creation.
    pub env_file_grace: Duration,
    pub drain_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            runtimes: RuntimeBinaries::default(),
            temp_dir: std::env::temp_dir(),
            env_file_grace: DEFAULT_ENV_FILE_GRACE,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}
