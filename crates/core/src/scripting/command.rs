//! Turning a resolved script plus its configuration into a runnable command.
//!
//! The runtime is chosen from the file extension ([`RuntimeKind`]); each
//! variant has its own builder module ([`shell`](super::shell),
//! [`node`](super::node), [`deno`](super::deno)). Side files a runtime needs
//! travel with the command as [`TempFile`]s so the orchestrator can hand
//! them to the [`TempResourceManager`](super::temp_files::TempResourceManager).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;

use super::config::{RuntimeBinaries, ScriptConfig};
use super::temp_files::TempFile;
use super::{deno, node, shell};
use crate::error::RunError;

/// Runtime used to execute a script, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeKind {
    /// `.sh`, run through a shell interpreter.
    Shell,
    /// `.js`, run through a Node-style runtime.
    NodeLike,
    /// `.ts`, run through a permission-sandboxed runtime.
    SandboxedRuntime,
}

impl RuntimeKind {
    pub fn from_path(path: &Path) -> Result<Self, RunError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("sh") => Ok(Self::Shell),
            Some("js") => Ok(Self::NodeLike),
            Some("ts") => Ok(Self::SandboxedRuntime),
            Some(other) => Err(RunError::Config(format!(
                "unsupported file type '.{other}'"
            ))),
            None => Err(RunError::Config("unsupported file type".to_string())),
        }
    }
}

/// A script file located on disk together with the runtime that runs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScript {
    pub path: PathBuf,
    pub runtime: RuntimeKind,
}

impl ResolvedScript {
    pub fn new(path: PathBuf) -> Result<Self, RunError> {
        let runtime = RuntimeKind::from_path(&path)?;
        Ok(Self { path, runtime })
    }
}

/// Everything needed to spawn one script process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltCommand {
    pub executable: String,
    pub args: Vec<String>,
    /// Variables set on the child. Layered over the server's own
    /// environment when `inherit_env` is true, the complete environment
    /// otherwise.
    pub env: BTreeMap<String, String>,
    pub inherit_env: bool,
    pub temp_files: Vec<TempFile>,
}

impl BuiltCommand {
    /// Translate into a [`Command`]. Stdio is left to the caller.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.args(&self.args);
        if !self.inherit_env {
            cmd.env_clear();
        }
        cmd.envs(&self.env);
        cmd
    }
}

/// Builds [`BuiltCommand`]s for every supported runtime.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    runtimes: RuntimeBinaries,
    temp_dir: PathBuf,
    env_file_grace: Duration,
}

impl CommandBuilder {
    pub fn new(runtimes: RuntimeBinaries, temp_dir: PathBuf, env_file_grace: Duration) -> Self {
        Self {
            runtimes,
            temp_dir,
            env_file_grace,
        }
    }

    /// Build the command for `script` under `config`.
    ///
    /// Only the sandboxed runtime touches the filesystem (its env file); a
    /// failure there surfaces as [`RunError::Runtime`].
    pub async fn build(
        &self,
        script: &ResolvedScript,
        config: &ScriptConfig,
    ) -> Result<BuiltCommand, RunError> {
        match script.runtime {
            RuntimeKind::Shell => Ok(shell::build(&self.runtimes.shell, &script.path, config)),
            RuntimeKind::NodeLike => Ok(node::build(&self.runtimes.node, &script.path, config)),
            RuntimeKind::SandboxedRuntime => {
                deno::build(
                    &self.runtimes.deno,
                    &self.temp_dir,
                    self.env_file_grace,
                    &script.path,
                    config,
                )
                .await
            }
        }
    }
}

/// Split a free-form argument string into whitespace-delimited tokens.
pub fn split_args(args: &str) -> Vec<String> {
    args.split_whitespace().map(str::to_string).collect()
}

/// Command for runtimes that take `<executable> <script> [args...]` and
/// inherit the server environment overlaid with the configured variables.
pub(crate) fn interpreted(executable: &str, script: &Path, config: &ScriptConfig) -> BuiltCommand {
    let mut args = vec![script.to_string_lossy().into_owned()];
    args.extend(split_args(&config.args));

    BuiltCommand {
        executable: executable.to_string(),
        args,
        env: config.env.clone(),
        inherit_env: true,
        temp_files: Vec::new(),
    }
}
