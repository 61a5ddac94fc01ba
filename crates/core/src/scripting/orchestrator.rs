//! Central script orchestrator.
//!
//! Coordinates the whole lifecycle of an invocation:
//! 1. Resolve the script name against the source snapshot.
//! 2. Pick the runtime and build the command.
//! 3. Hand any side files to the temp-file manager.
//! 4. Spawn the process.
//! 5. Supervise it on its own task, streaming events to the observer.
//! 6. Report the outcome to the usage reporter, fire-and-forget.
//!
//! Failures in steps 1-4 produce a single setup error event and no
//! [`RunHandle`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::channel::{OutputChannel, RunEmitter};
use super::command::{CommandBuilder, ResolvedScript};
use super::config::{OrchestratorConfig, ScriptConfig};
use super::events::RunEvent;
use super::sources::{self, Source};
use super::status::{RunState, SYNTHESIZED_EXIT_CODE};
use super::subprocess;
use super::temp_files::TempResourceManager;
use super::usage::{self, UsageRecord, UsageReporter};
use crate::error::RunError;

/// One request to execute a single script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub script_name: String,
    pub config: ScriptConfig,
}

impl Invocation {
    pub fn new(script_name: impl Into<String>, config: ScriptConfig) -> Self {
        Self {
            script_name: script_name.into(),
            config,
        }
    }
}

/// Launches and supervises script processes.
///
/// Held behind an `Arc` and shared by every connection; it carries no
/// per-run state, so concurrent launches never contend.
pub struct Orchestrator {
    builder: CommandBuilder,
    temp_files: TempResourceManager,
    reporter: Option<Arc<dyn UsageReporter>>,
    drain_timeout: Duration,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            builder: CommandBuilder::new(config.runtimes, config.temp_dir, config.env_file_grace),
            temp_files: TempResourceManager::new(),
            reporter: None,
            drain_timeout: config.drain_timeout,
        }
    }

    /// Send every terminal result to `reporter`.
    pub fn with_usage_reporter(mut self, reporter: Arc<dyn UsageReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn temp_files(&self) -> &TempResourceManager {
        &self.temp_files
    }

    /// Start `invocation`, streaming its events into `channel`.
    ///
    /// Returns once the process has been spawned; supervision continues on a
    /// background task. On error the setup error event has already been
    /// emitted and the caller only needs to log it.
    pub async fn launch(
        &self,
        invocation: Invocation,
        sources: &[Source],
        channel: Arc<dyn OutputChannel>,
    ) -> Result<RunHandle, RunError> {
        let run_id = Uuid::new_v4();
        let emitter = Arc::new(RunEmitter::new(channel));

        tracing::info!(
            %run_id,
            script = %invocation.script_name,
            source_id = %invocation.config.source_id,
            sources = sources.len(),
            state = %RunState::Spawning,
            "Launching script"
        );

        let child = match self.spawn(&invocation, sources).await {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(
                    %run_id,
                    script = %invocation.script_name,
                    state = %RunState::SetupFailed,
                    error = %e,
                    "Script setup failed"
                );
                emitter.emit(RunEvent::setup_error(e.to_string()));
                usage::dispatch(self.reporter.clone(), UsageRecord::setup_failed());
                return Err(e);
            }
        };

        tracing::info!(%run_id, pid = ?child.id(), "Script process started");

        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(RunState::Running);
        let reporter = self.reporter.clone();
        let drain_timeout = self.drain_timeout;
        let task_cancel = cancel.clone();

        let task = tokio::spawn(async move {
            let code = subprocess::supervise(child, emitter, task_cancel, drain_timeout).await;
            tracing::info!(%run_id, exit_code = code, "Script process exited");
            let _ = state_tx.send(RunState::Exited { code });
            usage::dispatch(reporter, UsageRecord::exited(code));
            code
        });

        Ok(RunHandle {
            id: run_id,
            script: invocation.script_name,
            cancel,
            state: state_rx,
            task,
        })
    }

    /// Steps 1-4: resolve, build, register temp files, spawn.
    async fn spawn(
        &self,
        invocation: &Invocation,
        sources: &[Source],
    ) -> Result<tokio::process::Child, RunError> {
        let path = sources::resolve(&invocation.script_name, sources).await?;
        let script = ResolvedScript::new(path)?;
        let command = self.builder.build(&script, &invocation.config).await?;

        for file in &command.temp_files {
            self.temp_files.schedule(file.clone()).await;
        }

        match subprocess::spawn(&command) {
            Ok(child) => Ok(child),
            Err(e) => {
                for file in &command.temp_files {
                    self.temp_files.release_now(&file.path).await;
                }
                Err(RunError::Spawn(e))
            }
        }
    }
}

/// Reference to a live invocation.
///
/// Dropping the handle detaches from the run without stopping it: the
/// process keeps running, its events are dropped if nobody listens, and its
/// temp files are still reclaimed.
#[derive(Debug)]
pub struct RunHandle {
    id: Uuid,
    script: String,
    cancel: CancellationToken,
    state: watch::Receiver<RunState>,
    task: JoinHandle<i32>,
}

impl RunHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Kill the process. A no-op once the run has exited.
    pub fn terminate(&self) {
        if self.state().is_terminal() {
            return;
        }
        tracing::info!(run_id = %self.id, script = %self.script, "Run termination requested");
        self.cancel.cancel();
    }

    /// Wait for the process to exit and return its exit code.
    pub async fn wait(self) -> i32 {
        self.task.await.unwrap_or_else(|e| {
            tracing::error!(run_id = %self.id, error = %e, "Run supervisor task failed");
            SYNTHESIZED_EXIT_CODE
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
