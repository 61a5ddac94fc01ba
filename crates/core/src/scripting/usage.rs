//! Fire-and-forget reporting of run outcomes.
//!
//! The orchestrator hands a [`UsageRecord`] to a [`UsageReporter`] after
//! the terminal event has been emitted. Reports run on their own task with
//! a bounded timeout; failures are logged at debug level and never affect
//! the invocation.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

/// Upper bound on a single report, including network time.
pub const USAGE_REPORT_TIMEOUT: Duration = Duration::from_secs(5);

/// Exit code as reported to telemetry: numeric for exited processes, a
/// label for runs that never started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum UsageExitCode {
    Code(i32),
    Label(String),
}

impl fmt::Display for UsageExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "{code}"),
            Self::Label(label) => f.write_str(label),
        }
    }
}

/// Terminal result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageRecord {
    pub exit_code: UsageExitCode,
    pub error: bool,
}

impl UsageRecord {
    pub fn exited(code: i32) -> Self {
        Self {
            exit_code: UsageExitCode::Code(code),
            error: code != 0,
        }
    }

    pub fn setup_failed() -> Self {
        Self {
            exit_code: UsageExitCode::Label("setup_error".to_string()),
            error: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("usage report failed: {0}")]
pub struct UsageReportError(pub String);

/// Receives terminal results for optional telemetry.
#[async_trait]
pub trait UsageReporter: Send + Sync {
    async fn report(&self, record: UsageRecord) -> Result<(), UsageReportError>;
}

/// Send `record` on a detached task. Never awaited by the caller.
pub fn dispatch(reporter: Option<Arc<dyn UsageReporter>>, record: UsageRecord) {
    let Some(reporter) = reporter else {
        return;
    };

    tokio::spawn(async move {
        match tokio::time::timeout(USAGE_REPORT_TIMEOUT, reporter.report(record)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(error = %e, "Usage report dropped"),
            Err(_) => tracing::debug!("Usage report timed out"),
        }
    });
}
