//! Spawning and supervising a script process.
//!
//! [`spawn`] starts a [`BuiltCommand`] with piped output; [`supervise`]
//! forwards stdout/stderr chunks as they arrive, waits for exit (or
//! cancellation), drains the streams, and emits the single exit event.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::channel::RunEmitter;
use super::command::BuiltCommand;
use super::events::RunEvent;
use super::status::SYNTHESIZED_EXIT_CODE;

/// Read buffer size per stream.
const CHUNK_BYTES: usize = 8 * 1024;

/// Start `command` with stdout/stderr piped and stdin closed.
///
/// `kill_on_drop(true)` ties the process to its supervising task: if the
/// runtime tears the task down, the child goes with it.
pub fn spawn(command: &BuiltCommand) -> std::io::Result<Child> {
    let mut cmd = command.to_command();
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd.spawn()
}

/// Which output stream a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    fn event(self, text: String) -> RunEvent {
        match self {
            Self::Stdout => RunEvent::Output { text },
            Self::Stderr => RunEvent::Error { text },
        }
    }
}

/// Forward output until the process exits, then emit its exit event.
///
/// Returns the reported exit code. A cancelled run is killed and reported
/// with whatever code the OS gives ([`SYNTHESIZED_EXIT_CODE`] for a signal).
pub async fn supervise(
    mut child: Child,
    emitter: Arc<RunEmitter>,
    cancel: CancellationToken,
    drain_timeout: Duration,
) -> i32 {
    let stdout = tokio::spawn(pump(child.stdout.take(), Arc::clone(&emitter), StreamKind::Stdout));
    let stderr = tokio::spawn(pump(child.stderr.take(), Arc::clone(&emitter), StreamKind::Stderr));

    let waited = tokio::select! {
        status = child.wait() => status,
        () = cancel.cancelled() => {
            tracing::info!(pid = ?child.id(), "Terminating script process");
            if let Err(e) = child.start_kill() {
                tracing::warn!(error = %e, "Failed to kill script process");
            }
            child.wait().await
        }
    };

    drain(stdout, stderr, drain_timeout).await;

    let code = match waited {
        Ok(status) => status.code().unwrap_or(SYNTHESIZED_EXIT_CODE),
        Err(e) => {
            tracing::error!(error = %e, "Lost track of script process");
            emitter.emit(RunEvent::error(format!("Process error: {e}")));
            SYNTHESIZED_EXIT_CODE
        }
    };

    emitter.emit(RunEvent::exit(code));
    code
}

/// Wait for both stream pumps, abandoning them after `timeout`.
async fn drain(mut stdout: JoinHandle<()>, mut stderr: JoinHandle<()>, timeout: Duration) {
    let joined = tokio::time::timeout(timeout, async {
        let _ = (&mut stdout).await;
        let _ = (&mut stderr).await;
    })
    .await;

    if joined.is_err() {
        tracing::warn!(
            timeout_ms = timeout.as_millis() as u64,
            "Output streams still open after exit; abandoning remaining output"
        );
        stdout.abort();
        stderr.abort();
    }
}

/// Emit every chunk read from `reader` as an event of `kind`.
async fn pump<R: AsyncRead + Unpin>(reader: Option<R>, emitter: Arc<RunEmitter>, kind: StreamKind) {
    let Some(mut reader) = reader else {
        return;
    };

    let mut decoder = Utf8Chunker::default();
    let mut buf = vec![0u8; CHUNK_BYTES];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if let Some(text) = decoder.push(&buf[..n]) {
                    emitter.emit(kind.event(text));
                }
            }
            Err(e) => {
                tracing::debug!(stream = ?kind, error = %e, "Output stream read failed");
                break;
            }
        }
    }

    if let Some(text) = decoder.finish() {
        emitter.emit(kind.event(text));
    }
}

/// Decodes a byte stream into UTF-8 chunks without splitting a multi-byte
/// character across two events.
#[derive(Debug, Default)]
struct Utf8Chunker {
    pending: Vec<u8>,
}

impl Utf8Chunker {
    fn push(&mut self, bytes: &[u8]) -> Option<String> {
        self.pending.extend_from_slice(bytes);

        let mut text = String::new();
        let mut rest: &[u8] = &self.pending;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        // Invalid bytes: replace them and keep decoding.
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        // Incomplete sequence at the end: hold it back for the next read.
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        self.pending = rest.to_vec();
        (!text.is_empty()).then_some(text)
    }

    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
