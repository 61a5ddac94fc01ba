//! Ownership of ephemeral files created for a run.
//!
//! Files are registered with a time-to-live and deleted by a background
//! timer, or immediately via [`TempResourceManager::release_now`]. Deletion
//! is best-effort: failures are logged and never reach the invocation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// A file that must not outlive its run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempFile {
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    /// Lifetime counted from `created_at`.
    pub ttl: Duration,
}

impl TempFile {
    pub fn new(path: PathBuf, ttl: Duration) -> Self {
        Self {
            path,
            created_at: Utc::now(),
            ttl,
        }
    }

    /// Wall-clock time after which the file is due for deletion.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::zero())
    }
}

/// Tracks pending temp files and deletes them when their TTL elapses.
///
/// Cheap to clone; all clones share the same registry.
#[derive(Clone, Default)]
pub struct TempResourceManager {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    pending: Mutex<HashSet<PathBuf>>,
    shutdown: CancellationToken,
}

impl TempResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `file` for deletion once its TTL has elapsed.
    ///
    /// The timer runs regardless of whether the owning process is still
    /// alive. [`release_all`](Self::release_all) short-circuits it.
    pub async fn schedule(&self, file: TempFile) {
        self.inner.pending.lock().await.insert(file.path.clone());

        let manager = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(file.ttl) => {}
                () = manager.inner.shutdown.cancelled() => {}
            }
            manager.release_now(&file.path).await;
        });
    }

    /// Delete `path` now. Deleting an already-removed file is not an error.
    pub async fn release_now(&self, path: &Path) {
        self.inner.pending.lock().await.remove(path);

        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Temp file deleted");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::trace!(path = %path.display(), "Temp file already gone");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to delete temp file");
            }
        }
    }

    /// Delete every pending file immediately and fire all outstanding timers.
    ///
    /// Used during shutdown.
    pub async fn release_all(&self) {
        self.inner.shutdown.cancel();

        let paths: Vec<PathBuf> = self.inner.pending.lock().await.drain().collect();
        let count = paths.len();
        for path in paths {
            self.release_now(&path).await;
        }
        tracing::info!(count, "Released pending temp files");
    }

    /// Number of files still awaiting deletion.
    pub async fn pending_count(&self) -> usize {
        self.inner.pending.lock().await.len()
    }
}
