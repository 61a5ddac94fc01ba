//! Source snapshot provider.
//!
//! The configured script sources live in `<DATA_DIR>/sources.json`. The
//! file is read fresh on every call so edits take effect on the next run
//! without a restart. When the file does not exist a single built-in
//! source pointing at `SCRIPTS_DIR` is used.

use std::path::{Path, PathBuf};

use scriptsui_core::scripting::sources::Source;

/// File name of the source list inside the data directory.
pub const SOURCES_FILE: &str = "sources.json";

/// Id of the built-in source used when no source list exists.
pub const DEFAULT_SOURCE_ID: &str = "default";

#[derive(Debug, thiserror::Error)]
pub enum SourceStoreError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid source list in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads the ordered source list.
#[derive(Debug, Clone)]
pub struct SourceStore {
    data_dir: PathBuf,
    scripts_dir: PathBuf,
}

impl SourceStore {
    pub fn new(data_dir: impl Into<PathBuf>, scripts_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            scripts_dir: scripts_dir.into(),
        }
    }

    pub fn file_path(&self) -> PathBuf {
        self.data_dir.join(SOURCES_FILE)
    }

    /// The source used when no source list has been saved.
    pub fn default_source(&self) -> Source {
        Source {
            id: DEFAULT_SOURCE_ID.to_string(),
            name: "Project Scripts".to_string(),
            path: self.scripts_dir.clone(),
            is_default: true,
        }
    }

    /// Current snapshot of the configured sources, in resolution order.
    pub async fn snapshot(&self) -> Result<Vec<Source>, SourceStoreError> {
        let path = self.file_path();
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => parse(&path, &raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No source list, using default source");
                Ok(vec![self.default_source()])
            }
            Err(source) => Err(SourceStoreError::Read { path, source }),
        }
    }
}

fn parse(path: &Path, raw: &str) -> Result<Vec<Source>, SourceStoreError> {
    serde_json::from_str(raw).map_err(|source| SourceStoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
