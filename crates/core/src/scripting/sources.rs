//! Script lookup across ordered source directories.
//!
//! Sources are consulted in the order given; the first directory that
//! contains an entry named exactly like the requested script wins. A source
//! that cannot be read (deleted directory, permissions) is logged and
//! skipped, never fatal.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::command::RuntimeKind;
use crate::error::RunError;

/// A named directory that may contain scripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub is_default: bool,
}

/// Scripts with a supported extension found in one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceListing {
    pub source_id: String,
    pub source_name: String,
    pub scripts: Vec<String>,
}

/// Locate `script_name` in the first source that contains it.
///
/// Matching is done against directory entries, so a name carrying path
/// separators (`../x.sh`) can never resolve outside a source.
pub async fn resolve(script_name: &str, sources: &[Source]) -> Result<PathBuf, RunError> {
    for source in sources {
        let entries = match entry_names(&source.path).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    source_id = %source.id,
                    path = %source.path.display(),
                    error = %e,
                    "Skipping unreadable script source"
                );
                continue;
            }
        };

        if entries.iter().any(|name| name == script_name) {
            tracing::debug!(
                script = script_name,
                source_id = %source.id,
                "Resolved script"
            );
            return Ok(source.path.join(script_name));
        }
    }

    Err(RunError::NotFound {
        script: script_name.to_string(),
    })
}

/// List runnable scripts per source, sorted by name.
///
/// Unreadable sources are reported with an empty script list.
pub async fn list_scripts(sources: &[Source]) -> Vec<SourceListing> {
    let mut listings = Vec::with_capacity(sources.len());

    for source in sources {
        let mut scripts: Vec<String> = match entry_names(&source.path).await {
            Ok(entries) => entries
                .into_iter()
                .filter(|name| RuntimeKind::from_path(Path::new(name)).is_ok())
                .collect(),
            Err(e) => {
                tracing::warn!(
                    source_id = %source.id,
                    path = %source.path.display(),
                    error = %e,
                    "Failed to list script source"
                );
                Vec::new()
            }
        };
        scripts.sort();

        listings.push(SourceListing {
            source_id: source.id.clone(),
            source_name: source.name.clone(),
            scripts,
        });
    }

    listings
}

/// Read the entry names of a directory. Non-UTF-8 names are skipped.
async fn entry_names(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = read_dir.next_entry().await? {
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }
    Ok(names)
}
