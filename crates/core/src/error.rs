/// Reasons a script invocation can fail before (or while) its process runs.
///
/// Every variant short-circuits the invocation and is reported to the
/// observer as a single terminal setup error. Nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The script name is absent from every configured source.
    #[error("Script not found in any source")]
    NotFound { script: String },

    /// The script cannot be turned into a command (unsupported extension,
    /// malformed configuration).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The OS could not create the process.
    #[error("Failed to start process: {0}")]
    Spawn(#[source] std::io::Error),

    /// Per-run setup failed before spawning (e.g. the env file could not be
    /// written).
    #[error("Runtime setup failed: {0}")]
    Runtime(String),
}
