//! Shell script command builder.
//!
//! Runs `<shell> <script> [args...]` with the server environment overlaid
//! by the configured variables.

use std::path::Path;

use super::command::{interpreted, BuiltCommand};
use super::config::ScriptConfig;

/// Build the command for a `.sh` script.
pub fn build(shell: &str, script: &Path, config: &ScriptConfig) -> BuiltCommand {
    interpreted(shell, script, config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
