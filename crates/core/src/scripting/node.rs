//! Node-style JavaScript command builder.

use std::path::Path;

use super::command::{interpreted, BuiltCommand};
use super::config::ScriptConfig;

/// Build the command for a `.js` script: `<node> <script> [args...]`.
pub fn build(node: &str, script: &Path, config: &ScriptConfig) -> BuiltCommand {
    interpreted(node, script, config)
}
