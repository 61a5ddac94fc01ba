//! Lifecycle states of a single invocation.

use std::fmt;

/// Exit code reported when the OS gives none (killed by a signal, lost
/// track of the process).
pub const SYNTHESIZED_EXIT_CODE: i32 = -1;

/// Where an invocation is in its lifecycle.
///
/// `Spawning → Running → Exited`, or `Spawning → SetupFailed` when no
/// process was ever created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Spawning,
    Running,
    Exited { code: i32 },
    SetupFailed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exited { .. } | Self::SetupFailed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spawning => "spawning",
            Self::Running => "running",
            Self::Exited { .. } => "exited",
            Self::SetupFailed => "setup_failed",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
