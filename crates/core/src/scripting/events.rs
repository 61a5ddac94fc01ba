//! Lifecycle events emitted for one invocation, and their wire form.

use serde::{Deserialize, Serialize};

/// One message in an invocation's event stream.
///
/// `Exit` and `SetupError` are terminal; exactly one of them is emitted per
/// invocation and nothing follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// A chunk of the process's stdout.
    Output { text: String },
    /// A chunk of the process's stderr, or a process-level error notice.
    Error { text: String },
    /// The process terminated.
    Exit { code: i32, message: String },
    /// The invocation failed before a process existed.
    SetupError { message: String },
}

impl RunEvent {
    pub fn output(text: impl Into<String>) -> Self {
        Self::Output { text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::Error { text: text.into() }
    }

    pub fn exit(code: i32) -> Self {
        Self::Exit {
            code,
            message: format!("Process exited with code {code}"),
        }
    }

    pub fn setup_error(message: impl Into<String>) -> Self {
        Self::SetupError {
            message: message.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exit { .. } | Self::SetupError { .. })
    }
}

/// JSON frame sent to observers: `{"type": "...", "data": "..."}`.
///
/// A setup error travels as an `error` frame; the observer treats it as
/// the end of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum WireEvent {
    Output(String),
    Error(String),
    Exit(String),
}

impl From<&RunEvent> for WireEvent {
    fn from(event: &RunEvent) -> Self {
        match event {
            RunEvent::Output { text } => Self::Output(text.clone()),
            RunEvent::Error { text } => Self::Error(text.clone()),
            RunEvent::Exit { message, .. } => Self::Exit(message.clone()),
            RunEvent::SetupError { message } => Self::Error(message.clone()),
        }
    }
}

impl WireEvent {
    pub fn to_json(&self) -> String {
        // Serializing a string-only enum cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}
