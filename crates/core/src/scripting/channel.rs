//! Sinks that receive run events.
//!
//! [`OutputChannel`] decouples orchestration from the transport. Emitting
//! into a channel whose observer has gone away is a silent no-op.
//! [`RunEmitter`] wraps a channel for one invocation and drops everything
//! after the terminal event.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use super::events::RunEvent;

/// Destination for an invocation's events.
pub trait OutputChannel: Send + Sync {
    /// Deliver `event`. Must not fail or block if the observer is gone.
    fn emit(&self, event: RunEvent);
}

impl OutputChannel for mpsc::UnboundedSender<RunEvent> {
    fn emit(&self, event: RunEvent) {
        // Closed receiver: observer gone, drop the event.
        let _ = self.send(event);
    }
}

/// Per-invocation emitter that latches after the first terminal event.
pub struct RunEmitter {
    channel: Arc<dyn OutputChannel>,
    terminated: Mutex<bool>,
}

impl RunEmitter {
    pub fn new(channel: Arc<dyn OutputChannel>) -> Self {
        Self {
            channel,
            terminated: Mutex::new(false),
        }
    }

    /// Forward `event` unless a terminal event has already been emitted.
    ///
    /// Returns whether the event was forwarded.
    pub fn emit(&self, event: RunEvent) -> bool {
        let mut terminated = self
            .terminated
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *terminated {
            tracing::trace!(?event, "Dropping event after terminal event");
            return false;
        }
        *terminated = event.is_terminal();
        self.channel.emit(event);
        true
    }

    pub fn is_terminated(&self) -> bool {
        *self
            .terminated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
