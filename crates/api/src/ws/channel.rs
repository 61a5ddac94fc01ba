use axum::extract::ws::Message;
use scriptsui_core::scripting::channel::OutputChannel;
use scriptsui_core::scripting::events::{RunEvent, WireEvent};

use super::manager::WsSender;

/// Delivers run events to one WebSocket connection as JSON text frames.
#[derive(Clone)]
pub struct WsChannel {
    sender: WsSender,
}

impl WsChannel {
    pub fn new(sender: WsSender) -> Self {
        Self { sender }
    }

    /// Send a frame that is not tied to a run.
    pub fn send_wire(&self, event: &WireEvent) {
        let _ = self.sender.send(Message::Text(event.to_json().into()));
    }
}

impl OutputChannel for WsChannel {
    fn emit(&self, event: RunEvent) {
        // A closed sender means the client is gone; the event is dropped.
        self.send_wire(&WireEvent::from(&event));
    }
}
