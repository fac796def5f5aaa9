use crate::{common::types::SessionId, protocol::ServerMessage};

/// One connected client. Holds nothing but its outbound channel.
pub struct Session {
    pub session_id: SessionId,
    sender: flume::Sender<String>,
}

impl Session {
    pub fn new(session_id: SessionId, sender: flume::Sender<String>) -> Self {
        Self { session_id, sender }
    }

    /// Queues an encoded frame. Returns false once the writer has gone away.
    pub fn send_json(&self, json: String) -> bool {
        self.sender.send(json).is_ok()
    }

    pub fn send_message(&self, msg: &ServerMessage) -> bool {
        self.send_json(msg.encode())
    }

    pub fn send_all(&self, msgs: &[ServerMessage]) {
        for msg in msgs {
            if !self.send_message(msg) {
                break;
            }
        }
    }
}
