use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};

use super::Session;
use crate::{common::types::SessionId, protocol::ServerMessage};

/// Fan-out to every connected session.
#[derive(Default)]
pub struct BroadcastHub {
    sessions: DashMap<SessionId, Arc<Session>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, session: Arc<Session>) {
        info!("Session registered: {}", session.session_id);
        self.sessions.insert(session.session_id.clone(), session);
    }

    pub fn unregister(&self, session_id: &SessionId) -> Option<Arc<Session>> {
        let removed = self.sessions.remove(session_id).map(|(_, s)| s);
        if removed.is_some() {
            info!("Session unregistered: {}", session_id);
        }
        removed
    }

    /// Sends each message, encoded once, to every session in order.
    pub fn broadcast(&self, msgs: &[ServerMessage]) {
        if msgs.is_empty() {
            return;
        }
        let frames: Vec<String> = msgs.iter().map(ServerMessage::encode).collect();
        for session in self.sessions.iter() {
            for frame in &frames {
                if !session.send_json(frame.clone()) {
                    debug!("Dropping broadcast to closed session {}", session.session_id);
                    break;
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_reaches_every_session_in_order() {
        let hub = BroadcastHub::new();
        let mut receivers = Vec::new();
        for _ in 0..3 {
            let (tx, rx) = flume::unbounded();
            hub.register(Arc::new(Session::new(SessionId::generate(), tx)));
            receivers.push(rx);
        }

        hub.broadcast(&[ServerMessage::VolumeChanged(0.5), ServerMessage::QueueChanged(vec![])]);

        for rx in receivers {
            let got: Vec<String> = rx.try_iter().collect();
            assert_eq!(got, vec![r#"["v",0.5]"#.to_string(), r#"["q",[]]"#.to_string()]);
        }
    }

    #[test]
    fn unregistered_sessions_stop_receiving() {
        let hub = BroadcastHub::new();
        let (tx, rx) = flume::unbounded();
        let id = SessionId::generate();
        hub.register(Arc::new(Session::new(id.clone(), tx)));
        assert!(hub.unregister(&id).is_some());
        assert!(hub.is_empty());

        hub.broadcast(&[ServerMessage::VolumeChanged(0.5)]);
        assert!(rx.try_recv().is_err());
    }
}
