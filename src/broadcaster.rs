use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;

use crate::server_protocol::ServerMessage;

/// One participant's outbound side as seen by its match.
#[derive(Clone, Debug)]
pub struct ParticipantLink {
    pub id: String,
    tx: mpsc::Sender<String>,
    connected: Arc<AtomicBool>,
}

impl ParticipantLink {
    pub fn new(id: String, tx: mpsc::Sender<String>, connected: Arc<AtomicBool>) -> Self {
        Self { id, tx, connected }
    }

    /// A link is active until its participant leaves or its writer goes away.
    pub fn is_active(&self) -> bool {
        self.connected.load(Ordering::Relaxed) && !self.tx.is_closed()
    }

    /// Fire-and-forget. A full or closed queue drops the payload.
    pub fn send_raw(&self, payload: String) -> bool {
        self.tx.try_send(payload).is_ok()
    }
}

/// Fans match messages out to its participants in slot order.
#[derive(Clone, Debug)]
pub struct Broadcaster {
    links: Vec<ParticipantLink>,
}

impl Broadcaster {
    pub fn new(links: Vec<ParticipantLink>) -> Self {
        Self { links }
    }

    pub fn any_active(&self) -> bool {
        self.links.iter().any(ParticipantLink::is_active)
    }

    pub fn active_count(&self) -> usize {
        self.links.iter().filter(|link| link.is_active()).count()
    }

    /// Serializes once, then offers the payload to every active link.
    /// Returns how many links accepted it.
    pub fn broadcast(&self, message: &ServerMessage) -> usize {
        let payload = match message.encode() {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "failed to encode broadcast");
                return 0;
            }
        };
        self.links
            .iter()
            .filter(|link| link.is_active())
            .filter(|link| link.send_raw(payload.clone()))
            .count()
    }

    /// Sends to the participant in `slot` only.
    pub fn send_to(&self, slot: usize, message: &ServerMessage) -> bool {
        let Some(link) = self.links.get(slot) else {
            return false;
        };
        if !link.is_active() {
            return false;
        }
        match message.encode() {
            Ok(payload) => link.send_raw(payload),
            Err(err) => {
                warn!(participant = %link.id, error = %err, "failed to encode message");
                false
            }
        }
    }
}
