use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::broadcaster::{Broadcaster, ParticipantLink};
use crate::constants::PLAYERS_PER_MATCH;
use crate::engine::MatchEngine;
use crate::entity::MatchInputs;
use crate::level::Level;
use crate::runner::{MatchRunner, MatchTiming};
use crate::server_protocol::ServerMessage;
use crate::types::KeyIntent;

struct ClientEntry {
    tx: mpsc::Sender<String>,
    connected: Arc<AtomicBool>,
}

struct Membership {
    match_id: u64,
    inputs: Arc<MatchInputs>,
    entity: usize,
}

#[derive(Default)]
struct MatchmakerState {
    clients: HashMap<String, ClientEntry>,
    waiting: VecDeque<String>,
    memberships: HashMap<String, Membership>,
}

impl MatchmakerState {
    fn send(&self, id: &str, message: &ServerMessage) {
        let Some(client) = self.clients.get(id) else {
            return;
        };
        match message.encode() {
            Ok(payload) => {
                let _ = client.tx.try_send(payload);
            }
            Err(err) => warn!(participant = %id, error = %err, "failed to encode message"),
        }
    }

    fn link_for(&self, id: &str) -> ParticipantLink {
        match self.clients.get(id) {
            Some(client) => {
                ParticipantLink::new(id.to_string(), client.tx.clone(), client.connected.clone())
            }
            None => {
                let (tx, _) = mpsc::channel(1);
                ParticipantLink::new(id.to_string(), tx, Arc::new(AtomicBool::new(false)))
            }
        }
    }
}

/// Process-wide waiting queue. Every fifth arrival starts a match with the
/// five oldest waiting participants.
pub struct Matchmaker {
    level: Arc<Level>,
    timing: MatchTiming,
    state: Mutex<MatchmakerState>,
    next_participant: AtomicU64,
    next_match: AtomicU64,
}

impl Matchmaker {
    pub fn new(level: Arc<Level>) -> Self {
        Self {
            level,
            timing: MatchTiming::default(),
            state: Mutex::new(MatchmakerState::default()),
            next_participant: AtomicU64::new(1),
            next_match: AtomicU64::new(1),
        }
    }

    pub fn with_timing(mut self, timing: MatchTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Registers a connection, tells it its id and queues it.
    pub async fn join(&self, tx: mpsc::Sender<String>) -> String {
        let id = format!(
            "participant_{}",
            self.next_participant.fetch_add(1, Ordering::Relaxed)
        );
        let mut guard = self.state.lock().await;
        guard.clients.insert(
            id.clone(),
            ClientEntry {
                tx,
                connected: Arc::new(AtomicBool::new(true)),
            },
        );
        guard.send(&id, &ServerMessage::Id(id.clone()));
        guard.waiting.push_back(id.clone());
        info!(participant = %id, waiting = guard.waiting.len(), "participant joined");
        self.evaluate_queue(&mut guard);
        id
    }

    pub async fn leave(&self, id: &str) {
        let mut guard = self.state.lock().await;
        let Some(client) = guard.clients.remove(id) else {
            return;
        };
        client.connected.store(false, Ordering::Relaxed);

        if let Some(pos) = guard.waiting.iter().position(|waiting| waiting == id) {
            guard.waiting.remove(pos);
            info!(participant = %id, "participant left queue");
            self.evaluate_queue(&mut guard);
            return;
        }
        if let Some(membership) = guard.memberships.remove(id) {
            membership.inputs.disconnect(membership.entity);
            info!(participant = %id, match_id = membership.match_id, "participant left match");
        }
    }

    /// Hands an intent to the participant's match. Returns false when the
    /// participant is queued or unknown and the intent was dropped.
    pub async fn route_intent(&self, id: &str, intent: KeyIntent) -> bool {
        let guard = self.state.lock().await;
        let Some(membership) = guard.memberships.get(id) else {
            debug!(participant = %id, "dropping intent without a match");
            return false;
        };
        membership.inputs.store(membership.entity, intent);
        true
    }

    pub async fn waiting_len(&self) -> usize {
        self.state.lock().await.waiting.len()
    }

    pub async fn match_of(&self, id: &str) -> Option<u64> {
        self.state
            .lock()
            .await
            .memberships
            .get(id)
            .map(|membership| membership.match_id)
    }

    fn evaluate_queue(&self, state: &mut MatchmakerState) {
        let count = state.waiting.len();
        debug!(waiting = count, "queue changed");
        for id in &state.waiting {
            state.send(id, &ServerMessage::NumPlayers(count));
        }
        while state.waiting.len() >= PLAYERS_PER_MATCH {
            let members: Vec<String> = state.waiting.drain(..PLAYERS_PER_MATCH).collect();
            self.start_match(state, members);
        }
    }

    fn start_match(&self, state: &mut MatchmakerState, members: Vec<String>) {
        let match_id = self.next_match.fetch_add(1, Ordering::Relaxed);
        let engine = MatchEngine::new(self.level.clone(), rand::random::<u32>());
        let roles = engine.roles();
        let inputs = Arc::new(MatchInputs::default());

        let mut links = Vec::with_capacity(PLAYERS_PER_MATCH);
        for (slot, id) in members.iter().enumerate() {
            links.push(state.link_for(id));
            state.memberships.insert(
                id.clone(),
                Membership {
                    match_id,
                    inputs: inputs.clone(),
                    entity: roles[slot],
                },
            );
        }
        info!(match_id, participants = ?members, roles = ?roles, "match formed");

        let runner = MatchRunner::new(match_id, engine, Broadcaster::new(links), inputs)
            .with_timing(self.timing);
        runner.announce_roles();
        tokio::spawn(runner.run());
    }
}
