use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info};

use crate::broadcaster::Broadcaster;
use crate::constants::{
    COUNTDOWN_HOLD_MS, PLAYERS_PER_MATCH, READY_HOLD_MS, SNAPSHOT_KEEPALIVE_TICKS, TICK_MS,
    TICK_SECONDS,
};
use crate::engine::{MatchEngine, PauseOutcome};
use crate::entity::MatchInputs;
use crate::server_protocol::ServerMessage;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchPhase {
    Starting,
    Ready,
    Countdown,
    Running,
    Paused,
    Terminated,
}

#[derive(Clone, Copy, Debug)]
pub struct MatchTiming {
    pub tick: Duration,
    pub ready_hold: Duration,
    pub countdown_hold: Duration,
}

impl Default for MatchTiming {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(TICK_MS),
            ready_hold: Duration::from_millis(READY_HOLD_MS),
            countdown_hold: Duration::from_millis(COUNTDOWN_HOLD_MS),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchSummary {
    pub match_id: u64,
    pub ticks: u64,
    pub rounds: u32,
    pub scores: [u32; PLAYERS_PER_MATCH],
    pub lives: i32,
}

/// Drives one match from role announcement until every participant is gone.
pub struct MatchRunner {
    match_id: u64,
    engine: MatchEngine,
    broadcaster: Broadcaster,
    inputs: Arc<MatchInputs>,
    timing: MatchTiming,
    phase: MatchPhase,
    rounds: u32,
}

impl MatchRunner {
    pub fn new(
        match_id: u64,
        engine: MatchEngine,
        broadcaster: Broadcaster,
        inputs: Arc<MatchInputs>,
    ) -> Self {
        Self {
            match_id,
            engine,
            broadcaster,
            inputs,
            timing: MatchTiming::default(),
            phase: MatchPhase::Starting,
            rounds: 0,
        }
    }

    pub fn with_timing(mut self, timing: MatchTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Tells each participant which entity it steers and which score slot is
    /// its own.
    pub fn announce_roles(&self) {
        let roles = self.engine.roles();
        let player_map = self.engine.player_map();
        // identity is the inverse permutation read at the participant's slot.
        for (slot, entity) in roles.iter().enumerate() {
            self.broadcaster
                .send_to(slot, &ServerMessage::PlayerNumber(*entity));
            self.broadcaster
                .send_to(slot, &ServerMessage::Identity(player_map[slot]));
        }
    }

    pub async fn run(mut self) -> MatchSummary {
        let mut fresh_match = true;

        'rounds: loop {
            self.set_phase(MatchPhase::Ready);
            self.rounds += 1;
            self.engine.reset_round(fresh_match);
            fresh_match = false;
            self.broadcaster.broadcast(&ServerMessage::Ready);
            self.broadcast_snapshot();
            sleep(self.timing.ready_hold).await;
            if !self.broadcaster.any_active() {
                break;
            }

            self.set_phase(MatchPhase::Countdown);
            sleep(self.timing.countdown_hold).await;
            self.broadcaster.broadcast(&ServerMessage::Go);
            self.set_phase(MatchPhase::Running);

            let mut next_tick = Instant::now();
            loop {
                if !self.broadcaster.any_active() {
                    break 'rounds;
                }
                next_tick += self.timing.tick;

                self.engine.apply_inputs(&self.inputs);
                let report = self.engine.step(TICK_SECONDS);
                let keepalive = report.tick % SNAPSHOT_KEEPALIVE_TICKS == 0;
                if report.changed || keepalive {
                    self.broadcast_snapshot();
                }

                if self.engine.is_paused() {
                    self.set_phase(MatchPhase::Paused);
                    if !(report.changed || keepalive) {
                        self.broadcast_snapshot();
                    }
                    let pause =
                        Duration::try_from_secs_f32(self.engine.pause_timer()).unwrap_or_default();
                    sleep(pause).await;
                    match self.engine.finish_pause() {
                        PauseOutcome::Resume => {
                            self.set_phase(MatchPhase::Running);
                            next_tick = Instant::now();
                            continue;
                        }
                        PauseOutcome::RoundRestart => {
                            info!(
                                match_id = self.match_id,
                                lives = self.engine.lives(),
                                tick = self.engine.tick(),
                                connected = self.broadcaster.active_count(),
                                "pacman caught, restarting round"
                            );
                            continue 'rounds;
                        }
                    }
                }

                sleep_until(next_tick).await;
            }
        }

        self.set_phase(MatchPhase::Terminated);
        let summary = MatchSummary {
            match_id: self.match_id,
            ticks: self.engine.tick(),
            rounds: self.rounds,
            scores: self.engine.scores(),
            lives: self.engine.lives(),
        };
        info!(
            match_id = summary.match_id,
            ticks = summary.ticks,
            rounds = summary.rounds,
            scores = ?summary.scores,
            "match terminated"
        );
        summary
    }

    fn broadcast_snapshot(&self) {
        self.broadcaster
            .broadcast(&ServerMessage::GameState(self.engine.build_snapshot()));
    }

    fn set_phase(&mut self, phase: MatchPhase) {
        debug!(match_id = self.match_id, from = ?self.phase, to = ?phase, "match phase");
        self.phase = phase;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use serde_json::Value;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use super::*;
    use crate::broadcaster::ParticipantLink;
    use crate::level::Level;
    use crate::types::{Direction, KeyIntent};

    // Ghost 1 starts in the corridor with Pacman at the far end.
    const CORRIDOR: &str = "\
#######
#G   P#
#GGG###
#######
";

    struct Fixture {
        runner: MatchRunner,
        receivers: Vec<mpsc::Receiver<String>>,
        connected: Vec<Arc<AtomicBool>>,
        inputs: Arc<MatchInputs>,
    }

    fn fixture(roles: [usize; PLAYERS_PER_MATCH]) -> Fixture {
        let level = Level::parse(CORRIDOR).expect("corridor should parse");
        let engine = MatchEngine::with_roles(Arc::new(level), roles);
        let mut links = Vec::new();
        let mut receivers = Vec::new();
        let mut connected = Vec::new();
        for slot in 0..PLAYERS_PER_MATCH {
            let (tx, rx) = mpsc::channel(1024);
            let flag = Arc::new(AtomicBool::new(true));
            links.push(ParticipantLink::new(format!("p{slot}"), tx, flag.clone()));
            receivers.push(rx);
            connected.push(flag);
        }
        let inputs = Arc::new(MatchInputs::default());
        let runner = MatchRunner::new(1, engine, Broadcaster::new(links), inputs.clone());
        Fixture {
            runner,
            receivers,
            connected,
            inputs,
        }
    }

    fn parse(raw: &str) -> Value {
        serde_json::from_str(raw).expect("outbound message should be json")
    }

    async fn next_label(rx: &mut mpsc::Receiver<String>) -> (String, Value) {
        let raw = rx.recv().await.expect("runner should still be sending");
        let value = parse(&raw);
        let label = value["label"].as_str().unwrap_or_default().to_string();
        (label, value)
    }

    #[test]
    fn starting_announces_role_and_identity() {
        let mut fx = fixture([3, 0, 4, 1, 2]);
        fx.runner.announce_roles();
        for (slot, rx) in fx.receivers.iter_mut().enumerate() {
            let player_number = parse(&rx.try_recv().expect("playerNumber"));
            let identity = parse(&rx.try_recv().expect("identity"));
            assert_eq!(player_number["label"], "playerNumber");
            assert_eq!(identity["label"], "identity");
            assert_eq!(player_number["data"], [3, 0, 4, 1, 2][slot]);
            assert_eq!(identity["data"], [1, 3, 4, 0, 2][slot]);
        }
        assert_eq!(fx.runner.phase(), MatchPhase::Starting);
    }

    #[tokio::test(start_paused = true)]
    async fn round_opens_with_ready_snapshot_then_go() {
        let mut fx = fixture([0, 1, 2, 3, 4]);
        let handle = tokio::spawn(fx.runner.run());
        let rx = &mut fx.receivers[2];

        let (label, _) = next_label(rx).await;
        assert_eq!(label, "ready");
        let (label, snapshot) = next_label(rx).await;
        assert_eq!(label, "gameState");
        assert_eq!(snapshot["data"]["tick"], 0);
        let (label, _) = next_label(rx).await;
        assert_eq!(label, "go");
        let (label, snapshot) = next_label(rx).await;
        assert_eq!(label, "gameState");
        assert_eq!(snapshot["data"]["tick"], SNAPSHOT_KEEPALIVE_TICKS);

        drop(fx.receivers);
        let summary = timeout(Duration::from_secs(5), handle)
            .await
            .expect("runner should stop once nobody listens")
            .expect("runner task should not panic");
        assert_eq!(summary.rounds, 1);
        assert_eq!(summary.lives, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn caught_pacman_pauses_then_restarts_round() {
        let mut fx = fixture([0, 1, 2, 3, 4]);
        fx.inputs.store(1, KeyIntent::only(Direction::Right));
        let handle = tokio::spawn(fx.runner.run());
        let rx = &mut fx.receivers[0];

        let (label, _) = next_label(rx).await;
        assert_eq!(label, "ready");

        let mut saw_death_pause = false;
        loop {
            let (label, value) = next_label(rx).await;
            if label == "ready" {
                break;
            }
            if label == "gameState" && value["data"]["death"] == true {
                assert_eq!(value["data"]["paused"], true);
                assert_eq!(value["data"]["scores"][1], 500);
                assert_eq!(value["data"]["playerMap"][0], 1);
                saw_death_pause = true;
            }
        }
        assert!(saw_death_pause);

        let (label, snapshot) = next_label(rx).await;
        assert_eq!(label, "gameState");
        assert_eq!(snapshot["data"]["lives"], 2);
        assert_eq!(snapshot["data"]["death"], false);
        assert_eq!(snapshot["data"]["entities"][0]["x"], 5.0);

        for flag in &fx.connected {
            flag.store(false, Ordering::Relaxed);
        }
        let summary = timeout(Duration::from_secs(10), handle)
            .await
            .expect("runner should stop once everyone disconnected")
            .expect("runner task should not panic");
        assert_eq!(summary.rounds, 2);
        assert_eq!(summary.scores[1], 500);
    }

    #[tokio::test(start_paused = true)]
    async fn partial_disconnect_keeps_match_running() {
        let mut fx = fixture([0, 1, 2, 3, 4]);
        for flag in &fx.connected[1..] {
            flag.store(false, Ordering::Relaxed);
        }
        let handle = tokio::spawn(fx.runner.run());

        let rx = &mut fx.receivers[0];
        let mut snapshots = 0;
        while snapshots < 5 {
            let (label, _) = next_label(rx).await;
            if label == "gameState" {
                snapshots += 1;
            }
        }
        assert!(fx.receivers[1].try_recv().is_err());
        assert!(!handle.is_finished());

        fx.connected[0].store(false, Ordering::Relaxed);
        let summary = timeout(Duration::from_secs(5), handle)
            .await
            .expect("runner should stop")
            .expect("runner task should not panic");
        assert!(summary.ticks >= 4 * SNAPSHOT_KEEPALIVE_TICKS);
    }
}
