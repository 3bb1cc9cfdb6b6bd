use std::sync::Arc;

use crate::constants::{
    GHOST_BASE_SPEED, GHOST_RELEASE_SECONDS, PACMAN_BASE_SPEED, PACMAN_INDEX, PLAYERS_PER_MATCH,
    STARTING_BONUS, STARTING_LIVES, TIMER_EPSILON,
};
use crate::entity::{Entity, MatchInputs, Role};
use crate::level::{Grid, Level};
use crate::rng::Rng;
use crate::types::{Direction, GhostColor, GhostMode, Point, Snapshot};

mod movement;
mod rules;
mod utils;

/// What the loop should do once a pause has run out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PauseOutcome {
    Resume,
    RoundRestart,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub changed: bool,
}

#[derive(Clone, Debug, PartialEq)]
struct EntityFingerprint {
    position: Point,
    facing: Direction,
    moving: bool,
    mode: Option<GhostMode>,
    active: bool,
    just_eaten: bool,
}

#[derive(Clone, Debug, PartialEq)]
struct Fingerprint {
    entities: Vec<EntityFingerprint>,
    scores: [u32; PLAYERS_PER_MATCH],
    lives: i32,
    death: bool,
}

/// Authoritative state of one match. Entity 0 is Pacman, 1..=4 are ghosts.
///
/// The engine is clock-free: `step` advances by the given `dt` and never
/// sleeps. Pauses are only flagged here; the caller waits them out and then
/// calls [`MatchEngine::finish_pause`].
#[derive(Clone, Debug)]
pub struct MatchEngine {
    level: Arc<Level>,
    grid: Grid,
    entities: Vec<Entity>,
    /// participant slot -> entity it steers. Fixed for the whole match.
    roles: [usize; PLAYERS_PER_MATCH],
    /// entity -> participant slot credited for that entity's points.
    player_map: [usize; PLAYERS_PER_MATCH],
    scores: [u32; PLAYERS_PER_MATCH],
    lives: i32,
    pill_timer: f32,
    pause_timer: f32,
    bonus: u32,
    death: bool,
    pacman_slowdown: f32,
    /// Entities whose participant left; they hold their position.
    departed: [bool; PLAYERS_PER_MATCH],
    tick: u64,
}

impl MatchEngine {
    pub fn new(level: Arc<Level>, seed: u32) -> Self {
        let mut rng = Rng::new(seed);
        Self::with_roles(level, rng.permutation())
    }

    pub fn with_roles(level: Arc<Level>, roles: [usize; PLAYERS_PER_MATCH]) -> Self {
        let mut player_map = [0; PLAYERS_PER_MATCH];
        for (participant, entity) in roles.iter().enumerate() {
            player_map[*entity] = participant;
        }

        let mut entities = Vec::with_capacity(PLAYERS_PER_MATCH);
        entities.push(Entity::pacman(level.pacman_start.into(), PACMAN_BASE_SPEED));
        for (idx, color) in GhostColor::ALL.iter().enumerate() {
            entities.push(Entity::ghost(
                level.ghost_spawns[idx].into(),
                GHOST_BASE_SPEED,
                *color,
                GHOST_RELEASE_SECONDS[idx],
            ));
        }

        Self {
            grid: level.grid.clone(),
            level,
            entities,
            roles,
            player_map,
            scores: [0; PLAYERS_PER_MATCH],
            lives: STARTING_LIVES,
            pill_timer: 0.0,
            pause_timer: 0.0,
            bonus: STARTING_BONUS,
            death: false,
            pacman_slowdown: 0.0,
            departed: [false; PLAYERS_PER_MATCH],
            tick: 0,
        }
    }

    pub fn roles(&self) -> [usize; PLAYERS_PER_MATCH] {
        self.roles
    }

    pub fn player_map(&self) -> [usize; PLAYERS_PER_MATCH] {
        self.player_map
    }

    pub fn scores(&self) -> [u32; PLAYERS_PER_MATCH] {
        self.scores
    }

    pub fn lives(&self) -> i32 {
        self.lives
    }

    pub fn bonus(&self) -> u32 {
        self.bonus
    }

    pub fn pill_timer(&self) -> f32 {
        self.pill_timer
    }

    pub fn pause_timer(&self) -> f32 {
        self.pause_timer
    }

    pub fn death(&self) -> bool {
        self.death
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn is_paused(&self) -> bool {
        self.pause_timer > 0.0
    }

    /// Copies the live intents written by the transport into the entities.
    pub fn apply_inputs(&mut self, inputs: &MatchInputs) {
        for (idx, entity) in self.entities.iter_mut().enumerate() {
            entity.intent = inputs.load(idx);
            self.departed[idx] = inputs.is_departed(idx);
        }
    }

    /// Puts everyone back at the round-start layout. Pellets are restored only
    /// for a fresh match; after a life loss they stay as they were.
    pub fn reset_round(&mut self, fresh_match: bool) {
        if fresh_match {
            self.grid = self.level.grid.clone();
        }
        for (idx, entity) in self.entities.iter_mut().enumerate() {
            entity.send_home();
            if let Some(ghost) = entity.ghost_state_mut() {
                let release_after = GHOST_RELEASE_SECONDS[idx - 1];
                ghost.mode = GhostMode::Normal;
                ghost.active = release_after <= 0.0;
                ghost.inactive_timer = release_after;
                ghost.just_eaten = false;
            }
        }
        self.pill_timer = 0.0;
        self.pause_timer = 0.0;
        self.bonus = STARTING_BONUS;
        self.death = false;
        self.pacman_slowdown = 0.0;
    }

    /// One fixed-timestep update. Does nothing while a pause is pending.
    pub fn step(&mut self, dt: f32) -> TickReport {
        if self.is_paused() {
            return TickReport {
                tick: self.tick,
                changed: false,
            };
        }
        let before = self.fingerprint();
        self.tick += 1;

        for entity in &mut self.entities {
            if let Some(ghost) = entity.ghost_state_mut() {
                ghost.just_eaten = false;
            }
        }

        for idx in 0..self.entities.len() {
            if self.departed[idx] {
                self.entities[idx].moving = false;
            } else if self.entities[idx].is_active() {
                self.move_entity(idx, dt);
            }
        }
        self.pacman_slowdown = (self.pacman_slowdown - dt).max(0.0);

        let frightened = self.consume_pellet();
        self.resolve_collisions(frightened.unwrap_or_default());
        if frightened.is_none() {
            self.update_pill_timer(dt);
        }
        self.update_ghost_release(dt);
        self.recycle_dead_ghosts();

        TickReport {
            tick: self.tick,
            changed: before != self.fingerprint(),
        }
    }

    /// Clears the pending pause. A pause caused by Pacman being caught costs
    /// a life and restarts the round.
    pub fn finish_pause(&mut self) -> PauseOutcome {
        self.pause_timer = 0.0;
        if !self.death {
            return PauseOutcome::Resume;
        }
        self.lives -= 1;
        if self.lives < 0 {
            self.lives = STARTING_LIVES;
        }
        PauseOutcome::RoundRestart
    }

    pub fn build_snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.tick,
            grid: self.grid.rows(),
            scores: self.scores.to_vec(),
            lives: self.lives,
            entities: self.entities.iter().map(Entity::view).collect(),
            pill_ms: (self.pill_timer.max(0.0) * 1000.0).round() as u64,
            paused: self.is_paused(),
            bonus: self.bonus,
            death: self.death,
            player_map: self.player_map.to_vec(),
        }
    }

    fn update_pill_timer(&mut self, dt: f32) {
        if self.pill_timer <= 0.0 {
            return;
        }
        self.pill_timer -= dt;
        if self.pill_timer > TIMER_EPSILON {
            return;
        }
        self.pill_timer = 0.0;
        for entity in &mut self.entities {
            if let Some(ghost) = entity.ghost_state_mut() {
                if ghost.mode == GhostMode::Vulnerable {
                    ghost.mode = GhostMode::Normal;
                }
            }
        }
    }

    fn update_ghost_release(&mut self, dt: f32) {
        for entity in &mut self.entities {
            let Some(ghost) = entity.ghost_state_mut() else {
                continue;
            };
            if ghost.active {
                continue;
            }
            ghost.inactive_timer -= dt;
            if ghost.inactive_timer <= TIMER_EPSILON {
                ghost.inactive_timer = 0.0;
                ghost.active = true;
            }
        }
    }

    fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            entities: self
                .entities
                .iter()
                .map(|entity| {
                    let ghost = entity.ghost_state();
                    EntityFingerprint {
                        position: entity.position,
                        facing: entity.facing,
                        moving: entity.moving,
                        mode: ghost.map(|g| g.mode),
                        active: entity.is_active(),
                        just_eaten: ghost.map(|g| g.just_eaten).unwrap_or(false),
                    }
                })
                .collect(),
            scores: self.scores,
            lives: self.lives,
            death: self.death,
        }
    }

    fn pacman(&self) -> &Entity {
        &self.entities[PACMAN_INDEX]
    }

    fn pacman_scorer(&self) -> usize {
        self.player_map[PACMAN_INDEX]
    }

    fn is_pacman(&self, idx: usize) -> bool {
        matches!(self.entities[idx].role, Role::Pacman)
    }
}
