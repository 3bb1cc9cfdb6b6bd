use super::utils::manhattan;
use super::*;

use crate::constants::{
    COLLISION_DISTANCE, GHOST_EATEN_PAUSE_SECONDS, GHOST_RESPAWN_DELAY_SECONDS,
    PACMAN_CAUGHT_PAUSE_SECONDS, PACMAN_CAUGHT_SCORE, PACMAN_PELLET_SLOWDOWN_SECONDS,
    PELLET_SCORE, POWER_DURATION_SECONDS, POWER_PELLET_SCORE,
};
use crate::level::Tile;

impl MatchEngine {
    /// Eats whatever lies under Pacman. When a power pellet opens a new
    /// vulnerability window, returns which ghosts it frightened.
    pub(super) fn consume_pellet(&mut self) -> Option<[bool; PLAYERS_PER_MATCH]> {
        let cell = self.pacman().position.cell();
        let scorer = self.pacman_scorer();
        match self.grid.tile(cell) {
            Some(Tile::Pellet) => {
                self.grid.set_tile(cell, Tile::Empty);
                self.scores[scorer] += PELLET_SCORE;
                self.pacman_slowdown = PACMAN_PELLET_SLOWDOWN_SECONDS;
                None
            }
            Some(Tile::PowerPellet) => {
                self.grid.set_tile(cell, Tile::Empty);
                self.scores[scorer] += POWER_PELLET_SCORE;
                let mut frightened = [false; PLAYERS_PER_MATCH];
                for (idx, entity) in self.entities.iter_mut().enumerate() {
                    if let Some(ghost) = entity.ghost_state_mut() {
                        if ghost.mode == GhostMode::Normal {
                            ghost.mode = GhostMode::Vulnerable;
                            frightened[idx] = true;
                        }
                    }
                }
                self.pill_timer = POWER_DURATION_SECONDS;
                self.bonus = STARTING_BONUS;
                Some(frightened)
            }
            _ => None,
        }
    }

    /// Ghosts flagged in `spared` turned vulnerable this tick and are not
    /// edible until the next one.
    pub(super) fn resolve_collisions(&mut self, spared: [bool; PLAYERS_PER_MATCH]) {
        let pacman_at = self.pacman().position;
        for idx in 0..self.entities.len() {
            if self.is_pacman(idx) || spared[idx] {
                continue;
            }
            let entity = &self.entities[idx];
            let Some(ghost) = entity.ghost_state() else {
                continue;
            };
            if !ghost.active || manhattan(pacman_at, entity.position) >= COLLISION_DISTANCE {
                continue;
            }
            let mode = ghost.mode;
            match mode {
                GhostMode::Vulnerable => self.eat_ghost(idx),
                GhostMode::Normal => {
                    self.catch_pacman(idx);
                    break;
                }
                GhostMode::Dead => {}
            }
        }
    }

    /// Dead ghosts that made it back to their own spawn cell wait there
    /// briefly before rejoining as normal ghosts.
    pub(super) fn recycle_dead_ghosts(&mut self) {
        for entity in &mut self.entities {
            let at_home = entity.position.cell() == entity.home.cell();
            let is_dead = entity
                .ghost_state()
                .is_some_and(|ghost| ghost.mode == GhostMode::Dead);
            if !at_home || !is_dead {
                continue;
            }
            entity.send_home();
            if let Some(ghost) = entity.ghost_state_mut() {
                ghost.mode = GhostMode::Normal;
                ghost.active = false;
                ghost.inactive_timer = GHOST_RESPAWN_DELAY_SECONDS;
            }
        }
    }

    fn eat_ghost(&mut self, idx: usize) {
        if let Some(ghost) = self.entities[idx].ghost_state_mut() {
            ghost.mode = GhostMode::Dead;
            ghost.just_eaten = true;
        }
        self.pause_timer = self.pause_timer.max(GHOST_EATEN_PAUSE_SECONDS);
        self.bonus *= 2;
        let scorer = self.pacman_scorer();
        self.scores[scorer] += self.bonus;
    }

    /// The catching ghost's controller scores, then takes over Pacman's
    /// scoring slot while the previous Pacman scorer inherits the ghost's.
    fn catch_pacman(&mut self, idx: usize) {
        self.death = true;
        self.pause_timer = PACMAN_CAUGHT_PAUSE_SECONDS;
        let scorer = self.player_map[idx];
        self.scores[scorer] += PACMAN_CAUGHT_SCORE;
        self.player_map.swap(PACMAN_INDEX, idx);
    }
}
