use super::utils::axis_sign;
use super::*;

use crate::constants::{
    GHOST_DEAD_MULTIPLIER, GHOST_SLOW_ZONE_MULTIPLIER, GHOST_VULNERABLE_MULTIPLIER,
    PACMAN_PELLET_SLOWDOWN,
};
use crate::level::{Tile, Traveler};
use crate::types::Vec2;

impl MatchEngine {
    pub(super) fn speed_modifier(&self, idx: usize) -> f32 {
        let entity = &self.entities[idx];
        let Some(ghost) = entity.ghost_state() else {
            return if self.pacman_slowdown > 0.0 {
                PACMAN_PELLET_SLOWDOWN
            } else {
                1.0
            };
        };
        match ghost.mode {
            GhostMode::Normal => {
                if self.grid.tile(entity.position.cell()) == Some(Tile::SlowZone) {
                    GHOST_SLOW_ZONE_MULTIPLIER
                } else {
                    1.0
                }
            }
            GhostMode::Vulnerable => GHOST_VULNERABLE_MULTIPLIER,
            GhostMode::Dead => GHOST_DEAD_MULTIPLIER,
        }
    }

    pub(super) fn move_entity(&mut self, idx: usize, dt: f32) {
        let modifier = self.speed_modifier(idx);
        let grid = &self.grid;
        let entity = &mut self.entities[idx];
        let traveler = entity.traveler();

        if let Some(partner) = portal_exit(grid, entity, traveler) {
            entity.position = partner.into();
        }

        let mut cell = entity.position.cell();
        if let Some(dir) = choose_direction(grid, entity, traveler, cell) {
            entity.facing = dir;
        }
        if entity.facing == Direction::None {
            entity.moving = false;
            return;
        }
        if !grid.is_traversable(cell.step(entity.facing), traveler, entity.facing) {
            entity.position = cell.into();
            // Snapped onto a portal's centre while heading out: cross now.
            match portal_exit(grid, entity, traveler) {
                Some(partner) => {
                    entity.position = partner.into();
                    cell = partner;
                }
                None => {
                    entity.moving = false;
                    return;
                }
            }
            if !grid.is_traversable(cell.step(entity.facing), traveler, entity.facing) {
                entity.moving = false;
                return;
            }
        }

        let distance = entity.speed * modifier * dt;
        let (vx, vy) = entity.facing.vector();
        entity.position = if entity.facing.is_horizontal() {
            Point::new(entity.position.x + vx as f32 * distance, cell.y as f32)
        } else {
            Point::new(cell.x as f32, entity.position.y + vy as f32 * distance)
        };
        entity.moving = true;
    }
}

/// A portal fires when the entity heads out through the dead-end side of a
/// portal cell and is not already past its centre in the other direction.
fn portal_exit(grid: &Grid, entity: &Entity, traveler: Traveler) -> Option<Vec2> {
    if entity.facing == Direction::None {
        return None;
    }
    let cell = entity.position.cell();
    let partner = grid.portal_partner(cell)?;
    if grid.is_traversable(cell.step(entity.facing), traveler, entity.facing) {
        return None;
    }
    let (vx, vy) = entity.facing.vector();
    let heading_out = |delta: f32, v: i32| {
        let sign = axis_sign(delta);
        sign == 0 || sign == v
    };
    if heading_out(entity.position.x - cell.x as f32, vx)
        && heading_out(entity.position.y - cell.y as f32, vy)
    {
        Some(partner)
    } else {
        None
    }
}

/// First held direction, in priority order, that leads somewhere the entity
/// may enter. A normal ghost never turns back while it has another way on.
fn choose_direction(
    grid: &Grid,
    entity: &Entity,
    traveler: Traveler,
    cell: Vec2,
) -> Option<Direction> {
    let open = |dir: Direction| grid.is_traversable(cell.step(dir), traveler, dir);
    let reverse = entity.facing.opposite();
    let reverse_blocked = traveler == Traveler::Ghost(GhostMode::Normal)
        && entity.facing != Direction::None
        && Direction::MOVES
            .into_iter()
            .any(|dir| dir != reverse && open(dir));

    Direction::MOVES.into_iter().find(|dir| {
        entity.intent.wants(*dir) && !(reverse_blocked && *dir == reverse) && open(*dir)
    })
}
