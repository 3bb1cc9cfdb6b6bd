use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::constants::PLAYERS_PER_MATCH;
use crate::level::Traveler;
use crate::types::{Direction, EntityView, GhostColor, GhostMode, KeyIntent, Point, RoleKind};

#[derive(Clone, Debug, PartialEq)]
pub struct GhostState {
    pub mode: GhostMode,
    pub color: GhostColor,
    pub active: bool,
    pub inactive_timer: f32,
    pub just_eaten: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Role {
    Pacman,
    Ghost(GhostState),
}

#[derive(Clone, Debug)]
pub struct Entity {
    pub position: Point,
    pub home: Point,
    pub facing: Direction,
    pub moving: bool,
    pub speed: f32,
    pub intent: KeyIntent,
    pub role: Role,
}

impl Entity {
    pub fn pacman(home: Point, speed: f32) -> Self {
        Self::with_role(home, speed, Role::Pacman)
    }

    pub fn ghost(home: Point, speed: f32, color: GhostColor, release_after: f32) -> Self {
        Self::with_role(
            home,
            speed,
            Role::Ghost(GhostState {
                mode: GhostMode::Normal,
                color,
                active: release_after <= 0.0,
                inactive_timer: release_after.max(0.0),
                just_eaten: false,
            }),
        )
    }

    fn with_role(home: Point, speed: f32, role: Role) -> Self {
        Self {
            position: home,
            home,
            facing: Direction::None,
            moving: false,
            speed,
            intent: KeyIntent::default(),
            role,
        }
    }

    pub fn ghost_state(&self) -> Option<&GhostState> {
        match &self.role {
            Role::Ghost(state) => Some(state),
            Role::Pacman => None,
        }
    }

    pub fn ghost_state_mut(&mut self) -> Option<&mut GhostState> {
        match &mut self.role {
            Role::Ghost(state) => Some(state),
            Role::Pacman => None,
        }
    }

    /// Inactive ghosts neither move nor collide.
    pub fn is_active(&self) -> bool {
        self.ghost_state().map(|ghost| ghost.active).unwrap_or(true)
    }

    pub fn traveler(&self) -> Traveler {
        match &self.role {
            Role::Pacman => Traveler::Pacman,
            Role::Ghost(state) => Traveler::Ghost(state.mode),
        }
    }

    pub fn send_home(&mut self) {
        self.position = self.home;
        self.facing = Direction::None;
        self.moving = false;
    }

    pub fn view(&self) -> EntityView {
        let ghost = self.ghost_state();
        EntityView {
            role: match self.role {
                Role::Pacman => RoleKind::Pacman,
                Role::Ghost(_) => RoleKind::Ghost,
            },
            x: self.position.x,
            y: self.position.y,
            facing: self.facing,
            moving: self.moving,
            mode: ghost.map(|g| g.mode),
            color: ghost.map(|g| g.color),
            active: ghost.map(|g| g.active),
            inactive_ms: ghost.map(|g| (g.inactive_timer.max(0.0) * 1000.0).round() as u64),
            just_eaten: ghost.map(|g| g.just_eaten),
        }
    }
}

/// Live key intents of one match, written by the transport and read by the
/// tick loop. Each slot is replaced wholesale; the last write wins.
#[derive(Debug, Default)]
pub struct MatchInputs {
    slots: [AtomicU8; PLAYERS_PER_MATCH],
    departed: [AtomicBool; PLAYERS_PER_MATCH],
}

impl MatchInputs {
    pub fn store(&self, entity: usize, intent: KeyIntent) {
        if let Some(slot) = self.slots.get(entity) {
            slot.store(intent.to_bits(), Ordering::Relaxed);
        }
    }

    pub fn load(&self, entity: usize) -> KeyIntent {
        self.slots
            .get(entity)
            .map(|slot| KeyIntent::from_bits(slot.load(Ordering::Relaxed)))
            .unwrap_or_default()
    }

    /// Marks the entity's participant as gone. Its intent is cleared and the
    /// engine stops moving it.
    pub fn disconnect(&self, entity: usize) {
        self.store(entity, KeyIntent::default());
        if let Some(flag) = self.departed.get(entity) {
            flag.store(true, Ordering::Relaxed);
        }
    }

    pub fn is_departed(&self, entity: usize) -> bool {
        self.departed
            .get(entity)
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents_round_trip_through_atomic_slots() {
        let inputs = MatchInputs::default();
        let intent = KeyIntent {
            left: true,
            up: false,
            right: true,
            down: true,
        };
        inputs.store(3, intent);
        assert_eq!(inputs.load(3), intent);
        assert_eq!(inputs.load(0), KeyIntent::default());

        inputs.store(3, KeyIntent::only(Direction::Up));
        assert_eq!(inputs.load(3), KeyIntent::only(Direction::Up));
    }

    #[test]
    fn out_of_range_slot_is_ignored() {
        let inputs = MatchInputs::default();
        inputs.store(PLAYERS_PER_MATCH, KeyIntent::only(Direction::Left));
        assert_eq!(inputs.load(PLAYERS_PER_MATCH), KeyIntent::default());
    }

    #[test]
    fn disconnect_clears_intent_and_flags_slot() {
        let inputs = MatchInputs::default();
        inputs.store(2, KeyIntent::only(Direction::Right));
        assert!(!inputs.is_departed(2));

        inputs.disconnect(2);
        assert!(inputs.is_departed(2));
        assert_eq!(inputs.load(2), KeyIntent::default());
        assert!(!inputs.is_departed(1));
        assert!(!inputs.is_departed(PLAYERS_PER_MATCH));
    }

    #[test]
    fn delayed_ghost_starts_inactive() {
        let ghost = Entity::ghost(Point::new(3.0, 4.0), 1.0, GhostColor::Pink, 2.0);
        assert!(!ghost.is_active());
        let view = ghost.view();
        assert_eq!(view.inactive_ms, Some(2_000));
        assert_eq!(view.role, RoleKind::Ghost);

        let pacman = Entity::pacman(Point::new(1.0, 1.0), 1.0);
        assert!(pacman.is_active());
        assert_eq!(pacman.view().mode, None);
    }
}
