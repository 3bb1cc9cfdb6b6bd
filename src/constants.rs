pub const TICK_RATE: u32 = 30;
pub const TICK_SECONDS: f32 = 1.0 / TICK_RATE as f32;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const PLAYERS_PER_MATCH: usize = 5;
pub const GHOSTS_PER_MATCH: usize = PLAYERS_PER_MATCH - 1;
pub const PACMAN_INDEX: usize = 0;

pub const STARTING_LIVES: i32 = 3;
pub const STARTING_BONUS: u32 = 100;

pub const PELLET_SCORE: u32 = 10;
pub const POWER_PELLET_SCORE: u32 = 50;
pub const PACMAN_CAUGHT_SCORE: u32 = 500;

pub const POWER_DURATION_SECONDS: f32 = 8.0;
pub const GHOST_EATEN_PAUSE_SECONDS: f32 = 1.0;
pub const PACMAN_CAUGHT_PAUSE_SECONDS: f32 = 2.0;

pub const PACMAN_BASE_SPEED: f32 = 8.0;
pub const GHOST_BASE_SPEED: f32 = 7.5;
pub const PACMAN_PELLET_SLOWDOWN: f32 = 0.8;
pub const PACMAN_PELLET_SLOWDOWN_SECONDS: f32 = 0.2;
pub const GHOST_SLOW_ZONE_MULTIPLIER: f32 = 0.6;
pub const GHOST_VULNERABLE_MULTIPLIER: f32 = 0.8;
pub const GHOST_DEAD_MULTIPLIER: f32 = 2.0;

pub const GHOST_RELEASE_SECONDS: [f32; GHOSTS_PER_MATCH] = [0.0, 2.0, 4.0, 6.0];
pub const GHOST_RESPAWN_DELAY_SECONDS: f32 = 1.0;

/// Manhattan distance under which Pacman and an active ghost touch.
pub const COLLISION_DISTANCE: f32 = 1.0;

/// Timers within this margin of zero count as expired.
pub const TIMER_EPSILON: f32 = 1e-3;

pub const SNAPSHOT_KEEPALIVE_TICKS: u64 = 10;
pub const READY_HOLD_MS: u64 = 2_000;
pub const COUNTDOWN_HOLD_MS: u64 = 1_500;

pub const OUTBOX_CAPACITY: usize = 256;
