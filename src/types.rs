use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    None,
    Left,
    Up,
    Right,
    Down,
}

impl Direction {
    /// Priority order used when several intents are held at once.
    pub const MOVES: [Direction; 4] = [
        Direction::Left,
        Direction::Up,
        Direction::Right,
        Direction::Down,
    ];

    pub fn vector(self) -> (i32, i32) {
        match self {
            Self::None => (0, 0),
            Self::Left => (-1, 0),
            Self::Up => (0, -1),
            Self::Right => (1, 0),
            Self::Down => (0, 1),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::None => Self::None,
            Self::Left => Self::Right,
            Self::Up => Self::Down,
            Self::Right => Self::Left,
            Self::Down => Self::Up,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostMode {
    Normal,
    Vulnerable,
    Dead,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostColor {
    Red,
    Blue,
    Pink,
    Orange,
}

impl GhostColor {
    pub const ALL: [GhostColor; 4] = [Self::Red, Self::Blue, Self::Pink, Self::Orange];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    Pacman,
    Ghost,
}

/// Last reported key state of one participant. Missing keys count as released.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyIntent {
    pub left: bool,
    pub up: bool,
    pub right: bool,
    pub down: bool,
}

impl KeyIntent {
    pub fn wants(&self, dir: Direction) -> bool {
        match dir {
            Direction::Left => self.left,
            Direction::Up => self.up,
            Direction::Right => self.right,
            Direction::Down => self.down,
            Direction::None => false,
        }
    }

    pub fn only(dir: Direction) -> Self {
        let mut intent = Self::default();
        match dir {
            Direction::Left => intent.left = true,
            Direction::Up => intent.up = true,
            Direction::Right => intent.right = true,
            Direction::Down => intent.down = true,
            Direction::None => {}
        }
        intent
    }

    pub fn to_bits(self) -> u8 {
        (self.left as u8) | (self.up as u8) << 1 | (self.right as u8) << 2 | (self.down as u8) << 3
    }

    pub fn from_bits(bits: u8) -> Self {
        Self {
            left: bits & 0b0001 != 0,
            up: bits & 0b0010 != 0,
            right: bits & 0b0100 != 0,
            down: bits & 0b1000 != 0,
        }
    }
}

/// Integer grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

impl Vec2 {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.vector();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Continuous position in cell units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Nearest grid cell.
    pub fn cell(self) -> Vec2 {
        Vec2 {
            x: self.x.round() as i32,
            y: self.y.round() as i32,
        }
    }
}

impl From<Vec2> for Point {
    fn from(cell: Vec2) -> Self {
        Self {
            x: cell.x as f32,
            y: cell.y as f32,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub role: RoleKind,
    pub x: f32,
    pub y: f32,
    pub facing: Direction,
    pub moving: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<GhostMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<GhostColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(
        rename = "inactiveMs",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub inactive_ms: Option<u64>,
    #[serde(rename = "justEaten", default, skip_serializing_if = "Option::is_none")]
    pub just_eaten: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub grid: Vec<String>,
    pub scores: Vec<u32>,
    pub lives: i32,
    pub entities: Vec<EntityView>,
    #[serde(rename = "pillMs")]
    pub pill_ms: u64,
    pub paused: bool,
    pub bonus: u32,
    pub death: bool,
    #[serde(rename = "playerMap")]
    pub player_map: Vec<usize>,
}
