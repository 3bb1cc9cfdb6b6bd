use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::constants::GHOSTS_PER_MATCH;
use crate::types::{Direction, GhostMode, Vec2};

pub const CLASSIC_LEVEL: &str = include_str!("../levels/classic.txt");

#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("failed to read level file: {0}")]
    Io(#[from] std::io::Error),
    #[error("level has no rows")]
    Empty,
    #[error("row {row} is {found} cells wide, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown glyph {glyph:?} at ({x}, {y})")]
    UnknownGlyph { glyph: char, x: i32, y: i32 },
    #[error("portal {id} appears {count} time(s); portals must come in pairs")]
    UnpairedPortal { id: u8, count: usize },
    #[error("level has no pacman start marker")]
    MissingPacmanStart,
    #[error("level has {found} ghost spawn markers, need at least {}", GHOSTS_PER_MATCH)]
    NotEnoughGhostSpawns { found: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tile {
    Wall,
    Empty,
    Pellet,
    PowerPellet,
    SlowZone,
    Spawn,
    Portal(u8),
    /// One-way wall out of the ghost house.
    GhostDoor,
}

impl Tile {
    pub fn glyph(self) -> char {
        match self {
            Self::Wall => '#',
            Self::Empty => ' ',
            Self::Pellet => 'o',
            Self::PowerPellet => 'O',
            Self::SlowZone => '=',
            Self::Spawn => 'G',
            Self::Portal(id) => char::from(b'0' + id),
            Self::GhostDoor => '-',
        }
    }

    fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            '#' => Some(Self::Wall),
            ' ' | 'P' => Some(Self::Empty),
            'o' => Some(Self::Pellet),
            'O' => Some(Self::PowerPellet),
            '=' => Some(Self::SlowZone),
            'G' => Some(Self::Spawn),
            '-' => Some(Self::GhostDoor),
            '0'..='9' => Some(Self::Portal(glyph as u8 - b'0')),
            _ => None,
        }
    }
}

/// Who is asking to enter a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Traveler {
    Pacman,
    Ghost(GhostMode),
}

/// Mutable cell contents of one match. The shape never changes.
#[derive(Clone, Debug)]
pub struct Grid {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
    portals: BTreeMap<Vec2, Vec2>,
}

impl Grid {
    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn tile(&self, cell: Vec2) -> Option<Tile> {
        self.index_of(cell).map(|idx| self.tiles[idx])
    }

    pub fn set_tile(&mut self, cell: Vec2, tile: Tile) {
        if let Some(idx) = self.index_of(cell) {
            self.tiles[idx] = tile;
        }
    }

    pub fn portal_partner(&self, cell: Vec2) -> Option<Vec2> {
        self.portals.get(&cell).copied()
    }

    pub fn is_traversable(&self, cell: Vec2, traveler: Traveler, dir: Direction) -> bool {
        match self.tile(cell) {
            None | Some(Tile::Wall) => false,
            Some(Tile::GhostDoor) => match traveler {
                Traveler::Ghost(GhostMode::Dead) => dir == Direction::Down,
                Traveler::Ghost(GhostMode::Normal) => dir == Direction::Up,
                _ => false,
            },
            Some(_) => true,
        }
    }

    pub fn count_tiles(&self, tile: Tile) -> usize {
        self.tiles.iter().filter(|t| **t == tile).count()
    }

    pub fn rows(&self) -> Vec<String> {
        self.tiles
            .chunks(self.width as usize)
            .map(|row| row.iter().map(|tile| tile.glyph()).collect())
            .collect()
    }

    fn index_of(&self, cell: Vec2) -> Option<usize> {
        if cell.x < 0 || cell.y < 0 || cell.x >= self.width || cell.y >= self.height {
            return None;
        }
        Some((cell.y * self.width + cell.x) as usize)
    }
}

/// Parsed level definition. Each match clones `grid` for its own pellets.
#[derive(Clone, Debug)]
pub struct Level {
    pub grid: Grid,
    pub pacman_start: Vec2,
    pub ghost_spawns: Vec<Vec2>,
}

impl Level {
    pub fn classic() -> Result<Self, LevelError> {
        Self::parse(CLASSIC_LEVEL)
    }

    pub fn load(path: &Path) -> Result<Self, LevelError> {
        let raw = fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, LevelError> {
        let lines: Vec<&str> = raw
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .collect();
        let lines: Vec<&str> = match lines.iter().rposition(|line| !line.is_empty()) {
            Some(last) => lines[..=last].to_vec(),
            None => return Err(LevelError::Empty),
        };

        let width = lines[0].chars().count();
        let mut tiles = Vec::with_capacity(width * lines.len());
        let mut portal_cells: BTreeMap<u8, Vec<Vec2>> = BTreeMap::new();
        let mut pacman_start = None;
        let mut ghost_spawns = Vec::new();

        for (y, line) in lines.iter().enumerate() {
            let found = line.chars().count();
            if found != width {
                return Err(LevelError::RaggedRow {
                    row: y,
                    expected: width,
                    found,
                });
            }
            for (x, glyph) in line.chars().enumerate() {
                let cell = Vec2::new(x as i32, y as i32);
                let tile = Tile::from_glyph(glyph).ok_or(LevelError::UnknownGlyph {
                    glyph,
                    x: cell.x,
                    y: cell.y,
                })?;
                match tile {
                    Tile::Portal(id) => portal_cells.entry(id).or_default().push(cell),
                    Tile::Spawn => ghost_spawns.push(cell),
                    _ => {}
                }
                if glyph == 'P' {
                    pacman_start = Some(cell);
                }
                tiles.push(tile);
            }
        }

        let mut portals = BTreeMap::new();
        for (id, cells) in portal_cells {
            let &[a, b] = cells.as_slice() else {
                return Err(LevelError::UnpairedPortal {
                    id,
                    count: cells.len(),
                });
            };
            portals.insert(a, b);
            portals.insert(b, a);
        }

        let pacman_start = pacman_start.ok_or(LevelError::MissingPacmanStart)?;
        if ghost_spawns.len() < GHOSTS_PER_MATCH {
            return Err(LevelError::NotEnoughGhostSpawns {
                found: ghost_spawns.len(),
            });
        }

        Ok(Self {
            grid: Grid {
                width: width as i32,
                height: lines.len() as i32,
                tiles,
                portals,
            },
            pacman_start,
            ghost_spawns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = "\
#######
#1 o 1#
#O-G G#
#G P G#
#######
";

    #[test]
    fn classic_level_parses_with_paired_tunnel() {
        let level = Level::classic().expect("built-in level should parse");
        assert_eq!(level.grid.width(), 28);
        assert_eq!(level.grid.height(), 31);
        assert_eq!(level.ghost_spawns.len(), 4);
        assert_eq!(level.grid.count_tiles(Tile::PowerPellet), 4);
        assert_eq!(
            level.grid.portal_partner(Vec2::new(0, 14)),
            Some(Vec2::new(27, 14))
        );
        assert_eq!(
            level.grid.portal_partner(Vec2::new(27, 14)),
            Some(Vec2::new(0, 14))
        );
    }

    #[test]
    fn pacman_marker_becomes_empty_floor() {
        let level = Level::parse(SMALL).expect("small level should parse");
        assert_eq!(level.pacman_start, Vec2::new(3, 3));
        assert_eq!(level.grid.tile(level.pacman_start), Some(Tile::Empty));
        assert_eq!(level.grid.rows()[3], "#G   G#");
    }

    #[test]
    fn out_of_bounds_is_never_traversable() {
        let level = Level::parse(SMALL).expect("small level should parse");
        let grid = &level.grid;
        for cell in [
            Vec2::new(-1, 1),
            Vec2::new(1, -1),
            Vec2::new(7, 1),
            Vec2::new(1, 5),
            Vec2::new(i32::MIN, i32::MAX),
        ] {
            assert_eq!(grid.tile(cell), None);
            assert!(!grid.is_traversable(cell, Traveler::Pacman, Direction::Left));
            assert!(!grid.is_traversable(
                cell,
                Traveler::Ghost(GhostMode::Dead),
                Direction::Down
            ));
        }
    }

    #[test]
    fn ghost_door_is_one_way_by_mode() {
        let level = Level::parse(SMALL).expect("small level should parse");
        let door = Vec2::new(2, 2);
        let grid = &level.grid;
        assert!(!grid.is_traversable(door, Traveler::Pacman, Direction::Up));
        assert!(!grid.is_traversable(door, Traveler::Pacman, Direction::Down));
        assert!(grid.is_traversable(door, Traveler::Ghost(GhostMode::Normal), Direction::Up));
        assert!(!grid.is_traversable(door, Traveler::Ghost(GhostMode::Normal), Direction::Down));
        assert!(grid.is_traversable(door, Traveler::Ghost(GhostMode::Dead), Direction::Down));
        assert!(!grid.is_traversable(door, Traveler::Ghost(GhostMode::Dead), Direction::Up));
        assert!(!grid.is_traversable(
            door,
            Traveler::Ghost(GhostMode::Vulnerable),
            Direction::Up
        ));
    }

    #[test]
    fn unpaired_portal_is_rejected() {
        let raw = "#####\n#1P #\n#GGGG\n";
        let err = Level::parse(raw).expect_err("single portal must fail");
        assert!(matches!(err, LevelError::UnpairedPortal { id: 1, count: 1 }));

        let raw = "#####\n#121#\n#GGGG\n#P11#\n";
        let err = Level::parse(raw).expect_err("four portals with one id must fail");
        assert!(matches!(err, LevelError::UnpairedPortal { id: 1, count: 4 }));
    }

    #[test]
    fn malformed_levels_report_specific_errors() {
        assert!(matches!(Level::parse("\n\n"), Err(LevelError::Empty)));
        assert!(matches!(
            Level::parse("####\n#P#\n"),
            Err(LevelError::RaggedRow { row: 1, .. })
        ));
        assert!(matches!(
            Level::parse("#x#\n"),
            Err(LevelError::UnknownGlyph { glyph: 'x', .. })
        ));
        assert!(matches!(
            Level::parse("#GGGG#\n"),
            Err(LevelError::MissingPacmanStart)
        ));
        assert!(matches!(
            Level::parse("#GGP#\n"),
            Err(LevelError::NotEnoughGhostSpawns { found: 2 })
        ));
    }
}
