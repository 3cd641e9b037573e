/// Level loader: the built-in maze or a custom text file.
///
/// ## Text format:
///   Optional: `# Maze Name` (first `#` line containing a letter)
///   Lines starting with `#` are comments; blank lines are skipped.
///   Lines: map rows, one digit per cell
///
/// ## Cell legend:
///   '0' = Empty        '1' = Wall
///   '2' = Pellet       '3' = Power pellet
///   '4' = Gate (ghost-house entrance)
///
/// ## Derived placement:
///   Player spawn  — first open non-gate cell scanning rows bottom-up
///                   (from height-2 to 2), columns left to right.
///   Home          — open cell behind the first gate (see `Maze::home_tile`).
///   Adversaries   — home ± 2 columns, then home ± 2 rows; any of those
///                   that is not passable falls back to home itself.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::domain::entity::{Identity, TilePos};
use crate::domain::maze::{Maze, MazeError};

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("could not read maze file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid maze: {0}")]
    Maze(#[from] MazeError),
}

/// A validated maze plus where everyone starts.
#[derive(Clone, Debug)]
pub struct Level {
    pub name: String,
    pub maze: Maze,
    pub player_spawn: TilePos,
    pub home: TilePos,
    pub adversary_spawns: Vec<(Identity, TilePos)>,
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Load the configured maze file, or the built-in maze when none is set.
pub fn load_level(config: &GameConfig) -> Result<Level, LevelError> {
    match &config.maze_file {
        Some(path) => load_level_file(path),
        None => builtin_level(),
    }
}

pub fn load_level_file(path: &Path) -> Result<Level, LevelError> {
    let content = std::fs::read_to_string(path).map_err(|source| LevelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let level = parse_level_text(&content)?;
    info!(path = %path.display(), name = %level.name, "loaded maze file");
    Ok(level)
}

pub fn builtin_level() -> Result<Level, LevelError> {
    let maze = Maze::from_rows(BUILTIN_MAZE)?;
    Level::from_maze("Classic", maze)
}

/// Parse maze text into a level.
pub fn parse_level_text(content: &str) -> Result<Level, LevelError> {
    let mut name = String::new();
    let mut rows = vec![];

    for line in content.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix('#') {
            if name.is_empty() && rest.chars().any(|c| c.is_alphabetic()) {
                name = rest.trim().to_string();
            }
            continue;
        }
        rows.push(line);
    }

    if name.is_empty() {
        name = "Custom".to_string();
    }

    let maze = Maze::from_rows(&rows)?;
    Level::from_maze(&name, maze)
}

impl Level {
    /// Derive spawn points from a validated maze.
    pub fn from_maze(name: &str, maze: Maze) -> Result<Level, LevelError> {
        let home = maze.home_tile().ok_or(MazeError::NoGate)?;
        let player_spawn = find_player_spawn(&maze).ok_or(MazeError::NoOpenTiles)?;

        let offsets = [(-2, 0), (2, 0), (0, -2), (0, 2)];
        let adversary_spawns = Identity::ALL
            .iter()
            .zip(offsets)
            .map(|(&identity, (dx, dy))| {
                let t = TilePos::new(home.x + dx, home.y + dy);
                let spawn = if maze.can_pass(t.x, t.y) { t } else { home };
                (identity, spawn)
            })
            .collect();

        debug!(?player_spawn, ?home, "level placement");

        Ok(Level {
            name: name.to_string(),
            maze,
            player_spawn,
            home,
            adversary_spawns,
        })
    }
}

fn is_spawnable(maze: &Maze, t: TilePos) -> bool {
    maze.can_pass(t.x, t.y) && !maze.is_gate(t.x, t.y)
}

/// Bottom-left open cell, skipping the outer ring and the top row inside
/// it; any open cell if that scan comes up empty.
fn find_player_spawn(maze: &Maze) -> Option<TilePos> {
    let w = maze.width() as i32;
    let h = maze.height() as i32;
    (2..=h - 2)
        .rev()
        .flat_map(|y| (1..w - 1).map(move |x| TilePos::new(x, y)))
        .find(|&t| is_spawnable(maze, t))
        .or_else(|| maze.tiles().find(|&t| is_spawnable(maze, t)))
}

// ══════════════════════════════════════════════════════════════
// Built-in maze
// ══════════════════════════════════════════════════════════════

/// 40 × 30. Ghost house sits under the gate on row 24.
pub const BUILTIN_MAZE: &[&str] = &[
    "1111111111111111111111111111111111111111",
    "1000000000000000000000000000000000000001",
    "1011111111110111111111111011111111111101",
    "1020000000010200000000010200000000000301",
    "1010111111010111111101010111111111011101",
    "1010100001010100000101010100000010010101",
    "1010101111010101110101010111111011010101",
    "1010101000010101000101010100001010010101",
    "1010101011110101011101010111101011010101",
    "1020101010000101000101000100001010010301",
    "1110101010111110111101111101111011011101",
    "1000101000100000100010000010000010000001",
    "1011101111101111101110111101111101111101",
    "1010001000001000001000100001000001000101",
    "1010111011111011111010111110111110110101",
    "1010000010000010000010000010000010000101",
    "1011111010111110111110111110111110111101",
    "1020000010100000100000100000100000100301",
    "1011111010101111101111101111101110101101",
    "1010000010101000000000000000100010100001",
    "1010111110101011111111111110101110111101",
    "1010000000101010000000000010100000000101",
    "1011111111101010111111111010111111110101",
    "1000000000001010000022220010100000000001",
    "1111111111101010111114111010111111111101",
    "1000000000101000100000000010000000000001",
    "1011111110101110111111111110111111111101",
    "1020000000100000100000000010000000000301",
    "1000000000000000000000000000000000000001",
    "1111111111111111111111111111111111111111",
];
