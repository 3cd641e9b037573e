/// Mover — tile-locked continuous movement with direction buffering.
///
/// Shared by the player and the adversaries. The only difference between
/// them is who writes `pending`: keyboard input for the player, the
/// behavior machine for adversaries.
///
/// ## Step Rules
///
/// ┌─────────────────────────────────────────┬──────────────────────────────┐
/// │ Condition                                │ Effect                       │
/// ├─────────────────────────────────────────┼──────────────────────────────┤
/// │ at center, pending ≠ dir, pending open   │ snap to center, dir = pending│
/// │ not at center                            │ pending waits                │
/// │ dir ≠ Stop, tile ahead not a wall        │ advance dir × speed          │
/// │ dir ≠ Stop, tile ahead is a wall         │ snap to center, dir = Stop   │
/// └─────────────────────────────────────────┴──────────────────────────────┘
///
/// Mid-tile the agent may run past the center and into the next tile;
/// the wall test is always against the tile beyond the current one.

use super::entity::{Direction, Point, TilePos};
use super::maze::Maze;

/// How far from the geometric center still counts as "at center".
/// Absorbs speeds that don't evenly divide the tile size.
pub const CENTER_TOLERANCE: f32 = 1.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Mover {
    pub pos: Point,
    pub direction: Direction,
    /// Buffered turn request.
    pub pending: Direction,
    /// Units per tick.
    pub speed: f32,
}

impl Mover {
    /// Stationary mover at the center of `tile`.
    pub fn at(tile: TilePos, speed: f32) -> Self {
        Mover {
            pos: tile.center(),
            direction: Direction::Stop,
            pending: Direction::Stop,
            speed,
        }
    }

    #[inline]
    pub fn tile(&self) -> TilePos {
        self.pos.tile()
    }

    pub fn at_tile_center(&self) -> bool {
        let c = self.tile().center();
        (self.pos.x - c.x).abs() <= CENTER_TOLERANCE && (self.pos.y - c.y).abs() <= CENTER_TOLERANCE
    }

    pub fn snap_to_center(&mut self) {
        self.pos = self.tile().center();
    }

    /// Is the neighbor in `dir` open for a turn?
    pub fn can_turn(&self, maze: &Maze, dir: Direction) -> bool {
        if dir == Direction::Stop {
            return false;
        }
        let next = self.tile().step(dir);
        maze.can_pass(next.x, next.y)
    }

    /// Advance one tick.
    pub fn step(&mut self, maze: &Maze) {
        self.advance(maze, false);
    }

    /// Like `step`, but a tick that would carry the mover past the center
    /// of its tile ends exactly on that center instead. Every tile center
    /// is visited, so a per-center decision is never skipped.
    pub fn step_via_centers(&mut self, maze: &Maze) {
        self.advance(maze, true);
    }

    fn advance(&mut self, maze: &Maze, land_on_center: bool) {
        if self.at_tile_center() && self.pending != self.direction && self.can_turn(maze, self.pending) {
            self.snap_to_center();
            self.direction = self.pending;
        }

        if self.direction != Direction::Stop {
            let ahead = self.tile().step(self.direction);
            if !maze.is_wall(ahead.x, ahead.y) {
                let (dx, dy) = self.direction.delta();
                let c = self.tile().center();
                let to_center = (c.x - self.pos.x) * dx as f32 + (c.y - self.pos.y) * dy as f32;
                if land_on_center && to_center > CENTER_TOLERANCE && to_center < self.speed {
                    self.pos = c;
                } else {
                    self.pos.x += dx as f32 * self.speed;
                    self.pos.y += dy as f32 * self.speed;
                }
            } else {
                self.snap_to_center();
                self.direction = Direction::Stop;
            }
        }

        let tile = self.tile();
        assert!(
            maze.can_pass(tile.x, tile.y),
            "mover entered blocked tile ({}, {})",
            tile.x,
            tile.y
        );
    }
}
