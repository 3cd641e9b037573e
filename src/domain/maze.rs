/// Maze grid — immutable cell lookup with sealed-boundary semantics.
///
/// ## Passability Table
///
/// ┌──────────────────────┬──────────┬──────────┐
/// │ Cell                  │ is_wall  │ can_pass │
/// ├──────────────────────┼──────────┼──────────┤
/// │ Wall                  │ yes      │ no       │
/// │ Out of bounds         │ yes      │ no       │
/// │ Empty / Pellet / Power│ no       │ yes      │
/// │ Gate                  │ no       │ yes      │
/// └──────────────────────┴──────────┴──────────┘
///
/// Pellet cells stay `Pellet` forever; which pellets remain is tracked
/// by the round, not the grid.

use std::collections::BTreeSet;

use thiserror::Error;

use super::cell::CellKind;
use super::entity::{Direction, TilePos};

/// Load-time maze problems. All are fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MazeError {
    #[error("maze has no rows")]
    Empty,
    #[error("row {row} is {found} cells wide, expected {expected}")]
    Ragged { row: usize, expected: usize, found: usize },
    #[error("maze is {width}x{height}, minimum is 3x3")]
    TooSmall { width: usize, height: usize },
    #[error("unknown cell code {code:?} at ({x}, {y})")]
    UnknownCode { x: usize, y: usize, code: char },
    #[error("border cell ({x}, {y}) is not a wall")]
    OpenBorder { x: usize, y: usize },
    #[error("maze has no open tiles")]
    NoOpenTiles,
    #[error("maze has no gate")]
    NoGate,
    #[error("gate at ({x}, {y}) has no open neighbor for the ghost house")]
    NoHome { x: i32, y: i32 },
}

#[derive(Clone, Debug)]
pub struct Maze {
    cells: Vec<Vec<CellKind>>,
    width: usize,
    height: usize,
}

impl Maze {
    /// Decode rows of cell codes ('0'..'4') and validate.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Maze, MazeError> {
        let mut cells = Vec::with_capacity(rows.len());
        for (y, row) in rows.iter().enumerate() {
            let mut line = Vec::with_capacity(row.as_ref().len());
            for (x, code) in row.as_ref().chars().enumerate() {
                let kind = CellKind::from_code(code).ok_or(MazeError::UnknownCode { x, y, code })?;
                line.push(kind);
            }
            cells.push(line);
        }
        Maze::from_cells(cells)
    }

    /// Validate an already decoded cell matrix.
    pub fn from_cells(cells: Vec<Vec<CellKind>>) -> Result<Maze, MazeError> {
        let height = cells.len();
        if height == 0 {
            return Err(MazeError::Empty);
        }
        let width = cells[0].len();
        for (row, line) in cells.iter().enumerate() {
            if line.len() != width {
                return Err(MazeError::Ragged { row, expected: width, found: line.len() });
            }
        }
        if width < 3 || height < 3 {
            return Err(MazeError::TooSmall { width, height });
        }

        for (y, line) in cells.iter().enumerate() {
            for (x, cell) in line.iter().enumerate() {
                let border = x == 0 || y == 0 || x + 1 == width || y + 1 == height;
                if border && !cell.is_wall() {
                    return Err(MazeError::OpenBorder { x, y });
                }
            }
        }

        let maze = Maze { cells, width, height };

        if maze.tiles().all(|t| !maze.can_pass(t.x, t.y)) {
            return Err(MazeError::NoOpenTiles);
        }
        let gate = maze.first_gate().ok_or(MazeError::NoGate)?;
        if maze.gate_neighbor(gate).is_none() {
            return Err(MazeError::NoHome { x: gate.x, y: gate.y });
        }

        Ok(maze)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Cell at (tx, ty). Anything outside the grid reads as Wall.
    #[inline]
    pub fn cell_at(&self, tx: i32, ty: i32) -> CellKind {
        if tx < 0 || ty < 0 || tx as usize >= self.width || ty as usize >= self.height {
            return CellKind::Wall;
        }
        self.cells[ty as usize][tx as usize]
    }

    #[inline]
    pub fn is_wall(&self, tx: i32, ty: i32) -> bool {
        self.cell_at(tx, ty).is_wall()
    }

    #[inline]
    pub fn is_gate(&self, tx: i32, ty: i32) -> bool {
        self.cell_at(tx, ty).is_gate()
    }

    #[inline]
    pub fn can_pass(&self, tx: i32, ty: i32) -> bool {
        self.cell_at(tx, ty).is_passable()
    }

    /// Every tile coordinate, row-major.
    pub fn tiles(&self) -> impl Iterator<Item = TilePos> + '_ {
        (0..self.height as i32).flat_map(move |y| (0..self.width as i32).map(move |x| TilePos::new(x, y)))
    }

    pub fn pellet_tiles(&self) -> BTreeSet<TilePos> {
        self.tiles().filter(|t| self.cell_at(t.x, t.y) == CellKind::Pellet).collect()
    }

    pub fn power_pellet_tiles(&self) -> BTreeSet<TilePos> {
        self.tiles().filter(|t| self.cell_at(t.x, t.y) == CellKind::PowerPellet).collect()
    }

    /// First gate in row-major order.
    pub fn first_gate(&self) -> Option<TilePos> {
        self.tiles().find(|t| self.is_gate(t.x, t.y))
    }

    /// Ghost-house home: the open tile just behind the first gate,
    /// trying below, above, left, right in that order.
    pub fn home_tile(&self) -> Option<TilePos> {
        self.first_gate().and_then(|g| self.gate_neighbor(g))
    }

    fn gate_neighbor(&self, gate: TilePos) -> Option<TilePos> {
        [Direction::Down, Direction::Up, Direction::Left, Direction::Right]
            .iter()
            .map(|&d| gate.step(d))
            .find(|t| self.can_pass(t.x, t.y) && !self.is_gate(t.x, t.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &[&str] = &[
        "11111",
        "12031",
        "11411",
        "10001",
        "11111",
    ];

    #[test]
    fn out_of_bounds_is_wall() {
        let m = Maze::from_rows(SMALL).unwrap();
        assert_eq!(m.cell_at(-1, 0), CellKind::Wall);
        assert_eq!(m.cell_at(0, -1), CellKind::Wall);
        assert_eq!(m.cell_at(5, 1), CellKind::Wall);
        assert_eq!(m.cell_at(1, 99), CellKind::Wall);
        assert!(!m.can_pass(-3, 2));
    }

    #[test]
    fn passability_queries() {
        let m = Maze::from_rows(SMALL).unwrap();
        assert!(m.can_pass(1, 1)); // pellet
        assert!(m.can_pass(2, 1)); // empty
        assert!(m.can_pass(3, 1)); // power
        assert!(m.can_pass(2, 2)); // gate
        assert!(m.is_gate(2, 2));
        assert!(m.is_wall(1, 2));
        assert!(!m.can_pass(1, 2));
    }

    #[test]
    fn pellet_sets_and_home() {
        let m = Maze::from_rows(SMALL).unwrap();
        assert_eq!(m.pellet_tiles().into_iter().collect::<Vec<_>>(), vec![TilePos::new(1, 1)]);
        assert_eq!(m.power_pellet_tiles().into_iter().collect::<Vec<_>>(), vec![TilePos::new(3, 1)]);
        assert_eq!(m.home_tile(), Some(TilePos::new(2, 3))); // below the gate
    }

    #[test]
    fn home_falls_back_above_gate() {
        let m = Maze::from_rows(&["11111", "10001", "11411", "11111"]).unwrap();
        assert_eq!(m.home_tile(), Some(TilePos::new(2, 1)));
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = Maze::from_rows(&["111", "11", "111"]).unwrap_err();
        assert_eq!(err, MazeError::Ragged { row: 1, expected: 3, found: 2 });
    }

    #[test]
    fn rejects_open_border() {
        let err = Maze::from_rows(&["11111", "04001", "11111"]).unwrap_err();
        assert_eq!(err, MazeError::OpenBorder { x: 0, y: 1 });
    }

    #[test]
    fn rejects_unknown_code() {
        let err = Maze::from_rows(&["111", "1x1", "111"]).unwrap_err();
        assert_eq!(err, MazeError::UnknownCode { x: 1, y: 1, code: 'x' });
    }

    #[test]
    fn rejects_missing_gate_and_open_tiles() {
        assert_eq!(Maze::from_rows(&["111", "111", "111"]).unwrap_err(), MazeError::NoOpenTiles);
        assert_eq!(Maze::from_rows(&["1111", "1001", "1111"]).unwrap_err(), MazeError::NoGate);
        assert_eq!(Maze::from_rows::<&str>(&[]).unwrap_err(), MazeError::Empty);
        assert_eq!(Maze::from_rows(&["11", "11"]).unwrap_err(), MazeError::TooSmall { width: 2, height: 2 });
    }

    #[test]
    fn rejects_sealed_gate() {
        let err = Maze::from_rows(&["11111", "11411", "11111", "10001", "11111"]).unwrap_err();
        assert_eq!(err, MazeError::NoHome { x: 2, y: 1 });
    }
}
