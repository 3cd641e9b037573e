/// Maze cell kinds and their properties.
/// Properties are queried via methods, not stored as flags,
/// so cell semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CellKind {
    Empty,
    Wall,
    Pellet,
    PowerPellet,
    Gate, // ghost-house entrance
}

impl CellKind {
    /// Decode one character of the maze text format.
    ///
    ///   '0' = Empty   '1' = Wall   '2' = Pellet
    ///   '3' = Power pellet         '4' = Gate
    pub fn from_code(code: char) -> Option<CellKind> {
        match code {
            '0' => Some(CellKind::Empty),
            '1' => Some(CellKind::Wall),
            '2' => Some(CellKind::Pellet),
            '3' => Some(CellKind::PowerPellet),
            '4' => Some(CellKind::Gate),
            _ => None,
        }
    }

    pub fn is_wall(self) -> bool {
        matches!(self, CellKind::Wall)
    }

    pub fn is_gate(self) -> bool {
        matches!(self, CellKind::Gate)
    }

    /// Can an agent occupy this cell?
    /// Gate is open to the player and adversaries alike.
    pub fn is_passable(self) -> bool {
        matches!(
            self,
            CellKind::Empty | CellKind::Pellet | CellKind::PowerPellet | CellKind::Gate
        )
    }
}

impl Default for CellKind {
    fn default() -> Self {
        CellKind::Wall
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_all_codes() {
        assert_eq!(CellKind::from_code('0'), Some(CellKind::Empty));
        assert_eq!(CellKind::from_code('1'), Some(CellKind::Wall));
        assert_eq!(CellKind::from_code('2'), Some(CellKind::Pellet));
        assert_eq!(CellKind::from_code('3'), Some(CellKind::PowerPellet));
        assert_eq!(CellKind::from_code('4'), Some(CellKind::Gate));
        assert_eq!(CellKind::from_code('x'), None);
    }

    #[test]
    fn only_wall_blocks() {
        assert!(!CellKind::Wall.is_passable());
        assert!(CellKind::Empty.is_passable());
        assert!(CellKind::Pellet.is_passable());
        assert!(CellKind::PowerPellet.is_passable());
        assert!(CellKind::Gate.is_passable());
    }
}
