/// Entities: Player and Adversary, plus the grid geometry they share.
///
/// Coordinates come in two flavors:
///   - `Point`   — continuous position in sub-tile units (pixels)
///   - `TilePos` — integer (column, row) of a maze cell
///
/// Both agents move through a `Mover`; they differ only in who supplies
/// the buffered direction (player input vs. adversary behavior).

use rand::seq::SliceRandom;
use rand::Rng;

use super::ai::Trail;
use super::mover::Mover;

/// Edge length of one tile in continuous units.
pub const TILE_SIZE: f32 = 20.0;

/// Slack subtracted from the summed radii when testing agent contact.
pub const CONTACT_SLACK: f32 = 2.0;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    Stop,
}

impl Direction {
    /// The four moving directions in tie-break order.
    /// Greedy selection keeps the first best candidate, so this order is
    /// part of the replay contract.
    pub const CARDINALS: [Direction; 4] = [
        Direction::Up,
        Direction::Left,
        Direction::Down,
        Direction::Right,
    ];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::Stop => (0, 0),
        }
    }

    pub fn reverse(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Stop => Direction::Stop,
        }
    }

    /// Uniformly random moving direction.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Direction {
        *Direction::CARDINALS.choose(rng).unwrap_or(&Direction::Stop)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub fn new(x: i32, y: i32) -> Self {
        TilePos { x, y }
    }

    pub fn step(self, dir: Direction) -> TilePos {
        let (dx, dy) = dir.delta();
        TilePos { x: self.x + dx, y: self.y + dy }
    }

    /// Geometric midpoint of this tile.
    pub fn center(self) -> Point {
        Point {
            x: self.x as f32 * TILE_SIZE + TILE_SIZE / 2.0,
            y: self.y as f32 * TILE_SIZE + TILE_SIZE / 2.0,
        }
    }

    pub fn dist_sq(self, other: TilePos) -> i32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn tile(self) -> TilePos {
        TilePos {
            x: (self.x / TILE_SIZE).floor() as i32,
            y: (self.y / TILE_SIZE).floor() as i32,
        }
    }

    pub fn distance(self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

// ── Player ──

#[derive(Clone, Debug)]
pub struct Player {
    pub mover: Mover,
    pub spawn: TilePos,
    pub radius: f32,
}

impl Player {
    pub fn new(spawn: TilePos, speed: f32) -> Self {
        Player {
            mover: Mover::at(spawn, speed),
            spawn,
            radius: TILE_SIZE / 2.0 - 2.0,
        }
    }

    /// Buffer a turn request. Takes effect at the next tile center where
    /// the requested neighbor is passable.
    pub fn set_desired_direction(&mut self, dir: Direction) {
        self.mover.pending = dir;
    }

    pub fn update(&mut self, maze: &super::maze::Maze) {
        self.mover.step(maze);
    }

    pub fn reset(&mut self) {
        let speed = self.mover.speed;
        self.mover = Mover::at(self.spawn, speed);
    }

    pub fn tile(&self) -> TilePos {
        self.mover.tile()
    }

    pub fn position(&self) -> Point {
        self.mover.pos
    }
}

// ── Adversary ──

/// Behavior state. Transitions are applied by the round controller
/// through the trigger methods on `Adversary`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AdversaryState {
    Pursuing,
    Evading,
    ReturningHome,
}

/// Cosmetic identity, used for color only.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Identity {
    Red,
    Pink,
    Cyan,
    Orange,
}

impl Identity {
    pub const ALL: [Identity; 4] = [Identity::Red, Identity::Pink, Identity::Cyan, Identity::Orange];
}

/// What the presentation layer should draw.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Appearance {
    Normal,
    Frightened,
    Eyes,
}

#[derive(Clone, Debug)]
pub struct Adversary {
    pub id: usize,
    pub identity: Identity,
    pub mover: Mover,
    /// Last non-Stop direction. Stands in for `mover.direction` while the
    /// mover is stopped, so a halt never re-enables reversal.
    pub heading: Direction,
    /// Tiles entered on the current trip home.
    pub trail: Trail,
    pub state: AdversaryState,
    pub spawn: TilePos,
    pub home: TilePos,
    pub radius: f32,
}

impl Adversary {
    pub fn new(id: usize, identity: Identity, spawn: TilePos, home: TilePos, speed: f32) -> Self {
        Adversary {
            id,
            identity,
            mover: Mover::at(spawn, speed),
            heading: Direction::Stop,
            trail: Trail::default(),
            state: AdversaryState::Pursuing,
            spawn,
            home,
            radius: TILE_SIZE / 2.0 - 3.0,
        }
    }

    /// Power pellet consumed. Returns true if the state changed.
    pub fn frighten(&mut self) -> bool {
        match self.state {
            AdversaryState::Pursuing => {
                self.state = AdversaryState::Evading;
                true
            }
            AdversaryState::Evading | AdversaryState::ReturningHome => false,
        }
    }

    /// Power timer expired.
    pub fn calm(&mut self) -> bool {
        match self.state {
            AdversaryState::Evading => {
                self.state = AdversaryState::Pursuing;
                true
            }
            AdversaryState::Pursuing | AdversaryState::ReturningHome => false,
        }
    }

    /// Caught by the player while evading. Halts in place (snapped to the
    /// current tile center so the next tick can pick a heading home).
    pub fn mark_eaten(&mut self) -> bool {
        match self.state {
            AdversaryState::Evading => {
                self.state = AdversaryState::ReturningHome;
                self.trail.clear();
                self.mover.snap_to_center();
                self.mover.direction = Direction::Stop;
                self.mover.pending = Direction::Stop;
                true
            }
            AdversaryState::Pursuing | AdversaryState::ReturningHome => false,
        }
    }

    /// Back at the home tile center after being eaten.
    pub fn try_revive(&mut self) -> bool {
        match self.state {
            AdversaryState::ReturningHome
                if self.tile() == self.home && self.mover.at_tile_center() =>
            {
                self.state = AdversaryState::Pursuing;
                self.trail.clear();
                true
            }
            _ => false,
        }
    }

    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let speed = self.mover.speed;
        self.mover = Mover::at(self.spawn, speed);
        self.mover.direction = Direction::random(rng);
        self.heading = self.mover.direction;
        self.trail.clear();
        self.state = AdversaryState::Pursuing;
    }

    /// Direction used for the no-reversal rule.
    pub fn facing(&self) -> Direction {
        match self.mover.direction {
            Direction::Stop => self.heading,
            d => d,
        }
    }

    pub fn appearance(&self) -> Appearance {
        match self.state {
            AdversaryState::Pursuing => Appearance::Normal,
            AdversaryState::Evading => Appearance::Frightened,
            AdversaryState::ReturningHome => Appearance::Eyes,
        }
    }

    pub fn tile(&self) -> TilePos {
        self.mover.tile()
    }

    pub fn position(&self) -> Point {
        self.mover.pos
    }

    /// Center-to-center contact test against the player.
    pub fn touches(&self, player: &Player) -> bool {
        self.position().distance(player.position()) < player.radius + self.radius - CONTACT_SLACK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adversary() -> Adversary {
        Adversary::new(0, Identity::Red, TilePos::new(3, 3), TilePos::new(5, 5), 2.6)
    }

    #[test]
    fn tile_of_point_floors() {
        assert_eq!(Point { x: 19.9, y: 20.0 }.tile(), TilePos::new(0, 1));
        assert_eq!(TilePos::new(2, 1).center(), Point { x: 50.0, y: 30.0 });
    }

    #[test]
    fn reverse_is_involution() {
        for d in Direction::CARDINALS {
            assert_eq!(d.reverse().reverse(), d);
            assert_ne!(d.reverse(), d);
        }
        assert_eq!(Direction::Stop.reverse(), Direction::Stop);
    }

    #[test]
    fn frighten_skips_returning_home() {
        let mut a = adversary();
        assert!(a.frighten());
        assert_eq!(a.state, AdversaryState::Evading);
        assert!(!a.frighten());

        a.state = AdversaryState::ReturningHome;
        assert!(!a.frighten());
        assert_eq!(a.state, AdversaryState::ReturningHome);
    }

    #[test]
    fn calm_only_reverts_evading() {
        let mut a = adversary();
        a.state = AdversaryState::ReturningHome;
        assert!(!a.calm());
        assert_eq!(a.state, AdversaryState::ReturningHome);

        a.state = AdversaryState::Evading;
        assert!(a.calm());
        assert_eq!(a.state, AdversaryState::Pursuing);
    }

    #[test]
    fn eaten_adversary_halts_at_center() {
        let mut a = adversary();
        a.state = AdversaryState::Evading;
        a.mover.direction = Direction::Right;
        a.mover.pos.x += 4.0;

        assert!(a.mark_eaten());
        assert_eq!(a.state, AdversaryState::ReturningHome);
        assert_eq!(a.mover.direction, Direction::Stop);
        assert_eq!(a.position(), TilePos::new(3, 3).center());
        assert!(!a.mark_eaten());
    }

    #[test]
    fn revive_requires_home_center() {
        let mut a = adversary();
        a.state = AdversaryState::ReturningHome;
        assert!(!a.try_revive());

        a.mover.pos = TilePos::new(5, 5).center();
        a.mover.pos.x += 3.0;
        assert!(!a.try_revive());

        a.mover.pos.x -= 2.5;
        assert!(a.try_revive());
        assert_eq!(a.state, AdversaryState::Pursuing);
    }

    #[test]
    fn contact_threshold_uses_both_radii() {
        let a = adversary();
        let mut p = Player::new(TilePos::new(3, 3), 3.0);
        // radii 8 + 7 - 2 = 13
        p.mover.pos.x += 12.9;
        assert!(a.touches(&p));
        p.mover.pos.x += 0.2;
        assert!(!a.touches(&p));
    }
}
