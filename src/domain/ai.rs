/// Adversary AI — greedy, distance-based direction choice.
///
/// Three modes, one per `AdversaryState`:
///   1. **Pursuing** — head for the player's tile (with occasional jitter).
///   2. **Evading** — run from the player's tile (with more jitter).
///   3. **ReturningHome** — head for the ghost-house home tile.
///
/// No search: each decision looks one tile ahead and compares squared
/// Euclidean distance to the target. Decisions happen only at tile
/// centers; between centers the adversary keeps its heading.
///
/// Returning home also remembers how often each tile was entered and
/// prefers the least-visited neighbor, distance second. On a first pass
/// this is plain greedy; it only differs once the adversary starts
/// circling a block that sits between it and home.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;

use super::entity::{Adversary, AdversaryState, Direction, TilePos};
use super::maze::Maze;

/// Speeds and randomness for the behavior machine.
#[derive(Clone, Debug, PartialEq)]
pub struct AdversaryTuning {
    pub base_speed: f32,
    pub evading_speed: f32,
    pub returning_speed: f32,
    /// Chance of a random legal turn while pursuing.
    pub pursue_jitter: f64,
    /// Chance of a random legal turn while evading.
    pub evade_jitter: f64,
}

impl Default for AdversaryTuning {
    fn default() -> Self {
        AdversaryTuning {
            base_speed: 2.6,
            evading_speed: 2.0,
            returning_speed: 3.2,
            pursue_jitter: 0.15,
            evade_jitter: 0.30,
        }
    }
}

impl AdversaryTuning {
    pub fn speed_for(&self, state: AdversaryState) -> f32 {
        match state {
            AdversaryState::Pursuing => self.base_speed,
            AdversaryState::Evading => self.evading_speed,
            AdversaryState::ReturningHome => self.returning_speed,
        }
    }
}

// ── Trail ──

/// Tile-entry counts for one trip home.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Trail {
    visits: HashMap<TilePos, u32>,
    last: Option<TilePos>,
}

impl Trail {
    /// Count `tile` once per arrival; lingering on it does not add more.
    pub fn enter(&mut self, tile: TilePos) {
        if self.last != Some(tile) {
            *self.visits.entry(tile).or_insert(0) += 1;
            self.last = Some(tile);
        }
    }

    pub fn visits(&self, tile: TilePos) -> u32 {
        self.visits.get(&tile).copied().unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.visits.clear();
        self.last = None;
    }
}

// ── Candidate directions ──

/// Non-wall directions out of `tile`, in tie-break order, without the
/// reversal of `current`. If that leaves nothing, reversal is allowed.
pub fn legal_directions(maze: &Maze, tile: TilePos, current: Direction) -> Vec<Direction> {
    let open = |d: Direction| {
        let t = tile.step(d);
        !maze.is_wall(t.x, t.y)
    };

    let forward: Vec<Direction> = Direction::CARDINALS
        .iter()
        .copied()
        .filter(|&d| current == Direction::Stop || d != current.reverse())
        .filter(|&d| open(d))
        .collect();
    if !forward.is_empty() {
        return forward;
    }

    Direction::CARDINALS.iter().copied().filter(|&d| open(d)).collect()
}

/// Candidate whose next tile is closest to `target`. First wins on ties.
fn nearest(tile: TilePos, choices: &[Direction], target: TilePos) -> Direction {
    let mut best = Direction::Stop;
    let mut best_dist = i32::MAX;
    for &d in choices {
        let dist = tile.step(d).dist_sq(target);
        if dist < best_dist {
            best_dist = dist;
            best = d;
        }
    }
    best
}

/// Candidate whose next tile is farthest from `threat`. First wins on ties.
fn farthest(tile: TilePos, choices: &[Direction], threat: TilePos) -> Direction {
    let mut best = Direction::Stop;
    let mut best_dist = -1;
    for &d in choices {
        let dist = tile.step(d).dist_sq(threat);
        if dist > best_dist {
            best_dist = dist;
            best = d;
        }
    }
    best
}

/// Least-visited candidate, nearest to `target` among equals.
fn homeward(tile: TilePos, choices: &[Direction], target: TilePos, trail: &Trail) -> Direction {
    let mut best = Direction::Stop;
    let mut best_key = (u32::MAX, i32::MAX);
    for &d in choices {
        let next = tile.step(d);
        let key = (trail.visits(next), next.dist_sq(target));
        if key < best_key {
            best_key = key;
            best = d;
        }
    }
    best
}

// ── Decision ──

/// Pick the heading an adversary should take out of its current tile.
/// Returns `Stop` only when the tile is fully enclosed.
pub fn choose_direction<R: Rng + ?Sized>(
    maze: &Maze,
    adversary: &Adversary,
    player_tile: TilePos,
    tuning: &AdversaryTuning,
    rng: &mut R,
) -> Direction {
    let tile = adversary.tile();
    let choices = legal_directions(maze, tile, adversary.facing());
    if choices.is_empty() {
        return Direction::Stop;
    }

    match adversary.state {
        AdversaryState::Evading => {
            if rng.gen::<f64>() < tuning.evade_jitter {
                return *choices.choose(rng).unwrap_or(&Direction::Stop);
            }
            farthest(tile, &choices, player_tile)
        }
        AdversaryState::ReturningHome => homeward(tile, &choices, adversary.home, &adversary.trail),
        AdversaryState::Pursuing => {
            if rng.gen::<f64>() < tuning.pursue_jitter {
                return *choices.choose(rng).unwrap_or(&Direction::Stop);
            }
            nearest(tile, &choices, player_tile)
        }
    }
}

impl Adversary {
    /// One tick: pick speed from state, decide at tile centers, move.
    /// Movement stops on every tile center so no decision is skipped.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        maze: &Maze,
        player_tile: TilePos,
        tuning: &AdversaryTuning,
        rng: &mut R,
    ) {
        self.mover.speed = tuning.speed_for(self.state);
        if self.mover.at_tile_center() {
            if self.state == AdversaryState::ReturningHome {
                let tile = self.tile();
                self.trail.enter(tile);
            }
            self.mover.pending = choose_direction(maze, self, player_tile, tuning, rng);
        }
        self.mover.step_via_centers(maze);
        if self.mover.direction != Direction::Stop {
            self.heading = self.mover.direction;
        }
    }
}
