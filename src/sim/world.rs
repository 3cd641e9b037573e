/// WorldState: the complete snapshot of a running round.
///
/// ## Ownership
///
/// The round owns everything that changes during play: remaining pellet
/// sets, score, lives, power timer, the RNG and both kinds of agent.
/// The maze itself (inside `level`) is never mutated after load; eaten
/// pellets are tracked only by removing them from `dots` / `power_pellets`.
///
/// ## Camera / Viewport
///
/// World coordinates and screen coordinates are separate:
///   - `camera` — viewport into the maze (top-left tile + size)
///   - Renderer maps: `screen(sx, sy) = world(camera.x + sx, camera.y + sy)`
///   - Camera follows the player with a dead-zone approach
///   - Mazes smaller than the viewport are centered

use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::config::GameConfig;
use crate::domain::ai::AdversaryTuning;
use crate::domain::entity::{Adversary, Player, TilePos};
use crate::domain::maze::Maze;
use crate::sim::level::Level;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    /// Front-end title screen; no round running yet.
    Title,
    /// Round built, short countdown before play.
    Ready,
    Playing,
    Won,
    Lost,
}

impl Phase {
    /// Won and Lost are terminal for the round.
    pub fn is_over(self) -> bool {
        matches!(self, Phase::Won | Phase::Lost)
    }
}

/// Per-round rules, resolved from config once.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundSettings {
    pub lives: u32,
    /// Seconds of Evading after a power pellet.
    pub power_duration: f32,
    pub player_speed: f32,
    pub tuning: AdversaryTuning,
}

impl Default for RoundSettings {
    fn default() -> Self {
        RoundSettings {
            lives: 3,
            power_duration: 6.0,
            player_speed: 3.0,
            tuning: AdversaryTuning::default(),
        }
    }
}

impl RoundSettings {
    pub fn from_config(config: &GameConfig) -> Self {
        RoundSettings {
            lives: config.gameplay.lives,
            power_duration: config.gameplay.power_duration_secs,
            player_speed: config.speed.player,
            tuning: AdversaryTuning {
                base_speed: config.speed.adversary,
                evading_speed: config.speed.evading,
                returning_speed: config.speed.returning,
                pursue_jitter: config.behavior.pursue_jitter,
                evade_jitter: config.behavior.evade_jitter,
            },
        }
    }
}

/// Production RNG: fixed seed from config, else entropy.
pub fn make_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Camera: a viewport into the maze.
///
/// `(x, y)` is the tile coordinate of the top-left visible cell.
/// `(view_w, view_h)` is how many tiles fit in the viewport.
/// These are computed from terminal size and set during `render()`.
#[derive(Clone, Debug, Default)]
pub struct Camera {
    /// Tile X of the top-left visible cell (negative when centering)
    pub x: i32,
    /// Tile Y of the top-left visible cell
    pub y: i32,
    pub view_w: usize,
    pub view_h: usize,
}

impl Camera {
    pub fn new() -> Self {
        Camera::default()
    }

    /// Follow a target tile, scrolling only when it nears the viewport edge.
    pub fn follow(&mut self, target: TilePos, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        self.x = follow_axis(self.x, target.x, self.view_w, world_w);
        self.y = follow_axis(self.y, target.y, self.view_h, world_h);
    }

    /// Snap directly onto a target (no dead zone). Used on round start.
    pub fn center_on(&mut self, target: TilePos, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        self.x = center_axis(target.x, self.view_w, world_w);
        self.y = center_axis(target.y, self.view_h, world_h);
    }

    /// Tile → viewport cell, or None if outside the visible area.
    pub fn world_to_view(&self, wx: i32, wy: i32) -> Option<(usize, usize)> {
        let vx = wx - self.x;
        let vy = wy - self.y;
        if vx >= 0 && vx < self.view_w as i32 && vy >= 0 && vy < self.view_h as i32 {
            Some((vx as usize, vy as usize))
        } else {
            None
        }
    }
}

fn follow_axis(origin: i32, target: i32, view: usize, world: usize) -> i32 {
    if world <= view {
        return -((view as i32 - world as i32) / 2);
    }
    // Dead zone: 20% margin on each side.
    let margin = view as i32 / 5;
    let mut origin = origin;
    if target < origin + margin {
        origin = target - margin;
    } else if target > origin + view as i32 - margin - 1 {
        origin = target - view as i32 + margin + 1;
    }
    origin.clamp(0, (world as i32 - view as i32).max(0))
}

fn center_axis(target: i32, view: usize, world: usize) -> i32 {
    if world <= view {
        return -((view as i32 - world as i32) / 2);
    }
    (target - view as i32 / 2).clamp(0, (world as i32 - view as i32).max(0))
}

pub struct WorldState<R = ChaCha8Rng> {
    // ── Level ──
    pub level: Level,

    // ── Pellets (shrink only) ──
    pub dots: BTreeSet<TilePos>,
    pub power_pellets: BTreeSet<TilePos>,

    // ── Entities ──
    pub player: Player,
    /// Registration order is processing order.
    pub adversaries: Vec<Adversary>,

    // ── Round tracking ──
    pub phase: Phase,
    pub score: u32,
    pub lives: u32,
    /// Seconds of power mode left; 0 when inactive.
    pub power_timer: f32,
    pub tick: u64,
    pub settings: RoundSettings,
    pub rng: R,

    // ── UI ──
    pub message: String,
    pub message_timer: u32,
    pub paused: bool,
    pub camera: Camera,
}

// ── Construction ──

impl<R: Rng> WorldState<R> {
    /// Fresh round on `level`: full pellets, full lives, agents at spawn.
    pub fn new_round(level: Level, settings: RoundSettings, rng: R) -> Self {
        let player = Player::new(level.player_spawn, settings.player_speed);
        let adversaries = level
            .adversary_spawns
            .iter()
            .enumerate()
            .map(|(id, &(identity, spawn))| {
                Adversary::new(id, identity, spawn, level.home, settings.tuning.base_speed)
            })
            .collect();

        let mut world = WorldState {
            dots: level.maze.pellet_tiles(),
            power_pellets: level.maze.power_pellet_tiles(),
            player,
            adversaries,
            phase: Phase::Playing,
            score: 0,
            lives: settings.lives,
            power_timer: 0.0,
            tick: 0,
            settings,
            rng,
            message: String::new(),
            message_timer: 0,
            paused: false,
            camera: Camera::new(),
            level,
        };
        world.reset_agents();
        world.recenter_camera();

        info!(
            maze = %world.level.name,
            pellets = world.dots.len(),
            power_pellets = world.power_pellets.len(),
            lives = world.lives,
            "round started"
        );
        world
    }

    /// Replay on the same maze: pellets, score and lives restored.
    /// The RNG continues from where it is.
    pub fn restart_round(&mut self) {
        self.dots = self.level.maze.pellet_tiles();
        self.power_pellets = self.level.maze.power_pellet_tiles();
        self.score = 0;
        self.lives = self.settings.lives;
        self.power_timer = 0.0;
        self.tick = 0;
        self.phase = Phase::Playing;
        self.paused = false;
        self.message.clear();
        self.message_timer = 0;
        self.reset_agents();
        self.recenter_camera();
        info!(maze = %self.level.name, "round restarted");
    }

    /// Player and every adversary back to spawn. Adversaries return to
    /// Pursuing with a fresh random heading.
    pub fn reset_agents(&mut self) {
        self.player.reset();
        for a in &mut self.adversaries {
            a.reset(&mut self.rng);
        }
    }
}

impl<R> WorldState<R> {
    pub fn maze(&self) -> &Maze {
        &self.level.maze
    }

    pub fn pellets_remaining(&self) -> usize {
        self.dots.len() + self.power_pellets.len()
    }

    /// Snap the camera back onto the player's spawn.
    pub fn recenter_camera(&mut self) {
        let (w, h) = (self.level.maze.width(), self.level.maze.height());
        self.camera.center_on(self.level.player_spawn, w, h);
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{AdversaryState, Direction};
    use crate::sim::level::builtin_level;
    use rand::rngs::mock::StepRng;

    fn world() -> WorldState<StepRng> {
        WorldState::new_round(builtin_level().unwrap(), RoundSettings::default(), StepRng::new(0, 1))
    }

    #[test]
    fn new_round_initial_state() {
        let w = world();
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.score, 0);
        assert_eq!(w.lives, 3);
        assert_eq!(w.power_timer, 0.0);
        assert_eq!(w.pellets_remaining(), 14);
        assert_eq!(w.player.tile(), TilePos::new(1, 28));
        assert_eq!(w.adversaries.len(), 4);
        assert!(w.adversaries.iter().all(|a| a.state == AdversaryState::Pursuing));
        assert!(w.adversaries.iter().all(|a| a.home == TilePos::new(21, 25)));
    }

    #[test]
    fn restart_restores_everything() {
        let mut w = world();
        w.dots.clear();
        w.score = 990;
        w.lives = 1;
        w.power_timer = 3.0;
        w.phase = Phase::Lost;
        w.player.mover.direction = Direction::Up;
        w.restart_round();
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.score, 0);
        assert_eq!(w.lives, 3);
        assert_eq!(w.power_timer, 0.0);
        assert_eq!(w.dots.len(), 10);
        assert_eq!(w.player.mover.direction, Direction::Stop);
    }

    #[test]
    fn settings_follow_config() {
        let cfg = GameConfig::from_toml_str("[gameplay]\nlives = 5\n[speed]\nevading = 1.5\n").unwrap();
        let s = RoundSettings::from_config(&cfg);
        assert_eq!(s.lives, 5);
        assert_eq!(s.tuning.evading_speed, 1.5);
        assert_eq!(s.tuning.base_speed, 2.6);
    }

    #[test]
    fn camera_centers_small_maze() {
        let mut cam = Camera { x: 0, y: 0, view_w: 50, view_h: 40 };
        cam.center_on(TilePos::new(1, 28), 40, 30);
        assert_eq!((cam.x, cam.y), (-5, -5));
        assert_eq!(cam.world_to_view(0, 0), Some((5, 5)));
    }

    #[test]
    fn camera_follows_within_bounds() {
        let mut cam = Camera { x: 0, y: 0, view_w: 20, view_h: 10 };
        cam.center_on(TilePos::new(1, 28), 40, 30);
        assert_eq!((cam.x, cam.y), (0, 20));
        cam.follow(TilePos::new(39, 28), 40, 30);
        assert_eq!(cam.x, 20);
        assert_eq!(cam.world_to_view(39, 28), Some((19, 8)));
        assert_eq!(cam.world_to_view(0, 0), None);
    }
}
