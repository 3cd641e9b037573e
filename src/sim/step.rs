/// The step function: advances the round by one fixed tick.
///
/// Processing order:
///   1. Movement (player → adversaries in registration order)
///   2. Pellet pickup
///   3. Contact resolution
///   4. Revival sweep
///   5. Power timer
///   6. Win check
///
/// ## Contact outcomes
///
/// ┌──────────────────┬────────────────────────────────────────────┐
/// │ Adversary state  │ Effect                                     │
/// ├──────────────────┼────────────────────────────────────────────┤
/// │ Evading          │ eaten → ReturningHome, +200, halts         │
/// │ ReturningHome    │ nothing                                    │
/// │ Pursuing         │ lose a life; Lost at 0, else reset agents  │
/// └──────────────────┴────────────────────────────────────────────┘
///
/// A lost life ends contact processing for the tick and skips steps 4-5
/// (every adversary is back to Pursuing anyway). Won and Lost are
/// terminal: `step` does nothing once either is reached.

use rand::Rng;
use tracing::{debug, info};

use crate::domain::entity::{AdversaryState, Direction};
use super::event::GameEvent;
use super::world::{Phase, WorldState};

pub const PELLET_POINTS: u32 = 10;
pub const POWER_PELLET_POINTS: u32 = 50;
pub const ADVERSARY_POINTS: u32 = 200;

/// How contact resolution ended.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Contact {
    Clear,
    LifeLost,
    RoundLost,
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

/// `input` is the direction requested this tick, if any. `dt` is the
/// tick length in seconds and only drives the power timer.
pub fn step<R: Rng>(world: &mut WorldState<R>, input: Option<Direction>, dt: f32) -> Vec<GameEvent> {
    if world.phase != Phase::Playing { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;

    if world.message_timer > 0 {
        world.message_timer -= 1;
        if world.message_timer == 0 { world.message.clear(); }
    }

    resolve_movement(world, input);
    resolve_pellets(world, &mut events);
    match resolve_contacts(world, &mut events) {
        Contact::RoundLost => return events,
        Contact::LifeLost => world.power_timer = 0.0,
        Contact::Clear => {
            resolve_revivals(world, &mut events);
            resolve_power_timer(world, dt, &mut events);
        }
    }
    resolve_win(world, &mut events);

    events
}

// ══════════════════════════════════════════════════════════════
// Movement
// ══════════════════════════════════════════════════════════════

fn resolve_movement<R: Rng>(world: &mut WorldState<R>, input: Option<Direction>) {
    if let Some(dir) = input {
        world.player.set_desired_direction(dir);
    }
    world.player.update(&world.level.maze);

    let maze = &world.level.maze;
    let target = world.player.tile();
    let tuning = &world.settings.tuning;
    for a in &mut world.adversaries {
        a.update(maze, target, tuning, &mut world.rng);
    }
}

// ══════════════════════════════════════════════════════════════
// Pellets
// ══════════════════════════════════════════════════════════════

fn resolve_pellets<R: Rng>(world: &mut WorldState<R>, events: &mut Vec<GameEvent>) {
    let tile = world.player.tile();

    if world.dots.remove(&tile) {
        world.score += PELLET_POINTS;
        debug!(?tile, score = world.score, "pellet eaten");
        events.push(GameEvent::PelletEaten { tile });
    }

    if world.power_pellets.remove(&tile) {
        world.score += POWER_PELLET_POINTS;
        world.power_timer = world.settings.power_duration;
        let mut frightened = 0;
        for a in &mut world.adversaries {
            if a.frighten() { frightened += 1; }
        }
        debug!(?tile, frightened, score = world.score, "power pellet eaten");
        events.push(GameEvent::PowerPelletEaten { tile });
    }
}

// ══════════════════════════════════════════════════════════════
// Contact
// ══════════════════════════════════════════════════════════════

fn resolve_contacts<R: Rng>(world: &mut WorldState<R>, events: &mut Vec<GameEvent>) -> Contact {
    for i in 0..world.adversaries.len() {
        if !world.adversaries[i].touches(&world.player) { continue; }

        match world.adversaries[i].state {
            AdversaryState::Evading => {
                world.adversaries[i].mark_eaten();
                world.score += ADVERSARY_POINTS;
                debug!(id = i, score = world.score, "adversary eaten");
                events.push(GameEvent::AdversaryEaten { id: i, points: ADVERSARY_POINTS });
                world.set_message(&format!("+{ADVERSARY_POINTS}"), 45);
            }
            AdversaryState::ReturningHome => {}
            AdversaryState::Pursuing => {
                world.lives = world.lives.saturating_sub(1);
                events.push(GameEvent::PlayerCaught { by: i, lives_left: world.lives });

                if world.lives == 0 {
                    world.phase = Phase::Lost;
                    info!(score = world.score, tick = world.tick, "round lost");
                    events.push(GameEvent::RoundLost);
                    return Contact::RoundLost;
                }

                info!(by = i, lives = world.lives, "player caught");
                world.reset_agents();
                return Contact::LifeLost;
            }
        }
    }
    Contact::Clear
}

// ══════════════════════════════════════════════════════════════
// Timers
// ══════════════════════════════════════════════════════════════

fn resolve_revivals<R: Rng>(world: &mut WorldState<R>, events: &mut Vec<GameEvent>) {
    for a in &mut world.adversaries {
        if a.try_revive() {
            debug!(id = a.id, "adversary revived");
            events.push(GameEvent::AdversaryRevived { id: a.id });
        }
    }
}

/// Evading adversaries never outlive the timer, including a power
/// pellet eaten with a zero duration.
fn resolve_power_timer<R: Rng>(world: &mut WorldState<R>, dt: f32, events: &mut Vec<GameEvent>) {
    let running = world.power_timer > 0.0;
    if running {
        world.power_timer -= dt;
        if world.power_timer > 0.0 { return; }
        world.power_timer = 0.0;
    }

    let mut calmed = 0;
    for a in &mut world.adversaries {
        if a.calm() { calmed += 1; }
    }
    if running || calmed > 0 {
        debug!(tick = world.tick, calmed, "power expired");
        events.push(GameEvent::PowerExpired);
    }
}

// ══════════════════════════════════════════════════════════════
// Win check
// ══════════════════════════════════════════════════════════════

fn resolve_win<R: Rng>(world: &mut WorldState<R>, events: &mut Vec<GameEvent>) {
    if world.phase != Phase::Playing { return; }
    if world.dots.is_empty() && world.power_pellets.is_empty() {
        world.phase = Phase::Won;
        info!(score = world.score, lives = world.lives, tick = world.tick, "round won");
        events.push(GameEvent::RoundWon);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::TilePos;
    use crate::domain::maze::Maze;
    use crate::domain::mover::Mover;
    use crate::sim::level::{builtin_level, Level};
    use crate::sim::world::RoundSettings;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const DT: f32 = 1.0 / 60.0;

    /// Corridor on row 1, ghost house below the gate at (4, 2).
    ///
    ///   111111111
    ///   100000021
    ///   111141111
    ///   111101111
    ///   111111111
    const ARENA: &[&str] = &[
        "111111111",
        "100000021",
        "111141111",
        "111101111",
        "111111111",
    ];

    fn world_from(rows: &[&str]) -> WorldState {
        let level = Level::from_maze("test", Maze::from_rows(rows).unwrap()).unwrap();
        WorldState::new_round(level, RoundSettings::default(), ChaCha8Rng::seed_from_u64(0))
    }

    fn put_player<R>(w: &mut WorldState<R>, tile: TilePos) {
        w.player.spawn = tile;
        w.player.reset();
    }

    fn put_adversary<R>(w: &mut WorldState<R>, i: usize, tile: TilePos, state: AdversaryState) {
        let a = &mut w.adversaries[i];
        a.mover = Mover::at(tile, a.mover.speed);
        a.heading = Direction::Stop;
        a.state = state;
    }

    fn run<R: Rng>(w: &mut WorldState<R>, input: Option<Direction>, ticks: usize) -> Vec<GameEvent> {
        let mut events = vec![];
        for _ in 0..ticks {
            events.extend(step(w, input, DT));
        }
        events
    }

    fn count(events: &[GameEvent], pred: impl Fn(&GameEvent) -> bool) -> usize {
        events.iter().filter(|e| pred(e)).count()
    }

    #[test]
    fn pellets_score_once_and_win_freezes() {
        let mut w = world_from(&[
            "111111111",
            "102000301",
            "111141111",
            "111101111",
            "111111111",
        ]);
        w.adversaries.clear();
        put_player(&mut w, TilePos::new(1, 1));

        let events = run(&mut w, Some(Direction::Right), 60);
        assert_eq!(w.score, PELLET_POINTS + POWER_PELLET_POINTS);
        assert_eq!(w.phase, Phase::Won);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::PelletEaten { .. })), 1);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::PowerPelletEaten { .. })), 1);
        assert_eq!(events.last(), Some(&GameEvent::RoundWon));

        let tick = w.tick;
        let pos = w.player.position();
        assert!(run(&mut w, Some(Direction::Left), 10).is_empty());
        assert_eq!(w.tick, tick);
        assert_eq!(w.player.position(), pos);
    }

    #[test]
    fn power_pellet_frightens_all_but_returning() {
        let mut w = world_from(&[
            "1111111111111",
            "1030000000021",
            "1111114111111",
            "1111110111111",
            "1111111111111",
        ]);
        put_player(&mut w, TilePos::new(1, 1));
        w.adversaries[1].state = AdversaryState::ReturningHome;

        let mut events = vec![];
        for _ in 0..20 {
            events = step(&mut w, Some(Direction::Right), DT);
            if !events.is_empty() { break; }
        }
        assert_eq!(events, vec![GameEvent::PowerPelletEaten { tile: TilePos::new(2, 1) }]);
        assert_eq!(w.score, POWER_PELLET_POINTS);
        assert!((w.power_timer - (6.0 - DT)).abs() < 1e-4);
        let states: Vec<AdversaryState> = w.adversaries.iter().map(|a| a.state).collect();
        assert_eq!(
            states,
            vec![
                AdversaryState::Evading,
                AdversaryState::ReturningHome,
                AdversaryState::Evading,
                AdversaryState::Evading,
            ]
        );
    }

    #[test]
    fn power_expiry_spares_returning() {
        let mut w = world_from(ARENA);
        w.adversaries.truncate(2);
        put_player(&mut w, TilePos::new(1, 1));
        put_adversary(&mut w, 0, TilePos::new(6, 1), AdversaryState::Evading);
        put_adversary(&mut w, 1, TilePos::new(5, 1), AdversaryState::ReturningHome);
        w.power_timer = 0.05;

        assert!(step(&mut w, None, 0.02).is_empty());
        assert_eq!(w.adversaries[0].state, AdversaryState::Evading);

        let events = step(&mut w, None, 0.04);
        assert!(events.contains(&GameEvent::PowerExpired));
        assert_eq!(w.power_timer, 0.0);
        assert_eq!(w.adversaries[0].state, AdversaryState::Pursuing);
        assert_eq!(w.adversaries[1].state, AdversaryState::ReturningHome);
    }

    #[test]
    fn eating_evading_adversary() {
        let mut w = world_from(ARENA);
        w.adversaries.truncate(1);
        put_player(&mut w, TilePos::new(3, 1));
        put_adversary(&mut w, 0, TilePos::new(3, 1), AdversaryState::Evading);

        let events = step(&mut w, None, DT);
        assert_eq!(events, vec![GameEvent::AdversaryEaten { id: 0, points: ADVERSARY_POINTS }]);
        assert_eq!(w.score, ADVERSARY_POINTS);
        assert_eq!(w.adversaries[0].state, AdversaryState::ReturningHome);
        assert_eq!(w.adversaries[0].mover.direction, Direction::Stop);
        assert!(w.adversaries[0].mover.at_tile_center());

        // Touching an eaten adversary does nothing.
        let score = w.score;
        let lives = w.lives;
        step(&mut w, None, DT);
        assert_eq!((w.score, w.lives), (score, lives));
    }

    #[test]
    fn returning_adversary_revives_at_home() {
        let mut w = world_from(ARENA);
        w.adversaries.truncate(1);
        put_player(&mut w, TilePos::new(1, 1));
        put_adversary(&mut w, 0, TilePos::new(4, 2), AdversaryState::ReturningHome);
        w.adversaries[0].mover.direction = Direction::Down;

        let events = run(&mut w, None, 20);
        assert!(events.contains(&GameEvent::AdversaryRevived { id: 0 }));
        assert_eq!(w.adversaries[0].state, AdversaryState::Pursuing);
    }

    #[test]
    fn eaten_adversary_finds_home_across_the_maze() {
        let mut w = WorldState::new_round(
            builtin_level().unwrap(),
            RoundSettings::default(),
            ChaCha8Rng::seed_from_u64(0),
        );
        w.adversaries.truncate(1);
        // Several turns from home at (21, 25): east along row 21, down the
        // side passage, back west on row 23, then through the gate.
        put_adversary(&mut w, 0, TilePos::new(18, 21), AdversaryState::ReturningHome);

        let mut revived_at = None;
        for t in 0..400 {
            if step(&mut w, None, DT).contains(&GameEvent::AdversaryRevived { id: 0 }) {
                revived_at = Some(t);
                break;
            }
        }
        assert!(revived_at.is_some(), "stuck at {:?}", w.adversaries[0].tile());
        assert_eq!(w.adversaries[0].tile(), w.level.home);
        assert_eq!(w.adversaries[0].state, AdversaryState::Pursuing);
    }

    #[test]
    fn eaten_adversary_escapes_the_block_under_home() {
        let mut w = WorldState::new_round(
            builtin_level().unwrap(),
            RoundSettings::default(),
            ChaCha8Rng::seed_from_u64(0),
        );
        w.adversaries.truncate(1);
        // Directly below home with a solid wall in between: nearest-first
        // alone circles rows 27-28 forever.
        put_adversary(&mut w, 0, TilePos::new(18, 27), AdversaryState::ReturningHome);

        let events = run(&mut w, None, 1000);
        assert!(events.contains(&GameEvent::AdversaryRevived { id: 0 }));
        assert!(w.adversaries[0].trail.visits(TilePos::new(18, 27)) == 0, "trail cleared on revival");
    }

    #[test]
    fn returning_adversary_does_not_oscillate() {
        let mut w = WorldState::new_round(
            builtin_level().unwrap(),
            RoundSettings::default(),
            ChaCha8Rng::seed_from_u64(0),
        );
        w.adversaries.truncate(1);
        put_adversary(&mut w, 0, TilePos::new(18, 21), AdversaryState::ReturningHome);

        let mut reversals = 0;
        let mut last = w.adversaries[0].heading;
        for _ in 0..400 {
            step(&mut w, None, DT);
            let a = &w.adversaries[0];
            if a.state != AdversaryState::ReturningHome { break; }
            if last != Direction::Stop && a.heading == last.reverse() {
                reversals += 1;
            }
            last = a.heading;
        }
        assert_eq!(reversals, 0);
    }

    #[test]
    fn zero_power_duration_expires_at_once() {
        let mut w = world_from(&[
            "1111111111111",
            "1030000000021",
            "1111114111111",
            "1111110111111",
            "1111111111111",
        ]);
        w.settings.power_duration = 0.0;
        put_player(&mut w, TilePos::new(1, 1));

        let mut events = vec![];
        for _ in 0..20 {
            events = step(&mut w, Some(Direction::Right), DT);
            if !events.is_empty() { break; }
        }
        assert_eq!(
            events,
            vec![GameEvent::PowerPelletEaten { tile: TilePos::new(2, 1) }, GameEvent::PowerExpired]
        );
        assert_eq!(w.power_timer, 0.0);
        assert!(w.adversaries.iter().all(|a| a.state == AdversaryState::Pursuing));
    }

    #[test]
    fn caught_loses_life_and_resets() {
        let mut w = world_from(ARENA);
        w.adversaries.truncate(2);
        put_player(&mut w, TilePos::new(1, 1));
        w.player.mover = Mover::at(TilePos::new(5, 1), w.player.mover.speed);
        put_adversary(&mut w, 0, TilePos::new(5, 1), AdversaryState::Pursuing);
        put_adversary(&mut w, 1, TilePos::new(5, 1), AdversaryState::Evading);
        w.power_timer = 3.0;

        let events = step(&mut w, None, DT);
        assert_eq!(events, vec![GameEvent::PlayerCaught { by: 0, lives_left: 2 }]);
        assert_eq!(w.lives, 2);
        assert_eq!(w.score, 0, "later contacts are skipped");
        assert_eq!(w.power_timer, 0.0);
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.player.tile(), TilePos::new(1, 1));
        for a in &w.adversaries {
            assert_eq!(a.state, AdversaryState::Pursuing);
            assert_eq!(a.tile(), a.spawn);
        }
    }

    #[test]
    fn last_life_loses_round() {
        let mut w = world_from(ARENA);
        w.adversaries.truncate(1);
        w.lives = 1;
        put_player(&mut w, TilePos::new(5, 1));
        put_adversary(&mut w, 0, TilePos::new(5, 1), AdversaryState::Pursuing);

        let events = step(&mut w, None, DT);
        assert_eq!(
            events,
            vec![GameEvent::PlayerCaught { by: 0, lives_left: 0 }, GameEvent::RoundLost]
        );
        assert_eq!(w.phase, Phase::Lost);

        let tick = w.tick;
        assert!(run(&mut w, Some(Direction::Left), 5).is_empty());
        assert_eq!(w.tick, tick);
        assert_eq!(w.lives, 0);
    }

    #[test]
    fn score_and_pellets_are_monotonic() {
        let mut w = WorldState::new_round(
            builtin_level().unwrap(),
            RoundSettings::default(),
            ChaCha8Rng::seed_from_u64(3),
        );
        let mut input_rng = ChaCha8Rng::seed_from_u64(99);
        let (mut score, mut left) = (w.score, w.pellets_remaining());
        for _ in 0..5000 {
            let input = if input_rng.gen_bool(0.05) { Some(Direction::random(&mut input_rng)) } else { None };
            step(&mut w, input, DT);
            assert!(w.score >= score);
            assert!(w.pellets_remaining() <= left);
            assert!(w.power_timer >= 0.0);
            score = w.score;
            left = w.pellets_remaining();
        }
    }

    #[test]
    fn same_seed_same_round() {
        let play = |seed: u64| {
            let mut w = WorldState::new_round(
                builtin_level().unwrap(),
                RoundSettings::default(),
                ChaCha8Rng::seed_from_u64(seed),
            );
            let script = [Direction::Up, Direction::Right, Direction::Down, Direction::Left];
            let mut trace = vec![];
            for t in 0..3000usize {
                let input = if t % 90 == 0 { Some(script[(t / 90) % 4]) } else { None };
                step(&mut w, input, DT);
                trace.push((
                    w.score,
                    w.lives,
                    w.phase,
                    w.player.position(),
                    w.adversaries.iter().map(|a| (a.position(), a.state)).collect::<Vec<_>>(),
                ));
            }
            trace
        };
        assert_eq!(play(42), play(42));
    }
}
