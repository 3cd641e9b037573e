/// Entry point and game loop.
///
/// The simulation runs on a fixed timestep: wall-clock time accumulates
/// and is spent in whole ticks of `timing.tick_rate_ms`, so agent speeds
/// (pixels per tick) do not depend on how fast the terminal redraws.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::GameConfig;
use sim::level::load_level;
use sim::step;
use sim::world::{make_rng, Phase, RoundSettings, WorldState};
use ui::gamepad::GamepadState;
use ui::input::InputState;
use ui::renderer::Renderer;
use ui::sound::{Sfx, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);

/// Ticks spent on the READY! banner before play resumes.
const READY_TICKS: u32 = 120;

/// Upper bound on ticks simulated per frame after a stall.
const MAX_CATCH_UP: u32 = 8;

fn main() {
    let config = GameConfig::load();
    init_logging(&config);
    for w in &config.warnings {
        warn!("config: {w}");
    }

    let level = match load_level(&config) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Could not load maze: {e}");
            std::process::exit(1);
        }
    };

    let settings = RoundSettings::from_config(&config);
    let mut world = WorldState::new_round(level, settings, make_rng(config.gameplay.seed));
    world.phase = Phase::Title;

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();

    let result = game_loop(&mut world, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    info!(score = world.score, "exit");
    println!();
    println!("Thanks for playing Maze Chase!");
    println!("Final Score: {}", world.score);
}

/// Log to a file; the terminal belongs to the renderer.
/// `MAZECHASE_LOG` overrides the configured level.
fn init_logging(config: &GameConfig) {
    let filter = EnvFilter::try_from_env("MAZECHASE_LOG")
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match File::create(&config.log_file) {
        Ok(file) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false)
                .try_init();
        }
        Err(e) => eprintln!("Logging disabled ({}): {e}", config.log_file.display()),
    }
}

// ── Key Constants ──

const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];
const KEYS_PAUSE: &[KeyCode] = &[KeyCode::Char('p'), KeyCode::Char('P'), KeyCode::F(1)];
const KEYS_BACK: &[KeyCode] = &[KeyCode::Esc];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];

/// Front-end state the simulation does not own.
struct Session {
    ready_ticks: u32,
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    kb.honor_release = renderer.keyboard_enhanced();
    info!(release_events = kb.honor_release, "keyboard ready");
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);

    let tick_rate = Duration::from_millis(config.timing.tick_rate_ms);
    let dt = tick_rate.as_secs_f32();
    let mut session = Session { ready_ticks: 0 };
    let mut last = Instant::now();
    let mut acc = Duration::ZERO;

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(world, &mut session, sound, &kb, &gp) {
            break;
        }

        let now = Instant::now();
        acc += now - last;
        last = now;
        if acc > tick_rate * MAX_CATCH_UP {
            acc = tick_rate * MAX_CATCH_UP;
        }

        // Steering is sampled once per frame and applied to the first tick.
        let mut input = kb.movement().or_else(|| gp.movement());

        while acc >= tick_rate {
            acc -= tick_rate;
            if world.paused {
                continue;
            }
            match world.phase {
                Phase::Playing => {
                    let events = step::step(world, input.take(), dt);
                    if let Some(s) = sound {
                        s.play_events(&events);
                    }
                }
                Phase::Ready => {
                    session.ready_ticks = session.ready_ticks.saturating_sub(1);
                    if session.ready_ticks == 0 {
                        world.phase = Phase::Playing;
                    }
                }
                Phase::Title | Phase::Won | Phase::Lost => {}
            }
        }

        renderer.set_pad_connected(gp.connected);
        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// Fresh round and READY! countdown.
fn begin_round(world: &mut WorldState, session: &mut Session, sound: Option<&SoundEngine>) {
    world.restart_round();
    world.phase = Phase::Ready;
    session.ready_ticks = READY_TICKS;
    if let Some(s) = sound {
        s.play(Sfx::Ready);
    }
}

fn return_to_title(world: &mut WorldState) {
    world.paused = false;
    world.phase = Phase::Title;
    info!("back to title");
}

/// Returns true when the player asked to quit.
fn handle_meta(
    world: &mut WorldState,
    session: &mut Session,
    sound: Option<&SoundEngine>,
    kb: &InputState,
    gp: &GamepadState,
) -> bool {
    let confirm = kb.any_pressed(KEYS_CONFIRM) || gp.confirm_pressed();
    let back = kb.any_pressed(KEYS_BACK) || gp.cancel_pressed();
    let pause = kb.any_pressed(KEYS_PAUSE) || gp.pause_pressed();

    if world.paused {
        if pause {
            world.paused = false;
            info!("resumed");
        } else if back {
            return_to_title(world);
        }
        return false;
    }

    match world.phase {
        Phase::Title => {
            if confirm {
                begin_round(world, session, sound);
            } else if back || kb.any_pressed(KEYS_QUIT) {
                return true;
            }
        }
        Phase::Ready | Phase::Playing => {
            if pause {
                world.paused = true;
                info!(tick = world.tick, "paused");
            } else if back {
                return_to_title(world);
            }
        }
        Phase::Won | Phase::Lost => {
            if confirm {
                begin_round(world, session, sound);
            } else if back {
                return_to_title(world);
            }
        }
    }

    false
}
