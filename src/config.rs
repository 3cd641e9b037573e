/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
///
/// Logging is not up yet when this runs, so problems are collected in
/// `GameConfig::warnings` and emitted by `main` after the subscriber
/// is installed.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub timing: TimingConfig,
    pub gameplay: GameplayConfig,
    pub speed: SpeedConfig,
    pub behavior: BehaviorConfig,
    pub gamepad: GamepadConfig,
    /// Custom maze text file, resolved against the search dirs.
    pub maze_file: Option<PathBuf>,
    pub log_file: PathBuf,
    pub log_level: String,
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub tick_rate_ms: u64,
}

#[derive(Clone, Debug)]
pub struct GameplayConfig {
    pub lives: u32,
    pub power_duration_secs: f32,
    /// Fixed RNG seed for reproducible rounds. None = from entropy.
    pub seed: Option<u64>,
}

/// Movement per tick, in sub-tile units (tile = 20).
#[derive(Clone, Debug)]
pub struct SpeedConfig {
    pub player: f32,
    pub adversary: f32,
    pub evading: f32,
    pub returning: f32,
}

#[derive(Clone, Debug)]
pub struct BehaviorConfig {
    pub pursue_jitter: f64,
    pub evade_jitter: f64,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub pause: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    gameplay: TomlGameplay,
    #[serde(default)]
    speed: TomlSpeed,
    #[serde(default)]
    behavior: TomlBehavior,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlGameplay {
    #[serde(default = "default_lives")]
    lives: u32,
    #[serde(default = "default_power_duration")]
    power_duration_secs: f32,
    #[serde(default)]
    seed: Option<u64>,
}

#[derive(Deserialize, Debug)]
struct TomlSpeed {
    #[serde(default = "default_player_speed")]
    player: f32,
    #[serde(default = "default_adversary_speed")]
    adversary: f32,
    #[serde(default = "default_evading_speed")]
    evading: f32,
    #[serde(default = "default_returning_speed")]
    returning: f32,
}

#[derive(Deserialize, Debug)]
struct TomlBehavior {
    #[serde(default = "default_pursue_jitter")]
    pursue_jitter: f64,
    #[serde(default = "default_evade_jitter")]
    evade_jitter: f64,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
    #[serde(default = "default_pause")]
    pause: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default)]
    maze_file: Option<String>,
    #[serde(default = "default_log_file")]
    log_file: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 } // ~60 ticks/s
fn default_lives() -> u32 { 3 }
fn default_power_duration() -> f32 { 6.0 }
fn default_player_speed() -> f32 { 3.0 }
fn default_adversary_speed() -> f32 { 2.6 }
fn default_evading_speed() -> f32 { 2.0 }
fn default_returning_speed() -> f32 { 3.2 }
fn default_pursue_jitter() -> f64 { 0.15 }
fn default_evade_jitter() -> f64 { 0.30 }

fn default_confirm() -> Vec<String> { vec!["Start".into(), "A".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }
fn default_pause() -> Vec<String> { vec!["B".into()] }
fn default_log_file() -> String { "mazechase.log".into() }
fn default_log_level() -> String { "info".into() }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming { tick_rate_ms: default_tick_rate() }
    }
}

impl Default for TomlGameplay {
    fn default() -> Self {
        TomlGameplay {
            lives: default_lives(),
            power_duration_secs: default_power_duration(),
            seed: None,
        }
    }
}

impl Default for TomlSpeed {
    fn default() -> Self {
        TomlSpeed {
            player: default_player_speed(),
            adversary: default_adversary_speed(),
            evading: default_evading_speed(),
            returning: default_returning_speed(),
        }
    }
}

impl Default for TomlBehavior {
    fn default() -> Self {
        TomlBehavior {
            pursue_jitter: default_pursue_jitter(),
            evade_jitter: default_evade_jitter(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            confirm: default_confirm(),
            cancel: default_cancel(),
            pause: default_pause(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            maze_file: None,
            log_file: default_log_file(),
            log_level: default_log_level(),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        let mut warnings = vec![];
        GameConfig::from_toml(TomlConfig::default(), &[], &mut warnings)
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let mut warnings = vec![];
        let toml_cfg = load_toml(&search_dirs, &mut warnings);
        GameConfig::from_toml(toml_cfg, &search_dirs, &mut warnings)
    }

    /// Parse config text directly. Relative paths stay relative to CWD.
    #[cfg(test)]
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let toml_cfg = toml::from_str::<TomlConfig>(text)?;
        let mut warnings = vec![];
        Ok(GameConfig::from_toml(toml_cfg, &[], &mut warnings))
    }

    fn from_toml(cfg: TomlConfig, search_dirs: &[PathBuf], warnings: &mut Vec<String>) -> Self {
        let mut tick_rate_ms = cfg.timing.tick_rate_ms;
        if tick_rate_ms == 0 {
            warnings.push("timing.tick_rate_ms must be at least 1; using default".into());
            tick_rate_ms = default_tick_rate();
        }

        let mut lives = cfg.gameplay.lives;
        if lives == 0 {
            warnings.push("gameplay.lives must be at least 1; using default".into());
            lives = default_lives();
        }

        let mut power_duration_secs = cfg.gameplay.power_duration_secs;
        if !power_duration_secs.is_finite() || power_duration_secs <= 0.0 {
            warnings.push(format!("gameplay.power_duration_secs {power_duration_secs} is invalid; using default"));
            power_duration_secs = default_power_duration();
        }

        let speed = SpeedConfig {
            player: checked_speed("player", cfg.speed.player, default_player_speed(), warnings),
            adversary: checked_speed("adversary", cfg.speed.adversary, default_adversary_speed(), warnings),
            evading: checked_speed("evading", cfg.speed.evading, default_evading_speed(), warnings),
            returning: checked_speed("returning", cfg.speed.returning, default_returning_speed(), warnings),
        };

        let behavior = BehaviorConfig {
            pursue_jitter: checked_chance("pursue_jitter", cfg.behavior.pursue_jitter, warnings),
            evade_jitter: checked_chance("evade_jitter", cfg.behavior.evade_jitter, warnings),
        };

        let maze_file = cfg.general.maze_file.map(|name| resolve_path(&name, search_dirs));

        GameConfig {
            timing: TimingConfig { tick_rate_ms },
            gameplay: GameplayConfig {
                lives,
                power_duration_secs,
                seed: cfg.gameplay.seed,
            },
            speed,
            behavior,
            gamepad: GamepadConfig {
                confirm: cfg.gamepad.confirm,
                cancel: cfg.gamepad.cancel,
                pause: cfg.gamepad.pause,
            },
            maze_file,
            log_file: PathBuf::from(cfg.general.log_file),
            log_level: cfg.general.log_level,
            warnings: std::mem::take(warnings),
        }
    }
}

/// Speeds at or above a tile per tick would skip tile centers.
fn checked_speed(name: &str, value: f32, fallback: f32, warnings: &mut Vec<String>) -> f32 {
    if value.is_finite() && value > 0.0 && value < 20.0 {
        value
    } else {
        warnings.push(format!("speed.{name} {value} out of range (0, 20); using {fallback}"));
        fallback
    }
}

fn checked_chance(name: &str, value: f64, warnings: &mut Vec<String>) -> f64 {
    if (0.0..=1.0).contains(&value) {
        value
    } else {
        let clamped = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        warnings.push(format!("behavior.{name} {value} clamped to {clamped}"));
        clamped
    }
}

/// Absolute paths pass through; relative ones are looked up in the
/// search dirs and default to CWD-relative.
fn resolve_path(name: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let path = PathBuf::from(name);
    if path.is_absolute() {
        return path;
    }
    search_dirs
        .iter()
        .map(|d| d.join(name))
        .find(|p| p.is_file())
        .unwrap_or(path)
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf], warnings: &mut Vec<String>) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        warnings.push(format!("{} parse error, using defaults: {e}", path.display()));
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    warnings.push(format!("could not read {}: {e}", path.display()));
                }
            }
        }
    }
    TomlConfig::default()
}
