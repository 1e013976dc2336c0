/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
///
/// Controller tuning lives here too: `ControllerConfig` is built once per
/// entity (defaults + per-instance `ControllerOverrides`) and never
/// re-derived during a frame.

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub controller: ControllerConfig,
    pub frame: FrameConfig,
    pub gamepad: GamepadConfig,
    pub log: LogConfig,
    pub levels_dir: PathBuf,
}

/// Per-entity movement tuning. All rates are in world units per second
/// (or per second squared), angles in radians.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub gravity: f32,
    pub accel: f32,
    pub dx_max: f32,
    /// Deceleration while grounded with no crouch.
    pub passive_decel: f32,
    pub crouch_decel: f32,
    /// Strongest rate; also used when both directions are held.
    pub midair_decel: f32,
    /// Vertical speed assigned on jump (negative = up).
    pub jump_dy: f32,
    /// `|dy|` above this clears the grounded flag.
    pub airborne_threshold: f32,
    pub throw_strength: f32,
    pub throw_pitch_speed: f32,
    pub grenade_dampening: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Debug)]
pub struct FrameConfig {
    pub tick_rate_ms: u64,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub jump: Vec<String>,
    pub throw: Vec<String>,
    pub interact: Vec<String>,
    pub restart: Vec<String>,
    pub quit: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct LogConfig {
    pub filter: String,
    pub file: PathBuf,
}

/// Per-instance overrides; each unset field keeps the config default.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ControllerOverrides {
    pub gravity: Option<f32>,
    pub accel: Option<f32>,
    pub dx_max: Option<f32>,
    pub passive_decel: Option<f32>,
    pub crouch_decel: Option<f32>,
    pub midair_decel: Option<f32>,
    pub jump_dy: Option<f32>,
    pub throw_strength: Option<f32>,
    pub throw_pitch_speed: Option<f32>,
    pub grenade_dampening: Option<f32>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ControllerError {
    #[error("controller box must have positive finite size, got {width}x{height}")]
    InvalidSize { width: f32, height: f32 },
    #[error("controller setting `{field}` must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },
    #[error("unknown controller override `{0}`")]
    UnknownOverride(String),
}

// ── Defaults ──

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            gravity: 350.0,
            accel: 1200.0,
            dx_max: 120.0,
            passive_decel: 400.0,
            crouch_decel: 600.0,
            midair_decel: 700.0,
            jump_dy: -200.0,
            airborne_threshold: 20.0,
            throw_strength: 220.0,
            throw_pitch_speed: 6.0,
            grenade_dampening: 2.0,
            width: 14.0,
            height: 32.0,
        }
    }
}

impl ControllerConfig {
    /// Merge per-instance overrides onto this config.
    pub fn with_overrides(&self, o: &ControllerOverrides) -> ControllerConfig {
        ControllerConfig {
            gravity: o.gravity.unwrap_or(self.gravity),
            accel: o.accel.unwrap_or(self.accel),
            dx_max: o.dx_max.unwrap_or(self.dx_max),
            passive_decel: o.passive_decel.unwrap_or(self.passive_decel),
            crouch_decel: o.crouch_decel.unwrap_or(self.crouch_decel),
            midair_decel: o.midair_decel.unwrap_or(self.midair_decel),
            jump_dy: o.jump_dy.unwrap_or(self.jump_dy),
            throw_strength: o.throw_strength.unwrap_or(self.throw_strength),
            throw_pitch_speed: o.throw_pitch_speed.unwrap_or(self.throw_pitch_speed),
            grenade_dampening: o.grenade_dampening.unwrap_or(self.grenade_dampening),
            ..self.clone()
        }
    }

    /// Reject configurations that would make the integrator meaningless.
    pub fn validate(&self) -> Result<(), ControllerError> {
        let size_ok = |v: f32| v.is_finite() && v > 0.0;
        if !size_ok(self.width) || !size_ok(self.height) {
            return Err(ControllerError::InvalidSize { width: self.width, height: self.height });
        }
        for (field, value) in [
            ("dx_max", self.dx_max),
            ("throw_pitch_speed", self.throw_pitch_speed),
            ("grenade_dampening", self.grenade_dampening),
        ] {
            if !(value > 0.0) {
                return Err(ControllerError::NonPositive { field, value });
            }
        }
        Ok(())
    }
}

impl ControllerOverrides {
    /// Set one override by name, as written in level metadata (`gravity=300`).
    pub fn set(&mut self, key: &str, value: f32) -> Result<(), ControllerError> {
        let slot = match key {
            "gravity" => &mut self.gravity,
            "accel" => &mut self.accel,
            "dx_max" => &mut self.dx_max,
            "passive_decel" => &mut self.passive_decel,
            "crouch_decel" => &mut self.crouch_decel,
            "midair_decel" => &mut self.midair_decel,
            "jump_dy" => &mut self.jump_dy,
            "throw_strength" => &mut self.throw_strength,
            "throw_pitch_speed" => &mut self.throw_pitch_speed,
            "grenade_dampening" => &mut self.grenade_dampening,
            other => return Err(ControllerError::UnknownOverride(other.to_string())),
        };
        *slot = Some(value);
        Ok(())
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    controller: ControllerConfig,
    #[serde(default)]
    frame: TomlFrame,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    log: TomlLog,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlFrame {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_jump")]
    jump: Vec<String>,
    #[serde(default = "default_throw")]
    throw: Vec<String>,
    #[serde(default = "default_interact")]
    interact: Vec<String>,
    #[serde(default = "default_restart")]
    restart: Vec<String>,
    #[serde(default = "default_quit")]
    quit: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlLog {
    #[serde(default = "default_log_filter")]
    filter: String,
    #[serde(default = "default_log_file")]
    file: String,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
}

fn default_tick_rate() -> u64 { 16 }  // ~60 Hz

fn default_jump() -> Vec<String> { vec!["A".into()] }
fn default_throw() -> Vec<String> { vec!["X".into(), "R1".into()] }
fn default_interact() -> Vec<String> { vec!["Y".into()] }
fn default_restart() -> Vec<String> { vec!["Start".into()] }
fn default_quit() -> Vec<String> { vec!["Select".into()] }
fn default_log_filter() -> String { "info".into() }
fn default_log_file() -> String { "grenadier.log".into() }
fn default_levels_dir() -> String { "levels".into() }

impl Default for TomlFrame {
    fn default() -> Self {
        TomlFrame { tick_rate_ms: default_tick_rate() }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            jump: default_jump(),
            throw: default_throw(),
            interact: default_interact(),
            restart: default_restart(),
            quit: default_quit(),
        }
    }
}

impl Default for TomlLog {
    fn default() -> Self {
        TomlLog { filter: default_log_filter(), file: default_log_file() }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral { levels_dir: default_levels_dir() }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::from_toml(toml_cfg, &search_dirs)
    }

    /// Parse config text directly (no filesystem search for `config.toml`).
    pub fn parse_str(text: &str) -> Result<Self, toml::de::Error> {
        let toml_cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(Self::from_toml(toml_cfg, &[]))
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let levels_dir_str = &toml_cfg.general.levels_dir;
        let levels_dir = if PathBuf::from(levels_dir_str).is_absolute() {
            PathBuf::from(levels_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(levels_dir_str))
        };

        GameConfig {
            controller: toml_cfg.controller,
            frame: FrameConfig { tick_rate_ms: toml_cfg.frame.tick_rate_ms.max(1) },
            gamepad: GamepadConfig {
                jump: toml_cfg.gamepad.jump,
                throw: toml_cfg.gamepad.throw,
                interact: toml_cfg.gamepad.interact,
                restart: toml_cfg.gamepad.restart,
                quit: toml_cfg.gamepad.quit,
            },
            log: LogConfig {
                filter: toml_cfg.log.filter,
                file: PathBuf::from(toml_cfg.log.file),
            },
            levels_dir,
        }
    }

    /// Fixed simulation step in seconds.
    pub fn dt(&self) -> f32 {
        self.frame.tick_rate_ms as f32 / 1000.0
    }
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
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "config_parse_failed; using defaults");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "config_read_failed");
                }
            }
        }
    }
    TomlConfig::default()
}
