/// Level loader.
///
/// ## Sources (priority order):
///   1. `levels/` directory (individual `.txt` files, sorted by filename)
///   2. Built-in embedded levels
///
/// ## Level format (`.txt`):
///   Line 1: `# Level Name`
///   Optional: `! key=value key=value ...` (controller overrides)
///   Lines: map rows
///
/// ## Tile legend:
///   '#' = Ground (solid)         '=' = Brick (solid)
///   '|' = Vine (decoration)      'P' = Player spawn
///   ' ' = Empty
///
/// The player box is centered on the spawn cell horizontally and stands on
/// the bottom edge of that cell.

use std::path::{Path, PathBuf};

use glam::Vec2;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ControllerConfig, ControllerError, ControllerOverrides, GameConfig};
use crate::domain::controller::Controller;
use crate::domain::grid::TileGrid;
use crate::sim::world::WorldState;

/// World units per tile cell.
pub const TILE_SIZE: f32 = 16.0;

/// Runtime level data (owned strings, loaded from file or embedded).
#[derive(Clone, Debug)]
pub struct LevelDef {
    pub name: String,
    pub rows: Vec<String>,
    pub overrides: ControllerOverrides,
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level has no map rows")]
    Empty,
    #[error("level `{0}` has no player spawn (P)")]
    MissingSpawn(String),
    #[error("bad override `{0}`, expected key=value")]
    BadOverride(String),
    #[error(transparent)]
    Controller(#[from] ControllerError),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// All playable levels: the `levels/` directory if it holds any, the
/// embedded set otherwise.
pub fn available_levels(config: &GameConfig) -> Vec<LevelDef> {
    let dir = &config.levels_dir;
    if dir.is_dir() {
        let mut levels = load_from_directory(dir);
        if !levels.is_empty() {
            levels.sort_by(|a, b| a.0.cmp(&b.0));
            return levels.into_iter().map(|(_, def)| def).collect();
        }
    }
    embedded_levels()
}

/// Build a fresh world for `levels[level_idx]`.
pub fn load_level(levels: &[LevelDef], level_idx: usize, config: &GameConfig) -> Result<WorldState, LevelError> {
    let def = levels.get(level_idx).ok_or(LevelError::Empty)?;
    let grid = TileGrid::from_rows(
        &def.rows.iter().map(String::as_str).collect::<Vec<_>>(),
        TILE_SIZE,
        TILE_SIZE,
    );

    let cell = spawn_cell(def)?;
    let spawn = spawn_position(cell, &config.controller.with_overrides(&def.overrides));
    let controller = Controller::new(&config.controller, &def.overrides, spawn)?;

    let mut world = WorldState::new(grid, controller, def.name.clone());
    world.overrides = def.overrides.clone();
    world.current_level = level_idx;
    world.total_levels = levels.len();
    world.set_message(&def.name, 80);

    let (cx, cy) = world.player_cell();
    let (w, h) = (world.grid.width(), world.grid.height());
    world.camera.center_on(cx, cy, w, h);

    info!(level = %def.name, index = level_idx, width = w, height = h, "level_loaded");
    Ok(world)
}

// ══════════════════════════════════════════════════════════════
// Single-level parsing
// ══════════════════════════════════════════════════════════════

/// Parse a single level from text content.
pub fn parse_level(content: &str) -> Result<LevelDef, LevelError> {
    let mut name = String::new();
    let mut rows = vec![];
    let mut overrides = ControllerOverrides::default();

    for line in content.lines() {
        if line.starts_with('#') && name.is_empty() && is_name_line(line) {
            name = line[1..].trim().to_string();
        } else if let Some(rest) = line.strip_prefix("! ") {
            for pair in rest.split_whitespace() {
                let (key, value) = pair.split_once('=')
                    .ok_or_else(|| LevelError::BadOverride(pair.to_string()))?;
                let value: f32 = value.parse()
                    .map_err(|_| LevelError::BadOverride(pair.to_string()))?;
                overrides.set(key, value)?;
            }
        } else {
            rows.push(line.to_string());
        }
    }

    while rows.last().map_or(false, |r| r.trim().is_empty()) {
        rows.pop();
    }
    if rows.is_empty() {
        return Err(LevelError::Empty);
    }

    let max_width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    for row in &mut rows {
        let len = row.chars().count();
        if len < max_width {
            row.extend(std::iter::repeat(' ').take(max_width - len));
        }
    }

    if name.is_empty() {
        name = "Unnamed Level".to_string();
    }

    Ok(LevelDef { name, rows, overrides })
}

/// Distinguish `# Level Name` from `########` (level data).
/// A name line starts with `#` and contains at least one letter.
fn is_name_line(line: &str) -> bool {
    line[1..].chars().any(|c| c.is_alphabetic())
}

/// Cell of the first `P` marker.
pub fn spawn_cell(def: &LevelDef) -> Result<(usize, usize), LevelError> {
    def.rows.iter().enumerate()
        .find_map(|(y, row)| row.chars().position(|c| c == 'P').map(|x| (x, y)))
        .ok_or_else(|| LevelError::MissingSpawn(def.name.clone()))
}

/// Top-left of a controller box standing in `cell`.
fn spawn_position((x, y): (usize, usize), cfg: &ControllerConfig) -> Vec2 {
    Vec2::new(
        x as f32 * TILE_SIZE + (TILE_SIZE - cfg.width) / 2.0,
        (y + 1) as f32 * TILE_SIZE - cfg.height,
    )
}

// ══════════════════════════════════════════════════════════════
// Directory loading (individual .txt files)
// ══════════════════════════════════════════════════════════════

pub fn read_level_file(path: &Path) -> Result<LevelDef, LevelError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| LevelError::Io { path: path.to_path_buf(), source })?;
    parse_level(&content)
}

fn load_from_directory(dir: &Path) -> Vec<(String, LevelDef)> {
    let mut results = vec![];

    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "levels_dir_unreadable");
            return results;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map_or(false, |e| e == "txt") {
            match read_level_file(&path) {
                Ok(def) => {
                    let filename = path.file_name()
                        .unwrap_or_default()
                        .to_string_lossy()
                        .to_string();
                    results.push((filename, def));
                }
                Err(e) => warn!(path = %path.display(), error = %e, "level_skipped"),
            }
        }
    }

    results
}

// ══════════════════════════════════════════════════════════════
// Embedded fallback levels
// ══════════════════════════════════════════════════════════════

pub fn embedded_levels() -> Vec<LevelDef> {
    vec![
        make_embedded("Training Yard", &[
            "                                        ",
            "                                        ",
            "                      ====              ",
            "                                        ",
            "             ====             ===       ",
            "                                        ",
            "       ===          |                   ",
            "                    |        ====       ",
            "   P                |                   ",
            "               ###  |                   ",
            "#########################    ###########",
            "#########################    ###########",
        ]),
        make_embedded("Quarry Steps", &[
            "                                        ",
            "   ==                                   ",
            "                                  ===   ",
            "        ==                              ",
            "                      ==    ==          ",
            "             ==                         ",
            "                  ==                    ",
            "  P                           |         ",
            "######                        |    #####",
            "######     ###      ###       |    #####",
            "######     ###      ###     #########   ",
            "######################################  ",
        ]),
        make_embedded("Low Ceiling", &[
            "========================================",
            "                                        ",
            "                                        ",
            "  P        ====          ====           ",
            "#####                            =======",
            "#####      |           |                ",
            "#####      |    ===    |       ===      ",
            "###########|###########|################",
        ]),
    ]
}

fn make_embedded(name: &str, map: &[&str]) -> LevelDef {
    LevelDef {
        name: name.to_string(),
        rows: map.iter().map(|s| s.to_string()).collect(),
        overrides: ControllerOverrides::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GameConfig {
        GameConfig::parse_str("").unwrap()
    }

    #[test]
    fn parses_name_overrides_and_rows() {
        let def = parse_level("# Test Level\n! gravity=200 jump_dy=-150\n P  \n####\n").unwrap();
        assert_eq!(def.name, "Test Level");
        assert_eq!(def.rows, vec![" P  ".to_string(), "####".to_string()]);
        assert_eq!(def.overrides.gravity, Some(200.0));
        assert_eq!(def.overrides.jump_dy, Some(-150.0));
        assert_eq!(def.overrides.accel, None);
    }

    #[test]
    fn ground_row_is_not_a_name() {
        let def = parse_level("####\n P  \n####\n").unwrap();
        assert_eq!(def.name, "Unnamed Level");
        assert_eq!(def.rows.len(), 3);
    }

    #[test]
    fn ragged_rows_are_padded_and_trailing_blanks_dropped() {
        let def = parse_level("# R\nP\n#####\n\n   \n").unwrap();
        assert_eq!(def.rows, vec!["P    ".to_string(), "#####".to_string()]);
    }

    #[test]
    fn bad_override_lines_are_errors() {
        assert!(matches!(parse_level("# L\n! gravity\nP\n"), Err(LevelError::BadOverride(_))));
        assert!(matches!(parse_level("# L\n! gravity=fast\nP\n"), Err(LevelError::BadOverride(_))));
        assert!(matches!(
            parse_level("# L\n! warp=2\nP\n"),
            Err(LevelError::Controller(ControllerError::UnknownOverride(_)))
        ));
    }

    #[test]
    fn empty_level_is_an_error() {
        assert!(matches!(parse_level("# Nothing\n\n"), Err(LevelError::Empty)));
    }

    #[test]
    fn missing_spawn_is_reported() {
        let def = parse_level("# No Player\n    \n####\n").unwrap();
        let err = load_level(&[def], 0, &config()).err().unwrap();
        assert!(matches!(err, LevelError::MissingSpawn(name) if name == "No Player"));
    }

    #[test]
    fn player_stands_on_spawn_cell_floor() {
        let def = parse_level("# S\n    \n  P \n####\n").unwrap();
        let world = load_level(&[def], 0, &config()).unwrap();
        let rect = world.controller.rect();
        assert_eq!(rect.bottom(), 32.0);
        assert_eq!(rect.center().x, 2.0 * TILE_SIZE + TILE_SIZE / 2.0);
        assert_eq!(world.spawn, world.controller.position());
    }

    #[test]
    fn level_overrides_reach_the_controller() {
        let def = parse_level("# S\n! dx_max=50\n P \n###\n").unwrap();
        let world = load_level(&[def], 0, &config()).unwrap();
        assert_eq!(world.controller.config().dx_max, 50.0);
        assert_eq!(world.overrides.dx_max, Some(50.0));
    }

    #[test]
    fn embedded_levels_all_load() {
        let levels = embedded_levels();
        for i in 0..levels.len() {
            let world = load_level(&levels, i, &config()).unwrap();
            assert_eq!(world.total_levels, levels.len());
            assert_eq!(world.grid.width(), 40);
        }
    }
}
