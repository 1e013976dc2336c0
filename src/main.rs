/// Entry point and game loop for the terminal playground.

mod ui;

use std::error::Error;
use std::fs::OpenOptions;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use grenadier::config::{GameConfig, LogConfig};
use grenadier::sim::event::GameEvent;
use grenadier::sim::level::{available_levels, load_level, LevelDef};
use grenadier::sim::step;
use grenadier::sim::world::WorldState;
use ui::gamepad::GamepadState;
use ui::input::InputState;
use ui::renderer::Renderer;
use ui::sound::{sfx_for, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    let config = GameConfig::load();

    if let Err(e) = init_logging(&config.log) {
        eprintln!("Logging disabled: {e}");
    }

    let levels = available_levels(&config);
    let mut world = match load_level(&levels, 0, &config) {
        Ok(w) => w,
        Err(e) => {
            error!(error = %e, "startup_failed");
            eprintln!("Cannot start: {e}");
            return;
        }
    };

    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();

    let result = game_loop(&mut world, &levels, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        error!(error = %e, "game_loop_failed");
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Grenadier!");
    println!("Grenades thrown on the last level: {}", world.throws);
}

/// Log to a file: the terminal belongs to the renderer. `RUST_LOG` wins
/// over the configured filter.
fn init_logging(cfg: &LogConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    let file = OpenOptions::new().create(true).append(true).open(&cfg.file)?;
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.filter))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()?;
    Ok(())
}

fn game_loop(
    world: &mut WorldState,
    levels: &[LevelDef],
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn Error>> {
    let mut kb = InputState::new();
    kb.honor_release = renderer.keyboard_enhanced;
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);

    let tick_rate = Duration::from_millis(config.frame.tick_rate_ms);
    let dt = config.dt();
    let mut last_tick = Instant::now();

    info!(
        tick_rate_ms = config.frame.tick_rate_ms,
        levels = levels.len(),
        gamepad = gp.connected,
        key_release = kb.honor_release,
        "game_loop_started"
    );

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }
        match handle_meta(world, levels, sound, &kb, &gp, config) {
            Meta::Quit => break,
            Meta::Redraw => renderer.invalidate(),
            Meta::Continue => {}
        }

        if !world.paused {
            kb.feed_latch(&gp, &mut world.intents);
        }

        if last_tick.elapsed() >= tick_rate {
            let events = step::step(world, dt);
            process_sound_events(sound, &events);
            last_tick = Instant::now();
        }

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let sfx = match sound {
        Some(s) => s,
        None => return,
    };
    for effect in events.iter().filter_map(sfx_for) {
        sfx.play(effect);
    }
}

// ── Key Constants ──

const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_LETHAL: &[KeyCode] = &[KeyCode::Char('k'), KeyCode::Char('K')];
const KEYS_NEXT: &[KeyCode] = &[KeyCode::Char('n'), KeyCode::Char('N')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q'), KeyCode::Esc];

enum Meta {
    Continue,
    Redraw,
    Quit,
}

fn handle_meta(
    world: &mut WorldState,
    levels: &[LevelDef],
    sound: Option<&SoundEngine>,
    kb: &InputState,
    gp: &GamepadState,
    config: &GameConfig,
) -> Meta {
    if kb.any_pressed(KEYS_QUIT) || gp.quit_pressed() {
        return Meta::Quit;
    }

    // F1: Pause / Resume
    if kb.any_pressed(&[KeyCode::F(1)]) {
        world.paused = !world.paused;
        if world.paused {
            world.intents.release_all();
            world.set_message("PAUSED  [F1] Resume", 0);
        } else {
            world.message.clear();
            world.message_timer = 0;
        }
        return Meta::Continue;
    }

    // Restart also resumes a paused game.
    if kb.any_pressed(KEYS_RESTART) || gp.restart_pressed() {
        if let Err(e) = step::restart_level(world, config) {
            warn!(error = %e, "restart_failed");
            world.set_message("Restart failed", 40);
        }
        return Meta::Redraw;
    }

    if world.paused {
        return Meta::Continue;
    }

    if kb.any_pressed(KEYS_LETHAL) {
        let events = step::trigger_lethal(world);
        process_sound_events(sound, &events);
        return Meta::Continue;
    }

    if kb.any_pressed(KEYS_NEXT) {
        let next = (world.current_level + 1) % levels.len().max(1);
        match load_level(levels, next, config) {
            Ok(w) => *world = w,
            Err(e) => {
                warn!(index = next, error = %e, "level_load_failed");
                world.set_message("Level failed to load", 60);
            }
        }
        return Meta::Redraw;
    }

    Meta::Continue
}
