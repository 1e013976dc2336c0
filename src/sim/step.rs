/// The step function: advances the world by one fixed frame.
///
/// Processing order:
///   1. Message timer
///   2. Intent snapshot (edges latched since the previous frame)
///   3. Controller advance (only while playing)
///   4. Out-of-world check (lethal)
///   5. Free bodies: released grenades and debris
///   6. Camera follow
///
/// The controller sees exactly one `Intents` value per frame; everything
/// the input layer reports between frames lands in the next snapshot.

use tracing::info;

use crate::config::{ControllerError, GameConfig};
use crate::domain::controller::{Controller, ControllerEvent};
use super::event::GameEvent;
use super::world::{self, Phase, WorldState};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, dt: f32) -> Vec<GameEvent> {
    if world.paused { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;

    if world.message_timer > 0 {
        world.message_timer -= 1;
        if world.message_timer == 0 { world.message.clear(); }
    }

    let intents = world.intents.snapshot();

    if world.phase == Phase::Playing {
        let out = world.controller.advance(&world.grid, &intents, dt, &mut world.entities);
        record_controller_events(world, out, &mut events);
        resolve_fall_out(world, &mut events);
    }

    let gravity = world.controller.config().gravity;
    world::step_bodies(&mut world.entities, &world.grid, gravity, dt, &mut events);

    if world.phase == Phase::Playing {
        let (cx, cy) = world.player_cell();
        let (w, h) = (world.grid.width(), world.grid.height());
        world.camera.follow(cx, cy, w, h);
    }

    events
}

/// External lethal event (debug key, hazards). No-op once exploded.
pub fn trigger_lethal(world: &mut WorldState) -> Vec<GameEvent> {
    let mut events = vec![];
    if world.phase != Phase::Playing {
        return events;
    }
    let out = world.controller.on_lethal_event(&mut world.entities);
    record_controller_events(world, out, &mut events);
    events
}

// ══════════════════════════════════════════════════════════════
// Controller events → world bookkeeping
// ══════════════════════════════════════════════════════════════

fn record_controller_events(world: &mut WorldState, out: Vec<ControllerEvent>, events: &mut Vec<GameEvent>) {
    for ev in out {
        match &ev {
            ControllerEvent::ThrowReleased { .. } => world.throws += 1,
            ControllerEvent::Exploded { .. } => {
                world.phase = Phase::Exploded;
                world.set_message("Boom! Press R to restart", 0);
            }
            _ => {}
        }
        events.push(GameEvent::Controller(ev));
    }
}

// ══════════════════════════════════════════════════════════════
// Out of world
// ══════════════════════════════════════════════════════════════

/// Leaving through the bottom of the map is lethal. Sides are walls and
/// the top is open sky, so only this edge needs checking.
fn resolve_fall_out(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let (_, world_h) = world.grid.world_size();
    if world.controller.rect().y <= world_h {
        return;
    }
    info!(y = world.controller.rect().y, "fell_out_of_world");
    events.push(GameEvent::FellOutOfWorld);
    let out = world.controller.on_lethal_event(&mut world.entities);
    record_controller_events(world, out, events);
}

// ══════════════════════════════════════════════════════════════
// Restart
// ══════════════════════════════════════════════════════════════

/// Put the player back at the level spawn: new controller, no bodies,
/// no held keys. The camera keeps its viewport size.
pub fn restart_level(world: &mut WorldState, config: &GameConfig) -> Result<(), ControllerError> {
    world.controller = Controller::new(&config.controller, &world.overrides, world.spawn)?;
    world.entities.clear();
    world.intents.release_all();
    world.intents.snapshot();
    world.phase = Phase::Playing;
    world.paused = false;
    world.tick = 0;
    world.throws = 0;
    world.set_message("Restart", 40);

    let (cx, cy) = world.player_cell();
    let (w, h) = (world.grid.width(), world.grid.height());
    world.camera.center_on(cx, cy, w, h);
    info!(level = %world.level_name, "level_restarted");
    Ok(())
}
