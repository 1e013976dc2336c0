/// WorldState: the complete snapshot of a running level.
///
/// ## Ownership
///
///   - `grid`      : static terrain, never mutated after load.
///   - `controller`: the player; sole writer of its held object.
///   - `entities`  : grenades and debris, addressed by generational
///                  handles so stale references are detected.
///
/// ## Camera / Viewport
///
/// World coordinates (pixels) and screen coordinates (terminal cells) are
/// separate. The camera works in tile cells: `(x, y)` is the top-left
/// visible cell, `(view_w, view_h)` how many cells fit. It follows the
/// player with a dead zone; maps smaller than the viewport are centered.

use glam::Vec2;
use tracing::debug;

use crate::config::ControllerOverrides;
use crate::domain::collision::{self, AxisOutcome};
use crate::domain::controller::Controller;
use crate::domain::entity::{Body, EntityFactory, EntityHandle, EntityKind, Spawn};
use crate::domain::geom::Axis;
use crate::domain::grid::TileGrid;
use crate::domain::intent::IntentLatch;
use super::event::GameEvent;

/// Speed at which a body hitting terrain produces an impact event.
const IMPACT_SPEED: f32 = 60.0;
/// Horizontal speed kept by a body each time it lands.
const LANDING_FRICTION: f32 = 0.6;

// ══════════════════════════════════════════════════════════════
// Entity table
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default)]
struct Slot {
    generation: u32,
    body: Option<Body>,
}

/// Slot map of free bodies. Destroying an entity bumps its slot's
/// generation, so handles to it stop resolving.
#[derive(Clone, Debug, Default)]
pub struct EntityTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, handle: EntityHandle) -> Option<&Body> {
        self.slots.get(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.body.as_ref())
    }

    pub fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut Body> {
        self.slots.get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.body.as_mut())
    }

    pub fn contains(&self, handle: EntityHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.body.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityHandle, &Body)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.body.as_ref().map(|b| (EntityHandle { index: i as u32, generation: s.generation }, b))
        })
    }

    pub fn handles(&self) -> Vec<EntityHandle> {
        self.iter().map(|(h, _)| h).collect()
    }

    pub fn clear(&mut self) {
        for h in self.handles() {
            self.destroy(h);
        }
    }
}

impl EntityFactory for EntityTable {
    fn create(&mut self, kind: EntityKind, spawn: Spawn) -> EntityHandle {
        let body = Body::new(kind, spawn);
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.body = Some(body);
                EntityHandle { index, generation: slot.generation }
            }
            None => {
                self.slots.push(Slot { generation: 0, body: Some(body) });
                EntityHandle { index: self.slots.len() as u32 - 1, generation: 0 }
            }
        }
    }

    fn destroy(&mut self, handle: EntityHandle) {
        if let Some(slot) = self.slots.get_mut(handle.index as usize) {
            if slot.generation == handle.generation && slot.body.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(handle.index);
            }
        }
    }

    fn body_mut(&mut self, handle: EntityHandle) -> Option<&mut Body> {
        self.get_mut(handle)
    }
}

/// Integrate every free (non-held) body for one frame: gravity, per-axis
/// move against the grid, aging. Bodies that expire or fall far below the
/// map are destroyed.
pub fn step_bodies(
    table: &mut EntityTable,
    grid: &TileGrid,
    gravity: f32,
    dt: f32,
    events: &mut Vec<GameEvent>,
) {
    let (_, world_h) = grid.world_size();
    let mut dead = vec![];

    for handle in table.handles() {
        let Some(body) = table.get_mut(handle) else { continue };
        if body.held {
            continue;
        }

        body.velocity.y += gravity * dt;

        let vx_before = body.velocity.x;
        let out_x = collision::move_axis(grid, &mut body.rect, &mut body.velocity.x, Axis::Horizontal, dt);
        let vy_before = body.velocity.y;
        let out_y = collision::move_axis(grid, &mut body.rect, &mut body.velocity.y, Axis::Vertical, dt);

        if out_y.landed() {
            body.velocity.x *= LANDING_FRICTION;
        }
        let hard_x = matches!(out_x, AxisOutcome::Blocked { .. }) && vx_before.abs() > IMPACT_SPEED;
        let hard_y = matches!(out_y, AxisOutcome::Blocked { .. }) && vy_before.abs() > IMPACT_SPEED;
        if hard_x || hard_y {
            events.push(GameEvent::BodyImpact { handle, kind: body.kind });
        }

        body.age += dt;
        if body.expired() || body.rect.y > world_h + grid.tile_size().1 * 4.0 {
            dead.push((handle, body.kind));
        }
    }

    for (handle, kind) in dead {
        debug!(?handle, ?kind, "body_removed");
        table.destroy(handle);
        events.push(GameEvent::BodyExpired { handle, kind });
    }
}

// ══════════════════════════════════════════════════════════════
// Camera
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default)]
pub struct Camera {
    /// Cell X of the top-left visible cell (can be negative for centering)
    pub x: i32,
    /// Cell Y of the top-left visible cell
    pub y: i32,
    pub view_w: usize,
    pub view_h: usize,
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow a target cell with a dead zone (inner 60% of the viewport).
    pub fn follow(&mut self, target_x: i32, target_y: i32, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        self.x = follow_axis(self.x, target_x, self.view_w, world_w);
        self.y = follow_axis(self.y, target_y, self.view_h, world_h);
    }

    /// Snap directly onto a target cell (level load / restart).
    pub fn center_on(&mut self, target_x: i32, target_y: i32, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        self.x = center_axis(target_x, self.view_w, world_w);
        self.y = center_axis(target_y, self.view_h, world_h);
    }

    /// World cell → viewport cell, `None` if not visible.
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

fn follow_axis(cam: i32, target: i32, view: usize, world: usize) -> i32 {
    if world <= view {
        return -((view as i32 - world as i32) / 2);
    }
    let margin = view as i32 / 5;
    let lo = cam + margin;
    let hi = cam + view as i32 - margin - 1;
    let moved = if target < lo {
        target - margin
    } else if target > hi {
        target - view as i32 + margin + 1
    } else {
        cam
    };
    moved.clamp(0, (world as i32 - view as i32).max(0))
}

fn center_axis(target: i32, view: usize, world: usize) -> i32 {
    if world <= view {
        return -((view as i32 - world as i32) / 2);
    }
    (target - view as i32 / 2).clamp(0, (world as i32 - view as i32).max(0))
}

// ══════════════════════════════════════════════════════════════
// World
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Playing,
    /// The player exploded; waiting for a restart.
    Exploded,
}

pub struct WorldState {
    pub grid: TileGrid,
    pub controller: Controller,
    pub entities: EntityTable,
    pub intents: IntentLatch,

    // ── Level ──
    pub current_level: usize,
    pub total_levels: usize,
    pub level_name: String,
    pub spawn: Vec2,
    pub overrides: ControllerOverrides,

    // ── Meta ──
    pub phase: Phase,
    pub paused: bool,
    pub tick: u64,
    pub throws: u32,

    // ── UI ──
    pub message: String,
    pub message_timer: u32,
    pub camera: Camera,
}

impl WorldState {
    pub fn new(grid: TileGrid, controller: Controller, level_name: String) -> Self {
        let spawn = controller.position();
        WorldState {
            grid,
            controller,
            entities: EntityTable::new(),
            intents: IntentLatch::new(),
            current_level: 0,
            total_levels: 1,
            level_name,
            spawn,
            overrides: ControllerOverrides::default(),
            phase: Phase::Playing,
            paused: false,
            tick: 0,
            throws: 0,
            message: String::new(),
            message_timer: 0,
            camera: Camera::new(),
        }
    }

    /// Player position in tile cells (box center).
    pub fn player_cell(&self) -> (i32, i32) {
        let (tw, th) = self.grid.tile_size();
        let c = self.controller.center();
        ((c.x / tw).floor() as i32, (c.y / th).floor() as i32)
    }

    pub fn set_message(&mut self, msg: &str, ticks: u32) {
        self.message = msg.to_string();
        self.message_timer = ticks;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grenade_at(table: &mut EntityTable, x: f32, y: f32, vx: f32, vy: f32) -> EntityHandle {
        table.create(
            EntityKind::Grenade,
            Spawn { position: Vec2::new(x, y), velocity: Vec2::new(vx, vy) },
        )
    }

    #[test]
    fn stale_handle_does_not_resolve_after_reuse() {
        let mut t = EntityTable::new();
        let a = grenade_at(&mut t, 0.0, 0.0, 0.0, 0.0);
        t.destroy(a);
        let b = grenade_at(&mut t, 5.0, 5.0, 0.0, 0.0);
        assert_eq!(a.index, b.index);
        assert_ne!(a.generation, b.generation);
        assert!(t.get(a).is_none());
        assert!(t.get(b).is_some());
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn double_destroy_is_harmless() {
        let mut t = EntityTable::new();
        let a = grenade_at(&mut t, 0.0, 0.0, 0.0, 0.0);
        t.destroy(a);
        t.destroy(a);
        let b = grenade_at(&mut t, 0.0, 0.0, 0.0, 0.0);
        let c = grenade_at(&mut t, 0.0, 0.0, 0.0, 0.0);
        assert_ne!(b.index, c.index);
        assert!(!t.is_empty());
    }

    #[test]
    fn free_bodies_fall_and_land() {
        let grid = TileGrid::from_rows(&["    ", "    ", "####"], 16.0, 16.0);
        let mut t = EntityTable::new();
        let h = grenade_at(&mut t, 10.0, 0.0, 0.0, 0.0);
        let mut events = vec![];
        for _ in 0..120 {
            step_bodies(&mut t, &grid, 350.0, 1.0 / 60.0, &mut events);
        }
        let b = t.get(h).unwrap();
        assert_eq!(b.rect.bottom(), 32.0);
        assert_eq!(b.velocity.y, 0.0);
    }

    #[test]
    fn held_bodies_are_not_integrated() {
        let grid = TileGrid::from_rows(&["    ", "    "], 16.0, 16.0);
        let mut t = EntityTable::new();
        let h = grenade_at(&mut t, 10.0, 0.0, 50.0, 0.0);
        t.get_mut(h).unwrap().held = true;
        let before = t.get(h).unwrap().clone();
        let mut events = vec![];
        step_bodies(&mut t, &grid, 350.0, 1.0 / 60.0, &mut events);
        assert_eq!(t.get(h).unwrap(), &before);
    }

    #[test]
    fn bodies_expire_after_lifetime() {
        let grid = TileGrid::from_rows(&["    ", "####"], 16.0, 16.0);
        let mut t = EntityTable::new();
        let h = grenade_at(&mut t, 2.0, 8.0, 0.0, 0.0);
        let mut events = vec![];
        for _ in 0..200 {
            step_bodies(&mut t, &grid, 350.0, 1.0 / 60.0, &mut events);
        }
        assert!(!t.contains(h));
        assert!(events.contains(&GameEvent::BodyExpired { handle: h, kind: EntityKind::Grenade }));
    }

    #[test]
    fn fast_landing_reports_impact() {
        let grid = TileGrid::from_rows(&["    ", "    ", "####"], 16.0, 16.0);
        let mut t = EntityTable::new();
        let h = grenade_at(&mut t, 10.0, 26.0, 0.0, 200.0);
        let mut events = vec![];
        step_bodies(&mut t, &grid, 350.0, 1.0 / 60.0, &mut events);
        assert!(events.contains(&GameEvent::BodyImpact { handle: h, kind: EntityKind::Grenade }));
    }

    #[test]
    fn camera_centers_small_maps() {
        let mut cam = Camera { view_w: 40, view_h: 20, ..Camera::new() };
        cam.follow(3, 3, 20, 10);
        assert_eq!((cam.x, cam.y), (-10, -5));
    }

    #[test]
    fn camera_scrolls_at_dead_zone_edge() {
        let mut cam = Camera { view_w: 10, view_h: 10, ..Camera::new() };
        cam.follow(9, 0, 100, 10);
        assert_eq!(cam.x, 2);
        assert_eq!(cam.world_to_view(9, 0), Some((7, 0)));
        assert_eq!(cam.world_to_view(1, 0), None);
    }
}
