/// Character controller: turns an `Intents` snapshot into motion against
/// the tile grid, once per frame.
///
/// ## Frame order
///
///   1. Horizontal intent → acceleration, facing, walking
///   2. Deceleration toward zero (rate by priority), clamp to `dx_max`
///   3. Gravity
///   4. Held object follows the controller
///   5. Move + resolve X, then move + resolve Y
///   6. Grounded / airborne update, jump and jump-cut
///   7. Aim pitch animation, throw start / release
///   8. Held object follows the controller (post-move)
///   9. Animation selection
///
/// ## Grounded / airborne
///
///   Airborne → Grounded : downward vertical collision
///   Grounded → Airborne : jump press, or `|dy|` above the threshold
///
/// Jump presses while airborne do nothing. Releasing jump while still
/// rising halves the upward speed, once, at the release frame.
///
/// Destruction (`on_lethal_event`) is terminal: later frames are no-ops.

use glam::Vec2;
use tracing::{debug, info};

use crate::config::{ControllerConfig, ControllerError, ControllerOverrides};

use super::aim::{self, AimState};
use super::collision::{self, AxisOutcome};
use super::entity::{BodyPart, EntityFactory, EntityHandle, EntityKind, Facing, Spawn};
use super::geom::{Axis, Rect};
use super::grid::TileGrid;
use super::intent::Intents;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GroundState {
    Grounded,
    Airborne,
}

/// Animation selector consumed by rendering.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Animation {
    Idle,
    Walking,
    Jumping,
}

/// What rendering reads after a frame.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Pose {
    pub x: i32,
    pub y: i32,
    pub facing: Facing,
    pub animation: Animation,
    pub throw_angle: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ControllerEvent {
    Jumped,
    Landed,
    JumpCut,
    ThrowStarted { handle: EntityHandle },
    ThrowReleased { handle: EntityHandle, velocity: Vec2 },
    StaticOverlap { x: f32, y: f32 },
    AnimationChanged { from: Animation, to: Animation },
    Exploded { debris: Vec<EntityHandle> },
}

/// Debris layout relative to the box's top-left corner, with a fixed kick.
const DEBRIS: [(BodyPart, Vec2, Vec2); 6] = [
    (BodyPart::Head,     Vec2::new(3.0, 0.0),   Vec2::new(0.0, -160.0)),
    (BodyPart::Torso,    Vec2::new(3.0, 10.0),  Vec2::new(0.0, -80.0)),
    (BodyPart::ArmLeft,  Vec2::new(-3.0, 10.0), Vec2::new(-90.0, -110.0)),
    (BodyPart::ArmRight, Vec2::new(11.0, 10.0), Vec2::new(90.0, -110.0)),
    (BodyPart::LegLeft,  Vec2::new(1.0, 22.0),  Vec2::new(-50.0, -60.0)),
    (BodyPart::LegRight, Vec2::new(7.0, 22.0),  Vec2::new(50.0, -60.0)),
];

#[derive(Clone, Debug)]
pub struct Controller {
    cfg: ControllerConfig,
    rect: Rect,
    velocity: Vec2,
    facing: Facing,
    ground: GroundState,
    walking: bool,
    aim: AimState,
    held: Option<EntityHandle>,
    animation: Animation,
    destroyed: bool,
}

impl Controller {
    /// Create a controller with its box top-left at `position`.
    /// Size and tuning are fixed from here on.
    pub fn new(
        cfg: &ControllerConfig,
        overrides: &ControllerOverrides,
        position: Vec2,
    ) -> Result<Self, ControllerError> {
        let cfg = cfg.with_overrides(overrides);
        cfg.validate()?;
        Ok(Controller {
            rect: Rect::new(position.x, position.y, cfg.width, cfg.height),
            cfg,
            velocity: Vec2::ZERO,
            facing: Facing::Right,
            ground: GroundState::Airborne,
            walking: false,
            aim: AimState::default(),
            held: None,
            animation: Animation::Jumping,
            destroyed: false,
        })
    }

    // ── Accessors ──

    pub fn config(&self) -> &ControllerConfig { &self.cfg }
    pub fn rect(&self) -> Rect { self.rect }
    pub fn position(&self) -> Vec2 { Vec2::new(self.rect.x, self.rect.y) }
    pub fn center(&self) -> Vec2 { self.rect.center() }
    pub fn velocity(&self) -> Vec2 { self.velocity }
    pub fn facing(&self) -> Facing { self.facing }
    pub fn ground_state(&self) -> GroundState { self.ground }
    pub fn jump_enabled(&self) -> bool { self.ground == GroundState::Grounded }
    pub fn is_walking(&self) -> bool { self.walking }
    pub fn aim(&self) -> AimState { self.aim }
    pub fn held(&self) -> Option<EntityHandle> { self.held }
    pub fn animation(&self) -> Animation { self.animation }
    pub fn is_destroyed(&self) -> bool { self.destroyed }

    pub fn throw_angle(&self) -> f32 {
        self.aim.angle(self.facing)
    }

    pub fn pose(&self) -> Pose {
        Pose {
            x: self.rect.x.round() as i32,
            y: self.rect.y.round() as i32,
            facing: self.facing,
            animation: self.animation,
            throw_angle: self.throw_angle(),
        }
    }

    // ── Per-frame update ──

    /// Advance one frame. The grid is read-only; `entities` is only touched
    /// for the held object (create / follow / release).
    pub fn advance(
        &mut self,
        grid: &TileGrid,
        intents: &Intents,
        dt: f32,
        entities: &mut dyn EntityFactory,
    ) -> Vec<ControllerEvent> {
        let mut events = Vec::new();
        if self.destroyed || !(dt > 0.0) {
            return events;
        }

        self.integrate_velocity(intents, dt);
        self.sync_held(entities);
        self.move_and_collide(grid, dt, &mut events);
        self.resolve_jump(intents, &mut events);
        self.aim.update(intents, dt, self.cfg.throw_pitch_speed);
        self.resolve_throw(intents, entities, &mut events);
        self.sync_held(entities);
        self.select_animation(&mut events);

        events
    }

    /// Steps 1-3: intent → velocity.
    fn integrate_velocity(&mut self, intents: &Intents, dt: f32) {
        let cfg = &self.cfg;
        let grounded = self.ground == GroundState::Grounded;
        self.walking = false;

        let decel = if intents.left && intents.right {
            cfg.midair_decel
        } else {
            if let Some(dir) = intents.horizontal() {
                self.velocity.x += f32::from(dir) * cfg.accel * dt;
                self.facing = if dir < 0 { Facing::Left } else { Facing::Right };
                self.walking = grounded;
            }
            if intents.down && grounded {
                cfg.crouch_decel
            } else if !grounded {
                cfg.midair_decel
            } else {
                cfg.passive_decel
            }
        };

        let dx = self.velocity.x;
        self.velocity.x = if dx > 0.0 {
            (dx - decel * dt).max(0.0)
        } else if dx < 0.0 {
            (dx + decel * dt).min(0.0)
        } else {
            0.0
        };
        self.velocity.x = self.velocity.x.clamp(-cfg.dx_max, cfg.dx_max);

        self.velocity.y += cfg.gravity * dt;
    }

    /// Step 5 plus the threshold part of the ground machine.
    fn move_and_collide(&mut self, grid: &TileGrid, dt: f32, events: &mut Vec<ControllerEvent>) {
        let outcome = collision::move_axis(grid, &mut self.rect, &mut self.velocity.x, Axis::Horizontal, dt);
        if let AxisOutcome::StaticOverlap { .. } = outcome {
            events.push(ControllerEvent::StaticOverlap { x: self.rect.x, y: self.rect.y });
        }

        let outcome = collision::move_axis(grid, &mut self.rect, &mut self.velocity.y, Axis::Vertical, dt);
        if outcome.landed() && self.ground == GroundState::Airborne {
            debug!(x = self.rect.x, y = self.rect.y, "landed");
            self.ground = GroundState::Grounded;
            events.push(ControllerEvent::Landed);
        }

        if self.velocity.y.abs() > self.cfg.airborne_threshold && self.ground == GroundState::Grounded {
            debug!(dy = self.velocity.y, "left_ground");
            self.ground = GroundState::Airborne;
        }
    }

    fn resolve_jump(&mut self, intents: &Intents, events: &mut Vec<ControllerEvent>) {
        if intents.jump_pressed && self.ground == GroundState::Grounded {
            self.velocity.y = self.cfg.jump_dy;
            self.ground = GroundState::Airborne;
            debug!(dy = self.velocity.y, "jumped");
            events.push(ControllerEvent::Jumped);
        }
        if intents.jump_released && self.velocity.y < 0.0 {
            self.velocity.y *= 0.5;
            events.push(ControllerEvent::JumpCut);
        }
    }

    fn resolve_throw(
        &mut self,
        intents: &Intents,
        entities: &mut dyn EntityFactory,
        events: &mut Vec<ControllerEvent>,
    ) {
        if intents.throw_pressed && self.held.is_none() {
            let handle = entities.create(
                EntityKind::Grenade,
                Spawn { position: self.center(), velocity: Vec2::ZERO },
            );
            if let Some(body) = entities.body_mut(handle) {
                body.held = true;
                body.center_on(self.center());
            }
            self.held = Some(handle);
            debug!(?handle, "throw_started");
            events.push(ControllerEvent::ThrowStarted { handle });
        }

        if intents.throw_released {
            if let Some(handle) = self.held.take() {
                let velocity = aim::release_velocity(
                    self.throw_angle(),
                    self.cfg.throw_strength,
                    self.velocity,
                    self.cfg.grenade_dampening,
                );
                match entities.body_mut(handle) {
                    Some(body) => {
                        body.held = false;
                        body.velocity = velocity;
                        debug!(?handle, vx = velocity.x, vy = velocity.y, "throw_released");
                        events.push(ControllerEvent::ThrowReleased { handle, velocity });
                    }
                    None => debug!(?handle, "held_object_gone_before_release"),
                }
            }
        }
    }

    /// Slave the held object to our center, zero its velocity. A stale
    /// handle means someone else destroyed it: forget it.
    fn sync_held(&mut self, entities: &mut dyn EntityFactory) {
        let Some(handle) = self.held else { return };
        let center = self.center();
        match entities.body_mut(handle) {
            Some(body) => {
                body.center_on(center);
                body.velocity = Vec2::ZERO;
            }
            None => {
                debug!(?handle, "held_object_gone");
                self.held = None;
            }
        }
    }

    fn select_animation(&mut self, events: &mut Vec<ControllerEvent>) {
        let next = match (self.ground, self.walking) {
            (GroundState::Airborne, _) => Animation::Jumping,
            (GroundState::Grounded, true) => Animation::Walking,
            (GroundState::Grounded, false) => Animation::Idle,
        };
        if next != self.animation {
            events.push(ControllerEvent::AnimationChanged { from: self.animation, to: next });
            self.animation = next;
        }
    }

    // ── Destruction ──

    /// Terminal transition: drop any held object, spawn debris, stop updating.
    pub fn on_lethal_event(&mut self, entities: &mut dyn EntityFactory) -> Vec<ControllerEvent> {
        if self.destroyed {
            return vec![];
        }
        self.destroyed = true;

        if let Some(handle) = self.held.take() {
            if let Some(body) = entities.body_mut(handle) {
                body.held = false;
                body.velocity = Vec2::ZERO;
            }
        }

        let origin = self.position();
        let debris: Vec<EntityHandle> = DEBRIS.iter()
            .map(|&(part, offset, kick)| {
                entities.create(
                    EntityKind::Debris(part),
                    Spawn { position: origin + offset, velocity: kick },
                )
            })
            .collect();

        info!(x = origin.x, y = origin.y, pieces = debris.len(), "exploded");
        vec![ControllerEvent::Exploded { debris }]
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
