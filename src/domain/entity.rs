/// Entities the controller interacts with but does not own: thrown
/// grenades and death debris. They live in an entity table behind the
/// `EntityFactory` seam and are referenced by generational handles, so a
/// stale handle is detected instead of aliasing a recycled slot.

use glam::Vec2;

use super::geom::Rect;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

/// Index + generation into an entity table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct EntityHandle {
    pub index: u32,
    pub generation: u32,
}

/// Debris pieces spawned when the controller explodes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BodyPart {
    Head,
    Torso,
    ArmLeft,
    ArmRight,
    LegLeft,
    LegRight,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EntityKind {
    Grenade,
    Debris(BodyPart),
}

impl EntityKind {
    /// Box size in world units.
    pub fn size(self) -> (f32, f32) {
        match self {
            EntityKind::Grenade => (4.0, 4.0),
            EntityKind::Debris(BodyPart::Head) => (6.0, 6.0),
            EntityKind::Debris(BodyPart::Torso) => (8.0, 10.0),
            EntityKind::Debris(_) => (3.0, 8.0),
        }
    }

    /// Seconds before the table removes the entity on its own.
    pub fn lifetime(self) -> f32 {
        match self {
            EntityKind::Grenade => 2.5,
            EntityKind::Debris(_) => 4.0,
        }
    }
}

/// Initial properties handed to the factory.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Spawn {
    /// Top-left corner.
    pub position: Vec2,
    pub velocity: Vec2,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    pub kind: EntityKind,
    pub rect: Rect,
    pub velocity: Vec2,
    /// While true, only the holder writes position/velocity; the world
    /// neither integrates nor ages the body.
    pub held: bool,
    pub age: f32,
}

impl Body {
    pub fn new(kind: EntityKind, spawn: Spawn) -> Self {
        let (w, h) = kind.size();
        Body {
            kind,
            rect: Rect::new(spawn.position.x, spawn.position.y, w, h),
            velocity: spawn.velocity,
            held: false,
            age: 0.0,
        }
    }

    /// Place the body so its center sits at `center`.
    pub fn center_on(&mut self, center: Vec2) {
        self.rect.x = center.x - self.rect.w / 2.0;
        self.rect.y = center.y - self.rect.h / 2.0;
    }

    pub fn expired(&self) -> bool {
        !self.held && self.age >= self.kind.lifetime()
    }
}

/// Entity creation/destruction collaborator.
pub trait EntityFactory {
    fn create(&mut self, kind: EntityKind, spawn: Spawn) -> EntityHandle;
    fn destroy(&mut self, handle: EntityHandle);
    /// `None` when the handle is stale (entity already destroyed).
    fn body_mut(&mut self, handle: EntityHandle) -> Option<&mut Body>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_on_uses_box_size() {
        let mut b = Body::new(
            EntityKind::Grenade,
            Spawn { position: Vec2::ZERO, velocity: Vec2::ZERO },
        );
        b.center_on(Vec2::new(10.0, 20.0));
        assert_eq!(b.rect.x, 8.0);
        assert_eq!(b.rect.y, 18.0);
        assert_eq!(b.rect.center(), Vec2::new(10.0, 20.0));
    }

    #[test]
    fn held_bodies_never_expire() {
        let mut b = Body::new(
            EntityKind::Grenade,
            Spawn { position: Vec2::ZERO, velocity: Vec2::ZERO },
        );
        b.age = 100.0;
        b.held = true;
        assert!(!b.expired());
        b.held = false;
        assert!(b.expired());
    }
}
