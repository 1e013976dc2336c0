/// Events emitted during a simulation step.
/// The presentation layer consumes these for messages and sound.

use crate::domain::controller::ControllerEvent;
use crate::domain::entity::{EntityHandle, EntityKind};

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    Controller(ControllerEvent),
    /// A free body hit terrain hard enough to matter for sound.
    BodyImpact { handle: EntityHandle, kind: EntityKind },
    /// A body reached the end of its lifetime and was removed.
    BodyExpired { handle: EntityHandle, kind: EntityKind },
    /// The player dropped out of the bottom of the map.
    FellOutOfWorld,
}
