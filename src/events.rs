use crate::ecs::EntityId;
use glam::Vec3;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    EntitySpawned { id: EntityId, name: String, replacement: bool },
    EntityPopped { id: EntityId, position: Vec3 },
    ReplacementRequested { vacated: EntityId },
    ReplacementFailed { vacated: EntityId, reason: String },
    ReplacementDiscarded { vacated: EntityId },
    PopulationFailed { reason: String },
}

impl fmt::Display for SceneEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneEvent::EntitySpawned { id, name, replacement } => {
                write!(f, "EntitySpawned id={id} name={name} replacement={replacement}")
            }
            SceneEvent::EntityPopped { id, position } => {
                write!(f, "EntityPopped id={id} at=({:.2}, {:.2}, {:.2})", position.x, position.y, position.z)
            }
            SceneEvent::ReplacementRequested { vacated } => write!(f, "ReplacementRequested vacated={vacated}"),
            SceneEvent::ReplacementFailed { vacated, reason } => {
                write!(f, "ReplacementFailed vacated={vacated} reason={reason}")
            }
            SceneEvent::ReplacementDiscarded { vacated } => write!(f, "ReplacementDiscarded vacated={vacated}"),
            SceneEvent::PopulationFailed { reason } => write!(f, "PopulationFailed reason={reason}"),
        }
    }
}

#[derive(Default)]
pub struct EventBus {
    events: Vec<SceneEvent>,
}

impl EventBus {
    pub fn push(&mut self, event: SceneEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<SceneEvent> {
        self.events.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
