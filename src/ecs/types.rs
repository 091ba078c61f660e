use crate::record::EntityRecord;
use bevy_ecs::prelude::*;
use glam::{Mat4, Quat, Vec3};
use smallvec::SmallVec;
use std::fmt;
use uuid::Uuid;

/// Stable identity of a record-backed entity, independent of the ECS entity slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let simple = self.0.simple().to_string();
        f.write_str(&simple[..8])
    }
}

// ---------- Components ----------
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct Transform3D {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform3D {
    fn default() -> Self {
        Self { translation: Vec3::ZERO, rotation: Quat::IDENTITY, scale: Vec3::ONE }
    }
}

impl Transform3D {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Transform including the population root.
#[derive(Component, Clone, Copy, Default, Debug)]
pub struct WorldTransform3D(pub Mat4);

impl WorldTransform3D {
    pub fn translation(&self) -> Vec3 {
        self.0.w_axis.truncate()
    }
}

#[derive(Component, Clone, Debug)]
pub struct RecordEntity {
    pub id: EntityId,
    pub record: EntityRecord,
}

/// Per-entity ambient spin, radians per second about local X and Y.
#[derive(Component, Clone, Copy, Debug)]
pub struct Spin {
    pub speed: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProxyShape {
    Box,
    Sphere,
    Cone,
    Cylinder,
}

impl ProxyShape {
    pub const ALL: [ProxyShape; 4] = [ProxyShape::Box, ProxyShape::Sphere, ProxyShape::Cone, ProxyShape::Cylinder];

    pub fn bounds(self) -> ProxyBounds {
        match self {
            ProxyShape::Box => ProxyBounds::new(Vec3::splat(-0.5), Vec3::splat(0.5)),
            ProxyShape::Sphere => ProxyBounds::new(Vec3::splat(-1.0), Vec3::splat(1.0)),
            // Unit radius, unit height; the cone's apex points along +Y.
            ProxyShape::Cone | ProxyShape::Cylinder => {
                ProxyBounds::new(Vec3::new(-1.0, -0.5, -1.0), Vec3::new(1.0, 0.5, 1.0))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProxyBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl ProxyBounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn center(&self) -> Vec3 {
        (self.max + self.min) * 0.5
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProxyKind {
    Record(EntityId),
    /// Pickable geometry that is not backed by a record; hits on it are reported but ignored.
    Scenery,
}

/// Geometric stand-in used for ray picking.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct Proxy {
    pub kind: ProxyKind,
    pub shape: ProxyShape,
}

#[derive(Component, Clone, Debug)]
pub struct LabelOverlay {
    pub text: String,
    pub visible: bool,
    pub offset: Vec3,
    pub world_position: Vec3,
    pub orientation: Quat,
}

impl LabelOverlay {
    pub fn new(text: String, offset: Vec3) -> Self {
        Self { text, visible: false, offset, world_position: Vec3::ZERO, orientation: Quat::IDENTITY }
    }
}

// ---------- Resources ----------
#[derive(Resource, Clone, Copy, Debug)]
pub struct PopulationRoot {
    pub yaw: f32,
    pub speed: f32,
}

impl PopulationRoot {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_y(self.yaw)
    }
}

/// Where labels turn to face: the desktop camera or the immersive rig.
#[derive(Resource, Clone, Copy, Debug)]
pub struct Viewpoint(pub Vec3);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PopSignal {
    pub id: EntityId,
}

#[derive(Resource, Default)]
pub struct PopQueue(pub SmallVec<[PopSignal; 4]>);
