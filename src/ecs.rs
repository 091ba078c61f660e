mod systems;
mod types;
mod world;

pub use systems::{matrix_is_finite, ray_aabb_intersection, ray_hit_proxy, ray_sphere_intersection, TimeDelta};
pub use types::*;
pub use world::{EntitySnapshot, RecordSpawn, SceneWorld};
