use bevy_ecs::prelude::Resource;

mod ambient;
mod picking;
mod squeeze;

pub use ambient::*;
pub use picking::*;
pub use squeeze::*;

#[derive(Resource, Clone, Copy)]
pub struct TimeDelta(pub f32);
