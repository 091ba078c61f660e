use super::TimeDelta;
use crate::ecs::types::*;
use crate::gesture::{Squeeze, SqueezeState};
use bevy_ecs::prelude::*;
use glam::{EulerRot, Quat, Vec3};
use std::f32::consts::TAU;

pub fn sys_spin_population_root(mut root: ResMut<PopulationRoot>, dt: Res<TimeDelta>) {
    let yaw = root.yaw + root.speed * dt.0;
    root.yaw = yaw.rem_euclid(TAU);
}

/// Squeezing entities hold still so the squash reads clearly.
pub fn sys_apply_spin(mut q: Query<(&mut Transform3D, &Spin, Option<&Squeeze>)>, dt: Res<TimeDelta>) {
    for (mut transform, spin, squeeze) in &mut q {
        if squeeze.is_some_and(|s| s.state() == SqueezeState::Squeezing) {
            continue;
        }
        let step = spin.speed * dt.0;
        if step == 0.0 {
            continue;
        }
        transform.rotation = (transform.rotation * Quat::from_euler(EulerRot::XYZ, step, step, 0.0)).normalize();
    }
}

/// Record entities hang off the population root; scenery sits directly in world space.
pub fn sys_sync_world3d(
    root: Res<PopulationRoot>,
    mut q: Query<(&Transform3D, &mut WorldTransform3D, Option<&RecordEntity>)>,
) {
    let root_mat = root.matrix();
    for (transform, mut world, record) in &mut q {
        let local = transform.matrix();
        world.0 = if record.is_some() { root_mat * local } else { local };
    }
}

pub fn sys_face_labels(
    root: Res<PopulationRoot>,
    viewpoint: Res<Viewpoint>,
    mut q: Query<(&WorldTransform3D, &mut LabelOverlay)>,
) {
    let root_mat = root.matrix();
    for (world, mut label) in &mut q {
        let position = world.translation() + root_mat.transform_vector3(label.offset);
        label.world_position = position;
        let to_viewer = (viewpoint.0 - position).normalize_or_zero();
        if to_viewer.length_squared() > f32::EPSILON {
            label.orientation = Quat::from_rotation_arc(Vec3::Z, to_viewer);
        }
    }
}
