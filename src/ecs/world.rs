use super::systems::*;
use super::types::*;
use crate::camera::Ray;
use crate::gesture::{Squeeze, SqueezeState};
use crate::placement::Placement;
use crate::record::EntityRecord;
use bevy_ecs::prelude::{Entity, Schedule, World};
use bevy_ecs::schedule::IntoSystemConfigs;
use glam::{Mat4, Quat, Vec3};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Everything needed to materialize one record-backed entity.
pub struct RecordSpawn {
    pub id: EntityId,
    pub record: EntityRecord,
    pub placement: Placement,
    pub squeeze: Squeeze,
    pub label_offset: Vec3,
    pub spin_speed: f32,
}

/// Read-only view of a record entity for presentation.
#[derive(Debug, Clone)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub name: String,
    pub shape: ProxyShape,
    pub world: Mat4,
    pub scale: Vec3,
    pub squeeze: SqueezeState,
    pub label_text: String,
    pub label_visible: bool,
    pub label_position: Vec3,
    pub label_orientation: Quat,
}

// ---------- World container ----------
pub struct SceneWorld {
    pub world: World,
    schedule_ambient: Schedule,
    schedule_gesture: Schedule,
    index: HashMap<EntityId, Entity>,
}

impl Default for SceneWorld {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl SceneWorld {
    pub fn new(root_speed: f32) -> Self {
        let mut world = World::new();
        world.insert_resource(TimeDelta(0.0));
        world.insert_resource(PopulationRoot { yaw: 0.0, speed: root_speed });
        world.insert_resource(Viewpoint(Vec3::ZERO));
        world.insert_resource(PopQueue::default());

        let mut schedule_ambient = Schedule::default();
        schedule_ambient
            .add_systems((sys_spin_population_root, sys_apply_spin, sys_sync_world3d, sys_face_labels).chain());

        let mut schedule_gesture = Schedule::default();
        schedule_gesture.add_systems((sys_advance_squeeze, sys_sync_world3d, sys_face_labels).chain());

        Self { world, schedule_ambient, schedule_gesture, index: HashMap::new() }
    }

    /// Root spin, entity spin and label facing for one tick.
    pub fn run_ambient(&mut self, dt: f32, viewpoint: Vec3) {
        self.world.resource_mut::<TimeDelta>().0 = dt;
        if viewpoint.is_finite() {
            self.world.resource_mut::<Viewpoint>().0 = viewpoint;
        }
        self.schedule_ambient.run(&mut self.world);
    }

    /// Advances every squeeze and returns the entities that collapsed this tick.
    pub fn run_gestures(&mut self, dt: f32) -> SmallVec<[PopSignal; 4]> {
        self.world.resource_mut::<TimeDelta>().0 = dt;
        self.schedule_gesture.run(&mut self.world);
        std::mem::take(&mut self.world.resource_mut::<PopQueue>().0)
    }

    pub(crate) fn spawn_record(&mut self, spawn: RecordSpawn) -> Entity {
        assert!(!self.index.contains_key(&spawn.id), "entity {} spawned twice", spawn.id);
        let scale = spawn.squeeze.original_scale();
        let transform =
            Transform3D { translation: spawn.placement.translation, rotation: spawn.placement.rotation, scale };
        let root = self.world.resource::<PopulationRoot>().matrix();
        let label = LabelOverlay::new(spawn.record.label_text(), spawn.label_offset);
        let entity = self
            .world
            .spawn((
                RecordEntity { id: spawn.id, record: spawn.record },
                transform,
                WorldTransform3D(root * transform.matrix()),
                Spin { speed: spawn.spin_speed },
                Proxy { kind: ProxyKind::Record(spawn.id), shape: spawn.placement.shape },
                spawn.squeeze,
                label,
            ))
            .id();
        self.index.insert(spawn.id, entity);
        entity
    }

    /// Non-record geometry that takes part in picking and can occlude entities behind it.
    pub fn spawn_scenery(&mut self, shape: ProxyShape, transform: Transform3D) -> Entity {
        self.world
            .spawn((transform, WorldTransform3D(transform.matrix()), Proxy { kind: ProxyKind::Scenery, shape }))
            .id()
    }

    /// Removes the entity and returns its last world position.
    pub(crate) fn despawn_record(&mut self, id: EntityId) -> Option<Vec3> {
        let entity = self.index.remove(&id)?;
        let position = self.world.get::<WorldTransform3D>(entity).map(|wt| wt.translation());
        self.world.despawn(entity);
        position
    }

    pub(crate) fn clear_records(&mut self) -> usize {
        let ids: Vec<EntityId> = self.index.keys().copied().collect();
        for id in &ids {
            self.despawn_record(*id);
        }
        ids.len()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn record_count(&self) -> usize {
        self.index.len()
    }

    pub fn record_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.index.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn record(&self, id: EntityId) -> Option<&EntityRecord> {
        let entity = *self.index.get(&id)?;
        self.world.get::<RecordEntity>(entity).map(|r| &r.record)
    }

    pub fn transform(&self, id: EntityId) -> Option<Transform3D> {
        let entity = *self.index.get(&id)?;
        self.world.get::<Transform3D>(entity).copied()
    }

    pub fn world_position(&self, id: EntityId) -> Option<Vec3> {
        let entity = *self.index.get(&id)?;
        self.world.get::<WorldTransform3D>(entity).map(|wt| wt.translation())
    }

    pub fn squeeze_state(&self, id: EntityId) -> Option<SqueezeState> {
        let entity = *self.index.get(&id)?;
        self.world.get::<Squeeze>(entity).map(|s| s.state())
    }

    pub fn label(&self, id: EntityId) -> Option<&LabelOverlay> {
        let entity = *self.index.get(&id)?;
        self.world.get::<LabelOverlay>(entity)
    }

    pub fn root_yaw(&self) -> f32 {
        self.world.resource::<PopulationRoot>().yaw
    }

    pub(crate) fn set_squeezing(&mut self, id: EntityId, squeezing: bool) -> bool {
        let Some(entity) = self.index.get(&id).copied() else {
            return false;
        };
        let Some(mut squeeze) = self.world.get_mut::<Squeeze>(entity) else {
            return false;
        };
        if squeezing {
            squeeze.start();
        } else {
            squeeze.end();
        }
        true
    }

    /// Flips label visibility; returns the new state.
    pub(crate) fn toggle_label(&mut self, id: EntityId) -> Option<bool> {
        let entity = self.index.get(&id).copied()?;
        let mut label = self.world.get_mut::<LabelOverlay>(entity)?;
        label.visible = !label.visible;
        Some(label.visible)
    }

    /// Nearest proxy along the ray; equal distances keep the first one found.
    pub fn pick(&mut self, ray: &Ray) -> Option<(ProxyKind, f32)> {
        let mut query = self.world.query::<(&Proxy, &WorldTransform3D)>();
        let mut closest: Option<(ProxyKind, f32)> = None;
        for (proxy, world) in query.iter(&self.world) {
            let Some(distance) = ray_hit_proxy(ray.origin, ray.direction, &world.0, proxy.shape) else {
                continue;
            };
            match closest {
                Some((_, best)) if distance >= best => {}
                _ => closest = Some((proxy.kind, distance)),
            }
        }
        closest
    }

    pub fn snapshot(&mut self) -> Vec<EntitySnapshot> {
        let mut query =
            self.world.query::<(&RecordEntity, &Proxy, &Transform3D, &WorldTransform3D, &Squeeze, &LabelOverlay)>();
        let mut out: Vec<EntitySnapshot> = query
            .iter(&self.world)
            .map(|(record, proxy, transform, world, squeeze, label)| EntitySnapshot {
                id: record.id,
                name: record.record.name.clone(),
                shape: proxy.shape,
                world: world.0,
                scale: transform.scale,
                squeeze: squeeze.state(),
                label_text: label.text.clone(),
                label_visible: label.visible,
                label_position: label.world_position,
                label_orientation: label.orientation,
            })
            .collect();
        out.sort_by_key(|snapshot| snapshot.id);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SqueezeConfig;

    fn spawn_at(scene: &mut SceneWorld, translation: Vec3) -> EntityId {
        let id = EntityId::new();
        scene.spawn_record(RecordSpawn {
            id,
            record: EntityRecord::new("Ada", "ada@example.com", 36),
            placement: Placement::at(translation, ProxyShape::Box),
            squeeze: Squeeze::from_config(&SqueezeConfig::default()),
            label_offset: Vec3::Y,
            spin_speed: 0.0,
        });
        id
    }

    #[test]
    fn labels_start_hidden_and_track_offset() {
        let mut scene = SceneWorld::new(0.0);
        let id = spawn_at(&mut scene, Vec3::new(1.0, 2.0, 3.0));
        scene.run_ambient(0.016, Vec3::new(10.0, 5.0, 10.0));
        let label = scene.label(id).expect("label");
        assert!(!label.visible);
        assert!(label.world_position.abs_diff_eq(Vec3::new(1.0, 3.0, 3.0), 1e-5));
        assert_eq!(scene.toggle_label(id), Some(true));
        assert_eq!(scene.toggle_label(id), Some(false));
    }

    #[test]
    fn root_spin_moves_world_positions() {
        let mut scene = SceneWorld::new(std::f32::consts::FRAC_PI_2);
        let id = spawn_at(&mut scene, Vec3::new(1.0, 0.0, 0.0));
        scene.run_ambient(1.0, Vec3::ZERO);
        let position = scene.world_position(id).expect("position");
        assert!(position.abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), 1e-5));
        assert!(scene.transform(id).expect("transform").translation.abs_diff_eq(Vec3::X, 1e-6));
    }

    #[test]
    fn despawn_returns_last_position_once() {
        let mut scene = SceneWorld::new(0.0);
        let id = spawn_at(&mut scene, Vec3::new(0.0, 0.0, -2.0));
        assert_eq!(scene.record_count(), 1);
        assert_eq!(scene.despawn_record(id), Some(Vec3::new(0.0, 0.0, -2.0)));
        assert_eq!(scene.despawn_record(id), None);
        assert!(!scene.contains(id));
    }

    #[test]
    #[should_panic(expected = "spawned twice")]
    fn duplicate_ids_are_rejected() {
        let mut scene = SceneWorld::new(0.0);
        let id = spawn_at(&mut scene, Vec3::ZERO);
        scene.spawn_record(RecordSpawn {
            id,
            record: EntityRecord::new("Bo", "bo@example.com", 40),
            placement: Placement::at(Vec3::ONE, ProxyShape::Cone),
            squeeze: Squeeze::from_config(&SqueezeConfig::default()),
            label_offset: Vec3::Y,
            spin_speed: 0.0,
        });
    }

    #[test]
    fn scenery_is_picked_without_a_record() {
        let mut scene = SceneWorld::new(0.0);
        scene.spawn_scenery(
            ProxyShape::Box,
            Transform3D { translation: Vec3::new(0.0, 0.0, -2.0), ..Default::default() },
        );
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z).expect("ray");
        let (kind, distance) = scene.pick(&ray).expect("hit");
        assert_eq!(kind, ProxyKind::Scenery);
        assert!((distance - 1.5).abs() < 1e-4);
        assert_eq!(scene.record_count(), 0);
    }
}
