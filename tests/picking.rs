use glam::Vec3;
use popfield::camera::Ray;
use popfield::config::AppConfig;
use popfield::ecs::{ProxyShape, Transform3D};
use popfield::effects::EffectCoordinator;
use popfield::hit_test::{HitTarget, HitTestResolver};
use popfield::lifecycle::EntityLifecycleManager;
use popfield::placement::{Placement, QueuedPlacer};
use popfield::record::EntityRecord;
use popfield::source::{FixtureSource, RecordSource};
use std::sync::Arc;

fn lifecycle(placements: Vec<Placement>) -> EntityLifecycleManager {
    let mut config = AppConfig::default();
    config.fetch.workers = 0;
    config.spin.root_speed = 0.0;
    let source: Arc<dyn RecordSource> =
        Arc::new(FixtureSource::new(vec![EntityRecord::new("Noor", "noor@example.com", 27)]));
    EntityLifecycleManager::new(&config, source, 3).with_placer(Box::new(
        QueuedPlacer::new(placements).with_fallback(Placement::at(Vec3::new(0.0, 50.0, 0.0), ProxyShape::Box)),
    ))
}

fn records(count: usize) -> Vec<EntityRecord> {
    (0..count).map(|i| EntityRecord::new(format!("user-{i}"), format!("user{i}@example.com"), 20 + i as u32)).collect()
}

#[test]
fn nearest_of_two_entities_wins() {
    // Far box spawns first so collection order cannot decide the result.
    let mut lifecycle = lifecycle(vec![
        Placement::at(Vec3::new(0.0, 0.0, -5.5), ProxyShape::Box),
        Placement::at(Vec3::new(0.0, 0.0, -3.5), ProxyShape::Box),
    ]);
    let ids = lifecycle.ingest(records(2), false);
    let (far, near) = (ids[0], ids[1]);

    let resolver = HitTestResolver::new(1000.0);
    let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z).expect("ray");
    let hit = resolver.resolve(&ray, lifecycle.scene_mut()).expect("hit");
    assert_eq!(hit.target, HitTarget::Pickable(near));
    assert!((hit.distance - 3.0).abs() < 1e-4, "distance was {}", hit.distance);

    let mut effects = EffectCoordinator::new(Default::default(), 1);
    lifecycle.popped(near, &mut effects);
    let hit = resolver.resolve(&ray, lifecycle.scene_mut()).expect("hit");
    assert_eq!(hit.target, HitTarget::Pickable(far), "popped entities never show up in hit tests");
    assert!((hit.distance - 5.0).abs() < 1e-4);
}

#[test]
fn equal_distance_hits_keep_the_first_found() {
    // Both near faces sit at z = -2.5 and overlap the ray at x = 0.
    let mut lifecycle = lifecycle(vec![
        Placement::at(Vec3::new(-0.4, 0.0, -3.0), ProxyShape::Box),
        Placement::at(Vec3::new(0.4, 0.0, -3.0), ProxyShape::Box),
    ]);
    let ids = lifecycle.ingest(records(2), false);
    let resolver = HitTestResolver::new(1000.0);
    let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z).expect("ray");
    for _ in 0..3 {
        let hit = resolver.resolve(&ray, lifecycle.scene_mut()).expect("hit");
        assert_eq!(hit.target, HitTarget::Pickable(ids[0]));
        assert!((hit.distance - 2.5).abs() < 1e-4);
    }
}

#[test]
fn scenery_in_front_occludes_entities() {
    let mut lifecycle = lifecycle(vec![Placement::at(Vec3::new(0.0, 0.0, -4.0), ProxyShape::Cylinder)]);
    lifecycle.ingest(records(1), false);
    lifecycle.scene_mut().spawn_scenery(
        ProxyShape::Box,
        Transform3D { translation: Vec3::new(0.0, 0.0, -2.0), ..Default::default() },
    );
    let resolver = HitTestResolver::new(1000.0);
    let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z).expect("ray");
    let hit = resolver.resolve(&ray, lifecycle.scene_mut()).expect("hit");
    assert_eq!(hit.target, HitTarget::Other);
}

#[test]
fn empty_collection_and_degenerate_rays_miss() {
    let mut lifecycle = lifecycle(Vec::new());
    let resolver = HitTestResolver::new(1000.0);
    let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z).expect("ray");
    assert!(resolver.resolve(&ray, lifecycle.scene_mut()).is_none());
    assert!(Ray::new(Vec3::ZERO, Vec3::ZERO).is_none());
    assert!(Ray::new(Vec3::new(f32::NAN, 0.0, 0.0), Vec3::NEG_Z).is_none());
}

#[test]
fn picking_follows_root_rotation() {
    let mut config = AppConfig::default();
    config.fetch.workers = 0;
    config.spin.root_speed = std::f32::consts::FRAC_PI_2;
    config.spin.entity_speed = 0.0;
    let source: Arc<dyn RecordSource> = Arc::new(FixtureSource::new(records(1)));
    let mut lifecycle = EntityLifecycleManager::new(&config, source, 3).with_placer(Box::new(QueuedPlacer::new([
        Placement::at(Vec3::new(3.0, 0.0, 0.0), ProxyShape::Box),
    ])));
    let ids = lifecycle.ingest(records(1), false);
    lifecycle.scene_mut().run_ambient(1.0, Vec3::ZERO);

    let resolver = HitTestResolver::new(1000.0);
    let along_x = Ray::new(Vec3::ZERO, Vec3::X).expect("ray");
    let along_neg_z = Ray::new(Vec3::ZERO, Vec3::NEG_Z).expect("ray");
    assert!(resolver.resolve(&along_x, lifecycle.scene_mut()).is_none());
    let hit = resolver.resolve(&along_neg_z, lifecycle.scene_mut()).expect("hit after quarter turn");
    assert_eq!(hit.target, HitTarget::Pickable(ids[0]));
}
