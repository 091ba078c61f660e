use crate::config::{AppConfig, SqueezeConfig};
use crate::ecs::{EntityId, RecordSpawn, SceneWorld};
use crate::effects::EffectSpawner;
use crate::events::{EventBus, SceneEvent};
use crate::fetch::{FetchOutcome, FetchTicket, RecordFetcher};
use crate::gesture::Squeeze;
use crate::placement::{Placer, RandomPlacer};
use crate::record::EntityRecord;
use crate::source::RecordSource;
use glam::Vec3;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleStats {
    pub spawned: u64,
    pub popped: u64,
    pub replacements_requested: u64,
    pub replacements_filled: u64,
    pub replacements_failed: u64,
    pub replacements_discarded: u64,
}

/// Sole owner of the live entity collection: inserts records as entities and retires popped
/// ones, keeping replacement fetches keyed to the slot they refill.
pub struct EntityLifecycleManager {
    scene: SceneWorld,
    squeeze: SqueezeConfig,
    label_offset: Vec3,
    entity_spin: f32,
    placer: Box<dyn Placer>,
    fetcher: RecordFetcher,
    pending: HashSet<EntityId>,
    population_pending: bool,
    events: EventBus,
    stats: LifecycleStats,
}

impl EntityLifecycleManager {
    pub fn new(config: &AppConfig, source: Arc<dyn RecordSource>, seed: u64) -> Self {
        Self {
            scene: SceneWorld::new(config.spin.root_speed),
            squeeze: config.squeeze.clone(),
            label_offset: config.population.label_offset,
            entity_spin: config.spin.entity_speed,
            placer: Box::new(RandomPlacer::new(seed, config.population.spawn_extent)),
            fetcher: RecordFetcher::new(source, &config.fetch),
            pending: HashSet::new(),
            population_pending: false,
            events: EventBus::default(),
            stats: LifecycleStats::default(),
        }
    }

    pub fn with_placer(mut self, placer: Box<dyn Placer>) -> Self {
        self.placer = placer;
        self
    }

    pub fn set_placer(&mut self, placer: Box<dyn Placer>) {
        self.placer = placer;
    }

    pub fn request_initial_population(&mut self) {
        if self.population_pending {
            log::debug!("[lifecycle] initial population already requested");
            return;
        }
        match self.fetcher.submit(FetchTicket::Population) {
            Ok(()) => self.population_pending = true,
            Err(_) => {
                log::warn!("[lifecycle] could not queue the initial population fetch");
                self.events.push(SceneEvent::PopulationFailed { reason: "fetch queue unavailable".to_string() });
            }
        }
    }

    /// Builds one entity per record. Returns the new identities in record order.
    pub fn ingest(&mut self, records: Vec<EntityRecord>, replacement: bool) -> Vec<EntityId> {
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let id = EntityId::new();
            let name = record.name.clone();
            let placement = self.placer.place();
            self.scene.spawn_record(RecordSpawn {
                id,
                record,
                placement,
                squeeze: Squeeze::from_config(&self.squeeze),
                label_offset: self.label_offset,
                spin_speed: self.entity_spin,
            });
            self.stats.spawned += 1;
            self.events.push(SceneEvent::EntitySpawned { id, name, replacement });
            ids.push(id);
        }
        if !replacement && !ids.is_empty() {
            log::info!("[lifecycle] populated {} entities", ids.len());
        }
        ids
    }

    /// Retires a collapsed entity: it leaves the collection, an effect starts at its last
    /// world position and one replacement fetch is queued. Returns that position.
    pub fn popped(&mut self, id: EntityId, effects: &mut dyn EffectSpawner) -> Vec3 {
        let Some(position) = self.scene.despawn_record(id) else {
            panic!("popped called for entity {id} that is not live (double pop?)");
        };
        self.stats.popped += 1;
        self.events.push(SceneEvent::EntityPopped { id, position });
        if effects.spawn(position).is_none() {
            log::warn!("[lifecycle] no effect spawned for {id}");
        }

        let ticket = FetchTicket::Replacement { vacated: id };
        self.stats.replacements_requested += 1;
        self.pending.insert(id);
        match self.fetcher.submit(ticket) {
            Ok(()) => self.events.push(SceneEvent::ReplacementRequested { vacated: id }),
            Err(_) => {
                self.pending.remove(&id);
                self.stats.replacements_failed += 1;
                log::warn!("[lifecycle] replacement fetch for {id} could not be queued; slot stays empty");
                self.events
                    .push(SceneEvent::ReplacementFailed { vacated: id, reason: "fetch queue unavailable".to_string() });
            }
        }
        position
    }

    /// Applies every finished fetch. Returns the number of entities ingested.
    pub fn apply_completed_fetches(&mut self) -> usize {
        let outcomes = self.fetcher.drain();
        self.apply_outcomes(outcomes)
    }

    /// Waits up to `timeout` for at least one fetch to finish, then applies everything ready.
    pub fn wait_for_fetches(&mut self, timeout: Duration) -> usize {
        let outcomes = self.fetcher.drain_blocking(timeout);
        self.apply_outcomes(outcomes)
    }

    fn apply_outcomes(&mut self, outcomes: Vec<FetchOutcome>) -> usize {
        let mut ingested = 0;
        for outcome in outcomes {
            match outcome.ticket {
                FetchTicket::Population => {
                    if !self.population_pending {
                        log::debug!("[lifecycle] discarding stale population fetch");
                        continue;
                    }
                    self.population_pending = false;
                    match outcome.records {
                        Ok(records) => ingested += self.ingest(records, false).len(),
                        Err(err) => {
                            log::warn!(
                                "[lifecycle] initial population failed after {} attempt(s): {err:#}",
                                outcome.attempts
                            );
                            self.events.push(SceneEvent::PopulationFailed { reason: format!("{err:#}") });
                        }
                    }
                }
                FetchTicket::Replacement { vacated } => {
                    if !self.pending.remove(&vacated) {
                        self.stats.replacements_discarded += 1;
                        log::debug!("[lifecycle] discarding replacement for cancelled slot {vacated}");
                        self.events.push(SceneEvent::ReplacementDiscarded { vacated });
                        continue;
                    }
                    match outcome.records {
                        Ok(records) => {
                            let count = self.ingest(records, true).len();
                            self.stats.replacements_filled += 1;
                            ingested += count;
                        }
                        Err(err) => {
                            self.stats.replacements_failed += 1;
                            log::warn!(
                                "[lifecycle] replacement for {vacated} failed after {} attempt(s): {err:#}",
                                outcome.attempts
                            );
                            self.events.push(SceneEvent::ReplacementFailed { vacated, reason: format!("{err:#}") });
                        }
                    }
                }
            }
        }
        ingested
    }

    /// Removes every entity and cancels outstanding replacements; late results are dropped.
    pub fn clear(&mut self) {
        let removed = self.scene.clear_records();
        let cancelled = self.pending.len();
        self.pending.clear();
        self.population_pending = false;
        log::info!("[lifecycle] cleared {removed} entities, cancelled {cancelled} pending replacement(s)");
    }

    pub fn entity_count(&self) -> usize {
        self.scene.record_count()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.scene.contains(id)
    }

    pub fn pending_replacements(&self) -> usize {
        self.pending.len()
    }

    pub fn is_replacement_pending(&self, vacated: EntityId) -> bool {
        self.pending.contains(&vacated)
    }

    pub fn population_pending(&self) -> bool {
        self.population_pending
    }

    pub fn stats(&self) -> LifecycleStats {
        self.stats
    }

    pub fn scene(&self) -> &SceneWorld {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneWorld {
        &mut self.scene
    }

    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        self.events.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::ProxyShape;
    use crate::placement::{Placement, QueuedPlacer};
    use crate::source::FixtureSource;

    struct CountingSpawner(Vec<Vec3>);

    impl EffectSpawner for CountingSpawner {
        fn spawn(&mut self, origin: Vec3) -> Option<u64> {
            self.0.push(origin);
            Some(self.0.len() as u64)
        }
    }

    fn manager() -> EntityLifecycleManager {
        let mut config = AppConfig::default();
        config.fetch.workers = 0;
        config.spin.root_speed = 0.0;
        let source: Arc<dyn RecordSource> =
            Arc::new(FixtureSource::new(vec![EntityRecord::new("Rin", "rin@example.com", 31)]));
        EntityLifecycleManager::new(&config, source, 1).with_placer(Box::new(QueuedPlacer::new([
            Placement::at(Vec3::new(0.0, 0.0, -3.0), ProxyShape::Box),
            Placement::at(Vec3::new(2.0, 0.0, -3.0), ProxyShape::Box),
        ])))
    }

    #[test]
    fn popped_entity_leaves_and_requests_one_replacement() {
        let mut lifecycle = manager();
        let ids = lifecycle.ingest(vec![EntityRecord::new("Ada", "ada@example.com", 36)], false);
        let mut spawner = CountingSpawner(Vec::new());
        let position = lifecycle.popped(ids[0], &mut spawner);
        assert_eq!(position, Vec3::new(0.0, 0.0, -3.0));
        assert!(!lifecycle.contains(ids[0]));
        assert_eq!(spawner.0, vec![position]);
        assert_eq!(lifecycle.pending_replacements(), 1);

        assert_eq!(lifecycle.apply_completed_fetches(), 1);
        assert_eq!(lifecycle.entity_count(), 1);
        assert_eq!(lifecycle.pending_replacements(), 0);
        assert_eq!(lifecycle.stats().replacements_filled, 1);
    }

    #[test]
    #[should_panic(expected = "double pop")]
    fn popping_twice_is_fatal() {
        let mut lifecycle = manager();
        let ids = lifecycle.ingest(vec![EntityRecord::new("Ada", "ada@example.com", 36)], false);
        let mut spawner = CountingSpawner(Vec::new());
        lifecycle.popped(ids[0], &mut spawner);
        lifecycle.popped(ids[0], &mut spawner);
    }

    #[test]
    fn clear_discards_late_replacements() {
        let mut lifecycle = manager();
        let ids = lifecycle.ingest(vec![EntityRecord::new("Ada", "ada@example.com", 36)], false);
        let mut spawner = CountingSpawner(Vec::new());
        lifecycle.popped(ids[0], &mut spawner);
        lifecycle.clear();
        assert_eq!(lifecycle.apply_completed_fetches(), 0);
        assert_eq!(lifecycle.entity_count(), 0);
        let events = lifecycle.drain_events();
        assert!(events.iter().any(|e| matches!(e, SceneEvent::ReplacementDiscarded { vacated } if *vacated == ids[0])));
    }

    #[test]
    fn ingest_assigns_distinct_identities() {
        let mut lifecycle = manager();
        let records = vec![
            EntityRecord::new("Ada", "ada@example.com", 36),
            EntityRecord::new("Ada", "ada@example.com", 36),
        ];
        let ids = lifecycle.ingest(records, false);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(lifecycle.entity_count(), 2);
    }
}
