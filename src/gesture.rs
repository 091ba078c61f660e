use crate::config::{Axis, CollapseRule, DuplicateStartPolicy, SqueezeConfig};
use crate::ecs::{EntityId, SceneWorld};
use crate::hit_test::HitTarget;
use crate::input::{GesturePhase, InputGesture, InputSource};
use bevy_ecs::prelude::Component;
use glam::Vec3;
use smallvec::SmallVec;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqueezeState {
    Idle,
    Squeezing,
}

/// Per-entity squeeze state machine. The scale always eases toward the squashed target while
/// squeezing and back to the original otherwise; collapsing past the threshold pops it.
#[derive(Component, Debug, Clone)]
pub struct Squeeze {
    state: SqueezeState,
    original: Vec3,
    squashed: Vec3,
    rate: f32,
    threshold: f32,
    axes: SmallVec<[Axis; 3]>,
    rule: CollapseRule,
    popped: bool,
}

impl Squeeze {
    pub fn from_config(config: &SqueezeConfig) -> Self {
        Self {
            state: SqueezeState::Idle,
            original: config.original_scale,
            squashed: config.squash_scale,
            rate: config.scale_speed.max(0.0),
            threshold: config.collapse_threshold,
            axes: config.collapse_axes.iter().copied().collect(),
            rule: config.collapse_rule,
            popped: false,
        }
    }

    pub fn state(&self) -> SqueezeState {
        self.state
    }

    pub fn popped(&self) -> bool {
        self.popped
    }

    pub fn original_scale(&self) -> Vec3 {
        self.original
    }

    pub fn target(&self) -> Vec3 {
        match self.state {
            SqueezeState::Idle => self.original,
            SqueezeState::Squeezing => self.squashed,
        }
    }

    pub fn start(&mut self) {
        if !self.popped {
            self.state = SqueezeState::Squeezing;
        }
    }

    pub fn end(&mut self) {
        if !self.popped {
            self.state = SqueezeState::Idle;
        }
    }

    /// Eases `scale` toward the target. Returns `true` exactly once, on the tick the entity
    /// collapses.
    pub fn advance(&mut self, dt: f32, scale: &mut Vec3) -> bool {
        if self.popped || !dt.is_finite() || dt <= 0.0 {
            return false;
        }
        let alpha = (self.rate * dt).clamp(0.0, 1.0);
        *scale = scale.lerp(self.target(), alpha);
        if self.state == SqueezeState::Squeezing && self.collapsed(*scale) {
            self.popped = true;
            return true;
        }
        false
    }

    fn collapsed(&self, scale: Vec3) -> bool {
        if self.axes.is_empty() {
            return false;
        }
        let below = |axis: &Axis| axis.component(scale) <= self.threshold;
        match self.rule {
            CollapseRule::Any => self.axes.iter().any(below),
            CollapseRule::All => self.axes.iter().all(below),
        }
    }
}

/// Tracks which input source is squeezing which entity. An entity is squeezed by at most one
/// source at a time.
pub struct GestureCoordinator {
    owners: HashMap<InputSource, EntityId>,
    policy: DuplicateStartPolicy,
}

impl GestureCoordinator {
    pub fn new(policy: DuplicateStartPolicy) -> Self {
        Self { owners: HashMap::new(), policy }
    }

    pub fn target_of(&self, source: InputSource) -> Option<EntityId> {
        self.owners.get(&source).copied()
    }

    pub fn owner_of(&self, id: EntityId) -> Option<InputSource> {
        self.owners.iter().find(|(_, target)| **target == id).map(|(source, _)| *source)
    }

    pub fn active_count(&self) -> usize {
        self.owners.len()
    }

    /// Routes one buffered gesture edge. `target` is what the source's ray hit at the time the
    /// tick handled the edge.
    pub fn apply(&mut self, gesture: InputGesture, target: Option<HitTarget>, scene: &mut SceneWorld) {
        match gesture.phase {
            GesturePhase::Start => {
                let hit = match target {
                    Some(HitTarget::Pickable(id)) => Some(id),
                    Some(HitTarget::Other) | None => None,
                };
                if gesture.action.squeezes() {
                    if let Some(previous) = self.target_of(gesture.source) {
                        if Some(previous) != hit {
                            log::debug!(
                                "[gesture] {} restarted without an end; releasing {previous}",
                                gesture.source
                            );
                            self.end(gesture.source, scene);
                        }
                    }
                }
                let Some(id) = hit else {
                    return;
                };
                if gesture.action.toggles_label() {
                    scene.toggle_label(id);
                }
                if gesture.action.squeezes() {
                    self.begin(gesture.source, id, scene);
                }
            }
            GesturePhase::End => {
                if gesture.action.squeezes() {
                    self.end(gesture.source, scene);
                }
            }
        }
    }

    pub fn begin(&mut self, source: InputSource, id: EntityId, scene: &mut SceneWorld) {
        if self.target_of(source) == Some(id) {
            return;
        }
        if let Some(other) = self.owner_of(id) {
            match self.policy {
                DuplicateStartPolicy::Ignore => {
                    log::debug!("[gesture] {source} ignored; {id} already squeezed by {other}");
                    return;
                }
                DuplicateStartPolicy::Rearm => {
                    log::debug!("[gesture] {source} takes over {id} from {other}");
                    self.owners.remove(&other);
                }
            }
        }
        if scene.set_squeezing(id, true) {
            self.owners.insert(source, id);
        }
    }

    pub fn end(&mut self, source: InputSource, scene: &mut SceneWorld) {
        if let Some(id) = self.owners.remove(&source) {
            scene.set_squeezing(id, false);
        }
    }

    /// Drops every reference to an entity that left the scene.
    pub fn forget_entity(&mut self, id: EntityId) {
        self.owners.retain(|_, target| *target != id);
    }

    pub fn clear(&mut self) {
        self.owners.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rate: f32) -> SqueezeConfig {
        SqueezeConfig { scale_speed: rate, ..SqueezeConfig::default() }
    }

    #[test]
    fn squeezing_collapses_and_pops_once() {
        let mut squeeze = Squeeze::from_config(&config(3.0));
        let mut scale = squeeze.original_scale();
        squeeze.start();
        let pops = (0..100).filter(|_| squeeze.advance(0.1, &mut scale)).count();
        assert_eq!(pops, 1);
        assert!(squeeze.popped());
        assert!(scale.x <= 0.2 || scale.z <= 0.2);
    }

    #[test]
    fn squeezing_approaches_squashed_target_monotonically() {
        // Threshold below the squashed width so the squeeze never pops mid-check.
        let cfg = SqueezeConfig { collapse_threshold: 0.05, ..config(1.5) };
        let squashed = cfg.squash_scale;
        let mut squeeze = Squeeze::from_config(&cfg);
        let mut scale = squeeze.original_scale();
        squeeze.start();
        for _ in 0..200 {
            let before = scale;
            assert!(!squeeze.advance(0.1, &mut scale));
            assert!(scale.x <= before.x + 1e-6 && scale.x >= squashed.x - 1e-6);
            assert!(scale.z <= before.z + 1e-6 && scale.z >= squashed.z - 1e-6);
            assert!(scale.y >= before.y - 1e-6 && scale.y <= squashed.y + 1e-6);
        }
        assert!(scale.abs_diff_eq(squashed, 1e-3));
        assert_eq!(squeeze.state(), SqueezeState::Squeezing);
    }

    #[test]
    fn release_eases_back_without_overshoot() {
        let mut squeeze = Squeeze::from_config(&config(1.5));
        let mut scale = squeeze.original_scale();
        squeeze.start();
        squeeze.advance(0.1, &mut scale);
        squeeze.advance(0.1, &mut scale);
        assert!(scale.x < 1.0 && scale.y > 1.0);
        squeeze.end();
        for _ in 0..400 {
            let before = scale;
            squeeze.advance(0.1, &mut scale);
            assert!(scale.x >= before.x - 1e-6 && scale.x <= 1.0 + 1e-6);
            assert!(scale.y <= before.y + 1e-6 && scale.y >= 1.0 - 1e-6);
        }
        assert!(scale.abs_diff_eq(Vec3::ONE, 1e-3));
    }

    #[test]
    fn large_steps_clamp_to_target() {
        let mut squeeze = Squeeze::from_config(&config(1.5));
        let mut scale = Vec3::ONE;
        squeeze.start();
        assert!(squeeze.advance(10.0, &mut scale));
        assert!(scale.abs_diff_eq(Vec3::new(0.1, 2.0, 0.1), 1e-5));
    }

    #[test]
    fn idle_entities_never_pop_and_zero_dt_is_inert() {
        let mut squeeze = Squeeze::from_config(&config(1.5));
        let mut scale = Vec3::splat(0.05);
        assert!(!squeeze.advance(0.1, &mut scale), "shrunken but idle is not a pop");
        squeeze.start();
        let before = scale;
        assert!(!squeeze.advance(0.0, &mut scale));
        assert_eq!(scale, before);
    }

    #[test]
    fn all_rule_needs_every_axis() {
        let cfg = SqueezeConfig {
            squash_scale: Vec3::new(0.1, 2.0, 1.0),
            collapse_rule: CollapseRule::All,
            scale_speed: 100.0,
            ..SqueezeConfig::default()
        };
        let mut squeeze = Squeeze::from_config(&cfg);
        let mut scale = Vec3::ONE;
        squeeze.start();
        assert!(!squeeze.advance(1.0, &mut scale), "z never drops below the threshold");
    }
}
