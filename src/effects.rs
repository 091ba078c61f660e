use crate::config::EffectConfig;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

/// Anything that can start a pop effect at a world position.
pub trait EffectSpawner {
    /// Returns the new effect's id, or `None` when the origin is unusable.
    fn spawn(&mut self, origin: Vec3) -> Option<u64>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    pub color: Vec3,
    pub size: f32,
}

#[derive(Debug, Clone)]
pub struct EffectInstance {
    pub id: u64,
    pub origin: Vec3,
    pub particles: Vec<Particle>,
    pub elapsed: f32,
    pub lifespan: f32,
    pub active: bool,
}

impl EffectInstance {
    /// One frame of ballistic motion. Positions are committed only when every particle stays
    /// finite; the clock runs regardless so a corrupted burst still retires.
    fn step(&mut self, dt: f32, gravity: f32, scratch: &mut Vec<Vec3>) {
        self.elapsed += dt;
        scratch.clear();
        scratch.extend(self.particles.iter().map(|p| p.position + p.velocity * dt));
        if scratch.iter().all(|p| p.is_finite()) {
            for (particle, next) in self.particles.iter_mut().zip(scratch.iter()) {
                particle.position = *next;
                particle.velocity.y -= gravity * dt;
            }
        } else {
            log::warn!("[effects] effect {} produced non-finite positions; skipping motion", self.id);
        }
        if self.elapsed > self.lifespan {
            self.active = false;
        }
    }
}

/// Owns every live pop effect and retires them once their lifespan has passed.
pub struct EffectCoordinator {
    config: EffectConfig,
    rng: StdRng,
    instances: Vec<EffectInstance>,
    next_id: u64,
    scratch: Vec<Vec3>,
    spawned_total: u64,
    retired_total: u64,
}

impl EffectCoordinator {
    pub fn new(config: EffectConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            instances: Vec::new(),
            next_id: 1,
            scratch: Vec::new(),
            spawned_total: 0,
            retired_total: 0,
        }
    }

    fn burst(&mut self, origin: Vec3) -> Vec<Particle> {
        let cfg = &self.config;
        let (speed_lo, speed_hi) = ordered(cfg.speed_min, cfg.speed_max);
        let (vert_lo, vert_hi) = ordered(cfg.vertical_min, cfg.vertical_max);
        let size_max = cfg.size_max.max(0.0);
        let rng = &mut self.rng;
        (0..cfg.particle_count)
            .map(|_| {
                let angle = rng.gen_range(0.0..TAU);
                let speed = sample(rng, speed_lo, speed_hi);
                let velocity = Vec3::new(angle.cos() * speed, angle.sin() * speed, sample(rng, vert_lo, vert_hi));
                Particle {
                    position: origin,
                    velocity,
                    color: Vec3::new(rng.gen(), rng.gen(), rng.gen()),
                    size: sample(rng, 0.0, size_max),
                }
            })
            .collect()
    }

    /// Steps every effect by `dt` and returns the ids retired this tick.
    pub fn advance(&mut self, dt: f32) -> Vec<u64> {
        if !dt.is_finite() || dt <= 0.0 {
            return Vec::new();
        }
        let gravity = self.config.gravity;
        for instance in &mut self.instances {
            instance.step(dt, gravity, &mut self.scratch);
        }
        let mut retired = Vec::new();
        self.instances.retain(|instance| {
            if !instance.active {
                retired.push(instance.id);
            }
            instance.active
        });
        self.retired_total += retired.len() as u64;
        if !retired.is_empty() {
            log::debug!("[effects] retired {} effect(s); {} active", retired.len(), self.instances.len());
        }
        retired
    }

    pub fn active(&self) -> &[EffectInstance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&EffectInstance> {
        self.instances.iter().find(|instance| instance.id == id)
    }

    pub fn spawned_total(&self) -> u64 {
        self.spawned_total
    }

    pub fn retired_total(&self) -> u64 {
        self.retired_total
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }
}

impl EffectSpawner for EffectCoordinator {
    fn spawn(&mut self, origin: Vec3) -> Option<u64> {
        if !origin.is_finite() {
            log::warn!("[effects] refusing effect at non-finite origin {origin}");
            return None;
        }
        let particles = self.burst(origin);
        let id = self.next_id;
        self.next_id += 1;
        self.spawned_total += 1;
        self.instances.push(EffectInstance {
            id,
            origin,
            particles,
            elapsed: 0.0,
            lifespan: self.config.lifespan,
            active: true,
        });
        Some(id)
    }
}

fn ordered(a: f32, b: f32) -> (f32, f32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn sample(rng: &mut StdRng, lo: f32, hi: f32) -> f32 {
    if hi > lo {
        rng.gen_range(lo..hi)
    } else {
        lo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> EffectCoordinator {
        EffectCoordinator::new(EffectConfig::default(), 3)
    }

    #[test]
    fn burst_matches_configured_ranges() {
        let mut effects = coordinator();
        let id = effects.spawn(Vec3::new(1.0, 2.0, 3.0)).expect("spawned");
        let instance = effects.get(id).expect("instance");
        assert_eq!(instance.particles.len(), 100);
        for particle in &instance.particles {
            assert_eq!(particle.position, Vec3::new(1.0, 2.0, 3.0));
            let planar = particle.velocity.truncate().length();
            assert!((2.0 - 1e-4..4.0 + 1e-4).contains(&planar));
            assert!((-1.0..1.0).contains(&particle.velocity.z));
            assert!(particle.size < 0.1);
        }
    }

    #[test]
    fn effect_retires_after_lifespan_is_exceeded() {
        let mut effects = coordinator();
        let id = effects.spawn(Vec3::ZERO).expect("spawned");
        for _ in 0..8 {
            assert!(effects.advance(0.25).is_empty());
        }
        assert!(effects.get(id).is_some(), "elapsed == lifespan is still live");
        assert_eq!(effects.advance(0.25), vec![id]);
        assert!(effects.is_empty());
        assert_eq!(effects.retired_total(), 1);
    }

    #[test]
    fn gravity_applies_after_motion() {
        let mut effects = coordinator();
        let id = effects.spawn(Vec3::ZERO).expect("spawned");
        let before = effects.get(id).expect("instance").particles[0];
        effects.advance(0.5);
        let after = effects.get(id).expect("instance").particles[0];
        assert!(after.position.abs_diff_eq(before.velocity * 0.5, 1e-5));
        assert!((after.velocity.y - (before.velocity.y - 0.981 * 0.5)).abs() < 1e-5);
    }

    #[test]
    fn zero_delta_is_a_no_op() {
        let mut effects = coordinator();
        let id = effects.spawn(Vec3::ZERO).expect("spawned");
        effects.advance(0.0);
        assert_eq!(effects.get(id).expect("instance").elapsed, 0.0);
    }

    #[test]
    fn corrupted_particles_freeze_but_still_retire() {
        let mut effects = coordinator();
        let id = effects.spawn(Vec3::ZERO).expect("spawned");
        effects.instances[0].particles[3].velocity = Vec3::new(f32::INFINITY, 0.0, 0.0);
        let snapshot = effects.get(id).expect("instance").particles[0];
        effects.advance(1.0);
        assert_eq!(effects.get(id).expect("instance").particles[0], snapshot);
        effects.advance(1.5);
        assert!(effects.get(id).is_none());
        assert!(effects.spawn(Vec3::new(f32::NAN, 0.0, 0.0)).is_none());
    }
}
