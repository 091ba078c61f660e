use crate::ecs::ProxyShape;
use glam::{EulerRot, Quat, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::f32::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub translation: Vec3,
    pub rotation: Quat,
    pub shape: ProxyShape,
}

impl Placement {
    pub fn at(translation: Vec3, shape: ProxyShape) -> Self {
        Self { translation, rotation: Quat::IDENTITY, shape }
    }
}

/// Chooses where a newly ingested entity appears.
pub trait Placer: Send {
    fn place(&mut self) -> Placement;
}

/// Uniform position inside a cube of half-size `extent`, random orientation and shape.
pub struct RandomPlacer {
    rng: StdRng,
    extent: f32,
}

impl RandomPlacer {
    pub fn new(seed: u64, extent: f32) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), extent: extent.abs() }
    }
}

impl Placer for RandomPlacer {
    fn place(&mut self) -> Placement {
        let extent = self.extent;
        let coord = |rng: &mut StdRng| if extent > 0.0 { rng.gen_range(-extent..=extent) } else { 0.0 };
        let translation = Vec3::new(coord(&mut self.rng), coord(&mut self.rng), coord(&mut self.rng));
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rng.gen_range(0.0..TAU),
            self.rng.gen_range(0.0..TAU),
            self.rng.gen_range(0.0..TAU),
        );
        let shape = ProxyShape::ALL[self.rng.gen_range(0..ProxyShape::ALL.len())];
        Placement { translation, rotation, shape }
    }
}

/// Hands out scripted placements in order, then falls back to `fallback`.
pub struct QueuedPlacer {
    queue: VecDeque<Placement>,
    fallback: Placement,
}

impl QueuedPlacer {
    pub fn new(placements: impl IntoIterator<Item = Placement>) -> Self {
        Self { queue: placements.into_iter().collect(), fallback: Placement::at(Vec3::ZERO, ProxyShape::Box) }
    }

    pub fn with_fallback(mut self, fallback: Placement) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn push(&mut self, placement: Placement) {
        self.queue.push_back(placement);
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl Placer for QueuedPlacer {
    fn place(&mut self) -> Placement {
        self.queue.pop_front().unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_placements_stay_inside_extent() {
        let mut placer = RandomPlacer::new(11, 5.0);
        for _ in 0..64 {
            let placement = placer.place();
            assert!(placement.translation.abs().max_element() <= 5.0);
            assert!(placement.rotation.is_normalized());
        }
    }

    #[test]
    fn queued_placer_falls_back_when_drained() {
        let first = Placement::at(Vec3::new(1.0, 2.0, 3.0), ProxyShape::Cone);
        let fallback = Placement::at(Vec3::splat(9.0), ProxyShape::Sphere);
        let mut placer = QueuedPlacer::new([first]).with_fallback(fallback);
        assert_eq!(placer.place(), first);
        assert_eq!(placer.place(), fallback);
        assert_eq!(placer.remaining(), 0);
    }
}
