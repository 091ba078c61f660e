use anyhow::{Context, Result};
use glam::Vec3;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct FrameConfig {
    #[serde(default = "FrameConfig::default_max_delta")]
    pub max_delta: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PopulationConfig {
    #[serde(default = "PopulationConfig::default_spawn_extent")]
    pub spawn_extent: f32,
    #[serde(default = "PopulationConfig::default_label_offset")]
    pub label_offset: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn component(self, v: Vec3) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CollapseRule {
    #[default]
    Any,
    All,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SqueezeConfig {
    #[serde(default = "SqueezeConfig::default_original_scale")]
    pub original_scale: Vec3,
    #[serde(default = "SqueezeConfig::default_squash_scale")]
    pub squash_scale: Vec3,
    #[serde(default = "SqueezeConfig::default_scale_speed")]
    pub scale_speed: f32,
    #[serde(default = "SqueezeConfig::default_collapse_threshold")]
    pub collapse_threshold: f32,
    #[serde(default = "SqueezeConfig::default_collapse_axes")]
    pub collapse_axes: Vec<Axis>,
    #[serde(default)]
    pub collapse_rule: CollapseRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateStartPolicy {
    #[default]
    Ignore,
    Rearm,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct GestureConfig {
    #[serde(default)]
    pub duplicate_start: DuplicateStartPolicy,
}

/// Ambient rotation rates, radians per second.
#[derive(Debug, Clone, Deserialize)]
pub struct SpinConfig {
    #[serde(default = "SpinConfig::default_root_speed")]
    pub root_speed: f32,
    #[serde(default = "SpinConfig::default_entity_speed")]
    pub entity_speed: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocomotionConfig {
    #[serde(default = "LocomotionConfig::default_dead_zone")]
    pub dead_zone: f32,
    #[serde(default = "LocomotionConfig::default_move_speed")]
    pub move_speed: f32,
    #[serde(default = "LocomotionConfig::default_turn_speed")]
    pub turn_speed: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EffectConfig {
    #[serde(default = "EffectConfig::default_particle_count")]
    pub particle_count: usize,
    #[serde(default = "EffectConfig::default_lifespan")]
    pub lifespan: f32,
    #[serde(default = "EffectConfig::default_speed_min")]
    pub speed_min: f32,
    #[serde(default = "EffectConfig::default_speed_max")]
    pub speed_max: f32,
    #[serde(default = "EffectConfig::default_vertical_min")]
    pub vertical_min: f32,
    #[serde(default = "EffectConfig::default_vertical_max")]
    pub vertical_max: f32,
    #[serde(default = "EffectConfig::default_gravity")]
    pub gravity: f32,
    #[serde(default = "EffectConfig::default_size_max")]
    pub size_max: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Worker threads servicing record fetches; `0` runs fetches inline on submission.
    #[serde(default = "FetchConfig::default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "FetchConfig::default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "FetchConfig::default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "CameraConfig::default_position")]
    pub position: Vec3,
    #[serde(default)]
    pub target: Vec3,
    #[serde(default = "CameraConfig::default_fov_y_degrees")]
    pub fov_y_degrees: f32,
    #[serde(default = "CameraConfig::default_near")]
    pub near: f32,
    #[serde(default = "CameraConfig::default_far")]
    pub far: f32,
    #[serde(default = "CameraConfig::default_viewport")]
    pub viewport: (u32, u32),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RigConfig {
    #[serde(default = "RigConfig::default_position")]
    pub position: Vec3,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "AudioConfig::default_pop_volume")]
    pub pop_volume: f32,
    #[serde(default = "AudioConfig::default_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub frame: FrameConfig,
    #[serde(default)]
    pub population: PopulationConfig,
    #[serde(default)]
    pub squeeze: SqueezeConfig,
    #[serde(default)]
    pub gesture: GestureConfig,
    #[serde(default)]
    pub spin: SpinConfig,
    #[serde(default)]
    pub locomotion: LocomotionConfig,
    #[serde(default)]
    pub effects: EffectConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub rig: RigConfig,
    #[serde(default)]
    pub audio: AudioConfig,
}

#[derive(Debug, Clone, Default)]
pub struct AppConfigOverrides {
    pub max_retries: Option<u32>,
}

impl FrameConfig {
    const fn default_max_delta() -> f32 {
        0.25
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self { max_delta: Self::default_max_delta() }
    }
}

impl PopulationConfig {
    const fn default_spawn_extent() -> f32 {
        5.0
    }

    fn default_label_offset() -> Vec3 {
        Vec3::new(0.0, 1.0, 0.0)
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self { spawn_extent: Self::default_spawn_extent(), label_offset: Self::default_label_offset() }
    }
}

impl SqueezeConfig {
    fn default_original_scale() -> Vec3 {
        Vec3::ONE
    }

    fn default_squash_scale() -> Vec3 {
        Vec3::new(0.1, 2.0, 0.1)
    }

    const fn default_scale_speed() -> f32 {
        1.5
    }

    const fn default_collapse_threshold() -> f32 {
        0.2
    }

    fn default_collapse_axes() -> Vec<Axis> {
        vec![Axis::X, Axis::Z]
    }
}

impl Default for SqueezeConfig {
    fn default() -> Self {
        Self {
            original_scale: Self::default_original_scale(),
            squash_scale: Self::default_squash_scale(),
            scale_speed: Self::default_scale_speed(),
            collapse_threshold: Self::default_collapse_threshold(),
            collapse_axes: Self::default_collapse_axes(),
            collapse_rule: CollapseRule::default(),
        }
    }
}

impl SpinConfig {
    const fn default_root_speed() -> f32 {
        0.12
    }

    const fn default_entity_speed() -> f32 {
        0.24
    }
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self { root_speed: Self::default_root_speed(), entity_speed: Self::default_entity_speed() }
    }
}

impl LocomotionConfig {
    const fn default_dead_zone() -> f32 {
        0.1
    }

    const fn default_move_speed() -> f32 {
        6.0
    }

    const fn default_turn_speed() -> f32 {
        1.2
    }
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            dead_zone: Self::default_dead_zone(),
            move_speed: Self::default_move_speed(),
            turn_speed: Self::default_turn_speed(),
        }
    }
}

impl EffectConfig {
    const fn default_particle_count() -> usize {
        100
    }

    const fn default_lifespan() -> f32 {
        2.0
    }

    const fn default_speed_min() -> f32 {
        2.0
    }

    const fn default_speed_max() -> f32 {
        4.0
    }

    const fn default_vertical_min() -> f32 {
        -1.0
    }

    const fn default_vertical_max() -> f32 {
        1.0
    }

    const fn default_gravity() -> f32 {
        0.981
    }

    const fn default_size_max() -> f32 {
        0.1
    }
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            particle_count: Self::default_particle_count(),
            lifespan: Self::default_lifespan(),
            speed_min: Self::default_speed_min(),
            speed_max: Self::default_speed_max(),
            vertical_min: Self::default_vertical_min(),
            vertical_max: Self::default_vertical_max(),
            gravity: Self::default_gravity(),
            size_max: Self::default_size_max(),
        }
    }
}

impl FetchConfig {
    const fn default_workers() -> usize {
        2
    }

    const fn default_retry_delay_ms() -> u64 {
        250
    }

    const fn default_batch_size() -> usize {
        5
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            workers: Self::default_workers(),
            max_retries: 0,
            retry_delay_ms: Self::default_retry_delay_ms(),
            batch_size: Self::default_batch_size(),
        }
    }
}

impl CameraConfig {
    fn default_position() -> Vec3 {
        Vec3::new(10.0, 5.0, 10.0)
    }

    const fn default_fov_y_degrees() -> f32 {
        70.0
    }

    const fn default_near() -> f32 {
        0.1
    }

    const fn default_far() -> f32 {
        1000.0
    }

    const fn default_viewport() -> (u32, u32) {
        (1280, 720)
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Self::default_position(),
            target: Vec3::ZERO,
            fov_y_degrees: Self::default_fov_y_degrees(),
            near: Self::default_near(),
            far: Self::default_far(),
            viewport: Self::default_viewport(),
        }
    }
}

impl RigConfig {
    fn default_position() -> Vec3 {
        Vec3::new(10.0, 5.0, 10.0)
    }
}

impl Default for RigConfig {
    fn default() -> Self {
        Self { position: Self::default_position() }
    }
}

impl AudioConfig {
    const fn default_pop_volume() -> f32 {
        0.5
    }

    const fn default_capacity() -> usize {
        32
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { pop_volume: Self::default_pop_volume(), capacity: Self::default_capacity() }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!("[config] {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &AppConfigOverrides) {
        if let Some(max_retries) = overrides.max_retries {
            self.fetch.max_retries = max_retries;
        }
    }
}

impl AppConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.max_retries.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg: AppConfig = serde_json::from_str("{}").expect("parse empty config");
        assert_eq!(cfg.squeeze.squash_scale, Vec3::new(0.1, 2.0, 0.1));
        assert_eq!(cfg.squeeze.collapse_axes, vec![Axis::X, Axis::Z]);
        assert_eq!(cfg.squeeze.collapse_rule, CollapseRule::Any);
        assert_eq!(cfg.gesture.duplicate_start, DuplicateStartPolicy::Ignore);
        assert_eq!(cfg.fetch.max_retries, 0);
        assert_eq!(cfg.effects.particle_count, 100);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let cfg: AppConfig = serde_json::from_str(
            r#"{"squeeze":{"scale_speed":3.0,"collapse_rule":"all"},"gesture":{"duplicate_start":"rearm"}}"#,
        )
        .expect("parse partial config");
        assert_eq!(cfg.squeeze.scale_speed, 3.0);
        assert_eq!(cfg.squeeze.collapse_rule, CollapseRule::All);
        assert_eq!(cfg.squeeze.collapse_threshold, 0.2);
        assert_eq!(cfg.gesture.duplicate_start, DuplicateStartPolicy::Rearm);
    }

    #[test]
    fn overrides_replace_retry_budget() {
        let mut cfg = AppConfig::default();
        let overrides = AppConfigOverrides { max_retries: Some(3) };
        assert!(!overrides.is_empty());
        cfg.apply_overrides(&overrides);
        assert_eq!(cfg.fetch.max_retries, 3);
    }
}
