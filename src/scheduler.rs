use crate::audio::{AudioCue, AudioCues};
use crate::camera::{Camera3D, ViewRig, Viewport};
use crate::config::{AppConfig, LocomotionConfig};
use crate::ecs::{EntityId, EntitySnapshot};
use crate::effects::{EffectCoordinator, EffectInstance};
use crate::events::SceneEvent;
use crate::gesture::GestureCoordinator;
use crate::hit_test::HitTestResolver;
use crate::input::{Input, InputEvent, SessionMode};
use crate::lifecycle::EntityLifecycleManager;
use crate::placement::Placer;
use crate::source::RecordSource;
use crate::time::FrameClock;
use glam::{Quat, Vec2, Vec3};
use std::sync::Arc;

/// Everything the renderer needs for one frame. Popped entities are already gone.
pub struct FrameView<'a> {
    pub tick: u64,
    pub delta: f32,
    pub mode: SessionMode,
    pub viewpoint: Vec3,
    pub camera: &'a Camera3D,
    pub viewport: Viewport,
    pub rig: &'a ViewRig,
    pub entities: &'a [EntitySnapshot],
    pub effects: &'a [EffectInstance],
}

impl FrameView<'_> {
    pub fn particle_count(&self) -> usize {
        self.effects.iter().map(|effect| effect.particles.len()).sum()
    }

    pub fn visible_labels(&self) -> usize {
        self.entities.iter().filter(|entity| entity.label_visible).count()
    }
}

pub trait FrameRenderer {
    fn draw(&mut self, frame: &FrameView<'_>);
}

/// Renderer for headless sessions: keeps frame statistics and logs them periodically.
pub struct HeadlessRenderer {
    log_every: u64,
    pub frames: u64,
    pub last_entity_count: usize,
    pub last_particle_count: usize,
    pub peak_effects: usize,
}

impl HeadlessRenderer {
    pub fn new(log_every: u64) -> Self {
        Self { log_every, frames: 0, last_entity_count: 0, last_particle_count: 0, peak_effects: 0 }
    }
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::new(60)
    }
}

impl FrameRenderer for HeadlessRenderer {
    fn draw(&mut self, frame: &FrameView<'_>) {
        self.frames += 1;
        self.last_entity_count = frame.entities.len();
        self.last_particle_count = frame.particle_count();
        self.peak_effects = self.peak_effects.max(frame.effects.len());
        if self.log_every > 0 && frame.tick % self.log_every == 0 {
            log::info!(
                "[render] tick={} dt={:.3} entities={} labels={} effects={} particles={}",
                frame.tick,
                frame.delta,
                frame.entities.len(),
                frame.visible_labels(),
                frame.effects.len(),
                self.last_particle_count
            );
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub tick: u64,
    pub delta: f32,
    pub fetched: usize,
    pub gestures: usize,
    pub popped: Vec<EntityId>,
    pub effects_retired: usize,
    pub events: Vec<SceneEvent>,
}

/// Drives one cooperative tick per rendered frame over every subsystem.
pub struct FrameScheduler {
    clock: FrameClock,
    input: Input,
    lifecycle: EntityLifecycleManager,
    effects: EffectCoordinator,
    gestures: GestureCoordinator,
    resolver: HitTestResolver,
    camera: Camera3D,
    viewport: Viewport,
    rig: ViewRig,
    locomotion: LocomotionConfig,
    audio: AudioCues,
    tick_count: u64,
}

impl FrameScheduler {
    pub fn new(config: &AppConfig, source: Arc<dyn RecordSource>, seed: u64) -> Self {
        let cam = &config.camera;
        let camera = Camera3D::new(cam.position, cam.target, cam.fov_y_degrees.to_radians(), cam.near, cam.far);
        Self {
            clock: FrameClock::new(config.frame.max_delta),
            input: Input::new(),
            lifecycle: EntityLifecycleManager::new(config, source, seed),
            effects: EffectCoordinator::new(config.effects.clone(), seed.wrapping_add(1)),
            gestures: GestureCoordinator::new(config.gesture.duplicate_start),
            resolver: HitTestResolver::new(cam.far),
            camera,
            viewport: Viewport::new(cam.viewport.0, cam.viewport.1),
            rig: ViewRig::new(config.rig.position),
            locomotion: config.locomotion.clone(),
            audio: AudioCues::new(config.audio.capacity, config.audio.pop_volume),
            tick_count: 0,
        }
    }

    pub fn with_placer(mut self, placer: Box<dyn Placer>) -> Self {
        self.lifecycle.set_placer(placer);
        self
    }

    pub fn request_initial_population(&mut self) {
        self.lifecycle.request_initial_population();
    }

    pub fn push_input(&mut self, event: InputEvent) {
        self.input.push(event);
    }

    pub fn input(&self) -> &Input {
        &self.input
    }

    /// Tick driven by a host timestamp in seconds.
    pub fn tick(&mut self, now_seconds: f64, renderer: &mut dyn FrameRenderer) -> TickReport {
        let dt = self.clock.advance_to(now_seconds);
        self.run_tick(dt, renderer)
    }

    /// Tick driven by an explicit delta in seconds.
    pub fn step(&mut self, raw_delta: f32, renderer: &mut dyn FrameRenderer) -> TickReport {
        let dt = self.clock.accept(raw_delta);
        self.run_tick(dt, renderer)
    }

    fn run_tick(&mut self, dt: f32, renderer: &mut dyn FrameRenderer) -> TickReport {
        self.tick_count += 1;
        let mut report = TickReport { tick: self.tick_count, delta: dt, ..TickReport::default() };
        report.fetched = self.lifecycle.apply_completed_fetches();

        let mode = self.input.session_mode();
        let viewpoint = self.viewpoint(mode);
        self.lifecycle.scene_mut().run_ambient(dt, viewpoint);

        self.rig.head = self.input.head_orientation().unwrap_or(Quat::IDENTITY);
        let axes = self.input.take_axes();
        if mode == SessionMode::Immersive {
            for (_, sample) in axes {
                self.apply_locomotion(sample, dt);
            }
        }
        let gestures = self.input.take_gestures();
        report.gestures = gestures.len();
        for gesture in gestures {
            let target = self.resolver.target_for(
                gesture.source,
                &self.input,
                &self.camera,
                self.viewport,
                &self.rig,
                self.lifecycle.scene_mut(),
            );
            self.gestures.apply(gesture, target, self.lifecycle.scene_mut());
        }

        let pops = self.lifecycle.scene_mut().run_gestures(dt);
        for pop in pops {
            self.gestures.forget_entity(pop.id);
            self.lifecycle.popped(pop.id, &mut self.effects);
            report.popped.push(pop.id);
        }
        for event in self.lifecycle.drain_events() {
            log::debug!("[scene] {event}");
            self.audio.handle_event(&event);
            report.events.push(event);
        }

        report.effects_retired = self.effects.advance(dt).len();

        let entities = self.lifecycle.scene_mut().snapshot();
        let view = FrameView {
            tick: self.tick_count,
            delta: dt,
            mode,
            viewpoint: self.viewpoint(mode),
            camera: &self.camera,
            viewport: self.viewport,
            rig: &self.rig,
            entities: &entities,
            effects: self.effects.active(),
        };
        renderer.draw(&view);
        report
    }

    fn viewpoint(&self, mode: SessionMode) -> Vec3 {
        match mode {
            SessionMode::Immersive => self.rig.position,
            SessionMode::Desktop => self.camera.position,
        }
    }

    /// Thumbstick x turns the rig, y moves it along the head's facing.
    fn apply_locomotion(&mut self, axes: Vec2, dt: f32) {
        let dead_zone = self.locomotion.dead_zone;
        if axes.x.abs() > dead_zone {
            self.rig.yaw(-axes.x * self.locomotion.turn_speed * dt);
        }
        if axes.y.abs() > dead_zone {
            self.rig.advance(axes.y * self.locomotion.move_speed * dt);
        }
    }

    /// Removes every entity and forgets every gesture owner.
    pub fn clear_scene(&mut self) {
        self.gestures.clear();
        self.lifecycle.clear();
    }

    pub fn take_audio_cues(&mut self) -> Vec<AudioCue> {
        self.audio.take_cues()
    }

    pub fn lifecycle(&self) -> &EntityLifecycleManager {
        &self.lifecycle
    }

    pub fn lifecycle_mut(&mut self) -> &mut EntityLifecycleManager {
        &mut self.lifecycle
    }

    pub fn effects(&self) -> &EffectCoordinator {
        &self.effects
    }

    pub fn gestures(&self) -> &GestureCoordinator {
        &self.gestures
    }

    pub fn camera(&self) -> &Camera3D {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera3D {
        &mut self.camera
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn rig(&self) -> &ViewRig {
        &self.rig
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}
