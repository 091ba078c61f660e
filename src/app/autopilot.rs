use crate::camera::DevicePose;
use crate::ecs::EntityId;
use crate::input::{InputEvent, InputSource};
use crate::scheduler::FrameScheduler;

/// Scripted controller for headless sessions: aims one controller at the nearest entity,
/// reveals its label and squeezes until it pops, then moves on.
pub struct Autopilot {
    controller: u8,
    target: Option<EntityId>,
    pending_grab: bool,
    engaged: u64,
}

impl Autopilot {
    pub fn new(controller: u8) -> Self {
        Self { controller, target: None, pending_grab: false, engaged: 0 }
    }

    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Number of entities the autopilot has grabbed so far.
    pub fn engaged(&self) -> u64 {
        self.engaged
    }

    /// Queues this frame's controller input. Call before each tick.
    pub fn drive(&mut self, scheduler: &mut FrameScheduler) {
        let source = InputSource::Controller(self.controller);
        if self.pending_grab {
            self.pending_grab = false;
            match scheduler.gestures().target_of(source) {
                Some(grabbed) => self.target = Some(grabbed),
                None => self.release(scheduler),
            }
        }
        if let Some(target) = self.target {
            if !scheduler.lifecycle().contains(target) {
                self.release(scheduler);
            }
        }
        if self.target.is_none() {
            let Some(next) = Self::nearest(scheduler) else {
                return;
            };
            self.aim(scheduler, next);
            let index = self.controller;
            scheduler.push_input(InputEvent::ControllerSelect { index, pressed: true });
            scheduler.push_input(InputEvent::ControllerSelect { index, pressed: false });
            scheduler.push_input(InputEvent::ControllerSqueeze { index, pressed: true });
            self.target = Some(next);
            self.pending_grab = true;
            self.engaged += 1;
            log::debug!("[autopilot] controller-{index} squeezing {next}");
        } else if let Some(target) = self.target {
            self.aim(scheduler, target);
        }
    }

    fn release(&mut self, scheduler: &mut FrameScheduler) {
        if self.target.take().is_some() {
            scheduler.push_input(InputEvent::ControllerSqueeze { index: self.controller, pressed: false });
        }
    }

    fn aim(&self, scheduler: &mut FrameScheduler, target: EntityId) {
        let Some(world) = scheduler.lifecycle().scene().world_position(target) else {
            return;
        };
        let rig = scheduler.rig();
        let local = rig.rotation.inverse() * (world - rig.position);
        let pose = DevicePose::aimed_at(glam::Vec3::ZERO, local);
        scheduler.push_input(InputEvent::ControllerPose { index: self.controller, pose });
    }

    fn nearest(scheduler: &FrameScheduler) -> Option<EntityId> {
        let scene = scheduler.lifecycle().scene();
        let origin = scheduler.rig().position;
        scene
            .record_ids()
            .into_iter()
            .filter_map(|id| scene.world_position(id).map(|pos| (id, pos.distance_squared(origin))))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }
}
