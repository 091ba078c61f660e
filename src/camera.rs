use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

const DEFAULT_UP: Vec3 = Vec3::Y;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f32 {
        if self.height > 0 {
            self.width as f32 / self.height as f32
        } else {
            1.0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Builds a ray with a normalized direction; degenerate or non-finite input yields `None`.
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        if !origin.is_finite() || !direction.is_finite() {
            return None;
        }
        let direction = direction.normalize_or_zero();
        if direction.length_squared() <= f32::EPSILON {
            return None;
        }
        Some(Self { origin, direction })
    }
}

/// Desktop perspective camera.
#[derive(Debug, Clone)]
pub struct Camera3D {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_radians: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera3D {
    pub fn new(position: Vec3, target: Vec3, fov_y_radians: f32, near: f32, far: f32) -> Self {
        Self { position, target, up: DEFAULT_UP, fov_y_radians, near, far }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y_radians, aspect.max(0.0001), self.near, self.far)
    }

    pub fn view_projection(&self, viewport: Viewport) -> Mat4 {
        self.projection_matrix(viewport.aspect()) * self.view_matrix()
    }

    /// Generates a world-space ray originating from the camera through a screen-space position.
    pub fn screen_ray(&self, screen: Vec2, viewport: Viewport) -> Option<Ray> {
        if viewport.is_empty() || !screen.is_finite() {
            return None;
        }
        let ndc_x = (2.0 * screen.x / viewport.width as f32) - 1.0;
        let ndc_y = 1.0 - (2.0 * screen.y / viewport.height as f32);
        let clip = Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
        let inv_view_proj = self.view_projection(viewport).inverse();
        let world = inv_view_proj * clip;
        if world.w.abs() < f32::EPSILON {
            return None;
        }
        let world_pos = (world.truncate() / world.w) - self.position;
        Ray::new(self.position, world_pos)
    }
}

/// Tracked device pose (controller or head), relative to the view rig.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DevicePose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for DevicePose {
    fn default() -> Self {
        Self { position: Vec3::ZERO, rotation: Quat::IDENTITY }
    }
}

impl DevicePose {
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite()
    }

    /// Pose aimed from `position` toward `target`, both in rig space.
    pub fn aimed_at(position: Vec3, target: Vec3) -> Self {
        let dir = (target - position).normalize_or_zero();
        let rotation = if dir.length_squared() > f32::EPSILON {
            Quat::from_rotation_arc(Vec3::NEG_Z, dir)
        } else {
            Quat::IDENTITY
        };
        Self { position, rotation }
    }
}

/// Immersive-session camera group: tracked devices are parented to it and thumbstick
/// locomotion moves it.
#[derive(Debug, Clone)]
pub struct ViewRig {
    pub position: Vec3,
    pub rotation: Quat,
    pub head: Quat,
}

impl ViewRig {
    pub fn new(position: Vec3) -> Self {
        Self { position, rotation: Quat::IDENTITY, head: Quat::IDENTITY }
    }

    pub fn transform(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }

    /// World-space pointing ray of a device: the pose's -Z axis.
    pub fn device_ray(&self, pose: &DevicePose) -> Option<Ray> {
        if !pose.is_finite() {
            return None;
        }
        let origin = self.position + self.rotation * pose.position;
        let direction = self.rotation * (pose.rotation * Vec3::NEG_Z);
        Ray::new(origin, direction)
    }

    pub fn yaw(&mut self, radians: f32) {
        self.rotation = (self.rotation * Quat::from_rotation_y(radians)).normalize();
    }

    /// Moves along the head's backward axis (+Z), matching thumbstick-forward = negative y.
    pub fn advance(&mut self, amount: f32) {
        let direction = self.rotation * (self.head * Vec3::Z);
        self.position += direction * amount;
    }
}
