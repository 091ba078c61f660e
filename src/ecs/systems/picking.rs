use crate::ecs::types::{ProxyBounds, ProxyShape};
use glam::{Mat4, Vec3};

/// Smallest axis scale a proxy may collapse to before it stops being pickable.
const MIN_PICK_SCALE: f32 = 0.0001;

pub fn ray_sphere_intersection(origin: Vec3, dir: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = origin - center;
    let b = oc.dot(dir);
    let c = oc.length_squared() - radius * radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrt_d = discriminant.sqrt();
    let mut t = -b - sqrt_d;
    if t < 0.0 {
        t = -b + sqrt_d;
    }
    if t < 0.0 {
        return None;
    }
    Some(t)
}

/// Distance along `dir` to the proxy of `shape` placed by `world`.
pub fn ray_hit_proxy(origin: Vec3, dir: Vec3, world: &Mat4, shape: ProxyShape) -> Option<f32> {
    let bounds = shape.bounds();
    match shape {
        ProxyShape::Box => ray_hit_obb(origin, dir, world, &bounds),
        ProxyShape::Sphere => ray_hit_ellipsoid(origin, dir, world, &bounds),
        ProxyShape::Cylinder => ray_hit_cylinder(origin, dir, world, &bounds),
        ProxyShape::Cone => ray_hit_cone(origin, dir, world, &bounds),
    }
}

pub fn ray_hit_obb(origin: Vec3, dir: Vec3, world: &Mat4, bounds: &ProxyBounds) -> Option<f32> {
    let (origin_local, dir_local) = to_local(origin, dir, world)?;
    let (t_local, hit_local) = ray_aabb_intersection(origin_local, dir_local, bounds.min, bounds.max)?;
    if t_local < 0.0 {
        return None;
    }
    let hit_world = world.transform_point3(hit_local);
    Some((hit_world - origin).length())
}

/// Ellipsoid inscribed in `bounds`, tested as a unit sphere after normalizing the local frame.
pub fn ray_hit_ellipsoid(origin: Vec3, dir: Vec3, world: &Mat4, bounds: &ProxyBounds) -> Option<f32> {
    let frame = UnitFrame::new(origin, dir, world, bounds)?;
    let t = ray_sphere_intersection(frame.origin, frame.dir, Vec3::ZERO, 1.0)?;
    Some(frame.world_distance(t))
}

/// Capped cylinder along local Y inscribed in `bounds`.
pub fn ray_hit_cylinder(origin: Vec3, dir: Vec3, world: &Mat4, bounds: &ProxyBounds) -> Option<f32> {
    let frame = UnitFrame::new(origin, dir, world, bounds)?;
    let (o, d) = (frame.origin, frame.dir);
    let side = quadratic_roots(d.x * d.x + d.z * d.z, 2.0 * (o.x * d.x + o.z * d.z), o.x * o.x + o.z * o.z - 1.0)
        .into_iter()
        .flatten()
        .filter(|t| (o.y + d.y * t).abs() <= 1.0);
    let caps = [-1.0, 1.0].into_iter().filter_map(|y| cap_hit(o, d, y, 1.0));
    let t = nearest_non_negative(side.chain(caps))?;
    Some(frame.world_distance(t))
}

/// Cone inscribed in `bounds`: full radius at the base (min Y), apex at max Y.
pub fn ray_hit_cone(origin: Vec3, dir: Vec3, world: &Mat4, bounds: &ProxyBounds) -> Option<f32> {
    let frame = UnitFrame::new(origin, dir, world, bounds)?;
    let (o, d) = (frame.origin, frame.dir);
    // Radius at unit height y is (1 - y) / 2.
    let w = 1.0 - o.y;
    let a = d.x * d.x + d.z * d.z - d.y * d.y * 0.25;
    let b = 2.0 * (o.x * d.x + o.z * d.z) + w * d.y * 0.5;
    let c = o.x * o.x + o.z * o.z - w * w * 0.25;
    let side = quadratic_roots(a, b, c).into_iter().flatten().filter(|t| (o.y + d.y * t).abs() <= 1.0);
    let base = cap_hit(o, d, -1.0, 1.0);
    let t = nearest_non_negative(side.chain(base))?;
    Some(frame.world_distance(t))
}

/// Ray expressed in a frame where `bounds` maps onto the cube `[-1, 1]^3`.
struct UnitFrame {
    origin: Vec3,
    dir: Vec3,
    radii: Vec3,
    center: Vec3,
    world: Mat4,
    world_origin: Vec3,
}

impl UnitFrame {
    fn new(origin: Vec3, dir: Vec3, world: &Mat4, bounds: &ProxyBounds) -> Option<Self> {
        let (origin_local, dir_local) = to_local(origin, dir, world)?;
        let radii = bounds.half_extents().max(Vec3::splat(MIN_PICK_SCALE));
        let center = bounds.center();
        let dir_unit = dir_local / radii;
        if dir_unit.length_squared() <= f32::EPSILON {
            return None;
        }
        Some(Self {
            origin: (origin_local - center) / radii,
            dir: dir_unit.normalize(),
            radii,
            center,
            world: *world,
            world_origin: origin,
        })
    }

    fn world_distance(&self, t: f32) -> f32 {
        let hit_local = (self.origin + self.dir * t) * self.radii + self.center;
        (self.world.transform_point3(hit_local) - self.world_origin).length()
    }
}

fn quadratic_roots(a: f32, b: f32, c: f32) -> [Option<f32>; 2] {
    if a.abs() <= f32::EPSILON {
        if b.abs() <= f32::EPSILON {
            return [None, None];
        }
        return [Some(-c / b), None];
    }
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return [None, None];
    }
    let sqrt_d = discriminant.sqrt();
    [Some((-b - sqrt_d) / (2.0 * a)), Some((-b + sqrt_d) / (2.0 * a))]
}

/// Crossing of the plane `y = height` within `radius` of the Y axis.
fn cap_hit(o: Vec3, d: Vec3, height: f32, radius: f32) -> Option<f32> {
    if d.y.abs() <= f32::EPSILON {
        return None;
    }
    let t = (height - o.y) / d.y;
    let x = o.x + d.x * t;
    let z = o.z + d.z * t;
    (x * x + z * z <= radius * radius).then_some(t)
}

fn nearest_non_negative(candidates: impl Iterator<Item = f32>) -> Option<f32> {
    candidates.filter(|t| t.is_finite() && *t >= 0.0).min_by(|a, b| a.total_cmp(b))
}

fn to_local(origin: Vec3, dir: Vec3, world: &Mat4) -> Option<(Vec3, Vec3)> {
    if !matrix_is_finite(world) || !origin.is_finite() || !dir.is_finite() {
        return None;
    }
    let axis_scale = Vec3::new(
        world.x_axis.truncate().length(),
        world.y_axis.truncate().length(),
        world.z_axis.truncate().length(),
    );
    if axis_scale.min_element() < MIN_PICK_SCALE {
        return None;
    }
    let inv = world.inverse();
    if !matrix_is_finite(&inv) {
        return None;
    }
    let origin_local = inv.transform_point3(origin);
    let dir_local = inv.transform_vector3(dir);
    if dir_local.length_squared() <= f32::EPSILON {
        return None;
    }
    Some((origin_local, dir_local.normalize()))
}

pub fn matrix_is_finite(mat: &Mat4) -> bool {
    mat.to_cols_array().iter().all(|v| v.is_finite())
}

pub fn ray_aabb_intersection(origin: Vec3, dir: Vec3, min: Vec3, max: Vec3) -> Option<(f32, Vec3)> {
    let mut t_min: f32 = 0.0;
    let mut t_max: f32 = f32::INFINITY;
    let origin_arr = origin.to_array();
    let dir_arr = dir.to_array();
    let min_arr = min.to_array();
    let max_arr = max.to_array();
    for i in 0..3 {
        let o = origin_arr[i];
        let d = dir_arr[i];
        if d.abs() < 1e-6 {
            if o < min_arr[i] || o > max_arr[i] {
                return None;
            }
        } else {
            let inv_d = 1.0 / d;
            let mut t1 = (min_arr[i] - o) * inv_d;
            let mut t2 = (max_arr[i] - o) * inv_d;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
    }
    if t_max < 0.0 {
        return None;
    }
    let t_hit = if t_min >= 0.0 { t_min } else { t_max };
    Some((t_hit, origin + dir * t_hit))
}
