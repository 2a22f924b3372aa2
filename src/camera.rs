//! Globe camera framing and perspective projection

use crate::geo::{distance_km, Coordinate};
use std::ops::{Add, Mul, Sub};

/// Radius of the rendered globe, in scene units
pub const GLOBE_RADIUS: f64 = 100.0;

/// Vertical field of view of the globe camera, in degrees
pub const FOV_DEG: f64 = 45.0;

const NEAR: f64 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, o: Vec3) -> f64 {
        self.x * o.x + self.y * o.y + self.z * o.z
    }

    pub fn cross(self, o: Vec3) -> Vec3 {
        Vec3::new(
            self.y * o.z - self.z * o.y,
            self.z * o.x - self.x * o.z,
            self.x * o.y - self.y * o.x,
        )
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn normalize(self) -> Vec3 {
        let len = self.length();
        if len == 0.0 {
            self
        } else {
            self * (1.0 / len)
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, o: Vec3) -> Vec3 {
        Vec3::new(self.x + o.x, self.y + o.y, self.z + o.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, o: Vec3) -> Vec3 {
        Vec3::new(self.x - o.x, self.y - o.y, self.z - o.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, s: f64) -> Vec3 {
        Vec3::new(self.x * s, self.y * s, self.z * s)
    }
}

/// Place a coordinate on the globe sphere, `altitude` in globe radii above the surface.
///
/// Y points to the north pole; longitude 0 lies on +Z.
pub fn polar_to_cartesian(coord: Coordinate, altitude: f64) -> Vec3 {
    let phi = (90.0 - coord.lat).to_radians();
    let theta = (90.0 - coord.lng).to_radians();
    let r = GLOBE_RADIUS * (1.0 + altitude);
    Vec3::new(
        r * phi.sin() * theta.cos(),
        r * phi.cos(),
        r * phi.sin() * theta.sin(),
    )
}

/// Zoom heuristic: back away linearly with arc length, never closer than 2 radii
pub fn zoom_factor(distance_km: f64) -> f64 {
    (distance_km / 1000.0 + 1.5).max(2.0)
}

/// Where the globe camera sits and what it looks at
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub target: Vec3,
    pub zoom_factor: f64,
    pub distance_km: f64,
}

impl Default for CameraPose {
    fn default() -> Self {
        let target = polar_to_cartesian(crate::geo::PARIS, 0.0);
        Self {
            position: target * 2.0,
            target,
            zoom_factor: 2.0,
            distance_km: 0.0,
        }
    }
}

/// Frame both endpoints: aim at the projected midpoint, back off by the zoom factor
pub fn frame_camera(origin: Coordinate, dest: Coordinate) -> CameraPose {
    let mid = origin.midpoint(&dest);
    let distance = distance_km(origin, dest);
    let zoom = zoom_factor(distance);
    let center = polar_to_cartesian(mid, 0.0);

    CameraPose {
        position: center * zoom,
        target: center,
        zoom_factor: zoom,
        distance_km: distance,
    }
}

/// A point projected to normalized device coordinates (-1..1, y up)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projected {
    pub x: f64,
    pub y: f64,
    pub depth: f64,
}

impl CameraPose {
    fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let forward = (self.target - self.position).normalize();
        let mut world_up = Vec3::new(0.0, 1.0, 0.0);
        if forward.cross(world_up).length() < 1e-9 {
            world_up = Vec3::new(0.0, 0.0, -1.0);
        }
        let right = forward.cross(world_up).normalize();
        let up = right.cross(forward);
        (forward, right, up)
    }

    /// Perspective-project a scene point; `None` behind the camera
    pub fn project(&self, point: Vec3, aspect: f64) -> Option<Projected> {
        let (forward, right, up) = self.basis();
        let v = point - self.position;
        let depth = v.dot(forward);
        if depth <= NEAR {
            return None;
        }
        let half = (FOV_DEG.to_radians() / 2.0).tan();
        Some(Projected {
            x: v.dot(right) / (depth * half * aspect),
            y: v.dot(up) / (depth * half),
            depth,
        })
    }

    /// True when the globe sphere hides `point` from the camera
    pub fn occluded(&self, point: Vec3) -> bool {
        let d = point - self.position;
        let a = d.dot(d);
        let b = 2.0 * self.position.dot(d);
        let c = self.position.dot(self.position) - GLOBE_RADIUS * GLOBE_RADIUS;
        let disc = b * b - 4.0 * a * c;
        if a == 0.0 || disc < 0.0 {
            return false;
        }
        let t = (-b - disc.sqrt()) / (2.0 * a);
        t > 1e-9 && t < 1.0 - 1e-4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::PARIS;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn zoom_floor_applies_at_zero_distance() {
        assert_eq!(zoom_factor(0.0), 2.0);
        let pose = frame_camera(PARIS, PARIS);
        assert_eq!(pose.zoom_factor, 2.0);
        assert_eq!(pose.distance_km, 0.0);
    }

    #[test]
    fn zoom_grows_linearly() {
        assert!(approx(zoom_factor(3500.0), 5.0));
        assert!(approx(zoom_factor(500.0), 2.0));
        assert!(approx(zoom_factor(10_000.0), 11.5));
    }

    #[test]
    fn equator_prime_meridian_is_on_z() {
        let p = polar_to_cartesian(Coordinate::new(0.0, 0.0), 0.0);
        assert!(approx(p.x, 0.0) && approx(p.y, 0.0) && approx(p.z, GLOBE_RADIUS));
        let pole = polar_to_cartesian(Coordinate::new(90.0, 0.0), 0.0);
        assert!(approx(pole.y, GLOBE_RADIUS));
    }

    #[test]
    fn altitude_scales_radius() {
        let p = polar_to_cartesian(Coordinate::new(12.0, 34.0), 0.2);
        assert!(approx(p.length(), GLOBE_RADIUS * 1.2));
    }

    #[test]
    fn camera_looks_at_unscaled_midpoint() {
        let tokyo = Coordinate::new(35.68, 139.69);
        let pose = frame_camera(PARIS, tokyo);
        let center = polar_to_cartesian(PARIS.midpoint(&tokyo), 0.0);
        assert_eq!(pose.target, center);
        let expected = center * pose.zoom_factor;
        assert!(approx(pose.position.x, expected.x));
        assert!(approx(pose.position.y, expected.y));
        assert!(approx(pose.position.z, expected.z));
        assert!(pose.zoom_factor > 2.0);
    }

    #[test]
    fn target_projects_to_screen_center() {
        let pose = frame_camera(PARIS, Coordinate::new(40.7128, -74.0060));
        let p = pose.project(pose.target, 2.0).expect("target in front of camera");
        assert!(p.x.abs() < 1e-9 && p.y.abs() < 1e-9);
    }

    #[test]
    fn far_side_is_occluded() {
        let pose = frame_camera(PARIS, PARIS);
        assert!(!pose.occluded(pose.target));
        let antipode = polar_to_cartesian(Coordinate::new(-PARIS.lat, PARIS.lng - 180.0), 0.0);
        assert!(pose.occluded(antipode));
    }
}
