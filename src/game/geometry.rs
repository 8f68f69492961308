//! Vector math and ray/segment intersection primitives
//!
//! Pure functions, no shared state. Both authoritative collision detection
//! and client hit-claim re-validation go through `intersect_segment_sphere`
//! so one routine defines the physics ground truth.

use serde::{Deserialize, Serialize};

/// 3D vector, also used as a wire type for positions and directions
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn add(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(self, scalar: f32) -> Vec3 {
        Vec3::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn distance(self, other: Vec3) -> f32 {
        self.sub(other).length()
    }

    /// Unit vector in the same direction, or None for degenerate input
    pub fn try_normalize(self) -> Option<Vec3> {
        let len = self.length();
        if len <= f32::EPSILON {
            None
        } else {
            Some(self.scale(1.0 / len))
        }
    }

    /// Point at fraction `t` between `self` and `other`
    pub fn lerp(self, other: Vec3, t: f32) -> Vec3 {
        self.add(other.sub(self).scale(t))
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Rotation quaternion, carried through as a wire type.
/// The server never rotates vectors by it; it only validates and echoes
/// client orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Quat = Quat {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Sphere collider
#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

/// Result of a segment/sphere intersection test
#[derive(Debug, Clone, Copy)]
pub struct SegmentHit {
    /// Exact impact point on the sphere surface (or segment start if it
    /// begins inside the sphere)
    pub point: Vec3,
    /// Distance along the segment from its start
    pub distance: f32,
}

/// Intersect the segment `start..end` with a sphere.
///
/// Solves |O + tD - C|^2 = r^2 for the segment's unit direction D and
/// accepts only 0 <= t <= length, preferring the smaller root (nearest
/// entry point). A segment starting inside the sphere hits at t = 0.
pub fn intersect_segment_sphere(start: Vec3, end: Vec3, sphere: Sphere) -> Option<SegmentHit> {
    let travel = end.sub(start);
    let len = travel.length();

    if len <= f32::EPSILON {
        // Degenerate segment: plain containment test
        if start.distance(sphere.center) <= sphere.radius {
            return Some(SegmentHit {
                point: start,
                distance: 0.0,
            });
        }
        return None;
    }

    let dir = travel.scale(1.0 / len);
    let oc = start.sub(sphere.center);

    // Quadratic with a = 1 (unit direction): t^2 + 2b t + c = 0
    let b = oc.dot(dir);
    let c = oc.length_squared() - sphere.radius * sphere.radius;
    let discriminant = b * b - c;

    if discriminant < 0.0 {
        return None;
    }

    let sqrt_d = discriminant.sqrt();
    let mut t = -b - sqrt_d;
    if t < 0.0 {
        // Start is inside the sphere; the far root is the exit point
        if c <= 0.0 {
            t = 0.0;
        } else {
            t = -b + sqrt_d;
        }
    }

    if t < 0.0 || t > len {
        return None;
    }

    Some(SegmentHit {
        point: start.add(dir.scale(t)),
        distance: t,
    })
}
