//! Rays used to pick and place road nodes

use glam::Vec3;

/// A ray with an origin and a (not necessarily normalized) direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    pub fn point_at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Intersect with the horizontal plane `y = height`
    ///
    /// Returns `None` when the ray is parallel to the plane or the plane lies
    /// behind the origin.
    pub fn intersect_horizontal_plane(&self, height: f32) -> Option<Vec3> {
        if self.direction.y.abs() < f32::EPSILON {
            return None;
        }
        let distance = (height - self.origin.y) / self.direction.y;
        if distance < 0.0 {
            return None;
        }
        Some(self.point_at(distance))
    }

    /// Whether the infinite line through this ray touches a sphere
    ///
    /// Solves `|o + d·s - c|² = r²` and checks the discriminant, so tangent
    /// lines (distance to center equal to the radius) count as hits.
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        let offset = self.origin - center;
        let a = self.direction.length_squared();
        if a == 0.0 {
            return offset.length_squared() <= radius * radius;
        }
        let b = 2.0 * self.direction.dot(offset);
        let c = offset.length_squared() - radius * radius;
        b * b - 4.0 * a * c >= 0.0
    }
}
