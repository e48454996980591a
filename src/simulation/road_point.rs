//! Oriented sample point along a road path

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A position on a road together with its direction of travel
///
/// `forward` is stored as given and normalized on read. The sampler never
/// produces a zero forward vector; for hand-built points a zero forward
/// yields zero `right`/`up` vectors instead of NaNs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoadPoint {
    position: Vec3,
    forward: Vec3,
}

impl RoadPoint {
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        Self { position, forward }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn forward(&self) -> Vec3 {
        self.forward.normalize_or_zero()
    }

    /// Horizontal vector to the right of the direction of travel (Y-up)
    ///
    /// Vertical forward vectors have no well-defined right, +X is used.
    pub fn right(&self) -> Vec3 {
        let forward = self.forward();
        if forward == Vec3::ZERO {
            return Vec3::ZERO;
        }
        forward.cross(Vec3::Y).try_normalize().unwrap_or(Vec3::X)
    }

    pub fn up(&self) -> Vec3 {
        self.right().cross(self.forward()).normalize_or_zero()
    }
}
