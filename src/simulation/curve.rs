//! Bézier curve evaluation

use glam::Vec3;

/// Quadratic Bézier through `p0` and `p2`, pulled toward `p1`
pub fn quadratic(p0: Vec3, p1: Vec3, p2: Vec3, t: f32) -> Vec3 {
    let line1 = p0.lerp(p1, t);
    let line2 = p1.lerp(p2, t);
    line1.lerp(line2, t)
}

/// Cubic Bézier built from two quadratics (de Casteljau)
///
/// `t` is not clamped, callers pass values in `[0, 1]` for points on the curve.
pub fn cubic(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let curve1 = quadratic(p0, p1, p2, t);
    let curve2 = quadratic(p1, p2, p3, t);
    curve1.lerp(curve2, t)
}

/// Evaluate a four-node section as returned by `RoadTopology::section`
pub fn cubic_section(section: &[Vec3; 4], t: f32) -> Vec3 {
    cubic(section[0], section[1], section[2], section[3], t)
}

/// Arc length estimate of a cubic section: chord plus half the control polygon
pub fn estimate_section_length(section: &[Vec3; 4]) -> f32 {
    let polygon = section[0].distance(section[1])
        + section[1].distance(section[2])
        + section[2].distance(section[3]);
    section[0].distance(section[3]) + polygon * 0.5
}
