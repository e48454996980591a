//! Equidistant resampling of a road's Bézier sections
//!
//! Each section is walked in small parameter steps. Whenever the distance
//! travelled since the last emitted point reaches the target spacing, the
//! overshoot is pulled back along the last step so the point lands exactly
//! one spacing further along, and the remainder carries into the next step.

use glam::Vec3;
use log::{debug, warn};

use super::curve::{cubic_section, estimate_section_length};
use super::error::{RoadError, RoadResult};
use super::road_point::RoadPoint;
use super::topology::RoadTopology;

/// Curve samples per unit of estimated length at full accuracy
pub const MAX_SAMPLES_PER_UNIT: f32 = 50.0;

/// Curve samples per unit of estimated length at zero accuracy
pub const MIN_SAMPLES_PER_UNIT: f32 = 1.0;

/// Relative slack when deciding whether a full spacing has been travelled
const SPACING_TOLERANCE: f32 = 1e-4;

/// Parameters for one resampling pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerSettings {
    /// Target distance between consecutive points
    pub spacing: f32,
    /// 0..1, scales how finely each section is subdivided while walking it
    pub accuracy: f32,
    /// Maximum number of points before the pass is rejected
    pub max_points: usize,
}

impl SamplerSettings {
    fn samples_per_unit(&self) -> f32 {
        let accuracy = self.accuracy.clamp(0.0, 1.0);
        MIN_SAMPLES_PER_UNIT + (MAX_SAMPLES_PER_UNIT - MIN_SAMPLES_PER_UNIT) * accuracy
    }
}

/// Resample the road into evenly spaced, oriented points
pub fn sample_equidistant(
    topology: &RoadTopology,
    settings: &SamplerSettings,
) -> RoadResult<Vec<RoadPoint>> {
    let positions = equidistant_positions(topology, settings)?;
    Ok(orient(&positions, topology.is_ring_road()))
}

/// Evenly spaced positions along every section, starting at the first anchor
pub fn equidistant_positions(
    topology: &RoadTopology,
    settings: &SamplerSettings,
) -> RoadResult<Vec<Vec3>> {
    let spacing = settings.spacing;
    if !spacing.is_finite() || spacing <= 0.0 {
        return Err(RoadError::DegenerateGeometry(format!(
            "point spacing must be positive, got {}",
            spacing
        )));
    }

    let Some(first) = topology.node(0) else {
        return Ok(Vec::new());
    };

    let threshold = spacing * (1.0 - SPACING_TOLERANCE);
    let samples_per_unit = settings.samples_per_unit();

    let mut positions = vec![first];
    let mut previous_point = first;
    let mut travelled = 0.0_f32;

    for section in topology.sections() {
        let estimated_length = estimate_section_length(&section);
        let divisions = ((estimated_length * samples_per_unit).ceil() as usize).max(1);

        for step in 1..=divisions {
            let t = step as f32 / divisions as f32;
            let point = cubic_section(&section, t);
            travelled += previous_point.distance(point);

            while travelled >= threshold {
                let overshoot = travelled - spacing;
                let back = (previous_point - point).normalize_or_zero();
                let adjusted = point + back * overshoot;
                positions.push(adjusted);

                if positions.len() > settings.max_points {
                    warn!(
                        "Resampling aborted at {} points (maximum {})",
                        positions.len(),
                        settings.max_points
                    );
                    return Err(RoadError::TooManyPoints {
                        count: positions.len(),
                        max: settings.max_points,
                    });
                }

                travelled = overshoot.max(0.0);
                previous_point = adjusted;
            }
            previous_point = point;
        }
    }

    // A ring closes on its first point; a trailing point closer than half a
    // spacing to it would only produce a squashed final interval.
    if topology.is_ring_road() && positions.len() > 2 {
        let last = positions[positions.len() - 1];
        if last.distance(first) < spacing * 0.5 {
            positions.pop();
        }
    }

    debug!(
        "Resampled {} sections into {} points at spacing {:.3}",
        topology.section_count(),
        positions.len(),
        spacing
    );
    Ok(positions)
}

/// Attach forward vectors to positions
///
/// Interior points average the incoming and outgoing steps. Open roads use
/// one-sided steps at their ends; ring roads wrap. Points whose neighbours
/// coincide with them borrow the direction of the nearest preceding point.
pub fn orient(positions: &[Vec3], is_ring_road: bool) -> Vec<RoadPoint> {
    let count = positions.len();
    let forwards: Vec<Option<Vec3>> = (0..count)
        .map(|i| {
            let mut forward = Vec3::ZERO;
            if i + 1 < count || is_ring_road {
                forward += positions[(i + 1) % count] - positions[i];
            }
            if i > 0 || is_ring_road {
                forward += positions[i] - positions[(i + count - 1) % count];
            }
            forward.try_normalize()
        })
        .collect();

    let fallback = forwards.iter().flatten().next().copied().unwrap_or(Vec3::X);
    let mut last_valid = fallback;

    positions
        .iter()
        .zip(forwards)
        .map(|(position, forward)| {
            let forward = match forward {
                Some(forward) => {
                    last_valid = forward;
                    forward
                }
                None => {
                    debug!(
                        "Degenerate forward at ({:.2}, {:.2}, {:.2}), reusing neighbour direction",
                        position.x, position.y, position.z
                    );
                    last_valid
                }
            };
            RoadPoint::new(*position, forward)
        })
        .collect()
}
