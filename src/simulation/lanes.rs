//! Lane paths derived from a road's centerline

use super::road_point::RoadPoint;

/// Fraction of the total road width between the centerline and a lane center
pub const LANE_OFFSET_FRACTION: f32 = 0.25;

/// The two driving lanes of a road
///
/// `lane0` runs along the centerline direction on its right-hand side,
/// `lane1` runs the opposite way on the other side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LanePaths {
    pub lane0: Vec<RoadPoint>,
    pub lane1: Vec<RoadPoint>,
}

/// Offset every centerline point by a quarter of the road width to each side
pub fn project_lanes(centerline: &[RoadPoint], road_width: f32) -> LanePaths {
    let offset = road_width * LANE_OFFSET_FRACTION;
    let (lane0, lane1) = centerline
        .iter()
        .map(|point| {
            let shift = point.right() * offset;
            (
                RoadPoint::new(point.position() + shift, point.forward()),
                RoadPoint::new(point.position() - shift, -point.forward()),
            )
        })
        .unzip();
    LanePaths { lane0, lane1 }
}
