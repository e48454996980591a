//! Core types for the road traffic simulation
//!
//! Identifiers, the lane selector and shared constants.

use serde::{Deserialize, Serialize};

/// A unique identifier for simulation entities
/// This is a simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimId(pub usize);

/// A wrapper type for road IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoadId(pub SimId);

/// A wrapper type for vehicle IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleId(pub SimId);

/// A wrapper type for traffic light IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrafficLightId(pub SimId);

/// Which of the two lanes of a road a vehicle drives on
///
/// `Left` follows `lane0` in the direction of increasing point index,
/// `Right` follows `lane1` in the opposite direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Lane {
    Left,
    Right,
}

impl Lane {
    /// Step applied to the point index when travelling along this lane
    pub fn direction(self) -> isize {
        match self {
            Lane::Left => 1,
            Lane::Right => -1,
        }
    }

    pub fn opposite(self) -> Lane {
        match self {
            Lane::Left => Lane::Right,
            Lane::Right => Lane::Left,
        }
    }
}

/// Node index pattern: every third node is an anchor
pub fn is_anchor(index: usize) -> bool {
    index % 3 == 0
}

/// Hard ceiling on the number of equidistant points a road may produce
pub const MAX_EQUIDISTANT_POINTS: usize = 65536;

/// Half extent of the seed road created around a center point
pub const SEED_ROAD_HALF_LENGTH: f32 = 5.0;

/// Distance of the seed control handles from the center point
pub const SEED_HANDLE_OFFSET: f32 = 2.0;
