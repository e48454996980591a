//! Error types for road geometry and network operations

use thiserror::Error;

use super::types::RoadId;

/// Errors raised by the road geometry pipeline and the road network
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoadError {
    /// Resampling produced more equidistant points than allowed.
    /// The previously generated geometry is kept.
    #[error(
        "too many points in the road ({count}), the maximum is {max}; \
         increase the point spacing or reduce the complexity of the road"
    )]
    TooManyPoints { count: usize, max: usize },

    /// A node or point index outside the current bounds
    #[error("index {index} is out of range for {len} elements")]
    InvalidIndex { index: usize, len: usize },

    /// Geometry that cannot produce a usable direction
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// The road is not part of the network
    #[error("road {0:?} is not part of the network")]
    UnknownRoad(RoadId),

    /// The road has no lane points to drive along
    #[error("road {0:?} has no lane points")]
    NoPath(RoadId),
}

pub type RoadResult<T> = std::result::Result<T, RoadError>;
