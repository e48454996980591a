//! Standalone road traffic simulation module
//!
//! Editable Bézier roads, their resampled lane paths, and the vehicles and
//! traffic lights that use them. Everything runs without a renderer and can
//! be driven from tests or the console.

mod collision;
mod config;
mod curve;
mod error;
mod events;
mod lanes;
mod mesh;
mod ray;
mod road;
mod road_network;
mod road_point;
mod sampler;
mod topology;
mod traffic_light;
mod types;
mod vehicle;
mod vehicle_manager;
mod world;

// Re-export public types for external use
// These may not be used within this crate but are part of the public API
#[allow(unused_imports)]
pub use collision::{CollisionEvent, CollisionKind, CollisionListener, CollisionTarget};
#[allow(unused_imports)]
pub use config::{
    RoadSettings, SimConfig, TrafficLightConfig, TrafficLightGroupConfig, VehicleParams,
    MAX_POINT_SPACING, MAX_TEXTURE_TILING, MIN_POINT_SPACING, MIN_ROAD_WIDTH, MIN_TEXTURE_TILING,
};
#[allow(unused_imports)]
pub use curve::{cubic, cubic_section, estimate_section_length, quadratic};
#[allow(unused_imports)]
pub use error::{RoadError, RoadResult};
#[allow(unused_imports)]
pub use events::{NetworkEvent, Observers, SubscriptionId};
#[allow(unused_imports)]
pub use lanes::{project_lanes, LanePaths, LANE_OFFSET_FRACTION};
#[allow(unused_imports)]
pub use mesh::{build_strip, texture_scale, RoadMesh};
#[allow(unused_imports)]
pub use ray::Ray;
#[allow(unused_imports)]
pub use road::Road;
#[allow(unused_imports)]
pub use road_network::{LaneObstacle, ObstacleAhead, ObstacleSource, SimRoadNetwork};
#[allow(unused_imports)]
pub use road_point::RoadPoint;
#[allow(unused_imports)]
pub use sampler::{equidistant_positions, orient, sample_equidistant, SamplerSettings};
#[allow(unused_imports)]
pub use topology::RoadTopology;
#[allow(unused_imports)]
pub use traffic_light::{SignalState, TrafficLight, TrafficLightGroup};
#[allow(unused_imports)]
pub use types::{
    is_anchor, Lane, RoadId, SimId, TrafficLightId, VehicleId, MAX_EQUIDISTANT_POINTS,
    SEED_HANDLE_OFFSET, SEED_ROAD_HALF_LENGTH,
};
#[allow(unused_imports)]
pub use vehicle::{
    lane_travel_distance, obstruction_factor, turning_factor, SimVehicle, VehicleUpdate,
    MIN_TURNING_LOOK_AHEAD,
};
#[allow(unused_imports)]
pub use vehicle_manager::{nearest_obstacle, obstruction_distance};
pub use world::{SimWorld, WorldStats, DEMO_RING_RADIUS};
