//! Vehicle spawning and management for the traffic simulation
//!
//! This module contains functions for spawning, updating and re-routing
//! vehicles and for registering them as lane obstacles.
//! It separates vehicle management logic from the main world coordination.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::collections::HashMap;

use super::config::VehicleParams;
use super::road_network::{LaneObstacle, ObstacleAhead, ObstacleSource, SimRoadNetwork};
use super::types::{Lane, RoadId, VehicleId};
use super::vehicle::{SimVehicle, VehicleUpdate};

/// Spawn a vehicle on a lane of a road
///
/// # Arguments
/// * `vehicle_id` - The pre-generated vehicle ID
/// * `road_id` - The road to drive on
/// * `lane` - The lane to start in
/// * `start_point` - Lane point to start at, wrapped into the lane
/// * `params` - Driving behaviour
/// * `road_network` - The network holding the road
///
/// Returns the new vehicle if successful
pub fn spawn_vehicle(
    vehicle_id: VehicleId,
    road_id: RoadId,
    lane: Lane,
    start_point: usize,
    params: VehicleParams,
    road_network: &SimRoadNetwork,
) -> Result<SimVehicle> {
    let road = road_network
        .road(road_id)
        .context("Road not found in road network")?;

    let vehicle = SimVehicle::new(vehicle_id, road, lane, start_point, params)
        .context("Road has no lane data to drive on")?;

    debug!(
        "Spawned vehicle {:?} on road {:?} {:?} lane at point {}",
        vehicle_id, road_id, lane, vehicle.current_point
    );
    Ok(vehicle)
}

/// Nearest obstacle ahead of a vehicle and the bumper gap to it
///
/// A gap of zero or less means the vehicle is touching the obstacle.
pub fn nearest_obstacle(
    vehicle: &SimVehicle,
    road_network: &SimRoadNetwork,
) -> Option<(ObstacleAhead, f32)> {
    let range = vehicle.params.speed_check_distance + vehicle.params.length;
    let ahead = road_network.find_obstacle_ahead(
        vehicle.road,
        vehicle.lane,
        vehicle.travel_distance(),
        range,
        Some(ObstacleSource::Vehicle(vehicle.id)),
    )?;
    let gap = ahead.distance - (vehicle.params.length + ahead.obstacle.length) / 2.0;
    Some((ahead, gap))
}

/// Free distance to the nearest obstruction within the speed check distance
pub fn obstruction_distance(vehicle: &SimVehicle, road_network: &SimRoadNetwork) -> Option<f32> {
    nearest_obstacle(vehicle, road_network)
        .map(|(_, gap)| gap.max(0.0))
        .filter(|gap| *gap <= vehicle.params.speed_check_distance)
}

/// Register every vehicle as an obstacle on its lane
pub fn register_vehicles(vehicles: &HashMap<VehicleId, SimVehicle>, road_network: &mut SimRoadNetwork) {
    for vehicle in vehicles.values() {
        road_network.add_obstacle(
            vehicle.road,
            vehicle.lane,
            vehicle.travel_distance(),
            LaneObstacle {
                source: ObstacleSource::Vehicle(vehicle.id),
                length: vehicle.params.length,
            },
        );
    }
}

/// Update all vehicles in the simulation
///
/// Obstructions are read from the occupancy registered before the update, so
/// the order vehicles are updated in does not matter.
pub fn update_vehicles(
    delta_secs: f32,
    vehicles: &mut HashMap<VehicleId, SimVehicle>,
    road_network: &SimRoadNetwork,
) -> Vec<(VehicleId, VehicleUpdate)> {
    let mut results = Vec::with_capacity(vehicles.len());

    for vehicle in vehicles.values_mut() {
        let Some(road) = road_network.road(vehicle.road) else {
            warn!("Vehicle {:?} is on missing road {:?}", vehicle.id, vehicle.road);
            continue;
        };
        let speed_limit = road.speed_limit();
        let obstruction = obstruction_distance(vehicle, road_network);
        let update = vehicle.update(delta_secs, speed_limit, obstruction);
        results.push((vehicle.id, update));
    }

    results
}

/// Re-fetch lane data for every vehicle on a regenerated road
pub fn refresh_vehicles_on_road(
    road_id: RoadId,
    vehicles: &mut HashMap<VehicleId, SimVehicle>,
    road_network: &SimRoadNetwork,
) -> usize {
    let Some(road) = road_network.road(road_id) else {
        return 0;
    };

    let mut refreshed = 0;
    for vehicle in vehicles.values_mut().filter(|v| v.road == road_id) {
        vehicle.refresh_route(road);
        refreshed += 1;
    }
    refreshed
}

/// Remove every vehicle driving on a road
///
/// Returns the IDs of the removed vehicles
pub fn despawn_vehicles_on_road(
    road_id: RoadId,
    vehicles: &mut HashMap<VehicleId, SimVehicle>,
) -> Vec<VehicleId> {
    let mut removed: Vec<VehicleId> = vehicles
        .values()
        .filter(|v| v.road == road_id)
        .map(|v| v.id)
        .collect();
    removed.sort();

    for vehicle_id in &removed {
        vehicles.remove(vehicle_id);
    }
    removed
}
