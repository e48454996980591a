//! Vehicle movement logic for the traffic simulation
//!
//! A vehicle drives along one lane of a road by stepping through the lane's
//! equidistant points. Each tick it picks a target speed from the speed
//! limit, the curvature ahead and the nearest obstruction, eases toward it
//! and advances its interpolation between the current point and the next.

use std::sync::Arc;

use glam::Vec3;
use log::debug;

use super::config::VehicleParams;
use super::error::{RoadError, RoadResult};
use super::road::Road;
use super::road_point::RoadPoint;
use super::types::{Lane, RoadId, VehicleId};

/// Look-ahead never covers fewer points than this when judging corners
pub const MIN_TURNING_LOOK_AHEAD: f32 = 5.0;

/// Speed factors computed during one update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleUpdate {
    pub target_speed: f32,
    pub turning_factor: f32,
    pub obstruction_factor: f32,
    /// Points passed during this update
    pub points_advanced: usize,
}

/// A vehicle in the traffic simulation
#[derive(Debug, Clone)]
pub struct SimVehicle {
    pub id: VehicleId,
    pub road: RoadId,
    pub lane: Lane,
    pub params: VehicleParams,
    /// The most recent point on the lane that the vehicle has passed
    pub current_point: usize,
    /// Interpolation factor toward the next point, in `[0, 1)`
    pub time: f32,
    pub velocity: f32,
    pub position: Vec3,
    pub forward: Vec3,
    lane0: Arc<[RoadPoint]>,
    lane1: Arc<[RoadPoint]>,
    point_spacing: f32,
    route_generation: u64,
}

impl SimVehicle {
    pub fn new(
        id: VehicleId,
        road: &Road,
        lane: Lane,
        start_point: usize,
        params: VehicleParams,
    ) -> RoadResult<Self> {
        if road.lane0().is_empty() {
            return Err(RoadError::NoPath(road.id()));
        }

        let mut vehicle = Self {
            id,
            road: road.id(),
            lane,
            params: params.clamped(),
            current_point: 0,
            time: 0.0,
            velocity: 0.0,
            position: Vec3::ZERO,
            forward: Vec3::X,
            lane0: road.lane_snapshot(Lane::Left),
            lane1: road.lane_snapshot(Lane::Right),
            point_spacing: road.point_spacing(),
            route_generation: road.generation(),
        };
        vehicle.current_point = start_point % vehicle.path().len();
        vehicle.sync_transform();
        Ok(vehicle)
    }

    /// Points of the lane the vehicle is driving on
    pub fn path(&self) -> &[RoadPoint] {
        match self.lane {
            Lane::Left => &self.lane0,
            Lane::Right => &self.lane1,
        }
    }

    pub fn point_spacing(&self) -> f32 {
        self.point_spacing
    }

    /// Generation of the road data the vehicle is currently using
    pub fn route_generation(&self) -> u64 {
        self.route_generation
    }

    /// Re-fetch lane snapshots after the road was regenerated
    ///
    /// The lane may have a different number of points now; the current
    /// point wraps into the new range.
    pub fn refresh_route(&mut self, road: &Road) {
        self.lane0 = road.lane_snapshot(Lane::Left);
        self.lane1 = road.lane_snapshot(Lane::Right);
        self.point_spacing = road.point_spacing();
        self.route_generation = road.generation();

        let len = self.path().len();
        if len > 0 && self.current_point >= len {
            debug!(
                "Vehicle {:?} point {} wrapped into new lane of {} points",
                self.id, self.current_point, len
            );
            self.current_point %= len;
        }
    }

    /// Move to the other lane at the matching point
    pub fn set_lane(&mut self, lane: Lane) {
        self.lane = lane;
        let len = self.path().len();
        if len > 0 {
            self.current_point %= len;
        }
    }

    fn wrap_index(&self, index: isize) -> usize {
        let len = self.path().len() as isize;
        index.rem_euclid(len) as usize
    }

    /// Fractional point index, moving in the lane direction as `time` grows
    pub fn point_position(&self) -> f32 {
        self.current_point as f32 + self.lane.direction() as f32 * self.time
    }

    /// Distance travelled from the start of the lane, in lane direction
    pub fn travel_distance(&self) -> f32 {
        lane_travel_distance(
            self.lane,
            self.point_position(),
            self.path().len(),
            self.point_spacing,
        )
    }

    /// Interpolate position and heading between the current and next point
    fn sync_transform(&mut self) {
        let path = self.path();
        if path.is_empty() {
            return;
        }
        let index0 = self.wrap_index(self.current_point as isize);
        let index1 = self.wrap_index(self.current_point as isize + self.lane.direction());
        let from = path[index0];
        let to = path[index1];

        self.position = from.position().lerp(to.position(), self.time);
        self.forward = from
            .forward()
            .lerp(to.forward(), self.time)
            .try_normalize()
            .unwrap_or(from.forward());
    }

    /// Number of points checked ahead for corners at the current velocity
    pub fn turning_look_ahead(&self) -> usize {
        let velocity_ratio = if self.params.top_speed > 0.0 {
            self.velocity / self.params.top_speed
        } else {
            0.0
        };
        let points = velocity_ratio * self.params.speed_check_distance / self.point_spacing;
        points.max(MIN_TURNING_LOOK_AHEAD).floor() as usize
    }

    /// Cornering speed factor for the path ahead
    pub fn turning_factor(&self) -> f32 {
        turning_factor(
            self.path(),
            self.current_point,
            self.lane.direction(),
            self.turning_look_ahead(),
            self.params.turning_sharpness,
            self.params.minimum_turning_factor,
        )
    }

    /// Speed the vehicle should travel at given the limit and obstructions
    pub fn target_speed(&self, speed_limit: f32, obstruction_distance: Option<f32>) -> f32 {
        let turning = self.turning_factor();
        let obstruction = obstruction_factor(
            obstruction_distance,
            self.params.speed_check_distance,
            self.params.obstruction_braking_amount,
        );
        speed_limit.min(self.params.top_speed * turning * obstruction)
    }

    /// Advance the vehicle by one tick
    ///
    /// `obstruction_distance` is the free gap to the nearest obstacle ahead
    /// within the speed check distance, if any.
    pub fn update(
        &mut self,
        delta_secs: f32,
        speed_limit: f32,
        obstruction_distance: Option<f32>,
    ) -> VehicleUpdate {
        let len = self.path().len();
        if len == 0 {
            return VehicleUpdate {
                target_speed: 0.0,
                turning_factor: 1.0,
                obstruction_factor: 1.0,
                points_advanced: 0,
            };
        }

        self.sync_transform();

        let turning = self.turning_factor();
        let obstruction = obstruction_factor(
            obstruction_distance,
            self.params.speed_check_distance,
            self.params.obstruction_braking_amount,
        );
        let target_speed = speed_limit.min(self.params.top_speed * turning * obstruction);

        // Speeding up is gradual, slowing down is immediate
        self.velocity = (self.velocity + target_speed * delta_secs * self.params.acceleration)
            .min(target_speed);

        self.time += delta_secs * self.velocity / self.point_spacing;
        let mut points_advanced = 0;
        if self.time >= 1.0 {
            points_advanced = self.time.floor() as usize;
            let step = points_advanced as isize * self.lane.direction();
            self.current_point = self.wrap_index(self.current_point as isize + step);
            self.time = self.time.fract();
        }

        VehicleUpdate {
            target_speed,
            turning_factor: turning,
            obstruction_factor: obstruction,
            points_advanced,
        }
    }
}

/// Distance along a lane, measured in the lane's driving direction
///
/// `point` is a fractional point index. `Lane::Right` drives toward lower
/// indices, so its distance counts down from the end of the lane.
pub fn lane_travel_distance(lane: Lane, point: f32, point_count: usize, spacing: f32) -> f32 {
    if point_count == 0 {
        return 0.0;
    }
    let count = point_count as f32;
    let along = match lane {
        Lane::Left => point,
        Lane::Right => count - point,
    };
    along.rem_euclid(count) * spacing
}

/// Braking factor for an obstruction `distance` ahead
///
/// Maps `x = distance / check_distance` through `(b + 1)·x − b` clamped to
/// `[0, 1]`, where `b` is the braking amount. With `b = 0` the factor rises
/// linearly from 0 at contact to 1 at the check distance; larger `b` brakes
/// earlier and harder. No obstruction gives 1.
pub fn obstruction_factor(distance: Option<f32>, check_distance: f32, braking_amount: f32) -> f32 {
    let Some(distance) = distance else {
        return 1.0;
    };
    let x = distance / check_distance;
    ((braking_amount + 1.0) * x - braking_amount).clamp(0.0, 1.0)
}

/// Cornering factor from the change in heading over the next points
///
/// Averages `|forward[i] − forward[current]|` over `look_ahead` points in the
/// driving direction, raises it to `sharpness` and maps it into
/// `[minimum, 1]`.
pub fn turning_factor(
    path: &[RoadPoint],
    current: usize,
    direction: isize,
    look_ahead: usize,
    sharpness: f32,
    minimum: f32,
) -> f32 {
    let len = path.len() as isize;
    if len == 0 || look_ahead == 0 {
        return 1.0;
    }

    let base = path[(current as isize).rem_euclid(len) as usize].forward();
    let corner_magnitude: f32 = (0..look_ahead as isize)
        .map(|i| {
            let index = (current as isize + direction * i).rem_euclid(len) as usize;
            (path[index].forward() - base).length()
        })
        .sum();
    let average = corner_magnitude / look_ahead as f32;

    (1.0 - (1.0 - minimum) * average.powf(sharpness)).clamp(minimum, 1.0)
}
