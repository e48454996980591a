//! Simulation world - the main container for all simulation state
//!
//! This is the top-level struct that coordinates the road network,
//! vehicles, traffic lights and collision reporting.

use anyhow::{Context, Result};
use glam::Vec3;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};

use super::collision::{CollisionEvent, CollisionListener, CollisionTarget};
use super::config::{SimConfig, TrafficLightConfig, TrafficLightGroupConfig, VehicleParams};
use super::events::{NetworkEvent, Observers, SubscriptionId};
use super::road_network::{LaneObstacle, ObstacleSource, SimRoadNetwork};
use super::topology::RoadTopology;
use super::traffic_light::{SignalState, TrafficLight, TrafficLightGroup};
use super::types::{Lane, RoadId, SimId, TrafficLightId, VehicleId};
use super::vehicle::{lane_travel_distance, SimVehicle};
use super::vehicle_manager;

/// Radius of the demo ring road
pub const DEMO_RING_RADIUS: f32 = 30.0;

/// Handle length that makes four cubic sections approximate a circle
const CIRCLE_HANDLE_RATIO: f32 = 0.552_284_8;

/// Snapshot of world-wide statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldStats {
    pub elapsed_time: f32,
    pub ticks: u64,
    pub vehicles: usize,
    pub roads: usize,
    pub equidistant_points: usize,
    pub traffic_lights: usize,
    pub collisions: usize,
    pub red_light_violations: usize,
    pub average_speed: f32,
}

impl WorldStats {
    /// Log the end-of-run report
    pub fn log_summary(&self) {
        info!("=== SIMULATION COMPLETE ===");
        info!("Elapsed time: {:.2}s", self.elapsed_time);
        info!("Ticks: {}", self.ticks);
        info!("Active vehicles: {}", self.vehicles);
        info!("Total roads: {}", self.roads);
        info!("Equidistant points: {}", self.equidistant_points);
        info!("Traffic lights: {}", self.traffic_lights);
        info!("Collisions: {}", self.collisions);
        info!("Red light violations: {}", self.red_light_violations);
        info!("Average speed: {:.2}", self.average_speed);
    }
}

/// The main simulation world containing all state
pub struct SimWorld {
    /// The road network
    pub road_network: SimRoadNetwork,

    /// All active vehicles
    pub vehicles: HashMap<VehicleId, SimVehicle>,

    /// Traffic light groups and the lights they drive
    pub traffic_light_groups: Vec<TrafficLightGroup>,

    /// Next ID to assign to vehicles and traffic lights
    next_id: usize,

    /// Simulation time in seconds
    pub time: f32,

    ticks: u64,

    /// Seeded RNG for reproducible simulations (None = use thread RNG)
    rng: Option<StdRng>,

    /// Subscribers to collisions of any vehicle
    collision_observers: Observers<CollisionEvent>,

    /// Subscribers to the collisions of a single vehicle
    vehicle_collision_observers: HashMap<VehicleId, Observers<CollisionEvent>>,

    collision_listener: CollisionListener,

    /// Contacts seen last tick, so each contact is reported once
    active_contacts: HashSet<(VehicleId, ObstacleSource)>,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWorld {
    fn new_internal(rng: Option<StdRng>, mut road_network: SimRoadNetwork) -> Self {
        road_network.enable_event_queue();
        Self {
            road_network,
            vehicles: HashMap::new(),
            traffic_light_groups: Vec::new(),
            next_id: 0,
            time: 0.0,
            ticks: 0,
            rng,
            collision_observers: Observers::new(),
            vehicle_collision_observers: HashMap::new(),
            collision_listener: CollisionListener::new(),
            active_contacts: HashSet::new(),
        }
    }

    pub fn new() -> Self {
        Self::new_internal(None, SimRoadNetwork::new())
    }

    /// Create a new SimWorld with a seeded RNG for reproducible simulations
    pub fn new_with_seed(seed: u64) -> Self {
        Self::new_internal(Some(StdRng::seed_from_u64(seed)), SimRoadNetwork::new())
    }

    /// Build a world from a configuration: one demo road, its traffic light
    /// groups and `vehicle_count` vehicles
    pub fn from_config(config: &SimConfig) -> Result<Self> {
        let config = config.clone().clamped();
        let rng = config.seed.map(StdRng::seed_from_u64);
        let mut world =
            Self::new_internal(rng, SimRoadNetwork::with_settings(config.road));

        let road_id = world
            .add_demo_road(config.ring_road)
            .context("Failed to build demo road")?;

        for group in &config.traffic_lights {
            world.add_traffic_light_group(road_id, group)?;
        }

        for _ in 0..config.vehicle_count {
            world.spawn_vehicle(road_id, config.vehicle)?;
        }

        world.dispatch_network_events();
        info!(
            "World ready: {} vehicles, {} traffic light groups",
            world.vehicles.len(),
            world.traffic_light_groups.len()
        );
        Ok(world)
    }

    /// Get a random value in the given range, using seeded RNG if available
    fn random_range(&mut self, range: std::ops::Range<usize>) -> usize {
        match &mut self.rng {
            Some(rng) => rng.random_range(range),
            None => rand::rng().random_range(range),
        }
    }

    fn random_bool(&mut self) -> bool {
        match &mut self.rng {
            Some(rng) => rng.random_bool(0.5),
            None => rand::rng().random_bool(0.5),
        }
    }

    fn next_sim_id(&mut self) -> SimId {
        let id = SimId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add a ring (or, when `ring_road` is false, a three-quarter arc) road of
    /// radius [`DEMO_RING_RADIUS`] centred on the origin
    pub fn add_demo_road(&mut self, ring_road: bool) -> Result<RoadId> {
        let r = DEMO_RING_RADIUS;
        let k = r * CIRCLE_HANDLE_RATIO;
        let nodes = vec![
            Vec3::new(r, 0.0, 0.0),
            Vec3::new(r, 0.0, k),
            Vec3::new(k, 0.0, r),
            Vec3::new(0.0, 0.0, r),
            Vec3::new(-k, 0.0, r),
            Vec3::new(-r, 0.0, k),
            Vec3::new(-r, 0.0, 0.0),
            Vec3::new(-r, 0.0, -k),
            Vec3::new(-k, 0.0, -r),
            Vec3::new(0.0, 0.0, -r),
        ];
        let mut topology = RoadTopology::from_nodes(nodes)?;
        topology.set_ring_road(ring_road);

        let settings = *self.road_network.default_settings();
        let road_id = self.road_network.add_road(topology, settings)?;
        Ok(road_id)
    }

    /// Add a group of traffic lights on a road
    ///
    /// Point indices past the end of a lane wrap around it.
    pub fn add_traffic_light_group(
        &mut self,
        road_id: RoadId,
        config: &TrafficLightGroupConfig,
    ) -> Result<usize> {
        let lane_points = self
            .road_network
            .road(road_id)
            .context("Road not found in road network")?
            .lane0()
            .len();
        anyhow::ensure!(lane_points > 0, "Road {:?} has no lane points", road_id);

        let mut lights = Vec::with_capacity(config.lights.len());
        for TrafficLightConfig {
            lane,
            point_index,
            modes,
        } in &config.lights
        {
            if *point_index >= lane_points {
                warn!(
                    "Traffic light point {} wrapped onto a lane of {} points",
                    point_index, lane_points
                );
            }
            let id = TrafficLightId(self.next_sim_id());
            lights.push(TrafficLight::new(
                id,
                road_id,
                *lane,
                point_index % lane_points,
                modes.clone(),
            ));
        }

        self.traffic_light_groups.push(TrafficLightGroup::new(
            lights,
            config.mode_durations.clone(),
            config.transition_time,
            config.starting_mode,
        ));
        Ok(self.traffic_light_groups.len() - 1)
    }

    /// Spawn a vehicle on a road
    ///
    /// With `randomise_starting_position` the lane and point are random,
    /// otherwise the vehicle starts at the first point of the left lane.
    pub fn spawn_vehicle(&mut self, road_id: RoadId, params: VehicleParams) -> Result<VehicleId> {
        let lane_points = self
            .road_network
            .road(road_id)
            .context("Road not found in road network")?
            .lane0()
            .len();

        let (lane, start_point) = if params.randomise_starting_position && lane_points > 0 {
            let lane = if self.random_bool() {
                Lane::Left
            } else {
                Lane::Right
            };
            (lane, self.random_range(0..lane_points))
        } else {
            (Lane::Left, 0)
        };

        self.spawn_vehicle_at(road_id, lane, start_point, params)
    }

    /// Spawn a vehicle at an explicit lane and point
    pub fn spawn_vehicle_at(
        &mut self,
        road_id: RoadId,
        lane: Lane,
        start_point: usize,
        params: VehicleParams,
    ) -> Result<VehicleId> {
        let id = VehicleId(self.next_sim_id());
        let vehicle = vehicle_manager::spawn_vehicle(
            id,
            road_id,
            lane,
            start_point,
            params,
            &self.road_network,
        )?;
        self.vehicles.insert(id, vehicle);
        Ok(id)
    }

    /// Remove a vehicle and its collision subscribers
    pub fn despawn_vehicle(&mut self, vehicle_id: VehicleId) -> bool {
        self.vehicle_collision_observers.remove(&vehicle_id);
        self.active_contacts.retain(|(id, _)| *id != vehicle_id);
        self.vehicles.remove(&vehicle_id).is_some()
    }

    /// Subscribe to collisions of every vehicle
    pub fn subscribe_any_collision(
        &mut self,
        callback: impl FnMut(&CollisionEvent) + 'static,
    ) -> SubscriptionId {
        self.collision_observers.subscribe(callback)
    }

    pub fn unsubscribe_any_collision(&mut self, id: SubscriptionId) -> bool {
        self.collision_observers.unsubscribe(id)
    }

    /// Subscribe to the collisions of one vehicle
    pub fn subscribe_vehicle_collision(
        &mut self,
        vehicle_id: VehicleId,
        callback: impl FnMut(&CollisionEvent) + 'static,
    ) -> Result<SubscriptionId> {
        anyhow::ensure!(
            self.vehicles.contains_key(&vehicle_id),
            "Vehicle {:?} not found",
            vehicle_id
        );
        Ok(self
            .vehicle_collision_observers
            .entry(vehicle_id)
            .or_default()
            .subscribe(callback))
    }

    pub fn unsubscribe_vehicle_collision(&mut self, vehicle_id: VehicleId, id: SubscriptionId) -> bool {
        self.vehicle_collision_observers
            .get_mut(&vehicle_id)
            .is_some_and(|observers| observers.unsubscribe(id))
    }

    pub fn collision_listener(&self) -> &CollisionListener {
        &self.collision_listener
    }

    /// Apply pending road network changes to vehicles and lights
    pub fn dispatch_network_events(&mut self) {
        for event in self.road_network.drain_events() {
            match event {
                NetworkEvent::RoadChanged(road_id) => {
                    let refreshed = vehicle_manager::refresh_vehicles_on_road(
                        road_id,
                        &mut self.vehicles,
                        &self.road_network,
                    );
                    self.wrap_traffic_lights(road_id);
                    debug!("Road {:?} changed, refreshed {} vehicles", road_id, refreshed);
                }
                NetworkEvent::RoadRemoved(road_id) => {
                    let removed =
                        vehicle_manager::despawn_vehicles_on_road(road_id, &mut self.vehicles);
                    for vehicle_id in &removed {
                        self.vehicle_collision_observers.remove(vehicle_id);
                    }
                    self.active_contacts
                        .retain(|(id, _)| !removed.contains(id));
                    for group in &mut self.traffic_light_groups {
                        group.lights.retain(|light| light.road != road_id);
                    }
                    info!("Road {:?} removed with {} vehicles", road_id, removed.len());
                }
                NetworkEvent::RoadSelected(road_id) => {
                    debug!("Road {:?} selected", road_id);
                }
            }
        }
    }

    /// Keep light positions inside a road's lanes after it was resampled
    fn wrap_traffic_lights(&mut self, road_id: RoadId) {
        let Some(lane_points) = self
            .road_network
            .road(road_id)
            .map(|road| road.lane0().len())
            .filter(|len| *len > 0)
        else {
            return;
        };
        for light in self
            .traffic_light_groups
            .iter_mut()
            .flat_map(|group| group.lights.iter_mut())
            .filter(|light| light.road == road_id)
        {
            light.point_index %= lane_points;
        }
    }

    /// Register vehicles and blocking lights on their lanes
    fn rebuild_occupancy(&mut self) {
        self.road_network.clear_occupancy();
        vehicle_manager::register_vehicles(&self.vehicles, &mut self.road_network);

        let mut blocking = Vec::new();
        for light in self
            .traffic_light_groups
            .iter()
            .flat_map(|group| group.lights.iter())
            .filter(|light| light.is_blocking())
        {
            let Some(road) = self.road_network.road(light.road) else {
                continue;
            };
            let distance = lane_travel_distance(
                light.lane,
                light.point_index as f32,
                road.lane0().len(),
                road.point_spacing(),
            );
            blocking.push((light.road, light.lane, distance, light.id));
        }

        for (road_id, lane, distance, id) in blocking {
            self.road_network.add_obstacle(
                road_id,
                lane,
                distance,
                LaneObstacle {
                    source: ObstacleSource::TrafficLight(id),
                    length: 0.0,
                },
            );
        }
    }

    fn traffic_light_state(&self, id: TrafficLightId) -> Option<SignalState> {
        self.traffic_light_groups
            .iter()
            .find_map(|group| group.light(id))
            .map(TrafficLight::state)
    }

    /// Report every contact that started this tick
    fn detect_contacts(&mut self) {
        let mut contacts = HashSet::new();
        let mut events = Vec::new();

        for vehicle in self.vehicles.values() {
            let Some((ahead, gap)) = vehicle_manager::nearest_obstacle(vehicle, &self.road_network)
            else {
                continue;
            };
            if gap > 0.0 {
                continue;
            }

            let key = (vehicle.id, ahead.obstacle.source);
            contacts.insert(key);
            if self.active_contacts.contains(&key) {
                continue;
            }

            let target = match ahead.obstacle.source {
                ObstacleSource::Vehicle(other) => CollisionTarget::Vehicle(other),
                ObstacleSource::TrafficLight(id) => {
                    let Some(state) = self.traffic_light_state(id) else {
                        continue;
                    };
                    CollisionTarget::TrafficLight { id, state }
                }
            };
            events.push(CollisionEvent {
                vehicle: vehicle.id,
                target,
                position: vehicle.position,
                time: self.time,
            });
        }

        self.active_contacts = contacts;
        events.sort_by_key(|event| event.vehicle);
        for event in events {
            self.raise_collision(&event);
        }
    }

    fn raise_collision(&mut self, event: &CollisionEvent) {
        self.collision_listener.on_collision(event);
        self.collision_observers.notify(event);
        if let Some(observers) = self.vehicle_collision_observers.get_mut(&event.vehicle) {
            observers.notify(event);
        }
    }

    /// Advance the simulation by one tick
    pub fn tick(&mut self, delta_secs: f32) {
        self.time += delta_secs;
        self.ticks += 1;

        // Roads may have been edited since the last tick
        self.dispatch_network_events();

        for group in &mut self.traffic_light_groups {
            group.tick(delta_secs);
        }

        self.rebuild_occupancy();
        vehicle_manager::update_vehicles(delta_secs, &mut self.vehicles, &self.road_network);

        // Contacts are judged on the positions after moving
        self.rebuild_occupancy();
        self.detect_contacts();
    }

    /// Mean velocity of all vehicles
    pub fn average_speed(&self) -> f32 {
        if self.vehicles.is_empty() {
            return 0.0;
        }
        self.vehicles.values().map(|v| v.velocity).sum::<f32>() / self.vehicles.len() as f32
    }

    pub fn stats(&self) -> WorldStats {
        WorldStats {
            elapsed_time: self.time,
            ticks: self.ticks,
            vehicles: self.vehicles.len(),
            roads: self.road_network.road_count(),
            equidistant_points: self
                .road_network
                .roads()
                .map(|road| road.equidistant_points().len())
                .sum(),
            traffic_lights: self
                .traffic_light_groups
                .iter()
                .map(|group| group.lights.len())
                .sum(),
            collisions: self.collision_listener.collisions(),
            red_light_violations: self.collision_listener.red_light_violations(),
            average_speed: self.average_speed(),
        }
    }

    /// Create a default test world: a ring road, a pair of traffic lights
    /// facing opposite lanes and eight vehicles
    pub fn create_test_world() -> Result<Self> {
        Self::from_config(&Self::test_world_config(None))
    }

    /// Create a default test world with a seeded RNG for reproducible simulations
    pub fn create_test_world_with_seed(seed: u64) -> Result<Self> {
        Self::from_config(&Self::test_world_config(Some(seed)))
    }

    /// Configuration used by the test world
    pub fn test_world_config(seed: Option<u64>) -> SimConfig {
        SimConfig {
            seed,
            traffic_lights: vec![TrafficLightGroupConfig {
                lights: vec![
                    TrafficLightConfig {
                        lane: Lane::Left,
                        point_index: 40,
                        modes: vec![true, false],
                    },
                    TrafficLightConfig {
                        lane: Lane::Right,
                        point_index: 140,
                        modes: vec![false, true],
                    },
                ],
                ..TrafficLightGroupConfig::default()
            }],
            ..SimConfig::default()
        }
    }

    /// Print a summary of the world state
    pub fn print_summary(&self) {
        println!("=== Road Traffic Summary ===");
        println!("Time: {:.2}s", self.time);
        println!(
            "Roads: {}, Vehicles: {}",
            self.road_network.road_count(),
            self.vehicles.len()
        );
        println!();

        println!("--- Roads ---");
        for road_id in self.road_network.road_ids() {
            let Some(road) = self.road_network.road(road_id) else {
                continue;
            };
            println!(
                "  Road {:?}: nodes={}, points={}, ring={}, speed_limit={:.1}{}",
                road_id.0 .0,
                road.topology().node_count(),
                road.equidistant_points().len(),
                road.is_ring_road(),
                road.speed_limit(),
                if self.road_network.active_road() == Some(road_id) {
                    " (active)"
                } else {
                    ""
                }
            );
        }

        if !self.traffic_light_groups.is_empty() {
            println!("--- Traffic Lights ---");
            for (index, group) in self.traffic_light_groups.iter().enumerate() {
                let states: Vec<String> = group
                    .lights
                    .iter()
                    .map(|light| format!("{:?}@{}={:?}", light.lane, light.point_index, light.state()))
                    .collect();
                println!(
                    "  Group {}: mode={}/{}, {}",
                    index,
                    group.current_mode(),
                    group.mode_count(),
                    states.join(", ")
                );
            }
        }

        if !self.vehicles.is_empty() {
            println!("--- Vehicles ---");
            let mut vehicles: Vec<&SimVehicle> = self.vehicles.values().collect();
            vehicles.sort_by_key(|v| v.id);
            for vehicle in vehicles {
                println!(
                    "  Vehicle {:?}: lane={:?}, point={}, speed={:.1}, position=({:.1}, {:.1})",
                    vehicle.id.0 .0,
                    vehicle.lane,
                    vehicle.current_point,
                    vehicle.velocity,
                    vehicle.position.x,
                    vehicle.position.z
                );
            }
        }

        println!(
            "Collisions: {}, Red lights run: {}",
            self.collision_listener.collisions(),
            self.collision_listener.red_light_violations()
        );
    }

    /// Draw an ASCII map of roads, lights and vehicles
    pub fn draw_map(&self) {
        // Find bounds of the world
        let mut min_x = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut min_z = f32::INFINITY;
        let mut max_z = f32::NEG_INFINITY;

        for road in self.road_network.roads() {
            for point in road.equidistant_points() {
                min_x = min_x.min(point.position().x);
                max_x = max_x.max(point.position().x);
                min_z = min_z.min(point.position().z);
                max_z = max_z.max(point.position().z);
            }
        }
        if !min_x.is_finite() {
            println!("\n=== World Map ===\n(no roads)\n");
            return;
        }

        // Add padding
        min_x -= 2.0;
        max_x += 2.0;
        min_z -= 2.0;
        max_z += 2.0;

        // Characters per world unit; rows are taller than columns are wide
        let col_scale = 1.0;
        let row_scale = 0.5;
        let width = (((max_x - min_x) * col_scale) as usize).max(1);
        let height = (((max_z - min_z) * row_scale) as usize).max(1);

        let mut grid = vec![vec![' '; width]; height];

        let to_grid = |x: f32, z: f32| -> (usize, usize) {
            let col = ((x - min_x) * col_scale) as usize;
            // Flip the Z-axis so +Z points up the screen
            let row = ((max_z - z) * row_scale) as usize;
            (row.min(height - 1), col.min(width - 1))
        };

        // Draw roads
        for road in self.road_network.roads() {
            for point in road.equidistant_points() {
                let (row, col) = to_grid(point.position().x, point.position().z);
                grid[row][col] = '.';
            }
        }

        // Draw traffic lights
        for light in self
            .traffic_light_groups
            .iter()
            .flat_map(|group| group.lights.iter())
        {
            let Some(point) = self
                .road_network
                .road(light.road)
                .map(|road| road.lane_snapshot(light.lane))
                .and_then(|lane| lane.get(light.point_index).copied())
            else {
                continue;
            };
            let (row, col) = to_grid(point.position().x, point.position().z);
            grid[row][col] = light.state().symbol();
        }

        // Draw vehicles
        for vehicle in self.vehicles.values() {
            let (row, col) = to_grid(vehicle.position.x, vehicle.position.z);
            if grid[row][col] == ' ' || grid[row][col] == '.' {
                grid[row][col] = match vehicle.lane {
                    Lane::Left => '>',
                    Lane::Right => '<',
                };
            }
        }

        println!("\n=== World Map ===");
        println!("Legend: .=Road, >=Vehicle (left lane), <=Vehicle (right lane), R/r/G/A=Light");
        println!();
        for row in &grid {
            let line: String = row.iter().collect();
            println!("{}", line.trim_end());
        }
        println!();
    }
}
