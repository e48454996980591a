//! The collection of roads being simulated
//!
//! Owns every road, tracks the active one and publishes change events.
//! Geometry is always fully regenerated before a change is announced.
//! Also keeps a per-lane ordered map of obstacles for traffic detection.

use ordered_float::OrderedFloat;
use std::collections::{BTreeMap, HashMap};

use glam::Vec3;
use log::{debug, info, warn};

use super::config::RoadSettings;
use super::error::{RoadError, RoadResult};
use super::events::{NetworkEvent, Observers, SubscriptionId};
use super::ray::Ray;
use super::road::Road;
use super::topology::RoadTopology;
use super::types::{Lane, RoadId, SimId, TrafficLightId, VehicleId};

/// Something a vehicle can run into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObstacleSource {
    Vehicle(VehicleId),
    TrafficLight(TrafficLightId),
}

/// An obstacle registered on a lane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneObstacle {
    pub source: ObstacleSource,
    /// Extent along the lane, centred on its registered distance
    pub length: f32,
}

/// Obstacle found ahead of a lane position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleAhead {
    pub obstacle: LaneObstacle,
    /// Centre-to-centre distance along the lane
    pub distance: f32,
}

#[derive(Debug, Default)]
pub struct SimRoadNetwork {
    /// Storage for road data
    roads: HashMap<RoadId, Road>,

    /// The road hosts are currently editing
    active_road: Option<RoadId>,

    /// Settings given to newly created roads
    default_settings: RoadSettings,

    next_id: usize,

    /// External subscribers (editors, loggers)
    observers: Observers<NetworkEvent>,

    /// Events not yet picked up by the simulation world; stays `None`
    /// unless a host asked for the queue
    pending_events: Option<Vec<NetworkEvent>>,

    /// Maps (road, lane) to obstacles keyed by travel distance along the lane
    occupancy: HashMap<(RoadId, Lane), BTreeMap<OrderedFloat<f32>, Vec<LaneObstacle>>>,
}

impl SimRoadNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(default_settings: RoadSettings) -> Self {
        Self {
            default_settings: default_settings.clamped(),
            ..Self::default()
        }
    }

    pub fn default_settings(&self) -> &RoadSettings {
        &self.default_settings
    }

    fn next_road_id(&mut self) -> RoadId {
        let id = RoadId(SimId(self.next_id));
        self.next_id += 1;
        id
    }

    fn publish(&mut self, event: NetworkEvent) {
        self.observers.notify(&event);
        if let Some(queue) = &mut self.pending_events {
            queue.push(event);
        }
    }

    /// Start queueing events for [`drain_events`](Self::drain_events)
    ///
    /// A host that enables the queue must drain it regularly. Hosts that
    /// only subscribe never need it.
    pub fn enable_event_queue(&mut self) {
        self.pending_events.get_or_insert_with(Vec::new);
    }

    pub fn is_event_queue_enabled(&self) -> bool {
        self.pending_events.is_some()
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&NetworkEvent) + 'static) -> SubscriptionId {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Take the events queued since the last call, empty while the queue
    /// is disabled
    pub fn drain_events(&mut self) -> Vec<NetworkEvent> {
        self.pending_events
            .as_mut()
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Adds a seeded road around `center` and makes it the active road
    pub fn create_road(&mut self, center: Vec3) -> RoadResult<RoadId> {
        let id = self.next_road_id();
        let road = Road::new(id, center, self.default_settings)?;
        self.insert_road(road);
        Ok(id)
    }

    /// Adds a road with explicit nodes and settings and makes it active
    pub fn add_road(&mut self, topology: RoadTopology, settings: RoadSettings) -> RoadResult<RoadId> {
        let id = self.next_road_id();
        let road = Road::with_topology(id, topology, settings)?;
        self.insert_road(road);
        Ok(id)
    }

    fn insert_road(&mut self, road: Road) {
        let id = road.id();
        self.roads.insert(id, road);
        self.publish(NetworkEvent::RoadChanged(id));
        self.set_active_road(id);
    }

    /// Remove a road from the network
    pub fn remove_road(&mut self, road_id: RoadId) -> RoadResult<()> {
        self.roads
            .remove(&road_id)
            .ok_or(RoadError::UnknownRoad(road_id))?;

        if self.active_road == Some(road_id) {
            self.active_road = None;
        }
        self.occupancy.retain(|(road, _), _| *road != road_id);
        self.publish(NetworkEvent::RoadRemoved(road_id));
        Ok(())
    }

    /// Replace every road with a single fresh one
    ///
    /// Teardown cannot fail part way: the road table is simply reset.
    pub fn create_road_network(&mut self, center: Vec3) -> RoadResult<RoadId> {
        let removed: Vec<RoadId> = self.road_ids();
        self.roads.clear();
        self.occupancy.clear();
        self.active_road = None;
        for road_id in removed {
            self.publish(NetworkEvent::RoadRemoved(road_id));
        }
        info!("Road network reset");
        self.create_road(center)
    }

    /// Gets a road by ID
    pub fn road(&self, road_id: RoadId) -> Option<&Road> {
        self.roads.get(&road_id)
    }

    pub fn contains(&self, road_id: RoadId) -> bool {
        self.roads.contains_key(&road_id)
    }

    /// Road IDs in creation order
    pub fn road_ids(&self) -> Vec<RoadId> {
        let mut ids: Vec<RoadId> = self.roads.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn roads(&self) -> impl Iterator<Item = &Road> {
        self.roads.values()
    }

    /// Get number of roads
    pub fn road_count(&self) -> usize {
        self.roads.len()
    }

    pub fn active_road(&self) -> Option<RoadId> {
        self.active_road
    }

    /// Selects the active road; roads outside the network are ignored
    pub fn set_active_road(&mut self, road_id: RoadId) -> bool {
        if !self.roads.contains_key(&road_id) {
            debug!("Ignoring selection of unknown road {:?}", road_id);
            return false;
        }
        self.active_road = Some(road_id);
        self.publish(NetworkEvent::RoadSelected(road_id));
        true
    }

    /// Apply an arbitrary edit, then regenerate and announce the road
    ///
    /// If regeneration fails the error is returned and the whole road,
    /// settings and nodes included, is put back as it was before the edit.
    /// Nothing is announced.
    pub fn edit_road<R>(&mut self, road_id: RoadId, edit: impl FnOnce(&mut Road) -> R) -> RoadResult<R> {
        let road = self
            .roads
            .get_mut(&road_id)
            .ok_or(RoadError::UnknownRoad(road_id))?;
        let last_good = road.clone();
        let result = edit(road);
        self.commit_edit(road_id, last_good)?;
        Ok(result)
    }

    /// Like `edit_road`, but skips regeneration when the edit reports no change
    fn apply_edit(
        &mut self,
        road_id: RoadId,
        edit: impl FnOnce(&mut RoadTopology) -> bool,
    ) -> RoadResult<bool> {
        let road = self
            .roads
            .get_mut(&road_id)
            .ok_or(RoadError::UnknownRoad(road_id))?;
        let last_good = road.clone();
        if !edit(road.topology_mut()) {
            return Ok(false);
        }
        self.commit_edit(road_id, last_good)?;
        Ok(true)
    }

    /// Regenerate an edited road and announce it, or roll back to `last_good`
    fn commit_edit(&mut self, road_id: RoadId, last_good: Road) -> RoadResult<()> {
        let road = self
            .roads
            .get_mut(&road_id)
            .ok_or(RoadError::UnknownRoad(road_id))?;
        if let Err(error) = road.regenerate() {
            warn!("Road {:?} edit rolled back: {}", road_id, error);
            *road = last_good;
            return Err(error);
        }
        self.publish(NetworkEvent::RoadChanged(road_id));
        Ok(())
    }

    pub fn create_section(&mut self, road_id: RoadId, anchor: Vec3) -> RoadResult<()> {
        self.apply_edit(road_id, |topology| {
            topology.create_section(anchor);
            true
        })
        .map(|_| ())
    }

    pub fn create_section_from_ray(
        &mut self,
        road_id: RoadId,
        ray: &Ray,
        selected_node: Option<usize>,
    ) -> RoadResult<bool> {
        self.apply_edit(road_id, |topology| {
            topology.create_section_from_ray(ray, selected_node)
        })
    }

    pub fn remove_section(&mut self, road_id: RoadId, anchor_index: usize) -> RoadResult<bool> {
        self.apply_edit(road_id, |topology| topology.remove_section(anchor_index))
    }

    pub fn remove_section_at_ray(
        &mut self,
        road_id: RoadId,
        ray: &Ray,
        anchor_hit_radius: f32,
        control_hit_radius: f32,
    ) -> RoadResult<bool> {
        self.apply_edit(road_id, |topology| {
            topology.remove_section_at_ray(ray, anchor_hit_radius, control_hit_radius)
        })
    }

    /// Returns the index of the inserted anchor
    pub fn split_section(&mut self, road_id: RoadId, node_index: usize) -> RoadResult<Option<usize>> {
        let mut inserted = None;
        self.apply_edit(road_id, |topology| {
            inserted = topology.split_section(node_index);
            inserted.is_some()
        })?;
        Ok(inserted)
    }

    pub fn move_node(&mut self, road_id: RoadId, node_index: usize, position: Vec3) -> RoadResult<bool> {
        self.apply_edit(road_id, |topology| topology.move_node(node_index, position))
    }

    pub fn set_ring_road(&mut self, road_id: RoadId, value: bool) -> RoadResult<bool> {
        self.apply_edit(road_id, |topology| topology.set_ring_road(value))
    }

    pub fn select_node(
        &self,
        road_id: RoadId,
        ray: &Ray,
        anchor_radius: f32,
        control_radius: f32,
    ) -> Option<usize> {
        self.road(road_id)?
            .topology()
            .select_node(ray, anchor_radius, control_radius)
    }

    pub fn set_road_width(&mut self, road_id: RoadId, width: f32) -> RoadResult<()> {
        self.edit_road(road_id, |road| road.set_road_width(width))
    }

    pub fn set_point_spacing(&mut self, road_id: RoadId, spacing: f32) -> RoadResult<()> {
        self.edit_road(road_id, |road| road.set_point_spacing(spacing))
    }

    pub fn set_point_accuracy(&mut self, road_id: RoadId, accuracy: f32) -> RoadResult<()> {
        self.edit_road(road_id, |road| road.set_point_accuracy(accuracy))
    }

    /// Speed limit and tiling do not affect the path, so no regeneration
    pub fn set_speed_limit(&mut self, road_id: RoadId, speed_limit: f32) -> RoadResult<()> {
        self.roads
            .get_mut(&road_id)
            .ok_or(RoadError::UnknownRoad(road_id))?
            .set_speed_limit(speed_limit);
        Ok(())
    }

    pub fn set_texture_tiling(&mut self, road_id: RoadId, tiling: f32) -> RoadResult<()> {
        self.roads
            .get_mut(&road_id)
            .ok_or(RoadError::UnknownRoad(road_id))?
            .set_texture_tiling(tiling);
        Ok(())
    }

    /// Forget all registered obstacles
    pub fn clear_occupancy(&mut self) {
        for lane_map in self.occupancy.values_mut() {
            lane_map.clear();
        }
    }

    /// Register an obstacle at `distance` along a lane
    pub fn add_obstacle(&mut self, road_id: RoadId, lane: Lane, distance: f32, obstacle: LaneObstacle) {
        self.occupancy
            .entry((road_id, lane))
            .or_default()
            .entry(OrderedFloat(distance))
            .or_default()
            .push(obstacle);
    }

    /// Nearest obstacle within `max_range` ahead of `from_distance` on a lane
    ///
    /// Ring road lanes wrap, so obstacles just past the end of the lane count
    /// as being ahead of a vehicle near the end. `exclude` is skipped, normally the
    /// asking vehicle itself.
    pub fn find_obstacle_ahead(
        &self,
        road_id: RoadId,
        lane: Lane,
        from_distance: f32,
        max_range: f32,
        exclude: Option<ObstacleSource>,
    ) -> Option<ObstacleAhead> {
        let road = self.road(road_id)?;
        let lane_length = road.lane_length();
        let wraps = road.is_ring_road();
        if lane_length <= 0.0 {
            return None;
        }
        let lane_map = self.occupancy.get(&(road_id, lane))?;

        let from = from_distance.rem_euclid(lane_length);
        let end = from + max_range.min(lane_length);

        let ahead = lane_map
            .range(OrderedFloat(from)..=OrderedFloat(end.min(lane_length)))
            .map(move |(distance, obstacles)| (distance.0 - from, obstacles));
        let wrapped = (wraps && end > lane_length)
            .then(|| {
                lane_map
                    .range(..=OrderedFloat(end - lane_length))
                    .map(move |(distance, obstacles)| (distance.0 + lane_length - from, obstacles))
            })
            .into_iter()
            .flatten();

        ahead
            .chain(wrapped)
            .flat_map(|(distance, obstacles)| {
                obstacles
                    .iter()
                    .map(move |obstacle| ObstacleAhead {
                        obstacle: *obstacle,
                        distance,
                    })
            })
            .filter(|found| Some(found.obstacle.source) != exclude)
            .min_by_key(|found| OrderedFloat(found.distance))
    }

    /// Number of obstacles registered on a lane
    pub fn obstacle_count(&self, road_id: RoadId, lane: Lane) -> usize {
        self.occupancy
            .get(&(road_id, lane))
            .map(|lane_map| lane_map.values().map(Vec::len).sum())
            .unwrap_or_default()
    }
}
