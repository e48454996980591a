//! Road network validation tests
//!
//! Covers road management, active road selection, change notifications and
//! lane occupancy queries.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;
use road_traffic::simulation::{
    Lane, LaneObstacle, NetworkEvent, ObstacleSource, Observers, Ray, RoadError, RoadId,
    RoadSettings, SimId, SimRoadNetwork, SimVehicle, VehicleId, VehicleParams,
};

fn recorded_events(network: &mut SimRoadNetwork) -> Rc<RefCell<Vec<NetworkEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    network.subscribe(move |event| sink.borrow_mut().push(*event));
    events
}

/// Network that queues events for `drain_events`, as the simulation world does
fn queued_network() -> SimRoadNetwork {
    let mut network = SimRoadNetwork::new();
    network.enable_event_queue();
    network
}

fn vehicle_obstacle(id: usize) -> LaneObstacle {
    LaneObstacle {
        source: ObstacleSource::Vehicle(VehicleId(SimId(id))),
        length: 4.0,
    }
}

#[test]
fn test_create_road_becomes_active() {
    let mut network = SimRoadNetwork::new();
    let events = recorded_events(&mut network);

    let road_id = network.create_road(Vec3::ZERO).expect("road");

    assert_eq!(network.road_count(), 1);
    assert!(network.contains(road_id));
    assert_eq!(network.active_road(), Some(road_id));
    assert_eq!(
        events.borrow().as_slice(),
        &[
            NetworkEvent::RoadChanged(road_id),
            NetworkEvent::RoadSelected(road_id)
        ]
    );

    let road = network.road(road_id).expect("road data");
    assert_eq!(road.topology().node_count(), 4);
    assert_eq!(road.equidistant_points().len(), 11);
    assert_eq!(road.lane0().len(), 11);
    assert_eq!(road.lane1().len(), 11);
}

#[test]
fn test_active_road_must_be_in_network() {
    let mut network = SimRoadNetwork::new();
    let first = network.create_road(Vec3::ZERO).expect("road");
    let second = network.create_road(Vec3::new(0.0, 0.0, 20.0)).expect("road");
    assert_eq!(network.active_road(), Some(second));

    assert!(network.set_active_road(first));
    assert_eq!(network.active_road(), Some(first));

    assert!(!network.set_active_road(RoadId(SimId(99))));
    assert_eq!(network.active_road(), Some(first));
}

#[test]
fn test_remove_road() {
    let mut network = SimRoadNetwork::new();
    let road_id = network.create_road(Vec3::ZERO).expect("road");
    let events = recorded_events(&mut network);

    network.remove_road(road_id).expect("remove");

    assert_eq!(network.road_count(), 0);
    assert_eq!(network.active_road(), None);
    assert_eq!(events.borrow().as_slice(), &[NetworkEvent::RoadRemoved(road_id)]);
    assert_eq!(
        network.remove_road(road_id),
        Err(RoadError::UnknownRoad(road_id))
    );
}

#[test]
fn test_create_road_network_replaces_roads() {
    let mut network = SimRoadNetwork::new();
    let first = network.create_road(Vec3::ZERO).expect("road");
    let second = network.create_road(Vec3::new(30.0, 0.0, 0.0)).expect("road");

    let fresh = network.create_road_network(Vec3::ZERO).expect("network");

    assert_eq!(network.road_count(), 1);
    assert!(!network.contains(first));
    assert!(!network.contains(second));
    assert_eq!(network.active_road(), Some(fresh));
    assert_eq!(network.road_ids(), vec![fresh]);
}

#[test]
fn test_edits_regenerate_and_notify() {
    let mut network = queued_network();
    let road_id = network.create_road(Vec3::ZERO).expect("road");
    let generation = network.road(road_id).expect("road").generation();
    network.drain_events();
    let events = recorded_events(&mut network);

    network
        .create_section(road_id, Vec3::new(15.0, 0.0, 0.0))
        .expect("create section");

    let road = network.road(road_id).expect("road");
    assert_eq!(road.topology().node_count(), 7);
    assert_eq!(road.generation(), generation + 1);
    assert!(road.equidistant_points().len() > 11);
    assert_eq!(events.borrow().as_slice(), &[NetworkEvent::RoadChanged(road_id)]);
    assert_eq!(network.drain_events(), vec![NetworkEvent::RoadChanged(road_id)]);
    assert!(network.drain_events().is_empty());
}

#[test]
fn test_rejected_edit_does_not_notify() {
    let mut network = SimRoadNetwork::new();
    let road_id = network.create_road(Vec3::ZERO).expect("road");
    let events = recorded_events(&mut network);

    assert_eq!(network.remove_section(road_id, 3), Ok(false));
    assert_eq!(network.move_node(road_id, 17, Vec3::ONE), Ok(false));
    assert_eq!(network.split_section(road_id, 3), Ok(None));
    assert!(events.borrow().is_empty());

    assert_eq!(
        network.move_node(RoadId(SimId(42)), 0, Vec3::ONE),
        Err(RoadError::UnknownRoad(RoadId(SimId(42))))
    );
}

#[test]
fn test_split_and_ring_through_network() {
    let mut network = SimRoadNetwork::new();
    let road_id = network.create_road(Vec3::ZERO).expect("road");

    assert_eq!(network.split_section(road_id, 0), Ok(Some(3)));
    assert_eq!(network.set_ring_road(road_id, true), Ok(true));
    assert_eq!(network.set_ring_road(road_id, true), Ok(false));

    let road = network.road(road_id).expect("road");
    assert!(road.is_ring_road());
    assert_eq!(road.topology().node_count(), 9);
}

#[test]
fn test_ray_edits_through_network() {
    let mut network = SimRoadNetwork::new();
    let road_id = network.create_road(Vec3::ZERO).expect("road");
    let down = Vec3::NEG_Y;

    let placed = network
        .create_section_from_ray(road_id, &Ray::new(Vec3::new(12.0, 5.0, 0.0), down), None)
        .expect("create from ray");
    assert!(placed);
    assert_eq!(
        network.select_node(road_id, &Ray::new(Vec3::new(12.0, 5.0, 0.0), down), 1.0, 0.5),
        Some(6)
    );

    let removed = network
        .remove_section_at_ray(road_id, &Ray::new(Vec3::new(12.0, 5.0, 0.0), down), 1.0, 0.5)
        .expect("remove at ray");
    assert!(removed);
    assert_eq!(network.road(road_id).expect("road").topology().node_count(), 4);
}

#[test]
fn test_settings_changes() {
    let mut network = queued_network();
    let road_id = network.create_road(Vec3::ZERO).expect("road");
    network.drain_events();

    network.set_point_spacing(road_id, 2.0).expect("spacing");
    assert_eq!(network.road(road_id).expect("road").equidistant_points().len(), 6);
    assert_eq!(network.drain_events(), vec![NetworkEvent::RoadChanged(road_id)]);

    network.set_road_width(road_id, 8.0).expect("width");
    let road = network.road(road_id).expect("road");
    assert!((road.lane0()[0].position().z - 2.0).abs() < 1e-3);
    network.drain_events();

    // Neither changes the path, so nothing is announced
    network.set_speed_limit(road_id, 5.0).expect("speed limit");
    network.set_texture_tiling(road_id, 0.5).expect("tiling");
    assert!(network.drain_events().is_empty());
    assert_eq!(network.road(road_id).expect("road").speed_limit(), 5.0);
}

#[test]
fn test_failed_regeneration_keeps_geometry() {
    let mut network = queued_network();
    let road_id = network.create_road(Vec3::ZERO).expect("road");
    network.drain_events();

    let result = network.edit_road(road_id, |road| {
        road.set_max_points(3);
    });

    assert!(matches!(result, Err(RoadError::TooManyPoints { max: 3, .. })));
    assert_eq!(network.road(road_id).expect("road").equidistant_points().len(), 11);
    assert!(network.drain_events().is_empty());
}

#[test]
fn test_unsubscribe_stops_notifications() {
    let mut network = SimRoadNetwork::new();
    let count = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&count);
    let subscription = network.subscribe(move |_| *counter.borrow_mut() += 1);

    let road_id = network.create_road(Vec3::ZERO).expect("road");
    assert_eq!(*count.borrow(), 2);

    assert!(network.unsubscribe(subscription));
    assert!(!network.unsubscribe(subscription));
    network.set_point_spacing(road_id, 0.5).expect("spacing");
    assert_eq!(*count.borrow(), 2);
}

#[test]
fn test_find_obstacle_ahead_on_open_road() {
    let mut network = SimRoadNetwork::new();
    let road_id = network.create_road(Vec3::ZERO).expect("road");

    network.add_obstacle(road_id, Lane::Left, 2.0, vehicle_obstacle(0));
    network.add_obstacle(road_id, Lane::Left, 7.0, vehicle_obstacle(1));
    network.add_obstacle(road_id, Lane::Right, 4.0, vehicle_obstacle(2));
    assert_eq!(network.obstacle_count(road_id, Lane::Left), 2);

    let ahead = network
        .find_obstacle_ahead(road_id, Lane::Left, 3.0, 10.0, None)
        .expect("obstacle");
    assert_eq!(ahead.obstacle.source, ObstacleSource::Vehicle(VehicleId(SimId(1))));
    assert!((ahead.distance - 4.0).abs() < 1e-4);

    // The asking vehicle never sees itself
    let ahead = network
        .find_obstacle_ahead(
            road_id,
            Lane::Left,
            2.0,
            10.0,
            Some(ObstacleSource::Vehicle(VehicleId(SimId(0)))),
        )
        .expect("obstacle");
    assert_eq!(ahead.obstacle.source, ObstacleSource::Vehicle(VehicleId(SimId(1))));

    // Open roads do not wrap
    assert!(network
        .find_obstacle_ahead(road_id, Lane::Left, 8.0, 10.0, None)
        .is_none());
    // Out of range
    assert!(network
        .find_obstacle_ahead(road_id, Lane::Left, 3.0, 3.0, None)
        .is_none());

    network.clear_occupancy();
    assert_eq!(network.obstacle_count(road_id, Lane::Left), 0);
}

#[test]
fn test_find_obstacle_ahead_wraps_on_ring_road() {
    let mut network = SimRoadNetwork::new();
    let road_id = network.create_road(Vec3::ZERO).expect("road");
    network.set_ring_road(road_id, true).expect("ring");
    let lane_length = network.road(road_id).expect("road").lane_length();

    network.add_obstacle(road_id, Lane::Left, 1.0, vehicle_obstacle(0));

    let ahead = network
        .find_obstacle_ahead(road_id, Lane::Left, lane_length - 2.0, 5.0, None)
        .expect("wrapped obstacle");
    assert!((ahead.distance - 3.0).abs() < 1e-3);
}

#[test]
fn test_remove_road_clears_occupancy() {
    let mut network = SimRoadNetwork::new();
    let road_id = network.create_road(Vec3::ZERO).expect("road");
    network.add_obstacle(road_id, Lane::Left, 1.0, vehicle_obstacle(0));

    network.remove_road(road_id).expect("remove");
    assert_eq!(network.obstacle_count(road_id, Lane::Left), 0);
    assert!(network
        .find_obstacle_ahead(road_id, Lane::Left, 0.0, 5.0, None)
        .is_none());
}

/// Network whose roads may hold at most 15 equidistant points
fn capped_network() -> (SimRoadNetwork, RoadId) {
    let mut network = SimRoadNetwork::with_settings(RoadSettings {
        max_points: 15,
        ..RoadSettings::default()
    });
    network.enable_event_queue();
    let road_id = network.create_road(Vec3::ZERO).expect("road");
    network.drain_events();
    (network, road_id)
}

#[test]
fn test_failed_spacing_change_rolls_back_settings() {
    let (mut network, road_id) = capped_network();
    let generation = network.road(road_id).expect("road").generation();

    let result = network.set_point_spacing(road_id, 0.5);
    assert!(matches!(
        result,
        Err(RoadError::TooManyPoints { count: 16, max: 15 })
    ));

    let road = &network.road(road_id).expect("road").clone();
    let points = road.equidistant_points();
    assert_eq!(points.len(), 11);
    assert_eq!(road.point_spacing(), 1.0);
    assert_eq!(road.generation(), generation);
    for pair in points.windows(2) {
        let measured = pair[0].position().distance(pair[1].position());
        assert!((measured - road.point_spacing()).abs() < 1e-3, "spacing was {}", measured);
    }
    assert!((road.lane_length() - 11.0).abs() < 1e-4);
    assert!(network.drain_events().is_empty());

    // Vehicles placed afterwards step through the points at the real spacing
    let vehicle = SimVehicle::new(
        VehicleId(SimId(0)),
        road,
        Lane::Left,
        4,
        VehicleParams::default(),
    )
    .expect("vehicle");
    assert_eq!(vehicle.point_spacing(), 1.0);
    assert!((vehicle.travel_distance() - 4.0).abs() < 1e-4);
}

#[test]
fn test_failed_topology_edit_rolls_back_nodes() {
    let (mut network, road_id) = capped_network();
    let nodes = network.road(road_id).expect("road").topology().nodes().to_vec();

    let result = network.create_section(road_id, Vec3::new(100.0, 0.0, 0.0));
    assert!(matches!(result, Err(RoadError::TooManyPoints { max: 15, .. })));

    let road = network.road(road_id).expect("road");
    assert_eq!(road.topology().nodes(), nodes.as_slice());
    assert_eq!(road.equidistant_points().len(), 11);
    assert!(network.drain_events().is_empty());

    // A smaller edit still goes through afterwards
    assert_eq!(network.move_node(road_id, 3, Vec3::new(6.0, 0.0, 0.0)), Ok(true));
    assert_eq!(network.drain_events(), vec![NetworkEvent::RoadChanged(road_id)]);
}

#[test]
fn test_event_queue_is_opt_in() {
    let mut network = SimRoadNetwork::new();
    let events = recorded_events(&mut network);
    assert!(!network.is_event_queue_enabled());

    let road_id = network.create_road(Vec3::ZERO).expect("road");
    network.set_point_spacing(road_id, 2.0).expect("spacing");

    // Subscribers hear everything, but nothing piles up in the queue
    assert_eq!(events.borrow().len(), 3);
    assert!(network.drain_events().is_empty());

    network.enable_event_queue();
    assert!(network.is_event_queue_enabled());
    network.set_point_spacing(road_id, 1.0).expect("spacing");
    assert_eq!(network.drain_events(), vec![NetworkEvent::RoadChanged(road_id)]);
    assert!(network.drain_events().is_empty());
}

#[test]
fn test_observer_list_bookkeeping() {
    let mut observers: Observers<NetworkEvent> = Observers::new();
    assert!(observers.is_empty());

    let count = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&count);
    let first = observers.subscribe(move |_| *counter.borrow_mut() += 1);
    let second = observers.subscribe(|_| {});
    assert_eq!(observers.len(), 2);

    observers.notify(&NetworkEvent::RoadSelected(RoadId(SimId(0))));
    assert_eq!(*count.borrow(), 1);

    assert!(observers.unsubscribe(first));
    assert!(observers.unsubscribe(second));
    assert!(observers.is_empty());
}
