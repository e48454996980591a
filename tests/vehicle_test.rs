//! Vehicle controller validation tests
//!
//! Covers the speed factors, velocity easing and lane travel of a single
//! vehicle, plus traffic light schedules and collision classification.

use glam::Vec3;
use road_traffic::simulation::{
    lane_travel_distance, obstruction_factor, turning_factor, CollisionEvent, CollisionKind,
    CollisionListener, CollisionTarget, Lane, Road, RoadId, RoadPoint, RoadSettings,
    RoadTopology, SignalState, SimId, SimVehicle, TrafficLight, TrafficLightGroup,
    TrafficLightId, VehicleId, VehicleParams,
};

const EPSILON: f32 = 1e-3;

/// Open straight road from x = 0 to x = `length`, one point per unit
fn straight_road(length: f32) -> Road {
    let topology = RoadTopology::from_nodes(vec![
        Vec3::ZERO,
        Vec3::new(length / 3.0, 0.0, 0.0),
        Vec3::new(length * 2.0 / 3.0, 0.0, 0.0),
        Vec3::new(length, 0.0, 0.0),
    ])
    .expect("nodes");
    Road::with_topology(RoadId(SimId(0)), topology, RoadSettings::default()).expect("road")
}

fn params() -> VehicleParams {
    VehicleParams {
        randomise_starting_position: false,
        ..VehicleParams::default()
    }
}

fn vehicle_on(road: &Road, lane: Lane, start_point: usize) -> SimVehicle {
    SimVehicle::new(VehicleId(SimId(1)), road, lane, start_point, params()).expect("vehicle")
}

#[test]
fn test_obstruction_factor() {
    assert_eq!(obstruction_factor(None, 10.0, 0.2), 1.0);
    assert!((obstruction_factor(Some(5.0), 10.0, 0.0) - 0.5).abs() < 1e-6);
    assert_eq!(obstruction_factor(Some(0.0), 10.0, 0.2), 0.0);
    assert!((obstruction_factor(Some(10.0), 10.0, 0.2) - 1.0).abs() < 1e-6);
    assert_eq!(obstruction_factor(Some(25.0), 10.0, 0.2), 1.0);
    // More braking slows down earlier
    assert!(obstruction_factor(Some(5.0), 10.0, 1.0) < obstruction_factor(Some(5.0), 10.0, 0.0));
}

#[test]
fn test_turning_factor_on_straight_path() {
    let path: Vec<RoadPoint> = (0..20)
        .map(|i| RoadPoint::new(Vec3::new(i as f32, 0.0, 0.0), Vec3::X))
        .collect();
    assert_eq!(turning_factor(&path, 3, 1, 5, 3.0, 0.4), 1.0);
}

#[test]
fn test_turning_factor_on_corner() {
    // Five points heading along X followed by five heading along Z
    let path: Vec<RoadPoint> = (0..10)
        .map(|i| {
            let forward = if i < 5 { Vec3::X } else { Vec3::Z };
            RoadPoint::new(Vec3::new(i as f32, 0.0, 0.0), forward)
        })
        .collect();

    let factor = turning_factor(&path, 0, 1, 10, 3.0, 0.4);
    let average = std::f32::consts::SQRT_2 / 2.0;
    let expected = 1.0 - 0.6 * average.powi(3);
    assert!((factor - expected).abs() < EPSILON, "factor was {}", factor);
}

#[test]
fn test_turning_factor_never_drops_below_minimum() {
    let path: Vec<RoadPoint> = (0..10)
        .map(|i| {
            let forward = if i == 0 { Vec3::X } else { Vec3::NEG_X };
            RoadPoint::new(Vec3::new(i as f32, 0.0, 0.0), forward)
        })
        .collect();
    assert_eq!(turning_factor(&path, 0, 1, 10, 3.0, 0.4), 0.4);
}

#[test]
fn test_lane_travel_distance() {
    assert!((lane_travel_distance(Lane::Left, 3.5, 10, 2.0) - 7.0).abs() < 1e-6);
    assert!((lane_travel_distance(Lane::Right, 3.5, 10, 2.0) - 13.0).abs() < 1e-6);
    assert_eq!(lane_travel_distance(Lane::Right, 0.0, 10, 2.0), 0.0);
    assert_eq!(lane_travel_distance(Lane::Left, 4.0, 0, 2.0), 0.0);
}

#[test]
fn test_velocity_converges_to_top_speed() {
    let road = straight_road(200.0);
    let mut vehicle = vehicle_on(&road, Lane::Left, 0);

    for _ in 0..60 {
        let update = vehicle.update(0.1, road.speed_limit(), None);
        assert!(vehicle.velocity <= 10.0 + 1e-5, "velocity was {}", vehicle.velocity);
        assert!((update.target_speed - 10.0).abs() < 1e-5);
        assert!(vehicle.time >= 0.0 && vehicle.time < 1.0);
    }
    assert!((vehicle.velocity - 10.0).abs() < 1e-5);
    assert!(vehicle.current_point > 0);
}

#[test]
fn test_speed_limit_caps_target() {
    let road = straight_road(200.0);
    let mut vehicle = vehicle_on(&road, Lane::Left, 0);

    for _ in 0..30 {
        vehicle.update(0.1, 4.0, None);
    }
    assert!((vehicle.velocity - 4.0).abs() < 1e-5);
    assert!((vehicle.target_speed(4.0, None) - 4.0).abs() < 1e-5);
}

#[test]
fn test_braking_is_immediate() {
    let road = straight_road(200.0);
    let mut vehicle = vehicle_on(&road, Lane::Left, 0);
    for _ in 0..20 {
        vehicle.update(0.1, 20.0, None);
    }
    assert!(vehicle.velocity > 9.0);

    let update = vehicle.update(0.1, 20.0, Some(0.0));
    assert_eq!(update.obstruction_factor, 0.0);
    assert_eq!(vehicle.velocity, 0.0);
}

#[test]
fn test_vehicle_follows_lane_direction() {
    let road = straight_road(200.0);

    let mut left = vehicle_on(&road, Lane::Left, 100);
    let mut right = vehicle_on(&road, Lane::Right, 100);
    for _ in 0..20 {
        left.update(0.1, 20.0, None);
        right.update(0.1, 20.0, None);
    }

    assert!(left.current_point > 100);
    assert!(right.current_point < 100);
    assert!(left.position.x > 100.0);
    assert!(right.position.x < 100.0);
    // Left lane sits on the +Z side of a road running along +X
    assert!(left.position.z > 0.0);
    assert!(right.position.z < 0.0);
    assert!(left.forward.dot(Vec3::X) > 0.99);
    assert!(right.forward.dot(Vec3::NEG_X) > 0.99);
    assert!(right.travel_distance() > (200.0 - 100.0));
}

#[test]
fn test_switching_lanes_reverses_direction() {
    let road = straight_road(200.0);
    let mut vehicle = vehicle_on(&road, Lane::Left, 100);
    assert_eq!(Lane::Left.opposite(), Lane::Right);
    assert_eq!(Lane::Right.opposite(), Lane::Left);

    vehicle.set_lane(vehicle.lane.opposite());
    assert_eq!(vehicle.lane, Lane::Right);
    assert_eq!(vehicle.current_point, 100);
    assert_eq!(vehicle.path().len(), road.lane1().len());

    for _ in 0..20 {
        vehicle.update(0.1, 20.0, None);
    }
    assert!(vehicle.current_point < 100);
    assert!(vehicle.position.z < 0.0);
}

#[test]
fn test_start_point_wraps_into_lane() {
    let road = straight_road(10.0);
    let vehicle = vehicle_on(&road, Lane::Left, 25);
    assert_eq!(vehicle.current_point, 25 % 11);
}

#[test]
fn test_refresh_route_wraps_current_point() {
    let road = straight_road(200.0);
    let mut vehicle = vehicle_on(&road, Lane::Left, 150);

    let shorter = straight_road(50.0);
    vehicle.refresh_route(&shorter);

    assert_eq!(vehicle.path().len(), 51);
    assert_eq!(vehicle.current_point, 150 % 51);
    assert_eq!(vehicle.route_generation(), shorter.generation());
}

#[test]
fn test_zero_top_speed_stays_still() {
    let road = straight_road(50.0);
    let mut vehicle = SimVehicle::new(
        VehicleId(SimId(1)),
        &road,
        Lane::Left,
        0,
        VehicleParams {
            top_speed: 0.0,
            ..params()
        },
    )
    .expect("vehicle");

    for _ in 0..10 {
        vehicle.update(0.1, 20.0, None);
    }
    assert_eq!(vehicle.velocity, 0.0);
    assert_eq!(vehicle.current_point, 0);
    assert!(vehicle.turning_factor().is_finite());
}

fn light(modes: Vec<bool>) -> TrafficLight {
    TrafficLight::new(
        TrafficLightId(SimId(0)),
        RoadId(SimId(0)),
        Lane::Left,
        10,
        modes,
    )
}

#[test]
fn test_traffic_light_group_cycle() {
    let mut group = TrafficLightGroup::new(vec![light(vec![true, false])], vec![8.0, 8.0], 1.5, 0);
    assert_eq!(group.lights[0].state(), SignalState::Green);
    assert_eq!(group.mode_count(), 2);
    assert_eq!(group.transition_time(), 1.5);

    assert!(!group.tick(4.0));
    assert!(group.tick(4.0));
    assert_eq!(group.current_mode(), 1);
    assert_eq!(group.lights[0].state(), SignalState::Amber);
    assert!(!group.lights[0].is_blocking());

    group.tick(1.0);
    assert_eq!(group.lights[0].state(), SignalState::Amber);
    group.tick(0.5);
    assert_eq!(group.lights[0].state(), SignalState::Red);
    assert!(group.lights[0].is_blocking());

    // Back to mode 0 goes through red-amber, which still blocks
    assert!(group.tick(6.5));
    assert_eq!(group.current_mode(), 0);
    assert_eq!(group.lights[0].state(), SignalState::RedAmber);
    assert!(group.lights[0].is_blocking());
    group.tick(1.5);
    assert_eq!(group.lights[0].state(), SignalState::Green);
}

#[test]
fn test_traffic_light_missing_mode_is_red() {
    let mut group = TrafficLightGroup::new(vec![light(vec![true])], vec![5.0, 5.0], 0.0, 1);
    assert_eq!(group.lights[0].state(), SignalState::Red);

    group.tick(5.0);
    assert_eq!(group.current_mode(), 0);
    assert_eq!(group.lights[0].state(), SignalState::Green);
}

#[test]
fn test_traffic_light_group_without_modes_never_changes() {
    let mut group = TrafficLightGroup::new(vec![light(vec![false])], Vec::new(), 1.0, 3);
    assert!(!group.tick(100.0));
    assert_eq!(group.current_mode(), 0);
    assert_eq!(group.lights[0].state(), SignalState::Red);
}

fn collision_with(target: CollisionTarget) -> CollisionEvent {
    CollisionEvent {
        vehicle: VehicleId(SimId(1)),
        target,
        position: Vec3::ZERO,
        time: 0.0,
    }
}

#[test]
fn test_collision_classification() {
    let light_id = TrafficLightId(SimId(7));
    let with_light = |state| collision_with(CollisionTarget::TrafficLight { id: light_id, state });

    assert_eq!(
        collision_with(CollisionTarget::Vehicle(VehicleId(SimId(2)))).kind(),
        Some(CollisionKind::Collision)
    );
    assert_eq!(with_light(SignalState::Red).kind(), Some(CollisionKind::RedLightViolation));
    assert_eq!(
        with_light(SignalState::RedAmber).kind(),
        Some(CollisionKind::RedLightViolation)
    );
    assert_eq!(with_light(SignalState::Green).kind(), None);
    assert_eq!(with_light(SignalState::Amber).kind(), None);
}

#[test]
fn test_collision_listener_counts() {
    let mut listener = CollisionListener::new();
    listener.on_collision(&collision_with(CollisionTarget::Vehicle(VehicleId(SimId(2)))));
    listener.on_collision(&collision_with(CollisionTarget::TrafficLight {
        id: TrafficLightId(SimId(7)),
        state: SignalState::Red,
    }));
    listener.on_collision(&collision_with(CollisionTarget::TrafficLight {
        id: TrafficLightId(SimId(7)),
        state: SignalState::Green,
    }));

    assert_eq!(listener.collisions(), 1);
    assert_eq!(listener.red_light_violations(), 1);
}
