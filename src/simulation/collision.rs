//! Collision events and the listener that reports them

use glam::Vec3;
use log::{info, warn};

use super::traffic_light::SignalState;
use super::types::{TrafficLightId, VehicleId};

/// What a vehicle came into contact with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionTarget {
    Vehicle(VehicleId),
    /// A traffic light, with the state it was showing at contact
    TrafficLight {
        id: TrafficLightId,
        state: SignalState,
    },
}

/// Raised once when a vehicle's front bumper first touches an obstacle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    pub vehicle: VehicleId,
    pub target: CollisionTarget,
    pub position: Vec3,
    /// Simulation time of the contact
    pub time: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionKind {
    RedLightViolation,
    Collision,
}

impl CollisionEvent {
    /// Contact with a light showing green or amber is not an incident
    pub fn kind(&self) -> Option<CollisionKind> {
        match self.target {
            CollisionTarget::Vehicle(_) => Some(CollisionKind::Collision),
            CollisionTarget::TrafficLight { state, .. } if state.is_blocking() => {
                Some(CollisionKind::RedLightViolation)
            }
            CollisionTarget::TrafficLight { .. } => None,
        }
    }
}

/// Counts and logs collisions and red lights run
#[derive(Debug, Clone, Default)]
pub struct CollisionListener {
    collisions: usize,
    red_light_violations: usize,
}

impl CollisionListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_collision(&mut self, event: &CollisionEvent) -> Option<CollisionKind> {
        let kind = event.kind();
        match (kind, event.target) {
            (Some(CollisionKind::RedLightViolation), _) => {
                self.red_light_violations += 1;
                info!(
                    "Red light ran! Vehicle {:?} ran a red light at {:.1}s",
                    event.vehicle.0, event.time
                );
            }
            (Some(CollisionKind::Collision), CollisionTarget::Vehicle(other)) => {
                self.collisions += 1;
                warn!(
                    "Vehicle collision! Vehicle {:?} collided with vehicle {:?} at ({:.1}, {:.1})",
                    event.vehicle.0, other.0, event.position.x, event.position.z
                );
            }
            _ => {}
        }
        kind
    }

    pub fn collisions(&self) -> usize {
        self.collisions
    }

    pub fn red_light_violations(&self) -> usize {
        self.red_light_violations
    }
}
