//! A single editable road and its derived path data
//!
//! Derived arrays (equidistant points and both lanes) are shared snapshots:
//! every regeneration builds new arrays and swaps them in whole, so a
//! vehicle holding an older snapshot keeps reading consistent data.

use std::sync::Arc;

use glam::{Vec2, Vec3};
use log::debug;

use super::config::RoadSettings;
use super::error::RoadResult;
use super::lanes::project_lanes;
use super::mesh::{build_strip, texture_scale, RoadMesh};
use super::road_point::RoadPoint;
use super::sampler::{sample_equidistant, SamplerSettings};
use super::topology::RoadTopology;
use super::types::{Lane, RoadId};

#[derive(Debug, Clone)]
pub struct Road {
    id: RoadId,
    topology: RoadTopology,
    settings: RoadSettings,
    equidistant_points: Arc<[RoadPoint]>,
    lane0: Arc<[RoadPoint]>,
    lane1: Arc<[RoadPoint]>,
    /// Bumped every time the derived arrays are replaced
    generation: u64,
}

impl Road {
    /// Seeded road around `center`, with its path data generated
    pub fn new(id: RoadId, center: Vec3, settings: RoadSettings) -> RoadResult<Self> {
        Self::with_topology(id, RoadTopology::seeded(center), settings)
    }

    pub fn with_topology(
        id: RoadId,
        topology: RoadTopology,
        settings: RoadSettings,
    ) -> RoadResult<Self> {
        let mut road = Self {
            id,
            topology,
            settings: settings.clamped(),
            equidistant_points: Arc::from(Vec::new()),
            lane0: Arc::from(Vec::new()),
            lane1: Arc::from(Vec::new()),
            generation: 0,
        };
        road.regenerate()?;
        Ok(road)
    }

    pub fn id(&self) -> RoadId {
        self.id
    }

    pub fn topology(&self) -> &RoadTopology {
        &self.topology
    }

    pub fn topology_mut(&mut self) -> &mut RoadTopology {
        &mut self.topology
    }

    pub fn settings(&self) -> &RoadSettings {
        &self.settings
    }

    pub fn is_ring_road(&self) -> bool {
        self.topology.is_ring_road()
    }

    pub fn speed_limit(&self) -> f32 {
        self.settings.speed_limit
    }

    pub fn set_speed_limit(&mut self, value: f32) {
        self.settings.speed_limit = value.max(0.0);
    }

    pub fn road_width(&self) -> f32 {
        self.settings.road_width
    }

    pub fn set_road_width(&mut self, value: f32) {
        self.settings = RoadSettings {
            road_width: value,
            ..self.settings
        }
        .clamped();
    }

    pub fn texture_tiling(&self) -> f32 {
        self.settings.texture_tiling
    }

    pub fn set_texture_tiling(&mut self, value: f32) {
        self.settings = RoadSettings {
            texture_tiling: value,
            ..self.settings
        }
        .clamped();
    }

    pub fn point_spacing(&self) -> f32 {
        self.settings.point_spacing
    }

    pub fn set_point_spacing(&mut self, value: f32) {
        self.settings = RoadSettings {
            point_spacing: value,
            ..self.settings
        }
        .clamped();
    }

    pub fn point_accuracy(&self) -> f32 {
        self.settings.point_accuracy
    }

    pub fn set_point_accuracy(&mut self, value: f32) {
        self.settings = RoadSettings {
            point_accuracy: value,
            ..self.settings
        }
        .clamped();
    }

    pub fn set_max_points(&mut self, value: usize) {
        self.settings.max_points = value.max(1);
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn equidistant_points(&self) -> &[RoadPoint] {
        &self.equidistant_points
    }

    pub fn lane0(&self) -> &[RoadPoint] {
        &self.lane0
    }

    pub fn lane1(&self) -> &[RoadPoint] {
        &self.lane1
    }

    /// Shared snapshot of a lane's points
    pub fn lane_snapshot(&self, lane: Lane) -> Arc<[RoadPoint]> {
        match lane {
            Lane::Left => Arc::clone(&self.lane0),
            Lane::Right => Arc::clone(&self.lane1),
        }
    }

    /// Approximate driving length of one lane
    pub fn lane_length(&self) -> f32 {
        self.equidistant_points.len() as f32 * self.settings.point_spacing
    }

    fn sampler_settings(&self) -> SamplerSettings {
        SamplerSettings {
            spacing: self.settings.point_spacing,
            accuracy: self.settings.point_accuracy,
            max_points: self.settings.max_points,
        }
    }

    /// Resample the centerline and rebuild both lanes
    ///
    /// On failure the previous arrays are left untouched.
    pub fn regenerate(&mut self) -> RoadResult<()> {
        let points = sample_equidistant(&self.topology, &self.sampler_settings())?;
        let lanes = project_lanes(&points, self.settings.road_width);

        self.equidistant_points = Arc::from(points);
        self.lane0 = Arc::from(lanes.lane0);
        self.lane1 = Arc::from(lanes.lane1);
        self.generation += 1;

        debug!(
            "Road {:?} regenerated: {} nodes, {} points (generation {})",
            self.id,
            self.topology.node_count(),
            self.equidistant_points.len(),
            self.generation
        );
        Ok(())
    }

    /// Ribbon mesh of the current centerline
    pub fn build_mesh(&self) -> RoadMesh {
        build_strip(
            &self.equidistant_points,
            self.settings.road_width,
            self.topology.is_ring_road(),
        )
    }

    pub fn texture_scale(&self) -> Vec2 {
        texture_scale(
            self.settings.texture_tiling,
            self.equidistant_points.len(),
            self.settings.point_spacing,
        )
    }
}
