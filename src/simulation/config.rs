//! Simulation configuration
//!
//! Every field has a default, so a RON file only needs to name what it
//! changes. Values are clamped into their valid ranges when applied.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::types::{Lane, MAX_EQUIDISTANT_POINTS};

pub const MIN_ROAD_WIDTH: f32 = 0.1;
pub const MIN_POINT_SPACING: f32 = 0.05;
pub const MAX_POINT_SPACING: f32 = 4.0;
pub const MIN_TEXTURE_TILING: f32 = 0.01;
pub const MAX_TEXTURE_TILING: f32 = 1.0;

/// Per-road geometry and traffic settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadSettings {
    /// Maximum speed vehicles on this road will travel at
    pub speed_limit: f32,
    /// Total width of the carriageway
    pub road_width: f32,
    /// Texture repeats per unit of road length
    pub texture_tiling: f32,
    /// Distance between equidistant points; smaller is smoother but slower
    pub point_spacing: f32,
    /// 0..1, how finely curves are walked while resampling
    pub point_accuracy: f32,
    /// Resampling fails instead of producing more points than this
    pub max_points: usize,
}

impl Default for RoadSettings {
    fn default() -> Self {
        Self {
            speed_limit: 20.0,
            road_width: 3.5,
            texture_tiling: 0.07,
            point_spacing: 1.0,
            point_accuracy: 1.0,
            max_points: MAX_EQUIDISTANT_POINTS,
        }
    }
}

impl RoadSettings {
    /// Copy of these settings with every value inside its valid range
    pub fn clamped(self) -> Self {
        Self {
            speed_limit: self.speed_limit.max(0.0),
            road_width: self.road_width.max(MIN_ROAD_WIDTH),
            texture_tiling: self.texture_tiling.clamp(MIN_TEXTURE_TILING, MAX_TEXTURE_TILING),
            point_spacing: self.point_spacing.clamp(MIN_POINT_SPACING, MAX_POINT_SPACING),
            point_accuracy: self.point_accuracy.clamp(0.0, 1.0),
            max_points: self.max_points.max(1),
        }
    }
}

/// Driving behaviour of a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleParams {
    /// Speed the vehicle holds when nothing slows it down
    pub top_speed: f32,
    /// How quickly the vehicle speeds up toward its target; braking is immediate
    pub acceleration: f32,
    /// How far ahead corners and obstructions are checked
    pub speed_check_distance: f32,
    /// Higher values start braking further from an obstruction
    pub obstruction_braking_amount: f32,
    /// Exponent shaping how strongly curvature ahead reduces speed
    pub turning_sharpness: f32,
    /// Lower bound of the cornering speed factor (0..1)
    pub minimum_turning_factor: f32,
    /// Bumper-to-bumper length along the lane
    pub length: f32,
    /// Spawn at a random point and lane instead of the start of lane 0
    pub randomise_starting_position: bool,
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            top_speed: 10.0,
            acceleration: 2.0,
            speed_check_distance: 10.0,
            obstruction_braking_amount: 0.2,
            turning_sharpness: 3.0,
            minimum_turning_factor: 0.4,
            length: 4.0,
            randomise_starting_position: true,
        }
    }
}

impl VehicleParams {
    pub fn clamped(self) -> Self {
        Self {
            top_speed: self.top_speed.max(0.0),
            acceleration: self.acceleration.max(0.0),
            speed_check_distance: self.speed_check_distance.max(f32::EPSILON),
            obstruction_braking_amount: self.obstruction_braking_amount.max(0.0),
            turning_sharpness: self.turning_sharpness.max(0.0),
            minimum_turning_factor: self.minimum_turning_factor.clamp(0.0, 1.0),
            length: self.length.max(0.0),
            ..self
        }
    }
}

/// A traffic light placed on a lane of the demo road
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficLightConfig {
    pub lane: Lane,
    /// Index into the lane's points where the stop line sits
    pub point_index: usize,
    /// Green (`true`) or red (`false`) for each group mode
    pub modes: Vec<bool>,
}

/// A set of lights that change mode together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficLightGroupConfig {
    pub lights: Vec<TrafficLightConfig>,
    /// Seconds spent in each mode, the length sets the number of modes
    pub mode_durations: Vec<f32>,
    /// Seconds of amber / red-amber between red and green
    pub transition_time: f32,
    pub starting_mode: usize,
}

impl Default for TrafficLightGroupConfig {
    fn default() -> Self {
        Self {
            lights: Vec::new(),
            mode_durations: vec![8.0, 8.0],
            transition_time: 1.5,
            starting_mode: 0,
        }
    }
}

/// Top-level configuration of a headless run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub road: RoadSettings,
    pub vehicle: VehicleParams,
    pub vehicle_count: usize,
    pub seed: Option<u64>,
    /// Close the demo road into a loop
    pub ring_road: bool,
    pub traffic_lights: Vec<TrafficLightGroupConfig>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            road: RoadSettings::default(),
            vehicle: VehicleParams::default(),
            vehicle_count: 8,
            seed: None,
            ring_road: true,
            traffic_lights: Vec::new(),
        }
    }
}

impl SimConfig {
    /// Parse a configuration from RON text
    pub fn from_ron(text: &str) -> Result<Self> {
        let config: SimConfig = ron::from_str(text).context("Invalid simulation config")?;
        Ok(config.clamped())
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Couldn't read config file {}", path.display()))?;
        Self::from_ron(&text).with_context(|| format!("Couldn't load {}", path.display()))
    }

    pub fn clamped(mut self) -> Self {
        self.road = self.road.clamped();
        self.vehicle = self.vehicle.clamped();
        self
    }
}
