//! Traffic light logic for the traffic simulation
//!
//! A light sits at a point on one lane and is green or red in each mode of
//! its group. Switching goes through amber (green to red) or red-amber
//! (red to green) for the group's transition time.

use log::debug;

use super::types::{Lane, RoadId, TrafficLightId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalState {
    Red,
    RedAmber,
    Green,
    Amber,
}

impl SignalState {
    /// Red and red-amber stop traffic
    pub fn is_blocking(self) -> bool {
        matches!(self, SignalState::Red | SignalState::RedAmber)
    }

    /// Single character used by the ASCII map
    pub fn symbol(self) -> char {
        match self {
            SignalState::Red => 'R',
            SignalState::RedAmber => 'r',
            SignalState::Green => 'G',
            SignalState::Amber => 'A',
        }
    }
}

/// A traffic light in the traffic simulation
#[derive(Debug, Clone)]
pub struct TrafficLight {
    pub id: TrafficLightId,
    pub road: RoadId,
    pub lane: Lane,
    /// Index into the lane's points where the stop line sits
    pub point_index: usize,
    /// Green (`true`) or red (`false`) in each group mode; missing modes are red
    pub modes: Vec<bool>,
    state: SignalState,
    /// Final state and seconds left while amber or red-amber is showing
    transition: Option<(SignalState, f32)>,
}

impl TrafficLight {
    pub fn new(
        id: TrafficLightId,
        road: RoadId,
        lane: Lane,
        point_index: usize,
        modes: Vec<bool>,
    ) -> Self {
        Self {
            id,
            road,
            lane,
            point_index,
            modes,
            state: SignalState::Red,
            transition: None,
        }
    }

    pub fn state(&self) -> SignalState {
        self.state
    }

    pub fn is_blocking(&self) -> bool {
        self.state.is_blocking()
    }

    pub fn is_green_in(&self, mode: usize) -> bool {
        self.modes.get(mode).copied().unwrap_or(false)
    }

    /// State the light is showing or heading toward
    pub fn target_state(&self) -> SignalState {
        self.transition.map_or(self.state, |(target, _)| target)
    }

    /// Start moving toward the setting of `mode`
    pub fn update_mode(&mut self, mode: usize, transition_time: f32) {
        let target = if self.is_green_in(mode) {
            SignalState::Green
        } else {
            SignalState::Red
        };
        if target == self.target_state() {
            return;
        }

        if transition_time <= 0.0 {
            self.state = target;
            self.transition = None;
            return;
        }

        self.state = match target {
            SignalState::Green => SignalState::RedAmber,
            _ => SignalState::Amber,
        };
        self.transition = Some((target, transition_time));
    }

    /// Show the setting of `mode` immediately
    pub fn set_mode(&mut self, mode: usize) {
        self.update_mode(mode, 0.0);
    }

    /// Advance any running transition
    pub fn tick(&mut self, delta_secs: f32) {
        let Some((target, remaining)) = self.transition else {
            return;
        };
        let remaining = remaining - delta_secs;
        if remaining <= 0.0 {
            self.state = target;
            self.transition = None;
        } else {
            self.transition = Some((target, remaining));
        }
    }
}

/// Lights that change mode together on a fixed schedule
#[derive(Debug, Clone)]
pub struct TrafficLightGroup {
    pub lights: Vec<TrafficLight>,
    /// Seconds spent in each mode; the length sets the number of modes
    mode_durations: Vec<f32>,
    transition_time: f32,
    current_mode: usize,
    /// Seconds since the last mode change
    time: f32,
}

impl TrafficLightGroup {
    pub fn new(
        lights: Vec<TrafficLight>,
        mode_durations: Vec<f32>,
        transition_time: f32,
        starting_mode: usize,
    ) -> Self {
        let current_mode = if mode_durations.is_empty() {
            0
        } else {
            starting_mode % mode_durations.len()
        };

        let mut group = Self {
            lights,
            mode_durations,
            transition_time: transition_time.max(0.0),
            current_mode,
            time: 0.0,
        };
        for light in &mut group.lights {
            light.set_mode(current_mode);
        }
        group
    }

    pub fn current_mode(&self) -> usize {
        self.current_mode
    }

    pub fn mode_count(&self) -> usize {
        self.mode_durations.len()
    }

    pub fn transition_time(&self) -> f32 {
        self.transition_time
    }

    /// Advance the schedule; returns whether the mode changed
    pub fn tick(&mut self, delta_secs: f32) -> bool {
        for light in &mut self.lights {
            light.tick(delta_secs);
        }

        let Some(&duration) = self.mode_durations.get(self.current_mode) else {
            return false;
        };
        self.time += delta_secs;
        if self.time < duration {
            return false;
        }

        self.time = 0.0;
        self.current_mode = (self.current_mode + 1) % self.mode_durations.len();
        debug!("Traffic light group switched to mode {}", self.current_mode);
        for light in &mut self.lights {
            light.update_mode(self.current_mode, self.transition_time);
        }
        true
    }

    pub fn light(&self, id: TrafficLightId) -> Option<&TrafficLight> {
        self.lights.iter().find(|light| light.id == id)
    }
}
