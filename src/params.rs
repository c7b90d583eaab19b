/*
 * Simulation Parameters Module
 *
 * This module defines the SimulationParams struct that contains all the
 * tunable constants for edge extraction, the particle swarm and the detection
 * cadence. These parameters can be modified through the UI. It also provides
 * methods for parameter change detection so the app knows when the swarm or
 * the flow field has to be rebuilt.
 */

use std::time::Duration;

/// Which historical motion rule drives the particles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotionVariant {
    /// Separation, alignment and cohesion plus edge seeking, damped only.
    Flocking,
    /// Pure edge seeking with explicit min/max speed clamps.
    EdgeSeek,
}

impl MotionVariant {
    pub fn label(&self) -> &'static str {
        match self {
            MotionVariant::Flocking => "Flocking",
            MotionVariant::EdgeSeek => "Edge Seek",
        }
    }
}

// Parameters for the simulation that can be adjusted via UI
#[derive(Clone)]
pub struct SimulationParams {
    // Edge extraction
    pub edge_threshold: f32,
    pub edge_direction_scale: f32,
    pub roi_padding: f32,
    pub threshold_level: f32,

    // Swarm
    pub max_particles: usize,
    pub max_trail_length: usize,
    pub variant: MotionVariant,
    pub recycle_distance: f32,
    pub seed: Option<u64>,

    // Flocking
    pub separation_radius: f32,
    pub alignment_radius: f32,
    pub cohesion_radius: f32,
    pub separation_weight: f32,
    pub alignment_weight: f32,
    pub cohesion_weight: f32,
    pub flock_desired_speed: f32,
    pub max_force: f32,

    // Edge following
    pub seek_magnitude: f32,
    pub seek_weight: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    pub flocking_damping: f32,
    pub edge_seek_damping: f32,

    // Flow field
    pub flow_field_resolution: f32,
    pub flow_field_update_interval: u32,
    pub flow_field_drift: f64,

    // Detection cadence
    pub detection_interval: Duration,
    pub detection_frame_stride: u64,

    // Display and performance
    pub show_feed: bool,
    pub show_debug: bool,
    pub pause_simulation: bool,
    pub enable_spatial_grid: bool,

    // Internal state for tracking changes
    previous_values: Option<ParamSnapshot>,
}

// A snapshot of the values whose change requires rebuilding something
#[derive(Clone, PartialEq)]
struct ParamSnapshot {
    max_particles: usize,
    variant: MotionVariant,
    flow_field_resolution: f32,
    seed: Option<u64>,
}

/// What the app has to rebuild after the UI edited the parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParamChanges {
    pub reset_particles: bool,
    pub rebuild_flow_field: bool,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            edge_threshold: 60.0,
            edge_direction_scale: 0.1,
            roi_padding: 10.0,
            threshold_level: 0.4,

            max_particles: 300,
            max_trail_length: 20,
            variant: MotionVariant::Flocking,
            recycle_distance: 100.0,
            seed: None,

            separation_radius: 25.0,
            alignment_radius: 50.0,
            cohesion_radius: 50.0,
            separation_weight: 1.5,
            alignment_weight: 1.0,
            cohesion_weight: 1.0,
            flock_desired_speed: 1.0,
            max_force: 0.1,

            seek_magnitude: 0.5,
            seek_weight: 2.0,
            min_speed: 2.0,
            max_speed: 10.0,
            flocking_damping: 0.95,
            edge_seek_damping: 0.98,

            flow_field_resolution: 20.0,
            flow_field_update_interval: 0,
            flow_field_drift: 0.01,

            detection_interval: Duration::from_millis(100),
            detection_frame_stride: 10,

            show_feed: true,
            show_debug: false,
            pause_simulation: false,
            enable_spatial_grid: false,

            previous_values: None,
        }
    }
}

impl SimulationParams {
    /// Parameters with a fixed RNG seed, for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Damping factor of the active motion variant.
    pub fn damping(&self) -> f32 {
        match self.variant {
            MotionVariant::Flocking => self.flocking_damping,
            MotionVariant::EdgeSeek => self.edge_seek_damping,
        }
    }

    // Largest flocking radius, used to size the spatial grid cells
    pub fn max_neighbor_radius(&self) -> f32 {
        f32::max(
            self.separation_radius,
            f32::max(self.alignment_radius, self.cohesion_radius),
        )
    }

    // Take a snapshot of current parameter values for change detection
    pub fn take_snapshot(&mut self) {
        self.previous_values = Some(self.snapshot());
    }

    // Check which rebuild-worthy parameters changed since the last snapshot
    pub fn detect_changes(&self) -> ParamChanges {
        let Some(prev) = &self.previous_values else {
            return ParamChanges::default();
        };

        ParamChanges {
            reset_particles: self.max_particles != prev.max_particles
                || self.variant != prev.variant
                || self.seed != prev.seed,
            rebuild_flow_field: self.flow_field_resolution != prev.flow_field_resolution,
        }
    }

    fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot {
            max_particles: self.max_particles,
            variant: self.variant,
            flow_field_resolution: self.flow_field_resolution,
            seed: self.seed,
        }
    }

    // Get parameter ranges for UI sliders
    pub fn get_max_particles_range() -> std::ops::RangeInclusive<usize> {
        10..=2000
    }

    pub fn get_edge_threshold_range() -> std::ops::RangeInclusive<f32> {
        10.0..=500.0
    }

    pub fn get_threshold_level_range() -> std::ops::RangeInclusive<f32> {
        0.05..=0.95
    }

    pub fn get_speed_range() -> std::ops::RangeInclusive<f32> {
        0.0..=20.0
    }

    pub fn get_weight_range() -> std::ops::RangeInclusive<f32> {
        0.0..=3.0
    }

    pub fn get_radius_range() -> std::ops::RangeInclusive<f32> {
        10.0..=100.0
    }

    pub fn get_damping_range() -> std::ops::RangeInclusive<f32> {
        0.8..=1.0
    }

    pub fn get_recycle_distance_range() -> std::ops::RangeInclusive<f32> {
        20.0..=400.0
    }

    pub fn get_resolution_range() -> std::ops::RangeInclusive<f32> {
        5.0..=80.0
    }
}
