/*
 * Debug Information Module
 *
 * This module defines the DebugInfo struct that contains performance metrics
 * and swarm state to be displayed in the UI.
 *
 * Includes metrics for:
 * - FPS (frames per second)
 * - Frame time
 * - Particle, edge and detection counts
 * - Recycling activity and detection status
 */

use std::time::Duration;

use crate::context::{FrameOutput, SimulationContext};

// Debug information to display
#[derive(Default)]
pub struct DebugInfo {
    pub fps: f32,
    pub frame_time: Duration,
    pub frames: u64,
    pub particles: usize,
    pub edges: usize,
    pub updated: usize,
    pub recycled: usize,
    pub total_recycled: u64,
    pub detections: usize,
    pub detection_in_flight: bool,
    pub frozen: bool,
}

impl DebugInfo {
    /// Refresh the swarm metrics after a simulation step.
    pub fn record(&mut self, context: &SimulationContext, output: &FrameOutput) {
        self.frames = context.frame_count;
        self.particles = context.particles.len();
        self.edges = output.edge_count;
        self.updated = output.stats.updated;
        self.recycled = output.stats.recycled;
        self.total_recycled += output.stats.recycled as u64;
        self.detections = context.detections.len();
        self.detection_in_flight = context.detection_in_flight();
        self.frozen = context.particles.is_frozen();
    }

    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("FPS: {:.1}", self.fps),
            format!("Frame time: {:.2} ms", self.frame_time.as_secs_f64() * 1000.0),
            format!("Particles: {}", self.particles),
            format!("Edge points: {}", self.edges),
            format!("Updated / recycled: {} / {}", self.updated, self.recycled),
            format!("Recycled total: {}", self.total_recycled),
            format!("Detections: {}", self.detections),
            format!(
                "Detector: {}",
                if self.detection_in_flight { "busy" } else { "idle" }
            ),
            format!("Swarm: {}", if self.frozen { "frozen" } else { "live" }),
        ]
    }
}
