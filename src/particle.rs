/*
 * Particle Module
 *
 * This module defines the Particle struct and its behavior.
 * Each particle is pulled toward its nearest silhouette edge and nudged by:
 * 1. Separation: Avoid crowding neighbors
 * 2. Alignment: Steer towards the average heading of neighbors
 * 3. Cohesion: Steer towards the average position of neighbors
 * 4. The local edge direction and the flow field under it
 *
 * Drawing data (trail segments, glow rings, core) is computed here as plain
 * numbers so the renderer only has to issue draw calls.
 */

use std::collections::VecDeque;

use nannou::color::{hsva, Hsva};
use nannou::prelude::*;
use rand::Rng;

use crate::edges::EdgePoint;
use crate::flow_field::FlowField;
use crate::params::{MotionVariant, SimulationParams};
use crate::steering::{map_range, Steer};

/// Number of glow rings drawn around each particle.
pub const GLOW_LAYERS: usize = 4;
/// Opacity of the solid core circle.
pub const CORE_ALPHA: f32 = 200.0 / 255.0;

/// The point a particle is steering toward this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Target {
    pub position: Point2,
    pub direction: Vec2,
}

impl From<&EdgePoint> for Target {
    fn from(edge: &EdgePoint) -> Self {
        Self {
            position: edge.position,
            direction: edge.direction,
        }
    }
}

/// Read-only copy of another particle's kinematics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    pub position: Point2,
    pub velocity: Vec2,
}

/// A warm HSV tint picked at spawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleColor {
    pub hue: f32,
    pub saturation: f32,
    pub value: f32,
}

impl ParticleColor {
    pub fn random_warm<R: Rng>(rng: &mut R) -> Self {
        Self {
            hue: rng.gen_range(0.0..0.3),
            saturation: rng.gen_range(0.8..1.0),
            value: rng.gen_range(0.9..1.0),
        }
    }

    pub fn with_alpha(&self, alpha: f32) -> Hsva {
        hsva(self.hue, self.saturation, self.value, alpha)
    }
}

/// One stroke of the fading tail.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrailSegment {
    pub start: Point2,
    pub end: Point2,
    pub alpha: f32,
    pub weight: f32,
}

/// One additive glow ring.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlowLayer {
    pub diameter: f32,
    pub alpha: f32,
}

#[derive(Clone, Debug)]
pub struct Particle {
    pub position: Point2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub size: f32,
    pub trail: VecDeque<Point2>,
    pub color: ParticleColor,
    // Updates survived; 0 means spawned this frame
    pub age: u32,
}

impl Particle {
    pub fn new(position: Point2, velocity: Vec2, size: f32, color: ParticleColor) -> Self {
        Self {
            position,
            velocity,
            acceleration: Vec2::ZERO,
            size,
            trail: VecDeque::new(),
            color,
            age: 0,
        }
    }

    /// Spawn on an edge, moving along its direction at a random fraction of its length.
    pub fn spawn<R: Rng>(edge: &EdgePoint, rng: &mut R) -> Self {
        let velocity = edge.direction * rng.gen_range(0.5..1.0);
        let size = rng.gen_range(0.5..1.0);
        let color = ParticleColor::random_warm(rng);
        Self::new(edge.position, velocity, size, color)
    }

    // Apply a force to the particle
    #[inline]
    pub fn apply_force(&mut self, force: Vec2) {
        self.acceleration += force;
    }

    pub fn snapshot(&self) -> Neighbor {
        Neighbor {
            position: self.position,
            velocity: self.velocity,
        }
    }

    /// Advance one frame toward `target`.
    pub fn update(
        &mut self,
        target: &Target,
        flow_field: &FlowField,
        neighbors: &[Neighbor],
        params: &SimulationParams,
    ) {
        if params.variant == MotionVariant::Flocking {
            let separation = self.separation(neighbors, params) * params.separation_weight;
            let alignment = self.alignment(neighbors, params) * params.alignment_weight;
            let cohesion = self.cohesion(neighbors, params) * params.cohesion_weight;
            self.apply_force(separation + alignment + cohesion);
        }

        // Edge attraction dominates the flocking terms
        let seek = (target.position - self.position).set_mag(params.seek_magnitude);
        self.apply_force(seek * params.seek_weight);
        self.apply_force(target.direction);
        self.apply_force(flow_field.lookup(self.position));

        self.velocity += self.acceleration;

        if params.variant == MotionVariant::EdgeSeek {
            let speed = self.velocity.length();
            if speed > params.max_speed {
                self.velocity = self.velocity.set_mag(params.max_speed);
            } else if speed > 0.0 && speed < params.min_speed {
                self.velocity = self.velocity.set_mag(params.min_speed);
            }
        }

        self.position += self.velocity;
        self.velocity *= params.damping();
        self.acceleration = Vec2::ZERO;

        self.push_trail(self.position, params.max_trail_length);
        self.age = self.age.saturating_add(1);
    }

    fn push_trail(&mut self, point: Point2, max_length: usize) {
        self.trail.push_back(point);
        while self.trail.len() > max_length {
            self.trail.pop_front();
        }
    }

    // Calculate separation force (avoid crowding neighbors)
    pub fn separation(&self, neighbors: &[Neighbor], params: &SimulationParams) -> Vec2 {
        let mut steering = Vec2::ZERO;
        let mut count = 0;

        for other in neighbors {
            let d = self.position.distance(other.position);

            if d > 0.0 && d < params.separation_radius {
                // Closer neighbors push harder
                let diff = (self.position - other.position).normalize_or_zero() / d;
                steering += diff;
                count += 1;
            }
        }

        if count > 0 {
            steering /= count as f32;
        }

        if steering.length_squared() > 0.0 {
            // Reynolds: Steering = Desired - Velocity
            steering = (steering.set_mag(params.flock_desired_speed) - self.velocity)
                .limit(params.max_force);
        }

        steering
    }

    // Calculate alignment force (steer towards average heading of neighbors)
    pub fn alignment(&self, neighbors: &[Neighbor], params: &SimulationParams) -> Vec2 {
        let mut sum = Vec2::ZERO;
        let mut count = 0;

        for other in neighbors {
            let d = self.position.distance(other.position);
            if d > 0.0 && d < params.alignment_radius {
                sum += other.velocity;
                count += 1;
            }
        }

        if count == 0 {
            return Vec2::ZERO;
        }

        let desired = (sum / count as f32).set_mag(params.flock_desired_speed);
        (desired - self.velocity).limit(params.max_force)
    }

    // Calculate cohesion force (steer towards average position of neighbors)
    pub fn cohesion(&self, neighbors: &[Neighbor], params: &SimulationParams) -> Vec2 {
        let mut sum = Vec2::ZERO;
        let mut count = 0;

        for other in neighbors {
            let d = self.position.distance(other.position);
            if d > 0.0 && d < params.cohesion_radius {
                sum += other.position;
                count += 1;
            }
        }

        if count == 0 {
            return Vec2::ZERO;
        }

        self.seek(sum / count as f32, params)
    }

    pub fn seek(&self, target: Point2, params: &SimulationParams) -> Vec2 {
        let desired = (target - self.position).set_mag(params.flock_desired_speed);
        (desired - self.velocity).limit(params.max_force)
    }

    /// Tail strokes from oldest (transparent, thin) to newest (opaque, full size).
    pub fn trail_segments(&self) -> Vec<TrailSegment> {
        let count = self.trail.len().saturating_sub(1);
        let last = count.saturating_sub(1) as f32;
        let thin = self.size * 0.25;

        self.trail
            .iter()
            .zip(self.trail.iter().skip(1))
            .enumerate()
            .map(|(i, (&start, &end))| TrailSegment {
                start,
                end,
                alpha: map_range(i as f32, 0.0, last, 0.0, 1.0),
                weight: map_range(i as f32, 0.0, last, thin, self.size),
            })
            .collect()
    }

    /// Glow rings from the outermost, faintest one inward.
    pub fn glow_layers(&self) -> [GlowLayer; GLOW_LAYERS] {
        let mut layers = [GlowLayer {
            diameter: 0.0,
            alpha: 0.0,
        }; GLOW_LAYERS];

        for (slot, i) in (1..=GLOW_LAYERS).rev().enumerate() {
            let i = i as f32;
            layers[slot] = GlowLayer {
                diameter: self.size + i * 4.0,
                alpha: map_range(i, GLOW_LAYERS as f32, 0.0, 10.0, 255.0) / 255.0,
            };
        }

        layers
    }
}
