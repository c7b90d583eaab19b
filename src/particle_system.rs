/*
 * Particle System Module
 *
 * Owns the swarm, its flow field and the random source used for spawning.
 * Every frame each particle is matched with its nearest edge point; particles
 * that drifted too far from the silhouette are replaced by fresh ones on a
 * random edge, the rest run their update rule against that edge.
 *
 * Optimized by:
 * - Taking one read-only neighbor snapshot per frame, so update order never
 *   changes the result
 * - Optionally gathering flocking neighbors through a spatial grid
 */

use log::{debug, info, trace, warn};
use nannou::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::edges::EdgePoint;
use crate::flow_field::FlowField;
use crate::params::{MotionVariant, SimulationParams};
use crate::particle::{Neighbor, Particle, Target};
use crate::spatial_grid::SpatialGrid;

/// What one call to `update` did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateStats {
    pub updated: usize,
    pub recycled: usize,
}

pub struct ParticleSystem {
    pub particles: Vec<Particle>,
    pub flow_field: FlowField,
    rng: StdRng,
    spatial_grid: Option<SpatialGrid>,
    width: f32,
    height: f32,
    frozen: bool,
    frames: u64,
}

impl ParticleSystem {
    pub fn new(params: &SimulationParams, width: f32, height: f32) -> Self {
        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(params, width, height, rng)
    }

    /// Build with an explicit random source.
    pub fn with_rng(params: &SimulationParams, width: f32, height: f32, mut rng: StdRng) -> Self {
        let flow_field = FlowField::new(params.flow_field_resolution, width, height, rng.gen());

        Self {
            particles: Vec::with_capacity(params.max_particles),
            flow_field,
            rng,
            spatial_grid: None,
            width,
            height,
            frozen: false,
            frames: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Drop every particle; the next frame with edges seeds a new swarm.
    pub fn reset(&mut self) {
        self.particles.clear();
        self.frozen = false;
    }

    /// Follow a canvas size change.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.flow_field.resize(width, height);
        self.spatial_grid = None;
    }

    /// Rebuild the flow field after its resolution changed.
    pub fn rebuild_flow_field(&mut self, params: &SimulationParams) {
        self.flow_field = FlowField::new(
            params.flow_field_resolution,
            self.width,
            self.height,
            self.rng.gen(),
        );
    }

    /// Replace the swarm with `max_particles` particles on random edges.
    pub fn initialize_particles(&mut self, edges: &[EdgePoint], params: &SimulationParams) {
        if edges.is_empty() {
            warn!("Cannot seed particles without edge points");
            return;
        }

        self.particles.clear();
        for _ in 0..params.max_particles {
            if let Some(edge) = edges.choose(&mut self.rng) {
                self.particles.push(Particle::spawn(edge, &mut self.rng));
            }
        }
        self.frozen = false;

        info!(
            "Seeded {} particles on {} edge points",
            self.particles.len(),
            edges.len()
        );
    }

    /// Advance the swarm one frame. With no edges nothing moves.
    pub fn update(&mut self, edges: &[EdgePoint], params: &SimulationParams) -> UpdateStats {
        let mut stats = UpdateStats::default();

        if edges.is_empty() {
            if !self.frozen {
                debug!("No edge points, freezing {} particles", self.particles.len());
                self.frozen = true;
            }
            return stats;
        }
        self.frozen = false;

        self.frames += 1;
        if params.flow_field_update_interval > 0
            && self.frames % params.flow_field_update_interval as u64 == 0
        {
            self.flow_field.regenerate(params.flow_field_drift);
        }

        let flocking = params.variant == MotionVariant::Flocking;
        let mut snapshot: Vec<Neighbor> = if flocking {
            self.particles.iter().map(Particle::snapshot).collect()
        } else {
            Vec::new()
        };

        let use_grid = flocking && params.enable_spatial_grid;
        if use_grid {
            self.prepare_grid(&snapshot, params);
        }
        let mut nearby: Vec<Neighbor> = Vec::new();

        // Reverse order so a replacement never shifts an unvisited particle
        for i in (0..self.particles.len()).rev() {
            let position = self.particles[i].position;
            let Some((edge, distance)) = nearest_edge(position, edges) else {
                continue;
            };

            if distance > params.recycle_distance {
                if let Some(spawn_edge) = edges.choose(&mut self.rng) {
                    self.particles[i] = Particle::spawn(spawn_edge, &mut self.rng);
                    stats.recycled += 1;

                    // Particles updated after this one see the replacement, not the stray
                    if let Some(slot) = snapshot.get_mut(i) {
                        let replacement = self.particles[i].snapshot();
                        if let (Some(grid), true) = (&mut self.spatial_grid, use_grid) {
                            grid.relocate(i, slot.position, replacement.position);
                        }
                        *slot = replacement;
                    }
                }
                continue;
            }

            let neighbors: &[Neighbor] = match (&self.spatial_grid, use_grid) {
                (Some(grid), true) => {
                    nearby.clear();
                    nearby.extend(
                        grid.get_nearby_indices(position)
                            .into_iter()
                            .map(|index| snapshot[index]),
                    );
                    &nearby
                }
                _ => &snapshot,
            };

            self.particles[i].update(&Target::from(edge), &self.flow_field, neighbors, params);
            stats.updated += 1;
        }

        trace!(
            "Updated {} particles, recycled {} against {} edges",
            stats.updated,
            stats.recycled,
            edges.len()
        );

        stats
    }

    fn prepare_grid(&mut self, snapshot: &[Neighbor], params: &SimulationParams) {
        let cell_size = params.max_neighbor_radius();
        let stale = match &self.spatial_grid {
            Some(grid) => (grid.cell_size - cell_size).abs() > f32::EPSILON,
            None => true,
        };
        if stale {
            self.spatial_grid = Some(SpatialGrid::new(cell_size, self.width, self.height));
        }
        if let Some(grid) = &mut self.spatial_grid {
            grid.rebuild(snapshot.iter().map(|n| n.position));
        }
    }
}

/// Closest edge by straight-line distance. Ties go to the earliest edge in the slice.
pub fn nearest_edge(position: Point2, edges: &[EdgePoint]) -> Option<(&EdgePoint, f32)> {
    let mut best: Option<(&EdgePoint, f32)> = None;
    for edge in edges {
        let d = position.distance_squared(edge.position);
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((edge, d)),
        }
    }
    best.map(|(edge, d)| (edge, d.sqrt()))
}
