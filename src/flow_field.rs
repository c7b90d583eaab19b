/*
 * Flow Field Module
 *
 * A coarse grid of unit vectors laid over the canvas. Each cell's angle comes
 * from fractal Perlin noise, which gives neighbouring cells similar headings
 * and adds a smooth, organic drift to the particles.
 */

use nannou::prelude::*;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use crate::steering::from_angle;

// Noise-space step between neighbouring cells
const NOISE_STEP: f64 = 0.1;
// Full turns spanned by the noise range
const TURNS: f64 = 4.0;

pub struct FlowField {
    pub resolution: f32,
    pub columns: usize,
    pub rows: usize,
    // Column-major: cell (column, row) lives at column * rows + row
    cells: Vec<Vec2>,
    noise: Fbm<Perlin>,
    z: f64,
}

impl FlowField {
    pub fn new(resolution: f32, width: f32, height: f32, seed: u32) -> Self {
        let resolution = resolution.max(1.0);
        let columns = ((width / resolution).floor() as usize).max(1);
        let rows = ((height / resolution).floor() as usize).max(1);

        let noise = Fbm::<Perlin>::new(seed)
            .set_octaves(4)
            .set_persistence(0.5);

        let mut field = Self {
            resolution,
            columns,
            rows,
            cells: vec![Vec2::ZERO; columns * rows],
            noise,
            z: 0.0,
        };
        field.fill();
        field
    }

    /// Same noise, new canvas size.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.columns = ((width / self.resolution).floor() as usize).max(1);
        self.rows = ((height / self.resolution).floor() as usize).max(1);
        self.cells = vec![Vec2::ZERO; self.columns * self.rows];
        self.fill();
    }

    /// Re-fill from a shifted slice of the noise volume. The grid shape is kept.
    pub fn regenerate(&mut self, dz: f64) {
        self.z += dz;
        self.fill();
    }

    fn fill(&mut self) {
        for column in 0..self.columns {
            for row in 0..self.rows {
                let n = self.sample(column as f64 * NOISE_STEP, row as f64 * NOISE_STEP);
                let angle = n * std::f64::consts::TAU * TURNS;
                self.cells[column * self.rows + row] = from_angle(angle as f32);
            }
        }
    }

    // Noise remapped from [-1, 1] into [0, 1)
    fn sample(&self, x: f64, y: f64) -> f64 {
        let raw = self.noise.get([x, y, self.z]);
        ((raw + 1.0) * 0.5).clamp(0.0, 1.0 - f64::EPSILON)
    }

    /// Clamped (column, row) of the cell containing `position`.
    #[inline]
    pub fn cell_index(&self, position: Point2) -> (usize, usize) {
        let column = (position.x / self.resolution)
            .floor()
            .clamp(0.0, (self.columns - 1) as f32) as usize;
        let row = (position.y / self.resolution)
            .floor()
            .clamp(0.0, (self.rows - 1) as f32) as usize;
        (column, row)
    }

    /// Copy of the vector under `position`.
    #[inline]
    pub fn lookup(&self, position: Point2) -> Vec2 {
        let (column, row) = self.cell_index(position);
        self.cells[column * self.rows + row]
    }

    pub fn cell(&self, column: usize, row: usize) -> Option<Vec2> {
        if column < self.columns && row < self.rows {
            Some(self.cells[column * self.rows + row])
        } else {
            None
        }
    }
}
