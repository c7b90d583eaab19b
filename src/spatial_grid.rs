/*
 * Spatial Grid Module
 *
 * This module defines the SpatialGrid struct for neighbor lookups during the
 * flocking pass. It divides the canvas into square cells no smaller than the
 * largest perception radius, so a particle only has to look at the 3x3 block
 * of cells around it instead of the whole swarm.
 *
 * Particles that leave the canvas are clamped into the border cells, so every
 * particle is always indexed somewhere.
 */

use nannou::prelude::*;

pub struct SpatialGrid {
    pub cell_size: f32,
    pub columns: usize,
    pub rows: usize,
    pub grid: Vec<Vec<usize>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32, width: f32, height: f32) -> Self {
        let cell_size = cell_size.max(1.0);
        let columns = ((width / cell_size).ceil() as usize).max(1);
        let rows = ((height / cell_size).ceil() as usize).max(1);

        Self {
            cell_size,
            columns,
            rows,
            grid: vec![Vec::new(); columns * rows],
        }
    }

    // Clamped (column, row) for a canvas position
    #[inline]
    fn cell_coords(&self, pos: Point2) -> (usize, usize) {
        let x = (pos.x / self.cell_size).floor().clamp(0.0, (self.columns - 1) as f32) as usize;
        let y = (pos.y / self.cell_size).floor().clamp(0.0, (self.rows - 1) as f32) as usize;
        (x, y)
    }

    // Clear the grid
    pub fn clear(&mut self) {
        for cell in &mut self.grid {
            cell.clear();
        }
    }

    // Insert a particle into the grid
    #[inline]
    pub fn insert(&mut self, index: usize, position: Point2) {
        let (x, y) = self.cell_coords(position);
        self.grid[y * self.columns + x].push(index);
    }

    /// Move an indexed particle from one position to another.
    pub fn relocate(&mut self, index: usize, from: Point2, to: Point2) {
        let (x, y) = self.cell_coords(from);
        let cell = &mut self.grid[y * self.columns + x];
        if let Some(slot) = cell.iter().position(|&i| i == index) {
            cell.swap_remove(slot);
        }
        self.insert(index, to);
    }

    /// Rebuild the grid from a list of positions.
    pub fn rebuild<I: IntoIterator<Item = Point2>>(&mut self, positions: I) {
        self.clear();
        for (i, position) in positions.into_iter().enumerate() {
            self.insert(i, position);
        }
    }

    // Get indices within and adjacent to the cell containing the given position
    pub fn get_nearby_indices(&self, position: Point2) -> Vec<usize> {
        let (grid_x, grid_y) = self.cell_coords(position);
        let mut result = Vec::new();

        for check_y in grid_y.saturating_sub(1)..=(grid_y + 1).min(self.rows - 1) {
            let y_index = check_y * self.columns;
            for check_x in grid_x.saturating_sub(1)..=(grid_x + 1).min(self.columns - 1) {
                result.extend_from_slice(&self.grid[y_index + check_x]);
            }
        }

        result
    }
}
