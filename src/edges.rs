/*
 * Edge Extraction Module
 *
 * Finds the oriented edge points of a silhouette inside a region of interest.
 * Each interior pixel gets a 3x3 Sobel gradient on channel 0 of the buffer;
 * pixels whose gradient magnitude clears the threshold become EdgePoints that
 * carry a short direction vector along the local contour.
 *
 * The extractor keeps no state between calls, so the same buffer and region
 * always produce the same edges.
 */

use nannou::prelude::*;

use crate::video::CHANNELS;

/// A pixel where the luminance gradient is strong enough to count as an edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgePoint {
    pub position: Point2,
    /// Unit gradient-perpendicular direction, scaled down.
    pub direction: Vec2,
    pub magnitude: f32,
}

impl EdgePoint {
    pub fn new(x: f32, y: f32, direction: Vec2) -> Self {
        Self {
            position: pt2(x, y),
            direction,
            magnitude: 0.0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.position.is_finite() && self.direction.is_finite() && self.magnitude.is_finite()
    }
}

/// Drop edges with non-finite fields, returning how many were removed.
pub fn sanitize_edges(edges: &mut Vec<EdgePoint>) -> usize {
    let before = edges.len();
    edges.retain(EdgePoint::is_valid);
    before - edges.len()
}

/// Half-open pixel rectangle `[start_x, end_x) x [start_y, end_y)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub start_x: usize,
    pub start_y: usize,
    pub end_x: usize,
    pub end_y: usize,
}

impl Region {
    pub fn new(start_x: usize, start_y: usize, end_x: usize, end_y: usize) -> Self {
        Self {
            start_x,
            start_y,
            end_x,
            end_y,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.start_x >= self.end_x || self.start_y >= self.end_y
    }
}

/// Borrowed RGBA buffer whose first channel carries luminance.
#[derive(Clone, Copy, Debug)]
pub struct LumaFrame<'a> {
    pub width: usize,
    pub height: usize,
    pub pixels: &'a [u8],
}

impl<'a> LumaFrame<'a> {
    // Channel-0 value at (x, y), None when the coordinate or byte is out of range
    #[inline]
    fn luma(&self, x: isize, y: isize) -> Option<f32> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        let index = (y as usize * self.width + x as usize) * CHANNELS;
        self.pixels.get(index).map(|&v| v as f32)
    }

    // The eight neighbours in reading order, or None if any falls off the buffer
    fn neighborhood(&self, x: usize, y: usize) -> Option<[f32; 8]> {
        let (x, y) = (x as isize, y as isize);
        Some([
            self.luma(x - 1, y - 1)?,
            self.luma(x, y - 1)?,
            self.luma(x + 1, y - 1)?,
            self.luma(x - 1, y)?,
            self.luma(x + 1, y)?,
            self.luma(x - 1, y + 1)?,
            self.luma(x, y + 1)?,
            self.luma(x + 1, y + 1)?,
        ])
    }
}

/// Sobel edge detector with a fixed magnitude threshold.
#[derive(Clone, Copy, Debug)]
pub struct EdgeExtractor {
    pub threshold: f32,
    pub direction_scale: f32,
}

impl Default for EdgeExtractor {
    fn default() -> Self {
        Self {
            threshold: 60.0,
            direction_scale: 0.1,
        }
    }
}

impl EdgeExtractor {
    pub fn new(threshold: f32, direction_scale: f32) -> Self {
        Self {
            threshold,
            direction_scale,
        }
    }

    pub fn extract(&self, frame: &LumaFrame<'_>, region: Region) -> Vec<EdgePoint> {
        let mut edges = Vec::new();
        if region.is_degenerate() {
            return edges;
        }

        for y in region.start_y..region.end_y {
            for x in region.start_x..region.end_x {
                // Keep a 2px border of the full buffer
                if x <= 1 || y <= 1 || x + 2 >= frame.width || y + 2 >= frame.height {
                    continue;
                }

                let Some([tl, t, tr, l, r, bl, b, br]) = frame.neighborhood(x, y) else {
                    continue;
                };

                let gx = (tr + 2.0 * r + br) - (tl + 2.0 * l + bl);
                let gy = (bl + 2.0 * b + br) - (tl + 2.0 * t + tr);
                let magnitude = (gx * gx + gy * gy).sqrt();

                if magnitude > self.threshold {
                    edges.push(EdgePoint {
                        position: pt2(x as f32, y as f32),
                        direction: vec2(-gx, gy).normalize_or_zero() * self.direction_scale,
                        magnitude,
                    });
                }
            }
        }

        edges
    }
}
