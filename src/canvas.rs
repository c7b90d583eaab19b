/*
 * Canvas Module
 *
 * The simulation works in canvas pixels (origin top-left, y down) like the
 * video it is traced from, while nannou draws with the origin at the window
 * centre and y up. This module converts between the two.
 */

use nannou::prelude::*;

use crate::detection::CanvasBox;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Canvas {
    pub width: f32,
    pub height: f32,
}

impl Canvas {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn from_window_rect(window_rect: Rect) -> Self {
        Self::new(window_rect.w(), window_rect.h())
    }

    /// Integer pixel size, at least 1x1.
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            (self.width.round() as u32).max(1),
            (self.height.round() as u32).max(1),
        )
    }

    // Convert a point from canvas space to screen space
    pub fn to_screen(&self, point: Point2) -> Point2 {
        pt2(point.x - self.width / 2.0, self.height / 2.0 - point.y)
    }

    // Convert a point from screen space to canvas space
    pub fn to_canvas(&self, point: Point2) -> Point2 {
        pt2(point.x + self.width / 2.0, self.height / 2.0 - point.y)
    }

    /// Screen-space rectangle covering a canvas box.
    pub fn box_to_screen(&self, bbox: &CanvasBox) -> Rect {
        let top_left = self.to_screen(pt2(bbox.x, bbox.y));
        let bottom_right = self.to_screen(pt2(bbox.x + bbox.width, bbox.y + bbox.height));
        Rect::from_corners(top_left, bottom_right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_map_to_window_corners() {
        let canvas = Canvas::new(200.0, 100.0);
        assert_eq!(canvas.to_screen(pt2(0.0, 0.0)), pt2(-100.0, 50.0));
        assert_eq!(canvas.to_screen(pt2(200.0, 100.0)), pt2(100.0, -50.0));
        assert_eq!(canvas.to_screen(pt2(100.0, 50.0)), pt2(0.0, 0.0));
    }

    #[test]
    fn round_trips() {
        let canvas = Canvas::new(640.0, 480.0);
        let p = pt2(12.5, 301.0);
        assert_eq!(canvas.to_canvas(canvas.to_screen(p)), p);
    }

    #[test]
    fn box_keeps_its_size() {
        let canvas = Canvas::new(200.0, 100.0);
        let rect = canvas.box_to_screen(&CanvasBox {
            x: 10.0,
            y: 10.0,
            width: 40.0,
            height: 20.0,
        });
        assert_eq!(rect.w(), 40.0);
        assert_eq!(rect.h(), 20.0);
        assert_eq!(rect.x(), -70.0);
        assert_eq!(rect.y(), 30.0);
    }
}
