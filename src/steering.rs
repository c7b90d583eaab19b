/*
 * Steering Module
 *
 * Small vector helpers shared by the particle rules. They give glam's Vec2
 * the "set magnitude" and "limit" operations the steering behaviours are
 * written in terms of.
 */

use nannou::prelude::*;

pub trait Steer {
    /// Rescale to `magnitude`, leaving a zero vector untouched.
    fn set_mag(self, magnitude: f32) -> Self;
    /// Cap the length at `max`.
    fn limit(self, max: f32) -> Self;
}

impl Steer for Vec2 {
    #[inline]
    fn set_mag(self, magnitude: f32) -> Self {
        self.normalize_or_zero() * magnitude
    }

    #[inline]
    fn limit(self, max: f32) -> Self {
        let length_squared = self.length_squared();
        if length_squared > max * max {
            self * (max / length_squared.sqrt())
        } else {
            self
        }
    }
}

/// Unit vector pointing at `angle` radians.
#[inline]
pub fn from_angle(angle: f32) -> Vec2 {
    vec2(angle.cos(), angle.sin())
}

// Linear remap of `value` from one range to another, like p5's map()
#[inline]
pub fn map_range(value: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    if in_max == in_min {
        return out_max;
    }
    out_min + (value - in_min) * (out_max - out_min) / (in_max - in_min)
}
