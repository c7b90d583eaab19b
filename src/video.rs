/*
 * Video Module
 *
 * RGBA frames as they come off a capture device, the filters applied before
 * edge extraction (resize to canvas, grayscale, threshold) and the
 * FrameSource seam that stands in for the webcam.
 *
 * A synthetic source is included so the swarm has something to trace when no
 * camera backend is wired in: a dark, swaying figure on a light background.
 */

use crate::edges::LumaFrame;
use crate::error::FrameError;

/// Bytes per RGBA pixel.
pub const CHANNELS: usize = 4;

/// A row-major RGBA frame.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, FrameError> {
        let frame = Self {
            width,
            height,
            pixels,
        };
        frame.validate()?;
        Ok(frame)
    }

    /// Check for a non-zero size and a buffer of exactly `width * height` RGBA pixels.
    pub fn validate(&self) -> Result<(), FrameError> {
        if self.width == 0 || self.height == 0 {
            return Err(FrameError::EmptyFrame {
                width: self.width,
                height: self.height,
            });
        }
        let expected = self.width as usize * self.height as usize * CHANNELS;
        if self.pixels.len() != expected {
            return Err(FrameError::BufferSize {
                expected,
                actual: self.pixels.len(),
            });
        }
        Ok(())
    }

    /// A frame filled with one opaque gray level.
    pub fn filled(width: u32, height: u32, level: u8) -> Self {
        let mut pixels = vec![level; width as usize * height as usize * CHANNELS];
        for alpha in pixels.iter_mut().skip(3).step_by(CHANNELS) {
            *alpha = 255;
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = self.offset(x, y);
        self.pixels[i..i + CHANNELS].copy_from_slice(&rgba);
    }

    /// Nearest-neighbour resample to the canvas size.
    ///
    /// Fails on a malformed source frame or a zero target size.
    pub fn resized(&self, width: u32, height: u32) -> Result<VideoFrame, FrameError> {
        self.validate()?;
        if width == 0 || height == 0 {
            return Err(FrameError::EmptyFrame { width, height });
        }
        if width == self.width && height == self.height {
            return Ok(self.clone());
        }

        let mut out = Vec::with_capacity(width as usize * height as usize * CHANNELS);
        for y in 0..height {
            let src_y = (y as u64 * self.height as u64 / height as u64) as u32;
            for x in 0..width {
                let src_x = (x as u64 * self.width as u64 / width as u64) as u32;
                let i = self.offset(src_x, src_y);
                out.extend_from_slice(&self.pixels[i..i + CHANNELS]);
            }
        }

        Ok(VideoFrame {
            width,
            height,
            pixels: out,
        })
    }

    /// Replace RGB with Rec. 709 luma, keeping alpha.
    pub fn grayscale(&mut self) {
        for px in self.pixels.chunks_exact_mut(CHANNELS) {
            let gray = luma(px[0], px[1], px[2]);
            px[0] = gray;
            px[1] = gray;
            px[2] = gray;
        }
    }

    /// Binarize on luma: at or above `level` (0..1) becomes white, else black.
    pub fn threshold(&mut self, level: f32) {
        let cutoff = (level.clamp(0.0, 1.0) * 255.0).floor() as u8;
        for px in self.pixels.chunks_exact_mut(CHANNELS) {
            let value = if luma(px[0], px[1], px[2]) >= cutoff { 255 } else { 0 };
            px[0] = value;
            px[1] = value;
            px[2] = value;
        }
    }

    /// Borrow as a luminance view for the edge extractor.
    pub fn as_luma(&self) -> LumaFrame<'_> {
        LumaFrame {
            width: self.width as usize,
            height: self.height as usize,
            pixels: &self.pixels,
        }
    }
}

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    (0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32).round() as u8
}

/// Something that produces video frames, typically a webcam.
pub trait FrameSource {
    /// Native size of the frames in pixels.
    fn size(&self) -> (u32, u32);

    /// Whether frames carry real image data yet.
    fn is_ready(&self) -> bool;

    /// Grab the next frame, `None` if nothing is available.
    fn next_frame(&mut self) -> Option<VideoFrame>;
}

const BACKGROUND: u8 = 220;
const FIGURE: u8 = 20;

/// A swaying dark figure on a light background.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    frame: u64,
    warmup_frames: u64,
    // Frames per cycle and how many at the end of each cycle show an empty scene
    cycle: u64,
    absent: u64,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame: 0,
            warmup_frames: 15,
            cycle: 900,
            absent: 90,
        }
    }

    pub fn with_warmup(mut self, frames: u64) -> Self {
        self.warmup_frames = frames;
        self
    }

    pub fn with_absence(mut self, cycle: u64, absent: u64) -> Self {
        self.cycle = cycle.max(1);
        self.absent = absent.min(self.cycle);
        self
    }

    fn figure_visible(&self) -> bool {
        self.frame % self.cycle < self.cycle - self.absent
    }

    fn render(&self) -> VideoFrame {
        let mut frame = VideoFrame::filled(self.width, self.height, BACKGROUND);
        if !self.figure_visible() {
            return frame;
        }

        let w = self.width as f32;
        let h = self.height as f32;
        let t = self.frame as f32 * 0.02;
        let cx = w * 0.5 + w * 0.2 * t.sin();
        let unit = h / 10.0;

        // Head, torso and a pair of swinging arms as filled ellipses
        let arm_swing = (t * 2.0).sin() * unit * 0.6;
        let shapes = [
            (cx, unit * 2.0, unit * 0.8, unit * 0.9),
            (cx, unit * 5.0, unit * 1.5, unit * 2.3),
            (cx - unit * 1.9, unit * 4.8 + arm_swing, unit * 0.4, unit * 1.6),
            (cx + unit * 1.9, unit * 4.8 - arm_swing, unit * 0.4, unit * 1.6),
            (cx - unit * 0.7, unit * 8.2, unit * 0.5, unit * 1.6),
            (cx + unit * 0.7, unit * 8.2, unit * 0.5, unit * 1.6),
        ];

        for y in 0..self.height {
            for x in 0..self.width {
                let (px, py) = (x as f32, y as f32);
                let inside = shapes.iter().any(|&(sx, sy, rx, ry)| {
                    let dx = (px - sx) / rx;
                    let dy = (py - sy) / ry;
                    dx * dx + dy * dy <= 1.0
                });
                if inside {
                    frame.set_pixel(x, y, [FIGURE, FIGURE, FIGURE, 255]);
                }
            }
        }

        frame
    }
}

impl FrameSource for SyntheticSource {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn is_ready(&self) -> bool {
        self.frame >= self.warmup_frames
    }

    fn next_frame(&mut self) -> Option<VideoFrame> {
        let frame = self.render();
        self.frame += 1;
        Some(frame)
    }
}
