//! Exposure buffer: integrates traced frames into per-pixel means.
//!
//! Each pixel holds the running mean of every sample written for it; a new
//! frame's samples are mixed in with weight `1 / (1 + frames)`, so the
//! image refines progressively while the camera holds still.

use image::{ImageBuffer, Rgb};

use crate::material::Color;

/// Accumulation buffer between the tracer and the image sinks.
#[derive(Debug, Clone)]
pub struct ExposureBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
    frames: u32,
}

impl ExposureBuffer {
    /// An all-black buffer of the given dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; (width * height) as usize],
            frames: 0,
        }
    }

    /// Buffer width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Buffer height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of frames merged so far.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Mix a sample into the pixel at `(x, y)` with the current frame
    /// weight.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside the buffer.
    pub fn set_color(&mut self, x: u32, y: u32, color: Color) {
        assert!(x < self.width && y < self.height, "pixel out of bounds");
        let weight = 1.0 / (1.0 + self.frames as f32);
        let pixel = &mut self.pixels[(y * self.width + x) as usize];
        *pixel += (color - *pixel) * weight;
    }

    /// Finish the current frame; later samples mix in with less weight.
    pub fn advance_frame(&mut self) {
        self.frames += 1;
    }

    /// Discard all accumulation, e.g. after the camera moved.
    pub fn reset(&mut self) {
        self.pixels.fill(Color::ZERO);
        self.frames = 0;
    }

    /// The accumulated image as linear HDR RGB.
    pub fn to_image(&self) -> ImageBuffer<Rgb<f32>, Vec<f32>> {
        ImageBuffer::from_fn(self.width, self.height, |x, y| {
            let pixel = self.pixels[(y * self.width + x) as usize];
            Rgb([pixel.x, pixel.y, pixel.z])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_replaces_then_later_frames_average() {
        let mut buffer = ExposureBuffer::new(2, 1);
        buffer.set_color(0, 0, Color::ONE);
        buffer.advance_frame();
        buffer.set_color(0, 0, Color::ZERO);
        buffer.advance_frame();
        let image = buffer.to_image();
        assert_eq!(image.get_pixel(0, 0).0, [0.5, 0.5, 0.5]);
        // Untouched pixels stay black.
        assert_eq!(image.get_pixel(1, 0).0, [0.0, 0.0, 0.0]);
        assert_eq!(buffer.frames(), 2);
    }

    #[test]
    fn third_frame_mixes_with_a_third() {
        let mut buffer = ExposureBuffer::new(1, 1);
        for _ in 0..2 {
            buffer.set_color(0, 0, Color::ZERO);
            buffer.advance_frame();
        }
        buffer.set_color(0, 0, Color::splat(0.9));
        let image = buffer.to_image();
        assert!((image.get_pixel(0, 0).0[0] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn reset_clears_accumulation() {
        let mut buffer = ExposureBuffer::new(1, 1);
        buffer.set_color(0, 0, Color::ONE);
        buffer.advance_frame();
        buffer.reset();
        assert_eq!(buffer.frames(), 0);
        buffer.set_color(0, 0, Color::splat(0.25));
        assert_eq!(buffer.to_image().get_pixel(0, 0).0, [0.25, 0.25, 0.25]);
    }
}
