//! Camera: view basis and the per-frame pixel-ray stream.
//!
//! Uses a pinhole model with look-from/look-at/v-up orientation and a
//! vertical field of view. Each frame the camera hands out one jittered
//! sample per pixel; directions are deliberately left unnormalized, the
//! tracer and walker accept them as-is.

use glam::{Vec2, Vec3A};

use crate::geom::rotate_vectors;
use crate::random;

/// One camera sample: a pixel and the direction through it.
#[derive(Debug, Clone, Copy)]
pub struct PixelRay {
    /// Pixel column, `0` at the left.
    pub x: u32,
    /// Pixel row, `0` at the top.
    pub y: u32,
    /// Unnormalized direction from the camera position through the pixel.
    pub dir: Vec3A,
}

/// Camera for pixel-ray generation.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Rendered image width in pixel count
    pub image_width: u32,
    /// Rendered image height in pixel count
    pub image_height: u32,
    /// Vertical field of view in degrees (default: 90)
    pub vfov: f32,
    /// Point camera is looking from (camera position)
    pub lookfrom: Vec3A,
    /// Point camera is looking at (look target)
    pub lookat: Vec3A,
    /// Camera-relative "up" direction vector
    pub vup: Vec3A,
    /// Distance of the viewport plane from the camera
    pub focus_dist: f32,
}

impl Camera {
    /// Creates a new camera with default settings.
    ///
    /// Default: 100x100 image, 90° FOV, looking down negative z.
    pub fn new() -> Self {
        Self {
            image_width: 100,
            image_height: 100,
            vfov: 90.0,
            lookfrom: Vec3A::new(0.0, 0.0, 0.0),
            lookat: Vec3A::new(0.0, 0.0, -1.0),
            vup: Vec3A::new(0.0, 1.0, 0.0),
            focus_dist: 10.0,
        }
    }

    /// The camera position rays originate from.
    pub fn position(&self) -> Vec3A {
        self.lookfrom
    }

    /// Rotate the view direction by `angle` radians around the up axis,
    /// keeping the camera position fixed.
    pub fn turn(&mut self, angle: f32) {
        let offset = self.lookat - self.lookfrom;
        let length = offset.length();
        let forward = offset / length;
        let right = forward.cross(self.vup).normalize();
        let (turned, _) = rotate_vectors(forward, right, Vec2::new(angle.cos(), angle.sin()));
        self.lookat = self.lookfrom + turned * length;
    }

    /// Viewport geometry: location of pixel (0, 0) and the per-pixel
    /// steps across and down the image.
    fn viewport(&self) -> (Vec3A, Vec3A, Vec3A) {
        let image_height = self.image_height.max(1);

        // Determine viewport dimensions from the vertical field of view.
        let theta = self.vfov.to_radians();
        let h = (theta / 2.0).tan();
        let viewport_height = 2.0 * h * self.focus_dist;
        let viewport_width = viewport_height * (self.image_width as f32 / image_height as f32);

        // Calculate the u,v,w unit basis vectors for the camera coordinate frame
        let w = (self.lookfrom - self.lookat).normalize(); // Points opposite view direction
        let u = self.vup.cross(w).normalize(); // Points to camera right
        let v = w.cross(u); // Points to camera up

        let viewport_u = viewport_width * u; // Vector across viewport horizontal edge
        let viewport_v = viewport_height * -v; // Vector down viewport vertical edge

        let pixel_delta_u = viewport_u / self.image_width as f32;
        let pixel_delta_v = viewport_v / image_height as f32;

        let viewport_upper_left =
            self.lookfrom - (self.focus_dist * w) - viewport_u / 2.0 - viewport_v / 2.0;
        let pixel00_loc = viewport_upper_left + 0.5 * (pixel_delta_u + pixel_delta_v);

        (pixel00_loc, pixel_delta_u, pixel_delta_v)
    }

    /// The frame's pixel-ray stream: one jittered sample per pixel, row
    /// by row. Finite; a fresh stream is produced per call.
    pub fn pixel_rays(&self) -> impl Iterator<Item = PixelRay> + '_ {
        let (pixel00_loc, pixel_delta_u, pixel_delta_v) = self.viewport();
        let width = self.image_width;
        let origin = self.lookfrom;
        (0..self.image_height.max(1)).flat_map(move |y| {
            (0..width).map(move |x| {
                // Random offset within the pixel for anti-aliasing across
                // accumulated frames.
                let jitter_x = random::random_f32() - 0.5;
                let jitter_y = random::random_f32() - 0.5;
                let sample = pixel00_loc
                    + (x as f32 + jitter_x) * pixel_delta_u
                    + (y as f32 + jitter_y) * pixel_delta_v;
                PixelRay {
                    x,
                    y,
                    dir: sample - origin,
                }
            })
        })
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_covers_every_pixel_once() {
        let mut camera = Camera::new();
        camera.image_width = 7;
        camera.image_height = 5;
        let rays: Vec<PixelRay> = camera.pixel_rays().collect();
        assert_eq!(rays.len(), 35);
        assert_eq!((rays[0].x, rays[0].y), (0, 0));
        assert_eq!((rays[34].x, rays[34].y), (6, 4));
    }

    #[test]
    fn center_pixel_looks_at_the_target() {
        let mut camera = Camera::new();
        camera.image_width = 101;
        camera.image_height = 101;
        camera.lookfrom = Vec3A::new(1.0, 2.0, 3.0);
        camera.lookat = Vec3A::new(-2.0, 0.5, -1.0);
        let center = camera
            .pixel_rays()
            .find(|p| p.x == 50 && p.y == 50)
            .unwrap();
        let toward = (camera.lookat - camera.lookfrom).normalize();
        // Within the half-pixel jitter.
        assert!(center.dir.normalize().dot(toward) > 0.999);
    }

    #[test]
    fn quarter_turn_swings_the_view_to_the_right() {
        let mut camera = Camera::new();
        camera.lookfrom = Vec3A::ZERO;
        camera.lookat = Vec3A::new(0.0, 0.0, -1.0);
        camera.turn(std::f32::consts::FRAC_PI_2);
        assert!((camera.lookat - Vec3A::new(1.0, 0.0, 0.0)).length() < 1e-5);
        // The distance to the target is preserved.
        assert!((camera.lookat.length() - 1.0).abs() < 1e-5);
    }
}
