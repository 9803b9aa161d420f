//! Surface textures: map `(u, v)` coordinates to RGBA samples.

use glam::Vec4;

/// A surface color map. Coordinates are in `[0, 1)`.
pub trait Texture: Send + Sync {
    /// Sample the texture at `(u, v)`.
    fn get_color(&self, u: f32, v: f32) -> Vec4;
}

/// A single color everywhere.
#[derive(Debug, Clone, Copy)]
pub struct SolidTexture {
    color: Vec4,
}

impl SolidTexture {
    /// A solid texture of the given RGBA color.
    pub fn new(color: Vec4) -> Self {
        Self { color }
    }

    /// A solid opaque texture from RGB components.
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self {
            color: Vec4::new(r, g, b, 1.0),
        }
    }
}

impl Texture for SolidTexture {
    fn get_color(&self, _u: f32, _v: f32) -> Vec4 {
        self.color
    }
}

/// Alternating squares of two colors.
#[derive(Debug, Clone, Copy)]
pub struct CheckerTexture {
    even: Vec4,
    odd: Vec4,
    /// Number of squares along each axis of the unit UV range.
    scale: f32,
}

impl CheckerTexture {
    /// A checker of `scale` squares per UV axis.
    pub fn new(even: Vec4, odd: Vec4, scale: f32) -> Self {
        Self { even, odd, scale }
    }
}

impl Texture for CheckerTexture {
    fn get_color(&self, u: f32, v: f32) -> Vec4 {
        let iu = (u * self.scale).floor() as i64;
        let iv = (v * self.scale).floor() as i64;
        if (iu + iv).rem_euclid(2) == 0 {
            self.even
        } else {
            self.odd
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checker_alternates() {
        let t = CheckerTexture::new(Vec4::ONE, Vec4::ZERO, 4.0);
        assert_eq!(t.get_color(0.1, 0.1), Vec4::ONE);
        assert_eq!(t.get_color(0.3, 0.1), Vec4::ZERO);
        assert_eq!(t.get_color(0.3, 0.3), Vec4::ONE);
    }
}
