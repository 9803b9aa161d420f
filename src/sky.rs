//! Sky models: the color a ray picks up when it leaves the scene.

use glam::Vec3A;

use crate::material::Color;

/// Maps an escape direction to a color.
pub trait Sky: Send + Sync {
    /// Color seen looking along `dir` (not required to be unit).
    fn get_color(&self, dir: Vec3A) -> Color;
}

/// Vertical gradient between a horizon and a zenith color.
#[derive(Debug, Clone, Copy)]
pub struct GradientSky {
    horizon: Color,
    zenith: Color,
}

impl GradientSky {
    /// A gradient sky from a horizon color (looking down) to a zenith
    /// color (looking up).
    pub fn new(horizon: Color, zenith: Color) -> Self {
        Self { horizon, zenith }
    }
}

impl Default for GradientSky {
    /// The classic white-to-light-blue daylight gradient.
    fn default() -> Self {
        Self {
            horizon: Color::new(1.0, 1.0, 1.0),
            zenith: Color::new(0.5, 0.7, 1.0),
        }
    }
}

impl Sky for GradientSky {
    fn get_color(&self, dir: Vec3A) -> Color {
        let unit = dir.normalize();
        // Blend factor from the Y component: -1 (down) gives the horizon
        // color, +1 (up) the zenith color.
        let a = 0.5 * (unit.y + 1.0);
        (1.0 - a) * self.horizon + a * self.zenith
    }
}

/// The same color in every direction; mostly useful for tests.
#[derive(Debug, Clone, Copy)]
pub struct SolidSky(
    /// The color seen in every direction.
    pub Color,
);

impl Sky for SolidSky {
    fn get_color(&self, _dir: Vec3A) -> Color {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_interpolates_on_y() {
        let sky = GradientSky::default();
        assert_eq!(sky.get_color(Vec3A::new(0.0, -2.0, 0.0)), Color::ONE);
        assert_eq!(
            sky.get_color(Vec3A::new(0.0, 1.0, 0.0)),
            Color::new(0.5, 0.7, 1.0)
        );
        let level = sky.get_color(Vec3A::new(1.0, 0.0, 0.0));
        assert_eq!(level, Color::new(0.75, 0.85, 1.0));
    }
}
