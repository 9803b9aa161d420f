//! Material system for ray tracing.
//!
//! Materials classify how a surface answers an incident ray — reflection,
//! transmission, or a Fresnel-weighted choice between the two — and
//! modulate the ray's accumulated color at each hit. The tracer consumes
//! materials through the [`Material`] trait so callers can contribute
//! their own kinds next to the constant-response [`StaticMaterial`].

use glam::Vec3A;

use crate::texture::Texture;

/// RGB color type using Vec3A for SIMD optimization.
pub type Color = Vec3A;

/// How a surface responds to incident light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// The ray bounces off the surface.
    Reflection,
    /// The ray passes into the medium behind the surface.
    Transmission,
    /// Either may happen; the tracer picks by Fresnel reflectance.
    Both,
}

/// The medium a ray currently travels through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Substance {
    /// Refractive index of the medium; positive.
    pub refractive_index: f32,
}

impl Substance {
    /// Vacuum / air.
    pub const AIR: Substance = Substance {
        refractive_index: 1.0,
    };

    /// A medium with the given refractive index.
    pub fn new(refractive_index: f32) -> Self {
        Self { refractive_index }
    }
}

/// Light response of an entity's surface.
pub trait Material: Send + Sync {
    /// The response class at a surface point.
    fn response(&self, point: Vec3A) -> Response;

    /// Whether the surface reflects specularly at `point`. A reflecting
    /// surface that is not a mirror absorbs the ray.
    fn is_mirror(&self, point: Vec3A) -> bool;

    /// Whether the surface emits light; a hit terminates the ray with its
    /// accumulated color.
    fn is_light_source(&self) -> bool;

    /// Surface roughness in `[0, 1]`: the weight of the random scatter
    /// blended into a mirror reflection.
    fn roughness(&self) -> f32;

    /// Modulate the ray's color for a hit at texture coordinates
    /// `(u, v)`. Returns `false` when the surface contributes nothing.
    fn alter_ray(&self, color: &mut Color, texture: &dyn Texture, u: f32, v: f32) -> bool {
        let sample = texture.get_color(u, v);
        *color *= Color::new(sample.x, sample.y, sample.z);
        true
    }
}

/// A material with the same response everywhere on the surface.
#[derive(Debug, Clone, Copy)]
pub struct StaticMaterial {
    response: Response,
    mirror: bool,
    light: bool,
    roughness: f32,
}

impl StaticMaterial {
    /// A matte surface: reflection response without a mirror, so rays
    /// terminate here and the surface shows its texture through whatever
    /// light reaches it directly.
    pub fn diffuse() -> Self {
        Self {
            response: Response::Reflection,
            mirror: false,
            light: false,
            roughness: 0.0,
        }
    }

    /// A perfect mirror.
    pub fn mirror() -> Self {
        Self {
            response: Response::Reflection,
            mirror: true,
            light: false,
            roughness: 0.0,
        }
    }

    /// A mirror with `roughness` worth of random scatter, `[0, 1]`.
    pub fn brushed_mirror(roughness: f32) -> Self {
        Self {
            response: Response::Reflection,
            mirror: true,
            light: false,
            roughness: roughness.clamp(0.0, 1.0),
        }
    }

    /// A transparent surface: refracts by the entity's substance, with
    /// Fresnel-weighted reflection.
    pub fn glass() -> Self {
        Self {
            response: Response::Both,
            mirror: true,
            light: false,
            roughness: 0.0,
        }
    }

    /// A purely transmitting surface without the reflective lobe.
    pub fn transparent() -> Self {
        Self {
            response: Response::Transmission,
            mirror: false,
            light: false,
            roughness: 0.0,
        }
    }

    /// A light-emitting surface.
    pub fn light() -> Self {
        Self {
            response: Response::Reflection,
            mirror: false,
            light: true,
            roughness: 0.0,
        }
    }
}

impl Material for StaticMaterial {
    fn response(&self, _point: Vec3A) -> Response {
        self.response
    }

    fn is_mirror(&self, _point: Vec3A) -> bool {
        self.mirror
    }

    fn is_light_source(&self) -> bool {
        self.light
    }

    fn roughness(&self) -> f32 {
        self.roughness
    }
}
