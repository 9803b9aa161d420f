//! Scene entities: the primitives rays collide with.
//!
//! An entity couples a shape with its material, texture, and interior
//! substance. Collision normals are always oriented *against* the incident
//! ray, so the tracer sees a well-formed normal whether the ray strikes
//! from outside or from within a transparent body.

use std::f32::consts::PI;

use glam::Vec3A;

use crate::geom::{ray_sphere, slab_hits};
use crate::interval::Interval;
use crate::material::{Material, Substance};
use crate::ray::Ray;
use crate::space::Aabb;
use crate::texture::Texture;

/// Collisions closer than this along the ray are ignored, so a bounced ray
/// does not re-hit the surface it just left.
pub const SURFACE_EPSILON: f32 = 1e-4;

/// Ray-entity intersection information.
#[derive(Debug, Clone, Copy)]
pub struct Collision {
    /// Point where the ray meets the surface.
    pub point: Vec3A,
    /// Unit surface normal at `point`, oriented against the incident ray.
    pub normal: Vec3A,
    /// Signed ray parameter of the hit; always beyond [`SURFACE_EPSILON`].
    pub t: f32,
}

/// A primitive the tracer can collide rays with.
pub trait Entity: Send + Sync {
    /// Reference position (the shape's center).
    fn pos(&self) -> Vec3A;

    /// Cubic bounding box used for octree placement.
    fn aabb(&self) -> Aabb;

    /// Whether `point` lies strictly inside the entity's volume; used to
    /// resolve the substance a transmitted ray continues through.
    fn is_within(&self, point: Vec3A) -> bool;

    /// Nearest forward collision of `ray` with the surface, if any.
    fn collision_info(&self, ray: &Ray) -> Option<Collision>;

    /// Texture coordinates for a surface point, each in `[0, 1)`.
    fn map_uv(&self, point: Vec3A) -> (f32, f32);

    /// The medium filling the entity.
    fn get_substance(&self) -> Substance;

    /// The surface's light response.
    fn material(&self) -> &dyn Material;

    /// The surface's color map.
    fn texture(&self) -> &dyn Texture;
}

/// Pick the nearest crossing beyond the surface epsilon, preferring the
/// near one; `None` when both lie behind.
fn forward_t(near: f32, far: f32) -> Option<f32> {
    let fwd = Interval::forward(SURFACE_EPSILON);
    if fwd.surrounds(near) {
        Some(near)
    } else if fwd.surrounds(far) {
        Some(far)
    } else {
        None
    }
}

/// Orient an outward normal against the incident direction.
fn against_ray(outward: Vec3A, dir: Vec3A) -> Vec3A {
    if dir.dot(outward) < 0.0 {
        outward
    } else {
        -outward
    }
}

/// A sphere, specified by center and diameter.
pub struct SphereEntity {
    center: Vec3A,
    diameter: f32,
    substance: Substance,
    material: Box<dyn Material>,
    texture: Box<dyn Texture>,
}

impl SphereEntity {
    /// Create a sphere entity. Negative diameters are clamped to zero.
    pub fn new(
        center: Vec3A,
        diameter: f32,
        material: Box<dyn Material>,
        texture: Box<dyn Texture>,
        substance: Substance,
    ) -> Self {
        Self {
            center,
            diameter: diameter.max(0.0),
            substance,
            material,
            texture,
        }
    }

    fn radius(&self) -> f32 {
        self.diameter * 0.5
    }
}

impl Entity for SphereEntity {
    fn pos(&self) -> Vec3A {
        self.center
    }

    fn aabb(&self) -> Aabb {
        Aabb::cube(self.center, self.diameter)
    }

    fn is_within(&self, point: Vec3A) -> bool {
        (point - self.center).length_squared() < self.radius() * self.radius()
    }

    fn collision_info(&self, ray: &Ray) -> Option<Collision> {
        let (near, far) = ray_sphere(ray, self.center, self.radius())?;
        let t = forward_t(near, far)?;
        let point = ray.at(t);
        let outward = (point - self.center) / self.radius();
        Some(Collision {
            point,
            normal: against_ray(outward, ray.direction),
            t,
        })
    }

    fn map_uv(&self, point: Vec3A) -> (f32, f32) {
        let d = (point - self.center).normalize();
        let u = 0.5 + d.z.atan2(d.x) / (2.0 * PI);
        let v = 0.5 - d.y.clamp(-1.0, 1.0).asin() / PI;
        (u.clamp(0.0, 0.99999), v.clamp(0.0, 0.99999))
    }

    fn get_substance(&self) -> Substance {
        self.substance
    }

    fn material(&self) -> &dyn Material {
        self.material.as_ref()
    }

    fn texture(&self) -> &dyn Texture {
        self.texture.as_ref()
    }
}

/// An axis-aligned cube, specified by center and edge length.
pub struct BoxEntity {
    center: Vec3A,
    edge: f32,
    substance: Substance,
    material: Box<dyn Material>,
    texture: Box<dyn Texture>,
}

impl BoxEntity {
    /// Create a box entity. Negative edges are clamped to zero.
    pub fn new(
        center: Vec3A,
        edge: f32,
        material: Box<dyn Material>,
        texture: Box<dyn Texture>,
        substance: Substance,
    ) -> Self {
        Self {
            center,
            edge: edge.max(0.0),
            substance,
            material,
            texture,
        }
    }
}

impl Entity for BoxEntity {
    fn pos(&self) -> Vec3A {
        self.center
    }

    fn aabb(&self) -> Aabb {
        Aabb::cube(self.center, self.edge)
    }

    fn is_within(&self, point: Vec3A) -> bool {
        self.aabb().contains(point)
    }

    fn collision_info(&self, ray: &Ray) -> Option<Collision> {
        let (entry, exit) = slab_hits(ray, &self.aabb())?;
        let (t, face) = if Interval::forward(SURFACE_EPSILON).surrounds(entry.t) {
            (entry.t, entry)
        } else if Interval::forward(SURFACE_EPSILON).surrounds(exit.t) {
            (exit.t, exit)
        } else {
            return None;
        };
        let point = ray.at(t);
        Some(Collision {
            point,
            normal: against_ray(face.normal(), ray.direction),
            t,
        })
    }

    fn map_uv(&self, point: Vec3A) -> (f32, f32) {
        let half = self.edge * 0.5;
        let rel = (point - self.center) / half;
        // Project onto the face the point is closest to.
        let mut axis = 0;
        for a in 1..3 {
            if rel[a].abs() > rel[axis].abs() {
                axis = a;
            }
        }
        let (a1, a2) = match axis {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        };
        let u = (rel[a1] + 1.0) * 0.5;
        let v = (rel[a2] + 1.0) * 0.5;
        (u.clamp(0.0, 0.99999), v.clamp(0.0, 0.99999))
    }

    fn get_substance(&self) -> Substance {
        self.substance
    }

    fn material(&self) -> &dyn Material {
        self.material.as_ref()
    }

    fn texture(&self) -> &dyn Texture {
        self.texture.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::StaticMaterial;
    use crate::texture::SolidTexture;

    fn sphere(center: Vec3A, diameter: f32) -> SphereEntity {
        SphereEntity::new(
            center,
            diameter,
            Box::new(StaticMaterial::diffuse()),
            Box::new(SolidTexture::rgb(1.0, 1.0, 1.0)),
            Substance::AIR,
        )
    }

    fn cube(center: Vec3A, edge: f32) -> BoxEntity {
        BoxEntity::new(
            center,
            edge,
            Box::new(StaticMaterial::diffuse()),
            Box::new(SolidTexture::rgb(1.0, 1.0, 1.0)),
            Substance::AIR,
        )
    }

    #[test]
    fn sphere_collision_faces_the_ray() {
        let s = sphere(Vec3A::ZERO, 2.0);
        let ray = Ray::new(Vec3A::new(-3.0, 0.0, 0.0), Vec3A::new(1.0, 0.0, 0.0));
        let hit = s.collision_info(&ray).unwrap();
        assert!((hit.t - 2.0).abs() < 1e-5);
        assert!((hit.normal - Vec3A::new(-1.0, 0.0, 0.0)).length() < 1e-5);
        assert!(ray.direction.dot(hit.normal) < 0.0);
    }

    #[test]
    fn sphere_collision_from_inside_flips_the_normal() {
        let s = sphere(Vec3A::ZERO, 2.0);
        let ray = Ray::new(Vec3A::ZERO, Vec3A::new(1.0, 0.0, 0.0));
        let hit = s.collision_info(&ray).unwrap();
        assert!((hit.t - 1.0).abs() < 1e-5);
        // Outward would be +x; against the ray it points back in.
        assert!((hit.normal - Vec3A::new(-1.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn sphere_behind_the_ray_is_missed() {
        let s = sphere(Vec3A::new(-5.0, 0.0, 0.0), 2.0);
        let ray = Ray::new(Vec3A::ZERO, Vec3A::new(1.0, 0.0, 0.0));
        assert!(s.collision_info(&ray).is_none());
    }

    #[test]
    fn box_collision_reports_the_entry_face() {
        let b = cube(Vec3A::ZERO, 2.0);
        let ray = Ray::new(Vec3A::new(0.0, 5.0, 0.0), Vec3A::new(0.0, -1.0, 0.0));
        let hit = b.collision_info(&ray).unwrap();
        assert!((hit.t - 4.0).abs() < 1e-5);
        assert_eq!(hit.normal, Vec3A::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn entity_bounds_and_interiors() {
        let s = sphere(Vec3A::new(1.0, 0.0, 0.0), 1.0);
        assert_eq!(s.aabb().min(), Vec3A::new(0.5, -0.5, -0.5));
        assert!(s.is_within(Vec3A::new(1.2, 0.0, 0.0)));
        assert!(!s.is_within(Vec3A::new(1.6, 0.0, 0.0)));
        // Corner of the bounding cube is outside the ball.
        assert!(!s.is_within(Vec3A::new(1.45, 0.45, 0.45)));

        let b = cube(Vec3A::ZERO, 1.0);
        assert!(b.is_within(Vec3A::new(0.49, -0.49, 0.0)));
        assert!(!b.is_within(Vec3A::new(0.5, 0.0, 0.0)));
    }

    #[test]
    fn uv_coordinates_stay_in_range() {
        let s = sphere(Vec3A::ZERO, 2.0);
        for p in [
            Vec3A::new(1.0, 0.0, 0.0),
            Vec3A::new(0.0, 1.0, 0.0),
            Vec3A::new(0.0, -1.0, 0.0),
            Vec3A::new(-0.5, 0.5, 0.7),
        ] {
            let (u, v) = s.map_uv(p);
            assert!((0.0..1.0).contains(&u), "u out of range: {u}");
            assert!((0.0..1.0).contains(&v), "v out of range: {v}");
        }
        let b = cube(Vec3A::ZERO, 2.0);
        let (u, v) = b.map_uv(Vec3A::new(1.0, 0.25, -0.5));
        assert!((u - 0.625).abs() < 1e-5);
        assert!((v - 0.25).abs() < 1e-5);
    }
}
