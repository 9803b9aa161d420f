//! Ray intersection against planes, spheres, and axis-aligned boxes.
//!
//! All routines return *signed* ray parameters; forward-only callers filter
//! `t >= 0` themselves. Box faces are numbered `0..6` with face `2a`
//! the negative and face `2a + 1` the positive face of axis `a`, so the
//! outward normal of a face is recoverable from its id alone.

use glam::{Vec2, Vec3A};

use crate::ray::Ray;
use crate::space::Aabb;

/// Outward unit normal of box face `face`.
///
/// # Panics
///
/// Panics if `face >= 6`.
pub fn face_normal(face: u8) -> Vec3A {
    match face {
        0 => Vec3A::new(-1.0, 0.0, 0.0),
        1 => Vec3A::new(1.0, 0.0, 0.0),
        2 => Vec3A::new(0.0, -1.0, 0.0),
        3 => Vec3A::new(0.0, 1.0, 0.0),
        4 => Vec3A::new(0.0, 0.0, -1.0),
        5 => Vec3A::new(0.0, 0.0, 1.0),
        _ => panic!("box face id out of range: {face}"),
    }
}

/// One crossing of a box boundary: the signed ray parameter and the id of
/// the face crossed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlabHit {
    /// Signed ray parameter of the crossing.
    pub t: f32,
    /// Face id (`0..6`), see [`face_normal`].
    pub face: u8,
}

impl SlabHit {
    /// Outward normal of the crossed face.
    pub fn normal(&self) -> Vec3A {
        face_normal(self.face)
    }
}

/// Slab test of a ray against an axis-aligned box.
///
/// Returns the entry and exit crossings, in that order, or `None` when the
/// ray misses the box. Per-axis intervals are intersected; the largest
/// entry and smallest exit pick the crossed faces, ties resolved in axis
/// order (x before y before z). A ray parallel to an axis with its origin
/// outside that slab misses; origins exactly on the positive face count as
/// outside, matching the closed-open space convention.
pub fn slab_hits(ray: &Ray, b: &Aabb) -> Option<(SlabHit, SlabHit)> {
    let mut entry = SlabHit {
        t: f32::NEG_INFINITY,
        face: 0,
    };
    let mut exit = SlabHit {
        t: f32::INFINITY,
        face: 1,
    };
    let mut constrained = false;

    for a in 0..3usize {
        let o = ray.origin[a] - b.center[a];
        let d = ray.direction[a];
        let h = b.half[a];
        if d == 0.0 {
            if o < -h || o >= h {
                return None;
            }
            continue;
        }
        let (t_near, t_far, f_near, f_far) = if d > 0.0 {
            ((-h - o) / d, (h - o) / d, 2 * a as u8, 2 * a as u8 + 1)
        } else {
            ((h - o) / d, (-h - o) / d, 2 * a as u8 + 1, 2 * a as u8)
        };
        if t_near > entry.t {
            entry = SlabHit {
                t: t_near,
                face: f_near,
            };
        }
        if t_far < exit.t {
            exit = SlabHit {
                t: t_far,
                face: f_far,
            };
        }
        constrained = true;
    }

    if !constrained || entry.t > exit.t {
        return None;
    }
    Some((entry, exit))
}

/// Signed parameter of the ray's crossing of the plane through `point`
/// with normal `normal`, or `None` when the ray is parallel to the plane.
pub fn ray_plane(ray: &Ray, normal: Vec3A, point: Vec3A) -> Option<f32> {
    let denom = ray.direction.dot(normal);
    if denom == 0.0 {
        return None;
    }
    Some((point - ray.origin).dot(normal) / denom)
}

/// Signed parameters of the ray's crossings of a sphere, near then far,
/// or `None` when the ray misses.
///
/// Uses the half-b form of the quadratic; a tangent ray reports two equal
/// parameters.
pub fn ray_sphere(ray: &Ray, center: Vec3A, radius: f32) -> Option<(f32, f32)> {
    let oc = center - ray.origin;
    let a = ray.direction.length_squared();
    let h = ray.direction.dot(oc);
    let c = oc.length_squared() - radius * radius;

    let discriminant = h * h - a * c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrtd = discriminant.sqrt();
    Some(((h - sqrtd) / a, (h + sqrtd) / a))
}

/// Reflect a vector off a surface using the law of reflection.
///
/// `n` is assumed unit length.
pub fn reflect(v: Vec3A, n: Vec3A) -> Vec3A {
    v - 2.0 * v.dot(n) * n
}

/// Refract a unit vector through an interface using Snell's law.
///
/// `n` is the unit surface normal facing against `uv`; `etai_over_etat`
/// is the ratio of refractive indices `n_from / n_to`. The caller is
/// responsible for detecting total internal reflection beforehand.
pub fn refract(uv: Vec3A, n: Vec3A, etai_over_etat: f32) -> Vec3A {
    let cos_theta = (-uv).dot(n).min(1.0);
    let r_out_perp = etai_over_etat * (uv + cos_theta * n);
    let r_out_parallel = -(1.0 - r_out_perp.length_squared()).abs().sqrt() * n;
    r_out_perp + r_out_parallel
}

/// Compute Fresnel reflectance using Schlick's approximation.
pub fn reflectance(cosine: f32, refraction_index: f32) -> f32 {
    let r0 = (1.0 - refraction_index) / (1.0 + refraction_index);
    let r0 = r0 * r0;
    r0 + (1.0 - r0) * (1.0 - cosine).powi(5)
}

/// Rotate the orthogonal pair `(u, v)` within their shared plane by the
/// unit rotation vector `rot = (cos θ, sin θ)`.
///
/// Consumed by the camera for view-basis turns.
pub fn rotate_vectors(u: Vec3A, v: Vec3A, rot: Vec2) -> (Vec3A, Vec3A) {
    (u * rot.x + v * rot.y, v * rot.x - u * rot.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn assert_vec_close(a: Vec3A, b: Vec3A) {
        assert!((a - b).length() < EPS, "expected {b:?}, got {a:?}");
    }

    #[test]
    fn slab_reports_entry_and_exit_faces() {
        let b = Aabb::cube(Vec3A::splat(0.5), 1.0);
        let ray = Ray::new(Vec3A::new(-1.0, 0.5, 0.5), Vec3A::new(1.0, 0.0, 0.0));
        let (entry, exit) = slab_hits(&ray, &b).unwrap();
        assert_eq!(entry.t, 1.0);
        assert_eq!(entry.face, 0);
        assert_vec_close(entry.normal(), Vec3A::new(-1.0, 0.0, 0.0));
        assert_eq!(exit.t, 2.0);
        assert_eq!(exit.face, 1);
    }

    #[test]
    fn slab_negative_direction_swaps_faces() {
        let b = Aabb::cube(Vec3A::splat(0.5), 1.0);
        let ray = Ray::new(Vec3A::new(0.5, 2.0, 0.5), Vec3A::new(0.0, -1.0, 0.0));
        let (entry, exit) = slab_hits(&ray, &b).unwrap();
        assert_eq!(entry.face, 3);
        assert_eq!(exit.face, 2);
        assert_eq!(entry.t, 1.0);
        assert_eq!(exit.t, 2.0);
    }

    #[test]
    fn slab_origin_inside_yields_negative_entry() {
        let b = Aabb::cube(Vec3A::splat(0.5), 1.0);
        let ray = Ray::new(Vec3A::splat(0.25), Vec3A::new(1.0, 0.0, 0.0));
        let (entry, exit) = slab_hits(&ray, &b).unwrap();
        assert!(entry.t < 0.0);
        assert_eq!(exit.t, 0.75);
    }

    #[test]
    fn slab_parallel_outside_misses() {
        let b = Aabb::cube(Vec3A::splat(0.5), 1.0);
        let ray = Ray::new(Vec3A::new(0.5, 2.0, 0.5), Vec3A::new(0.0, 0.0, 1.0));
        assert!(slab_hits(&ray, &b).is_none());
    }

    #[test]
    fn slab_grazing_positive_face_counts_as_outside() {
        let b = Aabb::cube(Vec3A::splat(0.5), 1.0);
        // Sliding along the x = 1 face: never inside under closed-open.
        let ray = Ray::new(Vec3A::new(1.0, 0.5, 0.5), Vec3A::new(0.0, 0.0, 1.0));
        assert!(slab_hits(&ray, &b).is_none());
        // The same ray on the x = 0 face is inside.
        let ray = Ray::new(Vec3A::new(0.0, 0.5, 0.5), Vec3A::new(0.0, 0.0, 1.0));
        assert!(slab_hits(&ray, &b).is_some());
    }

    #[test]
    fn slab_exit_tie_prefers_lower_axis() {
        let b = Aabb::cube(Vec3A::splat(0.5), 1.0);
        let ray = Ray::new(Vec3A::ZERO, Vec3A::new(1.0, 1.0, 1.0));
        let (_, exit) = slab_hits(&ray, &b).unwrap();
        assert_eq!(exit.face, 1);
    }

    #[test]
    fn sphere_hits_are_ordered_near_then_far() {
        let ray = Ray::new(Vec3A::new(-3.0, 0.0, 0.0), Vec3A::new(1.0, 0.0, 0.0));
        let (near, far) = ray_sphere(&ray, Vec3A::ZERO, 1.0).unwrap();
        assert!((near - 2.0).abs() < EPS);
        assert!((far - 4.0).abs() < EPS);
    }

    #[test]
    fn sphere_behind_origin_has_negative_parameters() {
        let ray = Ray::new(Vec3A::new(3.0, 0.0, 0.0), Vec3A::new(1.0, 0.0, 0.0));
        let (near, far) = ray_sphere(&ray, Vec3A::ZERO, 1.0).unwrap();
        assert!(near < 0.0 && far < 0.0);
    }

    #[test]
    fn sphere_miss_is_none() {
        let ray = Ray::new(Vec3A::new(-3.0, 5.0, 0.0), Vec3A::new(1.0, 0.0, 0.0));
        assert!(ray_sphere(&ray, Vec3A::ZERO, 1.0).is_none());
    }

    #[test]
    fn plane_parallel_is_none() {
        let ray = Ray::new(Vec3A::ZERO, Vec3A::new(1.0, 0.0, 0.0));
        assert!(ray_plane(&ray, Vec3A::new(0.0, 1.0, 0.0), Vec3A::new(0.0, 1.0, 0.0)).is_none());
        let t = ray_plane(&ray, Vec3A::new(1.0, 0.0, 0.0), Vec3A::new(5.0, 0.0, 0.0)).unwrap();
        assert_eq!(t, 5.0);
    }

    #[test]
    fn reflect_is_an_involution() {
        let v = Vec3A::new(0.3, -0.7, 0.2);
        let n = Vec3A::new(0.0, 1.0, 0.0);
        assert_vec_close(reflect(reflect(v, n), n), v);
    }

    #[test]
    fn refract_round_trips_through_an_interface() {
        let d = Vec3A::new(1.0, -1.0, 0.0).normalize();
        let n = Vec3A::new(0.0, 1.0, 0.0);
        let r = 1.0 / 1.5;
        let inside = refract(d, n, r);
        let back = refract(inside.normalize(), -n, 1.5);
        assert_vec_close(back.normalize(), d);
    }

    #[test]
    fn rotate_vectors_keeps_the_pair_orthogonal() {
        let u = Vec3A::new(1.0, 0.0, 0.0);
        let v = Vec3A::new(0.0, 0.0, -1.0);
        let angle = 0.7f32;
        let (u2, v2) = rotate_vectors(u, v, Vec2::new(angle.cos(), angle.sin()));
        assert!(u2.dot(v2).abs() < EPS);
        assert!((u2.length() - 1.0).abs() < EPS);
        // A quarter turn maps u onto v.
        let (u3, _) = rotate_vectors(u, v, Vec2::new(0.0, 1.0));
        assert_vec_close(u3, v);
    }
}
