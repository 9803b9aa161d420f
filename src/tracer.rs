//! The path tracer: drives rays through the entity octree.
//!
//! Each traced ray is a small state machine: it travels octant to octant
//! behind the walker, evaluates the nearest forward collision inside each
//! visited node, and either terminates (light source, absorption, bounce
//! budget, sky) or continues with a reflected or refracted direction and
//! an updated substance.

use glam::Vec3A;
use log::warn;
use rayon::prelude::*;

use crate::camera::Camera;
use crate::entity::{Collision, SURFACE_EPSILON};
use crate::exposure::ExposureBuffer;
use crate::geom::{reflect, reflectance, refract};
use crate::index::{EntityId, SceneIndex};
use crate::material::{Color, Response, Substance};
use crate::octree::NodeId;
use crate::random;
use crate::ray::Ray;
use crate::sky::Sky;
use crate::walker::Walker;

/// Guard term in the inverse-square light attenuation denominator.
const ATTENUATION_EPSILON: f32 = 1e-3;

/// Distance a transmitted ray is nudged across the surface it crossed,
/// comfortably past the collision epsilon.
const TRANSMIT_NUDGE: f32 = 10.0 * SURFACE_EPSILON;

/// A scene, a sky, and the per-ray tracing parameters.
pub struct Tracer {
    scene: SceneIndex,
    sky: Box<dyn Sky>,
    /// Bounce budget: rays that hit this many surfaces without reaching a
    /// light source go black.
    pub refmax: u32,
    /// Coefficient of the inverse-square light falloff.
    pub attenuation: f32,
    /// Medium rays start their life in.
    pub ambient: Substance,
}

impl Tracer {
    /// A tracer over `scene` under `sky`, with default parameters.
    pub fn new(scene: SceneIndex, sky: Box<dyn Sky>) -> Self {
        Self {
            scene,
            sky,
            refmax: 8,
            attenuation: 0.25,
            ambient: Substance::AIR,
        }
    }

    /// The traced scene.
    pub fn scene(&self) -> &SceneIndex {
        &self.scene
    }

    /// Nearest forward collision among the entities attached to `node`.
    fn nearest_hit_in(&self, node: NodeId, ray: &Ray) -> Option<(EntityId, Collision)> {
        let mut nearest: Option<(EntityId, Collision)> = None;
        for (id, entity) in self.scene.entities_at(node) {
            if let Some(hit) = entity.collision_info(ray) {
                if nearest.as_ref().is_none_or(|(_, best)| hit.t < best.t) {
                    nearest = Some((id, hit));
                }
            }
        }
        nearest
    }

    /// Trace one ray from `origin` along `dir` and return its color.
    pub fn trace(&self, origin: Vec3A, dir: Vec3A) -> Color {
        if dir == Vec3A::ZERO || !dir.is_finite() || !origin.is_finite() {
            warn!("degenerate ray: origin {origin:?}, direction {dir:?}");
            return Color::ZERO;
        }

        let tree = self.scene.tree();
        let mut walker = Walker::new(tree);

        let mut color = Color::ONE;
        let mut refcount = 0u32;
        let mut path_distance = 0.0f32;
        let mut substance = self.ambient;
        let mut refpoint = origin;
        let mut dir = dir;
        let mut startnode: Option<NodeId> = None;

        loop {
            walker.set_pos_and_dir(refpoint, dir, startnode);
            let ray = Ray::new(refpoint, dir);

            // Entities indexed on the nodes enclosing the start point are
            // never offered by the walker; scan that chain first.
            let mut found: Option<(EntityId, Collision)> = None;
            if let Some((deepest, _)) = tree.node_at_pos(refpoint) {
                let mut node = deepest;
                loop {
                    if let Some((id, hit)) = self.nearest_hit_in(node, &ray) {
                        if found.as_ref().is_none_or(|(_, best)| hit.t < best.t) {
                            found = Some((id, hit));
                        }
                    }
                    match tree.parent(node) {
                        Some((parent, _)) => node = parent,
                        None => break,
                    }
                }
            }

            // Then octant by octant, first collision wins.
            if found.is_none() {
                for stop in &mut walker {
                    let Some(node) = stop.node else { continue };
                    if let Some(hit) = self.nearest_hit_in(node, &ray) {
                        found = Some(hit);
                        break;
                    }
                }
            }

            let Some((entity_id, collision)) = found else {
                // The ray left the tree: pick up the sky.
                return color * self.sky.get_color(dir);
            };

            let entity = self.scene.entity(entity_id);
            let normal = collision.normal;
            if dir.dot(normal) >= 0.0 {
                warn!(
                    "degenerate surface normal {normal:?} at {:?}",
                    collision.point
                );
                return Color::ZERO;
            }

            refcount += 1;
            let (u, v) = entity.map_uv(collision.point);
            entity
                .material()
                .alter_ray(&mut color, entity.texture(), u, v);
            path_distance += (collision.point - refpoint).length();
            refpoint = collision.point;

            if entity.material().is_light_source() {
                let d = self.attenuation * path_distance;
                return color / (ATTENUATION_EPSILON + d * d);
            }
            if refcount >= self.refmax {
                // Out of bounces without reaching a light: the ray saw
                // nothing that shines.
                return Color::ZERO;
            }

            let unit_dir = dir.normalize();
            let transmit = match entity.material().response(collision.point) {
                Response::Reflection => false,
                Response::Transmission => true,
                Response::Both => {
                    let cos_theta = (-unit_dir).dot(normal).min(1.0);
                    let next = self.substance_past(refpoint, unit_dir);
                    let ratio = substance.refractive_index / next.refractive_index;
                    random::random_f32() >= reflectance(cos_theta, ratio)
                }
            };

            if transmit {
                let next = self.substance_past(refpoint, unit_dir);
                let ratio = substance.refractive_index / next.refractive_index;
                let cos_theta = (-unit_dir).dot(normal).min(1.0);
                let sin2_transmitted = ratio * ratio * (1.0 - cos_theta * cos_theta);
                if sin2_transmitted > 1.0 {
                    // Total internal reflection: stay in the medium.
                    dir = reflect(unit_dir, normal);
                } else {
                    dir = refract(unit_dir, normal, ratio);
                    refpoint += unit_dir * TRANSMIT_NUDGE;
                    substance = next;
                }
            } else {
                if !entity.material().is_mirror(collision.point) {
                    // Absorbed: a scattering model would plug in here.
                    return Color::ZERO;
                }
                let mirrored = reflect(unit_dir, normal);
                let roughness = entity.material().roughness();
                dir = if roughness > 0.0 {
                    let scatter = random::random_in_hemisphere(normal);
                    let blended = mirrored.lerp(scatter, roughness);
                    if blended.length_squared() < 1e-8 {
                        mirrored
                    } else {
                        blended
                    }
                } else {
                    mirrored
                };
            }

            startnode = tree.node_at_pos(refpoint).map(|(node, _)| node);
        }
    }

    /// The substance just past a surface point along the travel direction.
    fn substance_past(&self, point: Vec3A, unit_dir: Vec3A) -> Substance {
        self.scene
            .substance_at(point + unit_dir * TRANSMIT_NUDGE)
            .unwrap_or(self.ambient)
    }

    /// Trace one full camera frame into the exposure buffer.
    ///
    /// The scene is immutable for the duration, so pixels are dispatched
    /// in parallel; the buffer is merged by its single owner afterwards.
    pub fn trace_frame(&self, camera: &Camera, exposure: &mut ExposureBuffer) {
        let origin = camera.position();
        let samples: Vec<(u32, u32, Color)> = camera
            .pixel_rays()
            .par_bridge()
            .map(|pixel| (pixel.x, pixel.y, self.trace(origin, pixel.dir)))
            .collect();
        for (x, y, color) in samples {
            exposure.set_color(x, y, color);
        }
        exposure.advance_frame();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{BoxEntity, Entity, SphereEntity};
    use crate::index::GrowthBudget;
    use crate::material::StaticMaterial;
    use crate::sky::SolidSky;
    use crate::space::{Aabb, Cube};
    use crate::texture::SolidTexture;

    fn white() -> Box<SolidTexture> {
        Box::new(SolidTexture::rgb(1.0, 1.0, 1.0))
    }

    fn sphere(center: Vec3A, diameter: f32, material: StaticMaterial) -> Box<dyn Entity> {
        Box::new(SphereEntity::new(
            center,
            diameter,
            Box::new(material),
            white(),
            Substance::new(1.5),
        ))
    }

    fn tracer_with(entities: Vec<Box<dyn Entity>>, sky: Color) -> Tracer {
        let mut scene = SceneIndex::new(Cube::new(Vec3A::ZERO, 1.0));
        for entity in entities {
            scene.add_entity(entity, GrowthBudget::default()).unwrap();
        }
        Tracer::new(scene, Box::new(SolidSky(sky)))
    }

    #[test]
    fn empty_scene_returns_the_sky() {
        let sky = Color::new(0.2, 0.4, 0.8);
        let mut tracer = tracer_with(vec![], sky);
        tracer.refmax = 0;
        assert_eq!(tracer.trace(Vec3A::splat(0.5), Vec3A::X), sky);
        // Rays that never meet the tree still see the sky.
        assert_eq!(
            tracer.trace(Vec3A::new(5.0, 5.0, 5.0), Vec3A::X),
            sky
        );
    }

    #[test]
    fn light_hit_attenuates_with_path_length() {
        let mut tracer = tracer_with(
            vec![sphere(
                Vec3A::new(0.7, 0.5, 0.5),
                0.2,
                StaticMaterial::light(),
            )],
            Color::ZERO,
        );
        tracer.attenuation = 2.0;
        let color = tracer.trace(Vec3A::new(0.1, 0.5, 0.5), Vec3A::X);
        // Hit at x = 0.6 after a path of 0.5.
        let expected = 1.0 / (1e-3 + 1.0);
        assert!((color.x - expected).abs() < 1e-4, "got {color:?}");
        assert_eq!(color.x, color.y);
        assert_eq!(color.y, color.z);
    }

    #[test]
    fn diffuse_surface_absorbs_the_ray() {
        let tracer = tracer_with(
            vec![sphere(
                Vec3A::new(0.7, 0.5, 0.5),
                0.2,
                StaticMaterial::diffuse(),
            )],
            Color::ONE,
        );
        assert_eq!(tracer.trace(Vec3A::new(0.1, 0.5, 0.5), Vec3A::X), Color::ZERO);
    }

    #[test]
    fn exhausted_bounce_budget_goes_black() {
        let mut tracer = tracer_with(
            vec![sphere(
                Vec3A::new(0.7, 0.5, 0.5),
                0.2,
                StaticMaterial::mirror(),
            )],
            Color::ONE,
        );
        tracer.refmax = 1;
        assert_eq!(tracer.trace(Vec3A::new(0.1, 0.5, 0.5), Vec3A::X), Color::ZERO);
    }

    #[test]
    fn mirror_bounces_reach_a_light() {
        let ground = Box::new(BoxEntity::new(
            Vec3A::new(0.3, 0.1, 0.5),
            0.2,
            Box::new(StaticMaterial::mirror()),
            white(),
            Substance::AIR,
        ));
        let lamp = sphere(Vec3A::new(0.6, 0.5, 0.5), 0.2, StaticMaterial::light());
        let mut tracer = tracer_with(vec![ground, lamp], Color::ZERO);
        tracer.attenuation = 1.0;

        let color = tracer.trace(Vec3A::new(0.05, 0.45, 0.5), Vec3A::new(1.0, -1.0, 0.0));
        // Down to the mirror top at (0.3, 0.2, 0.5), up to the lamp.
        let leg1 = 0.25 * 2.0f32.sqrt();
        let leg2 = 0.3 - 0.1 / 2.0f32.sqrt();
        let d = leg1 + leg2;
        let expected = 1.0 / (1e-3 + d * d);
        assert!((color.x - expected).abs() < 1e-3, "got {color:?}, want {expected}");
    }

    #[test]
    fn transmission_passes_through_and_restores_the_substance() {
        let lens = Box::new(SphereEntity::new(
            Vec3A::splat(0.5),
            0.4,
            Box::new(StaticMaterial::transparent()),
            white(),
            Substance::new(1.5),
        ));
        let sky = Color::new(0.3, 0.6, 0.9);
        let tracer = tracer_with(vec![lens], sky);
        // Straight through the center: both interfaces at normal
        // incidence, direction preserved, two bounces spent.
        let color = tracer.trace(Vec3A::new(0.1, 0.5, 0.5), Vec3A::X);
        assert!((color - sky).length() < 1e-4, "got {color:?}");
    }

    #[test]
    fn walker_finds_entities_indexed_deep_in_the_tree() {
        let lamp = sphere(Vec3A::new(0.8, 0.2, 0.2), 0.1, StaticMaterial::light());
        let tracer = tracer_with(vec![lamp], Color::ZERO);
        // The lamp sits several levels down; the ray starts in a node
        // whose chain of sets is empty.
        let node = tracer
            .scene()
            .covering_node(&Aabb::cube(Vec3A::new(0.8, 0.2, 0.2), 0.1))
            .unwrap();
        assert!(tracer.scene().tree().level(node) >= 2);
        let color = tracer.trace(Vec3A::new(0.1, 0.2, 0.2), Vec3A::X);
        assert!(color.x > 0.0, "walker missed the deep lamp: {color:?}");
    }

    #[test]
    fn zero_direction_terminates_black() {
        let tracer = tracer_with(vec![], Color::ONE);
        assert_eq!(tracer.trace(Vec3A::splat(0.5), Vec3A::ZERO), Color::ZERO);
    }
}
