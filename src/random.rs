//! Random number generation for ray tracing.
//!
//! Provides thread-safe random number generation with ChaCha20 PRNG.
//! Includes the sampling helpers the tracer and camera draw from.

use glam::Vec3A;
use rand::{rng, Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::cell::RefCell;

thread_local! {
    /// Thread-local ChaCha20 PRNG for quality random numbers.
    static RNG: RefCell<ChaCha20Rng> = RefCell::new(ChaCha20Rng::from_rng(&mut rng()));
}

/// Generate a random f32 in [0.0, 1.0)
pub fn random_f32() -> f32 {
    RNG.with(|rng| rng.borrow_mut().random())
}

/// Generate a random f32 in [min, max)
pub fn random_f32_range(min: f32, max: f32) -> f32 {
    min + (max - min) * random_f32()
}

/// Generate a random point uniformly distributed inside the unit sphere,
/// by rejection sampling the enclosing cube. A little under two draws are
/// needed on average.
pub fn random_in_unit_sphere() -> Vec3A {
    loop {
        let p = Vec3A::new(
            random_f32_range(-1.0, 1.0),
            random_f32_range(-1.0, 1.0),
            random_f32_range(-1.0, 1.0),
        );
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}

/// Generate a random point inside the unit hemisphere around `normal`:
/// an isotropic in-sphere sample, re-oriented to the normal's side.
pub fn random_in_hemisphere(normal: Vec3A) -> Vec3A {
    let sample = random_in_unit_sphere();
    if sample.dot(normal) > 0.0 {
        // Already in the same hemisphere as the normal
        sample
    } else {
        // Flip to the correct hemisphere
        -sample
    }
}

/// Generate random RGB color with components in [0.0, 1.0).
pub fn random_color() -> Vec3A {
    Vec3A::new(random_f32(), random_f32(), random_f32())
}

/// Generate random RGB color with components in [min, max).
pub fn random_color_range(min: f32, max: f32) -> Vec3A {
    Vec3A::new(
        random_f32_range(min, max),
        random_f32_range(min, max),
        random_f32_range(min, max),
    )
}
