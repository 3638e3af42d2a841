//! Pairwise force laws between specks.
//!
//! All laws are scalar functions of the contact distance
//! `x = max(d - speck_radius, 0)`. The scalar is then applied along the unit
//! vector from one speck to the other: positive values pull the pair together.

use bevy::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::params::SpeckParams;

/// Short-range repulsion, `A * exp(-(x + F) / B)`.
#[inline]
pub fn repulsion(params: &SpeckParams, x: f32) -> f32 {
    params.repulsion_a * (-(x + params.repulsion_f) / params.repulsion_b).exp()
}

/// Longer-range attraction, `C * exp(-(x + E) / D)`.
#[inline]
pub fn attraction(params: &SpeckParams, x: f32) -> f32 {
    params.attraction_c * (-(x + params.attraction_e) / params.attraction_d).exp()
}

/// Electrostatic repulsion between two charged specks, `K * q_i * q_j / r^2`.
///
/// The distance is floored at the speck radius. Opposite charges give a
/// negative value, i.e. attraction.
#[inline]
pub fn electrostatic(params: &SpeckParams, distance: f32, tag_a: i32, tag_b: i32) -> f32 {
    if !params.charged || tag_a == 0 || tag_b == 0 {
        return 0.0;
    }
    let r = distance.max(params.speck_radius);
    params.coulomb_k * (tag_a * tag_b) as f32 / (r * r)
}

/// Net attractive magnitude between two specks at center distance `distance`.
#[inline]
pub fn pair_magnitude(params: &SpeckParams, distance: f32, tag_a: i32, tag_b: i32) -> f32 {
    let x = (distance - params.speck_radius).max(0.0);
    attraction(params, x) - repulsion(params, x) - electrostatic(params, distance, tag_a, tag_b)
}

/// Force on speck `a` exerted by speck `b`, including the global multiplier.
///
/// Pairs beyond `max_dist` do not interact. Coincident pairs have no
/// separation direction; `degenerate` supplies one (it should be a unit vector).
pub fn pair_force(
    params: &SpeckParams,
    position_a: Vec3,
    tag_a: i32,
    position_b: Vec3,
    tag_b: i32,
    degenerate: impl FnOnce() -> Vec3,
) -> Vec3 {
    let separation = position_b - position_a;
    let distance_sq = separation.length_squared();
    if distance_sq > params.max_dist * params.max_dist {
        return Vec3::ZERO;
    }

    let distance = distance_sq.sqrt();
    let direction = if distance > 0.0 {
        separation / distance
    } else {
        degenerate()
    };

    direction * pair_magnitude(params, distance, tag_a, tag_b) * params.multiplier
}

/// Uniformly distributed direction on the unit sphere.
pub fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let z: f32 = rng.gen_range(-1.0..=1.0);
    let phi: f32 = rng.gen_range(0.0..std::f32::consts::TAU);
    let ring = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(ring * phi.cos(), ring * phi.sin(), z)
}

/// Separation direction for a coincident pair, as seen from `own`.
///
/// Both members of the pair derive the same random vector from the seed, the
/// tick and their (unordered) sorted indices. The lower index takes it as is
/// and the higher index takes its negation, keeping the pair's forces opposite.
pub fn coincident_direction(seed: u64, tick: u64, own: usize, other: usize) -> Vec3 {
    let (low, high) = if own < other { (own, other) } else { (other, own) };
    let key = seed
        ^ tick.wrapping_mul(0x9e37_79b9_7f4a_7c15)
        ^ (low as u64).wrapping_mul(0xbf58_476d_1ce4_e5b9)
        ^ (high as u64).wrapping_mul(0x94d0_49bb_1331_11eb);
    let direction = random_unit_vector(&mut StdRng::seed_from_u64(key));
    if own < other {
        direction
    } else {
        -direction
    }
}
