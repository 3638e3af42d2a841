//! Speck data structures and seeding layouts.
//!
//! A speck is a plain `Copy` record; the simulation keeps one primary buffer
//! of them plus a cell-sorted copy rebuilt every tick.

use bevy::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// A single simulated particle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Speck {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Optional discriminator. With charged specks this is the charge sign.
    pub tag: i32,
}

impl Speck {
    /// Create a speck at rest.
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            ..default()
        }
    }

    /// Set the initial velocity.
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the tag.
    pub fn with_tag(mut self, tag: i32) -> Self {
        self.tag = tag;
        self
    }
}

/// Cell membership of a speck for the current tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PartitionIndex {
    /// Flattened cell index.
    pub cell: u32,
    /// Position of the speck inside its cell's range of the sorted buffer.
    pub slot: u32,
}

/// Initial placement of specks inside the container.
#[derive(Clone, Debug, Default, PartialEq, Reflect, Serialize, Deserialize)]
pub enum SeedLayout {
    /// Specks stacked on a lattice one diameter apart, filling x then z then y,
    /// starting from the bottom corner of the container.
    #[default]
    Grid,
    /// Specks scattered uniformly through the container.
    Random { seed: u64 },
}

impl SeedLayout {
    /// Writes initial positions into `specks` for a cubic container of width `bounds`.
    ///
    /// Velocities are zeroed. With `charged`, tags alternate `+1`, `-1`;
    /// otherwise every tag is 0.
    pub fn fill(&self, specks: &mut [Speck], diameter: f32, bounds: f32, charged: bool) {
        let half = Vec3::splat(bounds / 2.0);

        match self {
            SeedLayout::Grid => {
                // `as` saturates, so tiny diameters give a huge but finite row length
                let per_dim = ((bounds / diameter).floor() as usize).max(1);
                // A saturated layer is wider than any index, so every speck lands in layer 0
                let per_layer = per_dim.saturating_mul(per_dim);
                for (i, speck) in specks.iter_mut().enumerate() {
                    let x = (i % per_dim) as f32 * diameter + diameter / 2.0;
                    let z = ((i / per_dim) % per_dim) as f32 * diameter + diameter / 2.0;
                    let y = (i / per_layer) as f32 * diameter + diameter / 2.0;
                    speck.position = Vec3::new(x, y, z) - half;
                }
            }
            SeedLayout::Random { seed } => {
                let mut rng = StdRng::seed_from_u64(*seed);
                for speck in specks.iter_mut() {
                    let unit = Vec3::new(
                        rng.gen_range(0.0..1.0),
                        rng.gen_range(0.0..1.0),
                        rng.gen_range(0.0..1.0),
                    );
                    speck.position = unit * bounds - half;
                }
            }
        }

        for (i, speck) in specks.iter_mut().enumerate() {
            speck.velocity = Vec3::ZERO;
            speck.tag = match (charged, i % 2) {
                (false, _) => 0,
                (true, 0) => 1,
                (true, _) => -1,
            };
        }
    }

    /// Convenience wrapper returning a fresh buffer of `count` specks.
    pub fn generate(&self, count: usize, diameter: f32, bounds: f32, charged: bool) -> Vec<Speck> {
        let mut specks = vec![Speck::default(); count];
        self.fill(&mut specks, diameter, bounds, charged);
        specks
    }
}

/// GPU-compatible speck layout for renderer upload.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuSpeck {
    /// Position (xyz) + tag (w).
    pub position_tag: [f32; 4],
    /// Velocity (xyz) + speed (w).
    pub velocity: [f32; 4],
}

impl From<&Speck> for GpuSpeck {
    fn from(speck: &Speck) -> Self {
        let p = speck.position;
        let v = speck.velocity;
        Self {
            position_tag: [p.x, p.y, p.z, speck.tag as f32],
            velocity: [v.x, v.y, v.z, v.length()],
        }
    }
}

impl GpuSpeck {
    pub fn position(&self) -> Vec3 {
        Vec3::new(
            self.position_tag[0],
            self.position_tag[1],
            self.position_tag[2],
        )
    }

    pub fn velocity(&self) -> Vec3 {
        Vec3::new(self.velocity[0], self.velocity[1], self.velocity[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_layout_matches_lattice() {
        // 1.0 / 0.25 -> four specks per row
        let specks = SeedLayout::Grid.generate(20, 0.25, 1.0, false);

        assert_eq!(specks[0].position, Vec3::new(-0.375, -0.375, -0.375));
        assert_eq!(specks[1].position, Vec3::new(-0.125, -0.375, -0.375));
        // Fifth speck wraps onto the next z row
        assert_eq!(specks[4].position, Vec3::new(-0.375, -0.375, -0.125));
        // Seventeenth speck starts the second layer
        assert_eq!(specks[16].position, Vec3::new(-0.375, -0.125, -0.375));
    }

    #[test]
    fn test_grid_layout_with_tiny_diameter() {
        // 1.0 / 2e-10 specks per row, far more than fit in one usize layer
        let diameter = 2e-10;
        let specks = SeedLayout::Grid.generate(4, diameter, 1.0, false);

        let first = diameter / 2.0 - 0.5;
        for (i, speck) in specks.iter().enumerate() {
            assert!(speck.position.is_finite());
            assert_eq!(speck.position.x, i as f32 * diameter + diameter / 2.0 - 0.5);
            assert_eq!(speck.position.y, first);
            assert_eq!(speck.position.z, first);
        }
    }

    #[test]
    fn test_grid_layout_is_deterministic() {
        let a = SeedLayout::Grid.generate(100, 0.1, 1.0, false);
        let b = SeedLayout::Grid.generate(100, 0.1, 1.0, false);
        assert_eq!(a, b);
    }

    #[test]
    fn test_random_layout_stays_in_bounds() {
        let specks = SeedLayout::Random { seed: 3 }.generate(500, 0.05, 2.0, false);
        for speck in &specks {
            assert!(speck.position.abs().max_element() <= 1.0);
        }
        assert_eq!(specks, SeedLayout::Random { seed: 3 }.generate(500, 0.05, 2.0, false));
    }

    #[test]
    fn test_charged_tags_alternate() {
        let specks = SeedLayout::Grid.generate(4, 0.1, 1.0, true);
        let tags: Vec<i32> = specks.iter().map(|s| s.tag).collect();
        assert_eq!(tags, vec![1, -1, 1, -1]);
    }

    #[test]
    fn test_gpu_speck_layout() {
        assert_eq!(std::mem::size_of::<GpuSpeck>(), 32);

        let speck = Speck::new(Vec3::new(1.0, 2.0, 3.0))
            .with_velocity(Vec3::new(3.0, 4.0, 0.0))
            .with_tag(-1);
        let gpu = GpuSpeck::from(&speck);
        assert_eq!(gpu.position(), speck.position);
        assert_eq!(gpu.position_tag[3], -1.0);
        assert_eq!(gpu.velocity[3], 5.0);
    }
}
