//! Specks - grid-partitioned particle simulation for Bevy
//!
//! This library simulates a cloud of "specks" (small particles) that attract and
//! repel each other with short-range exponential force laws, optionally with a
//! signed per-speck charge. Neighbor search uses a uniform grid whose cell size
//! equals the interaction cutoff, rebuilt every tick with a counting sort:
//!
//! 1. Clear the per-cell occupancy counters
//! 2. Partition specks into cells (atomic slot assignment)
//! 3. Exclusive prefix sum over occupancy (Hillis-Steele doubling)
//! 4. Scatter specks into a cell-ordered buffer
//! 5. Update velocities from the 27 neighboring cells
//! 6. Advance positions and resolve the boundary
//!
//! Every stage is data-parallel (via rayon) with a barrier between stages.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use bevy::prelude::*;
//! use specks::prelude::*;
//!
//! let params = SpeckParams::liquid().with_max_dist(0.1).with_boundary_width(1.0);
//! let mut sim = SpeckSimulation::new(1000, params).expect("valid configuration");
//!
//! for _ in 0..60 {
//!     sim.step(1.0 / 60.0, Vec3::new(0.0, -9.81, 0.0));
//! }
//!
//! println!("{} specks, tick {}", sim.specks().len(), sim.tick());
//! ```
//!
//! Inside a Bevy app, use [`speck::plugin::SpeckPlugin`] which steps the
//! simulation from the frame clock.
//!
//! # Architecture
//!
//! - [`speck`]: Core simulation module
//!   - [`speck::params`]: Tunable parameters and RON config loading
//!   - [`speck::particle`]: Speck records and seeding layouts
//!   - [`speck::spatial`]: Partition grid and occupancy counting
//!   - [`speck::prefix_sum`]: Parallel exclusive prefix sum
//!   - [`speck::sort`]: Cell-ordered scatter of specks
//!   - [`speck::forces`]: Pairwise force laws
//!   - [`speck::integrate`]: Velocity and position passes
//!   - [`speck::boundary`]: Cubic container
//!   - [`speck::simulation`]: Per-tick stage orchestration
//!   - [`speck::gravity`]: Oscillating gravity wave
//!   - [`speck::plugin`]: Bevy plugin

pub mod speck;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::speck::prelude::*;
}
