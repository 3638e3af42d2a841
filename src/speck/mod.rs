//! Grid-partitioned speck simulation.
//!
//! The simulation owns one primary buffer of [`particle::Speck`] records. All
//! other buffers (partition indices, occupancy counts, prefix sums and the
//! cell-sorted copy) are scratch space that is rebuilt from the primary buffer
//! on every tick.
//!
//! # Example
//!
//! ```rust,no_run
//! use bevy::prelude::*;
//! use specks::speck::prelude::*;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(MinimalPlugins)
//!         .add_plugins(SpeckPlugin::new(2048).with_params(SpeckParams::electrostatic()))
//!         .run();
//! }
//! ```

pub mod boundary;
mod dispatch;
pub mod error;
pub mod forces;
pub mod gravity;
pub mod integrate;
pub mod params;
pub mod particle;
pub mod plugin;
pub mod prefix_sum;
pub mod simulation;
pub mod sort;
pub mod spatial;

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::boundary::*;
    pub use super::error::*;
    pub use super::forces::*;
    pub use super::gravity::*;
    pub use super::params::*;
    pub use super::particle::*;
    pub use super::plugin::*;
    pub use super::prefix_sum::*;
    pub use super::simulation::*;
    pub use super::sort::*;
    pub use super::spatial::*;
}
