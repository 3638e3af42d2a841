//! Speck simulation parameters.
//!
//! These parameters control the force laws, the container and the partition
//! grid. They can be modified at runtime through the Bevy resource system,
//! except for `max_dist` and `boundary_width` which fix the grid at startup.

use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::{ConfigLoadError, ConfigSaveError, SimulationError};
use super::particle::SeedLayout;

/// How the work items of each stage are executed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Work items run on the rayon thread pool.
    #[default]
    Parallel,
    /// Work items run in index order on the calling thread.
    /// Slot assignment inside a cell follows speck order, so runs are bit-reproducible.
    Serial,
}

/// Parameters controlling the speck simulation.
///
/// Pairwise forces at contact distance `x = max(d - speck_radius, 0)`:
///
/// - repulsion `A * exp(-(x + F) / B)`
/// - attraction `C * exp(-(x + E) / D)`
/// - electrostatic `K * tag_i * tag_j / max(d, speck_radius)^2`, only when `charged`
///
/// The defaults are tuned for a cohesive liquid.
#[derive(Resource, Clone, Debug, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Resource)]
#[serde(default)]
pub struct SpeckParams {
    /// Repulsion strength (A).
    pub repulsion_a: f32,
    /// Repulsion decay length (B). Small values give a steep, short-range wall.
    pub repulsion_b: f32,
    /// Repulsion offset (F).
    pub repulsion_f: f32,

    /// Attraction strength (C).
    pub attraction_c: f32,
    /// Attraction decay length (D).
    pub attraction_d: f32,
    /// Attraction offset (E).
    pub attraction_e: f32,

    /// Electrostatic constant (K). Ignored unless `charged` is set.
    pub coulomb_k: f32,
    /// Whether the per-speck tag acts as a charge sign.
    pub charged: bool,

    /// Global multiplier applied to every pairwise force.
    pub multiplier: f32,
    /// Mass of a single speck.
    pub mass: f32,
    /// Fraction of velocity removed each tick (0 = none, 1 = full stop).
    pub damper: f32,
    /// Maximum speed of a speck.
    pub max_velocity: f32,

    /// Interaction cutoff radius. Also the edge length of a partition cell.
    pub max_dist: f32,
    /// Speck radius, subtracted from the center distance before the force laws.
    /// Seeding spaces specks one diameter apart.
    pub speck_radius: f32,

    /// Requested width of the cubic container. The simulated width is rounded
    /// up to a whole number of cells, see [`PartitionGrid`](super::spatial::PartitionGrid).
    pub boundary_width: f32,
    /// Wall spring stiffness pushing escaped specks back inside.
    pub boundary_stiffness: f32,
    /// Fraction of the wall-normal velocity kept after a wall contact.
    pub restitution: f32,

    /// Initial placement of specks.
    pub layout: SeedLayout,
    /// Stage execution strategy.
    pub execution: ExecutionMode,
    /// Timestep for the plugin. Use None to use frame delta time.
    pub fixed_timestep: Option<f32>,
    /// Seed for the random directions of coincident pairs.
    pub seed: u64,
}

impl Default for SpeckParams {
    fn default() -> Self {
        Self {
            repulsion_a: 4.0,
            repulsion_b: 0.01,
            repulsion_f: 0.0,
            attraction_c: 0.6,
            attraction_d: 0.03,
            attraction_e: 0.0,
            coulomb_k: 0.0,
            charged: false,
            multiplier: 1.0,
            mass: 1.0,
            damper: 0.01,
            max_velocity: 4.0,
            max_dist: 0.1,
            speck_radius: 0.02,
            boundary_width: 1.0,
            boundary_stiffness: 200.0,
            restitution: 0.2,
            layout: SeedLayout::Grid,
            execution: ExecutionMode::Parallel,
            fixed_timestep: None,
            seed: 0x5eed_5eed,
        }
    }
}

impl SpeckParams {
    /// Creates parameters for an uncharged, cohesive liquid.
    pub fn liquid() -> Self {
        Self::default()
    }

    /// Creates parameters for a two-species plasma of charged specks.
    pub fn electrostatic() -> Self {
        Self {
            charged: true,
            coulomb_k: 0.0005,
            attraction_c: 0.2,
            damper: 0.02,
            ..Self::default()
        }
    }

    /// Set the interaction cutoff (and cell size).
    pub fn with_max_dist(mut self, max_dist: f32) -> Self {
        self.max_dist = max_dist;
        self
    }

    /// Set the requested container width.
    pub fn with_boundary_width(mut self, width: f32) -> Self {
        self.boundary_width = width;
        self
    }

    /// Set the repulsion coefficients (A, B).
    pub fn with_repulsion(mut self, a: f32, b: f32) -> Self {
        self.repulsion_a = a;
        self.repulsion_b = b;
        self
    }

    /// Set the attraction coefficients (C, D, E).
    pub fn with_attraction(mut self, c: f32, d: f32, e: f32) -> Self {
        self.attraction_c = c;
        self.attraction_d = d;
        self.attraction_e = e;
        self
    }

    /// Enable charged specks with the given electrostatic constant.
    pub fn with_charge(mut self, k: f32) -> Self {
        self.charged = true;
        self.coulomb_k = k;
        self
    }

    /// Set the wall spring stiffness and restitution.
    pub fn with_boundary(mut self, stiffness: f32, restitution: f32) -> Self {
        self.boundary_stiffness = stiffness;
        self.restitution = restitution;
        self
    }

    /// Set the damping factor.
    pub fn with_damper(mut self, damper: f32) -> Self {
        self.damper = damper;
        self
    }

    /// Set the speed limit.
    pub fn with_max_velocity(mut self, max_velocity: f32) -> Self {
        self.max_velocity = max_velocity;
        self
    }

    /// Set the speck radius.
    pub fn with_speck_radius(mut self, radius: f32) -> Self {
        self.speck_radius = radius;
        self
    }

    /// Set the seeding layout.
    pub fn with_layout(mut self, layout: SeedLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Set the execution mode.
    pub fn with_execution(mut self, execution: ExecutionMode) -> Self {
        self.execution = execution;
        self
    }

    /// Use a fixed timestep in the plugin.
    pub fn with_fixed_timestep(mut self, dt: f32) -> Self {
        self.fixed_timestep = Some(dt);
        self
    }

    /// Seeding spacing between neighboring specks.
    pub fn speck_diameter(&self) -> f32 {
        2.0 * self.speck_radius
    }

    /// Checks every parameter against its admissible range.
    pub fn validate(&self) -> Result<(), SimulationError> {
        positive("max_dist", self.max_dist)?;
        positive("boundary_width", self.boundary_width)?;
        positive("speck_radius", self.speck_radius)?;
        positive("repulsion_b", self.repulsion_b)?;
        positive("attraction_d", self.attraction_d)?;
        positive("mass", self.mass)?;
        unit_interval("damper", self.damper)?;
        unit_interval("restitution", self.restitution)?;

        if !(self.max_velocity > 0.0) {
            return Err(SimulationError::invalid(
                "max_velocity",
                self.max_velocity,
                "a positive value",
            ));
        }
        if !(self.boundary_stiffness >= 0.0) || !self.boundary_stiffness.is_finite() {
            return Err(SimulationError::invalid(
                "boundary_stiffness",
                self.boundary_stiffness,
                "a non-negative finite value",
            ));
        }
        for (name, value) in [
            ("repulsion_a", self.repulsion_a),
            ("repulsion_f", self.repulsion_f),
            ("attraction_c", self.attraction_c),
            ("attraction_e", self.attraction_e),
            ("coulomb_k", self.coulomb_k),
            ("multiplier", self.multiplier),
        ] {
            if !value.is_finite() {
                return Err(SimulationError::invalid(name, value, "a finite value"));
            }
        }
        if let Some(dt) = self.fixed_timestep {
            positive("fixed_timestep", dt)?;
        }
        Ok(())
    }

    /// Load parameters from a RON file and validate them.
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let contents = std::fs::read_to_string(path)?;
        let params: Self = ron::from_str(&contents)?;
        params.validate()?;
        Ok(params)
    }

    /// Save parameters to a RON file.
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), ConfigSaveError> {
        let contents = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), SimulationError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(SimulationError::invalid(name, value, "a positive finite value"))
    }
}

fn unit_interval(name: &'static str, value: f32) -> Result<(), SimulationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SimulationError::invalid(name, value, "a value in [0, 1]"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(SpeckParams::liquid().validate().is_ok());
        assert!(SpeckParams::electrostatic().validate().is_ok());
        assert!(SpeckParams::electrostatic().charged);
    }

    #[test]
    fn test_rejects_non_positive_max_dist() {
        let err = SpeckParams::default().with_max_dist(0.0).validate().unwrap_err();
        assert!(matches!(
            err,
            SimulationError::InvalidParameter { name: "max_dist", .. }
        ));
    }

    #[test]
    fn test_rejects_non_positive_width() {
        let err = SpeckParams::default()
            .with_boundary_width(-1.0)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            SimulationError::InvalidParameter { name: "boundary_width", .. }
        ));
    }

    #[test]
    fn test_rejects_out_of_range_restitution() {
        let err = SpeckParams::default()
            .with_boundary(10.0, 1.5)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            SimulationError::InvalidParameter { name: "restitution", .. }
        ));
    }

    #[test]
    fn test_rejects_nan_damper() {
        let err = SpeckParams::default()
            .with_damper(f32::NAN)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            SimulationError::InvalidParameter { name: "damper", .. }
        ));
    }

    #[test]
    fn test_unlimited_velocity_is_allowed() {
        let params = SpeckParams::default().with_max_velocity(f32::INFINITY);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_ron_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("specks.ron");

        let params = SpeckParams::electrostatic()
            .with_layout(SeedLayout::Random { seed: 7 })
            .with_fixed_timestep(0.01);
        params.save_ron(&path).unwrap();

        assert_eq!(SpeckParams::load_ron(&path).unwrap(), params);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.ron");
        std::fs::write(&path, "(max_dist: 0.25, charged: true)").unwrap();

        let params = SpeckParams::load_ron(&path).unwrap();
        assert_eq!(params.max_dist, 0.25);
        assert!(params.charged);
        assert_eq!(params.restitution, SpeckParams::default().restitution);
    }

    #[test]
    fn test_invalid_ron_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invalid.ron");
        std::fs::write(&path, "(max_dist: -0.5)").unwrap();

        assert!(matches!(
            SpeckParams::load_ron(&path),
            Err(ConfigLoadError::Invalid(_))
        ));
    }
}
