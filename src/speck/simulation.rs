//! Per-tick orchestration of the speck pipeline.
//!
//! A tick runs six stages in a fixed order. Each stage is a full barrier: all
//! of its work items finish before the next stage starts.
//!
//! ```text
//! Clear -> Partition -> PrefixSum -> Sort -> UpdateVelocities -> UpdatePositions
//! ```

use bevy::log::{debug, info};
use bevy::prelude::*;

use super::boundary::BoxBoundary;
use super::dispatch;
use super::error::{try_buffer, SimulationError};
use super::integrate::{update_position, NeighborView, VelocityPass};
use super::params::SpeckParams;
use super::particle::{GpuSpeck, PartitionIndex, Speck};
use super::prefix_sum::PrefixSum;
use super::sort::Sorter;
use super::spatial::{PartitionGrid, PartitionMetadata, Partitioner};

/// One stage of a simulation tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Zero the occupancy counters.
    Clear,
    /// Assign every speck a cell and a slot.
    Partition,
    /// Turn occupancy counts into cell offsets.
    PrefixSum,
    /// Copy specks into cell order.
    Sort,
    /// Accumulate forces and integrate velocities.
    UpdateVelocities,
    /// Integrate positions and resolve walls.
    UpdatePositions,
}

impl Stage {
    /// Stages of one tick, in execution order.
    pub const PIPELINE: [Stage; 6] = [
        Stage::Clear,
        Stage::Partition,
        Stage::PrefixSum,
        Stage::Sort,
        Stage::UpdateVelocities,
        Stage::UpdatePositions,
    ];
}

/// Summary of the simulation state after a tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickStats {
    pub tick: u64,
    /// Cells holding at least one speck.
    pub occupied_cells: usize,
    /// Largest number of specks in one cell.
    pub max_occupancy: u32,
    pub mean_speed: f32,
    pub max_speed: f32,
}

/// Speck simulation state.
///
/// The primary speck buffer is the only state carried from tick to tick.
/// Partition indices, occupancy counts, prefix sums and the sorted buffer are
/// rebuilt from it at the start of every tick.
#[derive(Resource, Debug)]
pub struct SpeckSimulation {
    params: SpeckParams,
    grid: PartitionGrid,
    boundary: BoxBoundary,

    specks: Vec<Speck>,
    partition_indices: Vec<PartitionIndex>,
    partitioner: Partitioner,
    prefix_sum: PrefixSum,
    sorter: Sorter,

    tick: u64,
}

impl SpeckSimulation {
    /// Create a simulation of `count` specks placed by `params.layout`.
    pub fn new(count: usize, params: SpeckParams) -> Result<Self, SimulationError> {
        check_count(count)?;
        params.validate()?;
        let grid = PartitionGrid::new(params.max_dist, params.boundary_width)?;

        let mut specks = try_buffer("specks", count, Speck::default)?;
        let diameter = params.speck_diameter();
        params.layout.fill(&mut specks, diameter, grid.bounds(), params.charged);

        Self::with_grid(specks, params, grid)
    }

    /// Create a simulation from caller-provided specks.
    pub fn from_specks(specks: Vec<Speck>, params: SpeckParams) -> Result<Self, SimulationError> {
        check_count(specks.len())?;
        params.validate()?;
        let grid = PartitionGrid::new(params.max_dist, params.boundary_width)?;

        Self::with_grid(specks, params, grid)
    }

    fn with_grid(
        specks: Vec<Speck>,
        params: SpeckParams,
        grid: PartitionGrid,
    ) -> Result<Self, SimulationError> {
        let count = specks.len();
        let partition_indices = try_buffer("partition indices", count, PartitionIndex::default)?;
        let partitioner = Partitioner::new(grid.cell_count())?;
        let prefix_sum = PrefixSum::new(grid.cell_count())?;
        let sorter = Sorter::new(count)?;

        if grid.bounds() > params.boundary_width {
            info!(
                "Boundary width {} rounded up to {} ({} cells of {} per axis)",
                params.boundary_width,
                grid.bounds(),
                grid.parts_per_dim(),
                grid.cell_size()
            );
        }
        info!(
            "Speck simulation ready: {} specks, {} cells, {} prefix-sum passes",
            count,
            grid.cell_count(),
            PrefixSum::pass_count(grid.cell_count())
        );

        let boundary = BoxBoundary::new(grid.bounds())
            .with_stiffness(params.boundary_stiffness)
            .with_restitution(params.restitution);

        Ok(Self {
            params,
            grid,
            boundary,
            specks,
            partition_indices,
            partitioner,
            prefix_sum,
            sorter,
            tick: 0,
        })
    }

    /// Advance the simulation by `dt` seconds under `gravity`.
    pub fn step(&mut self, dt: f32, gravity: Vec3) {
        for stage in Stage::PIPELINE {
            self.run_stage(stage, dt, gravity);
        }
        self.tick += 1;
        debug!("Speck tick {} done (dt = {dt})", self.tick);
    }

    fn run_stage(&mut self, stage: Stage, dt: f32, gravity: Vec3) {
        let mode = self.params.execution;

        match stage {
            Stage::Clear => self.partitioner.clear(mode),
            Stage::Partition => {
                self.partitioner
                    .partition(mode, &self.grid, &self.specks, &mut self.partition_indices);
                debug_assert_eq!(
                    self.partitioner.total(),
                    self.specks.len() as u64,
                    "occupancy must account for every speck"
                );
            }
            Stage::PrefixSum => self.prefix_sum.compute(mode, &self.partitioner),
            Stage::Sort => {
                self.sorter.sort(
                    mode,
                    &self.specks,
                    &self.partition_indices,
                    self.prefix_sum.offsets(),
                );
                debug_assert!(self.sorted_layout_is_consistent());
            }
            Stage::UpdateVelocities => {
                let pass = VelocityPass {
                    params: &self.params,
                    boundary: &self.boundary,
                    view: NeighborView {
                        grid: &self.grid,
                        sorted: self.sorter.sorted(),
                        offsets: self.prefix_sum.offsets(),
                        occupancy: &self.partitioner,
                    },
                    tick: self.tick,
                    dt,
                    gravity,
                };
                let indices = &self.partition_indices;
                dispatch::for_each_mut(mode, &mut self.specks, |i, speck| {
                    pass.apply(speck, indices[i])
                });
            }
            Stage::UpdatePositions => {
                let boundary = &self.boundary;
                dispatch::for_each_mut(mode, &mut self.specks, |_, speck| {
                    update_position(boundary, speck, dt)
                });
            }
        }
    }

    fn sorted_layout_is_consistent(&self) -> bool {
        let offsets = self.prefix_sum.offsets();
        let sorted = self.sorter.sorted();
        self.partition_indices
            .iter()
            .zip(&self.specks)
            .all(|(&index, speck)| {
                let dest = Sorter::destination(index, offsets);
                index.slot < self.partitioner.occupancy(index.cell as usize)
                    && sorted[dest].tag == speck.tag
            })
    }

    /// Replace the tunable parameters.
    ///
    /// `max_dist` and `boundary_width` define the grid and must stay unchanged.
    pub fn set_params(&mut self, params: SpeckParams) -> Result<(), SimulationError> {
        params.validate()?;
        if params.max_dist != self.params.max_dist {
            return Err(SimulationError::FixedGridParameter { name: "max_dist" });
        }
        if params.boundary_width != self.params.boundary_width {
            return Err(SimulationError::FixedGridParameter {
                name: "boundary_width",
            });
        }

        self.boundary = self
            .boundary
            .with_stiffness(params.boundary_stiffness)
            .with_restitution(params.restitution);
        self.params = params;
        Ok(())
    }

    /// Put every speck back at its seeded position and restart the tick count.
    pub fn reset(&mut self) {
        self.params.layout.fill(
            &mut self.specks,
            self.params.speck_diameter(),
            self.grid.bounds(),
            self.params.charged,
        );
        self.tick = 0;
    }

    /// Release all buffers.
    pub fn destroy(self) {
        debug!(
            "Releasing speck simulation ({} specks, {} ticks)",
            self.specks.len(),
            self.tick
        );
    }

    /// Primary speck buffer, indexed by speck identity.
    pub fn specks(&self) -> &[Speck] {
        &self.specks
    }

    /// Cell-ordered copy of the specks from the last tick.
    pub fn sorted_specks(&self) -> &[Speck] {
        self.sorter.sorted()
    }

    /// Cell and slot of every speck from the last tick.
    pub fn partition_indices(&self) -> &[PartitionIndex] {
        &self.partition_indices
    }

    /// Occupancy of every cell from the last tick.
    pub fn occupancy(&self) -> Vec<u32> {
        self.partitioner.occupancy_snapshot()
    }

    /// Start offset of every cell in the sorted buffer from the last tick.
    pub fn cell_offsets(&self) -> &[u32] {
        self.prefix_sum.offsets()
    }

    pub fn speck_count(&self) -> usize {
        self.specks.len()
    }

    pub fn grid(&self) -> &PartitionGrid {
        &self.grid
    }

    pub fn boundary(&self) -> &BoxBoundary {
        &self.boundary
    }

    pub fn params(&self) -> &SpeckParams {
        &self.params
    }

    /// Number of completed ticks.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Partition geometry for renderers.
    pub fn metadata(&self) -> PartitionMetadata {
        self.grid.metadata()
    }

    /// Specks in GPU upload layout.
    pub fn gpu_specks(&self) -> Vec<GpuSpeck> {
        self.specks.iter().map(GpuSpeck::from).collect()
    }

    /// Occupancy and speed summary of the last tick.
    pub fn stats(&self) -> TickStats {
        let occupancy = self.partitioner.occupancy_snapshot();
        let (speed_sum, max_speed) = self
            .specks
            .iter()
            .map(|speck| speck.velocity.length())
            .fold((0.0, 0.0f32), |(sum, max), speed| (sum + speed, max.max(speed)));

        TickStats {
            tick: self.tick,
            occupied_cells: occupancy.iter().filter(|&&count| count > 0).count(),
            max_occupancy: occupancy.iter().copied().max().unwrap_or(0),
            mean_speed: speed_sum / self.specks.len() as f32,
            max_speed,
        }
    }
}

/// Speck counts must be non-zero and addressable by a `u32` sorted index.
fn check_count(count: usize) -> Result<(), SimulationError> {
    if count == 0 {
        return Err(SimulationError::EmptyPopulation);
    }
    if u32::try_from(count).is_err() {
        return Err(SimulationError::TooManySpecks { count });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speck::params::ExecutionMode;

    #[test]
    fn test_rejects_empty_population() {
        assert_eq!(
            SpeckSimulation::new(0, SpeckParams::default()).unwrap_err(),
            SimulationError::EmptyPopulation
        );
        assert_eq!(
            SpeckSimulation::from_specks(Vec::new(), SpeckParams::default()).unwrap_err(),
            SimulationError::EmptyPopulation
        );
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_rejects_oversized_population_before_allocating() {
        let count = u32::MAX as usize + 1;
        assert_eq!(
            SpeckSimulation::new(count, SpeckParams::default()).unwrap_err(),
            SimulationError::TooManySpecks { count }
        );
    }

    #[test]
    fn test_tiny_speck_radius_initializes() {
        let params = SpeckParams::liquid().with_speck_radius(1e-10);
        let sim = SpeckSimulation::new(4, params).unwrap();

        assert_eq!(sim.speck_count(), 4);
        assert!(sim.specks().iter().all(|s| sim.boundary().contains(s.position)));
    }

    #[test]
    fn test_rejects_bad_config() {
        let params = SpeckParams::default().with_max_dist(-0.1);
        let err = SpeckSimulation::new(10, params).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::InvalidParameter { name: "max_dist", .. }
        ));
    }

    #[test]
    fn test_step_advances_tick() {
        let mut sim = SpeckSimulation::new(64, SpeckParams::default()).unwrap();
        sim.step(0.01, Vec3::ZERO);
        sim.step(0.01, Vec3::ZERO);
        assert_eq!(sim.tick(), 2);
        assert_eq!(sim.stats().tick, 2);
    }

    #[test]
    fn test_set_params_keeps_grid_fixed() {
        let mut sim = SpeckSimulation::new(8, SpeckParams::default()).unwrap();

        let err = sim
            .set_params(SpeckParams::default().with_max_dist(0.2))
            .unwrap_err();
        assert_eq!(err, SimulationError::FixedGridParameter { name: "max_dist" });

        sim.set_params(SpeckParams::default().with_boundary(5.0, 0.9))
            .unwrap();
        assert_eq!(sim.boundary().restitution, 0.9);
        assert_eq!(sim.boundary().stiffness, 5.0);
    }

    #[test]
    fn test_reset_restores_layout() {
        let params = SpeckParams::default().with_execution(ExecutionMode::Serial);
        let mut sim = SpeckSimulation::new(27, params.clone()).unwrap();
        let seeded = sim.specks().to_vec();

        for _ in 0..5 {
            sim.step(0.02, Vec3::new(0.0, -9.81, 0.0));
        }
        assert_ne!(sim.specks(), seeded.as_slice());

        sim.reset();
        assert_eq!(sim.specks(), seeded.as_slice());
        assert_eq!(sim.tick(), 0);
    }

    #[test]
    fn test_stats_count_occupied_cells() {
        let params = SpeckParams::default().with_max_dist(0.5);
        let specks = vec![
            Speck::new(Vec3::splat(-0.25)),
            Speck::new(Vec3::splat(-0.2)),
            Speck::new(Vec3::splat(0.25)),
        ];
        let mut sim = SpeckSimulation::from_specks(specks, params).unwrap();
        sim.step(1e-4, Vec3::ZERO);

        let stats = sim.stats();
        assert_eq!(stats.occupied_cells, 2);
        assert_eq!(stats.max_occupancy, 2);
    }

    #[test]
    fn test_metadata_and_gpu_upload() {
        let sim = SpeckSimulation::new(10, SpeckParams::default().with_max_dist(0.3)).unwrap();
        let metadata = sim.metadata();

        assert_eq!(metadata.parts_per_dim, 4);
        assert!((metadata.bounds - 1.2).abs() < 1e-6);
        assert_eq!(sim.gpu_specks().len(), 10);
        sim.destroy();
    }
}
