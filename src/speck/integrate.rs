//! Velocity and position passes.
//!
//! The velocity pass reads neighbor state only from the sorted buffer, which
//! is a snapshot taken before the pass, and writes only the primary buffer.
//! Positions do not move until every velocity has been updated, so each pair
//! sees the same separation from both sides within a tick.

use bevy::prelude::*;

use super::boundary::BoxBoundary;
use super::forces::{coincident_direction, pair_force};
use super::params::SpeckParams;
use super::particle::{PartitionIndex, Speck};
use super::sort::Sorter;
use super::spatial::{PartitionGrid, Partitioner};

/// Read-only view of the current tick's neighbor structure.
#[derive(Clone, Copy)]
pub struct NeighborView<'a> {
    pub grid: &'a PartitionGrid,
    pub sorted: &'a [Speck],
    pub offsets: &'a [u32],
    pub occupancy: &'a Partitioner,
}

impl NeighborView<'_> {
    /// Sum of pairwise forces on the speck filed under `index`.
    pub fn pair_forces(
        &self,
        params: &SpeckParams,
        tick: u64,
        speck: &Speck,
        index: PartitionIndex,
    ) -> Vec3 {
        let own = Sorter::destination(index, self.offsets);
        let coord = self.grid.cell_coord_of_index(index.cell);

        let mut force = Vec3::ZERO;
        for cell in self.grid.neighbor_cells(coord) {
            let start = self.offsets[cell as usize] as usize;
            let end = start + self.occupancy.occupancy(cell as usize) as usize;
            for other in start..end {
                if other == own {
                    continue;
                }
                let neighbor = &self.sorted[other];
                force += pair_force(
                    params,
                    speck.position,
                    speck.tag,
                    neighbor.position,
                    neighbor.tag,
                    || coincident_direction(params.seed, tick, own, other),
                );
            }
        }
        force
    }
}

/// Per-tick inputs of the velocity pass.
#[derive(Clone, Copy)]
pub struct VelocityPass<'a> {
    pub params: &'a SpeckParams,
    pub boundary: &'a BoxBoundary,
    pub view: NeighborView<'a>,
    pub tick: u64,
    pub dt: f32,
    pub gravity: Vec3,
}

impl VelocityPass<'_> {
    /// Semi-implicit Euler velocity update for one speck.
    pub fn apply(&self, speck: &mut Speck, index: PartitionIndex) {
        let force = self.view.pair_forces(self.params, self.tick, speck, index)
            + self.boundary.spring_force(speck.position);
        let acceleration = force / self.params.mass + self.gravity;

        let velocity = (speck.velocity + acceleration * self.dt) * (1.0 - self.params.damper);
        speck.velocity = velocity.clamp_length_max(self.params.max_velocity);
    }
}

/// Advance one speck and resolve wall contacts.
pub fn update_position(boundary: &BoxBoundary, speck: &mut Speck, dt: f32) {
    speck.position += speck.velocity * dt;
    boundary.apply_collision(&mut speck.position, &mut speck.velocity);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speck::params::ExecutionMode;
    use crate::speck::prefix_sum::PrefixSum;

    #[test]
    fn test_free_speck_gets_gravity_and_damping() {
        let params = SpeckParams::default().with_damper(0.5);
        let grid = PartitionGrid::new(params.max_dist, params.boundary_width).unwrap();
        let partitioner = Partitioner::new(grid.cell_count()).unwrap();
        let offsets = vec![0; grid.cell_count()];
        let view = NeighborView {
            grid: &grid,
            sorted: &[],
            offsets: &offsets,
            occupancy: &partitioner,
        };
        let boundary = BoxBoundary::new(grid.bounds());

        let mut speck = Speck::new(Vec3::ZERO).with_velocity(Vec3::X);
        let index = PartitionIndex {
            cell: grid.cell_of(speck.position),
            slot: 0,
        };
        let pass = VelocityPass {
            params: &params,
            boundary: &boundary,
            view,
            tick: 0,
            dt: 0.1,
            gravity: Vec3::new(0.0, -10.0, 0.0),
        };
        pass.apply(&mut speck, index);

        assert!((speck.velocity - Vec3::new(0.5, -0.5, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_velocity_is_clamped() {
        let params = SpeckParams::default().with_damper(0.0).with_max_velocity(2.0);
        let grid = PartitionGrid::new(params.max_dist, params.boundary_width).unwrap();
        let partitioner = Partitioner::new(grid.cell_count()).unwrap();
        let offsets = vec![0; grid.cell_count()];
        let view = NeighborView {
            grid: &grid,
            sorted: &[],
            offsets: &offsets,
            occupancy: &partitioner,
        };
        let boundary = BoxBoundary::new(grid.bounds());

        let mut speck = Speck::new(Vec3::ZERO).with_velocity(Vec3::new(30.0, 40.0, 0.0));
        let index = PartitionIndex {
            cell: grid.cell_of(speck.position),
            slot: 0,
        };
        let pass = VelocityPass {
            params: &params,
            boundary: &boundary,
            view,
            tick: 0,
            dt: 0.01,
            gravity: Vec3::ZERO,
        };
        pass.apply(&mut speck, index);

        assert!((speck.velocity - Vec3::new(1.2, 1.6, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_self_is_excluded() {
        let params = SpeckParams::default()
            .with_repulsion(1.0, 1.0)
            .with_attraction(0.0, 1.0, 0.0)
            .with_execution(ExecutionMode::Serial);
        let grid = PartitionGrid::new(params.max_dist, params.boundary_width).unwrap();
        let partitioner = Partitioner::new(grid.cell_count()).unwrap();
        let specks = vec![Speck::new(Vec3::ZERO), Speck::new(Vec3::ZERO)];
        let mut indices = vec![PartitionIndex::default(); 2];
        let mut scan = PrefixSum::new(grid.cell_count()).unwrap();
        let mut sorter = Sorter::new(2).unwrap();

        partitioner.clear(params.execution);
        partitioner.partition(params.execution, &grid, &specks, &mut indices);
        scan.compute(params.execution, &partitioner);
        sorter.sort(params.execution, &specks, &indices, scan.offsets());

        let view = NeighborView {
            grid: &grid,
            sorted: sorter.sorted(),
            offsets: scan.offsets(),
            occupancy: &partitioner,
        };
        let on_first = view.pair_forces(&params, 0, &specks[0], indices[0]);
        let on_second = view.pair_forces(&params, 0, &specks[1], indices[1]);

        // One coincident partner each, pushed apart along opposite random directions
        assert!((on_first.length() - 1.0).abs() < 1e-5);
        assert!((on_first + on_second).length() < 1e-5);
    }

    #[test]
    fn test_position_update_reflects_off_wall() {
        let boundary = BoxBoundary::new(1.0).with_restitution(0.5);
        let mut speck = Speck::new(Vec3::new(0.45, 0.0, 0.0)).with_velocity(Vec3::X);

        update_position(&boundary, &mut speck, 0.1);

        assert_eq!(speck.position.x, 0.5);
        assert_eq!(speck.velocity.x, -0.5);
    }
}
