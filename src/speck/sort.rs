//! Counting-sort scatter of specks into cell order.
//!
//! After partitioning and the prefix sum, every speck knows its destination
//! `offset[cell] + slot`. Copying each speck there lays every cell out as one
//! contiguous range of the sorted buffer.

use super::dispatch;
use super::error::{try_buffer, SimulationError};
use super::params::ExecutionMode;
use super::particle::{PartitionIndex, Speck};

/// Cell-ordered copy of the speck buffer.
#[derive(Clone, Debug)]
pub struct Sorter {
    sorted: Vec<Speck>,
}

impl Sorter {
    /// Allocate the sorted buffer.
    pub fn new(speck_count: usize) -> Result<Self, SimulationError> {
        Ok(Self {
            sorted: try_buffer("sorted specks", speck_count, Speck::default)?,
        })
    }

    /// Destination of a speck in the sorted buffer.
    #[inline]
    pub fn destination(index: PartitionIndex, offsets: &[u32]) -> usize {
        (offsets[index.cell as usize] + index.slot) as usize
    }

    /// Scatter `specks` into cell order.
    ///
    /// `indices` must come from a single partition pass over `specks`, and
    /// `offsets` must be the exclusive prefix sum of that pass's occupancy.
    pub fn sort(
        &mut self,
        mode: ExecutionMode,
        specks: &[Speck],
        indices: &[PartitionIndex],
        offsets: &[u32],
    ) {
        assert_eq!(specks.len(), self.sorted.len(), "speck buffer size changed");
        assert_eq!(specks.len(), indices.len(), "partition indices out of date");

        // SAFETY: slots are issued by an atomic increment per cell, so they are
        // unique within a cell, and cell ranges [offset, offset + count) do not
        // overlap. Every destination is therefore written exactly once.
        unsafe {
            dispatch::scatter(mode, &mut self.sorted, specks.len(), |i| {
                (Self::destination(indices[i], offsets), specks[i])
            });
        }
    }

    /// The sorted buffer.
    pub fn sorted(&self) -> &[Speck] {
        &self.sorted
    }
}

#[cfg(test)]
mod tests {
    use bevy::prelude::*;

    use super::*;
    use crate::speck::prefix_sum::PrefixSum;
    use crate::speck::spatial::{PartitionGrid, Partitioner};

    type Sorted = (Vec<Speck>, Vec<PartitionIndex>, Vec<u32>, Vec<u32>);

    fn sort_specks(mode: ExecutionMode, grid: &PartitionGrid, specks: &[Speck]) -> Sorted {
        let partitioner = Partitioner::new(grid.cell_count()).unwrap();
        let mut indices = vec![PartitionIndex::default(); specks.len()];
        let mut scan = PrefixSum::new(grid.cell_count()).unwrap();
        let mut sorter = Sorter::new(specks.len()).unwrap();

        partitioner.clear(mode);
        partitioner.partition(mode, grid, specks, &mut indices);
        scan.compute(mode, &partitioner);
        sorter.sort(mode, specks, &indices, scan.offsets());

        (
            sorter.sorted().to_vec(),
            indices,
            scan.offsets().to_vec(),
            partitioner.occupancy_snapshot(),
        )
    }

    #[test]
    fn test_cells_are_contiguous() {
        let grid = PartitionGrid::new(0.5, 1.0).unwrap();
        let specks: Vec<Speck> = (0..40)
            .map(|i| {
                let t = i as f32 / 40.0;
                Speck::new(Vec3::new(t - 0.5, 0.3 - t * 0.7, (t * 9.0).sin() * 0.45)).with_tag(i)
            })
            .collect();

        for mode in [ExecutionMode::Parallel, ExecutionMode::Serial] {
            let (sorted, _, offsets, counts) = sort_specks(mode, &grid, &specks);

            for cell in 0..grid.cell_count() {
                let range = offsets[cell] as usize..(offsets[cell] + counts[cell]) as usize;
                for speck in &sorted[range] {
                    assert_eq!(grid.cell_of(speck.position) as usize, cell);
                }
            }

            // Every speck appears exactly once (tags are unique ids here)
            let mut tags: Vec<i32> = sorted.iter().map(|s| s.tag).collect();
            tags.sort_unstable();
            assert_eq!(tags, (0..40).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_serial_sort_is_stable() {
        let grid = PartitionGrid::new(0.5, 1.0).unwrap();
        let specks = vec![
            Speck::new(Vec3::splat(0.25)).with_tag(0),
            Speck::new(Vec3::splat(-0.25)).with_tag(1),
            Speck::new(Vec3::splat(0.3)).with_tag(2),
            Speck::new(Vec3::splat(-0.3)).with_tag(3),
        ];

        let (sorted, indices, offsets, _) = sort_specks(ExecutionMode::Serial, &grid, &specks);

        let tags: Vec<i32> = sorted.iter().map(|s| s.tag).collect();
        assert_eq!(tags, vec![1, 3, 0, 2]);
        assert_eq!(Sorter::destination(indices[2], &offsets), 3);
    }
}
