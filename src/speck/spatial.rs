//! Uniform partition grid for neighbor search.
//!
//! The grid is a cube of `parts_per_dim³` cells whose edge equals the
//! interaction cutoff, so every interacting pair lies in the same or an
//! adjacent cell. Occupancy is counted with one atomic counter per cell.

use std::sync::atomic::{AtomicU32, Ordering};

use bevy::prelude::*;

use super::dispatch;
use super::error::{try_buffer, SimulationError};
use super::params::ExecutionMode;
use super::particle::{PartitionIndex, Speck};

/// Offsets of the 3x3x3 neighborhood, the cell itself included.
pub static NEIGHBOR_OFFSETS: [IVec3; 27] = [
    IVec3::new(-1, -1, -1),
    IVec3::new(-1, -1, 0),
    IVec3::new(-1, -1, 1),
    IVec3::new(-1, 0, -1),
    IVec3::new(-1, 0, 0),
    IVec3::new(-1, 0, 1),
    IVec3::new(-1, 1, -1),
    IVec3::new(-1, 1, 0),
    IVec3::new(-1, 1, 1),
    IVec3::new(0, -1, -1),
    IVec3::new(0, -1, 0),
    IVec3::new(0, -1, 1),
    IVec3::new(0, 0, -1),
    IVec3::new(0, 0, 0),
    IVec3::new(0, 0, 1),
    IVec3::new(0, 1, -1),
    IVec3::new(0, 1, 0),
    IVec3::new(0, 1, 1),
    IVec3::new(1, -1, -1),
    IVec3::new(1, -1, 0),
    IVec3::new(1, -1, 1),
    IVec3::new(1, 0, -1),
    IVec3::new(1, 0, 0),
    IVec3::new(1, 0, 1),
    IVec3::new(1, 1, -1),
    IVec3::new(1, 1, 0),
    IVec3::new(1, 1, 1),
];

/// Geometry of the partition grid.
///
/// The container is centered on the origin. Its simulated width is
/// `parts_per_dim * cell_size`, which rounds the requested width up to a
/// whole number of cells and can therefore be larger than requested.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PartitionGrid {
    cell_size: f32,
    parts_per_dim: u32,
}

impl PartitionGrid {
    /// Create a grid with cells of `max_dist` covering at least `boundary_width`.
    pub fn new(max_dist: f32, boundary_width: f32) -> Result<Self, SimulationError> {
        if !(max_dist > 0.0 && max_dist.is_finite()) {
            return Err(SimulationError::invalid(
                "max_dist",
                max_dist,
                "a positive finite value",
            ));
        }
        if !(boundary_width > 0.0 && boundary_width.is_finite()) {
            return Err(SimulationError::invalid(
                "boundary_width",
                boundary_width,
                "a positive finite value",
            ));
        }

        let parts = (boundary_width / max_dist).ceil();
        if parts > u32::MAX as f32 {
            return Err(SimulationError::GridTooLarge {
                parts_per_dim: u32::MAX,
            });
        }
        let parts_per_dim = (parts as u32).max(1);
        parts_per_dim
            .checked_mul(parts_per_dim)
            .and_then(|square| square.checked_mul(parts_per_dim))
            .ok_or(SimulationError::GridTooLarge { parts_per_dim })?;

        Ok(Self {
            cell_size: max_dist,
            parts_per_dim,
        })
    }

    /// Edge length of a cell.
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of cells along each axis.
    pub fn parts_per_dim(&self) -> u32 {
        self.parts_per_dim
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        (self.parts_per_dim as usize).pow(3)
    }

    /// Simulated container width.
    pub fn bounds(&self) -> f32 {
        self.parts_per_dim as f32 * self.cell_size
    }

    /// Half of the simulated container width.
    pub fn half_bounds(&self) -> f32 {
        self.bounds() / 2.0
    }

    /// Calculate the grid cell for a position, clamped onto the grid.
    pub fn cell_coord(&self, position: Vec3) -> UVec3 {
        let relative = (position + Vec3::splat(self.half_bounds())) / self.cell_size;
        let max = (self.parts_per_dim - 1) as i32;
        // `as` saturates and maps NaN to 0
        let cell = relative.floor();
        UVec3::new(
            (cell.x as i32).clamp(0, max) as u32,
            (cell.y as i32).clamp(0, max) as u32,
            (cell.z as i32).clamp(0, max) as u32,
        )
    }

    /// Flatten a cell coordinate.
    pub fn cell_index(&self, coord: UVec3) -> u32 {
        let n = self.parts_per_dim;
        coord.x + coord.y * n + coord.z * n * n
    }

    /// Inverse of [`cell_index`](Self::cell_index).
    pub fn cell_coord_of_index(&self, index: u32) -> UVec3 {
        let n = self.parts_per_dim;
        UVec3::new(index % n, (index / n) % n, index / (n * n))
    }

    /// Flattened cell index for a position.
    pub fn cell_of(&self, position: Vec3) -> u32 {
        self.cell_index(self.cell_coord(position))
    }

    /// Check if a cell coordinate is within the grid bounds.
    pub fn is_valid_cell(&self, cell: IVec3) -> bool {
        let n = self.parts_per_dim as i32;
        cell.x >= 0 && cell.y >= 0 && cell.z >= 0 && cell.x < n && cell.y < n && cell.z < n
    }

    /// Flattened indices of the in-grid cells of the 3x3x3 block around `coord`.
    pub fn neighbor_cells(&self, coord: UVec3) -> impl Iterator<Item = u32> + '_ {
        let center = coord.as_ivec3();
        NEIGHBOR_OFFSETS.iter().filter_map(move |offset| {
            let cell = center + *offset;
            self.is_valid_cell(cell)
                .then(|| self.cell_index(cell.as_uvec3()))
        })
    }

    /// Read-only grid description for renderers.
    pub fn metadata(&self) -> PartitionMetadata {
        PartitionMetadata {
            cell_size: self.cell_size,
            parts_per_dim: self.parts_per_dim,
            bounds: self.bounds(),
        }
    }
}

/// Partition geometry exposed to renderers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PartitionMetadata {
    pub cell_size: f32,
    pub parts_per_dim: u32,
    pub bounds: f32,
}

impl PartitionMetadata {
    pub fn to_gpu(&self, speck_count: u32) -> GpuPartitionParams {
        GpuPartitionParams {
            cell_size: self.cell_size,
            parts_per_dim: self.parts_per_dim,
            bounds: self.bounds,
            speck_count,
        }
    }
}

/// Parameters passed to partition-aware shaders.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuPartitionParams {
    /// Cell size.
    pub cell_size: f32,
    /// Cells per axis.
    pub parts_per_dim: u32,
    /// Simulated container width.
    pub bounds: f32,
    /// Number of specks.
    pub speck_count: u32,
}

/// Per-cell occupancy counters.
#[derive(Debug)]
pub struct Partitioner {
    counts: Vec<AtomicU32>,
}

impl Partitioner {
    /// Allocate one counter per cell.
    pub fn new(cell_count: usize) -> Result<Self, SimulationError> {
        Ok(Self {
            counts: try_buffer("occupancy", cell_count, || AtomicU32::new(0))?,
        })
    }

    /// Number of cells tracked.
    pub fn cell_count(&self) -> usize {
        self.counts.len()
    }

    /// Zero every counter.
    pub fn clear(&self, mode: ExecutionMode) {
        dispatch::for_each(mode, &self.counts, |_, count| {
            count.store(0, Ordering::Relaxed)
        });
    }

    /// File every speck under its cell.
    ///
    /// Each speck takes the pre-increment value of its cell's counter as its
    /// slot, so slots within a cell are unique and dense.
    pub fn partition(
        &self,
        mode: ExecutionMode,
        grid: &PartitionGrid,
        specks: &[Speck],
        indices: &mut [PartitionIndex],
    ) {
        debug_assert_eq!(specks.len(), indices.len());
        dispatch::for_each_mut(mode, indices, |i, index| {
            let cell = grid.cell_of(specks[i].position);
            let slot = self.counts[cell as usize].fetch_add(1, Ordering::Relaxed);
            *index = PartitionIndex { cell, slot };
        });
    }

    /// Occupancy of one cell.
    pub fn occupancy(&self, cell: usize) -> u32 {
        self.counts[cell].load(Ordering::Relaxed)
    }

    /// Copy of every cell's occupancy.
    pub fn occupancy_snapshot(&self) -> Vec<u32> {
        self.counts
            .iter()
            .map(|count| count.load(Ordering::Relaxed))
            .collect()
    }

    /// Sum of all occupancy counters.
    pub fn total(&self) -> u64 {
        self.counts
            .iter()
            .map(|count| count.load(Ordering::Relaxed) as u64)
            .sum()
    }
}
