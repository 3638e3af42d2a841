//! Parallel exclusive prefix sum over cell occupancy.
//!
//! Uses the Hillis-Steele doubling scan: pass `k` adds the value `2^k` cells
//! to the left into every cell, so after `⌈log2 n⌉` passes each cell holds the
//! sum of everything before it. Every pass reads one buffer and writes the
//! other, so cells within a pass are independent work items.

use super::dispatch;
use super::error::{try_buffer, SimulationError};
use super::params::ExecutionMode;
use super::spatial::Partitioner;

/// Exclusive prefix sum with two ping-pong buffers.
#[derive(Clone, Debug)]
pub struct PrefixSum {
    /// Scan buffers. Pass `k` reads `slots[k % 2]` and writes `slots[(k + 1) % 2]`.
    slots: [Vec<u32>; 2],
    /// Slot holding the finished scan.
    result_slot: usize,
}

impl PrefixSum {
    /// Allocate scan buffers for `cell_count` cells.
    pub fn new(cell_count: usize) -> Result<Self, SimulationError> {
        Ok(Self {
            slots: [
                try_buffer("prefix sum A", cell_count, || 0)?,
                try_buffer("prefix sum B", cell_count, || 0)?,
            ],
            result_slot: 0,
        })
    }

    /// Number of doubling passes for `cell_count` cells, `⌈log2 cell_count⌉`.
    pub fn pass_count(cell_count: usize) -> u32 {
        if cell_count <= 1 {
            0
        } else {
            usize::BITS - (cell_count - 1).leading_zeros()
        }
    }

    /// Number of cells covered.
    pub fn cell_count(&self) -> usize {
        self.slots[0].len()
    }

    /// Scan the partitioner's occupancy counters.
    pub fn compute(&mut self, mode: ExecutionMode, partitioner: &Partitioner) {
        debug_assert_eq!(partitioner.cell_count(), self.cell_count());
        self.run(mode, |cell| partitioner.occupancy(cell));
    }

    /// Scan a plain slice of counts.
    ///
    /// # Panics
    ///
    /// Panics if `counts.len()` differs from [`cell_count`](Self::cell_count).
    pub fn compute_from_counts(&mut self, mode: ExecutionMode, counts: &[u32]) {
        assert_eq!(
            counts.len(),
            self.cell_count(),
            "count slice must cover every cell"
        );
        self.run(mode, |cell| counts[cell]);
    }

    fn run<F>(&mut self, mode: ExecutionMode, count: F)
    where
        F: Fn(usize) -> u32 + Sync + Send,
    {
        // Seed with counts shifted right by one, which makes the scan exclusive
        dispatch::for_each_mut(mode, &mut self.slots[0], |cell, value| {
            *value = if cell == 0 { 0 } else { count(cell - 1) };
        });

        let passes = Self::pass_count(self.cell_count());
        for pass in 0..passes {
            let power = 1usize << pass;
            let [even, odd] = &mut self.slots;
            let (src, dst) = if pass % 2 == 0 {
                (&*even, odd)
            } else {
                (&*odd, even)
            };
            dispatch::for_each_mut(mode, dst, |cell, value| {
                *value = src[cell] + if cell >= power { src[cell - power] } else { 0 };
            });
        }
        self.result_slot = (passes % 2) as usize;
    }

    /// Start offset of every cell in the sorted buffer.
    pub fn offsets(&self) -> &[u32] {
        &self.slots[self.result_slot]
    }

    /// Start offset of one cell.
    pub fn offset(&self, cell: usize) -> u32 {
        self.slots[self.result_slot][cell]
    }
}
