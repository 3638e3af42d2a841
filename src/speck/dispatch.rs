//! Work-item dispatch for simulation stages.
//!
//! Each helper runs one kernel over every item and returns only once all of
//! them have finished, which is the barrier between stages.

use std::marker::PhantomData;

use rayon::prelude::*;

use super::params::ExecutionMode;

pub(crate) fn for_each<T, F>(mode: ExecutionMode, items: &[T], kernel: F)
where
    T: Sync,
    F: Fn(usize, &T) + Sync + Send,
{
    match mode {
        ExecutionMode::Parallel => items
            .par_iter()
            .enumerate()
            .for_each(|(i, item)| kernel(i, item)),
        ExecutionMode::Serial => items
            .iter()
            .enumerate()
            .for_each(|(i, item)| kernel(i, item)),
    }
}

pub(crate) fn for_each_mut<T, F>(mode: ExecutionMode, items: &mut [T], kernel: F)
where
    T: Send,
    F: Fn(usize, &mut T) + Sync + Send,
{
    match mode {
        ExecutionMode::Parallel => items
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, item)| kernel(i, item)),
        ExecutionMode::Serial => items
            .iter_mut()
            .enumerate()
            .for_each(|(i, item)| kernel(i, item)),
    }
}

/// Runs `kernel` for `0..count` and stores each returned value at the returned index.
///
/// # Safety
///
/// The indices returned by `kernel` must be pairwise distinct across the whole
/// dispatch. Indices are bounds-checked, but two items writing the same index
/// from different threads is a data race.
pub(crate) unsafe fn scatter<T, F>(mode: ExecutionMode, out: &mut [T], count: usize, kernel: F)
where
    T: Copy + Send,
    F: Fn(usize) -> (usize, T) + Sync + Send,
{
    match mode {
        ExecutionMode::Parallel => {
            let target = ScatterTarget::new(out);
            (0..count).into_par_iter().for_each(|i| {
                let (dest, value) = kernel(i);
                // SAFETY: destinations are distinct per the caller's contract.
                unsafe { target.write(dest, value) };
            });
        }
        ExecutionMode::Serial => {
            for i in 0..count {
                let (dest, value) = kernel(i);
                out[dest] = value;
            }
        }
    }
}

/// Shared view of a mutable slice for disjoint writes from many threads.
struct ScatterTarget<'a, T> {
    ptr: *mut T,
    len: usize,
    _borrow: PhantomData<&'a mut [T]>,
}

// SAFETY: the target only hands out writes to distinct indices (see `scatter`).
unsafe impl<T: Send> Sync for ScatterTarget<'_, T> {}
unsafe impl<T: Send> Send for ScatterTarget<'_, T> {}

impl<'a, T: Copy> ScatterTarget<'a, T> {
    fn new(slice: &'a mut [T]) -> Self {
        Self {
            ptr: slice.as_mut_ptr(),
            len: slice.len(),
            _borrow: PhantomData,
        }
    }

    /// # Safety
    ///
    /// No other thread may read or write `index` during this dispatch.
    unsafe fn write(&self, index: usize, value: T) {
        assert!(index < self.len, "scatter index {index} out of range {}", self.len);
        // SAFETY: in bounds, exclusive per the caller's contract, and `T: Copy` needs no drop.
        unsafe { self.ptr.add(index).write(value) };
    }
}
