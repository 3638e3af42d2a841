//! Error types for simulation setup and configuration loading.

/// Errors raised while creating or reconfiguring a [`SpeckSimulation`].
///
/// A tick itself never fails; everything that can go wrong is caught here,
/// before the first step.
///
/// [`SpeckSimulation`]: super::simulation::SpeckSimulation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error("invalid parameter `{name}` = {value}: expected {expected}")]
    InvalidParameter {
        name: &'static str,
        value: f32,
        expected: &'static str,
    },
    #[error("speck count must be positive")]
    EmptyPopulation,
    #[error("{count} specks exceed the u32 sorted-index range")]
    TooManySpecks { count: usize },
    #[error("partition grid of {parts_per_dim}^3 cells does not fit in a u32 cell index")]
    GridTooLarge { parts_per_dim: u32 },
    #[error("failed to allocate {len} elements for the {buffer} buffer")]
    Allocation { buffer: &'static str, len: usize },
    #[error("`{name}` shapes the partition grid and cannot change after initialization")]
    FixedGridParameter { name: &'static str },
}

impl SimulationError {
    pub(crate) fn invalid(name: &'static str, value: f32, expected: &'static str) -> Self {
        Self::InvalidParameter {
            name,
            value,
            expected,
        }
    }
}

/// Error type for loading parameters from a RON file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error(transparent)]
    Invalid(#[from] SimulationError),
}

/// Error type for saving parameters to a RON file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigSaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON serialize error: {0}")]
    Ron(#[from] ron::Error),
}

/// Allocates a buffer of `len` elements, reporting exhaustion instead of aborting.
pub(crate) fn try_buffer<T>(
    buffer: &'static str,
    len: usize,
    mut fill: impl FnMut() -> T,
) -> Result<Vec<T>, SimulationError> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| SimulationError::Allocation { buffer, len })?;
    data.extend((0..len).map(|_| fill()));
    Ok(data)
}
