//! Error types for the simulation core.

use thiserror::Error;

/// Failures that stop a run before (or instead of) the tick loop.
///
/// Nothing in here is raised from inside a tick: empty rings and similar
/// numeric corner cases are handled locally by the kernel.
#[derive(Error, Debug)]
pub enum SmoothLifeError {
    /// Width or height was zero
    #[error("degenerate grid size {width}x{height}: both dimensions must be positive")]
    DegenerateSize { width: u32, height: u32 },

    /// Rule constants that break R1 < R2, B1 < B2 or D1 < D2
    #[error("invalid rule parameters: {0}")]
    InvalidParams(String),

    /// Cell data does not match the declared dimensions
    #[error("grid data has {actual} cells, expected {expected}")]
    GridMismatch { expected: usize, actual: usize },

    /// Adapter/device acquisition or capability negotiation failed
    #[error("GPU error: {0}")]
    Gpu(String),

    /// Surface or kernel program could not be created
    #[error("allocation failed: {0}")]
    Allocation(String),

    /// Mapping the staging buffer back to the host failed
    #[error("readback failed: {0}")]
    Readback(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings error: {0}")]
    Settings(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SmoothLifeError>;
