//! Error types for tile scheduling.

use std::fmt;
use std::io;

/// Axis of a range, used in error reporting and splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
        }
    }
}

/// Errors that can occur while decomposing a domain or running workers.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// The maximum tile edge length was zero or negative.
    #[error("tile size must be positive")]
    InvalidTileSize,

    /// A range had its minimum bound above its maximum bound.
    #[error("malformed range: min {min} > max {max} on the {axis} axis")]
    MalformedRange { axis: Axis, min: String, max: String },

    /// A range's extent along one axis does not fit the coordinate type.
    #[error("range extent from {min} to {max} on the {axis} axis overflows the coordinate type")]
    ExtentOverflow { axis: Axis, min: String, max: String },

    /// The worker pool was configured with no workers.
    #[error("worker count must be at least 1")]
    InvalidWorkerCount,

    /// A tile function panicked, aborting the run.
    #[error("worker {worker} panicked: {message}")]
    WorkerPanicked { worker: usize, message: String },

    /// The operating system refused to spawn a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Result alias used throughout the scheduler.
pub type ScheduleResult<T> = Result<T, ScheduleError>;
