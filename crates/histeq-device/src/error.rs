use thiserror::Error;

/// An error type for device operations.
#[derive(Error, Debug, PartialEq)]
pub enum DeviceError {
    /// A global buffer could not be allocated.
    #[error("failed to allocate {0} bytes of device memory")]
    OutOfMemory(usize),

    /// A work group asked for more local memory than the device provides.
    #[error("requested {0} bytes of local memory, only {1} available")]
    OutOfLocalMemory(usize, usize),

    /// A kernel was launched with no work items.
    #[error("launch range must contain at least one work item")]
    EmptyRange,

    /// The work group size is zero or does not divide the global size.
    #[error("work group size {1} is invalid for global size {0}")]
    InvalidWorkGroupSize(usize, usize),

    /// The work group size exceeds the device limit.
    #[error("work group size {0} exceeds the device maximum of {1}")]
    WorkGroupTooLarge(usize, usize),

    /// The output buffer does not match the launch shape.
    #[error("buffer holds {1} elements, launch expects {0}")]
    BufferSizeMismatch(usize, usize),

    /// The requested thread count is invalid.
    #[error("thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),

    /// The thread pool failed to build.
    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
}
