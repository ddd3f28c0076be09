#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// global device buffers.
pub mod buffer;

/// device description and capabilities.
pub mod device;

/// Error types for the device module.
pub mod error;

/// work groups, group-local memory and barriers.
pub mod group;

/// in-order command queue and kernel launches.
pub mod queue;

/// launch ranges and work item indexing.
pub mod range;

pub use crate::buffer::{AtomicBuffer, Buffer};
pub use crate::device::{Device, DeviceInfo};
pub use crate::error::DeviceError;
pub use crate::group::{LocalBuffer, WorkGroup};
pub use crate::queue::{CommandQueue, Event, ExecutionStrategy};
pub use crate::range::{NdRange, WorkItem};
