#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! Every public function is the body of one kernel: it runs once per work
//! item (or once per work group for the group kernels) and is launched by the
//! host through a `histeq_device::CommandQueue`.

/// channel reduction kernels.
pub mod color;

/// histogram kernels and the bin lookup shared with the remapper.
pub mod histogram;

/// lookup table remap kernel.
pub mod lookup;

/// cumulative histogram normalization kernel.
pub mod normalize;

/// prefix scan kernels.
pub mod scan;
