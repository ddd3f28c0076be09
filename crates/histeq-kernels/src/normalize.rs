use std::sync::atomic::{AtomicU32, Ordering};

use histeq_device::WorkItem;

/// The output intensity ceiling.
pub const MAX_INTENSITY: u64 = 255;

/// Rescale one bin of the cumulative histogram so that the last bin maps to
/// [`MAX_INTENSITY`].
///
/// One work item per bin: `dst[0] = floor(cumulative[i] * 255 / cumulative[bins - 1])`.
/// The divisor is whatever the scan left in the last bin: the pixel count for
/// an inclusive scan, the pixel count minus the top bin for an exclusive one.
///
/// # Panics
///
/// Panics if `cumulative[bins - 1]` is zero; the host must reject such runs.
pub fn normalise(item: WorkItem, cumulative: &[AtomicU32], bins: usize, dst: &mut [u32]) {
    let total = cumulative[bins - 1].load(Ordering::Relaxed) as u64;
    let value = cumulative[item.global_id()].load(Ordering::Relaxed) as u64;
    dst[0] = (value * MAX_INTENSITY / total) as u32;
}
