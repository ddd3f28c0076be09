use std::sync::atomic::{AtomicU32, Ordering};

use histeq_device::{DeviceError, WorkGroup, WorkItem};

/// Find the bin whose half-open range `[lo_i, lo_{i+1})` contains `value`.
///
/// The boundary table is scanned in increasing order and the first match
/// wins. Returns `None` if the table does not cover `value`.
///
/// # Example
///
/// ```
/// use histeq_kernels::histogram::bin_of;
///
/// let boundaries = [0, 64, 128, 192, 256];
/// assert_eq!(bin_of(0, &boundaries), Some(0));
/// assert_eq!(bin_of(127, &boundaries), Some(1));
/// assert_eq!(bin_of(255, &boundaries), Some(3));
/// ```
#[inline]
pub fn bin_of(value: u8, boundaries: &[u32]) -> Option<usize> {
    let v = value as u32;
    boundaries
        .windows(2)
        .position(|range| range[0] <= v && v < range[1])
}

/// Naive histogram: every work item increments the global bin of its pixel.
///
/// One work item per pixel. `src` holds `channels` samples per pixel and the
/// first sample of each pixel is counted. `hist` must be zeroed beforehand.
/// Work items past the end of `src` do nothing.
pub fn histogram_naive(
    item: WorkItem,
    src: &[u8],
    channels: usize,
    boundaries: &[u32],
    hist: &[AtomicU32],
) {
    let idx = item.global_id() * channels;
    if idx >= src.len() {
        return;
    }

    if let Some(bin) = bin_of(src[idx], boundaries) {
        hist[bin].fetch_add(1, Ordering::Relaxed);
    }
}

/// Partitioned histogram: each work group counts into its own local
/// histogram and then adds it once into the global one.
///
/// 1. the group zeroes its local histogram, then waits on a barrier;
/// 2. every work item increments the local bin of its pixel, then barrier;
/// 3. every bin of the local histogram is added atomically into `hist`.
///
/// Contention on a global bin is bounded by the number of groups rather than
/// the number of pixels. `hist` must be zeroed beforehand since every group
/// adds into it.
///
/// # Errors
///
/// Returns [`DeviceError::OutOfLocalMemory`] if the bins do not fit in local
/// memory.
pub fn histogram_local(
    group: &WorkGroup,
    src: &[u8],
    channels: usize,
    boundaries: &[u32],
    hist: &[AtomicU32],
) -> Result<(), DeviceError> {
    let bins = boundaries.len().saturating_sub(1);
    let local = group.local_buffer(bins)?;

    group.for_each_item(|item| {
        for bin in (item.local_id()..bins).step_by(item.local_size()) {
            local[bin].store(0, Ordering::Relaxed);
        }
    });
    group.barrier();

    group.for_each_item(|item| {
        let idx = item.global_id() * channels;
        if idx >= src.len() {
            return;
        }
        if let Some(bin) = bin_of(src[idx], boundaries) {
            local[bin].fetch_add(1, Ordering::Relaxed);
        }
    });
    group.barrier();

    group.for_each_item(|item| {
        for bin in (item.local_id()..bins).step_by(item.local_size()) {
            let count = local[bin].load(Ordering::Relaxed);
            if count != 0 {
                hist[bin].fetch_add(count, Ordering::Relaxed);
            }
        }
    });

    Ok(())
}
