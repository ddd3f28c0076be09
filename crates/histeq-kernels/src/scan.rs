//! Prefix scans of a histogram.
//!
//! Two algorithms with different results:
//!
//! * Hillis–Steele produces the inclusive scan, `out[i] = Σ_{j≤i} in[j]`,
//!   in `⌈log2 n⌉` rounds of `n` additions each.
//! * Blelloch produces the exclusive scan, `out[i] = Σ_{j<i} in[j]`, with an
//!   up-sweep and a down-sweep of `O(n)` additions in total. The length must
//!   be a power of two; pad with zero bins otherwise.
//!
//! Each algorithm comes in two shapes. The group kernels scan the whole array
//! in one launch inside a single work group of `n` work items, using local
//! memory and group barriers. The step kernels perform one round across the
//! whole array and are launched once per round, for arrays larger than a work
//! group; the end of each launch is the barrier between rounds.

use std::sync::atomic::{AtomicU32, Ordering};

use histeq_device::{DeviceError, WorkGroup, WorkItem};

/// Inclusive Hillis–Steele scan of `input` into `output` by one work group.
///
/// Launch with one work group of exactly `input.len()` work items. The rounds
/// ping-pong between two local buffers; a generation index selects which of
/// the two holds the current round.
///
/// # Errors
///
/// Returns [`DeviceError::OutOfLocalMemory`] if two copies of the array do not
/// fit in local memory.
pub fn scan_add_hillis_steele(
    group: &WorkGroup,
    input: &[AtomicU32],
    output: &[AtomicU32],
) -> Result<(), DeviceError> {
    let n = group.local_size();
    let scratch = [group.local_buffer(n)?, group.local_buffer(n)?];

    group.for_each_item(|item| {
        let lid = item.local_id();
        scratch[0][lid].store(input[lid].load(Ordering::Relaxed), Ordering::Relaxed);
    });
    group.barrier();

    let mut current = 0;
    let mut stride = 1;
    while stride < n {
        let (src, dst) = (&scratch[current], &scratch[current ^ 1]);
        group.for_each_item(|item| {
            let lid = item.local_id();
            let mut value = src[lid].load(Ordering::Relaxed);
            if lid >= stride {
                value += src[lid - stride].load(Ordering::Relaxed);
            }
            dst[lid].store(value, Ordering::Relaxed);
        });
        group.barrier();

        current ^= 1;
        stride *= 2;
    }

    let result = &scratch[current];
    group.for_each_item(|item| {
        let lid = item.local_id();
        output[lid].store(result[lid].load(Ordering::Relaxed), Ordering::Relaxed);
    });

    Ok(())
}

/// One round of the inclusive Hillis–Steele scan across the whole array.
///
/// One work item per element: `dst[i] = src[i] + src[i - stride]` for
/// `i >= stride`, `dst[i] = src[i]` otherwise.
pub fn scan_add_hillis_steele_step(
    item: WorkItem,
    stride: usize,
    src: &[AtomicU32],
    dst: &[AtomicU32],
) {
    let i = item.global_id();
    if i >= src.len() {
        return;
    }

    let mut value = src[i].load(Ordering::Relaxed);
    if i >= stride {
        value += src[i - stride].load(Ordering::Relaxed);
    }
    dst[i].store(value, Ordering::Relaxed);
}

/// Exclusive Blelloch scan of `data` in place by one work group.
///
/// Launch with one work group of exactly `data.len()` work items; the length
/// must be a power of two.
///
/// # Errors
///
/// Returns [`DeviceError::OutOfLocalMemory`] if the array does not fit in
/// local memory.
pub fn scan_add_blelloch(group: &WorkGroup, data: &[AtomicU32]) -> Result<(), DeviceError> {
    let n = group.local_size();
    let a = group.local_buffer(n)?;

    group.for_each_item(|item| {
        let lid = item.local_id();
        a[lid].store(data[lid].load(Ordering::Relaxed), Ordering::Relaxed);
    });
    group.barrier();

    // up-sweep
    let mut stride = 1;
    while stride < n {
        group.for_each_item(|item| {
            let i = item.local_id();
            if (i + 1) % (2 * stride) == 0 {
                let left = a[i - stride].load(Ordering::Relaxed);
                a[i].fetch_add(left, Ordering::Relaxed);
            }
        });
        group.barrier();
        stride *= 2;
    }

    group.for_each_item(|item| {
        if item.local_id() == n - 1 {
            a[n - 1].store(0, Ordering::Relaxed);
        }
    });
    group.barrier();

    // down-sweep
    let mut stride = n / 2;
    while stride > 0 {
        group.for_each_item(|item| {
            let i = item.local_id();
            if (i + 1) % (2 * stride) == 0 {
                let t = a[i].load(Ordering::Relaxed);
                let left = a[i - stride].load(Ordering::Relaxed);
                a[i].store(t + left, Ordering::Relaxed);
                a[i - stride].store(t, Ordering::Relaxed);
            }
        });
        group.barrier();
        stride /= 2;
    }

    group.for_each_item(|item| {
        let lid = item.local_id();
        data[lid].store(a[lid].load(Ordering::Relaxed), Ordering::Relaxed);
    });

    Ok(())
}

/// One up-sweep round of the Blelloch scan across the whole array.
pub fn scan_add_blelloch_up_step(item: WorkItem, stride: usize, data: &[AtomicU32]) {
    let i = item.global_id();
    if i < data.len() && (i + 1) % (2 * stride) == 0 {
        let left = data[i - stride].load(Ordering::Relaxed);
        data[i].fetch_add(left, Ordering::Relaxed);
    }
}

/// Clear the last element between the up-sweep and the down-sweep; this is
/// what makes the Blelloch scan exclusive.
pub fn scan_blelloch_clear_last(item: WorkItem, data: &[AtomicU32]) {
    if item.global_id() + 1 == data.len() {
        data[item.global_id()].store(0, Ordering::Relaxed);
    }
}

/// One down-sweep round of the Blelloch scan across the whole array.
pub fn scan_add_blelloch_down_step(item: WorkItem, stride: usize, data: &[AtomicU32]) {
    let i = item.global_id();
    if i < data.len() && (i + 1) % (2 * stride) == 0 {
        let t = data[i].load(Ordering::Relaxed);
        let left = data[i - stride].load(Ordering::Relaxed);
        data[i].store(t + left, Ordering::Relaxed);
        data[i - stride].store(t, Ordering::Relaxed);
    }
}
