//! Dispatch of the five pipeline stages.
//!
//! Each function binds the buffers of one stage to its kernel and launches it
//! on the queue. A stage returns only once all of its launches completed, so
//! calling the stages in order is enough to order every buffer hand-off.

use std::mem::size_of;

use histeq_device::{AtomicBuffer, Buffer, CommandQueue, DeviceError, Event, NdRange};
use histeq_kernels::{color, histogram, lookup, normalize, scan};

use crate::config::{HistogramStrategy, ScanStrategy};

/// Reduce an interleaved image to luma.
///
/// A three channel image goes through `rgb2grey`, which writes the luma of
/// every pixel into all three of its samples; anything else is copied by
/// `identity`. `dst` has the same length as `src`.
pub fn reduce_channels(
    queue: &CommandQueue,
    src: &Buffer<u8>,
    channels: usize,
    dst: &mut Buffer<u8>,
) -> Result<Event, DeviceError> {
    let src = src.as_slice();
    if channels == 3 {
        queue.enqueue_chunks("rgb2grey", NdRange::new(src.len() / 3), dst, 3, |item, out| {
            color::rgb2grey(item, src, out)
        })
    } else {
        queue.enqueue_chunks("identity", NdRange::new(src.len()), dst, 1, |item, out| {
            color::identity(item, src, out)
        })
    }
}

/// Count the pixels of `luma` per bin into `hist`.
///
/// `hist` is zeroed first and may be longer than the number of bins; the
/// extra entries stay zero. The partitioned strategy runs with
/// `work_group_size` work items per group (the device maximum when absent)
/// and falls back to the naive strategy when the bins do not fit in local
/// memory.
pub fn build_histogram(
    queue: &CommandQueue,
    strategy: HistogramStrategy,
    luma: &Buffer<u8>,
    channels: usize,
    boundaries: &Buffer<u32>,
    hist: &AtomicBuffer,
    work_group_size: Option<usize>,
) -> Result<Vec<Event>, DeviceError> {
    let info = queue.device().info();
    let bins = boundaries.len().saturating_sub(1);
    let pixels = luma.len() / channels;

    let strategy = match strategy {
        HistogramStrategy::Partitioned if bins * size_of::<u32>() > info.local_mem_size => {
            log::warn!(
                "{} bins do not fit in {} B of local memory, using the naive histogram",
                bins,
                info.local_mem_size
            );
            HistogramStrategy::Naive
        }
        strategy => strategy,
    };

    let (src, bounds, counts) = (luma.as_slice(), boundaries.as_slice(), hist.as_slice());
    let mut events = vec![queue.enqueue_fill(hist, 0)];

    let event = match strategy {
        HistogramStrategy::Naive => {
            queue.enqueue_items("histogram_naive", NdRange::new(pixels), |item| {
                histogram::histogram_naive(item, src, channels, bounds, counts)
            })?
        }
        HistogramStrategy::Partitioned => {
            let local = work_group_size.unwrap_or(info.max_work_group_size);
            queue.enqueue_groups("histogram_local", NdRange::padded(pixels, local), |group| {
                histogram::histogram_local(group, src, channels, bounds, counts)
            })?
        }
    };
    events.push(event);

    Ok(events)
}

/// Turn the histogram into a cumulative histogram of the same length.
///
/// The scan runs in a single work group when the whole array fits in one
/// (at most `work_group_size` items and enough local memory), and as one
/// launch per round otherwise. The exclusive scan requires a power of two
/// length.
pub fn scan_histogram(
    queue: &CommandQueue,
    strategy: ScanStrategy,
    hist: &AtomicBuffer,
    work_group_size: Option<usize>,
) -> Result<(AtomicBuffer, Vec<Event>), DeviceError> {
    let info = queue.device().info();
    let n = hist.len();
    let group_limit = work_group_size.unwrap_or(info.max_work_group_size);

    match strategy {
        ScanStrategy::Inclusive => {
            let fits = n <= group_limit && 2 * n * size_of::<u32>() <= info.local_mem_size;
            if fits {
                inclusive_single_group(queue, hist)
            } else {
                inclusive_rounds(queue, hist)
            }
        }
        ScanStrategy::Exclusive => {
            debug_assert!(n.is_power_of_two(), "exclusive scan length {n} is not a power of two");
            let fits = n <= group_limit && n * size_of::<u32>() <= info.local_mem_size;
            exclusive(queue, hist, fits)
        }
    }
}

fn inclusive_single_group(
    queue: &CommandQueue,
    hist: &AtomicBuffer,
) -> Result<(AtomicBuffer, Vec<Event>), DeviceError> {
    let n = hist.len();
    let cumulative = AtomicBuffer::zeroed(n)?;
    let (input, output) = (hist.as_slice(), cumulative.as_slice());

    let event = queue.enqueue_groups(
        "scan_add_hillis_steele",
        NdRange::new(n).with_local(n),
        |group| scan::scan_add_hillis_steele(group, input, output),
    )?;

    Ok((cumulative, vec![event]))
}

fn inclusive_rounds(
    queue: &CommandQueue,
    hist: &AtomicBuffer,
) -> Result<(AtomicBuffer, Vec<Event>), DeviceError> {
    let n = hist.len();
    let buffers = [AtomicBuffer::zeroed(n)?, AtomicBuffer::zeroed(n)?];
    let mut events = vec![queue.enqueue_copy(hist, &buffers[0])?];

    // the generation selects the buffer holding the latest round
    let mut generation = 0;
    let mut stride = 1;
    while stride < n {
        let (src, dst) = (buffers[generation].as_slice(), buffers[generation ^ 1].as_slice());
        events.push(queue.enqueue_items(
            "scan_add_hillis_steele_step",
            NdRange::new(n),
            |item| scan::scan_add_hillis_steele_step(item, stride, src, dst),
        )?);
        generation ^= 1;
        stride *= 2;
    }

    let [even, odd] = buffers;
    let cumulative = if generation == 0 { even } else { odd };

    Ok((cumulative, events))
}

fn exclusive(
    queue: &CommandQueue,
    hist: &AtomicBuffer,
    single_group: bool,
) -> Result<(AtomicBuffer, Vec<Event>), DeviceError> {
    let n = hist.len();
    let cumulative = AtomicBuffer::zeroed(n)?;
    let mut events = vec![queue.enqueue_copy(hist, &cumulative)?];
    let data = cumulative.as_slice();

    if single_group {
        events.push(queue.enqueue_groups(
            "scan_add_blelloch",
            NdRange::new(n).with_local(n),
            |group| scan::scan_add_blelloch(group, data),
        )?);
    } else {
        let range = NdRange::new(n);

        let mut stride = 1;
        while stride < n {
            events.push(queue.enqueue_items("scan_add_blelloch_up_step", range, |item| {
                scan::scan_add_blelloch_up_step(item, stride, data)
            })?);
            stride *= 2;
        }

        events.push(queue.enqueue_items("scan_blelloch_clear_last", range, |item| {
            scan::scan_blelloch_clear_last(item, data)
        })?);

        let mut stride = n / 2;
        while stride > 0 {
            events.push(queue.enqueue_items("scan_add_blelloch_down_step", range, |item| {
                scan::scan_add_blelloch_down_step(item, stride, data)
            })?);
            stride /= 2;
        }
    }

    Ok((cumulative, events))
}

/// Rescale the first `bins` entries of the cumulative histogram into `lut`.
///
/// The last of those entries must be non-zero.
pub fn normalise_histogram(
    queue: &CommandQueue,
    cumulative: &AtomicBuffer,
    bins: usize,
    lut: &mut Buffer<u32>,
) -> Result<Event, DeviceError> {
    let cumulative = cumulative.as_slice();
    queue.enqueue_chunks("normalise", NdRange::new(bins), lut, 1, |item, out| {
        normalize::normalise(item, cumulative, bins, out)
    })
}

/// Replace every sample of `src` by the lookup table entry of its bin.
pub fn remap(
    queue: &CommandQueue,
    src: &Buffer<u8>,
    boundaries: &Buffer<u32>,
    lut: &Buffer<u32>,
    dst: &mut Buffer<u8>,
) -> Result<Event, DeviceError> {
    let (src, bounds, table) = (src.as_slice(), boundaries.as_slice(), lut.as_slice());
    queue.enqueue_chunks("lookup", NdRange::new(src.len()), dst, 1, |item, out| {
        lookup::lookup(item, src, bounds, table, out)
    })
}

#[cfg(test)]
mod tests {
    use histeq_device::{Device, DeviceInfo};

    use super::*;
    use crate::bins::BinTable;

    fn kernels(events: &[Event]) -> Vec<&'static str> {
        events.iter().map(|e| e.kernel()).collect()
    }

    #[test]
    fn test_reduce_channels_grey_is_identity() -> Result<(), DeviceError> {
        let queue = CommandQueue::new(Device::cpu());
        let src = Buffer::from_slice(&[9u8, 8, 7])?;
        let mut dst = Buffer::filled(3, 0u8)?;
        let event = reduce_channels(&queue, &src, 1, &mut dst)?;
        assert_eq!(event.kernel(), "identity");
        assert_eq!(dst.to_vec(), vec![9, 8, 7]);
        Ok(())
    }

    #[test]
    fn test_histogram_falls_back_to_naive() -> Result<(), Box<dyn std::error::Error>> {
        let device = Device::with_info(DeviceInfo {
            name: "small".to_string(),
            compute_units: 1,
            max_work_group_size: 64,
            local_mem_size: 512,
        });
        let queue = CommandQueue::new(device);
        let table = BinTable::uniform(256)?;
        let luma = Buffer::from_slice(&[1u8, 1, 2, 255])?;
        let boundaries = Buffer::from_slice(table.boundaries())?;
        let hist = AtomicBuffer::from_slice(&[7; 256])?;

        let events = build_histogram(
            &queue,
            HistogramStrategy::Partitioned,
            &luma,
            1,
            &boundaries,
            &hist,
            None,
        )?;

        assert_eq!(kernels(&events), vec!["fill_buffer", "histogram_naive"]);
        let counts = hist.to_vec();
        assert_eq!((counts[1], counts[2], counts[255]), (2, 1, 1));
        assert_eq!(counts.iter().sum::<u32>(), 4);
        Ok(())
    }

    #[test]
    fn test_histogram_padded_buffer() -> Result<(), Box<dyn std::error::Error>> {
        let queue = CommandQueue::new(Device::cpu());
        let table = BinTable::from_boundaries(vec![0, 100, 200, 256])?;
        let luma = Buffer::from_slice(&[0u8, 150, 150, 250, 99])?;
        let boundaries = Buffer::from_slice(table.boundaries())?;
        let hist = AtomicBuffer::zeroed(4)?;

        build_histogram(
            &queue,
            HistogramStrategy::Partitioned,
            &luma,
            1,
            &boundaries,
            &hist,
            Some(2),
        )?;

        assert_eq!(hist.to_vec(), vec![2, 2, 1, 0]);
        Ok(())
    }

    #[test]
    fn test_scan_shapes() -> Result<(), DeviceError> {
        let queue = CommandQueue::new(Device::cpu());
        let counts: Vec<u32> = (1..=16).collect();
        let hist = AtomicBuffer::from_slice(&counts)?;

        let (single, events) = scan_histogram(&queue, ScanStrategy::Inclusive, &hist, None)?;
        assert_eq!(kernels(&events), vec!["scan_add_hillis_steele"]);

        let (rounds, events) = scan_histogram(&queue, ScanStrategy::Inclusive, &hist, Some(4))?;
        // one copy and log2(16) rounds
        assert_eq!(events.len(), 5);
        assert_eq!(single.to_vec(), rounds.to_vec());
        assert_eq!(rounds.get(15), Some(136));

        let (single, events) = scan_histogram(&queue, ScanStrategy::Exclusive, &hist, None)?;
        assert_eq!(kernels(&events), vec!["copy_buffer", "scan_add_blelloch"]);

        let (rounds, events) = scan_histogram(&queue, ScanStrategy::Exclusive, &hist, Some(4))?;
        // copy, 4 up-sweep rounds, clear, 4 down-sweep rounds
        assert_eq!(events.len(), 10);
        assert_eq!(single.to_vec(), rounds.to_vec());
        assert_eq!(rounds.get(0), Some(0));
        assert_eq!(rounds.get(15), Some(120));

        // the histogram itself is left untouched
        assert_eq!(hist.to_vec(), counts);
        Ok(())
    }

    #[test]
    fn test_normalise_and_remap() -> Result<(), Box<dyn std::error::Error>> {
        let queue = CommandQueue::new(Device::cpu());
        let table = BinTable::uniform(4)?;
        let boundaries = Buffer::from_slice(table.boundaries())?;
        let cumulative = AtomicBuffer::from_slice(&[1, 1, 3, 4])?;
        let mut lut = Buffer::filled(4, 0u32)?;

        normalise_histogram(&queue, &cumulative, 4, &mut lut)?;
        assert_eq!(lut.to_vec(), vec![63, 63, 191, 255]);

        let src = Buffer::from_slice(&[0u8, 130, 140, 250])?;
        let mut dst = Buffer::filled(4, 0u8)?;
        remap(&queue, &src, &boundaries, &lut, &mut dst)?;
        assert_eq!(dst.to_vec(), vec![63, 191, 191, 255]);
        Ok(())
    }
}
