use std::fmt;
use std::time::Duration;

use histeq_device::{AtomicBuffer, Buffer, CommandQueue, Device, Event};
use histeq_image::{Image, ImageError};
use serde::Serialize;

use crate::bins::BinTable;
use crate::config::{EqualizeConfig, RemapSource, ScanStrategy};
use crate::error::EqualizeError;
use crate::stages;

/// A stage of the equalization pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Colour to luma conversion, or a copy for grey input.
    ChannelReduction,
    /// Per-bin pixel counts.
    Histogram,
    /// Prefix scan of the counts.
    Scan,
    /// Rescale of the cumulative histogram into a lookup table.
    Normalization,
    /// Lookup of every sample in the table.
    Remap,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ChannelReduction => "channel reduction",
            Stage::Histogram => "histogram",
            Stage::Scan => "scan",
            Stage::Normalization => "normalization",
            Stage::Remap => "remap",
        };
        f.write_str(name)
    }
}

/// Launch count and accumulated kernel time of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageTiming {
    /// The stage.
    pub stage: Stage,
    /// Number of queue commands the stage issued.
    pub launches: usize,
    /// Sum of the durations of those commands.
    pub duration: Duration,
}

impl StageTiming {
    fn from_events(stage: Stage, events: &[Event]) -> Self {
        Self {
            stage,
            launches: events.len(),
            duration: events.iter().map(Event::duration).sum(),
        }
    }
}

/// The output of an equalization pass with its intermediate tables.
#[derive(Debug, Clone)]
pub struct Equalization<const C: usize> {
    /// The equalized image, with the size and layout of the input.
    pub image: Image<u8, C>,
    /// Pixel count per bin.
    pub histogram: Vec<u32>,
    /// The scanned histogram, inclusive or exclusive per the configuration.
    pub cumulative: Vec<u32>,
    /// Output intensity per bin.
    pub lut: Vec<u32>,
    /// One entry per stage, in execution order.
    pub timings: Vec<StageTiming>,
}

impl<const C: usize> Equalization<C> {
    /// Total kernel time over all stages.
    pub fn total_duration(&self) -> Duration {
        self.timings.iter().map(|t| t.duration).sum()
    }
}

/// Runs the five stages of histogram equalization on a device.
///
/// The equalizer owns the command queue, so the thread pool of a fixed
/// execution strategy is built once and reused across images.
pub struct HistogramEqualizer {
    queue: CommandQueue,
    config: EqualizeConfig,
    bin_table: BinTable,
}

impl HistogramEqualizer {
    /// Create an equalizer with `config.bins` uniform bins.
    ///
    /// # Arguments
    ///
    /// * `device` - The device to run the kernels on.
    /// * `config` - The pipeline configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, if the work group
    /// size exceeds the device limit or if the thread pool cannot be built.
    pub fn new(device: Device, config: EqualizeConfig) -> Result<Self, EqualizeError> {
        config.validate()?;
        let bin_table = BinTable::uniform(config.bins)?;
        Self::with_bin_table(device, config, bin_table)
    }

    /// Create an equalizer with an explicit bin table.
    ///
    /// `config.bins` is replaced by the number of bins of the table.
    ///
    /// # Errors
    ///
    /// Returns an error if the work group size is zero or exceeds the device
    /// limit, or if the thread pool cannot be built.
    pub fn with_bin_table(
        device: Device,
        mut config: EqualizeConfig,
        bin_table: BinTable,
    ) -> Result<Self, EqualizeError> {
        config.bins = bin_table.num_bins();

        if let Some(local) = config.work_group_size {
            if local == 0 || local > device.info().max_work_group_size {
                return Err(EqualizeError::InvalidWorkGroupSize(local));
            }
        }

        let queue = CommandQueue::with_strategy(device, config.execution)?
            .with_profiling(config.profile);

        log::debug!("running on {}", queue.device());

        Ok(Self {
            queue,
            config,
            bin_table,
        })
    }

    /// The pipeline configuration.
    pub fn config(&self) -> &EqualizeConfig {
        &self.config
    }

    /// The bin table the histogram is built over.
    pub fn bin_table(&self) -> &BinTable {
        &self.bin_table
    }

    /// The device the kernels run on.
    pub fn device(&self) -> &Device {
        self.queue.device()
    }

    /// Equalize an 8-bit image with one or three channels.
    ///
    /// # Arguments
    ///
    /// * `src` - The input image, interleaved RGB when it has three channels.
    ///
    /// # Returns
    ///
    /// The equalized image of the same size and channel count, together with
    /// the histogram, the cumulative histogram and the lookup table.
    ///
    /// # Errors
    ///
    /// * [`EqualizeError::UnsupportedChannels`] unless `C` is 1 or 3.
    /// * [`EqualizeError::EmptyImage`] if the image has no pixels.
    /// * [`EqualizeError::ZeroCumulativeTotal`] if the last cumulative bin is
    ///   zero, which happens with the exclusive scan when every pixel falls in
    ///   the top bin.
    /// * [`EqualizeError::DeviceError`] if a buffer cannot be allocated or a
    ///   launch is rejected.
    ///
    /// No partial output is returned on error.
    pub fn equalize<const C: usize>(
        &self,
        src: &Image<u8, C>,
    ) -> Result<Equalization<C>, EqualizeError> {
        if C != 1 && C != 3 {
            return Err(EqualizeError::UnsupportedChannels(C));
        }

        if src.numel() == 0 {
            return Err(EqualizeError::EmptyImage);
        }

        let bins = self.bin_table.num_bins();
        // the exclusive scan needs a power of two length, padded with empty bins
        let scan_len = match self.config.scan {
            ScanStrategy::Inclusive => bins,
            ScanStrategy::Exclusive => bins.next_power_of_two(),
        };

        log::info!(
            "equalizing {} image with {} channel(s): {} bins, {:?} histogram, {:?} scan",
            src.size(),
            C,
            bins,
            self.config.histogram,
            self.config.scan,
        );

        let input = Buffer::from_slice(src.as_slice())?;
        let mut luma = Buffer::filled(input.len(), 0u8)?;
        let boundaries = Buffer::from_slice(self.bin_table.boundaries())?;
        let hist = AtomicBuffer::zeroed(scan_len)?;
        let mut lut = Buffer::filled(bins, 0u32)?;
        let mut output = Buffer::filled(input.len(), 0u8)?;

        let mut timings = Vec::with_capacity(5);

        let event = stages::reduce_channels(&self.queue, &input, C, &mut luma)?;
        timings.push(StageTiming::from_events(Stage::ChannelReduction, &[event]));

        let events = stages::build_histogram(
            &self.queue,
            self.config.histogram,
            &luma,
            C,
            &boundaries,
            &hist,
            self.config.work_group_size,
        )?;
        timings.push(StageTiming::from_events(Stage::Histogram, &events));

        let (cumulative, events) = stages::scan_histogram(
            &self.queue,
            self.config.scan,
            &hist,
            self.config.work_group_size,
        )?;
        timings.push(StageTiming::from_events(Stage::Scan, &events));

        let total = cumulative.get(bins - 1).unwrap_or(0);
        if total == 0 {
            return Err(EqualizeError::ZeroCumulativeTotal);
        }

        let event = stages::normalise_histogram(&self.queue, &cumulative, bins, &mut lut)?;
        timings.push(StageTiming::from_events(Stage::Normalization, &[event]));

        let remap_src = match self.config.remap {
            RemapSource::Original => &input,
            RemapSource::Luma => &luma,
        };
        let event = stages::remap(&self.queue, remap_src, &boundaries, &lut, &mut output)?;
        timings.push(StageTiming::from_events(Stage::Remap, &[event]));

        for timing in &timings {
            log::debug!(
                "{}: {} launch(es) in {:?}",
                timing.stage,
                timing.launches,
                timing.duration
            );
        }

        let mut histogram = hist.to_vec();
        histogram.truncate(bins);
        let mut cumulative = cumulative.to_vec();
        cumulative.truncate(bins);

        Ok(Equalization {
            image: Image::new(src.size(), output.into_vec())?,
            histogram,
            cumulative,
            lut: lut.into_vec(),
            timings,
        })
    }
}

/// Equalize the histogram of an 8-bit image on the host CPU.
///
/// # Arguments
///
/// * `src` - The input image with one or three channels.
/// * `dst` - The output image, of the same size as `src`.
/// * `config` - The pipeline configuration.
///
/// # Errors
///
/// Returns [`ImageError::InvalidImageSize`] if the images differ in size, or
/// any error of [`HistogramEqualizer::equalize`]. `dst` is left untouched on
/// error.
///
/// # Example
///
/// ```
/// use histeq::{equalize_histogram, EqualizeConfig};
/// use histeq::image::{Image, ImageSize};
///
/// let size = ImageSize { width: 4, height: 1 };
/// let src = Image::<u8, 1>::new(size, vec![100, 100, 101, 101]).unwrap();
/// let mut dst = Image::<u8, 1>::from_size_val(size, 0).unwrap();
///
/// equalize_histogram(&src, &mut dst, &EqualizeConfig::default()).unwrap();
/// assert_eq!(dst.as_slice(), &[127, 127, 255, 255]);
/// ```
pub fn equalize_histogram<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    config: &EqualizeConfig,
) -> Result<(), EqualizeError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        )
        .into());
    }

    let equalizer = HistogramEqualizer::new(Device::cpu(), config.clone())?;
    let result = equalizer.equalize(src)?;
    dst.as_slice_mut().copy_from_slice(result.image.as_slice());

    Ok(())
}
