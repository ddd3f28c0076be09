use std::str::FromStr;

use histeq_device::ExecutionStrategy;
use serde::{Deserialize, Serialize};

use crate::{bins::NUM_INTENSITIES, error::EqualizeError};

/// How the histogram stage aggregates counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistogramStrategy {
    /// Every work item increments the global histogram directly.
    Naive,
    /// Every work group counts into local memory and adds its counts once.
    #[default]
    Partitioned,
}

/// Which prefix scan turns the histogram into a cumulative histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStrategy {
    /// Hillis–Steele: bin `i` holds the counts of bins `0..=i`.
    #[default]
    Inclusive,
    /// Blelloch: bin `i` holds the counts of bins `0..i`.
    ///
    /// Outputs differ from the inclusive scan: every bin is mapped with the
    /// total of the bins below it, and the normalization divisor excludes the
    /// top bin.
    Exclusive,
}

/// Which buffer the remap stage reads the samples to remap from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemapSource {
    /// Remap every sample of the input image, channel by channel.
    #[default]
    Original,
    /// Remap the luma image, giving a grey output replicated across channels.
    Luma,
}

macro_rules! impl_from_str {
    ($ty:ty, $($name:literal => $variant:expr),+) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($name => Ok($variant),)+
                    other => Err(format!(
                        "unknown value `{}`, expected one of: {}",
                        other,
                        [$($name),+].join(", ")
                    )),
                }
            }
        }
    };
}

impl_from_str!(HistogramStrategy, "naive" => HistogramStrategy::Naive, "partitioned" => HistogramStrategy::Partitioned);
impl_from_str!(ScanStrategy, "inclusive" => ScanStrategy::Inclusive, "exclusive" => ScanStrategy::Exclusive);
impl_from_str!(RemapSource, "original" => RemapSource::Original, "luma" => RemapSource::Luma);

/// Configuration of an equalization pass.
///
/// # Example
///
/// ```
/// use histeq::{EqualizeConfig, HistogramStrategy, ScanStrategy};
///
/// let config = EqualizeConfig::default()
///     .with_bins(64)
///     .with_histogram(HistogramStrategy::Naive)
///     .with_scan(ScanStrategy::Exclusive);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EqualizeConfig {
    /// Number of uniform bins, a divisor of 256.
    pub bins: usize,
    /// Histogram aggregation strategy.
    pub histogram: HistogramStrategy,
    /// Prefix scan strategy.
    pub scan: ScanStrategy,
    /// Work group size for group kernels, the device maximum when absent.
    pub work_group_size: Option<usize>,
    /// Source of the samples fed to the remap stage.
    pub remap: RemapSource,
    /// How work items are executed.
    pub execution: ExecutionStrategy,
    /// Log the duration of every kernel launch.
    pub profile: bool,
}

impl Default for EqualizeConfig {
    fn default() -> Self {
        Self {
            bins: NUM_INTENSITIES as usize,
            histogram: HistogramStrategy::default(),
            scan: ScanStrategy::default(),
            work_group_size: None,
            remap: RemapSource::default(),
            execution: ExecutionStrategy::default(),
            profile: false,
        }
    }
}

impl EqualizeConfig {
    /// Set the number of bins.
    pub fn with_bins(mut self, bins: usize) -> Self {
        self.bins = bins;
        self
    }

    /// Set the histogram strategy.
    pub fn with_histogram(mut self, histogram: HistogramStrategy) -> Self {
        self.histogram = histogram;
        self
    }

    /// Set the scan strategy.
    pub fn with_scan(mut self, scan: ScanStrategy) -> Self {
        self.scan = scan;
        self
    }

    /// Set the work group size of the group kernels.
    pub fn with_work_group_size(mut self, work_group_size: usize) -> Self {
        self.work_group_size = Some(work_group_size);
        self
    }

    /// Set the source of the remap stage.
    pub fn with_remap(mut self, remap: RemapSource) -> Self {
        self.remap = remap;
        self
    }

    /// Set the execution strategy.
    pub fn with_execution(mut self, execution: ExecutionStrategy) -> Self {
        self.execution = execution;
        self
    }

    /// Enable per-launch profiling logs.
    pub fn with_profile(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }

    /// Check the device independent parts of the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EqualizeError::InvalidBinCount`] or
    /// [`EqualizeError::InvalidWorkGroupSize`].
    pub fn validate(&self) -> Result<(), EqualizeError> {
        let max_bins = NUM_INTENSITIES as usize;
        if self.bins == 0 || self.bins > max_bins || max_bins % self.bins != 0 {
            return Err(EqualizeError::InvalidBinCount(self.bins));
        }

        if self.work_group_size == Some(0) {
            return Err(EqualizeError::InvalidWorkGroupSize(0));
        }

        Ok(())
    }
}
