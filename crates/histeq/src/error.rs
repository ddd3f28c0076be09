use histeq_device::DeviceError;
use histeq_image::ImageError;
use thiserror::Error;

/// An error type for the equalization pipeline.
#[derive(Error, Debug, PartialEq)]
pub enum EqualizeError {
    /// The bin count is out of range or does not divide 256.
    #[error("invalid bin count {0}: expected a divisor of 256 in 1..=256")]
    InvalidBinCount(usize),

    /// The bin boundary table is malformed.
    #[error("invalid bin boundaries: {0}")]
    InvalidBinBoundaries(String),

    /// The configured work group size is zero or above the device limit.
    #[error("invalid work group size {0}")]
    InvalidWorkGroupSize(usize),

    /// Only single channel and three channel images are supported.
    #[error("unsupported number of channels {0}: expected 1 or 3")]
    UnsupportedChannels(usize),

    /// The image has no pixels.
    #[error("cannot equalize an empty image")]
    EmptyImage,

    /// The last bin of the cumulative histogram is zero, so it cannot be
    /// normalized.
    #[error("cumulative histogram total is zero")]
    ZeroCumulativeTotal,

    /// Device error
    #[error(transparent)]
    DeviceError(#[from] DeviceError),

    /// Image error
    #[error(transparent)]
    ImageError(#[from] ImageError),
}
