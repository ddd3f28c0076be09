#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Example
//!
//! ```
//! use histeq::{EqualizeConfig, HistogramEqualizer};
//! use histeq::device::Device;
//! use histeq::image::{Image, ImageSize};
//!
//! let mut data = vec![10u8; 32];
//! data.extend(vec![200u8; 32]);
//! let image = Image::<u8, 1>::new(ImageSize { width: 8, height: 8 }, data).unwrap();
//!
//! let equalizer = HistogramEqualizer::new(Device::cpu(), EqualizeConfig::default()).unwrap();
//! let result = equalizer.equalize(&image).unwrap();
//!
//! assert_eq!(result.lut[10], 127);
//! assert_eq!(result.lut[200], 255);
//! ```

/// bin boundary tables.
pub mod bins;

/// pipeline configuration.
pub mod config;

/// Error types for the pipeline.
pub mod error;

/// the equalization orchestrator.
pub mod pipeline;

/// per-stage kernel dispatch.
pub mod stages;

pub use crate::bins::BinTable;
pub use crate::config::{EqualizeConfig, HistogramStrategy, RemapSource, ScanStrategy};
pub use crate::error::EqualizeError;
pub use crate::pipeline::{equalize_histogram, Equalization, HistogramEqualizer, Stage, StageTiming};

#[doc(inline)]
pub use histeq_device as device;

#[doc(inline)]
pub use histeq_image as image;

#[doc(inline)]
pub use histeq_kernels as kernels;
