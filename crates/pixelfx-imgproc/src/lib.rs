#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// color matrix algebra and the color matrix filter.
pub mod color;

/// error types shared by the filters.
pub mod error;

/// convolution kernels, convolution engine and the convolution filter.
pub mod filter;

/// module containing parallization utilities.
pub mod parallel;

/// order-statistic (median, minimum, maximum) filters.
pub mod statistical;

pub use error::FilterError;
