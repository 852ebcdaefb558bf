//! Convolution filters
//!
//! Kernel builders, the dense, separable and summed-area-table convolution
//! paths, and the [`ConvolutionFilter`] that picks between them.

/// Filter kernels
pub mod kernels;

/// Dense convolution paths
mod convolution;
pub use convolution::*;

/// Summed-area-table convolution
mod integral;
pub use integral::*;

/// Convolution filter and its named effects
mod ops;
pub use ops::*;

/// Separable filter operations
mod separable_filter;
pub use separable_filter::*;
