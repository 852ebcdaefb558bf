#![deny(missing_docs)]
//! Pixel buffer types consumed and produced by the pixelfx filters.

/// image representation for pixel processing purposes.
pub mod image;

/// Error types for the image module.
pub mod error;

pub use crate::error::ImageError;
pub use crate::image::{Image, ImageSize, Rgba8Image};
