mod filter;
mod matrix;

pub use filter::{ColorMatrixFilter, ColorMatrixParams};
pub use matrix::{Channel, ColorMatrix, LUMA};
