#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use pixelfx_image as image;

#[doc(inline)]
pub use pixelfx_imgproc as imgproc;
