mod filter;
pub use filter::*;

mod ops;
pub use ops::*;
