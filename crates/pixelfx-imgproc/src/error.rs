use pixelfx_image::ImageError;

use crate::parallel::ParallelError;

/// Errors raised while configuring or applying a filter.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// The pixel buffer is not a valid image.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// The execution strategy could not run.
    #[error(transparent)]
    Parallel(#[from] ParallelError),

    /// The kernel weights do not form a square matrix.
    #[error("kernel length {0} is not a perfect square")]
    InvalidKernelLength(usize),

    /// A serialized statistical filter names an unknown statistic.
    #[error("unknown statistic `{0}`")]
    UnknownStatistic(String),
}
