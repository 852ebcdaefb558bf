use pixelfx_image::{Image, ImageSize, Rgba8Image};
use serde::{Deserialize, Serialize};

use super::ops::{rank_filter, window_indices, Statistic};
use crate::{
    filter::kernels::{odd_kernel_area, odd_kernel_size},
    parallel::ExecutionStrategy,
    FilterError,
};

/// Serialized state of a [`StatisticalFilter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticalParams {
    /// Name of the statistic, `None` for a no-op filter.
    pub filter_name: Option<String>,
    /// Window side length, 0 for a no-op filter.
    pub dim: usize,
    /// Flat `(dx, dy)` window offsets.
    pub indices: Vec<i32>,
}

/// Median, minimum (erode) and maximum (dilate) filters over RGBA images.
///
/// The window is a `dim x dim` square; even sizes are rounded up. Neighbors
/// outside the image are left out of the window.
///
/// # Example
///
/// ```
/// use pixelfx_image::Image;
/// use pixelfx_imgproc::statistical::StatisticalFilter;
///
/// let image = Image::<u8, 4>::new(
///     [3, 1].into(),
///     vec![0, 0, 0, 255, 128, 128, 128, 255, 255, 255, 255, 255],
/// )
/// .unwrap();
///
/// let eroded = StatisticalFilter::new().erode(3).apply(image).unwrap();
/// assert_eq!(eroded.pixel(1, 0), Some([0, 0, 0, 255]));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticalFilter {
    statistic: Option<Statistic>,
    dim: usize,
    indices: Vec<i32>,
    enabled: bool,
    strategy: ExecutionStrategy,
}

impl Default for StatisticalFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatisticalFilter {
    /// Create a no-op filter.
    pub fn new() -> Self {
        Self {
            statistic: None,
            dim: 0,
            indices: Vec::new(),
            enabled: true,
            strategy: ExecutionStrategy::default(),
        }
    }

    /// Set the execution strategy used by [`StatisticalFilter::apply`].
    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Change the execution strategy in place.
    pub fn set_strategy(&mut self, strategy: ExecutionStrategy) -> &mut Self {
        self.strategy = strategy;
        self
    }

    /// Turn the filter on or off without touching its configuration.
    pub fn set_enabled(&mut self, enabled: bool) -> &mut Self {
        self.enabled = enabled;
        self
    }

    /// Whether the filter is switched on.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The configured statistic.
    pub fn statistic(&self) -> Option<Statistic> {
        self.statistic
    }

    /// The window side length, 0 when unset.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The precomputed window offsets.
    pub fn indices(&self) -> &[i32] {
        &self.indices
    }

    /// True when the filter is enabled and configured.
    pub fn can_run(&self) -> bool {
        self.enabled && self.dim > 0 && self.statistic.is_some()
    }

    /// Use `statistic` over a `d x d` window.
    pub fn set(&mut self, d: usize, statistic: Statistic) -> &mut Self {
        let dim = odd_kernel_size(d);
        log::debug!("statistical filter: {statistic} {dim}x{dim}");
        self.statistic = Some(statistic);
        self.dim = dim;
        self.indices = window_indices(dim);
        self
    }

    /// Median of the window, removes impulse noise.
    pub fn median(&mut self, d: usize) -> &mut Self {
        self.set(d, Statistic::Median)
    }

    /// Minimum of the window.
    pub fn minimum(&mut self, d: usize) -> &mut Self {
        self.set(d, Statistic::Minimum)
    }

    /// Alias of [`StatisticalFilter::minimum`].
    pub fn erode(&mut self, d: usize) -> &mut Self {
        self.minimum(d)
    }

    /// Maximum of the window.
    pub fn maximum(&mut self, d: usize) -> &mut Self {
        self.set(d, Statistic::Maximum)
    }

    /// Alias of [`StatisticalFilter::maximum`].
    pub fn dilate(&mut self, d: usize) -> &mut Self {
        self.maximum(d)
    }

    /// Clear the filter back to a no-op.
    pub fn reset(&mut self) -> &mut Self {
        self.statistic = None;
        self.dim = 0;
        self.indices.clear();
        self
    }

    /// Filter `src` and return the result.
    ///
    /// A disabled or unconfigured filter hands `src` back untouched.
    pub fn apply(&self, src: Rgba8Image) -> Result<Rgba8Image, FilterError> {
        let Some(statistic) = self.statistic.filter(|_| self.can_run()) else {
            return Ok(src);
        };
        log::trace!(
            "{statistic} filter on {} with {:?}",
            src.size(),
            self.strategy
        );

        let mut dst = Image::from_size_val(src.size(), 0u8)?;
        rank_filter(&src, &mut dst, &self.indices, statistic, self.strategy)?;
        Ok(dst)
    }

    /// Filter a raw RGBA buffer of the given size into a new buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if `data.len() != width * height * 4`.
    pub fn apply_raw(&self, data: &[u8], width: usize, height: usize) -> Result<Vec<u8>, FilterError> {
        let image = Image::new(ImageSize { width, height }, data.to_vec())?;
        Ok(self.apply(image)?.into_vec())
    }

    /// Externalize the filter configuration.
    pub fn serialize(&self) -> StatisticalParams {
        StatisticalParams {
            filter_name: self.statistic.map(|s| s.name().to_string()),
            dim: self.dim,
            indices: self.indices.clone(),
        }
    }

    /// Restore a configuration produced by [`StatisticalFilter::serialize`].
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::UnknownStatistic`] for an unknown name and
    /// [`FilterError::InvalidKernelLength`] if `dim` is even or `indices`
    /// does not hold `dim * dim` offset pairs. The filter is left unchanged
    /// on error.
    pub fn restore(&mut self, params: StatisticalParams) -> Result<&mut Self, FilterError> {
        let Some(name) = params.filter_name else {
            return Ok(self.reset());
        };
        let statistic =
            Statistic::from_name(&name).ok_or(FilterError::UnknownStatistic(name))?;
        let expected =
            odd_kernel_area(params.dim, params.dim).and_then(|area| area.checked_mul(2));
        if expected != Some(params.indices.len()) {
            return Err(FilterError::InvalidKernelLength(params.indices.len()));
        }
        self.statistic = Some(statistic);
        self.dim = params.dim;
        self.indices = params.indices;
        Ok(self)
    }
}
