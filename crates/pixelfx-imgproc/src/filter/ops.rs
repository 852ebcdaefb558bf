use pixelfx_image::{Image, ImageSize, Rgba8Image};
use serde::{Deserialize, Serialize};

use super::{
    convolution::{convolve_dense, Output},
    integral::integral_convolution,
    kernels::{self, Direction},
    separable_filter::separable_filter,
};
use crate::{parallel::ExecutionStrategy, FilterError};

/// The convolution strategy together with its kernel data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConvolutionKernel {
    /// Direct `dim x dim` convolution, with fixed-size paths for 3x3 and 5x5.
    Dense {
        /// Side length of the kernel.
        dim: usize,
        /// Row-major weights.
        weights: Vec<f32>,
        /// Output combination.
        output: Output,
    },
    /// Horizontal then vertical 1D pass.
    Separable {
        /// Kernel of the horizontal pass.
        horizontal: Vec<f32>,
        /// Kernel of the vertical pass.
        vertical: Vec<f32>,
        /// Scale of the horizontal kernel.
        coeff_x: f32,
        /// Scale of the vertical kernel.
        coeff_y: f32,
    },
    /// Summed-area-table convolution for kernels uniform except at the center.
    Integral {
        /// Kernel width.
        dim_x: usize,
        /// Kernel height.
        dim_y: usize,
        /// Row-major weights; only the first and the center weight are read.
        weights: Vec<f32>,
        /// Output combination.
        output: Output,
        /// Number of passes.
        repeats: usize,
    },
}

impl ConvolutionKernel {
    /// Short name of the strategy, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            ConvolutionKernel::Dense { .. } => "dense",
            ConvolutionKernel::Separable { .. } => "separable",
            ConvolutionKernel::Integral { .. } => "integral",
        }
    }

    /// The primary kernel weights.
    pub fn weights(&self) -> &[f32] {
        match self {
            ConvolutionKernel::Dense { weights, .. }
            | ConvolutionKernel::Integral { weights, .. } => weights,
            ConvolutionKernel::Separable { horizontal, .. } => horizontal,
        }
    }

    fn validate(&self) -> Result<(), FilterError> {
        let (len, output) = match self {
            ConvolutionKernel::Dense {
                dim,
                weights,
                output,
            } => {
                check_area(*dim, *dim, weights.len())?;
                (weights.len(), output)
            }
            ConvolutionKernel::Integral {
                dim_x,
                dim_y,
                weights,
                output,
                ..
            } => {
                check_area(*dim_x, *dim_y, weights.len())?;
                (weights.len(), output)
            }
            ConvolutionKernel::Separable {
                horizontal,
                vertical,
                ..
            } => {
                for kernel in [horizontal, vertical] {
                    if kernel.len() % 2 == 0 {
                        return Err(FilterError::InvalidKernelLength(kernel.len()));
                    }
                }
                return Ok(());
            }
        };
        match output.second() {
            Some(second) if second.len() != len => {
                Err(FilterError::InvalidKernelLength(second.len()))
            }
            _ => Ok(()),
        }
    }
}

// odd sides only, and `len` must be their product
fn check_area(dim_x: usize, dim_y: usize, len: usize) -> Result<(), FilterError> {
    match kernels::odd_kernel_area(dim_x, dim_y) {
        Some(area) if area == len => Ok(()),
        _ => Err(FilterError::InvalidKernelLength(len)),
    }
}

/// Serialized state of a [`ConvolutionFilter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvolutionParams {
    /// The configured kernel, `None` for a no-op filter.
    pub kernel: Option<ConvolutionKernel>,
}

/// Neighborhood-weighted sum filter over RGBA images.
///
/// A builder method picks the kernel and the fastest applicable strategy;
/// later builder calls replace the configuration. Neighbors outside the image
/// are clamped to the nearest edge pixel, and alpha is copied unchanged.
///
/// Even kernel sizes passed to the named effects are rounded up to the next
/// odd size; [`kernels::DEFAULT_KERNEL_SIZE`] is the usual choice.
///
/// # Example
///
/// ```
/// use pixelfx_image::Image;
/// use pixelfx_imgproc::filter::ConvolutionFilter;
///
/// let image = Image::<u8, 4>::from_size_pixel([8, 8].into(), [90, 90, 90, 255]).unwrap();
///
/// let mut filter = ConvolutionFilter::new();
/// filter.sobel(3);
/// let edges = filter.apply(image).unwrap();
///
/// assert_eq!(edges.pixel(4, 4), Some([0, 0, 0, 255]));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConvolutionFilter {
    kernel: Option<ConvolutionKernel>,
    enabled: bool,
    strategy: ExecutionStrategy,
}

impl Default for ConvolutionFilter {
    fn default() -> Self {
        Self::new()
    }
}

fn integral_kernel(dim_x: usize, dim_y: usize, weights: Vec<f32>, factor: f32, repeats: usize) -> ConvolutionKernel {
    ConvolutionKernel::Integral {
        dim_x,
        dim_y,
        weights,
        output: Output::Scaled { factor, bias: 0.0 },
        repeats,
    }
}

fn dense_kernel(dim: usize, weights: Vec<f32>) -> ConvolutionKernel {
    ConvolutionKernel::Dense {
        dim,
        weights,
        output: Output::default(),
    }
}

impl ConvolutionFilter {
    /// Create a no-op filter.
    pub fn new() -> Self {
        Self {
            kernel: None,
            enabled: true,
            strategy: ExecutionStrategy::default(),
        }
    }

    /// Set the execution strategy used by [`ConvolutionFilter::apply`].
    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Change the execution strategy in place.
    pub fn set_strategy(&mut self, strategy: ExecutionStrategy) -> &mut Self {
        self.strategy = strategy;
        self
    }

    /// Turn the filter on or off without touching its kernel.
    pub fn set_enabled(&mut self, enabled: bool) -> &mut Self {
        self.enabled = enabled;
        self
    }

    /// Whether the filter is switched on.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The configured kernel, `None` when the filter is a no-op.
    pub fn kernel(&self) -> Option<&ConvolutionKernel> {
        self.kernel.as_ref()
    }

    /// The primary kernel weights, `None` when the filter is a no-op.
    pub fn matrix(&self) -> Option<&[f32]> {
        self.kernel.as_ref().map(ConvolutionKernel::weights)
    }

    /// True when the filter is enabled and holds a kernel.
    pub fn can_run(&self) -> bool {
        self.enabled && self.kernel.is_some()
    }

    /// Clear the filter back to a no-op.
    pub fn reset(&mut self) -> &mut Self {
        self.kernel = None;
        self
    }

    /// Install a kernel and its strategy directly.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidKernelLength`] if a kernel side is even or
    /// the weights do not match the declared dimensions.
    pub fn set_kernel(&mut self, kernel: ConvolutionKernel) -> Result<&mut Self, FilterError> {
        kernel.validate()?;
        Ok(self.select(kernel))
    }

    fn select(&mut self, kernel: ConvolutionKernel) -> &mut Self {
        log::debug!("convolution strategy: {}", kernel.name());
        self.kernel = Some(kernel);
        self
    }

    /// Use a square kernel with `factor * sum + bias` output.
    ///
    /// The side length is the square root of `weights.len()`.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidKernelLength`] if the weights are empty or
    /// their count is not the square of an odd number.
    pub fn set(&mut self, weights: &[f32], factor: f32, bias: f32) -> Result<&mut Self, FilterError> {
        let dim = (weights.len() as f64).sqrt().round() as usize;
        self.set_kernel(ConvolutionKernel::Dense {
            dim,
            weights: weights.to_vec(),
            output: Output::Scaled { factor, bias },
        })
    }

    /// Use a `dim x dim` kernel with unit factor and no bias.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidKernelLength`] if `dim` is even or
    /// `weights.len() != dim * dim`.
    pub fn set_matrix(&mut self, weights: &[f32], dim: usize) -> Result<&mut Self, FilterError> {
        self.set_kernel(dense_kernel(dim, weights.to_vec()))
    }

    /// Box blur of size `d`.
    pub fn low_pass(&mut self, d: usize) -> &mut Self {
        let d = kernels::odd_kernel_size(d);
        let factor = 1.0 / (d * d) as f32;
        self.select(integral_kernel(d, d, kernels::ones(d, 1.0, 1.0), factor, 1))
    }

    /// Alias of [`ConvolutionFilter::low_pass`].
    pub fn box_blur(&mut self, d: usize) -> &mut Self {
        self.low_pass(d)
    }

    /// Identity minus `f` times the box blur of size `d`.
    pub fn high_pass(&mut self, d: usize, f: f32) -> &mut Self {
        let d = kernels::odd_kernel_size(d);
        let fact = -f / (d * d) as f32;
        self.select(integral_kernel(d, d, kernels::ones(d, fact, 1.0 + fact), 1.0, 1))
    }

    /// Soft glow: a negative high pass. The usual factor is 0.5.
    pub fn glow(&mut self, f: f32, d: usize) -> &mut Self {
        self.high_pass(d, -f)
    }

    /// Unsharp-style sharpening. The usual factor is 0.5.
    pub fn sharpen(&mut self, f: f32, d: usize) -> &mut Self {
        self.high_pass(d, f)
    }

    /// Average over a vertical line of `d` pixels.
    pub fn vertical_blur(&mut self, d: usize) -> &mut Self {
        let d = kernels::odd_kernel_size(d);
        self.select(integral_kernel(1, d, kernels::average_kernel_1d(d), 1.0 / d as f32, 1))
    }

    /// Average over a horizontal line of `d` pixels.
    pub fn horizontal_blur(&mut self, d: usize) -> &mut Self {
        let d = kernels::odd_kernel_size(d);
        self.select(integral_kernel(d, 1, kernels::average_kernel_1d(d), 1.0 / d as f32, 1))
    }

    /// Average along a line through the pixel at `theta` degrees
    /// (counter-clockwise, 0 is horizontal).
    pub fn directional_blur(&mut self, theta: f32, d: usize) -> &mut Self {
        let d = kernels::odd_kernel_size(d);
        let (sin, cos) = theta.to_radians().sin_cos();
        let weights = kernels::directional_line(d, cos, -sin, 1.0 / d as f32);
        self.select(dense_kernel(d, weights))
    }

    /// Repeated box blur approximating a gaussian; `quality` (passes) is clamped to `1..=3`.
    pub fn fast_gauss(&mut self, quality: usize, d: usize) -> &mut Self {
        let d = kernels::odd_kernel_size(d);
        let factor = 1.0 / (d * d) as f32;
        let repeats = quality.clamp(1, 3);
        self.select(integral_kernel(d, d, kernels::ones(d, 1.0, 1.0), factor, repeats))
    }

    /// Separable binomial (quasi-gaussian) blur.
    pub fn binomial_low_pass(&mut self, d: usize) -> &mut Self {
        let d = kernels::odd_kernel_size(d);
        let kernel = kernels::binomial_kernel_1d(d);
        let coeff = 0.5f32.powi(d as i32 - 1);
        self.select(ConvolutionKernel::Separable {
            horizontal: kernel.clone(),
            vertical: kernel,
            coeff_x: coeff,
            coeff_y: coeff,
        })
    }

    /// Alias of [`ConvolutionFilter::binomial_low_pass`].
    pub fn gauss_blur(&mut self, d: usize) -> &mut Self {
        self.binomial_low_pass(d)
    }

    /// Identity minus the normalized binomial blur.
    pub fn binomial_high_pass(&mut self, d: usize) -> &mut Self {
        let d = kernels::odd_kernel_size(d);
        let gauss = kernels::gauss_kernel(d);
        let weights = kernels::blend_kernels(
            &kernels::ones(d, 0.0, 1.0),
            &gauss.kernel,
            1.0,
            -1.0 / gauss.sum,
        );
        self.select(dense_kernel(d, weights))
    }

    fn gradient(&mut self, gx: Vec<f32>, gy: Vec<f32>, d: usize) -> &mut Self {
        self.select(ConvolutionKernel::Dense {
            dim: d,
            weights: gx,
            output: Output::Gradient { second: gy },
        })
    }

    /// Horizontal Prewitt derivative.
    pub fn prewitt_x(&mut self, d: usize) -> &mut Self {
        let d = kernels::odd_kernel_size(d);
        self.select(dense_kernel(d, kernels::prewitt_kernel(d, Direction::X).kernel))
    }

    /// Vertical Prewitt derivative.
    pub fn prewitt_y(&mut self, d: usize) -> &mut Self {
        let d = kernels::odd_kernel_size(d);
        self.select(dense_kernel(d, kernels::prewitt_kernel(d, Direction::Y).kernel))
    }

    /// Prewitt derivative along `theta` degrees: `cos * gx + sin * gy`.
    pub fn prewitt_directional(&mut self, theta: f32, d: usize) -> &mut Self {
        let d = kernels::odd_kernel_size(d);
        let (sin, cos) = theta.to_radians().sin_cos();
        let gx = kernels::prewitt_kernel(d, Direction::X).kernel;
        let gy = kernels::prewitt_kernel(d, Direction::Y).kernel;
        self.select(dense_kernel(d, kernels::blend_kernels(&gx, &gy, cos, sin)))
    }

    /// Prewitt gradient magnitude `|gx| + |gy|`.
    pub fn prewitt(&mut self, d: usize) -> &mut Self {
        let d = kernels::odd_kernel_size(d);
        let gx = kernels::prewitt_kernel(d, Direction::X).kernel;
        let gy = kernels::prewitt_kernel(d, Direction::Y).kernel;
        self.gradient(gx, gy, d)
    }

    /// Alias of [`ConvolutionFilter::prewitt_x`].
    pub fn grad_x(&mut self, d: usize) -> &mut Self {
        self.prewitt_x(d)
    }

    /// Alias of [`ConvolutionFilter::prewitt_y`].
    pub fn grad_y(&mut self, d: usize) -> &mut Self {
        self.prewitt_y(d)
    }

    /// Alias of [`ConvolutionFilter::prewitt_directional`].
    pub fn grad_directional(&mut self, theta: f32, d: usize) -> &mut Self {
        self.prewitt_directional(theta, d)
    }

    /// Alias of [`ConvolutionFilter::prewitt`].
    pub fn grad(&mut self, d: usize) -> &mut Self {
        self.prewitt(d)
    }

    /// Horizontal Sobel derivative.
    pub fn sobel_x(&mut self, d: usize) -> &mut Self {
        let d = kernels::odd_kernel_size(d);
        self.select(dense_kernel(d, kernels::sobel_kernel(d, Direction::X).kernel))
    }

    /// Vertical Sobel derivative.
    pub fn sobel_y(&mut self, d: usize) -> &mut Self {
        let d = kernels::odd_kernel_size(d);
        self.select(dense_kernel(d, kernels::sobel_kernel(d, Direction::Y).kernel))
    }

    /// Sobel derivative along `theta` degrees: `cos * gx + sin * gy`.
    pub fn sobel_directional(&mut self, theta: f32, d: usize) -> &mut Self {
        let d = kernels::odd_kernel_size(d);
        let (sin, cos) = theta.to_radians().sin_cos();
        let gx = kernels::sobel_kernel(d, Direction::X).kernel;
        let gy = kernels::sobel_kernel(d, Direction::Y).kernel;
        self.select(dense_kernel(d, kernels::blend_kernels(&gx, &gy, cos, sin)))
    }

    /// Sobel gradient magnitude `|gx| + |gy|`.
    pub fn sobel(&mut self, d: usize) -> &mut Self {
        let d = kernels::odd_kernel_size(d);
        let gx = kernels::sobel_kernel(d, Direction::X).kernel;
        let gy = kernels::sobel_kernel(d, Direction::Y).kernel;
        self.gradient(gx, gy, d)
    }

    /// Discrete Laplacian: `-1` everywhere, `d*d - 1` at the center.
    pub fn laplace(&mut self, d: usize) -> &mut Self {
        let d = kernels::odd_kernel_size(d);
        let size = (d * d) as f32;
        self.select(integral_kernel(d, d, kernels::ones(d, -1.0, size - 1.0), 1.0, 1))
    }

    /// Relief lit from `angle` degrees with the given strength.
    ///
    /// The classic look is `angle = -45` and `amount = 1`.
    pub fn emboss(&mut self, angle: f32, amount: f32, d: usize) -> &mut Self {
        let d = kernels::odd_kernel_size(d);
        let (sin, cos) = angle.to_radians().sin_cos();
        let weights = kernels::twos(d, amount * cos, -amount * sin, 1.0);
        self.select(dense_kernel(d, weights))
    }

    /// 3x3 four-neighbor edge kernel scaled by `m`.
    pub fn edges(&mut self, m: f32) -> &mut Self {
        #[rustfmt::skip]
        let weights = vec![
            0.0, m, 0.0,
            m, -4.0 * m, m,
            0.0, m, 0.0,
        ];
        self.select(dense_kernel(3, weights))
    }

    /// Convolve `src` and return the filtered image.
    ///
    /// A disabled or no-op filter hands `src` back untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the kernel does not match its dimensions or a
    /// [`ExecutionStrategy::Fixed`] pool cannot be built.
    pub fn apply(&self, src: Rgba8Image) -> Result<Rgba8Image, FilterError> {
        let Some(kernel) = self.kernel.as_ref().filter(|_| self.enabled) else {
            return Ok(src);
        };
        log::trace!(
            "{} convolution on {} with {:?}",
            kernel.name(),
            src.size(),
            self.strategy
        );

        let mut dst = Image::from_size_val(src.size(), 0u8)?;
        match kernel {
            ConvolutionKernel::Dense {
                dim,
                weights,
                output,
            } => convolve_dense(&src, &mut dst, *dim, weights, output, self.strategy)?,
            ConvolutionKernel::Separable {
                horizontal,
                vertical,
                coeff_x,
                coeff_y,
            } => {
                let kernel_x = kernels::scale_kernel(horizontal, *coeff_x);
                let kernel_y = kernels::scale_kernel(vertical, *coeff_y);
                separable_filter(&src, &mut dst, &kernel_x, &kernel_y, self.strategy)?
            }
            ConvolutionKernel::Integral {
                dim_x,
                dim_y,
                weights,
                output,
                repeats,
            } => integral_convolution(
                &src,
                &mut dst,
                *dim_x,
                *dim_y,
                weights,
                output,
                *repeats,
                self.strategy,
            )?,
        }
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
    pub fn serialize(&self) -> ConvolutionParams {
        ConvolutionParams {
            kernel: self.kernel.clone(),
        }
    }

    /// Restore a configuration produced by [`ConvolutionFilter::serialize`].
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidKernelLength`] if a kernel side is even
    /// or the weights do not match its dimensions; the filter is left
    /// unchanged.
    pub fn restore(&mut self, params: ConvolutionParams) -> Result<&mut Self, FilterError> {
        match params.kernel {
            Some(kernel) => self.set_kernel(kernel),
            None => Ok(self.reset()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixelfx_image::ImageError;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_image(width: usize, height: usize, seed: u64) -> Result<Rgba8Image, ImageError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut data = vec![0u8; width * height * 4];
        rng.fill(&mut data[..]);
        Image::new([width, height].into(), data)
    }

    fn uniform_image(pixel: [u8; 4]) -> Result<Rgba8Image, ImageError> {
        Image::from_size_pixel([7, 6].into(), pixel)
    }

    fn assert_close(a: &Rgba8Image, b: &Rgba8Image, tol: u8) {
        assert_eq!(a.size(), b.size());
        for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
            assert!(x.abs_diff(*y) <= tol, "{x} vs {y}");
        }
    }

    #[test]
    fn test_noop_returns_input() -> Result<(), FilterError> {
        let src = random_image(5, 4, 0)?;
        let mut filter = ConvolutionFilter::new();
        assert!(!filter.can_run());
        assert_eq!(filter.apply(src.clone())?, src);

        filter.box_blur(3).set_enabled(false);
        assert!(!filter.can_run());
        assert_eq!(filter.apply(src.clone())?, src);

        filter.set_enabled(true).reset();
        assert!(filter.matrix().is_none());
        Ok(())
    }

    #[test]
    fn test_even_sizes_rounded_up() {
        let mut filter = ConvolutionFilter::new();
        filter.low_pass(4);
        assert!(matches!(
            filter.kernel(),
            Some(ConvolutionKernel::Integral { dim_x: 5, dim_y: 5, .. })
        ));
        filter.sobel(2);
        assert!(matches!(
            filter.kernel(),
            Some(ConvolutionKernel::Dense { dim: 3, .. })
        ));
    }

    #[test]
    fn test_set_validates_length() -> Result<(), FilterError> {
        let mut filter = ConvolutionFilter::new();
        assert_eq!(
            filter.set(&[0.0; 8], 1.0, 0.0).err(),
            Some(FilterError::InvalidKernelLength(8))
        );
        assert_eq!(
            filter.set(&[], 1.0, 0.0).err(),
            Some(FilterError::InvalidKernelLength(0))
        );
        assert_eq!(
            filter.set_matrix(&[0.0; 9], 2).err(),
            Some(FilterError::InvalidKernelLength(9))
        );

        filter.set(&[0.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0], 0.5, 3.0)?;
        assert_eq!(filter.matrix().map(<[f32]>::len), Some(9));

        let src = random_image(4, 4, 1)?;
        let dst = filter.apply(src.clone())?;
        for (d, s) in dst.as_slice().chunks_exact(4).zip(src.as_slice().chunks_exact(4)) {
            for c in 0..3 {
                assert_eq!(d[c] as u16, (s[c] as u16 + 3).min(255));
            }
            assert_eq!(d[3], s[3]);
        }
        Ok(())
    }

    #[test]
    fn test_blurs_keep_uniform_images() -> Result<(), FilterError> {
        let src = uniform_image([100, 50, 200, 128])?;
        let mut filter = ConvolutionFilter::new();

        let configs: [fn(&mut ConvolutionFilter); 7] = [
            |f| {
                f.low_pass(3);
            },
            |f| {
                f.fast_gauss(3, 5);
            },
            |f| {
                f.vertical_blur(5);
            },
            |f| {
                f.horizontal_blur(3);
            },
            |f| {
                f.gauss_blur(5);
            },
            |f| {
                f.directional_blur(30.0, 5);
            },
            |f| {
                f.emboss(-45.0, 1.0, 3);
            },
        ];
        for configure in configs {
            configure(&mut filter);
            let dst = filter.apply(src.clone())?;
            assert_close(&dst, &src, 1);
        }
        Ok(())
    }

    #[test]
    fn test_edge_filters_zero_uniform_images() -> Result<(), FilterError> {
        let src = uniform_image([100, 50, 200, 128])?;
        let expected = uniform_image([0, 0, 0, 128])?;
        let mut filter = ConvolutionFilter::new();

        let configs: [fn(&mut ConvolutionFilter); 8] = [
            |f| {
                f.sobel(3);
            },
            |f| {
                f.prewitt(5);
            },
            |f| {
                f.sobel_x(3);
            },
            |f| {
                f.grad_directional(60.0, 3);
            },
            |f| {
                f.laplace(3);
            },
            |f| {
                f.edges(1.0);
            },
            |f| {
                f.binomial_high_pass(3);
            },
            |f| {
                f.high_pass(3, 1.0);
            },
        ];
        for configure in configs {
            configure(&mut filter);
            let dst = filter.apply(src.clone())?;
            assert_close(&dst, &expected, 1);
        }
        Ok(())
    }

    #[test]
    fn test_gradient_magnitude() -> Result<(), FilterError> {
        // dark left half, bright right half
        let mut src = uniform_image([0, 0, 0, 255])?;
        let width = src.width();
        for (i, px) in src.as_slice_mut().chunks_exact_mut(4).enumerate() {
            if i % width >= width / 2 {
                px[..3].copy_from_slice(&[40, 40, 40]);
            }
        }

        let dst = ConvolutionFilter::new().sobel(3).apply(src.clone())?;
        // |gx| = 4 * 40 on the columns next to the step, 0 elsewhere
        for y in 0..src.height() {
            assert_eq!(dst.pixel(0, y), Some([0, 0, 0, 255]));
            assert_eq!(dst.pixel(2, y), Some([160, 160, 160, 255]));
            assert_eq!(dst.pixel(3, y), Some([160, 160, 160, 255]));
            assert_eq!(dst.pixel(6, y), Some([0, 0, 0, 255]));
        }

        let dx = ConvolutionFilter::new().sobel_directional(0.0, 3).apply(src.clone())?;
        let sx = ConvolutionFilter::new().sobel_x(3).apply(src)?;
        assert_eq!(dx, sx);
        Ok(())
    }

    #[test]
    fn test_directional_blur_horizontal() -> Result<(), FilterError> {
        let src = random_image(9, 7, 2)?;
        let directional = ConvolutionFilter::new().directional_blur(0.0, 5).apply(src.clone())?;
        let horizontal = ConvolutionFilter::new().horizontal_blur(5).apply(src)?;
        assert_close(&directional, &horizontal, 1);
        Ok(())
    }

    #[test]
    fn test_sharpen_and_glow_are_opposite() {
        let mut sharpen = ConvolutionFilter::new();
        sharpen.sharpen(0.5, 3);
        let mut glow = ConvolutionFilter::new();
        glow.glow(0.5, 3);

        let (s, g) = (sharpen.matrix().unwrap(), glow.matrix().unwrap());
        approx::assert_relative_eq!(s[0], -0.5 / 9.0);
        approx::assert_relative_eq!(g[0], 0.5 / 9.0);
        approx::assert_relative_eq!(s[4], 1.0 - 0.5 / 9.0);
    }

    #[test]
    fn test_fast_gauss_quality_clamped() {
        let mut filter = ConvolutionFilter::new();
        filter.fast_gauss(7, 3);
        assert!(matches!(
            filter.kernel(),
            Some(ConvolutionKernel::Integral { repeats: 3, .. })
        ));
        filter.fast_gauss(0, 3);
        assert!(matches!(
            filter.kernel(),
            Some(ConvolutionKernel::Integral { repeats: 1, .. })
        ));
    }

    #[test]
    fn test_strategies_agree() -> Result<(), FilterError> {
        let src = random_image(23, 19, 3)?;
        let mut filter = ConvolutionFilter::new();
        filter.binomial_low_pass(5);

        let serial = filter.clone().with_strategy(ExecutionStrategy::Serial).apply(src.clone())?;
        let fixed = filter.clone().with_strategy(ExecutionStrategy::Fixed(2)).apply(src.clone())?;
        let parallel = filter.apply(src.clone())?;
        assert_eq!(serial, parallel);
        assert_eq!(serial, fixed);

        // several integral passes on one fixed pool
        filter.fast_gauss(3, 3);
        let serial = filter.clone().with_strategy(ExecutionStrategy::Serial).apply(src.clone())?;
        let fixed = filter.clone().with_strategy(ExecutionStrategy::Fixed(3)).apply(src)?;
        assert_eq!(serial, fixed);
        Ok(())
    }

    #[test]
    fn test_apply_raw() -> Result<(), FilterError> {
        let src = random_image(4, 3, 4)?;
        let mut filter = ConvolutionFilter::new();
        filter.edges(2.0);
        let raw = filter.apply_raw(src.as_slice(), 4, 3)?;
        assert_eq!(raw, filter.apply(src.clone())?.into_vec());

        assert_eq!(
            filter.apply_raw(src.as_slice(), 5, 3),
            Err(FilterError::Image(ImageError::InvalidChannelShape(48, 60)))
        );
        Ok(())
    }

    #[test]
    fn test_serialize_restore() -> Result<(), Box<dyn std::error::Error>> {
        let mut filter = ConvolutionFilter::new();
        filter.prewitt(3);
        let json = serde_json::to_string(&filter.serialize())?;

        let mut restored = ConvolutionFilter::new();
        restored.restore(serde_json::from_str(&json)?)?;
        assert_eq!(restored.kernel(), filter.kernel());

        let broken = ConvolutionParams {
            kernel: Some(ConvolutionKernel::Dense {
                dim: 3,
                weights: vec![1.0; 4],
                output: Output::default(),
            }),
        };
        assert_eq!(
            restored.restore(broken).err(),
            Some(FilterError::InvalidKernelLength(4))
        );
        assert_eq!(restored.kernel(), filter.kernel());

        restored.restore(ConvolutionParams { kernel: None })?;
        assert!(!restored.can_run());
        Ok(())
    }

    #[test]
    fn test_restore_rejects_oversized_dims() {
        let mut filter = ConvolutionFilter::new();
        filter.box_blur(3);
        let before = filter.clone();

        let dense = ConvolutionParams {
            kernel: Some(ConvolutionKernel::Dense {
                dim: usize::MAX,
                weights: vec![],
                output: Output::default(),
            }),
        };
        assert_eq!(
            filter.restore(dense).err(),
            Some(FilterError::InvalidKernelLength(0))
        );

        let integral = ConvolutionParams {
            kernel: Some(integral_kernel(usize::MAX, 3, vec![1.0], 1.0, 1)),
        };
        assert_eq!(
            filter.restore(integral).err(),
            Some(FilterError::InvalidKernelLength(1))
        );
        assert_eq!(filter, before);
    }

    #[test]
    fn test_restore_rejects_even_shapes() {
        let mut filter = ConvolutionFilter::new();

        let dense = ConvolutionParams {
            kernel: Some(dense_kernel(2, vec![0.25; 4])),
        };
        assert_eq!(
            filter.restore(dense).err(),
            Some(FilterError::InvalidKernelLength(4))
        );

        let integral = ConvolutionParams {
            kernel: Some(integral_kernel(4, 1, vec![0.25; 4], 1.0, 1)),
        };
        assert_eq!(
            filter.restore(integral).err(),
            Some(FilterError::InvalidKernelLength(4))
        );

        for (horizontal, vertical, len) in [
            (vec![], vec![1.0], 0),
            (vec![1.0], vec![0.5, 0.5], 2),
        ] {
            let separable = ConvolutionParams {
                kernel: Some(ConvolutionKernel::Separable {
                    horizontal,
                    vertical,
                    coeff_x: 1.0,
                    coeff_y: 1.0,
                }),
            };
            assert_eq!(
                filter.restore(separable).err(),
                Some(FilterError::InvalidKernelLength(len))
            );
        }
        assert!(!filter.can_run());

        assert_eq!(
            filter.set(&[0.25; 4], 1.0, 0.0).err(),
            Some(FilterError::InvalidKernelLength(4))
        );
    }
}
