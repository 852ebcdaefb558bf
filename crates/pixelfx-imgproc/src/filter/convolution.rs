use pixelfx_image::{ImageError, ImageSize, Rgba8Image};
use serde::{Deserialize, Serialize};

use crate::{parallel, parallel::ExecutionStrategy, FilterError};

/// How the neighborhood sums of a convolution become output samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Output {
    /// `factor * sum + bias`.
    Scaled {
        /// Multiplier applied to the weighted sum.
        factor: f32,
        /// Offset added after scaling, in sample units.
        bias: f32,
    },
    /// `coeff1 * sum + coeff2 * sum2`, where `sum2` uses the `second` kernel.
    Weighted {
        /// Kernel producing the second sum.
        second: Vec<f32>,
        /// Weight of the first sum.
        coeff1: f32,
        /// Weight of the second sum.
        coeff2: f32,
    },
    /// Gradient magnitude approximation `|sum| + |sum2|`.
    Gradient {
        /// Kernel producing the second sum.
        second: Vec<f32>,
    },
}

impl Default for Output {
    fn default() -> Self {
        Output::Scaled {
            factor: 1.0,
            bias: 0.0,
        }
    }
}

impl Output {
    /// The second kernel, if the output combines two sums.
    pub fn second(&self) -> Option<&[f32]> {
        match self {
            Output::Scaled { .. } => None,
            Output::Weighted { second, .. } | Output::Gradient { second } => Some(second),
        }
    }

    #[inline]
    pub(crate) fn combine(&self, s1: [f32; 3], s2: [f32; 3]) -> [f32; 3] {
        match *self {
            Output::Scaled { factor, bias } => s1.map(|s| factor * s + bias),
            Output::Weighted { coeff1, coeff2, .. } => [
                coeff1 * s1[0] + coeff2 * s2[0],
                coeff1 * s1[1] + coeff2 * s2[1],
                coeff1 * s1[2] + coeff2 * s2[2],
            ],
            Output::Gradient { .. } => [
                s1[0].abs() + s2[0].abs(),
                s1[1].abs() + s2[1].abs(),
                s1[2].abs() + s2[2].abs(),
            ],
        }
    }
}

/// Clamp to the sample range and truncate toward zero.
#[inline]
pub(crate) fn saturate_u8(v: f32) -> u8 {
    v.clamp(0.0, 255.0) as u8
}

/// Neighbor offsets `(dx, dy)` of a `dim_x x dim_y` kernel in row-major order.
pub(crate) fn kernel_offsets(dim_x: usize, dim_y: usize) -> Vec<(isize, isize)> {
    let (hx, hy) = ((dim_x / 2) as isize, (dim_y / 2) as isize);
    (0..dim_y as isize)
        .flat_map(|y| (0..dim_x as isize).map(move |x| (x - hx, y - hy)))
        .collect()
}

const fn square_offsets<const N: usize>(dim: usize) -> [(isize, isize); N] {
    let mut out = [(0, 0); N];
    let half = (dim / 2) as isize;
    let mut k = 0;
    while k < N {
        out[k] = ((k % dim) as isize - half, (k / dim) as isize - half);
        k += 1;
    }
    out
}

const OFFSETS_3X3: [(isize, isize); 9] = square_offsets::<9>(3);
const OFFSETS_5X5: [(isize, isize); 25] = square_offsets::<25>(5);

pub(crate) fn check_sizes(src: &Rgba8Image, dst: &Rgba8Image) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }
    Ok(())
}

fn check_kernel(weights: &[f32], output: &Output, len: usize) -> Result<(), FilterError> {
    if weights.len() != len {
        return Err(FilterError::InvalidKernelLength(weights.len()));
    }
    match output.second() {
        Some(second) if second.len() != len => {
            Err(FilterError::InvalidKernelLength(second.len()))
        }
        _ => Ok(()),
    }
}

// Shared by every dense path; the fixed-size callers pass constant offset
// tables so the neighbor loop is unrolled after inlining.
#[inline(always)]
fn convolve_offsets(
    src: &[u8],
    dst: &mut [u8],
    size: ImageSize,
    offsets: &[(isize, isize)],
    weights: &[f32],
    output: &Output,
    strategy: ExecutionStrategy,
) -> Result<(), FilterError> {
    debug_assert_eq!(src.len(), size.area() * 4);
    debug_assert_eq!(src.len(), dst.len());
    debug_assert_eq!(offsets.len(), weights.len());

    let (w, h) = (size.width as isize, size.height as isize);
    let second = output.second();

    parallel::for_each_row_mut(strategy, dst, size.width * 4, |y, dst_row| {
        for (x, px) in dst_row.chunks_exact_mut(4).enumerate() {
            let mut s1 = [0.0f32; 3];
            let mut s2 = [0.0f32; 3];
            for (k, &(dx, dy)) in offsets.iter().enumerate() {
                let nx = (x as isize + dx).clamp(0, w - 1) as usize;
                let ny = (y as isize + dy).clamp(0, h - 1) as usize;
                let off = (ny * size.width + nx) * 4;
                let (r, g, b) = (src[off] as f32, src[off + 1] as f32, src[off + 2] as f32);

                let wt = weights[k];
                s1[0] += r * wt;
                s1[1] += g * wt;
                s1[2] += b * wt;

                if let Some(second) = second {
                    let wt2 = second[k];
                    s2[0] += r * wt2;
                    s2[1] += g * wt2;
                    s2[2] += b * wt2;
                }
            }

            let out = output.combine(s1, s2);
            px[0] = saturate_u8(out[0]);
            px[1] = saturate_u8(out[1]);
            px[2] = saturate_u8(out[2]);
            px[3] = src[(y * size.width + x) * 4 + 3];
        }
    })?;

    Ok(())
}

/// Convolve with a `dim x dim` kernel using the general path.
///
/// Neighbors outside the image are clamped to the nearest edge pixel. The
/// weighted sums are accumulated in `f32` over the neighbors in row-major
/// order, combined by `output`, clamped to `[0, 255]` and truncated. Alpha is
/// copied from `src`.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `dst` - The destination image, same size as `src`.
/// * `dim` - The side length of the kernel.
/// * `weights` - The row-major kernel weights.
/// * `output` - How the sums are turned into samples.
/// * `strategy` - The execution strategy.
///
/// # Errors
///
/// Returns an error if the images differ in size or a kernel does not hold
/// `dim * dim` weights.
pub fn convolve_general(
    src: &Rgba8Image,
    dst: &mut Rgba8Image,
    dim: usize,
    weights: &[f32],
    output: &Output,
    strategy: ExecutionStrategy,
) -> Result<(), FilterError> {
    check_sizes(src, dst)?;
    let area = dim
        .checked_mul(dim)
        .ok_or(FilterError::InvalidKernelLength(weights.len()))?;
    check_kernel(weights, output, area)?;
    let offsets = kernel_offsets(dim, dim);
    let size = src.size();
    convolve_offsets(
        src.as_slice(),
        dst.as_slice_mut(),
        size,
        &offsets,
        weights,
        output,
        strategy,
    )
}

/// Convolve with a 3x3 kernel. Produces the same bytes as [`convolve_general`].
pub fn convolve_3x3(
    src: &Rgba8Image,
    dst: &mut Rgba8Image,
    weights: &[f32],
    output: &Output,
    strategy: ExecutionStrategy,
) -> Result<(), FilterError> {
    check_sizes(src, dst)?;
    check_kernel(weights, output, 9)?;
    let size = src.size();
    convolve_offsets(
        src.as_slice(),
        dst.as_slice_mut(),
        size,
        &OFFSETS_3X3,
        weights,
        output,
        strategy,
    )
}

/// Convolve with a 5x5 kernel. Produces the same bytes as [`convolve_general`].
pub fn convolve_5x5(
    src: &Rgba8Image,
    dst: &mut Rgba8Image,
    weights: &[f32],
    output: &Output,
    strategy: ExecutionStrategy,
) -> Result<(), FilterError> {
    check_sizes(src, dst)?;
    check_kernel(weights, output, 25)?;
    let size = src.size();
    convolve_offsets(
        src.as_slice(),
        dst.as_slice_mut(),
        size,
        &OFFSETS_5X5,
        weights,
        output,
        strategy,
    )
}

/// Convolve with a dense `dim x dim` kernel, picking the fixed-size path for
/// 3x3 and 5x5 kernels.
pub fn convolve_dense(
    src: &Rgba8Image,
    dst: &mut Rgba8Image,
    dim: usize,
    weights: &[f32],
    output: &Output,
    strategy: ExecutionStrategy,
) -> Result<(), FilterError> {
    match dim {
        3 => convolve_3x3(src, dst, weights, output, strategy),
        5 => convolve_5x5(src, dst, weights, output, strategy),
        _ => convolve_general(src, dst, dim, weights, output, strategy),
    }
}
