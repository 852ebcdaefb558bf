use pixelfx_image::Rgba8Image;

use super::convolution::{check_sizes, saturate_u8};
use crate::{parallel, parallel::ExecutionStrategy, FilterError};

/// A separable 2D filter that applies horizontal and vertical 1D convolutions sequentially.
///
/// The horizontal pass writes unclamped RGB sums into an `f32` scratch plane;
/// only the vertical pass clamps and truncates.
struct SeparableFilter<'a> {
    kernel_x: &'a [f32],
    kernel_y: &'a [f32],
    offsets_x: Vec<isize>,
    offsets_y: Vec<isize>,
}

impl<'a> SeparableFilter<'a> {
    fn new(kernel_x: &'a [f32], kernel_y: &'a [f32]) -> Self {
        let half_x = (kernel_x.len() / 2) as isize;
        let half_y = (kernel_y.len() / 2) as isize;

        Self {
            kernel_x,
            kernel_y,
            offsets_x: (0..kernel_x.len() as isize).map(|i| i - half_x).collect(),
            offsets_y: (0..kernel_y.len() as isize).map(|i| i - half_y).collect(),
        }
    }

    fn apply(
        &self,
        src: &Rgba8Image,
        dst: &mut Rgba8Image,
        strategy: ExecutionStrategy,
    ) -> Result<(), FilterError> {
        let (cols, rows) = (src.cols(), src.rows());
        let src_data = src.as_slice();
        let mut temp = vec![0.0f32; cols * rows * 3];

        // horizontal
        parallel::for_each_row_mut(strategy, &mut temp, cols * 3, |r, row_temp| {
            let row_offset = r * cols * 4;
            for (c, acc) in row_temp.chunks_exact_mut(3).enumerate() {
                for (&k, &off) in self.kernel_x.iter().zip(self.offsets_x.iter()) {
                    let x = (c as isize + off).clamp(0, cols as isize - 1) as usize;
                    let idx = row_offset + x * 4;
                    acc[0] += src_data[idx] as f32 * k;
                    acc[1] += src_data[idx + 1] as f32 * k;
                    acc[2] += src_data[idx + 2] as f32 * k;
                }
            }
        })?;

        // vertical
        let temp = &temp;
        parallel::for_each_row_mut(strategy, dst.as_slice_mut(), cols * 4, |r, row_dst| {
            for (c, px) in row_dst.chunks_exact_mut(4).enumerate() {
                let mut acc = [0.0f32; 3];
                for (&k, &off) in self.kernel_y.iter().zip(self.offsets_y.iter()) {
                    let y = (r as isize + off).clamp(0, rows as isize - 1) as usize;
                    let idx = (y * cols + c) * 3;
                    acc[0] += temp[idx] * k;
                    acc[1] += temp[idx + 1] * k;
                    acc[2] += temp[idx + 2] * k;
                }
                px[0] = saturate_u8(acc[0]);
                px[1] = saturate_u8(acc[1]);
                px[2] = saturate_u8(acc[2]);
                px[3] = src_data[(r * cols + c) * 4 + 3];
            }
        })?;

        Ok(())
    }
}

/// Apply a separable filter to an RGBA image.
///
/// The result equals a dense convolution with the outer product
/// `kernel_y x kernel_x` up to one unit of truncation. Neighbors outside the
/// image are clamped to the nearest edge pixel and alpha is copied.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `dst` - The destination image, same size as `src`.
/// * `kernel_x` - The horizontal kernel, already scaled.
/// * `kernel_y` - The vertical kernel, already scaled.
/// * `strategy` - The execution strategy.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn separable_filter(
    src: &Rgba8Image,
    dst: &mut Rgba8Image,
    kernel_x: &[f32],
    kernel_y: &[f32],
    strategy: ExecutionStrategy,
) -> Result<(), FilterError> {
    check_sizes(src, dst)?;
    let filter = SeparableFilter::new(kernel_x, kernel_y);
    parallel::install(strategy, |strategy| filter.apply(src, dst, strategy))?
}
