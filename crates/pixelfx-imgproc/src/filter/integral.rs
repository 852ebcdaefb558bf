use pixelfx_image::{ImageSize, Rgba8Image};

use super::convolution::{check_sizes, saturate_u8, Output};
use crate::{parallel, parallel::ExecutionStrategy, FilterError};

/// Summed-area table of the RGB samples of an image padded by replicated edges.
///
/// Entry `(i, j)` holds the sum over padded rows `< i` and padded columns
/// `< j`; the first row and column are zero.
struct SummedAreaTable {
    data: Vec<f64>,
    stride: usize,
}

impl SummedAreaTable {
    fn new(src: &[u8], size: ImageSize, pad_x: usize, pad_y: usize) -> Self {
        let pw = size.width + 2 * pad_x;
        let ph = size.height + 2 * pad_y;
        let stride = (pw + 1) * 3;
        let mut data = vec![0.0f64; stride * (ph + 1)];

        for py in 0..ph {
            let sy = py.saturating_sub(pad_y).min(size.height - 1);
            let src_row = &src[sy * size.width * 4..(sy + 1) * size.width * 4];
            let mut acc = [0.0f64; 3];
            let (prev, cur) = data.split_at_mut((py + 1) * stride);
            let prev = &prev[py * stride..];
            for px in 0..pw {
                let sx = px.saturating_sub(pad_x).min(size.width - 1);
                let s = &src_row[sx * 4..sx * 4 + 3];
                let j = (px + 1) * 3;
                for c in 0..3 {
                    acc[c] += s[c] as f64;
                    cur[j + c] = prev[j + c] + acc[c];
                }
            }
        }

        Self { data, stride }
    }

    /// Sum over the padded rectangle with top-left `(x, y)` and size `w x h`.
    #[inline]
    fn rect(&self, x: usize, y: usize, w: usize, h: usize) -> [f64; 3] {
        let (x0, x1) = (x * 3, (x + w) * 3);
        let (y0, y1) = (y * self.stride, (y + h) * self.stride);
        let d = &self.data;
        [0, 1, 2].map(|c| d[y1 + x1 + c] - d[y0 + x1 + c] - d[y1 + x0 + c] + d[y0 + x0 + c])
    }
}

#[allow(clippy::too_many_arguments)]
fn integral_pass(
    src: &[u8],
    dst: &mut [u8],
    size: ImageSize,
    dim_x: usize,
    dim_y: usize,
    first: (f64, f64),
    second: (f64, f64),
    output: &Output,
    strategy: ExecutionStrategy,
) -> Result<(), FilterError> {
    let table = SummedAreaTable::new(src, size, dim_x / 2, dim_y / 2);
    let (wt, center_offset) = first;
    let (wt2, center_offset2) = second;

    parallel::for_each_row_mut(strategy, dst, size.width * 4, |y, dst_row| {
        for (x, px) in dst_row.chunks_exact_mut(4).enumerate() {
            let rect = table.rect(x, y, dim_x, dim_y);
            let s = &src[(y * size.width + x) * 4..(y * size.width + x) * 4 + 4];
            let s1 = [0, 1, 2].map(|c| (wt * rect[c] + center_offset * s[c] as f64) as f32);
            let s2 = [0, 1, 2].map(|c| (wt2 * rect[c] + center_offset2 * s[c] as f64) as f32);
            let out = output.combine(s1, s2);
            px[0] = saturate_u8(out[0]);
            px[1] = saturate_u8(out[1]);
            px[2] = saturate_u8(out[2]);
            px[3] = s[3];
        }
    })?;

    Ok(())
}

// weight shared by every cell and the extra weight of the center cell
fn uniform_weights(weights: &[f32]) -> (f64, f64) {
    let wt = weights.first().copied().unwrap_or(0.0) as f64;
    let center = weights.get(weights.len() / 2).copied().unwrap_or(0.0) as f64;
    (wt, center - wt)
}

/// Convolve with a kernel that is uniform except for its center cell.
///
/// Every rectangle sum is read from a summed-area table built over the image
/// padded by the kernel half-sizes with replicated edges, so the result
/// matches the dense path with the same clamp-to-edge border, up to one unit
/// of truncation. The kernel weight is `weights[0]` and the center weight is
/// `weights[dim_x * dim_y / 2]`; the remaining weights are ignored.
///
/// With `repeats > 1` the output of each pass is fed back as the input of the
/// next one. Alpha is copied from `src`.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `dst` - The destination image, same size as `src`.
/// * `dim_x` - The kernel width.
/// * `dim_y` - The kernel height.
/// * `weights` - The row-major kernel weights.
/// * `output` - How the sums are turned into samples.
/// * `repeats` - Number of passes, at least one pass is made.
/// * `strategy` - The execution strategy of the consumer pass.
#[allow(clippy::too_many_arguments)]
pub fn integral_convolution(
    src: &Rgba8Image,
    dst: &mut Rgba8Image,
    dim_x: usize,
    dim_y: usize,
    weights: &[f32],
    output: &Output,
    repeats: usize,
    strategy: ExecutionStrategy,
) -> Result<(), FilterError> {
    check_sizes(src, dst)?;
    let area = dim_x
        .checked_mul(dim_y)
        .ok_or(FilterError::InvalidKernelLength(weights.len()))?;
    if weights.len() != area {
        return Err(FilterError::InvalidKernelLength(weights.len()));
    }
    if let Some(second) = output.second() {
        if second.len() != area {
            return Err(FilterError::InvalidKernelLength(second.len()));
        }
    }
    let size = src.size();
    if size.area() == 0 {
        return Ok(());
    }

    let first = uniform_weights(weights);
    let second = output.second().map_or((0.0, 0.0), uniform_weights);

    parallel::install(strategy, |strategy| -> Result<(), FilterError> {
        integral_pass(
            src.as_slice(),
            dst.as_slice_mut(),
            size,
            dim_x,
            dim_y,
            first,
            second,
            output,
            strategy,
        )?;

        for _ in 1..repeats {
            let prev = dst.as_slice().to_vec();
            integral_pass(
                &prev,
                dst.as_slice_mut(),
                size,
                dim_x,
                dim_y,
                first,
                second,
                output,
                strategy,
            )?;
        }
        Ok(())
    })?
}
