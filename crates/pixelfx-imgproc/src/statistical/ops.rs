use pixelfx_image::{ImageSize, Rgba8Image};
use serde::{Deserialize, Serialize};

use crate::{filter::check_sizes, parallel, parallel::ExecutionStrategy, FilterError};

/// Rank statistic computed over a pixel neighborhood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Statistic {
    /// Middle value of the sorted window.
    Median,
    /// Smallest value (erosion).
    Minimum,
    /// Largest value (dilation).
    Maximum,
}

impl Statistic {
    /// Name used when the configuration is serialized.
    pub fn name(&self) -> &'static str {
        match self {
            Statistic::Median => "median",
            Statistic::Minimum => "minimum",
            Statistic::Maximum => "maximum",
        }
    }

    /// Parse a name produced by [`Statistic::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "median" => Some(Statistic::Median),
            "minimum" => Some(Statistic::Minimum),
            "maximum" => Some(Statistic::Maximum),
            _ => None,
        }
    }
}

impl std::fmt::Display for Statistic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Flat `(dx, dy)` offsets of a `dim x dim` window, row-major.
///
/// # Examples
///
/// ```
/// use pixelfx_imgproc::statistical::window_indices;
///
/// assert_eq!(window_indices(1), vec![0, 0]);
/// assert_eq!(window_indices(3)[..4], [-1, -1, 0, -1]);
/// ```
pub fn window_indices(dim: usize) -> Vec<i32> {
    let half = (dim / 2) as i32;
    (0..dim as i32)
        .flat_map(|y| (0..dim as i32).flat_map(move |x| [x - half, y - half]))
        .collect()
}

// RGB samples of the in-bounds neighbors of (x, y); out-of-bounds offsets are skipped
fn neighbors<'a>(
    src: &'a [u8],
    size: ImageSize,
    x: usize,
    y: usize,
    indices: &'a [i32],
) -> impl Iterator<Item = &'a [u8]> + 'a {
    let (w, h) = (size.width as isize, size.height as isize);
    indices.chunks_exact(2).filter_map(move |d| {
        let nx = x as isize + d[0] as isize;
        let ny = y as isize + d[1] as isize;
        if nx < 0 || ny < 0 || nx >= w || ny >= h {
            return None;
        }
        let off = (ny as usize * size.width + nx as usize) * 4;
        Some(&src[off..off + 3])
    })
}

fn median_of(values: &mut [u8], fallback: u8) -> u8 {
    values.sort_unstable();
    let len = values.len();
    if len == 0 {
        return fallback;
    }
    let mid = len / 2;
    if len % 2 == 1 {
        values[mid]
    } else {
        ((values[mid - 1] as u16 + values[mid] as u16) / 2) as u8
    }
}

/// Replace every RGB sample by a rank statistic of its neighborhood.
///
/// `indices` holds flat `(dx, dy)` pairs, see [`window_indices`]. Neighbors
/// outside the image are skipped, so the window shrinks at the borders. The
/// minimum starts from 255 and the maximum from 0; the median of an even
/// number of samples is the truncated mean of the two middle ones. Alpha is
/// copied from `src`.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `dst` - The destination image, same size as `src`.
/// * `indices` - The window offsets.
/// * `statistic` - The statistic to compute.
/// * `strategy` - The execution strategy.
///
/// # Errors
///
/// Returns an error if the images differ in size or `indices` has an odd length.
pub fn rank_filter(
    src: &Rgba8Image,
    dst: &mut Rgba8Image,
    indices: &[i32],
    statistic: Statistic,
    strategy: ExecutionStrategy,
) -> Result<(), FilterError> {
    check_sizes(src, dst)?;
    if indices.len() % 2 != 0 {
        return Err(FilterError::InvalidKernelLength(indices.len()));
    }
    let size = src.size();
    let src = src.as_slice();

    parallel::for_each_row_mut(strategy, dst.as_slice_mut(), size.width * 4, |y, dst_row| {
        let mut window: [Vec<u8>; 3] = Default::default();
        for (x, px) in dst_row.chunks_exact_mut(4).enumerate() {
            let center = (y * size.width + x) * 4;
            let out = match statistic {
                Statistic::Minimum => {
                    neighbors(src, size, x, y, indices).fold([255u8; 3], |acc, s| {
                        [acc[0].min(s[0]), acc[1].min(s[1]), acc[2].min(s[2])]
                    })
                }
                Statistic::Maximum => {
                    neighbors(src, size, x, y, indices).fold([0u8; 3], |acc, s| {
                        [acc[0].max(s[0]), acc[1].max(s[1]), acc[2].max(s[2])]
                    })
                }
                Statistic::Median => {
                    window.iter_mut().for_each(Vec::clear);
                    for s in neighbors(src, size, x, y, indices) {
                        window[0].push(s[0]);
                        window[1].push(s[1]);
                        window[2].push(s[2]);
                    }
                    [
                        median_of(&mut window[0], src[center]),
                        median_of(&mut window[1], src[center + 1]),
                        median_of(&mut window[2], src[center + 2]),
                    ]
                }
            };
            px[..3].copy_from_slice(&out);
            px[3] = src[center + 3];
        }
    })?;

    Ok(())
}
