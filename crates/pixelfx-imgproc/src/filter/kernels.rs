use std::sync::{Mutex, PoisonError};

/// Default side length used by the named convolution effects.
pub const DEFAULT_KERNEL_SIZE: usize = 3;

/// Rows of Pascal's triangle placed in the table on first use.
const SEEDED_PASCAL_ROWS: usize = 9;

/// Rows beyond this are computed on demand but not kept.
const MAX_CACHED_PASCAL_ROWS: usize = 40;

static PASCAL_ROWS: Mutex<Vec<Vec<f32>>> = Mutex::new(Vec::new());

/// Axis of a gradient kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Horizontal derivative.
    X,
    /// Vertical derivative.
    Y,
}

/// The flattened outer product of two 1D kernels together with its total weight.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelProduct {
    /// Row-major `k1.len() x k2.len()` weights.
    pub kernel: Vec<f32>,
    /// Sum of all weights.
    pub sum: f32,
}

/// Round an even kernel size up to the next odd one.
///
/// # Examples
///
/// ```
/// use pixelfx_imgproc::filter::kernels::odd_kernel_size;
///
/// assert_eq!(odd_kernel_size(0), 1);
/// assert_eq!(odd_kernel_size(4), 5);
/// assert_eq!(odd_kernel_size(7), 7);
/// ```
pub fn odd_kernel_size(kernel_size: usize) -> usize {
    if kernel_size % 2 == 0 {
        kernel_size + 1
    } else {
        kernel_size
    }
}

/// Number of weights of a `dim_x x dim_y` kernel.
///
/// Returns `None` if a side is even (zero included) or the area overflows.
///
/// ```
/// use pixelfx_imgproc::filter::kernels::odd_kernel_area;
///
/// assert_eq!(odd_kernel_area(3, 5), Some(15));
/// assert_eq!(odd_kernel_area(4, 3), None);
/// assert_eq!(odd_kernel_area(usize::MAX, usize::MAX), None);
/// ```
pub fn odd_kernel_area(dim_x: usize, dim_y: usize) -> Option<usize> {
    if dim_x % 2 == 0 || dim_y % 2 == 0 {
        return None;
    }
    dim_x.checked_mul(dim_y)
}

/// Create a 1D kernel with a single unit weight at the center.
pub fn identity_kernel_1d(kernel_size: usize) -> Vec<f32> {
    let mut kernel = vec![0.0; kernel_size];
    if let Some(center) = kernel.get_mut(kernel_size / 2) {
        *center = 1.0;
    }
    kernel
}

/// Create an unnormalized 1D averaging kernel (all ones).
pub fn average_kernel_1d(kernel_size: usize) -> Vec<f32> {
    vec![1.0; kernel_size]
}

/// Create a 1D central-difference kernel `[-half, .., 0, .., half]`.
pub fn derivative_kernel_1d(kernel_size: usize) -> Vec<f32> {
    let half = (kernel_size / 2) as isize;
    (0..kernel_size as isize).map(|i| (i - half) as f32).collect()
}

fn next_pascal_row(row: &[f32]) -> Vec<f32> {
    let mut next = Vec::with_capacity(row.len() + 1);
    next.push(1.0);
    next.extend(row.windows(2).map(|w| w[0] + w[1]));
    next.push(1.0);
    next
}

/// Create an unnormalized binomial kernel: row `kernel_size - 1` of Pascal's triangle.
///
/// Rows are memoized in a process-wide table. The first rows are seeded on
/// first use and later rows are generated from the last cached one.
///
/// # Examples
///
/// ```
/// use pixelfx_imgproc::filter::kernels::binomial_kernel_1d;
///
/// assert_eq!(binomial_kernel_1d(5), vec![1.0, 4.0, 6.0, 4.0, 1.0]);
/// ```
pub fn binomial_kernel_1d(kernel_size: usize) -> Vec<f32> {
    if kernel_size == 0 {
        return Vec::new();
    }
    let n = kernel_size - 1;

    let mut rows = PASCAL_ROWS.lock().unwrap_or_else(PoisonError::into_inner);
    if rows.is_empty() {
        let mut row = vec![1.0];
        for _ in 0..SEEDED_PASCAL_ROWS {
            let next = next_pascal_row(&row);
            rows.push(std::mem::replace(&mut row, next));
        }
    }

    if let Some(row) = rows.get(n) {
        return row.clone();
    }

    let mut row = rows.last().cloned().unwrap_or_else(|| vec![1.0]);
    while row.len() <= n {
        row = next_pascal_row(&row);
        if rows.len() < MAX_CACHED_PASCAL_ROWS {
            rows.push(row.clone());
        }
    }
    row
}

/// Outer product of two 1D kernels: element `(i, j)` is `k1[i] * k2[j]`,
/// flattened with `i` as the row.
pub fn convolve_kernels(k1: &[f32], k2: &[f32]) -> KernelProduct {
    let kernel: Vec<f32> = k1
        .iter()
        .flat_map(|&a| k2.iter().map(move |&b| a * b))
        .collect();
    let sum = kernel.iter().sum();
    KernelProduct { kernel, sum }
}

/// 2D binomial (quasi-gaussian) kernel.
pub fn gauss_kernel(kernel_size: usize) -> KernelProduct {
    let binomial = binomial_kernel_1d(kernel_size);
    convolve_kernels(&binomial, &binomial)
}

/// Kernel averaging along the central column.
pub fn vertical_kernel(kernel_size: usize) -> KernelProduct {
    convolve_kernels(
        &average_kernel_1d(kernel_size),
        &identity_kernel_1d(kernel_size),
    )
}

/// Kernel averaging along the central row.
pub fn horizontal_kernel(kernel_size: usize) -> KernelProduct {
    convolve_kernels(
        &identity_kernel_1d(kernel_size),
        &average_kernel_1d(kernel_size),
    )
}

fn gradient_kernel(smooth: Vec<f32>, kernel_size: usize, direction: Direction) -> KernelProduct {
    let mut derivative = derivative_kernel_1d(kernel_size);
    match direction {
        Direction::X => convolve_kernels(&smooth, &derivative),
        Direction::Y => {
            derivative.reverse();
            convolve_kernels(&derivative, &smooth)
        }
    }
}

/// Sobel derivative kernel: binomial smoothing across the derivative axis.
///
/// # Examples
///
/// ```
/// use pixelfx_imgproc::filter::kernels::{sobel_kernel, Direction};
///
/// let k = sobel_kernel(3, Direction::X);
/// assert_eq!(k.kernel, vec![-1.0, 0.0, 1.0, -2.0, 0.0, 2.0, -1.0, 0.0, 1.0]);
/// ```
pub fn sobel_kernel(kernel_size: usize, direction: Direction) -> KernelProduct {
    gradient_kernel(binomial_kernel_1d(kernel_size), kernel_size, direction)
}

/// Prewitt derivative kernel: box smoothing across the derivative axis.
pub fn prewitt_kernel(kernel_size: usize, direction: Direction) -> KernelProduct {
    gradient_kernel(average_kernel_1d(kernel_size), kernel_size, direction)
}

/// A `d x d` kernel filled with `fill`, with `center` at the middle.
pub fn ones(kernel_size: usize, fill: f32, center: f32) -> Vec<f32> {
    let area = kernel_size * kernel_size;
    let mut kernel = vec![fill; area];
    if let Some(c) = kernel.get_mut(area / 2) {
        *c = center;
    }
    kernel
}

/// Relief kernel: weight `i*dx + j*dy` at offset `(i, j)` from the center,
/// antisymmetric around it, with `center` at the middle. Even sizes are
/// rounded up with [`odd_kernel_size`].
pub fn twos(kernel_size: usize, dx: f32, dy: f32, center: f32) -> Vec<f32> {
    let kernel_size = odd_kernel_size(kernel_size);
    let area = kernel_size * kernel_size;
    let half = kernel_size / 2;
    let mid = area / 2;
    let mut kernel = vec![0.0; area];

    let mut tx = 0.0;
    for i in 0..=half {
        let mut ty = 0.0;
        for j in 0..=half {
            let k = j * kernel_size;
            kernel[mid + i + k] = tx + ty;
            kernel[mid - i - k] = -tx - ty;
            kernel[mid - i + k] = -tx + ty;
            kernel[mid + i - k] = tx - ty;
            ty += dy;
        }
        tx += dx;
    }
    kernel[mid] = center;
    kernel
}

/// Line kernel for directional blur.
///
/// Puts `1/d` on the cells of a rasterized line through the center with
/// direction `(cos, sin)`, stepping one cell along the major axis, and
/// `center` at the middle. The y axis grows downwards.
pub fn directional_line(kernel_size: usize, cos: f32, sin: f32, center: f32) -> Vec<f32> {
    let area = kernel_size * kernel_size;
    let mut kernel = vec![0.0; area];
    if area == 0 {
        return kernel;
    }
    let half = (kernel_size / 2) as isize;
    let d = kernel_size as isize;
    let f = 1.0 / kernel_size as f32;

    let (dx, dy) = if cos.abs() >= sin.abs() {
        (1.0, sin / cos)
    } else {
        (cos / sin, 1.0)
    };

    for i in 0..=half {
        let ox = (i as f32 * dx).round() as isize;
        let oy = (i as f32 * dy).round() as isize;
        for (x, y) in [(half + ox, half + oy), (half - ox, half - oy)] {
            if (0..d).contains(&x) && (0..d).contains(&y) {
                kernel[(y * d + x) as usize] = f;
            }
        }
    }
    kernel[area / 2] = center;
    kernel
}

/// Element-wise `k1 + k2`.
pub fn add_kernels(k1: &[f32], k2: &[f32]) -> Vec<f32> {
    k1.iter().zip(k2).map(|(a, b)| a + b).collect()
}

/// Element-wise `k1 - k2`.
pub fn subtract_kernels(k1: &[f32], k2: &[f32]) -> Vec<f32> {
    k1.iter().zip(k2).map(|(a, b)| a - b).collect()
}

/// Element-wise `k * s`.
pub fn scale_kernel(k: &[f32], s: f32) -> Vec<f32> {
    k.iter().map(|v| v * s).collect()
}

/// Element-wise `wa * k1 + wb * k2`.
pub fn blend_kernels(k1: &[f32], k2: &[f32], wa: f32, wb: f32) -> Vec<f32> {
    k1.iter().zip(k2).map(|(a, b)| wa * a + wb * b).collect()
}
