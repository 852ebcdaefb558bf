use pixelfx_image::{ImageError, ImageSize, Rgba8Image};
use serde::{Deserialize, Serialize};

use super::matrix::{Channel, ColorMatrix, LUMA};
use crate::{parallel, parallel::ExecutionStrategy, FilterError};

const INV_255: f32 = 1.0 / 255.0;

/// Serialized state of a [`ColorMatrixFilter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorMatrixParams {
    /// The composed matrix, `None` for a no-op filter.
    pub matrix: Option<ColorMatrix>,
}

/// Rewrites every pixel through a composed 4x5 color matrix.
///
/// Effects accumulate: each named effect builds its matrix and hands it to
/// [`ColorMatrixFilter::set`], which composes it with the current matrix. The
/// filter is applied in place.
///
/// # Example
///
/// ```
/// use pixelfx_image::Image;
/// use pixelfx_imgproc::color::ColorMatrixFilter;
///
/// let mut image = Image::<u8, 4>::from_size_pixel([2, 2].into(), [10, 20, 30, 255]).unwrap();
///
/// let mut filter = ColorMatrixFilter::new();
/// filter.invert();
/// filter.apply(&mut image).unwrap();
///
/// assert_eq!(image.pixel(0, 0), Some([245, 235, 225, 255]));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMatrixFilter {
    matrix: Option<ColorMatrix>,
    enabled: bool,
    strategy: ExecutionStrategy,
}

impl Default for ColorMatrixFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorMatrixFilter {
    /// Create a no-op filter.
    pub fn new() -> Self {
        Self {
            matrix: None,
            enabled: true,
            strategy: ExecutionStrategy::default(),
        }
    }

    /// Create a filter starting from the given matrix.
    pub fn from_matrix(matrix: ColorMatrix) -> Self {
        Self {
            matrix: Some(matrix),
            ..Self::new()
        }
    }

    /// Set the execution strategy used by [`ColorMatrixFilter::apply`].
    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Change the execution strategy in place.
    pub fn set_strategy(&mut self, strategy: ExecutionStrategy) -> &mut Self {
        self.strategy = strategy;
        self
    }

    /// Turn the filter on or off without touching its matrix.
    pub fn set_enabled(&mut self, enabled: bool) -> &mut Self {
        self.enabled = enabled;
        self
    }

    /// Whether the filter is switched on.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The current composed matrix, `None` when the filter is a no-op.
    pub fn matrix(&self) -> Option<&ColorMatrix> {
        self.matrix.as_ref()
    }

    /// True when the filter is enabled and holds a matrix.
    pub fn can_run(&self) -> bool {
        self.enabled && self.matrix.is_some()
    }

    /// Compose `matrix` with the current matrix, or adopt it if there is none.
    pub fn set(&mut self, matrix: ColorMatrix) -> &mut Self {
        self.matrix = Some(match &self.matrix {
            Some(current) => current.multiply(&matrix),
            None => matrix,
        });
        self
    }

    /// Compose the matrix of another filter into this one.
    pub fn combine_with(&mut self, other: &ColorMatrixFilter) -> &mut Self {
        if let Some(matrix) = other.matrix {
            self.set(matrix);
        }
        self
    }

    /// Cross-fade towards another filter: `(1 - amount) * self + amount * other`.
    pub fn blend_with(&mut self, other: &ColorMatrixFilter, amount: f32) -> &mut Self {
        let Some(theirs) = other.matrix else {
            return self;
        };
        self.matrix = Some(match &self.matrix {
            Some(current) => current.blend(&theirs, 1.0 - amount, amount),
            None => theirs,
        });
        self
    }

    /// Clear the filter back to a no-op.
    pub fn reset(&mut self) -> &mut Self {
        self.matrix = None;
        self
    }

    fn set_rgba(&mut self, m: [f32; 20]) -> &mut Self {
        self.set(ColorMatrix(m).rechannel(Channel::RGBA, Channel::RGBA))
    }

    /// Keep a single channel: it is written to its own slot, and also to the
    /// other color slots when `grayscale` is set (always for alpha). The alpha
    /// of the result is opaque.
    pub fn channel(&mut self, channel: Channel, grayscale: bool) -> &mut Self {
        #[rustfmt::skip]
        let mut m = [
            0.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 255.0,
        ];
        let ch = channel.index();
        let f = if channel == Channel::Alpha || grayscale {
            1.0
        } else {
            0.0
        };
        for row in [Channel::Red, Channel::Green, Channel::Blue] {
            m[row.index() * 5 + ch] = if row == channel { 1.0 } else { f };
        }
        self.set(ColorMatrix(m))
    }

    /// Keep only the red channel.
    pub fn red_channel(&mut self, grayscale: bool) -> &mut Self {
        self.channel(Channel::Red, grayscale)
    }

    /// Keep only the green channel.
    pub fn green_channel(&mut self, grayscale: bool) -> &mut Self {
        self.channel(Channel::Green, grayscale)
    }

    /// Keep only the blue channel.
    pub fn blue_channel(&mut self, grayscale: bool) -> &mut Self {
        self.channel(Channel::Blue, grayscale)
    }

    /// Show the alpha channel as an opaque grayscale image.
    pub fn alpha_channel(&mut self) -> &mut Self {
        self.channel(Channel::Alpha, true)
    }

    /// Zero one color channel. Masking alpha is a no-op.
    pub fn mask_channel(&mut self, channel: Channel) -> &mut Self {
        if channel == Channel::Alpha {
            return self;
        }
        let mut m = ColorMatrix::identity().0;
        let ch = channel.index();
        m[ch * 5 + ch] = 0.0;
        self.set(ColorMatrix(m))
    }

    /// Exchange two channels.
    pub fn swap_channels(&mut self, channel1: Channel, channel2: Channel) -> &mut Self {
        if channel1 == channel2 {
            return self;
        }
        let mut m = ColorMatrix::identity().0;
        let (c1, c2) = (channel1.index(), channel2.index());
        m[c1 * 5 + c1] = 0.0;
        m[c2 * 5 + c2] = 0.0;
        m[c1 * 5 + c2] = 1.0;
        m[c2 * 5 + c1] = 1.0;
        self.set(ColorMatrix(m))
    }

    /// Invert a single color channel. Inverting alpha is a no-op.
    pub fn invert_channel(&mut self, channel: Channel) -> &mut Self {
        if channel == Channel::Alpha {
            return self;
        }
        let mut m = ColorMatrix::identity().0;
        let ch = channel.index();
        m[ch * 5 + ch] = -1.0;
        m[ch * 5 + 4] = 255.0;
        self.set(ColorMatrix(m))
    }

    /// Invert the red channel.
    pub fn invert_red(&mut self) -> &mut Self {
        self.invert_channel(Channel::Red)
    }

    /// Invert the green channel.
    pub fn invert_green(&mut self) -> &mut Self {
        self.invert_channel(Channel::Green)
    }

    /// Invert the blue channel.
    pub fn invert_blue(&mut self) -> &mut Self {
        self.invert_channel(Channel::Blue)
    }

    /// Alpha inversion is not supported; kept for symmetry.
    pub fn invert_alpha(&mut self) -> &mut Self {
        self.invert_channel(Channel::Alpha)
    }

    /// Photographic negative of the color channels.
    pub fn invert(&mut self) -> &mut Self {
        #[rustfmt::skip]
        let m = [
            -1.0, 0.0, 0.0, 0.0, 255.0,
            0.0, -1.0, 0.0, 0.0, 255.0,
            0.0, 0.0, -1.0, 0.0, 255.0,
            0.0, 0.0, 0.0, 1.0, 0.0,
        ];
        self.set_rgba(m)
    }

    /// Replace every color channel with the luma.
    pub fn desaturate(&mut self) -> &mut Self {
        let [lr, lg, lb] = LUMA;
        #[rustfmt::skip]
        let m = [
            lr, lg, lb, 0.0, 0.0,
            lr, lg, lb, 0.0, 0.0,
            lr, lg, lb, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0, 0.0,
        ];
        self.set_rgba(m)
    }

    /// Alias of [`ColorMatrixFilter::desaturate`].
    pub fn grayscale(&mut self) -> &mut Self {
        self.desaturate()
    }

    /// Scale saturation: 0 is grayscale, 1 is unchanged, above 1 boosts color.
    pub fn saturate(&mut self, s: f32) -> &mut Self {
        let s_inv = 1.0 - s;
        let irlum = s_inv * LUMA[0];
        let iglum = s_inv * LUMA[1];
        let iblum = s_inv * LUMA[2];
        #[rustfmt::skip]
        let m = [
            irlum + s, iglum, iblum, 0.0, 0.0,
            irlum, iglum + s, iblum, 0.0, 0.0,
            irlum, iglum, iblum + s, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0, 0.0,
        ];
        self.set_rgba(m)
    }

    /// Tint towards `rgb` (packed `0xRRGGBB`) by `amount` (1 is a full tint).
    pub fn colorize(&mut self, rgb: u32, amount: f32) -> &mut Self {
        let r = ((rgb >> 16) & 255) as f32 * INV_255;
        let g = ((rgb >> 8) & 255) as f32 * INV_255;
        let b = (rgb & 255) as f32 * INV_255;
        let inv_amount = 1.0 - amount;
        let (ar, ag, ab) = (amount * r, amount * g, amount * b);
        let [lr, lg, lb] = LUMA;
        #[rustfmt::skip]
        let m = [
            inv_amount + ar * lr, ar * lg, ar * lb, 0.0, 0.0,
            ag * lr, inv_amount + ag * lg, ag * lb, 0.0, 0.0,
            ab * lr, ab * lg, inv_amount + ab * lb, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0, 0.0,
        ];
        self.set_rgba(m)
    }

    /// Per-channel contrast around mid-gray; 0 leaves a channel unchanged.
    pub fn contrast(&mut self, r: f32, g: f32, b: f32) -> &mut Self {
        let (r, g, b) = (r + 1.0, g + 1.0, b + 1.0);
        #[rustfmt::skip]
        let m = [
            r, 0.0, 0.0, 0.0, 128.0 * (1.0 - r),
            0.0, g, 0.0, 0.0, 128.0 * (1.0 - g),
            0.0, 0.0, b, 0.0, 128.0 * (1.0 - b),
            0.0, 0.0, 0.0, 1.0, 0.0,
        ];
        self.set_rgba(m)
    }

    /// Same contrast on every color channel.
    pub fn contrast_uniform(&mut self, amount: f32) -> &mut Self {
        self.contrast(amount, amount, amount)
    }

    /// Per-channel additive brightness, in sample units.
    pub fn brightness(&mut self, r: f32, g: f32, b: f32) -> &mut Self {
        #[rustfmt::skip]
        let m = [
            1.0, 0.0, 0.0, 0.0, r,
            0.0, 1.0, 0.0, 0.0, g,
            0.0, 0.0, 1.0, 0.0, b,
            0.0, 0.0, 0.0, 1.0, 0.0,
        ];
        self.set_rgba(m)
    }

    /// Same brightness offset on every color channel.
    pub fn brightness_uniform(&mut self, amount: f32) -> &mut Self {
        self.brightness(amount, amount, amount)
    }

    /// Rotate hues by `degrees` around the luma axis.
    ///
    /// The green row uses the fixed constants `0.143, 0.14, -0.283`.
    pub fn adjust_hue(&mut self, degrees: f32) -> &mut Self {
        let rad = degrees.to_radians();
        let (sin, cos) = rad.sin_cos();
        let [lr, lg, lb] = LUMA;
        #[rustfmt::skip]
        let m = [
            (lr + cos * (1.0 - lr)) + sin * -lr,
            (lg + cos * -lg) + sin * -lg,
            (lb + cos * -lb) + sin * (1.0 - lb),
            0.0, 0.0,
            (lr + cos * -lr) + sin * 0.143,
            (lg + cos * (1.0 - lg)) + sin * 0.14,
            (lb + cos * -lb) + sin * -0.283,
            0.0, 0.0,
            (lr + cos * -lr) + sin * -(1.0 - lr),
            (lg + cos * -lg) + sin * lg,
            (lb + cos * (1.0 - lb)) + sin * lb,
            0.0, 0.0,
            0.0, 0.0, 0.0, 1.0, 0.0,
        ];
        self.set_rgba(m)
    }

    /// Alias of [`ColorMatrixFilter::adjust_hue`].
    pub fn rotate_hue(&mut self, degrees: f32) -> &mut Self {
        self.adjust_hue(degrees)
    }

    /// Replace every color channel with the weighted sum `r*R + g*G + b*B`.
    pub fn average(&mut self, r: f32, g: f32, b: f32) -> &mut Self {
        #[rustfmt::skip]
        let m = [
            r, g, b, 0.0, 0.0,
            r, g, b, 0.0, 0.0,
            r, g, b, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0, 0.0,
        ];
        self.set_rgba(m)
    }

    /// [`ColorMatrixFilter::average`] with equal weights.
    pub fn average_default(&mut self) -> &mut Self {
        self.average(0.3333, 0.3333, 0.3333)
    }

    /// Scale the color channels by `contrast` (1.2 is the usual correction).
    pub fn quick_contrast_correction(&mut self, contrast: f32) -> &mut Self {
        #[rustfmt::skip]
        let m = [
            contrast, 0.0, 0.0, 0.0, 0.0,
            0.0, contrast, 0.0, 0.0, 0.0,
            0.0, 0.0, contrast, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0, 0.0,
        ];
        self.set_rgba(m)
    }

    /// Reddish-brown tint imitating an old photograph; `amount` is clamped to `[0, 1]`.
    pub fn sepia(&mut self, amount: f32) -> &mut Self {
        let amount = amount.clamp(0.0, 1.0);
        #[rustfmt::skip]
        let m = [
            1.0 - 0.607 * amount, 0.769 * amount, 0.189 * amount, 0.0, 0.0,
            0.349 * amount, 1.0 - 0.314 * amount, 0.168 * amount, 0.0, 0.0,
            0.272 * amount, 0.534 * amount, 1.0 - 0.869 * amount, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0, 0.0,
        ];
        self.set_rgba(m)
    }

    /// Luma-based sepia; `amount` is a percentage capped at 100 (10 is typical).
    pub fn sepia2(&mut self, amount: f32) -> &mut Self {
        let amount = amount.min(100.0) * 2.55;
        let [lr, lg, lb] = LUMA;
        #[rustfmt::skip]
        let m = [
            lr, lg, lb, 0.0, 40.0,
            lr, lg, lb, 0.0, 20.0,
            lr, lg, lb, 0.0, -amount,
            0.0, 0.0, 0.0, 1.0, 0.0,
        ];
        self.set_rgba(m)
    }

    /// Binarize around `threshold`, either on the luma (`luma = true`) or on
    /// each channel independently. `factor` controls the steepness (256 is a
    /// hard step).
    pub fn threshold(&mut self, threshold: f32, factor: f32, luma: bool) -> &mut Self {
        let bias = -(factor - 1.0) * threshold;
        let m = if luma {
            let (r, g, b) = (LUMA[0] * factor, LUMA[1] * factor, LUMA[2] * factor);
            #[rustfmt::skip]
            let m = [
                r, g, b, 0.0, bias,
                r, g, b, 0.0, bias,
                r, g, b, 0.0, bias,
                0.0, 0.0, 0.0, 1.0, 0.0,
            ];
            m
        } else {
            #[rustfmt::skip]
            let m = [
                factor, 0.0, 0.0, 0.0, bias,
                0.0, factor, 0.0, 0.0, bias,
                0.0, 0.0, factor, 0.0, bias,
                0.0, 0.0, 0.0, 1.0, 0.0,
            ];
            m
        };
        self.set_rgba(m)
    }

    /// Per-channel threshold, see [`ColorMatrixFilter::threshold`].
    pub fn threshold_rgb(&mut self, threshold: f32, factor: f32) -> &mut Self {
        self.threshold(threshold, factor, false)
    }

    /// Threshold a single channel, leaving the others untouched.
    pub fn threshold_channel(
        &mut self,
        channel: Channel,
        threshold: f32,
        factor: f32,
        luma: bool,
    ) -> &mut Self {
        let mut m = ColorMatrix::identity().0;
        let row = channel.index() * 5;
        if channel == Channel::Alpha {
            m[row + 3] = factor;
            m[row + 4] = -factor * threshold;
        } else {
            let weights = if luma {
                [LUMA[0] * factor, LUMA[1] * factor, LUMA[2] * factor]
            } else {
                [factor; 3]
            };
            m[row..row + 3].copy_from_slice(&weights);
            m[row + 4] = -(factor - 1.0) * threshold;
        }
        self.set(ColorMatrix(m))
    }

    /// Threshold the red channel.
    pub fn threshold_red(&mut self, threshold: f32, factor: f32, luma: bool) -> &mut Self {
        self.threshold_channel(Channel::Red, threshold, factor, luma)
    }

    /// Threshold the green channel.
    pub fn threshold_green(&mut self, threshold: f32, factor: f32, luma: bool) -> &mut Self {
        self.threshold_channel(Channel::Green, threshold, factor, luma)
    }

    /// Threshold the blue channel.
    pub fn threshold_blue(&mut self, threshold: f32, factor: f32, luma: bool) -> &mut Self {
        self.threshold_channel(Channel::Blue, threshold, factor, luma)
    }

    /// Threshold the alpha channel.
    pub fn threshold_alpha(&mut self, threshold: f32, factor: f32) -> &mut Self {
        self.threshold_channel(Channel::Alpha, threshold, factor, false)
    }

    /// Convert RGB to JFIF YCbCr, stored in the [`Channel::YCBCR`] slots.
    pub fn rgb_to_ycbcr(&mut self) -> &mut Self {
        #[rustfmt::skip]
        let m = ColorMatrix([
            0.299, 0.587, 0.114, 0.0, 0.0,
            -0.168736, -0.331264, 0.5, 0.0, 128.0,
            0.5, -0.418688, -0.081312, 0.0, 128.0,
            0.0, 0.0, 0.0, 1.0, 0.0,
        ]);
        self.set(m.rechannel(Channel::RGBA, Channel::YCBCR))
    }

    /// Convert JFIF YCbCr stored in the [`Channel::YCBCR`] slots back to RGB.
    pub fn ycbcr_to_rgb(&mut self) -> &mut Self {
        #[rustfmt::skip]
        let m = ColorMatrix([
            1.0, 0.0, 1.402, 0.0, -179.456,
            1.0, -0.34414, -0.71414, 0.0, 135.45984,
            1.0, 1.772, 0.0, 0.0, -226.816,
            0.0, 0.0, 0.0, 1.0, 0.0,
        ]);
        self.set(m.rechannel(Channel::YCBCR, Channel::RGBA))
    }

    /// Apply the matrix to every pixel in place.
    ///
    /// A disabled or no-op filter leaves the image untouched.
    pub fn apply(&self, image: &mut Rgba8Image) -> Result<(), FilterError> {
        let size = image.size();
        self.transform(image.as_slice_mut(), size)
    }

    /// Apply the filter in place to a raw RGBA buffer of the given size.
    ///
    /// # Errors
    ///
    /// Returns an error if `data.len() != width * height * 4`.
    pub fn apply_raw(&self, data: &mut [u8], width: usize, height: usize) -> Result<(), FilterError> {
        let size = ImageSize { width, height };
        if data.len() != size.area() * 4 {
            return Err(ImageError::InvalidChannelShape(data.len(), size.area() * 4).into());
        }
        self.transform(data, size)
    }

    fn transform(&self, data: &mut [u8], size: ImageSize) -> Result<(), FilterError> {
        let Some(matrix) = self.matrix.filter(|_| self.enabled) else {
            return Ok(());
        };
        log::trace!("color matrix on {} with {:?}", size, self.strategy);
        parallel::for_each_pixel_mut::<4, _>(self.strategy, data, size.width * 4, |px| {
            let out = matrix.transform_pixel([px[0], px[1], px[2], px[3]]);
            px.copy_from_slice(&out);
        })?;
        Ok(())
    }

    /// Externalize the filter configuration.
    pub fn serialize(&self) -> ColorMatrixParams {
        ColorMatrixParams {
            matrix: self.matrix,
        }
    }

    /// Restore a configuration produced by [`ColorMatrixFilter::serialize`].
    pub fn restore(&mut self, params: ColorMatrixParams) -> &mut Self {
        self.matrix = params.matrix;
        self
    }
}
