use serde::{Deserialize, Serialize};

/// Luma weights used by the desaturate, saturate, colorize, hue and threshold effects.
pub const LUMA: [f32; 3] = [0.3086, 0.6094, 0.0820];

/// A logical channel slot of an RGBA pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Red, sample 0.
    Red = 0,
    /// Green, sample 1.
    Green = 1,
    /// Blue, sample 2.
    Blue = 2,
    /// Alpha, sample 3.
    Alpha = 3,
}

impl Channel {
    /// Slot holding luma after an RGB to YCbCr conversion.
    pub const Y: Channel = Channel::Green;
    /// Slot holding the blue-difference chroma.
    pub const CB: Channel = Channel::Blue;
    /// Slot holding the red-difference chroma.
    pub const CR: Channel = Channel::Red;

    /// The identity slot assignment.
    pub const RGBA: [Channel; 4] = [Channel::Red, Channel::Green, Channel::Blue, Channel::Alpha];
    /// Slot assignment of a YCbCr pixel.
    pub const YCBCR: [Channel; 4] = [Channel::Y, Channel::CB, Channel::CR, Channel::Alpha];

    /// Sample index of the channel inside a pixel.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// A 4x5 affine color transform.
///
/// Row `i` computes output channel `i` (R, G, B, A) from the input samples
/// `R, G, B, A` and an additive bias: `out[i] = sum_c m[i*5+c] * in[c] + m[i*5+4]`.
/// The bias is expressed in sample units (0..255) and is not scaled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorMatrix(pub [f32; 20]);

impl Default for ColorMatrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<[f32; 20]> for ColorMatrix {
    fn from(values: [f32; 20]) -> Self {
        Self(values)
    }
}

impl ColorMatrix {
    /// The neutral transform: unit diagonal, zero bias.
    pub const fn identity() -> Self {
        #[rustfmt::skip]
        let m = [
            1.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0, 0.0,
        ];
        Self(m)
    }

    /// Build a matrix from a slice of exactly 20 values.
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        let values: [f32; 20] = values.try_into().ok()?;
        Some(Self(values))
    }

    /// The raw row-major values.
    pub fn as_array(&self) -> &[f32; 20] {
        &self.0
    }

    /// Coefficient of input column `col` (0..5, 4 is the bias) in output row `row`.
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.0[row * 5 + col]
    }

    /// Compose two transforms: the result applies `other` first, then `self`.
    ///
    /// The 4x4 part is the plain matrix product and the bias propagates
    /// through `self`: `bias[i] = self.bias[i] + sum_c self[i][c] * other.bias[c]`.
    pub fn multiply(&self, other: &ColorMatrix) -> ColorMatrix {
        let a = &self.0;
        let b = &other.0;
        let mut m = [0.0f32; 20];
        for i in 0..4 {
            let row = i * 5;
            for c in 0..4 {
                m[row + c] = a[row] * b[c]
                    + a[row + 1] * b[5 + c]
                    + a[row + 2] * b[10 + c]
                    + a[row + 3] * b[15 + c];
            }
            m[row + 4] = a[row + 4]
                + a[row] * b[4]
                + a[row + 1] * b[9]
                + a[row + 2] * b[14]
                + a[row + 3] * b[19];
        }
        ColorMatrix(m)
    }

    /// Element-wise `wa * self + wb * other`, used to cross-fade two effects.
    pub fn blend(&self, other: &ColorMatrix, wa: f32, wb: f32) -> ColorMatrix {
        let mut m = [0.0f32; 20];
        m.iter_mut()
            .zip(self.0.iter().zip(other.0.iter()))
            .for_each(|(m, (&a, &b))| *m = wa * a + wb * b);
        ColorMatrix(m)
    }

    /// Retarget a matrix written for logical channels onto concrete slots.
    ///
    /// Logical row `r` is stored in row `output[r]` and logical column `c`
    /// reads sample `input[c]`; the bias stays in column 4. Slots that no
    /// logical row or column maps to are zero.
    ///
    /// # Arguments
    ///
    /// * `input` - The sample slot read by each logical column.
    /// * `output` - The sample slot written by each logical row.
    pub fn rechannel(&self, input: [Channel; 4], output: [Channel; 4]) -> ColorMatrix {
        let mut m = [0.0f32; 20];
        for (r, out) in output.iter().enumerate() {
            let dst_row = out.index() * 5;
            let src_row = r * 5;
            for (c, inp) in input.iter().enumerate() {
                m[dst_row + inp.index()] = self.0[src_row + c];
            }
            m[dst_row + 4] = self.0[src_row + 4];
        }
        ColorMatrix(m)
    }

    /// Transform one RGBA pixel: clamp each output to `[0, 255]` and truncate.
    #[inline]
    pub fn transform_pixel(&self, px: [u8; 4]) -> [u8; 4] {
        let m = &self.0;
        let (r, g, b, a) = (px[0] as f32, px[1] as f32, px[2] as f32, px[3] as f32);
        let mut out = [0u8; 4];
        for (i, o) in out.iter_mut().enumerate() {
            let row = i * 5;
            let v = m[row] * r + m[row + 1] * g + m[row + 2] * b + m[row + 3] * a + m[row + 4];
            *o = v.clamp(0.0, 255.0) as u8;
        }
        out
    }
}

impl std::ops::Mul for ColorMatrix {
    type Output = ColorMatrix;

    fn mul(self, rhs: ColorMatrix) -> ColorMatrix {
        self.multiply(&rhs)
    }
}
