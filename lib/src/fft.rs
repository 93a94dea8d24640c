//! 2-D radix-2 FFT over three independent color channels.
//!
//! The placement search needs the cross-correlation between the sample and
//! the canvas at every offset at once; that is one spectral product of the
//! flipped sample and the canvas, each zero-padded into a power-of-two grid.

use std::f64::consts::PI;
use std::ops::{Add, Mul, Sub};

use num_complex::Complex64;

use crate::texture::Texture;

/// One complex value per color channel.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) struct ComplexPixel {
    pub r: Complex64,
    pub g: Complex64,
    pub b: Complex64,
}

impl ComplexPixel {
    /// Sum of the real parts of the three channels.
    #[inline]
    pub fn real_sum(self) -> f64 {
        self.r.re + self.g.re + self.b.re
    }
}

impl Add for ComplexPixel {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self {
            r: self.r + rhs.r,
            g: self.g + rhs.g,
            b: self.b + rhs.b,
        }
    }
}

impl Sub for ComplexPixel {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self {
            r: self.r - rhs.r,
            g: self.g - rhs.g,
            b: self.b - rhs.b,
        }
    }
}

impl Mul for ComplexPixel {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self {
            r: self.r * rhs.r,
            g: self.g * rhs.g,
            b: self.b * rhs.b,
        }
    }
}

impl Mul<Complex64> for ComplexPixel {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Complex64) -> Self {
        Self {
            r: self.r * rhs,
            g: self.g * rhs,
            b: self.b * rhs,
        }
    }
}

impl Mul<f64> for ComplexPixel {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f64) -> Self {
        Self {
            r: self.r * rhs,
            g: self.g * rhs,
            b: self.b * rhs,
        }
    }
}

/// Smallest power of two >= `x`.
pub(crate) fn round_pow2(x: u32) -> u32 {
    let mut len = 1;
    while len < x {
        len *= 2;
    }
    len
}

/// A `width * height` buffer of [`ComplexPixel`]s with both dimensions
/// powers of two.
pub(crate) struct FourierGrid {
    width: usize,
    height: usize,
    data: Vec<ComplexPixel>,
}

impl FourierGrid {
    /// Embeds `texture` at the top-left corner of a zero grid.
    pub fn from_texture(texture: &Texture, width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0);
        assert!(width.is_power_of_two() && height.is_power_of_two());
        assert!(texture.width() as usize <= width && texture.height() as usize <= height);

        let mut data = vec![ComplexPixel::default(); width * height];
        for y in 0..texture.height() as usize {
            for x in 0..texture.width() as usize {
                let p = texture.pixel(x as u32, y as u32);
                data[y * width + x] = ComplexPixel {
                    r: Complex64::new(f64::from(p.r), 0.0),
                    g: Complex64::new(f64::from(p.g), 0.0),
                    b: Complex64::new(f64::from(p.b), 0.0),
                };
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize) -> ComplexPixel {
        debug_assert!(x < self.width && y < self.height);
        self.data[y * self.width + x]
    }

    pub fn forward(&mut self) {
        self.transform(false);
    }

    pub fn inverse(&mut self) {
        self.transform(true);
    }

    /// Element-wise spectral product of `other` into `self`.
    pub fn multiply(&mut self, other: &Self) {
        assert!(self.width == other.width && self.height == other.height);
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a = *a * *b;
        }
    }

    /// Radix-2 decimation-in-time, rows then columns. The inverse negates
    /// the twiddle's imaginary sign and rescales by `1 / (W * H)`.
    fn transform(&mut self, inverse: bool) {
        let (w, h) = (self.width, self.height);
        let sign = if inverse { -1.0 } else { 1.0 };

        // Bit-reversal permutation along each row.
        for row in 0..h {
            let base = row * w;
            let mut j = 0;
            for i in 1..w {
                let mut bit = w >> 1;
                while j & bit != 0 {
                    j ^= bit;
                    bit >>= 1;
                }
                j |= bit;
                if i < j {
                    self.data.swap(base + i, base + j);
                }
            }
        }

        // Bit-reversal permutation along each column.
        for col in 0..w {
            let mut j = 0;
            for i in 1..h {
                let mut bit = h >> 1;
                while j & bit != 0 {
                    j ^= bit;
                    bit >>= 1;
                }
                j |= bit;
                if i < j {
                    self.data.swap(i * w + col, j * w + col);
                }
            }
        }

        // Butterflies along rows.
        for row in 0..h {
            let base = row * w;
            let mut m = 2;
            while m <= w {
                let angle = 2.0 * PI / m as f64;
                let wn = Complex64::new(angle.cos(), sign * angle.sin());
                let mut i = 0;
                while i < w {
                    let mut wk = Complex64::new(1.0, 0.0);
                    for k in 0..m / 2 {
                        let lo = base + i + k;
                        let hi = lo + m / 2;
                        let t = self.data[hi] * wk;
                        let u = self.data[lo];
                        self.data[lo] = u + t;
                        self.data[hi] = u - t;
                        wk *= wn;
                    }
                    i += m;
                }
                m *= 2;
            }
        }

        // Butterflies along columns.
        for col in 0..w {
            let mut m = 2;
            while m <= h {
                let angle = 2.0 * PI / m as f64;
                let wn = Complex64::new(angle.cos(), sign * angle.sin());
                let mut i = 0;
                while i < h {
                    let mut wk = Complex64::new(1.0, 0.0);
                    for k in 0..m / 2 {
                        let lo = (i + k) * w + col;
                        let hi = (i + k + m / 2) * w + col;
                        let t = self.data[hi] * wk;
                        let u = self.data[lo];
                        self.data[lo] = u + t;
                        self.data[hi] = u - t;
                        wk *= wn;
                    }
                    i += m;
                }
                m *= 2;
            }
        }

        if inverse {
            let scale = 1.0 / (w * h) as f64;
            for p in self.data.iter_mut() {
                *p = *p * scale;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::texture::Pixel;

    fn max_channel_error(a: &FourierGrid, b: &FourierGrid) -> f64 {
        a.data
            .iter()
            .zip(b.data.iter())
            .map(|(x, y)| {
                let dr = (x.r - y.r).norm();
                let dg = (x.g - y.g).norm();
                let db = (x.b - y.b).norm();
                dr.max(dg).max(db)
            })
            .fold(0.0, f64::max)
    }

    #[test]
    fn round_pow2_rounds_up() {
        assert_eq!(round_pow2(1), 1);
        assert_eq!(round_pow2(2), 2);
        assert_eq!(round_pow2(3), 4);
        assert_eq!(round_pow2(5), 8);
        assert_eq!(round_pow2(17), 32);
    }

    #[test]
    fn forward_inverse_round_trip() {
        let mut texture = Texture::new(7, 3);
        for y in 0..3 {
            for x in 0..7 {
                texture.set(x, y, Pixel::new((x * 31 + y * 7) as u8, (x * 3) as u8, y as u8));
            }
        }
        let original = FourierGrid::from_texture(&texture, 8, 4);
        let mut grid = FourierGrid::from_texture(&texture, 8, 4);
        grid.forward();
        grid.inverse();
        assert!(max_channel_error(&grid, &original) < 1e-6);
    }

    #[test]
    fn impulse_transforms_to_constant_spectrum() {
        let mut texture = Texture::new(4, 4);
        texture.set(0, 0, Pixel::new(1, 0, 0));
        let original = FourierGrid::from_texture(&texture, 4, 4);
        let mut grid = FourierGrid::from_texture(&texture, 4, 4);
        grid.forward();
        for y in 0..4 {
            for x in 0..4 {
                let p = grid.at(x, y);
                assert!((p.r.norm() - 1.0).abs() < 1e-9);
                assert!(p.g.norm() < 1e-9);
                assert!(p.b.norm() < 1e-9);
            }
        }
        grid.inverse();
        assert!(max_channel_error(&grid, &original) < 1e-9);
    }

    // The spectral product of the flipped sample and the canvas, read out
    // at (W_s + u - 1, H_s + v - 1), equals the direct correlation
    // sum S(dx, dy) * C(u + dx, v + dy) over the clipped overlap.
    #[test]
    fn spectral_product_matches_direct_correlation() {
        let mut sample = Texture::new(3, 3);
        let mut canvas = Texture::new(6, 5);
        for y in 0..3 {
            for x in 0..3 {
                sample.set(x, y, Pixel::new((x * 50 + y * 20 + 5) as u8, (x * 9) as u8, 77));
            }
        }
        for y in 0..5 {
            for x in 0..6 {
                canvas.set(x, y, Pixel::new((x * 13 + y * 40) as u8, (200 - x * 11) as u8, (y * 17) as u8));
            }
        }

        let w = round_pow2(sample.width() + canvas.width()) as usize;
        let h = round_pow2(sample.height() + canvas.height()) as usize;
        let mut product = FourierGrid::from_texture(&sample.flip(), w, h);
        let mut spectrum = FourierGrid::from_texture(&canvas, w, h);
        product.forward();
        spectrum.forward();
        product.multiply(&spectrum);
        product.inverse();

        for v in 0..canvas.height() {
            for u in 0..canvas.width() {
                let ow = sample.width().min(canvas.width() - u);
                let oh = sample.height().min(canvas.height() - v);
                let mut direct = 0.0f64;
                for dy in 0..oh {
                    for dx in 0..ow {
                        let s = sample.pixel(dx, dy);
                        let c = canvas.pixel(u + dx, v + dy);
                        direct += f64::from(s.r) * f64::from(c.r)
                            + f64::from(s.g) * f64::from(c.g)
                            + f64::from(s.b) * f64::from(c.b);
                    }
                }
                let fft = product
                    .at(
                        (sample.width() + u - 1) as usize,
                        (sample.height() + v - 1) as usize,
                    )
                    .real_sum();
                let tolerance = 1e-3 * direct.abs().max(1.0);
                assert!(
                    (direct - fft).abs() < tolerance,
                    "offset ({}, {}): direct {} vs fft {}",
                    u,
                    v,
                    direct,
                    fft
                );
            }
        }
    }
}
