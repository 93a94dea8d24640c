//! Owned raw-RGB pixel buffers, the currency of the whole synthesis pipeline.

/// A single 8-bit RGB pixel.
///
/// The layout is exactly 3 bytes so that a contiguous `W * H` slice of
/// `Pixel`s doubles as a raw RGB image buffer for encoding.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Pixel {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Euclidean RGB distance, truncated to an integer.
    #[inline]
    pub fn distance(self, other: Self) -> i64 {
        (self.distance_squared(other) as f64).sqrt() as i64
    }

    /// Squared RGB distance.
    #[inline]
    pub fn distance_squared(self, other: Self) -> u64 {
        let dr = i64::from(self.r) - i64::from(other.r);
        let dg = i64::from(self.g) - i64::from(other.g);
        let db = i64::from(self.b) - i64::from(other.b);
        (dr * dr + dg * dg + db * db) as u64
    }

    /// Sum of the squared channel values, used by the prefix-sum tables.
    #[inline]
    pub fn sqr_sum(self) -> u64 {
        let r = u64::from(self.r);
        let g = u64::from(self.g);
        let b = u64::from(self.b);
        r * r + g * g + b * b
    }
}

/// An owned row-major RGB image.
#[derive(Clone)]
pub struct Texture {
    width: u32,
    height: u32,
    data: Vec<Pixel>,
}

impl Texture {
    /// Creates a black texture of the given dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![Pixel::default(); (width as usize) * (height as usize)],
        }
    }

    pub fn from_rgb8(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        let data = img
            .into_raw()
            .chunks_exact(3)
            .map(|c| Pixel::new(c[0], c[1], c[2]))
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    pub fn to_rgb8(&self) -> image::RgbImage {
        let mut img = image::RgbImage::new(self.width, self.height);
        for (x, y, out) in img.enumerate_pixels_mut() {
            let p = self.pixel(x, y);
            *out = image::Rgb([p.r, p.g, p.b]);
        }
        img
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Pixel {
        debug_assert!(x < self.width && y < self.height);
        self.data[(y as usize) * (self.width as usize) + x as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, pixel: Pixel) {
        debug_assert!(x < self.width && y < self.height);
        self.data[(y as usize) * (self.width as usize) + x as usize] = pixel;
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.data
    }

    /// Mean over the pixel count of the per-pixel channel-summed squared
    /// deviation from the per-channel mean. A solid-color image has
    /// variance 0.
    pub fn variance(&self) -> f64 {
        let count = self.data.len() as f64;
        if self.data.is_empty() {
            return 0.0;
        }

        let (mut mr, mut mg, mut mb) = (0.0f64, 0.0f64, 0.0f64);
        for p in &self.data {
            mr += f64::from(p.r);
            mg += f64::from(p.g);
            mb += f64::from(p.b);
        }
        mr /= count;
        mg /= count;
        mb /= count;

        let mut total = 0.0f64;
        for p in &self.data {
            let dr = f64::from(p.r) - mr;
            let dg = f64::from(p.g) - mg;
            let db = f64::from(p.b) - mb;
            total += dr * dr + dg * dg + db * db;
        }
        total / count
    }

    /// Returns a new texture with `(x, y)` mapped to `(W-1-x, H-1-y)`,
    /// i.e. a 180 degree rotation. The FFT cross-correlation consumes the
    /// flipped sample so that the spectral product becomes a correlation
    /// rather than a convolution.
    pub fn flip(&self) -> Self {
        let mut flipped = Self::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                flipped.set(self.width - 1 - x, self.height - 1 - y, self.pixel(x, y));
            }
        }
        flipped
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pixel_distances() {
        let a = Pixel::new(0, 0, 0);
        let b = Pixel::new(3, 4, 0);
        assert_eq!(a.distance_squared(b), 25);
        assert_eq!(a.distance(b), 5);
        // 441.67.. truncates to 441
        assert_eq!(
            Pixel::new(0, 0, 0).distance(Pixel::new(255, 255, 255)),
            441
        );
        assert_eq!(Pixel::new(1, 2, 3).sqr_sum(), 1 + 4 + 9);
    }

    #[test]
    fn variance_of_gray_ramp() {
        let mut img = Texture::new(2, 2);
        img.set(0, 0, Pixel::new(0, 0, 0));
        img.set(1, 0, Pixel::new(10, 10, 10));
        img.set(0, 1, Pixel::new(20, 20, 20));
        img.set(1, 1, Pixel::new(30, 30, 30));
        // per-channel mean 15, squared deviations 225+25+25+225 per channel
        assert!((img.variance() - 375.0).abs() < 1e-9);
    }

    #[test]
    fn variance_of_solid_color_is_zero() {
        let mut img = Texture::new(4, 4);
        for y in 0..4 {
            for x in 0..4 {
                img.set(x, y, Pixel::new(255, 0, 0));
            }
        }
        assert_eq!(img.variance(), 0.0);
    }

    #[test]
    fn flip_reverses_both_axes() {
        let mut img = Texture::new(3, 2);
        for y in 0..2 {
            for x in 0..3 {
                img.set(x, y, Pixel::new((y * 3 + x) as u8, 0, 0));
            }
        }
        let flipped = img.flip();
        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(flipped.pixel(2 - x, 1 - y), img.pixel(x, y));
            }
        }
    }

    #[test]
    fn rgb8_round_trip() {
        let mut img = Texture::new(3, 3);
        for y in 0..3 {
            for x in 0..3 {
                img.set(x, y, Pixel::new(x as u8, y as u8, 42));
            }
        }
        let back = Texture::from_rgb8(img.to_rgb8());
        assert_eq!(back.width(), 3);
        assert_eq!(back.height(), 3);
        assert_eq!(back.pixels(), img.pixels());
    }
}
