//! Patch placement strategies.
//!
//! `init` tiles the canvas until every pixel is covered; the refinement
//! passes then pick one offset per call, either by brute-force SSD over
//! random candidates or by scoring every offset at once with the FFT
//! cross-correlation and sampling from a Boltzmann distribution over the
//! match quality.

use std::rc::Rc;

use log::debug;

use crate::canvas::{Canvas, Patch};
use crate::errors::Error;
use crate::fft::{round_pow2, FourierGrid};
use crate::sampler::Sampler;
use crate::texture::Texture;

/// Boltzmann temperature factor for location sampling; bigger means more
/// randomness in the picked offsets.
const LOCATION_TEMPERATURE: f64 = 0.3;

/// 2-D inclusive prefix sums over the per-pixel channel sum-of-squares.
fn prefix_table(image: &Texture) -> Vec<u64> {
    let w = image.width() as usize;
    let h = image.height() as usize;
    let mut sum = vec![0u64; w * h];
    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            let up = if y > 0 { sum[i - w] } else { 0 };
            let left = if x > 0 { sum[i - 1] } else { 0 };
            let up_left = if x > 0 && y > 0 { sum[i - w - 1] } else { 0 };
            sum[i] = up + left + image.pixels()[i].sqr_sum() - up_left;
        }
    }
    sum
}

/// Rectangle query against a prefix table via inclusion-exclusion.
fn prefix_query(sum: &[u64], x: usize, y: usize, ww: usize, wh: usize, w: usize) -> u64 {
    let last_x = x + ww - 1;
    let last_y = y + wh - 1;
    let mut result = sum[last_y * w + last_x];
    if x > 0 && y > 0 {
        result += sum[(y - 1) * w + x - 1];
    }
    if x > 0 {
        result -= sum[last_y * w + x - 1];
    }
    if y > 0 {
        result -= sum[(y - 1) * w + last_x];
    }
    result
}

/// Inverse-CDF draw: the first index whose cumulative normalized weight
/// reaches `position`.
fn select_by_cdf(weights: &[f64], total: f64, position: f64) -> usize {
    let mut up = 0.0;
    for (i, weight) in weights.iter().enumerate() {
        let p = weight / total;
        if up + p >= position {
            return i;
        }
        up += p;
    }
    weights.len() - 1
}

/// Stateless placement operations; all randomness comes from the caller's
/// [`Sampler`].
pub struct Placer;

impl Placer {
    /// Tiles the canvas with patches stepped by random strides in
    /// `[extent/3, 2*extent/3]` until every pixel is covered.
    pub fn init(canvas: &mut Canvas, texture: &Rc<Texture>, rng: &mut Sampler) {
        let w = texture.width() as i32;
        let h = texture.height() as i32;
        let mut y = 0;
        while y < canvas.height() as i32 {
            let mut x = 0;
            while x < canvas.width() as i32 {
                canvas.apply(Patch::new(texture.clone(), x, y));
                x += rng.int_in(w / 3, 2 * w / 3).max(1);
            }
            y += rng.int_in(h / 3, 2 * h / 3).max(1);
        }
    }

    /// Baseline: one uniformly random offset within the texture extent.
    pub fn random(canvas: &mut Canvas, texture: &Rc<Texture>, rng: &mut Sampler) {
        let x = rng.int_in(0, texture.width() as i32 - 1);
        let y = rng.int_in(0, texture.height() as i32 - 1);
        canvas.apply(Patch::new(texture.clone(), x, y));
    }

    /// Places one patch anywhere on the canvas. With `random` set, the best
    /// of `times` uniform candidates wins by brute-force SSD; otherwise
    /// every offset is scored through the FFT path and one is drawn from
    /// the Boltzmann distribution over the scores.
    pub fn entire_matching(
        canvas: &mut Canvas,
        texture: &Rc<Texture>,
        rng: &mut Sampler,
        random: bool,
        times: u32,
    ) -> Result<(), Error> {
        if !random {
            return Self::spectral_matching(canvas, texture, rng);
        }

        let mut best: Option<(u64, Patch)> = None;
        for _ in 0..times {
            let x = rng.int_in(0, canvas.width() as i32 - 1);
            let y = rng.int_in(0, canvas.height() as i32 - 1);
            let patch = Patch::new(texture.clone(), x, y);
            let score = canvas.ssd(&patch)?;
            if best.as_ref().map_or(true, |(s, _)| score < *s) {
                best = Some((score, patch));
            }
        }
        if let Some((score, patch)) = best {
            debug!(
                "random matching chose ({}, {}) with ssd {}",
                patch.x(),
                patch.y(),
                score
            );
            canvas.apply(patch);
        }
        Ok(())
    }

    /// Picks a random sub-window of the canvas and the alignment of the
    /// texture over it that minimizes the windowed SSD.
    pub fn sub_patch_matching(
        canvas: &mut Canvas,
        texture: &Rc<Texture>,
        rng: &mut Sampler,
        times: u32,
    ) -> Result<(), Error> {
        let sub_w = (texture.width() as i32 / 3).max(1);
        let sub_h = (texture.height() as i32 / 3).max(1);
        let canvas_x = rng.int_in(0, canvas.width() as i32 - sub_w);
        let canvas_y = rng.int_in(0, canvas.height() as i32 - sub_h);

        let mut best: Option<(u64, Patch)> = None;
        for _ in 0..times {
            // align so the window maps into the texture
            let x = rng.int_in(0, texture.width() as i32 - sub_w);
            let y = rng.int_in(0, texture.height() as i32 - sub_h);
            let patch = Patch::new(texture.clone(), canvas_x - x, canvas_y - y);
            let score = canvas.ssd_window(&patch, canvas_x, canvas_y, sub_w, sub_h)?;
            if best.as_ref().map_or(true, |(s, _)| score < *s) {
                best = Some((score, patch));
            }
        }
        if let Some((score, patch)) = best {
            debug!(
                "sub-patch window ({}, {}) chose offset ({}, {}) with ssd {}",
                canvas_x,
                canvas_y,
                patch.x(),
                patch.y(),
                score
            );
            canvas.apply(patch);
        }
        Ok(())
    }

    fn spectral_matching(
        canvas: &mut Canvas,
        texture: &Rc<Texture>,
        rng: &mut Sampler,
    ) -> Result<(), Error> {
        let weights = Self::spectral_weights(canvas, texture)?;
        let cw = canvas.width() as usize;

        let total: f64 = weights.iter().sum();
        let index = if total > 0.0 {
            select_by_cdf(&weights, total, rng.unit())
        } else {
            // degenerate map, every offset is equally (un)likely
            rng.int_in(0, weights.len() as i32 - 1) as usize
        };
        let (x, y) = ((index % cw) as i32, (index / cw) as i32);
        debug!("spectral matching chose ({}, {})", x, y);
        canvas.apply(Patch::new(texture.clone(), x, y));
        Ok(())
    }

    /// Boltzmann weight `exp(-ssd / (k * var))` for every canvas offset,
    /// with the SSD assembled from two prefix-sum tables and one spectral
    /// cross-correlation:
    /// `ssd = sum S^2 + sum C^2 - 2 * sum S*C`, normalized by overlap area.
    fn spectral_weights(canvas: &Canvas, texture: &Rc<Texture>) -> Result<Vec<f64>, Error> {
        if !canvas.is_complete() {
            return Err(Error::IncompleteCanvas);
        }

        let tw = texture.width() as usize;
        let th = texture.height() as usize;
        let cw = canvas.width() as usize;
        let ch = canvas.height() as usize;

        let texture_sum = prefix_table(texture);
        let canvas_sum = prefix_table(canvas.texture());

        let dft_w = round_pow2(texture.width() + canvas.width()) as usize;
        let dft_h = round_pow2(texture.height() + canvas.height()) as usize;
        let mut correlation = FourierGrid::from_texture(&texture.flip(), dft_w, dft_h);
        let mut spectrum = FourierGrid::from_texture(canvas.texture(), dft_w, dft_h);
        correlation.forward();
        spectrum.forward();
        correlation.multiply(&spectrum);
        correlation.inverse();

        let scale = LOCATION_TEMPERATURE * texture.variance();
        let mut weights = vec![0.0f64; cw * ch];
        for y in 0..ch {
            for x in 0..cw {
                let ow = tw.min(cw - x);
                let oh = th.min(ch - y);
                let mut ssd = texture_sum[(oh - 1) * tw + ow - 1] as i64;
                ssd += prefix_query(&canvas_sum, x, y, ow, oh, cw) as i64;
                ssd -= (2.0 * correlation.at(tw + x - 1, th + y - 1).real_sum()).floor() as i64;
                // rounding in the spectral term can push an exact match a
                // hair below zero
                let ssd = (ssd.max(0) as u64) / (ow * oh) as u64;
                weights[y * cw + x] = if scale > 0.0 {
                    (-(ssd as f64) / scale).exp()
                } else if ssd == 0 {
                    1.0
                } else {
                    0.0
                };
            }
        }
        Ok(weights)
    }
}
