#![warn(
    clippy::all,
    clippy::doc_markdown,
    clippy::dbg_macro,
    clippy::todo,
    clippy::empty_enum,
    clippy::enum_glob_use,
    clippy::mem_forget,
    clippy::use_self,
    clippy::filter_map_next,
    clippy::needless_continue,
    clippy::needless_borrow,
    rust_2018_idioms,
    future_incompatible,
    nonstandard_style
)]

//! `graphcut-synthesis` grows an arbitrarily large image out of a small
//! sample texture by repeatedly pasting offset copies of the sample and
//! hiding the overlap seams with a minimum-cost graph cut, following the
//! graph-cut texture synthesis approach of Kwatra et al.
//!
//! Each paste turns the overlap between the new patch and the existing
//! canvas into a flow network: seam links are priced by the RGB mismatch
//! across them, pre-existing seams keep their cost through dedicated seam
//! nodes, and a minimum s-t cut decides per pixel which source wins. Patch
//! locations are chosen by scoring every possible offset at once with an
//! FFT cross-correlation and drawing from a Boltzmann distribution over
//! the scores.
//!
//! First, build a [`Session`] via a [`SessionBuilder`], which follows the
//! builder pattern. Calling `build` loads the sample texture and checks the
//! parameters. [`Session::run`] then synthesizes an image and returns it as
//! a [`GeneratedImage`], which you can save, stream, or inspect.
//!
//! ## Usage
//!
//! ```no_run
//! // Create a new session with default parameters
//! let session = graphcut_synthesis::Session::builder()
//!     // Set some parameters
//!     .seed(10)
//!     .output_size(graphcut_synthesis::Dims::square(512))
//!     // Specify the sample texture
//!     .load_texture(&"imgs/peas.png")
//!     // Build the session
//!     .build().expect("failed to build session");
//!
//! // Generate a new image
//! let generated = session.run(None).expect("synthesis failed");
//!
//! // Save the generated image to disk
//! generated.save("peas_out.png").expect("failed to save generated image");
//! ```

mod canvas;
mod errors;
mod fft;
mod graph;
mod placer;
mod sampler;
mod texture;
mod utils;

use std::path::Path;
use std::rc::Rc;

use log::info;

pub use image;

pub use canvas::{Canvas, Patch, PatchId};
pub use errors::Error;
pub use placer::Placer;
pub use sampler::Sampler;
pub use texture::{Pixel, Texture};
pub use utils::ImageSource;

/// Simple dimensions struct
#[derive(Copy, Clone)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub struct Dims {
    pub width: u32,
    pub height: u32,
}

impl Dims {
    pub fn square(size: u32) -> Self {
        Self {
            width: size,
            height: size,
        }
    }

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// How each refinement pass picks the next patch offset.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Matching {
    /// Score every canvas offset at once through the FFT cross-correlation
    /// and draw one from the Boltzmann distribution over the scores.
    EntireFft,
    /// Brute-force SSD over `times` uniformly sampled canvas offsets.
    EntireRandom { times: u32 },
    /// Pick a random canvas window and the best of `times` texture
    /// alignments over it.
    SubPatch { times: u32 },
    /// Uniformly random placement with no scoring at all.
    Random,
}

struct Parameters {
    output_size: Dims,
    seed: Option<u64>,
    iterations: u32,
    matching: Matching,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            output_size: Dims::square(500),
            seed: Some(0),
            iterations: 30,
            matching: Matching::EntireFft,
        }
    }
}

/// Builds a [`Session`] by setting parameters and loading the sample
/// texture; calling `build` verifies that the inputs can produce a valid
/// synthesis run.
#[derive(Default)]
pub struct SessionBuilder<'a> {
    texture: Option<ImageSource<'a>>,
    params: Parameters,
}

impl<'a> SessionBuilder<'a> {
    /// Creates a new `SessionBuilder`, can also be created via
    /// `Session::builder()`
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sample texture the canvas is synthesized from.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// let session = graphcut_synthesis::Session::builder()
    ///     .load_texture(&"imgs/1.jpg")
    ///     .build().expect("failed to build session");
    /// ```
    pub fn load_texture<T: Into<ImageSource<'a>>>(mut self, texture: T) -> Self {
        self.texture = Some(texture.into());
        self
    }

    /// Specify size of the generated image.
    ///
    /// Default: 500x500
    pub fn output_size(mut self, dims: Dims) -> Self {
        self.params.output_size = dims;
        self
    }

    /// Makes the whole run deterministic: the same seed always reproduces
    /// the same output image.
    ///
    /// Default: 0
    pub fn seed(mut self, value: u64) -> Self {
        self.params.seed = Some(value);
        self
    }

    /// Seeds the run from the system entropy source instead of a fixed
    /// seed, so every run produces a different image.
    pub fn entropy_seed(mut self) -> Self {
        self.params.seed = None;
        self
    }

    /// The number of refinement passes placed after the initial tiling.
    ///
    /// Default: 30
    pub fn iterations(mut self, count: u32) -> Self {
        self.params.iterations = count;
        self
    }

    /// The offset search strategy used by the refinement passes.
    ///
    /// Default: [`Matching::EntireFft`]
    pub fn matching(mut self, matching: Matching) -> Self {
        self.params.matching = matching;
        self
    }

    /// Creates a `Session`, or returns an error if invalid parameters or
    /// an invalid texture were specified.
    pub fn build(self) -> Result<Session, Error> {
        self.check_parameters_validity()?;

        let src = match self.texture {
            Some(src) => src,
            None => return Err(Error::NoTexture),
        };
        let texture = utils::load_texture(src)?;
        if texture.width() == 0 || texture.height() == 0 {
            return Err(Error::InvalidRange(errors::InvalidRange {
                min: 1.0,
                max: f32::MAX,
                value: 0.0,
                name: "texture-size",
            }));
        }

        Ok(Session {
            texture: Rc::new(texture),
            params: self.params,
        })
    }

    fn check_parameters_validity(&self) -> Result<(), Error> {
        if self.params.output_size.width == 0 || self.params.output_size.height == 0 {
            return Err(Error::InvalidRange(errors::InvalidRange {
                min: 1.0,
                max: f32::MAX,
                value: 0.0,
                name: "output-size",
            }));
        }

        let times = match self.params.matching {
            Matching::EntireRandom { times } | Matching::SubPatch { times } => Some(times),
            _ => None,
        };
        if times == Some(0) {
            return Err(Error::InvalidRange(errors::InvalidRange {
                min: 1.0,
                max: 1024.0,
                value: 0.0,
                name: "times",
            }));
        }

        Ok(())
    }
}

/// Texture synthesis session.
///
/// Calling `run()` will generate a new image and return it, consuming the
/// session in the process. You can provide a [`SynthesisProgress`]
/// implementation to get an update with the canvas after every refinement
/// pass.
///
/// # Example
/// ```no_run
/// let session = graphcut_synthesis::Session::builder()
///     .seed(10)
///     .load_texture(&"imgs/1.jpg")
///     .build().expect("failed to build session");
///
/// let generated = session.run(None).expect("synthesis failed");
/// generated.save("generated.png").expect("failed to save image");
/// ```
pub struct Session {
    texture: Rc<Texture>,
    params: Parameters,
}

impl Session {
    /// Creates a new session with default parameters.
    pub fn builder<'a>() -> SessionBuilder<'a> {
        SessionBuilder::default()
    }

    /// Runs the synthesis and outputs a generated image: an initial tiling
    /// pass that covers the whole canvas, then the configured number of
    /// refinement passes.
    pub fn run(
        self,
        mut progress: Option<Box<dyn SynthesisProgress>>,
    ) -> Result<GeneratedImage, Error> {
        let mut rng = match self.params.seed {
            Some(seed) => Sampler::seeded(seed),
            None => Sampler::from_entropy(),
        };
        let mut canvas = Canvas::new(self.params.output_size.width, self.params.output_size.height);

        info!(
            "synthesizing a {}x{} canvas from a {}x{} sample, {} refinement passes ({:?})",
            canvas.width(),
            canvas.height(),
            self.texture.width(),
            self.texture.height(),
            self.params.iterations,
            self.params.matching,
        );

        Placer::init(&mut canvas, &self.texture, &mut rng);

        let total = self.params.iterations as usize;
        for iteration in 0..total {
            match self.params.matching {
                Matching::EntireFft => {
                    Placer::entire_matching(&mut canvas, &self.texture, &mut rng, false, 0)?
                }
                Matching::EntireRandom { times } => {
                    Placer::entire_matching(&mut canvas, &self.texture, &mut rng, true, times)?
                }
                Matching::SubPatch { times } => {
                    Placer::sub_patch_matching(&mut canvas, &self.texture, &mut rng, times)?
                }
                Matching::Random => Placer::random(&mut canvas, &self.texture, &mut rng),
            }

            if let Some(ref mut progress) = progress {
                progress.update(ProgressUpdate {
                    image: canvas.texture(),
                    total: ProgressStat {
                        current: iteration + 1,
                        total,
                    },
                });
            }
        }

        Ok(GeneratedImage {
            texture: canvas.into_texture(),
        })
    }
}

/// An image generated by a `Session::run()`
pub struct GeneratedImage {
    texture: Texture,
}

impl GeneratedImage {
    /// Saves the generated image to the specified path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        if let Some(parent_path) = path.parent() {
            std::fs::create_dir_all(parent_path)?;
        }

        self.texture.to_rgb8().save(path)?;
        Ok(())
    }

    /// Writes the generated image to the specified stream
    pub fn write<W: std::io::Write>(
        &self,
        writer: &mut W,
        fmt: image::ImageOutputFormat,
    ) -> Result<(), Error> {
        let dyn_img = image::DynamicImage::ImageRgb8(self.texture.to_rgb8());
        Ok(dyn_img.write_to(writer, fmt)?)
    }

    /// The generated pixels without any conversion.
    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    /// Returns the generated output image
    pub fn into_image(self) -> image::DynamicImage {
        image::DynamicImage::ImageRgb8(self.texture.to_rgb8())
    }
}

impl AsRef<Texture> for GeneratedImage {
    fn as_ref(&self) -> &Texture {
        &self.texture
    }
}

/// Helper struct for passing progress information to external callers
pub struct ProgressStat {
    /// The current amount of work that has been done
    pub current: usize,
    /// The total amount of work to do
    pub total: usize,
}

/// The current state of the synthesis run
pub struct ProgressUpdate<'a> {
    /// The canvas as synthesized so far
    pub image: &'a Texture,
    /// The refinement progress
    pub total: ProgressStat,
}

/// Allows the synthesis run to update external callers with the current
/// progress of the image generation
pub trait SynthesisProgress {
    fn update(&mut self, info: ProgressUpdate<'_>);
}

impl<G> SynthesisProgress for G
where
    G: FnMut(ProgressUpdate<'_>),
{
    fn update(&mut self, info: ProgressUpdate<'_>) {
        self(info)
    }
}
