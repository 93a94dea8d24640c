use crate::errors::Error;
use crate::texture::Texture;
use std::path::Path;

/// Where the sample texture comes from.
#[derive(Clone)]
pub enum ImageSource<'a> {
    /// An encoded image held in memory; any format
    /// `image::load_from_memory` understands
    Memory(&'a [u8]),
    /// An image file on disk, with the format inferred from its extension
    Path(&'a Path),
    /// A `DynamicImage` the caller has already decoded
    Image(image::DynamicImage),
}

impl<'a> From<image::DynamicImage> for ImageSource<'a> {
    fn from(img: image::DynamicImage) -> Self {
        ImageSource::Image(img)
    }
}

impl<'a, S> From<&'a S> for ImageSource<'a>
where
    S: AsRef<Path> + 'a,
{
    fn from(path: &'a S) -> Self {
        Self::Path(path.as_ref())
    }
}

fn decode(src: ImageSource<'_>) -> Result<image::DynamicImage, image::ImageError> {
    match src {
        ImageSource::Memory(data) => image::load_from_memory(data),
        ImageSource::Path(path) => image::open(path),
        ImageSource::Image(img) => Ok(img),
    }
}

/// Decodes an image source into an owned raw-RGB texture.
pub(crate) fn load_texture(src: ImageSource<'_>) -> Result<Texture, Error> {
    let img = decode(src)?;
    Ok(Texture::from_rgb8(img.to_rgb8()))
}
