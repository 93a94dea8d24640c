use std::fmt;

/// A numeric parameter fell outside the interval its consumer accepts.
#[derive(Debug)]
pub struct InvalidRange {
    pub(crate) min: f32,
    pub(crate) max: f32,
    pub(crate) value: f32,
    pub(crate) name: &'static str,
}

impl fmt::Display for InvalidRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' must lie within {}..{}, got {}",
            self.name, self.min, self.max, self.value
        )
    }
}

/// Everything that can go wrong while building or running a synthesis
/// session.
#[derive(Debug)]
pub enum Error {
    /// Decoding the sample or encoding the output through the image codecs
    /// failed
    Image(image::ImageError),
    /// A parameter fell outside its accepted interval
    InvalidRange(InvalidRange),
    /// The filesystem refused a read or write
    Io(std::io::Error),
    /// A patch was scored against a canvas region where nothing has been
    /// placed yet
    EmptyOverlap,
    /// Spectral matching was requested before every canvas pixel had been
    /// assigned a source patch
    IncompleteCanvas,
    /// There is no sample texture to synthesize from
    NoTexture,
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        // only the wrapped codec and io failures carry an underlying cause
        match self {
            Self::Image(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::InvalidRange(_)
            | Self::EmptyOverlap
            | Self::IncompleteCanvas
            | Self::NoTexture => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(err) => write!(f, "image codec: {}", err),
            Self::InvalidRange(range) => write!(f, "{}", range),
            Self::Io(err) => write!(f, "io: {}", err),
            Self::EmptyOverlap => write!(
                f,
                "the patch does not overlap any previously placed canvas pixel"
            ),
            Self::IncompleteCanvas => write!(
                f,
                "spectral matching requires a fully covered canvas; run the initial tiling first"
            ),
            Self::NoTexture => write!(
                f,
                "a sample texture must be provided before building the session"
            ),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Self::Image(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
