use derive_more::{Display, From};

pub type Result<T> = core::result::Result<T, HeightFieldError>;

#[derive(Debug, Display, From)]
#[display("{self:?}")]
pub enum HeightFieldError {
    /// Scan direction is the zero vector or has a non-finite component.
    DegenerateDirection,
    /// Requested raster has a zero width or height.
    EmptyRaster,
    /// Pixel buffer length does not match the raster shape.
    InvalidRaster,
    /// Malformed `.vol` header or payload.
    VolFormat(String),
    #[from]
    Io(std::io::Error),
    #[from]
    Image(image::ImageError),
}

impl std::error::Error for HeightFieldError {}
