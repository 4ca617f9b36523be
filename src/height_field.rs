use std::path::Path;

use image::{EncodableLayout, ImageBuffer, Luma, Pixel, PixelWithColorType, Primitive};
use ndarray::{Array2, ArrayViewMut1, Axis};

use crate::{
    error::{HeightFieldError, Result},
    types::DepthValue,
};

/// One raster cell: the encoded depth plus whether a scan hit produced it.
///
/// `value == 0 && !filled` is the unfilled sentinel. Background fill writes a
/// value but leaves `filled` unset, so a background pixel that happens to equal
/// a real depth can still be told apart.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DepthPixel<T> {
    pub value: T,
    pub filled: bool,
}

impl<T: DepthValue> DepthPixel<T> {
    /// Writes `value` if this pixel has not been hit yet. Returns whether it wrote.
    #[inline]
    pub fn record_hit(&mut self, value: T) -> bool {
        if self.filled {
            return false;
        }
        self.value = value;
        self.filled = true;
        true
    }
}

/// The 2D depth raster produced by a scan.
///
/// Pixels are stored as `pixels[[v, u]]`: `width` columns along the sampler's
/// first axis and `height` rows along its second axis.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField<T> {
    pixels: Array2<DepthPixel<T>>,
}

impl<T: DepthValue> HeightField<T> {
    /// Allocates a raster with every pixel at the unfilled sentinel.
    ///
    /// Returns [`HeightFieldError::EmptyRaster`] if either side is zero.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(HeightFieldError::EmptyRaster);
        }
        Ok(Self {
            pixels: Array2::default((height, width)),
        })
    }

    pub fn width(&self) -> usize {
        self.pixels.ncols()
    }

    pub fn height(&self) -> usize {
        self.pixels.nrows()
    }

    /// Encoded depth at `(u, v)`; `0` when unfilled.
    pub fn get(&self, u: usize, v: usize) -> T {
        self.pixels[[v, u]].value
    }

    /// Whether a scan hit (not background fill) wrote pixel `(u, v)`.
    pub fn is_filled(&self, u: usize, v: usize) -> bool {
        self.pixels[[v, u]].filled
    }

    pub fn pixel(&self, u: usize, v: usize) -> DepthPixel<T> {
        self.pixels[[v, u]]
    }

    pub fn filled_count(&self) -> usize {
        self.pixels.iter().filter(|p| p.filled).count()
    }

    pub fn unfilled_count(&self) -> usize {
        self.pixels.len() - self.filled_count()
    }

    /// Sets every pixel still at the sentinel to `value`.
    ///
    /// Returns the number of pixels written. The filled mask is left untouched.
    pub fn fill_background(&mut self, value: T) -> usize {
        let mut written = 0;
        for pixel in self.pixels.iter_mut().filter(|p| !p.filled) {
            pixel.value = value;
            written += 1;
        }
        written
    }

    /// Encoded depths only, indexed `[v, u]`.
    pub fn values(&self) -> Array2<T> {
        self.pixels.map(|p| p.value)
    }

    /// Filled mask, indexed `[v, u]`.
    pub fn filled_mask(&self) -> Array2<bool> {
        self.pixels.map(|p| p.filled)
    }

    /// Rows of pixels, each row holding one `v` and all `u` in order.
    pub(crate) fn rows_mut(&mut self) -> ndarray::iter::AxisIterMut<'_, DepthPixel<T>, ndarray::Ix1> {
        self.pixels.axis_iter_mut(Axis(0))
    }
}

impl<T: DepthValue + Primitive> HeightField<T> {
    /// Grey-level image with pixel `(x = u, y = v)` holding the encoded depth.
    pub fn to_image(&self) -> Result<ImageBuffer<Luma<T>, Vec<T>>> {
        let data: Vec<T> = self.pixels.iter().map(|p| p.value).collect();
        ImageBuffer::from_raw(self.width() as u32, self.height() as u32, data)
            .ok_or(HeightFieldError::InvalidRaster)
    }

    /// Encodes the raster to `path`; the format follows the file extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()>
    where
        Luma<T>: PixelWithColorType + Pixel<Subpixel = T>,
        [T]: EncodableLayout,
    {
        self.to_image()?.save(path)?;
        Ok(())
    }
}

/// Row type handed to scan workers.
pub(crate) type PixelRow<'a, T> = ArrayViewMut1<'a, DepthPixel<T>>;
