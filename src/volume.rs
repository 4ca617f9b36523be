use ndarray::Array3;

use crate::{
    error::{HeightFieldError, Result},
    types::{LatticePoint, Voxel},
};

/// An immutable 3D scalar field over the lattice `[0, X) × [0, Y) × [0, Z)`.
///
/// Values are stored as `values[[z, y, x]]`, the same plane-major order the
/// `.vol` payload uses.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume<V> {
    values: Array3<V>,
}

impl<V: Voxel> Volume<V> {
    /// Wraps an array already laid out as `[z, y, x]`.
    pub fn from_array(values: Array3<V>) -> Self {
        Self { values }
    }

    /// Wraps a flat buffer with x varying fastest, then y, then z.
    ///
    /// Returns [`HeightFieldError::InvalidRaster`] if `data.len() != size_x * size_y * size_z`.
    pub fn from_raw(size_x: usize, size_y: usize, size_z: usize, data: Vec<V>) -> Result<Self> {
        let values = Array3::from_shape_vec((size_z, size_y, size_x), data)
            .map_err(|_| HeightFieldError::InvalidRaster)?;
        Ok(Self { values })
    }

    /// Creates a volume of the given size with every voxel set to `value`.
    pub fn filled(size_x: usize, size_y: usize, size_z: usize, value: V) -> Self {
        Self {
            values: Array3::from_elem((size_z, size_y, size_x), value),
        }
    }

    /// Fills a new volume by evaluating `function(x, y, z)` at every lattice point.
    pub fn from_fn<F>(size_x: usize, size_y: usize, size_z: usize, mut function: F) -> Self
    where
        F: FnMut(usize, usize, usize) -> V,
    {
        Self {
            values: Array3::from_shape_fn((size_z, size_y, size_x), |(z, y, x)| function(x, y, z)),
        }
    }

    /// Extent along X, Y and Z.
    pub fn dims(&self) -> [usize; 3] {
        let (size_z, size_y, size_x) = self.values.dim();
        [size_x, size_y, size_z]
    }

    pub fn contains(&self, p: LatticePoint) -> bool {
        let dims = self.dims();
        p.iter()
            .zip(dims.iter())
            .all(|(&c, &size)| c >= 0 && (c as u64) < size as u64)
    }

    /// Returns the value at `p`, or `None` when `p` lies outside the domain.
    #[inline]
    pub fn get(&self, p: LatticePoint) -> Option<V> {
        if !self.contains(p) {
            return None;
        }
        let [x, y, z] = p;
        Some(self.values[[z as usize, y as usize, x as usize]])
    }

    /// Underlying storage, indexed `[z, y, x]`.
    pub fn values(&self) -> &Array3<V> {
        &self.values
    }
}
