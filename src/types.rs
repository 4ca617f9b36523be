use nalgebra::{Point3, Vector3};

/// Real scalar used for plane geometry.
pub type Real = f64;

/// A 3D point with [`Real`] components.
pub type Point = Point3<Real>;

/// A 3D vector with [`Real`] components.
pub type Vector = Vector3<Real>;

/// An integer lattice coordinate `[x, y, z]` inside (or near) a volume domain.
pub type LatticePoint = [i64; 3];

/// A voxel intensity that can be compared against integer thresholds.
///
/// Implemented for every primitive integer that widens losslessly into `i64`.
pub trait Voxel: Copy + Send + Sync + Into<i64> {}

impl<V> Voxel for V where V: Copy + Send + Sync + Into<i64> {}

/// A fixed-width unsigned pixel type a height field can be stored in.
///
/// `MAX` bounds the number of depth steps a scan may encode.
pub trait DepthValue: Copy + Send + Sync + Default + PartialEq + core::fmt::Debug {
    const MAX: u32;

    /// Narrows `value`, which must not exceed [`DepthValue::MAX`].
    fn from_depth(value: u32) -> Self;

    fn to_depth(self) -> u32;
}

impl DepthValue for u8 {
    const MAX: u32 = u8::MAX as u32;

    #[inline]
    fn from_depth(value: u32) -> Self {
        debug_assert!(value <= <Self as DepthValue>::MAX);
        value as u8
    }

    #[inline]
    fn to_depth(self) -> u32 {
        self as u32
    }
}

impl DepthValue for u16 {
    const MAX: u32 = u16::MAX as u32;

    #[inline]
    fn from_depth(value: u32) -> Self {
        debug_assert!(value <= <Self as DepthValue>::MAX);
        value as u16
    }

    #[inline]
    fn to_depth(self) -> u32 {
        self as u32
    }
}

/// Open intensity interval `(min, max)`: a voxel is a hit when `min < v < max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdWindow {
    pub min: i64,
    pub max: i64,
}

impl Default for ThresholdWindow {
    fn default() -> Self {
        Self { min: 128, max: 255 }
    }
}

impl ThresholdWindow {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn contains<V: Voxel>(&self, value: V) -> bool {
        let v: i64 = value.into();
        self.min < v && v < self.max
    }

    /// True when no integer intensity can fall strictly between the bounds.
    pub fn is_empty(&self) -> bool {
        self.max.saturating_sub(self.min) <= 1
    }
}
