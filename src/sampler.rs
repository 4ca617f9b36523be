use nalgebra::Unit;

use crate::{
    error::{HeightFieldError, Result},
    types::{LatticePoint, Point, Real, Vector, Voxel},
    volume::Volume,
};

/// Orthonormal frame of a scanning plane, derived from the scan direction only.
///
/// Because the frame never depends on the plane origin, samplers placed at
/// `origin`, `origin + d`, `origin + 2d`, … trace parallel planes whose pixels
/// line up along `d`.
///
/// ```text
///  n  = d / |d|
///  h  = canonical axis with the smallest |n_i|   (x before y before z)
///  e1 = normalize(h - (h·n) n)
///  e2 = n × e1
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneBasis {
    direction: Vector,
    normal: Unit<Vector>,
    first_axis: Vector,
    second_axis: Vector,
}

impl PlaneBasis {
    /// Returns [`HeightFieldError::DegenerateDirection`] for a zero or non-finite `direction`.
    pub fn from_direction(direction: Vector) -> Result<Self> {
        if !direction.iter().all(|c| c.is_finite()) {
            return Err(HeightFieldError::DegenerateDirection);
        }
        let normal = Unit::try_new(direction, 0.0)
            .ok_or(HeightFieldError::DegenerateDirection)?;

        let mut helper_axis = 0;
        for i in 1..3 {
            if normal[i].abs() < normal[helper_axis].abs() {
                helper_axis = i;
            }
        }
        let mut helper = Vector::zeros();
        helper[helper_axis] = 1.0;

        let n = normal.into_inner();
        let first_axis = (helper - n * helper.dot(&n)).normalize();
        let second_axis = n.cross(&first_axis);

        Ok(Self {
            direction,
            normal,
            first_axis,
            second_axis,
        })
    }

    /// The scan step, as given (not normalized).
    pub fn direction(&self) -> Vector {
        self.direction
    }

    pub fn normal(&self) -> Unit<Vector> {
        self.normal
    }

    /// Axis followed by the raster `u` coordinate.
    pub fn first_axis(&self) -> Vector {
        self.first_axis
    }

    /// Axis followed by the raster `v` coordinate.
    pub fn second_axis(&self) -> Vector {
        self.second_axis
    }
}

/// Maps raster pixels `(u, v)` to lattice points on one scanning plane.
///
/// The raster centre `(⌊width/2⌋, ⌊height/2⌋)` lands on `origin`:
///
/// ```text
///  p(u, v) = origin + (u - ⌊width/2⌋)·e1 + (v - ⌊height/2⌋)·e2
/// ```
///
/// Lattice lookups round each component of `p` to the nearest integer
/// (halves away from zero).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObliquePlaneSampler {
    origin: Point,
    first_axis: Vector,
    second_axis: Vector,
    center_u: Real,
    center_v: Real,
}

impl ObliquePlaneSampler {
    pub fn new(origin: Point, basis: &PlaneBasis, width: usize, height: usize) -> Self {
        Self {
            origin,
            first_axis: basis.first_axis,
            second_axis: basis.second_axis,
            center_u: (width / 2) as Real,
            center_v: (height / 2) as Real,
        }
    }

    /// Sampler for depth step `k`, centred on `origin + direction·k`.
    ///
    /// The offset is a single multiply so every step is reproducible on its own.
    pub fn at_step(
        origin: LatticePoint,
        basis: &PlaneBasis,
        k: u32,
        width: usize,
        height: usize,
    ) -> Self {
        let base = Point::new(origin[0] as Real, origin[1] as Real, origin[2] as Real);
        Self::new(base + basis.direction * k as Real, basis, width, height)
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    /// Real-valued position of pixel `(u, v)`.
    #[inline]
    pub fn point(&self, u: usize, v: usize) -> Point {
        self.origin
            + self.first_axis * (u as Real - self.center_u)
            + self.second_axis * (v as Real - self.center_v)
    }

    /// Nearest lattice point to pixel `(u, v)`.
    #[inline]
    pub fn lattice_point(&self, u: usize, v: usize) -> LatticePoint {
        let p = self.point(u, v);
        [p.x.round() as i64, p.y.round() as i64, p.z.round() as i64]
    }
}

/// A 2D view of a [`Volume`] read through an [`ObliquePlaneSampler`].
#[derive(Debug, Clone, Copy)]
pub struct PlaneView<'a, V> {
    volume: &'a Volume<V>,
    sampler: ObliquePlaneSampler,
    width: usize,
    height: usize,
}

impl<'a, V: Voxel> PlaneView<'a, V> {
    pub fn new(volume: &'a Volume<V>, sampler: ObliquePlaneSampler, width: usize, height: usize) -> Self {
        Self {
            volume,
            sampler,
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn sampler(&self) -> &ObliquePlaneSampler {
        &self.sampler
    }

    /// Volume value under pixel `(u, v)`, or `None` outside the volume domain.
    #[inline]
    pub fn get(&self, u: usize, v: usize) -> Option<V> {
        self.volume.get(self.sampler.lattice_point(u, v))
    }
}
