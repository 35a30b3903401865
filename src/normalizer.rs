use crate::error::ReconstructionError;
use crate::Real;
use na::{Point3, Vector3};
use parry::bounding_volume::Aabb;

/// Lower bound of the normalized coordinates.
pub const UNIT_MIN: Real = 0.05;
/// Upper bound of the normalized coordinates.
pub const UNIT_MAX: Real = 0.95;

/// Maps world-space points into a padded unit cube and back.
///
/// The cube is centered on the center of the points’ bounding box, and its side is the
/// largest extent of that box multiplied by a padding `scale`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct CoordinateNormalizer {
    center: Point3<Real>,
    extent: Real,
}

impl CoordinateNormalizer {
    /// Captures the normalization of the given points, padded by `scale`.
    ///
    /// Fails with [`ReconstructionError::DegenerateInput`] if all the points coincide.
    pub fn from_points(points: &[Point3<Real>], scale: Real) -> Result<Self, ReconstructionError> {
        if points.is_empty() {
            return Err(ReconstructionError::EmptyInput);
        }

        if !scale.is_finite() || scale <= 1.0 {
            return Err(ReconstructionError::InvalidParameter {
                name: "scale",
                value: scale,
            });
        }

        let aabb = Aabb::from_points(points);
        let center = aabb.center();
        let max_extent = aabb.extents().max();

        if max_extent <= Real::EPSILON * center.coords.amax().max(1.0) {
            return Err(ReconstructionError::DegenerateInput { extent: max_extent });
        }

        Ok(Self {
            center,
            extent: max_extent * scale,
        })
    }

    /// The center of the input bounding box.
    pub fn center(&self) -> &Point3<Real> {
        &self.center
    }

    /// The side length of the padded cube, in world units.
    pub fn extent(&self) -> Real {
        self.extent
    }

    /// Maps a world-space point into the unit cube, without clamping.
    pub fn normalize_unclamped(&self, pt: &Point3<Real>) -> Point3<Real> {
        Point3::from((pt - self.center) / self.extent + Vector3::repeat(0.5))
    }

    /// Maps a world-space point into `[UNIT_MIN, UNIT_MAX]³`.
    ///
    /// The clamp keeps every sample strictly inside the lattice so its eight
    /// interpolation corners and the finite-difference stencil around them exist.
    pub fn normalize(&self, pt: &Point3<Real>) -> Point3<Real> {
        self.normalize_unclamped(pt)
            .map(|e| e.clamp(UNIT_MIN, UNIT_MAX))
    }

    /// Maps a point of the unit cube back to world-space.
    ///
    /// This is the exact inverse of [`Self::normalize_unclamped`].
    pub fn denormalize(&self, unit: &Point3<Real>) -> Point3<Real> {
        self.center + (unit.coords - Vector3::repeat(0.5)) * self.extent
    }
}
