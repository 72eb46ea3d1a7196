#![warn(missing_docs)]

//! Math types for the raydose dose calculation library.
//!
//! Thin wrappers around nalgebra providing the few geometric types dose
//! assembly needs: points, vectors, directions, and running bounds. All
//! lengths are in millimeters, and a query ray spans roughly a meter
//! (source to patient), which is what sets the tolerance constants below.

use serde::{Deserialize, Serialize};

/// A point in 3D space (IEC fixed frame, mm).
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = nalgebra::Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = nalgebra::Unit<nalgebra::Vector3<f64>>;

/// Guard for near-zero ray denominators (ray parallel to a plane,
/// degenerate triangle determinant).
///
/// A unit direction against geometry within a few meters keeps the
/// denominator well above this unless the configuration is genuinely
/// parallel.
pub const PARALLEL_EPS: f64 = 1e-12;

/// Convergence tolerance for root finds in the unit parameter of a
/// source-to-point ray. At meter-scale ray lengths this resolves the skin
/// crossing to well under a micrometer.
pub const RAY_ROOT_EPS: f64 = 1e-10;

/// Compare two distances accumulated along source-to-point rays (mm).
///
/// Relative to the larger magnitude, with an absolute floor of a nanometer
/// so distances at the isocenter (near zero) still compare equal.
pub fn distances_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

/// Axis-aligned bounds of a point set, kept as componentwise running
/// minima and maxima.
///
/// Used for BVH nodes, mesh extents, and the dose-grid domain. Starts
/// inverted ([`Aabb3::empty`]) so the first [`Aabb3::grow`] snaps both
/// corners onto the point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Aabb3 {
    /// Bounds with explicit corners.
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// The identity under [`Aabb3::grow`]: every point tightens it.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Bounds of a point cloud.
    pub fn from_points<'a, I>(points: I) -> Self
    where
        I: IntoIterator<Item = &'a Point3>,
    {
        let mut bounds = Self::empty();
        for p in points {
            bounds.grow(p);
        }
        bounds
    }

    /// Widen the bounds to cover `p`.
    pub fn grow(&mut self, p: &Point3) {
        self.min = Point3::from(self.min.coords.inf(&p.coords));
        self.max = Point3::from(self.max.coords.sup(&p.coords));
    }

    /// True until the first [`Aabb3::grow`].
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    /// Midpoint of the two corners.
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Extent along each axis, zero when empty.
    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::zeros()
        } else {
            self.max - self.min
        }
    }
}
