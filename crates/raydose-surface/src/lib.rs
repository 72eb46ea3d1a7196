#![warn(missing_docs)]

//! External (patient) surface models for raydose.
//!
//! A dose kernel needs two geometric inputs per (point, source) pair: the
//! source-surface distance (SSD), measured from the source to the patient
//! skin along the ray to the point, and the depth of the point below the
//! skin along the same ray. This crate defines the query contract and five
//! surface representations:
//!
//! - [`ConstantSurface`] - fixed SSD, for tests and water-tank setups
//! - [`PlaneSurface`] - plane at fixed distance along the source-isocenter ray
//! - [`MeshSurface`] - triangle mesh, BVH-accelerated
//! - [`LinearSurface`] - per-degree tangent planes interpolated on gantry angle
//! - [`CylindricalSurface`] - height field around the patient axis
//!
//! Sentinel values: mesh and cylindrical queries return `+inf` when the ray
//! never crosses the surface; the linear query returns `NaN` when the ray is
//! parallel to the interpolated plane. Kernels must tolerate both (the usual
//! policy is zero dose).

mod cylindrical;
mod grid;
mod linear;
mod mesh;
mod plane;

pub use cylindrical::CylindricalSurface;
pub use grid::DoseGrid;
pub use linear::{LinearSurface, TangentPlane};
pub use mesh::MeshSurface;
pub use plane::PlaneSurface;

use raydose_math::{Aabb3, Point3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while constructing a surface.
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// A per-degree table did not have exactly 361 entries.
    #[error("expected 361 per-degree plane samples, got {0}")]
    BadTableLength(usize),
    /// An interpolation table had mismatched column lengths.
    #[error("interpolation table columns have mismatched lengths {0}, {1}, {2}")]
    MismatchedColumns(usize, usize, usize),
    /// An interpolation table needs at least two samples.
    #[error("interpolation table needs at least 2 samples, got {0}")]
    TooFewSamples(usize),
    /// Angles must be sorted ascending for interpolation.
    #[error("angle samples must be strictly increasing")]
    UnsortedAngles,
    /// Angle samples must lie in `[0, 360)`; the table wraps implicitly.
    #[error("angle sample {0} outside [0, 360)")]
    AngleOutOfRange(f64),
    /// The axial grid must be strictly increasing.
    #[error("y grid must be strictly increasing")]
    UnsortedYGrid,
    /// A height-field array had the wrong number of entries.
    #[error("height field has {got} entries, expected {expected}")]
    BadGridSize {
        /// Entries supplied.
        got: usize,
        /// Entries implied by the axis grids.
        expected: usize,
    },
    /// Grid spacing must be positive.
    #[error("grid spacing must be positive, got {0}")]
    BadSpacing(f64),
    /// Height-field construction needs a non-empty mesh.
    #[error("cannot build a surface from an empty mesh")]
    EmptyMesh,
}

/// Result type for surface construction.
pub type Result<T> = std::result::Result<T, SurfaceError>;

/// Source-surface distance and depth queries.
///
/// `depth` and `ssd` are tied by the identity
/// `depth(pos, src) + ssd(pos, src) = |pos - src|` whenever the SSD is
/// finite; the default `depth` implementation is that identity.
pub trait ExternalSurface: Send + Sync {
    /// Distance from `src` to the surface along the ray from `src` through
    /// `pos`.
    ///
    /// Returns `+inf` (mesh, cylindrical) or `NaN` (linear) when there is no
    /// surface along the ray; callers must treat both as "no skin crossing".
    fn ssd(&self, pos: &Point3, src: &Point3) -> f64;

    /// Distance from the skin entry point to `pos` along the ray from `src`.
    fn depth(&self, pos: &Point3, src: &Point3) -> f64 {
        (pos - src).norm() - self.ssd(pos, src)
    }
}

/// Inside/outside and bounding-box queries for surfaces that enclose a
/// volume, used to generate dose-point sets.
pub trait SurfaceBounds {
    /// True if `pos` lies inside the surface.
    fn isinside(&self, pos: &Point3) -> bool;

    /// Axis-aligned bounding box of the discretized surface.
    fn extent(&self) -> Aabb3;
}

/// A surface returning the same SSD for every query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstantSurface {
    /// The fixed source-surface distance (mm).
    pub source_surface_distance: f64,
}

impl ConstantSurface {
    /// Create a constant surface with the given SSD.
    pub fn new(source_surface_distance: f64) -> Self {
        Self {
            source_surface_distance,
        }
    }
}

impl ExternalSurface for ConstantSurface {
    fn ssd(&self, _pos: &Point3, _src: &Point3) -> f64 {
        self.source_surface_distance
    }
}
