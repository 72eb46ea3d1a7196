#![warn(missing_docs)]

//! raydose - dose-fluence matrix assembly for radiotherapy dose calculation.
//!
//! Given dose-evaluation points, beamlets (pencil-like sources), an
//! external patient surface, and a pointwise dose kernel, raydose
//! assembles the matrix `D[i, j]` holding the dose contribution of beamlet
//! `j` at point `i`. Applied to a fluence vector, the matrix yields the
//! dose distribution; it is the central operator of inverse planning.
//!
//! Back ends share one entry point and are selected by the output type:
//! [`SparseCscMatrix`] (cone-culled, three parallel passes),
//! [`DenseMatrix`] (parallel CPU), and `GpuDenseMatrix` from the `gpu`
//! feature (wgpu compute).
//!
//! # Example
//!
//! ```rust,no_run
//! use raydose::{
//!     dose_fluence_matrix, AssemblyOptions, Beamlet, ConstantSurface, DoseKernel,
//!     ExternalSurface, Point3, SparseCscMatrix, Vec3,
//! };
//!
//! struct InverseSquare;
//!
//! impl DoseKernel for InverseSquare {
//!     fn point_dose<S: ExternalSurface>(&self, pos: &Point3, b: &Beamlet, _: &S) -> f64 {
//!         let r2 = (pos - b.source_position).norm_squared();
//!         if r2 == 0.0 { 0.0 } else { b.source_axis_distance.powi(2) / r2 }
//!     }
//! }
//!
//! let beamlets = vec![Beamlet::new(
//!     Point3::new(0.0, 0.0, 1000.0),
//!     Vec3::new(0.0, 0.0, -1.0),
//!     1000.0,
//! )];
//! let points = vec![Point3::new(0.0, 0.0, 0.0)];
//! let surface = ConstantSurface::new(950.0);
//!
//! let matrix: SparseCscMatrix = dose_fluence_matrix(
//!     &points, &beamlets, &surface, &InverseSquare, &AssemblyOptions::default(),
//! )
//! .unwrap();
//! let dose = matrix.apply(&[1.0]).unwrap();
//! ```

pub use raydose_math::{distances_equal, Aabb3, Dir3, Point3, Vec3};

pub use raydose_mesh::{centered_cube, Bvh, MeshError, Ray, TriangleMesh};

pub use raydose_surface::{
    ConstantSurface, CylindricalSurface, DoseGrid, ExternalSurface, LinearSurface, MeshSurface,
    PlaneSurface, SurfaceBounds, SurfaceError, TangentPlane,
};

pub use raydose_beam::{in_cone, point_dose, Beamlet, DoseKernel, Jaws};

pub use raydose_matrix::{
    dose_fluence_matrix, dose_fluence_matrix_into, AssemblyError, AssemblyOptions, DenseMatrix,
    DoseFluenceBackend, SparseCscMatrix,
};

#[cfg(feature = "gpu")]
pub use raydose_gpu::{
    DosePipeline, GpuContext, GpuDenseMatrix, GpuDoseKernel, GpuError, GpuExternalSurface,
};
