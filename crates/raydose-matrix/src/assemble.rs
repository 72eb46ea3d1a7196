//! Back-end selection and the assembly entry points.

use raydose_beam::{Beamlet, DoseKernel};
use raydose_math::Point3;
use raydose_surface::ExternalSurface;
use serde::{Deserialize, Serialize};

use crate::{AssemblyError, Result};

/// Options shared by every assembly back end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssemblyOptions {
    /// Radius of the culling cone at the isocenter plane (mm). The cone
    /// half-angle tangent of beamlet `j` is `maxradius / SAD_j`.
    pub maxradius: f64,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self { maxradius: 100.0 }
    }
}

impl AssemblyOptions {
    /// Options with an explicit culling radius.
    pub fn with_maxradius(maxradius: f64) -> Self {
        Self { maxradius }
    }
}

/// A matrix type that can be filled from (points, beamlets, surface,
/// kernel).
///
/// The back end is chosen at compile time by the output type; all back
/// ends share only the shape precondition. Implementations must yield
/// exactly zero for culled pairs without invoking the kernel, and must be
/// deterministic: output positions never depend on thread scheduling.
pub trait DoseFluenceBackend<S: ExternalSurface, K: DoseKernel>: Sized {
    /// Allocate an empty matrix shaped `(npoints, nbeamlets)`.
    fn allocate(npoints: usize, nbeamlets: usize) -> Self;

    /// Shape as `(rows, cols)`.
    fn shape(&self) -> (usize, usize);

    /// Fill the matrix. The shape is guaranteed by the caller to match
    /// `(points.len(), beamlets.len())`.
    fn assemble(
        &mut self,
        points: &[Point3],
        beamlets: &[Beamlet],
        surface: &S,
        kernel: &K,
        options: &AssemblyOptions,
    ) -> Result<()>;
}

/// Assemble a dose-fluence matrix, allocating the output.
///
/// The back end is selected by the returned matrix type:
/// [`crate::SparseCscMatrix`], [`crate::DenseMatrix`], or the GPU matrix
/// from `raydose-gpu`.
pub fn dose_fluence_matrix<M, S, K>(
    points: &[Point3],
    beamlets: &[Beamlet],
    surface: &S,
    kernel: &K,
    options: &AssemblyOptions,
) -> Result<M>
where
    M: DoseFluenceBackend<S, K>,
    S: ExternalSurface,
    K: DoseKernel,
{
    let mut matrix = M::allocate(points.len(), beamlets.len());
    matrix.assemble(points, beamlets, surface, kernel, options)?;
    Ok(matrix)
}

/// Assemble into a caller-owned matrix.
///
/// Fails with [`AssemblyError::ShapeMismatch`] unless the matrix shape is
/// `(points.len(), beamlets.len())`.
pub fn dose_fluence_matrix_into<M, S, K>(
    matrix: &mut M,
    points: &[Point3],
    beamlets: &[Beamlet],
    surface: &S,
    kernel: &K,
    options: &AssemblyOptions,
) -> Result<()>
where
    M: DoseFluenceBackend<S, K>,
    S: ExternalSurface,
    K: DoseKernel,
{
    let (rows, cols) = matrix.shape();
    if (rows, cols) != (points.len(), beamlets.len()) {
        return Err(AssemblyError::ShapeMismatch {
            rows,
            cols,
            npoints: points.len(),
            nbeamlets: beamlets.len(),
        });
    }
    matrix.assemble(points, beamlets, surface, kernel, options)
}
