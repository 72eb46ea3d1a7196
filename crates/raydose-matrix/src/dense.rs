//! Dense column-major dose-fluence matrix.

use rayon::prelude::*;
use raydose_beam::{point_dose, Beamlet, DoseKernel};
use raydose_math::Point3;
use raydose_surface::ExternalSurface;
use serde::{Deserialize, Serialize};

use crate::assemble::{AssemblyOptions, DoseFluenceBackend};
use crate::{AssemblyError, Result};

/// A dense matrix in column-major order.
///
/// Column-major matches the sparse CSC layout, so a column is a contiguous
/// slice in both back ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseMatrix {
    nrows: usize,
    ncols: usize,
    data: Vec<f64>,
}

impl DenseMatrix {
    /// Create a zero matrix of the given shape.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            data: vec![0.0; nrows * ncols],
        }
    }

    /// Number of rows (dose points).
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns (beamlets).
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Value at `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[col * self.nrows + row]
    }

    /// Column `col` as a contiguous slice.
    pub fn column(&self, col: usize) -> &[f64] {
        &self.data[col * self.nrows..(col + 1) * self.nrows]
    }

    /// The backing column-major storage.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Mutable backing storage, column-major. Used by back ends that fill
    /// the matrix externally (e.g. a GPU readback).
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Dose distribution for a fluence vector: `dose = D * fluence`.
    pub fn apply(&self, fluence: &[f64]) -> Result<Vec<f64>> {
        if fluence.len() != self.ncols {
            return Err(AssemblyError::FluenceLength {
                got: fluence.len(),
                expected: self.ncols,
            });
        }
        let mut dose = vec![0.0; self.nrows];
        for (col, &w) in fluence.iter().enumerate() {
            for (d, &v) in dose.iter_mut().zip(self.column(col)) {
                *d += w * v;
            }
        }
        Ok(dose)
    }
}

impl<S: ExternalSurface, K: DoseKernel> DoseFluenceBackend<S, K> for DenseMatrix {
    fn allocate(npoints: usize, nbeamlets: usize) -> Self {
        Self::zeros(npoints, nbeamlets)
    }

    fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// Parallel fill over columns; every cell independently evaluates the
    /// culled kernel wrapper, so culled cells store exactly zero. No
    /// allocation happens after the matrix is sized.
    fn assemble(
        &mut self,
        points: &[Point3],
        beamlets: &[Beamlet],
        surface: &S,
        kernel: &K,
        options: &AssemblyOptions,
    ) -> Result<()> {
        if self.nrows == 0 || self.ncols == 0 {
            return Ok(());
        }
        let nrows = self.nrows;
        self.data
            .par_chunks_mut(nrows)
            .enumerate()
            .for_each(|(j, col)| {
                let beamlet = &beamlets[j];
                for (i, pos) in points.iter().enumerate() {
                    col[i] = point_dose(pos, beamlet, surface, kernel, options.maxradius);
                }
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros_shape() {
        let m = DenseMatrix::zeros(3, 2);
        assert_eq!(m.nrows(), 3);
        assert_eq!(m.ncols(), 2);
        assert_eq!(m.as_slice().len(), 6);
        assert!(m.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_column_major_layout() {
        let mut m = DenseMatrix::zeros(2, 2);
        m.as_mut_slice().copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(m.get(0, 0), 1.0);
        assert_eq!(m.get(1, 0), 2.0);
        assert_eq!(m.get(0, 1), 3.0);
        assert_eq!(m.get(1, 1), 4.0);
        assert_eq!(m.column(1), &[3.0, 4.0]);
    }

    #[test]
    fn test_apply() {
        let mut m = DenseMatrix::zeros(2, 3);
        m.as_mut_slice()
            .copy_from_slice(&[1.0, 0.0, 0.0, 2.0, 3.0, 1.0]);
        let dose = m.apply(&[1.0, 1.0, 2.0]).unwrap();
        assert_eq!(dose, vec![1.0 + 6.0, 2.0 + 2.0]);
    }

    #[test]
    fn test_apply_length_mismatch() {
        let m = DenseMatrix::zeros(2, 3);
        assert!(matches!(
            m.apply(&[1.0]),
            Err(AssemblyError::FluenceLength { got: 1, expected: 3 })
        ));
    }
}
