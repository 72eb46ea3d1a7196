//! Compressed sparse column dose-fluence matrix and its three-pass
//! parallel assembly.

use rayon::prelude::*;
use raydose_beam::{in_cone, Beamlet, DoseKernel};
use raydose_math::Point3;
use raydose_surface::ExternalSurface;
use serde::{Deserialize, Serialize};

use crate::assemble::{AssemblyOptions, DoseFluenceBackend};
use crate::dense::DenseMatrix;
use crate::{AssemblyError, Result};

/// Flat nonzeros handed to one worker at a time in the value pass.
const VALUE_CHUNK: usize = 1024;

/// A sparse matrix in compressed sparse column format, 0-based.
///
/// `colptr` has `ncols + 1` monotone non-decreasing entries with
/// `colptr[0] = 0`; the row indices and values of column `j` live in
/// `rowval[colptr[j]..colptr[j + 1]]` and `nzval[...]`. Row indices within
/// a column are strictly increasing because points are visited in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseCscMatrix {
    nrows: usize,
    ncols: usize,
    colptr: Vec<usize>,
    rowval: Vec<usize>,
    nzval: Vec<f64>,
}

impl SparseCscMatrix {
    /// Create an empty matrix of the given shape (`nnz = 0`).
    pub fn empty(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            colptr: vec![0; ncols + 1],
            rowval: Vec::new(),
            nzval: Vec::new(),
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

    /// Number of stored nonzeros.
    pub fn nnz(&self) -> usize {
        self.rowval.len()
    }

    /// Column pointer array (`ncols + 1` entries, 0-based).
    pub fn colptr(&self) -> &[usize] {
        &self.colptr
    }

    /// Row index array, parallel to [`Self::nzval`].
    pub fn rowval(&self) -> &[usize] {
        &self.rowval
    }

    /// Stored values.
    pub fn nzval(&self) -> &[f64] {
        &self.nzval
    }

    /// Row indices and values of column `col`.
    pub fn column(&self, col: usize) -> (&[usize], &[f64]) {
        let range = self.colptr[col]..self.colptr[col + 1];
        (&self.rowval[range.clone()], &self.nzval[range])
    }

    /// Value at `(row, col)`; zero if the entry is not stored.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        let (rows, vals) = self.column(col);
        match rows.binary_search(&row) {
            Ok(k) => vals[k],
            Err(_) => 0.0,
        }
    }

    /// Densify into a [`DenseMatrix`] of the same shape.
    pub fn to_dense(&self) -> DenseMatrix {
        let mut dense = DenseMatrix::zeros(self.nrows, self.ncols);
        let data = dense.as_mut_slice();
        for col in 0..self.ncols {
            let (rows, vals) = self.column(col);
            for (&row, &v) in rows.iter().zip(vals) {
                data[col * self.nrows + row] = v;
            }
        }
        dense
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
            let (rows, vals) = self.column(col);
            for (&row, &v) in rows.iter().zip(vals) {
                dose[row] += w * v;
            }
        }
        Ok(dose)
    }
}

impl<S: ExternalSurface, K: DoseKernel> DoseFluenceBackend<S, K> for SparseCscMatrix {
    fn allocate(npoints: usize, nbeamlets: usize) -> Self {
        Self::empty(npoints, nbeamlets)
    }

    fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// Three passes, each parallel, sharing output memory without atomics:
    ///
    /// 1. count survivors per column into `colptr[j + 1]`, then prefix-sum
    ///    `colptr` serially;
    /// 2. re-run the cone test per column, appending row indices into the
    ///    column's now-disjoint slice of `rowval`;
    /// 3. walk the flat nonzero index in chunks and evaluate the kernel
    ///    into `nzval`, recovering the column with a running hint.
    ///
    /// Passes 1 and 2 must apply the identical predicate; output positions
    /// are fixed by the prefix sum, so results do not depend on thread
    /// scheduling.
    fn assemble(
        &mut self,
        points: &[Point3],
        beamlets: &[Beamlet],
        surface: &S,
        kernel: &K,
        options: &AssemblyOptions,
    ) -> Result<()> {
        let ncols = beamlets.len();
        let tan_half: Vec<f64> = beamlets
            .iter()
            .map(|b| options.maxradius / b.source_axis_distance)
            .collect();

        // Pass 1: column counts.
        self.colptr.clear();
        self.colptr.resize(ncols + 1, 0);
        self.colptr[1..]
            .par_iter_mut()
            .enumerate()
            .for_each(|(j, count)| {
                let b = &beamlets[j];
                *count = points
                    .iter()
                    .filter(|p| in_cone(&(**p - b.source_position), &b.direction, tan_half[j]))
                    .count();
            });

        // Serial in-place prefix sum; ncols is modest.
        for j in 0..ncols {
            self.colptr[j + 1] += self.colptr[j];
        }
        let nnz = self.colptr[ncols];

        self.rowval.clear();
        self.rowval.resize(nnz, 0);
        self.nzval.clear();
        self.nzval.resize(nnz, 0.0);

        // Pass 2: row indices, one disjoint slice per column.
        let colptr = &self.colptr;
        let mut column_slices: Vec<&mut [usize]> = Vec::with_capacity(ncols);
        let mut rest: &mut [usize] = &mut self.rowval;
        for j in 0..ncols {
            let (head, tail) = rest.split_at_mut(colptr[j + 1] - colptr[j]);
            column_slices.push(head);
            rest = tail;
        }
        column_slices
            .into_par_iter()
            .enumerate()
            .for_each(|(j, slice)| {
                let b = &beamlets[j];
                let mut k = 0;
                for (i, p) in points.iter().enumerate() {
                    if in_cone(&(*p - b.source_position), &b.direction, tan_half[j]) {
                        slice[k] = i;
                        k += 1;
                    }
                }
            });

        // Pass 3: values over the flat nonzero index. Within a chunk the
        // index advances monotonically, so the column lookup is a binary
        // search once per chunk and a sequential advance afterwards.
        let rowval = &self.rowval;
        self.nzval
            .par_chunks_mut(VALUE_CHUNK)
            .enumerate()
            .for_each(|(chunk, values)| {
                let n0 = chunk * VALUE_CHUNK;
                let mut j = colptr.partition_point(|&p| p <= n0) - 1;
                for (k, value) in values.iter_mut().enumerate() {
                    let n = n0 + k;
                    while colptr[j + 1] <= n {
                        j += 1;
                    }
                    let i = rowval[n];
                    *value = kernel.point_dose(&points[i], &beamlets[j], surface);
                }
            });

        log::debug!(
            "sparse dose-fluence assembly: {} x {}, {} nonzeros",
            self.nrows,
            self.ncols,
            nnz
        );
        Ok(())
    }
}
