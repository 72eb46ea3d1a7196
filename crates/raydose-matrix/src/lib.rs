#![warn(missing_docs)]

//! Dose-fluence matrix assembly for raydose.
//!
//! The dose-fluence matrix `D[i, j]` holds the dose contribution of beamlet
//! `j` at dose point `i` for unit fluence; applied to a fluence vector it
//! yields the dose distribution. The matrix is large but sparse: each
//! beamlet deposits dose only inside a narrow cone, so the assembly culls
//! (point, beamlet) pairs with a cheap cone test and evaluates the dose
//! kernel only on the survivors.
//!
//! Back ends:
//!
//! - [`SparseCscMatrix`] - compressed sparse column storage, assembled in
//!   three parallel passes without synchronization
//! - [`DenseMatrix`] - column-major dense storage, parallel over columns
//!
//! Both implement [`DoseFluenceBackend`]; the GPU back end lives in
//! `raydose-gpu` and plugs into the same trait. Select a back end by
//! choosing the output type:
//!
//! ```ignore
//! let m: SparseCscMatrix = dose_fluence_matrix(
//!     &points, &beamlets, &surface, &kernel, &AssemblyOptions::default(),
//! )?;
//! ```

mod assemble;
mod dense;
mod sparse;

pub use assemble::{
    dose_fluence_matrix, dose_fluence_matrix_into, AssemblyOptions, DoseFluenceBackend,
};
pub use dense::DenseMatrix;
pub use sparse::SparseCscMatrix;

use thiserror::Error;

/// Errors from matrix assembly and application.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// The output matrix shape does not match the inputs.
    #[error(
        "matrix shape ({rows}, {cols}) does not match inputs \
         ({npoints} points, {nbeamlets} beamlets)"
    )]
    ShapeMismatch {
        /// Matrix row count.
        rows: usize,
        /// Matrix column count.
        cols: usize,
        /// Number of dose points supplied.
        npoints: usize,
        /// Number of beamlets supplied.
        nbeamlets: usize,
    },
    /// A fluence vector has the wrong length.
    #[error("fluence vector length {got} does not match beamlet count {expected}")]
    FluenceLength {
        /// Length supplied.
        got: usize,
        /// Column count of the matrix.
        expected: usize,
    },
    /// A back end failed outside the core's control (e.g. GPU device loss).
    #[error("backend: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Result type for assembly operations.
pub type Result<T> = std::result::Result<T, AssemblyError>;
