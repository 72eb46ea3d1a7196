#![warn(missing_docs)]

//! GPU dense dose-fluence assembly using wgpu compute shaders.
//!
//! One shader invocation per `(point, beamlet)` cell evaluates the same
//! culled kernel as the CPU paths. Device callability is a type-level
//! precondition: only surfaces implementing [`GpuExternalSurface`] (the
//! analytic constant and plane variants) and kernels implementing
//! [`GpuDoseKernel`] can use this back end. Arithmetic is `f32` on the
//! device and widened on readback, so agreement with the CPU back ends is
//! approximate, not bit-for-bit.

mod buffers;
mod context;
mod pipeline;
pub mod shaders;

pub use buffers::{GpuBeamlet, GpuDoseKernel, GpuExternalSurface, GpuPoint, GpuUniforms};
pub use context::{GpuContext, GpuError};
pub use pipeline::DosePipeline;

use raydose_beam::Beamlet;
use raydose_math::Point3;
use raydose_matrix::{
    AssemblyError, AssemblyOptions, DenseMatrix, DoseFluenceBackend, Result,
};

/// Dense matrix assembled on the GPU.
///
/// Wraps a column-major [`DenseMatrix`] filled by a compute dispatch. Use
/// it as the output type of `dose_fluence_matrix` with a GPU-capable
/// surface and kernel, then take the host matrix with
/// [`GpuDenseMatrix::into_dense`].
#[derive(Debug, Clone, PartialEq)]
pub struct GpuDenseMatrix {
    inner: DenseMatrix,
}

impl GpuDenseMatrix {
    /// The assembled host-side matrix.
    pub fn as_dense(&self) -> &DenseMatrix {
        &self.inner
    }

    /// Unwrap into the host-side matrix.
    pub fn into_dense(self) -> DenseMatrix {
        self.inner
    }
}

fn backend_err(e: GpuError) -> AssemblyError {
    AssemblyError::Backend(Box::new(e))
}

impl<S: GpuExternalSurface, K: GpuDoseKernel> DoseFluenceBackend<S, K> for GpuDenseMatrix {
    fn allocate(npoints: usize, nbeamlets: usize) -> Self {
        Self {
            inner: DenseMatrix::zeros(npoints, nbeamlets),
        }
    }

    fn shape(&self) -> (usize, usize) {
        (self.inner.nrows(), self.inner.ncols())
    }

    fn assemble(
        &mut self,
        points: &[Point3],
        beamlets: &[Beamlet],
        surface: &S,
        kernel: &K,
        options: &AssemblyOptions,
    ) -> Result<()> {
        let ctx = GpuContext::shared().map_err(backend_err)?;
        let pipeline = DosePipeline::new(ctx, kernel).map_err(backend_err)?;
        let values = pipeline
            .assemble(ctx, points, beamlets, surface, kernel, options.maxradius)
            .map_err(backend_err)?;

        log::debug!(
            "gpu dense assembly: {} x {} cells",
            points.len(),
            beamlets.len()
        );
        for (dst, &v) in self.inner.as_mut_slice().iter_mut().zip(values.iter()) {
            *dst = v as f64;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raydose_beam::DoseKernel;
    use raydose_math::Vec3;
    use raydose_matrix::dose_fluence_matrix;
    use raydose_surface::{ConstantSurface, ExternalSurface};

    /// Inverse-square kernel with matching CPU and WGSL definitions.
    struct InverseSquareKernel;

    impl DoseKernel for InverseSquareKernel {
        fn point_dose<S: ExternalSurface>(
            &self,
            pos: &Point3,
            beamlet: &Beamlet,
            _surface: &S,
        ) -> f64 {
            let r2 = (pos - beamlet.source_position).norm_squared();
            if r2 == 0.0 {
                return 0.0;
            }
            beamlet.source_axis_distance * beamlet.source_axis_distance / r2
        }
    }

    impl GpuDoseKernel for InverseSquareKernel {
        fn wgsl_source(&self) -> String {
            r#"
fn kernel_dose(pos: vec3<f32>, src: vec3<f32>, dir: vec3<f32>,
               sad: f32, ssd: f32, depth: f32) -> f32 {
    let r = pos - src;
    let r2 = dot(r, r);
    if (r2 == 0.0) {
        return 0.0;
    }
    return sad * sad / r2;
}
"#
            .to_string()
        }
    }

    #[test]
    #[ignore = "requires GPU"]
    fn test_gpu_matches_cpu_dense() {
        let beamlets: Vec<Beamlet> = (0..4)
            .map(|j| {
                Beamlet::new(
                    Point3::new(j as f64 * 50.0, 0.0, 1000.0),
                    Vec3::new(0.0, 0.0, -1.0),
                    1000.0,
                )
            })
            .collect();
        let points: Vec<Point3> = (0..200)
            .map(|i| Point3::new((i % 20) as f64 * 10.0, 0.0, (i / 20) as f64 * 5.0))
            .collect();
        let surface = ConstantSurface::new(950.0);
        let options = AssemblyOptions::with_maxradius(25.0);

        let gpu: GpuDenseMatrix = dose_fluence_matrix(
            &points,
            &beamlets,
            &surface,
            &InverseSquareKernel,
            &options,
        )
        .unwrap();
        let cpu: DenseMatrix = dose_fluence_matrix(
            &points,
            &beamlets,
            &surface,
            &InverseSquareKernel,
            &options,
        )
        .unwrap();

        for (a, b) in gpu.as_dense().as_slice().iter().zip(cpu.as_slice()) {
            assert!((a - b).abs() <= 1e-4 * b.abs().max(1.0), "{a} vs {b}");
        }
    }
}
