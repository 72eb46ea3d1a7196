//! GPU buffer types and the device-callability contracts.
//!
//! The GPU path evaluates the same culled kernel as the CPU paths, but in
//! `f32` and inside a WGSL compute shader. A surface or kernel is usable
//! on the device only if it can describe itself to the shader: surfaces
//! pack into a type discriminant plus a fixed parameter block, kernels
//! contribute a WGSL function body plus a parameter block. Both are
//! compile-time bounds on the GPU back end, not runtime checks.

use bytemuck::{Pod, Zeroable};
use raydose_beam::{Beamlet, DoseKernel};
use raydose_math::Point3;
use raydose_surface::{ConstantSurface, ExternalSurface, PlaneSurface};

/// A dose point padded to 16 bytes for storage-buffer layout.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuPoint {
    /// Position, `w` unused.
    pub position: [f32; 4],
}

impl GpuPoint {
    /// Pack a point.
    pub fn from_point(p: &Point3) -> Self {
        Self {
            position: [p.x as f32, p.y as f32, p.z as f32, 0.0],
        }
    }
}

/// A beamlet packed into two vec4s.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuBeamlet {
    /// Source position, `w` unused.
    pub position: [f32; 4],
    /// Unit direction in `xyz`, SAD in `w`.
    pub direction: [f32; 4],
}

impl GpuBeamlet {
    /// Pack a beamlet.
    pub fn from_beamlet(b: &Beamlet) -> Self {
        Self {
            position: [
                b.source_position.x as f32,
                b.source_position.y as f32,
                b.source_position.z as f32,
                0.0,
            ],
            direction: [
                b.direction.x as f32,
                b.direction.y as f32,
                b.direction.z as f32,
                b.source_axis_distance as f32,
            ],
        }
    }
}

/// Uniform block shared by every dispatch.
///
/// Parameter blocks are vec4-aligned to satisfy WGSL uniform layout.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuUniforms {
    /// Number of dose points (rows).
    pub npoints: u32,
    /// Number of beamlets (columns).
    pub nbeamlets: u32,
    /// Culling cone radius at the isocenter plane.
    pub maxradius: f32,
    /// Surface type discriminant: 0 = constant, 1 = plane.
    pub surface_type: u32,
    /// Surface parameters, interpretation per type.
    pub surface_params: [[f32; 4]; 2],
    /// Kernel parameters, interpretation per kernel.
    pub kernel_params: [[f32; 4]; 2],
}

/// A surface the GPU back end can evaluate in-shader.
///
/// Only the analytic surfaces qualify; the mesh and height-field variants
/// embed traversal and root finding that the shader does not carry.
pub trait GpuExternalSurface: ExternalSurface {
    /// Type discriminant matching `surface_ssd` in the shader.
    fn surface_type(&self) -> u32;

    /// Parameter block, interpretation per type.
    fn surface_params(&self) -> [[f32; 4]; 2];
}

impl GpuExternalSurface for ConstantSurface {
    fn surface_type(&self) -> u32 {
        0
    }

    fn surface_params(&self) -> [[f32; 4]; 2] {
        [
            [self.source_surface_distance as f32, 0.0, 0.0, 0.0],
            [0.0; 4],
        ]
    }
}

impl GpuExternalSurface for PlaneSurface {
    fn surface_type(&self) -> u32 {
        1
    }

    fn surface_params(&self) -> [[f32; 4]; 2] {
        [
            [self.source_surface_distance as f32, 0.0, 0.0, 0.0],
            [0.0; 4],
        ]
    }
}

/// A kernel the GPU back end can evaluate in-shader.
///
/// `wgsl_source` must define
///
/// ```wgsl
/// fn kernel_dose(pos: vec3<f32>, src: vec3<f32>, dir: vec3<f32>,
///                sad: f32, ssd: f32, depth: f32) -> f32
/// ```
///
/// and may read `uniforms.kernel_params`. The function must compute the
/// same quantity as the CPU `point_dose` (up to `f32` rounding); the cone
/// cull happens outside it.
pub trait GpuDoseKernel: DoseKernel {
    /// WGSL source defining `kernel_dose`.
    fn wgsl_source(&self) -> String;

    /// Kernel parameter block for the uniform buffer.
    fn kernel_params(&self) -> [[f32; 4]; 2] {
        [[0.0; 4]; 2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raydose_math::Vec3;

    #[test]
    fn test_beamlet_packing() {
        let b = Beamlet::new(
            Point3::new(1.0, 2.0, 3.0),
            Vec3::new(0.0, 0.0, -2.0),
            1000.0,
        );
        let g = GpuBeamlet::from_beamlet(&b);
        assert_eq!(g.position[0], 1.0);
        assert_eq!(g.direction[2], -1.0);
        assert_eq!(g.direction[3], 1000.0);
    }

    #[test]
    fn test_uniforms_are_pod() {
        let u = GpuUniforms::zeroed();
        let bytes = bytemuck::bytes_of(&u);
        assert_eq!(bytes.len(), std::mem::size_of::<GpuUniforms>());
        assert_eq!(bytes.len() % 16, 0);
    }

    #[test]
    fn test_surface_discriminants_differ() {
        let c = ConstantSurface::new(900.0);
        let p = PlaneSurface::new(900.0);
        assert_ne!(c.surface_type(), p.surface_type());
        assert_eq!(c.surface_params()[0][0], 900.0);
    }
}
