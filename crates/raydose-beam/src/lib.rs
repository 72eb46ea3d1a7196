#![warn(missing_docs)]

//! Beamlet geometry, cone culling, and the dose kernel contract.
//!
//! A beamlet is an elementary radiation pencil: a virtual source position,
//! a unit direction through the beamlet axis, and the source-axis distance
//! (SAD). Everything else about its shape lives inside the dose kernel.
//!
//! The matrix assembly in `raydose-matrix` touches beamlets only through
//! the three attributes above and the conservative cone test [`in_cone`];
//! kernels are invoked solely through [`DoseKernel`].

mod jaws;

pub use jaws::Jaws;

use raydose_math::{Dir3, Point3, Vec3};
use raydose_surface::ExternalSurface;
use serde::{Deserialize, Serialize};

/// An elementary radiation pencil.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Beamlet {
    /// Position of the virtual source.
    pub source_position: Point3,
    /// Unit direction from the source through the beamlet axis.
    pub direction: Dir3,
    /// Distance from the source to the isocenter plane (mm), positive.
    pub source_axis_distance: f64,
}

impl Beamlet {
    /// Create a beamlet; the direction is normalized.
    pub fn new(source_position: Point3, direction: Vec3, source_axis_distance: f64) -> Self {
        Self {
            source_position,
            direction: Dir3::new_normalize(direction),
            source_axis_distance,
        }
    }

    /// Create a beamlet aimed from `source_position` at a target point on
    /// the isocenter plane. The SAD is the source-target distance.
    pub fn toward(source_position: Point3, target: Point3) -> Self {
        let axis = target - source_position;
        Self {
            source_position,
            direction: Dir3::new_normalize(axis),
            source_axis_distance: axis.norm(),
        }
    }
}

/// Conservative cone-of-influence test.
///
/// `r` is the vector from the beamlet source to the dose point, `axis` the
/// beamlet direction, and `tan_half_angle` the tangent of the cone half
/// angle (`maxradius / SAD`). Returns true iff
///
/// ```text
/// r . r < (r . axis)^2 * (1 + tan_half_angle^2)
/// ```
///
/// i.e. the perpendicular offset of the point from the beamlet axis stays
/// below `tan_half_angle` times its axial distance. The algebra also admits
/// points behind the source when `(r . axis)^2` dominates; kernels that
/// require `r . axis > 0` must enforce it themselves.
#[inline]
pub fn in_cone(r: &Vec3, axis: &Dir3, tan_half_angle: f64) -> bool {
    let ra = r.dot(axis.as_ref());
    r.dot(r) < ra * ra * (1.0 + tan_half_angle * tan_half_angle)
}

/// Pointwise dose evaluation.
///
/// The assembly passes treat the kernel as opaque: nothing is assumed about
/// continuity, positivity, or symmetry of the returned value. Kernels must
/// tolerate the no-surface sentinels (`+inf`, `NaN`) an
/// [`ExternalSurface`] query may produce; the usual policy is zero dose.
pub trait DoseKernel: Send + Sync {
    /// Dose contribution of `beamlet` at `pos` for unit fluence.
    fn point_dose<S: ExternalSurface>(
        &self,
        pos: &Point3,
        beamlet: &Beamlet,
        surface: &S,
    ) -> f64;
}

/// Culled kernel evaluation: exactly zero outside the beamlet's cone of
/// influence, without invoking the kernel; the kernel value inside.
///
/// `maxradius` is the cone radius at the isocenter plane, in the same
/// length units as the geometry.
#[inline]
pub fn point_dose<S: ExternalSurface, K: DoseKernel>(
    pos: &Point3,
    beamlet: &Beamlet,
    surface: &S,
    kernel: &K,
    maxradius: f64,
) -> f64 {
    let r = pos - beamlet.source_position;
    let tan_half_angle = maxradius / beamlet.source_axis_distance;
    if !in_cone(&r, &beamlet.direction, tan_half_angle) {
        return 0.0;
    }
    kernel.point_dose(pos, beamlet, surface)
}

#[cfg(test)]
mod tests {
    use super::*;
    use raydose_surface::ConstantSurface;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Kernel returning a constant and counting its invocations.
    struct CountingKernel {
        calls: AtomicUsize,
    }

    impl DoseKernel for CountingKernel {
        fn point_dose<S: ExternalSurface>(
            &self,
            _pos: &Point3,
            _beamlet: &Beamlet,
            _surface: &S,
        ) -> f64 {
            self.calls.fetch_add(1, Ordering::Relaxed);
            1.0
        }
    }

    fn axial_beamlet() -> Beamlet {
        Beamlet::new(
            Point3::new(0.0, 0.0, 1000.0),
            Vec3::new(0.0, 0.0, -1.0),
            1000.0,
        )
    }

    #[test]
    fn test_beamlet_normalizes_direction() {
        let b = Beamlet::new(Point3::origin(), Vec3::new(0.0, 0.0, -5.0), 1000.0);
        assert!((b.direction.norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_toward_sets_sad() {
        let b = Beamlet::toward(Point3::new(0.0, 0.0, 1000.0), Point3::new(30.0, 0.0, 0.0));
        assert!((b.source_axis_distance - f64::hypot(30.0, 1000.0)).abs() < 1e-9);
        let tip = b.source_position + b.source_axis_distance * b.direction.as_ref();
        assert!((tip - Point3::new(30.0, 0.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_in_cone_on_axis() {
        let b = axial_beamlet();
        let r = Point3::new(0.0, 0.0, 0.0) - b.source_position;
        assert!(in_cone(&r, &b.direction, 10.0 / 1000.0));
    }

    #[test]
    fn test_in_cone_boundary() {
        let b = axial_beamlet();
        let tan = 10.0 / 1000.0;
        // Offset just inside and just outside the cone radius at isocenter.
        let inside = Point3::new(9.99, 0.0, 0.0) - b.source_position;
        let outside = Point3::new(10.01, 0.0, 0.0) - b.source_position;
        assert!(in_cone(&inside, &b.direction, tan));
        assert!(!in_cone(&outside, &b.direction, tan));
    }

    #[test]
    fn test_in_cone_rejects_source_point() {
        // r = 0 fails the strict inequality.
        let b = axial_beamlet();
        assert!(!in_cone(&Vec3::zeros(), &b.direction, 0.1));
    }

    #[test]
    fn test_point_dose_culls_without_kernel_call() {
        let b = axial_beamlet();
        let surface = ConstantSurface::new(1000.0);
        let kernel = CountingKernel {
            calls: AtomicUsize::new(0),
        };

        let far = Point3::new(500.0, 0.0, 0.0);
        assert_eq!(point_dose(&far, &b, &surface, &kernel, 10.0), 0.0);
        assert_eq!(kernel.calls.load(Ordering::Relaxed), 0);

        let near = Point3::new(0.0, 0.0, 0.0);
        assert_eq!(point_dose(&near, &b, &surface, &kernel, 10.0), 1.0);
        assert_eq!(kernel.calls.load(Ordering::Relaxed), 1);
    }
}
