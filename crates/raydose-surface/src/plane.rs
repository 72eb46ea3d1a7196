//! Planar surface at a fixed distance along the source-isocenter ray.

use raydose_math::Point3;
use serde::{Deserialize, Serialize};

use crate::ExternalSurface;

/// A plane perpendicular to the source-isocenter ray at distance
/// `source_surface_distance` from the source.
///
/// The isocenter is the world origin, so the plane tilts with the source
/// position. For an off-axis point the SSD follows from similar triangles:
///
/// ```text
/// ssd(pos, src) = ssd0 * |src| * |src - pos| / (src . (src - pos))
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneSurface {
    /// Distance from the source to the plane along the central ray (mm).
    pub source_surface_distance: f64,
}

impl PlaneSurface {
    /// Create a plane surface with the given central-ray SSD.
    pub fn new(source_surface_distance: f64) -> Self {
        Self {
            source_surface_distance,
        }
    }
}

impl ExternalSurface for PlaneSurface {
    fn ssd(&self, pos: &Point3, src: &Point3) -> f64 {
        let s = src.coords;
        let d = src - pos;
        self.source_surface_distance * s.norm() * d.norm() / s.dot(&d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_central_axis() {
        let surf = PlaneSurface::new(1000.0);
        let src = Point3::new(0.0, 0.0, 1000.0);
        let pos = Point3::new(0.0, 0.0, 0.0);
        assert!((surf.ssd(&pos, &src) - 1000.0).abs() < 1e-10);
    }

    #[test]
    fn test_off_axis_hypotenuse() {
        // S3: src = (0,0,1000), pos = (10,0,0).
        let surf = PlaneSurface::new(1000.0);
        let src = Point3::new(0.0, 0.0, 1000.0);
        let pos = Point3::new(10.0, 0.0, 0.0);

        let expected = 1000.0 * f64::hypot(10.0, 1000.0) / 1000.0;
        assert!((surf.ssd(&pos, &src) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_depth_identity() {
        let surf = PlaneSurface::new(900.0);
        let src = Point3::new(0.0, 0.0, 1000.0);
        let pos = Point3::new(25.0, -10.0, 30.0);
        let ssd = surf.ssd(&pos, &src);
        let depth = surf.depth(&pos, &src);
        assert!((depth + ssd - (pos - src).norm()).abs() < 1e-9);
    }

    #[test]
    fn test_rotated_source() {
        // Source rotated to the x axis; central-axis point keeps ssd0.
        let surf = PlaneSurface::new(1000.0);
        let src = Point3::new(1000.0, 0.0, 0.0);
        let pos = Point3::new(0.0, 0.0, 0.0);
        assert!((surf.ssd(&pos, &src) - 1000.0).abs() < 1e-10);
    }
}
