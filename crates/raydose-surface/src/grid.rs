//! Regular dose-point grids.
//!
//! Builds the ordered point set that becomes the row space of the
//! dose-fluence matrix: a regular lattice over a bounding box, optionally
//! restricted to the interior of a surface.

use raydose_math::{Aabb3, Point3, Vec3};

use crate::{Result, SurfaceBounds, SurfaceError};

/// A regular lattice of dose-evaluation points.
#[derive(Debug, Clone)]
pub struct DoseGrid {
    aabb: Aabb3,
    spacing: Vec3,
}

impl DoseGrid {
    /// Create a grid over `aabb` with per-axis spacing.
    pub fn new(aabb: Aabb3, spacing: Vec3) -> Result<Self> {
        for s in [spacing.x, spacing.y, spacing.z] {
            if !(s > 0.0) {
                return Err(SurfaceError::BadSpacing(s));
            }
        }
        Ok(Self { aabb, spacing })
    }

    /// All lattice points, x fastest, then y, then z.
    ///
    /// The iteration order is stable; it defines the row indices of any
    /// matrix assembled over these points.
    pub fn positions(&self) -> Vec<Point3> {
        let n = |lo: f64, hi: f64, step: f64| ((hi - lo) / step).floor() as usize + 1;
        if self.aabb.is_empty() {
            return Vec::new();
        }
        let (nx, ny, nz) = (
            n(self.aabb.min.x, self.aabb.max.x, self.spacing.x),
            n(self.aabb.min.y, self.aabb.max.y, self.spacing.y),
            n(self.aabb.min.z, self.aabb.max.z, self.spacing.z),
        );
        let mut points = Vec::with_capacity(nx * ny * nz);
        for iz in 0..nz {
            for iy in 0..ny {
                for ix in 0..nx {
                    points.push(Point3::new(
                        self.aabb.min.x + ix as f64 * self.spacing.x,
                        self.aabb.min.y + iy as f64 * self.spacing.y,
                        self.aabb.min.z + iz as f64 * self.spacing.z,
                    ));
                }
            }
        }
        points
    }

    /// Lattice points over the extent of `surface`, keeping only those
    /// inside it.
    pub fn points_within<S: SurfaceBounds>(surface: &S, spacing: Vec3) -> Result<Vec<Point3>> {
        let grid = Self::new(surface.extent(), spacing)?;
        Ok(grid
            .positions()
            .into_iter()
            .filter(|p| surface.isinside(p))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CylindricalSurface;

    #[test]
    fn test_positions_count_and_order() {
        let aabb = Aabb3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 1.0, 0.0));
        let grid = DoseGrid::new(aabb, Vec3::new(1.0, 1.0, 1.0)).unwrap();
        let pts = grid.positions();
        assert_eq!(pts.len(), 6);
        // x runs fastest
        assert_eq!(pts[0], Point3::new(0.0, 0.0, 0.0));
        assert_eq!(pts[1], Point3::new(1.0, 0.0, 0.0));
        assert_eq!(pts[3], Point3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_rejects_bad_spacing() {
        let aabb = Aabb3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        assert!(DoseGrid::new(aabb, Vec3::new(0.0, 1.0, 1.0)).is_err());
    }

    #[test]
    fn test_points_within_cylinder() {
        // Constant radius 5 around the y axis, y in [0, 10].
        let surf = CylindricalSurface::new(90.0, vec![0.0, 10.0], vec![5.0; 10]).unwrap();
        let pts = DoseGrid::points_within(&surf, Vec3::new(1.0, 1.0, 1.0)).unwrap();
        assert!(!pts.is_empty());
        for p in &pts {
            assert!(surf.isinside(p));
            assert!(p.x * p.x + p.z * p.z < 25.0);
        }
    }
}
