//! Gantry-angle-interpolated tangent-plane surface.
//!
//! A rotating-gantry plan often carries one local skin plane per control
//! point. This surface stores a densified table of 361 tangent planes (one
//! per integer degree, both endpoints present and equal) and answers queries
//! by linear interpolation on the gantry angle of the source.

use raydose_math::{Point3, Vec3};
use serde::{Deserialize, Serialize};

use crate::{ExternalSurface, Result, SurfaceError};

/// A local tangent plane: a (not necessarily unit) normal and a point on
/// the plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TangentPlane {
    /// Plane normal.
    pub normal: Vec3,
    /// A point on the plane.
    pub point: Point3,
}

impl TangentPlane {
    /// Create a tangent plane from normal and point.
    pub fn new(normal: Vec3, point: Point3) -> Self {
        Self { normal, point }
    }
}

/// Number of per-degree samples, both endpoints included.
const N_SAMPLES: usize = 361;

/// A surface of per-degree tangent planes selected by gantry angle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSurface {
    planes: Vec<TangentPlane>,
}

/// Gantry angle of a source position in degrees, in `[0, 360)`.
///
/// Follows the IEC convention: zero with the source at `+z`, increasing
/// toward `+x`.
pub(crate) fn gantry_angle_deg(src: &Point3) -> f64 {
    src.x.atan2(src.z).to_degrees().rem_euclid(360.0)
}

impl LinearSurface {
    /// Create a surface from a densified per-degree table.
    ///
    /// The table must hold exactly 361 entries (0 deg through 360 deg
    /// inclusive); the last entry is forced equal to the first to close
    /// the table.
    pub fn new(mut planes: Vec<TangentPlane>) -> Result<Self> {
        if planes.len() != N_SAMPLES {
            return Err(SurfaceError::BadTableLength(planes.len()));
        }
        planes[N_SAMPLES - 1] = planes[0];
        Ok(Self { planes })
    }

    /// Create a surface from an irregular `(angle, normal, point)` table,
    /// linearly resampled onto the per-degree grid.
    ///
    /// Angles are in degrees in `[0, 360)` and must be strictly increasing;
    /// the table wraps around the 0/360 seam.
    pub fn from_samples(
        phis_deg: &[f64],
        normals: &[Vec3],
        points: &[Point3],
    ) -> Result<Self> {
        if phis_deg.len() != normals.len() || phis_deg.len() != points.len() {
            return Err(SurfaceError::MismatchedColumns(
                phis_deg.len(),
                normals.len(),
                points.len(),
            ));
        }
        if phis_deg.len() < 2 {
            return Err(SurfaceError::TooFewSamples(phis_deg.len()));
        }
        if phis_deg.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SurfaceError::UnsortedAngles);
        }
        let last = phis_deg[phis_deg.len() - 1];
        if phis_deg[0] < 0.0 {
            return Err(SurfaceError::AngleOutOfRange(phis_deg[0]));
        }
        if last >= 360.0 {
            return Err(SurfaceError::AngleOutOfRange(last));
        }

        // Pad with wrapped copies of the end samples so every integer
        // degree in [0, 360] falls inside a bracket.
        let n = phis_deg.len();
        let mut phis = Vec::with_capacity(n + 2);
        let mut planes = Vec::with_capacity(n + 2);
        phis.push(phis_deg[n - 1] - 360.0);
        planes.push(TangentPlane::new(normals[n - 1], points[n - 1]));
        for k in 0..n {
            phis.push(phis_deg[k]);
            planes.push(TangentPlane::new(normals[k], points[k]));
        }
        phis.push(phis_deg[0] + 360.0);
        planes.push(TangentPlane::new(normals[0], points[0]));

        let table = (0..N_SAMPLES)
            .map(|d| {
                let t = d as f64;
                let k = phis.partition_point(|&p| p <= t).clamp(1, phis.len() - 1) - 1;
                let frac = (t - phis[k]) / (phis[k + 1] - phis[k]);
                lerp_plane(&planes[k], &planes[k + 1], frac)
            })
            .collect();

        Self::new(table)
    }

    /// The interpolated tangent plane at a gantry angle in `[0, 360)`.
    fn plane_at(&self, phi_deg: f64) -> TangentPlane {
        let i0 = phi_deg.floor() as usize;
        let frac = phi_deg - i0 as f64;
        lerp_plane(&self.planes[i0], &self.planes[i0 + 1], frac)
    }
}

fn lerp_plane(a: &TangentPlane, b: &TangentPlane, frac: f64) -> TangentPlane {
    TangentPlane {
        normal: a.normal.lerp(&b.normal, frac),
        point: Point3::from(a.point.coords.lerp(&b.point.coords, frac)),
    }
}

impl ExternalSurface for LinearSurface {
    /// Intersects `src + lambda * (pos - src)` with the plane selected by
    /// the gantry angle of `src`. Returns `NaN` when the ray is parallel to
    /// the plane (unlike the mesh and cylindrical surfaces, which use
    /// `+inf` for their no-surface sentinel).
    fn ssd(&self, pos: &Point3, src: &Point3) -> f64 {
        let plane = self.plane_at(gantry_angle_deg(src));
        let denom = plane.normal.dot(&(pos - src));
        if denom == 0.0 {
            return f64::NAN;
        }
        let lambda = plane.normal.dot(&(plane.point - src)) / denom;
        lambda * (pos - src).norm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 361 copies of the z = 0 plane.
    fn flat_table() -> LinearSurface {
        let planes = vec![
            TangentPlane::new(Vec3::new(0.0, 0.0, 1.0), Point3::new(0.0, 0.0, 0.0));
            361
        ];
        LinearSurface::new(planes).unwrap()
    }

    #[test]
    fn test_new_rejects_wrong_length() {
        let planes =
            vec![TangentPlane::new(Vec3::new(0.0, 0.0, 1.0), Point3::new(0.0, 0.0, 0.0)); 360];
        assert!(matches!(
            LinearSurface::new(planes),
            Err(SurfaceError::BadTableLength(360))
        ));
    }

    #[test]
    fn test_gantry_angle_convention() {
        assert!((gantry_angle_deg(&Point3::new(0.0, 0.0, 1000.0)) - 0.0).abs() < 1e-12);
        assert!((gantry_angle_deg(&Point3::new(1000.0, 0.0, 0.0)) - 90.0).abs() < 1e-12);
        assert!((gantry_angle_deg(&Point3::new(0.0, 0.0, -1000.0)) - 180.0).abs() < 1e-12);
        assert!((gantry_angle_deg(&Point3::new(-1000.0, 0.0, 0.0)) - 270.0).abs() < 1e-12);
    }

    #[test]
    fn test_flat_plane_central_ray() {
        let surf = flat_table();
        let src = Point3::new(0.0, 0.0, 1000.0);
        let pos = Point3::new(0.0, 0.0, -10.0);
        assert!((surf.ssd(&pos, &src) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_plane_oblique_ray() {
        let surf = flat_table();
        let src = Point3::new(0.0, 0.0, 1000.0);
        let pos = Point3::new(100.0, 0.0, 0.0);
        // lambda = 1 at pos, which lies exactly on the plane.
        assert!((surf.ssd(&pos, &src) - (pos - src).norm()).abs() < 1e-9);
    }

    #[test]
    fn test_parallel_ray_is_nan() {
        let surf = flat_table();
        let src = Point3::new(0.0, 0.0, 1000.0);
        let pos = Point3::new(100.0, 0.0, 1000.0);
        assert!(surf.ssd(&pos, &src).is_nan());
    }

    #[test]
    fn test_depth_identity() {
        let surf = flat_table();
        let src = Point3::new(0.0, 0.0, 1000.0);
        let pos = Point3::new(30.0, 20.0, -50.0);
        let ssd = surf.ssd(&pos, &src);
        assert!((surf.depth(&pos, &src) + ssd - (pos - src).norm()).abs() < 1e-9);
    }

    #[test]
    fn test_from_samples_resamples_coarse_table() {
        // Planes at the four cardinal angles, all equal to z = 0.
        let phis = [0.0, 90.0, 180.0, 270.0];
        let normal = Vec3::new(0.0, 0.0, 1.0);
        let point = Point3::new(0.0, 0.0, 0.0);
        let surf =
            LinearSurface::from_samples(&phis, &[normal; 4], &[point; 4]).unwrap();
        let src = Point3::new(700.0, 0.0, 700.0);
        let pos = Point3::new(0.0, 0.0, 0.0);
        let denom = normal.dot(&(pos - src));
        let expected = normal.dot(&(point - src)) / denom * (pos - src).norm();
        assert!((surf.ssd(&pos, &src) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_from_samples_rejects_out_of_range() {
        let normal = Vec3::new(0.0, 0.0, 1.0);
        let point = Point3::new(0.0, 0.0, 0.0);
        let err = LinearSurface::from_samples(&[0.0, 360.0], &[normal; 2], &[point; 2])
            .unwrap_err();
        assert!(matches!(err, SurfaceError::AngleOutOfRange(a) if a == 360.0));
    }

    #[test]
    fn test_seam_continuity() {
        // A table varying with angle: plane height follows a smooth profile
        // that is identical at 0 and 360 by construction of from_samples.
        let phis: Vec<f64> = (0..36).map(|k| k as f64 * 10.0).collect();
        let normals = vec![Vec3::new(0.0, 0.0, 1.0); 36];
        let points: Vec<Point3> = (0..36)
            .map(|k| {
                let z = 10.0 * (k as f64 * 10.0).to_radians().sin();
                Point3::new(0.0, 0.0, z)
            })
            .collect();
        let surf = LinearSurface::from_samples(&phis, &normals, &points).unwrap();

        let pos = Point3::new(0.0, 0.0, -100.0);
        let just_below = Point3::new(-0.1_f64.to_radians().sin() * 1000.0, 0.0, 1000.0);
        let just_above = Point3::new(0.1_f64.to_radians().sin() * 1000.0, 0.0, 1000.0);
        let a = surf.ssd(&pos, &just_below);
        let b = surf.ssd(&pos, &just_above);
        assert!((a - b).abs() < 0.5);
    }
}
