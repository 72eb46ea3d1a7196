//! Cylindrical height-field surface around the patient axis.
//!
//! Patient skin is close to star-shaped around the longitudinal (y) axis,
//! so it can be stored as a radius table `rho(phi, y)`. The table is built
//! once by casting rays from outside the mesh toward the axis at every grid
//! sample; queries then never touch the mesh again.

use raydose_math::{Aabb3, Point3, RAY_ROOT_EPS};
use raydose_mesh::{Bvh, Ray, TriangleMesh};
use roots::{find_root_brent, SimpleConvergency};
use serde::{Deserialize, Serialize};

use crate::linear::gantry_angle_deg;
use crate::{ExternalSurface, Result, SurfaceBounds, SurfaceError};

/// Stand-in for an infinite radius inside the root-find residual, large
/// enough to dominate any squared clinical distance while staying finite.
const FAR_RADIUS2: f64 = 1e30;

/// A height field `rho(phi, y)` around the patient y-axis.
///
/// The angular grid is uniform over `[0, 360]` degrees with the last row
/// stored equal to the first (seam closure); the axial grid is strictly
/// increasing. Samples where the construction ray missed the mesh hold
/// `+inf`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CylindricalSurface {
    /// Angular spacing in degrees.
    phi_step: f64,
    /// Number of angular rows, including the duplicated 360 deg row.
    nphi: usize,
    /// Axial sample coordinates (mm).
    y: Vec<f64>,
    /// Radii, `rho[iphi * ny + iy]`.
    rho: Vec<f64>,
}

impl CylindricalSurface {
    /// Create a surface from explicit grids.
    ///
    /// `rho` holds `(360 / phi_step + 1) * y.len()` entries, angular rows
    /// outermost. The 360 deg row is overwritten with the 0 deg row to
    /// close the seam.
    pub fn new(phi_step: f64, y: Vec<f64>, mut rho: Vec<f64>) -> Result<Self> {
        if !(phi_step > 0.0) || ((360.0 / phi_step) - (360.0 / phi_step).round()).abs() > 1e-9 {
            return Err(SurfaceError::BadSpacing(phi_step));
        }
        if y.len() < 2 || y.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SurfaceError::UnsortedYGrid);
        }
        let nphi = (360.0 / phi_step).round() as usize + 1;
        let ny = y.len();
        if rho.len() != nphi * ny {
            return Err(SurfaceError::BadGridSize {
                got: rho.len(),
                expected: nphi * ny,
            });
        }
        let (head, tail) = rho.split_at_mut((nphi - 1) * ny);
        tail.copy_from_slice(&head[..ny]);
        Ok(Self {
            phi_step,
            nphi,
            y,
            rho,
        })
    }

    /// Build the height field from a triangle mesh by ray casting.
    ///
    /// At each `(phi, y)` sample a ray is cast from outside the mesh bound
    /// toward the axis; the first hit defines `rho`. Misses store `+inf`.
    pub fn from_mesh(mesh: &TriangleMesh, phi_step: f64, y_step: f64) -> Result<Self> {
        if mesh.num_triangles() == 0 {
            return Err(SurfaceError::EmptyMesh);
        }
        if !(phi_step > 0.0) || ((360.0 / phi_step) - (360.0 / phi_step).round()).abs() > 1e-9 {
            return Err(SurfaceError::BadSpacing(phi_step));
        }
        if !(y_step > 0.0) {
            return Err(SurfaceError::BadSpacing(y_step));
        }

        let aabb = mesh.aabb();
        let ny = ((aabb.max.y - aabb.min.y) / y_step).ceil() as usize + 1;
        let ny = ny.max(2);
        let y: Vec<f64> = (0..ny).map(|i| aabb.min.y + i as f64 * y_step).collect();

        // Cast from just outside the largest radial extent of the mesh.
        let rx = aabb.min.x.abs().max(aabb.max.x.abs());
        let rz = aabb.min.z.abs().max(aabb.max.z.abs());
        let cast_radius = f64::hypot(rx, rz) * 1.01 + 1.0;

        let bvh = Bvh::build(mesh);
        let nphi = (360.0 / phi_step).round() as usize + 1;
        let mut rho = vec![f64::INFINITY; nphi * ny];

        for iphi in 0..nphi - 1 {
            let phi = (iphi as f64 * phi_step).to_radians();
            let dir = raydose_math::Vec3::new(phi.sin(), 0.0, phi.cos());
            for (iy, &yi) in y.iter().enumerate() {
                let origin = Point3::new(cast_radius * dir.x, yi, cast_radius * dir.z);
                let ray = Ray::new(origin, -dir);
                if let Some(t) = bvh.closest_hit(&ray) {
                    let axis_point = Point3::new(0.0, yi, 0.0);
                    rho[iphi * ny + iy] = (ray.at(t) - axis_point).norm();
                }
            }
        }

        log::debug!(
            "cylindrical surface: {} x {} grid from {} triangles",
            nphi,
            ny,
            mesh.num_triangles()
        );
        Self::new(phi_step, y, rho)
    }

    /// Bilinear radius lookup at `(phi_deg, y)`.
    ///
    /// Returns `+inf` outside the axial range or when any of the four
    /// bracketing samples is a miss.
    fn rho_at(&self, phi_deg: f64, y: f64) -> f64 {
        let ny = self.y.len();
        if y < self.y[0] || y > self.y[ny - 1] {
            return f64::INFINITY;
        }
        let hi = self.y.partition_point(|&v| v <= y);
        let (iy, fy) = if hi == ny {
            (ny - 2, 1.0)
        } else {
            let iy = hi - 1;
            (iy, (y - self.y[iy]) / (self.y[iy + 1] - self.y[iy]))
        };

        let p = phi_deg / self.phi_step;
        let ip = (p.floor() as usize).min(self.nphi - 2);
        let fp = p - ip as f64;

        let r00 = self.rho[ip * ny + iy];
        let r01 = self.rho[ip * ny + iy + 1];
        let r10 = self.rho[(ip + 1) * ny + iy];
        let r11 = self.rho[(ip + 1) * ny + iy + 1];
        if !(r00.is_finite() && r01.is_finite() && r10.is_finite() && r11.is_finite()) {
            return f64::INFINITY;
        }

        let a = r00 + fy * (r01 - r00);
        let b = r10 + fy * (r11 - r10);
        a + fp * (b - a)
    }

    /// Signed squared radial clearance at parameter `lambda` along
    /// `src -> pos`: positive inside the surface, negative outside.
    fn clearance2(&self, src: &Point3, pos: &Point3, lambda: f64) -> f64 {
        let r = src + lambda * (pos - src);
        let rho = self.rho_at(gantry_angle_deg(&r), r.y);
        let rho2 = if rho.is_finite() {
            rho * rho
        } else {
            FAR_RADIUS2
        };
        rho2 - (r.x * r.x + r.z * r.z)
    }
}

impl ExternalSurface for CylindricalSurface {
    /// Finds the skin crossing as the root in `lambda` of the squared
    /// radial clearance along `src + lambda * (pos - src)`, restricted to
    /// `lambda` in `[0, 1]`. Returns `+inf` when both endpoints lie on the
    /// same side of the surface.
    fn ssd(&self, pos: &Point3, src: &Point3) -> f64 {
        let len = (pos - src).norm();
        let g0 = self.clearance2(src, pos, 0.0);
        let g1 = self.clearance2(src, pos, 1.0);
        if g0 == 0.0 {
            return 0.0;
        }
        if g1 == 0.0 {
            return len;
        }
        if g0 * g1 > 0.0 {
            return f64::INFINITY;
        }

        let mut convergency = SimpleConvergency {
            eps: RAY_ROOT_EPS,
            max_iter: 100,
        };
        match find_root_brent(
            0.0,
            1.0,
            |lambda| self.clearance2(src, pos, lambda),
            &mut convergency,
        ) {
            Ok(lambda) => lambda * len,
            Err(_) => f64::INFINITY,
        }
    }
}

impl SurfaceBounds for CylindricalSurface {
    /// True iff `pos.y` lies in `[y_first, y_last)` and the radial distance
    /// of `pos` from the axis is below the interpolated surface radius.
    fn isinside(&self, pos: &Point3) -> bool {
        let ny = self.y.len();
        if pos.y < self.y[0] || pos.y >= self.y[ny - 1] {
            return false;
        }
        let rho = self.rho_at(gantry_angle_deg(pos), pos.y);
        rho.is_finite() && pos.x * pos.x + pos.z * pos.z < rho * rho
    }

    fn extent(&self) -> Aabb3 {
        let ny = self.y.len();
        let mut aabb = Aabb3::empty();
        for iphi in 0..self.nphi {
            let phi = (iphi as f64 * self.phi_step).to_radians();
            for (iy, &yi) in self.y.iter().enumerate() {
                let rho = self.rho[iphi * ny + iy];
                if rho.is_finite() {
                    aabb.grow(&Point3::new(rho * phi.sin(), yi, rho * phi.cos()));
                }
            }
        }
        aabb
    }
}
