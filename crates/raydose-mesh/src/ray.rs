//! Rays for surface casting.
//!
//! Every mesh SSD query is one cast: from the beamlet source through the
//! dose point, find the first skin crossing. Directions are kept unit
//! length so the ray parameter is the metric distance in millimeters, which
//! is exactly the quantity the SSD contract wants back.

use raydose_math::{Aabb3, Dir3, Point3, Vec3, PARALLEL_EPS};

/// A ray with unit direction; the parameter `t` is distance from the origin.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point (the beamlet source for SSD casts).
    pub origin: Point3,
    /// Unit direction.
    pub direction: Dir3,
}

impl Ray {
    /// Ray from `origin` along `direction`, which is normalized here.
    pub fn new(origin: Point3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: Dir3::new_normalize(direction),
        }
    }

    /// The SSD cast: from `src` through `pos`. A hit at parameter `t` lies
    /// `t` millimeters from the source.
    pub fn through(src: Point3, pos: Point3) -> Self {
        Self::new(src, pos - src)
    }

    /// Point at distance `t` from the origin.
    #[inline]
    pub fn at(&self, t: f64) -> Point3 {
        self.origin + t * self.direction.as_ref()
    }

    /// Distance interval over which the forward half-line overlaps `aabb`.
    ///
    /// Clips `[0, inf)` against the three slabs of the box in turn and
    /// returns the surviving `(entry, exit)` interval, or `None` when the
    /// box is missed or lies entirely behind the origin. A zero direction
    /// component divides to infinities that fall out of the interval
    /// clipping on their own, so axis-parallel rays take the same path.
    #[inline]
    pub fn clip_aabb(&self, aabb: &Aabb3) -> Option<(f64, f64)> {
        let mut entry = 0.0_f64;
        let mut exit = f64::INFINITY;
        for axis in 0..3 {
            let inv = 1.0 / self.direction[axis];
            let mut lo = (aabb.min[axis] - self.origin[axis]) * inv;
            let mut hi = (aabb.max[axis] - self.origin[axis]) * inv;
            if lo > hi {
                std::mem::swap(&mut lo, &mut hi);
            }
            entry = entry.max(lo);
            exit = exit.min(hi);
            if exit < entry {
                return None;
            }
        }
        Some((entry, exit))
    }

    /// Intersect the ray with a triangle (Moller-Trumbore).
    ///
    /// Returns the distance to the hit, or `None` if the ray misses, is
    /// parallel to the triangle plane, or the hit lies behind the origin.
    /// Intersections are counted on both triangle sides.
    #[inline]
    pub fn intersect_triangle(&self, v0: &Point3, v1: &Point3, v2: &Point3) -> Option<f64> {
        let e1 = v1 - v0;
        let e2 = v2 - v0;
        let d = self.direction.as_ref();

        let p = d.cross(&e2);
        let det = e1.dot(&p);
        if det.abs() < PARALLEL_EPS {
            return None;
        }
        let inv_det = 1.0 / det;

        let s = self.origin - v0;
        let u = s.dot(&p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&e1);
        let v = d.dot(&q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = e2.dot(&q) * inv_det;
        if t < 0.0 {
            return None;
        }
        Some(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Point3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.0));
        let p = ray.at(3.0);
        assert!((p - Point3::new(1.0, 3.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_through_parameter_is_distance() {
        let src = Point3::new(0.0, 0.0, 10.0);
        let pos = Point3::new(0.0, 0.0, 0.0);
        let ray = Ray::through(src, pos);
        assert!((ray.at(10.0) - pos).norm() < 1e-12);
    }

    #[test]
    fn test_clip_aabb_hit() {
        let aabb = Aabb3::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let (entry, exit) = ray.clip_aabb(&aabb).unwrap();
        assert!((entry - 4.0).abs() < 1e-12);
        assert!((exit - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_clip_aabb_from_inside_starts_at_zero() {
        let aabb = Aabb3::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        let (entry, exit) = ray.clip_aabb(&aabb).unwrap();
        assert_eq!(entry, 0.0);
        assert!((exit - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_clip_aabb_miss() {
        let aabb = Aabb3::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Point3::new(0.0, 5.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(ray.clip_aabb(&aabb).is_none());
    }

    #[test]
    fn test_clip_aabb_box_behind_origin() {
        let aabb = Aabb3::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(ray.clip_aabb(&aabb).is_none());
    }

    #[test]
    fn test_clip_aabb_axis_parallel_ray() {
        // Direction has two zero components; the infinite slab bounds must
        // not poison the interval.
        let aabb = Aabb3::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Point3::new(0.5, 0.5, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let (entry, _) = ray.clip_aabb(&aabb).unwrap();
        assert!((entry - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_intersect_triangle_hit() {
        let v0 = Point3::new(-1.0, -1.0, 0.0);
        let v1 = Point3::new(1.0, -1.0, 0.0);
        let v2 = Point3::new(0.0, 1.0, 0.0);
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let t = ray.intersect_triangle(&v0, &v1, &v2).unwrap();
        assert!((t - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_intersect_triangle_miss() {
        let v0 = Point3::new(-1.0, -1.0, 0.0);
        let v1 = Point3::new(1.0, -1.0, 0.0);
        let v2 = Point3::new(0.0, 1.0, 0.0);
        let ray = Ray::new(Point3::new(5.0, 5.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(ray.intersect_triangle(&v0, &v1, &v2).is_none());
    }

    #[test]
    fn test_intersect_triangle_backface_counts() {
        let v0 = Point3::new(-1.0, -1.0, 0.0);
        let v1 = Point3::new(1.0, -1.0, 0.0);
        let v2 = Point3::new(0.0, 1.0, 0.0);
        // Same triangle approached from below.
        let ray = Ray::new(Point3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0));
        let t = ray.intersect_triangle(&v0, &v1, &v2).unwrap();
        assert!((t - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_intersect_triangle_parallel() {
        let v0 = Point3::new(-1.0, -1.0, 0.0);
        let v1 = Point3::new(1.0, -1.0, 0.0);
        let v2 = Point3::new(0.0, 1.0, 0.0);
        let ray = Ray::new(Point3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(ray.intersect_triangle(&v0, &v1, &v2).is_none());
    }
}
