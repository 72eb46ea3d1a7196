//! Triangle-mesh surface with BVH-accelerated SSD queries.

use raydose_math::{Aabb3, Point3};
use raydose_mesh::{Bvh, Ray, TriangleMesh};

use crate::ExternalSurface;

/// A patient surface given as a closed triangle mesh.
///
/// The SSD is the distance from the source to the nearest ray-mesh
/// intersection along the ray from the source through the query point,
/// `+inf` when the ray misses the mesh entirely. The BVH is built once at
/// construction and read-only afterwards; acceleration does not change the
/// query semantics.
#[derive(Debug, Clone)]
pub struct MeshSurface {
    bvh: Bvh,
}

impl MeshSurface {
    /// Build a mesh surface (and its BVH) from a triangle mesh.
    pub fn new(mesh: &TriangleMesh) -> Self {
        let bvh = Bvh::build(mesh);
        log::debug!(
            "mesh surface: {} triangles, extent {:?}",
            bvh.num_triangles(),
            bvh.aabb()
        );
        Self { bvh }
    }

    /// Axis-aligned bounding box of the mesh.
    pub fn aabb(&self) -> Aabb3 {
        self.bvh.aabb()
    }
}

impl ExternalSurface for MeshSurface {
    fn ssd(&self, pos: &Point3, src: &Point3) -> f64 {
        let ray = Ray::through(*src, *pos);
        self.bvh.closest_hit(&ray).unwrap_or(f64::INFINITY)
    }
}
