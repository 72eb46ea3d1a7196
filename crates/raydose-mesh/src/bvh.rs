//! Bounding Volume Hierarchy for accelerated ray-mesh queries.
//!
//! Built once per mesh with a median split on the longest centroid axis,
//! read-only afterwards.

use raydose_math::{Aabb3, Point3};

use crate::{Ray, TriangleMesh};

/// Triangles per leaf before splitting stops.
const LEAF_SIZE: usize = 4;

/// A BVH node - either a leaf containing triangles or an internal node with
/// two children.
#[derive(Debug, Clone)]
enum BvhNode {
    Leaf {
        aabb: Aabb3,
        triangles: Vec<u32>,
    },
    Internal {
        aabb: Aabb3,
        left: Box<BvhNode>,
        right: Box<BvhNode>,
    },
}

impl BvhNode {
    fn aabb(&self) -> &Aabb3 {
        match self {
            BvhNode::Leaf { aabb, .. } => aabb,
            BvhNode::Internal { aabb, .. } => aabb,
        }
    }
}

/// Bounding volume hierarchy over the triangles of a [`TriangleMesh`].
#[derive(Debug, Clone)]
pub struct Bvh {
    root: Option<BvhNode>,
    /// Triangle corner positions, indexed as the mesh indexes its triangles.
    triangles: Vec<[Point3; 3]>,
}

impl Bvh {
    /// Build a BVH from a triangle mesh.
    pub fn build(mesh: &TriangleMesh) -> Self {
        let triangles: Vec<[Point3; 3]> = (0..mesh.num_triangles())
            .map(|i| mesh.triangle_vertices(i))
            .collect();

        let mut tri_data: Vec<(u32, Aabb3, Point3)> = triangles
            .iter()
            .enumerate()
            .map(|(i, tri)| {
                let mut aabb = Aabb3::empty();
                for v in tri {
                    aabb.grow(v);
                }
                (i as u32, aabb, aabb.center())
            })
            .collect();

        let root = if tri_data.is_empty() {
            None
        } else {
            Some(build_node(&mut tri_data))
        };

        Self { root, triangles }
    }

    /// Axis-aligned bounding box of the whole hierarchy.
    pub fn aabb(&self) -> Aabb3 {
        self.root
            .as_ref()
            .map(|n| *n.aabb())
            .unwrap_or_else(Aabb3::empty)
    }

    /// Number of triangles indexed by the hierarchy.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Trace a ray, returning the parameter of the closest intersection.
    ///
    /// With a normalized ray direction the returned parameter is the metric
    /// distance from the ray origin to the hit.
    pub fn closest_hit(&self, ray: &Ray) -> Option<f64> {
        let mut closest_t = f64::INFINITY;
        if let Some(ref root) = self.root {
            self.closest_node(ray, root, &mut closest_t);
        }
        if closest_t.is_finite() {
            Some(closest_t)
        } else {
            None
        }
    }

    /// Trace a ray through a node, keeping only the closest hit.
    fn closest_node(&self, ray: &Ray, node: &BvhNode, closest_t: &mut f64) {
        match node {
            BvhNode::Leaf { aabb, triangles } => {
                if let Some((t_min, _)) = ray.clip_aabb(aabb) {
                    // Early out if AABB entry is beyond current closest
                    if t_min >= *closest_t {
                        return;
                    }
                    for &ti in triangles {
                        let [v0, v1, v2] = &self.triangles[ti as usize];
                        if let Some(t) = ray.intersect_triangle(v0, v1, v2) {
                            if t < *closest_t {
                                *closest_t = t;
                            }
                        }
                    }
                }
            }
            BvhNode::Internal { aabb, left, right } => {
                if let Some((t_min, _)) = ray.clip_aabb(aabb) {
                    if t_min >= *closest_t {
                        return;
                    }

                    // Visit the nearer child first so the far child can be
                    // culled against the tightened closest_t.
                    let left_t = ray.clip_aabb(left.aabb()).map(|(t, _)| t);
                    let right_t = ray.clip_aabb(right.aabb()).map(|(t, _)| t);

                    match (left_t, right_t) {
                        (Some(lt), Some(rt)) => {
                            if lt < rt {
                                self.closest_node(ray, left, closest_t);
                                self.closest_node(ray, right, closest_t);
                            } else {
                                self.closest_node(ray, right, closest_t);
                                self.closest_node(ray, left, closest_t);
                            }
                        }
                        (Some(_), None) => self.closest_node(ray, left, closest_t),
                        (None, Some(_)) => self.closest_node(ray, right, closest_t),
                        (None, None) => {}
                    }
                }
            }
        }
    }
}

/// Recursively build a node from triangle (index, AABB, centroid) records.
fn build_node(tris: &mut [(u32, Aabb3, Point3)]) -> BvhNode {
    let mut aabb = Aabb3::empty();
    for (_, tri_aabb, _) in tris.iter() {
        aabb.grow(&tri_aabb.min);
        aabb.grow(&tri_aabb.max);
    }

    if tris.len() <= LEAF_SIZE {
        return BvhNode::Leaf {
            aabb,
            triangles: tris.iter().map(|(i, _, _)| *i).collect(),
        };
    }

    // Split on the longest axis of the centroid extent.
    let mut centroid_aabb = Aabb3::empty();
    for (_, _, c) in tris.iter() {
        centroid_aabb.grow(c);
    }
    let size = centroid_aabb.size();
    let axis = if size.x >= size.y && size.x >= size.z {
        0
    } else if size.y >= size.z {
        1
    } else {
        2
    };

    let mid = tris.len() / 2;
    tris.select_nth_unstable_by(mid, |a, b| {
        a.2[axis]
            .partial_cmp(&b.2[axis])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let (left_tris, right_tris) = tris.split_at_mut(mid);
    BvhNode::Internal {
        aabb,
        left: Box::new(build_node(left_tris)),
        right: Box::new(build_node(right_tris)),
    }
}
