#![warn(missing_docs)]

//! Triangle meshes and accelerated ray queries for raydose.
//!
//! The external patient surface is frequently delivered as a triangle mesh
//! (a DICOM structure-set contour stack converted upstream). This crate
//! provides the mesh container, exact ray-triangle intersection, and a
//! bounding volume hierarchy so that source-to-surface queries stay cheap
//! even for meshes with hundreds of thousands of triangles.
//!
//! - [`TriangleMesh`] - vertex/index mesh container
//! - [`Ray`] - ray with precomputed data for fast AABB slab tests
//! - [`Bvh`] - bounding volume hierarchy over mesh triangles

mod bvh;
mod ray;

pub use bvh::Bvh;
pub use ray::Ray;

use raydose_math::{Aabb3, Point3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while constructing a mesh.
#[derive(Debug, Error)]
pub enum MeshError {
    /// A triangle index refers past the vertex array.
    #[error("triangle index {index} out of bounds for {nvertices} vertices")]
    IndexOutOfBounds {
        /// The offending index.
        index: u32,
        /// Number of vertices in the mesh.
        nvertices: usize,
    },
    /// The index array length is not a multiple of three.
    #[error("index array length {0} is not a multiple of 3")]
    RaggedIndices(usize),
}

/// A triangle mesh with vertices and per-triangle vertex indices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriangleMesh {
    vertices: Vec<Point3>,
    triangles: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mesh from a vertex list and a flat index array
    /// `[i0, i1, i2, ...]` (three indices per triangle).
    pub fn from_buffers(vertices: Vec<Point3>, indices: &[u32]) -> Result<Self, MeshError> {
        if indices.len() % 3 != 0 {
            return Err(MeshError::RaggedIndices(indices.len()));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(MeshError::IndexOutOfBounds {
                index: bad,
                nvertices: vertices.len(),
            });
        }
        let triangles = indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        Ok(Self {
            vertices,
            triangles,
        })
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Vertex positions.
    pub fn vertices(&self) -> &[Point3] {
        &self.vertices
    }

    /// Per-triangle vertex indices.
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// The three corner positions of triangle `i`.
    pub fn triangle_vertices(&self, i: usize) -> [Point3; 3] {
        let [a, b, c] = self.triangles[i];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    /// Axis-aligned bounding box of all vertices.
    pub fn aabb(&self) -> Aabb3 {
        Aabb3::from_points(&self.vertices)
    }
}

/// Build an axis-aligned cuboid mesh of size `(sx, sy, sz)` centered at the
/// origin, with outward-facing triangles. Used as a test fixture.
pub fn centered_cube(sx: f64, sy: f64, sz: f64) -> TriangleMesh {
    let (hx, hy, hz) = (sx / 2.0, sy / 2.0, sz / 2.0);
    let vertices = vec![
        Point3::new(-hx, -hy, -hz),
        Point3::new(hx, -hy, -hz),
        Point3::new(hx, hy, -hz),
        Point3::new(-hx, hy, -hz),
        Point3::new(-hx, -hy, hz),
        Point3::new(hx, -hy, hz),
        Point3::new(hx, hy, hz),
        Point3::new(-hx, hy, hz),
    ];
    // Two triangles per face, CCW from outside.
    #[rustfmt::skip]
    let indices: [u32; 36] = [
        0, 2, 1, 0, 3, 2, // bottom (z = -hz)
        4, 5, 6, 4, 6, 7, // top (z = +hz)
        0, 1, 5, 0, 5, 4, // front (y = -hy)
        2, 3, 7, 2, 7, 6, // back (y = +hy)
        0, 4, 7, 0, 7, 3, // left (x = -hx)
        1, 2, 6, 1, 6, 5, // right (x = +hx)
    ];
    TriangleMesh::from_buffers(vertices, &indices).expect("cube indices are valid")
}
