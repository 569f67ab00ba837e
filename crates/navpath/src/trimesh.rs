//! Raw triangle geometry used as input for [`Zone::build`](crate::Zone::build).

use glam::{Affine3A, UVec3, Vec3, Vec3A};


/// A mesh used as input for building a [`Zone`](crate::Zone).
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TriMesh {
    /// The vertices composing the mesh.
    /// Follows the convention of a triangle list.
    pub vertices: Vec<Vec3A>,

    /// The indices composing the mesh.
    /// Follows the convention of a triangle list.
    pub indices: Vec<UVec3>,
}

impl TriMesh {
    /// Builds an unindexed trimesh from a flat list of triangles.
    pub fn from_triangles(triangles: impl IntoIterator<Item = [Vec3; 3]>) -> Self {
        let mut trimesh = TriMesh::default();
        for [a, b, c] in triangles {
            let next_vertex_index = trimesh.vertices.len() as u32;
            trimesh
                .vertices
                .extend([Vec3A::from(a), Vec3A::from(b), Vec3A::from(c)]);
            trimesh.indices.push(UVec3::new(
                next_vertex_index,
                next_vertex_index + 1,
                next_vertex_index + 2,
            ));
        }
        trimesh
    }

    /// Extends the trimesh with the vertices and indices of another trimesh.
    /// The indices of `other` will be offset by the number of vertices in `self`.
    pub fn extend(&mut self, other: TriMesh) {
        if self.vertices.len() > u32::MAX as usize {
            panic!("Cannot extend a trimesh with more than 2^32 vertices");
        }
        let next_vertex_index = self.vertices.len() as u32;
        self.vertices.extend(other.vertices);
        self.indices
            .extend(other.indices.iter().map(|i| i + next_vertex_index));
    }

    /// Applies an affine transform to every vertex.
    pub fn transform(&mut self, transform: &Affine3A) {
        for vertex in &mut self.vertices {
            *vertex = transform.transform_point3a(*vertex);
        }
    }
}
