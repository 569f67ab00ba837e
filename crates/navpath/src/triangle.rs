use std::ops::Deref;

#[cfg(feature = "bevy_reflect")]
use bevy_reflect::prelude::*;
use glam::{UVec3, Vec3A};

use crate::{
    GroupId,
    math::{Aabb3d, TriangleVertices as _},
};

/// Index of a [`Triangle`] inside its [`Zone`](crate::Zone).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[repr(transparent)]
pub struct TriangleId(pub u32);

impl Deref for TriangleId {
    type Target = u32;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<u32> for TriangleId {
    fn from(value: u32) -> Self {
        TriangleId(value)
    }
}

impl TriangleId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A walkable triangle of a [`Zone`](crate::Zone). Immutable once the zone is built.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
pub struct Triangle {
    /// The corner positions.
    pub vertices: [Vec3A; 3],
    /// The welded vertex ids of the corners. Two triangles share an edge iff they share two of these.
    pub indices: UVec3,
    /// The mean of the corners.
    pub centroid: Vec3A,
    /// The unit face normal, following the winding of [`Self::vertices`].
    pub normal: Vec3A,
    /// The triangle across each edge, where edge `i` runs from corner `i` to corner `(i + 1) % 3`.
    pub neighbors: [Option<TriangleId>; 3],
    /// The group this triangle belongs to.
    pub group: GroupId,
    /// The index of this triangle in the [`TriMesh`](crate::TriMesh) the zone was built from.
    pub source_index: u32,
    /// The bounds of the corners.
    pub aabb: Aabb3d,
}

impl Triangle {
    /// Returns the endpoints of edge `edge`. [Limits: 0 <= edge < 3]
    #[inline]
    pub fn edge(&self, edge: usize) -> (Vec3A, Vec3A) {
        (self.vertices[edge % 3], self.vertices[(edge + 1) % 3])
    }

    /// Returns the edge shared with `neighbor`, if the two are adjacent.
    pub fn shared_edge(&self, neighbor: TriangleId) -> Option<usize> {
        self.neighbors.iter().position(|n| *n == Some(neighbor))
    }

    /// Iterates over the adjacent triangles.
    pub fn neighbors(&self) -> impl Iterator<Item = TriangleId> + '_ {
        self.neighbors.iter().flatten().copied()
    }

    /// The point of the triangle closest to `point`.
    #[inline]
    pub fn closest_point(&self, point: Vec3A) -> Vec3A {
        self.vertices.closest_point(point)
    }

    /// Whether `point`, projected vertically, falls inside the triangle's footprint.
    /// `tolerance` widens every edge outwards. [Units: wu]
    ///
    /// Vertical triangles never contain anything.
    pub fn contains_xz(&self, point: Vec3A, tolerance: f32) -> bool {
        self.vertices
            .edge_distances_xz(point)
            .is_some_and(|distances| distances.iter().all(|d| *d >= -tolerance))
    }

    /// The height of the triangle's plane at the xz-position of `point`.
    /// `None` for vertical triangles.
    pub fn height_at(&self, point: Vec3A) -> Option<f32> {
        let bary = self.vertices.barycentric_xz(point)?;
        let [a, b, c] = self.vertices;
        // Relative to the first corner, so flat triangles report their exact height.
        Some(a.y + bary.y * (b.y - a.y) + bary.z * (c.y - a.y))
    }
}
