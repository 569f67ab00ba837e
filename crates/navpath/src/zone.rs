//! The zone module contains [`Zone`], the queryable form of a navmesh, and the code building it from a [`TriMesh`].
//!
//! A zone partitions its triangles into [`Group`]s: maximal sets of triangles connected through shared edges,
//! e.g. the floors of a building that are not connected by stairs.

use std::{
    collections::HashMap,
    ops::{Deref, DerefMut},
};

#[cfg(feature = "bevy_reflect")]
use bevy_reflect::prelude::*;
use glam::{I64Vec3, UVec3, Vec3A};
use thiserror::Error;

use crate::{
    Aabb3d, Triangle, TriangleId, TriMesh, ZoneConfig,
    math::{TriangleIndices as _, TriangleVertices as _},
};

/// Identifies a [`Group`] inside its [`Zone`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[repr(transparent)]
pub struct GroupId(pub u32);

impl Deref for GroupId {
    type Target = u32;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for GroupId {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<u32> for GroupId {
    fn from(value: u32) -> Self {
        GroupId(value)
    }
}

/// A connected component of a [`Zone`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
pub struct Group {
    /// The id of this group.
    pub id: GroupId,
    /// The triangles of this group, in ascending order.
    pub triangles: Vec<TriangleId>,
    /// The bounds of all triangles of this group.
    pub aabb: Aabb3d,
}

/// A navmesh ready for querying. Built once with [`Zone::build`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
pub struct Zone {
    pub(crate) triangles: Vec<Triangle>,
    pub(crate) groups: Vec<Group>,
    pub(crate) vertices: Vec<Vec3A>,
    pub(crate) config: ZoneConfig,
    pub(crate) report: ZoneBuildReport,
}

/// What was dropped or ignored while building a [`Zone`].
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
pub struct ZoneBuildReport {
    /// The input triangles that were not added to the zone.
    pub skipped: Vec<SkippedTriangle>,
    /// The number of edges shared by more than two triangles. Only the first two triangles of such an edge are linked.
    pub non_manifold_edges: usize,
}

/// An input triangle that was rejected by [`Zone::build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
pub struct SkippedTriangle {
    /// The index of the triangle in [`TriMesh::indices`].
    pub index: u32,
    /// Why it was rejected.
    pub reason: DegenerateTriangle,
}

/// Ways an input triangle can be unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
pub enum DegenerateTriangle {
    /// A vertex index points past the end of [`TriMesh::vertices`].
    IndexOutOfBounds,
    /// A vertex has a NaN or infinite coordinate.
    NonFinite,
    /// Two corners were welded into the same vertex.
    CollapsedEdge,
    /// The area is below [`ZoneConfig::min_triangle_area`].
    ZeroArea,
}

/// Errors that can occur when building a [`Zone`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ZoneBuildError {
    /// Every triangle of a non-empty input was degenerate.
    #[error("All {skipped} triangles of the mesh are degenerate, nothing is walkable")]
    NoWalkableTriangles {
        /// The number of triangles in the input.
        skipped: usize,
    },
}

impl Zone {
    /// Builds a zone from raw geometry.
    ///
    /// Vertices within [`ZoneConfig::weld_tolerance`] of each other are merged, degenerate triangles are skipped
    /// with a warning, and the remaining triangles are partitioned into groups of edge-connected triangles.
    /// Group ids follow the order of the lowest input triangle of each group, so the build is deterministic.
    ///
    /// An input without any triangles yields an empty zone on which every query comes back empty.
    pub fn build(trimesh: &TriMesh, config: &ZoneConfig) -> Result<Self, ZoneBuildError> {
        let (vertices, remap) = weld_vertices(&trimesh.vertices, config.weld_tolerance);
        let mut report = ZoneBuildReport::default();

        // Filter out triangles that can't take part in pathfinding.
        let mut accepted: Vec<(u32, UVec3)> = Vec::with_capacity(trimesh.indices.len());
        for (i, indices) in trimesh.indices.iter().enumerate() {
            match weld_triangle(*indices, &remap, &vertices, config) {
                Ok(welded) => accepted.push((i as u32, welded)),
                Err(reason) => {
                    tracing::warn!("Skipping triangle {i} of the navmesh: {reason:?}");
                    report.skipped.push(SkippedTriangle {
                        index: i as u32,
                        reason,
                    });
                }
            }
        }
        if accepted.is_empty() && !trimesh.indices.is_empty() {
            return Err(ZoneBuildError::NoWalkableTriangles {
                skipped: trimesh.indices.len(),
            });
        }

        let neighbors = link_neighbors(&accepted, &mut report);

        let mut union_find = UnionFind::new(accepted.len());
        for (i, links) in neighbors.iter().enumerate() {
            for neighbor in links.iter().flatten() {
                union_find.union(i, neighbor.index());
            }
        }

        // Assign group ids in order of first appearance.
        let mut group_of_root = HashMap::new();
        let mut groups: Vec<Group> = Vec::new();
        let mut triangles = Vec::with_capacity(accepted.len());
        for (i, (source_index, indices)) in accepted.iter().enumerate() {
            let root = union_find.find(i);
            let group = *group_of_root.entry(root).or_insert_with(|| {
                // At most one group per triangle, so this fits like the triangle ids do.
                let id = GroupId(groups.len() as u32);
                groups.push(Group {
                    id,
                    triangles: Vec::new(),
                    aabb: Aabb3d::default(),
                });
                id
            });

            let corners = [
                vertices[indices.x as usize],
                vertices[indices.y as usize],
                vertices[indices.z as usize],
            ];
            let aabb = corners.aabb();
            let entry = &mut groups[group.index()];
            entry.aabb = if entry.triangles.is_empty() {
                aabb
            } else {
                entry.aabb.union(&aabb)
            };
            entry.triangles.push(TriangleId(i as u32));

            triangles.push(Triangle {
                vertices: corners,
                indices: *indices,
                centroid: (corners[0] + corners[1] + corners[2]) / 3.0,
                normal: indices.normal(&vertices),
                neighbors: neighbors[i],
                group,
                source_index: *source_index,
                aabb,
            });
        }

        tracing::debug!(
            "Built zone with {} triangles in {} groups, skipped {} degenerate triangles",
            triangles.len(),
            groups.len(),
            report.skipped.len()
        );

        Ok(Zone {
            triangles,
            groups,
            vertices,
            config: config.clone(),
            report,
        })
    }

    /// All triangles of the zone, indexed by [`TriangleId`].
    #[inline]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Returns the triangle with the given id.
    #[inline]
    pub fn triangle(&self, id: TriangleId) -> Option<&Triangle> {
        self.triangles.get(id.index())
    }

    /// All groups of the zone, indexed by [`GroupId`].
    #[inline]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Returns the group with the given id.
    #[inline]
    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(id.index())
    }

    /// The welded vertices the triangles were built from.
    #[inline]
    pub fn vertices(&self) -> &[Vec3A] {
        &self.vertices
    }

    /// The configuration the zone was built and is queried with.
    #[inline]
    pub fn config(&self) -> &ZoneConfig {
        &self.config
    }

    /// What the build dropped.
    #[inline]
    pub fn build_report(&self) -> &ZoneBuildReport {
        &self.report
    }

    /// Whether the zone has no walkable triangles at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterates over the triangles of a group. Empty if the group doesn't exist.
    pub fn group_triangles(&self, group: GroupId) -> impl Iterator<Item = (TriangleId, &Triangle)> {
        self.group(group)
            .map(|group| group.triangles.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|id| (*id, &self.triangles[id.index()]))
    }
}

impl GroupId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Merges vertices that lie within `tolerance` of each other.
///
/// Returns the welded vertices and, for every input vertex, the index of its welded vertex.
/// Non-finite vertices map to `None`.
fn weld_vertices(vertices: &[Vec3A], tolerance: f32) -> (Vec<Vec3A>, Vec<Option<u32>>) {
    let cell_size = tolerance.max(f32::MIN_POSITIVE);
    let tolerance_sq = tolerance * tolerance;
    let mut grid: HashMap<I64Vec3, Vec<u32>> = HashMap::new();
    let mut welded: Vec<Vec3A> = Vec::with_capacity(vertices.len());
    let mut remap = Vec::with_capacity(vertices.len());

    for vertex in vertices {
        if !vertex.is_finite() {
            remap.push(None);
            continue;
        }
        let cell = (*vertex / cell_size).floor().as_i64vec3();

        // A vertex within tolerance can only live in one of the 27 surrounding cells.
        // Prefer the lowest welded index so the result doesn't depend on hash order.
        let mut existing: Option<u32> = None;
        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let Some(candidates) = grid.get(&(cell + I64Vec3::new(dx, dy, dz))) else {
                        continue;
                    };
                    for candidate in candidates {
                        if welded[*candidate as usize].distance_squared(*vertex) <= tolerance_sq
                            && existing.is_none_or(|existing| *candidate < existing)
                        {
                            existing = Some(*candidate);
                        }
                    }
                }
            }
        }

        let index = existing.unwrap_or_else(|| {
            let index = welded.len() as u32;
            welded.push(*vertex);
            grid.entry(cell).or_default().push(index);
            index
        });
        remap.push(Some(index));
    }
    (welded, remap)
}

fn weld_triangle(
    indices: UVec3,
    remap: &[Option<u32>],
    vertices: &[Vec3A],
    config: &ZoneConfig,
) -> Result<UVec3, DegenerateTriangle> {
    let mut welded = [0; 3];
    for (corner, index) in welded.iter_mut().zip(indices.to_array()) {
        let Some(mapped) = remap.get(index as usize) else {
            return Err(DegenerateTriangle::IndexOutOfBounds);
        };
        let Some(mapped) = mapped else {
            return Err(DegenerateTriangle::NonFinite);
        };
        *corner = *mapped;
    }
    if welded[0] == welded[1] || welded[1] == welded[2] || welded[2] == welded[0] {
        return Err(DegenerateTriangle::CollapsedEdge);
    }
    let corners = welded.map(|i| vertices[i as usize]);
    if corners.area() < config.min_triangle_area {
        return Err(DegenerateTriangle::ZeroArea);
    }
    Ok(UVec3::from_array(welded))
}

/// Links every triangle to the triangles it shares an edge with.
fn link_neighbors(
    triangles: &[(u32, UVec3)],
    report: &mut ZoneBuildReport,
) -> Vec<[Option<TriangleId>; 3]> {
    let edge_key = |indices: &UVec3, edge: usize| {
        let a = indices[edge];
        let b = indices[(edge + 1) % 3];
        (a.min(b), a.max(b))
    };

    let mut edges: HashMap<(u32, u32), Vec<u32>> = HashMap::new();
    for (i, (_, indices)) in triangles.iter().enumerate() {
        for edge in 0..3 {
            edges
                .entry(edge_key(indices, edge))
                .or_default()
                .push(i as u32);
        }
    }

    let mut neighbors = vec![[None; 3]; triangles.len()];
    for (i, (_, indices)) in triangles.iter().enumerate() {
        for (edge, neighbor) in neighbors[i].iter_mut().enumerate() {
            let sharing = &edges[&edge_key(indices, edge)];
            if sharing.len() > 2 && sharing[0] == i as u32 {
                report.non_manifold_edges += 1;
            }
            *neighbor = match sharing.as_slice() {
                [first, second, ..] if *first == i as u32 => Some(TriangleId(*second)),
                [first, second, ..] if *second == i as u32 => Some(TriangleId(*first)),
                _ => None,
            };
        }
    }
    if report.non_manifold_edges > 0 {
        tracing::warn!(
            "The navmesh has {} edges shared by more than two triangles, only the first two triangles of each are connected",
            report.non_manifold_edges
        );
    }
    neighbors
}

/// Disjoint-set forest over triangle indices.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            // Path halving
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, x: usize, y: usize) {
        let root_x = self.find(x);
        let root_y = self.find(y);
        if root_x == root_y {
            return;
        }
        match self.rank[root_x].cmp(&self.rank[root_y]) {
            std::cmp::Ordering::Less => self.parent[root_x] = root_y,
            std::cmp::Ordering::Greater => self.parent[root_y] = root_x,
            std::cmp::Ordering::Equal => {
                self.parent[root_y] = root_x;
                self.rank[root_x] += 1;
            }
        }
    }
}
