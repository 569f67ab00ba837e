//! Shortest paths between two points of the same group.
//!
//! A path is found in two steps: an A* search over the triangle adjacency graph yields a corridor of triangles,
//! which the funnel algorithm then pulls taut into the shortest polyline that stays inside the corridor.

use std::{cmp::Ordering, collections::BinaryHeap};

#[cfg(feature = "bevy_reflect")]
use bevy_reflect::prelude::*;
use glam::Vec3A;
use thiserror::Error;

use crate::{GroupId, TriangleId, Zone, math::tri_area_2d};

/// Why a path query produced no path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    /// No zone is registered under the given key.
    #[error("No zone is registered under the key {0:?}")]
    UnknownZone(String),
    /// The zone has no walkable triangles.
    #[error("The zone is empty")]
    EmptyZone,
    /// The zone has no group with the given id.
    #[error("The zone has no group {0:?}")]
    UnknownGroup(GroupId),
    /// The point is neither on nor close enough to the navmesh.
    #[error("{0} is not on the navmesh")]
    NotOnMesh(Vec3A),
    /// The endpoints don't both lie in the requested group.
    #[error(
        "Path requested in group {requested:?}, but the start lies in group {start:?} and the end in group {end:?}"
    )]
    GroupMismatch {
        /// The group the path was requested in.
        requested: GroupId,
        /// The group of the start point.
        start: GroupId,
        /// The group of the end point.
        end: GroupId,
    },
}

/// The result of [`Zone::find_path`].
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
pub struct Path {
    /// The corners of the path, from the snapped start to the snapped end.
    ///
    /// A query whose endpoints coincide yields a single waypoint. Use [`Path::is_traversable`]
    /// to tell a path worth following apart from that.
    pub waypoints: Vec<Vec3A>,
    /// The triangles the path runs through, in order.
    pub corridor: Vec<TriangleId>,
}

impl Path {
    /// Whether the path has at least one segment.
    #[inline]
    pub fn is_traversable(&self) -> bool {
        self.waypoints.len() >= 2
    }

    /// The total length of all segments.
    pub fn length(&self) -> f32 {
        self.waypoints
            .windows(2)
            .map(|segment| segment[0].distance(segment[1]))
            .sum()
    }
}

impl Zone {
    /// Finds the shortest walkable path from `start` to `end` inside `group`.
    ///
    /// Both points are snapped onto the navmesh first, see [`Zone::snap`]. Each of them has to land in `group`:
    /// a query across groups is answered with [`PathError::GroupMismatch`] instead of a path.
    pub fn find_path(&self, start: Vec3A, end: Vec3A, group: GroupId) -> Result<Path, PathError> {
        if self.is_empty() {
            return Err(PathError::EmptyZone);
        }
        if self.group(group).is_none() {
            return Err(PathError::UnknownGroup(group));
        }
        let start_node = self.snap(start).ok_or(PathError::NotOnMesh(start))?;
        let end_node = self.snap(end).ok_or(PathError::NotOnMesh(end))?;
        if start_node.group != group || end_node.group != group {
            return Err(PathError::GroupMismatch {
                requested: group,
                start: start_node.group,
                end: end_node.group,
            });
        }

        let Some(corridor) = self.triangle_path(
            start_node.triangle,
            start_node.position,
            end_node.triangle,
            end_node.position,
        ) else {
            // Triangles of a group are connected by construction.
            tracing::error!(
                "No corridor between {:?} and {:?} although both are in group {group:?}",
                start_node.triangle,
                end_node.triangle
            );
            return Ok(Path::default());
        };

        let portals = self.portals(start_node.position, end_node.position, &corridor);
        Ok(Path {
            waypoints: string_pull(&portals),
            corridor,
        })
    }

    /// Runs A* from `start` to `end` over the triangle adjacency graph and returns the visited triangles in order.
    ///
    /// `start_position` and `end_position` are the exact points on the start and end triangles.
    /// Costs are measured between the midpoints of the crossed edges, the heuristic is the straight-line distance to
    /// `end_position`. Equal costs are broken by triangle id, so the result is reproducible.
    /// `None` if an id is invalid or the triangles are not connected.
    pub fn triangle_path(
        &self,
        start: TriangleId,
        start_position: Vec3A,
        end: TriangleId,
        end_position: Vec3A,
    ) -> Option<Vec<TriangleId>> {
        let start_triangle = self.triangle(start)?;
        let end_triangle = self.triangle(end)?;
        if start_triangle.group != end_triangle.group {
            return None;
        }
        if start == end {
            return Some(vec![start]);
        }

        let mut nodes: Vec<Option<SearchNode>> = vec![None; self.triangles.len()];
        let mut open = BinaryHeap::new();
        nodes[start.index()] = Some(SearchNode {
            parent: None,
            cost: 0.0,
            position: start_position,
            closed: false,
        });
        open.push(OpenEntry {
            total: start_position.distance(end_position),
            triangle: start,
        });

        while let Some(OpenEntry { triangle: current, .. }) = open.pop() {
            let Some(node) = nodes[current.index()].as_mut() else {
                continue;
            };
            if node.closed {
                // Stale entry of a node that was improved after being pushed.
                continue;
            }
            node.closed = true;
            let (cost, position) = (node.cost, node.position);
            if current == end {
                return Some(reconstruct(&nodes, end));
            }

            let triangle = &self.triangles[current.index()];
            for (edge, neighbor) in triangle.neighbors.iter().enumerate() {
                let Some(neighbor) = *neighbor else {
                    continue;
                };
                let (a, b) = triangle.edge(edge);
                let midpoint = (a + b) * 0.5;
                let mut new_cost = cost + position.distance(midpoint);
                let heuristic = if neighbor == end {
                    new_cost += midpoint.distance(end_position);
                    0.0
                } else {
                    midpoint.distance(end_position)
                };

                match &nodes[neighbor.index()] {
                    Some(existing) if existing.closed || existing.cost <= new_cost => continue,
                    _ => {}
                }
                nodes[neighbor.index()] = Some(SearchNode {
                    parent: Some(current),
                    cost: new_cost,
                    position: midpoint,
                    closed: false,
                });
                open.push(OpenEntry {
                    total: new_cost + heuristic,
                    triangle: neighbor,
                });
            }
        }
        None
    }

    /// Collects the edges crossed along `corridor` as `(left, right)` pairs, bracketed by the degenerate
    /// portals `(start, start)` and `(end, end)`.
    ///
    /// Sides are decided against the centroid of the triangle being left, which keeps them consistent
    /// regardless of the winding of the source mesh.
    fn portals(&self, start: Vec3A, end: Vec3A, corridor: &[TriangleId]) -> Vec<(Vec3A, Vec3A)> {
        let mut portals = Vec::with_capacity(corridor.len() + 1);
        portals.push((start, start));
        for pair in corridor.windows(2) {
            let from = &self.triangles[pair[0].index()];
            let Some(edge) = from.shared_edge(pair[1]) else {
                continue;
            };
            let (a, b) = from.edge(edge);
            if tri_area_2d(from.centroid, a, b) > 0.0 {
                portals.push((a, b));
            } else {
                portals.push((b, a));
            }
        }
        portals.push((end, end));
        portals
    }
}

#[derive(Debug, Clone, Copy)]
struct SearchNode {
    parent: Option<TriangleId>,
    cost: f32,
    /// Where the search entered the triangle.
    position: Vec3A,
    closed: bool,
}

/// Min-heap entry ordered by total estimated cost, then by triangle id.
#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    total: f32,
    triangle: TriangleId,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed, `BinaryHeap` is a max-heap.
        other
            .total
            .total_cmp(&self.total)
            .then_with(|| other.triangle.cmp(&self.triangle))
    }
}

fn reconstruct(nodes: &[Option<SearchNode>], end: TriangleId) -> Vec<TriangleId> {
    let mut corridor = vec![end];
    let mut current = end;
    while let Some(parent) = nodes[current.index()].and_then(|node| node.parent) {
        corridor.push(parent);
        current = parent;
    }
    corridor.reverse();
    corridor
}

/// Pulls the corridor described by `portals` taut, returning the corners of the shortest path through it.
///
/// This is the "simple stupid funnel algorithm": the funnel is narrowed portal by portal, and whenever one side
/// crosses over the other, the apex is emitted as a corner and the scan restarts from there.
fn string_pull(portals: &[(Vec3A, Vec3A)]) -> Vec<Vec3A> {
    let Some(&(start, _)) = portals.first() else {
        return Vec::new();
    };
    let mut path = vec![start];

    let mut apex = start;
    let mut left = start;
    let mut right = start;
    let mut apex_index = 0;
    let mut left_index = 0;
    let mut right_index = 0;

    let mut i = 1;
    while i < portals.len() {
        let (portal_left, portal_right) = portals[i];

        // Update right vertex.
        if tri_area_2d(apex, right, portal_right) <= 0.0 {
            if almost_equal(apex, right) || tri_area_2d(apex, left, portal_right) > 0.0 {
                // Tighten the funnel.
                right = portal_right;
                right_index = i;
            } else {
                // Right over left, the left point becomes a corner.
                push_corner(&mut path, left);
                apex = left;
                apex_index = left_index;
                left = apex;
                right = apex;
                left_index = apex_index;
                right_index = apex_index;
                i = apex_index + 1;
                continue;
            }
        }

        // Update left vertex.
        if tri_area_2d(apex, left, portal_left) >= 0.0 {
            if almost_equal(apex, left) || tri_area_2d(apex, right, portal_left) < 0.0 {
                // Tighten the funnel.
                left = portal_left;
                left_index = i;
            } else {
                // Left over right, the right point becomes a corner.
                push_corner(&mut path, right);
                apex = right;
                apex_index = right_index;
                left = apex;
                right = apex;
                left_index = apex_index;
                right_index = apex_index;
                i = apex_index + 1;
                continue;
            }
        }
        i += 1;
    }

    if let Some(&(end, _)) = portals.last() {
        push_corner(&mut path, end);
    }
    path
}

fn push_corner(path: &mut Vec<Vec3A>, corner: Vec3A) {
    if path.last().is_none_or(|last| !almost_equal(*last, corner)) {
        path.push(corner);
    }
}

#[inline]
fn almost_equal(a: Vec3A, b: Vec3A) -> bool {
    a.distance_squared(b) < 1e-4 * 1e-4
}
