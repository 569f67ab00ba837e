//! Point queries against a [`Zone`]: group lookup, snapping and bounded movement along the surface.

use std::collections::{HashSet, VecDeque};

use glam::Vec3A;
use rand::{Rng, seq::SliceRandom as _};

use crate::{GroupId, Triangle, TriangleId, Zone};

/// A triangle found by a point query, together with where on it the query point ended up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestNode {
    /// The triangle the point was snapped onto.
    pub triangle: TriangleId,
    /// The group of [`Self::triangle`].
    pub group: GroupId,
    /// The centroid of [`Self::triangle`].
    pub centroid: Vec3A,
    /// The snapped point on [`Self::triangle`].
    pub position: Vec3A,
    /// The distance between the query point and [`Self::position`].
    pub distance: f32,
}

/// The result of [`Zone::clamp_step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampedStep {
    /// The reachable point closest to the requested target.
    pub position: Vec3A,
    /// The triangle [`Self::position`] lies on.
    pub triangle: TriangleId,
}

impl Zone {
    /// Returns the group whose surface lies directly above or below `point`.
    ///
    /// `None` if no triangle's footprint contains the point within [`ZoneConfig::containment_tolerance`](crate::ZoneConfig::containment_tolerance)
    /// at a vertical distance of at most [`ZoneConfig::vertical_tolerance`](crate::ZoneConfig::vertical_tolerance).
    pub fn group_of(&self, point: Vec3A) -> Option<GroupId> {
        self.containing_node(point).map(|node| node.group)
    }

    /// Returns the triangle whose footprint contains `point`, picking the vertically closest one when several do.
    /// The returned position is `point` projected vertically onto that triangle.
    pub fn containing_node(&self, point: Vec3A) -> Option<ClosestNode> {
        let margin = Vec3A::new(
            self.config.containment_tolerance,
            self.config.vertical_tolerance,
            self.config.containment_tolerance,
        );
        let mut best: Option<ClosestNode> = None;
        for group in &self.groups {
            if !group.aabb.contains_point(point, margin) {
                continue;
            }
            for (id, triangle) in self.group_triangles(group.id) {
                if !triangle.aabb.contains_point(point, margin)
                    || !triangle.contains_xz(point, self.config.containment_tolerance)
                {
                    continue;
                }
                let Some(height) = triangle.height_at(point) else {
                    continue;
                };
                let distance = (point.y - height).abs();
                if distance > self.config.vertical_tolerance {
                    continue;
                }
                if best.is_none_or(|best| distance < best.distance) {
                    best = Some(ClosestNode {
                        triangle: id,
                        group: triangle.group,
                        centroid: triangle.centroid,
                        position: point.with_y(height),
                        distance,
                    });
                }
            }
        }
        best
    }

    /// Returns the triangle of `group` closest to `point`.
    ///
    /// Ties go to the triangle with the lowest id. `None` if the group doesn't exist or is empty,
    /// or if even the closest triangle is farther away than [`ZoneConfig::max_snap_distance`](crate::ZoneConfig::max_snap_distance).
    pub fn closest_node(&self, point: Vec3A, group: GroupId) -> Option<ClosestNode> {
        closest_of(self.group_triangles(group), point, self.config.max_snap_distance)
    }

    /// Moves an arbitrary point onto the navmesh.
    ///
    /// A point above or below the surface is projected onto it vertically. Otherwise it is moved to the
    /// closest point of any triangle, as long as that is within [`ZoneConfig::max_snap_distance`](crate::ZoneConfig::max_snap_distance).
    pub fn snap(&self, point: Vec3A) -> Option<ClosestNode> {
        self.containing_node(point).or_else(|| {
            let all = self
                .triangles
                .iter()
                .enumerate()
                .map(|(id, triangle)| (TriangleId(id as u32), triangle));
            closest_of(all, point, self.config.max_snap_distance)
        })
    }

    /// Picks the centroid of a random triangle of `group`.
    ///
    /// With `near = Some((center, radius))`, only triangles whose centroid lies within `radius` of `center` are considered.
    /// `None` if no triangle qualifies.
    pub fn random_node<R: Rng + ?Sized>(
        &self,
        group: GroupId,
        near: Option<(Vec3A, f32)>,
        rng: &mut R,
    ) -> Option<Vec3A> {
        let candidates: Vec<Vec3A> = self
            .group_triangles(group)
            .map(|(_, triangle)| triangle.centroid)
            .filter(|centroid| {
                near.is_none_or(|(center, radius)| centroid.distance_squared(center) <= radius * radius)
            })
            .collect();
        candidates.choose(rng).copied()
    }

    /// Moves from `start`, which lies on `node`, towards `end` without leaving the navmesh.
    ///
    /// `end` is first projected onto the plane of `node`. Then every triangle reachable from `node` whose bounds
    /// intersect the sphere around `start` with a radius of the step length is searched for the point closest to
    /// the projected target. If `end` is reachable, it is returned as is (up to the projection).
    pub fn clamp_step(&self, start: Vec3A, end: Vec3A, node: TriangleId) -> Option<ClampedStep> {
        let origin = self.triangle(node)?;
        let target = end - origin.normal * origin.normal.dot(end - origin.vertices[0]);
        let reach = start.distance(target) + self.config.containment_tolerance;

        let mut best = ClampedStep {
            position: origin.closest_point(target),
            triangle: node,
        };
        let mut best_distance = best.position.distance_squared(target);

        let mut visited = HashSet::from([node]);
        let mut queue = VecDeque::from([node]);
        while let Some(current) = queue.pop_front() {
            let triangle = &self.triangles[current.index()];
            let closest = triangle.closest_point(target);
            let distance = closest.distance_squared(target);
            if distance < best_distance {
                best_distance = distance;
                best = ClampedStep {
                    position: closest,
                    triangle: current,
                };
            }
            for neighbor in triangle.neighbors() {
                if visited.contains(&neighbor) {
                    continue;
                }
                if !self.triangles[neighbor.index()]
                    .aabb
                    .intersects_sphere(start, reach)
                {
                    continue;
                }
                visited.insert(neighbor);
                queue.push_back(neighbor);
            }
        }
        Some(best)
    }
}

fn closest_of<'a>(
    triangles: impl Iterator<Item = (TriangleId, &'a Triangle)>,
    point: Vec3A,
    max_distance: f32,
) -> Option<ClosestNode> {
    let mut best: Option<ClosestNode> = None;
    for (id, triangle) in triangles {
        let position = triangle.closest_point(point);
        let distance = position.distance(point);
        if best.is_none_or(|best| distance < best.distance) {
            best = Some(ClosestNode {
                triangle: id,
                group: triangle.group,
                centroid: triangle.centroid,
                position,
                distance,
            });
        }
    }
    best.filter(|best| best.distance <= max_distance)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use glam::Vec3;
    use rand::SeedableRng as _;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::{TriMesh, ZoneConfig};

    /// A 2x2 floor at y = 0 and a 1x1 platform at y = 3 hovering above it.
    fn two_floors() -> Zone {
        let trimesh = TriMesh::from_triangles([
            [Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 2.0), Vec3::new(2.0, 0.0, 0.0)],
            [Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 2.0), Vec3::new(2.0, 0.0, 2.0)],
            [Vec3::new(0.0, 3.0, 0.0), Vec3::new(0.0, 3.0, 1.0), Vec3::new(1.0, 3.0, 0.0)],
            [Vec3::new(1.0, 3.0, 0.0), Vec3::new(0.0, 3.0, 1.0), Vec3::new(1.0, 3.0, 1.0)],
        ]);
        Zone::build(&trimesh, &ZoneConfig::default()).unwrap()
    }

    #[test]
    fn group_of_picks_the_floor_at_the_right_height() {
        let zone = two_floors();
        assert_eq!(zone.group_of(Vec3A::new(0.5, 0.1, 0.5)), Some(GroupId(0)));
        assert_eq!(zone.group_of(Vec3A::new(0.5, 2.9, 0.5)), Some(GroupId(1)));
        // Halfway in between is too far from both
        assert_eq!(zone.group_of(Vec3A::new(0.5, 1.5, 0.5)), None);
        assert_eq!(zone.group_of(Vec3A::new(5.0, 0.0, 5.0)), None);
    }

    #[test]
    fn group_of_accepts_points_on_shared_edges() {
        let zone = two_floors();
        assert_eq!(zone.group_of(Vec3A::new(1.0, 0.0, 1.0)), Some(GroupId(0)));
    }

    #[test]
    fn closest_node_on_mesh_has_zero_distance() {
        let zone = two_floors();
        let point = Vec3A::new(1.5, 0.0, 1.5);
        let node = zone.closest_node(point, GroupId(0)).unwrap();
        assert_eq!(node.triangle, TriangleId(1));
        assert_abs_diff_eq!(node.distance, 0.0);
        assert!(zone.triangles()[1].contains_xz(point, 0.0));
    }

    #[test]
    fn closest_node_snaps_off_mesh_points() {
        let zone = two_floors();
        let node = zone
            .closest_node(Vec3A::new(3.0, 0.0, 1.0), GroupId(0))
            .unwrap();
        assert_abs_diff_eq!(node.position.x, 2.0);
        assert_abs_diff_eq!(node.distance, 1.0);
        assert_eq!(node.centroid, zone.triangles()[1].centroid);
    }

    #[test]
    fn closest_node_respects_max_snap_distance() {
        let zone = two_floors();
        assert!(
            zone.closest_node(Vec3A::new(100.0, 0.0, 0.0), GroupId(0))
                .is_none()
        );
        assert!(zone.closest_node(Vec3A::ZERO, GroupId(7)).is_none());
    }

    #[test]
    fn snap_prefers_vertical_projection() {
        let zone = two_floors();
        let snapped = zone.snap(Vec3A::new(0.25, 2.5, 0.25)).unwrap();
        assert_eq!(snapped.group, GroupId(1));
        assert_abs_diff_eq!(snapped.position.y, 3.0);
        assert_abs_diff_eq!(snapped.position.x, 0.25);
    }

    #[test]
    fn empty_zone_finds_nothing() {
        let zone = Zone::default();
        assert_eq!(zone.group_of(Vec3A::ZERO), None);
        assert_eq!(zone.snap(Vec3A::ZERO), None);
        assert_eq!(zone.closest_node(Vec3A::ZERO, GroupId(0)), None);
    }

    #[test]
    fn random_node_is_reproducible_and_filtered() {
        let zone = two_floors();
        let mut a = ChaCha8Rng::seed_from_u64(42);
        let mut b = ChaCha8Rng::seed_from_u64(42);
        let first = zone.random_node(GroupId(0), None, &mut a);
        assert_eq!(first, zone.random_node(GroupId(0), None, &mut b));
        assert!(first.is_some());

        let near = zone.triangles()[0].centroid;
        let filtered = zone.random_node(GroupId(0), Some((near, 0.1)), &mut a);
        assert_eq!(filtered, Some(near));
        assert_eq!(
            zone.random_node(GroupId(0), Some((Vec3A::splat(50.0), 1.0)), &mut a),
            None
        );
    }

    #[test]
    fn clamp_step_stops_at_the_edge() {
        let zone = two_floors();
        let step = zone
            .clamp_step(
                Vec3A::new(1.5, 0.0, 1.0),
                Vec3A::new(4.0, 0.0, 1.0),
                TriangleId(1),
            )
            .unwrap();
        assert_abs_diff_eq!(step.position.x, 2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(step.position.z, 1.0, epsilon = 1e-5);
        assert_eq!(step.triangle, TriangleId(1));
    }

    #[test]
    fn clamp_step_crosses_into_neighbors() {
        let zone = two_floors();
        let end = Vec3A::new(0.25, 0.0, 0.25);
        let step = zone
            .clamp_step(Vec3A::new(1.75, 0.0, 1.75), end, TriangleId(1))
            .unwrap();
        assert_eq!(step.triangle, TriangleId(0));
        assert_abs_diff_eq!(step.position.distance(end), 0.0, epsilon = 1e-5);
    }
}
