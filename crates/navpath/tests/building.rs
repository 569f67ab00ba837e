//! Queries against a small level: a ground floor connected to an upper floor by a ramp, and a detached island.

use std::path::PathBuf;

use approx::assert_abs_diff_eq;
use glam::{UVec3, Vec3A};
use navpath::{GroupId, PathError, Pathfinder, TriMesh, Zone, ZoneConfig};
use serde::{Deserialize, de::DeserializeOwned};

const ZONE: &str = "level1";

#[test]
fn building_groups_and_lookups() {
    let geometry = load_json::<Geometry>("building", "geometry");
    let zone = Zone::build(&geometry.to_trimesh(), &ZoneConfig::default()).unwrap();

    assert_eq!(zone.groups().len(), 2, "floors, ramp and island");
    assert_eq!(zone.triangles().len(), 12);
    assert_eq!(zone.build_report().skipped.len(), 1);
    assert_eq!(zone.build_report().skipped[0].index, 12);

    for query in &geometry.queries {
        let point = Vec3A::from(query.point);
        assert_eq!(
            zone.group_of(point),
            query.group.map(GroupId),
            "group of {point}"
        );
    }
}

#[test]
fn every_triangle_interior_maps_to_its_group() {
    let geometry = load_json::<Geometry>("building", "geometry");
    let zone = Zone::build(&geometry.to_trimesh(), &ZoneConfig::default()).unwrap();
    for triangle in zone.triangles() {
        // A point strictly inside, slightly off the centroid to avoid symmetric ties.
        let inside = triangle.centroid * 0.9
            + (triangle.vertices[0] + triangle.vertices[1]) * 0.05;
        assert_eq!(zone.group_of(inside), Some(triangle.group));
    }
}

#[test]
fn path_climbs_the_ramp() {
    let pathfinder = pathfinder();
    let start = Vec3A::new(3.0, 0.0, 1.0);
    let end = Vec3A::new(3.0, 2.0, 11.0);
    let group = pathfinder.get_group(ZONE, start).unwrap();
    assert_eq!(pathfinder.get_group(ZONE, end), Some(group));

    let path = pathfinder.find_path(start, end, ZONE, group).unwrap();
    assert_eq!(
        path.waypoints,
        [
            start,
            Vec3A::new(2.0, 0.0, 4.0),
            Vec3A::new(2.0, 2.0, 8.0),
            end
        ]
    );
    assert_abs_diff_eq!(
        path.length(),
        10.0_f32.sqrt() * 2.0 + 20.0_f32.sqrt(),
        epsilon = 1e-4
    );

    let zone = pathfinder.zone(ZONE).unwrap();
    for segment in path.waypoints.windows(2) {
        for step in 0..=20 {
            let sample = segment[0].lerp(segment[1], step as f32 / 20.0);
            assert_eq!(
                zone.group_of(sample),
                Some(group),
                "{sample} leaves the walkable surface"
            );
        }
    }
}

#[test]
fn path_to_the_island_is_refused() {
    let pathfinder = pathfinder();
    let start = Vec3A::new(1.0, 0.0, 1.0);
    let end = Vec3A::new(11.0, 0.0, 1.0);
    assert_eq!(
        pathfinder.find_path(start, end, ZONE, GroupId(0)),
        Err(PathError::GroupMismatch {
            requested: GroupId(0),
            start: GroupId(0),
            end: GroupId(1),
        })
    );
}

#[test]
fn off_mesh_clicks_snap_onto_the_nearest_floor() {
    let pathfinder = pathfinder();
    // Just past the right edge of the ground floor.
    let click = Vec3A::new(4.5, 0.0, 2.0);
    assert_eq!(pathfinder.get_group(ZONE, click), None);
    let snapped = pathfinder.snap(ZONE, click).unwrap();
    assert_eq!(snapped.group, GroupId(0));
    assert_abs_diff_eq!(snapped.position.x, 4.0);
    assert_abs_diff_eq!(snapped.distance, 0.5);

    let node = pathfinder
        .get_closest_node(click, ZONE, snapped.group)
        .unwrap();
    assert_eq!(node.triangle, snapped.triangle);
    assert_eq!(node.centroid, snapped.centroid);
}

#[test]
fn identical_queries_give_identical_paths() {
    let pathfinder = pathfinder();
    let start = Vec3A::new(0.5, 0.0, 0.5);
    let end = Vec3A::new(3.5, 2.0, 11.5);
    let first = pathfinder.find_path(start, end, ZONE, GroupId(0)).unwrap();
    let second = pathfinder.find_path(start, end, ZONE, GroupId(0)).unwrap();
    assert_eq!(first, second);
    assert!(first.is_traversable());
}

fn pathfinder() -> Pathfinder {
    let geometry = load_json::<Geometry>("building", "geometry");
    let zone = Pathfinder::create_zone(&geometry.to_trimesh(), &ZoneConfig::default()).unwrap();
    let mut pathfinder = Pathfinder::new();
    pathfinder.set_zone_data(ZONE, zone);
    pathfinder
}

#[derive(Debug, Deserialize, Clone)]
struct Geometry {
    verts: Vec<[f32; 3]>,
    tris: Vec<[u32; 3]>,
    queries: Vec<GroupQuery>,
}

impl Geometry {
    fn to_trimesh(&self) -> TriMesh {
        TriMesh {
            vertices: self.verts.iter().map(|v| Vec3A::from(*v)).collect(),
            indices: self.tris.iter().map(|i| UVec3::from(*i)).collect(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
struct GroupQuery {
    point: [f32; 3],
    group: Option<u32>,
}

fn reference_data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("reference_data")
}

#[track_caller]
fn load_json<T: DeserializeOwned>(project: &str, name: &str) -> T {
    let test_path = reference_data_dir()
        .join(project)
        .join(format!("{name}.json"));

    let file = std::fs::read_to_string(&test_path).unwrap_or_else(|e| {
        panic!("Failed to read file: {}: {}", test_path.display(), e);
    });
    serde_json::from_str(&file).unwrap_or_else(|e| {
        panic!("Failed to deserialize JSON: {}: {}", test_path.display(), e);
    })
}
