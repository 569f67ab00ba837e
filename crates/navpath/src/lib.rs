#![doc = include_str!("../../../readme.md")]

mod config;
pub(crate) mod math;
mod path;
mod pathfinder;
mod query;
mod triangle;
mod trimesh;
mod zone;

pub use config::ZoneConfig;
pub use math::Aabb3d;
pub use path::{Path, PathError};
pub use pathfinder::Pathfinder;
pub use query::{ClampedStep, ClosestNode};
pub use triangle::{Triangle, TriangleId};
pub use trimesh::TriMesh;
pub use zone::{
    DegenerateTriangle, Group, GroupId, SkippedTriangle, Zone, ZoneBuildError, ZoneBuildReport,
};
