use bevy_app::prelude::*;
use bevy_asset::prelude::*;
use bevy_ecs::prelude::*;
use bevy_mesh::{Mesh, PrimitiveTopology};
use bevy_render::prelude::*;
use bevy_transform::components::GlobalTransform;
use glam::{UVec3, Vec3A};
use navpath::TriMesh;

use crate::{NavpathApp as _, zones::NavmeshSource};

/// A backend for [`crate::NavpathPlugin`].
/// Builds zones from the [`Mesh3d`] of every entity with a [`NavmeshSource`], placed by its [`GlobalTransform`].
#[derive(Debug, Default)]
#[non_exhaustive]
pub struct Mesh3dNavmeshPlugin;

impl Plugin for Mesh3dNavmeshPlugin {
    fn build(&self, app: &mut App) {
        app.set_navmesh_source_backend(mesh3d_backend);
    }
}

fn mesh3d_backend(
    In(zone): In<String>,
    meshes: Res<Assets<Mesh>>,
    sources: Query<(Entity, &NavmeshSource, &GlobalTransform, &Mesh3d)>,
) -> Option<TriMesh> {
    let mut trimesh = TriMesh::default();
    for (entity, source, transform, mesh) in &sources {
        if source.zone != zone {
            continue;
        }
        let mesh = meshes.get(mesh)?;
        let Some(mut part) = TriMesh::from_mesh(mesh) else {
            tracing::warn!(
                "Skipping navmesh source {entity} of zone {zone:?}: only indexed triangle lists are supported"
            );
            continue;
        };
        part.transform(&transform.affine());
        trimesh.extend(part);
    }
    Some(trimesh)
}

/// Used to add [`TriMeshFromBevyMesh::from_mesh`] to [`TriMesh`].
pub trait TriMeshFromBevyMesh {
    /// Converts a [`Mesh`] into a [`TriMesh`].
    fn from_mesh(mesh: &Mesh) -> Option<TriMesh>;
}

impl TriMeshFromBevyMesh for TriMesh {
    fn from_mesh(mesh: &Mesh) -> Option<TriMesh> {
        if mesh.primitive_topology() != PrimitiveTopology::TriangleList {
            return None;
        }

        let mut trimesh = TriMesh::default();
        let position = mesh.attribute(Mesh::ATTRIBUTE_POSITION)?;
        let float = position.as_float3()?;
        trimesh.vertices = float.iter().map(|v| Vec3A::from(*v)).collect();

        let indices: Vec<_> = mesh.indices()?.iter().collect();
        if !indices.len().is_multiple_of(3) {
            return None;
        }
        trimesh.indices = indices
            .chunks(3)
            .map(|indices| {
                UVec3::from_array([indices[0] as u32, indices[1] as u32, indices[2] as u32])
            })
            .collect();
        Some(trimesh)
    }
}
