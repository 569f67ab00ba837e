#[cfg(feature = "bevy_reflect")]
use bevy_reflect::prelude::*;

/// Specifies the tolerances used when building a [`Zone`](crate::Zone) and when answering queries against it.
///
/// Units are world units (wu) throughout. The defaults suit meshes authored in meters,
/// such as navmeshes exported from a DCC tool as glTF.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(
    all(feature = "serialize", feature = "bevy_reflect"),
    reflect(Serialize, Deserialize)
)]
pub struct ZoneConfig {
    /// Vertices closer than this are merged into one before adjacency is computed. `[Limit: > 0] [Units: wu]`
    ///
    /// Exported meshes usually duplicate vertices along UV seams and between primitives,
    /// so without welding neighboring triangles would not be recognized as sharing an edge.
    /// Keep this well below the length of the shortest real edge of the mesh.
    pub weld_tolerance: f32,

    /// Triangles with a smaller surface area are skipped as degenerate. `[Limit: >= 0] [Units: wu²]`
    pub min_triangle_area: f32,

    /// How far outside a triangle's footprint a point may lie and still count as contained. `[Limit: >= 0] [Units: wu]`
    ///
    /// Points produced by ray casts land exactly on shared edges often enough that
    /// a strict test would report them as off-mesh.
    pub containment_tolerance: f32,

    /// The maximum vertical distance between a point and a triangle that contains it on the xz-plane. `[Limit: >= 0] [Units: wu]`
    ///
    /// Stops a point on an upper floor from being attributed to the floor below it.
    pub vertical_tolerance: f32,

    /// The maximum distance an off-mesh point is moved when snapping it onto the mesh. `[Limit: >= 0] [Units: wu]`
    ///
    /// Points farther away from every triangle of a group are reported as not being on the mesh.
    pub max_snap_distance: f32,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            weld_tolerance: 1e-4,
            min_triangle_area: 1e-8,
            containment_tolerance: 1e-3,
            vertical_tolerance: 1.0,
            max_snap_distance: 5.0,
        }
    }
}
