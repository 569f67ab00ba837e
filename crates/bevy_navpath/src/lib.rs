#![doc = include_str!("../../../readme.md")]

use bevy_app::prelude::*;
use bevy_derive::{Deref, DerefMut};
use bevy_ecs::prelude::*;
#[cfg(feature = "bevy_mesh")]
mod mesh;
#[cfg(feature = "bevy_mesh")]
pub use mesh::{Mesh3dNavmeshPlugin, TriMeshFromBevyMesh};
mod backend;
pub mod click;
pub mod queue;
pub mod zones;
pub use backend::*;

pub use navpath;
use navpath::{Pathfinder, ZoneConfig};

/// Everything you need to get started with the navpath plugins.
pub mod prelude {
    #[cfg(feature = "bevy_mesh")]
    pub use crate::{Mesh3dNavmeshPlugin, TriMeshFromBevyMesh as _};
    pub use crate::{
        NavZones, NavpathPlugin,
        click::{ClickPath, NavmeshClick},
        queue::{PathComputed, PathFailed, PathQueries, PathRequest},
        zones::{NavmeshSource, ZoneLoaded},
    };
}

/// The main plugin of the crate. Adds the zone registry, the path queue and the click-to-path state machine.
///
/// Zones are built from [`NavmeshSource`](zones::NavmeshSource) entities by the backend set through
/// [`NavpathApp::set_navmesh_source_backend`], e.g. the one added by `Mesh3dNavmeshPlugin`.
#[derive(Debug, Default)]
pub struct NavpathPlugin {
    /// The settings every zone is built with.
    pub config: ZoneConfig,
}

impl Plugin for NavpathPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<NavZones>();
        app.insert_resource(NavpathConfig(self.config.clone()));
        app.add_plugins((zones::plugin, queue::plugin, click::plugin));
    }
}

/// Resource holding every loaded zone by name.
/// Zones are installed from [`NavmeshSource`](zones::NavmeshSource) entities, or manually through [`Pathfinder::set_zone_data`].
#[derive(Resource, Debug, Default, Deref, DerefMut)]
pub struct NavZones(pub Pathfinder);

/// Resource holding the settings zones are built with. Set through [`NavpathPlugin::config`].
#[derive(Resource, Debug, Clone, Default, PartialEq, Deref, DerefMut)]
pub struct NavpathConfig(pub ZoneConfig);
